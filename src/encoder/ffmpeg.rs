//! FFmpeg encoder backend
//!
//! Pipes raw RGBA frames into an `ffmpeg` child process and slices its
//! stdout into timeslice chunks. Video-only: the audio track handle is
//! opaque at this boundary.

use super::{
    EncodedChunk, EncoderBackend, EncoderError, EncoderEvent, EncoderEventSender, EncoderOptions,
    MediaEncoder,
};
use crate::capture::{MediaStreamHandle, VideoFrame};
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

const INPUT_FPS: u32 = 30;

fn ffmpeg_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| {
        Command::new("ffmpeg")
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    })
}

/// Container/codec arguments for a negotiable MIME type.
/// h264-in-webm is not a combination ffmpeg will mux, so the first
/// preference is reported unsupported and negotiation falls through.
fn container_args(mime_type: &str) -> Option<&'static [&'static str]> {
    match mime_type {
        "video/webm;codecs=vp8,opus" | "video/webm" => {
            Some(&["-c:v", "libvpx", "-f", "webm"])
        }
        "video/mp4" => Some(&[
            "-c:v",
            "libx264",
            "-movflags",
            "frag_keyframe+empty_moov",
            "-f",
            "mp4",
        ]),
        _ => None,
    }
}

/// Chunked encoder backed by an ffmpeg subprocess
pub struct FfmpegEncoder;

impl EncoderBackend for FfmpegEncoder {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        container_args(mime_type).is_some() && ffmpeg_available()
    }

    fn create(
        &self,
        stream: MediaStreamHandle,
        options: EncoderOptions,
        events: EncoderEventSender,
    ) -> Result<Box<dyn MediaEncoder>, EncoderError> {
        if container_args(&options.mime_type).is_none() {
            return Err(EncoderError::Backend(format!(
                "unsupported mime type {}",
                options.mime_type
            )));
        }
        Ok(Box::new(FfmpegMediaEncoder {
            stream: Some(stream),
            options,
            events,
            paused: Arc::new(AtomicBool::new(false)),
            stopped: Arc::new(AtomicBool::new(false)),
            flush: Arc::new(AtomicBool::new(false)),
        }))
    }
}

pub struct FfmpegMediaEncoder {
    stream: Option<MediaStreamHandle>,
    options: EncoderOptions,
    events: EncoderEventSender,
    paused: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    flush: Arc<AtomicBool>,
}

impl MediaEncoder for FfmpegMediaEncoder {
    fn start(&mut self) {
        let Some(stream) = self.stream.take() else {
            return;
        };
        let options = self.options.clone();
        let events = self.events.clone();
        let paused = self.paused.clone();
        let stopped = self.stopped.clone();
        let flush = self.flush.clone();

        std::thread::spawn(move || {
            if let Err(e) = run_encoder(stream, options, &events, paused, stopped, flush) {
                tracing::error!("ffmpeg encoder failed: {}", e);
            }
            let _ = events.send(EncoderEvent::Stopped);
        });
    }

    fn pause(&mut self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&mut self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    fn request_data(&mut self) {
        self.flush.store(true, Ordering::SeqCst);
    }

    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

fn wait_for_sized_frame(
    video: &tokio::sync::watch::Receiver<Option<VideoFrame>>,
    stopped: &AtomicBool,
) -> Option<VideoFrame> {
    loop {
        if stopped.load(Ordering::SeqCst) {
            return None;
        }
        if let Some(frame) = video.borrow().clone() {
            if frame.has_dimensions() {
                return Some(frame);
            }
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

fn run_encoder(
    stream: MediaStreamHandle,
    options: EncoderOptions,
    events: &EncoderEventSender,
    paused: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    flush: Arc<AtomicBool>,
) -> Result<(), EncoderError> {
    let video = stream.video;
    let Some(first) = wait_for_sized_frame(&video, &stopped) else {
        return Ok(());
    };
    let (width, height) = (first.width, first.height);
    let extra = container_args(&options.mime_type)
        .ok_or_else(|| EncoderError::Backend("no container mapping".to_string()))?;

    let mut child = Command::new("ffmpeg")
        .args([
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", width, height),
            "-r",
            &INPUT_FPS.to_string(),
            "-i",
            "-",
            "-an",
            "-b:v",
            &options.video_bits_per_second.to_string(),
        ])
        .args(extra)
        .arg("-")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| EncoderError::Backend(format!("failed to start ffmpeg: {}", e)))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| EncoderError::Backend("no ffmpeg stdin".to_string()))?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| EncoderError::Backend("no ffmpeg stdout".to_string()))?;

    // Feed frames at the input rate until stopped. rawvideo input is
    // fixed-size, so frames from a mid-recording resolution change are
    // skipped rather than corrupting the pipe.
    let writer_paused = paused;
    let writer_stopped = stopped.clone();
    let frame_size = (width * height * 4) as usize;
    let writer = std::thread::spawn(move || {
        let period = Duration::from_millis(1000 / INPUT_FPS as u64);
        while !writer_stopped.load(Ordering::SeqCst) {
            std::thread::sleep(period);
            if writer_paused.load(Ordering::SeqCst) {
                continue;
            }
            let Some(frame) = video.borrow().clone() else {
                continue;
            };
            if frame.data.len() != frame_size {
                continue;
            }
            if stdin.write_all(&frame.data).is_err() {
                break;
            }
        }
        // Dropping stdin signals end-of-input; ffmpeg finalizes the container.
    });

    let mut buf = [0u8; 32 * 1024];
    let mut pending: Vec<u8> = Vec::new();
    let mut last_emit = Instant::now();
    loop {
        match stdout.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                let due = last_emit.elapsed() >= options.timeslice;
                if (due || flush.swap(false, Ordering::SeqCst)) && !pending.is_empty() {
                    let _ = events.send(EncoderEvent::Chunk(EncodedChunk {
                        data: std::mem::take(&mut pending),
                    }));
                    last_emit = Instant::now();
                }
            }
            Err(e) => {
                tracing::warn!("ffmpeg stdout read failed: {}", e);
                break;
            }
        }
    }
    if !pending.is_empty() {
        let _ = events.send(EncoderEvent::Chunk(EncodedChunk { data: pending }));
    }

    let _ = writer.join();
    let status = child
        .wait()
        .map_err(|e| EncoderError::Backend(format!("ffmpeg wait failed: {}", e)))?;
    if !status.success() {
        return Err(EncoderError::Backend(format!(
            "ffmpeg exited with {}",
            status
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_mapping() {
        assert!(container_args("video/webm").is_some());
        assert!(container_args("video/webm;codecs=vp8,opus").is_some());
        assert!(container_args("video/mp4").is_some());
        // Not a muxable combination; negotiation must skip it.
        assert!(container_args("video/webm;codecs=h264,opus").is_none());
    }
}
