//! Drawing surface for frame compositing

use crate::capture::VideoFrame;
use crate::filter::{ColorTransform, FilterExpression};

/// RGBA surface the compositor draws each source frame onto
#[derive(Debug, Default)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Surface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Resize to match the source; returns true when a resize happened.
    /// Only triggers on the first frame or a resolution change.
    pub fn ensure_size(&mut self, width: u32, height: u32) -> bool {
        if self.width == width && self.height == height {
            return false;
        }
        self.width = width;
        self.height = height;
        self.pixels = vec![0; (width * height * 4) as usize];
        true
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Draw a source frame. Frames whose payload does not match their
    /// declared dimensions are skipped, same as the encoder input side.
    pub fn draw_frame(&mut self, frame: &VideoFrame) {
        if frame.data.len() != self.pixels.len() {
            tracing::warn!(
                declared = self.pixels.len(),
                actual = frame.data.len(),
                "skipping frame with mismatched payload"
            );
            return;
        }
        self.pixels.copy_from_slice(&frame.data);
    }

    pub fn apply_transform(&mut self, transform: &ColorTransform) {
        transform.apply(&mut self.pixels);
    }

    /// Snapshot the surface as a capturable frame
    pub fn to_frame(&self) -> VideoFrame {
        VideoFrame::new(self.width, self.height, self.pixels.clone())
    }
}

/// One compositor tick: size the surface to the source, clear, draw the
/// raw frame, then redraw through the filter unless it is the identity
/// (which short-circuits the second pass).
pub fn composite_frame(surface: &mut Surface, frame: &VideoFrame, expression: &FilterExpression) {
    if surface.ensure_size(frame.width, frame.height) {
        tracing::debug!("surface resized to {}x{}", frame.width, frame.height);
    }
    surface.clear();
    surface.draw_frame(frame);
    if !expression.is_identity() {
        surface.apply_transform(&expression.transform());
    }
}
