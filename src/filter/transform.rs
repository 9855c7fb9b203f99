//! Color transforms for filter compositing
//!
//! Each filter op maps to a 3x3 color matrix plus offset (the standard
//! filter-effects matrices). An expression's ops are composed into one
//! transform per frame, then applied per pixel over the RGBA buffer.

use super::FilterOp;

/// Composed linear color transform: `rgb' = matrix * rgb + offset`
///
/// Matrix entries are unitless; offsets are in 0..255 channel units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorTransform {
    pub matrix: [[f32; 3]; 3],
    pub offset: [f32; 3],
}

const IDENTITY: [[f32; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

// Rec. 709 luma weights used by grayscale/saturate/hue-rotate.
const LUMA_R: f32 = 0.2126;
const LUMA_G: f32 = 0.7152;
const LUMA_B: f32 = 0.0722;

impl ColorTransform {
    pub fn identity() -> Self {
        Self {
            matrix: IDENTITY,
            offset: [0.0; 3],
        }
    }

    /// Apply `op` after `self` (composition order matches the order ops
    /// appear in a filter expression).
    pub fn then(&self, op: &ColorTransform) -> Self {
        let mut matrix = [[0.0f32; 3]; 3];
        let mut offset = op.offset;
        for row in 0..3 {
            for col in 0..3 {
                for k in 0..3 {
                    matrix[row][col] += op.matrix[row][k] * self.matrix[k][col];
                }
            }
            for k in 0..3 {
                offset[row] += op.matrix[row][k] * self.offset[k];
            }
        }
        Self { matrix, offset }
    }

    /// Transform an RGBA8 buffer in place; alpha is untouched.
    pub fn apply(&self, rgba: &mut [u8]) {
        for px in rgba.chunks_exact_mut(4) {
            let (r, g, b) = (px[0] as f32, px[1] as f32, px[2] as f32);
            for (i, row) in self.matrix.iter().enumerate() {
                let v = row[0] * r + row[1] * g + row[2] * b + self.offset[i];
                px[i] = v.clamp(0.0, 255.0) as u8;
            }
        }
    }
}

impl From<&FilterOp> for ColorTransform {
    fn from(op: &FilterOp) -> Self {
        match *op {
            FilterOp::Grayscale(amount) => lerp_matrix(
                [
                    [LUMA_R, LUMA_G, LUMA_B],
                    [LUMA_R, LUMA_G, LUMA_B],
                    [LUMA_R, LUMA_G, LUMA_B],
                ],
                amount,
            ),
            FilterOp::Sepia(amount) => lerp_matrix(
                [
                    [0.393, 0.769, 0.189],
                    [0.349, 0.686, 0.168],
                    [0.272, 0.534, 0.131],
                ],
                amount,
            ),
            FilterOp::Saturate(s) => ColorTransform {
                matrix: [
                    [LUMA_R + (1.0 - LUMA_R) * s, LUMA_G * (1.0 - s), LUMA_B * (1.0 - s)],
                    [LUMA_R * (1.0 - s), LUMA_G + (1.0 - LUMA_G) * s, LUMA_B * (1.0 - s)],
                    [LUMA_R * (1.0 - s), LUMA_G * (1.0 - s), LUMA_B + (1.0 - LUMA_B) * s],
                ],
                offset: [0.0; 3],
            },
            FilterOp::HueRotate(degrees) => {
                let rad = degrees.to_radians();
                let (sin, cos) = rad.sin_cos();
                ColorTransform {
                    matrix: [
                        [
                            LUMA_R + cos * (1.0 - LUMA_R) - sin * LUMA_R,
                            LUMA_G - cos * LUMA_G - sin * LUMA_G,
                            LUMA_B - cos * LUMA_B + sin * (1.0 - LUMA_B),
                        ],
                        [
                            LUMA_R - cos * LUMA_R + sin * 0.143,
                            LUMA_G + cos * (1.0 - LUMA_G) + sin * 0.140,
                            LUMA_B - cos * LUMA_B - sin * 0.283,
                        ],
                        [
                            LUMA_R - cos * LUMA_R - sin * (1.0 - LUMA_R),
                            LUMA_G - cos * LUMA_G + sin * LUMA_G,
                            LUMA_B + cos * (1.0 - LUMA_B) + sin * LUMA_B,
                        ],
                    ],
                    offset: [0.0; 3],
                }
            }
            FilterOp::Brightness(b) => ColorTransform {
                matrix: [[b, 0.0, 0.0], [0.0, b, 0.0], [0.0, 0.0, b]],
                offset: [0.0; 3],
            },
            FilterOp::Contrast(c) => ColorTransform {
                matrix: [[c, 0.0, 0.0], [0.0, c, 0.0], [0.0, 0.0, c]],
                offset: [(0.5 - 0.5 * c) * 255.0; 3],
            },
        }
    }
}

fn lerp_matrix(target: [[f32; 3]; 3], amount: f32) -> ColorTransform {
    let a = amount.clamp(0.0, 1.0);
    let mut matrix = [[0.0f32; 3]; 3];
    for row in 0..3 {
        for col in 0..3 {
            matrix[row][col] = IDENTITY[row][col] * (1.0 - a) + target[row][col] * a;
        }
    }
    ColorTransform {
        matrix,
        offset: [0.0; 3],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(t: &ColorTransform, rgba: [u8; 4]) -> [u8; 4] {
        let mut buf = rgba.to_vec();
        t.apply(&mut buf);
        [buf[0], buf[1], buf[2], buf[3]]
    }

    #[test]
    fn test_identity_keeps_pixels() {
        let t = ColorTransform::identity();
        assert_eq!(pixel(&t, [10, 200, 30, 255]), [10, 200, 30, 255]);
    }

    #[test]
    fn test_full_grayscale_equalizes_channels() {
        let t = ColorTransform::from(&FilterOp::Grayscale(1.0));
        let out = pixel(&t, [255, 0, 0, 255]);
        assert_eq!(out[0], out[1]);
        assert_eq!(out[1], out[2]);
        assert_eq!(out[3], 255);
        // Red contributes ~21% luma.
        assert!((out[0] as i32 - 54).abs() <= 1);
    }

    #[test]
    fn test_brightness_scales_and_clamps() {
        let t = ColorTransform::from(&FilterOp::Brightness(2.0));
        assert_eq!(pixel(&t, [100, 200, 0, 128]), [200, 255, 0, 128]);
    }

    #[test]
    fn test_contrast_pivots_on_midpoint() {
        let t = ColorTransform::from(&FilterOp::Contrast(2.0));
        let out = pixel(&t, [128, 128, 128, 255]);
        // Midpoint stays put (within rounding).
        assert!((out[0] as i32 - 128).abs() <= 1);
        assert_eq!(pixel(&t, [0, 0, 0, 255])[0], 0);
        assert_eq!(pixel(&t, [255, 255, 255, 255])[0], 255);
    }

    #[test]
    fn test_composition_matches_sequential_application() {
        let first = ColorTransform::from(&FilterOp::Sepia(0.8));
        let second = ColorTransform::from(&FilterOp::Brightness(0.9));
        let composed = first.then(&second);

        let input = [37u8, 180, 99, 255];
        let mut sequential = input.to_vec();
        first.apply(&mut sequential);
        second.apply(&mut sequential);

        let combined = pixel(&composed, input);
        for i in 0..3 {
            assert!((combined[i] as i32 - sequential[i] as i32).abs() <= 1);
        }
    }

    #[test]
    fn test_zero_hue_rotate_is_identity() {
        let t = ColorTransform::from(&FilterOp::HueRotate(0.0));
        let out = pixel(&t, [50, 120, 220, 255]);
        for i in 0..3 {
            assert!((out[i] as i32 - [50, 120, 220][i]).abs() <= 1);
        }
    }
}
