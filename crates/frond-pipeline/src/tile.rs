//! Tileability post-processing: soften seams by blending opposite-edge
//! strips over each border.
//!
//! This is a heuristic: each edge receives the opposite edge's
//! `wrap`-pixel strip at 50% opacity so a repeated texture does not show
//! a hard seam. It does not guarantee gradient continuity or pixel-exact
//! mirror symmetry, so the result tiles approximately rather than exactly.

use crate::composite::blend_over;
use crate::types::RgbaImage;

/// Default wrap size in pixels.
pub const DEFAULT_WRAP: u32 = 64;

/// Produce a seam-blended copy of a composited buffer.
///
/// The source is copied verbatim, then the opposite edge's `wrap`-pixel
/// strip (captured from the untouched source, so the four passes do
/// not feed each other) is blended source-over at 50% opacity onto
/// each edge in fixed order: top, bottom, left, right. `wrap` is
/// clamped to half the smaller dimension; a zero wrap returns a plain
/// copy.
#[must_use]
pub fn blend_edges(source: &RgbaImage, wrap: u32) -> RgbaImage {
    let (width, height) = source.dimensions();
    let wrap = wrap.min(width / 2).min(height / 2);
    let mut out = source.clone();
    if wrap == 0 {
        return out;
    }

    let strip = |x, y, w, h| image::imageops::crop_imm(source, x, y, w, h).to_image();
    let bottom = strip(0, height - wrap, width, wrap);
    let top = strip(0, 0, width, wrap);
    let right = strip(width - wrap, 0, wrap, height);
    let left = strip(0, 0, wrap, height);

    blend_patch(&mut out, &bottom, 0, 0);
    blend_patch(&mut out, &top, 0, height - wrap);
    blend_patch(&mut out, &right, 0, 0);
    blend_patch(&mut out, &left, width - wrap, 0);
    out
}

/// Blend `patch` at 50% opacity, source-over, onto `canvas` with its
/// top-left corner at (`dest_x`, `dest_y`). The patch must fit.
fn blend_patch(canvas: &mut RgbaImage, patch: &RgbaImage, dest_x: u32, dest_y: u32) {
    for (x, y, src) in patch.enumerate_pixels() {
        let halved = image::Rgba([src.0[0], src.0[1], src.0[2], halve(src.0[3])]);
        let dst = *canvas.get_pixel(dest_x + x, dest_y + y);
        canvas.put_pixel(dest_x + x, dest_y + y, blend_over(dst, halved));
    }
}

/// Round-to-nearest halving of an alpha sample (255 -> 128).
const fn halve(alpha: u8) -> u8 {
    #[expect(clippy::cast_possible_truncation)]
    {
        ((alpha as u16 + 1) / 2) as u8
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn halve_rounds_to_nearest() {
        assert_eq!(halve(255), 128);
        assert_eq!(halve(0), 0);
        assert_eq!(halve(1), 1);
        assert_eq!(halve(2), 1);
    }

    #[test]
    fn zero_wrap_is_a_plain_copy() {
        let source = RgbaImage::from_pixel(8, 8, image::Rgba([10, 20, 30, 255]));
        assert_eq!(blend_edges(&source, 0), source);
    }

    #[test]
    fn uniform_image_is_unchanged_by_blending() {
        // Blending an edge strip onto an identical region is a no-op
        // up to rounding; for a uniform opaque image the mix of equal
        // colors stays exactly equal.
        let source = RgbaImage::from_pixel(16, 16, image::Rgba([77, 88, 99, 255]));
        assert_eq!(blend_edges(&source, 4), source);
    }

    #[test]
    fn interior_pixels_are_untouched() {
        #[expect(clippy::cast_possible_truncation)]
        let source = RgbaImage::from_fn(20, 20, |x, y| {
            image::Rgba([(x * 7) as u8, (y * 9) as u8, 3, 255])
        });
        let out = blend_edges(&source, 4);
        for y in 4..16 {
            for x in 4..16 {
                assert_eq!(out.get_pixel(x, y), source.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn top_edge_receives_half_of_bottom_strip() {
        // Black image with a white bottom strip: after blending, the
        // top strip becomes a 50/50 mix of white over black.
        let mut source = RgbaImage::from_pixel(12, 12, image::Rgba([0, 0, 0, 255]));
        for y in 8..12 {
            for x in 0..12 {
                source.put_pixel(x, y, image::Rgba([255, 255, 255, 255]));
            }
        }
        let out = blend_edges(&source, 4);
        // Source-over with alpha 128/255 onto opaque black:
        // 255 * (128/255) is about 128.
        let top_center = out.get_pixel(6, 1).0;
        assert!(top_center[0].abs_diff(128) <= 1, "got {top_center:?}");
        assert_eq!(top_center[3], 255);
    }

    #[test]
    fn wrap_is_clamped_to_half_dimensions() {
        let source = RgbaImage::from_pixel(6, 6, image::Rgba([50, 50, 50, 255]));
        // Requesting an oversized wrap must not panic or read out of
        // bounds; with a uniform image the result is unchanged.
        assert_eq!(blend_edges(&source, 1000), source);
    }

    #[test]
    fn output_is_a_new_buffer() {
        let source = RgbaImage::from_pixel(8, 8, image::Rgba([1, 2, 3, 255]));
        let out = blend_edges(&source, 2);
        assert_eq!(out.dimensions(), source.dimensions());
        // The source itself is never mutated.
        for p in source.pixels() {
            assert_eq!(p.0, [1, 2, 3, 255]);
        }
    }
}
