//! Compositor: render one full output buffer per layer type by
//! alpha-compositing every placed instance in z-order.
//!
//! A pure function from (crops, placements, parameters) to a newly
//! materialized buffer; the canvas is never shared or mutated in place
//! across calls, so results are reproducible and comparable by value.
//!
//! Instances whose source id does not resolve to a crop are skipped
//! silently; dangling references are a normal state after
//! re-detection, not an error.

use image::Rgba;

use crate::extract::ExtractedLeafSet;
use crate::placement::{LeafTransform, PlacedLeaf};
use crate::types::{Dimensions, LayerType, RgbaImage};

/// Neutral "pointing up" tangent-space normal, used as the background
/// for normal layers so uncovered output pixels stay flat.
pub const NEUTRAL_NORMAL: Rgba<u8> = Rgba([128, 128, 255, 255]);

/// Fully transparent background for every non-normal layer.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// The background a layer's canvas is cleared to before drawing.
#[must_use]
pub const fn background_color(layer: LayerType) -> Rgba<u8> {
    if layer.is_normal() {
        NEUTRAL_NORMAL
    } else {
        TRANSPARENT
    }
}

/// Standard source-over alpha compositing of straight-alpha pixels.
#[must_use]
pub fn blend_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    if src.0[3] == 0 {
        return dst;
    }
    if src.0[3] == 255 || dst.0[3] == 0 {
        return src;
    }

    let sa = f32::from(src.0[3]) / 255.0;
    let da = f32::from(dst.0[3]) / 255.0;
    let oa = sa + da * (1.0 - sa);

    let mut out = [0u8; 4];
    for c in 0..3 {
        let sc = f32::from(src.0[c]);
        let dc = f32::from(dst.0[c]);
        let blended = sc.mul_add(sa, dc * da * (1.0 - sa)) / oa;
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            out[c] = blended.round().clamp(0.0, 255.0) as u8;
        }
    }
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        out[3] = (oa * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

/// Multiply a Color alpha sample by an Opacity red sample,
/// `round(a * r / 255)`.
#[must_use]
pub const fn mask_alpha(color_alpha: u8, opacity_red: u8) -> u8 {
    // (x + 127) / 255 equals round(x / 255) for every integer x in range.
    #[expect(clippy::cast_possible_truncation)]
    {
        ((color_alpha as u32 * opacity_red as u32 + 127) / 255) as u8
    }
}

/// Synthesize the combined-preview buffer: the Color crop with its
/// alpha multiplied sample-wise by the Opacity crop's red channel.
///
/// The two crops come from the same bounds and padding, so their
/// dimensions match; if they somehow do not, the Color crop is
/// returned unmodified.
#[must_use]
pub fn masked_color(color: &RgbaImage, opacity: &RgbaImage) -> RgbaImage {
    if color.dimensions() != opacity.dimensions() {
        return color.clone();
    }
    RgbaImage::from_fn(color.width(), color.height(), |x, y| {
        let c = color.get_pixel(x, y).0;
        let r = opacity.get_pixel(x, y).0[0];
        Rgba([c[0], c[1], c[2], mask_alpha(c[3], r)])
    })
}

/// Draw one crop onto the canvas with the given transform.
///
/// The crop is centered on `(t.x, t.y)`, rotated by `t.rotation`
/// degrees, and scaled uniformly by `t.scale`; flips are sign
/// inversions of the corresponding local axis (they commute with the
/// uniform scale, so the effective per-axis factors are
/// `scale * -1` when flipped). Rasterization inverse-maps each covered canvas pixel
/// center back into crop space and samples nearest-neighbor, blending
/// source-over.
pub fn draw_instance(canvas: &mut RgbaImage, crop: &RgbaImage, t: &LeafTransform) {
    let (crop_w, crop_h) = (f64::from(crop.width()), f64::from(crop.height()));
    if crop_w == 0.0 || crop_h == 0.0 {
        return;
    }
    let half_w = crop_w / 2.0;
    let half_h = crop_h / 2.0;

    let sx = t.scale * if t.flip_x { -1.0 } else { 1.0 };
    let sy = t.scale * if t.flip_y { -1.0 } else { 1.0 };
    let theta = t.rotation.to_radians();
    let (sin, cos) = theta.sin_cos();

    // Forward-transform the crop corners to bound the raster loop.
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for (cu, cv) in [(-half_w, -half_h), (half_w, -half_h), (-half_w, half_h), (half_w, half_h)] {
        let lx = sx * cu;
        let ly = sy * cv;
        let px = cos.mul_add(lx, -sin * ly) + t.x;
        let py = sin.mul_add(lx, cos * ly) + t.y;
        min_x = min_x.min(px);
        min_y = min_y.min(py);
        max_x = max_x.max(px);
        max_y = max_y.max(py);
    }

    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let x0 = min_x.floor().max(0.0) as u32;
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let y0 = min_y.floor().max(0.0) as u32;
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let x1 = (max_x.ceil().max(0.0) as u32).min(canvas.width());
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let y1 = (max_y.ceil().max(0.0) as u32).min(canvas.height());

    for py in y0..y1 {
        for px in x0..x1 {
            let dx = f64::from(px) + 0.5 - t.x;
            let dy = f64::from(py) + 0.5 - t.y;
            // Inverse rotation, then inverse per-axis scale.
            let rx = cos.mul_add(dx, sin * dy);
            let ry = (-sin).mul_add(dx, cos * dy);
            let u = rx / sx + half_w;
            let v = ry / sy + half_h;
            if u < 0.0 || u >= crop_w || v < 0.0 || v >= crop_h {
                continue;
            }
            #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let (cu, cv) = (u as u32, v as u32);
            let src = *crop.get_pixel(cu, cv);
            if src.0[3] == 0 {
                continue;
            }
            let dst = *canvas.get_pixel(px, py);
            canvas.put_pixel(px, py, blend_over(dst, src));
        }
    }
}

/// Render one full output buffer for a layer type.
///
/// Clears the canvas to the layer's background, then draws every
/// placed instance in array order (bottom to top). Instances whose
/// source crop is missing are skipped entirely.
///
/// In combined-preview mode the Color layer is drawn pre-masked by the
/// corresponding Opacity crop (see [`masked_color`]); every other
/// layer, and every export render, composites independently.
#[must_use]
pub fn composite(
    layer: LayerType,
    output: Dimensions,
    placements: &[PlacedLeaf],
    leaves: &ExtractedLeafSet,
    combined_preview: bool,
) -> RgbaImage {
    let mut canvas =
        RgbaImage::from_pixel(output.width, output.height, background_color(layer));

    for placed in placements {
        let Some(crop) = leaves.get(placed.source_id, layer) else {
            continue;
        };

        if combined_preview
            && layer == LayerType::Color
            && let Some(opacity) = leaves.get(placed.source_id, LayerType::Opacity)
        {
            let masked = masked_color(crop, opacity);
            draw_instance(&mut canvas, &masked, &placed.transform);
            continue;
        }
        draw_instance(&mut canvas, crop, &placed.transform);
    }
    canvas
}
