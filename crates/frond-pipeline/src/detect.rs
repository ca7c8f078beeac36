//! Leaf detection: binarize an opacity signal and extract connected
//! components as candidate leaf bounds.
//!
//! The opacity signal comes from a dedicated Opacity layer (its red
//! channel; opacity maps are authored as grayscale) or, absent that,
//! from the Color layer's alpha channel. Components are labeled with
//! 4-connectivity; diagonal touches do not merge leaves.
//!
//! Determinism is a hard contract: identical inputs always yield a
//! bit-identical ordered [`LeafBounds`] list. Ids are assigned in the
//! order components are first encountered by a row-major scan.

use image::Luma;
use imageproc::region_labelling::{Connectivity, connected_components};
use serde::{Deserialize, Serialize};

use crate::atlas::AtlasModel;
use crate::types::{DetectError, DetectParams, GrayImage, LayerType, LeafBounds};

/// Where the opacity signal was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpacitySource {
    /// Red channel of a dedicated Opacity layer.
    OpacityLayer,
    /// Alpha channel of the Color layer (used only when it actually
    /// varies; a fully opaque Color layer carries no signal).
    ColorAlpha,
}

/// Derive the single-channel opacity signal for an atlas.
///
/// Prefers a dedicated Opacity layer; otherwise falls back to the Color
/// layer's alpha channel when any alpha sample is below full opacity.
///
/// # Errors
///
/// Returns [`DetectError::NoOpacityData`] when neither source is usable.
/// This is distinct from a detection pass that finds zero leaves, which
/// is a normal empty result.
pub fn opacity_signal(atlas: &AtlasModel) -> Result<(GrayImage, OpacitySource), DetectError> {
    if let Some(opacity) = atlas.layer(LayerType::Opacity) {
        let mask = GrayImage::from_fn(opacity.width(), opacity.height(), |x, y| {
            Luma([opacity.get_pixel(x, y).0[0]])
        });
        return Ok((mask, OpacitySource::OpacityLayer));
    }

    if let Some(color) = atlas.layer(LayerType::Color)
        && color.pixels().any(|p| p.0[3] < 255)
    {
        let mask = GrayImage::from_fn(color.width(), color.height(), |x, y| {
            Luma([color.get_pixel(x, y).0[3]])
        });
        return Ok((mask, OpacitySource::ColorAlpha));
    }

    Err(DetectError::NoOpacityData)
}

/// Binarize the opacity signal against the detection threshold.
///
/// A pixel is foreground (255) iff its sample is strictly greater than
/// `threshold`.
#[must_use]
pub fn binarize(mask: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        if mask.get_pixel(x, y).0[0] > threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Per-component accumulator used during the row-major stats pass.
struct ComponentStats {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    area: u32,
}

/// Detect leaf bounds in an opacity signal.
///
/// Binarizes against `params.threshold`, labels connected components
/// with 4-connectivity, computes each component's tight bounding box
/// and pixel count in a single row-major pass, discards components
/// smaller than `params.min_area`, and numbers the survivors `0..k` in
/// first-encounter order.
///
/// Runs in O(pixels) time and auxiliary memory. Finding nothing is a
/// valid empty result, not an error.
#[must_use]
pub fn detect(mask: &GrayImage, params: &DetectParams) -> Vec<LeafBounds> {
    let binary = binarize(mask, params.threshold);
    let labels = connected_components(&binary, Connectivity::Four, Luma([0u8]));

    // Map each label to a dense first-encounter index. Labels from the
    // union-find pass carry no ordering guarantee of their own, so the
    // output order comes from this row-major scan, never from label
    // values.
    let mut order: Vec<u32> = Vec::new();
    let mut stats: std::collections::HashMap<u32, ComponentStats> =
        std::collections::HashMap::new();

    for (x, y, pixel) in labels.enumerate_pixels() {
        let label = pixel.0[0];
        if label == 0 {
            continue;
        }
        stats
            .entry(label)
            .and_modify(|s| {
                s.min_x = s.min_x.min(x);
                s.min_y = s.min_y.min(y);
                s.max_x = s.max_x.max(x);
                s.max_y = s.max_y.max(y);
                s.area += 1;
            })
            .or_insert_with(|| {
                order.push(label);
                ComponentStats {
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                    area: 1,
                }
            });
    }

    let mut leaves = Vec::new();
    for label in order {
        let Some(s) = stats.get(&label) else {
            continue;
        };
        if s.area < params.min_area {
            continue;
        }
        #[expect(clippy::cast_possible_truncation)]
        let id = leaves.len() as u32;
        leaves.push(LeafBounds {
            id,
            x: s.min_x,
            y: s.min_y,
            width: s.max_x - s.min_x + 1,
            height: s.max_y - s.min_y + 1,
            area: s.area,
        });
    }
    leaves
}
