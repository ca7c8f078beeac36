//! Region extraction: padded, clamped crops of per-layer pixel data,
//! and the lazy per-leaf crop cache.
//!
//! Extraction never fabricates pixels: when the padded box would fall
//! outside the source, the crop shrinks to the clamped intersection
//! instead of synthesizing border data.

use std::collections::{BTreeMap, HashMap};

use crate::atlas::AtlasModel;
use crate::types::{LayerType, LeafBounds, RgbaImage};

/// Crop a leaf's padded sub-buffer out of one layer.
///
/// The bounds are expanded by `padding` pixels on every side, then
/// clamped to the source rectangle: the origin never goes negative and
/// the extent never exceeds the source dimensions. Pixels are copied
/// verbatim. Bounds lying entirely outside the source yield an empty
/// crop.
#[must_use]
pub fn extract_region(source: &RgbaImage, bounds: &LeafBounds, padding: u32) -> RgbaImage {
    let x1 = bounds
        .x
        .saturating_add(bounds.width)
        .saturating_add(padding)
        .min(source.width());
    let y1 = bounds
        .y
        .saturating_add(bounds.height)
        .saturating_add(padding)
        .min(source.height());
    let x0 = bounds.x.saturating_sub(padding).min(x1);
    let y0 = bounds.y.saturating_sub(padding).min(y1);

    image::imageops::crop_imm(source, x0, y0, x1 - x0, y1 - y0).to_image()
}

/// Lazily filled cache of per-leaf, per-layer crops.
///
/// Keyed by [`LeafBounds::id`] from the detection pass that produced the
/// bounds. The cache is invalidated when the atlas is replaced, but
/// deliberately **not** when detection parameters change and ids are
/// renumbered. Stale entries resolve to old crops until refilled.
#[derive(Debug, Default)]
pub struct ExtractedLeafSet {
    padding: u32,
    entries: HashMap<u32, BTreeMap<LayerType, RgbaImage>>,
}

impl ExtractedLeafSet {
    /// Create an empty cache that extracts with the given padding.
    #[must_use]
    pub fn new(padding: u32) -> Self {
        Self {
            padding,
            entries: HashMap::new(),
        }
    }

    /// The padding applied around every extracted crop.
    #[must_use]
    pub const fn padding(&self) -> u32 {
        self.padding
    }

    /// Look up a cached crop without extracting.
    #[must_use]
    pub fn get(&self, leaf_id: u32, layer: LayerType) -> Option<&RgbaImage> {
        self.entries.get(&leaf_id)?.get(&layer)
    }

    /// Extract and cache one leaf's crop for one layer, if the atlas
    /// carries that layer. Already-cached crops are left untouched.
    pub fn ensure(&mut self, atlas: &AtlasModel, bounds: &LeafBounds, layer: LayerType) {
        let per_leaf = self.entries.entry(bounds.id).or_default();
        if per_leaf.contains_key(&layer) {
            return;
        }
        if let Some(source) = atlas.layer(layer) {
            per_leaf.insert(layer, extract_region(source, bounds, self.padding));
        }
    }

    /// Extract and cache one leaf's crops for every layer the atlas has.
    pub fn ensure_all_layers(&mut self, atlas: &AtlasModel, bounds: &LeafBounds) {
        for layer in atlas.layer_types().collect::<Vec<_>>() {
            self.ensure(atlas, bounds, layer);
        }
    }

    /// Insert a crop directly, bypassing extraction. Test support for
    /// building caches without a backing atlas.
    #[cfg(test)]
    pub(crate) fn insert_for_test(&mut self, leaf_id: u32, layer: LayerType, crop: RgbaImage) {
        self.entries.entry(leaf_id).or_default().insert(layer, crop);
    }

    /// Drop every cached crop. Called when the atlas is replaced.
    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    /// Number of leaves with at least one cached crop.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.entries.len()
    }
}
