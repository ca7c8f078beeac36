//! Atlas loading: recognize, decode, and validate a batch of layer files.
//!
//! A foliage atlas arrives as a batch of named raster files whose base
//! names end in a layer-type suffix (`birch_color.png`,
//! `birch-opacity.webp`, ...). This module owns the recognition table
//! lookup, decodes every recognized file to RGBA, and assembles the
//! immutable [`AtlasModel`].

use std::collections::BTreeMap;

use crate::types::{Dimensions, LayerType, LoadError, RgbaImage};

/// File extensions accepted as raster sources, matched case-insensitively.
///
/// Decoding itself is delegated to the `image` crate; the extension only
/// gates which files are considered at all.
pub const RASTER_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// One named source file from the ingest batch.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// File name, including extension (`birch_color.png`).
    pub name: String,
    /// Raw encoded file contents.
    pub bytes: Vec<u8>,
}

impl SourceFile {
    /// Create a new source file.
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Determine the layer type a file name describes, if any.
///
/// The name must carry a recognized raster extension, and its base name
/// must end with a recognized suffix token separated by `_` or `-`
/// (a base name that *is* a token, like `opacity.png`, also matches).
/// Matching is case-insensitive. Returns `None` for anything else;
/// unrecognized files are skipped silently during load.
#[must_use]
pub fn layer_type_for_name(name: &str) -> Option<LayerType> {
    let (base, ext) = name.rsplit_once('.')?;
    if !RASTER_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
        return None;
    }
    let token = base
        .rsplit(['_', '-'])
        .next()
        .unwrap_or(base)
        .to_ascii_lowercase();
    LayerType::from_token(&token)
}

/// One loaded set of aligned texture layers and their shared dimensions.
///
/// Constructed atomically from a batch of source files and immutable
/// afterwards; a new load replaces the whole model, never patches it.
/// Each [`LayerType`] is present at most once.
#[derive(Debug, Clone)]
pub struct AtlasModel {
    base_name: String,
    dimensions: Dimensions,
    layers: BTreeMap<LayerType, RgbaImage>,
}

impl AtlasModel {
    /// Build an atlas from a batch of named source files.
    ///
    /// Files whose names do not match the layer recognition table are
    /// skipped. When the same layer type appears more than once, the
    /// first occurrence wins. All decoded layers must share dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NoLayersRecognized`] if nothing in the batch
    /// matched, [`LoadError::ImageDecode`] if a recognized file fails to
    /// decode, and [`LoadError::MismatchedDimensions`] if layers
    /// disagree in size.
    pub fn from_source_files(
        base_name: impl Into<String>,
        files: &[SourceFile],
    ) -> Result<Self, LoadError> {
        let mut layers: BTreeMap<LayerType, RgbaImage> = BTreeMap::new();
        let mut dimensions: Option<Dimensions> = None;

        for file in files {
            let Some(layer) = layer_type_for_name(&file.name) else {
                log::debug!("skipping unrecognized source file {:?}", file.name);
                continue;
            };
            if layers.contains_key(&layer) {
                log::warn!(
                    "duplicate {layer} layer {:?} in batch; keeping the first",
                    file.name
                );
                continue;
            }

            let image = image::load_from_memory(&file.bytes)?.to_rgba8();
            let found = Dimensions::new(image.width(), image.height());
            match dimensions {
                None => dimensions = Some(found),
                Some(expected) if expected != found => {
                    return Err(LoadError::MismatchedDimensions {
                        layer,
                        expected,
                        found,
                    });
                }
                Some(_) => {}
            }
            layers.insert(layer, image);
        }

        let Some(dimensions) = dimensions else {
            return Err(LoadError::NoLayersRecognized);
        };

        Ok(Self {
            base_name: base_name.into(),
            dimensions,
            layers,
        })
    }

    /// The atlas base name, used for export file naming.
    #[must_use]
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Shared dimensions of every layer.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// The pixel buffer for one layer type, if present.
    #[must_use]
    pub fn layer(&self, layer: LayerType) -> Option<&RgbaImage> {
        self.layers.get(&layer)
    }

    /// Whether the given layer type is present.
    #[must_use]
    pub fn has_layer(&self, layer: LayerType) -> bool {
        self.layers.contains_key(&layer)
    }

    /// Present layer types in deterministic ([`LayerType`] declaration)
    /// order.
    pub fn layer_types(&self) -> impl Iterator<Item = LayerType> + '_ {
        self.layers.keys().copied()
    }

    /// Number of present layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}
