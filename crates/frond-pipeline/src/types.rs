//! Shared types for the frond leaf detection and compositing engine.

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can reference layer and
/// output buffers without depending on `image` directly.
pub use image::RgbaImage;

/// Re-export `GrayImage` so downstream crates can reference the
/// single-channel opacity mask without depending on `image` directly.
pub use image::GrayImage;

/// Semantic role of one texture layer within an atlas.
///
/// This is a closed set: compositing backgrounds and export naming
/// `match` on it exhaustively, so adding a new role means adding a
/// variant, not registering a string key.
///
/// The declaration order defines the deterministic layer order used by
/// atlas iteration and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LayerType {
    /// Base color (albedo), possibly carrying cutout alpha.
    Color,
    /// Grayscale opacity mask authored as an RGB image (red = value).
    Opacity,
    /// Tangent-space normal map, OpenGL convention (+Y up).
    NormalGl,
    /// Tangent-space normal map, DirectX convention (-Y up).
    NormalDx,
    /// Roughness map.
    Roughness,
    /// Metalness map.
    Metalness,
    /// Ambient occlusion map.
    AmbientOcclusion,
}

impl LayerType {
    /// All layer types in deterministic (declaration) order.
    pub const ALL: [Self; 7] = [
        Self::Color,
        Self::Opacity,
        Self::NormalGl,
        Self::NormalDx,
        Self::Roughness,
        Self::Metalness,
        Self::AmbientOcclusion,
    ];

    /// Canonical lowercase token used when generating export file names
    /// (`{base}_{token}.png`).
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Opacity => "opacity",
            Self::NormalGl => "normalgl",
            Self::NormalDx => "normaldx",
            Self::Roughness => "roughness",
            Self::Metalness => "metalness",
            Self::AmbientOcclusion => "ao",
        }
    }

    /// Map a lowercase file-name suffix token to a layer type.
    ///
    /// This is the fixed recognition table for ingesting raw source
    /// files; several aliases map to the same variant (e.g. `albedo`
    /// and `basecolor` are both [`Color`](Self::Color)).
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "color" | "albedo" | "basecolor" | "diffuse" => Some(Self::Color),
            "opacity" | "alpha" => Some(Self::Opacity),
            "normalgl" | "normal" => Some(Self::NormalGl),
            "normaldx" => Some(Self::NormalDx),
            "roughness" | "rough" => Some(Self::Roughness),
            "metalness" | "metallic" | "metal" => Some(Self::Metalness),
            "ao" | "ambientocclusion" | "occlusion" => Some(Self::AmbientOcclusion),
            _ => None,
        }
    }

    /// Whether this layer encodes a tangent-space normal map.
    ///
    /// Normal layers get the neutral "pointing up" compositing
    /// background instead of transparency.
    #[must_use]
    pub const fn is_normal(self) -> bool {
        matches!(self, Self::NormalGl | Self::NormalDx)
    }
}

impl std::fmt::Display for LayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Square dimensions of the given side length.
    #[must_use]
    pub const fn square(size: u32) -> Self {
        Self {
            width: size,
            height: size,
        }
    }
}

/// Axis-aligned bounding box of one detected leaf, in atlas pixel space.
///
/// Produced by [`detect`](crate::detect::detect); a full detection pass
/// replaces the previous list wholesale. Ids are assigned in row-major
/// first-encounter order and are **not** stable across re-detection with
/// different parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafBounds {
    /// Id unique within one detection pass.
    pub id: u32,
    /// Left edge in atlas pixels.
    pub x: u32,
    /// Top edge in atlas pixels.
    pub y: u32,
    /// Box width in pixels (at least 1).
    pub width: u32,
    /// Box height in pixels (at least 1).
    pub height: u32,
    /// Foreground pixel count of the underlying component.
    pub area: u32,
}

/// Parameters for leaf detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectParams {
    /// Binarization threshold: a pixel is foreground iff its opacity
    /// sample is strictly greater than this value. Valid range 1..=255.
    pub threshold: u8,
    /// Minimum component pixel count; smaller components are discarded
    /// as noise.
    pub min_area: u32,
}

impl DetectParams {
    /// Default binarization threshold.
    pub const DEFAULT_THRESHOLD: u8 = 128;
    /// Default minimum component area in pixels.
    pub const DEFAULT_MIN_AREA: u32 = 16;

    /// Create parameters, clamping `threshold` into its valid range
    /// (a threshold of 0 would classify fully transparent pixels as
    /// foreground).
    #[must_use]
    pub const fn new(threshold: u8, min_area: u32) -> Self {
        let threshold = if threshold == 0 { 1 } else { threshold };
        Self {
            threshold,
            min_area,
        }
    }
}

impl Default for DetectParams {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            min_area: Self::DEFAULT_MIN_AREA,
        }
    }
}

/// Errors that can occur while loading an atlas.
///
/// All variants are recoverable: the operator may retry with a
/// different file set, and a failed load never corrupts existing
/// session state.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// No file in the batch matched a recognized layer-name suffix.
    #[error("no recognized texture layers in the source batch")]
    NoLayersRecognized,

    /// Failed to decode one of the recognized source files.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// Two layers in the batch decoded to different dimensions.
    #[error(
        "layer {layer} is {found:?} but earlier layers are {expected:?}; \
         all atlas layers must share dimensions"
    )]
    MismatchedDimensions {
        /// The offending layer.
        layer: LayerType,
        /// Dimensions established by earlier layers in the batch.
        expected: Dimensions,
        /// Dimensions of the offending layer.
        found: Dimensions,
    },

    /// No opacity signal is derivable from the loaded layers.
    #[error(transparent)]
    NoOpacityData(#[from] DetectError),

    /// A load was requested while a previous load was still pending.
    #[error("a load is already in progress")]
    Busy,
}

/// Errors that can occur while deriving the opacity signal.
///
/// Finding zero leaves is a normal empty result, not an error; this
/// only covers the case where no usable signal exists at all.
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    /// The atlas has no Opacity layer and its Color layer (if any)
    /// carries no alpha variation.
    #[error("no opacity data: no Opacity layer and no usable Color alpha channel")]
    NoOpacityData,
}
