//! frond-pipeline: Pure leaf detection and compositing engine (sans-IO).
//!
//! Turns an irregular foliage atlas (aligned color/opacity/normal/...
//! texture layers) into a recomposed output through:
//! atlas load -> opacity signal -> leaf detection -> region extraction
//! -> placement editing -> per-layer compositing -> optional seam
//! blending.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and pixel buffers and returns structured data. File and
//! network interaction lives in `frond-export` and the CLI host.

pub mod atlas;
pub mod composite;
pub mod detect;
pub mod extract;
pub mod placement;
pub mod session;
pub mod tile;
pub mod types;

pub use atlas::{AtlasModel, SourceFile};
pub use detect::OpacitySource;
pub use extract::ExtractedLeafSet;
pub use placement::{LeafTransform, PlacedLeaf, PlacementModel, TransformPatch};
pub use session::EditSession;
pub use types::{
    DetectError, DetectParams, Dimensions, GrayImage, LayerType, LeafBounds, LoadError, RgbaImage,
};
