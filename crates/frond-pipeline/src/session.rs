//! Edit session: single-owner wiring of the pipeline stages.
//!
//! A session owns the loaded atlas, the detection parameters and their
//! current results, the lazy crop cache, and the placement model. State
//! changes flow through an explicit pipeline instead of ad hoc
//! callbacks: replacing the atlas re-runs detection and drops the crop
//! cache; changing detection parameters re-runs detection only; crops
//! are extracted lazily on the next render.
//!
//! Loading is the only operation a host may want to run off-thread; the
//! session exposes a single `busy` flag and rejects overlapping loads
//! rather than interleaving them. A host that calls `load_atlas`
//! synchronously never observes the flag set: it is raised and cleared
//! within the call, and only matters to hosts that drive a load across
//! suspension points (decode on a worker, report progress, then commit).

use crate::atlas::{AtlasModel, SourceFile};
use crate::composite::composite;
use crate::detect::{OpacitySource, detect, opacity_signal};
use crate::extract::ExtractedLeafSet;
use crate::placement::PlacementModel;
use crate::types::{DetectParams, Dimensions, GrayImage, LayerType, LeafBounds, LoadError, RgbaImage};

/// Default output canvas side length in pixels.
pub const DEFAULT_OUTPUT_SIZE: u32 = 1024;

/// Default crop padding in pixels.
pub const DEFAULT_PADDING: u32 = 2;

/// One active edit session over an atlas and its composition.
#[derive(Debug)]
pub struct EditSession {
    atlas: Option<AtlasModel>,
    params: DetectParams,
    opacity_mask: Option<GrayImage>,
    opacity_source: Option<OpacitySource>,
    leaves: Vec<LeafBounds>,
    extracted: ExtractedLeafSet,
    placements: PlacementModel,
    output_size: u32,
    busy: bool,
}

impl EditSession {
    /// Create an empty session with the given output canvas size and
    /// crop padding.
    #[must_use]
    pub fn new(output_size: u32, padding: u32) -> Self {
        Self {
            atlas: None,
            params: DetectParams::default(),
            opacity_mask: None,
            opacity_source: None,
            leaves: Vec::new(),
            extracted: ExtractedLeafSet::new(padding),
            placements: PlacementModel::new(),
            output_size,
            busy: false,
        }
    }

    /// Load a new atlas from a batch of source files, replacing any
    /// previous one wholesale.
    ///
    /// On success the detection pass is re-run with the current
    /// parameters and the crop cache is dropped. Placements are kept:
    /// instances whose source id no longer resolves are skipped at
    /// render time. On failure the existing session state is untouched.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Busy`] when a load is already in progress,
    /// and otherwise any [`LoadError`] from atlas construction or
    /// opacity-signal derivation.
    pub fn load_atlas(&mut self, base_name: &str, files: &[SourceFile]) -> Result<(), LoadError> {
        if self.busy {
            return Err(LoadError::Busy);
        }
        self.busy = true;
        let result = self.load_inner(base_name, files);
        self.busy = false;
        result
    }

    fn load_inner(&mut self, base_name: &str, files: &[SourceFile]) -> Result<(), LoadError> {
        let atlas = AtlasModel::from_source_files(base_name, files)?;
        let (mask, source) = opacity_signal(&atlas)?;
        let leaves = detect(&mask, &self.params);
        log::info!(
            "loaded atlas {:?}: {} layers, {} leaves (opacity from {source:?})",
            atlas.base_name(),
            atlas.layer_count(),
            leaves.len(),
        );

        self.atlas = Some(atlas);
        self.opacity_mask = Some(mask);
        self.opacity_source = Some(source);
        self.leaves = leaves;
        self.extracted.invalidate();
        Ok(())
    }

    /// Replace the detection parameters and re-run detection.
    ///
    /// A new pass renumbers leaf ids. The crop cache is keyed by ids
    /// from the pass that filled it and is not dropped here; cache
    /// entries under renumbered ids keep resolving to the old crops,
    /// and placements whose id no longer appears in the cache or bounds
    /// list are skipped at render time.
    pub fn set_detect_params(&mut self, params: DetectParams) {
        self.params = params;
        if let Some(mask) = &self.opacity_mask {
            self.leaves = detect(mask, &self.params);
            log::debug!(
                "re-detected with threshold {} min_area {}: {} leaves",
                self.params.threshold,
                self.params.min_area,
                self.leaves.len(),
            );
        }
    }

    /// Place every currently detected leaf on the bulk-placement grid.
    pub fn place_all_detected(&mut self) -> Vec<u64> {
        let ids: Vec<u32> = self.leaves.iter().map(|l| l.id).collect();
        self.placements.add_bulk(&ids, self.output_size)
    }

    /// Render the output canvas for one layer type.
    ///
    /// Lazily extracts the crops the current placements need, then
    /// composites. Without a loaded atlas (or for a layer the atlas
    /// does not carry) this still succeeds and yields the layer's
    /// background; rendering is fail-soft throughout.
    pub fn render(&mut self, layer: LayerType, combined_preview: bool) -> RgbaImage {
        if let Some(atlas) = &self.atlas {
            for placed in self.placements.instances() {
                let Some(bounds) = self.leaves.iter().find(|l| l.id == placed.source_id) else {
                    continue;
                };
                self.extracted.ensure(atlas, bounds, layer);
                if combined_preview && layer == LayerType::Color {
                    self.extracted.ensure(atlas, bounds, LayerType::Opacity);
                }
            }
        }
        composite(
            layer,
            Dimensions::square(self.output_size),
            self.placements.instances(),
            &self.extracted,
            combined_preview,
        )
    }

    /// The loaded atlas, if any.
    #[must_use]
    pub const fn atlas(&self) -> Option<&AtlasModel> {
        self.atlas.as_ref()
    }

    /// Current detection parameters.
    #[must_use]
    pub const fn params(&self) -> DetectParams {
        self.params
    }

    /// Where the current opacity signal came from, if an atlas is loaded.
    #[must_use]
    pub const fn opacity_source(&self) -> Option<OpacitySource> {
        self.opacity_source
    }

    /// Leaf bounds from the most recent detection pass.
    #[must_use]
    pub fn leaves(&self) -> &[LeafBounds] {
        &self.leaves
    }

    /// The placement model, for reading.
    #[must_use]
    pub const fn placements(&self) -> &PlacementModel {
        &self.placements
    }

    /// The placement model, for operator edits.
    pub const fn placements_mut(&mut self) -> &mut PlacementModel {
        &mut self.placements
    }

    /// Output canvas side length in pixels.
    #[must_use]
    pub const fn output_size(&self) -> u32 {
        self.output_size
    }

    /// Whether a load is currently in progress.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.busy
    }
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_SIZE, DEFAULT_PADDING)
    }
}
