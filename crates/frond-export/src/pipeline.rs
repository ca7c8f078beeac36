//! Export pipeline: render every present layer and drive a sink.
//!
//! Export always composites each layer independently (combined-preview
//! masking is a display concern, never an export one) and names files
//! `{base}_{layer}.png`. Layers are processed in the deterministic
//! [`LayerType`] declaration order so a remote failure point is
//! reproducible.

use frond_pipeline::{EditSession, LayerType, RgbaImage};

use crate::png::encode_png;
use crate::sink::{RemoteSink, SaveSink, SinkError};

/// Errors raised by a remote export attempt.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// PNG encoding failed for one layer.
    #[error("PNG encoding failed for {layer} layer: {source}")]
    PngEncode {
        /// The offending layer.
        layer: LayerType,
        /// The underlying encoder error.
        source: image::ImageError,
    },

    /// The remote endpoint failed a submission. Layers delivered
    /// earlier in the attempt stay persisted; later layers were never
    /// submitted.
    #[error("remote persistence failed for {layer} layer: {source}")]
    RemoteUpload {
        /// The offending layer.
        layer: LayerType,
        /// Layers already delivered in this attempt.
        delivered: Vec<LayerType>,
        /// The sink's failure.
        source: SinkError,
    },
}

/// Outcome of a local save attempt.
///
/// Local save failures are per-file: every layer is attempted and the
/// report lists both outcomes.
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Layers saved successfully.
    pub saved: Vec<LayerType>,
    /// Layers that failed, with the reason.
    pub failed: Vec<(LayerType, SinkError)>,
}

impl ExportReport {
    /// Returns `true` if every attempted layer was saved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The export file name for one layer: `{base}_{token}.png`.
#[must_use]
pub fn export_file_name(base_name: &str, layer: LayerType) -> String {
    format!("{base_name}_{}.png", layer.token())
}

/// Render one full output buffer per layer type present in the atlas.
///
/// Buffers come back in [`LayerType`] declaration order. Without a
/// loaded atlas there is nothing to export and the list is empty.
#[must_use]
pub fn render_all(session: &mut EditSession) -> Vec<(LayerType, RgbaImage)> {
    let layers: Vec<LayerType> = session
        .atlas()
        .map(|atlas| atlas.layer_types().collect())
        .unwrap_or_default();

    layers
        .into_iter()
        .map(|layer| (layer, session.render(layer, false)))
        .collect()
}

/// Save every rendered layer through a client-local sink.
///
/// Failures (encoding or sink) are per-file and do not block the
/// remaining files.
pub fn save_local(
    rendered: &[(LayerType, RgbaImage)],
    base_name: &str,
    sink: &mut dyn SaveSink,
) -> ExportReport {
    let mut report = ExportReport::default();
    for (layer, buffer) in rendered {
        let file_name = export_file_name(base_name, *layer);
        let result = encode_png(buffer)
            .map_err(|e| SinkError::new(e.to_string()))
            .and_then(|bytes| sink.save(&file_name, &bytes));
        match result {
            Ok(()) => report.saved.push(*layer),
            Err(err) => {
                log::warn!("local save of {file_name} failed: {err}");
                report.failed.push((*layer, err));
            }
        }
    }
    report
}

/// Submit every rendered layer to a remote persistence endpoint,
/// strictly sequentially.
///
/// One submission completes before the next starts; the first failure
/// aborts the attempt. Returns the delivered layers on success.
///
/// # Errors
///
/// Returns [`ExportError::PngEncode`] or [`ExportError::RemoteUpload`]
/// identifying the layer at which the attempt stopped; already-delivered
/// layers are listed in the error and are not rolled back.
pub fn persist_remote(
    rendered: &[(LayerType, RgbaImage)],
    base_name: &str,
    folder: &str,
    sink: &mut dyn RemoteSink,
) -> Result<Vec<LayerType>, ExportError> {
    let mut delivered = Vec::new();
    for (layer, buffer) in rendered {
        let file_name = export_file_name(base_name, *layer);
        let bytes = encode_png(buffer).map_err(|source| ExportError::PngEncode {
            layer: *layer,
            source,
        })?;
        sink.put(folder, &file_name, &bytes)
            .map_err(|source| ExportError::RemoteUpload {
                layer: *layer,
                delivered: delivered.clone(),
                source,
            })?;
        log::info!("persisted {folder}/{file_name}");
        delivered.push(*layer);
    }
    Ok(delivered)
}
