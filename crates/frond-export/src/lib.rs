//! frond-export: export pipeline and persistence sinks.
//!
//! Renders every layer of a composition through the pure pipeline,
//! encodes the results as PNG, and delivers them to a client-local save
//! sink or a remote persistence endpoint.

pub mod pipeline;
pub mod png;
pub mod sink;

pub use pipeline::{ExportError, ExportReport, export_file_name, persist_remote, render_all, save_local};
pub use png::encode_png;
pub use sink::{DirectorySink, RemoteSink, SaveSink, SinkError};
