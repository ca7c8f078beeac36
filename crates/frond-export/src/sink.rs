//! Persistence sinks: where encoded texture files end up.
//!
//! The export pipeline only knows two narrow interfaces: a client-local
//! save mechanism and a remote object-storage endpoint. Both are
//! external collaborators; this module defines their contracts and one
//! filesystem implementation for native hosts.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A sink call failure, as reported by whatever backs the sink.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct SinkError(String);

impl SinkError {
    /// Create a sink error from any message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        Self(err.to_string())
    }
}

/// Client-local file save.
///
/// One call per file; failures are per-file and independent, so the
/// export pipeline keeps going after a failed save.
pub trait SaveSink {
    /// Deliver one encoded file to local storage.
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] describing why this file could not be
    /// saved; other files are unaffected.
    fn save(&mut self, file_name: &str, bytes: &[u8]) -> Result<(), SinkError>;
}

/// Remote persistence endpoint.
///
/// Accepts one file per call, addressed by folder and file name. There
/// is no batch call and no cancellation: the export pipeline submits
/// strictly sequentially and stops at the first failure.
pub trait RemoteSink {
    /// Submit one encoded file to the endpoint.
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] when the endpoint rejects or fails the
    /// call. Files already delivered in the same attempt stay
    /// delivered; there is no rollback.
    fn put(&mut self, folder: &str, file_name: &str, bytes: &[u8]) -> Result<(), SinkError>;
}

/// [`SaveSink`] writing into a local directory.
///
/// The directory is created on first use.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Create a sink that writes into `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The target directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SaveSink for DirectorySink {
    fn save(&mut self, file_name: &str, bytes: &[u8]) -> Result<(), SinkError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        let mut file = fs::File::create(&path)?;
        file.write_all(bytes)?;
        log::debug!("saved {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}
