use std::path::PathBuf;

use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("i/o failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode image for {path}: {message}")]
    Encode { path: PathBuf, message: String },
    #[error("failed to decode image {path}: {message}")]
    Decode { path: PathBuf, message: String },
}

/// Persistent, append-only blob store for face evidence.
///
/// The catalog never sees the storage layout; it only relies on writes
/// returning a stable path or signaling failure, never dropping silently.
pub trait EvidenceStore: Send + Sync {
    /// Writes a face image into the event trail of an identity.
    fn write_event(
        &self,
        identity: &str,
        source_id: &str,
        time: &str,
        face: &Frame,
    ) -> Result<String, StorageError>;

    /// Writes a face image into the identity's permanent sample folder.
    fn write_identity_sample(&self, identity: &str, face: &Frame) -> Result<String, StorageError>;

    /// Writes a point-in-time full-frame capture for a source, for audit.
    fn write_source_capture(
        &self,
        source_id: &str,
        time: &str,
        frame: &Frame,
    ) -> Result<String, StorageError>;

    /// Enumerates every persisted identity, for the catalog bootstrap.
    fn list_identities(&self) -> Result<Vec<String>, StorageError>;

    /// Loads the raw stored sample images of one identity, with their paths.
    fn list_sample_images(&self, identity: &str) -> Result<Vec<(Frame, String)>, StorageError>;
}
