use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("source is not open")]
    NotOpen,
    #[error("decode failure: {0}")]
    Decode(String),
}

/// Supplies raw frames to one ingestion pipeline.
///
/// `Ok(None)` means no frame is available right now (end of stream, camera
/// not ready); the pipeline skips the tick and asks again later. Errors are
/// likewise transient from the pipeline's point of view and never fatal.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;
}
