use crate::shared::embedding::Embedding;
use crate::shared::frame::Frame;

/// Domain interface for the face embedder.
///
/// Takes an aligned face crop and produces a fixed-dimension, L2-normalized
/// embedding, or fails for that crop alone.
pub trait FaceEmbedder: Send + Sync {
    fn embed(&self, face: &Frame) -> Result<Embedding, Box<dyn std::error::Error>>;
}
