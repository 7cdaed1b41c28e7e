use crate::shared::frame::Frame;

/// Domain interface for face detection.
///
/// Implementations return square face crops already rescaled to the
/// embedder's input size. An empty result is a valid outcome, not an error.
///
/// `&self` with interior mutability where needed: one detector instance is
/// shared between the source pipelines, the catalog loader, and the intake
/// sweep.
pub trait FaceDetector: Send + Sync {
    /// All faces found in the frame, in detection-confidence order.
    fn detect_all(&self, frame: &Frame) -> Result<Vec<Frame>, Box<dyn std::error::Error>>;

    /// The most confident face, used to align stored and uploaded photos.
    fn detect_first(&self, frame: &Frame) -> Result<Option<Frame>, Box<dyn std::error::Error>>;
}
