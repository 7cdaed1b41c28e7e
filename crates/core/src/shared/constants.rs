pub const DETECTOR_MODEL_NAME: &str = "yolov8n-face.onnx";
pub const DETECTOR_MODEL_URL: &str =
    "https://github.com/sightline-id/models/releases/download/v0.1.0/yolov8n-face.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/sightline-id/models/releases/download/v0.1.0/w600k_r50.onnx";

/// ArcFace input resolution; face crops are stored at this size.
pub const FACE_CROP_SIZE: u32 = 112;

/// Soft bound on stored samples per identity. New samples are rejected at
/// the bound; no eviction takes place.
pub const DEFAULT_MAX_SAMPLES: usize = 5;

/// Minimum similarity for a probe to be accepted as a recognized match.
pub const DEFAULT_VALIDATION_THRESHOLD: f32 = 0.5;

/// Clamp bounds for per-source detector resolution.
pub const MIN_DETECTOR_SIZE: u32 = 128;
pub const MAX_DETECTOR_SIZE: u32 = 2048;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
