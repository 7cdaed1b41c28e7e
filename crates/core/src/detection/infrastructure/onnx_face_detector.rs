/// YOLO-family face detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, NMS post-processing, and
/// square crop extraction at the embedder's input size.
use std::path::Path;
use std::sync::Mutex;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::constants::FACE_CROP_SIZE;
use crate::shared::frame::Frame;

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default confidence threshold for face detection.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Letterbox padding color, YOLO convention.
const PAD_GRAY: f32 = 114.0 / 255.0;

pub struct OnnxFaceDetector {
    session: Mutex<ort::session::Session>,
    confidence: f64,
    input_size: u32,
    /// Frames longer than this on their longest side are downscaled before
    /// detection; the per-source resolution setting maps here.
    max_size: u32,
}

impl OnnxFaceDetector {
    /// Load a face detection ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting
    /// NCHW). Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(
        model_path: &Path,
        confidence: f64,
        max_size: u32,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?.commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    // shape is [N, C, H, W]; H and W are equal for square input
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!("face detector ready (input {input_size}, max frame side {max_size})");
        Ok(Self {
            session: Mutex::new(session),
            confidence,
            input_size,
            max_size,
        })
    }

    fn detect_boxes(&self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
        // Downscale oversized frames first; box coords are mapped back below.
        let longest = frame.width().max(frame.height());
        let (work, down) = if longest > self.max_size {
            let down = self.max_size as f64 / longest as f64;
            let w = ((frame.width() as f64 * down).round() as u32).max(1);
            let h = ((frame.height() as f64 * down).round() as u32).max(1);
            (resize_nearest(frame, w, h), down)
        } else {
            (frame.clone(), 1.0)
        };

        let lb = letterbox(&work, self.input_size);

        let input_value = ort::value::Tensor::from_array(lb.tensor)?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("detector model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape();
        if shape.len() != 3 {
            return Err(format!("unexpected detector output shape: {shape:?}").into());
        }
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        // Output is [1, num_features, num_detections] (transposed) or
        // [1, num_detections, num_features]. Handle both via an accessor.
        let transposed = shape[1] < shape[2];
        let (feats, dets) = if transposed {
            (shape[1], shape[2])
        } else {
            (shape[2], shape[1])
        };
        if feats < 5 {
            return Err(format!("detector rows carry only {feats} features").into());
        }
        let at = |det: usize, feat: usize| -> f64 {
            let idx = if transposed {
                feat * dets + det
            } else {
                det * feats + feat
            };
            data[idx] as f64
        };

        let mut boxes = Vec::new();
        for i in 0..dets {
            // row format: [cx, cy, w, h, conf, ...]
            let score = at(i, 4);
            if score < self.confidence {
                continue;
            }
            let (cx, cy) = (at(i, 0), at(i, 1));
            let (half_w, half_h) = (at(i, 2) / 2.0, at(i, 3) / 2.0);

            // Letterbox coords → work-frame coords → original frame coords.
            let unmap_x = |v: f64| (v - lb.pad_x as f64) / lb.scale / down;
            let unmap_y = |v: f64| (v - lb.pad_y as f64) / lb.scale / down;
            boxes.push(FaceBox {
                x1: unmap_x(cx - half_w),
                y1: unmap_y(cy - half_h),
                x2: unmap_x(cx + half_w),
                y2: unmap_y(cy + half_h),
                score,
            });
        }

        Ok(nms(boxes, NMS_IOU_THRESH))
    }
}

impl FaceDetector for OnnxFaceDetector {
    fn detect_all(&self, frame: &Frame) -> Result<Vec<Frame>, Box<dyn std::error::Error>> {
        let boxes = self.detect_boxes(frame)?;
        let crops = boxes
            .iter()
            .map(|b| extract_square_crop(frame, b, FACE_CROP_SIZE))
            .collect();
        Ok(crops)
    }

    fn detect_first(&self, frame: &Frame) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        // NMS output is confidence-sorted, so the first box is the best one.
        let boxes = self.detect_boxes(frame)?;
        Ok(boxes
            .first()
            .map(|b| extract_square_crop(frame, b, FACE_CROP_SIZE)))
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

struct Letterboxed {
    tensor: ndarray::Array4<f32>,
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

/// Letterbox-resize a frame to `target` x `target`: scale preserving aspect
/// ratio, center, pad the rest with gray.
fn letterbox(frame: &Frame, target: u32) -> Letterboxed {
    let scale = f64::min(
        target as f64 / frame.width() as f64,
        target as f64 / frame.height() as f64,
    );
    let scaled_w = (frame.width() as f64 * scale).round() as u32;
    let scaled_h = (frame.height() as f64 * scale).round() as u32;
    let pad_x = (target - scaled_w) / 2;
    let pad_y = (target - scaled_h) / 2;

    let side = target as usize;
    let mut tensor = ndarray::Array4::<f32>::from_elem((1, 3, side, side), PAD_GRAY);

    for y in 0..scaled_h as i64 {
        let src_y = (y as f64 / scale) as i64;
        for x in 0..scaled_w as i64 {
            let rgb = frame.pixel_clamped((x as f64 / scale) as i64, src_y);
            let ty = (pad_y as i64 + y) as usize;
            let tx = (pad_x as i64 + x) as usize;
            for (c, value) in rgb.iter().enumerate() {
                tensor[[0, c, ty, tx]] = *value as f32 / 255.0;
            }
        }
    }

    Letterboxed {
        tensor,
        scale,
        pad_x,
        pad_y,
    }
}

fn resize_nearest(frame: &Frame, width: u32, height: u32) -> Frame {
    let x_ratio = frame.width() as f64 / width as f64;
    let y_ratio = frame.height() as f64 / height as f64;

    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            let rgb = frame.pixel_clamped((x as f64 * x_ratio) as i64, (y as f64 * y_ratio) as i64);
            data.extend_from_slice(&rgb);
        }
    }
    Frame::new(data, width, height)
}

/// Cut a square crop around a detection and rescale it to `size`.
///
/// The box's shorter dimension is grown symmetrically to match the longer
/// one, the way the stored identity photos are framed; pixels past the
/// frame borders repeat the edge.
fn extract_square_crop(frame: &Frame, face: &FaceBox, size: u32) -> Frame {
    let side = f64::max(face.x2 - face.x1, face.y2 - face.y1).max(1.0);
    let left = (face.x1 + face.x2 - side) / 2.0;
    let top = (face.y1 + face.y2 - side) / 2.0;
    let step = side / size as f64;

    let mut data = Vec::with_capacity((size * size * 3) as usize);
    for y in 0..size {
        let src_y = (top + (y as f64 + 0.5) * step) as i64;
        for x in 0..size {
            let src_x = (left + (x as f64 + 0.5) * step) as i64;
            data.extend_from_slice(&frame.pixel_clamped(src_x, src_y));
        }
    }
    Frame::new(data, size, size)
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

/// One detected face in original-frame pixel coordinates.
#[derive(Clone, Debug)]
struct FaceBox {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    score: f64,
}

impl FaceBox {
    fn area(&self) -> f64 {
        (self.x2 - self.x1) * (self.y2 - self.y1)
    }

    fn iou(&self, other: &FaceBox) -> f64 {
        let ix = f64::min(self.x2, other.x2) - f64::max(self.x1, other.x1);
        let iy = f64::min(self.y2, other.y2) - f64::max(self.y1, other.y1);
        if ix <= 0.0 || iy <= 0.0 {
            return 0.0;
        }
        let inter = ix * iy;
        inter / (self.area() + other.area() - inter)
    }
}

/// Greedy NMS: repeatedly keep the highest-scoring box and discard every
/// remaining box that overlaps it past `iou_thresh`.
fn nms(mut boxes: Vec<FaceBox>, iou_thresh: f64) -> Vec<FaceBox> {
    boxes.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<FaceBox> = Vec::with_capacity(boxes.len());
    for candidate in boxes {
        if kept.iter().all(|k| k.iou(&candidate) <= iou_thresh) {
            kept.push(candidate);
        }
    }
    kept
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
