/// ArcFace embedder using ONNX Runtime.
///
/// Produces the L2-normalized embeddings the catalog matches on.
use std::path::Path;
use std::sync::Mutex;

use crate::detection::domain::face_embedder::FaceEmbedder;
use crate::shared::embedding::{l2_normalize, Embedding};
use crate::shared::frame::Frame;

const INPUT_SIZE: usize = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

pub struct OnnxArcfaceEmbedder {
    session: Mutex<ort::session::Session>,
}

impl OnnxArcfaceEmbedder {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let intra_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_inter_threads(1)?
            .with_intra_threads(intra_threads)?
            .commit_from_file(model_path)?;
        log::info!("arcface embedder ready ({INPUT_SIZE}x{INPUT_SIZE} input)");
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl FaceEmbedder for OnnxArcfaceEmbedder {
    fn embed(&self, face: &Frame) -> Result<Embedding, Box<dyn std::error::Error>> {
        let tensor = preprocess(face);
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        let embedding_array = outputs[0].try_extract_array::<f32>()?;
        let embedding_slice = embedding_array
            .as_slice()
            .ok_or("Cannot get embedding slice")?;

        let mut values = embedding_slice.to_vec();
        l2_normalize(&mut values);
        Ok(Embedding::new(values))
    }
}

/// Resize crop to 112x112, normalize, NCHW layout.
fn preprocess(face: &Frame) -> ndarray::Array4<f32> {
    let x_step = face.width() as f64 / INPUT_SIZE as f64;
    let y_step = face.height() as f64 / INPUT_SIZE as f64;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));
    for y in 0..INPUT_SIZE {
        let src_y = ((y as f64 + 0.5) * y_step) as i64;
        for x in 0..INPUT_SIZE {
            let rgb = face.pixel_clamped(((x as f64 + 0.5) * x_step) as i64, src_y);
            for (c, value) in rgb.iter().enumerate() {
                tensor[[0, c, y, x]] = (*value as f32 - NORM_MEAN) / NORM_STD;
            }
        }
    }

    tensor
}
