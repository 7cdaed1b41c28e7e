use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum SimilarityError {
    #[error("embedding dimensions differ: {0} vs {1}")]
    DimensionMismatch(usize, usize),
    #[error("zero-magnitude embedding cannot be compared")]
    ZeroMagnitude,
}

/// A fixed-length face embedding produced by the embedder.
///
/// Immutable once created; compared only through [`cosine_similarity`].
#[derive(Clone, Debug, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity magnitude in `[0, 1]`.
///
/// Sign is not semantically meaningful for this embedding space, so the
/// absolute value is taken. Degenerate inputs error instead of yielding NaN.
pub fn cosine_similarity(a: &Embedding, b: &Embedding) -> Result<f32, SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::DimensionMismatch(a.len(), b.len()));
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return Err(SimilarityError::ZeroMagnitude);
    }

    Ok(((dot / denom).abs().min(1.0)) as f32)
}
