use crate::shared::embedding::Embedding;

use super::catalog::CatalogError;

/// One observed instance of an identity: the embedding plus the stable path
/// of its persisted face image. Immutable after creation.
#[derive(Clone, Debug)]
pub struct Sample {
    embedding: Embedding,
    evidence_path: String,
}

impl Sample {
    pub fn new(embedding: Embedding, evidence_path: String) -> Self {
        Self {
            embedding,
            evidence_path,
        }
    }

    pub fn embedding(&self) -> &Embedding {
        &self.embedding
    }

    pub fn evidence_path(&self) -> &str {
        &self.evidence_path
    }
}

/// A known identity: stable id plus its enrolled samples, in enrollment order.
///
/// Records always hold at least one sample; the upper bound is enforced by
/// the catalog, which knows the configured capacity.
#[derive(Clone, Debug)]
pub struct IdentityRecord {
    id: String,
    samples: Vec<Sample>,
}

impl IdentityRecord {
    /// Builds a record from already-collected samples. An empty sample set
    /// is rejected; a zero-sample identity must never reach the catalog.
    pub fn new(id: String, samples: Vec<Sample>) -> Result<Self, CatalogError> {
        if samples.is_empty() {
            return Err(CatalogError::EmptyRecord(id));
        }
        Ok(Self { id, samples })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub(crate) fn push_sample(&mut self, sample: Sample) {
        self.samples.push(sample);
    }
}
