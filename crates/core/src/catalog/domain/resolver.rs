use std::sync::{Arc, Mutex};

use thiserror::Error;
use uuid::Uuid;

use crate::shared::embedding::Embedding;
use crate::shared::frame::Frame;
use crate::storage::domain::evidence_store::{EvidenceStore, StorageError};

use super::catalog::Catalog;
use super::identity::Sample;
use super::matcher::find_best_match;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("catalog lock poisoned")]
    LockPoisoned,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The outcome of resolving one probe: either a recognized identity or a
/// freshly enrolled one, plus the best-match audit fields in both cases.
#[derive(Clone, Debug)]
pub struct Resolution {
    pub guid: String,
    pub last_photo_path: String,
    pub validated: bool,
    pub most_similar_guid: String,
    pub most_similar_photo_path: String,
    pub similarity: f32,
}

/// Decides whether a probe belongs to a known identity or starts a new one,
/// and applies the enrollment to the shared catalog.
///
/// Matching and the subsequent append run inside one catalog-wide critical
/// section, so two workers can never race a capacity check or both enroll
/// the same novel face against a catalog that changed underneath them.
/// Detection and embedding are finished before the lock is taken; only
/// evidence writes happen inside it.
pub struct IdentityResolver {
    catalog: Arc<Mutex<Catalog>>,
    store: Arc<dyn EvidenceStore>,
}

impl IdentityResolver {
    pub fn new(catalog: Arc<Mutex<Catalog>>, store: Arc<dyn EvidenceStore>) -> Self {
        Self { catalog, store }
    }

    pub fn catalog(&self) -> &Arc<Mutex<Catalog>> {
        &self.catalog
    }

    pub fn resolve(
        &self,
        probe: &Embedding,
        face: &Frame,
        source_id: &str,
        time: &str,
        threshold: f32,
    ) -> Result<Resolution, ResolveError> {
        let mut catalog = self
            .catalog
            .lock()
            .map_err(|_| ResolveError::LockPoisoned)?;

        let best = find_best_match(probe, &catalog);
        match best {
            Some(m) if m.score >= threshold => {
                let event_path = self.store.write_event(&m.identity_id, source_id, time, face)?;
                log::info!(
                    "source {source_id}: recognized {} (similarity {:.3})",
                    m.identity_id,
                    m.score
                );

                if !catalog.is_at_capacity(&m.identity_id) {
                    // The catalog mirrors durable state: append only after
                    // the sample image is safely written.
                    match self.store.write_identity_sample(&m.identity_id, face) {
                        Ok(sample_path) => {
                            catalog.upsert_append(
                                &m.identity_id,
                                Sample::new(probe.clone(), sample_path),
                            );
                        }
                        Err(e) => {
                            log::warn!(
                                "sample write for {} failed, catalog left unchanged: {e}",
                                m.identity_id
                            );
                        }
                    }
                }

                Ok(Resolution {
                    guid: m.identity_id.clone(),
                    last_photo_path: event_path,
                    validated: true,
                    most_similar_guid: m.identity_id,
                    most_similar_photo_path: m.sample_path,
                    similarity: m.score,
                })
            }
            below_threshold => {
                let guid = Uuid::new_v4().to_string();
                let event_path = self.store.write_event(&guid, source_id, time, face)?;
                let sample_path = self.store.write_identity_sample(&guid, face)?;
                catalog.upsert_append(&guid, Sample::new(probe.clone(), sample_path.clone()));
                log::info!("source {source_id}: enrolled new identity {guid}");

                // Audit fields name the losing candidate; with nothing to
                // compare against, the new identity stands in for itself.
                let (most_similar_guid, most_similar_photo_path, similarity) =
                    match below_threshold {
                        Some(m) => (m.identity_id, m.sample_path, m.score),
                        None => (guid.clone(), sample_path, 0.0),
                    };

                Ok(Resolution {
                    guid,
                    last_photo_path: event_path,
                    validated: false,
                    most_similar_guid,
                    most_similar_photo_path,
                    similarity,
                })
            }
        }
    }
}
