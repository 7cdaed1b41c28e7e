use thiserror::Error;

use super::identity::{IdentityRecord, Sample};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("identity {0} has no samples and cannot be stored")]
    EmptyRecord(String),
    #[error("identity {0} is already present")]
    DuplicateId(String),
}

/// The shared store of all known identities and the single source of truth
/// for matching. Loaded once at startup, then mutated incrementally; no
/// other component caches embeddings.
///
/// Records keep insertion order, which gives the matcher its stable
/// first-seen tie-breaking. Lookups are linear; the catalog targets tens to
/// low hundreds of identities.
///
/// The catalog never persists anything itself. Callers write evidence first
/// and mirror the successful write here.
#[derive(Debug)]
pub struct Catalog {
    records: Vec<IdentityRecord>,
    max_samples: usize,
}

impl Catalog {
    pub fn new(max_samples: usize) -> Self {
        Self {
            records: Vec::new(),
            // A bound of zero would make every record violate its own
            // one-sample minimum.
            max_samples: max_samples.max(1),
        }
    }

    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn lookup(&self, id: &str) -> Option<&IdentityRecord> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn is_at_capacity(&self, id: &str) -> bool {
        self.lookup(id)
            .is_some_and(|r| r.samples().len() >= self.max_samples)
    }

    /// Inserts a freshly built record, e.g. during the bootstrap load.
    pub fn insert(&mut self, record: IdentityRecord) -> Result<(), CatalogError> {
        if record.samples().is_empty() {
            return Err(CatalogError::EmptyRecord(record.id().to_string()));
        }
        if self.lookup(record.id()).is_some() {
            return Err(CatalogError::DuplicateId(record.id().to_string()));
        }
        log::info!(
            "identity {} added to catalog with {} sample(s)",
            record.id(),
            record.samples().len()
        );
        self.records.push(record);
        Ok(())
    }

    /// Appends a sample to an existing identity, or creates the identity
    /// with this one sample. At capacity the append is a no-op: the sample
    /// set is bounded and nothing is evicted.
    pub fn upsert_append(&mut self, id: &str, sample: Sample) {
        if let Some(record) = self.records.iter_mut().find(|r| r.id() == id) {
            if record.samples().len() >= self.max_samples {
                log::debug!("identity {id} is at sample capacity, append skipped");
                return;
            }
            record.push_sample(sample);
            log::info!("sample appended for identity {id}");
        } else {
            // Construction with one sample cannot fail the empty check.
            let record = IdentityRecord::new(id.to_string(), vec![sample])
                .expect("one-sample record is never empty");
            log::info!("identity {id} added to catalog with 1 sample");
            self.records.push(record);
        }
    }

    /// Snapshot view for iteration. Immutable: mutation goes through the
    /// catalog's own methods only.
    pub fn all(&self) -> &[IdentityRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::embedding::Embedding;

    fn sample(path: &str) -> Sample {
        Sample::new(Embedding::new(vec![1.0, 0.0]), path.to_string())
    }

    fn record(id: &str, paths: &[&str]) -> IdentityRecord {
        let samples = paths.iter().map(|p| sample(p)).collect();
        IdentityRecord::new(id.to_string(), samples).unwrap()
    }

    fn assert_bounds_hold(catalog: &Catalog) {
        for r in catalog.all() {
            assert!(!r.samples().is_empty(), "identity {} has no samples", r.id());
            assert!(
                r.samples().len() <= catalog.max_samples(),
                "identity {} exceeds capacity",
                r.id()
            );
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut catalog = Catalog::new(5);
        catalog.insert(record("p1", &["a.png"])).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.lookup("p1").unwrap().id(), "p1");
        assert!(catalog.lookup("p2").is_none());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut catalog = Catalog::new(5);
        catalog.insert(record("p1", &["a.png"])).unwrap();
        let err = catalog.insert(record("p1", &["b.png"])).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId(_)));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_upsert_append_creates_identity() {
        let mut catalog = Catalog::new(5);
        catalog.upsert_append("p1", sample("a.png"));
        assert_eq!(catalog.lookup("p1").unwrap().samples().len(), 1);
    }

    #[test]
    fn test_upsert_append_grows_until_capacity() {
        let mut catalog = Catalog::new(3);
        for i in 0..10 {
            catalog.upsert_append("p1", sample(&format!("{i}.png")));
            assert_bounds_hold(&catalog);
        }
        let paths: Vec<&str> = catalog
            .lookup("p1")
            .unwrap()
            .samples()
            .iter()
            .map(|s| s.evidence_path())
            .collect();
        // Reject-new at the bound: the earliest samples survive.
        assert_eq!(paths, vec!["0.png", "1.png", "2.png"]);
    }

    #[test]
    fn test_is_at_capacity() {
        let mut catalog = Catalog::new(2);
        assert!(!catalog.is_at_capacity("p1"));
        catalog.upsert_append("p1", sample("a.png"));
        assert!(!catalog.is_at_capacity("p1"));
        catalog.upsert_append("p1", sample("b.png"));
        assert!(catalog.is_at_capacity("p1"));
    }

    #[test]
    fn test_zero_capacity_clamped_to_one() {
        let catalog = Catalog::new(0);
        assert_eq!(catalog.max_samples(), 1);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut catalog = Catalog::new(5);
        for id in ["c", "a", "b"] {
            catalog.insert(record(id, &["x.png"])).unwrap();
        }
        let ids: Vec<&str> = catalog.all().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_bounds_hold_after_mixed_operations() {
        let mut catalog = Catalog::new(2);
        catalog.insert(record("p1", &["a.png", "b.png"])).unwrap();
        catalog.upsert_append("p1", sample("c.png"));
        catalog.upsert_append("p2", sample("d.png"));
        catalog.upsert_append("p2", sample("e.png"));
        catalog.upsert_append("p2", sample("f.png"));
        assert_bounds_hold(&catalog);
        assert_eq!(catalog.lookup("p1").unwrap().samples().len(), 2);
        assert_eq!(catalog.lookup("p2").unwrap().samples().len(), 2);
    }
}
