use crate::catalog::domain::catalog::Catalog;
use crate::catalog::domain::identity::{IdentityRecord, Sample};
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_embedder::FaceEmbedder;
use crate::shared::constants::FACE_CROP_SIZE;
use crate::shared::frame::Frame;
use crate::storage::domain::evidence_store::{EvidenceStore, StorageError};

/// Builds the catalog from persisted identity folders at process start.
///
/// Every stored sample image is re-embedded; photos that are not already
/// at the face crop size are run through the detector first (legacy or
/// hand-placed photos). Identities whose every sample fails are dropped
/// with a warning rather than inserted empty.
pub fn load_catalog(
    store: &dyn EvidenceStore,
    detector: &dyn FaceDetector,
    embedder: &dyn FaceEmbedder,
    max_samples: usize,
) -> Result<Catalog, StorageError> {
    let mut catalog = Catalog::new(max_samples);

    let identities = store.list_identities()?;
    if identities.is_empty() {
        log::warn!("no identities persisted yet, starting with an empty catalog");
        return Ok(catalog);
    }

    for identity in identities {
        let images = match store.list_sample_images(&identity) {
            Ok(images) => images,
            Err(e) => {
                log::warn!("identity {identity}: cannot list samples, dropped: {e}");
                continue;
            }
        };
        if images.is_empty() {
            log::warn!("identity {identity} has no sample images, dropped");
            continue;
        }

        let mut samples = Vec::new();
        for (image, path) in images {
            match sample_from_image(&identity, image, path, detector, embedder) {
                Some(sample) => samples.push(sample),
                None => continue,
            }
            if samples.len() >= max_samples {
                break;
            }
        }

        match IdentityRecord::new(identity.clone(), samples) {
            Ok(record) => {
                if let Err(e) = catalog.insert(record) {
                    log::warn!("identity {identity} not inserted: {e}");
                }
            }
            Err(_) => {
                log::warn!("identity {identity}: every sample failed alignment or embedding, dropped");
            }
        }
    }

    log::info!("catalog loaded with {} identities", catalog.len());
    Ok(catalog)
}

fn sample_from_image(
    identity: &str,
    image: Frame,
    path: String,
    detector: &dyn FaceDetector,
    embedder: &dyn FaceEmbedder,
) -> Option<Sample> {
    let crop = if image.width() == FACE_CROP_SIZE && image.height() == FACE_CROP_SIZE {
        image
    } else {
        log::warn!(
            "photo {path} has size {}x{}, re-running face alignment",
            image.width(),
            image.height()
        );
        match detector.detect_first(&image) {
            Ok(Some(crop)) => crop,
            Ok(None) => {
                log::warn!("no face found in stored photo {path}, skipped");
                return None;
            }
            Err(e) => {
                log::warn!("alignment failed for {path}: {e}");
                return None;
            }
        }
    };

    match embedder.embed(&crop) {
        Ok(embedding) => {
            log::info!("identity {identity}: sample {path} loaded");
            Some(Sample::new(embedding, path))
        }
        Err(e) => {
            log::warn!("embedding failed for {path}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::shared::embedding::Embedding;

    struct StubStore {
        identities: Vec<String>,
        images: HashMap<String, Vec<(Frame, String)>>,
    }

    impl EvidenceStore for StubStore {
        fn write_event(
            &self,
            _identity: &str,
            _source_id: &str,
            _time: &str,
            _face: &Frame,
        ) -> Result<String, StorageError> {
            unimplemented!("loader never writes")
        }

        fn write_identity_sample(
            &self,
            _identity: &str,
            _face: &Frame,
        ) -> Result<String, StorageError> {
            unimplemented!("loader never writes")
        }

        fn write_source_capture(
            &self,
            _source_id: &str,
            _time: &str,
            _frame: &Frame,
        ) -> Result<String, StorageError> {
            unimplemented!("loader never writes")
        }

        fn list_identities(&self) -> Result<Vec<String>, StorageError> {
            Ok(self.identities.clone())
        }

        fn list_sample_images(&self, identity: &str) -> Result<Vec<(Frame, String)>, StorageError> {
            Ok(self.images.get(identity).cloned().unwrap_or_default())
        }
    }

    /// Detector that finds a face in every frame, or in none.
    struct StubDetector {
        finds_face: bool,
        first_calls: Mutex<usize>,
    }

    impl FaceDetector for StubDetector {
        fn detect_all(&self, _frame: &Frame) -> Result<Vec<Frame>, Box<dyn std::error::Error>> {
            Ok(Vec::new())
        }

        fn detect_first(
            &self,
            _frame: &Frame,
        ) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            *self.first_calls.lock().unwrap() += 1;
            if self.finds_face {
                Ok(Some(crop_sized_frame()))
            } else {
                Ok(None)
            }
        }
    }

    struct StubEmbedder {
        fail: bool,
    }

    impl FaceEmbedder for StubEmbedder {
        fn embed(&self, _face: &Frame) -> Result<Embedding, Box<dyn std::error::Error>> {
            if self.fail {
                Err("model unavailable".into())
            } else {
                Ok(Embedding::new(vec![1.0, 0.0]))
            }
        }
    }

    fn crop_sized_frame() -> Frame {
        let side = FACE_CROP_SIZE;
        Frame::new(vec![0u8; (side * side * 3) as usize], side, side)
    }

    fn oversized_frame() -> Frame {
        Frame::new(vec![0u8; 300 * 200 * 3], 200, 300)
    }

    #[test]
    fn test_empty_store_yields_empty_catalog() {
        let store = StubStore {
            identities: vec![],
            images: HashMap::new(),
        };
        let detector = StubDetector {
            finds_face: true,
            first_calls: Mutex::new(0),
        };
        let embedder = StubEmbedder { fail: false };

        let catalog = load_catalog(&store, &detector, &embedder, 5).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_crop_sized_images_skip_alignment() {
        let mut images = HashMap::new();
        images.insert(
            "p1".to_string(),
            vec![
                (crop_sized_frame(), "data/p1/a.png".to_string()),
                (crop_sized_frame(), "data/p1/b.png".to_string()),
            ],
        );
        let store = StubStore {
            identities: vec!["p1".into()],
            images,
        };
        let detector = StubDetector {
            finds_face: true,
            first_calls: Mutex::new(0),
        };
        let embedder = StubEmbedder { fail: false };

        let catalog = load_catalog(&store, &detector, &embedder, 5).unwrap();
        assert_eq!(catalog.lookup("p1").unwrap().samples().len(), 2);
        assert_eq!(*detector.first_calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_oversized_image_is_realigned() {
        let mut images = HashMap::new();
        images.insert(
            "p1".to_string(),
            vec![(oversized_frame(), "data/p1/raw.jpg".to_string())],
        );
        let store = StubStore {
            identities: vec!["p1".into()],
            images,
        };
        let detector = StubDetector {
            finds_face: true,
            first_calls: Mutex::new(0),
        };
        let embedder = StubEmbedder { fail: false };

        let catalog = load_catalog(&store, &detector, &embedder, 5).unwrap();
        assert_eq!(catalog.lookup("p1").unwrap().samples().len(), 1);
        assert_eq!(*detector.first_calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_identity_with_all_samples_failing_is_dropped() {
        let mut images = HashMap::new();
        images.insert(
            "broken".to_string(),
            vec![(crop_sized_frame(), "data/broken/a.png".to_string())],
        );
        images.insert(
            "good".to_string(),
            vec![(crop_sized_frame(), "data/good/a.png".to_string())],
        );
        let store = StubStore {
            identities: vec!["broken".into(), "good".into()],
            images,
        };
        let detector = StubDetector {
            finds_face: true,
            first_calls: Mutex::new(0),
        };

        let failing = StubEmbedder { fail: true };
        let catalog = load_catalog(&store, &detector, &failing, 5).unwrap();
        assert!(catalog.is_empty());

        let working = StubEmbedder { fail: false };
        let catalog = load_catalog(&store, &detector, &working, 5).unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_load_respects_sample_capacity() {
        let mut images = HashMap::new();
        images.insert(
            "p1".to_string(),
            (0..8)
                .map(|i| (crop_sized_frame(), format!("data/p1/{i}.png")))
                .collect(),
        );
        let store = StubStore {
            identities: vec!["p1".into()],
            images,
        };
        let detector = StubDetector {
            finds_face: true,
            first_calls: Mutex::new(0),
        };
        let embedder = StubEmbedder { fail: false };

        let catalog = load_catalog(&store, &detector, &embedder, 3).unwrap();
        assert_eq!(catalog.lookup("p1").unwrap().samples().len(), 3);
    }

    #[test]
    fn test_unalignable_photo_skipped_identity_survives_on_other_samples() {
        let mut images = HashMap::new();
        images.insert(
            "p1".to_string(),
            vec![
                (oversized_frame(), "data/p1/noface.jpg".to_string()),
                (crop_sized_frame(), "data/p1/ok.png".to_string()),
            ],
        );
        let store = StubStore {
            identities: vec!["p1".into()],
            images,
        };
        let detector = StubDetector {
            finds_face: false,
            first_calls: Mutex::new(0),
        };
        let embedder = StubEmbedder { fail: false };

        let catalog = load_catalog(&store, &detector, &embedder, 5).unwrap();
        let record = catalog.lookup("p1").unwrap();
        assert_eq!(record.samples().len(), 1);
        assert_eq!(record.samples()[0].evidence_path(), "data/p1/ok.png");
    }
}
