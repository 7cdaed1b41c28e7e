use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::catalog::domain::catalog::Catalog;
use crate::catalog::domain::identity::Sample;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_embedder::FaceEmbedder;
use crate::shared::constants::{FACE_CROP_SIZE, IMAGE_EXTENSIONS};
use crate::shared::frame::Frame;
use crate::storage::domain::evidence_store::EvidenceStore;

/// Ingests operator-provided photos from a drop directory into the catalog.
///
/// The drop directory holds one subdirectory per identity id, each containing
/// image files. Every sweep drains the directory completely: files are removed
/// whether or not they produced a usable sample, so a bad photo never wedges
/// the intake.
pub struct IntakeSweep {
    uploads_dir: PathBuf,
    catalog: Arc<Mutex<Catalog>>,
    store: Arc<dyn EvidenceStore>,
    detector: Arc<dyn FaceDetector>,
    embedder: Arc<dyn FaceEmbedder>,
}

impl IntakeSweep {
    pub fn new(
        uploads_dir: PathBuf,
        catalog: Arc<Mutex<Catalog>>,
        store: Arc<dyn EvidenceStore>,
        detector: Arc<dyn FaceDetector>,
        embedder: Arc<dyn FaceEmbedder>,
    ) -> Self {
        Self {
            uploads_dir,
            catalog,
            store,
            detector,
            embedder,
        }
    }

    /// Runs one sweep over the drop directory.
    pub fn sweep(&self) {
        let entries = match std::fs::read_dir(&self.uploads_dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!(
                    "intake: cannot read {}: {e}",
                    self.uploads_dir.display()
                );
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                let identity = entry.file_name().to_string_lossy().to_string();
                self.drain_identity_dir(&identity, &path);
                if let Err(e) = std::fs::remove_dir(&path) {
                    log::warn!("intake: could not remove {}: {e}", path.display());
                }
            } else {
                // Stray files at the drop root are not part of the layout.
                log::warn!("intake: removing stray file {}", path.display());
                if let Err(e) = std::fs::remove_file(&path) {
                    log::warn!("intake: could not remove {}: {e}", path.display());
                }
            }
        }
    }

    fn drain_identity_dir(&self, identity: &str, dir: &Path) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("intake: cannot read {}: {e}", dir.display());
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                log::warn!("intake: skipping nested directory {}", path.display());
                if let Err(e) = std::fs::remove_dir_all(&path) {
                    log::warn!("intake: could not remove {}: {e}", path.display());
                }
                continue;
            }

            self.ingest_file(identity, &path);

            // Drained regardless of outcome.
            if let Err(e) = std::fs::remove_file(&path) {
                log::warn!("intake: could not remove {}: {e}", path.display());
            }
        }
    }

    fn ingest_file(&self, identity: &str, path: &Path) {
        if !has_image_extension(path) {
            log::warn!("intake: {} is not a supported image, dropped", path.display());
            return;
        }

        let image = match image::open(path) {
            Ok(image) => image.to_rgb8(),
            Err(e) => {
                log::warn!("intake: cannot decode {}: {e}", path.display());
                return;
            }
        };
        let (width, height) = image.dimensions();
        let frame = Frame::new(image.into_raw(), width, height);

        // Already-cropped photos go straight to the embedder; anything else
        // must contain exactly one findable face.
        let face = if frame.width() == FACE_CROP_SIZE && frame.height() == FACE_CROP_SIZE {
            frame
        } else {
            match self.detector.detect_first(&frame) {
                Ok(Some(face)) => face,
                Ok(None) => {
                    log::warn!("intake: no face found in {}, dropped", path.display());
                    return;
                }
                Err(e) => {
                    log::warn!("intake: detection failed for {}: {e}", path.display());
                    return;
                }
            }
        };

        let embedding = match self.embedder.embed(&face) {
            Ok(embedding) => embedding,
            Err(e) => {
                log::warn!("intake: embedding failed for {}: {e}", path.display());
                return;
            }
        };

        let stored_path = match self.store.write_identity_sample(identity, &face) {
            Ok(stored_path) => stored_path,
            Err(e) => {
                log::warn!("intake: sample write failed for {identity}: {e}");
                return;
            }
        };

        let sample = Sample::new(embedding, stored_path);
        match self.catalog.lock() {
            Ok(mut catalog) => {
                if catalog.is_at_capacity(identity) {
                    log::info!("intake: {identity} is at sample capacity, photo dropped");
                } else {
                    catalog.upsert_append(identity, sample);
                    log::info!("intake: enrolled sample for {identity}");
                }
            }
            Err(_) => log::error!("intake: catalog lock poisoned, sample not enrolled"),
        }
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}
