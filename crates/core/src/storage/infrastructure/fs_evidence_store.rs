use std::fs;
use std::path::{Path, PathBuf};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::shared::timestamp;
use crate::storage::domain::evidence_store::{EvidenceStore, StorageError};

/// Filesystem-backed evidence store.
///
/// Layout:
/// - `data/<identity>/<timestamp>.png`      permanent identity samples
/// - `events/<source>/<timestamp>/<identity>.png`  per-event face evidence
/// - `captures/<source>/<timestamp>.jpg`    full-frame audit captures
///
/// All writes create intermediate directories and return the written path.
pub struct FsEvidenceStore {
    data_root: PathBuf,
    events_root: PathBuf,
    captures_root: PathBuf,
}

impl FsEvidenceStore {
    pub fn new(data_root: PathBuf, events_root: PathBuf, captures_root: PathBuf) -> Self {
        Self {
            data_root,
            events_root,
            captures_root,
        }
    }

    fn write_image(dir: &Path, file_name: &str, frame: &Frame) -> Result<String, StorageError> {
        fs::create_dir_all(dir).map_err(|source| StorageError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join(file_name);

        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or_else(|| StorageError::Encode {
                path: path.clone(),
                message: "frame data does not match its dimensions".to_string(),
            })?;
        img.save(&path).map_err(|e| StorageError::Encode {
            path: path.clone(),
            message: e.to_string(),
        })?;

        log::info!("image written to {}", path.display());
        Ok(path.to_string_lossy().into_owned())
    }

    fn read_image(path: &Path) -> Result<Frame, StorageError> {
        let img = image::open(path)
            .map_err(|e| StorageError::Decode {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
            .to_rgb8();
        let (width, height) = (img.width(), img.height());
        Ok(Frame::new(img.into_raw(), width, height))
    }

    fn has_supported_extension(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }
}

impl EvidenceStore for FsEvidenceStore {
    fn write_event(
        &self,
        identity: &str,
        source_id: &str,
        time: &str,
        face: &Frame,
    ) -> Result<String, StorageError> {
        let dir = self.events_root.join(source_id).join(time);
        Self::write_image(&dir, &format!("{identity}.png"), face)
    }

    fn write_identity_sample(&self, identity: &str, face: &Frame) -> Result<String, StorageError> {
        let dir = self.data_root.join(identity);
        Self::write_image(&dir, &format!("{}.png", timestamp::formatted_now()), face)
    }

    fn write_source_capture(
        &self,
        source_id: &str,
        time: &str,
        frame: &Frame,
    ) -> Result<String, StorageError> {
        let dir = self.captures_root.join(source_id);
        Self::write_image(&dir, &format!("{time}.jpg"), frame)
    }

    fn list_identities(&self) -> Result<Vec<String>, StorageError> {
        fs::create_dir_all(&self.data_root).map_err(|source| StorageError::Io {
            path: self.data_root.clone(),
            source,
        })?;

        let entries = fs::read_dir(&self.data_root).map_err(|source| StorageError::Io {
            path: self.data_root.clone(),
            source,
        })?;

        let mut identities = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                identities.push(entry.file_name().to_string_lossy().into_owned());
            } else {
                log::warn!(
                    "stray file {} in the identity root, consider deleting it",
                    path.display()
                );
            }
        }
        identities.sort();
        if identities.is_empty() {
            log::warn!("identity root {} is empty", self.data_root.display());
        }
        Ok(identities)
    }

    fn list_sample_images(&self, identity: &str) -> Result<Vec<(Frame, String)>, StorageError> {
        let dir = self.data_root.join(identity);
        let entries = fs::read_dir(&dir).map_err(|source| StorageError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        paths.sort();

        let mut images = Vec::new();
        for path in paths {
            if !Self::has_supported_extension(&path) {
                log::warn!(
                    "file {} has an unsupported extension, skipped",
                    path.display()
                );
                continue;
            }
            match Self::read_image(&path) {
                Ok(frame) => images.push((frame, path.to_string_lossy().into_owned())),
                Err(e) => log::warn!("unreadable sample image skipped: {e}"),
            }
        }
        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> FsEvidenceStore {
        FsEvidenceStore::new(
            dir.join("data"),
            dir.join("events"),
            dir.join("captures"),
        )
    }

    fn frame(side: u32, value: u8) -> Frame {
        Frame::new(vec![value; (side * side * 3) as usize], side, side)
    }

    #[test]
    fn test_write_event_creates_nested_path() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());

        let path = store
            .write_event("p1", "cam1", "2026-01-01-10.00.00.000000", &frame(4, 7))
            .unwrap();
        assert!(Path::new(&path).exists());
        assert!(path.contains("cam1"));
        assert!(path.ends_with("p1.png"));
    }

    #[test]
    fn test_write_identity_sample_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());

        let written = store.write_identity_sample("p1", &frame(4, 120)).unwrap();
        assert!(Path::new(&written).exists());

        let samples = store.list_sample_images("p1").unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].1, written);
        assert_eq!(samples[0].0.width(), 4);
        assert_eq!(samples[0].0.data()[0], 120);
    }

    #[test]
    fn test_write_source_capture_is_jpeg() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());

        let path = store
            .write_source_capture("cam1", "2026-01-01-10.00.00.000000", &frame(8, 50))
            .unwrap();
        assert!(path.ends_with(".jpg"));
        assert!(Path::new(&path).exists());
    }

    #[test]
    fn test_list_identities_ignores_stray_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        fs::create_dir_all(tmp.path().join("data/p1")).unwrap();
        fs::create_dir_all(tmp.path().join("data/p2")).unwrap();
        fs::write(tmp.path().join("data/stray.txt"), b"junk").unwrap();

        let identities = store.list_identities().unwrap();
        assert_eq!(identities, vec!["p1".to_string(), "p2".to_string()]);
    }

    #[test]
    fn test_list_identities_creates_missing_root() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        assert!(store.list_identities().unwrap().is_empty());
        assert!(tmp.path().join("data").is_dir());
    }

    #[test]
    fn test_list_sample_images_skips_unsupported_and_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        let dir = tmp.path().join("data/p1");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("notes.txt"), b"not an image").unwrap();
        fs::write(dir.join("corrupt.png"), b"not a png").unwrap();
        store.write_identity_sample("p1", &frame(4, 1)).unwrap();

        let samples = store.list_sample_images("p1").unwrap();
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn test_write_failure_is_signaled() {
        let tmp = tempfile::tempdir().unwrap();
        let file_path = tmp.path().join("blocked");
        fs::write(&file_path, b"x").unwrap();
        // data root collides with an existing file: create_dir_all must fail.
        let store = FsEvidenceStore::new(
            file_path.clone(),
            tmp.path().join("events"),
            tmp.path().join("captures"),
        );
        let err = store.write_identity_sample("p1", &frame(4, 0)).unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }
}
