use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("could not determine a model cache directory")]
    NoCacheDir,
    #[error("cache directory {path} is unusable: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("download of {url} failed: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("could not store model at {path}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Locates an ONNX model by name, fetching it on first use.
///
/// Checked in order: the user cache, an optional bundled directory, then a
/// download into the cache. The recognition models are hundreds of
/// megabytes, so nothing is ever buffered in memory.
pub fn resolve(
    name: &str,
    url: &str,
    bundled_dir: Option<&Path>,
) -> Result<PathBuf, ModelResolveError> {
    let cached = model_cache_dir()?.join(name);
    if cached.is_file() {
        log::debug!("model {name} found in cache");
        return Ok(cached);
    }

    if let Some(bundled) = bundled_dir.map(|d| d.join(name)) {
        if bundled.is_file() {
            log::debug!("model {name} found in bundled directory");
            return Ok(bundled);
        }
    }

    log::info!("model {name} not present, downloading from {url}");
    download_to(url, &cached)?;
    Ok(cached)
}

/// Platform cache location for downloaded models.
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    let base = dirs::data_dir().map(|d| d.join("Sightline"));
    #[cfg(not(target_os = "macos"))]
    let base = dirs::cache_dir().map(|d| d.join("sightline"));

    base.map(|d| d.join("models")).ok_or(ModelResolveError::NoCacheDir)
}

fn download_to(url: &str, dest: &Path) -> Result<(), ModelResolveError> {
    let dir = dest.parent().ok_or(ModelResolveError::NoCacheDir)?;
    fs::create_dir_all(dir).map_err(|source| ModelResolveError::CacheDir {
        path: dir.to_path_buf(),
        source,
    })?;

    // Download into a sibling .part file and rename once complete, so an
    // interrupted download never leaves a truncated model at the real path.
    let partial = dest.with_extension("part");
    if let Err(e) = fetch(url, &partial).and_then(|_| finalize(&partial, dest)) {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }
    Ok(())
}

fn fetch(url: &str, partial: &Path) -> Result<(), ModelResolveError> {
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|source| ModelResolveError::Download {
            url: url.to_string(),
            source,
        })?;

    let store_err = |source| ModelResolveError::Store {
        path: partial.to_path_buf(),
        source,
    };
    let mut file = fs::File::create(partial).map_err(store_err)?;
    std::io::copy(&mut response, &mut file).map_err(store_err)?;
    Ok(())
}

fn finalize(partial: &Path, dest: &Path) -> Result<(), ModelResolveError> {
    fs::rename(partial, dest).map_err(|source| ModelResolveError::Store {
        path: dest.to_path_buf(),
        source,
    })
}
