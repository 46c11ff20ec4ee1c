use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::{
    EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL, SWAP_MODEL_NAME, SWAP_MODEL_URL, YOLO_MODEL_NAME,
    YOLO_MODEL_URL,
};

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model override {0} does not exist")]
    MissingOverride(PathBuf),
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Where a model file comes from when nothing local provides it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: &'static str,
    pub url: &'static str,
}

pub const DETECTOR_MODEL: ModelSpec = ModelSpec {
    name: YOLO_MODEL_NAME,
    url: YOLO_MODEL_URL,
};

pub const EMBEDDER_MODEL: ModelSpec = ModelSpec {
    name: EMBEDDING_MODEL_NAME,
    url: EMBEDDING_MODEL_URL,
};

pub const SWAPPER_MODEL: ModelSpec = ModelSpec {
    name: SWAP_MODEL_NAME,
    url: SWAP_MODEL_URL,
};

/// Progress callback: `(model_name, bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn<'a> = &'a dyn Fn(&str, u64, u64);

/// Resolve a model file, downloading it into the user cache if needed.
///
/// Resolution order:
/// 1. Explicit override path (must exist)
/// 2. User cache directory (platform-specific)
/// 3. Download from `spec.url` to the cache
pub fn resolve(
    spec: &ModelSpec,
    override_path: Option<&Path>,
    progress: Option<ProgressFn<'_>>,
) -> Result<PathBuf, ModelResolveError> {
    if let Some(path) = override_path {
        return check_override(path);
    }
    resolve_in(spec, &model_cache_dir()?, progress)
}

/// Like [`resolve`] without an override, against an explicit cache directory.
pub fn resolve_in(
    spec: &ModelSpec,
    cache_dir: &Path,
    progress: Option<ProgressFn<'_>>,
) -> Result<PathBuf, ModelResolveError> {
    let cached_path = cache_dir.join(spec.name);
    if cached_path.exists() {
        log::debug!("Using cached model {}", cached_path.display());
        return Ok(cached_path);
    }

    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading {} from {}", spec.name, spec.url);
    download(spec, &cached_path, progress)?;
    Ok(cached_path)
}

fn check_override(path: &Path) -> Result<PathBuf, ModelResolveError> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(ModelResolveError::MissingOverride(path.to_path_buf()))
    }
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/GifSwap/models/`
/// - Linux: `$XDG_CACHE_HOME/GifSwap/models/` or `~/.cache/GifSwap/models/`
/// - Windows: `%LOCALAPPDATA%/GifSwap/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    let base = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let base = dirs::cache_dir();

    base.map(|d| d.join("GifSwap").join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

fn download(
    spec: &ModelSpec,
    dest: &Path,
    progress: Option<ProgressFn<'_>>,
) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");
    let result = stream_to(spec, dest, &temp_path, progress);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_err(path: &Path) -> impl FnOnce(std::io::Error) -> ModelResolveError {
    let path = path.to_path_buf();
    move |source| ModelResolveError::Write { path, source }
}

fn stream_to(
    spec: &ModelSpec,
    dest: &Path,
    temp_path: &Path,
    progress: Option<ProgressFn<'_>>,
) -> Result<(), ModelResolveError> {
    let mut response = reqwest::blocking::get(spec.url)
        .and_then(|r| r.error_for_status())
        .map_err(|source| ModelResolveError::Download {
            url: spec.url.to_string(),
            source,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut file = fs::File::create(temp_path).map_err(write_err(temp_path))?;

    let mut downloaded: u64 = 0;
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = response.read(&mut buf).map_err(write_err(temp_path))?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err(temp_path))?;
        downloaded += n as u64;
        if let Some(cb) = progress {
            cb(spec.name, downloaded, total);
        }
    }

    file.flush().map_err(write_err(temp_path))?;
    drop(file);

    fs::rename(temp_path, dest).map_err(write_err(dest))
}
