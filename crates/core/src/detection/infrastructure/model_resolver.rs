use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model {0} not found")]
    NotFound(PathBuf),
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

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Where model artifacts are served from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelLocation {
    /// Artifacts read in place from a local directory.
    Directory(PathBuf),
    /// Artifacts fetched from `{base}/{name}` and cached locally.
    Remote(String),
}

impl ModelLocation {
    /// `http://` and `https://` bases are remote; anything else is a directory.
    pub fn parse(base: &str) -> Self {
        if base.starts_with("http://") || base.starts_with("https://") {
            Self::Remote(base.trim_end_matches('/').to_string())
        } else {
            Self::Directory(PathBuf::from(base))
        }
    }

    /// Cache subdirectory for a remote base: the URL without its scheme,
    /// with every character outside `[A-Za-z0-9._-]` replaced by `_`.
    pub fn cache_key(&self) -> Option<String> {
        let Self::Remote(base) = self else {
            return None;
        };
        let rest = base.split_once("://").map_or(base.as_str(), |(_, r)| r);
        Some(
            rest.chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                        c
                    } else {
                        '_'
                    }
                })
                .collect(),
        )
    }

    pub fn url_for(&self, name: &str) -> Option<String> {
        match self {
            Self::Remote(base) => Some(format!("{base}/{name}")),
            Self::Directory(_) => None,
        }
    }
}

impl std::fmt::Display for ModelLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directory(dir) => write!(f, "{}", dir.display()),
            Self::Remote(base) => write!(f, "{base}"),
        }
    }
}

/// Resolve a model file by name.
///
/// Directory locations must already contain the file. Remote locations are
/// checked against their own subdirectory of the user cache directory before
/// downloading into it.
pub fn resolve(
    name: &str,
    location: &ModelLocation,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    match location {
        ModelLocation::Directory(dir) => resolve_local(name, dir),
        ModelLocation::Remote(_) => {
            let mut cache_dir = model_cache_dir()?;
            if let Some(key) = location.cache_key() {
                cache_dir.push(key);
            }
            resolve_remote(name, location, &cache_dir, progress)
        }
    }
}

fn resolve_local(name: &str, dir: &Path) -> Result<PathBuf, ModelResolveError> {
    let path = dir.join(name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(ModelResolveError::NotFound(path))
    }
}

fn resolve_remote(
    name: &str,
    location: &ModelLocation,
    cache_dir: &Path,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cached_path = cache_dir.join(name);
    if cached_path.exists() {
        log::debug!("Using cached model {}", cached_path.display());
        return Ok(cached_path);
    }

    let Some(url) = location.url_for(name) else {
        return resolve_local(name, cache_dir);
    };
    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading {url}");
    download(&url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Caches/FaceGate/models/`
/// - Linux: `$XDG_CACHE_HOME/FaceGate/models/` or `~/.cache/FaceGate/models/`
/// - Windows: `%LOCALAPPDATA%/FaceGate/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    dirs::cache_dir()
        .map(|d| d.join("FaceGate").join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");

    let result = download_inner(url, dest, &temp_path, progress);

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}

fn download_inner(
    url: &str,
    dest: &Path,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    let mut file = fs::File::create(temp_path).map_err(|e| ModelResolveError::Write {
        path: temp_path.to_path_buf(),
        source: e,
    })?;

    // Stream to disk; detector weights should not sit in memory twice.
    let mut reader = response;
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = reader
            .read(&mut buf)
            .map_err(|e| ModelResolveError::Write {
                path: temp_path.to_path_buf(),
                source: e,
            })?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n])
            .map_err(|e| ModelResolveError::Write {
                path: temp_path.to_path_buf(),
                source: e,
            })?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }

    file.flush().map_err(|e| ModelResolveError::Write {
        path: temp_path.to_path_buf(),
        source: e,
    })?;
    drop(file);

    fs::rename(temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })?;

    Ok(())
}
