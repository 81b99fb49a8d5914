//! Reading source content from local paths and HTTP(S) URLs

use crate::error::{SourceCacheError, SourceCacheResult};
use regex::Regex;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default timeout for remote downloads
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Options controlling how remote content is fetched
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Overall timeout for a single download
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// Where a locator's content comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// A path on the local filesystem (may contain glob characters)
    Local(PathBuf),
    /// An `http://` or `https://` URL
    Remote(String),
}

impl SourceLocation {
    /// Classify a locator string
    pub fn parse(locator: &str) -> Self {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            Self::Remote(locator.to_string())
        } else if let Some(path) = locator.strip_prefix("file://") {
            Self::Local(PathBuf::from(path))
        } else {
            Self::Local(PathBuf::from(locator))
        }
    }
}

/// Whether a locator contains glob wildcards
pub fn has_glob(locator: &str) -> bool {
    locator.contains(['*', '?', '['])
}

/// Leading components of a glob pattern that contain no wildcards
pub fn glob_base(pattern: &Path) -> PathBuf {
    pattern
        .components()
        .take_while(|c| !has_glob(&c.as_os_str().to_string_lossy()))
        .collect()
}

/// Last path segment of a locator, ignoring any URL query or fragment
pub fn file_name(locator: &str) -> Option<String> {
    let trimmed = locator
        .split(['?', '#'])
        .next()
        .unwrap_or(locator)
        .trim_end_matches('/');
    trimmed
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && !name.contains(':'))
        .map(str::to_string)
}

/// Reduce a path to its normal components so it cannot escape a directory
pub fn safe_relative(path: &str) -> Option<PathBuf> {
    let relative: PathBuf = Path::new(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();

    if relative.as_os_str().is_empty() {
        None
    } else {
        Some(relative)
    }
}

/// Relative output path for a source path, honoring an optional strip pattern
///
/// With a pattern, the first match is removed and the remainder is used as the
/// relative path. Without one (or when nothing remains), the file name is used.
pub fn output_name(source: &str, strip: Option<&Regex>) -> Option<PathBuf> {
    if let Some(pattern) = strip {
        let remainder = pattern.replace(source, "");
        if let Some(relative) = safe_relative(&remainder) {
            return Some(relative);
        }
    }
    file_name(source).and_then(|name| safe_relative(&name))
}

/// Copy a local file, giving the copy a fresh modification time
pub fn copy_local(locator: &str, src: &Path, dest: &Path) -> SourceCacheResult<()> {
    if !src.is_file() {
        return Err(SourceCacheError::fetch(locator, "no such file"));
    }
    ensure_parent(dest)?;
    fs::copy(src, dest).map_err(|e| {
        SourceCacheError::fetch(locator, format!("copying to {}: {}", dest.display(), e))
    })?;
    Ok(())
}

/// Download a URL into `dest`
pub fn download(url: &str, dest: &Path, options: &FetchOptions) -> SourceCacheResult<()> {
    debug!("Downloading {} to {}", url, dest.display());

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(options.timeout))
        .build()
        .into();

    let mut response = agent
        .get(url)
        .call()
        .map_err(|e| SourceCacheError::fetch(url, e.to_string()))?;

    ensure_parent(dest)?;
    let mut file = File::create(dest)
        .map_err(|e| SourceCacheError::io(format!("creating {}", dest.display()), e))?;
    let mut reader = response.body_mut().as_reader();
    io::copy(&mut reader, &mut file)
        .map_err(|e| SourceCacheError::fetch(url, format!("reading response body: {}", e)))?;
    file.sync_all()
        .map_err(|e| SourceCacheError::io(format!("flushing {}", dest.display()), e))?;

    Ok(())
}

/// Copy or download a single locator into `dest`
pub fn fetch_to(locator: &str, dest: &Path, options: &FetchOptions) -> SourceCacheResult<()> {
    match SourceLocation::parse(locator) {
        SourceLocation::Local(path) => copy_local(locator, &path, dest),
        SourceLocation::Remote(url) => download(&url, dest, options),
    }
}

fn ensure_parent(path: &Path) -> SourceCacheResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| SourceCacheError::io(format!("creating {}", parent.display()), e))?;
    }
    Ok(())
}
