//! Materialization strategies
//!
//! Each backend turns a locator into files under `<cache_dir>/<entry_id>/`.
//! Content is always staged in a temporary directory inside `cache_dir` and
//! renamed into place only after the whole copy succeeded, so readers see an
//! entry either fully present or absent.

use crate::cache::fetch::{self, FetchOptions, SourceLocation};
use crate::error::{SourceCacheError, SourceCacheResult};
use flate2::read::GzDecoder;
use regex::Regex;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tar::Archive;
use tempfile::TempDir;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Default recursion depth for directory caches
pub const DEFAULT_DEPTH: usize = 4;

/// Archive formats the compressed backend can unpack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Plain tarball
    Tar,
    /// Gzip-compressed tarball (.tar.gz, .tgz)
    TarGz,
    /// A single gzip-compressed file
    Gz,
    /// Zip archive
    Zip,
}

impl Compression {
    /// Parse a configured decompression name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "tar" => Some(Self::Tar),
            "tar.gz" | "tgz" | "targz" => Some(Self::TarGz),
            "gz" | "gzip" => Some(Self::Gz),
            "zip" => Some(Self::Zip),
            _ => None,
        }
    }

    /// Infer the format from a locator's extension
    pub fn infer(locator: &str) -> Option<Self> {
        let name = fetch::file_name(locator)?.to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else if name.ends_with(".gz") {
            Some(Self::Gz)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
            Self::Gz => "gz",
            Self::Zip => "zip",
        };
        write!(f, "{}", name)
    }
}

/// How a locator is turned into local files
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackend {
    /// Copy a single file, or every file matching a glob
    File,
    /// Copy a directory tree down to `depth` levels
    Directory { depth: usize },
    /// Fetch an archive and extract it; `None` infers the format
    Compressed { decompress: Option<Compression> },
}

impl CacheBackend {
    /// Parse a configured cache type
    pub fn from_spec(
        kind: &str,
        depth: Option<usize>,
        decompress: Option<&str>,
    ) -> SourceCacheResult<Self> {
        match kind {
            "file" => Ok(Self::File),
            "dir" | "directory" => Ok(Self::Directory {
                depth: depth.unwrap_or(DEFAULT_DEPTH),
            }),
            "compressed" => {
                let decompress = match decompress {
                    None | Some("infer") => None,
                    Some(name) => Some(Compression::from_name(name).ok_or_else(|| {
                        SourceCacheError::cache_config(format!(
                            "unknown decompression type: {}",
                            name
                        ))
                    })?),
                };
                Ok(Self::Compressed { decompress })
            }
            other => Err(SourceCacheError::cache_config(format!(
                "unknown cache type: {}",
                other
            ))),
        }
    }

    /// Short name used in logs and CLI output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory { .. } => "dir",
            Self::Compressed { .. } => "compressed",
        }
    }

    /// Materialize `request.locator` into `<cache_dir>/<entry_id>`
    ///
    /// Returns the absolute paths of every produced file. If the entry
    /// directory already holds all of them, the staged copy is discarded and
    /// the existing paths are returned.
    pub fn materialize(&self, request: &MaterializeRequest) -> SourceCacheResult<Vec<PathBuf>> {
        fs::create_dir_all(&request.cache_dir).map_err(|e| {
            SourceCacheError::io(
                format!("creating cache directory {}", request.cache_dir.display()),
                e,
            )
        })?;

        // Removed on drop, so every early return cleans up
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&request.cache_dir)
            .map_err(|e| SourceCacheError::io("creating staging directory", e))?;

        let outputs = match self {
            Self::File => stage_files(request, staging.path())?,
            Self::Directory { depth } => stage_directory(request, staging.path(), *depth)?,
            Self::Compressed { decompress } => {
                let format = decompress
                    .or_else(|| Compression::infer(&request.locator))
                    .ok_or_else(|| {
                        SourceCacheError::cache_config(format!(
                            "cannot infer archive format of {}",
                            request.locator
                        ))
                    })?;
                stage_archive(request, staging.path(), format)?
            }
        };

        if outputs.is_empty() {
            return Err(SourceCacheError::fetch(
                &request.locator,
                "source produced no files",
            ));
        }

        finalize(staging, &request.entry_dir(), &outputs)
    }
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())
    }
}

/// Everything a backend needs to materialize one locator
#[derive(Debug, Clone)]
pub struct MaterializeRequest {
    /// Locator to fetch
    pub locator: String,
    /// Root of this cache
    pub cache_dir: PathBuf,
    /// Entry directory name under `cache_dir`
    pub entry_id: String,
    /// Pattern removed from source paths to form relative output paths
    pub strip: Option<Regex>,
    /// Remote fetch options
    pub fetch: FetchOptions,
}

impl MaterializeRequest {
    /// Final location of this entry
    pub fn entry_dir(&self) -> PathBuf {
        self.cache_dir.join(&self.entry_id)
    }

    fn output_name(&self, source: &str) -> SourceCacheResult<PathBuf> {
        fetch::output_name(source, self.strip.as_ref()).ok_or_else(|| {
            SourceCacheError::fetch(&self.locator, format!("cannot derive a file name from {}", source))
        })
    }
}

fn stage_files(request: &MaterializeRequest, stage: &Path) -> SourceCacheResult<Vec<PathBuf>> {
    let location = SourceLocation::parse(&request.locator);

    let local_pattern = match &location {
        SourceLocation::Local(path) if fetch::has_glob(&path.to_string_lossy()) => {
            Some(path.to_string_lossy().into_owned())
        }
        _ => None,
    };

    let Some(pattern) = local_pattern else {
        let relative = request.output_name(&request.locator)?;
        fetch::fetch_to(&request.locator, &stage.join(&relative), &request.fetch)?;
        return Ok(vec![relative]);
    };

    let matches = glob::glob(&pattern).map_err(|e| {
        SourceCacheError::cache_config(format!("invalid glob {}: {}", pattern, e))
    })?;

    // Matches keep their structure below the literal part of the pattern
    let base = fetch::glob_base(Path::new(&pattern));

    let mut outputs: Vec<PathBuf> = Vec::new();
    for entry in matches {
        let path = entry.map_err(|e| SourceCacheError::fetch(&request.locator, e.to_string()))?;
        if !path.is_file() {
            continue;
        }
        let source = path.to_string_lossy();
        let relative = match &request.strip {
            Some(_) => request.output_name(&source)?,
            None => match path
                .strip_prefix(&base)
                .ok()
                .and_then(|rel| fetch::safe_relative(&rel.to_string_lossy()))
            {
                Some(relative) => relative,
                None => request.output_name(&source)?,
            },
        };
        if outputs.contains(&relative) {
            return Err(SourceCacheError::fetch(
                &request.locator,
                format!("glob matches collide at {}", relative.display()),
            ));
        }
        fetch::copy_local(&request.locator, &path, &stage.join(&relative))?;
        outputs.push(relative);
    }

    debug!("Glob {} matched {} file(s)", pattern, outputs.len());
    Ok(outputs)
}

fn stage_directory(
    request: &MaterializeRequest,
    stage: &Path,
    depth: usize,
) -> SourceCacheResult<Vec<PathBuf>> {
    let root = match SourceLocation::parse(&request.locator) {
        SourceLocation::Local(path) => path,
        SourceLocation::Remote(_) => {
            return Err(SourceCacheError::fetch(
                &request.locator,
                "directory caches need a local root",
            ))
        }
    };

    if !root.is_dir() {
        return Err(SourceCacheError::fetch(&request.locator, "not a directory"));
    }

    // Relative structure is kept under an optional prefix
    let prefix = match &request.strip {
        Some(pattern) => fetch::safe_relative(&pattern.replace(&request.locator, "")),
        None => None,
    };

    let mut outputs = Vec::new();
    for entry in WalkDir::new(&root).min_depth(1).max_depth(depth).sort_by_file_name() {
        let entry = entry.map_err(|e| SourceCacheError::fetch(&request.locator, e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(&root)
            .map_err(|e| SourceCacheError::Internal(e.to_string()))?;
        let relative = match &prefix {
            Some(prefix) => prefix.join(relative),
            None => relative.to_path_buf(),
        };

        fetch::copy_local(&request.locator, entry.path(), &stage.join(&relative))?;
        outputs.push(relative);
    }

    Ok(outputs)
}

fn stage_archive(
    request: &MaterializeRequest,
    stage: &Path,
    format: Compression,
) -> SourceCacheResult<Vec<PathBuf>> {
    // Remote archives are downloaded next to the staging directory
    let _download;
    let archive_path = match SourceLocation::parse(&request.locator) {
        SourceLocation::Local(path) => {
            if !path.is_file() {
                return Err(SourceCacheError::fetch(&request.locator, "no such file"));
            }
            path
        }
        SourceLocation::Remote(url) => {
            let dir = tempfile::Builder::new()
                .prefix(".download-")
                .tempdir_in(&request.cache_dir)
                .map_err(|e| SourceCacheError::io("creating download directory", e))?;
            let path = dir.path().join("archive");
            fetch::download(&url, &path, &request.fetch)?;
            _download = dir;
            path
        }
    };

    let file = File::open(&archive_path).map_err(|e| {
        SourceCacheError::fetch(&request.locator, format!("opening archive: {}", e))
    })?;
    let reader = BufReader::new(file);
    let corrupt = |e: io::Error| {
        SourceCacheError::fetch(&request.locator, format!("extracting {}: {}", format, e))
    };

    match format {
        Compression::Tar => unpack_tar(Archive::new(reader), stage).map_err(corrupt)?,
        Compression::TarGz => {
            unpack_tar(Archive::new(GzDecoder::new(reader)), stage).map_err(corrupt)?
        }
        Compression::Gz => {
            let name = request.output_name(&request.locator)?;
            let stem = name
                .to_string_lossy()
                .strip_suffix(".gz")
                .filter(|stem| !stem.is_empty())
                .map(PathBuf::from);
            let name = stem.unwrap_or(name);
            let dest = stage.join(&name);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| SourceCacheError::io(format!("creating {}", parent.display()), e))?;
            }
            let mut out = File::create(&dest)
                .map_err(|e| SourceCacheError::io(format!("creating {}", dest.display()), e))?;
            io::copy(&mut GzDecoder::new(reader), &mut out).map_err(corrupt)?;
        }
        Compression::Zip => extract_zip(request, reader, stage)?,
    }

    list_files(stage)
}

/// Extracted files get the time of extraction, not the header's mtime
fn unpack_tar<R: io::Read>(mut archive: Archive<R>, stage: &Path) -> io::Result<()> {
    archive.set_preserve_mtime(false);
    archive.unpack(stage)
}

fn extract_zip(
    request: &MaterializeRequest,
    reader: BufReader<File>,
    stage: &Path,
) -> SourceCacheResult<()> {
    let corrupt = |e: zip::result::ZipError| {
        SourceCacheError::fetch(&request.locator, format!("reading zip: {}", e))
    };
    let mut archive = zip::ZipArchive::new(reader).map_err(corrupt)?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(corrupt)?;
        let Some(outpath) = file.enclosed_name().map(|p| stage.join(p)) else {
            warn!("Skipping unsafe zip entry {}", file.name());
            continue;
        };

        if file.is_dir() {
            fs::create_dir_all(&outpath)
                .map_err(|e| SourceCacheError::io(format!("creating {}", outpath.display()), e))?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SourceCacheError::io(format!("creating {}", parent.display()), e))?;
        }
        let mut out = File::create(&outpath)
            .map_err(|e| SourceCacheError::io(format!("creating {}", outpath.display()), e))?;
        io::copy(&mut file, &mut out).map_err(|e| {
            SourceCacheError::fetch(&request.locator, format!("extracting zip: {}", e))
        })?;
    }

    Ok(())
}

/// Every regular file under `root`, relative to it, in name order
fn list_files(root: &Path) -> SourceCacheResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| SourceCacheError::io("listing staged files", e.into()))?;
        if entry.file_type().is_file() {
            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|e| SourceCacheError::Internal(e.to_string()))?;
            files.push(relative.to_path_buf());
        }
    }
    Ok(files)
}

/// Move the staged tree into place.
///
/// A destination that already holds every expected file is the reuse path
/// (another loader got there first). An incomplete destination is replaced.
fn finalize(
    staging: TempDir,
    entry_dir: &Path,
    outputs: &[PathBuf],
) -> SourceCacheResult<Vec<PathBuf>> {
    let expected: Vec<PathBuf> = outputs.iter().map(|r| entry_dir.join(r)).collect();

    if entry_dir.exists() {
        if all_present(&expected) {
            debug!("Entry {} already complete, reusing", entry_dir.display());
            return Ok(expected);
        }
        debug!("Replacing incomplete entry {}", entry_dir.display());
        fs::remove_dir_all(entry_dir).map_err(|e| {
            SourceCacheError::io(format!("removing stale entry {}", entry_dir.display()), e)
        })?;
    }

    match fs::rename(staging.path(), entry_dir) {
        Ok(()) => Ok(expected),
        Err(_) if entry_dir.exists() && all_present(&expected) => {
            debug!("Entry {} finalized concurrently, reusing", entry_dir.display());
            Ok(expected)
        }
        Err(e) => Err(SourceCacheError::io(
            format!("finalizing entry {}", entry_dir.display()),
            e,
        )),
    }
}

fn all_present(paths: &[PathBuf]) -> bool {
    paths.iter().all(|p| p.is_file())
}
