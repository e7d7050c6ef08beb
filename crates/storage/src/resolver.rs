//! Resolving sample files to local paths.

use forecast_common::DimensionKey;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::error::{Result, StorageError};
use crate::fetch::FileFetcher;
use crate::path::{Location, PathBuilder};

/// A source file available on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFile {
    path: PathBuf,
    source: String,
    cached: bool,
}

impl CachedFile {
    /// A local file used where it lies, outside any cache directory.
    pub fn in_place(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            source: path.display().to_string(),
            path,
            cached: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The path the file was resolved from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when the file is a copy inside a cache directory.
    pub fn is_cached(&self) -> bool {
        self.cached
    }

    /// Delete the cached copy. Files used in place are left alone.
    pub fn remove(self) -> Result<()> {
        if self.cached && self.path.exists() {
            std::fs::remove_file(&self.path)?;
            debug!(path = %self.path.display(), "Removed cached file");
        }
        Ok(())
    }
}

/// Location of a source's entry relative to a cache directory.
///
/// The entry mirrors the source: `s3/<bucket>/<key>`, `<scheme>/<host>/<path>`
/// for HTTP(S) and `local/<path>` for local files. Distinct sources never
/// share an entry. Names are kept as is, so a `.gz` source is stored
/// decompressed under its `.gz` name.
pub fn cache_entry_path(source: &str) -> Result<PathBuf> {
    let invalid = || StorageError::InvalidPath(format!("{source}: cannot be cached"));
    let mut entry = PathBuf::new();
    match Location::parse(source)? {
        Location::S3 { bucket, key } => {
            entry.push("s3");
            push_segments(&mut entry, std::iter::once(bucket.as_str()).chain(key.split('/')))
                .ok_or_else(invalid)?;
        }
        Location::Http { origin, path } => {
            let (scheme, host) = origin.split_once("://").ok_or_else(invalid)?;
            entry.push(scheme);
            push_segments(&mut entry, std::iter::once(host).chain(path.split('/')))
                .ok_or_else(invalid)?;
        }
        Location::Local(path) => {
            entry.push("local");
            for component in path.components() {
                match component {
                    Component::Normal(part) => entry.push(part),
                    Component::RootDir | Component::Prefix(_) => {}
                    Component::CurDir | Component::ParentDir => return Err(invalid()),
                }
            }
        }
    }
    Ok(entry)
}

/// Append `/`-separated segments, refusing empty, `.` and `..` segments.
fn push_segments<'a>(entry: &mut PathBuf, segments: impl Iterator<Item = &'a str>) -> Option<()> {
    for segment in segments {
        if segment.is_empty() || segment == "." || segment == ".." {
            return None;
        }
        entry.push(segment);
    }
    Some(())
}

/// Maps (dims, suffix) to a local file, or to nothing.
///
/// Every failure (unknown host, missing object, unreadable path) is
/// reported with a warning and yields `None`; there is no retry.
pub struct LocalFileResolver {
    paths: Arc<dyn PathBuilder>,
    fetcher: Arc<dyn FileFetcher>,
}

impl LocalFileResolver {
    pub fn new(paths: Arc<dyn PathBuilder>, fetcher: Arc<dyn FileFetcher>) -> Self {
        Self { paths, fetcher }
    }

    /// Source path of the file holding `suffix` for `dims`.
    pub fn source_path(&self, dims: &DimensionKey, suffix: &str) -> String {
        self.paths.build_path(dims, suffix)
    }

    /// Resolve one file.
    ///
    /// With a cache directory the source is materialized there (reusing an
    /// existing entry). Without one, only local sources resolve, in place.
    #[instrument(skip(self, dims), fields(dims = %dims))]
    pub fn resolve(
        &self,
        dims: &DimensionKey,
        suffix: &str,
        cache_dir: Option<&Path>,
    ) -> Option<CachedFile> {
        let source = self.source_path(dims, suffix);
        match self.try_resolve(&source, cache_dir) {
            Ok(file) => Some(file),
            Err(e) => {
                warn!(
                    path = %source,
                    dims = %dims,
                    file_suffix = %suffix,
                    error = %e,
                    "Trouble finding the file"
                );
                None
            }
        }
    }

    /// The existing cache entry for (`dims`, `suffix`), without fetching.
    pub fn cached(&self, dims: &DimensionKey, suffix: &str, cache_dir: &Path) -> Option<CachedFile> {
        let source = self.source_path(dims, suffix);
        let path = cache_dir.join(cache_entry_path(&source).ok()?);
        path.is_file().then_some(CachedFile {
            path,
            source,
            cached: true,
        })
    }

    fn try_resolve(&self, source: &str, cache_dir: Option<&Path>) -> Result<CachedFile> {
        let location = Location::parse(source)?;
        let Some(cache_dir) = cache_dir else {
            return match location {
                Location::Local(path) if path.is_file() => Ok(CachedFile::in_place(path)),
                Location::Local(path) => Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} does not exist", path.display()),
                )
                .into()),
                _ => Err(StorageError::InvalidPath(format!(
                    "{source}: remote path requires a cache directory"
                ))),
            };
        };

        let dest = cache_dir.join(cache_entry_path(source)?);
        if dest.is_file() {
            debug!(path = %dest.display(), "Using cached file");
        } else {
            self.fetcher.fetch(source, &dest)?;
        }
        Ok(CachedFile {
            path: dest,
            source: source.to_string(),
            cached: true,
        })
    }
}
