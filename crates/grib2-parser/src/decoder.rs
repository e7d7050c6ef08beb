//! The decode capability consumed by the ingestion engine.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;
use tracing::debug;

use dataset::Dataset;

use crate::build::fields_to_dataset;
use crate::error::Grib2Result;
use crate::field::IndexedMessage;
use crate::filter::FilterByKeys;
use crate::reader::{index_messages, read_messages};

/// Open GRIB2 files as labeled datasets.
pub trait GribDecoder: Send + Sync {
    /// Decode the messages matching `filter`.
    ///
    /// Fails when the file is unreadable or nothing matches.
    fn open(&self, path: &Path, filter: &FilterByKeys) -> Grib2Result<Dataset>;

    /// Decode every message of the file.
    fn open_all(&self, path: &Path) -> Grib2Result<Dataset> {
        self.open(path, &FilterByKeys::new())
    }
}

/// Cache statistics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// A file is identified by path, size and modification time so that a
/// rewritten cache entry is parsed again.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FileKey {
    path: PathBuf,
    len: u64,
    modified: Option<SystemTime>,
}

/// [`GribDecoder`] backed by the `grib` crate.
///
/// Keeps the message index of recently opened files in an LRU cache so
/// that extracting several variables from one file scans its headers once.
/// Only the messages a filter selects are unpacked, and their values are
/// not cached.
pub struct GribCrateDecoder {
    cache: Mutex<LruCache<FileKey, Arc<Vec<IndexedMessage>>>>,
    stats: Mutex<CacheStats>,
    capacity: usize,
}

impl GribCrateDecoder {
    /// Create a decoder caching up to `capacity` file indexes (at least one).
    pub fn new(capacity: usize) -> Self {
        let cache_size = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(cache_size)),
            stats: Mutex::new(CacheStats::default()),
            capacity: cache_size.get(),
        }
    }

    fn lock_cache(&self) -> MutexGuard<'_, LruCache<FileKey, Arc<Vec<IndexedMessage>>>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_stats(&self) -> MutexGuard<'_, CacheStats> {
        self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Message index of `path`, from cache when unchanged on disk.
    pub fn index(&self, path: &Path) -> Grib2Result<Arc<Vec<IndexedMessage>>> {
        let meta = std::fs::metadata(path)?;
        let key = FileKey {
            path: path.to_path_buf(),
            len: meta.len(),
            modified: meta.modified().ok(),
        };

        if let Some(index) = self.lock_cache().get(&key) {
            self.lock_stats().hits += 1;
            return Ok(index.clone());
        }

        let index = Arc::new(index_messages(path)?);
        self.lock_stats().misses += 1;
        debug!(path = %path.display(), messages = index.len(), "Indexed GRIB2 file");

        let mut cache = self.lock_cache();
        if cache.len() >= cache.cap().get() && !cache.contains(&key) {
            self.lock_stats().evictions += 1;
        }
        cache.put(key, index.clone());
        Ok(index)
    }

    /// Drop any cached entry for `path`.
    pub fn evict(&self, path: &Path) {
        let mut cache = self.lock_cache();
        let stale: Vec<FileKey> = cache
            .iter()
            .filter(|(k, _)| k.path == path)
            .map(|(k, _)| k.clone())
            .collect();
        for key in stale {
            cache.pop(&key);
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.lock_stats().clone()
    }

    pub fn len(&self) -> usize {
        self.lock_cache().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_cache().is_empty()
    }

    pub fn clear(&self) {
        self.lock_cache().clear();
        *self.lock_stats() = CacheStats::default();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for GribCrateDecoder {
    fn default() -> Self {
        Self::new(8)
    }
}

impl GribDecoder for GribCrateDecoder {
    fn open(&self, path: &Path, filter: &FilterByKeys) -> Grib2Result<Dataset> {
        let index = self.index(path)?;
        let positions = filter.select(&index)?;
        let fields = read_messages(path, &positions)?;
        debug!(
            path = %path.display(),
            filter = %filter,
            selected = positions.len(),
            indexed = index.len(),
            "Unpacked selected messages"
        );
        let refs: Vec<_> = fields.iter().collect();
        fields_to_dataset(&refs)
    }
}
