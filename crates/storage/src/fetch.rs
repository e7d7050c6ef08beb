//! Materializing source files locally.

use bytes::Bytes;
use object_store::{aws::AmazonS3Builder, http::HttpBuilder, path::Path as ObjectPath, ObjectStore};
use std::io::{Read, Write};
use std::path::Path;
use tokio::runtime::Runtime;
use tracing::{debug, instrument};

use crate::error::{Result, StorageError};
use crate::path::Location;

/// Copies a source file to a local destination.
pub trait FileFetcher: Send + Sync {
    fn fetch(&self, source: &str, dest: &Path) -> Result<()>;
}

/// [`FileFetcher`] over `object_store`.
///
/// S3 buckets are read anonymously (NOAA open data), HTTP(S) through the
/// generic HTTP store, local paths are copied. Sources ending in `.gz`
/// are decompressed on the way. Calls block on a private current-thread
/// runtime.
pub struct ObjectStoreFetcher {
    runtime: Runtime,
    region: String,
}

impl ObjectStoreFetcher {
    pub fn new() -> Result<Self> {
        Self::with_region("us-east-1")
    }

    pub fn with_region(region: &str) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StorageError::Runtime(e.to_string()))?;
        Ok(Self {
            runtime,
            region: region.to_string(),
        })
    }

    fn read(&self, location: &Location) -> Result<Bytes> {
        match location {
            Location::S3 { bucket, key } => {
                let store = AmazonS3Builder::new()
                    .with_bucket_name(bucket)
                    .with_region(&self.region)
                    .with_skip_signature(true)
                    .build()?;
                self.get(&store, key)
            }
            Location::Http { origin, path } => {
                let store = HttpBuilder::new().with_url(origin).build()?;
                self.get(&store, path)
            }
            Location::Local(path) => Ok(Bytes::from(std::fs::read(path)?)),
        }
    }

    fn get(&self, store: &dyn ObjectStore, key: &str) -> Result<Bytes> {
        let location =
            ObjectPath::parse(key).map_err(|e| StorageError::InvalidPath(format!("{key}: {e}")))?;
        self.runtime.block_on(async {
            let result = store.get(&location).await?;
            Ok::<Bytes, StorageError>(result.bytes().await?)
        })
    }
}

impl FileFetcher for ObjectStoreFetcher {
    #[instrument(skip(self), fields(dest = %dest.display()))]
    fn fetch(&self, source: &str, dest: &Path) -> Result<()> {
        let location = Location::parse(source)?;
        let mut data = self.read(&location)?;
        if source.ends_with(".gz") {
            data = decompress_gzip(&data)?;
        }
        debug!(size = data.len(), "Fetched file");
        write_atomic(dest, &data)
    }
}

/// Write through a temporary file in the destination directory so that a
/// failed transfer never leaves a partial cache entry behind.
fn write_atomic(dest: &Path, data: &[u8]) -> Result<()> {
    let dir = dest
        .parent()
        .ok_or_else(|| StorageError::InvalidPath(dest.display().to_string()))?;
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(dest).map_err(|e| StorageError::Io(e.error))?;
    Ok(())
}

/// Decompress gzip-compressed GRIB2 data.
pub fn decompress_gzip(data: &[u8]) -> Result<Bytes> {
    let mut decoder = flate2::read::GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| StorageError::Decompression(e.to_string()))?;
    Ok(Bytes::from(decompressed))
}
