//! Source paths for forecast files.

use forecast_common::DimensionKey;
use std::path::PathBuf;

use crate::error::{Result, StorageError};

/// Builds the source path of the file holding `suffix` for one sample.
pub trait PathBuilder: Send + Sync {
    fn build_path(&self, dims: &DimensionKey, suffix: &str) -> String;
}

impl<F> PathBuilder for F
where
    F: Fn(&DimensionKey, &str) -> String + Send + Sync,
{
    fn build_path(&self, dims: &DimensionKey, suffix: &str) -> String {
        self(dims, suffix)
    }
}

/// Where a source path points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    S3 { bucket: String, key: String },
    Http { origin: String, path: String },
    Local(PathBuf),
}

impl Location {
    pub fn parse(path: &str) -> Result<Self> {
        if let Some(rest) = path.strip_prefix("s3://") {
            let (bucket, key) = rest
                .split_once('/')
                .ok_or_else(|| StorageError::InvalidPath(path.to_string()))?;
            if bucket.is_empty() || key.is_empty() {
                return Err(StorageError::InvalidPath(path.to_string()));
            }
            return Ok(Location::S3 {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        for scheme in ["https://", "http://"] {
            if let Some(rest) = path.strip_prefix(scheme) {
                let (host, key) = rest
                    .split_once('/')
                    .ok_or_else(|| StorageError::InvalidPath(path.to_string()))?;
                return Ok(Location::Http {
                    origin: format!("{scheme}{host}"),
                    path: key.to_string(),
                });
            }
        }
        let local = path.strip_prefix("file://").unwrap_or(path);
        if local.contains("://") {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(Location::Local(PathBuf::from(local)))
    }

    pub fn is_remote(&self) -> bool {
        !matches!(self, Location::Local(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_parse_s3() {
        let loc = Location::parse("s3://noaa-gefs-pds/gefs.20200101/00/file").unwrap();
        assert_eq!(
            loc,
            Location::S3 {
                bucket: "noaa-gefs-pds".into(),
                key: "gefs.20200101/00/file".into()
            }
        );
        assert!(loc.is_remote());
    }

    #[test]
    fn test_parse_http() {
        let loc = Location::parse("https://example.com/a/b.grib2").unwrap();
        assert_eq!(
            loc,
            Location::Http {
                origin: "https://example.com".into(),
                path: "a/b.grib2".into()
            }
        );
    }

    #[test]
    fn test_parse_local() {
        assert_eq!(
            Location::parse("/data/x.grib2").unwrap(),
            Location::Local(PathBuf::from("/data/x.grib2"))
        );
        assert_eq!(
            Location::parse("file:///data/x.grib2").unwrap(),
            Location::Local(PathBuf::from("/data/x.grib2"))
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Location::parse("s3://bucket-only").is_err());
        assert!(Location::parse("gs://bucket/key").is_err());
    }

    #[test]
    fn test_closure_path_builder() {
        let builder = |dims: &DimensionKey, suffix: &str| format!("/data/{}.{}", dims.fhr, suffix);
        let dims = DimensionKey::new(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(), 6);
        assert_eq!(builder.build_path(&dims, "a"), "/data/6.a");
    }
}
