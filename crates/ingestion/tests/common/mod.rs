//! Shared harness: a source whose files live in a temp directory and are
//! decoded from in-memory fields.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use forecast_common::{DimensionKey, HourRange, T0Range};
use grib2_parser::GribField;
use ingestion::{GribForecastSource, SourceConfig, SourceFamily, VariableRegistry};
use std::path::Path;
use std::sync::Arc;
use storage::{FileFetcher, StorageError};
use tempfile::TempDir;
use test_utils::{reference_time, touch, InMemoryDecoder};

/// Local paths resolve in place, so nothing should ever be fetched.
pub struct NoFetch;

impl FileFetcher for NoFetch {
    fn fetch(&self, source: &str, _dest: &Path) -> storage::Result<()> {
        Err(StorageError::InvalidPath(format!("unexpected fetch of {source}")))
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub decoder: Arc<InMemoryDecoder>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            decoder: Arc::new(InMemoryDecoder::new()),
        }
    }

    /// `name` over t0 = 2020-01-01T00 and the given forecast hours, with
    /// files under the harness directory.
    pub fn config(&self, name: &str, fhr: HourRange, variables: &[&str]) -> SourceConfig {
        let t0 = reference_time();
        let mut config = SourceConfig::new(name, T0Range::new(t0, t0, 24), fhr);
        config.variables = Some(variables.iter().map(|v| v.to_string()).collect());
        config.path_template = Some(format!(
            "{}/{{date}}/{{hh}}/m{{member}}.f{{fhr}}.{{suffix}}.grib2",
            self.dir.path().display()
        ));
        config
    }

    pub fn source(&self, config: SourceConfig) -> GribForecastSource {
        let family = SourceFamily::from_name(&config.name).unwrap();
        let registry = VariableRegistry::embedded(family).unwrap();
        GribForecastSource::from_parts(config, registry, Arc::new(NoFetch), self.decoder.clone())
            .unwrap()
    }

    /// Write the file for (`dims`, `suffix`) and register its messages.
    pub fn add_file(
        &self,
        source: &GribForecastSource,
        dims: &DimensionKey,
        suffix: &str,
        fields: Vec<GribField>,
    ) {
        let path = source.source_path(dims, suffix);
        touch(Path::new(&path)).unwrap();
        self.decoder.add_file(path, fields);
    }
}

pub fn dims(fhr: u32) -> DimensionKey {
    DimensionKey::new(reference_time(), fhr)
}

pub fn hours_after_t0(hours: i64) -> DateTime<Utc> {
    reference_time() + Duration::hours(hours)
}
