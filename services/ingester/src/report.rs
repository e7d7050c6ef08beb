//! Per-run summary of assembled and empty samples.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dataset::Dataset;
use forecast_common::DimensionKey;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Samples that could not be assembled are kept for a later backfill run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub samples: usize,
    pub assembled: usize,
    pub empty: Vec<DimensionKey>,
}

impl IngestReport {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            started_at: Utc::now(),
            samples: 0,
            assembled: 0,
            empty: Vec::new(),
        }
    }

    pub fn record(&mut self, dims: &DimensionKey, sample: &Dataset) {
        self.samples += 1;
        if sample.is_empty() {
            self.empty.push(*dims);
        } else {
            self.assembled += 1;
        }
    }

    /// Initialization times with at least one empty sample.
    pub fn backfill_t0s(&self) -> Vec<DateTime<Utc>> {
        let t0s: BTreeSet<DateTime<Utc>> = self.empty.iter().map(|d| d.t0).collect();
        t0s.into_iter().collect()
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing report to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dataset::{Values, Variable};

    fn dims(day: u32, fhr: u32) -> DimensionKey {
        DimensionKey::new(Utc.with_ymd_and_hms(2020, 1, day, 0, 0, 0).unwrap(), fhr)
    }

    fn sample() -> Dataset {
        let mut ds = Dataset::new();
        ds.insert_data_var("t2m", Variable::scalar(Values::scalar_f64(280.0)))
            .unwrap();
        ds
    }

    #[test]
    fn test_record_counts_empty_samples() {
        let mut report = IngestReport::new("gfs_forecast");
        report.record(&dims(1, 0), &sample());
        report.record(&dims(1, 6), &Dataset::new());
        report.record(&dims(2, 6), &Dataset::new());
        report.record(&dims(2, 12), &Dataset::new());

        assert_eq!(report.samples, 4);
        assert_eq!(report.assembled, 1);
        assert_eq!(report.empty.len(), 3);
        assert_eq!(report.backfill_t0s(), vec![dims(1, 0).t0, dims(2, 0).t0]);
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/gfs.json");
        let mut report = IngestReport::new("gfs_forecast");
        report.record(&dims(1, 6).with_member(3), &Dataset::new());
        report.write(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["source"], "gfs_forecast");
        assert_eq!(value["empty"][0]["fhr"], 6);
        assert_eq!(value["empty"][0]["member"], 3);
    }
}
