//! Source configuration.
//!
//! A source is described by one YAML document:
//!
//! ```yaml
//! name: gefs_forecast
//! t0: {start: "2020-01-01T00", end: "2020-01-02T00", freq_hours: 24}
//! fhr: {start: 0, end: 240, step: 6}
//! member: {start: 0, end: 30}
//! variables: [t2m, tp, t, gh]
//! levels: [500, 850]
//! accum_hrs: {tp: 6}
//! slices:
//!   sel: {latitude: [60, 20]}
//!   isel: {level: [0, 2]}
//! cache_dir: /tmp/gefs-cache
//! ```

use forecast_common::{HourRange, MemberRange, T0Range};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{IngestionError, Result};

/// Everything needed to construct a [`GribForecastSource`](crate::GribForecastSource).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Source name; must contain `gefs`, `gfs` or `hrrr`.
    pub name: String,
    pub t0: T0Range,
    pub fhr: HourRange,
    /// Ensemble members, for ensemble sources only.
    #[serde(default)]
    pub member: Option<MemberRange>,
    /// Variables to ingest; all registered variables when omitted.
    #[serde(default)]
    pub variables: Option<Vec<String>>,
    /// Vertical levels to keep.
    #[serde(default)]
    pub levels: Option<Vec<f64>>,
    /// Match levels within a small tolerance instead of exactly.
    #[serde(default)]
    pub use_nearest_levels: bool,
    #[serde(default)]
    pub slices: Slices,
    /// Accumulation window in hours per variable.
    #[serde(default)]
    pub accum_hrs: Option<BTreeMap<String, u32>>,
    /// Overrides the family's default path, e.g.
    /// `/data/gfs.{date}/{hh}/gfs.t{hh}z.pgrb2{suffix}.0p25.f{fhr}`.
    #[serde(default)]
    pub path_template: Option<String>,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl SourceConfig {
    /// A config covering one initialization time and the given forecast hours.
    pub fn new(name: &str, t0: T0Range, fhr: HourRange) -> Self {
        Self {
            name: name.to_string(),
            t0,
            fhr,
            member: None,
            variables: None,
            levels: None,
            use_nearest_levels: false,
            slices: Slices::default(),
            accum_hrs: None,
            path_template: None,
            cache_dir: None,
        }
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            IngestionError::InvalidConfig(format!("Cannot read {:?}: {}", path, e))
        })?;
        Self::from_yaml_str(&contents)
    }
}

/// Subsetting applied to every assembled sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Slices {
    /// Inclusive coordinate-label ranges per dimension.
    #[serde(default)]
    pub sel: BTreeMap<String, (f64, f64)>,
    /// Half-open index ranges per dimension.
    #[serde(default)]
    pub isel: BTreeMap<String, (usize, usize)>,
}

impl Slices {
    pub fn is_empty(&self) -> bool {
        self.sel.is_empty() && self.isel.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
name: gefs_forecast
t0: {start: "2020-01-01T00", end: "2020-01-02T00", freq_hours: 24}
fhr: {start: 0, end: 12, step: 6}
member: {start: 0, end: 2}
variables: [t2m, tp]
levels: [500, 850]
use_nearest_levels: true
accum_hrs: {tp: 6}
slices:
  sel: {latitude: [60, 20]}
  isel: {level: [0, 2]}
cache_dir: /tmp/cache
"#;
        let config = SourceConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.name, "gefs_forecast");
        assert_eq!(
            config.t0.start,
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(config.fhr.values(), vec![0, 6, 12]);
        assert_eq!(config.member.unwrap().values(), vec![0, 1, 2]);
        assert_eq!(config.levels, Some(vec![500.0, 850.0]));
        assert!(config.use_nearest_levels);
        assert_eq!(config.accum_hrs.unwrap()["tp"], 6);
        assert_eq!(config.slices.sel["latitude"], (60.0, 20.0));
        assert_eq!(config.slices.isel["level"], (0, 2));
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/cache")));
    }

    #[test]
    fn test_minimal_config_defaults() {
        let yaml = r#"
name: gfs
t0: {start: "2020-01-01T00", end: "2020-01-01T00"}
fhr: {start: 6, end: 6}
"#;
        let config = SourceConfig::from_yaml_str(yaml).unwrap();
        assert!(config.member.is_none());
        assert!(config.variables.is_none());
        assert!(config.slices.is_empty());
        assert!(!config.use_nearest_levels);
        assert_eq!(config.t0.freq_hours, 6);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = r#"
name: gfs
t0: {start: "2020-01-01T00", end: "2020-01-01T00"}
fhr: {start: 6, end: 6}
bogus: 1
"#;
        assert!(matches!(
            SourceConfig::from_yaml_str(yaml),
            Err(IngestionError::Yaml(_))
        ));
    }
}
