//! Forecast-system families and what each one provides.
//!
//! The family is resolved once from the configured source name; everything
//! that differs between GEFS, GFS and HRRR (file layout, dimensions, static
//! fields) hangs off [`SourceCapabilities`].

use forecast_common::DimensionKey;
use std::fmt;
use storage::PathBuilder;

use crate::error::{IngestionError, Result};

/// Known forecast-system families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFamily {
    Gefs,
    Gfs,
    Hrrr,
}

impl SourceFamily {
    /// Resolve the family from a source name, case-insensitively.
    pub fn from_name(name: &str) -> Result<Self> {
        let lower = name.to_lowercase();
        if lower.contains("gefs") {
            Ok(SourceFamily::Gefs)
        } else if lower.contains("gfs") {
            Ok(SourceFamily::Gfs)
        } else if lower.contains("hrrr") {
            Ok(SourceFamily::Hrrr)
        } else {
            Err(IngestionError::UnsupportedSource(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFamily::Gefs => "gefs",
            SourceFamily::Gfs => "gfs",
            SourceFamily::Hrrr => "hrrr",
        }
    }

    pub fn capabilities(&self) -> SourceCapabilities {
        match self {
            SourceFamily::Gefs => SourceCapabilities {
                family: *self,
                file_suffixes: &["a", "b"],
                sample_dims: &["t0", "fhr", "member"],
                horizontal_dims: &["latitude", "longitude"],
                static_vars: &["lsm", "orog"],
                rename: RENAME,
                available_levels: GEFS_LEVELS,
            },
            SourceFamily::Gfs => SourceCapabilities {
                family: *self,
                file_suffixes: &["", "b"],
                sample_dims: &["t0", "fhr"],
                horizontal_dims: &["latitude", "longitude"],
                static_vars: &["lsm", "orog"],
                rename: RENAME,
                available_levels: GFS_LEVELS,
            },
            SourceFamily::Hrrr => SourceCapabilities {
                family: *self,
                file_suffixes: &["sfc", "prs"],
                sample_dims: &["t0", "fhr"],
                horizontal_dims: &["y", "x"],
                static_vars: &["lsm", "orog"],
                rename: RENAME,
                available_levels: HRRR_LEVELS,
            },
        }
    }
}

impl fmt::Display for SourceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const RENAME: &[(&str, &str)] = &[
    ("time", "t0"),
    ("step", "lead_time"),
    ("isobaricInhPa", "level"),
];

const GEFS_LEVELS: &[f64] = &[
    10.0, 20.0, 30.0, 50.0, 70.0, 100.0, 150.0, 200.0, 250.0, 300.0, 350.0, 400.0, 450.0, 500.0,
    550.0, 600.0, 650.0, 700.0, 750.0, 800.0, 850.0, 900.0, 925.0, 950.0, 975.0, 1000.0,
];

const GFS_LEVELS: &[f64] = &[
    1.0, 2.0, 3.0, 5.0, 7.0, 10.0, 15.0, 20.0, 30.0, 40.0, 50.0, 70.0, 100.0, 150.0, 200.0, 250.0,
    300.0, 350.0, 400.0, 450.0, 500.0, 550.0, 600.0, 650.0, 700.0, 750.0, 800.0, 850.0, 900.0,
    925.0, 950.0, 975.0, 1000.0,
];

const HRRR_LEVELS: &[f64] = &[
    50.0, 75.0, 100.0, 125.0, 150.0, 175.0, 200.0, 225.0, 250.0, 275.0, 300.0, 325.0, 350.0,
    375.0, 400.0, 425.0, 450.0, 475.0, 500.0, 525.0, 550.0, 575.0, 600.0, 625.0, 650.0, 675.0,
    700.0, 725.0, 750.0, 775.0, 800.0, 825.0, 850.0, 875.0, 900.0, 925.0, 950.0, 975.0, 1000.0,
];

/// Per-family layout and naming.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceCapabilities {
    pub family: SourceFamily,
    /// Physical files making up one sample, e.g. `a`/`b` for GEFS.
    pub file_suffixes: &'static [&'static str],
    pub sample_dims: &'static [&'static str],
    pub horizontal_dims: &'static [&'static str],
    /// Time-invariant fields, decoded once per (t0, member).
    pub static_vars: &'static [&'static str],
    /// Decoder names → canonical names, applied when present.
    pub rename: &'static [(&'static str, &'static str)],
    /// Pressure levels (hPa) the family publishes.
    pub available_levels: &'static [f64],
}

impl SourceCapabilities {
    pub fn is_static(&self, varname: &str) -> bool {
        self.static_vars.contains(&varname)
    }

    /// Canonical axis order for a dynamic variable.
    pub fn canonical_dims(&self, has_member: bool, has_level: bool) -> Vec<&'static str> {
        let mut dims = vec!["t0", "fhr"];
        if has_member {
            dims.push("member");
        }
        if has_level {
            dims.push("level");
        }
        dims.extend(self.horizontal_dims);
        dims
    }
}

// ============================================================================
// Path builders
// ============================================================================

/// The NOAA open-data bucket layout for a family.
#[derive(Debug, Clone, Copy)]
pub struct DefaultPathBuilder {
    family: SourceFamily,
}

impl DefaultPathBuilder {
    pub fn new(family: SourceFamily) -> Self {
        Self { family }
    }
}

impl PathBuilder for DefaultPathBuilder {
    fn build_path(&self, dims: &DimensionKey, suffix: &str) -> String {
        let date = dims.date_str();
        let hh = dims.cycle_str();
        match self.family {
            SourceFamily::Gefs => {
                let member = match dims.member.unwrap_or(0) {
                    0 => "c00".to_string(),
                    m => format!("p{m:02}"),
                };
                format!(
                    "s3://noaa-gefs-pds/gefs.{date}/{hh}/atmos/pgrb2{suffix}p5/ge{member}.t{hh}z.pgrb2{suffix}.0p50.f{:03}",
                    dims.fhr
                )
            }
            SourceFamily::Gfs => format!(
                "s3://noaa-gfs-bdp-pds/gfs.{date}/{hh}/atmos/gfs.t{hh}z.pgrb2{suffix}.0p25.f{:03}",
                dims.fhr
            ),
            SourceFamily::Hrrr => format!(
                "s3://noaa-hrrr-bdp-pds/hrrr.{date}/conus/hrrr.t{hh}z.wrf{suffix}f{:02}.grib2",
                dims.fhr
            ),
        }
    }
}

const PLACEHOLDERS: &[&str] = &["date", "hh", "fhr", "fhr2", "member", "suffix"];

/// Path builder from a user template.
///
/// Placeholders: `{date}` (YYYYMMDD), `{hh}` (cycle hour), `{fhr}` (three
/// digits), `{fhr2}` (two digits), `{member}` (two digits, 0 when the
/// source has no members) and `{suffix}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePathBuilder {
    template: String,
}

impl TemplatePathBuilder {
    pub fn new(template: &str) -> Result<Self> {
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            let close = rest[open..].find('}').ok_or_else(|| {
                IngestionError::InvalidConfig(format!("unterminated placeholder in '{template}'"))
            })?;
            let name = &rest[open + 1..open + close];
            if !PLACEHOLDERS.contains(&name) {
                return Err(IngestionError::InvalidConfig(format!(
                    "unknown placeholder '{{{name}}}' in '{template}'"
                )));
            }
            rest = &rest[open + close + 1..];
        }
        Ok(Self {
            template: template.to_string(),
        })
    }
}

impl PathBuilder for TemplatePathBuilder {
    fn build_path(&self, dims: &DimensionKey, suffix: &str) -> String {
        self.template
            .replace("{date}", &dims.date_str())
            .replace("{hh}", &dims.cycle_str())
            .replace("{fhr2}", &format!("{:02}", dims.fhr))
            .replace("{fhr}", &format!("{:03}", dims.fhr))
            .replace("{member}", &format!("{:02}", dims.member.unwrap_or(0)))
            .replace("{suffix}", suffix)
    }
}
