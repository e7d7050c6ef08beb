//! Sample dimension keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one forecast sample.
///
/// A key is produced by the caller per sample request and is used both to
/// build source file paths and as the coordinate values of the assembled
/// sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionKey {
    /// Forecast initialization time
    pub t0: DateTime<Utc>,
    /// Forecast lead hour
    pub fhr: u32,
    /// Ensemble member, `None` for deterministic sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<u32>,
    /// Vertical coordinate value, for sources sampled per level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<f64>,
}

impl DimensionKey {
    pub fn new(t0: DateTime<Utc>, fhr: u32) -> Self {
        Self {
            t0,
            fhr,
            member: None,
            level: None,
        }
    }

    pub fn with_member(mut self, member: u32) -> Self {
        self.member = Some(member);
        self
    }

    pub fn with_level(mut self, level: f64) -> Self {
        self.level = Some(level);
        self
    }

    /// The (t0, member) pair static variables are decoded once for.
    pub fn static_key(&self) -> (DateTime<Utc>, Option<u32>) {
        (self.t0, self.member)
    }

    /// Initialization date as `YYYYMMDD`.
    pub fn date_str(&self) -> String {
        self.t0.format("%Y%m%d").to_string()
    }

    /// Initialization cycle hour as two digits.
    pub fn cycle_str(&self) -> String {
        self.t0.format("%H").to_string()
    }
}

impl fmt::Display for DimensionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t0={}, fhr={}", self.t0.format("%Y-%m-%dT%H:%M:%S"), self.fhr)?;
        if let Some(member) = self.member {
            write!(f, ", member={member}")?;
        }
        if let Some(level) = self.level {
            write!(f, ", level={level}")?;
        }
        Ok(())
    }
}
