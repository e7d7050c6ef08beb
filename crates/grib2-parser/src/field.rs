//! Decoded GRIB2 messages.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::filter::FilterValue;

/// Statistical processing applied over the message's time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Instant,
    Accum,
    Avg,
    Max,
    Min,
}

impl StepType {
    /// Map a Code Table 4.10 statistical process.
    pub fn from_statistical_process(code: u8) -> Option<Self> {
        match code {
            0 => Some(StepType::Avg),
            1 => Some(StepType::Accum),
            2 => Some(StepType::Max),
            3 => Some(StepType::Min),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Instant => "instant",
            StepType::Accum => "accum",
            StepType::Avg => "avg",
            StepType::Max => "max",
            StepType::Min => "min",
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Horizontal coordinates of a message's grid.
#[derive(Debug, Clone, PartialEq)]
pub enum HorizontalGrid {
    /// Regular lat/lon grid with 1-d axes.
    Regular {
        latitudes: Vec<f64>,
        longitudes: Vec<f64>,
    },
    /// Projected grid with 2-d lat/lon, row-major `ny * nx`.
    Projected {
        latitudes: Vec<f64>,
        longitudes: Vec<f64>,
    },
    /// Projected grid without computed coordinates.
    IndexOnly,
}

/// Position of a submessage within its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessagePosition {
    pub message: usize,
    pub submessage: usize,
}

/// Identification and product keys of one GRIB2 message, without its data.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageHeader {
    pub discipline: u8,
    pub category: u8,
    pub number: u8,
    /// ecCodes `shortName`, e.g. `2t`.
    pub short_name: String,
    /// CF variable name, e.g. `t2m`.
    pub var_name: String,
    pub long_name: String,
    pub units: String,
    /// ecCodes `typeOfLevel`, e.g. `isobaricInhPa`.
    pub type_of_level: String,
    pub level: f64,
    pub step_type: StepType,
    /// Start of the time range in hours (equals `end_step` for instantaneous fields).
    pub start_step: u32,
    /// End of the time range in hours.
    pub end_step: u32,
    pub reference_time: DateTime<Utc>,
    /// Ensemble perturbation number, when the product template carries one.
    pub perturbation_number: Option<u32>,
    pub nx: usize,
    pub ny: usize,
}

impl MessageHeader {
    /// ecCodes `stepRange`: `"6"` for instantaneous fields, `"0-6"` otherwise.
    pub fn step_range(&self) -> String {
        match self.step_type {
            StepType::Instant => self.end_step.to_string(),
            _ => format!("{}-{}", self.start_step, self.end_step),
        }
    }

    pub fn valid_time(&self) -> DateTime<Utc> {
        self.reference_time + Duration::hours(i64::from(self.end_step))
    }

    /// Value of a filter key for this message.
    pub fn key(&self, name: &str) -> Option<FilterValue> {
        let v = match name {
            "shortName" => FilterValue::Str(self.short_name.clone()),
            "cfVarName" => FilterValue::Str(self.var_name.clone()),
            "typeOfLevel" => FilterValue::Str(self.type_of_level.clone()),
            "level" => FilterValue::Float(self.level),
            "stepType" => FilterValue::Str(self.step_type.as_str().to_string()),
            "stepRange" => FilterValue::Str(self.step_range()),
            "step" | "endStep" => FilterValue::Int(i64::from(self.end_step)),
            "discipline" => FilterValue::Int(i64::from(self.discipline)),
            "parameterCategory" => FilterValue::Int(i64::from(self.category)),
            "parameterNumber" => FilterValue::Int(i64::from(self.number)),
            "perturbationNumber" | "number" => {
                FilterValue::Int(i64::from(self.perturbation_number.unwrap_or(0)))
            }
            _ => return None,
        };
        Some(v)
    }
}

impl fmt::Display for MessageHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.short_name,
            self.type_of_level,
            self.level,
            self.step_type,
            self.step_range()
        )
    }
}

/// Header of a message together with where it sits in the file.
///
/// A file's index is a list of these; it is cheap to keep around and is
/// what filters are evaluated against before anything is unpacked.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedMessage {
    pub position: MessagePosition,
    pub header: MessageHeader,
}

/// One decoded GRIB2 message: its header, grid and unpacked values.
#[derive(Debug, Clone, PartialEq)]
pub struct GribField {
    pub header: MessageHeader,
    pub grid: HorizontalGrid,
    /// Row-major `ny * nx` values, NaN where bitmapped out.
    pub values: Vec<f32>,
}

impl GribField {
    pub fn step_range(&self) -> String {
        self.header.step_range()
    }

    pub fn key(&self, name: &str) -> Option<FilterValue> {
        self.header.key(name)
    }
}

impl fmt::Display for GribField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.header, f)
    }
}
