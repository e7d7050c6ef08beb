//! Message selection by ecCodes keys.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Grib2Error, Grib2Result};
use crate::field::{IndexedMessage, MessageHeader, MessagePosition};

/// Keys a filter may constrain.
pub const SUPPORTED_KEYS: &[&str] = &[
    "shortName",
    "cfVarName",
    "typeOfLevel",
    "level",
    "stepType",
    "stepRange",
    "step",
    "endStep",
    "discipline",
    "parameterCategory",
    "parameterNumber",
    "perturbationNumber",
    "number",
];

/// A filter value as written in YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl FilterValue {
    fn as_f64(&self) -> Option<f64> {
        match self {
            FilterValue::Int(v) => Some(*v as f64),
            FilterValue::Float(v) => Some(*v),
            FilterValue::Str(_) => None,
        }
    }

    /// Equality with numeric values compared across int/float.
    pub fn matches(&self, other: &FilterValue) -> bool {
        match (self, other) {
            (FilterValue::Str(a), FilterValue::Str(b)) => a == b,
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => (a - b).abs() < 1e-9,
                _ => false,
            },
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Int(v) => write!(f, "{v}"),
            FilterValue::Float(v) => write!(f, "{v}"),
            FilterValue::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Str(s.to_string())
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Int(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        FilterValue::Float(v)
    }
}

/// Conjunction of key constraints, e.g.
/// `{typeOfLevel: heightAboveGround, level: 2, shortName: 2t}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterByKeys(BTreeMap<String, FilterValue>);

impl FilterByKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<FilterValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<FilterValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Constrain the statistical time range, e.g. `"5-6"`.
    pub fn set_step_range(&mut self, start: i64, end: i64) {
        self.insert("stepRange", format!("{start}-{end}").as_str());
    }

    pub fn type_of_level(&self) -> Option<&str> {
        match self.0.get("typeOfLevel") {
            Some(FilterValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn level(&self) -> Option<f64> {
        self.0.get("level").and_then(FilterValue::as_f64)
    }

    /// Reject keys this decoder cannot evaluate.
    pub fn validate(&self) -> Grib2Result<()> {
        match self.0.keys().find(|k| !SUPPORTED_KEYS.contains(&k.as_str())) {
            Some(key) => Err(Grib2Error::UnsupportedFilterKey(key.clone())),
            None => Ok(()),
        }
    }

    pub fn matches(&self, header: &MessageHeader) -> bool {
        self.0.iter().all(|(key, want)| match header.key(key) {
            Some(have) => want.matches(&have),
            None => false,
        })
    }

    /// Positions of the indexed messages this filter keeps, in file order.
    pub fn select(&self, index: &[IndexedMessage]) -> Grib2Result<Vec<MessagePosition>> {
        self.validate()?;
        let positions: Vec<MessagePosition> = index
            .iter()
            .filter(|m| self.matches(&m.header))
            .map(|m| m.position)
            .collect();
        if positions.is_empty() {
            return Err(Grib2Error::NoMatchingMessages(self.to_string()));
        }
        Ok(positions)
    }
}

impl fmt::Display for FilterByKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}
