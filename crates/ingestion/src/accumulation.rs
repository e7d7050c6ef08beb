//! Accumulation windows for flux-like variables.

use forecast_common::HourRange;
use std::collections::BTreeMap;

use crate::error::{IngestionError, Result};

/// Variable name → accumulation window in hours.
///
/// A window can never be longer than the spacing of the requested forecast
/// hours (or the single requested hour), since the archive only holds
/// accumulations ending at those hours.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccumulationSpec {
    hours: BTreeMap<String, u32>,
}

impl AccumulationSpec {
    pub fn new(source_name: &str, accum_hrs: &BTreeMap<String, u32>, fhr: &HourRange) -> Result<Self> {
        let values = fhr.values();
        let (limit_name, limit) = match values.as_slice() {
            [first, second, ..] => ("forecast hour step (fhr: 'step')", second - first),
            [only] => ("forecast hour when asking for a single valued fhr", *only),
            [] => {
                return Err(IngestionError::InvalidConfig(format!(
                    "{source_name}: fhr range is empty"
                )))
            }
        };
        for (variable, hours) in accum_hrs {
            if *hours > limit {
                return Err(IngestionError::AccumulationTooLong {
                    source_name: source_name.to_string(),
                    variable: variable.clone(),
                    hours: *hours,
                    limit_name,
                    limit,
                });
            }
        }
        Ok(Self {
            hours: accum_hrs.clone(),
        })
    }

    pub fn get(&self, varname: &str) -> Option<u32> {
        self.hours.get(varname).copied()
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.hours.keys().map(String::as_str)
    }

    /// Step range `(fhr - window, fhr)` to decode, if `varname` is
    /// accumulated over a window and `fhr` is past initialization.
    pub fn step_range(&self, varname: &str, fhr: u32) -> Option<(i64, i64)> {
        match self.get(varname) {
            Some(window) if fhr > 0 => {
                let end = i64::from(fhr);
                Some((end - i64::from(window), end))
            }
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }
}
