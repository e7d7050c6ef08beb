//! Single-variable extraction.
//!
//! Decodes one variable from one file and brings it into the canonical
//! layout: `t0, fhr, member, level, <horizontal>` for dynamic variables and
//! `t0, <horizontal>` for static ones.

use dataset::{DataArray, Dataset, Label};
use forecast_common::DimensionKey;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::Result;
use crate::registry::VariableSpec;
use crate::source::GribForecastSource;
use crate::transform::{add_forecast_hour_axes, add_member_axis, apply_renames, promote_single_level};

/// Why a variable has no data for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsentReason {
    /// The file could not be decoded with the variable's filter.
    Decode,
    /// None of the requested levels are in the file.
    NoMatchingLevels,
}

impl fmt::Display for AbsentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbsentReason::Decode => f.write_str("decode failed"),
            AbsentReason::NoMatchingLevels => f.write_str("no matching levels"),
        }
    }
}

/// Outcome of an extraction that may legitimately find nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted<T> {
    Present(T),
    Absent(AbsentReason),
}

impl<T> Extracted<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Extracted::Present(_))
    }

    pub fn present(self) -> Option<T> {
        match self {
            Extracted::Present(v) => Some(v),
            Extracted::Absent(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Extracted<U> {
        match self {
            Extracted::Present(v) => Extracted::Present(f(v)),
            Extracted::Absent(r) => Extracted::Absent(r),
        }
    }
}

const CLOUD_LAYERS: &[&str] = &["lowCloudLayer", "middleCloudLayer", "highCloudLayer"];

impl GribForecastSource {
    /// Extract `varname` for `dims` from `file`.
    ///
    /// Missing data comes back as [`Extracted::Absent`]; `Err` is reserved for
    /// unknown variables and structurally inconsistent decoder output.
    pub fn extract(
        &self,
        dims: &DimensionKey,
        varname: &str,
        file: &Path,
    ) -> Result<Extracted<DataArray>> {
        let spec = self.registry().require(varname)?;

        let mut filter = spec.filter_by_keys.clone();
        if let Some((start, end)) = self.accumulation().step_range(varname, dims.fhr) {
            filter.set_step_range(start, end);
        }

        let decoded = match self.decoder.open(file, &filter) {
            Ok(ds) => ds,
            Err(e) => {
                warn!(
                    source = %self.name(),
                    variable = %varname,
                    dims = %dims,
                    error = %e,
                    "Unable to read variable"
                );
                return Ok(Extracted::Absent(AbsentReason::Decode));
            }
        };
        if decoded.data_var(spec.decoded_name()).is_none() {
            warn!(
                source = %self.name(),
                variable = %varname,
                decoded_name = %spec.decoded_name(),
                dims = %dims,
                "Decoded file lacks variable"
            );
            return Ok(Extracted::Absent(AbsentReason::Decode));
        }

        let mut ds = decoded.data_array(spec.decoded_name())?.into_dataset()?;
        if let Some(original) = &spec.original_name {
            if original != varname {
                ds = ds.rename(original, varname)?;
            }
        }

        let ndim = ds.data_var(varname).map_or(0, |v| v.dims().len());
        ds = promote_single_level(ds, ndim)?;
        annotate(&mut ds, spec, self.accumulation().get(varname));

        let type_of_level = spec.type_of_level();
        let dims_present = ds.dims();
        for name in [type_of_level, "number"] {
            if ds.coord(name).is_some() && !dims_present.contains_key(name) {
                ds = ds.drop_var(name)?;
            }
        }
        ds = apply_renames(ds, self.capabilities())?;
        if ds.contains("valid_time") {
            ds = ds.drop_var("valid_time")?;
        }

        if spec.is_static {
            if ds.contains("lead_time") {
                ds = ds.drop_var("lead_time")?;
            }
            ds = ds.expand_dims("t0")?;
        } else {
            if let (Some(levels), Ok(present)) = (&self.config().levels, ds.index_labels("level")) {
                let tolerance = self.level_tolerance();
                let selection: Vec<Label> = levels
                    .iter()
                    .map(|l| Label::Float(*l))
                    .filter(|l| present.iter().any(|p| p.matches(l, tolerance)))
                    .collect();
                if selection.is_empty() {
                    debug!(
                        variable = %varname,
                        dims = %dims,
                        "Requested levels not in file"
                    );
                    return Ok(Extracted::Absent(AbsentReason::NoMatchingLevels));
                }
                ds = ds.sel_values("level", &selection, tolerance)?;
            }
            if let Some(member) = dims.member {
                ds = add_member_axis(ds, member)?;
            }
            ds = add_forecast_hour_axes(ds)?;
        }

        Ok(Extracted::Present(ds.data_array(varname)?))
    }
}

/// Level-type specific naming of the decoded variable.
fn annotate(ds: &mut Dataset, spec: &VariableSpec, accum_hours: Option<u32>) {
    let Some(var) = ds.data_var_mut(&spec.name) else {
        return;
    };
    if let Some(og) = &spec.original_name {
        var.attrs_mut().insert("original_name".into(), og.as_str().into());
    }
    let mut long_name = spec
        .long_name
        .clone()
        .or_else(|| var.attr_str("long_name").map(str::to_string))
        .unwrap_or_else(|| spec.name.clone());
    let step_type = var.attr_str("GRIB_stepType").unwrap_or("instant").to_string();

    match spec.type_of_level() {
        "heightAboveGround" => {
            if let (Some(_), Some(level)) = (&spec.original_name, spec.filter_by_keys.level()) {
                long_name = format!("{level} metre {long_name}");
            }
        }
        "surface" => {
            if spec.original_name.as_deref() == Some("t") {
                long_name.push_str(" at surface");
            }
            match step_type.as_str() {
                "accum" => match accum_hours {
                    Some(hours) => {
                        var.attrs_mut()
                            .insert("accumulation_hours".into(), hours.into());
                        long_name.push_str(&format!(
                            " accumulated during previous {hours} hours of the forecast"
                        ));
                    }
                    None => long_name.push_str(" accumulated over forecast"),
                },
                "avg" => long_name = format!("Time-mean {long_name}"),
                _ => {}
            }
        }
        layer if CLOUD_LAYERS.contains(&layer) => {
            let short = layer.trim_end_matches("CloudLayer");
            let mut chars = short.chars();
            let capitalized: String = chars
                .next()
                .map(|c| c.to_uppercase().chain(chars).collect())
                .unwrap_or_default();
            long_name = long_name.replace("Total", &capitalized);
        }
        _ => {}
    }
    var.attrs_mut()
        .insert("long_name".into(), long_name.as_str().into());
}
