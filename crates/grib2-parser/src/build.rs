//! Assembly of decoded fields into labeled datasets.
//!
//! Each distinct variable name becomes one data variable. Its messages
//! must share a level type and time range; they may differ in level and
//! ensemble number, which become dimensions when more than one value is
//! present and scalar coordinates otherwise.

use std::collections::BTreeMap;

use dataset::{Dataset, Values, Variable};
use forecast_common::lead_time_ns;

use crate::error::{Grib2Error, Grib2Result};
use crate::field::{GribField, HorizontalGrid, MessageHeader};
use crate::filter::FilterByKeys;

/// Decode result for the messages of one file matching `filter`.
pub fn select_to_dataset(fields: &[GribField], filter: &FilterByKeys) -> Grib2Result<Dataset> {
    filter.validate()?;
    let selected: Vec<&GribField> = fields.iter().filter(|f| filter.matches(&f.header)).collect();
    if selected.is_empty() {
        return Err(Grib2Error::NoMatchingMessages(filter.to_string()));
    }
    fields_to_dataset(&selected)
}

/// Assemble fields into a dataset, one data variable per variable name.
pub fn fields_to_dataset(fields: &[&GribField]) -> Grib2Result<Dataset> {
    let mut groups: BTreeMap<&str, Vec<&GribField>> = BTreeMap::new();
    for field in fields {
        groups.entry(field.header.var_name.as_str()).or_default().push(field);
    }

    let mut ds = Dataset::new();
    ds.set_attr("GRIB_edition", 2i64);
    ds.set_attr("Conventions", "CF-1.7");
    for (name, group) in groups {
        add_variable(&mut ds, name, &group)?;
    }
    Ok(ds)
}

fn ambiguous(name: &str, reason: String) -> Grib2Error {
    Grib2Error::Ambiguous {
        name: name.to_string(),
        reason,
    }
}

fn add_variable(ds: &mut Dataset, name: &str, group: &[&GribField]) -> Grib2Result<()> {
    let first: &MessageHeader = &group[0].header;
    for f in group[1..].iter().map(|f| &f.header) {
        if f.type_of_level != first.type_of_level {
            return Err(ambiguous(
                name,
                format!("level types {} and {}", first.type_of_level, f.type_of_level),
            ));
        }
        if f.step_range() != first.step_range()
            || f.step_type != first.step_type
            || f.reference_time != first.reference_time
        {
            return Err(ambiguous(
                name,
                format!("time ranges {} and {}", first.step_range(), f.step_range()),
            ));
        }
        if (f.nx, f.ny) != (first.nx, first.ny) {
            return Err(ambiguous(name, "differing grid shapes".to_string()));
        }
    }

    let level_dim = first.type_of_level.as_str();
    let mut levels: Vec<f64> = Vec::new();
    for f in group {
        if !levels.iter().any(|l| *l == f.header.level) {
            levels.push(f.header.level);
        }
    }
    if level_dim.starts_with("isobaric") {
        levels.sort_by(|a, b| b.total_cmp(a));
    } else {
        levels.sort_by(|a, b| a.total_cmp(b));
    }
    let mut numbers: Vec<i64> = group
        .iter()
        .map(|f| i64::from(f.header.perturbation_number.unwrap_or(0)))
        .collect();
    numbers.sort_unstable();
    numbers.dedup();

    let multi_number = numbers.len() > 1;
    let multi_level = levels.len() > 1;
    let plane = first.nx * first.ny;

    let mut data = vec![f32::NAN; numbers.len() * levels.len() * plane];
    let mut seen = vec![false; numbers.len() * levels.len()];
    for f in group {
        let n = i64::from(f.header.perturbation_number.unwrap_or(0));
        let ni = numbers.iter().position(|x| *x == n).unwrap_or(0);
        let li = levels.iter().position(|x| *x == f.header.level).unwrap_or(0);
        let slot = ni * levels.len() + li;
        if seen[slot] {
            return Err(ambiguous(
                name,
                format!("duplicate message at {}={} number={}", level_dim, f.header.level, n),
            ));
        }
        seen[slot] = true;
        data[slot * plane..(slot + 1) * plane].copy_from_slice(&f.values);
    }

    let grid = &group[0].grid;
    let (y_dim, x_dim) = match grid {
        HorizontalGrid::Regular { .. } => ("latitude", "longitude"),
        _ => ("y", "x"),
    };
    let mut dims: Vec<&str> = Vec::new();
    let mut shape: Vec<usize> = Vec::new();
    if multi_number {
        dims.push("number");
        shape.push(numbers.len());
    }
    if multi_level {
        dims.push(level_dim);
        shape.push(levels.len());
    }
    dims.extend([y_dim, x_dim]);
    shape.extend([first.ny, first.nx]);

    let variable = Variable::new(dims, Values::f32_from_shape(&shape, data)?)?
        .with_attr("GRIB_shortName", first.short_name.as_str())
        .with_attr("GRIB_cfVarName", first.var_name.as_str())
        .with_attr("GRIB_name", first.long_name.as_str())
        .with_attr("GRIB_units", first.units.as_str())
        .with_attr("GRIB_typeOfLevel", level_dim)
        .with_attr("GRIB_stepType", first.step_type.as_str())
        .with_attr("GRIB_stepRange", first.step_range())
        .with_attr("long_name", first.long_name.as_str())
        .with_attr("units", first.units.as_str());

    set_coord(
        ds,
        "time",
        Variable::scalar(Values::scalar_datetime(first.reference_time))
            .with_attr("long_name", "initial time of forecast"),
    )?;
    set_coord(
        ds,
        "step",
        Variable::scalar(Values::scalar_timedelta(lead_time_ns(first.end_step)))
            .with_attr("long_name", "time since forecast_reference_time"),
    )?;
    set_coord(
        ds,
        "valid_time",
        Variable::scalar(Values::scalar_datetime(first.valid_time()))
            .with_attr("long_name", "time"),
    )?;

    let number = if multi_number {
        Variable::along("number", Values::i64_1d(numbers))?
    } else {
        Variable::scalar(Values::scalar_i64(numbers[0]))
    };
    set_coord(
        ds,
        "number",
        number.with_attr("long_name", "ensemble member numerical id"),
    )?;

    let level = if multi_level {
        Variable::along(level_dim, Values::f64_1d(levels))?
    } else {
        Variable::scalar(Values::scalar_f64(levels[0]))
    };
    set_coord(ds, level_dim, level_attrs(level, level_dim))?;

    match grid {
        HorizontalGrid::Regular {
            latitudes,
            longitudes,
        } => {
            set_coord(
                ds,
                "latitude",
                Variable::along("latitude", Values::f64_1d(latitudes.clone()))?
                    .with_attr("units", "degrees_north"),
            )?;
            set_coord(
                ds,
                "longitude",
                Variable::along("longitude", Values::f64_1d(longitudes.clone()))?
                    .with_attr("units", "degrees_east"),
            )?;
        }
        HorizontalGrid::Projected {
            latitudes,
            longitudes,
        } => {
            let lat = Values::F64(ndarray_2d(latitudes, first.ny, first.nx)?);
            let lon = Values::F64(ndarray_2d(longitudes, first.ny, first.nx)?);
            set_coord(
                ds,
                "latitude",
                Variable::new(vec!["y", "x"], lat)?.with_attr("units", "degrees_north"),
            )?;
            set_coord(
                ds,
                "longitude",
                Variable::new(vec!["y", "x"], lon)?.with_attr("units", "degrees_east"),
            )?;
        }
        HorizontalGrid::IndexOnly => {}
    }

    ds.insert_data_var(name, variable)?;
    Ok(())
}

fn level_attrs(var: Variable, level_dim: &str) -> Variable {
    match level_dim {
        "isobaricInhPa" => var.with_attr("units", "hPa").with_attr("long_name", "pressure"),
        "isobaricInPa" => var.with_attr("units", "Pa").with_attr("long_name", "pressure"),
        "heightAboveGround" | "heightAboveSea" => var
            .with_attr("units", "m")
            .with_attr("long_name", "height above the surface"),
        _ => var.with_attr("long_name", "original GRIB coordinate for key: level"),
    }
}

fn ndarray_2d(values: &[f64], ny: usize, nx: usize) -> Grib2Result<ndarray::ArrayD<f64>> {
    ndarray::ArrayD::from_shape_vec(ndarray::IxDyn(&[ny, nx]), values.to_vec())
        .map_err(|e| Grib2Error::InvalidFormat(format!("grid coordinates: {e}")))
}

/// Insert a coordinate, rejecting a different value under the same name.
fn set_coord(ds: &mut Dataset, name: &str, var: Variable) -> Grib2Result<()> {
    if let Some(existing) = ds.coord(name) {
        if existing.dims() != var.dims() || existing.values() != var.values() {
            return Err(Grib2Error::ConflictingCoordinate(name.to_string()));
        }
        return Ok(());
    }
    ds.insert_coord(name, var)?;
    Ok(())
}
