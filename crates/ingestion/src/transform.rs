//! Coordinate transformations shared by the extractor and the full-file
//! assembler.

use dataset::{Dataset, DatasetError, Values, Variable};
use forecast_common::fhr_from_lead_time_ns;

use crate::error::Result;
use crate::family::SourceCapabilities;

const ISOBARIC: &str = "isobaricInhPa";

/// Promote a single-valued isobaric coordinate to a size-1 leading axis
/// when the data has fewer than three dimensions, so that every variable on
/// pressure levels has the same rank.
pub(crate) fn promote_single_level(ds: Dataset, ndim: usize) -> Result<Dataset> {
    match ds.coord(ISOBARIC) {
        Some(level) if level.is_scalar() && ndim < 3 => Ok(ds.expand_dims(ISOBARIC)?),
        _ => Ok(ds),
    }
}

/// Apply the family's decoder → canonical renames that are present.
pub(crate) fn apply_renames(mut ds: Dataset, caps: &SourceCapabilities) -> Result<Dataset> {
    for (old, new) in caps.rename {
        if ds.has_name(old) {
            ds = ds.rename(old, new)?;
        }
    }
    Ok(ds)
}

/// Add a size-1 `member` axis labelled with `member`.
pub(crate) fn add_member_axis(ds: Dataset, member: u32) -> Result<Dataset> {
    let coord = Variable::along("member", Values::i64_1d(vec![i64::from(member)]))?
        .with_attr("long_name", "ensemble member ID")
        .with_attr(
            "description",
            "ID=0 comes from gecXX files, ID>0 comes from gepXX files",
        );
    Ok(ds.expand_dims("member")?.assign_coord("member", coord)?)
}

/// Add leading `t0` and `lead_time` axes, then index the lead-time axis by
/// integer forecast hour.
pub(crate) fn add_forecast_hour_axes(ds: Dataset) -> Result<Dataset> {
    let ds = ds.expand_dims_many(&["t0", "lead_time"])?;
    let lead_times = ds
        .coord("lead_time")
        .and_then(|c| c.values().as_i64())
        .ok_or_else(|| DatasetError::CoordinateNotFound("lead_time".to_string()))?;
    let fhr: Vec<i64> = lead_times.iter().map(|ns| fhr_from_lead_time_ns(*ns)).collect();
    let fhr = Variable::along("lead_time", Values::i64_1d(fhr))?
        .with_attr("long_name", "hours since initial time")
        .with_attr("units", "integer hours");
    Ok(ds.assign_coord("fhr", fhr)?.swap_dims("lead_time", "fhr")?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::SourceFamily;
    use dataset::Label;
    use forecast_common::lead_time_ns;

    fn sample(fhr: u32) -> Dataset {
        let mut ds = Dataset::new();
        ds.insert_coord("time", Variable::scalar(Values::scalar_i64(0)))
            .unwrap();
        ds.insert_coord(
            "step",
            Variable::scalar(Values::scalar_timedelta(lead_time_ns(fhr))),
        )
        .unwrap();
        ds.insert_coord(ISOBARIC, Variable::scalar(Values::scalar_f64(500.0)))
            .unwrap();
        let values = Values::f32_from_shape(&[2, 3], vec![1.0; 6]).unwrap();
        ds.insert_data_var("t", Variable::new(vec!["latitude", "longitude"], values).unwrap())
            .unwrap();
        ds
    }

    #[test]
    fn test_fhr_round_trip() {
        let caps = SourceFamily::Gfs.capabilities();
        for fhr in [0u32, 6, 12, 240] {
            let ds = apply_renames(sample(fhr), &caps).unwrap();
            let ds = add_forecast_hour_axes(ds).unwrap();
            assert_eq!(ds.index_labels("fhr").unwrap(), vec![Label::Int(i64::from(fhr))]);
            assert_eq!(ds.coord("lead_time").unwrap().dims(), &["fhr"]);
        }
    }

    #[test]
    fn test_promote_then_rename_to_level() {
        let caps = SourceFamily::Gefs.capabilities();
        let ds = promote_single_level(sample(6), 2).unwrap();
        let ds = apply_renames(ds, &caps).unwrap();
        assert_eq!(
            ds.data_var("t").unwrap().dims(),
            &["level", "latitude", "longitude"]
        );
        assert_eq!(ds.index_labels("level").unwrap(), vec![Label::Float(500.0)]);
        assert!(ds.coord("t0").is_some());
    }

    #[test]
    fn test_member_sits_between_fhr_and_level() {
        let caps = SourceFamily::Gefs.capabilities();
        let ds = promote_single_level(sample(6), 2).unwrap();
        let ds = apply_renames(ds, &caps).unwrap();
        let ds = add_member_axis(ds, 3).unwrap();
        let ds = add_forecast_hour_axes(ds).unwrap();
        assert_eq!(
            ds.data_var("t").unwrap().dims(),
            &["t0", "fhr", "member", "level", "latitude", "longitude"]
        );
        assert_eq!(ds.index_labels("member").unwrap(), vec![Label::Int(3)]);
    }
}
