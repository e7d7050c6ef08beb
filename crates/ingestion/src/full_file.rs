//! Whole-file assembly.

use dataset::{Dataset, Label, Values, Variable};
use forecast_common::{from_epoch_ns, lead_time_ns, to_epoch_ns, valid_time, DimensionKey};
use grib2_parser::FilterByKeys;
use std::path::Path;
use tracing::{debug, instrument};

use crate::error::{IngestionError, Result};
use crate::source::GribForecastSource;
use crate::transform::{add_forecast_hour_axes, add_member_axis, apply_renames, promote_single_level};

/// Options for [`GribForecastSource::open_grib`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenGribOptions {
    /// Restrict decoding to matching messages; all messages when `None`.
    pub filter_by_keys: Option<FilterByKeys>,
}

impl OpenGribOptions {
    pub fn with_filter(filter: FilterByKeys) -> Self {
        Self {
            filter_by_keys: Some(filter),
        }
    }
}

impl GribForecastSource {
    /// Open every variable of one file at once.
    ///
    /// Returns `Ok(None)` when the file cannot be resolved. The stored
    /// `valid_time`, if any, must equal `t0 + lead_time`; a mismatch means
    /// the file does not follow the layout this source assumes and is
    /// reported as [`IngestionError::ValidTimeMismatch`].
    #[instrument(skip(self, dims, cache_dir, options), fields(source = %self.name(), dims = %dims))]
    pub fn open_grib(
        &self,
        dims: &DimensionKey,
        file_suffix: &str,
        cache_dir: Option<&Path>,
        options: &OpenGribOptions,
    ) -> Result<Option<Dataset>> {
        let Some(file) = self.resolver.resolve(dims, file_suffix, cache_dir) else {
            return Ok(None);
        };
        let mut ds = match &options.filter_by_keys {
            Some(filter) => self.decoder.open(file.path(), filter)?,
            None => self.decoder.open_all(file.path())?,
        };

        let ndim = ds.dims().len();
        ds = promote_single_level(ds, ndim)?;
        if ds.coord("number").is_some_and(|c| c.is_scalar()) {
            ds = ds.drop_var("number")?;
        }
        ds = apply_renames(ds, self.capabilities())?;
        if let Some(member) = dims.member {
            ds = add_member_axis(ds, member)?;
        }
        ds = add_forecast_hour_axes(ds)?;

        let t0 = match ds.scalar_label("t0") {
            Some(Label::Int(ns)) => from_epoch_ns(ns),
            _ => dims.t0,
        };
        let lead_time = match ds.scalar_label("lead_time") {
            Some(Label::Int(ns)) => ns,
            _ => lead_time_ns(dims.fhr),
        };
        let expected = valid_time(t0, lead_time);

        if let Some(Label::Int(stored)) = ds.scalar_label("valid_time") {
            let stored = from_epoch_ns(stored);
            if stored != expected {
                return Err(IngestionError::ValidTimeMismatch {
                    dims: dims.to_string(),
                    stored,
                    expected,
                });
            }
            ds = ds.drop_var("valid_time")?;
        }

        let valid = Variable::new(
            vec!["t0", "fhr"],
            Values::datetime_1d(vec![to_epoch_ns(expected)]).insert_axis(0),
        )?
        .with_attr("long_name", "time")
        .with_attr("standard_name", "time");
        ds = ds.assign_coord("valid_time", valid)?;

        debug!(file_suffix = %file_suffix, variables = ds.len(), "Opened GRIB file");
        Ok(Some(ds))
    }
}
