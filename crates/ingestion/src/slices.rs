//! Configured subsetting of assembled samples.

use dataset::{Dataset, Label};
use tracing::debug;

use crate::config::Slices;
use crate::error::Result;
use crate::source::GribForecastSource;

impl GribForecastSource {
    /// Apply the configured `sel` label ranges, then `isel` index ranges.
    ///
    /// Dimensions the sample does not have are skipped.
    pub fn apply_slices(&self, ds: Dataset) -> Result<Dataset> {
        apply_slices(ds, &self.config().slices)
    }
}

pub(crate) fn apply_slices(mut ds: Dataset, slices: &Slices) -> Result<Dataset> {
    if ds.is_empty() || slices.is_empty() {
        return Ok(ds);
    }
    for (dim, (a, b)) in &slices.sel {
        if ds.index_labels(dim).is_err() {
            debug!(dim = %dim, "Skipping sel slice for missing dimension");
            continue;
        }
        ds = ds.sel_range(dim, Label::Float(*a), Label::Float(*b))?;
    }
    for (dim, (start, stop)) in &slices.isel {
        if ds.dim_size(dim).is_none() {
            debug!(dim = %dim, "Skipping isel slice for missing dimension");
            continue;
        }
        ds = ds.isel_range(dim, *start, *stop)?;
    }
    Ok(ds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataset::{Values, Variable};

    fn grid() -> Dataset {
        let mut ds = Dataset::new();
        ds.insert_coord(
            "latitude",
            Variable::along("latitude", Values::f64_1d(vec![50.0, 40.0, 30.0, 20.0])).unwrap(),
        )
        .unwrap();
        ds.insert_coord(
            "longitude",
            Variable::along("longitude", Values::f64_1d(vec![0.0, 1.0, 2.0])).unwrap(),
        )
        .unwrap();
        let values = Values::f32_from_shape(&[4, 3], (0..12).map(|v| v as f32).collect()).unwrap();
        ds.insert_data_var("t2m", Variable::new(vec!["latitude", "longitude"], values).unwrap())
            .unwrap();
        ds
    }

    #[test]
    fn test_sel_descending_coordinate() {
        let mut slices = Slices::default();
        slices.sel.insert("latitude".into(), (45.0, 25.0));
        let ds = apply_slices(grid(), &slices).unwrap();
        assert_eq!(
            ds.index_labels("latitude").unwrap(),
            vec![Label::Float(40.0), Label::Float(30.0)]
        );
        assert_eq!(ds.data_var("t2m").unwrap().shape(), &[2, 3]);
    }

    #[test]
    fn test_isel_and_missing_dims() {
        let mut slices = Slices::default();
        slices.isel.insert("longitude".into(), (1, 10));
        slices.isel.insert("level".into(), (0, 1));
        slices.sel.insert("y".into(), (0.0, 1.0));
        let ds = apply_slices(grid(), &slices).unwrap();
        assert_eq!(ds.dim_size("longitude"), Some(2));
        assert_eq!(ds.dim_size("latitude"), Some(4));
    }
}
