//! Sample assembly.

use dataset::Dataset;
use forecast_common::DimensionKey;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::extract::Extracted;
use crate::source::GribForecastSource;

impl GribForecastSource {
    /// Assemble every requested variable for one sample.
    ///
    /// The result holds either all variables or none: when a variable cannot
    /// be found in any of its files the whole sample comes back empty, and
    /// the caller is expected to record `dims` for a later backfill.
    ///
    /// Static variables are included when `open_static_vars` is set or
    /// `dims` is the first sample of its (t0, member) run; within a run
    /// they are decoded once and reused.
    #[instrument(skip(self, dims, cache_dir), fields(source = %self.name(), dims = %dims))]
    pub fn open_sample_dataset(
        &self,
        dims: &DimensionKey,
        open_static_vars: bool,
        cache_dir: Option<&Path>,
    ) -> Result<Dataset> {
        let files = self.resolve_files(dims, cache_dir);

        let with_static = open_static_vars || self.is_first_sample(dims);
        let variables: Vec<&str> = if with_static {
            self.variables().iter().map(String::as_str).collect()
        } else {
            self.dynamic_vars()
        };

        let mut parts: Vec<Dataset> = Vec::with_capacity(variables.len());
        for varname in variables {
            let spec = self.registry().require(varname)?;
            if spec.is_static {
                if let Some(cached) = self.static_cache().get(dims, varname) {
                    debug!(variable = %varname, "Using cached static variable");
                    parts.push(cached);
                    continue;
                }
            }

            let mut found: Vec<Dataset> = Vec::new();
            for suffix in &spec.file_suffixes {
                let Some(file) = files.get(suffix) else {
                    continue;
                };
                match self.extract(dims, varname, file.path())? {
                    Extracted::Present(da) => found.push(da.into_dataset()?),
                    Extracted::Absent(reason) => debug!(
                        variable = %varname,
                        file_suffix = %suffix,
                        %reason,
                        "Variable absent from file"
                    ),
                }
            }

            if found.is_empty() {
                warn!(
                    source = %self.name(),
                    variable = %varname,
                    dims = %dims,
                    file_suffixes = ?spec.file_suffixes,
                    "Could not find variable, will stop reading variables for this sample"
                );
                return Ok(Dataset::new());
            }

            let merged = Dataset::merge_all(&found)?;
            if spec.is_static {
                self.static_cache().insert(dims, varname, merged.clone());
            }
            parts.push(merged);
        }

        let sample = Dataset::merge_all(&parts)?;
        let sample = self.apply_slices(sample)?;
        info!(variables = sample.len(), "Assembled sample");
        Ok(sample)
    }
}
