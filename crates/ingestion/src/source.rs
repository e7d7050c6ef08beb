//! A configured GRIB forecast source.

use forecast_common::{sample_keys, DimensionKey};
use grib2_parser::{GribCrateDecoder, GribDecoder};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use storage::{CachedFile, FileFetcher, LocalFileResolver, ObjectStoreFetcher, PathBuilder};
use tracing::{debug, info};

use crate::accumulation::AccumulationSpec;
use crate::config::SourceConfig;
use crate::error::{IngestionError, Result};
use crate::family::{DefaultPathBuilder, SourceCapabilities, SourceFamily, TemplatePathBuilder};
use crate::registry::{VariableRegistry, VariableSpec};
use crate::static_cache::StaticVarCache;

/// Tolerance for matching levels when `use_nearest_levels` is set.
pub const NEAREST_LEVEL_TOLERANCE: f64 = 1e-3;

/// Forecast data stored as per-variable GRIB2 files, keyed by
/// (t0, member, fhr).
///
/// Everything is validated at construction; afterwards the source only
/// reads files and assembles samples.
pub struct GribForecastSource {
    config: SourceConfig,
    capabilities: SourceCapabilities,
    registry: VariableRegistry,
    variables: Vec<String>,
    accumulation: AccumulationSpec,
    pub(crate) resolver: LocalFileResolver,
    pub(crate) decoder: Arc<dyn GribDecoder>,
    static_cache: Mutex<StaticVarCache>,
}

impl GribForecastSource {
    /// Build a source reading NOAA archives through `object_store` and
    /// decoding with the `grib` crate.
    pub fn new(config: SourceConfig) -> Result<Self> {
        let family = SourceFamily::from_name(&config.name)?;
        let registry = VariableRegistry::load(family)?;
        let fetcher = Arc::new(ObjectStoreFetcher::new()?);
        let decoder = Arc::new(GribCrateDecoder::default());
        Self::from_parts(config, registry, fetcher, decoder)
    }

    /// Build a source from explicit components.
    pub fn from_parts(
        config: SourceConfig,
        registry: VariableRegistry,
        fetcher: Arc<dyn FileFetcher>,
        decoder: Arc<dyn GribDecoder>,
    ) -> Result<Self> {
        let family = SourceFamily::from_name(&config.name)?;
        if registry.family() != family {
            return Err(IngestionError::InvalidConfig(format!(
                "{}: variable reference is for {}, not {}",
                config.name,
                registry.family(),
                family
            )));
        }
        let capabilities = family.capabilities();

        let variables: Vec<String> = match &config.variables {
            Some(requested) => requested.clone(),
            None => registry.names().into_iter().map(str::to_string).collect(),
        };
        for name in &variables {
            require_variable(&config, &registry, name)?;
        }

        let accum_hrs = config.accum_hrs.clone().unwrap_or_default();
        for name in accum_hrs.keys() {
            require_variable(&config, &registry, name)?;
        }
        let accumulation = AccumulationSpec::new(&config.name, &accum_hrs, &config.fhr)?;

        if let Some(levels) = &config.levels {
            validate_levels(&config.name, &capabilities, levels)?;
        }
        if config.member.is_some() && !capabilities.sample_dims.contains(&"member") {
            return Err(IngestionError::InvalidConfig(format!(
                "{}: {} has no ensemble members",
                config.name, family
            )));
        }

        let paths: Arc<dyn PathBuilder> = match &config.path_template {
            Some(template) => Arc::new(TemplatePathBuilder::new(template)?),
            None => Arc::new(DefaultPathBuilder::new(family)),
        };

        info!(
            source = %config.name,
            family = %family,
            variables = variables.len(),
            "Configured forecast source"
        );

        Ok(Self {
            resolver: LocalFileResolver::new(paths, fetcher),
            config,
            capabilities,
            registry,
            variables,
            accumulation,
            decoder,
            static_cache: Mutex::new(StaticVarCache::new()),
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn family(&self) -> SourceFamily {
        self.capabilities.family
    }

    pub fn capabilities(&self) -> &SourceCapabilities {
        &self.capabilities
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn registry(&self) -> &VariableRegistry {
        &self.registry
    }

    pub fn accumulation(&self) -> &AccumulationSpec {
        &self.accumulation
    }

    /// Every variable the family can provide.
    pub fn available_variables(&self) -> Vec<&str> {
        self.registry.names()
    }

    /// The variables this source ingests.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn static_vars(&self) -> Vec<&str> {
        self.variables
            .iter()
            .filter(|v| self.spec(v).is_some_and(|s| s.is_static))
            .map(String::as_str)
            .collect()
    }

    pub fn dynamic_vars(&self) -> Vec<&str> {
        self.variables
            .iter()
            .filter(|v| self.spec(v).is_some_and(|s| !s.is_static))
            .map(String::as_str)
            .collect()
    }

    pub(crate) fn spec(&self, varname: &str) -> Option<&VariableSpec> {
        self.registry.get(varname)
    }

    pub(crate) fn level_tolerance(&self) -> f64 {
        if self.config.use_nearest_levels {
            NEAREST_LEVEL_TOLERANCE
        } else {
            0.0
        }
    }

    /// Every sample key, in t0 × member × fhr order.
    pub fn sample_keys(&self) -> Vec<DimensionKey> {
        sample_keys(&self.config.t0, self.config.member.as_ref(), &self.config.fhr)
    }

    /// True when every non-t0 dimension of `dims` is the first value of its
    /// configured axis, i.e. the first sample of a (t0, member) run.
    pub fn is_first_sample(&self, dims: &DimensionKey) -> bool {
        if dims.fhr != self.config.fhr.first() {
            return false;
        }
        if let (Some(member), Some(range)) = (dims.member, &self.config.member) {
            if member != range.first() {
                return false;
            }
        }
        if let (Some(level), Some(levels)) = (dims.level, &self.config.levels) {
            if levels.first() != Some(&level) {
                return false;
            }
        }
        true
    }

    // ========================================================================
    // Files
    // ========================================================================

    /// Source path of the file with `suffix` for `dims`.
    pub fn source_path(&self, dims: &DimensionKey, suffix: &str) -> String {
        self.resolver.source_path(dims, suffix)
    }

    /// Resolve every family file for `dims`; unreachable files are left out.
    pub fn resolve_files(
        &self,
        dims: &DimensionKey,
        cache_dir: Option<&Path>,
    ) -> BTreeMap<String, CachedFile> {
        let mut files = BTreeMap::new();
        for suffix in self.capabilities.file_suffixes {
            if let Some(file) = self.resolver.resolve(dims, suffix, cache_dir) {
                files.insert(suffix.to_string(), file);
            }
        }
        debug!(
            dims = %dims,
            resolved = files.len(),
            expected = self.capabilities.file_suffixes.len(),
            "Resolved sample files"
        );
        files
    }

    /// Cache entries already present for `dims`; nothing is fetched.
    pub fn cached_files(&self, dims: &DimensionKey, cache_dir: &Path) -> Vec<CachedFile> {
        self.capabilities
            .file_suffixes
            .iter()
            .filter_map(|suffix| self.resolver.cached(dims, suffix, cache_dir))
            .collect()
    }

    pub(crate) fn static_cache(&self) -> MutexGuard<'_, StaticVarCache> {
        self.static_cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn require_variable(config: &SourceConfig, registry: &VariableRegistry, name: &str) -> Result<()> {
    if registry.contains(name) {
        Ok(())
    } else {
        Err(IngestionError::UnknownVariable {
            source_name: config.name.clone(),
            variable: name.to_string(),
        })
    }
}

fn validate_levels(name: &str, caps: &SourceCapabilities, levels: &[f64]) -> Result<()> {
    let missing: Vec<String> = levels
        .iter()
        .filter(|l| {
            !caps
                .available_levels
                .iter()
                .any(|a| (a - *l).abs() <= NEAREST_LEVEL_TOLERANCE)
        })
        .map(|l| l.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(IngestionError::InvalidConfig(format!(
            "{name}: levels not available for {}: {}",
            caps.family,
            missing.join(", ")
        )))
    }
}
