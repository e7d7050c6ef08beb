//! Variable metadata registry.
//!
//! Maps each variable a family can provide to its decode filter, the
//! file suffix(es) it may be found in, and naming metadata. Tables are
//! embedded per family; `$CONFIG_DIR/reference/reference.<family>.yaml`
//! replaces the embedded table when present.

use grib2_parser::FilterByKeys;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::{IngestionError, Result};
use crate::family::{SourceCapabilities, SourceFamily};

const GEFS_REFERENCE: &str = include_str!("../reference/reference.gefs.yaml");
const GFS_REFERENCE: &str = include_str!("../reference/reference.gfs.yaml");
const HRRR_REFERENCE: &str = include_str!("../reference/reference.hrrr.yaml");

/// Decode metadata for one variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSpec {
    pub name: String,
    /// Suffixes of the files that may carry this variable, tried in order.
    pub file_suffixes: Vec<String>,
    pub filter_by_keys: FilterByKeys,
    /// Name the decoder gives the variable when it differs from `name`.
    pub original_name: Option<String>,
    pub long_name: Option<String>,
    /// Time-invariant field.
    pub is_static: bool,
}

impl VariableSpec {
    /// `typeOfLevel` from the filter; every entry carries one.
    pub fn type_of_level(&self) -> &str {
        self.filter_by_keys.type_of_level().unwrap_or_default()
    }

    /// Name of the variable in decoded output, before renaming.
    pub fn decoded_name(&self) -> &str {
        self.original_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryEntry {
    file_suffixes: Vec<String>,
    filter_by_keys: FilterByKeys,
    #[serde(default)]
    original_name: Option<String>,
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default, rename = "static")]
    is_static: bool,
}

/// Read-only variable table for one family.
#[derive(Debug, Clone)]
pub struct VariableRegistry {
    family: SourceFamily,
    variables: BTreeMap<String, VariableSpec>,
}

impl VariableRegistry {
    /// Load the table for `family`, preferring a `CONFIG_DIR` override.
    pub fn load(family: SourceFamily) -> Result<Self> {
        let override_path = reference_dir().join(format!("reference.{}.yaml", family));
        if override_path.exists() {
            info!(family = %family, path = ?override_path, "Loading variable reference from config dir");
            let contents = std::fs::read_to_string(&override_path).map_err(|e| {
                IngestionError::InvalidConfig(format!("Cannot read {:?}: {}", override_path, e))
            })?;
            return Self::from_yaml_str(family, &contents);
        }
        Self::embedded(family)
    }

    /// The table compiled into the binary.
    pub fn embedded(family: SourceFamily) -> Result<Self> {
        let contents = match family {
            SourceFamily::Gefs => GEFS_REFERENCE,
            SourceFamily::Gfs => GFS_REFERENCE,
            SourceFamily::Hrrr => HRRR_REFERENCE,
        };
        Self::from_yaml_str(family, contents)
    }

    /// Parse and validate a table.
    ///
    /// Every entry needs a `typeOfLevel` in its filter, only keys the decoder
    /// understands, and suffixes the family actually publishes.
    pub fn from_yaml_str(family: SourceFamily, contents: &str) -> Result<Self> {
        let caps = family.capabilities();
        let entries: BTreeMap<String, RegistryEntry> = serde_yaml::from_str(contents)?;
        let mut variables = BTreeMap::new();
        for (name, entry) in entries {
            let spec = validate_entry(&caps, name, entry)?;
            variables.insert(spec.name.clone(), spec);
        }
        if variables.is_empty() {
            return Err(IngestionError::InvalidConfig(format!(
                "{family}: variable reference has no entries"
            )));
        }
        debug!(family = %family, variables = variables.len(), "Loaded variable reference");
        Ok(Self { family, variables })
    }

    pub fn family(&self) -> SourceFamily {
        self.family
    }

    /// Every variable name, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.variables.keys().map(String::as_str).collect()
    }

    pub fn get(&self, name: &str) -> Option<&VariableSpec> {
        self.variables.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&VariableSpec> {
        self.get(name).ok_or_else(|| IngestionError::UnknownVariable {
            source_name: self.family.to_string(),
            variable: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

fn validate_entry(
    caps: &SourceCapabilities,
    name: String,
    entry: RegistryEntry,
) -> Result<VariableSpec> {
    let family = caps.family;
    entry.filter_by_keys.validate().map_err(|e| {
        IngestionError::InvalidConfig(format!("{family}: variable '{name}': {e}"))
    })?;
    if entry.filter_by_keys.type_of_level().is_none() {
        return Err(IngestionError::InvalidConfig(format!(
            "{family}: variable '{name}' has no typeOfLevel in filter_by_keys"
        )));
    }
    if entry.file_suffixes.is_empty() {
        return Err(IngestionError::InvalidConfig(format!(
            "{family}: variable '{name}' has no file_suffixes"
        )));
    }
    if let Some(bad) = entry
        .file_suffixes
        .iter()
        .find(|s| !caps.file_suffixes.contains(&s.as_str()))
    {
        return Err(IngestionError::InvalidConfig(format!(
            "{family}: variable '{name}' lists unknown file suffix '{bad}'"
        )));
    }
    let is_static = entry.is_static || caps.is_static(&name);
    Ok(VariableSpec {
        name,
        file_suffixes: entry.file_suffixes,
        filter_by_keys: entry.filter_by_keys,
        original_name: entry.original_name,
        long_name: entry.long_name,
        is_static,
    })
}

/// Directory holding reference table overrides.
///
/// Checks CONFIG_DIR environment variable first, falls back to "config/reference".
fn reference_dir() -> PathBuf {
    if let Ok(config_dir) = env::var("CONFIG_DIR") {
        PathBuf::from(config_dir).join("reference")
    } else {
        PathBuf::from("config/reference")
    }
}
