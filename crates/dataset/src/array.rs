//! A single named variable with its coordinates.

use std::collections::BTreeMap;

use crate::attrs::AttrValue;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::variable::Variable;

/// One variable plus the coordinates that describe its axes.
#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    pub name: String,
    pub variable: Variable,
    pub coords: BTreeMap<String, Variable>,
}

impl DataArray {
    pub fn new(name: impl Into<String>, variable: Variable) -> Self {
        Self {
            name: name.into(),
            variable,
            coords: BTreeMap::new(),
        }
    }

    pub fn dims(&self) -> &[String] {
        self.variable.dims()
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.variable.attr_str(key)
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<AttrValue>) {
        self.variable
            .attrs_mut()
            .insert(key.to_string(), value.into());
    }

    pub fn coord(&self, name: &str) -> Option<&Variable> {
        self.coords.get(name)
    }

    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Wrap in a single-variable dataset.
    pub fn into_dataset(self) -> Result<Dataset> {
        let mut ds = Dataset::new();
        for (name, coord) in self.coords {
            ds.insert_coord(&name, coord)?;
        }
        ds.insert_data_var(&self.name, self.variable)?;
        Ok(ds)
    }
}
