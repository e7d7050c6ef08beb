//! Collections of variables sharing dimensions.

use std::collections::BTreeMap;
use std::fmt;

use crate::array::DataArray;
use crate::attrs::{AttrValue, Attrs};
use crate::error::{DatasetError, Result};
use crate::values::Label;
use crate::variable::Variable;

/// Data variables and coordinates over a common set of named dimensions.
///
/// A coordinate whose name equals its single dimension is that dimension's
/// index; selection and alignment go through it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    data_vars: BTreeMap<String, Variable>,
    coords: BTreeMap<String, Variable>,
    attrs: Attrs,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Access
    // ========================================================================

    /// True when the dataset holds no data variables.
    pub fn is_empty(&self) -> bool {
        self.data_vars.is_empty()
    }

    /// Number of data variables.
    pub fn len(&self) -> usize {
        self.data_vars.len()
    }

    pub fn data_vars(&self) -> &BTreeMap<String, Variable> {
        &self.data_vars
    }

    pub fn coords(&self) -> &BTreeMap<String, Variable> {
        &self.coords
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<AttrValue>) {
        self.attrs.insert(key.to_string(), value.into());
    }

    pub fn data_var_names(&self) -> Vec<&str> {
        self.data_vars.keys().map(String::as_str).collect()
    }

    pub fn data_var(&self, name: &str) -> Option<&Variable> {
        self.data_vars.get(name)
    }

    pub fn data_var_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.data_vars.get_mut(name)
    }

    pub fn coord(&self, name: &str) -> Option<&Variable> {
        self.coords.get(name)
    }

    /// True if `name` is a data variable or coordinate.
    pub fn contains(&self, name: &str) -> bool {
        self.data_vars.contains_key(name) || self.coords.contains_key(name)
    }

    /// True if `name` is a variable, coordinate or dimension.
    pub fn has_name(&self, name: &str) -> bool {
        self.contains(name) || self.dims().contains_key(name)
    }

    fn all_vars(&self) -> impl Iterator<Item = &Variable> {
        self.data_vars.values().chain(self.coords.values())
    }

    fn all_vars_mut(&mut self) -> impl Iterator<Item = &mut Variable> {
        self.data_vars.values_mut().chain(self.coords.values_mut())
    }

    /// Dimension sizes across all variables.
    pub fn dims(&self) -> BTreeMap<String, usize> {
        let mut dims = BTreeMap::new();
        for var in self.all_vars() {
            for (d, n) in var.dims().iter().zip(var.shape()) {
                dims.insert(d.clone(), *n);
            }
        }
        dims
    }

    pub fn dim_size(&self, dim: &str) -> Option<usize> {
        self.all_vars().find_map(|v| v.size_of(dim))
    }

    /// Labels of the index coordinate for `dim`.
    pub fn index_labels(&self, dim: &str) -> Result<Vec<Label>> {
        match self.coords.get(dim) {
            Some(c) if c.dims().len() == 1 && c.dims()[0] == dim => Ok(c.values().labels()),
            _ => Err(DatasetError::CoordinateNotFound(dim.to_string())),
        }
    }

    /// First element of a coordinate, for size-1 or scalar coordinates.
    pub fn scalar_label(&self, name: &str) -> Option<Label> {
        self.coords.get(name).and_then(|c| c.values().first_label())
    }

    /// A data variable together with the coordinates that apply to it.
    pub fn data_array(&self, name: &str) -> Result<DataArray> {
        let variable = self
            .data_vars
            .get(name)
            .ok_or_else(|| DatasetError::VariableNotFound(name.to_string()))?;
        let mut da = DataArray::new(name, variable.clone());
        for (cname, coord) in &self.coords {
            if coord.dims().iter().all(|d| variable.has_dim(d)) {
                da.coords.insert(cname.clone(), coord.clone());
            }
        }
        Ok(da)
    }

    // ========================================================================
    // Construction
    // ========================================================================

    fn check_sizes(&self, name: &str, var: &Variable) -> Result<()> {
        let existing = self.dims();
        for (d, n) in var.dims().iter().zip(var.shape()) {
            if let Some(m) = existing.get(d) {
                if m != n {
                    return Err(DatasetError::SizeConflict {
                        dim: format!("{d} ({name})"),
                        left: *m,
                        right: *n,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn insert_data_var(&mut self, name: &str, var: Variable) -> Result<()> {
        self.coords.remove(name);
        self.data_vars.remove(name);
        self.check_sizes(name, &var)?;
        self.data_vars.insert(name.to_string(), var);
        Ok(())
    }

    pub fn insert_coord(&mut self, name: &str, var: Variable) -> Result<()> {
        self.data_vars.remove(name);
        self.coords.remove(name);
        self.check_sizes(name, &var)?;
        self.coords.insert(name.to_string(), var);
        Ok(())
    }

    /// Builder form of [`insert_coord`](Self::insert_coord).
    pub fn assign_coord(mut self, name: &str, var: Variable) -> Result<Self> {
        self.insert_coord(name, var)?;
        Ok(self)
    }

    // ========================================================================
    // Renaming and reshaping
    // ========================================================================

    /// Rename a variable, coordinate or dimension (all matches).
    pub fn rename(mut self, old: &str, new: &str) -> Result<Self> {
        if !self.has_name(old) {
            return Err(DatasetError::VariableNotFound(old.to_string()));
        }
        if old == new {
            return Ok(self);
        }
        if self.contains(new) {
            return Err(DatasetError::DimensionExists(new.to_string()));
        }
        if let Some(v) = self.data_vars.remove(old) {
            self.data_vars.insert(new.to_string(), v);
        }
        if let Some(c) = self.coords.remove(old) {
            self.coords.insert(new.to_string(), c);
        }
        for var in self.all_vars_mut() {
            var.rename_dim(old, new);
        }
        Ok(self)
    }

    /// Remove a data variable or coordinate.
    pub fn drop_var(mut self, name: &str) -> Result<Self> {
        let removed = self.data_vars.remove(name).or_else(|| self.coords.remove(name));
        match removed {
            Some(_) => Ok(self),
            None => Err(DatasetError::VariableNotFound(name.to_string())),
        }
    }

    /// Add a leading length-1 axis named `dim` to every data variable.
    ///
    /// A scalar coordinate named `dim` becomes the axis's index coordinate.
    pub fn expand_dims(mut self, dim: &str) -> Result<Self> {
        if self.dims().contains_key(dim) {
            return Err(DatasetError::DimensionExists(dim.to_string()));
        }
        if let Some(coord) = self.coords.get_mut(dim) {
            if !coord.is_scalar() {
                return Err(DatasetError::ShapeMismatch {
                    name: dim.to_string(),
                    reason: "only scalar coordinates can be promoted to a dimension".into(),
                });
            }
            coord.insert_dim(dim, 0)?;
        }
        for var in self.data_vars.values_mut() {
            var.insert_dim(dim, 0)?;
        }
        Ok(self)
    }

    /// Expand several dims at once; the result has them in the given order.
    pub fn expand_dims_many(mut self, dims: &[&str]) -> Result<Self> {
        for dim in dims.iter().rev() {
            self = self.expand_dims(dim)?;
        }
        Ok(self)
    }

    /// Replace dimension `old` with `new`, where `new` is a coordinate along `old`.
    pub fn swap_dims(mut self, old: &str, new: &str) -> Result<Self> {
        match self.coords.get(new) {
            Some(c) if c.dims().len() == 1 && c.dims()[0] == old => {}
            Some(_) => {
                return Err(DatasetError::ShapeMismatch {
                    name: new.to_string(),
                    reason: format!("must be 1-d along '{old}'"),
                })
            }
            None => return Err(DatasetError::CoordinateNotFound(new.to_string())),
        }
        for var in self.all_vars_mut() {
            var.rename_dim(old, new);
        }
        Ok(self)
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Positional selection along `dim`, applied to every variable on it.
    pub fn isel(mut self, dim: &str, indices: &[usize]) -> Result<Self> {
        let size = self
            .dim_size(dim)
            .ok_or_else(|| DatasetError::DimensionNotFound(dim.to_string()))?;
        if let Some(bad) = indices.iter().find(|i| **i >= size) {
            return Err(DatasetError::LabelNotFound {
                dim: dim.to_string(),
                label: bad.to_string(),
            });
        }
        for var in self.all_vars_mut() {
            if var.has_dim(dim) {
                *var = var.select(dim, indices);
            }
        }
        Ok(self)
    }

    /// Select by index-coordinate labels, matching within `tolerance`.
    pub fn sel_values(self, dim: &str, labels: &[Label], tolerance: f64) -> Result<Self> {
        let index = self.index_labels(dim)?;
        let mut positions = Vec::with_capacity(labels.len());
        for label in labels {
            let pos = index
                .iter()
                .position(|l| l.matches(label, tolerance))
                .ok_or_else(|| DatasetError::LabelNotFound {
                    dim: dim.to_string(),
                    label: label.to_string(),
                })?;
            positions.push(pos);
        }
        self.isel(dim, &positions)
    }

    /// Keep positions `start..stop` (clamped) along `dim`.
    pub fn isel_range(self, dim: &str, start: usize, stop: usize) -> Result<Self> {
        let size = self
            .dim_size(dim)
            .ok_or_else(|| DatasetError::DimensionNotFound(dim.to_string()))?;
        let stop = stop.min(size);
        let indices: Vec<usize> = (start.min(stop)..stop).collect();
        self.isel(dim, &indices)
    }

    /// Keep labels between `a` and `b` inclusive, in either coordinate order.
    pub fn sel_range(self, dim: &str, a: Label, b: Label) -> Result<Self> {
        let (lo, hi) = if a.total_cmp(&b).is_le() { (a, b) } else { (b, a) };
        let indices: Vec<usize> = self
            .index_labels(dim)?
            .iter()
            .enumerate()
            .filter(|(_, l)| l.total_cmp(&lo).is_ge() && l.total_cmp(&hi).is_le())
            .map(|(i, _)| i)
            .collect();
        self.isel(dim, &indices)
    }

    // ========================================================================
    // Alignment
    // ========================================================================

    fn reindex_mapping(mut self, dim: &str, mapping: &[Option<usize>]) -> Self {
        for var in self.all_vars_mut() {
            if var.has_dim(dim) {
                *var = var.reindex(dim, mapping);
            }
        }
        self
    }

    /// Conform `dim` to `labels`, filling missing positions.
    ///
    /// The index coordinate itself is refilled from `labels`' order, so new
    /// labels show up as missing there too until merged.
    pub fn reindex(self, dim: &str, labels: &[Label]) -> Result<Self> {
        let index = self.index_labels(dim)?;
        let mapping: Vec<Option<usize>> = labels
            .iter()
            .map(|l| index.iter().position(|x| x == l))
            .collect();
        Ok(self.reindex_mapping(dim, &mapping))
    }

    /// Outer-join merge: differing index coordinates are aligned to their
    /// union (labels of `self` first), then each variable takes its first
    /// non-missing value, preferring `self`.
    pub fn merge(&self, other: &Dataset) -> Result<Dataset> {
        let mut left = self.clone();
        let mut right = other.clone();

        let left_dims = left.dims();
        let right_dims = right.dims();
        for (dim, left_size) in &left_dims {
            let Some(right_size) = right_dims.get(dim) else {
                continue;
            };
            match (left.index_labels(dim), right.index_labels(dim)) {
                (Ok(l), Ok(r)) if l != r => {
                    let mut union = l.clone();
                    for label in &r {
                        if !union.contains(label) {
                            union.push(*label);
                        }
                    }
                    let lmap: Vec<Option<usize>> =
                        union.iter().map(|u| l.iter().position(|x| x == u)).collect();
                    let rmap: Vec<Option<usize>> =
                        union.iter().map(|u| r.iter().position(|x| x == u)).collect();
                    left = left.reindex_mapping(dim, &lmap);
                    right = right.reindex_mapping(dim, &rmap);
                }
                (Ok(_), Ok(_)) => {}
                _ if left_size != right_size => {
                    return Err(DatasetError::SizeConflict {
                        dim: dim.clone(),
                        left: *left_size,
                        right: *right_size,
                    });
                }
                _ => {}
            }
        }

        for (name, var) in right.coords {
            let merged = match left.coords.get(&name) {
                Some(existing) => existing.combine_first(&var, &name)?,
                None => var,
            };
            left.coords.insert(name, merged);
        }
        for (name, var) in right.data_vars {
            let merged = match left.data_vars.get(&name) {
                Some(existing) => existing.combine_first(&var, &name)?,
                None => var,
            };
            left.data_vars.insert(name, merged);
        }
        for (k, v) in right.attrs {
            left.attrs.entry(k).or_insert(v);
        }
        Ok(left)
    }

    /// Merge a sequence of datasets left to right.
    pub fn merge_all<'a, I>(datasets: I) -> Result<Dataset>
    where
        I: IntoIterator<Item = &'a Dataset>,
    {
        let mut out = Dataset::new();
        for ds in datasets {
            out = out.merge(ds)?;
        }
        Ok(out)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "<Dataset>")?;
        let dims: Vec<String> = self
            .dims()
            .iter()
            .map(|(d, n)| format!("{d}: {n}"))
            .collect();
        writeln!(f, "Dimensions: ({})", dims.join(", "))?;
        writeln!(f, "Coordinates:")?;
        for (name, c) in &self.coords {
            writeln!(f, "    {name} ({}) {}", c.dims().join(", "), c.values().kind())?;
        }
        writeln!(f, "Data variables:")?;
        for (name, v) in &self.data_vars {
            writeln!(f, "    {name} ({}) {}", v.dims().join(", "), v.values().kind())?;
        }
        Ok(())
    }
}
