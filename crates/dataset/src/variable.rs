//! Values with named dimensions and attributes.

use crate::attrs::{AttrValue, Attrs};
use crate::error::{DatasetError, Result};
use crate::values::Values;

/// An n-d array with one name per axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    dims: Vec<String>,
    values: Values,
    attrs: Attrs,
}

impl Variable {
    /// Create a variable; `dims` must name every axis of `values`.
    pub fn new<S: Into<String>>(dims: Vec<S>, values: Values) -> Result<Self> {
        let dims: Vec<String> = dims.into_iter().map(Into::into).collect();
        if dims.len() != values.ndim() {
            return Err(DatasetError::ShapeMismatch {
                name: dims.join(","),
                reason: format!("{} dims for {}-d values", dims.len(), values.ndim()),
            });
        }
        for (i, d) in dims.iter().enumerate() {
            if dims[..i].contains(d) {
                return Err(DatasetError::DimensionExists(d.clone()));
            }
        }
        Ok(Self {
            dims,
            values,
            attrs: Attrs::new(),
        })
    }

    /// A 0-d variable.
    pub fn scalar(values: Values) -> Self {
        Self {
            dims: Vec::new(),
            values,
            attrs: Attrs::new(),
        }
    }

    /// A 1-d variable along `dim`.
    pub fn along(dim: &str, values: Values) -> Result<Self> {
        Self::new(vec![dim], values)
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn into_values(self) -> Values {
        self.values
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attrs_mut(&mut self) -> &mut Attrs {
        &mut self.attrs
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(AttrValue::as_str)
    }

    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    pub fn has_dim(&self, dim: &str) -> bool {
        self.axis_of(dim).is_some()
    }

    /// Length along `dim`, if present.
    pub fn size_of(&self, dim: &str) -> Option<usize> {
        self.axis_of(dim).map(|axis| self.shape()[axis])
    }

    /// Insert a length-1 axis named `dim` at position `axis`.
    pub fn insert_dim(&mut self, dim: &str, axis: usize) -> Result<()> {
        if self.has_dim(dim) {
            return Err(DatasetError::DimensionExists(dim.to_string()));
        }
        let axis = axis.min(self.dims.len());
        self.values = self.values.clone().insert_axis(axis);
        self.dims.insert(axis, dim.to_string());
        Ok(())
    }

    pub fn rename_dim(&mut self, old: &str, new: &str) {
        for d in self.dims.iter_mut() {
            if d == old {
                *d = new.to_string();
            }
        }
    }

    /// Take `indices` along `dim`. Variables without `dim` are returned unchanged.
    pub fn select(&self, dim: &str, indices: &[usize]) -> Variable {
        match self.axis_of(dim) {
            Some(axis) => Variable {
                dims: self.dims.clone(),
                values: self.values.select(axis, indices),
                attrs: self.attrs.clone(),
            },
            None => self.clone(),
        }
    }

    /// Reindex along `dim`. Variables without `dim` are returned unchanged.
    pub fn reindex(&self, dim: &str, mapping: &[Option<usize>]) -> Variable {
        match self.axis_of(dim) {
            Some(axis) => Variable {
                dims: self.dims.clone(),
                values: self.values.reindex(axis, mapping),
                attrs: self.attrs.clone(),
            },
            None => self.clone(),
        }
    }

    /// Fill missing elements from `other`, keeping this variable's attributes.
    pub fn combine_first(&self, other: &Variable, name: &str) -> Result<Variable> {
        if self.dims != other.dims {
            return Err(DatasetError::DimensionOrderMismatch {
                name: name.to_string(),
                left: self.dims.clone(),
                right: other.dims.clone(),
            });
        }
        let mut attrs = other.attrs.clone();
        attrs.extend(self.attrs.clone());
        Ok(Variable {
            dims: self.dims.clone(),
            values: self.values.combine_first(&other.values, name)?,
            attrs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_rank() {
        let err = Variable::new(vec!["x", "y"], Values::f64_1d(vec![1.0])).unwrap_err();
        assert!(matches!(err, DatasetError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_new_rejects_duplicate_dims() {
        let values = Values::f32_from_shape(&[1, 1], vec![0.0]).unwrap();
        let err = Variable::new(vec!["x", "x"], values).unwrap_err();
        assert_eq!(err, DatasetError::DimensionExists("x".into()));
    }

    #[test]
    fn test_insert_dim() {
        let mut v = Variable::along("x", Values::f64_1d(vec![1.0, 2.0])).unwrap();
        v.insert_dim("t", 0).unwrap();
        assert_eq!(v.dims(), &["t".to_string(), "x".to_string()]);
        assert_eq!(v.shape(), &[1, 2]);
        assert!(v.insert_dim("t", 0).is_err());
    }

    #[test]
    fn test_combine_merges_attrs() {
        let a = Variable::along("x", Values::f64_1d(vec![f64::NAN]))
            .unwrap()
            .with_attr("units", "K");
        let b = Variable::along("x", Values::f64_1d(vec![4.0]))
            .unwrap()
            .with_attr("units", "C")
            .with_attr("long_name", "temp");
        let c = a.combine_first(&b, "t").unwrap();
        assert_eq!(c.attr_str("units"), Some("K"));
        assert_eq!(c.attr_str("long_name"), Some("temp"));
        assert_eq!(c.values(), &Values::f64_1d(vec![4.0]));
    }
}
