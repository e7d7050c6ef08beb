//! Typed n-dimensional storage.

use chrono::{DateTime, Utc};
use ndarray::{Array1, ArrayD, Axis, IxDyn, Zip};
use std::cmp::Ordering;
use std::fmt;

use crate::error::{DatasetError, Result};

/// Element types that carry a missing-value sentinel.
///
/// Floats use NaN, integers (and the nanosecond encodings for datetimes
/// and timedeltas) use `i64::MIN`, which is also how NaT is encoded.
pub trait Element: Clone + PartialEq {
    const MISSING: Self;

    fn is_missing(&self) -> bool;
}

impl Element for f32 {
    const MISSING: Self = f32::NAN;

    fn is_missing(&self) -> bool {
        self.is_nan()
    }
}

impl Element for f64 {
    const MISSING: Self = f64::NAN;

    fn is_missing(&self) -> bool {
        self.is_nan()
    }
}

impl Element for i64 {
    const MISSING: Self = i64::MIN;

    fn is_missing(&self) -> bool {
        *self == i64::MIN
    }
}

/// Storage kind of a [`Values`] array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    F32,
    F64,
    I64,
    Datetime,
    Timedelta,
}

/// N-dimensional values of one kind.
///
/// Datetimes are nanoseconds since the Unix epoch, timedeltas are
/// nanoseconds.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
    I64(ArrayD<i64>),
    Datetime(ArrayD<i64>),
    Timedelta(ArrayD<i64>),
}

/// Apply the same array transformation regardless of element kind.
macro_rules! map_values {
    ($values:expr, $arr:ident => $body:expr) => {
        match $values {
            Values::F32($arr) => Values::F32($body),
            Values::F64($arr) => Values::F64($body),
            Values::I64($arr) => Values::I64($body),
            Values::Datetime($arr) => Values::Datetime($body),
            Values::Timedelta($arr) => Values::Timedelta($body),
        }
    };
}

/// Evaluate the same expression regardless of element kind.
macro_rules! with_values {
    ($values:expr, $arr:ident => $body:expr) => {
        match $values {
            Values::F32($arr) => $body,
            Values::F64($arr) => $body,
            Values::I64($arr) => $body,
            Values::Datetime($arr) => $body,
            Values::Timedelta($arr) => $body,
        }
    };
}

impl Values {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Build an f32 array from a flat vector in row-major order.
    pub fn f32_from_shape(shape: &[usize], data: Vec<f32>) -> Result<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), data)
            .map(Values::F32)
            .map_err(|e| shape_error(shape, e))
    }

    pub fn f64_1d(data: Vec<f64>) -> Self {
        Values::F64(Array1::from_vec(data).into_dyn())
    }

    pub fn i64_1d(data: Vec<i64>) -> Self {
        Values::I64(Array1::from_vec(data).into_dyn())
    }

    pub fn datetime_1d(data: Vec<i64>) -> Self {
        Values::Datetime(Array1::from_vec(data).into_dyn())
    }

    pub fn timedelta_1d(data: Vec<i64>) -> Self {
        Values::Timedelta(Array1::from_vec(data).into_dyn())
    }

    pub fn scalar_f64(v: f64) -> Self {
        Values::F64(ArrayD::from_elem(IxDyn(&[]), v))
    }

    pub fn scalar_i64(v: i64) -> Self {
        Values::I64(ArrayD::from_elem(IxDyn(&[]), v))
    }

    pub fn scalar_datetime(dt: DateTime<Utc>) -> Self {
        let ns = dt.timestamp_nanos_opt().unwrap_or(i64::MIN);
        Values::Datetime(ArrayD::from_elem(IxDyn(&[]), ns))
    }

    pub fn scalar_timedelta(ns: i64) -> Self {
        Values::Timedelta(ArrayD::from_elem(IxDyn(&[]), ns))
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn kind(&self) -> ValueKind {
        match self {
            Values::F32(_) => ValueKind::F32,
            Values::F64(_) => ValueKind::F64,
            Values::I64(_) => ValueKind::I64,
            Values::Datetime(_) => ValueKind::Datetime,
            Values::Timedelta(_) => ValueKind::Timedelta,
        }
    }

    pub fn shape(&self) -> &[usize] {
        with_values!(self, a => a.shape())
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    pub fn len(&self) -> usize {
        with_values!(self, a => a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of elements that are not the missing sentinel.
    pub fn count_valid(&self) -> usize {
        with_values!(self, a => a.iter().filter(|v| !v.is_missing()).count())
    }

    /// Labels of a 1-d or 0-d array, in storage order.
    pub fn labels(&self) -> Vec<Label> {
        match self {
            Values::F32(a) => a.iter().map(|v| Label::Float(f64::from(*v))).collect(),
            Values::F64(a) => a.iter().map(|v| Label::Float(*v)).collect(),
            Values::I64(a) | Values::Datetime(a) | Values::Timedelta(a) => {
                a.iter().map(|v| Label::Int(*v)).collect()
            }
        }
    }

    /// The first element as a label, if any.
    pub fn first_label(&self) -> Option<Label> {
        match self {
            Values::F32(a) => a.iter().next().map(|v| Label::Float(f64::from(*v))),
            Values::F64(a) => a.iter().next().map(|v| Label::Float(*v)),
            Values::I64(a) | Values::Datetime(a) | Values::Timedelta(a) => {
                a.iter().next().map(|v| Label::Int(*v))
            }
        }
    }

    pub fn as_f32(&self) -> Option<&ArrayD<f32>> {
        match self {
            Values::F32(a) => Some(a),
            _ => None,
        }
    }

    /// Integer storage for I64, datetime and timedelta kinds.
    pub fn as_i64(&self) -> Option<&ArrayD<i64>> {
        match self {
            Values::I64(a) | Values::Datetime(a) | Values::Timedelta(a) => Some(a),
            _ => None,
        }
    }

    // ========================================================================
    // Shape transformations
    // ========================================================================

    /// Insert a length-1 axis at `axis`.
    pub fn insert_axis(self, axis: usize) -> Self {
        map_values!(self, a => a.insert_axis(Axis(axis)))
    }

    /// Take the given indices along `axis`.
    pub fn select(&self, axis: usize, indices: &[usize]) -> Self {
        map_values!(self, a => a.select(Axis(axis), indices))
    }

    /// Rearrange `axis` so that position `i` takes old index `mapping[i]`,
    /// filling the missing sentinel where the mapping is `None`.
    pub fn reindex(&self, axis: usize, mapping: &[Option<usize>]) -> Self {
        map_values!(self, a => reindex_axis(a, axis, mapping))
    }

    /// Fill missing elements of `self` from `other`. Shapes and kinds must match.
    pub fn combine_first(&self, other: &Values, name: &str) -> Result<Values> {
        if self.shape() != other.shape() {
            return Err(DatasetError::ShapeMismatch {
                name: name.to_string(),
                reason: format!("{:?} vs {:?}", self.shape(), other.shape()),
            });
        }
        let mismatch = || DatasetError::TypeMismatch {
            name: name.to_string(),
            left: self.kind(),
            right: other.kind(),
        };
        Ok(match (self, other) {
            (Values::F32(a), Values::F32(b)) => Values::F32(fill_missing(a, b)),
            (Values::F64(a), Values::F64(b)) => Values::F64(fill_missing(a, b)),
            (Values::I64(a), Values::I64(b)) => Values::I64(fill_missing(a, b)),
            (Values::Datetime(a), Values::Datetime(b)) => Values::Datetime(fill_missing(a, b)),
            (Values::Timedelta(a), Values::Timedelta(b)) => Values::Timedelta(fill_missing(a, b)),
            _ => return Err(mismatch()),
        })
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueKind::F32 => "float32",
            ValueKind::F64 => "float64",
            ValueKind::I64 => "int64",
            ValueKind::Datetime => "datetime64[ns]",
            ValueKind::Timedelta => "timedelta64[ns]",
        };
        write!(f, "{s}")
    }
}

fn shape_error(shape: &[usize], e: ndarray::ShapeError) -> DatasetError {
    DatasetError::ShapeMismatch {
        name: format!("{shape:?}"),
        reason: e.to_string(),
    }
}

fn reindex_axis<A: Element>(a: &ArrayD<A>, axis: usize, mapping: &[Option<usize>]) -> ArrayD<A> {
    let mut shape = a.shape().to_vec();
    shape[axis] = mapping.len();
    let mut out = ArrayD::from_elem(IxDyn(&shape), A::MISSING);
    for (new_idx, old) in mapping.iter().enumerate() {
        if let Some(old_idx) = old {
            out.index_axis_mut(Axis(axis), new_idx)
                .assign(&a.index_axis(Axis(axis), *old_idx));
        }
    }
    out
}

fn fill_missing<A: Element>(a: &ArrayD<A>, b: &ArrayD<A>) -> ArrayD<A> {
    let mut out = a.clone();
    Zip::from(&mut out).and(b).for_each(|x, y| {
        if x.is_missing() {
            *x = y.clone();
        }
    });
    out
}

// ============================================================================
// Labels
// ============================================================================

/// A coordinate label used for selection and alignment.
#[derive(Debug, Clone, Copy)]
pub enum Label {
    Int(i64),
    Float(f64),
}

impl Label {
    pub fn as_f64(&self) -> f64 {
        match self {
            Label::Int(v) => *v as f64,
            Label::Float(v) => *v,
        }
    }

    /// Label equality with an absolute tolerance for floats.
    pub fn matches(&self, other: &Label, tolerance: f64) -> bool {
        match (self, other) {
            (Label::Int(a), Label::Int(b)) => a == b,
            _ => (self.as_f64() - other.as_f64()).abs() <= tolerance,
        }
    }

    pub fn total_cmp(&self, other: &Label) -> Ordering {
        match (self, other) {
            (Label::Int(a), Label::Int(b)) => a.cmp(b),
            _ => self.as_f64().total_cmp(&other.as_f64()),
        }
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.total_cmp(other) == Ordering::Equal
    }
}

impl From<f64> for Label {
    fn from(v: f64) -> Self {
        Label::Float(v)
    }
}

impl From<i64> for Label {
    fn from(v: i64) -> Self {
        Label::Int(v)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Int(v) => write!(f, "{v}"),
            Label::Float(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reindex_fills_missing() {
        let v = Values::f64_1d(vec![1.0, 2.0, 3.0]);
        let out = v.reindex(0, &[Some(2), None, Some(0)]);
        let Values::F64(a) = out else {
            panic!("kind changed");
        };
        assert_eq!(a[[0]], 3.0);
        assert!(a[[1]].is_nan());
        assert_eq!(a[[2]], 1.0);
    }

    #[test]
    fn test_reindex_integer_uses_sentinel() {
        let v = Values::timedelta_1d(vec![10, 20]);
        let out = v.reindex(0, &[None, Some(1)]);
        assert_eq!(out.as_i64().unwrap().as_slice().unwrap(), &[i64::MIN, 20]);
        assert_eq!(out.count_valid(), 1);
    }

    #[test]
    fn test_combine_first_prefers_left() {
        let a = Values::f64_1d(vec![1.0, f64::NAN, 3.0]);
        let b = Values::f64_1d(vec![9.0, 2.0, f64::NAN]);
        let c = a.combine_first(&b, "x").unwrap();
        assert_eq!(c, Values::f64_1d(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_combine_first_kind_mismatch() {
        let a = Values::f64_1d(vec![1.0]);
        let b = Values::i64_1d(vec![1]);
        assert!(matches!(
            a.combine_first(&b, "x"),
            Err(DatasetError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_insert_axis_and_select() {
        let v = Values::f32_from_shape(&[2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let v = v.insert_axis(0);
        assert_eq!(v.shape(), &[1, 2, 2]);
        let s = v.select(2, &[1]);
        assert_eq!(s.shape(), &[1, 2, 1]);
        assert_eq!(s.as_f32().unwrap().iter().copied().collect::<Vec<_>>(), vec![2.0, 4.0]);
    }

    #[test]
    fn test_label_matching() {
        assert!(Label::Float(500.0).matches(&Label::Float(500.0004), 1e-3));
        assert!(!Label::Float(500.0).matches(&Label::Float(500.1), 1e-3));
        assert!(Label::Int(3).matches(&Label::Float(3.0), 0.0));
    }

    #[test]
    fn test_scalar_datetime() {
        let dt = DateTime::<Utc>::from_timestamp(3600, 0).unwrap();
        let v = Values::scalar_datetime(dt);
        assert_eq!(v.ndim(), 0);
        assert_eq!(v.first_label(), Some(Label::Int(3_600_000_000_000)));
    }
}
