//! Memoized static variables.

use chrono::{DateTime, Utc};
use dataset::Dataset;
use forecast_common::DimensionKey;
use std::collections::BTreeMap;
use tracing::debug;

/// Static fields are decoded once per (t0, member).
pub type StaticKey = (DateTime<Utc>, Option<u32>);

/// Extracted static variables for the current (t0, member) pair.
///
/// Only one pair is held: seeing a different pair drops every entry.
#[derive(Debug, Default)]
pub struct StaticVarCache {
    key: Option<StaticKey>,
    entries: BTreeMap<String, Dataset>,
}

impl StaticVarCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to the pair of `dims`, invalidating entries of any other pair.
    pub fn observe(&mut self, dims: &DimensionKey) {
        let key = dims.static_key();
        if self.key != Some(key) {
            if !self.entries.is_empty() {
                debug!(dims = %dims, dropped = self.entries.len(), "Invalidating static variable cache");
            }
            self.entries.clear();
            self.key = Some(key);
        }
    }

    pub fn get(&mut self, dims: &DimensionKey, varname: &str) -> Option<Dataset> {
        self.observe(dims);
        self.entries.get(varname).cloned()
    }

    pub fn insert(&mut self, dims: &DimensionKey, varname: &str, ds: Dataset) {
        self.observe(dims);
        self.entries.insert(varname.to_string(), ds);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.key = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dims(day: u32, fhr: u32, member: u32) -> DimensionKey {
        DimensionKey::new(Utc.with_ymd_and_hms(2020, 1, day, 0, 0, 0).unwrap(), fhr)
            .with_member(member)
    }

    #[test]
    fn test_hit_for_same_pair() {
        let mut cache = StaticVarCache::new();
        cache.insert(&dims(1, 0, 0), "orog", Dataset::new());
        assert!(cache.get(&dims(1, 6, 0), "orog").is_some());
        assert!(cache.get(&dims(1, 6, 0), "lsm").is_none());
    }

    #[test]
    fn test_new_pair_invalidates() {
        let mut cache = StaticVarCache::new();
        cache.insert(&dims(1, 0, 0), "orog", Dataset::new());
        assert!(cache.get(&dims(1, 0, 1), "orog").is_none());
        assert!(cache.is_empty());

        cache.insert(&dims(1, 0, 1), "orog", Dataset::new());
        assert!(cache.get(&dims(2, 0, 1), "orog").is_none());
    }
}
