//! Configured ranges for each sample dimension.
//!
//! Ranges are inclusive of both ends, matching how forecast archives are
//! usually described ("fhr 0 to 240 every 6 hours").

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::dims::DimensionKey;
use crate::time::parse_datetime;

/// Forecast hour range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourRange {
    pub start: u32,
    pub end: u32,
    #[serde(default = "default_step")]
    pub step: u32,
}

fn default_step() -> u32 {
    1
}

impl HourRange {
    pub fn new(start: u32, end: u32, step: u32) -> Self {
        Self { start, end, step }
    }

    /// A range holding a single hour.
    pub fn single(hour: u32) -> Self {
        Self::new(hour, hour, 1)
    }

    /// All values in the range.
    pub fn values(&self) -> Vec<u32> {
        if self.step == 0 {
            return vec![self.start];
        }
        (self.start..=self.end).step_by(self.step as usize).collect()
    }

    pub fn first(&self) -> u32 {
        self.start
    }
}

/// Ensemble member range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRange {
    pub start: u32,
    pub end: u32,
    #[serde(default = "default_step")]
    pub step: u32,
}

impl MemberRange {
    pub fn new(start: u32, end: u32, step: u32) -> Self {
        Self { start, end, step }
    }

    pub fn values(&self) -> Vec<u32> {
        if self.step == 0 {
            return vec![self.start];
        }
        (self.start..=self.end).step_by(self.step as usize).collect()
    }

    pub fn first(&self) -> u32 {
        self.start
    }
}

/// Initialization time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct T0Range {
    #[serde(deserialize_with = "deserialize_datetime")]
    pub start: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_datetime")]
    pub end: DateTime<Utc>,
    /// Hours between initializations
    #[serde(default = "default_freq_hours")]
    pub freq_hours: u32,
}

fn default_freq_hours() -> u32 {
    6
}

fn deserialize_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_datetime(&s).map_err(serde::de::Error::custom)
}

impl T0Range {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, freq_hours: u32) -> Self {
        Self {
            start,
            end,
            freq_hours,
        }
    }

    pub fn values(&self) -> Vec<DateTime<Utc>> {
        let mut out = Vec::new();
        let mut t = self.start;
        let step = Duration::hours(i64::from(self.freq_hours.max(1)));
        while t <= self.end {
            out.push(t);
            t += step;
        }
        out
    }
}

/// Every sample key in `t0 × member × fhr` order.
pub fn sample_keys(
    t0: &T0Range,
    members: Option<&MemberRange>,
    fhr: &HourRange,
) -> Vec<DimensionKey> {
    let members: Vec<Option<u32>> = match members {
        Some(m) => m.values().into_iter().map(Some).collect(),
        None => vec![None],
    };

    let mut keys = Vec::new();
    for t in t0.values() {
        for member in &members {
            for hour in fhr.values() {
                let mut key = DimensionKey::new(t, hour);
                key.member = *member;
                keys.push(key);
            }
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_hour_range_values() {
        assert_eq!(HourRange::new(0, 12, 6).values(), vec![0, 6, 12]);
        assert_eq!(HourRange::single(6).values(), vec![6]);
    }

    #[test]
    fn test_hour_range_default_step() {
        let range: HourRange = serde_yaml::from_str("{start: 0, end: 2}").unwrap();
        assert_eq!(range.values(), vec![0, 1, 2]);
    }

    #[test]
    fn test_t0_range_accepts_short_timestamps() {
        let range: T0Range =
            serde_yaml::from_str("{start: 2020-01-01T00, end: 2020-01-02T00, freq_hours: 12}").unwrap();
        assert_eq!(range.values().len(), 3);
    }

    #[test]
    fn test_sample_keys_order() {
        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let range = T0Range::new(t0, t0 + Duration::hours(6), 6);
        let keys = sample_keys(&range, Some(&MemberRange::new(0, 1, 1)), &HourRange::new(0, 6, 6));

        assert_eq!(keys.len(), 8);
        assert_eq!(keys[0], DimensionKey::new(t0, 0).with_member(0));
        assert_eq!(keys[1], DimensionKey::new(t0, 6).with_member(0));
        assert_eq!(keys[2], DimensionKey::new(t0, 0).with_member(1));
    }
}
