//! Common types shared across the forecast ingestion crates.

pub mod axes;
pub mod dims;
pub mod time;

pub use axes::{sample_keys, HourRange, MemberRange, T0Range};
pub use dims::DimensionKey;
pub use time::{
    fhr_from_lead_time_ns, from_epoch_ns, lead_time_ns, parse_datetime, to_epoch_ns, valid_time,
    TimeParseError, NANOS_PER_HOUR,
};
