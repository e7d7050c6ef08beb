//! Common test fixtures: reference times and decoded GRIB2 fields.

use chrono::{DateTime, TimeZone, Utc};
use grib2_parser::{GribField, HorizontalGrid, MessageHeader, StepType};

use crate::generators::create_temperature_grid;

/// Common time values for testing.
pub mod time {
    /// A fixed initial time for tests.
    pub const REFERENCE_TIME: &str = "2020-01-01T00:00:00Z";

    /// GFS/GEFS model run times
    pub const GLOBAL_CYCLES: [&str; 4] = ["00", "06", "12", "18"];

    /// Common forecast hours
    pub const FORECAST_HOURS: [u32; 6] = [0, 6, 12, 24, 120, 240];
}

/// Initial time matching [`time::REFERENCE_TIME`].
pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Builder for decoded GRIB2 messages.
///
/// Defaults to an instantaneous analysis on a 3x2 regular lat/lon grid
/// initialized at [`reference_time`].
///
/// ```
/// use test_utils::FieldBuilder;
///
/// let field = FieldBuilder::new("t", "isobaricInhPa", 500.0).step(6).build();
/// assert_eq!(field.step_range(), "6");
/// ```
#[derive(Debug, Clone)]
pub struct FieldBuilder {
    field: GribField,
    values: Option<Vec<f32>>,
}

impl FieldBuilder {
    /// A field whose `shortName` and CF name are both `name`.
    pub fn new(name: &str, type_of_level: &str, level: f64) -> Self {
        Self::named(name, name, type_of_level, level)
    }

    /// A field whose ecCodes `shortName` differs from its CF name, e.g.
    /// `2t` and `t2m`.
    pub fn named(short_name: &str, var_name: &str, type_of_level: &str, level: f64) -> Self {
        Self {
            field: GribField {
                header: MessageHeader {
                    discipline: 0,
                    category: 0,
                    number: 0,
                    short_name: short_name.to_string(),
                    var_name: var_name.to_string(),
                    long_name: var_name.to_string(),
                    units: "1".to_string(),
                    type_of_level: type_of_level.to_string(),
                    level,
                    step_type: StepType::Instant,
                    start_step: 0,
                    end_step: 0,
                    reference_time: reference_time(),
                    perturbation_number: None,
                    nx: 3,
                    ny: 2,
                },
                grid: regular_grid(3, 2),
                values: Vec::new(),
            },
            values: None,
        }
    }

    pub fn long_name(mut self, long_name: &str) -> Self {
        self.field.header.long_name = long_name.to_string();
        self
    }

    pub fn units(mut self, units: &str) -> Self {
        self.field.header.units = units.to_string();
        self
    }

    pub fn reference_time(mut self, t0: DateTime<Utc>) -> Self {
        self.field.header.reference_time = t0;
        self
    }

    /// Instantaneous at forecast hour `fhr`.
    pub fn step(mut self, fhr: u32) -> Self {
        self.field.header.step_type = StepType::Instant;
        self.field.header.start_step = fhr;
        self.field.header.end_step = fhr;
        self
    }

    /// Statistically processed over `start..end` hours.
    pub fn processed(mut self, step_type: StepType, start: u32, end: u32) -> Self {
        self.field.header.step_type = step_type;
        self.field.header.start_step = start;
        self.field.header.end_step = end;
        self
    }

    pub fn accum(self, start: u32, end: u32) -> Self {
        self.processed(StepType::Accum, start, end)
    }

    pub fn avg(self, start: u32, end: u32) -> Self {
        self.processed(StepType::Avg, start, end)
    }

    pub fn member(mut self, number: u32) -> Self {
        self.field.header.perturbation_number = Some(number);
        self
    }

    /// Regular grid of `nx` longitudes by `ny` latitudes.
    pub fn grid(mut self, nx: usize, ny: usize) -> Self {
        self.field.header.nx = nx;
        self.field.header.ny = ny;
        self.field.grid = regular_grid(nx, ny);
        self
    }

    /// Projected grid without lat/lon, decoded along `y, x`.
    pub fn projected(mut self) -> Self {
        self.field.grid = HorizontalGrid::IndexOnly;
        self
    }

    pub fn values(mut self, values: Vec<f32>) -> Self {
        self.values = Some(values);
        self
    }

    pub fn fill(self, value: f32) -> Self {
        let n = self.field.header.nx * self.field.header.ny;
        self.values(vec![value; n])
    }

    pub fn build(self) -> GribField {
        let mut field = self.field;
        field.values = self
            .values
            .unwrap_or_else(|| create_temperature_grid(field.header.nx, field.header.ny));
        field
    }
}

/// Latitudes descending from 50N and longitudes ascending from 250E, one
/// degree apart.
pub fn regular_grid(nx: usize, ny: usize) -> HorizontalGrid {
    HorizontalGrid::Regular {
        latitudes: (0..ny).map(|j| 50.0 - j as f64).collect(),
        longitudes: (0..nx).map(|i| 250.0 + i as f64).collect(),
    }
}
