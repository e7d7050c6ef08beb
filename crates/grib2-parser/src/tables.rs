//! GRIB2 parameter and level lookup tables.
//!
//! Translate the numeric codes of Sections 0 and 4 into the ecCodes names
//! used for filtering and into CF-style variable names and attributes.
//! Only parameters found in NCEP global and regional products are listed;
//! anything else falls back to a code-derived name.

/// Lookup key for a parameter: (discipline, category, number).
pub type ParamKey = (u8, u8, u8);

/// Naming for one GRIB2 parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterInfo {
    /// ecCodes `shortName`.
    pub short_name: &'static str,
    /// ecCodes `name`.
    pub long_name: &'static str,
    pub units: &'static str,
}

const fn param(
    short_name: &'static str,
    long_name: &'static str,
    units: &'static str,
) -> ParameterInfo {
    ParameterInfo {
        short_name,
        long_name,
        units,
    }
}

/// (discipline, category, number) → naming, WMO Code Table 4.2 with NCEP locals.
const PARAMETERS: &[(ParamKey, ParameterInfo)] = &[
    ((0, 0, 0), param("t", "Temperature", "K")),
    ((0, 0, 6), param("dpt", "Dew point temperature", "K")),
    ((0, 1, 0), param("q", "Specific humidity", "kg kg**-1")),
    ((0, 1, 1), param("r", "Relative humidity", "%")),
    ((0, 1, 3), param("pwat", "Precipitable water", "kg m**-2")),
    ((0, 1, 7), param("prate", "Precipitation rate", "kg m**-2 s**-1")),
    ((0, 1, 8), param("tp", "Total Precipitation", "kg m**-2")),
    ((0, 1, 11), param("sde", "Snow depth", "m")),
    ((0, 2, 2), param("u", "U component of wind", "m s**-1")),
    ((0, 2, 3), param("v", "V component of wind", "m s**-1")),
    ((0, 2, 8), param("w", "Vertical velocity", "Pa s**-1")),
    ((0, 2, 22), param("gust", "Wind speed (gust)", "m s**-1")),
    ((0, 3, 0), param("sp", "Surface pressure", "Pa")),
    ((0, 3, 1), param("prmsl", "Pressure reduced to MSL", "Pa")),
    ((0, 3, 5), param("gh", "Geopotential height", "gpm")),
    ((0, 4, 7), param("sdswrf", "Surface downward short-wave radiation flux", "W m**-2")),
    ((0, 5, 3), param("sdlwrf", "Surface downward long-wave radiation flux", "W m**-2")),
    ((0, 6, 1), param("tcc", "Total Cloud Cover", "%")),
    ((0, 7, 6), param("cape", "Convective available potential energy", "J kg**-1")),
    ((0, 19, 0), param("vis", "Visibility", "m")),
    ((2, 0, 0), param("lsm", "Land-sea mask", "(0 - 1)")),
    ((10, 2, 0), param("ci", "Sea ice area fraction", "(0 - 1)")),
];

/// Look up a parameter by its GRIB2 codes.
pub fn parameter(discipline: u8, category: u8, number: u8) -> Option<ParameterInfo> {
    PARAMETERS
        .iter()
        .find(|(key, _)| *key == (discipline, category, number))
        .map(|(_, info)| *info)
}

/// Names that depend on the level as well as the parameter.
///
/// Returns `(shortName, cfVarName, name)` where ecCodes defines a
/// dedicated parameter for the combination, e.g. 2 m temperature.
pub fn level_specific_name(
    short_name: &str,
    type_of_level: &str,
    level: f64,
) -> Option<(&'static str, &'static str, &'static str)> {
    match (short_name, type_of_level, level as i64) {
        ("t", "heightAboveGround", 2) => Some(("2t", "t2m", "2 metre temperature")),
        ("dpt", "heightAboveGround", 2) => Some(("2d", "d2m", "2 metre dewpoint temperature")),
        ("r", "heightAboveGround", 2) => Some(("2r", "r2", "2 metre relative humidity")),
        ("u", "heightAboveGround", 10) => Some(("10u", "u10", "10 metre U wind component")),
        ("v", "heightAboveGround", 10) => Some(("10v", "v10", "10 metre V wind component")),
        ("gh", "surface", _) => Some(("orog", "orog", "Orography")),
        _ => None,
    }
}

/// ecCodes `typeOfLevel` for a fixed-surface type (Code Table 4.5).
///
/// Isobaric surfaces below 1 hPa are reported in Pa, as ecCodes does.
pub fn type_of_level(surface_type: u8, value: f64) -> &'static str {
    match surface_type {
        1 => "surface",
        2 => "cloudBase",
        3 => "cloudTop",
        4 => "isothermZero",
        6 => "maxWind",
        7 => "tropopause",
        8 => "nominalTop",
        10 => "entireAtmosphere",
        100 if value < 100.0 => "isobaricInPa",
        100 => "isobaricInhPa",
        101 => "meanSea",
        102 => "heightAboveSea",
        103 => "heightAboveGround",
        104 => "sigma",
        106 => "depthBelowLandLayer",
        108 => "pressureFromGroundLayer",
        200 => "atmosphere",
        211 => "boundaryLayerCloudLayer",
        212 => "lowCloudBottom",
        213 => "lowCloudTop",
        214 => "lowCloudLayer",
        220 => "planetaryBoundaryLayer",
        222 => "middleCloudBottom",
        223 => "middleCloudTop",
        224 => "middleCloudLayer",
        232 => "highCloudBottom",
        233 => "highCloudTop",
        234 => "highCloudLayer",
        _ => "unknown",
    }
}

/// Level value as reported for `typeOfLevel`: hPa for `isobaricInhPa`,
/// the raw surface value otherwise.
pub fn level_value(type_of_level: &str, value: f64) -> f64 {
    match type_of_level {
        "isobaricInhPa" => value / 100.0,
        _ if value.is_nan() => 0.0,
        _ => value,
    }
}
