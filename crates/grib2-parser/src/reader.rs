//! Reading GRIB2 files with the `grib` crate.
//!
//! A file is first indexed: every submessage's identification and product
//! keys are read without touching its data section. Values and grid
//! coordinates are unpacked only for the positions a caller asks for.

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Grib2Error, Grib2Result};
use crate::field::{
    GribField, HorizontalGrid, IndexedMessage, MessageHeader, MessagePosition, StepType,
};
use crate::tables;

fn open_file(path: &Path) -> Grib2Result<grib::Grib2<grib::SeekableGrib2Reader<BufReader<File>>>> {
    let f = BufReader::new(File::open(path)?);
    grib::from_reader(f).map_err(|e| Grib2Error::InvalidFormat(e.to_string()))
}

/// Read the header of every message in a GRIB2 file.
///
/// Messages whose header cannot be interpreted are skipped with a warning;
/// a file with no readable header is an error.
pub fn index_messages(path: &Path) -> Grib2Result<Vec<IndexedMessage>> {
    let grib2 = open_file(path)?;
    let source = path.display().to_string();
    let mut index = Vec::new();
    let mut failures = 0usize;

    for ((message, submessage), submsg) in grib2.iter() {
        match decode_header(&submsg) {
            Ok(header) => index.push(IndexedMessage {
                position: MessagePosition {
                    message,
                    submessage,
                },
                header,
            }),
            Err(e) => {
                failures += 1;
                warn!(
                    source = %source,
                    message_index = message,
                    submessage_index = submessage,
                    error = %e,
                    "Unreadable GRIB2 message header, skipping"
                );
            }
        }
    }

    if index.is_empty() {
        return Err(Grib2Error::InvalidFormat(format!(
            "{source}: no readable messages ({failures} failed)"
        )));
    }
    debug!(source = %source, count = index.len(), failures = failures, "Indexed GRIB2 file");
    Ok(index)
}

/// Unpack the messages at `positions`, in file order.
///
/// Fails if any requested message is missing or cannot be unpacked.
pub fn read_messages(path: &Path, positions: &[MessagePosition]) -> Grib2Result<Vec<GribField>> {
    let grib2 = open_file(path)?;
    let wanted: BTreeSet<MessagePosition> = positions.iter().copied().collect();
    let mut fields = Vec::with_capacity(wanted.len());

    for ((message, submessage), submsg) in grib2.iter() {
        let position = MessagePosition {
            message,
            submessage,
        };
        if !wanted.contains(&position) {
            continue;
        }
        fields.push(decode_field(submsg)?);
    }

    if fields.len() != wanted.len() {
        return Err(Grib2Error::InvalidFormat(format!(
            "{}: {} of {} requested messages present",
            path.display(),
            fields.len(),
            wanted.len()
        )));
    }
    debug!(path = %path.display(), count = fields.len(), "Unpacked GRIB2 messages");
    Ok(fields)
}

/// Decode every message of a GRIB2 file.
///
/// Messages that fail to unpack are skipped with a warning; a file with
/// no readable message is an error.
pub fn read_fields(path: &Path) -> Grib2Result<Vec<GribField>> {
    collect_fields(&open_file(path)?, &path.display().to_string())
}

/// Decode every message of an in-memory GRIB2 file.
pub fn read_fields_from_bytes(data: Bytes) -> Grib2Result<Vec<GribField>> {
    let grib2 = grib::from_bytes(data).map_err(|e| Grib2Error::InvalidFormat(e.to_string()))?;
    collect_fields(&grib2, "<bytes>")
}

fn collect_fields<R: grib::Grib2Read>(
    grib2: &grib::Grib2<R>,
    source: &str,
) -> Grib2Result<Vec<GribField>> {
    let mut fields = Vec::new();
    let mut failures = 0usize;

    for ((message, submessage), submsg) in grib2.iter() {
        match decode_field(submsg) {
            Ok(field) => fields.push(field),
            Err(e) => {
                failures += 1;
                warn!(
                    source = %source,
                    message_index = message,
                    submessage_index = submessage,
                    error = %e,
                    "Failed to decode GRIB2 message, skipping"
                );
            }
        }
    }

    if fields.is_empty() {
        return Err(Grib2Error::InvalidFormat(format!(
            "{source}: no decodable messages ({failures} failed)"
        )));
    }
    debug!(source = %source, count = fields.len(), failures = failures, "Decoded GRIB2 file");
    Ok(fields)
}

fn decode_header<R>(submsg: &grib::SubMessage<'_, R>) -> Grib2Result<MessageHeader> {
    let discipline = submsg.indicator().discipline;
    let reference_time = reference_time(submsg.identification().ref_time_unchecked())?;

    let prod_def = submsg.prod_def();
    let template = prod_def.prod_tmpl_num();
    let category = prod_def
        .parameter_category()
        .ok_or_else(|| Grib2Error::InvalidFormat(format!("unsupported product template 4.{template}")))?;
    let number = prod_def
        .parameter_number()
        .ok_or_else(|| Grib2Error::InvalidFormat(format!("unsupported product template 4.{template}")))?;
    let payload: Vec<u8> = prod_def.iter().copied().collect();

    let forecast_hours = match prod_def.forecast_time() {
        Some(ft) => {
            let unit = match ft.unit {
                grib::Name(u) => u8::from(u),
                grib::Num(n) => n,
            };
            to_hours(unit, ft.value).ok_or_else(|| {
                Grib2Error::InvalidFormat(format!("unsupported forecast time unit {unit}"))
            })?
        }
        None => 0,
    };

    let (surface_type, surface_value) = match prod_def.fixed_surfaces() {
        Some((first, _)) => (first.surface_type, first.value()),
        None => (255, f64::NAN),
    };
    let type_of_level = tables::type_of_level(surface_type, surface_value);
    let level = tables::level_value(type_of_level, surface_value);

    let (step_type, start_step, end_step) = match statistical_range(template, &payload) {
        Some(range) => {
            let length = to_hours(range.unit, range.length).ok_or_else(|| {
                Grib2Error::InvalidFormat(format!("unsupported time range unit {}", range.unit))
            })?;
            let step_type =
                StepType::from_statistical_process(range.process).unwrap_or(StepType::Instant);
            (step_type, forecast_hours, forecast_hours + length)
        }
        None => (StepType::Instant, forecast_hours, forecast_hours),
    };

    let (short_name, var_name, long_name, units) =
        names(discipline, category, number, type_of_level, level);

    let (nx, ny) = submsg
        .grid_shape()
        .map_err(|e| Grib2Error::InvalidFormat(e.to_string()))?;

    Ok(MessageHeader {
        discipline,
        category,
        number,
        short_name,
        var_name,
        long_name,
        units,
        type_of_level: type_of_level.to_string(),
        level,
        step_type,
        start_step,
        end_step,
        reference_time,
        perturbation_number: perturbation_number(template, &payload),
        nx,
        ny,
    })
}

fn decode_field<R: grib::Grib2Read>(submsg: grib::SubMessage<'_, R>) -> Grib2Result<GribField> {
    let header = decode_header(&submsg)?;
    let (nx, ny) = (header.nx, header.ny);
    let grid = horizontal_grid(&submsg, nx, ny);

    let decoder = grib::Grib2SubmessageDecoder::from(submsg).map_err(|e| Grib2Error::Unpack(e.to_string()))?;
    let values: Vec<f32> = decoder
        .dispatch()
        .map_err(|e| Grib2Error::Unpack(e.to_string()))?
        .collect();
    if values.len() != nx * ny {
        return Err(Grib2Error::Unpack(format!("{} values for a {}x{} grid", values.len(), ny, nx)));
    }

    Ok(GribField {
        header,
        grid,
        values,
    })
}

fn reference_time(t: grib::UtcDateTime) -> Grib2Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(
        i32::from(t.year),
        u32::from(t.month),
        u32::from(t.day),
        u32::from(t.hour),
        u32::from(t.minute),
        u32::from(t.second),
    )
    .single()
    .ok_or_else(|| {
        Grib2Error::InvalidFormat(format!(
            "invalid reference time {}-{}-{} {}:{}:{}",
            t.year, t.month, t.day, t.hour, t.minute, t.second
        ))
    })
}

fn names(
    discipline: u8,
    category: u8,
    number: u8,
    type_of_level: &str,
    level: f64,
) -> (String, String, String, String) {
    let (short, long, units) = match tables::parameter(discipline, category, number) {
        Some(p) => (p.short_name.to_string(), p.long_name.to_string(), p.units.to_string()),
        None => {
            let code = format!("P{discipline}_{category}_{number}");
            (code, "unknown".to_string(), "unknown".to_string())
        }
    };
    match tables::level_specific_name(&short, type_of_level, level) {
        Some((short, cf, long)) => (short.to_string(), cf.to_string(), long.to_string(), units),
        None => (short.clone(), short, long, units),
    }
}

fn horizontal_grid<R>(submsg: &grib::SubMessage<'_, R>, ni: usize, nj: usize) -> HorizontalGrid {
    let regular = submsg.grid_def().grid_tmpl_num() == 0;
    let points: Vec<(f32, f32)> = match submsg.latlons() {
        Ok(iter) => iter.collect(),
        Err(e) => {
            debug!(error = %e, "Grid coordinates unavailable, using index dimensions");
            return HorizontalGrid::IndexOnly;
        }
    };
    if points.len() != ni * nj {
        return HorizontalGrid::IndexOnly;
    }
    if regular {
        HorizontalGrid::Regular {
            latitudes: points.iter().step_by(ni.max(1)).map(|p| f64::from(p.0)).collect(),
            longitudes: points.iter().take(ni).map(|p| f64::from(p.1)).collect(),
        }
    } else {
        HorizontalGrid::Projected {
            latitudes: points.iter().map(|p| f64::from(p.0)).collect(),
            longitudes: points.iter().map(|p| f64::from(p.1)).collect(),
        }
    }
}

// ============================================================================
// Product definition details
// ============================================================================

/// Statistical processing recorded in Section 4 of templates 4.8, 4.11, 4.12.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StatisticalRange {
    pub process: u8,
    pub unit: u8,
    pub length: u32,
}

/// Read the first time-range specification. Offsets index the section
/// payload, which starts at octet 6 of Section 4.
pub(crate) fn statistical_range(template: u16, payload: &[u8]) -> Option<StatisticalRange> {
    let base = match template {
        8 => 41,
        11 => 44,
        12 => 43,
        _ => return None,
    };
    let process = *payload.get(base)?;
    let unit = *payload.get(base + 2)?;
    let length = u32::from_be_bytes(payload.get(base + 3..base + 7)?.try_into().ok()?);
    Some(StatisticalRange {
        process,
        unit,
        length,
    })
}

/// Ensemble perturbation number for templates 4.1 and 4.11.
pub(crate) fn perturbation_number(template: u16, payload: &[u8]) -> Option<u32> {
    match template {
        1 | 11 => payload.get(30).map(|v| u32::from(*v)),
        _ => None,
    }
}

/// Convert a Code Table 4.4 quantity to whole hours.
pub(crate) fn to_hours(unit: u8, value: u32) -> Option<u32> {
    match unit {
        0 => Some(value / 60),
        1 => Some(value),
        2 => value.checked_mul(24),
        10 => value.checked_mul(3),
        11 => value.checked_mul(6),
        12 => value.checked_mul(12),
        13 => Some(value / 3600),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template_8_payload(process: u8, unit: u8, length: u32) -> Vec<u8> {
        let mut payload = vec![0u8; 54];
        payload[41] = process;
        payload[43] = unit;
        payload[44..48].copy_from_slice(&length.to_be_bytes());
        payload
    }

    #[test]
    fn test_statistical_range_template_8() {
        let payload = template_8_payload(1, 1, 6);
        assert_eq!(
            statistical_range(8, &payload),
            Some(StatisticalRange {
                process: 1,
                unit: 1,
                length: 6
            })
        );
        assert_eq!(statistical_range(0, &payload), None);
    }

    #[test]
    fn test_statistical_range_template_11() {
        let mut payload = vec![0u8; 60];
        payload[30] = 4;
        payload[44] = 0;
        payload[46] = 1;
        payload[47..51].copy_from_slice(&3u32.to_be_bytes());
        let range = statistical_range(11, &payload).unwrap();
        assert_eq!(range.process, 0);
        assert_eq!(range.length, 3);
        assert_eq!(perturbation_number(11, &payload), Some(4));
    }

    #[test]
    fn test_statistical_range_truncated_payload() {
        assert_eq!(statistical_range(8, &[0u8; 20]), None);
    }

    #[test]
    fn test_to_hours() {
        assert_eq!(to_hours(1, 6), Some(6));
        assert_eq!(to_hours(0, 360), Some(6));
        assert_eq!(to_hours(2, 1), Some(24));
        assert_eq!(to_hours(11, 2), Some(12));
        assert_eq!(to_hours(13, 7200), Some(2));
        assert_eq!(to_hours(4, 1), None);
    }

    #[test]
    fn test_names_level_specific() {
        let (short, var, long, units) = names(0, 0, 0, "heightAboveGround", 2.0);
        assert_eq!((short.as_str(), var.as_str()), ("2t", "t2m"));
        assert_eq!(long, "2 metre temperature");
        assert_eq!(units, "K");

        let (short, var, _, _) = names(0, 1, 0, "heightAboveGround", 2.0);
        assert_eq!((short.as_str(), var.as_str()), ("q", "q"));

        let (short, _, long, _) = names(0, 99, 0, "surface", 0.0);
        assert_eq!(short, "P0_99_0");
        assert_eq!(long, "unknown");
    }

    #[test]
    fn test_reference_time() {
        let t = reference_time(grib::UtcDateTime::new(2020, 1, 1, 6, 0, 0)).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2020, 1, 1, 6, 0, 0).unwrap());
        assert!(reference_time(grib::UtcDateTime::new(2020, 13, 1, 0, 0, 0)).is_err());
    }

    #[test]
    fn test_read_fields_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.grib2");
        std::fs::write(&path, b"not a grib file").unwrap();
        assert!(read_fields(&path).is_err());
        assert!(index_messages(&path).is_err());
        assert!(read_messages(&path, &[]).is_err());
        assert!(read_fields(&dir.path().join("missing.grib2")).is_err());
        assert!(matches!(
            index_messages(&dir.path().join("missing.grib2")),
            Err(Grib2Error::Io(_))
        ));
    }
}
