//! Sample assembly against in-memory GRIB2 files.

mod common;

use common::{dims, hours_after_t0, Harness};
use dataset::{AttrValue, Label};
use forecast_common::{to_epoch_ns, DimensionKey, HourRange, MemberRange, T0Range};
use ingestion::{AbsentReason, Extracted, IngestionError};
use std::collections::BTreeMap;
use std::path::Path;
use test_utils::{reference_time, FieldBuilder};

fn t2m(fhr: u32) -> grib2_parser::GribField {
    FieldBuilder::named("2t", "t2m", "heightAboveGround", 2.0)
        .long_name("2 metre temperature")
        .step(fhr)
        .build()
}

fn isobaric(name: &str, level: f64, fhr: u32, fill: f32) -> grib2_parser::GribField {
    FieldBuilder::new(name, "isobaricInhPa", level)
        .step(fhr)
        .fill(fill)
        .build()
}

fn orog(fhr: u32) -> grib2_parser::GribField {
    FieldBuilder::new("orog", "surface", 0.0)
        .long_name("Orography")
        .step(fhr)
        .fill(1500.0)
        .build()
}

// ============================================================================
// All-or-nothing assembly
// ============================================================================

#[test]
fn test_sample_has_canonical_layout() {
    let h = Harness::new();
    let mut config = h.config("gfs_forecast", HourRange::new(0, 12, 6), &["t2m", "t", "orog"]);
    config.levels = Some(vec![500.0, 850.0]);
    let source = h.source(config);

    let key = dims(6);
    h.add_file(
        &source,
        &key,
        "",
        vec![
            t2m(6),
            isobaric("t", 850.0, 6, 270.0),
            isobaric("t", 500.0, 6, 250.0),
            orog(6),
        ],
    );

    let ds = source.open_sample_dataset(&key, true, None).unwrap();
    assert_eq!(ds.data_var_names(), vec!["orog", "t", "t2m"]);
    assert_eq!(
        ds.data_var("t").unwrap().dims(),
        &["t0", "fhr", "level", "latitude", "longitude"]
    );
    assert_eq!(
        ds.data_var("t2m").unwrap().dims(),
        &["t0", "fhr", "latitude", "longitude"]
    );
    assert_eq!(
        ds.data_var("orog").unwrap().dims(),
        &["t0", "latitude", "longitude"]
    );

    assert_eq!(ds.index_labels("fhr").unwrap(), vec![Label::Int(6)]);
    assert_eq!(
        ds.index_labels("t0").unwrap(),
        vec![Label::Int(to_epoch_ns(reference_time()))]
    );
    assert_eq!(
        ds.index_labels("level").unwrap(),
        vec![Label::Float(500.0), Label::Float(850.0)]
    );
    let t = ds.data_var("t").unwrap().values().as_f32().unwrap();
    assert_eq!(t[[0, 0, 0, 0, 0]], 250.0);
    assert_eq!(t[[0, 0, 1, 0, 0]], 270.0);

    for name in ["valid_time", "heightAboveGround", "number", "surface", "step", "time"] {
        assert!(!ds.contains(name), "{name} should not survive assembly");
    }
}

#[test]
fn test_missing_variable_empties_sample() {
    let h = Harness::new();
    let source = h.source(h.config("gfs_forecast", HourRange::new(0, 12, 6), &["t2m", "t"]));

    let key = dims(6);
    h.add_file(&source, &key, "", vec![isobaric("t", 500.0, 6, 250.0)]);

    let ds = source.open_sample_dataset(&key, false, None).unwrap();
    assert!(ds.is_empty());
}

#[test]
fn test_unreachable_files_give_empty_sample() {
    let h = Harness::new();
    let source = h.source(h.config("gfs_forecast", HourRange::new(0, 12, 6), &["t2m"]));

    assert!(source.resolve_files(&dims(6), None).is_empty());
    let ds = source.open_sample_dataset(&dims(6), false, None).unwrap();
    assert!(ds.is_empty());
}

#[test]
fn test_variable_merged_across_files() {
    let h = Harness::new();
    let source = h.source(h.config("gfs_forecast", HourRange::new(0, 12, 6), &["t"]));

    let key = dims(6);
    h.add_file(&source, &key, "", vec![isobaric("t", 500.0, 6, 1.0)]);
    h.add_file(&source, &key, "b", vec![isobaric("t", 850.0, 6, 2.0)]);

    let ds = source.open_sample_dataset(&key, false, None).unwrap();
    assert_eq!(
        ds.index_labels("level").unwrap(),
        vec![Label::Float(500.0), Label::Float(850.0)]
    );
    let t = ds.data_var("t").unwrap().values().as_f32().unwrap();
    assert_eq!(t[[0, 0, 0, 1, 2]], 1.0);
    assert_eq!(t[[0, 0, 1, 1, 2]], 2.0);
}

#[test]
fn test_undecodable_file_is_skipped_when_another_has_variable() {
    let h = Harness::new();
    let source = h.source(h.config("gfs_forecast", HourRange::new(0, 12, 6), &["t"]));

    let key = dims(6);
    h.add_file(&source, &key, "", vec![t2m(6)]);
    h.add_file(&source, &key, "b", vec![isobaric("t", 850.0, 6, 2.0)]);

    let ds = source.open_sample_dataset(&key, false, None).unwrap();
    assert_eq!(ds.index_labels("level").unwrap(), vec![Label::Float(850.0)]);
}

// ============================================================================
// Static variables
// ============================================================================

#[test]
fn test_static_variables_only_on_first_sample() {
    let h = Harness::new();
    let source = h.source(h.config("gfs_forecast", HourRange::new(0, 12, 6), &["t2m", "orog"]));
    assert_eq!(source.static_vars(), vec!["orog"]);
    assert_eq!(source.dynamic_vars(), vec!["t2m"]);

    for fhr in [0, 6] {
        h.add_file(&source, &dims(fhr), "", vec![t2m(fhr), orog(fhr)]);
    }

    assert!(source.is_first_sample(&dims(0)));
    assert!(!source.is_first_sample(&dims(6)));

    let first = source.open_sample_dataset(&dims(0), false, None).unwrap();
    assert!(first.contains("orog"));
    let later = source.open_sample_dataset(&dims(6), false, None).unwrap();
    assert!(!later.contains("orog"));
    assert!(later.contains("t2m"));
}

#[test]
fn test_static_variables_reused_within_run() {
    let h = Harness::new();
    let source = h.source(h.config("gfs_forecast", HourRange::new(0, 12, 6), &["t2m", "orog"]));

    h.add_file(&source, &dims(0), "", vec![t2m(0), orog(0)]);
    h.add_file(&source, &dims(6), "", vec![t2m(6)]);

    let first = source.open_sample_dataset(&dims(0), true, None).unwrap();
    assert!(first.contains("orog"));

    // Orography is absent from the fhr=6 file but cached from fhr=0.
    let later = source.open_sample_dataset(&dims(6), true, None).unwrap();
    assert_eq!(later.data_var_names(), vec!["orog", "t2m"]);
    assert_eq!(
        later.data_var("orog").unwrap().values().as_f32().unwrap()[[0, 0, 0]],
        1500.0
    );
}

#[test]
fn test_static_cache_dropped_for_new_t0() {
    let h = Harness::new();
    let mut config = h.config("gfs_forecast", HourRange::new(0, 12, 6), &["t2m", "orog"]);
    config.t0 = T0Range::new(reference_time(), hours_after_t0(24), 24);
    let source = h.source(config);

    let next_day = DimensionKey::new(hours_after_t0(24), 6);
    h.add_file(&source, &dims(0), "", vec![t2m(0), orog(0)]);
    h.add_file(
        &source,
        &next_day,
        "",
        vec![FieldBuilder::named("2t", "t2m", "heightAboveGround", 2.0)
            .reference_time(hours_after_t0(24))
            .step(6)
            .build()],
    );

    assert!(source.open_sample_dataset(&dims(0), true, None).unwrap().contains("orog"));
    assert!(source.open_sample_dataset(&next_day, true, None).unwrap().is_empty());
}

// ============================================================================
// Levels
// ============================================================================

#[test]
fn test_no_matching_levels_is_absent() {
    let h = Harness::new();
    let mut config = h.config("gfs_forecast", HourRange::new(0, 12, 6), &["t"]);
    config.levels = Some(vec![500.0, 850.0]);
    let source = h.source(config);

    let key = dims(6);
    h.add_file(&source, &key, "", vec![isobaric("t", 1000.0, 6, 280.0)]);
    let path = source.source_path(&key, "");

    let extracted = source.extract(&key, "t", Path::new(&path)).unwrap();
    assert_eq!(extracted, Extracted::Absent(AbsentReason::NoMatchingLevels));
    assert!(source.open_sample_dataset(&key, false, None).unwrap().is_empty());
}

#[test]
fn test_nearest_levels_tolerate_encoding_error() {
    let h = Harness::new();
    let key = dims(6);

    let mut config = h.config("gfs_forecast", HourRange::new(0, 12, 6), &["t"]);
    config.levels = Some(vec![500.0]);
    let exact = h.source(config.clone());
    h.add_file(&exact, &key, "", vec![isobaric("t", 500.0004, 6, 250.0)]);
    let path = exact.source_path(&key, "");

    assert_eq!(
        exact.extract(&key, "t", Path::new(&path)).unwrap(),
        Extracted::Absent(AbsentReason::NoMatchingLevels)
    );

    config.use_nearest_levels = true;
    let nearest = h.source(config);
    let da = nearest
        .extract(&key, "t", Path::new(&path))
        .unwrap()
        .present()
        .unwrap();
    assert_eq!(da.dims(), &["t0", "fhr", "level", "latitude", "longitude"]);
}

#[test]
fn test_levels_must_be_published() {
    let h = Harness::new();
    let mut config = h.config("gfs_forecast", HourRange::new(0, 12, 6), &["t"]);
    config.levels = Some(vec![500.0, 512.0]);

    let registry = ingestion::VariableRegistry::embedded(ingestion::SourceFamily::Gfs).unwrap();
    let err = ingestion::GribForecastSource::from_parts(
        config,
        registry,
        std::sync::Arc::new(common::NoFetch),
        h.decoder.clone(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, IngestionError::InvalidConfig(_)));
}

// ============================================================================
// Ensemble members
// ============================================================================

#[test]
fn test_member_axis_between_fhr_and_level() {
    let h = Harness::new();
    let mut config = h.config("gefs_forecast", HourRange::new(0, 12, 6), &["t2m", "t"]);
    config.member = Some(MemberRange::new(0, 2, 1));
    config.levels = Some(vec![500.0]);
    let source = h.source(config);

    let key = dims(6).with_member(1);
    h.add_file(
        &source,
        &key,
        "a",
        vec![
            FieldBuilder::named("2t", "t2m", "heightAboveGround", 2.0)
                .step(6)
                .member(1)
                .build(),
            FieldBuilder::new("t", "isobaricInhPa", 500.0)
                .step(6)
                .member(1)
                .build(),
        ],
    );

    let ds = source.open_sample_dataset(&key, false, None).unwrap();
    assert_eq!(
        ds.data_var("t").unwrap().dims(),
        &["t0", "fhr", "member", "level", "latitude", "longitude"]
    );
    assert_eq!(
        ds.data_var("t2m").unwrap().dims(),
        &["t0", "fhr", "member", "latitude", "longitude"]
    );
    assert_eq!(ds.index_labels("member").unwrap(), vec![Label::Int(1)]);
    assert_eq!(
        ds.coord("member").unwrap().attr_str("long_name"),
        Some("ensemble member ID")
    );
    assert!(source.source_path(&key, "a").contains("m01"));
}

#[test]
fn test_sample_keys_cover_members() {
    let h = Harness::new();
    let mut config = h.config("gefs_forecast", HourRange::new(0, 12, 6), &["t2m"]);
    config.member = Some(MemberRange::new(0, 1, 1));
    let source = h.source(config);

    let keys = source.sample_keys();
    assert_eq!(keys.len(), 6);
    assert_eq!(keys[0], dims(0).with_member(0));
    assert_eq!(keys[3], dims(0).with_member(1));
    assert!(source.is_first_sample(&keys[0]));
    assert!(!source.is_first_sample(&keys[3]));
}

#[test]
fn test_members_rejected_for_deterministic_source() {
    let h = Harness::new();
    let mut config = h.config("gfs_forecast", HourRange::new(0, 12, 6), &["t2m"]);
    config.member = Some(MemberRange::new(0, 2, 1));

    let registry = ingestion::VariableRegistry::embedded(ingestion::SourceFamily::Gfs).unwrap();
    let result = ingestion::GribForecastSource::from_parts(
        config,
        registry,
        std::sync::Arc::new(common::NoFetch),
        h.decoder.clone(),
    );
    assert!(matches!(result, Err(IngestionError::InvalidConfig(_))));
}

// ============================================================================
// Accumulations and naming
// ============================================================================

#[test]
fn test_accumulation_window_selects_step_range() {
    let h = Harness::new();
    let mut config = h.config("gfs_forecast", HourRange::new(0, 12, 6), &["tp"]);
    config.accum_hrs = Some(BTreeMap::from([("tp".to_string(), 6)]));
    let source = h.source(config);

    let key = dims(12);
    let precip = |start, fill| {
        FieldBuilder::new("tp", "surface", 0.0)
            .long_name("Total Precipitation")
            .accum(start, 12)
            .fill(fill)
            .build()
    };
    h.add_file(&source, &key, "", vec![precip(0, 10.0), precip(6, 4.0)]);

    let ds = source.open_sample_dataset(&key, false, None).unwrap();
    let tp = ds.data_var("tp").unwrap();
    assert!(tp.values().as_f32().unwrap().iter().all(|v| *v == 4.0));
    assert_eq!(
        tp.attrs().get("accumulation_hours"),
        Some(&AttrValue::Int(6))
    );
    assert_eq!(
        tp.attr_str("long_name"),
        Some("Total Precipitation accumulated during previous 6 hours of the forecast")
    );
}

#[test]
fn test_overlapping_accumulations_without_window_are_absent() {
    let h = Harness::new();
    let source = h.source(h.config("gfs_forecast", HourRange::new(0, 12, 6), &["tp"]));

    let key = dims(12);
    h.add_file(
        &source,
        &key,
        "",
        vec![
            FieldBuilder::new("tp", "surface", 0.0).accum(0, 12).build(),
            FieldBuilder::new("tp", "surface", 0.0).accum(6, 12).build(),
        ],
    );
    let path = source.source_path(&key, "");
    assert_eq!(
        source.extract(&key, "tp", Path::new(&path)).unwrap(),
        Extracted::Absent(AbsentReason::Decode)
    );
}

#[test]
fn test_accumulation_longer_than_step_rejected() {
    let h = Harness::new();
    let mut config = h.config("gfs_forecast", HourRange::new(0, 12, 6), &["tp"]);
    config.accum_hrs = Some(BTreeMap::from([("tp".to_string(), 12)]));

    let registry = ingestion::VariableRegistry::embedded(ingestion::SourceFamily::Gfs).unwrap();
    let result = ingestion::GribForecastSource::from_parts(
        config,
        registry,
        std::sync::Arc::new(common::NoFetch),
        h.decoder.clone(),
    );
    assert!(matches!(
        result,
        Err(IngestionError::AccumulationTooLong { hours: 12, limit: 6, .. })
    ));
}

#[test]
fn test_long_names_follow_level_type() {
    let h = Harness::new();
    let source = h.source(h.config(
        "gfs_forecast",
        HourRange::new(0, 12, 6),
        &["u80", "t_surface", "lcc", "sdswrf"],
    ));

    let key = dims(6);
    h.add_file(
        &source,
        &key,
        "",
        vec![
            FieldBuilder::new("u", "heightAboveGround", 80.0)
                .long_name("U component of wind")
                .step(6)
                .build(),
            FieldBuilder::new("t", "surface", 0.0)
                .long_name("Temperature")
                .step(6)
                .build(),
            FieldBuilder::new("tcc", "lowCloudLayer", 0.0)
                .long_name("Total Cloud Cover")
                .avg(0, 6)
                .build(),
            FieldBuilder::new("sdswrf", "surface", 0.0)
                .long_name("Surface downward short-wave radiation flux")
                .avg(0, 6)
                .build(),
        ],
    );

    let ds = source.open_sample_dataset(&key, false, None).unwrap();
    let long_name = |name: &str| ds.data_var(name).unwrap().attr_str("long_name").map(str::to_string);

    assert_eq!(long_name("u80").as_deref(), Some("80 metre U component of wind"));
    assert_eq!(long_name("t_surface").as_deref(), Some("Temperature at surface"));
    assert_eq!(long_name("lcc").as_deref(), Some("Low Cloud Cover"));
    assert_eq!(
        long_name("sdswrf").as_deref(),
        Some("Time-mean Surface downward short-wave radiation flux")
    );
    assert_eq!(
        ds.data_var("u80").unwrap().attr_str("original_name"),
        Some("u")
    );
}

// ============================================================================
// Slices
// ============================================================================

#[test]
fn test_slices_applied_to_sample() {
    let h = Harness::new();
    let mut config = h.config("gfs_forecast", HourRange::new(0, 12, 6), &["t2m"]);
    config.slices.sel.insert("latitude".into(), (48.0, 49.0));
    config.slices.isel.insert("longitude".into(), (1, 3));
    config.slices.isel.insert("level".into(), (0, 1));
    let source = h.source(config);

    let key = dims(6);
    h.add_file(
        &source,
        &key,
        "",
        vec![FieldBuilder::named("2t", "t2m", "heightAboveGround", 2.0)
            .step(6)
            .grid(4, 3)
            .build()],
    );

    let ds = source.open_sample_dataset(&key, false, None).unwrap();
    assert_eq!(
        ds.index_labels("latitude").unwrap(),
        vec![Label::Float(49.0), Label::Float(48.0)]
    );
    assert_eq!(
        ds.index_labels("longitude").unwrap(),
        vec![Label::Float(251.0), Label::Float(252.0)]
    );
    assert_eq!(ds.data_var("t2m").unwrap().shape(), &[1, 1, 2, 2]);
}

// ============================================================================
// Cache entries
// ============================================================================

#[test]
fn test_cached_files_lists_only_present_entries() {
    let h = Harness::new();
    let source = h.source(h.config("gfs_forecast", HourRange::new(0, 12, 6), &["t2m"]));
    let cache = tempfile::tempdir().unwrap();
    let key = dims(6);

    assert!(source.cached_files(&key, cache.path()).is_empty());

    let entry = cache
        .path()
        .join(storage::cache_entry_path(&source.source_path(&key, "b")).unwrap());
    test_utils::touch(&entry).unwrap();

    let files = source.cached_files(&key, cache.path());
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path(), entry.as_path());
    assert!(files[0].is_cached());

    for file in files {
        file.remove().unwrap();
    }
    assert!(!entry.exists());
    assert!(source.cached_files(&key, cache.path()).is_empty());
}
