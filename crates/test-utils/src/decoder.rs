//! A [`GribDecoder`] over fields held in memory.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use dataset::Dataset;
use grib2_parser::{select_to_dataset, FilterByKeys, Grib2Error, Grib2Result, GribDecoder, GribField};

/// Decodes registered paths from their fields, as if each path were a
/// GRIB2 file holding exactly those messages. Unregistered paths fail like
/// a missing file.
#[derive(Debug, Default)]
pub struct InMemoryDecoder {
    files: Mutex<BTreeMap<PathBuf, Vec<GribField>>>,
    opens: AtomicUsize,
}

impl InMemoryDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, Vec<GribField>>> {
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register `fields` as the content of `path`, appending to earlier ones.
    pub fn add_file(&self, path: impl Into<PathBuf>, fields: Vec<GribField>) {
        self.lock().entry(path.into()).or_default().extend(fields);
    }

    pub fn with_file(self, path: impl Into<PathBuf>, fields: Vec<GribField>) -> Self {
        self.add_file(path, fields);
        self
    }

    /// Number of `open` calls so far.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl GribDecoder for InMemoryDecoder {
    fn open(&self, path: &Path, filter: &FilterByKeys) -> Grib2Result<Dataset> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let files = self.lock();
        let fields = files.get(path).ok_or_else(|| {
            Grib2Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not registered", path.display()),
            ))
        })?;
        select_to_dataset(fields, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::FieldBuilder;

    #[test]
    fn test_open_filters_registered_fields() {
        let decoder = InMemoryDecoder::new().with_file(
            "/data/a.grib2",
            vec![
                FieldBuilder::new("t", "isobaricInhPa", 500.0).build(),
                FieldBuilder::new("sp", "surface", 0.0).build(),
            ],
        );
        let filter = FilterByKeys::new().with("typeOfLevel", "surface");
        let ds = decoder.open(Path::new("/data/a.grib2"), &filter).unwrap();
        assert_eq!(ds.data_var_names(), vec!["sp"]);
        assert_eq!(decoder.open_count(), 1);
    }

    #[test]
    fn test_unregistered_path_is_io_error() {
        let decoder = InMemoryDecoder::new();
        assert!(matches!(
            decoder.open_all(Path::new("/data/missing.grib2")),
            Err(Grib2Error::Io(_))
        ));
    }
}
