//! Forecast file resolution.
//!
//! Turns a sample's dimension key and file suffix into a local file:
//! - [`PathBuilder`]: dims + suffix → source path (`s3://`, `http(s)://` or local)
//! - [`FileFetcher`]: materializes a source path at a local destination
//! - [`LocalFileResolver`]: ties both to a cache directory and degrades to
//!   "absent" instead of failing

pub mod error;
pub mod fetch;
pub mod path;
pub mod resolver;

pub use error::{Result, StorageError};
pub use fetch::{decompress_gzip, FileFetcher, ObjectStoreFetcher};
pub use path::{Location, PathBuilder};
pub use resolver::{cache_entry_path, CachedFile, LocalFileResolver};
