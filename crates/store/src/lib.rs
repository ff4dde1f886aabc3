//! Persistence of heterogeneous named values in a single container file.
//!
//! # Invariants
//! - Every saved name lives in exactly one of the `raw` and `binary` groups.
//! - Values are classified before writing; nothing relies on a failed write.
//! - A corrupt binary entry never fails a whole load.

pub mod codec;
pub mod config;
pub mod error;
pub mod progress;
pub mod store;
pub mod value;

pub use config::StoreConfig;
pub use error::{CodecError, EntryError, StoreError};
pub use progress::{Outcome, Phase, Progress, ProgressEvent, TracingProgress};
pub use store::{BINARY_GROUP, RAW_GROUP, SIGNATURE_NAME, SIGNATURE_VALUE, SaveReport, Selector, Store};
pub use value::{Mapping, StorageClass, Value};

pub use hybridx_container::{Array, ArrayData, DType, Dataset, Scalar};

use std::collections::BTreeSet;
use std::path::Path;

/// [`Store::save`] with the default configuration.
pub fn save(mapping: &Mapping, path: impl AsRef<Path>) -> Result<SaveReport, StoreError> {
    Store::new().save(mapping, path)
}

/// [`Store::load`] with the default configuration.
pub fn load(path: impl AsRef<Path>, selector: Option<&Selector>) -> Result<Mapping, StoreError> {
    Store::new().load(path, selector)
}

/// [`Store::list_keys`] with the default configuration.
pub fn list_keys(path: impl AsRef<Path>) -> Result<BTreeSet<String>, StoreError> {
    Store::new().list_keys(path)
}
