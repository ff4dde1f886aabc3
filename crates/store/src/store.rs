//! File-backed persistence of a [`Mapping`].
//!
//! Layout inside the container:
//! ```text
//! __hybridx__   - signature marker ("hybridx")
//! raw/<name>    - values stored as native datasets
//! binary/<name> - everything else, as base64 CBOR text
//! ```

use hybridx_container::{ContainerReader, ContainerWriter, Dataset, Location, validate_name};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::codec;
use crate::config::StoreConfig;
use crate::error::{CodecError, EntryError, StoreError};
use crate::progress::{Outcome, Phase, Progress, ProgressEvent, TracingProgress};
use crate::value::{Mapping, StorageClass, Value};

/// Root dataset identifying files written by this crate.
pub const SIGNATURE_NAME: &str = "__hybridx__";
pub const SIGNATURE_VALUE: &str = "hybridx";

pub const RAW_GROUP: &str = "raw";
pub const BINARY_GROUP: &str = "binary";

const RAW: Location<'static> = Location::Group(RAW_GROUP);
const BINARY: Location<'static> = Location::Group(BINARY_GROUP);

/// Names a load is restricted to.
///
/// An empty selector restricts nothing: loading with it is the same as
/// loading without one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector(BTreeSet<String>);

impl Selector {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Selector {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

fn selects(selector: Option<&Selector>, name: &str) -> bool {
    match selector {
        Some(selector) if !selector.is_empty() => selector.contains(name),
        _ => true,
    }
}

/// Names written by [`Store::save`], by group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub raw: Vec<String>,
    pub binary: Vec<String>,
}

impl SaveReport {
    pub fn len(&self) -> usize {
        self.raw.len() + self.binary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Saves mappings to container files and loads them back.
pub struct Store {
    config: StoreConfig,
    progress: Box<dyn Progress>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Store {
    /// Create a store with the default configuration.
    pub fn new() -> Self {
        Self::from_config(StoreConfig::default())
    }

    pub fn from_config(config: StoreConfig) -> Self {
        Self {
            config,
            progress: Box::new(TracingProgress),
        }
    }

    /// Turn per-key progress reporting on or off.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    /// Replace the default `tracing` progress sink.
    pub fn with_progress(mut self, progress: impl Progress + 'static) -> Self {
        self.progress = Box::new(progress);
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Write `mapping` to a fresh container at `path`.
    ///
    /// Natively storable values go to the raw group, the rest are encoded into
    /// the binary group. Any error aborts the save and may leave a partial
    /// file behind. A value that fails to encode, or whose write fails, is
    /// reported as [`StoreError::Entry`] naming its key.
    pub fn save(&self, mapping: &Mapping, path: impl AsRef<Path>) -> Result<SaveReport, StoreError> {
        let path = path.as_ref();
        for key in mapping.keys() {
            validate_name(key).map_err(|_| StoreError::InvalidKey(key.clone()))?;
        }

        let mut writer = ContainerWriter::create(path, self.config.writer_options()).map_err(|source| {
            StoreError::Create {
                path: path.to_path_buf(),
                source,
            }
        })?;
        writer.write_dataset(Location::Root, SIGNATURE_NAME, &Dataset::from(SIGNATURE_VALUE))?;

        let mut report = SaveReport::default();
        let mut deferred = Vec::new();

        writer.create_group(RAW_GROUP)?;
        for (key, value) in mapping {
            match (value.classify(), value) {
                (StorageClass::Raw, Value::Native(dataset)) => {
                    if let Err(e) = writer.write_dataset(RAW, key, dataset) {
                        self.report(Phase::SaveRaw, key, Outcome::Failed(e.to_string()));
                        return Err(StoreError::Entry {
                            key: key.clone(),
                            source: e.into(),
                        });
                    }
                    self.report(Phase::SaveRaw, key, Outcome::Stored);
                    report.raw.push(key.clone());
                }
                _ => {
                    self.report(Phase::SaveRaw, key, Outcome::Rerouted);
                    deferred.push((key, value));
                }
            }
        }

        writer.create_group(BINARY_GROUP)?;
        for (key, value) in deferred {
            let stored = codec::encode(value)
                .map_err(EntryError::from)
                .and_then(|blob| {
                    writer
                        .write_dataset(BINARY, key, &Dataset::Text(blob))
                        .map_err(EntryError::from)
                });
            if let Err(source) = stored {
                self.report(Phase::SaveBinary, key, Outcome::Failed(source.to_string()));
                return Err(StoreError::Entry {
                    key: key.clone(),
                    source,
                });
            }
            self.report(Phase::SaveBinary, key, Outcome::Stored);
            report.binary.push(key.clone());
        }

        writer.finish()?;
        info!(
            path = %path.display(),
            raw = report.raw.len(),
            binary = report.binary.len(),
            "saved mapping"
        );
        Ok(report)
    }

    /// Load the mapping stored at `path`, restricted to `selector` if given.
    ///
    /// Binary entries that fail to read or decode are left out of the result.
    /// A name present in both groups keeps its raw value.
    pub fn load(&self, path: impl AsRef<Path>, selector: Option<&Selector>) -> Result<Mapping, StoreError> {
        let reader = self.open(path.as_ref())?;
        if signature_matches(&reader) {
            info!(path = %reader.path().display(), "signed by hybridx");
        }

        let mut out = Mapping::new();
        for key in reader.entry_names(RAW)? {
            if !selects(selector, key) {
                continue;
            }
            let dataset = reader.read(RAW, key).map_err(|e| {
                self.report(Phase::LoadRaw, key, Outcome::Failed(e.to_string()));
                StoreError::Entry {
                    key: key.to_owned(),
                    source: e.into(),
                }
            })?;
            self.report(Phase::LoadRaw, key, Outcome::Loaded);
            out.insert(key.to_owned(), Value::Native(dataset));
        }

        for key in reader.entry_names(BINARY)? {
            if !selects(selector, key) {
                continue;
            }
            if out.contains_key(key) {
                warn!(key, "name present in both raw and binary groups, keeping raw");
                self.report(
                    Phase::LoadBinary,
                    key,
                    Outcome::Skipped("duplicate of raw entry".into()),
                );
                continue;
            }
            match read_binary(&reader, key) {
                Ok(value) => {
                    self.report(Phase::LoadBinary, key, Outcome::Loaded);
                    out.insert(key.to_owned(), value);
                }
                Err(e) => {
                    debug!(key, error = %e, "skipping undecodable binary entry");
                    self.report(Phase::LoadBinary, key, Outcome::Skipped(e.to_string()));
                }
            }
        }
        Ok(out)
    }

    /// All names stored at `path`, without reading any values.
    pub fn list_keys(&self, path: impl AsRef<Path>) -> Result<BTreeSet<String>, StoreError> {
        Ok(self
            .list_entries(path)?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    /// Names stored at `path` with the group holding each, raw first.
    pub fn list_entries(&self, path: impl AsRef<Path>) -> Result<Vec<(String, StorageClass)>, StoreError> {
        let reader = self.open(path.as_ref())?;
        let mut entries = Vec::new();
        for (location, class) in [(RAW, StorageClass::Raw), (BINARY, StorageClass::Binary)] {
            for name in reader.entry_names(location)? {
                entries.push((name.to_owned(), class));
            }
        }
        Ok(entries)
    }

    /// Whether the container at `path` carries the signature marker.
    pub fn is_signed(&self, path: impl AsRef<Path>) -> Result<bool, StoreError> {
        Ok(signature_matches(&self.open(path.as_ref())?))
    }

    fn open(&self, path: &Path) -> Result<ContainerReader, StoreError> {
        ContainerReader::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })
    }

    fn report(&self, phase: Phase, key: &str, outcome: Outcome) {
        if self.config.verbose {
            self.progress.report(&ProgressEvent {
                phase,
                key,
                outcome,
            });
        }
    }
}

fn signature_matches(reader: &ContainerReader) -> bool {
    match reader.read(Location::Root, SIGNATURE_NAME) {
        Ok(dataset) => dataset.as_text() == Some(SIGNATURE_VALUE),
        Err(e) => {
            debug!(error = %e, "no signature marker");
            false
        }
    }
}

fn read_binary(reader: &ContainerReader, key: &str) -> Result<Value, EntryError> {
    let dataset = reader.read(BINARY, key)?;
    let blob = dataset.as_text().ok_or_else(|| {
        CodecError::Decode(format!("expected text blob, found {}", dataset.kind()))
    })?;
    Ok(codec::decode(blob)?)
}
