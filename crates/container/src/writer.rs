use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::dataset::{Dataset, validate_name};
use crate::error::ContainerError;
use crate::format::{
    FORMAT_VERSION, HEADER_LEN, INDEX_MAGIC, Index, IndexEntry, Location, MAGIC, encode_block, sha256_hex,
};

/// zstd level used when none is configured.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Options for [`ContainerWriter::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    pub compression_level: i32,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

/// Write handle on a fresh container file.
///
/// Datasets are appended as they are written; the index and footer only land
/// on disk in [`finish`](Self::finish). A writer dropped before that leaves a
/// file that [`ContainerReader::open`](crate::ContainerReader::open) reports
/// as truncated.
pub struct ContainerWriter {
    path: PathBuf,
    file: BufWriter<File>,
    offset: u64,
    index: Index,
    options: WriterOptions,
}

impl ContainerWriter {
    /// Create a container at `path`, replacing anything already there.
    pub fn create(path: impl AsRef<Path>, options: WriterOptions) -> Result<Self, ContainerError> {
        let path = path.as_ref().to_path_buf();
        let mut file = BufWriter::new(File::create(&path)?);
        file.write_all(MAGIC)?;
        file.write_all(&FORMAT_VERSION.to_le_bytes())?;
        debug!(path = %path.display(), "created container");

        Ok(Self {
            path,
            file,
            offset: HEADER_LEN,
            index: Index::default(),
            options,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an empty top-level group.
    pub fn create_group(&mut self, name: &str) -> Result<(), ContainerError> {
        validate_name(name)?;
        if self.index.has_group(name) {
            return Err(ContainerError::GroupExists(name.to_owned()));
        }
        self.index.groups.push(name.to_owned());
        Ok(())
    }

    /// Store `dataset` as `name` under `location`.
    ///
    /// Fails with [`ContainerError::Unsupported`] when the dataset cannot be
    /// represented natively; nothing is written in that case.
    pub fn write_dataset(
        &mut self,
        location: Location<'_>,
        name: &str,
        dataset: &Dataset,
    ) -> Result<(), ContainerError> {
        validate_name(name)?;
        let group = match location {
            Location::Root => None,
            Location::Group(group) => {
                if !self.index.has_group(group) {
                    return Err(ContainerError::GroupNotFound(group.to_owned()));
                }
                Some(group.to_owned())
            }
        };
        if self.index.find(location, name).is_some() {
            return Err(ContainerError::EntryExists(location.join(name)));
        }
        dataset.validate()?;

        let block = encode_block(dataset, self.options.compression_level)?;
        self.file.write_all(&block)?;

        let len = block.len() as u64;
        debug!(path = %location.join(name), kind = %dataset.kind(), len, "wrote dataset");
        self.index.push(IndexEntry {
            group,
            name: name.to_owned(),
            offset: self.offset,
            len,
            sha256: sha256_hex(&block),
            kind: dataset.kind(),
        });
        self.offset += len;
        Ok(())
    }

    /// Write the index and footer, then flush and sync the file.
    pub fn finish(self) -> Result<(), ContainerError> {
        let Self {
            path,
            mut file,
            offset,
            index,
            options,
        } = self;

        let index_bytes = encode_block(&index, options.compression_level)?;
        file.write_all(&index_bytes)?;
        file.write_all(&offset.to_le_bytes())?;
        file.write_all(&(index_bytes.len() as u64).to_le_bytes())?;
        file.write_all(INDEX_MAGIC)?;

        let file = file.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        debug!(
            path = %path.display(),
            groups = index.groups.len(),
            entries = index.entries().len(),
            "finished container"
        );
        Ok(())
    }
}
