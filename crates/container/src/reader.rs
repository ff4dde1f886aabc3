use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::dataset::{Dataset, DatasetKind};
use crate::error::ContainerError;
use crate::format::{
    FOOTER_LEN, FORMAT_VERSION, HEADER_LEN, INDEX_MAGIC, Index, Location, MAGIC, decode_block, sha256_hex,
};

/// Read-only handle on a finished container file.
///
/// Only the index is loaded on open; dataset blocks are read on demand.
pub struct ContainerReader {
    path: PathBuf,
    file: File,
    index: Index,
    /// End of the dataset blocks, where the index starts.
    data_end: u64,
}

impl ContainerReader {
    /// Open `path` read-only and load its index.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ContainerError> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let file_len = file.metadata()?.len();

        let mut header = [0u8; HEADER_LEN as usize];
        if let Err(e) = file.read_exact(&mut header) {
            return Err(match e.kind() {
                ErrorKind::UnexpectedEof => ContainerError::BadMagic,
                _ => e.into(),
            });
        }
        if &header[..8] != MAGIC {
            return Err(ContainerError::BadMagic);
        }
        let version = u32::from_le_bytes([header[8], header[9], header[10], header[11]]);
        if version != FORMAT_VERSION {
            return Err(ContainerError::UnsupportedVersion {
                file_version: version,
                expected_version: FORMAT_VERSION,
            });
        }

        if file_len < HEADER_LEN + FOOTER_LEN {
            return Err(ContainerError::Truncated);
        }
        let mut footer = [0u8; FOOTER_LEN as usize];
        file.seek(SeekFrom::End(-(FOOTER_LEN as i64)))?;
        file.read_exact(&mut footer)?;
        if &footer[16..] != INDEX_MAGIC {
            return Err(ContainerError::Truncated);
        }
        let index_offset = read_u64(&footer[..8]);
        let index_len = read_u64(&footer[8..16]);
        let index_end = index_offset.checked_add(index_len);
        if index_offset < HEADER_LEN || index_end != Some(file_len - FOOTER_LEN) {
            return Err(ContainerError::Truncated);
        }

        let mut index_bytes = vec![0u8; index_len as usize];
        file.seek(SeekFrom::Start(index_offset))?;
        file.read_exact(&mut index_bytes)?;
        let mut index: Index = decode_block(&index_bytes)?;
        index.reindex();
        debug!(
            path = %path.display(),
            groups = index.groups.len(),
            entries = index.entries().len(),
            "opened container"
        );

        Ok(Self {
            path,
            file,
            index,
            data_end: index_offset,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of all top-level groups, in creation order.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.index.groups.iter().map(String::as_str)
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.index.has_group(name)
    }

    /// Names of the datasets under `location`, in write order.
    pub fn entry_names(&self, location: Location<'_>) -> Result<Vec<&str>, ContainerError> {
        if let Location::Group(group) = location {
            if !self.index.has_group(group) {
                return Err(ContainerError::GroupNotFound(group.to_owned()));
            }
        }
        Ok(self
            .index
            .entries_in(location)
            .into_iter()
            .map(|e| e.name.as_str())
            .collect())
    }

    pub fn contains(&self, location: Location<'_>, name: &str) -> bool {
        self.index.find(location, name).is_some()
    }

    /// Kind of the dataset at `name`, without reading it.
    pub fn kind(&self, location: Location<'_>, name: &str) -> Option<DatasetKind> {
        self.index.find(location, name).map(|e| e.kind)
    }

    /// Read and verify one dataset.
    ///
    /// Index entries pointing outside the data region are rejected before
    /// anything is allocated.
    pub fn read(&self, location: Location<'_>, name: &str) -> Result<Dataset, ContainerError> {
        let path = location.join(name);
        let entry = self
            .index
            .find(location, name)
            .ok_or_else(|| ContainerError::EntryNotFound(path.clone()))?;

        let end = entry.offset.checked_add(entry.len);
        if entry.offset < HEADER_LEN || end.is_none_or(|end| end > self.data_end) {
            return Err(ContainerError::EntryOutOfBounds {
                path,
                offset: entry.offset,
                len: entry.len,
            });
        }

        let mut block = vec![0u8; entry.len as usize];
        let mut file = &self.file;
        file.seek(SeekFrom::Start(entry.offset))?;
        file.read_exact(&mut block)?;

        let actual = sha256_hex(&block);
        if actual != entry.sha256 {
            return Err(ContainerError::IntegrityMismatch {
                path,
                expected: entry.sha256.clone(),
                actual,
            });
        }

        let dataset: Dataset = decode_block(&block)?;
        if let Err(e) = dataset.validate() {
            return Err(ContainerError::InvalidDataset {
                path,
                reason: e.to_string(),
            });
        }
        Ok(dataset)
    }
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Array, Scalar};
    use crate::format::{IndexEntry, encode_block};
    use crate::writer::{ContainerWriter, WriterOptions};

    /// Re-emit a finished container after editing its blocks and index.
    fn rewrite(path: &Path, edit: impl FnOnce(&mut Vec<u8>, &mut Index)) {
        let data = std::fs::read(path).unwrap();
        let footer = &data[data.len() - FOOTER_LEN as usize..];
        let index_offset = read_u64(&footer[..8]) as usize;
        let index_len = read_u64(&footer[8..16]) as usize;
        let mut index: Index = decode_block(&data[index_offset..index_offset + index_len]).unwrap();
        index.reindex();

        let mut body = data[..index_offset].to_vec();
        edit(&mut body, &mut index);

        let index_bytes = encode_block(&index, 3).unwrap();
        let new_offset = body.len() as u64;
        body.extend_from_slice(&index_bytes);
        body.extend_from_slice(&new_offset.to_le_bytes());
        body.extend_from_slice(&(index_bytes.len() as u64).to_le_bytes());
        body.extend_from_slice(INDEX_MAGIC);
        std::fs::write(path, body).unwrap();
    }

    fn entry_named<'a>(index: &'a mut Index, name: &str) -> &'a mut IndexEntry {
        index
            .entries_mut()
            .iter_mut()
            .find(|e| e.name == name)
            .unwrap()
    }

    fn write_sample(path: &Path) {
        let mut writer = ContainerWriter::create(path, WriterOptions::default()).unwrap();
        writer
            .write_dataset(Location::Root, "sig", &Dataset::from("hello"))
            .unwrap();
        writer.create_group("raw").unwrap();
        writer.create_group("binary").unwrap();
        writer
            .write_dataset(
                Location::Group("raw"),
                "m",
                &Dataset::from(Array::from_shape_vec(vec![2, 2], vec![1.0f64, 2.0, 3.0, 4.0]).unwrap()),
            )
            .unwrap();
        writer
            .write_dataset(Location::Group("raw"), "n", &Dataset::from(42i64))
            .unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn write_then_read_back() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("c.hx");
        write_sample(&path);

        let reader = ContainerReader::open(&path).unwrap();
        assert_eq!(reader.group_names().collect::<Vec<_>>(), vec!["raw", "binary"]);
        assert_eq!(reader.entry_names(Location::Group("raw")).unwrap(), vec!["m", "n"]);
        assert!(reader.entry_names(Location::Group("binary")).unwrap().is_empty());
        assert_eq!(reader.kind(Location::Group("raw"), "m"), Some(DatasetKind::Array));

        let m = reader.read(Location::Group("raw"), "m").unwrap();
        let array = m.as_array().unwrap();
        assert_eq!(array.shape(), &[2, 2]);
        assert_eq!(array.as_slice::<f64>().unwrap(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            reader.read(Location::Group("raw"), "n").unwrap().as_scalar(),
            Some(Scalar::Int(42))
        );
        assert_eq!(
            reader.read(Location::Root, "sig").unwrap().as_text(),
            Some("hello")
        );
    }

    #[test]
    fn missing_group_and_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("c.hx");
        write_sample(&path);

        let reader = ContainerReader::open(&path).unwrap();
        assert!(matches!(
            reader.entry_names(Location::Group("nope")),
            Err(ContainerError::GroupNotFound(_))
        ));
        assert!(matches!(
            reader.read(Location::Group("raw"), "zzz"),
            Err(ContainerError::EntryNotFound(p)) if p == "/raw/zzz"
        ));
    }

    #[test]
    fn open_missing_file_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let result = ContainerReader::open(tmp.path().join("absent.hx"));
        assert!(matches!(result, Err(e) if e.is_io()));
    }

    #[test]
    fn open_rejects_foreign_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("foreign.hx");
        std::fs::write(&path, b"just some text, not a container").unwrap();
        assert!(matches!(ContainerReader::open(&path), Err(ContainerError::BadMagic)));

        std::fs::write(&path, b"tiny").unwrap();
        assert!(matches!(ContainerReader::open(&path), Err(ContainerError::BadMagic)));
    }

    #[test]
    fn unfinished_writer_leaves_truncated_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("c.hx");
        {
            let mut writer = ContainerWriter::create(&path, WriterOptions::default()).unwrap();
            writer.create_group("raw").unwrap();
            writer
                .write_dataset(Location::Group("raw"), "a", &Dataset::from(1i64))
                .unwrap();
        }
        assert!(matches!(ContainerReader::open(&path), Err(ContainerError::Truncated)));
    }

    #[test]
    fn version_mismatch_fail_closed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("c.hx");
        write_sample(&path);

        let mut data = std::fs::read(&path).unwrap();
        data[8..12].copy_from_slice(&999u32.to_le_bytes());
        std::fs::write(&path, &data).unwrap();

        match ContainerReader::open(&path) {
            Err(ContainerError::UnsupportedVersion {
                file_version,
                expected_version,
            }) => {
                assert_eq!(file_version, 999);
                assert_eq!(expected_version, FORMAT_VERSION);
            }
            Err(e) => panic!("expected UnsupportedVersion, got: {e}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn corrupted_block_detected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("c.hx");
        write_sample(&path);

        // The first block right after the header is the root signature.
        let mut data = std::fs::read(&path).unwrap();
        data[HEADER_LEN as usize + 2] ^= 0xff;
        std::fs::write(&path, &data).unwrap();

        let reader = ContainerReader::open(&path).unwrap();
        assert!(matches!(
            reader.read(Location::Root, "sig"),
            Err(ContainerError::IntegrityMismatch { path, .. }) if path == "/sig"
        ));
        // Other blocks are unaffected.
        assert!(reader.read(Location::Group("raw"), "n").is_ok());
    }

    #[test]
    fn create_overwrites_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("c.hx");
        write_sample(&path);

        let mut writer = ContainerWriter::create(&path, WriterOptions::default()).unwrap();
        writer.create_group("other").unwrap();
        writer.finish().unwrap();

        let reader = ContainerReader::open(&path).unwrap();
        assert_eq!(reader.group_names().collect::<Vec<_>>(), vec!["other"]);
        assert!(!reader.contains(Location::Root, "sig"));
    }

    #[test]
    fn oversized_entry_rejected_without_allocating() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("c.hx");
        write_sample(&path);
        rewrite(&path, |_, index| entry_named(index, "n").len = 1 << 62);

        let reader = ContainerReader::open(&path).unwrap();
        assert!(matches!(
            reader.read(Location::Group("raw"), "n"),
            Err(ContainerError::EntryOutOfBounds { path, len, .. }) if path == "/raw/n" && len == 1 << 62
        ));
        assert!(reader.read(Location::Group("raw"), "m").is_ok());
    }

    #[test]
    fn entry_overlapping_header_or_index_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("c.hx");
        write_sample(&path);
        rewrite(&path, |body, index| {
            entry_named(index, "sig").offset = 0;
            let data_end = body.len() as u64;
            let m = entry_named(index, "m");
            m.offset = data_end - 1;
            m.len = 2;
        });

        let reader = ContainerReader::open(&path).unwrap();
        for (location, name) in [(Location::Root, "sig"), (Location::Group("raw"), "m")] {
            assert!(matches!(
                reader.read(location, name),
                Err(ContainerError::EntryOutOfBounds { .. })
            ));
        }
        assert!(reader.read(Location::Group("raw"), "n").is_ok());
    }

    #[test]
    fn stored_invalid_dataset_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("c.hx");
        write_sample(&path);
        rewrite(&path, |body, index| {
            let block = encode_block(&Dataset::Text("a\0b".into()), 3).unwrap();
            index.push(IndexEntry {
                group: Some("raw".into()),
                name: "nul".into(),
                offset: body.len() as u64,
                len: block.len() as u64,
                sha256: sha256_hex(&block),
                kind: DatasetKind::Text,
            });
            body.extend_from_slice(&block);
        });

        let reader = ContainerReader::open(&path).unwrap();
        assert!(matches!(
            reader.read(Location::Group("raw"), "nul"),
            Err(ContainerError::InvalidDataset { path, .. }) if path == "/raw/nul"
        ));
    }
}
