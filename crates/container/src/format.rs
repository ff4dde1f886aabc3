//! On-disk layout shared by the reader and writer.
//!
//! ```text
//! header : "HYBRIDX\0" | format version (u32 LE)
//! blocks : zstd-compressed CBOR, one per dataset, back to back
//! index  : zstd-compressed CBOR `Index`
//! footer : index offset (u64 LE) | index length (u64 LE) | "HXINDEX\0"
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};

use crate::dataset::DatasetKind;
use crate::error::ContainerError;

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

pub(crate) const MAGIC: &[u8; 8] = b"HYBRIDX\0";
pub(crate) const INDEX_MAGIC: &[u8; 8] = b"HXINDEX\0";
pub(crate) const HEADER_LEN: u64 = 12;
pub(crate) const FOOTER_LEN: u64 = 24;

/// Where a dataset lives: directly under the root, or inside a named group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location<'a> {
    Root,
    Group(&'a str),
}

impl Location<'_> {
    /// Slash-separated path of `name` under this location.
    pub fn join(&self, name: &str) -> String {
        match self {
            Location::Root => format!("/{name}"),
            Location::Group(group) => format!("/{group}/{name}"),
        }
    }

    fn group(&self) -> Option<&str> {
        match self {
            Location::Root => None,
            Location::Group(group) => Some(group),
        }
    }
}

impl fmt::Display for Location<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Root => f.write_str("/"),
            Location::Group(group) => write!(f, "/{group}"),
        }
    }
}

/// Table of contents written at the end of the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Index {
    pub groups: Vec<String>,
    entries: Vec<IndexEntry>,
    /// (group, name) -> position in `entries`. Rebuilt after decoding.
    #[serde(skip)]
    lookup: HashMap<(Option<String>, String), usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct IndexEntry {
    pub group: Option<String>,
    pub name: String,
    pub offset: u64,
    pub len: u64,
    pub sha256: String,
    pub kind: DatasetKind,
}

impl IndexEntry {
    fn at(&self, location: Location<'_>) -> bool {
        self.group.as_deref() == location.group()
    }
}

impl Index {
    /// Rebuild the name lookup of a freshly decoded index.
    ///
    /// The first entry wins when a (group, name) pair repeats.
    pub fn reindex(&mut self) {
        self.lookup.clear();
        for (pos, entry) in self.entries.iter().enumerate() {
            self.lookup
                .entry((entry.group.clone(), entry.name.clone()))
                .or_insert(pos);
        }
    }

    pub fn push(&mut self, entry: IndexEntry) {
        let pos = self.entries.len();
        self.lookup
            .entry((entry.group.clone(), entry.name.clone()))
            .or_insert(pos);
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    #[cfg(test)]
    pub fn entries_mut(&mut self) -> &mut [IndexEntry] {
        &mut self.entries
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.groups.iter().any(|g| g == name)
    }

    pub fn find(&self, location: Location<'_>, name: &str) -> Option<&IndexEntry> {
        let key = (location.group().map(str::to_owned), name.to_owned());
        self.lookup.get(&key).map(|&pos| &self.entries[pos])
    }

    pub fn entries_in(&self, location: Location<'_>) -> Vec<&IndexEntry> {
        self.entries.iter().filter(|e| e.at(location)).collect()
    }
}

/// Serialize to CBOR, then compress.
pub(crate) fn encode_block<T: Serialize + ?Sized>(
    value: &T,
    level: i32,
) -> Result<Vec<u8>, ContainerError> {
    let cbor_bytes = cbor_serialize(value)?;
    zstd_compress(&cbor_bytes, level)
}

/// Decompress, then deserialize from CBOR.
pub(crate) fn decode_block<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ContainerError> {
    let cbor_bytes = zstd_decompress(data)?;
    cbor_deserialize(&cbor_bytes)
}

fn cbor_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, ContainerError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| ContainerError::CborEncode(e.to_string()))?;
    Ok(buf)
}

fn cbor_deserialize<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ContainerError> {
    ciborium::from_reader(data).map_err(|e| ContainerError::CborDecode(e.to_string()))
}

fn zstd_compress(data: &[u8], level: i32) -> Result<Vec<u8>, ContainerError> {
    let mut encoder = zstd::Encoder::new(Vec::new(), level)?;
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn zstd_decompress(data: &[u8]) -> Result<Vec<u8>, ContainerError> {
    let mut decoder = zstd::Decoder::new(data)?;
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;
    Ok(buf)
}

pub(crate) fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_paths() {
        assert_eq!(Location::Root.join("sig"), "/sig");
        assert_eq!(Location::Group("raw").join("a"), "/raw/a");
        assert_eq!(Location::Group("raw").to_string(), "/raw");
    }

    #[test]
    fn index_lookup_respects_location() {
        let entry = |group: Option<&str>, name: &str| IndexEntry {
            group: group.map(str::to_owned),
            name: name.to_owned(),
            offset: 0,
            len: 0,
            sha256: String::new(),
            kind: DatasetKind::Text,
        };
        let mut index = Index::default();
        index.groups.push("raw".into());
        index.push(entry(None, "a"));
        index.push(entry(Some("raw"), "b"));
        assert!(index.find(Location::Root, "a").is_some());
        assert!(index.find(Location::Group("raw"), "a").is_none());
        assert!(index.find(Location::Group("raw"), "b").is_some());
        assert_eq!(index.entries_in(Location::Group("raw")).len(), 1);
    }

    #[test]
    fn lookup_rebuilt_after_decode() {
        let mut index = Index::default();
        index.groups.push("raw".into());
        for i in 0..100 {
            index.push(IndexEntry {
                group: Some("raw".into()),
                name: format!("k{i}"),
                offset: i,
                len: 1,
                sha256: String::new(),
                kind: DatasetKind::Scalar,
            });
        }

        let mut decoded: Index = decode_block(&encode_block(&index, 3).unwrap()).unwrap();
        assert!(decoded.find(Location::Group("raw"), "k42").is_none());
        decoded.reindex();
        assert_eq!(decoded.find(Location::Group("raw"), "k42").map(|e| e.offset), Some(42));
        assert_eq!(decoded.entries().len(), 100);
    }

    #[test]
    fn first_duplicate_wins() {
        let entry = |offset: u64| IndexEntry {
            group: None,
            name: "dup".into(),
            offset,
            len: 0,
            sha256: String::new(),
            kind: DatasetKind::Text,
        };
        let mut index = Index::default();
        index.push(entry(1));
        index.push(entry(2));
        assert_eq!(index.find(Location::Root, "dup").map(|e| e.offset), Some(1));
    }

    #[test]
    fn block_codec_is_reversible() {
        let block = encode_block(&vec![1u32, 2, 3], 3).unwrap();
        let back: Vec<u32> = decode_block(&block).unwrap();
        assert_eq!(back, vec![1, 2, 3]);
    }

    #[test]
    fn corrupt_block_fails_to_decode() {
        let result: Result<Vec<u32>, _> = decode_block(b"definitely not zstd");
        assert!(result.is_err());
    }
}
