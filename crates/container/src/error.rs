/// Errors from container file operations.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CBOR serialization error: {0}")]
    CborEncode(String),
    #[error("CBOR deserialization error: {0}")]
    CborDecode(String),
    #[error("not a hybridx container")]
    BadMagic,
    #[error("format version mismatch: file has v{file_version}, expected v{expected_version}")]
    UnsupportedVersion {
        file_version: u32,
        expected_version: u32,
    },
    #[error("container is truncated or was never finished")]
    Truncated,
    #[error("integrity check failed for {path}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        path: String,
        expected: String,
        actual: String,
    },
    #[error("invalid name: {0:?}")]
    InvalidName(String),
    #[error("group already exists: {0}")]
    GroupExists(String),
    #[error("group not found: {0}")]
    GroupNotFound(String),
    #[error("entry already exists: {0}")]
    EntryExists(String),
    #[error("entry not found: {0}")]
    EntryNotFound(String),
    #[error("unsupported dataset: {0}")]
    Unsupported(String),
    #[error("entry {path} lies outside the data region (offset {offset}, length {len})")]
    EntryOutOfBounds { path: String, offset: u64, len: u64 },
    #[error("stored dataset {path} is invalid: {reason}")]
    InvalidDataset { path: String, reason: String },
}

impl ContainerError {
    /// Whether this error came from the underlying file system.
    pub fn is_io(&self) -> bool {
        matches!(self, ContainerError::Io(_))
    }
}
