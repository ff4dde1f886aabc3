use hybridx_container::ContainerError;
use std::path::PathBuf;

/// Errors from the binary-entry codec.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("CBOR serialization error: {0}")]
    Encode(String),
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("CBOR deserialization error: {0}")]
    Decode(String),
}

/// Failure tied to a single entry.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Container(#[from] ContainerError),
}

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: ContainerError,
    },
    #[error("cannot create {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: ContainerError,
    },
    #[error("container error: {0}")]
    Container(#[from] ContainerError),
    #[error("invalid key: {0:?}")]
    InvalidKey(String),
    #[error("entry {key:?}: {source}")]
    Entry {
        key: String,
        #[source]
        source: EntryError,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Config(String),
}

impl StoreError {
    /// Whether the failure came from the file system rather than file content.
    pub fn is_io(&self) -> bool {
        match self {
            StoreError::Open { source, .. } | StoreError::Create { source, .. } => source.is_io(),
            StoreError::Container(source) => source.is_io(),
            StoreError::Io(_) => true,
            _ => false,
        }
    }
}
