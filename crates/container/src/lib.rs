//! Hierarchical container file: a root with named groups, each holding
//! natively typed datasets (scalars, n-dimensional arrays, text).
//!
//! # Invariants
//! - A container is written once, front to back, and finalized by an index.
//! - Every dataset block is content-hashed and verified on read.
//! - Unsupported datasets are rejected before anything is written.

pub mod dataset;
pub mod error;
pub mod format;
pub mod reader;
pub mod writer;

pub use dataset::{Array, ArrayData, DType, Dataset, DatasetKind, Element, Scalar, validate_name};
pub use error::ContainerError;
pub use format::{FORMAT_VERSION, Location};
pub use reader::ContainerReader;
pub use writer::{ContainerWriter, DEFAULT_COMPRESSION_LEVEL, WriterOptions};
