use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ContainerError;

/// A single natively typed scalar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
}

/// Element type of an [`Array`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::Bool => "bool",
            DType::I8 => "i8",
            DType::I16 => "i16",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::U8 => "u8",
            DType::U16 => "u16",
            DType::U32 => "u32",
            DType::U64 => "u64",
            DType::F32 => "f32",
            DType::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// Flat, row-major element storage of an [`Array`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrayData {
    Bool(Vec<bool>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Element types that can back an [`Array`].
pub trait Element: Copy + Sized {
    const DTYPE: DType;

    fn into_data(values: Vec<Self>) -> ArrayData;

    fn slice(data: &ArrayData) -> Option<&[Self]>;
}

macro_rules! impl_element {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = DType::$variant;

                fn into_data(values: Vec<Self>) -> ArrayData {
                    ArrayData::$variant(values)
                }

                fn slice(data: &ArrayData) -> Option<&[Self]> {
                    match data {
                        ArrayData::$variant(values) => Some(values),
                        _ => None,
                    }
                }
            }

            impl From<Vec<$ty>> for Dataset {
                fn from(values: Vec<$ty>) -> Self {
                    Dataset::Array(Array::from_vec(values))
                }
            }
        )*

        impl ArrayData {
            /// Number of stored elements.
            pub fn len(&self) -> usize {
                match self {
                    $(ArrayData::$variant(values) => values.len(),)*
                }
            }

            /// Element type.
            pub fn dtype(&self) -> DType {
                match self {
                    $(ArrayData::$variant(_) => DType::$variant,)*
                }
            }
        }
    };
}

impl_element! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}

impl ArrayData {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An n-dimensional, homogeneously typed array with an explicit shape.
///
/// The element count always equals the product of the shape. A zero-rank
/// shape holds exactly one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Array {
    shape: Vec<usize>,
    data: ArrayData,
}

impl Array {
    /// Build an array, checking that `shape` matches the element count.
    pub fn new(shape: Vec<usize>, data: ArrayData) -> Result<Self, ContainerError> {
        let array = Self { shape, data };
        array.check_shape()?;
        Ok(array)
    }

    /// Build a one-dimensional array.
    pub fn from_vec<T: Element>(values: Vec<T>) -> Self {
        Self {
            shape: vec![values.len()],
            data: T::into_data(values),
        }
    }

    /// Build an array from typed values and a shape.
    pub fn from_shape_vec<T: Element>(
        shape: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self, ContainerError> {
        Self::new(shape, T::into_data(values))
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Typed view of the elements, `None` if `T` is not the element type.
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::slice(&self.data)
    }

    fn check_shape(&self) -> Result<(), ContainerError> {
        let expected = self
            .shape
            .iter()
            .try_fold(1usize, |acc, dim| acc.checked_mul(*dim));
        match expected {
            Some(count) if count == self.data.len() => Ok(()),
            _ => Err(ContainerError::Unsupported(format!(
                "array shape {:?} does not match {} elements",
                self.shape,
                self.data.len()
            ))),
        }
    }
}

/// Discriminant of a [`Dataset`], recorded in the container index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetKind {
    Scalar,
    Array,
    Text,
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Scalar => f.write_str("scalar"),
            DatasetKind::Array => f.write_str("array"),
            DatasetKind::Text => f.write_str("text"),
        }
    }
}

/// A value the container stores natively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Dataset {
    Scalar(Scalar),
    Array(Array),
    Text(String),
}

impl Dataset {
    pub fn kind(&self) -> DatasetKind {
        match self {
            Dataset::Scalar(_) => DatasetKind::Scalar,
            Dataset::Array(_) => DatasetKind::Array,
            Dataset::Text(_) => DatasetKind::Text,
        }
    }

    /// Check that the container can represent this dataset as-is.
    ///
    /// Text is stored NUL-terminated, so interior NUL characters are rejected.
    pub fn validate(&self) -> Result<(), ContainerError> {
        match self {
            Dataset::Scalar(_) => Ok(()),
            Dataset::Array(array) => array.check_shape(),
            Dataset::Text(text) if text.contains('\0') => Err(ContainerError::Unsupported(
                "text with interior NUL character".into(),
            )),
            Dataset::Text(_) => Ok(()),
        }
    }

    pub fn is_storable(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Dataset::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Dataset::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Dataset::Scalar(scalar) => Some(*scalar),
            _ => None,
        }
    }
}

impl From<Scalar> for Dataset {
    fn from(scalar: Scalar) -> Self {
        Dataset::Scalar(scalar)
    }
}

impl From<Array> for Dataset {
    fn from(array: Array) -> Self {
        Dataset::Array(array)
    }
}

impl From<bool> for Dataset {
    fn from(value: bool) -> Self {
        Dataset::Scalar(Scalar::Bool(value))
    }
}

impl From<i64> for Dataset {
    fn from(value: i64) -> Self {
        Dataset::Scalar(Scalar::Int(value))
    }
}

impl From<i32> for Dataset {
    fn from(value: i32) -> Self {
        Dataset::Scalar(Scalar::Int(value.into()))
    }
}

impl From<u64> for Dataset {
    fn from(value: u64) -> Self {
        Dataset::Scalar(Scalar::UInt(value))
    }
}

impl From<f64> for Dataset {
    fn from(value: f64) -> Self {
        Dataset::Scalar(Scalar::Float(value))
    }
}

impl From<String> for Dataset {
    fn from(value: String) -> Self {
        Dataset::Text(value)
    }
}

impl From<&str> for Dataset {
    fn from(value: &str) -> Self {
        Dataset::Text(value.to_owned())
    }
}

/// Check that `name` can label a group or dataset.
pub fn validate_name(name: &str) -> Result<(), ContainerError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\0']) {
        return Err(ContainerError::InvalidName(name.to_owned()));
    }
    Ok(())
}
