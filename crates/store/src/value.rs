use hybridx_container::{Array, Dataset, Scalar};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::CodecError;

/// Named values handed to and returned from the store.
pub type Mapping = BTreeMap<String, Value>;

/// A value in a [`Mapping`].
///
/// Native values are candidates for the raw group; objects are always
/// serialized into the binary group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Native(Dataset),
    Object(ciborium::Value),
}

/// Which group a value is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageClass {
    Raw,
    Binary,
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageClass::Raw => f.pad("raw"),
            StorageClass::Binary => f.pad("binary"),
        }
    }
}

impl Value {
    /// Capture any serializable value as a structured object.
    pub fn object<T: Serialize + ?Sized>(value: &T) -> Result<Self, CodecError> {
        ciborium::Value::serialized(value)
            .map(Value::Object)
            .map_err(|e| CodecError::Encode(e.to_string()))
    }

    /// Rebuild a typed object captured with [`Value::object`].
    pub fn to_object<T: DeserializeOwned>(&self) -> Result<T, CodecError> {
        match self {
            Value::Object(object) => object
                .deserialized()
                .map_err(|e| CodecError::Decode(e.to_string())),
            Value::Native(dataset) => Err(CodecError::Decode(format!(
                "native {} value is not an object",
                dataset.kind()
            ))),
        }
    }

    /// Decide, before any write, where this value is stored.
    pub fn classify(&self) -> StorageClass {
        match self {
            Value::Native(dataset) if dataset.is_storable() => StorageClass::Raw,
            _ => StorageClass::Binary,
        }
    }

    pub fn as_native(&self) -> Option<&Dataset> {
        match self {
            Value::Native(dataset) => Some(dataset),
            Value::Object(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        self.as_native().and_then(Dataset::as_array)
    }

    pub fn as_text(&self) -> Option<&str> {
        self.as_native().and_then(Dataset::as_text)
    }

    pub fn as_scalar(&self) -> Option<Scalar> {
        self.as_native().and_then(Dataset::as_scalar)
    }

    /// One-line human summary, e.g. `array<f64>[2, 3]`.
    pub fn summary(&self) -> String {
        match self {
            Value::Native(Dataset::Scalar(scalar)) => match scalar {
                Scalar::Bool(v) => format!("bool {v}"),
                Scalar::Int(v) => format!("int {v}"),
                Scalar::UInt(v) => format!("uint {v}"),
                Scalar::Float(v) => format!("float {v}"),
            },
            Value::Native(Dataset::Array(array)) => {
                format!("array<{}>{:?}", array.dtype(), array.shape())
            }
            Value::Native(Dataset::Text(text)) => format!("text ({} bytes)", text.len()),
            Value::Object(object) => match object {
                ciborium::Value::Map(entries) => format!("object ({} fields)", entries.len()),
                ciborium::Value::Array(items) => format!("object ({} items)", items.len()),
                _ => "object".to_owned(),
            },
        }
    }
}

macro_rules! impl_from_native {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Native(Dataset::from(value))
                }
            }
        )*
    };
}

impl_from_native! {
    Dataset, Array, Scalar, bool, i32, i64, u64, f64, String, &str,
    Vec<bool>, Vec<i8>, Vec<i16>, Vec<i32>, Vec<i64>,
    Vec<u8>, Vec<u16>, Vec<u32>, Vec<u64>, Vec<f32>, Vec<f64>,
}

impl From<ciborium::Value> for Value {
    fn from(value: ciborium::Value) -> Self {
        Value::Object(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Point {
        x: i32,
        label: String,
    }

    #[test]
    fn natives_classify_raw() {
        assert_eq!(Value::from(vec![1.0f64, 2.0]).classify(), StorageClass::Raw);
        assert_eq!(Value::from(7i64).classify(), StorageClass::Raw);
        assert_eq!(Value::from("text").classify(), StorageClass::Raw);
    }

    #[test]
    fn objects_and_unstorable_natives_classify_binary() {
        let point = Value::object(&Point {
            x: 1,
            label: "p".into(),
        })
        .unwrap();
        assert_eq!(point.classify(), StorageClass::Binary);
        assert_eq!(Value::from("nul\0inside").classify(), StorageClass::Binary);
    }

    #[test]
    fn object_typed_roundtrip() {
        let original = Point {
            x: 5,
            label: "five".into(),
        };
        let value = Value::object(&original).unwrap();
        assert_eq!(value.to_object::<Point>().unwrap(), original);
        assert!(value.as_native().is_none());
    }

    #[test]
    fn native_is_not_an_object() {
        assert!(Value::from(3i64).to_object::<Point>().is_err());
    }

    #[test]
    fn summaries() {
        let array = Array::from_shape_vec(vec![2, 3], vec![0f64; 6]).unwrap();
        assert_eq!(Value::from(array).summary(), "array<f64>[2, 3]");
        assert_eq!(Value::from(2i64).summary(), "int 2");
        let point = Value::object(&Point {
            x: 1,
            label: "p".into(),
        })
        .unwrap();
        assert_eq!(point.summary(), "object (2 fields)");
    }
}
