//! Text encoding of values for the binary group: CBOR bytes, base64 wrapped.

use base64::prelude::{BASE64_STANDARD, Engine as _};

use crate::error::CodecError;
use crate::value::Value;

/// Serialize `value` into a printable blob.
pub fn encode(value: &Value) -> Result<String, CodecError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(BASE64_STANDARD.encode(buf))
}

/// Reverse of [`encode`].
pub fn decode(blob: &str) -> Result<Value, CodecError> {
    let bytes = BASE64_STANDARD.decode(blob.trim())?;
    ciborium::from_reader(bytes.as_slice()).map_err(|e| CodecError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    enum Shape {
        Circle { r: f64 },
        Poly(Vec<(i32, i32)>),
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Scene {
        name: String,
        shapes: Vec<Shape>,
        tags: BTreeMap<String, Option<u8>>,
        raw: Vec<u8>,
    }

    #[test]
    fn nested_object_survives() {
        let scene = Scene {
            name: "demo".into(),
            shapes: vec![Shape::Circle { r: 1.5 }, Shape::Poly(vec![(0, 0), (1, -1)])],
            tags: BTreeMap::from([("a".to_owned(), Some(1)), ("b".to_owned(), None)]),
            raw: vec![0, 255, 7],
        };
        let value = Value::object(&scene).unwrap();
        let blob = encode(&value).unwrap();
        assert!(blob.is_ascii());

        let back = decode(&blob).unwrap();
        assert_eq!(back, value);
        assert_eq!(back.to_object::<Scene>().unwrap(), scene);
    }

    #[test]
    fn native_text_with_nul_survives() {
        let value = Value::from("a\0b");
        assert_eq!(decode(&encode(&value).unwrap()).unwrap(), value);
    }

    #[test]
    fn surrounding_whitespace_ignored() {
        let value = Value::from(vec![1u16, 2, 3]);
        let blob = format!("  {}\n", encode(&value).unwrap());
        assert_eq!(decode(&blob).unwrap(), value);
    }

    #[test]
    fn invalid_base64_rejected() {
        assert!(matches!(decode("%%% not base64 %%%"), Err(CodecError::Base64(_))));
    }

    #[test]
    fn valid_base64_of_garbage_rejected() {
        let blob = BASE64_STANDARD.encode(b"\xff\xfe garbage");
        assert!(matches!(decode(&blob), Err(CodecError::Decode(_))));
    }
}
