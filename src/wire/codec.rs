//! JSON codec for type-erased values
//!
//! Each type that crosses the JSON boundary registers a decoder and an encoder
//! here, keyed by the same type identity the transform registry uses.

use std::any::Any;
use std::collections::HashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::transform_registry::TransformError;
use crate::types::{DynValue, TypeKey};

type Decoder = fn(Value) -> Result<DynValue, serde_json::Error>;
type Encoder = fn(&DynValue) -> Option<Result<Value, serde_json::Error>>;

#[derive(Clone, Copy)]
struct Entry {
    decode: Decoder,
    encode: Encoder,
}

fn decode_as<T: DeserializeOwned + Any + Send>(value: Value) -> Result<DynValue, serde_json::Error> {
    serde_json::from_value::<T>(value).map(DynValue::new)
}

fn encode_as<T: Serialize + Any>(value: &DynValue) -> Option<Result<Value, serde_json::Error>> {
    value.downcast_ref::<T>().map(serde_json::to_value)
}

// serde_json writes NaN and infinities as null
fn non_finite(value: &DynValue) -> bool {
    match (value.downcast_ref::<f64>(), value.downcast_ref::<f32>()) {
        (Some(x), _) => !x.is_finite(),
        (_, Some(x)) => !x.is_finite(),
        _ => false,
    }
}

/// Per-type JSON decoders and encoders
#[derive(Clone, Default)]
pub struct JsonCodec {
    entries: HashMap<TypeKey, Entry>,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register JSON support for `T` via its serde implementations
    pub fn register<T>(&mut self)
    where
        T: Serialize + DeserializeOwned + Any + Send,
    {
        self.entries.insert(
            TypeKey::of::<T>(),
            Entry {
                decode: decode_as::<T>,
                encode: encode_as::<T>,
            },
        );
    }

    pub fn supports(&self, key: TypeKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// Decode a JSON value into the type identified by `key`
    ///
    /// # Errors
    /// `Codec` if the type has no decoder or the JSON does not fit it
    pub fn decode(&self, key: TypeKey, value: Value) -> Result<DynValue, TransformError> {
        let entry = self.entry(key)?;
        (entry.decode)(value).map_err(|e| TransformError::Codec {
            type_name: key.name().to_string(),
            message: e.to_string(),
        })
    }

    /// Encode a value using the encoder for its runtime type
    ///
    /// # Errors
    /// `Codec` if the type has no encoder or the value has no JSON form
    /// (non-finite floats)
    pub fn encode(&self, value: &DynValue) -> Result<Value, TransformError> {
        let key = value.type_key();
        let entry = self.entry(key)?;

        if non_finite(value) {
            return Err(TransformError::Codec {
                type_name: key.name().to_string(),
                message: "non-finite number has no JSON representation".to_string(),
            });
        }

        match (entry.encode)(value) {
            Some(result) => result.map_err(|e| TransformError::Codec {
                type_name: key.name().to_string(),
                message: e.to_string(),
            }),
            None => Err(TransformError::TypeMismatch {
                expected: key,
                actual: value.type_key(),
            }),
        }
    }

    fn entry(&self, key: TypeKey) -> Result<Entry, TransformError> {
        self.entries.get(&key).copied().ok_or_else(|| TransformError::Codec {
            type_name: key.name().to_string(),
            message: "no JSON codec registered for this type".to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for JsonCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonCodec")
            .field("types", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
