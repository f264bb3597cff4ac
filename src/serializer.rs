//! Serializer Module
//!
//! Converts application values to and from the opaque byte payload stored in
//! the `val` column. Two built-in encodings are provided; any type
//! implementing [`Serializer`] can be plugged in instead.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::SerializationError;

// == Serializer Trait ==
/// Two-function encode/decode contract for cached values.
///
/// Both directions may fail; a failure must surface to the caller of the
/// cache operation rather than being treated as a missing key.
pub trait Serializer<V>: Send + Sync {
    /// Encodes a value into bytes.
    fn serialize(&self, value: &V) -> Result<Vec<u8>, SerializationError>;

    /// Decodes bytes previously produced by [`Serializer::serialize`].
    fn deserialize(&self, bytes: &[u8]) -> Result<V, SerializationError>;

    /// Short name used in log output.
    fn name(&self) -> &'static str {
        "custom"
    }
}

// == JSON Serializer ==
/// Plain-text structured encoding backed by `serde_json`. The default.
pub struct JsonSerializer<V>(PhantomData<fn() -> V>);

impl<V> JsonSerializer<V> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<V> Default for JsonSerializer<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Serializer<V> for JsonSerializer<V>
where
    V: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &V) -> Result<Vec<u8>, SerializationError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<V, SerializationError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

// == Binary Serializer ==
/// Compact binary encoding backed by `bincode`.
///
/// Not self-describing: values must be decoded as the same type they were
/// encoded from, and types relying on `deserialize_any` (such as
/// `serde_json::Value`) cannot be read back.
pub struct BinarySerializer<V>(PhantomData<fn() -> V>);

impl<V> BinarySerializer<V> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<V> Default for BinarySerializer<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Serializer<V> for BinarySerializer<V>
where
    V: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &V) -> Result<Vec<u8>, SerializationError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<V, SerializationError> {
        Ok(bincode::deserialize(bytes)?)
    }

    fn name(&self) -> &'static str {
        "binary"
    }
}

// == Serializer Choice ==
/// Configuration-level selection of the value encoding.
pub enum SerializerChoice<V> {
    /// [`JsonSerializer`]
    Json,
    /// [`BinarySerializer`]
    Binary,
    /// A caller-supplied implementation
    Custom(Arc<dyn Serializer<V>>),
}

impl<V> SerializerChoice<V>
where
    V: Serialize + DeserializeOwned + 'static,
{
    /// Resolves the choice into a shareable serializer instance.
    pub fn build(self) -> Arc<dyn Serializer<V>> {
        match self {
            SerializerChoice::Json => Arc::new(JsonSerializer::new()),
            SerializerChoice::Binary => Arc::new(BinarySerializer::new()),
            SerializerChoice::Custom(serializer) => serializer,
        }
    }
}

impl<V> SerializerChoice<V> {
    /// Parses a built-in serializer name (`json` or `binary`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Some(SerializerChoice::Json),
            "binary" | "bincode" => Some(SerializerChoice::Binary),
            _ => None,
        }
    }
}

impl<V> Default for SerializerChoice<V> {
    fn default() -> Self {
        SerializerChoice::Json
    }
}

impl<V> fmt::Debug for SerializerChoice<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializerChoice::Json => f.write_str("Json"),
            SerializerChoice::Binary => f.write_str("Binary"),
            SerializerChoice::Custom(s) => write!(f, "Custom({})", s.name()),
        }
    }
}
