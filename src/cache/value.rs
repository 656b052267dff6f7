//! Cache Value Module
//!
//! Tagged value model for everything the cache can store, plus the JSON
//! marker shapes used to embed binary data in a document.

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};

/// Marker `type` for inline binary data.
pub(crate) const BUFFER_TYPE: &str = "Buffer";
/// Marker `type` for binary data stored in a segment file.
pub(crate) const EXTERNAL_BUFFER_TYPE: &str = "ExternalBuffer";

// == Cache Value ==
/// A structured value with first-class binary payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<CacheValue>),
    Map(BTreeMap<String, CacheValue>),
    Bytes(Vec<u8>),
}

impl CacheValue {
    // == To JSON ==
    /// Renders the value as JSON, with every byte buffer written inline as
    /// a `{"type":"Buffer","data":[...]}` marker.
    pub fn to_json(&self) -> Value {
        match self {
            CacheValue::Null => Value::Null,
            CacheValue::Bool(b) => Value::Bool(*b),
            CacheValue::Number(n) => Value::Number(n.clone()),
            CacheValue::String(s) => Value::String(s.clone()),
            CacheValue::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            CacheValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            CacheValue::Bytes(bytes) => buffer_marker(bytes),
        }
    }

    /// Returns the byte payload if this is a `Bytes` value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CacheValue::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

// == JSON Conversion ==
/// Converts plain JSON into a value. Objects with the exact inline buffer
/// marker shape become `Bytes`; everything else maps structurally.
impl From<Value> for CacheValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => CacheValue::Null,
            Value::Bool(b) => CacheValue::Bool(b),
            Value::Number(n) => CacheValue::Number(n),
            Value::String(s) => CacheValue::String(s),
            Value::Array(items) => CacheValue::Array(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => match parse_marker(&map) {
                Some(Marker::Buffer(bytes)) => CacheValue::Bytes(bytes),
                _ => CacheValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
            },
        }
    }
}

impl From<&str> for CacheValue {
    fn from(s: &str) -> Self {
        CacheValue::String(s.to_string())
    }
}

impl From<String> for CacheValue {
    fn from(s: String) -> Self {
        CacheValue::String(s)
    }
}

impl From<bool> for CacheValue {
    fn from(b: bool) -> Self {
        CacheValue::Bool(b)
    }
}

impl From<i64> for CacheValue {
    fn from(n: i64) -> Self {
        CacheValue::Number(n.into())
    }
}

impl From<u64> for CacheValue {
    fn from(n: u64) -> Self {
        CacheValue::Number(n.into())
    }
}

impl From<Vec<u8>> for CacheValue {
    fn from(bytes: Vec<u8>) -> Self {
        CacheValue::Bytes(bytes)
    }
}

impl From<Vec<CacheValue>> for CacheValue {
    fn from(items: Vec<CacheValue>) -> Self {
        CacheValue::Array(items)
    }
}

impl<K: Into<String>> FromIterator<(K, CacheValue)> for CacheValue {
    fn from_iter<I: IntoIterator<Item = (K, CacheValue)>>(iter: I) -> Self {
        CacheValue::Map(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

// == Markers ==
/// A binary marker recognized inside a JSON document.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Marker {
    Buffer(Vec<u8>),
    External { index: usize, size: u64 },
}

pub(crate) fn buffer_marker(bytes: &[u8]) -> Value {
    let mut map = Map::new();
    map.insert("type".to_string(), Value::String(BUFFER_TYPE.to_string()));
    map.insert(
        "data".to_string(),
        Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    );
    Value::Object(map)
}

pub(crate) fn external_marker(index: usize, size: u64) -> Value {
    let mut map = Map::new();
    map.insert(
        "type".to_string(),
        Value::String(EXTERNAL_BUFFER_TYPE.to_string()),
    );
    map.insert("index".to_string(), Value::from(index));
    map.insert("size".to_string(), Value::from(size));
    Value::Object(map)
}

/// Recognizes a marker only when the object has exactly the marker's keys
/// with the marker's value types.
pub(crate) fn parse_marker(map: &Map<String, Value>) -> Option<Marker> {
    match map.get("type")?.as_str()? {
        BUFFER_TYPE if map.len() == 2 => {
            let data = map.get("data")?.as_array()?;
            let bytes = data
                .iter()
                .map(|v| v.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect::<Option<Vec<u8>>>()?;
            Some(Marker::Buffer(bytes))
        }
        EXTERNAL_BUFFER_TYPE if map.len() == 3 => {
            let index = usize::try_from(map.get("index")?.as_u64()?).ok()?;
            let size = map.get("size")?.as_u64()?;
            Some(Marker::External { index, size })
        }
        _ => None,
    }
}

/// True when a user map would be read back as a marker.
/// Mirrors [`parse_marker`] without rendering the children.
pub(crate) fn is_marker_shaped(map: &BTreeMap<String, CacheValue>) -> bool {
    let as_u64 = |key: &str| match map.get(key) {
        Some(CacheValue::Number(n)) => n.as_u64(),
        _ => None,
    };

    match map.get("type") {
        Some(CacheValue::String(kind)) if kind == BUFFER_TYPE && map.len() == 2 => {
            match map.get("data") {
                Some(CacheValue::Array(items)) => items.iter().all(|item| match item {
                    CacheValue::Number(n) => n.as_u64().is_some_and(|b| u8::try_from(b).is_ok()),
                    _ => false,
                }),
                _ => false,
            }
        }
        Some(CacheValue::String(kind)) if kind == EXTERNAL_BUFFER_TYPE && map.len() == 3 => {
            as_u64("index").is_some_and(|i| usize::try_from(i).is_ok()) && as_u64("size").is_some()
        }
        _ => false,
    }
}
