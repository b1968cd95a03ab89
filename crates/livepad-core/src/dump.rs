//! The dump tree — the serialized form of every value a snippet produces.
//!
//! `DumpValue` serializes flat-with-nulls: all six variant slots are always
//! present and the ones that do not apply to the node's `DumpType` are null.
//! Existing clients deserialize positionally by field name, so this shape
//! must not change to a tagged encoding.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Which of the `DumpValue` slots carries this node's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DumpType {
    Primitive,
    PrimitiveSequence,
    Complex,
    ComplexSequence,
    BeyondDepthLimit,
    Image,
}

/// One node of a dumped object graph.
///
/// Invariant: a `Complex` node never carries an empty field map — the dumper
/// drops empty results instead of emitting them, and consumers treat a
/// missing field as the uniform empty-value signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DumpValue {
    pub type_name: Option<String>,
    pub dump_type: DumpType,
    pub primitive_value: Option<serde_json::Value>,
    pub complex_value: Option<FieldMap>,
    pub primitive_enumerable: Option<Vec<serde_json::Value>>,
    pub complex_enumerable: Option<Vec<DumpValue>>,
}

impl DumpValue {
    fn empty(dump_type: DumpType, type_name: Option<String>) -> Self {
        Self {
            type_name,
            dump_type,
            primitive_value: None,
            complex_value: None,
            primitive_enumerable: None,
            complex_enumerable: None,
        }
    }

    /// A scalar. `value` must already be a JSON scalar, never an object.
    pub fn primitive(type_name: &str, value: serde_json::Value) -> Self {
        let mut node = Self::empty(DumpType::Primitive, Some(type_name.to_string()));
        node.primitive_value = Some(value);
        node
    }

    /// A homogeneous list of scalars.
    pub fn primitive_sequence(type_name: &str, values: Vec<serde_json::Value>) -> Self {
        let mut node = Self::empty(DumpType::PrimitiveSequence, Some(type_name.to_string()));
        node.primitive_enumerable = Some(values);
        node
    }

    /// A struct-like node. Callers must never pass an empty map.
    pub fn complex(type_name: &str, fields: FieldMap) -> Self {
        let mut node = Self::empty(DumpType::Complex, Some(type_name.to_string()));
        node.complex_value = Some(fields);
        node
    }

    /// An object list.
    pub fn complex_sequence(type_name: &str, items: Vec<DumpValue>) -> Self {
        let mut node = Self::empty(DumpType::ComplexSequence, Some(type_name.to_string()));
        node.complex_enumerable = Some(items);
        node
    }

    /// Sentinel marking a subtree cut off by the depth bound.
    pub fn beyond_depth_limit(type_name: &str) -> Self {
        Self::empty(DumpType::BeyondDepthLimit, Some(type_name.to_string()))
    }

    /// An encoded bitmap. The base64 JPEG rides in the primitive slot —
    /// the flat wire shape has no dedicated image field.
    pub fn image(base64_jpeg: String) -> Self {
        let mut node = Self::empty(DumpType::Image, Some("Image".to_string()));
        node.primitive_value = Some(serde_json::Value::String(base64_jpeg));
        node
    }
}

// ── Ordered field map ────────────────────────────────────────────────────────

/// String→DumpValue map that preserves insertion order.
///
/// Field order on the wire follows declared struct order, so a plain
/// HashMap will not do. Serialized as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap(Vec<(String, DumpValue)>);

impl FieldMap {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: DumpValue) {
        self.0.push((name.into(), value));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&DumpValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, DumpValue)> {
        self.0.iter()
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldMapVisitor;

        impl<'de> Visitor<'de> for FieldMapVisitor {
            type Value = FieldMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of field names to dump values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(entry) = access.next_entry::<String, DumpValue>()? {
                    entries.push(entry);
                }
                Ok(FieldMap(entries))
            }
        }

        deserializer.deserialize_map(FieldMapVisitor)
    }
}

// ── Execution result ─────────────────────────────────────────────────────────

/// One labeled dump result.
///
/// `result_value` is null when the dumped value produced no node (dumping
/// null, an all-empty object, a suppressed pointer). The label survives so
/// clients can still show that the dump call happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultPair {
    pub result_key: String,
    pub result_value: Option<DumpValue>,
}

/// The full response to an `ExecuteAssembly` request.
///
/// At most one of `error_message` and a non-empty `results` is meaningful;
/// both absent means the snippet ran and dumped nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExecuteResponse {
    pub error_message: Option<String>,
    pub results: Option<Vec<ResultPair>>,
}

impl ExecuteResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            results: None,
        }
    }

    pub fn results(results: Vec<ResultPair>) -> Self {
        Self {
            error_message: None,
            results: Some(results),
        }
    }
}
