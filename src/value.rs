//! Raw document model
//!
//! Documents arrive from a [`DocumentSource`](crate::source::DocumentSource) as
//! ordered field lists whose values are tagged with their native kind. The
//! value model is closed so classification is an exhaustive match.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::error::MetadataError;

/// Native per-document identity value (12 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Create from raw bytes
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Parse a 24 character hex string
    pub fn parse_hex(hex: &str) -> Option<Self> {
        if hex.len() != 24 || !hex.is_ascii() {
            return None;
        }
        decode_hex(hex)?.try_into().ok().map(Self)
    }

    /// Raw bytes
    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// A typed value as stored in a document
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentValue {
    Null,
    Undefined,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    /// Decimal128 kept in its canonical string form
    Decimal(String),
    String(String),
    Binary(Vec<u8>),
    DateTime(DateTime<Utc>),
    Timestamp { time: u32, increment: u32 },
    Regex { pattern: String, options: String },
    ObjectId(ObjectId),
    Array(Vec<DocumentValue>),
    Document(Document),
    MinKey,
    MaxKey,
}

impl DocumentValue {
    /// Name of the native value kind
    pub fn kind_name(&self) -> &'static str {
        match self {
            DocumentValue::Null => "null",
            DocumentValue::Undefined => "undefined",
            DocumentValue::Bool(_) => "bool",
            DocumentValue::Int32(_) => "int32",
            DocumentValue::Int64(_) => "int64",
            DocumentValue::Double(_) => "double",
            DocumentValue::Decimal(_) => "decimal",
            DocumentValue::String(_) => "string",
            DocumentValue::Binary(_) => "binary",
            DocumentValue::DateTime(_) => "datetime",
            DocumentValue::Timestamp { .. } => "timestamp",
            DocumentValue::Regex { .. } => "regex",
            DocumentValue::ObjectId(_) => "objectId",
            DocumentValue::Array(_) => "array",
            DocumentValue::Document(_) => "document",
            DocumentValue::MinKey => "minKey",
            DocumentValue::MaxKey => "maxKey",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DocumentValue::Null | DocumentValue::Undefined)
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            DocumentValue::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[DocumentValue]> {
        match self {
            DocumentValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Convert a JSON value, recognizing extended-JSON type wrappers
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => DocumentValue::Null,
            Value::Bool(b) => DocumentValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    match i32::try_from(i) {
                        Ok(small) => DocumentValue::Int32(small),
                        Err(_) => DocumentValue::Int64(i),
                    }
                } else {
                    DocumentValue::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => DocumentValue::String(s.clone()),
            Value::Array(items) => {
                DocumentValue::Array(items.iter().map(DocumentValue::from_json).collect())
            }
            Value::Object(map) => extended_json_value(map)
                .unwrap_or_else(|| DocumentValue::Document(Document::from_json_map(map))),
        }
    }
}

/// Decode a `{"$type": ...}` wrapper, if the object is one
fn extended_json_value(map: &Map<String, Value>) -> Option<DocumentValue> {
    if let Some(value) = legacy_json_value(map) {
        return Some(value);
    }
    if map.len() != 1 {
        return None;
    }
    let (key, inner) = map.iter().next()?;
    let value = match (key.as_str(), inner) {
        ("$oid", Value::String(hex)) => match ObjectId::parse_hex(hex) {
            Some(oid) => DocumentValue::ObjectId(oid),
            None => DocumentValue::String(hex.clone()),
        },
        ("$date", Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|dt| DocumentValue::DateTime(dt.with_timezone(&Utc)))
            .unwrap_or_else(|_| DocumentValue::String(s.clone())),
        ("$date", Value::Number(n)) => millis_to_datetime(n.as_i64()?)?,
        ("$date", Value::Object(long)) => {
            let millis = long.get("$numberLong")?.as_str()?.parse().ok()?;
            millis_to_datetime(millis)?
        }
        ("$numberDecimal", Value::String(s)) => DocumentValue::Decimal(s.clone()),
        ("$numberLong", Value::String(s)) => DocumentValue::Int64(s.parse().ok()?),
        ("$numberInt", Value::String(s)) => DocumentValue::Int32(s.parse().ok()?),
        ("$numberDouble", Value::String(s)) => DocumentValue::Double(s.parse().ok()?),
        ("$binary", Value::String(hex)) => DocumentValue::Binary(decode_hex(hex)?),
        ("$binary", Value::Object(bin)) => {
            DocumentValue::Binary(STANDARD.decode(bin.get("base64")?.as_str()?).ok()?)
        }
        ("$timestamp", Value::Object(ts)) => DocumentValue::Timestamp {
            time: u32::try_from(ts.get("t")?.as_u64()?).ok()?,
            increment: u32::try_from(ts.get("i")?.as_u64()?).ok()?,
        },
        ("$regularExpression", Value::Object(re)) => DocumentValue::Regex {
            pattern: re.get("pattern")?.as_str()?.to_string(),
            options: re
                .get("options")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        },
        ("$minKey", _) => DocumentValue::MinKey,
        ("$maxKey", _) => DocumentValue::MaxKey,
        ("$undefined", _) => DocumentValue::Undefined,
        _ => return None,
    };
    Some(value)
}

/// Shell-style wrappers that carry their options in a sibling key
fn legacy_json_value(map: &Map<String, Value>) -> Option<DocumentValue> {
    let options = |key: &str| match map.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        None => Some(String::new()),
        Some(_) => None,
    };
    if let Some(Value::String(pattern)) = map.get("$regex") {
        let only_options = map.keys().all(|k| k == "$regex" || k == "$options");
        if only_options {
            return Some(DocumentValue::Regex {
                pattern: pattern.clone(),
                options: options("$options")?,
            });
        }
    }
    if let (2, Some(Value::String(b64)), Some(Value::String(_))) =
        (map.len(), map.get("$binary"), map.get("$type"))
    {
        return STANDARD.decode(b64).ok().map(DocumentValue::Binary);
    }
    None
}

fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}

fn millis_to_datetime(millis: i64) -> Option<DocumentValue> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(DocumentValue::DateTime)
}

/// A named value inside a document
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentField {
    pub name: String,
    pub value: DocumentValue,
}

impl DocumentField {
    pub fn new(name: impl Into<String>, value: DocumentValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// An ordered sequence of fields
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    fields: Vec<DocumentField>,
}

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, replacing an existing field of the same name in place
    pub fn insert(&mut self, name: impl Into<String>, value: DocumentValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.value = value,
            None => self.fields.push(DocumentField { name, value }),
        }
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, name: impl Into<String>, value: DocumentValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&DocumentValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    pub fn fields(&self) -> &[DocumentField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Convert a JSON object; the root must be an object
    pub fn from_json(value: &Value) -> Result<Self, MetadataError> {
        match value {
            Value::Object(map) => Ok(Self::from_json_map(map)),
            other => Err(MetadataError::InvalidStructure(
                json_type_name(other).to_string(),
            )),
        }
    }

    /// Parse and convert a JSON string
    pub fn from_json_str(json: &str) -> Result<Self, MetadataError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json(&value)
    }

    fn from_json_map(map: &Map<String, Value>) -> Self {
        map.iter()
            .map(|(name, value)| DocumentField::new(name.clone(), DocumentValue::from_json(value)))
            .collect()
    }
}

impl FromIterator<DocumentField> for Document {
    fn from_iter<I: IntoIterator<Item = DocumentField>>(iter: I) -> Self {
        let mut doc = Document::new();
        for field in iter {
            doc.insert(field.name, field.value);
        }
        doc
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = &'a DocumentField;
    type IntoIter = std::slice::Iter<'a, DocumentField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
