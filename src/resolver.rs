//! Classification of raw document values into semantic types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::DocumentValue;

/// Semantic primitive types exposed by the resource model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrimitiveType {
    Boolean,
    Int32,
    Int64,
    Double,
    Decimal,
    String,
    Binary,
    DateTime,
    ObjectId,
}

impl PrimitiveType {
    pub fn type_name(&self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "Boolean",
            PrimitiveType::Int32 => "Int32",
            PrimitiveType::Int64 => "Int64",
            PrimitiveType::Double => "Double",
            PrimitiveType::Decimal => "Decimal",
            PrimitiveType::String => "String",
            PrimitiveType::Binary => "Binary",
            PrimitiveType::DateTime => "DateTime",
            PrimitiveType::ObjectId => "ObjectId",
        }
    }

    fn is_integer(&self) -> bool {
        matches!(self, PrimitiveType::Int32 | PrimitiveType::Int64)
    }

    /// Widen two element types observed in the same array.
    ///
    /// Numeric types widen (`Int32` < `Int64` < `Double`, integers into
    /// `Decimal`); any other disagreement keeps `self`.
    pub fn unify(self, other: PrimitiveType) -> PrimitiveType {
        match (self, other) {
            (a, b) if a == b => a,
            (PrimitiveType::Int32, PrimitiveType::Int64)
            | (PrimitiveType::Int64, PrimitiveType::Int32) => PrimitiveType::Int64,
            (a, PrimitiveType::Double) if a.is_integer() => PrimitiveType::Double,
            (PrimitiveType::Double, b) if b.is_integer() => PrimitiveType::Double,
            (a, PrimitiveType::Decimal) if a.is_integer() => PrimitiveType::Decimal,
            (PrimitiveType::Decimal, b) if b.is_integer() => PrimitiveType::Decimal,
            (a, _) => a,
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A primitive type plus whether the value may be absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalarType {
    pub primitive: PrimitiveType,
    pub optional: bool,
}

impl ScalarType {
    pub fn required(primitive: PrimitiveType) -> Self {
        Self {
            primitive,
            optional: false,
        }
    }

    pub fn optional(primitive: PrimitiveType) -> Self {
        Self {
            primitive,
            optional: true,
        }
    }

    /// Generic textual type used when nothing better is known
    pub fn text() -> Self {
        Self::optional(PrimitiveType::String)
    }

    fn for_position(primitive: PrimitiveType, is_key: bool) -> Self {
        Self {
            primitive,
            optional: !is_key,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            write!(f, "{}?", self.primitive)
        } else {
            write!(f, "{}", self.primitive)
        }
    }
}

/// Outcome of classifying one observed value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueClass {
    Scalar(ScalarType),
    /// Nested document; drives complex type creation
    Document,
    /// Array; drives collection property handling
    Array,
    /// Type cannot be determined from this value
    Unresolved,
}

impl ValueClass {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, ValueClass::Unresolved)
    }
}

/// Native value type recorded for marshaling by the query layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ProviderType {
    Scalar { scalar: ScalarType },
    Array,
    Document,
}

impl ProviderType {
    pub fn scalar(scalar: ScalarType) -> Self {
        ProviderType::Scalar { scalar }
    }
}

/// Native primitive of a scalar value, `None` for structural or null values
fn raw_primitive(value: &DocumentValue) -> Option<PrimitiveType> {
    let primitive = match value {
        DocumentValue::Bool(_) => PrimitiveType::Boolean,
        DocumentValue::Int32(_) => PrimitiveType::Int32,
        DocumentValue::Int64(_) | DocumentValue::Timestamp { .. } => PrimitiveType::Int64,
        DocumentValue::Double(_) => PrimitiveType::Double,
        DocumentValue::Decimal(_) => PrimitiveType::Decimal,
        DocumentValue::String(_) | DocumentValue::Regex { .. } => PrimitiveType::String,
        DocumentValue::Binary(_) => PrimitiveType::Binary,
        DocumentValue::DateTime(_) => PrimitiveType::DateTime,
        DocumentValue::ObjectId(_) => PrimitiveType::ObjectId,
        DocumentValue::Null
        | DocumentValue::Undefined
        | DocumentValue::MinKey
        | DocumentValue::MaxKey
        | DocumentValue::Array(_)
        | DocumentValue::Document(_) => return None,
    };
    Some(primitive)
}

/// Classify a value as seen by the external resource model.
///
/// A native identifier in key position becomes the mapped identifier type
/// (a required string). Scalars are optional unless they are keys.
pub fn classify(value: &DocumentValue, is_key: bool) -> ValueClass {
    match value {
        DocumentValue::Document(_) => ValueClass::Document,
        DocumentValue::Array(_) => ValueClass::Array,
        DocumentValue::ObjectId(_) if is_key => {
            ValueClass::Scalar(ScalarType::required(PrimitiveType::String))
        }
        other => match raw_primitive(other) {
            Some(primitive) => ValueClass::Scalar(ScalarType::for_position(primitive, is_key)),
            None => ValueClass::Unresolved,
        },
    }
}

/// Native type of a value for the provider type map
pub fn provider_type(value: &DocumentValue, is_key: bool) -> Option<ProviderType> {
    match value {
        DocumentValue::Document(_) => Some(ProviderType::Document),
        DocumentValue::Array(_) => Some(ProviderType::Array),
        other => raw_primitive(other)
            .map(|primitive| ProviderType::scalar(ScalarType::for_position(primitive, is_key))),
    }
}
