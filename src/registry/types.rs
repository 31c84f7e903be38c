//! Resource model: entity and complex types, properties, and resource sets

use serde::{Deserialize, Serialize};

use crate::resolver::ScalarType;

/// Stable index of a resource type inside its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub(crate) usize);

impl TypeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceTypeKind {
    /// Top-level addressable type with a key
    Entity,
    /// Nested structural type without a key
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyKind {
    Key,
    Primitive,
    ComplexType,
    Collection,
}

/// Element type of a collection property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollectionElement {
    Primitive(ScalarType),
    Complex(TypeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyType {
    Primitive(ScalarType),
    Complex(TypeId),
    Collection(CollectionElement),
}

impl PropertyType {
    /// Child complex type, for complex or collection-of-complex properties
    pub fn complex_type(&self) -> Option<TypeId> {
        match self {
            PropertyType::Complex(id) | PropertyType::Collection(CollectionElement::Complex(id)) => {
                Some(*id)
            }
            _ => None,
        }
    }

    pub fn scalar(&self) -> Option<ScalarType> {
        match self {
            PropertyType::Primitive(scalar)
            | PropertyType::Collection(CollectionElement::Primitive(scalar)) => Some(*scalar),
            _ => None,
        }
    }
}

/// A named, typed member of a resource type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceProperty {
    pub name: String,
    pub kind: PropertyKind,
    pub property_type: PropertyType,
}

impl ResourceProperty {
    pub fn key(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self {
            name: name.into(),
            kind: PropertyKind::Key,
            property_type: PropertyType::Primitive(ScalarType {
                optional: false,
                ..scalar
            }),
        }
    }

    pub fn primitive(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self {
            name: name.into(),
            kind: PropertyKind::Primitive,
            property_type: PropertyType::Primitive(scalar),
        }
    }

    pub fn complex(name: impl Into<String>, child: TypeId) -> Self {
        Self {
            name: name.into(),
            kind: PropertyKind::ComplexType,
            property_type: PropertyType::Complex(child),
        }
    }

    pub fn collection(name: impl Into<String>, element: CollectionElement) -> Self {
        Self {
            name: name.into(),
            kind: PropertyKind::Collection,
            property_type: PropertyType::Collection(element),
        }
    }

    pub fn is_key(&self) -> bool {
        self.kind == PropertyKind::Key
    }

    pub fn is_complex(&self) -> bool {
        self.kind == PropertyKind::ComplexType
    }

    pub fn is_collection(&self) -> bool {
        self.kind == PropertyKind::Collection
    }
}

/// An entity or complex type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceType {
    pub id: TypeId,
    pub name: String,
    pub namespace: String,
    pub kind: ResourceTypeKind,
    pub properties: Vec<ResourceProperty>,
}

impl ResourceType {
    /// `namespace.name`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    pub fn is_entity(&self) -> bool {
        self.kind == ResourceTypeKind::Entity
    }

    pub fn property(&self, name: &str) -> Option<&ResourceProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn key_property(&self) -> Option<&ResourceProperty> {
        self.properties.iter().find(|p| p.is_key())
    }

    pub fn key_count(&self) -> usize {
        self.properties.iter().filter(|p| p.is_key()).count()
    }

    pub fn property_names(&self) -> Vec<&str> {
        self.properties.iter().map(|p| p.name.as_str()).collect()
    }
}

/// A named top-level collection of entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSet {
    pub name: String,
    pub entity_type: TypeId,
}
