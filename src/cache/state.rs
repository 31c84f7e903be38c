//! Per-source metadata: type registry plus provider and generated type maps

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::naming::qualified_property_name;
use crate::registry::TypeRegistry;
use crate::resolver::ProviderType;

/// `(collection, field) -> native type`, keyed as `collection.field`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderTypeMap {
    entries: BTreeMap<String, ProviderType>,
}

impl ProviderTypeMap {
    /// Record a native type unless one is already known
    pub fn insert_if_absent(&mut self, type_name: &str, field: &str, provider: ProviderType) -> bool {
        let key = qualified_property_name(type_name, field);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, provider);
        true
    }

    pub fn get(&self, type_name: &str, field: &str) -> Option<ProviderType> {
        self.entries
            .get(&qualified_property_name(type_name, field))
            .copied()
    }

    /// Move every entry of `from` to `to`
    pub fn rename_type(&mut self, from: &str, to: &str) {
        let prefix = qualified_property_name(from, "");
        let moved: Vec<String> = self
            .entries
            .keys()
            .filter(|key| key.starts_with(&prefix))
            .cloned()
            .collect();
        for key in moved {
            if let Some(provider) = self.entries.remove(&key) {
                let field = &key[prefix.len()..];
                self.entries.insert(qualified_property_name(to, field), provider);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProviderType)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// External property name and the stored field it reads from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedMember {
    pub property: String,
    pub field: String,
}

/// Record layout of a resource type as stored in documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedType {
    pub type_name: String,
    pub members: Vec<GeneratedMember>,
}

impl GeneratedType {
    /// Stored field name behind an external property
    pub fn field_for(&self, property: &str) -> Option<&str> {
        self.members
            .iter()
            .find(|m| m.property == property)
            .map(|m| m.field.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedTypeMap {
    types: BTreeMap<String, GeneratedType>,
}

impl GeneratedTypeMap {
    pub fn record(&mut self, type_name: &str, property: &str, field: &str) {
        let generated = self
            .types
            .entry(type_name.to_string())
            .or_insert_with(|| GeneratedType {
                type_name: type_name.to_string(),
                members: Vec::new(),
            });
        if generated.field_for(property).is_none() {
            generated.members.push(GeneratedMember {
                property: property.to_string(),
                field: field.to_string(),
            });
        }
    }

    pub fn rename_type(&mut self, from: &str, to: &str) {
        if let Some(mut generated) = self.types.remove(from) {
            generated.type_name = to.to_string();
            self.types.insert(to.to_string(), generated);
        }
    }

    pub fn get(&self, type_name: &str) -> Option<&GeneratedType> {
        self.types.get(type_name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Everything cached for one data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataState {
    pub registry: TypeRegistry,
    pub provider_types: ProviderTypeMap,
    pub generated_types: GeneratedTypeMap,
}

impl MetadataState {
    pub fn new(container_name: &str, namespace: &str) -> Self {
        Self {
            registry: TypeRegistry::new(container_name, namespace),
            provider_types: ProviderTypeMap::default(),
            generated_types: GeneratedTypeMap::default(),
        }
    }

    /// Follow a type rename in the per-type maps
    pub fn rename_type(&mut self, from: &str, to: &str) {
        self.provider_types.rename_type(from, to);
        self.generated_types.rename_type(from, to);
    }
}
