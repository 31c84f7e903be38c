//! Type registry
//!
//! In-memory resource model for one data source. Types live in an arena and
//! reference each other through [`TypeId`]s, so `Clone` is a plain structural
//! deep copy: a cloned registry shares nothing with the original.
//!
//! Every `add_*` operation is insert-if-absent. Nothing is ever removed.

mod document;
mod types;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use types::{
    CollectionElement, PropertyKind, PropertyType, ResourceProperty, ResourceSet, ResourceType,
    ResourceTypeKind, TypeId,
};

use crate::naming::WORD_SEPARATOR;
use crate::resolver::ScalarType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeRegistry {
    container_name: String,
    namespace: String,
    types: Vec<ResourceType>,
    /// Full name -> type
    type_index: BTreeMap<String, TypeId>,
    sets: Vec<ResourceSet>,
    /// Set name -> position in `sets`
    set_index: BTreeMap<String, usize>,
}

impl TypeRegistry {
    pub fn new(container_name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            container_name: container_name.into(),
            namespace: namespace.into(),
            types: Vec::new(),
            type_index: BTreeMap::new(),
            sets: Vec::new(),
            set_index: BTreeMap::new(),
        }
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Qualify a type name with the registry namespace
    pub fn qualify(&self, name: &str) -> String {
        format!("{}.{}", self.namespace, name)
    }

    /// Get or create the entity type `name`
    pub fn add_entity_type(&mut self, name: &str) -> TypeId {
        self.add_type(name, ResourceTypeKind::Entity)
    }

    /// Get or create the complex type `name`
    pub fn add_complex_type(&mut self, name: &str) -> TypeId {
        self.add_type(name, ResourceTypeKind::Complex)
    }

    fn add_type(&mut self, name: &str, kind: ResourceTypeKind) -> TypeId {
        if let Some(id) = self.find_type(name, kind) {
            return id;
        }

        let displaced = self.type_index.get(&self.qualify(name)).copied();
        let type_name = match kind {
            ResourceTypeKind::Entity => name.to_string(),
            ResourceTypeKind::Complex => self.free_name(name),
        };

        let id = TypeId(self.types.len());
        self.types.push(ResourceType {
            id,
            name: type_name.clone(),
            namespace: self.namespace.clone(),
            kind,
            properties: Vec::new(),
        });
        let full_name = self.qualify(&type_name);
        self.type_index.insert(full_name, id);
        debug!(type_name = %type_name, ?kind, "Created resource type");

        // An entity claims its collection name from a complex type
        if let Some(complex) = displaced.filter(|_| kind == ResourceTypeKind::Entity) {
            let moved = self.free_name(name);
            let moved_full_name = self.qualify(&moved);
            self.type_index.insert(moved_full_name, complex);
            if let Some(resource_type) = self.types.get_mut(complex.0) {
                debug!(from = name, to = %moved, "Renamed complex type");
                resource_type.name = moved;
            }
        }
        id
    }

    /// Look up the type of `kind` registered for the unqualified `name`.
    ///
    /// Entity types always own their exact name. A complex type whose name
    /// is taken by another kind lives under the first free `name__N`.
    pub fn find_type(&self, name: &str, kind: ResourceTypeKind) -> Option<TypeId> {
        for candidate in candidate_names(name) {
            let id = *self.type_index.get(&self.qualify(&candidate))?;
            let found = self.types.get(id.0)?.kind;
            if found == kind {
                return Some(id);
            }
            if kind == ResourceTypeKind::Entity {
                return None;
            }
        }
        None
    }

    fn free_name(&self, name: &str) -> String {
        candidate_names(name)
            .find(|candidate| !self.type_index.contains_key(&self.qualify(candidate)))
            .unwrap_or_else(|| name.to_string())
    }

    /// Add the key property of an entity type.
    ///
    /// A type carries at most one key. A second key candidate, or a key on a
    /// complex type, is added as a plain primitive instead.
    pub fn add_key_property(&mut self, id: TypeId, name: &str, scalar: ScalarType) -> bool {
        let Some(resource_type) = self.types.get(id.0) else {
            return false;
        };
        let property = if resource_type.is_entity() && resource_type.key_property().is_none() {
            ResourceProperty::key(name, scalar)
        } else {
            debug!(
                type_name = %resource_type.name,
                property = name,
                "Key not allowed here, adding as primitive"
            );
            ResourceProperty::primitive(name, scalar)
        };
        self.insert_property(id, property)
    }

    pub fn add_primitive_property(&mut self, id: TypeId, name: &str, scalar: ScalarType) -> bool {
        self.insert_property(id, ResourceProperty::primitive(name, scalar))
    }

    pub fn add_complex_property(&mut self, id: TypeId, name: &str, child: TypeId) -> bool {
        self.insert_property(id, ResourceProperty::complex(name, child))
    }

    pub fn add_collection_property(
        &mut self,
        id: TypeId,
        name: &str,
        element: CollectionElement,
    ) -> bool {
        self.insert_property(id, ResourceProperty::collection(name, element))
    }

    fn insert_property(&mut self, id: TypeId, property: ResourceProperty) -> bool {
        let Some(resource_type) = self.types.get_mut(id.0) else {
            return false;
        };
        if resource_type.property(&property.name).is_some() {
            return false;
        }
        resource_type.properties.push(property);
        true
    }

    /// Register a resource set for an entity type; idempotent by name
    pub fn add_resource_set(&mut self, name: &str, entity_type: TypeId) -> bool {
        if self.set_index.contains_key(name) {
            return false;
        }
        match self.types.get(entity_type.0) {
            Some(t) if t.is_entity() => {}
            _ => {
                debug!(set = name, "Resource set requires an entity type");
                return false;
            }
        }
        self.set_index.insert(name.to_string(), self.sets.len());
        self.sets.push(ResourceSet {
            name: name.to_string(),
            entity_type,
        });
        debug!(set = name, "Created resource set");
        true
    }

    /// Exact lookup by full (namespace-qualified) name
    pub fn resolve_resource_type(&self, full_name: &str) -> Option<&ResourceType> {
        self.type_index
            .get(full_name)
            .and_then(|id| self.types.get(id.0))
    }

    pub fn resolve_resource_set(&self, name: &str) -> Option<&ResourceSet> {
        self.set_index.get(name).and_then(|i| self.sets.get(*i))
    }

    pub fn resource_type(&self, id: TypeId) -> Option<&ResourceType> {
        self.types.get(id.0)
    }

    pub fn property(&self, id: TypeId, name: &str) -> Option<&ResourceProperty> {
        self.resource_type(id).and_then(|t| t.property(name))
    }

    /// Entity type behind a resource set
    pub fn set_type(&self, set: &ResourceSet) -> Option<&ResourceType> {
        self.resource_type(set.entity_type)
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &ResourceType> {
        self.types.iter()
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &ResourceType> {
        self.types.iter().filter(|t| t.is_entity())
    }

    pub fn complex_types(&self) -> impl Iterator<Item = &ResourceType> {
        self.types.iter().filter(|t| !t.is_entity())
    }

    pub fn resource_sets(&self) -> impl Iterator<Item = &ResourceSet> {
        self.sets.iter()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn property_count(&self) -> usize {
        self.types.iter().map(|t| t.properties.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn candidate_names(name: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(name.to_string())
        .chain((1..).map(move |n| format!("{}{}{}", name, WORD_SEPARATOR, n)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::PrimitiveType;

    fn registry() -> TypeRegistry {
        TypeRegistry::new("Container", "Ns")
    }

    #[test]
    fn test_add_type_is_idempotent() {
        let mut reg = registry();
        let a = reg.add_entity_type("Products");
        let b = reg.add_entity_type("Products");
        assert_eq!(a, b);
        assert_eq!(reg.type_count(), 1);
        assert_eq!(reg.resolve_resource_type("Ns.Products").unwrap().id, a);
        assert!(reg.resolve_resource_type("Products").is_none());
    }

    #[test]
    fn test_properties_are_insert_if_absent() {
        let mut reg = registry();
        let id = reg.add_entity_type("Products");
        assert!(reg.add_primitive_property(id, "name", ScalarType::text()));
        assert!(!reg.add_primitive_property(
            id,
            "name",
            ScalarType::optional(PrimitiveType::Int32)
        ));

        let prop = reg.property(id, "name").unwrap();
        assert_eq!(prop.property_type.scalar(), Some(ScalarType::text()));
    }

    #[test]
    fn test_single_key_per_entity() {
        let mut reg = registry();
        let id = reg.add_entity_type("Products");
        reg.add_key_property(id, "db_id", ScalarType::optional(PrimitiveType::String));
        reg.add_key_property(id, "code", ScalarType::required(PrimitiveType::Int32));

        let t = reg.resource_type(id).unwrap();
        assert_eq!(t.key_count(), 1);
        let key = t.key_property().unwrap();
        assert_eq!(key.name, "db_id");
        assert!(!key.property_type.scalar().unwrap().optional);
        assert!(!t.property("code").unwrap().is_key());
    }

    #[test]
    fn test_complex_type_has_no_key() {
        let mut reg = registry();
        let id = reg.add_complex_type("Products__Supplier");
        reg.add_key_property(id, "id", ScalarType::required(PrimitiveType::Int32));
        assert_eq!(reg.resource_type(id).unwrap().key_count(), 0);
    }

    #[test]
    fn test_resource_sets() {
        let mut reg = registry();
        let entity = reg.add_entity_type("Products");
        let complex = reg.add_complex_type("Products__Supplier");

        assert!(reg.add_resource_set("Products", entity));
        assert!(!reg.add_resource_set("Products", entity));
        assert!(!reg.add_resource_set("Suppliers", complex));

        let set = reg.resolve_resource_set("Products").unwrap();
        assert_eq!(reg.set_type(set).unwrap().name, "Products");
        assert!(reg.resolve_resource_set("Suppliers").is_none());
    }

    #[test]
    fn test_entity_claims_name_from_complex_type() {
        let mut reg = registry();
        let complex = reg.add_complex_type("Address");
        let entity = reg.add_entity_type("Address");

        assert_ne!(complex, entity);
        assert_eq!(reg.resolve_resource_type("Ns.Address").unwrap().id, entity);
        assert_eq!(reg.resource_type(complex).unwrap().name, "Address__1");
        assert_eq!(reg.find_type("Address", ResourceTypeKind::Complex), Some(complex));
        assert_eq!(reg.find_type("Address", ResourceTypeKind::Entity), Some(entity));

        assert!(reg.add_key_property(entity, "db_id", ScalarType::required(PrimitiveType::String)));
        assert_eq!(reg.resource_type(entity).unwrap().key_count(), 1);
        assert!(reg.add_resource_set("Address", entity));
    }

    #[test]
    fn test_complex_type_avoids_entity_name() {
        let mut reg = registry();
        let entity = reg.add_entity_type("Address");
        let complex = reg.add_complex_type("Address");

        assert_eq!(reg.resource_type(complex).unwrap().name, "Address__1");
        assert_eq!(reg.add_complex_type("Address"), complex);
        assert_eq!(reg.add_entity_type("Address"), entity);
        assert_eq!(reg.type_count(), 2);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut reg = registry();
        let id = reg.add_entity_type("Products");
        reg.add_primitive_property(id, "name", ScalarType::text());

        let mut copy = reg.clone();
        copy.add_primitive_property(id, "price", ScalarType::optional(PrimitiveType::Double));
        copy.add_entity_type("Orders");
        reg.add_primitive_property(id, "rating", ScalarType::optional(PrimitiveType::Int32));

        assert_eq!(reg.resource_type(id).unwrap().property_names(), vec!["name", "rating"]);
        assert_eq!(copy.resource_type(id).unwrap().property_names(), vec!["name", "price"]);
        assert_eq!(reg.type_count(), 1);
        assert_eq!(copy.type_count(), 2);
    }
}
