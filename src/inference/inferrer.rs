//! Schema inference engine

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::MetadataState;
use crate::config::MetadataConfig;
use crate::error::MetadataError;
use crate::naming::{
    MAPPED_ID_NAME, PROVIDER_ID_NAME, is_native_id, is_system_collection, qualified_type_name,
    resource_property_name,
};
use crate::registry::{CollectionElement, PropertyType, ResourceTypeKind, TypeId};
use crate::resolver::{PrimitiveType, ProviderType, ScalarType, ValueClass, classify, provider_type};
use crate::source::{DocumentSource, DocumentStream};
use crate::unresolved::{UnresolvedProperty, UnresolvedTracker};
use crate::value::{Document, DocumentField, DocumentValue};

/// Statistics from one inference pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceStats {
    /// Collections whose documents were scanned
    pub collections_scanned: usize,
    /// Collections skipped because their scan could not start
    pub collections_skipped: usize,
    /// Documents merged into the registry
    pub documents_examined: usize,
    /// Documents the source failed to deliver
    pub documents_skipped: usize,
    /// Resource types created by this pass
    pub types_created: usize,
    /// Properties added by this pass, defaulted ones included
    pub properties_added: usize,
    /// Unresolved properties defaulted to text
    pub properties_defaulted: usize,
}

/// Builds and merges the resource model of one data source.
///
/// Observations are merged into an existing [`MetadataState`], so repeated
/// passes only ever add types and properties.
pub struct SchemaInferrer<'a> {
    config: &'a MetadataConfig,
    state: &'a mut MetadataState,
    unresolved: UnresolvedTracker,
    stats: InferenceStats,
    types_before: usize,
    properties_before: usize,
}

impl<'a> SchemaInferrer<'a> {
    pub fn new(config: &'a MetadataConfig, state: &'a mut MetadataState) -> Self {
        let types_before = state.registry.type_count();
        let properties_before = state.registry.property_count();
        Self {
            config,
            state,
            unresolved: UnresolvedTracker::new(),
            stats: InferenceStats::default(),
            types_before,
            properties_before,
        }
    }

    /// Run a full pass over every non-system collection of `source`.
    ///
    /// Only a failure to list collections aborts the pass; unreadable
    /// collections and documents are skipped.
    pub fn populate(mut self, source: &dyn DocumentSource) -> Result<InferenceStats, MetadataError> {
        let collections: Vec<String> = source
            .list_collections()?
            .into_iter()
            .filter(|name| !is_system_collection(name))
            .collect();

        for collection in &collections {
            self.populate_collection(source, collection);
        }

        let stats = self.finish();
        info!(
            collections = collections.len(),
            documents = stats.documents_examined,
            types_created = stats.types_created,
            properties_added = stats.properties_added,
            "Metadata inference pass complete"
        );
        Ok(stats)
    }

    fn populate_collection(&mut self, source: &dyn DocumentSource, collection: &str) {
        if self.config.is_structure_only() {
            if self.state.registry.resolve_resource_set(collection).is_none() {
                self.add_document_type(collection, None, ResourceTypeKind::Entity);
            }
            return;
        }

        let limit = self.config.scan_limit();
        let stream = match source.scan(collection, self.config.fetch_position.into(), limit) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(collection, error = %e, "Skipping collection");
                self.stats.collections_skipped += 1;
                return;
            }
        };
        let stream: DocumentStream<'_> = match limit {
            Some(n) => Box::new(stream.take(n)),
            None => stream,
        };
        self.stats.collections_scanned += 1;

        for item in stream {
            match item {
                Ok(document) => self.observe_document(collection, &document),
                Err(e) => {
                    warn!(collection, error = %e, "Skipping unreadable document");
                    self.stats.documents_skipped += 1;
                }
            }
        }
    }

    /// Merge one document of `collection` into the model
    pub fn observe_document(&mut self, collection: &str, document: &Document) {
        self.stats.documents_examined += 1;
        match self
            .state
            .registry
            .resolve_resource_set(collection)
            .map(|set| set.entity_type)
        {
            None => {
                self.add_document_type(collection, Some(document), ResourceTypeKind::Entity);
            }
            Some(entity) => {
                for field in document {
                    self.register_document_property(entity, field);
                }
            }
        }
    }

    /// Default every still-unresolved property to text and report
    pub fn finish(mut self) -> InferenceStats {
        for (property, field_name) in self.unresolved.drain() {
            let Some(type_name) = self.type_name(property.resource_type) else {
                continue;
            };
            let text = ScalarType::text();
            if self.state.registry.add_primitive_property(
                property.resource_type,
                &property.property_name,
                text,
            ) {
                self.state.provider_types.insert_if_absent(
                    &type_name,
                    &property.property_name,
                    ProviderType::scalar(text),
                );
                self.state
                    .generated_types
                    .record(&type_name, &property.property_name, &field_name);
                self.stats.properties_defaulted += 1;
                debug!(
                    type_name = %type_name,
                    property = %property.property_name,
                    "Defaulted unresolved property to text"
                );
            }
        }

        let registry = &self.state.registry;
        self.stats.types_created = registry.type_count() - self.types_before;
        self.stats.properties_added = registry.property_count() - self.properties_before;
        self.stats
    }

    fn type_name(&self, id: TypeId) -> Option<String> {
        self.state.registry.resource_type(id).map(|t| t.name.clone())
    }

    fn type_kind(&self, id: TypeId) -> ResourceTypeKind {
        self.state
            .registry
            .resource_type(id)
            .map(|t| t.kind)
            .unwrap_or(ResourceTypeKind::Complex)
    }

    /// Create the entity type of a collection, moving aside a complex type of the same name
    fn add_entity_type(&mut self, collection: &str) -> TypeId {
        let registry = &mut self.state.registry;
        let displaced = registry
            .find_type(collection, ResourceTypeKind::Complex)
            .filter(|id| registry.resource_type(*id).is_some_and(|t| t.name == collection));
        let id = registry.add_entity_type(collection);

        if let Some(moved) = displaced.and_then(|complex| self.type_name(complex)) {
            self.state.rename_type(collection, &moved);
        }
        id
    }

    /// Create (or reuse) a type named `type_name` and merge `document` into it
    fn add_document_type(
        &mut self,
        type_name: &str,
        document: Option<&Document>,
        kind: ResourceTypeKind,
    ) -> TypeId {
        let id = match kind {
            ResourceTypeKind::Entity => self.add_entity_type(type_name),
            ResourceTypeKind::Complex => self.state.registry.add_complex_type(type_name),
        };

        let mut has_native_id = false;
        if let Some(document) = document {
            for field in document {
                self.register_document_property(id, field);
                if is_native_id(&field.name) && matches!(key_class(kind, field), ValueClass::Scalar(_))
                {
                    has_native_id = true;
                }
            }
        }

        if kind == ResourceTypeKind::Entity {
            if !has_native_id {
                let registry = &mut self.state.registry;
                if registry.add_key_property(
                    id,
                    MAPPED_ID_NAME,
                    ScalarType::required(PrimitiveType::String),
                ) {
                    debug!(type_name, "Synthesized surrogate key");
                }
                self.state
                    .generated_types
                    .record(type_name, MAPPED_ID_NAME, PROVIDER_ID_NAME);
                self.state.provider_types.insert_if_absent(
                    type_name,
                    PROVIDER_ID_NAME,
                    ProviderType::scalar(ScalarType::required(PrimitiveType::ObjectId)),
                );
            }
            self.state.registry.add_resource_set(type_name, id);
        }

        id
    }

    /// Merge one field into a type, recursing into known nested shapes
    fn register_document_property(&mut self, owner: TypeId, field: &DocumentField) {
        let name = resource_property_name(&field.name, self.type_kind(owner));
        let existing = self
            .state
            .registry
            .property(owner, &name)
            .map(|p| p.property_type);

        match existing {
            None => self.register_resource_property(owner, field),
            Some(PropertyType::Complex(_)) => {
                if let Some(document) = field.value.as_document() {
                    self.register_document_properties(owner, &name, document);
                }
            }
            Some(PropertyType::Collection(_)) => {
                if field.value.as_array().is_some() {
                    self.register_array_property(owner, field);
                }
            }
            // First typed observation wins
            Some(PropertyType::Primitive(_)) => {}
        }
    }

    /// Add a not-yet-known property, or track it as unresolved
    fn register_resource_property(&mut self, owner: TypeId, field: &DocumentField) {
        let kind = self.type_kind(owner);
        let name = resource_property_name(&field.name, kind);
        if name.is_empty() || self.state.registry.property(owner, &name).is_some() {
            return;
        }

        let class = key_class(kind, field);
        if class.is_resolved() {
            self.add_resource_property(owner, field, &name, class);
        }

        let resolved = self.state.registry.property(owner, &name).is_some();
        self.unresolved
            .observe(UnresolvedProperty::new(owner, name), &field.name, resolved);
    }

    fn add_resource_property(
        &mut self,
        owner: TypeId,
        field: &DocumentField,
        name: &str,
        class: ValueClass,
    ) {
        let Some(owner_name) = self.type_name(owner) else {
            return;
        };
        let in_key_position = is_key_position(self.type_kind(owner), field);

        match class {
            ValueClass::Scalar(scalar) if in_key_position => {
                self.state.registry.add_key_property(owner, name, scalar);
            }
            ValueClass::Scalar(scalar) => {
                self.state.registry.add_primitive_property(owner, name, scalar);
            }
            ValueClass::Document => {
                if let Some(document) = field.value.as_document() {
                    self.add_document_property(owner, &owner_name, name, document, false);
                }
            }
            ValueClass::Array => self.register_array_property(owner, field),
            ValueClass::Unresolved => return,
        }

        if self.state.registry.property(owner, name).is_none() {
            return;
        }
        self.state
            .generated_types
            .record(&owner_name, name, &field.name);
        let provider_field = if is_native_id(&field.name) {
            PROVIDER_ID_NAME
        } else {
            name
        };
        if let Some(provider) = provider_type(&field.value, in_key_position) {
            self.state
                .provider_types
                .insert_if_absent(&owner_name, provider_field, provider);
        }
    }

    /// Create the complex type for a nested document and link it from `owner`
    fn add_document_property(
        &mut self,
        owner: TypeId,
        owner_name: &str,
        name: &str,
        document: &Document,
        is_collection: bool,
    ) {
        let child_name =
            qualified_type_name(owner_name, name, self.config.use_global_complex_type_names);
        let child = self.add_document_type(&child_name, Some(document), ResourceTypeKind::Complex);

        let registry = &mut self.state.registry;
        if is_collection && registry.property(owner, name).is_none() {
            registry.add_collection_property(owner, name, CollectionElement::Complex(child));
        } else {
            registry.add_complex_property(owner, name, child);
        }
    }

    /// Merge a nested document observed under `owner.name`
    fn register_document_properties(&mut self, owner: TypeId, name: &str, document: &Document) {
        let Some(owner_name) = self.type_name(owner) else {
            return;
        };
        let child_name =
            qualified_type_name(&owner_name, name, self.config.use_global_complex_type_names);
        let child = self
            .state
            .registry
            .find_type(&child_name, ResourceTypeKind::Complex);

        match child {
            None => self.add_document_property(owner, &owner_name, name, document, true),
            Some(child) => {
                if self.state.registry.property(owner, name).is_none() {
                    self.state.registry.add_collection_property(
                        owner,
                        name,
                        CollectionElement::Complex(child),
                    );
                }
                for field in document {
                    self.register_document_property(child, field);
                }
            }
        }
    }

    /// Register or merge an array-valued field.
    ///
    /// Document elements build a collection of a complex type; scalar
    /// elements are unified into one primitive element type. Nulls are
    /// ignored and nested arrays are not supported.
    fn register_array_property(&mut self, owner: TypeId, field: &DocumentField) {
        let Some(items) = field.value.as_array() else {
            return;
        };
        let name = resource_property_name(&field.name, self.type_kind(owner));
        let existing = self
            .state
            .registry
            .property(owner, &name)
            .map(|p| p.property_type);

        let mut element: Option<PrimitiveType> = None;
        let mut nested_arrays = false;
        for item in items {
            match item {
                DocumentValue::Document(document) => match existing {
                    None | Some(PropertyType::Collection(CollectionElement::Complex(_))) => {
                        self.register_document_properties(owner, &name, document)
                    }
                    _ => {}
                },
                DocumentValue::Array(_) => nested_arrays = true,
                scalar if existing.is_none() => {
                    if let ValueClass::Scalar(s) = classify(scalar, false) {
                        element = Some(match element {
                            Some(current) => current.unify(s.primitive),
                            None => s.primitive,
                        });
                    }
                }
                _ => {}
            }
        }

        if nested_arrays {
            warn!(field = %field.name, "Arrays of arrays are not supported, skipping elements");
        }
        if let Some(primitive) = element {
            if self.state.registry.property(owner, &name).is_none() {
                self.state.registry.add_collection_property(
                    owner,
                    &name,
                    CollectionElement::Primitive(ScalarType::required(primitive)),
                );
            }
        }
    }
}

fn is_key_position(kind: ResourceTypeKind, field: &DocumentField) -> bool {
    kind == ResourceTypeKind::Entity && is_native_id(&field.name)
}

/// Classify a field within a type; a key must be a scalar
fn key_class(kind: ResourceTypeKind, field: &DocumentField) -> ValueClass {
    let in_key_position = is_key_position(kind, field);
    match classify(&field.value, in_key_position) {
        ValueClass::Scalar(scalar) => ValueClass::Scalar(scalar),
        _ if in_key_position => ValueClass::Unresolved,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchPosition;
    use crate::error::SourceError;
    use crate::registry::ResourceType;
    use crate::source::{InMemorySource, ScanOrder};
    use crate::value::ObjectId;

    fn state() -> MetadataState {
        MetadataState::new("DocumentContext", "Test")
    }

    fn full_scan() -> MetadataConfig {
        MetadataConfig::builder().full_scan().build()
    }

    fn entity<'s>(state: &'s MetadataState, name: &str) -> &'s ResourceType {
        state
            .registry
            .resolve_resource_type(&format!("Test.{}", name))
            .unwrap()
    }

    fn json_source(value: serde_json::Value) -> InMemorySource {
        InMemorySource::from_json(&value).unwrap()
    }

    #[test]
    fn test_native_id_becomes_mapped_key() {
        let source = json_source(serde_json::json!({
            "Products": [{"_id": {"$oid": "507f1f77bcf86cd799439011"}, "Name": "Bread"}]
        }));
        let mut state = state();
        SchemaInferrer::new(&full_scan(), &mut state)
            .populate(&source)
            .unwrap();

        let products = entity(&state, "Products");
        assert_eq!(products.property_names(), vec!["db_id", "Name"]);
        let key = products.key_property().unwrap();
        assert_eq!(key.name, "db_id");
        assert_eq!(
            key.property_type.scalar(),
            Some(ScalarType::required(PrimitiveType::String))
        );
        assert_eq!(
            state.provider_types.get("Products", "_id"),
            Some(ProviderType::scalar(ScalarType::required(PrimitiveType::ObjectId)))
        );
        assert_eq!(
            state.generated_types.get("Products").unwrap().field_for("db_id"),
            Some("_id")
        );
    }

    #[test]
    fn test_missing_id_synthesizes_key() {
        let source = json_source(serde_json::json!({"Notes": [{"text": "hello"}]}));
        let mut state = state();
        SchemaInferrer::new(&full_scan(), &mut state)
            .populate(&source)
            .unwrap();

        let notes = entity(&state, "Notes");
        assert_eq!(notes.key_count(), 1);
        assert_eq!(notes.key_property().unwrap().name, "db_id");
        assert_eq!(
            state.provider_types.get("Notes", "_id"),
            Some(ProviderType::scalar(ScalarType::required(PrimitiveType::ObjectId)))
        );
    }

    #[test]
    fn test_null_id_still_gets_single_key() {
        let source = json_source(serde_json::json!({
            "Notes": [{"_id": null, "text": "a"}, {"_id": {"$oid": "507f1f77bcf86cd799439011"}}]
        }));
        let mut state = state();
        SchemaInferrer::new(&full_scan(), &mut state)
            .populate(&source)
            .unwrap();

        let notes = entity(&state, "Notes");
        assert_eq!(notes.key_count(), 1);
        assert_eq!(notes.property_names(), vec!["text", "db_id"]);
    }

    #[test]
    fn test_non_object_id_key_keeps_its_type() {
        let source = json_source(serde_json::json!({"Orders": [{"_id": 42}]}));
        let mut state = state();
        SchemaInferrer::new(&full_scan(), &mut state)
            .populate(&source)
            .unwrap();

        let key = entity(&state, "Orders").key_property().unwrap().clone();
        assert_eq!(
            key.property_type.scalar(),
            Some(ScalarType::required(PrimitiveType::Int32))
        );
    }

    #[test]
    fn test_leading_underscore_fields_are_prefixed() {
        let source = json_source(serde_json::json!({"Docs": [{"_rev": "1-a"}]}));
        let mut state = state();
        SchemaInferrer::new(&full_scan(), &mut state)
            .populate(&source)
            .unwrap();

        assert!(entity(&state, "Docs").property("x_rev").is_some());
        assert_eq!(
            state.generated_types.get("Docs").unwrap().field_for("x_rev"),
            Some("_rev")
        );
    }

    #[test]
    fn test_first_typed_observation_wins() {
        let source = json_source(serde_json::json!({
            "Readings": [{"value": 1}, {"value": "high"}]
        }));
        let mut state = state();
        SchemaInferrer::new(&full_scan(), &mut state)
            .populate(&source)
            .unwrap();

        let value = entity(&state, "Readings").property("value").unwrap();
        assert_eq!(
            value.property_type.scalar(),
            Some(ScalarType::optional(PrimitiveType::Int32))
        );
    }

    #[test]
    fn test_null_field_resolved_later() {
        let source = json_source(serde_json::json!({
            "Products": [{"DiscontinueDate": null}, {"DiscontinueDate": {"$date": "2024-01-01T00:00:00Z"}}]
        }));
        let mut state = state();
        let stats = SchemaInferrer::new(&full_scan(), &mut state)
            .populate(&source)
            .unwrap();

        let prop = entity(&state, "Products").property("DiscontinueDate").unwrap();
        assert_eq!(
            prop.property_type.scalar(),
            Some(ScalarType::optional(PrimitiveType::DateTime))
        );
        assert_eq!(stats.properties_defaulted, 0);
    }

    #[test]
    fn test_always_null_and_empty_array_default_to_text() {
        let source = json_source(serde_json::json!({
            "Categories": [{"Name": "Food", "Products": null, "Tags": []}]
        }));
        let mut state = state();
        let stats = SchemaInferrer::new(&full_scan(), &mut state)
            .populate(&source)
            .unwrap();

        let categories = entity(&state, "Categories");
        for name in ["Products", "Tags"] {
            let prop = categories.property(name).unwrap();
            assert_eq!(prop.kind, crate::registry::PropertyKind::Primitive);
            assert_eq!(prop.property_type.scalar(), Some(ScalarType::text()));
        }
        assert_eq!(stats.properties_defaulted, 2);
        assert_eq!(
            state.provider_types.get("Categories", "Tags"),
            Some(ProviderType::scalar(ScalarType::text()))
        );
    }

    #[test]
    fn test_nested_document_creates_complex_type() {
        let source = json_source(serde_json::json!({
            "Products": [
                {"Quantity": {"Value": 12.0, "Units": "pieces"}},
                {"Quantity": {"Value": 4.0, "Units": "liters", "Packaging": "bottle"}}
            ]
        }));
        let mut state = state();
        SchemaInferrer::new(&full_scan(), &mut state)
            .populate(&source)
            .unwrap();

        let products = entity(&state, "Products");
        let quantity = products.property("Quantity").unwrap();
        assert!(quantity.is_complex());

        let child = state
            .registry
            .resource_type(quantity.property_type.complex_type().unwrap())
            .unwrap();
        assert_eq!(child.name, "Products__Quantity");
        assert_eq!(child.key_count(), 0);
        assert_eq!(child.property_names(), vec!["Value", "Units", "Packaging"]);
        assert_eq!(state.registry.complex_types().count(), 1);
    }

    #[test]
    fn test_array_of_documents_is_complex_collection() {
        let source = json_source(serde_json::json!({
            "Products": [{
                "Supplier": {
                    "Name": "City Bakery",
                    "Addresses": [
                        {"Type": 0, "Lines": ["P.O.Box 89", "123456 City"]},
                        {"Type": 1, "Zip": "654321"}
                    ]
                }
            }]
        }));
        let mut state = state();
        SchemaInferrer::new(&full_scan(), &mut state)
            .populate(&source)
            .unwrap();

        let supplier = state
            .registry
            .resolve_resource_type("Test.Products__Supplier")
            .unwrap();
        let addresses = supplier.property("Addresses").unwrap();
        assert!(addresses.is_collection());

        let address = state
            .registry
            .resolve_resource_type("Test.Products__Supplier__Addresses")
            .unwrap();
        assert_eq!(address.property_names(), vec!["Type", "Lines", "Zip"]);
        assert_eq!(
            address.property("Lines").unwrap().property_type,
            PropertyType::Collection(CollectionElement::Primitive(ScalarType::required(
                PrimitiveType::String
            )))
        );
    }

    #[test]
    fn test_array_element_types_are_unified() {
        let source = json_source(serde_json::json!({
            "Series": [{"points": [1, null, 5000000000i64, 2.5]}]
        }));
        let mut state = state();
        SchemaInferrer::new(&full_scan(), &mut state)
            .populate(&source)
            .unwrap();

        assert_eq!(
            entity(&state, "Series").property("points").unwrap().property_type,
            PropertyType::Collection(CollectionElement::Primitive(ScalarType::required(
                PrimitiveType::Double
            )))
        );
    }

    #[test]
    fn test_array_of_arrays_is_defaulted() {
        let source = json_source(serde_json::json!({"Grid": [{"cells": [[1, 2], [3]]}]}));
        let mut state = state();
        SchemaInferrer::new(&full_scan(), &mut state)
            .populate(&source)
            .unwrap();

        let cells = entity(&state, "Grid").property("cells").unwrap();
        assert_eq!(cells.property_type, PropertyType::Primitive(ScalarType::text()));
    }

    #[test]
    fn test_global_complex_type_names() {
        let source = json_source(serde_json::json!({
            "Orders": [{"Address": {"Street": "Main"}}],
            "Customers": [{"Address": {"City": "Oslo"}}]
        }));
        let config = MetadataConfig::builder()
            .full_scan()
            .use_global_complex_type_names(true)
            .build();
        let mut state = state();
        SchemaInferrer::new(&config, &mut state)
            .populate(&source)
            .unwrap();

        let address = state.registry.resolve_resource_type("Test.Address").unwrap();
        assert_eq!(address.property_names(), vec!["Street", "City"]);
        assert_eq!(state.registry.complex_types().count(), 1);
    }

    #[test]
    fn test_collection_named_like_global_complex_type() {
        let source = json_source(serde_json::json!({
            "Orders": [{"Address": {"Street": "Main"}}],
            "Address": [{"_id": 7, "City": "Oslo"}]
        }));
        let config = MetadataConfig::builder()
            .full_scan()
            .use_global_complex_type_names(true)
            .build();
        let mut state = state();
        SchemaInferrer::new(&config, &mut state)
            .populate(&source)
            .unwrap();

        let set = state.registry.resolve_resource_set("Address").unwrap();
        let entity = state.registry.set_type(set).unwrap();
        assert!(entity.is_entity());
        assert_eq!(entity.name, "Address");
        assert_eq!(entity.property_names(), vec!["db_id", "City"]);
        assert_eq!(entity.key_count(), 1);

        let complex = state
            .registry
            .resolve_resource_type("Test.Address__1")
            .unwrap();
        assert!(!complex.is_entity());
        assert_eq!(complex.property_names(), vec!["Street"]);
        let orders = self::entity(&state, "Orders");
        assert_eq!(
            orders.property("Address").unwrap().property_type.complex_type(),
            Some(complex.id)
        );

        assert_eq!(
            state.generated_types.get("Address__1").unwrap().field_for("Street"),
            Some("Street")
        );
        assert!(state.generated_types.get("Address").unwrap().field_for("Street").is_none());
        assert!(state.provider_types.get("Address__1", "Street").is_some());
        assert!(state.provider_types.get("Address", "_id").is_some());
        assert!(state.provider_types.get("Address", "Street").is_none());
    }

    #[test]
    fn test_structure_only_registers_sets() {
        let source = json_source(serde_json::json!({
            "Products": [{"Name": "Bread"}],
            "Empty": []
        }));
        let config = MetadataConfig::builder().sample_size(0).build();
        let mut state = state();
        SchemaInferrer::new(&config, &mut state)
            .populate(&source)
            .unwrap();

        for name in ["Products", "Empty"] {
            assert!(state.registry.resolve_resource_set(name).is_some());
            assert_eq!(entity(&state, name).property_names(), vec!["db_id"]);
        }
        assert_eq!(source.total_documents_read(), 0);
    }

    #[test]
    fn test_empty_collection_has_no_set_when_sampling() {
        let source = json_source(serde_json::json!({"Empty": []}));
        let mut state = state();
        SchemaInferrer::new(&full_scan(), &mut state)
            .populate(&source)
            .unwrap();
        assert!(state.registry.resolve_resource_set("Empty").is_none());
    }

    #[test]
    fn test_system_collections_are_ignored() {
        let source = json_source(serde_json::json!({
            "system.indexes": [{"ns": "x"}],
            "Products": [{"Name": "Bread"}]
        }));
        let mut state = state();
        SchemaInferrer::new(&full_scan(), &mut state)
            .populate(&source)
            .unwrap();
        assert!(state.registry.resolve_resource_set("system.indexes").is_none());
        assert_eq!(source.documents_read("system.indexes"), 0);
    }

    #[test]
    fn test_fetch_position_end_samples_latest() {
        let source = json_source(serde_json::json!({
            "Events": [{"old": 1}, {"new": 2}]
        }));
        let config = MetadataConfig::builder()
            .sample_size(1)
            .fetch_position(FetchPosition::End)
            .build();
        let mut state = state();
        SchemaInferrer::new(&config, &mut state)
            .populate(&source)
            .unwrap();

        let events = entity(&state, "Events");
        assert!(events.property("new").is_some());
        assert!(events.property("old").is_none());
    }

    struct FlakySource;

    impl DocumentSource for FlakySource {
        fn list_collections(&self) -> Result<Vec<String>, SourceError> {
            Ok(vec!["Broken".into(), "Partial".into()])
        }

        fn scan(
            &self,
            collection: &str,
            _order: ScanOrder,
            _limit: Option<usize>,
        ) -> Result<DocumentStream<'_>, SourceError> {
            if collection == "Broken" {
                return Err(SourceError::CollectionNotFound(collection.into()));
            }
            let oid = ObjectId::parse_hex("507f1f77bcf86cd799439011").unwrap();
            let docs = vec![
                Err(SourceError::Read {
                    collection: collection.into(),
                    reason: "corrupt".into(),
                }),
                Ok(Document::new()
                    .with("_id", DocumentValue::ObjectId(oid))
                    .with("ok", DocumentValue::Bool(true))),
            ];
            Ok(Box::new(docs.into_iter()))
        }
    }

    #[test]
    fn test_failures_do_not_abort_the_pass() {
        let mut state = state();
        let stats = SchemaInferrer::new(&full_scan(), &mut state)
            .populate(&FlakySource)
            .unwrap();

        assert_eq!(stats.collections_skipped, 1);
        assert_eq!(stats.documents_skipped, 1);
        assert_eq!(stats.documents_examined, 1);
        assert!(entity(&state, "Partial").property("ok").is_some());
    }

    struct UnreachableSource;

    impl DocumentSource for UnreachableSource {
        fn list_collections(&self) -> Result<Vec<String>, SourceError> {
            Err(SourceError::ListCollections("connection refused".into()))
        }

        fn scan(
            &self,
            _collection: &str,
            _order: ScanOrder,
            _limit: Option<usize>,
        ) -> Result<DocumentStream<'_>, SourceError> {
            Ok(Box::new(std::iter::empty()))
        }
    }

    #[test]
    fn test_listing_failure_is_reported() {
        let mut state = state();
        let err = SchemaInferrer::new(&full_scan(), &mut state)
            .populate(&UnreachableSource)
            .unwrap_err();
        assert!(matches!(err, MetadataError::Source(SourceError::ListCollections(_))));
        assert!(state.registry.is_empty());
    }

    #[test]
    fn test_stats_count_new_work_only() {
        let source = json_source(serde_json::json!({"Products": [{"Name": "Bread"}]}));
        let config = full_scan();
        let mut state = state();

        let first = SchemaInferrer::new(&config, &mut state)
            .populate(&source)
            .unwrap();
        assert_eq!(first.types_created, 1);
        assert_eq!(first.properties_added, 2);

        let second = SchemaInferrer::new(&config, &mut state)
            .populate(&source)
            .unwrap();
        assert_eq!(second.types_created, 0);
        assert_eq!(second.properties_added, 0);
        assert_eq!(second.documents_examined, 1);
    }
}
