//! Service metadata document rendering

use serde_json::{Value, json};

use super::{CollectionElement, PropertyType, ResourceProperty, ResourceType, TypeRegistry};

impl TypeRegistry {
    /// Render the registry as a JSON metadata document for protocol clients
    pub fn to_metadata_document(&self) -> Value {
        let entity_sets: Vec<Value> = self
            .resource_sets()
            .map(|set| {
                json!({
                    "name": set.name,
                    "entityType": self
                        .set_type(set)
                        .map(ResourceType::full_name)
                        .unwrap_or_default(),
                })
            })
            .collect();

        json!({
            "namespace": self.namespace(),
            "entityContainer": {
                "name": self.container_name(),
                "entitySets": entity_sets,
            },
            "entityTypes": self.entity_types().map(|t| self.type_document(t)).collect::<Vec<_>>(),
            "complexTypes": self.complex_types().map(|t| self.type_document(t)).collect::<Vec<_>>(),
        })
    }

    fn type_document(&self, resource_type: &ResourceType) -> Value {
        let properties: Vec<Value> = resource_type
            .properties
            .iter()
            .map(|p| self.property_document(p))
            .collect();

        let mut doc = json!({
            "name": resource_type.name,
            "properties": properties,
        });
        if resource_type.is_entity() {
            let keys: Vec<&str> = resource_type
                .properties
                .iter()
                .filter(|p| p.is_key())
                .map(|p| p.name.as_str())
                .collect();
            doc["key"] = json!(keys);
        }
        doc
    }

    fn property_document(&self, property: &ResourceProperty) -> Value {
        let (type_name, nullable) = match &property.property_type {
            PropertyType::Primitive(scalar) => {
                (scalar.primitive.type_name().to_string(), scalar.optional)
            }
            PropertyType::Complex(id) => (self.type_reference(*id), true),
            PropertyType::Collection(CollectionElement::Primitive(scalar)) => (
                format!("Collection({})", scalar.primitive.type_name()),
                false,
            ),
            PropertyType::Collection(CollectionElement::Complex(id)) => {
                (format!("Collection({})", self.type_reference(*id)), false)
            }
        };

        json!({
            "name": property.name,
            "type": type_name,
            "nullable": nullable,
        })
    }

    fn type_reference(&self, id: super::TypeId) -> String {
        self.resource_type(id)
            .map(ResourceType::full_name)
            .unwrap_or_default()
    }
}
