//! Naming rules shared by the inference engine and its consumers

use crate::registry::ResourceTypeKind;

/// Native identifier field name in stored documents
pub const PROVIDER_ID_NAME: &str = "_id";

/// External name under which the native identifier is exposed
pub const MAPPED_ID_NAME: &str = "db_id";

/// Separator between owner and field in complex type names
pub const WORD_SEPARATOR: &str = "__";

/// Prefix applied to names whose leading character is invalid externally
pub const PREFIX_FOR_INVALID_LEADING_CHAR: &str = "x";

/// Collections with this prefix are internal to the store
pub const SYSTEM_COLLECTION_PREFIX: &str = "system.";

pub fn is_native_id(field_name: &str) -> bool {
    field_name == PROVIDER_ID_NAME
}

pub fn is_system_collection(name: &str) -> bool {
    name.starts_with(SYSTEM_COLLECTION_PREFIX)
}

/// External property name for a document field within a type of `kind`
pub fn resource_property_name(field_name: &str, kind: ResourceTypeKind) -> String {
    if is_native_id(field_name) && kind == ResourceTypeKind::Entity {
        MAPPED_ID_NAME.to_string()
    } else {
        normalize_property_name(field_name)
    }
}

pub fn normalize_property_name(name: &str) -> String {
    let name = name.trim();
    if name.starts_with('_') {
        format!("{}{}", PREFIX_FOR_INVALID_LEADING_CHAR, name)
    } else {
        name.to_string()
    }
}

/// Name of the complex type holding `property` of `owner`
pub fn qualified_type_name(owner: &str, property: &str, global_names: bool) -> String {
    if global_names {
        property.to_string()
    } else {
        format!("{}{}{}", owner, WORD_SEPARATOR, property)
    }
}

/// `type.property` key used by the provider and generated type maps
pub fn qualified_property_name(type_name: &str, property: &str) -> String {
    format!("{}.{}", type_name, property)
}
