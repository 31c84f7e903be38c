//! Bookkeeping for properties whose type is not yet known

use std::collections::BTreeMap;

use crate::registry::TypeId;

/// A property observed only with values that could not be classified
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnresolvedProperty {
    pub resource_type: TypeId,
    pub property_name: String,
}

impl UnresolvedProperty {
    pub fn new(resource_type: TypeId, property_name: impl Into<String>) -> Self {
        Self {
            resource_type,
            property_name: property_name.into(),
        }
    }
}

/// Set of unresolved properties, each remembering its native field name
#[derive(Debug, Clone, Default)]
pub struct UnresolvedTracker {
    entries: BTreeMap<UnresolvedProperty, String>,
}

impl UnresolvedTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation of a property that does not exist yet.
    ///
    /// An unresolvable observation starts tracking the pair; a resolving
    /// observation stops it.
    pub fn observe(&mut self, property: UnresolvedProperty, field_name: &str, resolved: bool) {
        if resolved {
            self.entries.remove(&property);
        } else {
            self.entries
                .entry(property)
                .or_insert_with(|| field_name.to_string());
        }
    }

    pub fn contains(&self, property: &UnresolvedProperty) -> bool {
        self.entries.contains_key(property)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take every still-unresolved pair, ordered by type then name
    pub fn drain(&mut self) -> Vec<(UnresolvedProperty, String)> {
        std::mem::take(&mut self.entries).into_iter().collect()
    }
}
