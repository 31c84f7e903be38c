//! Process-wide metadata cache
//!
//! One [`MetadataEntry`] per data source, keyed by connection string. The
//! cache map is guarded by a single mutex that is held only to create or
//! fetch an entry; inference then runs under the entry's own write lock, so
//! lookups on other sources are never blocked by a running pass.
//!
//! Consumers never see the cached registry itself: every read hands out an
//! owned copy.
//!
//! Lifecycle: [`MetadataCache::global`] is initialized on first use and lives
//! for the process. [`MetadataCache::invalidate_all`] resets it, which forces
//! re-inference on the next open (tests, schema-affecting config changes).

mod state;

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, info};

pub use state::{
    GeneratedMember, GeneratedType, GeneratedTypeMap, MetadataState, ProviderTypeMap,
};

use crate::config::MetadataConfig;
use crate::error::MetadataError;
use crate::inference::{InferenceStats, SchemaInferrer};
use crate::naming::{qualified_type_name, resource_property_name};
use crate::registry::{
    ResourceProperty, ResourceSet, ResourceType, ResourceTypeKind, TypeRegistry,
};
use crate::resolver::ProviderType;
use crate::source::{DataSourceAddress, DocumentSource};
use crate::value::{Document, DocumentField};

static GLOBAL_CACHE: Lazy<MetadataCache> = Lazy::new(MetadataCache::new);

#[derive(Debug)]
struct EntryInner {
    state: MetadataState,
    passes: usize,
}

/// Cached metadata of one data source
#[derive(Debug)]
pub struct MetadataEntry {
    inner: RwLock<EntryInner>,
}

impl MetadataEntry {
    fn new(config: &MetadataConfig) -> Self {
        Self {
            inner: RwLock::new(EntryInner {
                state: MetadataState::new(&config.container_name, &config.namespace),
                passes: 0,
            }),
        }
    }

    /// Run an inference pass unless one already completed.
    ///
    /// With `force`, a pass always runs and merges into the existing state.
    /// Concurrent callers serialize on the entry lock, so an unpopulated
    /// source is inferred once. Returns `None` when no pass was needed.
    pub fn ensure_populated(
        &self,
        source: &dyn DocumentSource,
        config: &MetadataConfig,
        force: bool,
    ) -> Result<Option<InferenceStats>, MetadataError> {
        let mut inner = self.inner.write();
        if inner.passes > 0 && !force {
            return Ok(None);
        }
        let stats = SchemaInferrer::new(config, &mut inner.state).populate(source)?;
        inner.passes += 1;
        Ok(Some(stats))
    }

    /// Merge documents observed outside a pass (e.g. rows read by a query)
    pub fn observe_documents<'d>(
        &self,
        collection: &str,
        documents: impl IntoIterator<Item = &'d Document>,
        config: &MetadataConfig,
    ) -> InferenceStats {
        let mut inner = self.inner.write();
        let mut inferrer = SchemaInferrer::new(config, &mut inner.state);
        for document in documents {
            inferrer.observe_document(collection, document);
        }
        inferrer.finish()
    }

    /// Completed inference passes
    pub fn passes(&self) -> usize {
        self.inner.read().passes
    }

    /// Run `f` against the cached state under the read lock
    pub fn read<R>(&self, f: impl FnOnce(&MetadataState) -> R) -> R {
        f(&self.inner.read().state)
    }

    /// Independent copy of the whole state
    pub fn snapshot(&self) -> MetadataState {
        self.read(MetadataState::clone)
    }

    /// Independent copy of the type registry
    pub fn clone_registry(&self) -> TypeRegistry {
        self.read(|state| state.registry.clone())
    }
}

/// Map of data-source identity to cached metadata
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: Mutex<HashMap<String, Arc<MetadataEntry>>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache, created on first use
    pub fn global() -> &'static MetadataCache {
        &GLOBAL_CACHE
    }

    /// Fetch the entry for an already validated `source_id`, creating an empty one if needed
    pub fn entry(&self, source_id: &str, config: &MetadataConfig) -> Arc<MetadataEntry> {
        let mut entries = self.entries.lock();
        entries
            .entry(source_id.to_string())
            .or_insert_with(|| {
                debug!(source_id, "Creating metadata cache entry");
                Arc::new(MetadataEntry::new(config))
            })
            .clone()
    }

    pub fn get(&self, source_id: &str) -> Option<Arc<MetadataEntry>> {
        self.entries.lock().get(source_id).cloned()
    }

    /// Return the registry for a connection string, inferring it on first request.
    ///
    /// The address is validated before any entry is created.
    pub fn get_or_create(
        &self,
        connection_string: &str,
        source: &dyn DocumentSource,
        config: &MetadataConfig,
    ) -> Result<TypeRegistry, MetadataError> {
        let address = DataSourceAddress::parse(connection_string)?;
        let entry = self.entry(address.source_id(), config);
        entry.ensure_populated(source, config, false)?;
        Ok(entry.clone_registry())
    }

    /// Independent copy of a cached registry
    pub fn clone_registry(&self, source_id: &str) -> Option<TypeRegistry> {
        self.get(source_id).map(|entry| entry.clone_registry())
    }

    pub fn snapshot(&self, source_id: &str) -> Option<MetadataState> {
        self.get(source_id).map(|entry| entry.snapshot())
    }

    /// Drop one source; returns whether it was cached
    pub fn invalidate(&self, source_id: &str) -> bool {
        self.entries.lock().remove(source_id).is_some()
    }

    /// Drop every cached source
    pub fn invalidate_all(&self) {
        let mut entries = self.entries.lock();
        info!(sources = entries.len(), "Invalidating metadata cache");
        entries.clear();
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.entries.lock().contains_key(source_id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Metadata of one data source as seen by the query and protocol layers
#[derive(Debug, Clone)]
pub struct Metadata {
    address: DataSourceAddress,
    config: MetadataConfig,
    entry: Arc<MetadataEntry>,
}

impl Metadata {
    /// Open metadata for `connection_string`.
    ///
    /// The address is validated before anything else runs. Inference runs on
    /// first open of a source, and on every open when the configuration asks
    /// for dynamic updates.
    pub fn open(
        cache: &MetadataCache,
        connection_string: &str,
        source: &dyn DocumentSource,
        config: MetadataConfig,
    ) -> Result<Self, MetadataError> {
        let address = DataSourceAddress::parse(connection_string)?;
        let entry = cache.entry(address.source_id(), &config);
        if let Some(stats) = entry.ensure_populated(source, &config, config.update_dynamically)? {
            debug!(database = address.database(), ?stats, "Metadata populated");
        }
        Ok(Self {
            address,
            config,
            entry,
        })
    }

    pub fn address(&self) -> &DataSourceAddress {
        &self.address
    }

    pub fn config(&self) -> &MetadataConfig {
        &self.config
    }

    /// Look up a type by name, optionally as a complex type owned by `owner_prefix`
    pub fn resolve_resource_type(
        &self,
        name: &str,
        owner_prefix: Option<&str>,
    ) -> Option<ResourceType> {
        self.entry.read(|state| {
            let registry = &state.registry;
            match owner_prefix {
                Some(owner) if !owner.is_empty() => {
                    let qualified =
                        qualified_type_name(owner, name, self.config.use_global_complex_type_names);
                    registry
                        .find_type(&qualified, ResourceTypeKind::Complex)
                        .and_then(|id| registry.resource_type(id))
                        .cloned()
                }
                _ => registry
                    .resolve_resource_type(&registry.qualify(name))
                    .cloned(),
            }
        })
    }

    pub fn resolve_resource_set(&self, name: &str) -> Option<ResourceSet> {
        self.entry
            .read(|state| state.registry.resolve_resource_set(name).cloned())
    }

    /// Property of `resource_type` that a stored field maps to
    pub fn resolve_resource_property(
        &self,
        resource_type: &ResourceType,
        field: &DocumentField,
    ) -> Option<ResourceProperty> {
        let name = resource_property_name(&field.name, resource_type.kind);
        resource_type.property(&name).cloned()
    }

    /// Native type of `collection.field`; the native id is keyed as `_id`
    pub fn provider_type(&self, collection: &str, field: &str) -> Option<ProviderType> {
        self.entry
            .read(|state| state.provider_types.get(collection, field))
    }

    pub fn generated_type(&self, type_name: &str) -> Option<GeneratedType> {
        self.entry
            .read(|state| state.generated_types.get(type_name).cloned())
    }

    /// Independent copy of the registry for building protocol metadata
    pub fn clone_registry_snapshot(&self) -> TypeRegistry {
        self.entry.clone_registry()
    }

    pub fn snapshot(&self) -> MetadataState {
        self.entry.snapshot()
    }

    pub fn metadata_document(&self) -> Value {
        self.entry
            .read(|state| state.registry.to_metadata_document())
    }

    /// Merge rows read outside inference into the cached model
    pub fn observe_documents<'d>(
        &self,
        collection: &str,
        documents: impl IntoIterator<Item = &'d Document>,
    ) -> InferenceStats {
        self.entry
            .observe_documents(collection, documents, &self.config)
    }
}
