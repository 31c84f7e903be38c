//! Docstore Metadata - typed resource models for schemaless document stores
//!
//! Provides:
//! - Schema inference over sampled documents (entity types, complex types, keys)
//! - Tracking and defaulting of properties whose type is not yet known
//! - A process-wide metadata cache keyed by data source
//! - The document source boundary and an in-memory implementation
//! - Service metadata documents for protocol clients

pub mod cache;
pub mod config;
pub mod error;
pub mod inference;
pub mod naming;
pub mod registry;
pub mod resolver;
pub mod source;
pub mod unresolved;
pub mod value;

// Re-export commonly used types
pub use cache::{GeneratedType, Metadata, MetadataCache, MetadataEntry, MetadataState};
pub use config::{FetchPosition, MetadataConfig, MetadataConfigBuilder};
pub use error::{MetadataError, SourceError};
pub use inference::{InferenceStats, SchemaInferrer};
pub use registry::{
    CollectionElement, PropertyKind, PropertyType, ResourceProperty, ResourceSet, ResourceType,
    ResourceTypeKind, TypeId, TypeRegistry,
};
pub use resolver::{PrimitiveType, ProviderType, ScalarType, ValueClass, classify};
pub use source::{DataSourceAddress, DocumentSource, DocumentStream, InMemorySource, ScanOrder};
pub use value::{Document, DocumentField, DocumentValue, ObjectId};
