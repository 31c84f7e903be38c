//! Schema inference for schemaless document collections
//!
//! Walks sampled documents and merges what it observes into a
//! [`TypeRegistry`](crate::registry::TypeRegistry):
//!
//! - **Entity types** - one per collection, always with exactly one key
//! - **Complex types** - one per nested document shape, merged across documents
//! - **Collection properties** - arrays of scalars or of nested documents
//! - **Unresolved properties** - fields only ever seen null or empty, defaulted
//!   to text at the end of a pass
//!
//! ## Example
//!
//! ```rust,ignore
//! use docstore_metadata::cache::MetadataState;
//! use docstore_metadata::config::MetadataConfig;
//! use docstore_metadata::inference::SchemaInferrer;
//!
//! let config = MetadataConfig::builder().full_scan().build();
//! let mut state = MetadataState::new(&config.container_name, &config.namespace);
//! let stats = SchemaInferrer::new(&config, &mut state).populate(&source)?;
//! println!("{} types", state.registry.type_count());
//! ```

mod inferrer;

pub use inferrer::{InferenceStats, SchemaInferrer};
