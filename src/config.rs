//! Configuration for metadata inference

use serde::{Deserialize, Serialize};

use crate::error::MetadataError;

/// Which end of a collection's natural order documents are sampled from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchPosition {
    /// Oldest documents first
    #[default]
    Start,
    /// Most recent documents first
    End,
}

/// Metadata build strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataConfig {
    /// Documents examined per collection.
    /// `0` registers resource sets only, a negative value scans everything.
    pub sample_size: i64,

    /// Where in the natural order sampling starts
    pub fetch_position: FetchPosition,

    /// Name complex types by field name only instead of prefixing the owner
    pub use_global_complex_type_names: bool,

    /// Re-run inference on every open and merge into the cached registry
    pub update_dynamically: bool,

    /// Namespace qualifying every resource type name
    pub namespace: String,

    /// Entity container name used in the metadata document
    pub container_name: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            sample_size: 100,
            fetch_position: FetchPosition::Start,
            use_global_complex_type_names: false,
            update_dynamically: false,
            namespace: "DocumentStore".to_string(),
            container_name: "DocumentContext".to_string(),
        }
    }
}

impl MetadataConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for custom configuration
    pub fn builder() -> MetadataConfigBuilder {
        MetadataConfigBuilder::default()
    }

    /// Parse a YAML configuration fragment; missing keys take their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self, MetadataError> {
        serde_yaml::from_str(yaml).map_err(|e| MetadataError::InvalidConfig(e.to_string()))
    }

    /// Parse a JSON configuration fragment; missing keys take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, MetadataError> {
        serde_json::from_str(json).map_err(|e| MetadataError::InvalidConfig(e.to_string()))
    }

    /// Maximum documents to read per collection, `None` for the whole collection
    pub fn scan_limit(&self) -> Option<usize> {
        if self.sample_size < 0 {
            None
        } else {
            Some(self.sample_size as usize)
        }
    }

    /// Whether only resource-set existence is recorded
    pub fn is_structure_only(&self) -> bool {
        self.sample_size == 0
    }
}

/// Builder for MetadataConfig
#[derive(Debug, Default)]
pub struct MetadataConfigBuilder {
    config: MetadataConfig,
}

impl MetadataConfigBuilder {
    /// Set the per-collection sample size (0 = sets only, negative = all)
    pub fn sample_size(mut self, size: i64) -> Self {
        self.config.sample_size = size;
        self
    }

    /// Scan every document of every collection
    pub fn full_scan(mut self) -> Self {
        self.config.sample_size = -1;
        self
    }

    /// Set where sampling starts
    pub fn fetch_position(mut self, position: FetchPosition) -> Self {
        self.config.fetch_position = position;
        self
    }

    /// Share complex type names across owners
    pub fn use_global_complex_type_names(mut self, global: bool) -> Self {
        self.config.use_global_complex_type_names = global;
        self
    }

    /// Re-infer on every open
    pub fn update_dynamically(mut self, update: bool) -> Self {
        self.config.update_dynamically = update;
        self
    }

    /// Set the type namespace
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    /// Set the container name
    pub fn container_name(mut self, name: impl Into<String>) -> Self {
        self.config.container_name = name.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> MetadataConfig {
        self.config
    }
}
