//! Typesense connector configuration

use std::env;

use anyvec_core::{Error, FieldSpec, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// What to do with a metadata key that is not declared in the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnknownKeyAction {
    /// Silently drop the key from the stored record
    Drop,
    /// Reject the document with `Error::InvalidInput`
    Reject,
}

/// How metadata fields are declared in the backend collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataPolicy {
    /// Provision the `.*: auto` catch-all; any metadata key is accepted
    Dynamic,
    /// Only the listed fields exist; unknown keys follow `unknown`
    Declared {
        fields: Vec<FieldSpec>,
        unknown: UnknownKeyAction,
    },
}

/// Configuration for the Typesense vector store
///
/// Validated at construction time; an invalid dimension or batch size fails
/// fast rather than surfacing mid-ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypesenseConfig {
    pub base_url: String,
    pub api_key: String,
    pub collection_name: String,
    pub initialize_schema: bool,
    pub embedding_dimension: usize,
    pub batch_size: usize,
    pub metadata: MetadataPolicy,
}

impl TypesenseConfig {
    pub const DEFAULT_COLLECTION: &'static str = "vector_store";
    pub const DEFAULT_DIMENSION: usize = 1536;
    pub const DEFAULT_BATCH_SIZE: usize = 100;

    /// Create a configuration with documented defaults
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            collection_name: Self::DEFAULT_COLLECTION.to_string(),
            initialize_schema: false,
            embedding_dimension: Self::DEFAULT_DIMENSION,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            metadata: MetadataPolicy::Dynamic,
        }
    }

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let base_url = env::var("TYPESENSE_URL").map_err(|_| {
            Error::Configuration("TYPESENSE_URL environment variable not found".to_string())
        })?;

        let api_key = env::var("TYPESENSE_API_KEY").map_err(|_| {
            Error::Configuration("TYPESENSE_API_KEY environment variable not found".to_string())
        })?;

        let mut config = Self::new(base_url, api_key);

        if let Ok(name) = env::var("TYPESENSE_COLLECTION") {
            config.collection_name = name;
        }
        if let Ok(flag) = env::var("TYPESENSE_INITIALIZE_SCHEMA") {
            config.initialize_schema = flag == "true" || flag == "1";
        }
        if let Ok(dim) = env::var("TYPESENSE_EMBEDDING_DIMENSION") {
            config.embedding_dimension = dim.parse().map_err(|_| {
                Error::Configuration(format!("invalid TYPESENSE_EMBEDDING_DIMENSION: {}", dim))
            })?;
        }
        if let Ok(size) = env::var("TYPESENSE_BATCH_SIZE") {
            config.batch_size = size.parse().map_err(|_| {
                Error::Configuration(format!("invalid TYPESENSE_BATCH_SIZE: {}", size))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_collection_name(mut self, name: impl Into<String>) -> Self {
        self.collection_name = name.into();
        self
    }

    pub fn with_initialize_schema(mut self, initialize: bool) -> Self {
        self.initialize_schema = initialize;
        self
    }

    pub fn with_embedding_dimension(mut self, dimension: usize) -> Self {
        self.embedding_dimension = dimension;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_metadata_policy(mut self, policy: MetadataPolicy) -> Self {
        self.metadata = policy;
        self
    }

    /// Validate the configuration, failing fast on unusable values
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.base_url)
            .map_err(|e| Error::Configuration(format!("invalid base URL '{}': {}", self.base_url, e)))?;

        if self.collection_name.is_empty() {
            return Err(Error::Configuration("collection name must not be empty".into()));
        }
        if self.embedding_dimension == 0 {
            return Err(Error::Configuration("embedding dimension must be > 0".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::Configuration("batch size must be > 0".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TypesenseConfig::new("http://localhost:8108", "xyz");
        assert_eq!(config.collection_name, "vector_store");
        assert_eq!(config.embedding_dimension, 1536);
        assert_eq!(config.batch_size, 100);
        assert!(!config.initialize_schema);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = TypesenseConfig::new("http://localhost:8108", "xyz").with_batch_size(0);
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        let config =
            TypesenseConfig::new("http://localhost:8108", "xyz").with_embedding_dimension(0);
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        let config = TypesenseConfig::new("not a url", "xyz");
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }
}
