//! Collection schema provisioning

use anyvec_core::{CollectionSchema, Error, FieldSpec, FieldType, Result};
use tracing::{debug, info};

use crate::client::{CollectionClient, CreateOutcome};
use crate::config::{MetadataPolicy, TypesenseConfig};

/// Derives and provisions the backend collection schema
///
/// The provisioned collection always carries `id:string`, `content:string`
/// and `embedding:float[]` sized to the configured dimension; metadata fields
/// come either from the declared list or from Typesense's `.*` catch-all,
/// depending on the configured policy.
pub struct SchemaManager;

impl SchemaManager {
    /// The schema this configuration would provision
    pub fn desired_schema(config: &TypesenseConfig) -> CollectionSchema {
        let mut fields = vec![
            FieldSpec::new("id", FieldType::String),
            FieldSpec::new("content", FieldType::String),
        ];

        let dynamic_fields = match &config.metadata {
            MetadataPolicy::Dynamic => true,
            MetadataPolicy::Declared { fields: declared, .. } => {
                fields.extend(declared.iter().cloned());
                false
            }
        };

        fields.push(FieldSpec::new("embedding", FieldType::FloatVector));

        CollectionSchema {
            name: config.collection_name.clone(),
            fields,
            embedding_dimension: config.embedding_dimension,
            dynamic_fields,
        }
    }

    /// Ensure the collection exists, returning its schema
    ///
    /// Read-only when `initialize_schema` is disabled: an absent collection
    /// is `SchemaMissing`. With initialization enabled an absent collection
    /// is created; losing a creation race to a concurrent caller is treated
    /// as success. Idempotent: a second call returns the same schema without
    /// issuing another create. A dimension mismatch against an existing
    /// collection is fatal.
    pub async fn ensure_schema<C: CollectionClient + ?Sized>(
        client: &C,
        config: &TypesenseConfig,
    ) -> Result<CollectionSchema> {
        let name = &config.collection_name;

        if let Some(remote) = client.get_collection(name).await? {
            Self::check_compatible(&remote, config)?;
            debug!(collection = %name, "collection already provisioned");
            return Ok(remote);
        }

        if !config.initialize_schema {
            return Err(Error::SchemaMissing(format!(
                "collection '{}' does not exist and schema initialization is disabled",
                name
            )));
        }

        let desired = Self::desired_schema(config);
        match client.create_collection(&desired).await? {
            CreateOutcome::Created => {
                info!(
                    collection = %name,
                    dimension = desired.embedding_dimension,
                    "collection created"
                );
                Ok(desired)
            }
            CreateOutcome::AlreadyExists => {
                // Lost the creation race; the other caller's collection wins.
                let remote = client.get_collection(name).await?.ok_or_else(|| {
                    Error::Transport(format!(
                        "collection '{}' reported as existing but could not be read",
                        name
                    ))
                })?;
                Self::check_compatible(&remote, config)?;
                Ok(remote)
            }
        }
    }

    fn check_compatible(remote: &CollectionSchema, config: &TypesenseConfig) -> Result<()> {
        if remote.embedding_dimension == 0 {
            return Err(Error::SchemaConflict(format!(
                "collection '{}' has no embedding vector field",
                remote.name
            )));
        }
        if remote.embedding_dimension != config.embedding_dimension {
            return Err(Error::SchemaConflict(format!(
                "collection '{}' has embedding dimension {} but configuration expects {}",
                remote.name, remote.embedding_dimension, config.embedding_dimension
            )));
        }
        Ok(())
    }
}
