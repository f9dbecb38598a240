//! Typesense-backed implementation of the portable `VectorStore` trait

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use anyvec_core::{
    CollectionSchema, Document, EmbeddingModel, Error, FilterTranslator, IngestionFailure, Result,
    ScoredDocument, SearchRequest, VectorStore,
};
use tracing::{debug, info};

use crate::client::{CollectionClient, HttpCollectionClient, VectorQuery};
use crate::config::{MetadataPolicy, TypesenseConfig, UnknownKeyAction};
use crate::mapper::DocumentMapper;
use crate::schema::SchemaManager;
use crate::translator::TypesenseTranslator;

/// Lifecycle of a store instance; transitions only move forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Uninitialized,
    SchemaReady,
    Operational,
}

/// Vector store backed by a single Typesense collection
///
/// The collection schema is resolved once during `connect` and cached
/// immutably; after that, calls are independent request/response operations
/// safe for concurrent callers. Operational failures (network errors,
/// rejected records) are reported per call and never revert the lifecycle
/// state.
pub struct TypesenseVectorStore<C: CollectionClient, E: EmbeddingModel> {
    client: Arc<C>,
    embedder: Arc<E>,
    config: TypesenseConfig,
    translator: TypesenseTranslator,
    schema: Option<CollectionSchema>,
    mapper: Option<DocumentMapper>,
    state: RwLock<StoreState>,
}

impl<E: EmbeddingModel> TypesenseVectorStore<HttpCollectionClient, E> {
    /// Create a store talking to Typesense over HTTP
    pub fn http(config: TypesenseConfig, embedder: Arc<E>) -> Result<Self> {
        let client = Arc::new(HttpCollectionClient::new(&config)?);
        Self::new(config, client, embedder)
    }
}

impl<C: CollectionClient, E: EmbeddingModel> TypesenseVectorStore<C, E> {
    /// Create a store with an injected backend client
    pub fn new(config: TypesenseConfig, client: Arc<C>, embedder: Arc<E>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client,
            embedder,
            config,
            translator: TypesenseTranslator::new(),
            schema: None,
            mapper: None,
            state: RwLock::new(StoreState::Uninitialized),
        })
    }

    /// Escape hatch to the backend client used internally
    ///
    /// No capability guarantees beyond "same instance as used internally".
    pub fn native_client(&self) -> Option<Arc<C>> {
        Some(self.client.clone())
    }

    /// Current lifecycle state
    pub fn state(&self) -> StoreState {
        self.state.read().map_or(StoreState::Uninitialized, |s| *s)
    }

    fn mapper(&self) -> Result<&DocumentMapper> {
        self.mapper
            .as_ref()
            .ok_or_else(|| Error::Other("store not connected, call connect() first".to_string()))
    }

    fn schema(&self) -> Result<&CollectionSchema> {
        self.schema
            .as_ref()
            .ok_or_else(|| Error::Other("store not connected, call connect() first".to_string()))
    }

    fn mark_operational(&self) {
        if let Ok(mut state) = self.state.write() {
            if *state == StoreState::SchemaReady {
                *state = StoreState::Operational;
            }
        }
    }

    async fn query_vector(&self, request: &SearchRequest) -> Result<Vec<f32>> {
        let vector = match &request.query_vector {
            Some(vector) => vector.clone(),
            None => self.embedder.embed(&request.query).await?,
        };

        let expected = self.schema()?.embedding_dimension;
        if vector.len() != expected {
            return Err(Error::InvalidInput(format!(
                "query vector has length {} but collection expects {}",
                vector.len(),
                expected
            )));
        }
        Ok(vector)
    }
}

#[async_trait]
impl<C: CollectionClient + 'static, E: EmbeddingModel + 'static> VectorStore
    for TypesenseVectorStore<C, E>
{
    async fn connect(&mut self) -> Result<()> {
        let schema = SchemaManager::ensure_schema(self.client.as_ref(), &self.config).await?;

        let unknown = match &self.config.metadata {
            MetadataPolicy::Dynamic => UnknownKeyAction::Drop,
            MetadataPolicy::Declared { unknown, .. } => *unknown,
        };
        self.mapper = Some(DocumentMapper::new(schema.clone(), unknown));
        self.schema = Some(schema);

        if let Ok(mut state) = self.state.write() {
            if *state == StoreState::Uninitialized {
                *state = StoreState::SchemaReady;
            }
        }

        info!(collection = %self.config.collection_name, "vector store ready");
        Ok(())
    }

    async fn add(&self, documents: Vec<Document>) -> Result<Vec<String>> {
        let mapper = self.mapper()?;
        let collection = &self.config.collection_name;

        let mut stored_ids = Vec::with_capacity(documents.len());
        let mut failures: Vec<IngestionFailure> = Vec::new();

        // Batches go out sequentially in input order; a failing batch is
        // recorded and the remaining batches are still submitted.
        for batch in documents.chunks(self.config.batch_size) {
            let mut ids = Vec::with_capacity(batch.len());
            let mut records = Vec::with_capacity(batch.len());

            for document in batch {
                // Assign the id up front so a mapping failure can still name
                // the affected document.
                let id = DocumentMapper::assign_id(document);
                match mapper.to_record(&id, document, self.embedder.as_ref()).await {
                    Ok(record) => {
                        ids.push(id);
                        records.push(record);
                    }
                    Err(e) => failures.push(IngestionFailure {
                        document_id: id,
                        reason: e.to_string(),
                    }),
                }
            }

            if records.is_empty() {
                continue;
            }

            debug!(collection = %collection, batch_size = records.len(), "importing batch");
            match self.client.import_documents(collection, records).await {
                Ok(outcomes) => {
                    for (id, outcome) in ids.into_iter().zip(outcomes) {
                        if outcome.success {
                            stored_ids.push(id);
                        } else {
                            failures.push(IngestionFailure {
                                document_id: id,
                                reason: outcome
                                    .error
                                    .unwrap_or_else(|| "rejected by backend".to_string()),
                            });
                        }
                    }
                }
                Err(e) => {
                    let reason = format!("batch import failed: {}", e);
                    failures.extend(ids.into_iter().map(|id| IngestionFailure {
                        document_id: id,
                        reason: reason.clone(),
                    }));
                }
            }
        }

        if failures.is_empty() {
            info!(collection = %collection, documents = stored_ids.len(), "ingestion complete");
            self.mark_operational();
            Ok(stored_ids)
        } else {
            Err(Error::PartialIngestion { failures })
        }
    }

    async fn delete(&self, ids: Vec<String>) -> Result<()> {
        self.schema()?;
        if ids.is_empty() {
            return Ok(());
        }
        for id in &ids {
            crate::client::ensure_safe_id(id)?;
        }

        let deleted = self
            .client
            .delete_documents(&self.config.collection_name, &ids)
            .await?;
        debug!(collection = %self.config.collection_name, requested = ids.len(), deleted, "delete");
        self.mark_operational();
        Ok(())
    }

    async fn similarity_search(&self, request: SearchRequest) -> Result<Vec<ScoredDocument>> {
        if request.top_k == 0 {
            return Err(Error::InvalidInput("top_k must be greater than 0".to_string()));
        }

        let mapper = self.mapper()?;
        let schema = self.schema()?;
        let vector = self.query_vector(&request).await?;

        let filter = request
            .filter
            .as_ref()
            .map(|f| self.translator.translate(f, schema))
            .transpose()?;

        let query = VectorQuery {
            query: request.query.clone(),
            vector,
            filter,
            limit: request.top_k,
        };

        let hits = self
            .client
            .search(&self.config.collection_name, &query)
            .await?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in &hits {
            results.push(mapper.from_hit(hit)?);
        }

        // Typesense reports raw vector distance with no native similarity
        // cutoff, so the threshold is applied here, preserving backend order.
        if let Some(threshold) = request.similarity_threshold {
            results.retain(|scored| scored.score >= threshold);
        }

        debug!(
            collection = %self.config.collection_name,
            requested = request.top_k,
            returned = results.len(),
            "similarity search"
        );
        self.mark_operational();
        Ok(results)
    }
}
