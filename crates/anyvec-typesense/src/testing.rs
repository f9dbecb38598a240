//! Test doubles shared by the connector's unit tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use anyvec_core::{CollectionSchema, EmbeddingModel, Error, Result};
use serde_json::{Map, Value};

use crate::client::{CollectionClient, CreateOutcome, ImportOutcome, SearchHit, VectorQuery};

/// Embedding model returning a constant vector of the configured dimension
pub struct MockEmbedding {
    dimension: usize,
    calls: AtomicUsize,
    pub fail: bool,
}

impl MockEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingModel for MockEmbedding {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Embedding("mock embedding failure".to_string()));
        }
        Ok(vec![0.1; self.dimension])
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// In-memory [`CollectionClient`] recording calls and simulating rejections
#[derive(Default)]
pub struct MockClient {
    collections: Mutex<HashMap<String, CollectionSchema>>,
    /// Records per collection, in insertion order
    records: Mutex<HashMap<String, Vec<Map<String, Value>>>>,
    /// Document ids the import endpoint rejects
    pub fail_ids: Mutex<HashSet<String>>,
    /// Zero-based import call indices that fail wholesale with a transport
    /// error instead of returning per-record outcomes
    pub transport_fail_batches: Mutex<HashSet<usize>>,
    /// Vector distance reported per document id; defaults to 0.1
    pub distances: Mutex<HashMap<String, f32>>,
    created: AtomicUsize,
    import_batches: Mutex<Vec<usize>>,
    last_filter: Mutex<Option<String>>,
    hide_next_get: AtomicBool,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of collections actually created
    pub fn create_calls(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Make the next `get_collection` miss, simulating a creation race
    pub fn hide_next_get(&self) {
        self.hide_next_get.store(true, Ordering::SeqCst);
    }

    /// Sizes of the import batches received, in submission order
    pub fn import_batches(&self) -> Vec<usize> {
        self.import_batches.lock().unwrap().clone()
    }

    /// The filter string of the most recent search
    pub fn last_filter(&self) -> Option<String> {
        self.last_filter.lock().unwrap().clone()
    }

    /// Ids currently stored in a collection, in insertion order
    pub fn stored_ids(&self, collection: &str) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .filter_map(|r| r.get("id").and_then(Value::as_str).map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl CollectionClient for MockClient {
    async fn create_collection(&self, schema: &CollectionSchema) -> Result<CreateOutcome> {
        let mut collections = self.collections.lock().unwrap();
        if collections.contains_key(&schema.name) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        collections.insert(schema.name.clone(), schema.clone());
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(CreateOutcome::Created)
    }

    async fn get_collection(&self, name: &str) -> Result<Option<CollectionSchema>> {
        if self.hide_next_get.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self.collections.lock().unwrap().get(name).cloned())
    }

    async fn import_documents(
        &self,
        collection: &str,
        records: Vec<Map<String, Value>>,
    ) -> Result<Vec<ImportOutcome>> {
        let batch_index = {
            let mut batches = self.import_batches.lock().unwrap();
            batches.push(records.len());
            batches.len() - 1
        };
        if self
            .transport_fail_batches
            .lock()
            .unwrap()
            .contains(&batch_index)
        {
            return Err(Error::Transport("simulated import outage".to_string()));
        }

        let fail_ids = self.fail_ids.lock().unwrap();
        let mut stored = self.records.lock().unwrap();
        let entry = stored.entry(collection.to_string()).or_default();

        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            let id = record
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            if fail_ids.contains(&id) {
                outcomes.push(ImportOutcome {
                    success: false,
                    error: Some(format!("document '{}' rejected by backend", id)),
                });
                continue;
            }

            entry.retain(|r| r.get("id").and_then(Value::as_str) != Some(id.as_str()));
            entry.push(record);
            outcomes.push(ImportOutcome {
                success: true,
                error: None,
            });
        }

        Ok(outcomes)
    }

    async fn search(&self, collection: &str, query: &VectorQuery) -> Result<Vec<SearchHit>> {
        *self.last_filter.lock().unwrap() = query.filter.clone();

        let distances = self.distances.lock().unwrap();
        let records = self.records.lock().unwrap();

        let hits = records
            .get(collection)
            .map(|stored| {
                stored
                    .iter()
                    .take(query.limit)
                    .map(|record| {
                        let id = record.get("id").and_then(Value::as_str).unwrap_or_default();
                        let mut document = record.clone();
                        document.remove("embedding");
                        SearchHit {
                            document,
                            vector_distance: Some(distances.get(id).copied().unwrap_or(0.1)),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(hits)
    }

    async fn delete_documents(&self, collection: &str, ids: &[String]) -> Result<usize> {
        let mut records = self.records.lock().unwrap();
        let entry = records.entry(collection.to_string()).or_default();
        let before = entry.len();
        entry.retain(|r| {
            r.get("id")
                .and_then(Value::as_str)
                .map(|id| !ids.iter().any(|candidate| candidate == id))
                .unwrap_or(true)
        });
        Ok(before - entry.len())
    }
}
