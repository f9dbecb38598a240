//! Narrow Typesense collection client
//!
//! The connector core only talks to the backend through [`CollectionClient`];
//! any concrete transport (the reqwest implementation here, an official SDK,
//! or a test double) can be injected behind it.

use std::time::Duration;

use async_trait::async_trait;
use anyvec_core::{CollectionSchema, Error, FieldSpec, FieldType, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::TypesenseConfig;

/// Typesense's catch-all dynamic field name
pub const DYNAMIC_FIELD: &str = ".*";

/// Outcome of a create-collection call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// A concurrent creator won the race; treated as success by the caller
    AlreadyExists,
}

/// Per-record outcome of a bulk import
#[derive(Debug, Clone, Deserialize)]
pub struct ImportOutcome {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// A single search hit as returned by the backend
///
/// The stored embedding is excluded from hits; only the distance of the
/// query vector to it comes back.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub document: Map<String, Value>,
    pub vector_distance: Option<f32>,
}

/// A vector search query against one collection
#[derive(Debug, Clone, PartialEq)]
pub struct VectorQuery {
    /// Textual query for hybrid relevance; `*` for pure-vector search
    pub query: String,
    pub vector: Vec<f32>,
    pub filter: Option<String>,
    pub limit: usize,
}

/// Trait for the backend network client
///
/// Transport-level failures (unreachable backend, non-2xx responses) map to
/// `Error::Transport`; application-level rejections surface through the
/// returned outcome types instead.
#[async_trait]
pub trait CollectionClient: Send + Sync {
    async fn create_collection(&self, schema: &CollectionSchema) -> Result<CreateOutcome>;

    async fn get_collection(&self, name: &str) -> Result<Option<CollectionSchema>>;

    /// Bulk-upsert records, returning one outcome per record in input order
    async fn import_documents(
        &self,
        collection: &str,
        records: Vec<Map<String, Value>>,
    ) -> Result<Vec<ImportOutcome>>;

    async fn search(&self, collection: &str, query: &VectorQuery) -> Result<Vec<SearchHit>>;

    /// Delete records by id, returning the number deleted
    async fn delete_documents(&self, collection: &str, ids: &[String]) -> Result<usize>;
}

#[derive(Serialize, Deserialize)]
struct FieldWire {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    facet: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    num_dim: Option<usize>,
}

#[derive(Serialize, Deserialize)]
struct CollectionWire {
    name: String,
    fields: Vec<FieldWire>,
}

#[derive(Serialize)]
struct SearchWire {
    collection: String,
    q: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    query_by: Option<String>,
    vector_query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter_by: Option<String>,
    per_page: usize,
    exclude_fields: String,
}

#[derive(Serialize)]
struct MultiSearchRequest {
    searches: Vec<SearchWire>,
}

#[derive(Deserialize)]
struct SearchResultWire {
    #[serde(default)]
    hits: Vec<SearchHit>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct MultiSearchResponse {
    results: Vec<SearchResultWire>,
}

#[derive(Deserialize)]
struct DeleteResponse {
    num_deleted: usize,
}

fn field_type_to_wire(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::String => "string",
        FieldType::Int32 => "int32",
        FieldType::Float => "float",
        FieldType::Bool => "bool",
        FieldType::StringArray => "string[]",
        FieldType::FloatVector => "float[]",
    }
}

fn field_type_from_wire(wire: &str) -> Option<FieldType> {
    match wire {
        "string" => Some(FieldType::String),
        "int32" | "int64" => Some(FieldType::Int32),
        "float" => Some(FieldType::Float),
        "bool" => Some(FieldType::Bool),
        "string[]" => Some(FieldType::StringArray),
        "float[]" => Some(FieldType::FloatVector),
        _ => None,
    }
}

fn schema_to_wire(schema: &CollectionSchema) -> CollectionWire {
    let mut fields: Vec<FieldWire> = schema
        .fields
        .iter()
        .map(|f| FieldWire {
            name: f.name.clone(),
            field_type: field_type_to_wire(f.field_type).to_string(),
            facet: f.facet,
            optional: f.optional,
            num_dim: (f.field_type == FieldType::FloatVector)
                .then_some(schema.embedding_dimension),
        })
        .collect();

    if schema.dynamic_fields {
        fields.push(FieldWire {
            name: DYNAMIC_FIELD.to_string(),
            field_type: "auto".to_string(),
            facet: false,
            optional: true,
            num_dim: None,
        });
    }

    CollectionWire {
        name: schema.name.clone(),
        fields,
    }
}

fn schema_from_wire(wire: CollectionWire) -> CollectionSchema {
    let mut fields = Vec::new();
    let mut embedding_dimension = 0;
    let mut dynamic_fields = false;

    for field in wire.fields {
        if field.name == DYNAMIC_FIELD {
            dynamic_fields = true;
            continue;
        }
        match field_type_from_wire(&field.field_type) {
            Some(field_type) => {
                if field_type == FieldType::FloatVector {
                    embedding_dimension = field.num_dim.unwrap_or(0);
                }
                fields.push(FieldSpec {
                    name: field.name,
                    field_type,
                    facet: field.facet,
                    optional: field.optional,
                });
            }
            None => {
                warn!(
                    field = %field.name,
                    wire_type = %field.field_type,
                    "skipping field with unsupported type in remote schema"
                );
            }
        }
    }

    CollectionSchema {
        name: wire.name,
        fields,
        embedding_dimension,
        dynamic_fields,
    }
}

/// A document id may end up spliced into a `filter_by` string (deletes are
/// issued as `id:[...]`), so ids carrying filter syntax are rejected rather
/// than forwarded.
pub(crate) fn ensure_safe_id(id: &str) -> Result<()> {
    if crate::translator::contains_reserved_syntax(id) || id.contains(',') || id.contains(':') {
        return Err(Error::InvalidInput(format!(
            "document id contains reserved filter syntax: {:?}",
            id
        )));
    }
    Ok(())
}

/// Build the `filter_by` clause for a delete-by-ids call
fn delete_filter(ids: &[String]) -> Result<String> {
    for id in ids {
        ensure_safe_id(id)?;
    }
    Ok(format!("id:[{}]", ids.join(",")))
}

/// Render a vector query in Typesense's `vector_query` syntax:
/// `embedding:([0.1,0.2], k:10)`
fn render_vector_query(vector: &[f32], k: usize) -> String {
    let components: Vec<String> = vector.iter().map(|v| v.to_string()).collect();
    format!("embedding:([{}], k:{})", components.join(","), k)
}

/// reqwest-based implementation of [`CollectionClient`]
///
/// The inner `reqwest::Client` pools connections and is safe for concurrent
/// use; the store shares one instance across callers.
pub struct HttpCollectionClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpCollectionClient {
    /// Create a new client from the connector configuration
    pub fn new(config: &TypesenseConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .header("X-TYPESENSE-API-KEY", &self.api_key)
    }

    async fn error_from_response(response: reqwest::Response) -> Error {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Error::Transport(format!("backend returned {}: {}", status, body))
    }
}

#[async_trait]
impl CollectionClient for HttpCollectionClient {
    async fn create_collection(&self, schema: &CollectionSchema) -> Result<CreateOutcome> {
        let wire = schema_to_wire(schema);

        let response = self
            .request(reqwest::Method::POST, "/collections")
            .json(&wire)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        if response.status() == StatusCode::CONFLICT {
            debug!(collection = %schema.name, "collection already exists");
            return Ok(CreateOutcome::AlreadyExists);
        }
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        debug!(collection = %schema.name, "collection created");
        Ok(CreateOutcome::Created)
    }

    async fn get_collection(&self, name: &str) -> Result<Option<CollectionSchema>> {
        let response = self
            .request(reqwest::Method::GET, &format!("/collections/{}", name))
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let wire: CollectionWire = response
            .json()
            .await
            .map_err(|e| Error::Transport(format!("invalid collection response: {}", e)))?;

        Ok(Some(schema_from_wire(wire)))
    }

    async fn import_documents(
        &self,
        collection: &str,
        records: Vec<Map<String, Value>>,
    ) -> Result<Vec<ImportOutcome>> {
        let mut body = String::new();
        for record in &records {
            body.push_str(&serde_json::to_string(record).map_err(|e| {
                Error::InvalidInput(format!("unserializable record: {}", e))
            })?);
            body.push('\n');
        }

        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/collections/{}/documents/import?action=upsert", collection),
            )
            .header("Content-Type", "text/plain")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        // The import endpoint answers with one JSON object per line,
        // matching the input order.
        let text = response
            .text()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let mut outcomes = Vec::with_capacity(records.len());
        for line in text.lines().filter(|line| !line.trim().is_empty()) {
            let outcome: ImportOutcome = serde_json::from_str(line)
                .map_err(|e| Error::Transport(format!("invalid import response line: {}", e)))?;
            outcomes.push(outcome);
        }

        if outcomes.len() != records.len() {
            return Err(Error::Transport(format!(
                "import returned {} outcomes for {} records",
                outcomes.len(),
                records.len()
            )));
        }

        Ok(outcomes)
    }

    async fn search(&self, collection: &str, query: &VectorQuery) -> Result<Vec<SearchHit>> {
        let hybrid = !query.query.is_empty() && query.query != "*";
        let search = SearchWire {
            collection: collection.to_string(),
            q: if hybrid { query.query.clone() } else { "*".to_string() },
            query_by: hybrid.then(|| "content".to_string()),
            vector_query: render_vector_query(&query.vector, query.limit),
            filter_by: query.filter.clone(),
            per_page: query.limit,
            exclude_fields: "embedding".to_string(),
        };

        let response = self
            .request(reqwest::Method::POST, "/multi_search")
            .json(&MultiSearchRequest {
                searches: vec![search],
            })
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let mut parsed: MultiSearchResponse = response
            .json()
            .await
            .map_err(|e| Error::Transport(format!("invalid search response: {}", e)))?;

        if parsed.results.is_empty() {
            return Err(Error::Transport("search response carried no results".into()));
        }
        let result = parsed.results.remove(0);
        if let Some(message) = result.error {
            return Err(Error::Transport(format!("search rejected: {}", message)));
        }

        Ok(result.hits)
    }

    async fn delete_documents(&self, collection: &str, ids: &[String]) -> Result<usize> {
        let filter = delete_filter(ids)?;

        let response = self
            .request(
                reqwest::Method::DELETE,
                &format!("/collections/{}/documents", collection),
            )
            .query(&[("filter_by", filter.as_str())])
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let parsed: DeleteResponse = response
            .json()
            .await
            .map_err(|e| Error::Transport(format!("invalid delete response: {}", e)))?;

        Ok(parsed.num_deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> CollectionSchema {
        CollectionSchema {
            name: "docs".into(),
            fields: vec![
                FieldSpec::new("id", FieldType::String),
                FieldSpec::new("content", FieldType::String),
                FieldSpec::new("embedding", FieldType::FloatVector),
            ],
            embedding_dimension: 4,
            dynamic_fields: true,
        }
    }

    #[test]
    fn test_schema_wire_round_trip() {
        let schema = sample_schema();
        let wire = schema_to_wire(&schema);

        assert_eq!(wire.fields.len(), 4);
        assert_eq!(wire.fields[2].field_type, "float[]");
        assert_eq!(wire.fields[2].num_dim, Some(4));
        assert_eq!(wire.fields[3].name, DYNAMIC_FIELD);
        assert_eq!(wire.fields[3].field_type, "auto");

        let parsed = schema_from_wire(wire);
        assert_eq!(parsed, schema);
    }

    #[test]
    fn test_vector_query_rendering() {
        let rendered = render_vector_query(&[0.5, -1.0, 0.25], 10);
        assert_eq!(rendered, "embedding:([0.5,-1,0.25], k:10)");
    }

    #[test]
    fn test_delete_filter_joins_ids() {
        let ids = vec!["doc1".to_string(), "doc2".to_string()];
        assert_eq!(delete_filter(&ids).unwrap(), "id:[doc1,doc2]");
    }

    #[test]
    fn test_delete_filter_rejects_ids_with_filter_syntax() {
        for hostile in ["a] || year:>0", "a,b", "a:b", "a&&b", "a'b"] {
            let ids = vec![hostile.to_string()];
            assert!(
                matches!(delete_filter(&ids), Err(Error::InvalidInput(_))),
                "id {:?} should be rejected",
                hostile
            );
        }
    }

    #[test]
    fn test_import_outcome_parsing() {
        let line = r#"{"success":false,"error":"Field `year` must be an int32."}"#;
        let outcome: ImportOutcome = serde_json::from_str(line).unwrap();
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("int32"));
    }
}
