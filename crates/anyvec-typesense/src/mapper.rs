//! Document to backend-record mapping

use anyvec_core::{
    CollectionSchema, Document, EmbeddingModel, Error, FieldType, Result, ScoredDocument,
};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::client::SearchHit;
use crate::config::UnknownKeyAction;

/// Record field names reserved for the fixed schema
const RESERVED_FIELDS: [&str; 3] = ["id", "content", "embedding"];

/// Maps application documents to backend records and search hits back to
/// scored documents
///
/// Missing document ids are generated (UUID v4). Missing embeddings are
/// computed from the document content through the embedding model; that call
/// may block on the upstream service.
pub struct DocumentMapper {
    schema: CollectionSchema,
    unknown: UnknownKeyAction,
}

impl DocumentMapper {
    pub fn new(schema: CollectionSchema, unknown: UnknownKeyAction) -> Self {
        Self { schema, unknown }
    }

    /// The id a document will be stored under: its own, or a fresh UUID
    ///
    /// Assigned before the fallible mapping steps so that ingestion failures
    /// can always name the affected document.
    pub fn assign_id(document: &Document) -> String {
        document
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    /// Convert a document into a backend record stored under `id`
    pub async fn to_record(
        &self,
        id: &str,
        document: &Document,
        embedder: &dyn EmbeddingModel,
    ) -> Result<Map<String, Value>> {
        let embedding = match &document.embedding {
            Some(vector) => vector.clone(),
            None => embedder.embed(&document.content).await?,
        };
        if embedding.len() != self.schema.embedding_dimension {
            return Err(Error::InvalidInput(format!(
                "document '{}' has embedding length {} but collection '{}' expects {}",
                id,
                embedding.len(),
                self.schema.name,
                self.schema.embedding_dimension
            )));
        }

        let mut record = Map::new();
        record.insert("id".to_string(), Value::String(id.to_string()));
        record.insert(
            "content".to_string(),
            Value::String(document.content.clone()),
        );
        record.insert(
            "embedding".to_string(),
            Value::Array(embedding.iter().map(|v| Value::from(*v as f64)).collect()),
        );

        for (key, value) in &document.metadata {
            if RESERVED_FIELDS.contains(&key.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "document '{}' uses reserved metadata key '{}'",
                    id, key
                )));
            }

            if self.schema.dynamic_fields {
                record.insert(key.clone(), value.clone());
                continue;
            }

            match self.schema.field(key) {
                Some(spec) => {
                    let coerced = coerce_value(value, spec.field_type).map_err(|reason| {
                        Error::InvalidInput(format!(
                            "document '{}' field '{}': {}",
                            id, key, reason
                        ))
                    })?;
                    record.insert(key.clone(), coerced);
                }
                None => match self.unknown {
                    UnknownKeyAction::Drop => {}
                    UnknownKeyAction::Reject => {
                        return Err(Error::InvalidInput(format!(
                            "document '{}' has metadata key '{}' not declared in collection '{}'",
                            id, key, self.schema.name
                        )));
                    }
                },
            }
        }

        Ok(record)
    }

    /// Convert a backend hit into a scored document
    ///
    /// The embedding is not returned by the backend and stays `None`. The
    /// score is `1 - vector_distance` clamped to [0, 1].
    pub fn from_hit(&self, hit: &SearchHit) -> Result<ScoredDocument> {
        let id = hit
            .document
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Transport("search hit is missing an id field".to_string()))?
            .to_string();

        let content = hit
            .document
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut metadata = Map::new();
        for (key, value) in &hit.document {
            if !RESERVED_FIELDS.contains(&key.as_str()) {
                metadata.insert(key.clone(), value.clone());
            }
        }

        let score = hit
            .vector_distance
            .map_or(0.0, |distance| (1.0 - distance).clamp(0.0, 1.0));

        Ok(ScoredDocument {
            document: Document {
                id: Some(id),
                content,
                metadata,
                embedding: None,
            },
            score,
        })
    }
}

fn coerce_value(value: &Value, target: FieldType) -> std::result::Result<Value, String> {
    match target {
        FieldType::String => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            other => Err(format!("cannot store {} in a string field", kind(other))),
        },
        FieldType::Int32 => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
            Value::Number(n) => match n.as_f64() {
                Some(f) if f.fract() == 0.0 => Ok(Value::from(f as i64)),
                _ => Err("cannot store a fractional number in an int32 field".to_string()),
            },
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("cannot parse '{}' as int32", s)),
            other => Err(format!("cannot store {} in an int32 field", kind(other))),
        },
        FieldType::Float => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => s
                .parse::<f64>()
                .map(Value::from)
                .map_err(|_| format!("cannot parse '{}' as float", s)),
            other => Err(format!("cannot store {} in a float field", kind(other))),
        },
        FieldType::Bool => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) => s
                .parse::<bool>()
                .map(Value::from)
                .map_err(|_| format!("cannot parse '{}' as bool", s)),
            other => Err(format!("cannot store {} in a bool field", kind(other))),
        },
        FieldType::StringArray => match value {
            Value::Array(items) => {
                let mut coerced = Vec::with_capacity(items.len());
                for item in items {
                    coerced.push(coerce_value(item, FieldType::String)?);
                }
                Ok(Value::Array(coerced))
            }
            other => Err(format!("cannot store {} in a string[] field", kind(other))),
        },
        FieldType::FloatVector => {
            Err("metadata cannot target the embedding vector field".to_string())
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
