//! Core traits and types for anyvec
//!
//! This crate defines the backend-agnostic surface shared by all anyvec
//! connectors: the document model, the portable filter expression language
//! (AST, builder, parser), collection schema types, and the capability-facing
//! traits for embedding models, filter translators, and vector stores.

pub mod document;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod parser;
pub mod schema;
pub mod vector_store;

pub use document::{Document, ScoredDocument};
pub use embedding::EmbeddingModel;
pub use error::{Error, IngestionFailure, Result};
pub use filter::{CompareOp, Filter, FilterTranslator, FilterValue};
pub use parser::parse_filter;
pub use schema::{CollectionSchema, FieldSpec, FieldType};
pub use vector_store::{SearchRequest, VectorStore};
