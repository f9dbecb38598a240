//! anyvec — portable vector store abstraction with pluggable filter translation
//!
//! This crate re-exports the backend-agnostic surface from `anyvec-core`
//! (documents, filter expressions, schema types, the `VectorStore` and
//! `EmbeddingModel` traits) together with the Typesense connector from
//! `anyvec-typesense`.

pub use anyvec_core::{
    CollectionSchema, CompareOp, Document, EmbeddingModel, Error, FieldSpec, FieldType, Filter,
    FilterTranslator, FilterValue, IngestionFailure, Result, ScoredDocument, SearchRequest,
    VectorStore, parse_filter,
};

pub use anyvec_typesense::{
    CollectionClient, HttpCollectionClient, MetadataPolicy, StoreState, TypesenseConfig,
    TypesenseTranslator, TypesenseVectorStore, UnknownKeyAction,
};
