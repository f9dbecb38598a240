//! Typesense connector for anyvec
//!
//! Implements the portable `VectorStore` surface on top of a Typesense
//! collection: schema auto-provisioning, document-to-record mapping with
//! embedding invocation, batched JSONL imports with partial-failure
//! aggregation, vector similarity search, and translation of portable filter
//! expressions into Typesense `filter_by` syntax.

pub mod client;
pub mod config;
pub mod mapper;
pub mod schema;
pub mod store;
pub mod translator;

pub use client::{
    CollectionClient, CreateOutcome, HttpCollectionClient, ImportOutcome, SearchHit, VectorQuery,
};
pub use config::{MetadataPolicy, TypesenseConfig, UnknownKeyAction};
pub use mapper::DocumentMapper;
pub use schema::SchemaManager;
pub use store::{StoreState, TypesenseVectorStore};
pub use translator::TypesenseTranslator;

#[cfg(test)]
pub(crate) mod testing;
