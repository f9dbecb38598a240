//! Collection schema types

use serde::{Deserialize, Serialize};

/// Field types a backend collection can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    String,
    Int32,
    Float,
    Bool,
    StringArray,
    FloatVector,
}

/// A single field declaration in a collection schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    pub facet: bool,
    pub optional: bool,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            facet: false,
            optional: false,
        }
    }

    pub fn facet(mut self) -> Self {
        self.facet = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Schema of a backend collection
///
/// Immutable for the lifetime of a store instance once provisioned. When
/// `dynamic_fields` is true the backend accepts undeclared metadata keys and
/// filter translation skips the declared-field check for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,
    pub fields: Vec<FieldSpec>,
    pub embedding_dimension: usize,
    pub dynamic_fields: bool,
}

impl CollectionSchema {
    /// Look up a declared field by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether a field name may appear in filters and metadata
    pub fn permits_field(&self, name: &str) -> bool {
        self.dynamic_fields || self.field(name).is_some()
    }
}
