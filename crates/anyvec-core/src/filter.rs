//! Portable filter expression model
//!
//! A backend-agnostic AST for metadata predicates. Trees are built either
//! through the constructor API here or by parsing the portable grammar (see
//! [`crate::parser`]); both produce structurally equivalent trees. Each
//! backend connector supplies a [`FilterTranslator`] that lowers a tree into
//! its proprietary filter syntax.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::CollectionSchema;
use crate::Result;

/// Comparison operators supported by the portable filter language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    /// The portable-grammar token for this operator
    pub fn token(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }
}

/// A scalar value appearing in a filter predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Str(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Str(v)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Int(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        FilterValue::Int(v as i64)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        FilterValue::Float(v)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Bool(v)
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Str(s) => write!(f, "'{}'", s),
            FilterValue::Int(i) => write!(f, "{}", i),
            // {:?} keeps a trailing ".0" so the literal parses back as a float
            FilterValue::Float(x) => write!(f, "{:?}", x),
            FilterValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// An immutable, backend-agnostic filter expression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    Compare {
        field: String,
        op: CompareOp,
        value: FilterValue,
    },
    In {
        field: String,
        values: Vec<FilterValue>,
    },
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
    Not(Box<Filter>),
    Group(Box<Filter>),
}

impl Filter {
    fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<FilterValue>) -> Self {
        Filter::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, CompareOp::Ne, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, CompareOp::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, CompareOp::Gte, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, CompareOp::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, CompareOp::Lte, value)
    }

    /// Set-membership predicate. An empty value list matches nothing.
    pub fn is_in<V: Into<FilterValue>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Filter::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn and(self, other: Filter) -> Self {
        Filter::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Filter) -> Self {
        Filter::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Filter::Not(Box::new(self))
    }

    pub fn grouped(self) -> Self {
        Filter::Group(Box::new(self))
    }

    /// Binding strength in the portable grammar, used when rendering
    fn precedence(&self) -> u8 {
        match self {
            Filter::Or(..) => 1,
            Filter::And(..) => 2,
            _ => 3,
        }
    }

    fn fmt_child(child: &Filter, min: u8, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if child.precedence() < min {
            write!(f, "({})", child)
        } else {
            write!(f, "{}", child)
        }
    }
}

impl fmt::Display for Filter {
    /// Renders the tree back into the portable filter grammar
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Compare { field, op, value } => {
                write!(f, "{} {} {}", field, op.token(), value)
            }
            Filter::In { field, values } => {
                let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{} in [{}]", field, rendered.join(","))
            }
            Filter::And(l, r) => {
                Self::fmt_child(l, 2, f)?;
                write!(f, " && ")?;
                Self::fmt_child(r, 2, f)
            }
            Filter::Or(l, r) => {
                Self::fmt_child(l, 1, f)?;
                write!(f, " || ")?;
                Self::fmt_child(r, 1, f)
            }
            Filter::Not(child) => {
                if child.precedence() < 3 {
                    write!(f, "!({})", child)
                } else {
                    write!(f, "!{}", child)
                }
            }
            Filter::Group(child) => write!(f, "({})", child),
        }
    }
}

/// Trait for backend-specific filter translators
///
/// Lowers a portable [`Filter`] tree into the backend's filter-string syntax.
/// Field names are validated against the collection schema before emission;
/// values are escaped or rejected so they can never break out of the target
/// grammar.
pub trait FilterTranslator {
    fn translate(&self, filter: &Filter, schema: &CollectionSchema) -> Result<String>;
}
