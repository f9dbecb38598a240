//! Translation of portable filter expressions into Typesense `filter_by` syntax

use anyvec_core::{CompareOp, CollectionSchema, Error, Filter, FilterTranslator, FilterValue, Result};

/// Sentinel value emitted for an empty `in` set
///
/// An empty `filter_by` clause would match every record, so an empty set is
/// lowered to a membership test against a value no real record carries.
pub const MATCH_NONE_SENTINEL: &str = "__anyvec_match_none__";

/// Characters and token pairs that would let a value break out of the
/// `filter_by` grammar. Values containing any of these are rejected.
const FORBIDDEN_CHARS: [char; 7] = ['[', ']', '(', ')', '\'', '`', '\\'];
const FORBIDDEN_PAIRS: [&str; 2] = ["&&", "||"];

/// Whether a value contains syntax that could break out of a `filter_by`
/// string. Shared with the delete path, which splices ids into a filter.
pub(crate) fn contains_reserved_syntax(value: &str) -> bool {
    FORBIDDEN_CHARS.iter().any(|c| value.contains(*c))
        || FORBIDDEN_PAIRS.iter().any(|p| value.contains(p))
}

/// Translates [`Filter`] trees into Typesense filter strings
///
/// Operator mapping: `==` → `field:v`, `!=` → `field:!=v`, ordering
/// operators keep their symbol after the colon (`field:>=v`). String values
/// are single-quoted; `in` sets render as `field:[v1,v2]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TypesenseTranslator;

impl TypesenseTranslator {
    pub fn new() -> Self {
        Self
    }

    fn check_field<'a>(&self, field: &'a str, schema: &CollectionSchema) -> Result<&'a str> {
        if schema.permits_field(field) {
            Ok(field)
        } else {
            Err(Error::UnknownField(field.to_string()))
        }
    }

    fn render_value(&self, field: &str, value: &FilterValue) -> Result<String> {
        match value {
            FilterValue::Str(s) => {
                if contains_reserved_syntax(s) {
                    return Err(Error::InvalidInput(format!(
                        "filter value for field '{}' contains reserved filter syntax: {:?}",
                        field, s
                    )));
                }
                Ok(format!("'{}'", s))
            }
            FilterValue::Int(i) => Ok(i.to_string()),
            FilterValue::Float(x) => Ok(format!("{:?}", x)),
            FilterValue::Bool(b) => Ok(b.to_string()),
        }
    }

    /// Parenthesize boolean combinations; leaf predicates stay bare so that
    /// `a && b` over two comparisons emits no redundant parens
    fn render_operand(&self, filter: &Filter, schema: &CollectionSchema) -> Result<String> {
        let rendered = self.render(filter, schema)?;
        match filter {
            Filter::And(..) | Filter::Or(..) => Ok(format!("({})", rendered)),
            _ => Ok(rendered),
        }
    }

    fn render(&self, filter: &Filter, schema: &CollectionSchema) -> Result<String> {
        match filter {
            Filter::Compare { field, op, value } => {
                let field = self.check_field(field, schema)?;
                let value = self.render_value(field, value)?;
                let symbol = match op {
                    CompareOp::Eq => "",
                    CompareOp::Ne => "!=",
                    CompareOp::Gt => ">",
                    CompareOp::Gte => ">=",
                    CompareOp::Lt => "<",
                    CompareOp::Lte => "<=",
                };
                Ok(format!("{}:{}{}", field, symbol, value))
            }
            Filter::In { field, values } => {
                let field = self.check_field(field, schema)?;
                if values.is_empty() {
                    return Ok(format!("{}:['{}']", field, MATCH_NONE_SENTINEL));
                }
                let rendered: Result<Vec<String>> = values
                    .iter()
                    .map(|v| self.render_value(field, v))
                    .collect();
                Ok(format!("{}:[{}]", field, rendered?.join(",")))
            }
            Filter::And(l, r) => Ok(format!(
                "{} && {}",
                self.render_operand(l, schema)?,
                self.render_operand(r, schema)?
            )),
            Filter::Or(l, r) => Ok(format!(
                "{} || {}",
                self.render_operand(l, schema)?,
                self.render_operand(r, schema)?
            )),
            Filter::Not(child) => Ok(format!("!({})", self.render(child, schema)?)),
            Filter::Group(child) => Ok(format!("({})", self.render(child, schema)?)),
        }
    }
}

impl FilterTranslator for TypesenseTranslator {
    fn translate(&self, filter: &Filter, schema: &CollectionSchema) -> Result<String> {
        self.render(filter, schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyvec_core::{parse_filter, FieldSpec, FieldType};
    use insta::assert_snapshot;

    fn schema() -> CollectionSchema {
        CollectionSchema {
            name: "docs".into(),
            fields: vec![
                FieldSpec::new("id", FieldType::String),
                FieldSpec::new("content", FieldType::String),
                FieldSpec::new("country", FieldType::String).facet(),
                FieldSpec::new("year", FieldType::Int32),
                FieldSpec::new("score", FieldType::Float),
                FieldSpec::new("active", FieldType::Bool),
                FieldSpec::new("embedding", FieldType::FloatVector),
            ],
            embedding_dimension: 4,
            dynamic_fields: false,
        }
    }

    fn translate(filter: &Filter) -> Result<String> {
        TypesenseTranslator::new().translate(filter, &schema())
    }

    #[test]
    fn test_byte_exact_contract() {
        let filter = parse_filter("country in ['UK','NL'] && year >= 2020").unwrap();
        assert_eq!(
            translate(&filter).unwrap(),
            "country:['UK','NL'] && year:>=2020"
        );
    }

    #[test]
    fn test_operator_table() {
        assert_eq!(translate(&Filter::eq("country", "UK")).unwrap(), "country:'UK'");
        assert_eq!(translate(&Filter::ne("year", 2020)).unwrap(), "year:!=2020");
        assert_eq!(translate(&Filter::gt("year", 2020)).unwrap(), "year:>2020");
        assert_eq!(translate(&Filter::gte("score", 0.5)).unwrap(), "score:>=0.5");
        assert_eq!(translate(&Filter::lt("year", 2020)).unwrap(), "year:<2020");
        assert_eq!(translate(&Filter::lte("year", 2020)).unwrap(), "year:<=2020");
        assert_eq!(translate(&Filter::eq("active", true)).unwrap(), "active:true");
    }

    #[test]
    fn test_compound_children_are_parenthesized() {
        let filter = parse_filter("(country == 'UK' || country == 'NL') && year >= 2020").unwrap();
        assert_snapshot!(
            translate(&filter).unwrap(),
            @"(country:'UK' || country:'NL') && year:>=2020"
        );

        let negated = Filter::eq("active", true).negate();
        assert_eq!(translate(&negated).unwrap(), "!(active:true)");
    }

    #[test]
    fn test_empty_in_emits_match_nothing_sentinel() {
        let filter = Filter::In {
            field: "country".into(),
            values: vec![],
        };
        assert_eq!(
            translate(&filter).unwrap(),
            "country:['__anyvec_match_none__']"
        );
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let filter = Filter::eq("publisher", "acme");
        match translate(&filter) {
            Err(Error::UnknownField(field)) => assert_eq!(field, "publisher"),
            other => panic!("expected UnknownField, got {:?}", other),
        }
    }

    #[test]
    fn test_dynamic_schema_permits_undeclared_fields() {
        let mut dynamic = schema();
        dynamic.dynamic_fields = true;
        let out = TypesenseTranslator::new()
            .translate(&Filter::eq("publisher", "acme"), &dynamic)
            .unwrap();
        assert_eq!(out, "publisher:'acme'");
    }

    #[test]
    fn test_injected_values_are_rejected() {
        for hostile in [
            "UK'] || year:>=0 || country:['UK",
            "a && b",
            "x[0]",
            "back`tick",
        ] {
            let filter = Filter::eq("country", hostile);
            assert!(
                matches!(translate(&filter), Err(Error::InvalidInput(_))),
                "value {:?} should be rejected",
                hostile
            );
        }
    }
}
