//! Semantic tests for the portable filter language: a parsed filter, when
//! evaluated against an in-memory record set, selects exactly the records the
//! expression predicts.

use anyvec_core::{parse_filter, CompareOp, Filter, FilterValue};
use serde_json::{json, Map, Value};

fn value_matches(record_value: &Value, filter_value: &FilterValue) -> bool {
    match (record_value, filter_value) {
        (Value::String(a), FilterValue::Str(b)) => a == b,
        (Value::Number(a), FilterValue::Int(b)) => a.as_f64() == Some(*b as f64),
        (Value::Number(a), FilterValue::Float(b)) => a.as_f64() == Some(*b),
        (Value::Bool(a), FilterValue::Bool(b)) => a == b,
        _ => false,
    }
}

fn compare(record_value: &Value, op: CompareOp, filter_value: &FilterValue) -> bool {
    match op {
        CompareOp::Eq => value_matches(record_value, filter_value),
        CompareOp::Ne => !value_matches(record_value, filter_value),
        CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte => {
            let left = record_value.as_f64();
            let right = match filter_value {
                FilterValue::Int(i) => Some(*i as f64),
                FilterValue::Float(x) => Some(*x),
                _ => None,
            };
            match (left, right) {
                (Some(l), Some(r)) => match op {
                    CompareOp::Gt => l > r,
                    CompareOp::Gte => l >= r,
                    CompareOp::Lt => l < r,
                    CompareOp::Lte => l <= r,
                    _ => unreachable!(),
                },
                _ => false,
            }
        }
    }
}

fn eval(filter: &Filter, record: &Map<String, Value>) -> bool {
    match filter {
        Filter::Compare { field, op, value } => record
            .get(field)
            .map(|v| compare(v, *op, value))
            .unwrap_or(false),
        Filter::In { field, values } => record
            .get(field)
            .map(|v| match v {
                Value::Array(items) => items
                    .iter()
                    .any(|item| values.iter().any(|fv| value_matches(item, fv))),
                scalar => values.iter().any(|fv| value_matches(scalar, fv)),
            })
            .unwrap_or(false),
        Filter::And(l, r) => eval(l, record) && eval(r, record),
        Filter::Or(l, r) => eval(l, record) || eval(r, record),
        Filter::Not(child) => !eval(child, record),
        Filter::Group(child) => eval(child, record),
    }
}

fn records() -> Vec<Map<String, Value>> {
    [
        json!({"id": "a", "country": "UK", "year": 2021, "active": true, "tags": ["ml", "search"]}),
        json!({"id": "b", "country": "NL", "year": 2019, "active": false, "tags": ["search"]}),
        json!({"id": "c", "country": "DE", "year": 2022, "active": true, "tags": []}),
        json!({"id": "d", "country": "UK", "year": 2018, "active": false, "tags": ["ml"]}),
    ]
    .into_iter()
    .map(|v| v.as_object().unwrap().clone())
    .collect()
}

fn select(filter_text: &str) -> Vec<String> {
    let filter = parse_filter(filter_text).unwrap();
    records()
        .iter()
        .filter(|r| eval(&filter, r))
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn in_and_range_combination() {
    assert_eq!(select("country in ['UK','NL'] && year >= 2020"), ["a"]);
}

#[test]
fn or_with_grouping_and_negation() {
    assert_eq!(select("(country == 'DE' || country == 'NL')"), ["b", "c"]);
    assert_eq!(select("!(country == 'UK') && active == true"), ["c"]);
}

#[test]
fn comparison_operators() {
    assert_eq!(select("year > 2021"), ["c"]);
    assert_eq!(select("year <= 2019"), ["b", "d"]);
    assert_eq!(select("country != 'UK'"), ["b", "c"]);
    assert_eq!(select("active == false"), ["b", "d"]);
}

#[test]
fn membership_over_string_arrays() {
    assert_eq!(select("tags in ['ml']"), ["a", "d"]);
}

#[test]
fn empty_in_matches_no_records() {
    assert!(select("country in []").is_empty());
}

#[test]
fn parsed_and_built_trees_select_identically() {
    let parsed = parse_filter("country in ['UK','NL'] && year >= 2020").unwrap();
    let built = Filter::is_in("country", ["UK", "NL"]).and(Filter::gte("year", 2020));
    assert_eq!(parsed, built);

    for record in records() {
        assert_eq!(eval(&parsed, &record), eval(&built, &record));
    }
}
