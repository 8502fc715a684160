//! In-memory view pipeline: search, filter, sort, paginate.

use std::cmp::Ordering;

use serde_json::Value;
use sijil_api_types::{ParamValue, SortDirection, TableQueryParams};

use super::search::normalize;

/// Indices of the visible page and the number of records that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct View {
    pub(crate) indices: Vec<usize>,
    pub(crate) total: usize,
}

pub(crate) fn compute(rows: &[Value], params: &TableQueryParams) -> View {
    let needle = normalize(&params.search);
    let mut matched: Vec<usize> = (0..rows.len())
        .filter(|&index| needle.is_empty() || matches_search(&rows[index], &needle))
        .filter(|&index| {
            params
                .active_filters()
                .all(|(field, expected)| matches_filter(rows[index].get(field), expected))
        })
        .collect();

    if !params.sort_by.is_empty() {
        let field = params.sort_by.as_str();
        matched.sort_by(|&left, &right| {
            let ordering = compare(rows[left].get(field), rows[right].get(field));
            match params.sort_direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
    }

    let total = matched.len();
    let page_size = params.page_size.max(1) as usize;
    let start = (params.page.max(1) as usize - 1).saturating_mul(page_size);
    let indices = matched.into_iter().skip(start).take(page_size).collect();

    View { indices, total }
}

fn matches_search(row: &Value, needle: &str) -> bool {
    match row {
        Value::Object(fields) => fields.values().any(|value| value_contains(value, needle)),
        other => value_contains(other, needle),
    }
}

fn value_contains(value: &Value, needle: &str) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => normalize(text).contains(needle),
        other => normalize(&other.to_string()).contains(needle),
    }
}

fn matches_filter(actual: Option<&Value>, expected: &ParamValue) -> bool {
    let Some(actual) = actual else {
        return false;
    };
    match (actual, expected) {
        (Value::Bool(left), ParamValue::Bool(right)) => left == right,
        (Value::String(left), ParamValue::Text(right)) => left == right,
        (Value::Number(left), ParamValue::Int(right)) => left.as_f64() == Some(*right as f64),
        (Value::Number(left), ParamValue::Float(right)) => left.as_f64() == Some(*right),
        _ => false,
    }
}

/// Ordering used for sorting: missing and null first, then booleans,
/// numbers and strings, each compared naturally.
fn compare(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    let left = left.unwrap_or(&Value::Null);
    let right = right.unwrap_or(&Value::Null);
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => rank(left).cmp(&rank(right)),
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sijil_api_types::Filters;

    use super::*;

    fn rows() -> Vec<Value> {
        vec![
            json!({"id": 1, "name": "Alice", "value": 10, "active": true}),
            json!({"id": 2, "name": "Bob", "value": 20, "active": false}),
            json!({"id": 3, "name": "Carol", "value": 5, "active": true}),
        ]
    }

    fn params() -> TableQueryParams {
        TableQueryParams::default()
    }

    #[test]
    fn search_matches_any_field() {
        let view = compute(
            &rows(),
            &TableQueryParams {
                search: "BOB".into(),
                ..params()
            },
        );
        assert_eq!(view.indices, vec![1]);
        assert_eq!(view.total, 1);

        let by_number = compute(
            &rows(),
            &TableQueryParams {
                search: "20".into(),
                ..params()
            },
        );
        assert_eq!(by_number.indices, vec![1]);
    }

    #[test]
    fn filters_use_strict_equality_and_skip_empty_values() {
        let mut filters = Filters::new();
        filters.insert("active".into(), ParamValue::Bool(true));
        filters.insert("name".into(), ParamValue::from(""));
        let view = compute(
            &rows(),
            &TableQueryParams {
                filters,
                ..params()
            },
        );
        assert_eq!(view.indices, vec![0, 2]);

        let mut filters = Filters::new();
        filters.insert("id".into(), ParamValue::from("2"));
        let view = compute(
            &rows(),
            &TableQueryParams {
                filters,
                ..params()
            },
        );
        assert!(view.indices.is_empty());
    }

    #[test]
    fn sort_is_stable_and_reversible() {
        let asc = compute(
            &rows(),
            &TableQueryParams {
                sort_by: "active".into(),
                ..params()
            },
        );
        assert_eq!(asc.indices, vec![1, 0, 2]);

        let desc = compute(
            &rows(),
            &TableQueryParams {
                sort_by: "active".into(),
                sort_direction: SortDirection::Desc,
                ..params()
            },
        );
        assert_eq!(desc.indices, vec![0, 2, 1]);
    }

    #[test]
    fn missing_sort_fields_order_first() {
        let rows = vec![json!({"n": 2}), json!({}), json!({"n": 1})];
        let view = compute(
            &rows,
            &TableQueryParams {
                sort_by: "n".into(),
                ..params()
            },
        );
        assert_eq!(view.indices, vec![1, 2, 0]);
    }

    #[test]
    fn out_of_range_pages_are_empty() {
        let view = compute(
            &rows(),
            &TableQueryParams {
                page: 5,
                page_size: 2,
                ..params()
            },
        );
        assert!(view.indices.is_empty());
        assert_eq!(view.total, 3);
    }
}
