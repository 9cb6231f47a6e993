//! Query evaluation over JSON documents: equality / operator filters and
//! multi-key sorting, following document-database conventions (dotted paths,
//! array fields match on any element, cross-type ordering by type bracket).

use std::cmp::Ordering;

use serde_json::Value;

use super::types::{Document, StoreError, StoreResult};

static NULL: Value = Value::Null;

/// Resolve a dotted path (`"prices.gold"`, `"tags.0"`) inside a document.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Does `doc` satisfy every clause of `filter`? An empty filter matches all.
pub fn matches(doc: &Document, filter: &Document) -> StoreResult<bool> {
    for (key, condition) in filter {
        let ok = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in clauses(key, condition)? {
                    if !matches(doc, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" | "$nor" => {
                let mut any = false;
                for clause in clauses(key, condition)? {
                    if matches(doc, clause)? {
                        any = true;
                        break;
                    }
                }
                if key == "$or" { any } else { !any }
            }
            op if op.starts_with('$') => {
                return Err(StoreError::InvalidQuery(format!("unknown top level operator: {op}")));
            }
            path => field_matches(lookup(doc, path), condition)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses<'a>(op: &str, value: &'a Value) -> StoreResult<Vec<&'a Document>> {
    let invalid = || StoreError::InvalidQuery(format!("{op} needs a non-empty array of objects"));
    let items = value.as_array().filter(|items| !items.is_empty()).ok_or_else(invalid)?;
    items.iter().map(|item| item.as_object().ok_or_else(invalid)).collect()
}

fn field_matches(field: Option<&Value>, condition: &Value) -> StoreResult<bool> {
    match condition {
        Value::Object(ops) if !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')) => {
            for (op, arg) in ops {
                if !apply_operator(field, op, arg)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        _ => Ok(equals_or_contains(field, condition)),
    }
}

fn apply_operator(field: Option<&Value>, op: &str, arg: &Value) -> StoreResult<bool> {
    let ok = match op {
        "$eq" => equals_or_contains(field, arg),
        "$ne" => !equals_or_contains(field, arg),
        "$gt" => compare_field(field, arg, |o| o == Ordering::Greater),
        "$gte" => compare_field(field, arg, |o| o != Ordering::Less),
        "$lt" => compare_field(field, arg, |o| o == Ordering::Less),
        "$lte" => compare_field(field, arg, |o| o != Ordering::Greater),
        "$in" => in_list(op, field, arg)?,
        "$nin" => !in_list(op, field, arg)?,
        "$exists" => field.is_some() == truthy(arg),
        other => return Err(StoreError::InvalidQuery(format!("unknown operator: {other}"))),
    };
    Ok(ok)
}

fn equals_or_contains(field: Option<&Value>, expected: &Value) -> bool {
    match field {
        None => expected.is_null(),
        Some(value) => {
            values_equal(value, expected)
                || matches!(value, Value::Array(items) if items.iter().any(|item| values_equal(item, expected)))
        }
    }
}

fn in_list(op: &str, field: Option<&Value>, arg: &Value) -> StoreResult<bool> {
    let options = arg
        .as_array()
        .ok_or_else(|| StoreError::InvalidQuery(format!("{op} needs an array")))?;
    Ok(options.iter().any(|option| equals_or_contains(field, option)))
}

// Range operators only compare within the same type bracket.
fn compare_field(field: Option<&Value>, arg: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    let Some(value) = field else { return false };
    let candidates: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    candidates
        .into_iter()
        .any(|candidate| type_rank(candidate) == type_rank(arg) && accept(compare_values(candidate, arg)))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        _ => true,
    }
}

/// Structural equality where `1` and `1.0` are the same number.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm.iter().zip(ym).all(|((ka, va), (kb, vb))| ka == kb && values_equal(va, vb))
        }
        _ => a == b,
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Total order across JSON values: null < numbers < strings < objects <
/// arrays < booleans, then by value within a bracket.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(xs), Value::Array(ys)) => xs
            .iter()
            .zip(ys)
            .map(|(x, y)| compare_values(x, y))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| xs.len().cmp(&ys.len())),
        (Value::Object(xm), Value::Object(ym)) => xm
            .iter()
            .zip(ym)
            .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| compare_values(va, vb)))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| xm.len().cmp(&ym.len())),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Sort in place by a `{ field: 1 | -1, ... }` spec, keys applied in order.
pub fn sort_documents(docs: &mut [Document], sort: &Document) -> StoreResult<()> {
    let keys = sort
        .iter()
        .map(|(path, direction)| sort_direction(path, direction).map(|desc| (path.as_str(), desc)))
        .collect::<StoreResult<Vec<_>>>()?;

    docs.sort_by(|a, b| {
        for (path, descending) in &keys {
            let left = lookup(a, path).unwrap_or(&NULL);
            let right = lookup(b, path).unwrap_or(&NULL);
            let ordering = compare_values(left, right);
            let ordering = if *descending { ordering.reverse() } else { ordering };
            if ordering.is_ne() {
                return ordering;
            }
        }
        Ordering::Equal
    });
    Ok(())
}

// Returns `true` for descending.
fn sort_direction(path: &str, direction: &Value) -> StoreResult<bool> {
    match direction {
        Value::Number(n) if n.as_f64() == Some(1.0) => Ok(false),
        Value::Number(n) if n.as_f64() == Some(-1.0) => Ok(true),
        Value::String(s) if s == "asc" || s == "ascending" => Ok(false),
        Value::String(s) if s == "desc" || s == "descending" => Ok(true),
        other => Err(StoreError::InvalidQuery(format!("invalid sort direction for {path}: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_lookup_dotted_paths() {
        let d = doc(json!({ "a": { "b": [10, { "c": 3 }] } }));
        assert_eq!(lookup(&d, "a.b.0"), Some(&json!(10)));
        assert_eq!(lookup(&d, "a.b.1.c"), Some(&json!(3)));
        assert_eq!(lookup(&d, "a.x"), None);
        assert_eq!(lookup(&d, "a.b.c"), None);
    }

    #[test]
    fn test_equality_and_arrays() {
        let d = doc(json!({ "goldExchange": "yes", "value": 1, "tags": ["gold", "live"] }));
        assert!(matches(&d, &doc(json!({}))).unwrap());
        assert!(matches(&d, &doc(json!({ "goldExchange": "yes" }))).unwrap());
        assert!(matches(&d, &doc(json!({ "value": 1.0 }))).unwrap());
        assert!(matches(&d, &doc(json!({ "tags": "live" }))).unwrap());
        assert!(!matches(&d, &doc(json!({ "goldExchange": "no" }))).unwrap());
        assert!(matches(&d, &doc(json!({ "missing": null }))).unwrap());
        assert!(!matches(&d, &doc(json!({ "goldExchange": "yes", "value": 2 }))).unwrap());
    }

    #[test]
    fn test_comparison_operators() {
        let d = doc(json!({ "value": 36.599, "name": "Gold Price" }));
        assert!(matches(&d, &doc(json!({ "value": { "$gt": 30, "$lte": 36.599 } }))).unwrap());
        assert!(!matches(&d, &doc(json!({ "value": { "$lt": 36 } }))).unwrap());
        // different type bracket never compares
        assert!(!matches(&d, &doc(json!({ "value": { "$gt": "a" } }))).unwrap());
        assert!(matches(&d, &doc(json!({ "name": { "$in": ["Silver Price", "Gold Price"] } }))).unwrap());
        assert!(matches(&d, &doc(json!({ "name": { "$nin": ["Test Data"] } }))).unwrap());
        assert!(matches(&d, &doc(json!({ "name": { "$ne": "Test Data" } }))).unwrap());
        assert!(matches(&d, &doc(json!({ "other": { "$exists": false } }))).unwrap());
        assert!(!matches(&d, &doc(json!({ "value": { "$exists": 0 } }))).unwrap());
    }

    #[test]
    fn test_logical_operators() {
        let d = doc(json!({ "name": "Silver Price", "value": 0.295 }));
        assert!(matches(&d, &doc(json!({ "$or": [{ "name": "Gold Price" }, { "value": { "$lt": 1 } }] }))).unwrap());
        assert!(!matches(&d, &doc(json!({ "$and": [{ "name": "Silver Price" }, { "value": 1 }] }))).unwrap());
        assert!(matches(&d, &doc(json!({ "$nor": [{ "name": "Gold Price" }] }))).unwrap());
    }

    #[test]
    fn test_unknown_operator_is_an_error() {
        let d = doc(json!({ "value": 1 }));
        assert!(matches!(
            matches(&d, &doc(json!({ "value": { "$regex": "x" } }))),
            Err(StoreError::InvalidQuery(_))
        ));
        assert!(matches(&d, &doc(json!({ "$where": "1" }))).is_err());
        assert!(matches(&d, &doc(json!({ "$or": [] }))).is_err());
    }

    #[test]
    fn test_sort_multiple_keys() {
        let mut docs = vec![
            doc(json!({ "k": "b", "v": 1 })),
            doc(json!({ "k": "a", "v": 2 })),
            doc(json!({ "k": "b", "v": 3 })),
            doc(json!({ "v": 0 })),
        ];
        sort_documents(&mut docs, &doc(json!({ "k": 1, "v": -1 }))).unwrap();
        let order: Vec<i64> = docs.iter().map(|d| d["v"].as_i64().unwrap()).collect();
        assert_eq!(order, vec![0, 2, 3, 1]);
    }

    #[test]
    fn test_sort_rejects_bad_direction() {
        let mut docs = vec![doc(json!({ "v": 1 }))];
        assert!(sort_documents(&mut docs, &doc(json!({ "v": 2 }))).is_err());
    }

    #[test]
    fn test_cross_type_ordering() {
        assert_eq!(compare_values(&json!(null), &json!(0)), Ordering::Less);
        assert_eq!(compare_values(&json!(100), &json!("1")), Ordering::Less);
        assert_eq!(compare_values(&json!("z"), &json!({})), Ordering::Less);
        assert_eq!(compare_values(&json!([1, 2]), &json!([1, 3])), Ordering::Less);
        assert_eq!(compare_values(&json!(true), &json!([])), Ordering::Greater);
    }
}
