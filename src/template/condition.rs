//! Condition expressions for `{{#if}}` and `{{#unless}}`
//!
//! A condition without operator characters is a path whose truthiness
//! decides. Otherwise the expression is split on the first operator of
//! [`OPERATORS`] that occurs anywhere in the text, in that fixed order, not
//! by precedence. `a && b == c` therefore splits on `==` into `a && b` and
//! `c`, and `a === b` splits on `==` into `a` and `= b`. Existing templates
//! depend on this, so it must not be "fixed" to normal precedence.

use std::borrow::Cow;
use std::cmp::Ordering;

use serde_json::Value;

use super::path::{is_truthy, stringify, Scope};

/// Operators in the order they are tried
pub const OPERATORS: [&str; 10] = ["==", "===", "!=", "!==", ">", ">=", "<", "<=", "&&", "||"];

const OPERATOR_CHARS: [char; 6] = ['=', '!', '<', '>', '&', '|'];

/// Evaluate a condition; malformed conditions are false
pub fn evaluate(condition: &str, scope: &Scope<'_>) -> bool {
    let condition = condition.trim();

    if !condition.contains(&OPERATOR_CHARS[..]) {
        return is_truthy(scope.resolve(condition).as_deref());
    }

    for op in OPERATORS {
        if !condition.contains(op) {
            continue;
        }
        let parts: Vec<&str> = condition.split(op).map(str::trim).collect();
        if let [left, right] = parts.as_slice() {
            let left = operand(left, scope);
            let right = operand(right, scope);
            return apply(op, &left, &right);
        }
    }

    false
}

/// Resolve one side, falling back to its literal text when the value is
/// missing or falsy
///
/// `0`, `false`, `""` and `null` all fall back, so `count == 0` with
/// `count = 0` compares the text `"count"` against `"0"`. Empty arrays and
/// objects are kept.
fn operand<'a>(text: &str, scope: &Scope<'a>) -> Cow<'a, Value> {
    match scope.resolve(text) {
        Some(value) if !falls_back(&value) => value,
        _ => Cow::Owned(Value::String(text.to_string())),
    }
}

fn falls_back(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map(|f| f == 0.0 || f.is_nan()).unwrap_or(false),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn apply(op: &str, left: &Value, right: &Value) -> bool {
    match op {
        "==" => loose_eq(left, right),
        "===" => strict_eq(left, right),
        "!=" => !loose_eq(left, right),
        "!==" => !strict_eq(left, right),
        ">" => compare(left, right) == Some(Ordering::Greater),
        ">=" => matches!(compare(left, right), Some(Ordering::Greater | Ordering::Equal)),
        "<" => compare(left, right) == Some(Ordering::Less),
        "<=" => matches!(compare(left, right), Some(Ordering::Less | Ordering::Equal)),
        "&&" => !falls_back(left) && !falls_back(right),
        "||" => !falls_back(left) || !falls_back(right),
        _ => false,
    }
}

/// Same type and same value
fn strict_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

/// Equality with numeric coercion between strings, numbers and booleans
fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(_), Value::Number(_)) | (Value::Bool(_), Value::Bool(_)) => {
            strict_eq(left, right)
        }
        (
            Value::Number(_) | Value::String(_) | Value::Bool(_),
            Value::Number(_) | Value::String(_) | Value::Bool(_),
        ) => {
            let (a, b) = (to_number(left), to_number(right));
            !a.is_nan() && a == b
        }
        (Value::Array(_) | Value::Object(_), Value::Array(_) | Value::Object(_)) => left == right,
        (composite @ (Value::Array(_) | Value::Object(_)), primitive)
        | (primitive, composite @ (Value::Array(_) | Value::Object(_))) => {
            loose_eq(&Value::String(primitive_text(composite)), primitive)
        }
    }
}

/// Strings compare lexically; everything else numerically
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return Some(a.cmp(b));
    }
    to_number(left).partial_cmp(&to_number(right))
}

fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            [only] => to_number(only),
            _ => f64::NAN,
        },
        Value::Object(_) => f64::NAN,
    }
}

/// Text form of a composite when compared against a primitive
fn primitive_text(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Array(_) => primitive_text(item),
                Value::Object(_) => "[object Object]".to_string(),
                other => stringify(other).map(Cow::into_owned).unwrap_or_default(),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
        other => stringify(other).map(Cow::into_owned).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(condition: &str, params: Value) -> bool {
        let map = params.as_object().unwrap().clone();
        evaluate(condition, &Scope::root(&map))
    }

    #[test]
    fn test_bare_path() {
        assert!(eval("flag", json!({ "flag": true })));
        assert!(!eval("flag", json!({ "flag": 0 })));
        assert!(!eval("missing", json!({})));
        assert!(eval("user.name", json!({ "user": { "name": "Ann" } })));
    }

    #[test]
    fn test_equality_with_literal_fallback() {
        assert!(eval("genre == scifi", json!({ "genre": "scifi" })));
        assert!(eval("genre == \"scifi\"", json!({ "genre": "scifi" })));
        assert!(!eval("genre == fantasy", json!({ "genre": "scifi" })));
        assert!(eval("genre != fantasy", json!({ "genre": "scifi" })));
    }

    #[test]
    fn test_loose_numeric_equality() {
        assert!(eval("count == 3", json!({ "count": 3 })));
        assert!(eval("count == '3'", json!({ "count": 3 })));
        assert!(eval("flag == 1", json!({ "flag": true })));
    }

    #[test]
    fn test_relational() {
        assert!(eval("chapters > 10", json!({ "chapters": 12 })));
        assert!(!eval("chapters < 10", json!({ "chapters": 12 })));
        assert!(eval("words < 600", json!({ "words": "500" })));
        assert!(!eval("words > many", json!({ "words": 5 })));
    }

    #[test]
    fn test_first_operator_wins() {
        // "==" is found before "===", leaving "= b" as the right side
        assert!(!eval("a === b", json!({ "a": "x", "b": "x" })));
        // ">" is tried before ">=", splitting into "a" and "= 3"
        assert!(!eval("a >= 3", json!({ "a": 5 })));
    }

    #[test]
    fn test_combined_expression_splits_on_equality_first() {
        let params = json!({ "a": true, "b": "x", "c": "x" });
        // Left side "a && b" resolves to nothing and falls back to its text
        assert!(!eval("a && b == c", params));
    }

    #[test]
    fn test_logical() {
        assert!(eval("a && b", json!({ "a": "yes", "b": 1 })));
        assert!(eval("a || b", json!({ "a": "", "b": 1 })));
        // Empty operands fall back to their names, which are truthy text
        assert!(eval("a || b", json!({ "a": "", "b": "" })));
    }

    #[test]
    fn test_falsy_operands_fall_back_to_text() {
        let params = json!({ "count": 0, "flag": false, "name": "" });
        assert!(!eval("count == 0", params.clone()));
        assert!(!eval("flag == false", params.clone()));
        assert!(!eval("name == ''", params.clone()));
        assert!(eval("count == count", params.clone()));
        assert!(eval("name != ''", params));
    }

    #[test]
    fn test_empty_composites_are_kept() {
        let params = json!({ "tags": [], "meta": {} });
        assert!(eval("tags && meta", params.clone()));
        // [] converts to 0; the text "tags" would not compare at all
        assert!(eval("tags < 1", params));
    }

    #[test]
    fn test_malformed_defaults_to_false() {
        assert!(!eval("!flag", json!({ "flag": false })));
        assert!(!eval("a == b == c", json!({})));
    }

    #[test]
    fn test_composite_comparison() {
        assert!(eval("tags == 'a,b'", json!({ "tags": ["a", "b"] })));
    }
}
