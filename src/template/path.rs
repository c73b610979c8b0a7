//! Path expressions and value semantics
//!
//! Resolves expressions such as `user.name`, `items[0]`, `"literal"`, `42`
//! and `true` against a stack of scopes, and defines how values are
//! stringified and judged truthy.

use std::borrow::Cow;

use serde_json::{Map, Value};

/// One step of a dotted path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// A parsed expression: either a literal or a lookup path
#[derive(Debug, Clone, PartialEq)]
pub enum PathExpr {
    Literal(Value),
    Path(Vec<Segment>),
}

impl PathExpr {
    /// Parse an expression; empty input yields `None`
    pub fn parse(expr: &str) -> Option<Self> {
        if expr.is_empty() {
            return None;
        }

        if let Some(text) = quoted(expr, '"').or_else(|| quoted(expr, '\'')) {
            return Some(Self::Literal(Value::String(text.to_string())));
        }

        if expr.bytes().all(|b| b.is_ascii_digit()) {
            let number = expr
                .parse::<u64>()
                .map(Value::from)
                .unwrap_or_else(|_| expr.parse::<f64>().map(Value::from).unwrap_or(Value::Null));
            return Some(Self::Literal(number));
        }

        match expr {
            "true" => return Some(Self::Literal(Value::Bool(true))),
            "false" => return Some(Self::Literal(Value::Bool(false))),
            _ => {}
        }

        let mut segments = Vec::new();
        for part in expr.split('.') {
            match indexed(part) {
                Some((name, indices)) => {
                    segments.push(Segment::Key(name.to_string()));
                    segments.extend(indices.into_iter().map(Segment::Index));
                }
                None => segments.push(Segment::Key(part.to_string())),
            }
        }
        Some(Self::Path(segments))
    }
}

fn quoted(expr: &str, quote: char) -> Option<&str> {
    if expr.starts_with(quote) && expr.ends_with(quote) {
        Some(if expr.len() >= 2 { &expr[1..expr.len() - 1] } else { "" })
    } else {
        None
    }
}

/// Split `name[0][1]` into its name and indices
fn indexed(part: &str) -> Option<(&str, Vec<usize>)> {
    let open = part.find('[')?;
    let name = &part[..open];
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return None;
    }

    let mut indices = Vec::new();
    let mut rest = &part[open..];
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        let digits = &inner[..close];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        indices.push(digits.parse().ok()?);
        rest = &inner[close + 1..];
    }
    Some((name, indices))
}

/// One level of variable scope
#[derive(Debug, Clone, Copy)]
pub enum Frame<'a> {
    /// Caller parameters
    Root(&'a Map<String, Value>),
    /// Fields of a `{{#with}}` object, shadowing outer names
    With(&'a Map<String, Value>),
    /// Current element of an `{{#each}}` loop
    Loop {
        item: &'a Value,
        index: usize,
        len: usize,
    },
}

/// Stack of frames, innermost last
#[derive(Debug, Clone)]
pub struct Scope<'a> {
    frames: Vec<Frame<'a>>,
}

impl<'a> Scope<'a> {
    pub fn root(parameters: &'a Map<String, Value>) -> Self {
        Self {
            frames: vec![Frame::Root(parameters)],
        }
    }

    /// A child scope with one more frame on top
    pub fn push(&self, frame: Frame<'a>) -> Self {
        let mut frames = self.frames.clone();
        frames.push(frame);
        Self { frames }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Resolve an expression; `None` means undefined
    ///
    /// Any undefined step short-circuits the whole path.
    pub fn resolve(&self, expr: &str) -> Option<Cow<'a, Value>> {
        let expr = expr.trim();
        if expr == "." {
            return self.current_item().map(Cow::Borrowed);
        }

        match PathExpr::parse(expr)? {
            PathExpr::Literal(value) => Some(Cow::Owned(value)),
            PathExpr::Path(segments) => {
                let (head, rest) = segments.split_first()?;
                let Segment::Key(head) = head else {
                    return None;
                };
                match self.lookup(head)? {
                    Cow::Borrowed(value) => walk(value, rest).map(Cow::Borrowed),
                    Cow::Owned(value) if rest.is_empty() => Some(Cow::Owned(value)),
                    Cow::Owned(_) => None,
                }
            }
        }
    }

    fn current_item(&self) -> Option<&'a Value> {
        self.frames.iter().rev().find_map(|frame| match frame {
            Frame::Loop { item, .. } => Some(*item),
            _ => None,
        })
    }

    fn lookup(&self, name: &str) -> Option<Cow<'a, Value>> {
        for frame in self.frames.iter().rev() {
            match frame {
                Frame::Loop { item, index, len } => match name {
                    "@item" | "this" => return Some(Cow::Borrowed(*item)),
                    "@index" => return Some(Cow::Owned(Value::from(*index))),
                    "@first" => return Some(Cow::Owned(Value::Bool(*index == 0))),
                    "@last" => return Some(Cow::Owned(Value::Bool(*index + 1 == *len))),
                    _ => {}
                },
                Frame::With(fields) | Frame::Root(fields) => {
                    if let Some(value) = fields.get(name) {
                        return Some(Cow::Borrowed(value));
                    }
                }
            }
        }
        None
    }
}

fn walk<'a>(mut current: &'a Value, segments: &[Segment]) -> Option<&'a Value> {
    for segment in segments {
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get(key)?,
            (Segment::Key(key), Value::Array(items)) => items.get(key.parse::<usize>().ok()?)?,
            (Segment::Index(i), Value::Array(items)) => items.get(*i)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Look up a path against a parameter object
///
/// Non-object parameters resolve nothing.
pub fn get_value_by_path(parameters: &Value, path: &str) -> Option<Value> {
    let Value::Object(map) = parameters else {
        return None;
    };
    Scope::root(map).resolve(path).map(Cow::into_owned)
}

/// Truthiness used by `{{#if}}` and `{{#unless}}`
///
/// Empty strings, zero, empty arrays and objects, null, undefined and
/// `false` are falsy.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

/// Render a value for interpolation
///
/// Objects and arrays become pretty-printed JSON with two-space indent.
pub fn stringify(value: &Value) -> Result<Cow<'_, str>, serde_json::Error> {
    Ok(match value {
        Value::Null => Cow::Borrowed(""),
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
        Value::Number(n) => Cow::Owned(format_number(n)),
        Value::Array(_) | Value::Object(_) => Cow::Owned(serde_json::to_string_pretty(value)?),
    })
}

/// Integral floats print without a fractional part (`3`, not `3.0`)
pub fn format_number(n: &serde_json::Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dotted_path() {
        let params = json!({ "user": { "name": "Ann" } });
        assert_eq!(get_value_by_path(&params, "user.name"), Some(json!("Ann")));
    }

    #[test]
    fn test_indexed_path() {
        let params = json!({ "items": ["x", "y"], "grid": [[1, 2], [3, 4]] });
        assert_eq!(get_value_by_path(&params, "items[1]"), Some(json!("y")));
        assert_eq!(get_value_by_path(&params, "grid[1][0]"), Some(json!(3)));
        assert_eq!(get_value_by_path(&params, "items.0"), Some(json!("x")));
    }

    #[test]
    fn test_missing_path_is_undefined() {
        assert_eq!(get_value_by_path(&json!({}), "missing.path"), None);
        assert_eq!(get_value_by_path(&json!({ "a": null }), "a.b"), None);
        assert_eq!(get_value_by_path(&json!({ "a": "text" }), "a[0]"), None);
    }

    #[test]
    fn test_literals() {
        let params = json!({ "true": "shadowed" });
        assert_eq!(get_value_by_path(&params, "\"hi\""), Some(json!("hi")));
        assert_eq!(get_value_by_path(&params, "'hi'"), Some(json!("hi")));
        assert_eq!(get_value_by_path(&params, "42"), Some(json!(42)));
        assert_eq!(get_value_by_path(&params, "true"), Some(json!(true)));
        assert_eq!(get_value_by_path(&params, "false"), Some(json!(false)));
    }

    #[test]
    fn test_empty_path() {
        assert_eq!(get_value_by_path(&json!({ "": 1 }), ""), None);
    }

    #[test]
    fn test_loop_frame_names() {
        let params = json!({ "title": "T" });
        let map = params.as_object().unwrap();
        let item = json!({ "name": "Ann" });
        let scope = Scope::root(map).push(Frame::Loop {
            item: &item,
            index: 1,
            len: 2,
        });

        assert_eq!(scope.resolve("@index").unwrap().into_owned(), json!(1));
        assert_eq!(scope.resolve("@first").unwrap().into_owned(), json!(false));
        assert_eq!(scope.resolve("@last").unwrap().into_owned(), json!(true));
        assert_eq!(scope.resolve("this.name").unwrap().into_owned(), json!("Ann"));
        assert_eq!(scope.resolve("@item.name").unwrap().into_owned(), json!("Ann"));
        assert_eq!(scope.resolve(".").unwrap().into_owned(), item);
        assert_eq!(scope.resolve("title").unwrap().into_owned(), json!("T"));
        assert!(scope.resolve("@index.x").is_none());
    }

    #[test]
    fn test_with_frame_shadows() {
        let params = json!({ "name": "outer", "genre": "scifi" });
        let inner = json!({ "name": "inner" });
        let scope = Scope::root(params.as_object().unwrap())
            .push(Frame::With(inner.as_object().unwrap()));

        assert_eq!(scope.resolve("name").unwrap().into_owned(), json!("inner"));
        assert_eq!(scope.resolve("genre").unwrap().into_owned(), json!("scifi"));
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some(&json!(null))));
        assert!(!is_truthy(Some(&json!(0))));
        assert!(!is_truthy(Some(&json!(""))));
        assert!(!is_truthy(Some(&json!([]))));
        assert!(!is_truthy(Some(&json!({}))));
        assert!(is_truthy(Some(&json!("0"))));
        assert!(is_truthy(Some(&json!({ "a": 1 }))));
        assert!(is_truthy(Some(&json!(-1.5))));
    }

    #[test]
    fn test_stringify() {
        assert_eq!(stringify(&json!(null)).unwrap(), "");
        assert_eq!(stringify(&json!(3.0)).unwrap(), "3");
        assert_eq!(stringify(&json!(2.5)).unwrap(), "2.5");
        assert_eq!(stringify(&json!(true)).unwrap(), "true");
        assert_eq!(stringify(&json!({ "a": 1 })).unwrap(), "{\n  \"a\": 1\n}");
    }
}
