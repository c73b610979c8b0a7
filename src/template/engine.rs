//! Template expansion
//!
//! `TemplateEngine::fill` parses the template into a node tree, renders it
//! against the caller's parameters and runs a final cleanup pass:
//! leftover `{{...}}` markers are removed, runs of blank lines collapse to
//! one blank line and trailing whitespace is trimmed.
//!
//! Every intermediate string that holds template or parameter text is
//! wiped when it is released.

use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::OsRng;
use chrono::{Local, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use zeroize::{Zeroize, Zeroizing};

use super::condition;
use super::parser::{self, Node, TemplateError};
use super::path::{stringify, Frame, Scope};
use crate::crypto::SecureString;
use crate::error::{StardustError, StardustResult};

/// A structural problem reported by [`TemplateEngine::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateIssue {
    /// Opening and closing block tag counts differ
    UnbalancedBlocks { opened: usize, closed: usize },
    /// A variable tag containing a doubled `{{{{` opener
    MalformedVariable { offset: usize },
}

impl fmt::Display for TemplateIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnbalancedBlocks { opened, closed } => write!(
                f,
                "unclosed block tags: {} opening, {} closing",
                opened, closed
            ),
            Self::MalformedVariable { offset } => {
                write!(f, "malformed variable at byte {}", offset)
            }
        }
    }
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static pattern is valid"))
}

fn leftover_marker() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"\{\{[^}]*\}\}")
}

fn blank_lines() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"\n\s*\n\s*\n")
}

fn open_tag() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"\{\{#(if|unless|each|with)[^}]*\}\}")
}

fn close_tag() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"\{\{/(if|unless|each|with)\}\}")
}

fn variable_tag() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"\{\{([^}]+)\}\}")
}

/// Expands templates against a JSON parameter object
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateEngine {
    builtins: bool,
}

impl TemplateEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose `@date`, `@time`, `@timestamp` and `@random` to templates
    pub fn with_builtins(mut self, enabled: bool) -> Self {
        self.builtins = enabled;
        self
    }

    /// Expand `template` with `parameters`
    ///
    /// Rejects an empty template or non-object parameters with
    /// `InvalidInput` before any expansion. Failures during expansion are
    /// reported as `TemplateFill`.
    pub fn fill(&self, template: &str, parameters: &Value) -> StardustResult<SecureString> {
        if template.is_empty() {
            return Err(StardustError::InvalidInput(
                "template must be non-empty text".into(),
            ));
        }
        let Value::Object(parameters) = parameters else {
            return Err(StardustError::InvalidInput(
                "parameters must be an object".into(),
            ));
        };

        let rendered = self
            .render(template, parameters)
            .map_err(|e| StardustError::TemplateFill(e.to_string()))?;
        let mut cleaned = cleanup(rendered);
        Ok(SecureString::new(std::mem::take(&mut *cleaned)))
    }

    fn render(
        &self,
        template: &str,
        parameters: &Map<String, Value>,
    ) -> Result<Zeroizing<String>, TemplateError> {
        let nodes = parser::parse(template)?;
        let mut out = Zeroizing::new(String::with_capacity(template.len()));

        let builtins = if self.builtins {
            builtin_variables()
        } else {
            Map::new()
        };
        let mut scope = Scope::root(parameters);
        if !builtins.is_empty() {
            scope = scope.push(Frame::With(&builtins));
        }

        render_nodes(&nodes, &scope, &mut out)?;
        Ok(out)
    }

    /// Shallow structural check
    ///
    /// Only compares the number of opening and closing block tags; it does
    /// not check that blocks are properly nested or matched by kind.
    pub fn validate(&self, template: &str) -> Vec<TemplateIssue> {
        let mut issues = Vec::new();

        let opened = open_tag().find_iter(template).count();
        let closed = close_tag().find_iter(template).count();
        if opened != closed {
            issues.push(TemplateIssue::UnbalancedBlocks { opened, closed });
        }

        for tag in variable_tag().find_iter(template) {
            if tag.as_str().contains("{{{{") {
                issues.push(TemplateIssue::MalformedVariable {
                    offset: tag.start(),
                });
            }
        }

        issues
    }

    /// Evaluate a block condition against parameters
    pub fn evaluate_condition(&self, condition: &str, parameters: &Value) -> bool {
        match parameters {
            Value::Object(map) => condition::evaluate(condition, &Scope::root(map)),
            _ => false,
        }
    }
}

fn render_nodes<'a>(
    nodes: &[Node<'_>],
    scope: &Scope<'a>,
    out: &mut String,
) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Variable(expr) => {
                if let Some(value) = scope.resolve(expr) {
                    let text =
                        stringify(&value).map_err(|e| TemplateError::Serialize(e.to_string()))?;
                    out.push_str(&text);
                    if let Cow::Owned(mut owned) = text {
                        owned.zeroize();
                    }
                }
            }
            Node::If {
                condition,
                negate,
                then,
                otherwise,
            } => {
                let branch = if condition::evaluate(condition, scope) != *negate {
                    then
                } else {
                    otherwise
                };
                render_nodes(branch, scope, out)?;
            }
            Node::Each { path, body } => {
                if let Some(Cow::Borrowed(Value::Array(items))) = scope.resolve(path) {
                    for (index, item) in items.iter().enumerate() {
                        let frame = Frame::Loop {
                            item,
                            index,
                            len: items.len(),
                        };
                        render_nodes(body, &scope.push(frame), out)?;
                    }
                }
            }
            Node::With { path, body } => {
                if let Some(Cow::Borrowed(Value::Object(fields))) = scope.resolve(path) {
                    render_nodes(body, &scope.push(Frame::With(fields)), out)?;
                }
            }
        }
    }
    Ok(())
}

/// Replace every match, wiping the previous buffer when a copy was made
fn replace_all(re: &Regex, text: Zeroizing<String>, replacement: &str) -> Zeroizing<String> {
    let replaced = match re.replace_all(&text, replacement) {
        Cow::Owned(s) => Some(s),
        Cow::Borrowed(_) => None,
    };
    match replaced {
        Some(s) => Zeroizing::new(s),
        None => text,
    }
}

fn cleanup(text: Zeroizing<String>) -> Zeroizing<String> {
    let text = replace_all(leftover_marker(), text, "");
    let mut text = replace_all(blank_lines(), text, "\n\n");
    let trimmed = text.trim_end().len();
    text.truncate(trimmed);
    text
}

fn builtin_variables() -> Map<String, Value> {
    let now = Utc::now();
    let mut vars = Map::new();
    vars.insert(
        "@date".into(),
        Value::String(now.format("%Y-%m-%d").to_string()),
    );
    vars.insert(
        "@time".into(),
        Value::String(Local::now().format("%H:%M:%S").to_string()),
    );
    vars.insert("@timestamp".into(), Value::from(now.timestamp_millis()));
    vars.insert("@random".into(), Value::String(random_base36(9)));
    vars
}

fn random_base36(len: usize) -> String {
    const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    (0..len)
        .map(|_| ALPHABET[(OsRng.next_u32() % 36) as usize] as char)
        .collect()
}
