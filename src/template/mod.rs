//! Prompt template language
//!
//! Supports `{{path}}` interpolation, `{{#if}}`/`{{#unless}}` with an
//! optional `{{else}}`, `{{#each}}` loops and `{{#with}}` scopes, nested to
//! any depth up to [`parser::MAX_DEPTH`].

pub mod condition;
pub mod engine;
pub mod parser;
pub mod path;

pub use engine::{TemplateEngine, TemplateIssue};
pub use parser::TemplateError;
pub use path::get_value_by_path;
