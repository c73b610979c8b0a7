//! Template CLI commands
//!
//! Local template checking and rendering, without the remote service.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Subcommand;
use serde_json::{Map, Value};

use crate::display::format_template_issues;
use crate::error::{StardustError, StardustResult};
use crate::template::TemplateEngine;

/// Template subcommands
#[derive(Subcommand)]
pub enum TemplateCommands {
    /// Report unbalanced blocks and malformed variables
    Check {
        /// Template file
        file: PathBuf,
    },
    /// Fill a template with parameters and print the result
    Render {
        /// Template file
        file: PathBuf,
        /// JSON file holding the parameter object
        #[arg(short, long)]
        params: Option<PathBuf>,
        /// Set a string parameter (repeatable)
        #[arg(short, long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },
}

/// Handle a template command
pub async fn handle_template_command(
    engine: &TemplateEngine,
    cmd: TemplateCommands,
) -> StardustResult<()> {
    match cmd {
        TemplateCommands::Check { file } => {
            let template = read_template(&file).await?;
            let issues = engine.validate(&template);
            println!("{}", format_template_issues(&issues));
            if !issues.is_empty() {
                return Err(StardustError::InvalidInput(format!(
                    "{} has {} issue(s)",
                    file.display(),
                    issues.len()
                )));
            }
            Ok(())
        }
        TemplateCommands::Render { file, params, set } => {
            let template = read_template(&file).await?;
            let parameters = load_parameters(params.as_deref(), &set).await?;
            let filled = engine.fill(&template, &parameters)?;

            let mut stdout = std::io::stdout().lock();
            stdout.write_all(filled.as_bytes())?;
            stdout.write_all(b"\n")?;
            stdout.flush()?;
            Ok(())
        }
    }
}

async fn read_template(path: &Path) -> StardustResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| StardustError::Io(format!("Failed to read {}: {}", path.display(), e)))
}

/// Build the parameter object from an optional JSON file plus `KEY=VALUE` pairs
///
/// Pairs are applied last and override file values.
async fn load_parameters(file: Option<&Path>, pairs: &[String]) -> StardustResult<Value> {
    let mut parameters = match file {
        Some(path) => {
            let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
                StardustError::Io(format!("Failed to read {}: {}", path.display(), e))
            })?;
            match serde_json::from_str(&contents)? {
                Value::Object(map) => map,
                _ => {
                    return Err(StardustError::InvalidInput(
                        "parameters file must contain a JSON object".into(),
                    ))
                }
            }
        }
        None => Map::new(),
    };

    for pair in pairs {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            StardustError::InvalidInput(format!("expected KEY=VALUE, got '{}'", pair))
        })?;
        parameters.insert(key.trim().to_string(), Value::String(value.to_string()));
    }

    Ok(Value::Object(parameters))
}
