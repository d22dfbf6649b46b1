//! CLI command implementations
//!
//! Commands write their output to the writer they are given, so they can be
//! driven from tests as well as from `main`.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::RuntimeConfig;
use crate::connector::MEMORY_CONNECTOR_NAME;
use crate::model::{Model, ModelDefinition};
use crate::planner::QueryDescription;
use crate::registry::ModelRegistry;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_json_file, write_json_line};

/// Run a parsed command against `config`
pub fn run_command<W: Write>(command: Command, config: &RuntimeConfig, out: &mut W) -> CliResult<()> {
    match command {
        Command::Validate { definitions } => {
            let path = definitions_path(definitions, config)?;
            validate(&path, config, out).map(|_| ())
        }
        Command::Query {
            definitions,
            model,
            data,
            query,
        } => {
            let path = definitions_path(definitions, config)?;
            self::query(&path, &model, &data, query.as_deref(), config, out)
        }
    }
}

fn definitions_path(flag: Option<PathBuf>, config: &RuntimeConfig) -> CliResult<PathBuf> {
    flag.or_else(|| config.definitions.clone()).ok_or_else(|| {
        CliError::usage("no definitions file given: pass --definitions or set \"definitions\" in the config")
    })
}

/// Compile every definition in the file into a fresh registry.
///
/// Definitions without a `connector` are bound to the memory connector and
/// definitions without a `cache` take the configured default.
pub fn load_registry(path: &Path, config: &RuntimeConfig) -> CliResult<(ModelRegistry, Vec<Model>)> {
    let document = read_json_file(path)?;
    let definitions = document
        .as_object()
        .ok_or_else(|| CliError::usage(format!("{} must hold an object of model definitions", path.display())))?;

    let registry = ModelRegistry::new();
    let mut models = Vec::with_capacity(definitions.len());
    for (name, raw) in definitions {
        let mut definition = ModelDefinition::from_json(raw)?;
        if raw.get("connector").is_none() {
            definition = definition.connector_named(MEMORY_CONNECTOR_NAME);
        }
        if raw.get("cache").is_none() {
            definition = definition.cache(config.cache_config());
        }
        models.push(registry.define(name, definition)?);
    }
    Ok((registry, models))
}

/// Print each compiled schema as a JSON line; returns how many were compiled
pub fn validate<W: Write>(path: &Path, config: &RuntimeConfig, out: &mut W) -> CliResult<usize> {
    let (_registry, models) = load_registry(path, config)?;
    for model in &models {
        write_json_line(out, &model.describe())?;
    }
    Ok(models.len())
}

/// Load `data` into `model_name` and print the query result as one JSON array
pub fn query<W: Write>(
    definitions: &Path,
    model_name: &str,
    data: &Path,
    query: Option<&str>,
    config: &RuntimeConfig,
    out: &mut W,
) -> CliResult<()> {
    let (registry, _models) = load_registry(definitions, config)?;
    let model = registry
        .get(model_name)
        .ok_or_else(|| CliError::usage(format!("unknown model \"{}\"", model_name)))?;

    let records = match read_json_file(data)? {
        Value::Array(records) => records,
        _ => return Err(CliError::usage(format!("{} must hold a JSON array of records", data.display()))),
    };
    for record in records {
        model.create(record)?;
    }

    let description = match query {
        Some(text) => QueryDescription::from_json(&serde_json::from_str(text)?)?,
        None => QueryDescription::new(),
    };
    let result = model.query(&description)?;
    write_json_line(out, &result.to_json())
}
