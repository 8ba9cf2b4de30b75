//! Helpers behind the `jex` binary. The CLI is a host embedding of the
//! engine; nothing here is part of the language contract.

use crate::context::ExecutionOptions;
use crate::engine::Engine;
use crate::error::JexError;
use serde_json::Value as Json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Engine(#[from] JexError),

    #[error("invalid input JSON: {0}")]
    InvalidInput(#[from] serde_json::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

pub struct RunOptions {
    pub script: String,
    pub input: Option<String>,
    pub meta: Option<String>,
    pub strict: bool,
}

/// Compile and execute a script against the given JSON input.
pub fn execute_run(options: &RunOptions) -> Result<Json, CliError> {
    let input: Json = match &options.input {
        Some(text) => serde_json::from_str(text)?,
        None => Json::Null,
    };
    let meta: Option<Json> = match &options.meta {
        Some(text) => Some(serde_json::from_str(text)?),
        None => None,
    };

    let engine = Engine::new();
    let program = engine.compile(&options.script)?;
    let exec_options = ExecutionOptions {
        strict: options.strict,
        ..Default::default()
    };
    Ok(engine.execute_with(&program, &input, meta.as_ref(), exec_options)?)
}

/// Compile only; reports the declared function names on success.
pub fn execute_check(script: &str) -> Result<Vec<String>, CliError> {
    let engine = Engine::new();
    let program = engine.compile(script)?;
    Ok(program.function_names())
}
