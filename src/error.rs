use crate::ast::Span;
use thiserror::Error;

/// Any error the engine can surface to the host.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JexError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Limit(#[from] LimitError),
}

/// Lexical, syntactic, or compile-time semantic violation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("compile error{}: {message}", span_suffix(.span))]
pub struct CompileError {
    pub message: String,
    pub span: Option<Span>,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        CompileError {
            message: message.into(),
            span: None,
        }
    }

    pub fn at(message: impl Into<String>, span: Span) -> Self {
        CompileError {
            message: message.into(),
            span: Some(span),
        }
    }
}

/// Evaluation failure: unknown function, arity mismatch, bad operand or
/// path shape, strict-mode misses, regex timeout.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("runtime error{}{}: {message}", fn_suffix(.function), span_suffix(.span))]
pub struct RuntimeError {
    pub message: String,
    pub span: Option<Span>,
    pub function: Option<String>,
    pub path: Option<String>,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        RuntimeError {
            message: message.into(),
            span: None,
            function: None,
            path: None,
        }
    }

    pub fn at(message: impl Into<String>, span: Span) -> Self {
        RuntimeError {
            span: Some(span),
            ..RuntimeError::new(message)
        }
    }

    pub fn in_function(mut self, name: &str) -> Self {
        self.function = Some(name.to_string());
        self
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }
}

/// A bounded resource was exhausted: loop iterations, recursion depth, or
/// one of the normalizer counters.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("limit exceeded: {name} ({limit})")]
pub struct LimitError {
    /// Name of the exhausted limit, e.g. `MaxLoopIterations`.
    pub name: String,
    /// The configured limit value.
    pub limit: u64,
}

impl LimitError {
    pub fn new(name: &str, limit: u64) -> Self {
        LimitError {
            name: name.to_string(),
            limit,
        }
    }
}

fn span_suffix(span: &Option<Span>) -> String {
    match span {
        Some(s) => format!(" at {}", s),
        None => String::new(),
    }
}

fn fn_suffix(function: &Option<String>) -> String {
    match function {
        Some(f) => format!(" in {}()", f),
        None => String::new(),
    }
}
