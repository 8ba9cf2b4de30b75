use crate::ast::{Function, Program, Statement};
use crate::error::CompileError;
use crate::parser::Parser;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Options governing compilation.
#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    /// Reserved for stricter compile-time checks.
    pub strict: bool,
    /// When false, any `%func` declaration is a compile error.
    pub allow_user_functions: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            strict: false,
            allow_user_functions: true,
        }
    }
}

/// An immutable compiled script, safe to share across threads and reuse for
/// any number of executions.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    program: Arc<Program>,
}

impl CompiledProgram {
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Names of the functions declared by the script, in no particular order.
    pub fn function_names(&self) -> Vec<String> {
        self.program
            .functions
            .values()
            .map(|f| f.name.clone())
            .collect()
    }
}

/// Compile a script: parse it, then lift `%func` declarations out of the
/// statement list into the function table.
pub fn compile(source: &str, options: CompileOptions) -> Result<CompiledProgram, CompileError> {
    let statements = Parser::new(source)?.parse_program()?;
    let program = build_program(statements, options)?;
    debug!(
        statements = program.statements.len(),
        functions = program.functions.len(),
        "compiled script"
    );
    Ok(CompiledProgram {
        program: Arc::new(program),
    })
}

/// Compile a library source: only function declarations are allowed at top
/// level, and at least one must be present.
pub fn compile_library(source: &str) -> Result<HashMap<String, Arc<Function>>, CompileError> {
    let statements = Parser::new(source)?.parse_program()?;
    let mut functions = HashMap::new();
    for stmt in statements {
        match stmt {
            Statement::FunctionDecl(func) => {
                insert_function(&mut functions, func)?;
            }
            other => {
                return Err(CompileError::at(
                    "libraries may only contain function declarations",
                    statement_span(&other),
                ))
            }
        }
    }
    if functions.is_empty() {
        return Err(CompileError::new(
            "a library must declare at least one function",
        ));
    }
    Ok(functions)
}

fn build_program(
    statements: Vec<Statement>,
    options: CompileOptions,
) -> Result<Program, CompileError> {
    let mut functions = HashMap::new();
    let mut top_level = Vec::with_capacity(statements.len());

    for stmt in statements {
        match stmt {
            Statement::FunctionDecl(func) => {
                if !options.allow_user_functions {
                    return Err(CompileError::at(
                        format!("user functions are disabled: '{}'", func.name),
                        func.span,
                    ));
                }
                insert_function(&mut functions, func)?;
            }
            other => top_level.push(other),
        }
    }

    Ok(Program {
        statements: top_level,
        functions,
    })
}

fn insert_function(
    functions: &mut HashMap<String, Arc<Function>>,
    func: Arc<Function>,
) -> Result<(), CompileError> {
    let key = func.name.to_lowercase();
    if functions.contains_key(&key) {
        return Err(CompileError::at(
            format!("duplicate function declaration '{}'", func.name),
            func.span,
        ));
    }
    functions.insert(key, func);
    Ok(())
}

fn statement_span(stmt: &Statement) -> crate::ast::Span {
    use crate::ast::{Position, Span};
    match stmt {
        Statement::Let { span, .. }
        | Statement::Set { span, .. }
        | Statement::If { span, .. }
        | Statement::Foreach { span, .. }
        | Statement::DoLoop { span, .. }
        | Statement::Return { span, .. } => *span,
        Statement::Break(span) | Statement::Continue(span) => *span,
        Statement::FunctionDecl(func) => func.span,
        Statement::Expression(_) => Span::new(Position::start(), Position::start()),
    }
}
