use crate::compiler::{compile, CompileOptions, CompiledProgram};
use crate::context::{ExecutionContext, ExecutionOptions};
use crate::error::{JexError, LimitError, RuntimeError};
use crate::evaluator::Evaluator;
use crate::library::{LibraryHandle, LibraryManager};
use crate::stdlib;
use crate::value::Value;
use serde_json::Value as Json;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

/// A registered function: host callback plus arity bounds.
pub type HostFn =
    Arc<dyn Fn(&mut ExecutionContext, Vec<Value>) -> Result<Value, RuntimeError> + Send + Sync>;

/// How the evaluator treats a registry function's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Returns a value.
    Value,
    /// Side effects only; the call expression yields null.
    Void,
    /// The first argument is a mutation target (a variable or `$out`); the
    /// evaluator reads it, passes the current value, and writes the result
    /// back. The call expression yields null.
    MutatesFirstArg,
}

pub struct FunctionEntry {
    pub kind: FunctionKind,
    pub min_args: usize,
    /// `None` means unbounded.
    pub max_args: Option<usize>,
    pub func: HostFn,
}

impl FunctionEntry {
    /// Arity is enforced before invocation.
    pub fn check_arity(&self, name: &str, argc: usize) -> Result<(), RuntimeError> {
        if argc < self.min_args {
            return Err(RuntimeError::new(format!(
                "function '{}' expects at least {} argument(s), got {}",
                name, self.min_args, argc
            )));
        }
        if let Some(max) = self.max_args {
            if argc > max {
                return Err(RuntimeError::new(format!(
                    "function '{}' expects at most {} argument(s), got {}",
                    name, max, argc
                )));
            }
        }
        Ok(())
    }
}

/// Case-insensitive function registry: the standard library plus a
/// host-registered overlay. The overlay shadows built-ins of the same name.
pub struct FunctionRegistry {
    builtins: HashMap<String, FunctionEntry>,
    host: HashMap<String, FunctionEntry>,
}

impl FunctionRegistry {
    fn with_stdlib() -> Self {
        FunctionRegistry {
            builtins: stdlib::builtins(),
            host: HashMap::new(),
        }
    }

    /// `key` must already be lowercased.
    pub fn resolve(&self, key: &str) -> Option<&FunctionEntry> {
        self.host.get(key).or_else(|| self.builtins.get(key))
    }

    fn register(&mut self, name: &str, entry: FunctionEntry) {
        self.host.insert(name.to_lowercase(), entry);
    }
}

/// The embedding surface: compiler plus registry plus library manager.
///
/// An engine is cheap to keep for the life of the process. Compiled
/// programs are immutable and can be executed concurrently from any number
/// of threads; each execution owns its own context.
pub struct Engine {
    registry: FunctionRegistry,
    libraries: LibraryManager,
}

impl Engine {
    /// Create an engine with the standard library registered.
    pub fn new() -> Self {
        Engine {
            registry: FunctionRegistry::with_stdlib(),
            libraries: LibraryManager::new(),
        }
    }

    /// Register a value-returning host function.
    pub fn register_function<F>(
        &mut self,
        name: &str,
        min_args: usize,
        max_args: Option<usize>,
        func: F,
    ) where
        F: Fn(&mut ExecutionContext, Vec<Value>) -> Result<Value, RuntimeError>
            + Send
            + Sync
            + 'static,
    {
        self.registry.register(
            name,
            FunctionEntry {
                kind: FunctionKind::Value,
                min_args,
                max_args,
                func: Arc::new(func),
            },
        );
    }

    /// Register a void host function; the call expression yields null.
    pub fn register_void_function<F>(
        &mut self,
        name: &str,
        min_args: usize,
        max_args: Option<usize>,
        func: F,
    ) where
        F: Fn(&mut ExecutionContext, Vec<Value>) -> Result<(), RuntimeError>
            + Send
            + Sync
            + 'static,
    {
        self.registry.register(
            name,
            FunctionEntry {
                kind: FunctionKind::Void,
                min_args,
                max_args,
                func: Arc::new(move |ctx, args| {
                    func(ctx, args)?;
                    Ok(Value::Null)
                }),
            },
        );
    }

    /// Load a library from source text. The source may only contain
    /// function declarations and must declare at least one.
    pub fn load_library(&mut self, name: &str, source: &str) -> Result<LibraryHandle, JexError> {
        let handle = self.libraries.load(name, source)?;
        debug!(library = name, functions = handle.function_names.len(), "loaded library");
        Ok(handle)
    }

    /// Load a library from any readable source.
    pub fn load_library_from_reader<R: Read>(
        &mut self,
        name: &str,
        mut reader: R,
    ) -> Result<LibraryHandle, JexError> {
        let mut source = String::new();
        reader
            .read_to_string(&mut source)
            .map_err(|e| RuntimeError::new(format!("failed to read library '{}': {}", name, e)))?;
        self.load_library(name, &source)
    }

    /// Compile a script with default options.
    pub fn compile(&self, source: &str) -> Result<CompiledProgram, JexError> {
        Ok(compile(source, CompileOptions::default())?)
    }

    /// Compile a script with explicit options.
    pub fn compile_with_options(
        &self,
        source: &str,
        options: CompileOptions,
    ) -> Result<CompiledProgram, JexError> {
        Ok(compile(source, options)?)
    }

    /// Execute a compiled program with default options and no metadata.
    pub fn execute(&self, program: &CompiledProgram, input: &Json) -> Result<Json, JexError> {
        self.execute_with(program, input, None, ExecutionOptions::default())
    }

    /// Execute a compiled program. The input is never mutated; the result
    /// is the final `$out`.
    pub fn execute_with(
        &self,
        program: &CompiledProgram,
        input: &Json,
        meta: Option<&Json>,
        options: ExecutionOptions,
    ) -> Result<Json, JexError> {
        debug!(strict = options.strict, "executing program");
        let mut ctx = ExecutionContext::new(input.clone(), meta.cloned(), options);
        let evaluator = Evaluator::new(program.program(), &self.registry, &self.libraries);
        evaluator.run(&mut ctx)?;
        let output = ctx.into_output();

        if options.max_output_size_bytes > 0 {
            let size = serde_json::to_string(&output)
                .map(|s| s.len() as u64)
                .unwrap_or(u64::MAX);
            if size > options.max_output_size_bytes {
                return Err(LimitError::new(
                    "MaxOutputSizeBytes",
                    options.max_output_size_bytes,
                )
                .into());
            }
        }
        Ok(output)
    }

    /// Compile-and-run convenience for one-shot scripts.
    pub fn run_script(&self, source: &str, input: &Json) -> Result<Json, JexError> {
        let program = self.compile(source)?;
        self.execute(&program, input)
    }

    pub fn libraries(&self) -> &LibraryManager {
        &self.libraries
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}
