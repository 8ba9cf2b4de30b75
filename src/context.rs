use crate::error::LimitError;
use crate::value::Value;
use serde_json::Value as Json;
use std::collections::HashMap;

/// Per-execution knobs.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionOptions {
    /// Strict mode: missing variables, properties, and paths are errors
    /// instead of nulls.
    pub strict: bool,
    /// Budget for loop body entries across the whole execution.
    pub max_loop_iterations: u64,
    /// Maximum user/library function call depth.
    pub max_recursion_depth: u32,
    /// Per-call wall-clock budget for regex built-ins, in milliseconds.
    pub regex_timeout_ms: u64,
    /// Serialized `$out` size ceiling; 0 means unlimited.
    pub max_output_size_bytes: u64,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        ExecutionOptions {
            strict: false,
            max_loop_iterations: 100_000,
            max_recursion_depth: 100,
            regex_timeout_ms: 1_000,
            max_output_size_bytes: 0,
        }
    }
}

/// Control flags threaded through statement execution.
///
/// Loops consume `breaking`/`continuing` as they exit; function calls
/// consume `returning` at their boundary; the top level consumes a final
/// `returning` to end execution.
#[derive(Debug, Default)]
pub struct ControlFlags {
    pub breaking: bool,
    pub continuing: bool,
    pub returning: bool,
    pub return_value: Option<Value>,
}

impl ControlFlags {
    pub fn any(&self) -> bool {
        self.breaking || self.continuing || self.returning
    }
}

#[derive(Debug)]
struct Scope {
    vars: HashMap<String, Value>,
    /// Function call frames are opaque: lookup does not continue past a
    /// barrier scope except into the global scope.
    barrier: bool,
}

/// Stack of variable scopes with a persistent global scope at the base.
///
/// Lookup walks from the innermost scope outward, stopping at a function
/// frame barrier (plus the global scope). Assignment updates the nearest
/// visible binding, else creates one in the innermost scope.
#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack {
            scopes: vec![Scope {
                vars: HashMap::new(),
                barrier: false,
            }],
        }
    }

    /// Push a transparent scope (loops).
    pub fn push(&mut self) {
        self.scopes.push(Scope {
            vars: HashMap::new(),
            barrier: false,
        });
    }

    /// Push an opaque function call frame.
    pub fn push_frame(&mut self) {
        self.scopes.push(Scope {
            vars: HashMap::new(),
            barrier: true,
        });
    }

    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    fn visible_indices(&self) -> Vec<usize> {
        let mut indices = Vec::new();
        for idx in (0..self.scopes.len()).rev() {
            indices.push(idx);
            if self.scopes[idx].barrier {
                if idx != 0 {
                    indices.push(0);
                }
                break;
            }
        }
        indices
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        for idx in self.visible_indices() {
            if let Some(value) = self.scopes[idx].vars.get(name) {
                return Some(value);
            }
        }
        None
    }

    /// Nearest-existing-binding assignment. The walk stops at a function
    /// frame barrier: the global scope stays readable through it, but a
    /// `%let` inside a frame never writes past the frame, so its bindings
    /// die with the call.
    pub fn assign(&mut self, name: &str, value: Value) {
        for idx in (0..self.scopes.len()).rev() {
            if self.scopes[idx].vars.contains_key(name) {
                self.scopes[idx].vars.insert(name.to_string(), value);
                return;
            }
            if self.scopes[idx].barrier {
                break;
            }
        }
        self.define(name, value);
    }

    /// Bind directly in the innermost scope (loop variables, parameters).
    pub fn define(&mut self, name: &str, value: Value) {
        self.scopes
            .last_mut()
            .expect("scope stack always has a global scope")
            .vars
            .insert(name.to_string(), value);
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        ScopeStack::new()
    }
}

/// Per-execution state: the three document roots, the variable scopes, and
/// the enforced counters. Host functions receive a mutable reference and
/// may mutate `$out` only.
pub struct ExecutionContext {
    input: Json,
    output: Json,
    meta: Option<Json>,
    options: ExecutionOptions,
    pub(crate) scopes: ScopeStack,
    pub(crate) flags: ControlFlags,
    loop_iterations: u64,
    recursion_depth: u32,
}

impl ExecutionContext {
    pub fn new(input: Json, meta: Option<Json>, options: ExecutionOptions) -> Self {
        ExecutionContext {
            input,
            output: Json::Object(serde_json::Map::new()),
            meta,
            options,
            scopes: ScopeStack::new(),
            flags: ControlFlags::default(),
            loop_iterations: 0,
            recursion_depth: 0,
        }
    }

    pub fn input(&self) -> &Json {
        &self.input
    }

    pub fn output(&self) -> &Json {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut Json {
        &mut self.output
    }

    pub fn meta(&self) -> Option<&Json> {
        self.meta.as_ref()
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    pub fn into_output(self) -> Json {
        self.output
    }

    /// Called at every loop body entry, across all loops of the execution.
    pub(crate) fn bump_loop(&mut self) -> Result<(), LimitError> {
        self.loop_iterations += 1;
        if self.loop_iterations > self.options.max_loop_iterations {
            return Err(LimitError::new(
                "MaxLoopIterations",
                self.options.max_loop_iterations,
            ));
        }
        Ok(())
    }

    /// Called before a user/library function body runs.
    pub(crate) fn enter_call(&mut self) -> Result<(), LimitError> {
        self.recursion_depth += 1;
        if self.recursion_depth > self.options.max_recursion_depth {
            return Err(LimitError::new(
                "MaxRecursionDepth",
                self.options.max_recursion_depth as u64,
            ));
        }
        Ok(())
    }

    pub(crate) fn exit_call(&mut self) {
        self.recursion_depth = self.recursion_depth.saturating_sub(1);
    }
}
