use crate::ast::Function;
use crate::compiler::compile_library;
use crate::error::CompileError;
use std::collections::HashMap;
use std::sync::Arc;

/// Summary of a loaded library, returned to the host.
#[derive(Debug, Clone)]
pub struct LibraryHandle {
    pub name: String,
    pub function_names: Vec<String>,
}

/// An insertion-ordered collection of named function bundles.
///
/// Call resolution consults libraries in insertion order, after script
/// functions and before the engine registry. Reloading an existing name
/// replaces the bundle in place, keeping its position.
#[derive(Default)]
pub struct LibraryManager {
    libraries: Vec<(String, HashMap<String, Arc<Function>>)>,
}

impl LibraryManager {
    pub fn new() -> Self {
        LibraryManager::default()
    }

    /// Compile `source` under library rules (function declarations only, at
    /// least one) and register it under `name`.
    pub fn load(&mut self, name: &str, source: &str) -> Result<LibraryHandle, CompileError> {
        let functions = compile_library(source)?;
        let handle = LibraryHandle {
            name: name.to_string(),
            function_names: functions.values().map(|f| f.name.clone()).collect(),
        };
        match self.libraries.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = functions,
            None => self.libraries.push((name.to_string(), functions)),
        }
        Ok(handle)
    }

    /// Find a function by lowercased name, first library wins.
    pub fn resolve(&self, key: &str) -> Option<&Arc<Function>> {
        self.libraries
            .iter()
            .find_map(|(_, functions)| functions.get(key))
    }

    pub fn names(&self) -> Vec<&str> {
        self.libraries.iter().map(|(n, _)| n.as_str()).collect()
    }
}
