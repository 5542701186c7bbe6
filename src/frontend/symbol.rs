//! Scoped symbol tables
//!
//! One generic table type backs the three independent namespaces of the
//! checker (values, types, functions). A record field, a type and a
//! function may all share a name without colliding because each lives in
//! its own table.

use std::collections::HashMap;

/// Nested scopes mapping names to bindings
///
/// The bottom scope is created with the table and can never be exited;
/// `enter`/`exit` must be paired per lexical block.
#[derive(Debug, Clone)]
pub struct SymbolTable<T> {
    scopes: Vec<HashMap<String, T>>,
}

impl<T> SymbolTable<T> {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    /// Enter a new scope
    pub fn enter(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Exit the current scope, discarding its bindings
    pub fn exit(&mut self) {
        assert!(self.scopes.len() > 1, "exit() without a matching enter()");
        self.scopes.pop();
    }

    /// Bind a name in the current scope, shadowing outer bindings
    pub fn push(&mut self, name: &str, value: T) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    /// Look up a name, searching from the current scope outward
    pub fn lookup(&self, name: &str) -> Option<&T> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Look up a name only in the current scope
    pub fn lookup_local(&self, name: &str) -> Option<&T> {
        self.scopes.last().and_then(|scope| scope.get(name))
    }

    /// Drop every scope and binding, leaving a single empty scope
    pub fn reset(&mut self) {
        self.scopes.clear();
        self.scopes.push(HashMap::new());
    }

    /// Number of live scopes, the bottom one included
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

impl<T> Default for SymbolTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
