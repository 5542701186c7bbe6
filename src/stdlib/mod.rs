//! Runtime library surface known to the checker

pub mod builtins;

pub use builtins::{BuiltinFunc, BuiltinRegistry};
