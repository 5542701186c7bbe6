//! Frontend module - AST, scopes, semantic analysis

pub mod ast;
pub mod symbol;
pub mod semantic;
pub mod declarations;
