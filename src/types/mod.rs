//! Semantic type representation

pub mod type_system;

pub use type_system::*;
