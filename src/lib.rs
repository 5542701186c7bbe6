//! Tiger semantic analysis
//!
//! Type checking and scope resolution for the Tiger language. The input
//! is an already parsed AST; the output is the annotated AST plus an
//! [`Analysis`] holding the type arena, the frame layout of every
//! function, and the diagnostics.

pub mod feedback;
pub mod frontend;
pub mod middle;
pub mod stdlib;
pub mod types;
pub mod utils;

pub use feedback::{AnalysisFeedback, Diagnostic, Diagnostics};
pub use frontend::ast::Root;
pub use frontend::semantic::{analyze, Analysis};
pub use types::Type;
