//! Diagnostics and structured feedback
//!
//! `Diagnostics` is the ordered error list the checker appends to, with the
//! sticky failure flag the driver consults before code generation.
//! `AnalysisFeedback` is its machine-readable JSON form.

use serde::Serialize;
use std::fmt;

use crate::frontend::semantic::Analysis;
use crate::utils::{Error, ErrorKind, Location};

// ==================== Diagnostics ====================

/// One reported error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub location: Location,
    pub error: Error,
}

impl Diagnostic {
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: Error: {}", self.location.line, self.location.column, self.error)
    }
}

/// Ordered diagnostics with a sticky failure flag
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    has_error: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error and hand back the error sentinel
    pub fn report<T>(&mut self, error: Error, location: Location) -> Option<T> {
        log::debug!("{}: {}", location, error);
        self.entries.push(Diagnostic { location, error });
        self.has_error = true;
        None
    }

    pub fn has_error(&self) -> bool {
        self.has_error
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Messages in report order
    pub fn messages(&self) -> Vec<String> {
        self.entries.iter().map(Diagnostic::message).collect()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{}", entry)?;
        }
        Ok(())
    }
}

// ==================== Structured Report ====================

/// A structured error report
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    /// Error code (e.g., "E0003")
    pub code: String,
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
    pub location: Location,
}

impl ErrorReport {
    pub fn from_diagnostic(diagnostic: &Diagnostic) -> Self {
        Self {
            code: diagnostic.error.code().to_string(),
            kind: diagnostic.error.kind(),
            message: diagnostic.message(),
            location: diagnostic.location,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisStats {
    /// Analysis time in milliseconds
    pub analysis_time_ms: u64,
    /// User functions, intrinsics excluded
    pub function_count: usize,
    pub variable_count: usize,
    /// Activation records, `main` included
    pub frame_count: usize,
    pub record_type_count: usize,
    pub array_type_count: usize,
}

/// Complete analysis feedback for one translation unit
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisFeedback {
    pub success: bool,
    pub source_file: String,
    pub diagnostics: Vec<ErrorReport>,
    pub stats: AnalysisStats,
}

impl AnalysisFeedback {
    pub fn from_analysis(analysis: &Analysis, source_file: &str, analysis_time_ms: u64) -> Self {
        let stats = AnalysisStats {
            analysis_time_ms,
            function_count: analysis.frames.functions().filter(|(_, f)| !f.is_intrinsic()).count(),
            variable_count: analysis.frames.var_count(),
            frame_count: analysis.frames.frames().count(),
            record_type_count: analysis.types.record_count(),
            array_type_count: analysis.types.array_count(),
        };
        Self {
            success: !analysis.has_error(),
            source_file: source_file.to_string(),
            diagnostics: analysis.diagnostics.iter().map(ErrorReport::from_diagnostic).collect(),
            stats,
        }
    }

    /// Output as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Output as compact JSON (for programmatic use)
    pub fn to_json_compact(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
