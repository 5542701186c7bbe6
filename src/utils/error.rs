//! Semantic error definitions for the Tiger checker

use serde::Serialize;
use thiserror::Error;

/// Error taxonomy used for reporting and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    UndefinedReference,
    DuplicateDefinition,
    TypeMismatch,
    Structural,
    ControlFlow,
    CyclicDefinition,
}

/// Semantic error
///
/// The `Display` text of each variant is the exact diagnostic message
/// printed after `<line>:<column>: Error: `.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ==================== Undefined References ====================

    #[error("{name} is not defined")]
    UndefinedVariable { name: String },

    #[error("Function {name} undeclared")]
    UndefinedFunction { name: String },

    #[error("{name} is not a type")]
    UndefinedType { name: String },

    // ==================== Duplicate Definitions ====================

    #[error("{name} is already defined in this scope.")]
    DuplicateDefinition { name: String },

    // ==================== Type Mismatches ====================

    #[error("Binary expression require integers")]
    BinaryRequiresIntegers,

    #[error("Nil cannot compare to nil")]
    NilComparedToNil,

    #[error("Binary comparison type not match")]
    ComparisonMismatch,

    #[error("Assign types do not match")]
    AssignMismatch,

    #[error("Require integer in test")]
    TestRequiresInteger,

    #[error("Require same type in both branch")]
    BranchMismatch,

    #[error("Require integer")]
    LoopTestRequiresInteger,

    #[error("For bounds require integer")]
    ForBoundsRequireInteger,

    #[error("Params type not match")]
    ParamTypeMismatch,

    #[error("Field type not match")]
    FieldTypeMismatch,

    #[error("Size should be integer")]
    ArraySizeNotInteger,

    #[error("Initial type not matches")]
    ArrayInitMismatch,

    #[error("Function return type not match")]
    ReturnTypeMismatch,

    #[error("Nil can only assign to record type")]
    NilWithoutRecordType,

    #[error("Type not match")]
    VarTypeMismatch,

    #[error("Subscript should be integer")]
    SubscriptNotInteger,

    // ==================== Structural Errors ====================

    #[error("Incorrect number of passed arguments")]
    ArgCountMismatch { expected: usize, got: usize },

    #[error("Require a record type")]
    RecordTypeRequired,

    #[error("Wrong number of fields")]
    FieldCountMismatch { expected: usize, got: usize },

    #[error("{field} is not a field or not on the right position of {record}")]
    FieldPosition { field: String, record: String },

    #[error("Array type required")]
    ArrayTypeRequired,

    #[error("field reference is only for record type")]
    NotARecord,

    #[error("field not exists in this struct")]
    UnknownField { field: String },

    #[error("Subscript is only for array type")]
    NotAnArray,

    // ==================== Control Flow ====================

    #[error("\"Then\" returns a value but \"Else\" doesn't")]
    ThenWithoutElse,

    #[error("Loop body does not return value")]
    LoopBodyReturnsValue,

    #[error("Break is only allowed on Loop statements")]
    BreakOutsideLoop,

    #[error("Procedure can not returns a value")]
    ProcedureReturnsValue,

    // ==================== Cyclic Definitions ====================

    #[error("{name} has an endless loop of type define")]
    EndlessTypeLoop { name: String },
}

impl Error {
    /// Taxonomy bucket of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UndefinedVariable { .. }
            | Self::UndefinedFunction { .. }
            | Self::UndefinedType { .. } => ErrorKind::UndefinedReference,
            Self::DuplicateDefinition { .. } => ErrorKind::DuplicateDefinition,
            Self::BinaryRequiresIntegers
            | Self::NilComparedToNil
            | Self::ComparisonMismatch
            | Self::AssignMismatch
            | Self::TestRequiresInteger
            | Self::BranchMismatch
            | Self::LoopTestRequiresInteger
            | Self::ForBoundsRequireInteger
            | Self::ParamTypeMismatch
            | Self::FieldTypeMismatch
            | Self::ArraySizeNotInteger
            | Self::ArrayInitMismatch
            | Self::ReturnTypeMismatch
            | Self::NilWithoutRecordType
            | Self::VarTypeMismatch
            | Self::SubscriptNotInteger => ErrorKind::TypeMismatch,
            Self::ArgCountMismatch { .. }
            | Self::RecordTypeRequired
            | Self::FieldCountMismatch { .. }
            | Self::FieldPosition { .. }
            | Self::ArrayTypeRequired
            | Self::NotARecord
            | Self::UnknownField { .. }
            | Self::NotAnArray => ErrorKind::Structural,
            Self::ThenWithoutElse
            | Self::LoopBodyReturnsValue
            | Self::BreakOutsideLoop
            | Self::ProcedureReturnsValue => ErrorKind::ControlFlow,
            Self::EndlessTypeLoop { .. } => ErrorKind::CyclicDefinition,
        }
    }

    /// Stable error code used in structured reports
    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::UndefinedReference => "E0001",
            ErrorKind::DuplicateDefinition => "E0002",
            ErrorKind::TypeMismatch => "E0003",
            ErrorKind::Structural => "E0004",
            ErrorKind::ControlFlow => "E0005",
            ErrorKind::CyclicDefinition => "E0006",
        }
    }
}
