//! Abstract Syntax Tree definitions for Tiger
//!
//! The tree is produced by the parser and handed over whole. The checker
//! walks it through shared references and fills the annotation cells
//! (`ty`, `binding`, `slot`, ...) in place; code generation reads them back.
//! Annotation cells are never serialized.

use serde::{Deserialize, Serialize};
use std::cell::Cell;

use crate::middle::frame::{FunctionId, VarId};
use crate::types::Type;
use crate::utils::Location;

/// A complete program: one top-level expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Root {
    pub body: Exp,
}

impl Root {
    pub fn new(body: Exp) -> Self {
        Self { body }
    }
}

/// Identifier with its own location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ident {
    pub name: String,
    #[serde(default)]
    pub loc: Location,
}

impl Ident {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), loc: Location::dummy() }
    }
}

// ==================== Expressions ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exp {
    pub kind: ExpKind,
    #[serde(default)]
    pub loc: Location,
    /// Resolved type, set once checked
    #[serde(skip)]
    pub ty: Cell<Option<Type>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExpKind {
    Var(Var),
    Nil,
    Int(i64),
    String(String),
    Call(CallExp),
    Binary(BinaryExp),
    Record(RecordExp),
    Seq(Vec<Exp>),
    Assign(AssignExp),
    If(IfExp),
    While(WhileExp),
    DoWhile(DoWhileExp),
    For(ForExp),
    Break,
    Let(LetExp),
    Array(ArrayExp),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallExp {
    pub func: Ident,
    pub args: Vec<Exp>,
    #[serde(skip)]
    pub callee: Cell<Option<FunctionId>>,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinOp {
    /// `=` and `<>`, which accept any pair of matching types
    pub fn is_equality(&self) -> bool {
        matches!(self, Self::Eq | Self::Ne)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryExp {
    pub op: BinOp,
    pub left: Box<Exp>,
    pub right: Box<Exp>,
}

/// `name = exp` inside a record literal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldInit {
    pub name: Ident,
    pub exp: Exp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordExp {
    pub type_name: Ident,
    pub fields: Vec<FieldInit>,
}

impl RecordExp {
    /// Field initializers in source order
    pub fn inits(&self) -> impl Iterator<Item = &Exp> {
        self.fields.iter().map(|field| &field.exp)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignExp {
    pub var: Var,
    pub exp: Box<Exp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfExp {
    pub test: Box<Exp>,
    pub then: Box<Exp>,
    #[serde(rename = "else", default)]
    pub otherwise: Option<Box<Exp>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhileExp {
    pub test: Box<Exp>,
    pub body: Box<Exp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoWhileExp {
    pub body: Box<Exp>,
    pub test: Box<Exp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForExp {
    pub var: Ident,
    pub low: Box<Exp>,
    pub high: Box<Exp>,
    pub body: Box<Exp>,
    /// Slot of the loop counter
    #[serde(skip)]
    pub slot: Cell<Option<VarId>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LetExp {
    pub decs: Vec<Dec>,
    pub body: Box<Exp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayExp {
    pub type_name: Ident,
    pub size: Box<Exp>,
    pub init: Box<Exp>,
}

// ==================== Variables (l-values) ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Var {
    pub kind: VarKind,
    #[serde(default)]
    pub loc: Location,
    #[serde(skip)]
    pub ty: Cell<Option<Type>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VarKind {
    Simple(SimpleVar),
    Field(FieldVar),
    Subscript(SubscriptVar),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleVar {
    pub name: String,
    /// Variable this use resolves to
    #[serde(skip)]
    pub binding: Cell<Option<VarId>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldVar {
    pub base: Box<Var>,
    pub field: Ident,
    /// Position of the field in the record
    #[serde(skip)]
    pub index: Cell<Option<usize>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptVar {
    pub base: Box<Var>,
    pub index: Box<Exp>,
}

// ==================== Declarations ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Dec {
    Type(TypeDec),
    Function(FunctionDec),
    Var(VarDec),
}

/// Declaration kinds; consecutive declarations of the same kind form a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Type,
    Function,
    Var,
}

impl Dec {
    pub fn kind(&self) -> DeclKind {
        match self {
            Self::Type(_) => DeclKind::Type,
            Self::Function(_) => DeclKind::Function,
            Self::Var(_) => DeclKind::Var,
        }
    }

    pub fn name(&self) -> &Ident {
        match self {
            Self::Type(d) => &d.name,
            Self::Function(d) => &d.name,
            Self::Var(d) => &d.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDec {
    pub name: Ident,
    pub ty: Ty,
    #[serde(default)]
    pub loc: Location,
}

/// Right-hand side of a type declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Ty {
    /// `type a = b`
    Name(Ident),
    /// `type a = {x: int, y: b}`
    Record(Vec<TypedField>),
    /// `type a = array of b`
    Array(Ident),
}

/// `name: type` in a record type or a parameter list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypedField {
    pub name: Ident,
    pub type_name: Ident,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDec {
    pub name: Ident,
    pub params: Vec<TypedField>,
    /// Declared result; procedures have none
    #[serde(default)]
    pub result: Option<Ident>,
    pub body: Exp,
    #[serde(default)]
    pub loc: Location,
    #[serde(skip)]
    pub id: Cell<Option<FunctionId>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDec {
    pub name: Ident,
    #[serde(default)]
    pub type_name: Option<Ident>,
    pub init: Exp,
    #[serde(default)]
    pub loc: Location,
    #[serde(skip)]
    pub slot: Cell<Option<VarId>>,
}

// ==================== Builders ====================
//
// Shorthand used in place of the parser. Nodes get a dummy location; chain
// `.at(line, column)` to place them.

impl Exp {
    pub fn new(kind: ExpKind) -> Self {
        Self { kind, loc: Location::dummy(), ty: Cell::new(None) }
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.loc = Location::new(line, column);
        self
    }

    pub fn nil() -> Self {
        Self::new(ExpKind::Nil)
    }

    pub fn int(value: i64) -> Self {
        Self::new(ExpKind::Int(value))
    }

    pub fn string(value: &str) -> Self {
        Self::new(ExpKind::String(value.to_string()))
    }

    pub fn var(var: Var) -> Self {
        let loc = var.loc;
        Self { loc, ..Self::new(ExpKind::Var(var)) }
    }

    /// Read of a plain variable
    pub fn ident(name: &str) -> Self {
        Self::var(Var::simple(name))
    }

    pub fn call(func: &str, args: Vec<Exp>) -> Self {
        Self::new(ExpKind::Call(CallExp {
            func: Ident::new(func),
            args,
            callee: Cell::new(None),
        }))
    }

    pub fn binary(op: BinOp, left: Exp, right: Exp) -> Self {
        Self::new(ExpKind::Binary(BinaryExp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }))
    }

    pub fn record(type_name: &str, fields: Vec<(&str, Exp)>) -> Self {
        let fields = fields
            .into_iter()
            .map(|(name, exp)| FieldInit { name: Ident::new(name), exp })
            .collect();
        Self::new(ExpKind::Record(RecordExp { type_name: Ident::new(type_name), fields }))
    }

    pub fn seq(exps: Vec<Exp>) -> Self {
        Self::new(ExpKind::Seq(exps))
    }

    pub fn assign(var: Var, exp: Exp) -> Self {
        Self::new(ExpKind::Assign(AssignExp { var, exp: Box::new(exp) }))
    }

    pub fn if_then(test: Exp, then: Exp) -> Self {
        Self::new(ExpKind::If(IfExp {
            test: Box::new(test),
            then: Box::new(then),
            otherwise: None,
        }))
    }

    pub fn if_else(test: Exp, then: Exp, otherwise: Exp) -> Self {
        Self::new(ExpKind::If(IfExp {
            test: Box::new(test),
            then: Box::new(then),
            otherwise: Some(Box::new(otherwise)),
        }))
    }

    pub fn while_loop(test: Exp, body: Exp) -> Self {
        Self::new(ExpKind::While(WhileExp { test: Box::new(test), body: Box::new(body) }))
    }

    pub fn do_while(body: Exp, test: Exp) -> Self {
        Self::new(ExpKind::DoWhile(DoWhileExp { body: Box::new(body), test: Box::new(test) }))
    }

    pub fn for_loop(var: &str, low: Exp, high: Exp, body: Exp) -> Self {
        Self::new(ExpKind::For(ForExp {
            var: Ident::new(var),
            low: Box::new(low),
            high: Box::new(high),
            body: Box::new(body),
            slot: Cell::new(None),
        }))
    }

    pub fn brk() -> Self {
        Self::new(ExpKind::Break)
    }

    pub fn let_in(decs: Vec<Dec>, body: Exp) -> Self {
        Self::new(ExpKind::Let(LetExp { decs, body: Box::new(body) }))
    }

    pub fn array(type_name: &str, size: Exp, init: Exp) -> Self {
        Self::new(ExpKind::Array(ArrayExp {
            type_name: Ident::new(type_name),
            size: Box::new(size),
            init: Box::new(init),
        }))
    }
}

impl Var {
    fn new(kind: VarKind) -> Self {
        Self { kind, loc: Location::dummy(), ty: Cell::new(None) }
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.loc = Location::new(line, column);
        self
    }

    pub fn simple(name: &str) -> Self {
        Self::new(VarKind::Simple(SimpleVar { name: name.to_string(), binding: Cell::new(None) }))
    }

    pub fn field(base: Var, field: &str) -> Self {
        Self::new(VarKind::Field(FieldVar {
            base: Box::new(base),
            field: Ident::new(field),
            index: Cell::new(None),
        }))
    }

    pub fn subscript(base: Var, index: Exp) -> Self {
        Self::new(VarKind::Subscript(SubscriptVar { base: Box::new(base), index: Box::new(index) }))
    }
}

impl Ty {
    pub fn name(name: &str) -> Self {
        Self::Name(Ident::new(name))
    }

    pub fn record(fields: &[(&str, &str)]) -> Self {
        Self::Record(
            fields
                .iter()
                .map(|(name, ty)| TypedField { name: Ident::new(name), type_name: Ident::new(ty) })
                .collect(),
        )
    }

    pub fn array(element: &str) -> Self {
        Self::Array(Ident::new(element))
    }
}

impl Dec {
    pub fn type_dec(name: &str, ty: Ty) -> Self {
        Self::Type(TypeDec { name: Ident::new(name), ty, loc: Location::dummy() })
    }

    pub fn var(name: &str, type_name: Option<&str>, init: Exp) -> Self {
        Self::Var(VarDec {
            name: Ident::new(name),
            type_name: type_name.map(Ident::new),
            init,
            loc: Location::dummy(),
            slot: Cell::new(None),
        })
    }

    pub fn function(name: &str, params: &[(&str, &str)], result: Option<&str>, body: Exp) -> Self {
        let params = params
            .iter()
            .map(|(name, ty)| TypedField { name: Ident::new(name), type_name: Ident::new(ty) })
            .collect();
        Self::Function(FunctionDec {
            name: Ident::new(name),
            params,
            result: result.map(Ident::new),
            body,
            loc: Location::dummy(),
            id: Cell::new(None),
        })
    }

    /// Place the declaration and its name
    pub fn at(mut self, line: u32, column: u32) -> Self {
        let loc = Location::new(line, column);
        match &mut self {
            Self::Type(d) => {
                d.loc = loc;
                d.name.loc = loc;
            }
            Self::Function(d) => {
                d.loc = loc;
                d.name.loc = loc;
            }
            Self::Var(d) => {
                d.loc = loc;
                d.name.loc = loc;
            }
        }
        self
    }
}
