//! Type System for Tiger
//!
//! Semantic types are small `Copy` handles. Records, arrays and frames live
//! in a [`TypeArena`] and are referred to by id, which lets recursive type
//! declarations (`type list = {hd: int, tl: list}`) be represented without
//! shared ownership.

use serde::Serialize;
use std::fmt;

/// Handle to a record type in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RecordId(pub usize);

/// Handle to an array type in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ArrayId(pub usize);

/// Handle to a function activation frame (see `middle::frame`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FrameId(pub usize);

/// Resolved semantic type
///
/// Equality on `Type` is representation equality: two records are equal
/// only when they are the same declaration (or an alias of it). Structural
/// compatibility is answered by [`TypeArena::is_match`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Type {
    Int,
    String,
    Nil,
    Void,
    Array(ArrayId),
    Record(RecordId),
    /// Pointer to a function's frame; only ever the type of a static link
    Frame(FrameId),
}

impl Type {
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Self::Int)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }
}

/// Record field after resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordField {
    pub name: String,
    pub ty: Type,
}

/// Record type definition
#[derive(Debug, Clone, Serialize)]
pub struct RecordType {
    /// Name of the declaration that introduced the record
    pub name: String,
    /// Fields in declaration order
    pub fields: Vec<RecordField>,
}

impl RecordType {
    /// Position of a field, looked up by name
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// Array type definition
#[derive(Debug, Clone, Serialize)]
pub struct ArrayType {
    pub name: String,
    /// Element type; `None` only while a recursive declaration is resolving
    pub element: Option<Type>,
}

/// Function signature (parameters in order, then the result)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionSig {
    pub params: Vec<Type>,
    pub ret: Type,
}

/// Owner of every composite type created during one analysis run
#[derive(Debug, Default, Clone, Serialize)]
pub struct TypeArena {
    records: Vec<RecordType>,
    arrays: Vec<ArrayType>,
}

impl TypeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record type with a known field list
    pub fn new_record(&mut self, name: &str, fields: Vec<RecordField>) -> Type {
        let id = RecordId(self.records.len());
        self.records.push(RecordType { name: name.to_string(), fields });
        Type::Record(id)
    }

    /// Fill in the fields of a record created before its fields were known
    pub fn set_record_fields(&mut self, id: RecordId, fields: Vec<RecordField>) {
        self.records[id.0].fields = fields;
    }

    /// Create an array type; `element` is `None` for a recursive placeholder
    pub fn new_array(&mut self, name: &str, element: Option<Type>) -> Type {
        let id = ArrayId(self.arrays.len());
        self.arrays.push(ArrayType { name: name.to_string(), element });
        Type::Array(id)
    }

    /// Fix the element type of an array placeholder; the first resolution wins
    pub fn set_array_element(&mut self, id: ArrayId, element: Type) {
        let array = &mut self.arrays[id.0];
        if array.element.is_none() {
            array.element = Some(element);
        }
    }

    pub fn record(&self, id: RecordId) -> &RecordType {
        &self.records[id.0]
    }

    pub fn array(&self, id: ArrayId) -> &ArrayType {
        &self.arrays[id.0]
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn array_count(&self) -> usize {
        self.arrays.len()
    }

    /// Record definition behind a type, if it is one
    pub fn as_record(&self, ty: Type) -> Option<&RecordType> {
        match ty {
            Type::Record(id) => Some(self.record(id)),
            _ => None,
        }
    }

    /// Element type of an array type
    pub fn element_type(&self, ty: Type) -> Option<Type> {
        match ty {
            Type::Array(id) => self.array(id).element,
            _ => None,
        }
    }

    /// Type equality. Arrays are equal when their element types are, so
    /// `array of int` declared twice is one type; every other type is
    /// equal only to itself.
    pub fn same_type(&self, a: Type, b: Type) -> bool {
        self.same_type_in(a, b, &mut Vec::new())
    }

    /// `assumed` holds the array pairs under comparison further up, so
    /// recursive arrays terminate
    fn same_type_in(&self, a: Type, b: Type, assumed: &mut Vec<(ArrayId, ArrayId)>) -> bool {
        match (a, b) {
            (Type::Array(x), Type::Array(y)) => {
                if x == y || assumed.contains(&(x, y)) {
                    return true;
                }
                match (self.array(x).element, self.array(y).element) {
                    (Some(ex), Some(ey)) => {
                        assumed.push((x, y));
                        let same = self.same_type_in(ex, ey, assumed);
                        assumed.pop();
                        same
                    }
                    _ => false,
                }
            }
            _ => a == b,
        }
    }

    /// Compatibility test used by assignments, comparisons and initializers.
    ///
    /// 1. equal types match
    /// 2. an absent (error) type never matches
    /// 3. nil matches any record, but not another nil
    /// 4. two records match when their field type sequences are equal
    /// 5. nothing else matches
    pub fn is_match(&self, a: Option<Type>, b: Option<Type>) -> bool {
        let (a, b) = match (a, b) {
            (Some(a), Some(b)) => (a, b),
            _ => return false,
        };
        if a.is_nil() && b.is_nil() {
            return false;
        }
        if self.same_type(a, b) {
            return true;
        }
        match (a, b) {
            (Type::Nil, other) | (other, Type::Nil) => other.is_record(),
            (Type::Record(x), Type::Record(y)) => self.is_layout_identical(x, y),
            _ => false,
        }
    }

    fn is_layout_identical(&self, x: RecordId, y: RecordId) -> bool {
        let (x, y) = (&self.record(x).fields, &self.record(y).fields);
        x.len() == y.len() && x.iter().zip(y).all(|(a, b)| self.same_type(a.ty, b.ty))
    }

    /// Human-readable name of a type
    pub fn display(&self, ty: Type) -> String {
        match ty {
            Type::Int => "int".to_string(),
            Type::String => "string".to_string(),
            Type::Nil => "nil".to_string(),
            Type::Void => "void".to_string(),
            Type::Array(id) => self.array(id).name.clone(),
            Type::Record(id) => self.record(id).name.clone(),
            Type::Frame(id) => format!("frame#{}", id.0),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "int"),
            Self::String => write!(f, "string"),
            Self::Nil => write!(f, "nil"),
            Self::Void => write!(f, "void"),
            Self::Array(id) => write!(f, "array#{}", id.0),
            Self::Record(id) => write!(f, "record#{}", id.0),
            Self::Frame(id) => write!(f, "frame#{}", id.0),
        }
    }
}
