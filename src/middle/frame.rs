//! Frame layout and static-link bookkeeping
//!
//! Every function activation owns a frame: an ordered list of slots (static
//! link first, then parameters, then locals in declaration order). The
//! checker records each variable's nesting level and slot offset here; code
//! generation reads a non-local variable by following `hops` static links
//! and indexing the frame at `offset`.

use crate::types::{FrameId, FunctionSig, Type};

/// Handle to a variable slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub usize);

/// Handle to a declared or intrinsic function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(pub usize);

/// What a slot holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    StaticLink,
    Param,
    Local,
    LoopCounter,
}

/// A resolved variable binding
#[derive(Debug, Clone)]
pub struct VarInfo {
    pub name: String,
    /// `None` when the declaration failed to type-check
    pub ty: Option<Type>,
    /// Nesting level of the declaring function (0 = main)
    pub level: usize,
    /// Index within the declaring frame
    pub offset: usize,
    pub frame: FrameId,
    pub kind: SlotKind,
}

/// Activation record of one function
#[derive(Debug, Clone)]
pub struct FrameInfo {
    pub name: String,
    pub level: usize,
    /// Frame of the lexically enclosing function
    pub parent: Option<FrameId>,
    pub slots: Vec<VarId>,
    /// Slot types in offset order, available once the body is checked
    pub layout: Option<Vec<Option<Type>>>,
}

#[derive(Debug, Clone)]
pub enum FunctionKind {
    /// Runtime-provided function without a static link
    Intrinsic { symbol: &'static str },
    /// Function declared in the program
    User {
        level: usize,
        frame: FrameId,
        static_link: VarId,
        params: Vec<VarId>,
    },
}

#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub name: String,
    /// Parameter types (static link first for user functions) and result;
    /// `None` when a parameter or result type failed to resolve
    pub sig: Option<FunctionSig>,
    pub kind: FunctionKind,
}

impl FunctionInfo {
    pub fn is_intrinsic(&self) -> bool {
        matches!(self.kind, FunctionKind::Intrinsic { .. })
    }

    /// Number of synthesized leading parameters not written at call sites
    pub fn hidden_params(&self) -> usize {
        match self.kind {
            FunctionKind::Intrinsic { .. } => 0,
            FunctionKind::User { .. } => 1,
        }
    }

    /// Declared result type
    pub fn result(&self) -> Option<Type> {
        self.sig.as_ref().map(|sig| sig.ret)
    }
}

/// How to reach a variable from code running at some nesting level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    /// Static links to follow before indexing
    pub hops: usize,
    pub offset: usize,
}

/// Arenas of frames, variables and functions for one analysis run
#[derive(Debug, Default, Clone)]
pub struct FrameTable {
    frames: Vec<FrameInfo>,
    vars: Vec<VarInfo>,
    functions: Vec<FunctionInfo>,
}

impl FrameTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_frame(&mut self, name: &str, level: usize, parent: Option<FrameId>) -> FrameId {
        let id = FrameId(self.frames.len());
        self.frames.push(FrameInfo {
            name: name.to_string(),
            level,
            parent,
            slots: Vec::new(),
            layout: None,
        });
        id
    }

    /// Append a slot to a frame; its offset is the frame's current size
    pub fn alloc(&mut self, frame: FrameId, name: &str, ty: Option<Type>, kind: SlotKind) -> VarId {
        let id = VarId(self.vars.len());
        let info = &mut self.frames[frame.0];
        self.vars.push(VarInfo {
            name: name.to_string(),
            ty,
            level: info.level,
            offset: info.slots.len(),
            frame,
            kind,
        });
        info.slots.push(id);
        id
    }

    pub fn add_function(&mut self, info: FunctionInfo) -> FunctionId {
        let id = FunctionId(self.functions.len());
        self.functions.push(info);
        id
    }

    /// Fix the slot layout of a frame from the types of its variables
    pub fn finalize(&mut self, frame: FrameId) {
        let layout = self.frames[frame.0]
            .slots
            .iter()
            .map(|var| self.vars[var.0].ty)
            .collect();
        self.frames[frame.0].layout = Some(layout);
    }

    /// Access path to `var` from code at nesting level `from_level`
    pub fn access(&self, var: VarId, from_level: usize) -> Access {
        let info = self.var(var);
        debug_assert!(from_level >= info.level, "variable is not visible from this level");
        Access {
            hops: from_level.saturating_sub(info.level),
            offset: info.offset,
        }
    }

    pub fn var(&self, id: VarId) -> &VarInfo {
        &self.vars[id.0]
    }

    pub fn frame(&self, id: FrameId) -> &FrameInfo {
        &self.frames[id.0]
    }

    pub fn function(&self, id: FunctionId) -> &FunctionInfo {
        &self.functions[id.0]
    }

    pub fn frames(&self) -> impl Iterator<Item = (FrameId, &FrameInfo)> {
        self.frames.iter().enumerate().map(|(i, f)| (FrameId(i), f))
    }

    pub fn functions(&self) -> impl Iterator<Item = (FunctionId, &FunctionInfo)> {
        self.functions.iter().enumerate().map(|(i, f)| (FunctionId(i), f))
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }
}
