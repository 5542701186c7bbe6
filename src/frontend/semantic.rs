//! Semantic Analysis for Tiger
//!
//! Performs:
//! - Scope resolution of variables, functions and types
//! - Type checking of every expression, cached on the AST
//! - Static-link bookkeeping (levels, frames, slot offsets)
//!
//! The walk never stops at the first error: a failing check reports one
//! diagnostic and yields `None`, and callers that see `None` from a child
//! propagate it without reporting again.

use std::collections::HashMap;

use crate::feedback::Diagnostics;
use crate::frontend::ast::*;
use crate::frontend::symbol::SymbolTable;
use crate::middle::frame::{FrameTable, FunctionId, FunctionInfo, FunctionKind, SlotKind, VarId};
use crate::stdlib::BuiltinRegistry;
use crate::types::{FrameId, Type, TypeArena};
use crate::utils::{Error, Location};

/// Handle to a named type binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeSlotId(pub usize);

/// Resolution state of a named type
#[derive(Debug, Clone, Copy)]
pub(super) enum TypeSlot<'a> {
    /// Declared, body not resolved yet
    Pending(&'a TypeDec),
    Resolved(Type),
    /// Resolution failed and was already reported
    Poisoned,
}

/// Traversal state of the function whose body is being checked
#[derive(Debug)]
pub struct FunctionCtx {
    /// Nesting level (0 = main)
    pub level: usize,
    /// Frame receiving new slots
    pub frame: FrameId,
    /// Loops enclosing the current node within this function body
    loop_depth: usize,
}

impl FunctionCtx {
    pub fn new(level: usize, frame: FrameId) -> Self {
        Self { level, frame, loop_depth: 0 }
    }

    fn in_loop(&self) -> bool {
        self.loop_depth > 0
    }
}

/// Result of one analysis run, handed to code generation
#[derive(Debug)]
pub struct Analysis {
    /// Type of the root expression
    pub result: Option<Type>,
    pub types: TypeArena,
    pub frames: FrameTable,
    pub diagnostics: Diagnostics,
    /// Level-0 frame holding the top-level variables
    pub main_frame: FrameId,
}

impl Analysis {
    /// Sticky failure flag; code generation must not run when set
    pub fn has_error(&self) -> bool {
        self.diagnostics.has_error()
    }

    /// Reset `values` and bind every slot of the main frame into it
    pub fn bind_main_frame(&self, values: &mut SymbolTable<VarId>) {
        values.reset();
        for &slot in &self.frames.frame(self.main_frame).slots {
            values.push(&self.frames.var(slot).name, slot);
        }
    }
}

/// Check a whole program
pub fn analyze(root: &Root) -> Analysis {
    log::debug!("semantic analysis started");
    let mut analyzer = SemanticAnalyzer::new();
    let result = analyzer.check_root(root);
    let analysis = analyzer.finish(result);
    log::debug!(
        "semantic analysis finished with {} diagnostic(s)",
        analysis.diagnostics.len()
    );
    analysis
}

/// Semantic analyzer
pub struct SemanticAnalyzer<'a> {
    pub(super) types: TypeArena,
    pub(super) frames: FrameTable,
    pub(super) diagnostics: Diagnostics,
    pub(super) values: SymbolTable<VarId>,
    pub(super) type_names: SymbolTable<TypeSlotId>,
    pub(super) functions: SymbolTable<FunctionId>,
    pub(super) type_slots: Vec<TypeSlot<'a>>,
    /// Records and arrays handed out before their declaration finished
    pub(super) placeholders: HashMap<TypeSlotId, Type>,
    main_frame: FrameId,
}

impl<'a> SemanticAnalyzer<'a> {
    pub fn new() -> Self {
        let mut frames = FrameTable::new();
        let main_frame = frames.new_frame("main", 0, None);
        let mut analyzer = Self {
            types: TypeArena::new(),
            frames,
            diagnostics: Diagnostics::new(),
            values: SymbolTable::new(),
            type_names: SymbolTable::new(),
            functions: SymbolTable::new(),
            type_slots: Vec::new(),
            placeholders: HashMap::new(),
            main_frame,
        };
        analyzer.register_builtins();
        analyzer
    }

    /// Bind `int`, `string` and the runtime intrinsics in the outermost scopes
    fn register_builtins(&mut self) {
        for (name, ty) in [("int", Type::Int), ("string", Type::String)] {
            let slot = TypeSlotId(self.type_slots.len());
            self.type_slots.push(TypeSlot::Resolved(ty));
            self.type_names.push(name, slot);
        }

        for builtin in BuiltinRegistry::new().iter() {
            let id = self.frames.add_function(FunctionInfo {
                name: builtin.name.to_string(),
                sig: Some(builtin.sig()),
                kind: FunctionKind::Intrinsic { symbol: builtin.symbol },
            });
            self.functions.push(builtin.name, id);
        }
    }

    pub fn main_frame(&self) -> FrameId {
        self.main_frame
    }

    /// Check the root expression inside the main frame
    pub fn check_root(&mut self, root: &'a Root) -> Option<Type> {
        let mut ctx = FunctionCtx::new(0, self.main_frame);
        let result = self.check_exp(&root.body, &mut ctx);
        self.frames.finalize(self.main_frame);
        result
    }

    pub fn finish(self, result: Option<Type>) -> Analysis {
        Analysis {
            result,
            types: self.types,
            frames: self.frames,
            diagnostics: self.diagnostics,
            main_frame: self.main_frame,
        }
    }

    pub(super) fn report(&mut self, error: Error, loc: Location) -> Option<Type> {
        self.diagnostics.report(error, loc)
    }

    pub(super) fn enter_scopes(&mut self) {
        self.type_names.enter();
        self.values.enter();
        self.functions.enter();
        log::trace!("entered scope depth {}", self.values.depth());
    }

    pub(super) fn exit_scopes(&mut self) {
        log::trace!("leaving scope depth {}", self.values.depth());
        self.functions.exit();
        self.values.exit();
        self.type_names.exit();
    }

    // ==================== Expressions ====================

    /// Type check an expression and cache the result on the node
    pub fn check_exp(&mut self, exp: &'a Exp, ctx: &mut FunctionCtx) -> Option<Type> {
        let ty = match &exp.kind {
            ExpKind::Var(var) => self.check_var(var, ctx),
            ExpKind::Nil => Some(Type::Nil),
            ExpKind::Int(_) => Some(Type::Int),
            ExpKind::String(_) => Some(Type::String),
            ExpKind::Call(call) => self.check_call(call, exp.loc, ctx),
            ExpKind::Binary(binary) => self.check_binary(binary, exp.loc, ctx),
            ExpKind::Record(record) => self.check_record(record, exp.loc, ctx),
            ExpKind::Seq(exps) => self.check_seq(exps, ctx),
            ExpKind::Assign(assign) => self.check_assign(assign, ctx),
            ExpKind::If(if_exp) => self.check_if(if_exp, exp.loc, ctx),
            ExpKind::While(while_exp) => {
                self.check_loop(&while_exp.test, &while_exp.body, false, ctx)
            }
            ExpKind::DoWhile(do_while) => {
                self.check_loop(&do_while.test, &do_while.body, true, ctx)
            }
            ExpKind::For(for_exp) => self.check_for(for_exp, exp.loc, ctx),
            ExpKind::Break => {
                if ctx.in_loop() {
                    Some(Type::Void)
                } else {
                    self.report(Error::BreakOutsideLoop, exp.loc)
                }
            }
            ExpKind::Let(let_exp) => self.check_let(let_exp, ctx),
            ExpKind::Array(array) => self.check_array(array, ctx),
        };
        exp.ty.set(ty);
        ty
    }

    fn check_call(&mut self, call: &'a CallExp, loc: Location, ctx: &mut FunctionCtx) -> Option<Type> {
        let Some(&id) = self.functions.lookup(&call.func.name) else {
            self.check_all(&call.args, ctx);
            return self.report(Error::UndefinedFunction { name: call.func.name.clone() }, call.func.loc);
        };
        call.callee.set(Some(id));

        let info = self.frames.function(id);
        let hidden = info.hidden_params();
        let Some(sig) = info.sig.clone() else {
            self.check_all(&call.args, ctx);
            return None;
        };

        let expected = sig.params.len() - hidden;
        if call.args.len() != expected {
            self.check_all(&call.args, ctx);
            return self.report(
                Error::ArgCountMismatch { expected, got: call.args.len() },
                loc,
            );
        }

        let mut valid = true;
        for (arg, &param) in call.args.iter().zip(&sig.params[hidden..]) {
            match self.check_exp(arg, ctx) {
                Some(ty) if self.types.same_type(ty, param) => {}
                Some(_) => {
                    self.report(Error::ParamTypeMismatch, arg.loc);
                    valid = false;
                }
                None => valid = false,
            }
        }
        valid.then_some(sig.ret)
    }

    fn check_binary(&mut self, binary: &'a BinaryExp, loc: Location, ctx: &mut FunctionCtx) -> Option<Type> {
        let left = self.check_exp(&binary.left, ctx);
        let right = self.check_exp(&binary.right, ctx);
        let (left, right) = (left?, right?);

        if binary.op.is_equality() {
            if left.is_nil() && right.is_nil() {
                return self.report(Error::NilComparedToNil, loc);
            }
            if !self.types.is_match(Some(left), Some(right)) {
                return self.report(Error::ComparisonMismatch, loc);
            }
            Some(Type::Int)
        } else if left.is_int() && right.is_int() {
            Some(Type::Int)
        } else {
            self.report(Error::BinaryRequiresIntegers, loc)
        }
    }

    /// A malformed literal reports one error; every initializer is still
    /// checked for its own errors
    fn check_record(&mut self, record: &'a RecordExp, loc: Location, ctx: &mut FunctionCtx) -> Option<Type> {
        let Some(ty) = self.type_of(&record.type_name) else {
            self.check_all(record.inits(), ctx);
            return None;
        };
        let Some(declared) = self.types.as_record(ty).map(|r| r.fields.clone()) else {
            self.report(Error::RecordTypeRequired, record.type_name.loc);
            self.check_all(record.inits(), ctx);
            return None;
        };

        if declared.len() != record.fields.len() {
            self.report(
                Error::FieldCountMismatch { expected: declared.len(), got: record.fields.len() },
                loc,
            );
            self.check_all(record.inits(), ctx);
            return None;
        }

        let mut valid = true;
        for (i, (init, field)) in record.fields.iter().zip(&declared).enumerate() {
            if init.name.name != field.name {
                self.report(
                    Error::FieldPosition {
                        field: init.name.name.clone(),
                        record: record.type_name.name.clone(),
                    },
                    loc,
                );
                self.check_all(record.inits().skip(i), ctx);
                return None;
            }
            match self.check_exp(&init.exp, ctx) {
                Some(value) if !self.types.is_match(Some(value), Some(field.ty)) => {
                    self.report(Error::FieldTypeMismatch, init.exp.loc);
                    valid = false;
                }
                Some(_) => {}
                None => valid = false,
            }
        }
        valid.then_some(ty)
    }

    fn check_seq(&mut self, exps: &'a [Exp], ctx: &mut FunctionCtx) -> Option<Type> {
        let mut last = Some(Type::Void);
        let mut valid = true;
        for exp in exps {
            last = self.check_exp(exp, ctx);
            valid &= last.is_some();
        }
        if valid {
            last
        } else {
            None
        }
    }

    fn check_assign(&mut self, assign: &'a AssignExp, ctx: &mut FunctionCtx) -> Option<Type> {
        let target = self.check_var(&assign.var, ctx);
        let value = self.check_exp(&assign.exp, ctx);
        let (target, value) = (target?, value?);
        if self.types.is_match(Some(target), Some(value)) {
            Some(Type::Void)
        } else {
            self.report(Error::AssignMismatch, assign.exp.loc)
        }
    }

    fn check_if(&mut self, if_exp: &'a IfExp, loc: Location, ctx: &mut FunctionCtx) -> Option<Type> {
        let test = self.check_exp(&if_exp.test, ctx);
        let then = self.check_exp(&if_exp.then, ctx);
        let otherwise = match &if_exp.otherwise {
            Some(otherwise) => Some((otherwise.loc, self.check_exp(otherwise, ctx))),
            None => None,
        };

        let test = test?;
        if !test.is_int() {
            return self.report(Error::TestRequiresInteger, if_exp.test.loc);
        }

        let then = then?;
        match otherwise {
            Some((else_loc, otherwise)) => {
                let otherwise = otherwise?;
                if !self.types.is_match(Some(then), Some(otherwise)) {
                    return self.report(Error::BranchMismatch, else_loc);
                }
                Some(if then.is_nil() { otherwise } else { then })
            }
            None if then.is_void() => Some(Type::Void),
            None => self.report(Error::ThenWithoutElse, loc),
        }
    }

    fn check_loop(&mut self, test: &'a Exp, body: &'a Exp, body_first: bool, ctx: &mut FunctionCtx) -> Option<Type> {
        let (test_ty, body_ty) = if body_first {
            let body_ty = self.check_loop_body(body, ctx);
            (self.check_exp(test, ctx), body_ty)
        } else {
            let test_ty = self.check_exp(test, ctx);
            (test_ty, self.check_loop_body(body, ctx))
        };

        let mut valid = true;
        match test_ty {
            Some(ty) if !ty.is_int() => {
                self.report(Error::LoopTestRequiresInteger, test.loc);
                valid = false;
            }
            Some(_) => {}
            None => valid = false,
        }
        match body_ty {
            Some(ty) if !ty.is_void() => {
                self.report(Error::LoopBodyReturnsValue, body.loc);
                valid = false;
            }
            Some(_) => {}
            None => valid = false,
        }
        valid.then_some(Type::Void)
    }

    fn check_loop_body(&mut self, body: &'a Exp, ctx: &mut FunctionCtx) -> Option<Type> {
        ctx.loop_depth += 1;
        let ty = self.check_exp(body, ctx);
        ctx.loop_depth -= 1;
        ty
    }

    fn check_for(&mut self, for_exp: &'a ForExp, loc: Location, ctx: &mut FunctionCtx) -> Option<Type> {
        let low = self.check_exp(&for_exp.low, ctx);
        let high = self.check_exp(&for_exp.high, ctx);
        let mut valid = low.is_some() && high.is_some();
        if let (Some(low), Some(high)) = (low, high) {
            if !low.is_int() || !high.is_int() {
                self.report(Error::ForBoundsRequireInteger, loc);
                valid = false;
            }
        }

        self.values.enter();
        let slot = self
            .frames
            .alloc(ctx.frame, &for_exp.var.name, Some(Type::Int), SlotKind::LoopCounter);
        for_exp.slot.set(Some(slot));
        self.values.push(&for_exp.var.name, slot);
        let body = self.check_loop_body(&for_exp.body, ctx);
        self.values.exit();

        (valid && body.is_some()).then_some(Type::Void)
    }

    fn check_let(&mut self, let_exp: &'a LetExp, ctx: &mut FunctionCtx) -> Option<Type> {
        self.enter_scopes();
        let decs_valid = self.check_decs(&let_exp.decs, ctx);
        let body = self.check_exp(&let_exp.body, ctx);
        self.exit_scopes();
        if decs_valid {
            body
        } else {
            None
        }
    }

    fn check_array(&mut self, array: &'a ArrayExp, ctx: &mut FunctionCtx) -> Option<Type> {
        let ty = self.type_of(&array.type_name);
        let size = self.check_exp(&array.size, ctx);
        let init = self.check_exp(&array.init, ctx);

        let ty = ty?;
        if !ty.is_array() {
            return self.report(Error::ArrayTypeRequired, array.type_name.loc);
        }
        let element = self.types.element_type(ty)?;

        let (size, init) = (size?, init?);
        if !size.is_int() {
            return self.report(Error::ArraySizeNotInteger, array.size.loc);
        }
        if !self.types.same_type(init, element) {
            return self.report(Error::ArrayInitMismatch, array.init.loc);
        }
        Some(ty)
    }

    /// Check expressions only for their own diagnostics
    fn check_all<I>(&mut self, exps: I, ctx: &mut FunctionCtx)
    where
        I: IntoIterator<Item = &'a Exp>,
    {
        for exp in exps {
            self.check_exp(exp, ctx);
        }
    }

    // ==================== Variables ====================

    fn check_var(&mut self, var: &'a Var, ctx: &mut FunctionCtx) -> Option<Type> {
        let ty = match &var.kind {
            VarKind::Simple(simple) => match self.values.lookup(&simple.name) {
                Some(&id) => {
                    simple.binding.set(Some(id));
                    self.frames.var(id).ty
                }
                None => self.report(Error::UndefinedVariable { name: simple.name.clone() }, var.loc),
            },
            VarKind::Field(field) => self.check_field_var(field, var.loc, ctx),
            VarKind::Subscript(subscript) => self.check_subscript(subscript, ctx),
        };
        var.ty.set(ty);
        ty
    }

    fn check_field_var(&mut self, field: &'a FieldVar, loc: Location, ctx: &mut FunctionCtx) -> Option<Type> {
        let base = self.check_var(&field.base, ctx)?;
        let Some(record) = self.types.as_record(base) else {
            return self.report(Error::NotARecord, field.base.loc);
        };
        match record.field_index(&field.field.name) {
            Some(index) => {
                field.index.set(Some(index));
                Some(record.fields[index].ty)
            }
            None => self.report(Error::UnknownField { field: field.field.name.clone() }, loc),
        }
    }

    fn check_subscript(&mut self, subscript: &'a SubscriptVar, ctx: &mut FunctionCtx) -> Option<Type> {
        let base = self.check_var(&subscript.base, ctx);
        let index = self.check_exp(&subscript.index, ctx);

        let base = base?;
        if !base.is_array() {
            return self.report(Error::NotAnArray, subscript.base.loc);
        }
        let index = index?;
        if !index.is_int() {
            return self.report(Error::SubscriptNotInteger, subscript.index.loc);
        }
        self.types.element_type(base)
    }
}

impl Default for SemanticAnalyzer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ErrorKind;
    use pretty_assertions::assert_eq;

    fn run(body: Exp) -> (Root, Analysis) {
        let root = Root::new(body);
        let analysis = analyze(&root);
        (root, analysis)
    }

    fn messages(body: Exp) -> Vec<String> {
        run(body).1.diagnostics.messages()
    }

    fn int_array_decs() -> Vec<Dec> {
        vec![
            Dec::type_dec("ints", Ty::array("int")),
            Dec::var("arr", None, Exp::array("ints", Exp::int(10), Exp::int(0))),
        ]
    }

    #[test]
    fn test_literals() {
        assert_eq!(run(Exp::int(1)).1.result, Some(Type::Int));
        assert_eq!(run(Exp::string("s")).1.result, Some(Type::String));
        assert_eq!(run(Exp::nil()).1.result, Some(Type::Nil));
        assert_eq!(run(Exp::seq(vec![])).1.result, Some(Type::Void));
    }

    #[test]
    fn test_function_declaration_and_call() {
        // let function f(a: int): int = a + 1 in f(2) end
        let f = Dec::function(
            "f",
            &[("a", "int")],
            Some("int"),
            Exp::binary(BinOp::Add, Exp::ident("a"), Exp::int(1)),
        );
        let (root, analysis) = run(Exp::let_in(vec![f], Exp::call("f", vec![Exp::int(2)])));
        assert!(analysis.diagnostics.is_empty());
        assert_eq!(analysis.result, Some(Type::Int));

        let ExpKind::Let(let_exp) = &root.body.kind else { unreachable!() };
        let Dec::Function(dec) = &let_exp.decs[0] else { unreachable!() };
        let info = analysis.frames.function(dec.id.get().unwrap());
        let sig = info.sig.as_ref().unwrap();
        assert_eq!(sig.params.len() - info.hidden_params(), 1);
        assert_eq!(sig.params[1], Type::Int);
        assert_eq!(sig.ret, Type::Int);
        assert_eq!(sig.params[0], Type::Frame(analysis.main_frame));
    }

    #[test]
    fn test_nil_without_type_annotation() {
        let (_, analysis) = run(Exp::let_in(vec![Dec::var("x", None, Exp::nil())], Exp::ident("x")));
        assert_eq!(analysis.diagnostics.messages(), vec!["Nil can only assign to record type"]);
        assert!(analysis.has_error());
    }

    #[test]
    fn test_if_without_else_must_not_return_value() {
        let msgs = messages(Exp::if_then(Exp::int(1), Exp::int(2)));
        assert_eq!(msgs, vec!["\"Then\" returns a value but \"Else\" doesn't"]);
        assert!(messages(Exp::if_then(Exp::int(1), Exp::seq(vec![]))).is_empty());
    }

    #[test]
    fn test_if_else_branches() {
        assert_eq!(run(Exp::if_else(Exp::int(1), Exp::int(2), Exp::int(3))).1.result, Some(Type::Int));
        assert_eq!(
            messages(Exp::if_else(Exp::int(1), Exp::int(2), Exp::string("x"))),
            vec!["Require same type in both branch"]
        );
        assert_eq!(
            messages(Exp::if_else(Exp::string("c"), Exp::int(2), Exp::int(3))),
            vec!["Require integer in test"]
        );
    }

    #[test]
    fn test_if_else_nil_takes_record_type() {
        let decs = vec![
            Dec::type_dec("node", Ty::record(&[("v", "int")])),
            Dec::var("n", Some("node"), Exp::nil()),
        ];
        let body = Exp::if_else(Exp::int(1), Exp::nil(), Exp::ident("n"));
        let (_, analysis) = run(Exp::let_in(decs, body));
        assert!(analysis.diagnostics.is_empty());
        assert!(analysis.result.unwrap().is_record());
    }

    #[test]
    fn test_break_inside_loops() {
        let while_loop = Exp::while_loop(Exp::int(1), Exp::brk());
        let (_, analysis) = run(while_loop);
        assert!(analysis.diagnostics.is_empty());
        assert_eq!(analysis.result, Some(Type::Void));

        let for_loop = Exp::for_loop("i", Exp::int(0), Exp::int(9), Exp::seq(vec![Exp::brk()]));
        assert!(messages(for_loop).is_empty());

        let do_while = Exp::do_while(Exp::brk(), Exp::int(0));
        assert!(messages(do_while).is_empty());
    }

    #[test]
    fn test_break_outside_loop() {
        let msgs = messages(Exp::let_in(vec![], Exp::brk()));
        assert_eq!(msgs, vec!["Break is only allowed on Loop statements"]);

        // the loop test is not part of the loop body
        let msgs = messages(Exp::while_loop(Exp::seq(vec![Exp::brk(), Exp::int(1)]), Exp::seq(vec![])));
        assert_eq!(msgs, vec!["Break is only allowed on Loop statements"]);
    }

    #[test]
    fn test_break_does_not_cross_function_boundary() {
        // while 1 do let function g() = break in g() end
        let g = Dec::function("g", &[], None, Exp::brk().at(1, 30));
        let body = Exp::let_in(vec![g], Exp::call("g", vec![]));
        let (_, analysis) = run(Exp::while_loop(Exp::int(1), body));
        let entries: Vec<_> = analysis.diagnostics.iter().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].error, Error::BreakOutsideLoop);
        assert_eq!(entries[0].location, Location::new(1, 30));
    }

    #[test]
    fn test_loop_test_and_body() {
        assert_eq!(
            messages(Exp::while_loop(Exp::string("x"), Exp::seq(vec![]))),
            vec!["Require integer"]
        );
        assert_eq!(
            messages(Exp::while_loop(Exp::int(1), Exp::int(5))),
            vec!["Loop body does not return value"]
        );
        assert_eq!(
            messages(Exp::do_while(Exp::int(5), Exp::int(1))),
            vec!["Loop body does not return value"]
        );
    }

    #[test]
    fn test_for_loop_counter() {
        let body = Exp::call("printd", vec![Exp::ident("i")]);
        let (root, analysis) = run(Exp::for_loop("i", Exp::int(0), Exp::int(3), body));
        assert!(analysis.diagnostics.is_empty());

        let ExpKind::For(for_exp) = &root.body.kind else { unreachable!() };
        let slot = analysis.frames.var(for_exp.slot.get().unwrap());
        assert_eq!(slot.ty, Some(Type::Int));
        assert_eq!(slot.kind, SlotKind::LoopCounter);
        assert_eq!(slot.level, 0);

        let msgs = messages(Exp::for_loop("i", Exp::string("a"), Exp::int(3), Exp::seq(vec![])));
        assert_eq!(msgs, vec!["For bounds require integer"]);
    }

    #[test]
    fn test_for_counter_is_scoped_to_loop() {
        let body = Exp::seq(vec![
            Exp::for_loop("i", Exp::int(0), Exp::int(3), Exp::seq(vec![])),
            Exp::ident("i"),
        ]);
        assert_eq!(messages(body), vec!["i is not defined"]);
    }

    #[test]
    fn test_binary_operators() {
        let sum = Exp::binary(BinOp::Mul, Exp::int(2), Exp::int(3));
        assert_eq!(run(sum).1.result, Some(Type::Int));

        let concat = Exp::binary(BinOp::Add, Exp::string("a"), Exp::int(3));
        assert_eq!(messages(concat), vec!["Binary expression require integers"]);

        let strings = Exp::binary(BinOp::Eq, Exp::string("a"), Exp::string("b"));
        assert_eq!(run(strings).1.result, Some(Type::Int));

        let mixed = Exp::binary(BinOp::Ne, Exp::string("a"), Exp::int(1));
        assert_eq!(messages(mixed), vec!["Binary comparison type not match"]);

        let logical = Exp::binary(BinOp::And, Exp::int(1), Exp::int(0));
        assert_eq!(run(logical).1.result, Some(Type::Int));
    }

    #[test]
    fn test_nil_comparisons() {
        assert_eq!(
            messages(Exp::binary(BinOp::Eq, Exp::nil(), Exp::nil())),
            vec!["Nil cannot compare to nil"]
        );

        let decs = vec![
            Dec::type_dec("node", Ty::record(&[("v", "int")])),
            Dec::var("n", Some("node"), Exp::nil()),
        ];
        let body = Exp::binary(BinOp::Ne, Exp::ident("n"), Exp::nil());
        let (_, analysis) = run(Exp::let_in(decs, body));
        assert!(analysis.diagnostics.is_empty());
        assert_eq!(analysis.result, Some(Type::Int));

        assert_eq!(
            messages(Exp::binary(BinOp::Eq, Exp::int(0), Exp::nil())),
            vec!["Binary comparison type not match"]
        );
    }

    #[test]
    fn test_undefined_variable() {
        let (_, analysis) = run(Exp::var(Var::simple("ghost").at(4, 2)));
        let entry = analysis.diagnostics.iter().next().unwrap();
        assert_eq!(entry.to_string(), "4:2: Error: ghost is not defined");
        assert_eq!(entry.error.kind(), ErrorKind::UndefinedReference);
    }

    #[test]
    fn test_error_propagates_without_cascading() {
        // (ghost + 1) * 2 reports the undefined variable once
        let exp = Exp::binary(
            BinOp::Mul,
            Exp::binary(BinOp::Add, Exp::ident("ghost"), Exp::int(1)),
            Exp::int(2),
        );
        let (root, analysis) = run(exp);
        assert_eq!(analysis.diagnostics.messages(), vec!["ghost is not defined"]);
        assert_eq!(root.body.ty.get(), None);
    }

    #[test]
    fn test_independent_errors_are_all_reported() {
        let exp = Exp::seq(vec![Exp::ident("a"), Exp::call("nope", vec![]), Exp::ident("b")]);
        assert_eq!(
            messages(exp),
            vec!["a is not defined", "Function nope undeclared", "b is not defined"]
        );
    }

    #[test]
    fn test_sequence_takes_last_type() {
        let exp = Exp::seq(vec![Exp::int(1), Exp::string("last")]);
        assert_eq!(run(exp).1.result, Some(Type::String));
    }

    #[test]
    fn test_assignment() {
        let decs = vec![Dec::var("x", None, Exp::int(0))];
        let ok = Exp::let_in(decs.clone(), Exp::assign(Var::simple("x"), Exp::int(4)));
        assert_eq!(run(ok).1.result, Some(Type::Void));

        let bad = Exp::let_in(decs, Exp::assign(Var::simple("x"), Exp::string("s")));
        assert_eq!(messages(bad), vec!["Assign types do not match"]);
    }

    #[test]
    fn test_call_argument_count() {
        let f = Dec::function("f", &[("a", "int"), ("b", "int")], None, Exp::seq(vec![]));
        for args in [vec![Exp::int(1)], vec![Exp::int(1), Exp::string("x"), Exp::int(3)]] {
            let program = Exp::let_in(vec![f.clone()], Exp::call("f", args));
            assert_eq!(messages(program), vec!["Incorrect number of passed arguments"]);
        }
    }

    #[test]
    fn test_intrinsic_calls() {
        let exp = Exp::call(
            "substring",
            vec![Exp::string("hello"), Exp::int(1), Exp::int(2)],
        );
        assert_eq!(run(exp).1.result, Some(Type::String));

        assert_eq!(
            messages(Exp::call("print", vec![Exp::int(1)])),
            vec!["Params type not match"]
        );
        assert_eq!(
            messages(Exp::call("flush", vec![Exp::int(1)])),
            vec!["Incorrect number of passed arguments"]
        );
        assert_eq!(messages(Exp::call("launch", vec![])), vec!["Function launch undeclared"]);
    }

    #[test]
    fn test_call_records_callee() {
        let (root, analysis) = run(Exp::call("print", vec![Exp::string("hi")]));
        let ExpKind::Call(call) = &root.body.kind else { unreachable!() };
        let info = analysis.frames.function(call.callee.get().unwrap());
        assert!(matches!(info.kind, FunctionKind::Intrinsic { symbol: "print" }));
        assert_eq!(analysis.result, Some(Type::Void));
    }

    #[test]
    fn test_record_literals() {
        let point = Dec::type_dec("point", Ty::record(&[("x", "int"), ("y", "int")]));
        let ok = Exp::record("point", vec![("x", Exp::int(1)), ("y", Exp::int(2))]);
        let (_, analysis) = run(Exp::let_in(vec![point.clone()], ok));
        assert!(analysis.diagnostics.is_empty());
        assert!(analysis.result.unwrap().is_record());

        let swapped = Exp::record("point", vec![("y", Exp::int(1)), ("x", Exp::int(2))]);
        assert_eq!(
            messages(Exp::let_in(vec![point.clone()], swapped)),
            vec!["y is not a field or not on the right position of point"]
        );

        let short = Exp::record("point", vec![("x", Exp::int(1))]);
        assert_eq!(messages(Exp::let_in(vec![point.clone()], short)), vec!["Wrong number of fields"]);

        let wrong = Exp::record("point", vec![("x", Exp::int(1)), ("y", Exp::string("2"))]);
        assert_eq!(messages(Exp::let_in(vec![point], wrong)), vec!["Field type not match"]);

        let not_record = Exp::record("int", vec![]);
        assert_eq!(messages(not_record), vec!["Require a record type"]);
    }

    #[test]
    fn test_field_access() {
        let decs = vec![
            Dec::type_dec("point", Ty::record(&[("x", "int"), ("label", "string")])),
            Dec::var(
                "p",
                Some("point"),
                Exp::record("point", vec![("x", Exp::int(1)), ("label", Exp::string("a"))]),
            ),
        ];
        let read = Exp::var(Var::field(Var::simple("p"), "label"));
        let (root, analysis) = run(Exp::let_in(decs.clone(), read));
        assert!(analysis.diagnostics.is_empty());
        assert_eq!(analysis.result, Some(Type::String));

        let ExpKind::Let(let_exp) = &root.body.kind else { unreachable!() };
        let ExpKind::Var(var) = &let_exp.body.kind else { unreachable!() };
        let VarKind::Field(field) = &var.kind else { unreachable!() };
        assert_eq!(field.index.get(), Some(1));

        let missing = Exp::var(Var::field(Var::simple("p"), "z"));
        assert_eq!(messages(Exp::let_in(decs, missing)), vec!["field not exists in this struct"]);

        let on_int = Exp::let_in(
            vec![Dec::var("n", None, Exp::int(3))],
            Exp::var(Var::field(Var::simple("n"), "x")),
        );
        assert_eq!(messages(on_int), vec!["field reference is only for record type"]);
    }

    #[test]
    fn test_subscript() {
        let read = Exp::var(Var::subscript(Var::simple("arr"), Exp::int(2)));
        let (_, analysis) = run(Exp::let_in(int_array_decs(), read));
        assert!(analysis.diagnostics.is_empty());
        assert_eq!(analysis.result, Some(Type::Int));

        let bad_index = Exp::var(Var::subscript(Var::simple("arr"), Exp::string("2")));
        assert_eq!(
            messages(Exp::let_in(int_array_decs(), bad_index)),
            vec!["Subscript should be integer"]
        );

        let not_array = Exp::let_in(
            vec![Dec::var("n", None, Exp::int(3))],
            Exp::var(Var::subscript(Var::simple("n"), Exp::int(0))),
        );
        assert_eq!(messages(not_array), vec!["Subscript is only for array type"]);
    }

    #[test]
    fn test_array_literals() {
        let decs = vec![Dec::type_dec("ints", Ty::array("int"))];
        let sized_by_string = Exp::array("ints", Exp::string("10"), Exp::int(0));
        assert_eq!(
            messages(Exp::let_in(decs.clone(), sized_by_string)),
            vec!["Size should be integer"]
        );

        let wrong_init = Exp::array("ints", Exp::int(10), Exp::string("0"));
        assert_eq!(
            messages(Exp::let_in(decs, wrong_init)),
            vec!["Initial type not matches"]
        );

        assert_eq!(
            messages(Exp::array("int", Exp::int(1), Exp::int(0))),
            vec!["Array type required"]
        );
        assert_eq!(
            messages(Exp::array("missing", Exp::int(1), Exp::int(0))),
            vec!["missing is not a type"]
        );
    }

    #[test]
    fn test_same_shape_arrays_are_interchangeable() {
        // x := y; f(y) with a and b both `array of int`
        let decs = vec![
            Dec::type_dec("a", Ty::array("int")),
            Dec::type_dec("b", Ty::array("int")),
            Dec::var("x", Some("a"), Exp::array("a", Exp::int(1), Exp::int(0))),
            Dec::var("y", Some("b"), Exp::array("b", Exp::int(1), Exp::int(0))),
            Dec::function("f", &[("p", "a")], None, Exp::seq(vec![])),
        ];
        let body = Exp::seq(vec![
            Exp::assign(Var::simple("x"), Exp::ident("y")),
            Exp::call("f", vec![Exp::ident("y")]),
        ]);
        let (_, analysis) = run(Exp::let_in(decs, body));
        assert!(analysis.diagnostics.is_empty());
        assert_eq!(analysis.result, Some(Type::Void));
    }

    #[test]
    fn test_array_of_arrays_initial_value_by_shape() {
        let decs = vec![
            Dec::type_dec("row", Ty::array("int")),
            Dec::type_dec("ints", Ty::array("int")),
            Dec::type_dec("grid", Ty::array("row")),
            Dec::var("r", None, Exp::array("ints", Exp::int(2), Exp::int(0))),
        ];
        let body = Exp::array("grid", Exp::int(2), Exp::ident("r"));
        let (_, analysis) = run(Exp::let_in(decs, body));
        assert!(analysis.diagnostics.is_empty());

        let words = vec![
            Dec::type_dec("words", Ty::array("string")),
            Dec::var("w", None, Exp::array("words", Exp::int(1), Exp::string(""))),
            Dec::function("f", &[("p", "words")], None, Exp::seq(vec![])),
        ];
        let call = Exp::call("f", vec![Exp::array("words", Exp::int(1), Exp::int(0))]);
        assert_eq!(messages(Exp::let_in(words, call)), vec!["Initial type not matches"]);
    }

    #[test]
    fn test_malformed_record_literal_still_checks_initializers() {
        let point = || Dec::type_dec("point", Ty::record(&[("x", "int"), ("y", "int")]));

        let swapped = Exp::record("point", vec![("y", Exp::ident("ghost")), ("x", Exp::int(2))]);
        assert_eq!(
            messages(Exp::let_in(vec![point()], swapped)),
            vec!["y is not a field or not on the right position of point", "ghost is not defined"]
        );

        let short = Exp::record("point", vec![("x", Exp::ident("ghost"))]);
        assert_eq!(
            messages(Exp::let_in(vec![point()], short)),
            vec!["Wrong number of fields", "ghost is not defined"]
        );

        let not_record = Exp::record("int", vec![("v", Exp::call("nope", vec![]))]);
        assert_eq!(
            messages(not_record),
            vec!["Require a record type", "Function nope undeclared"]
        );

        let two_bad = Exp::record("point", vec![("x", Exp::string("1")), ("y", Exp::ident("ghost"))]);
        assert_eq!(
            messages(Exp::let_in(vec![point()], two_bad)),
            vec!["Field type not match", "ghost is not defined"]
        );
    }

    #[test]
    fn test_let_scopes_end_with_block() {
        let inner = Exp::let_in(vec![Dec::var("x", None, Exp::int(1))], Exp::seq(vec![]));
        let body = Exp::seq(vec![inner, Exp::ident("x")]);
        assert_eq!(messages(body), vec!["x is not defined"]);
    }

    #[test]
    fn test_namespaces_do_not_collide() {
        // a type, a variable and a function all named `x`
        let decs = vec![
            Dec::type_dec("x", Ty::record(&[("x", "int")])),
            Dec::var("x", Some("x"), Exp::record("x", vec![("x", Exp::int(1))])),
            Dec::function("x", &[("x", "x")], Some("int"), Exp::var(Var::field(Var::simple("x"), "x"))),
        ];
        let (_, analysis) = run(Exp::let_in(decs, Exp::call("x", vec![Exp::ident("x")])));
        assert!(analysis.diagnostics.is_empty());
        assert_eq!(analysis.result, Some(Type::Int));
    }

    #[test]
    fn test_checker_runs_at_any_level() {
        let exp = Exp::let_in(
            vec![Dec::function("leaf", &[], Some("int"), Exp::int(0))],
            Exp::call("leaf", vec![]),
        );
        let mut analyzer = SemanticAnalyzer::new();
        let main = analyzer.main_frame();
        let mut ctx = FunctionCtx::new(3, main);
        assert_eq!(analyzer.check_exp(&exp, &mut ctx), Some(Type::Int));

        let ExpKind::Let(let_exp) = &exp.kind else { unreachable!() };
        let Dec::Function(dec) = &let_exp.decs[0] else { unreachable!() };
        let analysis = analyzer.finish(None);
        let info = analysis.frames.function(dec.id.get().unwrap());
        assert!(matches!(info.kind, FunctionKind::User { level: 4, .. }));
    }

    #[test]
    fn test_bind_main_frame() {
        let decs = vec![
            Dec::var("a", None, Exp::int(1)),
            Dec::var("b", None, Exp::string("s")),
        ];
        let (_, analysis) = run(Exp::let_in(decs, Exp::seq(vec![])));

        let mut values = SymbolTable::new();
        values.enter();
        values.push("stale", VarId(99));
        analysis.bind_main_frame(&mut values);
        assert_eq!(values.depth(), 1);
        assert!(values.lookup("stale").is_none());
        let b = *values.lookup("b").unwrap();
        assert_eq!(analysis.frames.var(b).offset, 1);
        assert_eq!(
            analysis.frames.frame(analysis.main_frame).layout,
            Some(vec![Some(Type::Int), Some(Type::String)])
        );
    }
}
