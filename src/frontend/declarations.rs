//! Let-block declarations
//!
//! Declarations are processed in maximal runs of one kind. A run of types
//! or functions is handled in two passes: every header is bound first so
//! the bodies can refer to each other, then each body is checked. A run of
//! variables is processed one declaration at a time, so an initializer only
//! sees the variables declared before it.
//!
//! Named types resolve lazily. A record or array met again while its own
//! declaration is being resolved gets a placeholder that is completed once
//! the declaration finishes; a cycle made only of aliases is an error.

use std::collections::HashSet;

use super::semantic::{FunctionCtx, SemanticAnalyzer, TypeSlot, TypeSlotId};
use crate::frontend::ast::{DeclKind, Dec, ExpKind, FunctionDec, Ident, Ty, TypeDec, VarDec};
use crate::middle::frame::{FunctionInfo, FunctionKind, SlotKind, VarId};
use crate::types::{FrameId, FunctionSig, RecordField, Type};
use crate::utils::Error;

/// Maximal run of consecutive declarations of one kind
#[derive(Debug, Clone, Copy)]
pub struct DeclGroup<'a> {
    pub kind: DeclKind,
    pub decs: &'a [Dec],
}

/// Split a declaration list into its runs
pub fn decl_groups(decs: &[Dec]) -> Vec<DeclGroup<'_>> {
    let mut groups = Vec::new();
    let mut start = 0;
    for end in 1..=decs.len() {
        if end == decs.len() || decs[end].kind() != decs[start].kind() {
            groups.push(DeclGroup { kind: decs[start].kind(), decs: &decs[start..end] });
            start = end;
        }
    }
    groups
}

/// What a header pass bound for one declaration
#[derive(Debug)]
enum Header<'a> {
    Type(TypeSlotId),
    Function {
        dec: &'a FunctionDec,
        level: usize,
        frame: FrameId,
        params: Vec<VarId>,
        ret: Option<Type>,
    },
}

impl<'a> SemanticAnalyzer<'a> {
    /// Check the declarations of a let block; false if any of them failed
    pub(crate) fn check_decs(&mut self, decs: &'a [Dec], ctx: &mut FunctionCtx) -> bool {
        let mut valid = true;
        for group in decl_groups(decs) {
            log::trace!("{:?} group of {} declaration(s)", group.kind, group.decs.len());
            if group.kind == DeclKind::Var {
                valid &= self.check_var_group(group, ctx);
                continue;
            }

            for header in self.resolve_headers(group, ctx) {
                valid &= match header {
                    Some(header) => self.check_body(header),
                    None => false,
                };
            }
        }
        valid
    }

    /// Bind the headers of a type or function run. A name repeated inside
    /// the run is reported once and its declaration is dropped.
    fn resolve_headers(&mut self, group: DeclGroup<'a>, ctx: &FunctionCtx) -> Vec<Option<Header<'a>>> {
        let mut seen = HashSet::new();
        group
            .decs
            .iter()
            .map(|dec| {
                let name = dec.name();
                if !seen.insert(name.name.as_str()) {
                    self.diagnostics.report::<()>(
                        Error::DuplicateDefinition { name: name.name.clone() },
                        name.loc,
                    );
                    return None;
                }
                match dec {
                    Dec::Type(type_dec) => Some(Header::Type(self.declare_type(type_dec))),
                    Dec::Function(function) => Some(self.declare_function(function, ctx)),
                    Dec::Var(_) => None,
                }
            })
            .collect()
    }

    fn check_body(&mut self, header: Header<'a>) -> bool {
        match header {
            Header::Type(slot) => self.resolve_slot(slot, &mut Vec::new()).is_some(),
            Header::Function { dec, level, frame, params, ret } => {
                self.check_function_body(dec, FunctionCtx::new(level, frame), &params, ret)
            }
        }
    }

    // ==================== Types ====================

    fn declare_type(&mut self, dec: &'a TypeDec) -> TypeSlotId {
        let slot = TypeSlotId(self.type_slots.len());
        self.type_slots.push(TypeSlot::Pending(dec));
        self.type_names.push(&dec.name.name, slot);
        slot
    }

    /// Resolve a type name in the current scope
    pub(crate) fn type_of(&mut self, name: &Ident) -> Option<Type> {
        self.type_of_in(name, &mut Vec::new())
    }

    fn type_of_in(&mut self, name: &Ident, parents: &mut Vec<TypeSlotId>) -> Option<Type> {
        match self.type_names.lookup(&name.name) {
            Some(&slot) => self.resolve_slot(slot, parents),
            None => self.report(Error::UndefinedType { name: name.name.clone() }, name.loc),
        }
    }

    /// Resolve a named type; `parents` holds the declarations being
    /// resolved further up the current chain
    fn resolve_slot(&mut self, slot: TypeSlotId, parents: &mut Vec<TypeSlotId>) -> Option<Type> {
        let dec = match self.type_slots[slot.0] {
            TypeSlot::Resolved(ty) => return Some(ty),
            TypeSlot::Poisoned => return None,
            TypeSlot::Pending(dec) => dec,
        };
        let name = dec.name.name.as_str();

        if let Some(pos) = parents.iter().position(|&parent| parent == slot) {
            return match dec.ty {
                // an alias cycle is legal only when it passes through a record or array
                Ty::Name(_) => match self.first_constructed(&parents[pos + 1..]) {
                    Some((target, target_dec)) => Some(self.placeholder(target, target_dec)),
                    None => self.report(Error::EndlessTypeLoop { name: name.to_string() }, dec.name.loc),
                },
                Ty::Record(_) | Ty::Array(_) => Some(self.placeholder(slot, dec)),
            };
        }

        parents.push(slot);
        let resolved = match &dec.ty {
            Ty::Name(target) => self.type_of_in(target, parents),
            Ty::Record(fields) => {
                let mut resolved = Vec::with_capacity(fields.len());
                let mut complete = true;
                for field in fields {
                    match self.type_of_in(&field.type_name, parents) {
                        Some(ty) => resolved.push(RecordField { name: field.name.name.clone(), ty }),
                        None => complete = false,
                    }
                }
                complete.then(|| match self.placeholders.get(&slot) {
                    Some(&Type::Record(id)) => {
                        self.types.set_record_fields(id, resolved);
                        Type::Record(id)
                    }
                    _ => self.types.new_record(name, resolved),
                })
            }
            Ty::Array(element) => self.type_of_in(element, parents).map(|element| {
                match self.placeholders.get(&slot) {
                    Some(&Type::Array(id)) => {
                        self.types.set_array_element(id, element);
                        Type::Array(id)
                    }
                    _ => self.types.new_array(name, Some(element)),
                }
            }),
        };
        parents.pop();

        if let Some(ty) = resolved {
            log::trace!("type {} resolved to {}", name, self.types.display(ty));
        }
        self.type_slots[slot.0] = match resolved {
            Some(ty) => TypeSlot::Resolved(ty),
            None => TypeSlot::Poisoned,
        };
        resolved
    }

    /// First record or array declaration along an alias chain
    fn first_constructed(&self, chain: &[TypeSlotId]) -> Option<(TypeSlotId, &'a TypeDec)> {
        chain.iter().find_map(|&slot| match self.type_slots[slot.0] {
            TypeSlot::Pending(dec) if !matches!(dec.ty, Ty::Name(_)) => Some((slot, dec)),
            _ => None,
        })
    }

    /// Type handed out for a record or array still being resolved
    fn placeholder(&mut self, slot: TypeSlotId, dec: &TypeDec) -> Type {
        if let Some(&ty) = self.placeholders.get(&slot) {
            return ty;
        }
        let ty = match dec.ty {
            Ty::Array(_) => self.types.new_array(&dec.name.name, None),
            _ => self.types.new_record(&dec.name.name, Vec::new()),
        };
        self.placeholders.insert(slot, ty);
        ty
    }

    // ==================== Functions ====================

    /// Allocate the frame and prototype of a function and bind its name
    fn declare_function(&mut self, dec: &'a FunctionDec, ctx: &FunctionCtx) -> Header<'a> {
        let level = ctx.level + 1;
        let frame = self
            .frames
            .new_frame(&format!("{}Frame", dec.name.name), level, Some(ctx.frame));
        let link = Type::Frame(ctx.frame);
        let static_link = self.frames.alloc(frame, "staticLink", Some(link), SlotKind::StaticLink);

        let mut param_types = vec![link];
        let mut params = Vec::with_capacity(dec.params.len());
        let mut complete = true;
        for param in &dec.params {
            let ty = self.type_of(&param.type_name);
            match ty {
                Some(ty) => param_types.push(ty),
                None => complete = false,
            }
            params.push(self.frames.alloc(frame, &param.name.name, ty, SlotKind::Param));
        }

        let ret = match &dec.result {
            Some(result) => self.type_of(result),
            None => Some(Type::Void),
        };
        let sig = match ret {
            Some(ret) if complete => Some(FunctionSig { params: param_types, ret }),
            _ => None,
        };
        let ret = sig.as_ref().map(|sig| sig.ret);

        let id = self.frames.add_function(FunctionInfo {
            name: dec.name.name.clone(),
            sig,
            kind: FunctionKind::User { level, frame, static_link, params: params.clone() },
        });
        dec.id.set(Some(id));
        self.functions.push(&dec.name.name, id);
        log::debug!("declared function {} at level {}", dec.name.name, level);
        Header::Function { dec, level, frame, params, ret }
    }

    /// Check a body in its own traversal context; loops around the
    /// declaration do not reach into it
    fn check_function_body(
        &mut self,
        dec: &'a FunctionDec,
        mut inner: FunctionCtx,
        params: &[VarId],
        ret: Option<Type>,
    ) -> bool {
        self.values.enter();
        for (param, &slot) in dec.params.iter().zip(params) {
            self.values.push(&param.name.name, slot);
        }
        let body = self.check_exp(&dec.body, &mut inner);
        self.values.exit();
        self.frames.finalize(inner.frame);

        let (Some(ret), Some(body)) = (ret, body) else {
            return false;
        };
        if ret.is_void() {
            if !body.is_void() {
                self.report(Error::ProcedureReturnsValue, dec.body.loc);
                return false;
            }
        } else if !self.types.same_type(ret, body) {
            self.report(Error::ReturnTypeMismatch, dec.body.loc);
            return false;
        }
        true
    }

    // ==================== Variables ====================

    /// Check a run of variables in order. A name already bound by this run
    /// is reported and the repeated declaration is skipped; a binding from
    /// an earlier run of the same block is shadowed.
    fn check_var_group(&mut self, group: DeclGroup<'a>, ctx: &mut FunctionCtx) -> bool {
        let first = self.frames.var_count();
        let mut valid = true;
        for dec in group.decs {
            let Dec::Var(var) = dec else { continue };
            let bound_here = self
                .values
                .lookup_local(&var.name.name)
                .is_some_and(|slot| slot.0 >= first);
            if bound_here {
                self.diagnostics.report::<()>(
                    Error::DuplicateDefinition { name: var.name.name.clone() },
                    var.name.loc,
                );
                valid = false;
                continue;
            }
            valid &= self.check_var_dec(var, ctx);
        }
        valid
    }

    /// Check the initializer, then bind the variable. The variable gets a
    /// slot even when the declaration is wrong.
    fn check_var_dec(&mut self, dec: &'a VarDec, ctx: &mut FunctionCtx) -> bool {
        let init = self.check_exp(&dec.init, ctx);
        let mut valid = init.is_some();

        let ty = match &dec.type_name {
            None => match init {
                Some(Type::Nil) => {
                    valid = false;
                    self.report(Error::NilWithoutRecordType, dec.init.loc)
                }
                other => other,
            },
            Some(type_name) => {
                let declared = self.type_of(type_name);
                if let (Some(declared), Some(init)) = (declared, init) {
                    let literal = matches!(dec.init.kind, ExpKind::Record(_) | ExpKind::Array(_));
                    if !self.types.is_match(Some(declared), Some(init)) || (literal && declared != init) {
                        self.report(Error::VarTypeMismatch, type_name.loc);
                        valid = false;
                    }
                }
                valid &= declared.is_some();
                declared
            }
        };

        let slot = self.frames.alloc(ctx.frame, &dec.name.name, ty, SlotKind::Local);
        dec.slot.set(Some(slot));
        self.values.push(&dec.name.name, slot);
        valid
    }
}
