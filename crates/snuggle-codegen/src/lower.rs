//! Typed-AST to instruction lowering.
//!
//! The walk threads a *desired-fields* path into every recursive call:
//! expressions that produce plural values emit only the leaves the path
//! selects (all of them when it is empty), and expressions that navigate
//! into plural values push a field name onto the path and recurse without
//! emitting anything themselves. Plural values therefore never exist on the
//! stack as single words -- only their leaves do.

use log::debug;
use rustc_hash::FxHashMap;
use snuggle_common::Span;
use snuggle_ir::{
    names, BasicKind, CallKind, ConstValue, FieldRef, Instruction, LabelId, MethodRef,
};
use snuggle_parser::ast::{FloatWidth, IntWidth};
use snuggle_typeck::method::{BodyState, MethodKind};
use snuggle_typeck::typed::CaptureSource;
use snuggle_typeck::{
    Constant, MethodId, TypeCtx, TypeId, TypedBody, TypedExpr, TypedExprKind, TypedProgram,
};

use crate::error::{LowerError, LowerErrorKind};
use crate::generate::{self, method_descriptor};
use crate::layout::{layout, select, Leaf};

/// Lower a typed program to the instruction IR.
pub fn lower_program(typed: &TypedProgram<'_>) -> Result<snuggle_ir::IrProgram, LowerError> {
    let mut lowerer = Lowerer::new(&typed.ctx);

    // Method bodies first; generated types pick them up by id.
    let mut bodies: FxHashMap<u32, Vec<Instruction>> = FxHashMap::default();
    for i in 0..typed.ctx.methods.len() {
        let mid = MethodId(i as u32);
        let instance = typed.ctx.method(mid);
        if let MethodKind::Snuggle { body: BodyState::Resolved(body) } = &instance.kind {
            let code = lowerer.lower_method_body(mid, body)?;
            bodies.insert(mid.0, code);
        }
    }

    // Per-file top-level blocks.
    let mut files = Vec::new();
    for file in &typed.files {
        debug!("lowering top-level block of `{}`", file.name);
        let code = lowerer.lower_toplevel(&file.name, &file.body)?;
        files.push(snuggle_ir::GeneratedFile {
            name: file.name.clone(),
            body: code,
        });
    }

    let types = generate::generate_types(&typed.ctx, bodies)?;
    Ok(snuggle_ir::IrProgram { types, files })
}

/// Per-compile lowering state: the layout memo and per-body counters.
pub struct Lowerer<'c, 'p> {
    ctx: &'c TypeCtx<'p>,
    layouts: FxHashMap<TypeId, std::rc::Rc<Vec<Leaf>>>,
    /// Runtime name of the class owning the body being lowered; capture
    /// reads resolve against it.
    current_owner: String,
    /// File attributed to lowering errors in the current body.
    current_file: String,
    /// First local slot past the body's own locals; the receiver stash.
    stash_base: u32,
    label_counter: u32,
}

impl<'c, 'p> Lowerer<'c, 'p> {
    pub fn new(ctx: &'c TypeCtx<'p>) -> Self {
        Self {
            ctx,
            layouts: FxHashMap::default(),
            current_owner: String::new(),
            current_file: String::new(),
            stash_base: 0,
            label_counter: 0,
        }
    }

    fn layout_of(&mut self, ty: TypeId) -> std::rc::Rc<Vec<Leaf>> {
        if let Some(l) = self.layouts.get(&ty) {
            return std::rc::Rc::clone(l);
        }
        let l = std::rc::Rc::new(layout(self.ctx, ty));
        self.layouts.insert(ty, std::rc::Rc::clone(&l));
        l
    }

    fn fresh_label(&mut self) -> LabelId {
        let id = LabelId(self.label_counter);
        self.label_counter += 1;
        id
    }

    fn err(&self, kind: LowerErrorKind, span: Span) -> LowerError {
        LowerError::new(kind, span, self.current_file.clone())
    }

    /// Lower one resolved method body, return convention included.
    pub fn lower_method_body(
        &mut self,
        mid: MethodId,
        body: &TypedBody,
    ) -> Result<Vec<Instruction>, LowerError> {
        let instance = self.ctx.method(mid);
        self.current_owner = self.ctx.def(instance.owner).runtime_name.clone();
        self.current_file = self.ctx.origin_file(instance.owner);
        self.stash_base = body.max_locals;
        self.label_counter = 0;

        let ret = instance.ret;
        let mut out = Vec::new();
        self.lower_expr(&body.expr, &[], &mut out)?;
        if !always_returns(&body.expr) {
            let ret_leaves = self.layout_of(ret);
            if ret_leaves.is_empty() {
                // Void return: discard whatever the body left behind.
                self.pop_value(body.expr.ty, &mut out);
                out.push(Instruction::Return(None));
            } else {
                self.emit_return_value(ret, &mut out);
            }
        }
        Ok(out)
    }

    /// Lower a file's top-level block: statements, discard, no return
    /// convention (the writer owns the run-method wrapper).
    pub fn lower_toplevel(
        &mut self,
        file: &str,
        body: &TypedBody,
    ) -> Result<Vec<Instruction>, LowerError> {
        self.current_owner = names::file_class_name(file);
        self.current_file = file.to_string();
        self.stash_base = body.max_locals;
        self.label_counter = 0;

        let mut out = Vec::new();
        self.lower_expr(&body.expr, &[], &mut out)?;
        self.pop_value(body.expr.ty, &mut out);
        out.push(Instruction::Return(None));
        Ok(out)
    }

    /// Pop every leaf of a value off the stack, top first.
    fn pop_value(&mut self, ty: TypeId, out: &mut Vec<Instruction>) {
        let leaves = self.layout_of(ty);
        for leaf in leaves.iter().rev() {
            out.push(Instruction::Pop(leaf.kind));
        }
    }

    /// The plural-return protocol, producer side: everything but the first
    /// leaf goes to the return type's static channels (top of stack first,
    /// so in reverse layout order), then the first leaf returns normally.
    fn emit_return_value(&mut self, ret: TypeId, out: &mut Vec<Instruction>) {
        let leaves = self.layout_of(ret);
        if leaves.is_empty() {
            out.push(Instruction::Return(None));
            return;
        }
        let owner = self.ctx.def(ret).runtime_name.clone();
        for leaf in leaves[1..].iter().rev() {
            out.push(Instruction::PutStaticField(FieldRef {
                owner: owner.clone(),
                name: names::return_channel_name(&leaf.path_name()),
                descriptor: leaf.descriptor.clone(),
            }));
        }
        out.push(Instruction::Return(Some(leaves[0].kind)));
    }

    /// The plural-return protocol, consumer side: after the call, the first
    /// leaf is on the stack and the rest sit in static channels. Keep or
    /// pop the stack leaf and read back only the channels the desired path
    /// selects.
    fn read_call_result(&mut self, ret: TypeId, desired: &[String], out: &mut Vec<Instruction>) {
        let leaves = self.layout_of(ret);
        if leaves.len() <= 1 {
            return;
        }
        let owner = self.ctx.def(ret).runtime_name.clone();
        let wanted = select(&leaves, desired);
        let first_wanted = wanted.iter().any(|l| l.offset == 0);
        if !first_wanted {
            out.push(Instruction::Pop(leaves[0].kind));
        }
        for leaf in wanted.iter().filter(|l| l.offset != 0) {
            out.push(Instruction::GetStaticField(FieldRef {
                owner: owner.clone(),
                name: names::return_channel_name(&leaf.path_name()),
                descriptor: leaf.descriptor.clone(),
            }));
        }
    }

    // ── The expression walk ────────────────────────────────────────────

    fn lower_expr(
        &mut self,
        expr: &TypedExpr,
        desired: &[String],
        out: &mut Vec<Instruction>,
    ) -> Result<(), LowerError> {
        let span = expr.span;
        match &expr.kind {
            TypedExprKind::Import(path) => {
                out.push(Instruction::RunImport(path.clone()));
                Ok(())
            }

            TypedExprKind::Literal(c) => {
                let value = const_value(c);
                let kind = value.kind();
                out.push(Instruction::Push { value, kind });
                Ok(())
            }

            TypedExprKind::Local { index, .. } => {
                if self.ctx.def(expr.ty).is_plural() {
                    let leaves = self.layout_of(expr.ty);
                    for leaf in select(&leaves, desired) {
                        out.push(Instruction::LoadLocal {
                            index: index + leaf.offset,
                            kind: leaf.kind,
                        });
                    }
                } else {
                    out.push(Instruction::LoadLocal {
                        index: *index,
                        kind: self.ctx.basic_kind(expr.ty),
                    });
                }
                Ok(())
            }

            TypedExprKind::Capture { index } => {
                // Captures are fields of the closure object in slot 0.
                let root = format!("cap{index}");
                let leaves = self.layout_of(expr.ty);
                for leaf in select(&leaves, desired) {
                    out.push(Instruction::LoadRefType(0));
                    out.push(Instruction::GetReferenceTypeField(FieldRef {
                        owner: self.current_owner.clone(),
                        name: leaf.runtime_name_under(&root),
                        descriptor: leaf.descriptor.clone(),
                    }));
                }
                Ok(())
            }

            TypedExprKind::StaticField { owner, field } => {
                let fdef = self.ctx.fields(*owner)[*field].clone();
                if let Some(index) = fdef.const_index {
                    out.push(Instruction::Push {
                        value: ConstValue::Int(index),
                        kind: BasicKind::Int,
                    });
                    return Ok(());
                }
                let owner_name = self.ctx.def(*owner).runtime_name.clone();
                let leaves = self.layout_of(fdef.ty);
                for leaf in select(&leaves, desired) {
                    out.push(Instruction::GetStaticField(FieldRef {
                        owner: owner_name.clone(),
                        name: leaf.runtime_name_under(&fdef.name),
                        descriptor: leaf.descriptor.clone(),
                    }));
                }
                Ok(())
            }

            TypedExprKind::Field { receiver, owner, field } => {
                let fdef = self.ctx.fields(*owner)[*field].clone();
                if self.ctx.def(receiver.ty).is_plural() {
                    // Navigation: ask the receiver for just this field.
                    let mut path = Vec::with_capacity(desired.len() + 1);
                    path.push(fdef.name.clone());
                    path.extend(desired.iter().cloned());
                    return self.lower_expr(receiver, &path, out);
                }
                if !self.ctx.def(receiver.ty).is_reference_type() {
                    return Err(self.err(
                        LowerErrorKind::BadFieldReceiver(self.ctx.display(receiver.ty)),
                        span,
                    ));
                }
                let owner_name = self.ctx.def(*owner).runtime_name.clone();
                let leaves = self.layout_of(fdef.ty);
                let wanted = select(&leaves, desired);
                self.lower_expr(receiver, &[], out)?;
                match wanted.len() {
                    0 => out.push(Instruction::Pop(BasicKind::Ref)),
                    1 => out.push(Instruction::GetReferenceTypeField(FieldRef {
                        owner: owner_name,
                        name: wanted[0].runtime_name_under(&fdef.name),
                        descriptor: wanted[0].descriptor.clone(),
                    })),
                    _ => {
                        // Several leaves: stash the receiver past the body's
                        // own locals and reload it per leaf.
                        let stash = self.stash_base;
                        out.push(Instruction::StoreLocal {
                            index: stash,
                            kind: BasicKind::Ref,
                        });
                        for leaf in wanted {
                            out.push(Instruction::LoadRefType(stash));
                            out.push(Instruction::GetReferenceTypeField(FieldRef {
                                owner: owner_name.clone(),
                                name: leaf.runtime_name_under(&fdef.name),
                                descriptor: leaf.descriptor.clone(),
                            }));
                        }
                    }
                }
                Ok(())
            }

            TypedExprKind::Call { call, method, receiver, args } => {
                self.lower_call(*call, *method, receiver.as_deref(), args, desired, span, out)
            }

            TypedExprKind::New { ctor, args } => {
                let instance = self.ctx.method(*ctor);
                let class_name = self.ctx.def(instance.owner).runtime_name.clone();
                out.push(Instruction::NewRefAndDup(class_name.clone()));
                for arg in args {
                    self.lower_expr(arg, &[], out)?;
                }
                out.push(Instruction::MethodCall {
                    kind: CallKind::Special,
                    method: MethodRef {
                        owner: class_name,
                        name: instance.runtime_name.clone(),
                        descriptor: method_descriptor(self.ctx, *ctor),
                    },
                });
                Ok(())
            }

            TypedExprKind::RawStruct { values } => {
                // Only the requested constituent is emitted.
                if let Some((first, rest)) = desired.split_first() {
                    let fields = self.ctx.instance_fields(expr.ty);
                    let Some(idx) = fields.iter().position(|f| f.name == *first) else {
                        return Err(self.err(LowerErrorKind::BadFieldPath(first.clone()), span));
                    };
                    return self.lower_expr(&values[idx], rest, out);
                }
                for value in values {
                    self.lower_expr(value, &[], out)?;
                }
                Ok(())
            }

            TypedExprKind::Lambda { impl_ty, captures } => {
                let impl_name = self.ctx.def(*impl_ty).runtime_name.clone();
                out.push(Instruction::NewRefAndDup(impl_name.clone()));
                for cap in captures {
                    self.lower_capture_source(cap, out);
                }
                out.push(Instruction::MethodCall {
                    kind: CallKind::Special,
                    method: MethodRef {
                        owner: impl_name,
                        name: names::CTOR_NAME.to_string(),
                        descriptor: generate::ctor_descriptor(self.ctx, *impl_ty),
                    },
                });
                Ok(())
            }

            TypedExprKind::Declare { slots, value } => {
                self.lower_expr(value, &[], out)?;
                for slot in slots.iter().rev() {
                    let leaves = self.layout_of(slot.ty);
                    for leaf in leaves.iter().rev() {
                        out.push(Instruction::StoreLocal {
                            index: slot.index + leaf.offset,
                            kind: leaf.kind,
                        });
                    }
                }
                Ok(())
            }

            TypedExprKind::Assign { lhs, rhs } => self.lower_assignment(lhs, rhs, span, out),

            TypedExprKind::Return(value) => {
                match value {
                    Some(v) => {
                        self.lower_expr(v, &[], out)?;
                        self.emit_return_value(v.ty, out);
                    }
                    None => out.push(Instruction::Return(None)),
                }
                Ok(())
            }

            TypedExprKind::If { cond, then, els } => {
                self.lower_expr(cond, &[], out)?;
                match els {
                    None => {
                        let end = self.fresh_label();
                        out.push(Instruction::JumpIfFalse(end));
                        self.lower_expr(then, &[], out)?;
                        self.pop_value(then.ty, out);
                        out.push(Instruction::Label(end));
                    }
                    Some(els) => {
                        let else_label = self.fresh_label();
                        let end = self.fresh_label();
                        out.push(Instruction::JumpIfFalse(else_label));
                        self.lower_expr(then, desired, out)?;
                        out.push(Instruction::Jump(end));
                        out.push(Instruction::Label(else_label));
                        self.lower_expr(els, desired, out)?;
                        out.push(Instruction::Label(end));
                    }
                }
                Ok(())
            }

            TypedExprKind::While { cond, body } => {
                let start = self.fresh_label();
                let end = self.fresh_label();
                out.push(Instruction::Label(start));
                self.lower_expr(cond, &[], out)?;
                out.push(Instruction::JumpIfFalse(end));
                self.lower_expr(body, &[], out)?;
                self.pop_value(body.ty, out);
                out.push(Instruction::Jump(start));
                out.push(Instruction::Label(end));
                Ok(())
            }

            TypedExprKind::Block(exprs) => {
                let mut inner = Vec::new();
                for (i, e) in exprs.iter().enumerate() {
                    if i + 1 == exprs.len() {
                        self.lower_expr(e, desired, &mut inner)?;
                    } else {
                        self.lower_expr(e, &[], &mut inner)?;
                        self.pop_value(e.ty, &mut inner);
                    }
                }
                out.push(Instruction::CodeBlock(inner));
                Ok(())
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn lower_call(
        &mut self,
        call: CallKind,
        method: MethodId,
        receiver: Option<&TypedExpr>,
        args: &[TypedExpr],
        desired: &[String],
        span: Span,
        out: &mut Vec<Instruction>,
    ) -> Result<(), LowerError> {
        let instance = self.ctx.method(method);
        match &instance.kind {
            MethodKind::Const { .. } => Err(self.err(
                LowerErrorKind::ConstMethodSurvived(instance.runtime_name.clone()),
                span,
            )),
            MethodKind::Bytecode { data, emit } => {
                // Builtins inline: pre-body, receiver, arguments, body.
                snuggle_typeck::builtins::emit_prelude(data, out);
                if let Some(r) = receiver {
                    self.lower_expr(r, &[], out)?;
                }
                for arg in args {
                    self.lower_expr(arg, &[], out)?;
                }
                emit(data, out);
                Ok(())
            }
            MethodKind::Snuggle { .. } | MethodKind::Interface => {
                let ret = instance.ret;
                let owner = self.ctx.def(instance.owner).runtime_name.clone();
                let name = instance.runtime_name.clone();
                if let Some(r) = receiver {
                    self.lower_expr(r, &[], out)?;
                }
                for arg in args {
                    self.lower_expr(arg, &[], out)?;
                }
                out.push(Instruction::MethodCall {
                    kind: call,
                    method: MethodRef {
                        owner,
                        name,
                        descriptor: method_descriptor(self.ctx, method),
                    },
                });
                self.read_call_result(ret, desired, out);
                Ok(())
            }
        }
    }

    /// Push a capture's current value (all leaves) for closure construction.
    fn lower_capture_source(&mut self, cap: &CaptureSource, out: &mut Vec<Instruction>) {
        match cap {
            CaptureSource::Local { index, ty } => {
                let leaves = self.layout_of(*ty);
                for leaf in leaves.iter() {
                    out.push(Instruction::LoadLocal {
                        index: index + leaf.offset,
                        kind: leaf.kind,
                    });
                }
            }
            CaptureSource::Capture { index, ty } => {
                let root = format!("cap{index}");
                let leaves = self.layout_of(*ty);
                for leaf in leaves.iter() {
                    out.push(Instruction::LoadRefType(0));
                    out.push(Instruction::GetReferenceTypeField(FieldRef {
                        owner: self.current_owner.clone(),
                        name: leaf.runtime_name_under(&root),
                        descriptor: leaf.descriptor.clone(),
                    }));
                }
            }
        }
    }

    /// Assignments mirror reads: push the RHS leaves, then store each one.
    fn lower_assignment(
        &mut self,
        lhs: &TypedExpr,
        rhs: &TypedExpr,
        span: Span,
        out: &mut Vec<Instruction>,
    ) -> Result<(), LowerError> {
        let mut path = Vec::new();
        let base = self.assign_base(lhs, &mut path, span)?;

        match base {
            AssignBase::Local { index, root_ty } => {
                self.lower_expr(rhs, &[], out)?;
                let leaves = self.layout_of(root_ty);
                let wanted: Vec<Leaf> = select(&leaves, &path).into_iter().cloned().collect();
                for leaf in wanted.iter().rev() {
                    out.push(Instruction::StoreLocal {
                        index: index + leaf.offset,
                        kind: leaf.kind,
                    });
                }
            }
            AssignBase::Static { owner, field } => {
                let fdef = self.ctx.fields(owner)[field].clone();
                let owner_name = self.ctx.def(owner).runtime_name.clone();
                self.lower_expr(rhs, &[], out)?;
                let leaves = self.layout_of(fdef.ty);
                let wanted: Vec<Leaf> = select(&leaves, &path).into_iter().cloned().collect();
                for leaf in wanted.iter().rev() {
                    out.push(Instruction::PutStaticField(FieldRef {
                        owner: owner_name.clone(),
                        name: leaf.runtime_name_under(&fdef.name),
                        descriptor: leaf.descriptor.clone(),
                    }));
                }
            }
            AssignBase::RefField { receiver, owner, field } => {
                let fdef = self.ctx.fields(owner)[field].clone();
                let owner_name = self.ctx.def(owner).runtime_name.clone();
                let stash = self.stash_base;
                self.lower_expr(receiver, &[], out)?;
                out.push(Instruction::StoreLocal {
                    index: stash,
                    kind: BasicKind::Ref,
                });
                self.lower_expr(rhs, &[], out)?;
                let leaves = self.layout_of(fdef.ty);
                let wanted: Vec<Leaf> = select(&leaves, &path).into_iter().cloned().collect();
                for leaf in wanted.iter().rev() {
                    out.push(Instruction::LoadRefType(stash));
                    out.push(Instruction::SwapBasic {
                        top: BasicKind::Ref,
                        second: leaf.kind,
                    });
                    out.push(Instruction::PutReferenceTypeField(FieldRef {
                        owner: owner_name.clone(),
                        name: leaf.runtime_name_under(&fdef.name),
                        descriptor: leaf.descriptor.clone(),
                    }));
                }
            }
        }
        Ok(())
    }

    /// Walk an lvalue's field chain to its storage base, accumulating the
    /// plural path along the way.
    fn assign_base<'e>(
        &self,
        lhs: &'e TypedExpr,
        path: &mut Vec<String>,
        span: Span,
    ) -> Result<AssignBase<'e>, LowerError> {
        match &lhs.kind {
            TypedExprKind::Local { index, .. } => Ok(AssignBase::Local {
                index: *index,
                root_ty: lhs.ty,
            }),
            TypedExprKind::StaticField { owner, field } => Ok(AssignBase::Static {
                owner: *owner,
                field: *field,
            }),
            TypedExprKind::Field { receiver, owner, field } => {
                if self.ctx.def(receiver.ty).is_plural() {
                    let fdef = &self.ctx.fields(*owner)[*field];
                    path.insert(0, fdef.name.clone());
                    return self.assign_base(receiver, path, span);
                }
                if self.ctx.def(receiver.ty).is_reference_type() {
                    return Ok(AssignBase::RefField {
                        receiver,
                        owner: *owner,
                        field: *field,
                    });
                }
                Err(self.err(LowerErrorKind::BadAssignTarget, span))
            }
            _ => Err(self.err(LowerErrorKind::BadAssignTarget, span)),
        }
    }
}

/// The storage behind an assignment target.
enum AssignBase<'e> {
    Local { index: u32, root_ty: TypeId },
    Static { owner: TypeId, field: usize },
    RefField {
        receiver: &'e TypedExpr,
        owner: TypeId,
        field: usize,
    },
}

/// Typed constant to erased IR constant. Unmaterialized int literals default
/// to `i32` at this point.
fn const_value(c: &Constant) -> ConstValue {
    match c {
        Constant::Bool(b) => ConstValue::Bool(*b),
        Constant::IntLit(v) => ConstValue::Int(*v as i32),
        Constant::Int(w, v) => match w {
            IntWidth::I64 => ConstValue::Long(*v),
            _ => ConstValue::Int(*v as i32),
        },
        Constant::Float(w, v) => match w {
            FloatWidth::F32 => ConstValue::Float(*v as f32),
            FloatWidth::F64 => ConstValue::Double(*v),
        },
        Constant::Str(s) => ConstValue::Str(s.clone()),
    }
}

/// Whether an expression unconditionally returns (mirrors the checker's
/// rule, so bodies ending in `return` get no second return instruction).
fn always_returns(e: &TypedExpr) -> bool {
    match &e.kind {
        TypedExprKind::Return(_) => true,
        TypedExprKind::Block(exprs) => exprs.last().is_some_and(always_returns),
        TypedExprKind::If { then, els: Some(els), .. } => {
            always_returns(then) && always_returns(els)
        }
        _ => false,
    }
}
