//! The method model.
//!
//! Every method reaches the checker through the same uniform path: a
//! [`MethodTemplate`] (the generic factory) specialized at a tuple of type
//! arguments -- the empty tuple for non-generic methods. Specializing a
//! template eagerly computes the signature and allocates a
//! [`MethodInstance`]; for user methods the body goes in as an explicit
//! `Pending` entry and is checked later from a worklist. A pending body
//! carries only the owning type, the resolved method, and the two generic
//! argument tuples -- nothing else may enter it, which is what keeps
//! mutually recursive bodies from chasing each other: a self-reference
//! finds a `Resolving` entry whose signature is already known, and a
//! signature is all a call needs.

use std::rc::Rc;

use snuggle_ir::{CallKind, FieldRef, Instruction, MethodRef, RawOp};
use snuggle_resolver::ResolvedMethod;

use crate::error::TypeErrorKind;
use crate::ty::TypeId;
use crate::typed::{Constant, TypedBody};

/// A stable index into the checker's method-instance arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId(pub u32);

/// One named member slot of a type: the factory producing specializations.
#[derive(Debug, Clone)]
pub struct MethodTemplate {
    pub name: String,
    /// Zero-based index among same-named members, in source order; feeds the
    /// `name`, `name$1`, ... runtime names.
    pub disambig: u32,
    pub is_static: bool,
    pub type_param_count: usize,
    pub source: MethodSource,
}

/// Where a template's specializations come from.
#[derive(Debug, Clone)]
pub enum MethodSource {
    /// A user-written method; body checked lazily.
    Snuggle(Rc<ResolvedMethod>),
    /// A compiler-provided method with a fixed signature.
    Builtin(BuiltinSig),
    /// A compiler-provided method whose signature depends on its type
    /// arguments (e.g. `Option.some::<T>`).
    GenericBuiltin {
        /// Build the concrete signature at the given method type arguments.
        make: MakeBuiltinFn,
        /// Infer the type arguments from value-argument types, or `None` if
        /// the caller must write them explicitly.
        infer: fn(&[TypeId]) -> Option<Vec<TypeId>>,
    },
}

/// `fn(ctx, owner, method_args) -> sig`, kept as a named alias because it
/// appears in template tables. The caller attaches span and file.
pub type MakeBuiltinFn =
    fn(&mut crate::check::TypeCtx<'_>, TypeId, &[TypeId]) -> Result<BuiltinSig, TypeErrorKind>;

/// A concrete builtin method signature plus its behavior.
#[derive(Debug, Clone)]
pub struct BuiltinSig {
    /// Parameter types, excluding the receiver.
    pub params: Vec<TypeId>,
    pub ret: TypeId,
    pub body: BuiltinBody,
}

/// What a builtin method does.
#[derive(Debug, Clone)]
pub enum BuiltinBody {
    /// Inline an instruction sequence at every call site.
    Bytecode {
        data: EmitData,
        emit: fn(&EmitData, &mut Vec<Instruction>),
    },
    /// Fold at compile time. `None` means the fold does not apply (e.g.
    /// division by a zero literal) and the caller falls back to runtime
    /// arithmetic on a concrete width.
    Const {
        fold: fn(&[Constant]) -> Option<Constant>,
    },
    /// An abstract interface slot (func types).
    Interface,
}

/// Owned context for a bytecode method's emission function.
#[derive(Debug, Clone)]
pub enum EmitData {
    /// Plain raw ops.
    Raw(Vec<RawOp>),
    /// Invoke a host method; in singleton mode the receiver is loaded from
    /// the well-known static instance field first.
    HostCall {
        kind: CallKind,
        method: MethodRef,
        singleton: Option<FieldRef>,
    },
    /// The arguments already are the result (Option.some, enum index).
    Identity,
}

/// One specialized method: signature always present, body by state.
#[derive(Debug)]
pub struct MethodInstance {
    pub owner: TypeId,
    pub name: String,
    /// Disambiguated (and for constructors, host-renamed) runtime name,
    /// with mangled type arguments appended for generic specializations.
    pub runtime_name: String,
    pub is_static: bool,
    /// Parameter types, excluding the receiver.
    pub params: Vec<TypeId>,
    pub ret: TypeId,
    pub kind: MethodKind,
}

#[derive(Debug)]
pub enum MethodKind {
    Snuggle { body: BodyState },
    Bytecode {
        data: EmitData,
        emit: fn(&EmitData, &mut Vec<Instruction>),
    },
    /// Compile-time only; reaching the lowerer is a compiler bug.
    Const {
        fold: fn(&[Constant]) -> Option<Constant>,
    },
    Interface,
}

/// The explicit lazy-body state machine.
#[derive(Debug)]
pub enum BodyState {
    Pending(PendingBody),
    /// Signature known, body being checked right now. Calls into a
    /// `Resolving` method are fine; re-entering its *body* is a bug.
    Resolving,
    Resolved(TypedBody),
}

/// Everything a deferred body check is allowed to capture.
#[derive(Debug)]
pub struct PendingBody {
    pub method: Rc<ResolvedMethod>,
    /// The owning type's generic arguments.
    pub type_args: Vec<TypeId>,
    /// The method's own generic arguments.
    pub method_args: Vec<TypeId>,
}
