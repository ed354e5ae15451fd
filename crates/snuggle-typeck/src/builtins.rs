//! Member tables for the builtin type set, and the shared emission function
//! for bytecode method bodies.
//!
//! Builtin methods carry their behavior as a function pointer plus an owned
//! [`EmitData`] context; the checker treats them exactly like user methods
//! until the lowerer inlines them.

use snuggle_ir::{BasicKind, CallKind, Instruction, MethodRef, RawOp};
use snuggle_parser::ast::{FloatWidth, IntWidth};
use snuggle_resolver::BuiltinKind;

use crate::check::TypeCtx;
use crate::error::TypeErrorKind;
use crate::method::{BuiltinBody, BuiltinSig, EmitData, MethodSource, MethodTemplate};
use crate::ty::{TypeId, TypeMembers};
use crate::typed::Constant;

/// The host class builtin operations without a bytecode form dispatch into.
pub const RUNTIME_CLASS: &str = "snuggle/runtime/SnuggleRuntime";

/// The pre-body of a bytecode method: runs before the call's arguments are
/// pushed. Singleton-mode host methods load their receiver here, from the
/// well-known static instance field.
pub fn emit_prelude(data: &EmitData, out: &mut Vec<Instruction>) {
    if let EmitData::HostCall { singleton: Some(field), .. } = data {
        out.push(Instruction::GetStaticField(field.clone()));
    }
}

/// The one emission function every bytecode method shares: interpret the
/// owned context into instructions. Runs after receiver and arguments.
pub fn emit_data(data: &EmitData, out: &mut Vec<Instruction>) {
    match data {
        EmitData::Raw(ops) => out.push(Instruction::Bytecodes {
            cost: ops.len() as u32,
            ops: ops.clone(),
        }),
        EmitData::HostCall { kind, method, .. } => {
            out.push(Instruction::MethodCall {
                kind: *kind,
                method: method.clone(),
            });
        }
        EmitData::Identity => {}
    }
}

// ── Template construction helpers ──────────────────────────────────────

fn bytecode(name: &str, is_static: bool, params: Vec<TypeId>, ret: TypeId, data: EmitData) -> MethodTemplate {
    MethodTemplate {
        name: name.to_string(),
        disambig: 0,
        is_static,
        type_param_count: 0,
        source: MethodSource::Builtin(BuiltinSig {
            params,
            ret,
            body: BuiltinBody::Bytecode { data, emit: emit_data },
        }),
    }
}

fn const_method(name: &str, params: Vec<TypeId>, ret: TypeId, fold: fn(&[Constant]) -> Option<Constant>) -> MethodTemplate {
    MethodTemplate {
        name: name.to_string(),
        disambig: 0,
        is_static: false,
        type_param_count: 0,
        source: MethodSource::Builtin(BuiltinSig {
            params,
            ret,
            body: BuiltinBody::Const { fold },
        }),
    }
}

/// Assign the zero-based disambiguation index to same-named members, in
/// source order.
pub fn assign_disambiguation(methods: &mut [MethodTemplate]) {
    for i in 0..methods.len() {
        let count = methods[..i]
            .iter()
            .filter(|m| m.name == methods[i].name)
            .count();
        methods[i].disambig = count as u32;
    }
}

/// Build the members of one basic builtin type.
pub fn builtin_members(
    ctx: &mut TypeCtx<'_>,
    kind: BuiltinKind,
    self_ty: TypeId,
) -> Result<TypeMembers, TypeErrorKind> {
    let bool_ty = ctx.bool_ty()?;
    let unit = ctx.unit_ty()?;

    let mut methods = match kind {
        BuiltinKind::Bool => vec![
            bytecode("add", false, vec![self_ty], self_ty, EmitData::Raw(vec![RawOp::Ior])),
            bytecode("mul", false, vec![self_ty], self_ty, EmitData::Raw(vec![RawOp::Iand])),
            bytecode(
                "not",
                false,
                Vec::new(),
                self_ty,
                EmitData::Raw(vec![RawOp::Iconst(1), RawOp::Ixor]),
            ),
            bytecode("eq", false, vec![self_ty], bool_ty, EmitData::Raw(vec![RawOp::CmpEq(BasicKind::Int)])),
            bytecode("neq", false, vec![self_ty], bool_ty, EmitData::Raw(vec![RawOp::CmpNe(BasicKind::Int)])),
        ],
        BuiltinKind::Int(width) => numeric_members(self_ty, bool_ty, int_basic_kind(width)),
        BuiltinKind::Float(width) => numeric_members(self_ty, bool_ty, float_basic_kind(width)),
        BuiltinKind::IntLiteral => vec![
            const_method("add", vec![self_ty], self_ty, fold_add),
            const_method("sub", vec![self_ty], self_ty, fold_sub),
            const_method("mul", vec![self_ty], self_ty, fold_mul),
            const_method("div", vec![self_ty], self_ty, fold_div),
            const_method("rem", vec![self_ty], self_ty, fold_rem),
            const_method("neg", Vec::new(), self_ty, fold_neg),
        ],
        BuiltinKind::Object => vec![
            bytecode(
                "new",
                false,
                Vec::new(),
                unit,
                EmitData::HostCall {
                    kind: CallKind::Special,
                    method: MethodRef {
                        owner: "java/lang/Object".to_string(),
                        name: "<init>".to_string(),
                        descriptor: "()V".to_string(),
                    },
                    singleton: None,
                },
            ),
            bytecode("eq", false, vec![self_ty], bool_ty, EmitData::Raw(vec![RawOp::CmpEq(BasicKind::Ref)])),
        ],
        BuiltinKind::Str => {
            let string_desc = "Ljava/lang/String;";
            vec![
                bytecode(
                    "add",
                    false,
                    vec![self_ty],
                    self_ty,
                    runtime_call("concat", &format!("({string_desc}{string_desc}){string_desc}")),
                ),
                bytecode(
                    "eq",
                    false,
                    vec![self_ty],
                    bool_ty,
                    runtime_call("strEq", &format!("({string_desc}{string_desc})Z")),
                ),
            ]
        }
        BuiltinKind::Print => {
            let string_ty = ctx.string_ty()?;
            let i32_ty = ctx.int_ty(IntWidth::I32)?;
            let i64_ty = ctx.int_ty(IntWidth::I64)?;
            let f64_ty = ctx.float_ty(FloatWidth::F64)?;
            vec![
                bytecode("invoke", true, vec![string_ty], unit, runtime_call("print", "(Ljava/lang/String;)V")),
                bytecode("invoke", true, vec![i32_ty], unit, runtime_call("print", "(I)V")),
                bytecode("invoke", true, vec![i64_ty], unit, runtime_call("print", "(J)V")),
                bytecode("invoke", true, vec![f64_ty], unit, runtime_call("print", "(D)V")),
                bytecode("invoke", true, vec![bool_ty], unit, runtime_call("print", "(Z)V")),
            ]
        }
        BuiltinKind::OptionType => vec![
            MethodTemplate {
                name: "some".to_string(),
                disambig: 0,
                is_static: true,
                type_param_count: 1,
                source: MethodSource::GenericBuiltin {
                    make: option_some_sig,
                    infer: |args| args.first().map(|t| vec![*t]),
                },
            },
            MethodTemplate {
                name: "empty".to_string(),
                disambig: 0,
                is_static: true,
                type_param_count: 1,
                source: MethodSource::GenericBuiltin {
                    make: option_empty_sig,
                    infer: |_| None,
                },
            },
        ],
    };

    assign_disambiguation(&mut methods);
    Ok(TypeMembers {
        supertype: None,
        fields: Vec::new(),
        methods,
    })
}

/// Members of an applied `Option<T>`.
pub fn option_members(ctx: &mut TypeCtx<'_>, value_ty: TypeId) -> Result<TypeMembers, TypeErrorKind> {
    let bool_ty = ctx.bool_ty()?;
    let mut methods = vec![
        // Unchecked access: a present option *is* its value reference.
        bytecode("get", false, Vec::new(), value_ty, EmitData::Identity),
        bytecode("has", false, Vec::new(), bool_ty, EmitData::Raw(vec![RawOp::NonNull])),
    ];
    assign_disambiguation(&mut methods);
    Ok(TypeMembers {
        supertype: None,
        fields: Vec::new(),
        methods,
    })
}

fn option_some_sig(
    ctx: &mut TypeCtx<'_>,
    _owner: TypeId,
    margs: &[TypeId],
) -> Result<BuiltinSig, TypeErrorKind> {
    let value_ty = margs[0];
    let opt = ctx.option_of(value_ty)?;
    Ok(BuiltinSig {
        params: vec![value_ty],
        ret: opt,
        body: BuiltinBody::Bytecode { data: EmitData::Identity, emit: emit_data },
    })
}

fn option_empty_sig(
    ctx: &mut TypeCtx<'_>,
    _owner: TypeId,
    margs: &[TypeId],
) -> Result<BuiltinSig, TypeErrorKind> {
    let opt = ctx.option_of(margs[0])?;
    Ok(BuiltinSig {
        params: Vec::new(),
        ret: opt,
        body: BuiltinBody::Bytecode {
            data: EmitData::Raw(vec![RawOp::AconstNull]),
            emit: emit_data,
        },
    })
}

/// Arithmetic and comparison members shared by all numeric widths.
fn numeric_members(self_ty: TypeId, bool_ty: TypeId, kind: BasicKind) -> Vec<MethodTemplate> {
    let bin = |name: &str, op: RawOp| {
        bytecode(name, false, vec![self_ty], self_ty, EmitData::Raw(vec![op]))
    };
    let cmp = |name: &str, op: RawOp| {
        bytecode(name, false, vec![self_ty], bool_ty, EmitData::Raw(vec![op]))
    };
    vec![
        bin("add", arith_op(kind, ArithOp::Add)),
        bin("sub", arith_op(kind, ArithOp::Sub)),
        bin("mul", arith_op(kind, ArithOp::Mul)),
        bin("div", arith_op(kind, ArithOp::Div)),
        bin("rem", arith_op(kind, ArithOp::Rem)),
        bytecode("neg", false, Vec::new(), self_ty, EmitData::Raw(vec![arith_op(kind, ArithOp::Neg)])),
        cmp("eq", RawOp::CmpEq(kind)),
        cmp("neq", RawOp::CmpNe(kind)),
        cmp("lt", RawOp::CmpLt(kind)),
        cmp("le", RawOp::CmpLe(kind)),
        cmp("gt", RawOp::CmpGt(kind)),
        cmp("ge", RawOp::CmpGe(kind)),
    ]
}

enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Neg,
}

fn arith_op(kind: BasicKind, op: ArithOp) -> RawOp {
    match (kind, op) {
        (BasicKind::Int, ArithOp::Add) => RawOp::Iadd,
        (BasicKind::Int, ArithOp::Sub) => RawOp::Isub,
        (BasicKind::Int, ArithOp::Mul) => RawOp::Imul,
        (BasicKind::Int, ArithOp::Div) => RawOp::Idiv,
        (BasicKind::Int, ArithOp::Rem) => RawOp::Irem,
        (BasicKind::Int, ArithOp::Neg) => RawOp::Ineg,
        (BasicKind::Long, ArithOp::Add) => RawOp::Ladd,
        (BasicKind::Long, ArithOp::Sub) => RawOp::Lsub,
        (BasicKind::Long, ArithOp::Mul) => RawOp::Lmul,
        (BasicKind::Long, ArithOp::Div) => RawOp::Ldiv,
        (BasicKind::Long, ArithOp::Rem) => RawOp::Lrem,
        (BasicKind::Long, ArithOp::Neg) => RawOp::Lneg,
        (BasicKind::Float, ArithOp::Add) => RawOp::Fadd,
        (BasicKind::Float, ArithOp::Sub) => RawOp::Fsub,
        (BasicKind::Float, ArithOp::Mul) => RawOp::Fmul,
        (BasicKind::Float, ArithOp::Div) => RawOp::Fdiv,
        (BasicKind::Float, ArithOp::Rem) => RawOp::Frem,
        (BasicKind::Float, ArithOp::Neg) => RawOp::Fneg,
        (BasicKind::Double, ArithOp::Add) => RawOp::Dadd,
        (BasicKind::Double, ArithOp::Sub) => RawOp::Dsub,
        (BasicKind::Double, ArithOp::Mul) => RawOp::Dmul,
        (BasicKind::Double, ArithOp::Div) => RawOp::Ddiv,
        (BasicKind::Double, ArithOp::Rem) => RawOp::Drem,
        (BasicKind::Double, ArithOp::Neg) => RawOp::Dneg,
        (BasicKind::Ref, _) => unreachable!("no arithmetic on references"),
    }
}

/// The stack kind of an int width.
pub fn int_basic_kind(width: IntWidth) -> BasicKind {
    match width {
        IntWidth::I64 => BasicKind::Long,
        _ => BasicKind::Int,
    }
}

/// The stack kind of a float width.
pub fn float_basic_kind(width: FloatWidth) -> BasicKind {
    match width {
        FloatWidth::F32 => BasicKind::Float,
        FloatWidth::F64 => BasicKind::Double,
    }
}

fn runtime_call(name: &str, descriptor: &str) -> EmitData {
    EmitData::HostCall {
        kind: CallKind::Static,
        method: MethodRef {
            owner: RUNTIME_CLASS.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        },
        singleton: None,
    }
}

// ── Int-literal const folding ──────────────────────────────────────────

fn lit_args(args: &[Constant]) -> Option<(i64, Option<i64>)> {
    match args {
        [Constant::IntLit(a)] => Some((*a, None)),
        [Constant::IntLit(a), Constant::IntLit(b)] => Some((*a, Some(*b))),
        _ => None,
    }
}

fn fold_add(args: &[Constant]) -> Option<Constant> {
    let (a, b) = lit_args(args)?;
    a.checked_add(b?).map(Constant::IntLit)
}

fn fold_sub(args: &[Constant]) -> Option<Constant> {
    let (a, b) = lit_args(args)?;
    a.checked_sub(b?).map(Constant::IntLit)
}

fn fold_mul(args: &[Constant]) -> Option<Constant> {
    let (a, b) = lit_args(args)?;
    a.checked_mul(b?).map(Constant::IntLit)
}

fn fold_div(args: &[Constant]) -> Option<Constant> {
    let (a, b) = lit_args(args)?;
    a.checked_div(b?).map(Constant::IntLit)
}

fn fold_rem(args: &[Constant]) -> Option<Constant> {
    let (a, b) = lit_args(args)?;
    a.checked_rem(b?).map(Constant::IntLit)
}

fn fold_neg(args: &[Constant]) -> Option<Constant> {
    let (a, b) = lit_args(args)?;
    debug_assert!(b.is_none());
    a.checked_neg().map(Constant::IntLit)
}
