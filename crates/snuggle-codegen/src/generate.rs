//! The generated-type calculator: which class files the writer must emit,
//! with leaf-expanded fields, plural-return channels, and lowered bodies.

use rustc_hash::{FxHashMap, FxHashSet};
use snuggle_ir::{
    names, CallKind, FieldRef, GeneratedClass, GeneratedField, GeneratedFuncImpl,
    GeneratedFuncType, GeneratedMethod, GeneratedType, GeneratedValueType, Instruction, MethodBody,
    MethodRef,
};
use snuggle_typeck::method::{BodyState, MethodKind};
use snuggle_typeck::{MethodId, TypeCtx, TypeId, TypeKind};

use crate::error::LowerError;
use crate::layout::layout;

/// The target-VM descriptor of a method: value-type receivers ride as
/// leading parameters, every parameter is leaf-expanded, and a plural
/// return surfaces as its first leaf (the rest travel through channels).
pub fn method_descriptor(ctx: &TypeCtx<'_>, mid: MethodId) -> String {
    let m = ctx.method(mid);
    let mut out = String::from("(");
    if !m.is_static && ctx.def(m.owner).is_plural() {
        for d in ctx.descriptor_list(m.owner) {
            out.push_str(&d);
        }
    }
    for p in &m.params {
        for d in ctx.descriptor_list(*p) {
            out.push_str(&d);
        }
    }
    out.push(')');
    match ctx.descriptor_list(m.ret).first() {
        Some(d) => out.push_str(d),
        None => out.push('V'),
    }
    out
}

/// Descriptor of a func interface's `invoke` slot.
fn func_invoke_descriptor(ctx: &TypeCtx<'_>, func_ty: TypeId) -> String {
    let args = &ctx.def(func_ty).args;
    let (params, ret) = args.split_at(args.len() - 1);
    let mut out = String::from("(");
    for p in params {
        for d in ctx.descriptor_list(*p) {
            out.push_str(&d);
        }
    }
    out.push(')');
    match ctx.descriptor_list(ret[0]).first() {
        Some(d) => out.push_str(d),
        None => out.push('V'),
    }
    out
}

/// Descriptor of a func impl's constructor: one parameter per capture leaf.
pub fn ctor_descriptor(ctx: &TypeCtx<'_>, impl_ty: TypeId) -> String {
    let mut out = String::from("(");
    for field in ctx.instance_fields(impl_ty) {
        for d in ctx.descriptor_list(field.ty) {
            out.push_str(&d);
        }
    }
    out.push_str(")V");
    out
}

/// Leaf-expand one source field into generated fields.
fn expand_field(
    ctx: &TypeCtx<'_>,
    name: &str,
    ty: TypeId,
    runtime_static: bool,
) -> Vec<GeneratedField> {
    layout(ctx, ty)
        .iter()
        .map(|leaf| GeneratedField {
            runtime_name: leaf.runtime_name_under(name),
            descriptor: leaf.descriptor.clone(),
            runtime_static,
        })
        .collect()
}

/// Build every generated type from the checker's arena and the lowered
/// method bodies.
pub fn generate_types(
    ctx: &TypeCtx<'_>,
    mut bodies: FxHashMap<u32, Vec<Instruction>>,
) -> Result<Vec<GeneratedType>, LowerError> {
    // Which methods each type owns.
    let mut owned: FxHashMap<u32, Vec<MethodId>> = FxHashMap::default();
    // Which plural types need return channels: any multi-leaf plural that
    // some method returns.
    let mut channel_types: FxHashSet<u32> = FxHashSet::default();
    for i in 0..ctx.methods.len() {
        let mid = MethodId(i as u32);
        let m = ctx.method(mid);
        owned.entry(m.owner.0).or_default().push(mid);
        if ctx.def(m.ret).is_plural() && layout(ctx, m.ret).len() > 1 {
            channel_types.insert(m.ret.0);
        }
    }

    let mut types = Vec::new();
    for i in 0..ctx.types.len() {
        let ty = TypeId(i as u32);
        let def = ctx.def(ty);
        match def.kind {
            TypeKind::Class => {
                types.push(GeneratedType::Class(generate_class(ctx, ty, &owned, &mut bodies)));
            }
            TypeKind::Struct | TypeKind::Enum => {
                types.push(GeneratedType::ValueType(generate_value_type(
                    ctx, ty, &owned, &mut bodies,
                )));
            }
            TypeKind::Tuple => {
                // Tuples generate a class only when they carry channels.
                if channel_types.contains(&ty.0) {
                    types.push(GeneratedType::ValueType(generate_value_type(
                        ctx, ty, &owned, &mut bodies,
                    )));
                }
            }
            TypeKind::Func => {
                types.push(GeneratedType::FuncType(GeneratedFuncType {
                    runtime_name: def.runtime_name.clone(),
                    methods: vec![GeneratedMethod {
                        runtime_name: "invoke".to_string(),
                        descriptor: func_invoke_descriptor(ctx, ty),
                        is_static: false,
                        body: MethodBody::Interface,
                    }],
                }));
            }
            TypeKind::FuncImpl => {
                types.push(GeneratedType::FuncImpl(generate_func_impl(
                    ctx, ty, &owned, &mut bodies,
                )));
            }
            TypeKind::Builtin(_) | TypeKind::Option | TypeKind::Reflected(_) => {}
        }
    }
    Ok(types)
}

/// Generated methods of one owner: lowered user bodies only; bytecode
/// builtins inline at call sites and const methods fold away.
fn generated_methods(
    ctx: &TypeCtx<'_>,
    ty: TypeId,
    owned: &FxHashMap<u32, Vec<MethodId>>,
    bodies: &mut FxHashMap<u32, Vec<Instruction>>,
    force_static: bool,
) -> Vec<GeneratedMethod> {
    let Some(mids) = owned.get(&ty.0) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for &mid in mids {
        let m = ctx.method(mid);
        let MethodKind::Snuggle { body: BodyState::Resolved(_) } = &m.kind else {
            continue;
        };
        let Some(code) = bodies.remove(&mid.0) else { continue };
        out.push(GeneratedMethod {
            runtime_name: m.runtime_name.clone(),
            descriptor: method_descriptor(ctx, mid),
            is_static: force_static || m.is_static,
            body: MethodBody::Snuggle(code),
        });
    }
    out
}

fn generate_class(
    ctx: &TypeCtx<'_>,
    ty: TypeId,
    owned: &FxHashMap<u32, Vec<MethodId>>,
    bodies: &mut FxHashMap<u32, Vec<Instruction>>,
) -> GeneratedClass {
    let def = ctx.def(ty);
    let supertype = ctx
        .supertype(ty)
        .map(|s| ctx.def(s).runtime_name.clone())
        .unwrap_or_else(|| "java/lang/Object".to_string());
    let mut fields = Vec::new();
    for field in ctx.fields(ty) {
        fields.extend(expand_field(ctx, &field.name, field.ty, field.is_static));
    }
    GeneratedClass {
        runtime_name: def.runtime_name.clone(),
        supertype,
        fields,
        methods: generated_methods(ctx, ty, owned, bodies, false),
    }
}

fn generate_value_type(
    ctx: &TypeCtx<'_>,
    ty: TypeId,
    owned: &FxHashMap<u32, Vec<MethodId>>,
    bodies: &mut FxHashMap<u32, Vec<Instruction>>,
) -> GeneratedValueType {
    let def = ctx.def(ty);

    // Enum variants are compile-time constants, not runtime statics.
    let mut static_fields = Vec::new();
    for field in ctx.fields(ty) {
        if field.is_static && field.const_index.is_none() {
            static_fields.extend(expand_field(ctx, &field.name, field.ty, true));
        }
    }

    let leaves = layout(ctx, ty);
    let returning_fields = if leaves.len() > 1 {
        leaves[1..]
            .iter()
            .map(|leaf| GeneratedField {
                runtime_name: names::return_channel_name(&leaf.path_name()),
                descriptor: leaf.descriptor.clone(),
                runtime_static: true,
            })
            .collect()
    } else {
        Vec::new()
    };

    GeneratedValueType {
        runtime_name: def.runtime_name.clone(),
        supertype: "java/lang/Object".to_string(),
        static_fields,
        returning_fields,
        // Value-type methods take their receiver as leading parameters, so
        // every emitted method is static at the VM level.
        methods: generated_methods(ctx, ty, owned, bodies, true),
    }
}

fn generate_func_impl(
    ctx: &TypeCtx<'_>,
    ty: TypeId,
    owned: &FxHashMap<u32, Vec<MethodId>>,
    bodies: &mut FxHashMap<u32, Vec<Instruction>>,
) -> GeneratedFuncImpl {
    let def = ctx.def(ty);
    let iface = ctx
        .supertype(ty)
        .map(|s| ctx.def(s).runtime_name.clone())
        .unwrap_or_else(|| "java/lang/Object".to_string());

    let mut fields = Vec::new();
    for field in ctx.fields(ty) {
        fields.extend(expand_field(ctx, &field.name, field.ty, false));
    }

    let mut methods = generated_methods(ctx, ty, owned, bodies, false);
    methods.push(synthesize_impl_ctor(ctx, ty, &def.runtime_name));

    GeneratedFuncImpl {
        runtime_name: def.runtime_name.clone(),
        iface,
        fields,
        methods,
    }
}

/// The synthesized constructor of a func impl: call the object
/// constructor, then move every capture leaf from its parameter slot into
/// its field.
fn synthesize_impl_ctor(ctx: &TypeCtx<'_>, ty: TypeId, runtime_name: &str) -> GeneratedMethod {
    let mut code = vec![
        Instruction::LoadRefType(0),
        Instruction::MethodCall {
            kind: CallKind::Special,
            method: MethodRef {
                owner: "java/lang/Object".to_string(),
                name: names::CTOR_NAME.to_string(),
                descriptor: "()V".to_string(),
            },
        },
    ];
    let mut slot = 1u32;
    for field in ctx.instance_fields(ty) {
        for leaf in layout(ctx, field.ty) {
            code.push(Instruction::LoadRefType(0));
            code.push(Instruction::LoadLocal {
                index: slot,
                kind: leaf.kind,
            });
            code.push(Instruction::PutReferenceTypeField(FieldRef {
                owner: runtime_name.to_string(),
                name: leaf.runtime_name_under(&field.name),
                descriptor: leaf.descriptor.clone(),
            }));
            slot += leaf.kind.slots();
        }
    }
    code.push(Instruction::Return(None));
    GeneratedMethod {
        runtime_name: names::CTOR_NAME.to_string(),
        descriptor: ctor_descriptor(ctx, ty),
        is_static: false,
        body: MethodBody::Custom(code),
    }
}
