//! The type checking pass.
//!
//! Specialization is cache-first everywhere: a type is entered into the
//! typing cache *before* its members are computed, so mutually recursive
//! types meet a placeholder instead of recursing forever, and a generic
//! specialized twice at equal argument tuples is the same `TypeId` both
//! times. Method signatures are computed eagerly; method bodies are
//! explicit `Pending` entries drained from a worklist after every
//! signature in the program is known.

use std::mem;
use std::rc::Rc;

use log::{debug, trace};
use rustc_hash::FxHashMap;
use snuggle_common::Span;
use snuggle_ir::{names, BasicKind, CallKind, FieldRef, MethodRef};
use snuggle_parser::ast::{FloatWidth, IntWidth};
use snuggle_resolver::{
    BuiltinKind, DefId, ResolvedExpr, ResolvedExprKind, ResolvedFile, ResolvedMethod,
    ResolvedPattern, ResolvedPatternKind, ResolvedProgram, ResolvedType, ResolvedTypeDef,
    SnuggleTypeDefKind,
};

use crate::builtins;
use crate::error::{TypeError, TypeErrorKind};
use crate::method::{
    BodyState, BuiltinBody, BuiltinSig, MethodId, MethodInstance, MethodKind, MethodSource,
    MethodTemplate, PendingBody,
};
use crate::reflect::ReflectRegistry;
use crate::ty::{FieldDef, SlotsState, TypeDef, TypeId, TypeKey, TypeKind, TypeMembers};
use crate::typed::{
    BindingSlot, CaptureSource, Constant, TypedBody, TypedExpr, TypedExprKind, TypedFile,
};

/// The result of type checking: the arena of specialized types and method
/// instances, plus each file's typed top-level body.
#[derive(Debug)]
pub struct TypedProgram<'a> {
    pub ctx: TypeCtx<'a>,
    pub files: Vec<TypedFile>,
}

/// Check a resolved program against a validated reflect registry.
pub fn check_program<'a>(
    program: &'a ResolvedProgram,
    registry: &'a ReflectRegistry,
) -> Result<TypedProgram<'a>, TypeError> {
    let mut ctx = TypeCtx::new(program, registry);
    let mut files = Vec::new();
    for file in &program.files {
        files.push(ctx.check_file(file)?);
    }
    ctx.check_pending_bodies()?;
    ctx.finalize_layouts()?;
    debug!(
        "typing done: {} types, {} method instances",
        ctx.types.len(),
        ctx.methods.len()
    );
    Ok(TypedProgram { ctx, files })
}

/// Context of the body currently being checked.
#[derive(Debug, Clone)]
struct BodyCtx {
    file: String,
    /// The owning type, when checking a method body; `super` needs it.
    owner: Option<TypeId>,
    /// Declared return type; `None` at file top level, where `return` is
    /// illegal.
    ret: Option<TypeId>,
    type_args: Vec<TypeId>,
    method_args: Vec<TypeId>,
}

/// The checker state: arenas, caches, and the body worklist.
#[derive(Debug)]
pub struct TypeCtx<'a> {
    pub program: &'a ResolvedProgram,
    pub registry: &'a ReflectRegistry,
    pub types: Vec<TypeDef>,
    pub methods: Vec<MethodInstance>,
    /// The typing cache: (constructor, generic arguments) to specialization.
    type_cache: FxHashMap<TypeKey, TypeId>,
    /// (owner, member index, method generic arguments) to instance.
    method_cache: FxHashMap<(TypeId, usize, Vec<TypeId>), MethodId>,
    /// Bodies whose signatures exist but whose bodies are unchecked.
    pending: Vec<MethodId>,
    lambda_counter: u32,
}

impl<'a> TypeCtx<'a> {
    pub fn new(program: &'a ResolvedProgram, registry: &'a ReflectRegistry) -> Self {
        Self {
            program,
            registry,
            types: Vec::new(),
            methods: Vec::new(),
            type_cache: FxHashMap::default(),
            method_cache: FxHashMap::default(),
            pending: Vec::new(),
            lambda_counter: 0,
        }
    }

    // ── Arena access ───────────────────────────────────────────────────

    pub fn def(&self, ty: TypeId) -> &TypeDef {
        &self.types[ty.0 as usize]
    }

    pub fn method(&self, id: MethodId) -> &MethodInstance {
        &self.methods[id.0 as usize]
    }

    /// Display name of a type.
    pub fn display(&self, ty: TypeId) -> String {
        self.def(ty).name.clone()
    }

    pub fn supertype(&self, ty: TypeId) -> Option<TypeId> {
        self.def(ty).members.as_ref().and_then(|m| m.supertype)
    }

    /// The field list of a type (statics included).
    pub fn fields(&self, ty: TypeId) -> &[FieldDef] {
        self.def(ty)
            .members
            .as_ref()
            .map(|m| m.fields.as_slice())
            .unwrap_or(&[])
    }

    /// Instance fields only: the plural layout.
    pub fn instance_fields(&self, ty: TypeId) -> Vec<FieldDef> {
        self.fields(ty)
            .iter()
            .filter(|f| !f.is_static)
            .cloned()
            .collect()
    }

    fn alloc_type(
        &mut self,
        name: String,
        runtime_name: String,
        kind: TypeKind,
        origin: Option<DefId>,
        args: Vec<TypeId>,
    ) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeDef {
            name,
            runtime_name,
            kind,
            origin,
            args,
            members: None,
            slots: SlotsState::Unknown,
        });
        id
    }

    fn set_members(&mut self, ty: TypeId, members: TypeMembers) {
        let def = &mut self.types[ty.0 as usize];
        debug_assert!(def.members.is_none(), "members of {} set twice", def.name);
        def.members = Some(members);
    }

    // ── Builtin type accessors ─────────────────────────────────────────

    fn builtin_def(&mut self, id: DefId) -> Result<TypeId, TypeErrorKind> {
        self.specialize_inner(id, Vec::new())
    }

    pub fn bool_ty(&mut self) -> Result<TypeId, TypeErrorKind> {
        self.builtin_def(self.program.builtins.bool_)
    }

    pub fn int_ty(&mut self, width: IntWidth) -> Result<TypeId, TypeErrorKind> {
        let id = self.program.builtins.ints[width as usize];
        self.builtin_def(id)
    }

    pub fn float_ty(&mut self, width: FloatWidth) -> Result<TypeId, TypeErrorKind> {
        let id = self.program.builtins.floats[width as usize];
        self.builtin_def(id)
    }

    pub fn object_ty(&mut self) -> Result<TypeId, TypeErrorKind> {
        self.builtin_def(self.program.builtins.object)
    }

    pub fn string_ty(&mut self) -> Result<TypeId, TypeErrorKind> {
        self.builtin_def(self.program.builtins.string)
    }

    pub fn int_literal_ty(&mut self) -> Result<TypeId, TypeErrorKind> {
        self.builtin_def(self.program.builtins.int_literal)
    }

    pub fn unit_ty(&mut self) -> Result<TypeId, TypeErrorKind> {
        self.tuple_type(Vec::new())
    }

    /// `Option<T>` for a reference `T`; value types are not supported yet.
    pub fn option_of(&mut self, value_ty: TypeId) -> Result<TypeId, TypeErrorKind> {
        self.specialize_inner(self.program.builtins.option, vec![value_ty])
    }

    // ── Specialization ─────────────────────────────────────────────────

    /// Specialize a definition at concrete type arguments, with source
    /// position for errors.
    pub fn specialize_def(
        &mut self,
        id: DefId,
        args: Vec<TypeId>,
        span: Span,
        file: &str,
    ) -> Result<TypeId, TypeError> {
        self.specialize_inner(id, args)
            .map_err(|kind| TypeError::new(kind, span, file))
    }

    fn specialize_inner(&mut self, id: DefId, args: Vec<TypeId>) -> Result<TypeId, TypeErrorKind> {
        let key = TypeKey::Def(id, args.clone());
        if let Some(&ty) = self.type_cache.get(&key) {
            trace!("type cache hit: {}", self.def(ty).name);
            return Ok(ty);
        }

        let Some(def) = self.program.arena.get(id) else {
            return Err(TypeErrorKind::Internal(format!(
                "indirection `{}` read before fulfillment",
                self.program.arena.name(id)
            )));
        };
        let def = Rc::clone(def);

        match def.as_ref() {
            ResolvedTypeDef::Builtin(kind) => self.specialize_builtin(id, *kind, args, key),
            ResolvedTypeDef::Reflected(index) => {
                self.expect_arity(0, &args)?;
                self.specialize_reflected(id, *index, key)
            }
            ResolvedTypeDef::Alias(target) => {
                self.expect_arity(0, &args)?;
                let ty = self
                    .instantiate_inner(target, &[], &[])?;
                self.type_cache.insert(key, ty);
                Ok(ty)
            }
            ResolvedTypeDef::Snuggle(sdef) => {
                if sdef.type_params.len() != args.len() {
                    return Err(TypeErrorKind::GenericArityMismatch {
                        expected: sdef.type_params.len(),
                        found: args.len(),
                    });
                }
                self.specialize_snuggle(id, def.as_ref(), args, key)
            }
        }
    }

    fn expect_arity(&self, expected: usize, args: &[TypeId]) -> Result<(), TypeErrorKind> {
        if args.len() != expected {
            return Err(TypeErrorKind::GenericArityMismatch {
                expected,
                found: args.len(),
            });
        }
        Ok(())
    }

    fn specialize_builtin(
        &mut self,
        origin: DefId,
        kind: BuiltinKind,
        args: Vec<TypeId>,
        key: TypeKey,
    ) -> Result<TypeId, TypeErrorKind> {
        // The applied Option<T> is its own shape; everything else is nullary
        // (Option at zero arguments is the factory carrying some/empty).
        if kind == BuiltinKind::OptionType && args.len() == 1 {
            let value_ty = args[0];
            if !self.def(value_ty).is_reference_type() {
                return Err(TypeErrorKind::NotYetSupported("options over value types"));
            }
            let name = format!("Option<{}>", self.def(value_ty).name);
            let runtime_name = self.def(value_ty).runtime_name.clone();
            let ty = self.alloc_type(name, runtime_name, TypeKind::Option, Some(origin), args);
            self.type_cache.insert(key, ty);
            let members = builtins::option_members(self, value_ty)?;
            self.set_members(ty, members);
            return Ok(ty);
        }
        self.expect_arity(0, &args)?;

        let (name, runtime_name) = match kind {
            BuiltinKind::Bool => ("bool", "bool"),
            BuiltinKind::Int(w) => (w.name(), w.name()),
            BuiltinKind::Float(w) => (w.name(), w.name()),
            BuiltinKind::Object => ("object", "java/lang/Object"),
            BuiltinKind::Str => ("string", "java/lang/String"),
            BuiltinKind::OptionType => ("Option", "Option"),
            BuiltinKind::Print => ("print", builtins::RUNTIME_CLASS),
            BuiltinKind::IntLiteral => ("<int literal>", "i32"),
        };
        let ty = self.alloc_type(
            name.to_string(),
            runtime_name.to_string(),
            TypeKind::Builtin(kind),
            Some(origin),
            Vec::new(),
        );
        self.type_cache.insert(key, ty);

        let mut members = builtins::builtin_members(self, kind, ty)?;
        if matches!(kind, BuiltinKind::Str | BuiltinKind::Print) {
            members.supertype = Some(self.object_ty()?);
        }
        self.set_members(ty, members);
        Ok(ty)
    }

    fn specialize_reflected(
        &mut self,
        origin: DefId,
        index: usize,
        key: TypeKey,
    ) -> Result<TypeId, TypeErrorKind> {
        let class = self.registry.classes[index].clone();
        let ty = self.alloc_type(
            class.name.clone(),
            class.runtime_name.clone(),
            TypeKind::Reflected(index),
            Some(origin),
            Vec::new(),
        );
        self.type_cache.insert(key, ty);

        let mut fields = Vec::new();
        for field in &class.fields {
            fields.push(FieldDef {
                name: field.name.clone(),
                ty: self.reflected_type(&field.ty)?,
                is_static: false,
                const_index: None,
            });
        }

        let mut methods = Vec::new();
        for method in &class.methods {
            let params = method
                .params
                .iter()
                .map(|p| self.reflected_type(p))
                .collect::<Result<Vec<_>, _>>()?;
            let ret = self.reflected_type(&method.ret)?;
            let singleton = match (&class.singleton, method.is_static) {
                (Some(s), false) => Some(FieldRef {
                    owner: class.runtime_name.clone(),
                    name: s.field.clone(),
                    descriptor: format!("L{};", class.runtime_name),
                }),
                _ => None,
            };
            let data = crate::method::EmitData::HostCall {
                kind: if method.is_static {
                    CallKind::Static
                } else {
                    CallKind::Virtual
                },
                method: MethodRef {
                    owner: class.runtime_name.clone(),
                    name: method.host_name.clone(),
                    descriptor: self.registry.method_descriptor(method),
                },
                singleton,
            };
            methods.push(MethodTemplate {
                name: method.name.clone(),
                disambig: 0,
                // In singleton mode the receiver comes from the static
                // instance field, so every method is static at the surface.
                is_static: method.is_static || class.singleton.is_some(),
                type_param_count: 0,
                source: MethodSource::Builtin(BuiltinSig {
                    params,
                    ret,
                    body: BuiltinBody::Bytecode {
                        data,
                        emit: builtins::emit_data,
                    },
                }),
            });
        }
        builtins::assign_disambiguation(&mut methods);

        let supertype = Some(self.object_ty()?);
        self.set_members(ty, TypeMembers { supertype, fields, methods });
        Ok(ty)
    }

    fn reflected_type(
        &mut self,
        ty: &crate::reflect::ReflectedType,
    ) -> Result<TypeId, TypeErrorKind> {
        use crate::reflect::ReflectedType as R;
        match ty {
            R::Void => self.unit_ty(),
            R::Bool => self.bool_ty(),
            R::I32 => self.int_ty(IntWidth::I32),
            R::I64 => self.int_ty(IntWidth::I64),
            R::F32 => self.float_ty(FloatWidth::F32),
            R::F64 => self.float_ty(FloatWidth::F64),
            R::Str => self.string_ty(),
            R::Object => self.object_ty(),
            R::Class(name) => {
                let index = self.registry.class_index(name).ok_or_else(|| {
                    TypeErrorKind::Internal(format!("reflected class `{name}` not in registry"))
                })?;
                self.builtin_def(self.program.builtins.reflected[index])
            }
        }
    }

    fn specialize_snuggle(
        &mut self,
        id: DefId,
        def: &ResolvedTypeDef,
        args: Vec<TypeId>,
        key: TypeKey,
    ) -> Result<TypeId, TypeErrorKind> {
        let ResolvedTypeDef::Snuggle(sdef) = def else {
            unreachable!("caller matched Snuggle");
        };

        let (name, runtime_name) = self.specialized_names(&sdef.name, &args);
        let kind = match sdef.kind {
            SnuggleTypeDefKind::Class { .. } => TypeKind::Class,
            SnuggleTypeDefKind::Struct { .. } => TypeKind::Struct,
            SnuggleTypeDefKind::Enum { .. } => TypeKind::Enum,
        };
        let ty = self.alloc_type(name, runtime_name, kind, Some(id), args.clone());
        // Into the cache before members: re-entry during member computation
        // (cyclic fields, self-referential methods) finds the placeholder.
        self.type_cache.insert(key, ty);
        debug!("specializing {}", self.def(ty).name);

        let span = sdef.span;
        let members = match &sdef.kind {
            SnuggleTypeDefKind::Class { supertype, fields, methods } => {
                let supertype = match supertype {
                    Some(st) => {
                        let st_ty = self
                            .instantiate_inner(st, &args, &[])?;
                        let ok = matches!(
                            self.def(st_ty).kind,
                            TypeKind::Class | TypeKind::Builtin(BuiltinKind::Object)
                        );
                        if !ok {
                            return Err(TypeErrorKind::InvalidSupertype {
                                ty: self.display(ty),
                            });
                        }
                        st_ty
                    }
                    None => self.object_ty()?,
                };
                let fields = self.member_fields(fields, &args)?;
                let mut templates = self.member_templates(id, methods, true)?;
                if !templates.iter().any(|t| t.name == "new") {
                    templates.push(default_ctor_template(span));
                }
                builtins::assign_disambiguation(&mut templates);
                TypeMembers {
                    supertype: Some(supertype),
                    fields,
                    methods: templates,
                }
            }
            SnuggleTypeDefKind::Struct { fields, methods } => {
                let fields = self.member_fields(fields, &args)?;
                let mut templates = self.member_templates(id, methods, false)?;
                builtins::assign_disambiguation(&mut templates);
                TypeMembers {
                    supertype: None,
                    fields,
                    methods: templates,
                }
            }
            SnuggleTypeDefKind::Enum { variants, methods } => {
                let fields = variants
                    .iter()
                    .enumerate()
                    .map(|(i, v)| FieldDef {
                        name: v.clone(),
                        ty,
                        is_static: true,
                        const_index: Some(i as i32),
                    })
                    .collect();
                let i32_ty = self.int_ty(IntWidth::I32)?;
                let mut templates = vec![MethodTemplate {
                    name: "index".to_string(),
                    disambig: 0,
                    is_static: false,
                    type_param_count: 0,
                    source: MethodSource::Builtin(BuiltinSig {
                        params: Vec::new(),
                        ret: i32_ty,
                        body: BuiltinBody::Bytecode {
                            data: crate::method::EmitData::Identity,
                            emit: builtins::emit_data,
                        },
                    }),
                }];
                templates.extend(self.member_templates(id, methods, false)?);
                builtins::assign_disambiguation(&mut templates);
                TypeMembers {
                    supertype: None,
                    fields,
                    methods: templates,
                }
            }
        };
        self.set_members(ty, members);
        Ok(ty)
    }

    /// Display and runtime names of a specialization.
    fn specialized_names(&self, base: &str, args: &[TypeId]) -> (String, String) {
        if args.is_empty() {
            return (base.to_string(), names::mangle(base));
        }
        let display = format!(
            "{base}<{}>",
            args.iter()
                .map(|a| self.def(*a).name.clone())
                .collect::<Vec<_>>()
                .join(", ")
        );
        let runtime = std::iter::once(names::mangle(base))
            .chain(args.iter().map(|a| names::mangle(&self.def(*a).runtime_name)))
            .collect::<Vec<_>>()
            .join("_");
        (display, runtime)
    }

    fn member_fields(
        &mut self,
        fields: &[snuggle_resolver::ResolvedField],
        type_args: &[TypeId],
    ) -> Result<Vec<FieldDef>, TypeErrorKind> {
        fields
            .iter()
            .map(|f| {
                Ok(FieldDef {
                    name: f.name.clone(),
                    ty: self.instantiate_inner(&f.ty, type_args, &[])?,
                    is_static: f.is_static,
                    const_index: None,
                })
            })
            .collect()
    }

    /// Templates for a definition's own methods plus any impl-block
    /// extensions registered against it.
    fn member_templates(
        &mut self,
        id: DefId,
        methods: &[Rc<ResolvedMethod>],
        _is_class: bool,
    ) -> Result<Vec<MethodTemplate>, TypeErrorKind> {
        let mut templates: Vec<MethodTemplate> = methods
            .iter()
            .map(|m| MethodTemplate {
                name: m.name.clone(),
                disambig: 0,
                is_static: m.is_static,
                type_param_count: m.type_params.len(),
                source: MethodSource::Snuggle(Rc::clone(m)),
            })
            .collect();
        if let Some(extra) = self.program.impls.get(&id) {
            templates.extend(extra.iter().map(|m| MethodTemplate {
                name: m.name.clone(),
                disambig: 0,
                is_static: m.is_static,
                type_param_count: m.type_params.len(),
                source: MethodSource::Snuggle(Rc::clone(m)),
            }));
        }
        Ok(templates)
    }

    // ── Structural types ───────────────────────────────────────────────

    /// The anonymous plural type of a tuple; the empty tuple is unit.
    pub fn tuple_type(&mut self, elems: Vec<TypeId>) -> Result<TypeId, TypeErrorKind> {
        let key = TypeKey::Tuple(elems.clone());
        if let Some(&ty) = self.type_cache.get(&key) {
            return Ok(ty);
        }
        let name = format!(
            "({})",
            elems
                .iter()
                .map(|e| self.def(*e).name.clone())
                .collect::<Vec<_>>()
                .join(", ")
        );
        let runtime = std::iter::once(format!("tuple{}", elems.len()))
            .chain(elems.iter().map(|e| names::mangle(&self.def(*e).runtime_name)))
            .collect::<Vec<_>>()
            .join("_");
        let ty = self.alloc_type(name, runtime, TypeKind::Tuple, None, elems.clone());
        self.type_cache.insert(key, ty);
        let fields = elems
            .iter()
            .enumerate()
            .map(|(i, e)| FieldDef {
                name: format!("v{i}"),
                ty: *e,
                is_static: false,
                const_index: None,
            })
            .collect();
        self.set_members(
            ty,
            TypeMembers {
                supertype: None,
                fields,
                methods: Vec::new(),
            },
        );
        Ok(ty)
    }

    /// The erased interface type behind `fn(params): ret`.
    pub fn func_type(&mut self, params: Vec<TypeId>, ret: TypeId) -> Result<TypeId, TypeErrorKind> {
        let key = TypeKey::Func(params.clone(), ret);
        if let Some(&ty) = self.type_cache.get(&key) {
            return Ok(ty);
        }
        let name = format!(
            "fn({}): {}",
            params
                .iter()
                .map(|p| self.def(*p).name.clone())
                .collect::<Vec<_>>()
                .join(", "),
            self.def(ret).name
        );
        let runtime = std::iter::once("func".to_string())
            .chain(params.iter().map(|p| names::mangle(&self.def(*p).runtime_name)))
            .chain(std::iter::once(format!(
                "to_{}",
                names::mangle(&self.def(ret).runtime_name)
            )))
            .collect::<Vec<_>>()
            .join("_");
        let mut args = params.clone();
        args.push(ret);
        let ty = self.alloc_type(name, runtime, TypeKind::Func, None, args);
        self.type_cache.insert(key, ty);
        self.set_members(
            ty,
            TypeMembers {
                supertype: None,
                fields: Vec::new(),
                methods: vec![MethodTemplate {
                    name: "invoke".to_string(),
                    disambig: 0,
                    is_static: false,
                    type_param_count: 0,
                    source: MethodSource::Builtin(BuiltinSig {
                        params,
                        ret,
                        body: BuiltinBody::Interface,
                    }),
                }],
            },
        );
        Ok(ty)
    }

    // ── Type instantiation ─────────────────────────────────────────────

    pub fn instantiate(
        &mut self,
        rt: &ResolvedType,
        type_args: &[TypeId],
        method_args: &[TypeId],
        span: Span,
        file: &str,
    ) -> Result<TypeId, TypeError> {
        self.instantiate_inner(rt, type_args, method_args)
            .map_err(|kind| TypeError::new(kind, span, file))
    }

    fn instantiate_inner(
        &mut self,
        rt: &ResolvedType,
        type_args: &[TypeId],
        method_args: &[TypeId],
    ) -> Result<TypeId, TypeErrorKind> {
        match rt {
            ResolvedType::Def { id, args } => {
                let args = args
                    .iter()
                    .map(|a| self.instantiate_inner(a, type_args, method_args))
                    .collect::<Result<Vec<_>, _>>()?;
                self.specialize_inner(*id, args)
            }
            ResolvedType::TypeGeneric(i) => type_args.get(*i).copied().ok_or_else(|| {
                TypeErrorKind::Internal(format!("type generic #{i} out of range"))
            }),
            ResolvedType::MethodGeneric(i) => method_args.get(*i).copied().ok_or_else(|| {
                TypeErrorKind::Internal(format!("method generic #{i} out of range"))
            }),
            ResolvedType::Tuple(elems) => {
                let elems = elems
                    .iter()
                    .map(|e| self.instantiate_inner(e, type_args, method_args))
                    .collect::<Result<Vec<_>, _>>()?;
                self.tuple_type(elems)
            }
            ResolvedType::Func { params, ret } => {
                let params = params
                    .iter()
                    .map(|p| self.instantiate_inner(p, type_args, method_args))
                    .collect::<Result<Vec<_>, _>>()?;
                let ret = self.instantiate_inner(ret, type_args, method_args)?;
                self.func_type(params, ret)
            }
        }
    }

    // ── Layout queries ─────────────────────────────────────────────────

    /// Stack slots of a type, computing lazily with cycle detection.
    pub fn slots_mut(&mut self, ty: TypeId) -> Result<u32, TypeErrorKind> {
        match self.def(ty).slots {
            SlotsState::Known(n) => return Ok(n),
            SlotsState::InProgress => {
                return Err(TypeErrorKind::RecursiveValueType { ty: self.display(ty) })
            }
            SlotsState::Unknown => {}
        }
        self.types[ty.0 as usize].slots = SlotsState::InProgress;
        let n = match self.def(ty).kind {
            TypeKind::Builtin(BuiltinKind::Int(IntWidth::I64))
            | TypeKind::Builtin(BuiltinKind::Float(FloatWidth::F64)) => 2,
            TypeKind::Builtin(_) => 1,
            TypeKind::Option
            | TypeKind::Reflected(_)
            | TypeKind::Class
            | TypeKind::Func
            | TypeKind::FuncImpl => 1,
            TypeKind::Enum => 1,
            TypeKind::Struct | TypeKind::Tuple => {
                let field_tys: Vec<TypeId> =
                    self.instance_fields(ty).iter().map(|f| f.ty).collect();
                let mut sum = 0;
                for f in field_tys {
                    sum += self.slots_mut(f)?;
                }
                sum
            }
        };
        self.types[ty.0 as usize].slots = SlotsState::Known(n);
        Ok(n)
    }

    /// Stack slots of a type after [`finalize_layouts`] has run.
    pub fn slots(&self, ty: TypeId) -> Option<u32> {
        match self.def(ty).slots {
            SlotsState::Known(n) => Some(n),
            _ => None,
        }
    }

    fn finalize_layouts(&mut self) -> Result<(), TypeError> {
        for i in 0..self.types.len() {
            let ty = TypeId(i as u32);
            self.slots_mut(ty).map_err(|kind| {
                let (span, file) = self.origin_location(ty);
                TypeError::new(kind, span, file)
            })?;
        }
        Ok(())
    }

    fn origin_location(&self, ty: TypeId) -> (Span, String) {
        if let Some(id) = self.def(ty).origin {
            if let Some(def) = self.program.arena.get(id) {
                if let ResolvedTypeDef::Snuggle(sdef) = def.as_ref() {
                    return (sdef.span, sdef.file.clone());
                }
            }
        }
        (Span::point(0), "<builtin>".to_string())
    }

    /// The file a type's definition lives in, for diagnostics.
    pub fn origin_file(&self, ty: TypeId) -> String {
        self.origin_location(ty).1
    }

    /// One descriptor per leaf slot, in layout order.
    pub fn descriptor_list(&self, ty: TypeId) -> Vec<String> {
        let def = self.def(ty);
        match def.kind {
            TypeKind::Builtin(BuiltinKind::Bool) => vec!["Z".to_string()],
            TypeKind::Builtin(BuiltinKind::Int(w)) => vec![match w {
                IntWidth::I8 => "B",
                IntWidth::I16 => "S",
                IntWidth::I32 => "I",
                IntWidth::I64 => "J",
            }
            .to_string()],
            TypeKind::Builtin(BuiltinKind::IntLiteral) => vec!["I".to_string()],
            TypeKind::Builtin(BuiltinKind::Float(w)) => vec![match w {
                FloatWidth::F32 => "F",
                FloatWidth::F64 => "D",
            }
            .to_string()],
            TypeKind::Builtin(BuiltinKind::Object)
            | TypeKind::Builtin(BuiltinKind::OptionType)
            | TypeKind::Builtin(BuiltinKind::Print)
            | TypeKind::Builtin(BuiltinKind::Str)
            | TypeKind::Option
            | TypeKind::Reflected(_)
            | TypeKind::Class
            | TypeKind::Func
            | TypeKind::FuncImpl => vec![format!("L{};", def.runtime_name)],
            TypeKind::Enum => vec!["I".to_string()],
            TypeKind::Struct | TypeKind::Tuple => def
                .instance_fields()
                .flat_map(|f| self.descriptor_list(f.ty))
                .collect(),
        }
    }

    /// One stack kind per leaf slot, in layout order.
    pub fn leaf_kinds(&self, ty: TypeId) -> Vec<BasicKind> {
        let def = self.def(ty);
        match def.kind {
            TypeKind::Struct | TypeKind::Tuple => {
                let field_tys: Vec<TypeId> = def.instance_fields().map(|f| f.ty).collect();
                field_tys.iter().flat_map(|t| self.leaf_kinds(*t)).collect()
            }
            TypeKind::Enum => vec![BasicKind::Int],
            _ => vec![self.basic_kind(ty)],
        }
    }

    /// The stack kind of a non-plural type (enums count: one `Int` leaf).
    pub fn basic_kind(&self, ty: TypeId) -> BasicKind {
        let def = self.def(ty);
        match def.kind {
            TypeKind::Builtin(BuiltinKind::Bool)
            | TypeKind::Builtin(BuiltinKind::IntLiteral) => BasicKind::Int,
            TypeKind::Builtin(BuiltinKind::Int(w)) => builtins::int_basic_kind(w),
            TypeKind::Builtin(BuiltinKind::Float(w)) => builtins::float_basic_kind(w),
            TypeKind::Enum => BasicKind::Int,
            _ => BasicKind::Ref,
        }
    }

    // ── Subtyping and coercion ─────────────────────────────────────────

    /// Nominal subtyping: identity, the class supertype chain, and `object`
    /// as the top of all reference types.
    pub fn is_subtype(&self, a: TypeId, b: TypeId) -> bool {
        if a == b {
            return true;
        }
        if matches!(self.def(b).kind, TypeKind::Builtin(BuiltinKind::Object))
            && self.def(a).is_reference_type()
        {
            return true;
        }
        let mut cur = self.supertype(a);
        while let Some(ty) = cur {
            if ty == b {
                return true;
            }
            cur = self.supertype(ty);
        }
        false
    }

    /// Whether `expr` could be accepted where `to` is expected, including
    /// literal and tuple-shape coercions. Read-only twin of [`coerce`].
    fn can_coerce(&self, expr: &TypedExpr, to: TypeId) -> bool {
        if expr.ty == to {
            return true;
        }
        match (&expr.kind, &self.def(to).kind) {
            (TypedExprKind::Literal(Constant::IntLit(v)), TypeKind::Builtin(BuiltinKind::Int(w))) => {
                int_fits(*v, *w)
            }
            (TypedExprKind::Literal(Constant::IntLit(_)), TypeKind::Builtin(BuiltinKind::Float(_))) => {
                true
            }
            (TypedExprKind::RawStruct { values }, _)
                if matches!(self.def(expr.ty).kind, TypeKind::Tuple)
                    && matches!(self.def(to).kind, TypeKind::Struct | TypeKind::Tuple) =>
            {
                let fields = self.instance_fields(to);
                fields.len() == values.len()
                    && values
                        .iter()
                        .zip(fields.iter())
                        .all(|(v, f)| self.can_coerce(v, f.ty))
            }
            _ => self.is_subtype(expr.ty, to),
        }
    }

    /// Rewrite `expr` in place to have type `to`, when [`can_coerce`] said
    /// yes. Literals commit to a width; tuple literals take the target's
    /// field types. Subtype acceptance leaves the expression untouched.
    fn coerce(&mut self, expr: &mut TypedExpr, to: TypeId) {
        if expr.ty == to {
            return;
        }
        let to_kind = self.def(to).kind;

        let lit_value = match &expr.kind {
            TypedExprKind::Literal(Constant::IntLit(v)) => Some(*v),
            _ => None,
        };
        if let Some(v) = lit_value {
            match to_kind {
                TypeKind::Builtin(BuiltinKind::Int(w)) => {
                    expr.kind = TypedExprKind::Literal(Constant::Int(w, v));
                    expr.ty = to;
                }
                TypeKind::Builtin(BuiltinKind::Float(w)) => {
                    expr.kind = TypedExprKind::Literal(Constant::Float(w, v as f64));
                    expr.ty = to;
                }
                _ => {}
            }
            return;
        }

        let reshapes = matches!(expr.kind, TypedExprKind::RawStruct { .. })
            && self.def(expr.ty).kind == TypeKind::Tuple
            && matches!(to_kind, TypeKind::Struct | TypeKind::Tuple);
        if reshapes {
            let field_tys: Vec<TypeId> = self.instance_fields(to).iter().map(|f| f.ty).collect();
            if let TypedExprKind::RawStruct { values } = &mut expr.kind {
                let mut owned = mem::take(values);
                for (v, t) in owned.iter_mut().zip(field_tys) {
                    self.coerce(v, t);
                }
                *values = owned;
            }
            expr.ty = to;
        }
    }

    /// Commit an un-widthed literal to a storable type: `i32` for int
    /// literals. No-op for everything else.
    fn materialize_default(&mut self, expr: &mut TypedExpr) -> Result<(), TypeErrorKind> {
        if self.def(expr.ty).is_int_literal() {
            let i32_ty = self.int_ty(IntWidth::I32)?;
            self.coerce(expr, i32_ty);
        }
        Ok(())
    }
}

/// The synthesized zero-argument constructor of a class without one:
/// `fn new() super.new()`.
fn default_ctor_template(span: Span) -> MethodTemplate {
    let body = ResolvedExpr {
        kind: ResolvedExprKind::SuperMethodCall {
            name: "new".to_string(),
            generics: Vec::new(),
            args: Vec::new(),
        },
        span,
    };
    MethodTemplate {
        name: "new".to_string(),
        disambig: 0,
        is_static: false,
        type_param_count: 0,
        source: MethodSource::Snuggle(Rc::new(ResolvedMethod {
            name: "new".to_string(),
            is_static: false,
            type_params: Vec::new(),
            params: Vec::new(),
            ret: None,
            body: Rc::new(body),
            span,
        })),
    }
}

/// Whether `v` fits the signed range of `w`.
fn int_fits(v: i64, w: IntWidth) -> bool {
    match w {
        IntWidth::I8 => i8::try_from(v).is_ok(),
        IntWidth::I16 => i16::try_from(v).is_ok(),
        IntWidth::I32 => i32::try_from(v).is_ok(),
        IntWidth::I64 => true,
    }
}

/// Error-wrapping helper: attach a source position to a bare error kind.
fn at(span: Span, file: &str) -> impl Fn(TypeErrorKind) -> TypeError + '_ {
    move |kind| TypeError::new(kind, span, file)
}

/// The declared type of a parameter pattern; every binding must be
/// ascribed (declaration patterns may omit types, parameters may not).
fn pattern_declared_ty(p: &ResolvedPattern) -> Result<ResolvedType, TypeErrorKind> {
    match &p.kind {
        ResolvedPatternKind::Binding { name, ty } => ty
            .clone()
            .ok_or_else(|| TypeErrorKind::ParameterTypeRequired { name: name.clone() }),
        ResolvedPatternKind::Tuple(elems) => Ok(ResolvedType::Tuple(
            elems
                .iter()
                .map(pattern_declared_ty)
                .collect::<Result<_, _>>()?,
        )),
    }
}

/// Whether an expression unconditionally returns, so a non-unit method body
/// ending in it needs no final result coercion.
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

// ── Local environments ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct LocalBinding {
    index: u32,
    ty: TypeId,
}

#[derive(Debug)]
struct CaptureEntry {
    name: String,
    source: CaptureSource,
}

/// One method or lambda activation: its named locals and slot allocator.
#[derive(Debug)]
struct Frame {
    vars: FxHashMap<String, LocalBinding>,
    next_index: u32,
    max_index: u32,
    is_lambda: bool,
    captures: Vec<CaptureEntry>,
}

/// How a name resolved against the environment.
enum VarRef {
    Local(LocalBinding),
    Capture(u32, TypeId),
}

/// The stack of activation frames. Lambda frames capture transitively from
/// whatever encloses them; looking a name up may therefore grow the capture
/// lists of every lambda frame between the binding and the use.
#[derive(Debug, Default)]
struct Env {
    frames: Vec<Frame>,
}

impl Env {
    fn new() -> Self {
        Self::default()
    }

    fn push_frame(&mut self, is_lambda: bool, first_index: u32) {
        self.frames.push(Frame {
            vars: FxHashMap::default(),
            next_index: first_index,
            max_index: first_index,
            is_lambda,
            captures: Vec::new(),
        });
    }

    fn pop_frame(&mut self) -> Frame {
        self.frames.pop().expect("environment frame stack must never be empty")
    }

    fn top(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("environment frame stack must never be empty")
    }

    /// Allocate local slots for a binding. Indices are handed out densely
    /// and never reused within one activation.
    fn declare(&mut self, name: &str, ty: TypeId, slots: u32) -> u32 {
        let frame = self.top();
        let index = frame.next_index;
        frame.vars.insert(name.to_string(), LocalBinding { index, ty });
        frame.next_index += slots;
        frame.max_index = frame.max_index.max(frame.next_index);
        index
    }

    fn save_vars(&mut self) -> FxHashMap<String, LocalBinding> {
        self.top().vars.clone()
    }

    fn restore_vars(&mut self, vars: FxHashMap<String, LocalBinding>) {
        self.top().vars = vars;
    }

    fn lookup(&mut self, name: &str) -> Option<VarRef> {
        let last = self.frames.len() - 1;
        if let Some(b) = self.frames[last].vars.get(name) {
            return Some(VarRef::Local(*b));
        }
        if !self.frames[last].is_lambda {
            return None;
        }
        if let Some(i) = self.frames[last].captures.iter().position(|c| c.name == name) {
            let ty = self.frames[last].captures[i].source.ty();
            return Some(VarRef::Capture(i as u32, ty));
        }

        // Find the binding in an enclosing frame...
        let mut found: Option<(usize, CaptureSource)> = None;
        for j in (0..last).rev() {
            if let Some(b) = self.frames[j].vars.get(name) {
                found = Some((j, CaptureSource::Local { index: b.index, ty: b.ty }));
                break;
            }
            if let Some(i) = self.frames[j].captures.iter().position(|c| c.name == name) {
                let ty = self.frames[j].captures[i].source.ty();
                found = Some((j, CaptureSource::Capture { index: i as u32, ty }));
                break;
            }
            if !self.frames[j].is_lambda {
                return None;
            }
        }
        // ...then thread it through every lambda frame in between.
        let (j, mut source) = found?;
        let mut result = None;
        for k in (j + 1)..=last {
            let ty = source.ty();
            let frame = &mut self.frames[k];
            let idx = frame.captures.len() as u32;
            frame.captures.push(CaptureEntry { name: name.to_string(), source });
            source = CaptureSource::Capture { index: idx, ty };
            result = Some(VarRef::Capture(idx, ty));
        }
        result
    }
}

// ── Method specialization and call resolution ──────────────────────────

impl<'a> TypeCtx<'a> {
    fn template(&self, owner: TypeId, member_idx: usize) -> MethodTemplate {
        self.def(owner)
            .members
            .as_ref()
            .expect("members are set before member lookups")
            .methods[member_idx]
            .clone()
    }

    /// The chain of types whose members a lookup on `owner` sees: the type
    /// itself, then the class supertype chain.
    fn member_chain(&self, owner: TypeId, own_only: bool) -> Vec<TypeId> {
        let mut chain = vec![owner];
        if !own_only
            && matches!(self.def(owner).kind, TypeKind::Class | TypeKind::Reflected(_))
        {
            let mut cur = self.supertype(owner);
            while let Some(ty) = cur {
                chain.push(ty);
                cur = self.supertype(ty);
            }
        }
        chain
    }

    /// Instance-field lookup, walking the class supertype chain.
    fn lookup_field(&self, owner: TypeId, name: &str) -> Option<(TypeId, usize)> {
        for ty in self.member_chain(owner, false) {
            if let Some(idx) = self
                .fields(ty)
                .iter()
                .position(|f| !f.is_static && f.name == name)
            {
                return Some((ty, idx));
            }
        }
        None
    }

    /// Compute a member's signature at the given type arguments without
    /// allocating an instance. Used during overload selection so rejected
    /// candidates leave no trace.
    fn signature_of(
        &mut self,
        owner: TypeId,
        member_idx: usize,
        margs: &[TypeId],
        span: Span,
        file: &str,
    ) -> Result<(Vec<TypeId>, TypeId), TypeError> {
        let template = self.template(owner, member_idx);
        match &template.source {
            MethodSource::Snuggle(m) => {
                if m.type_params.len() != margs.len() {
                    return Err(TypeError::new(
                        TypeErrorKind::GenericArityMismatch {
                            expected: m.type_params.len(),
                            found: margs.len(),
                        },
                        span,
                        file,
                    ));
                }
                let targs = self.def(owner).args.clone();
                let mut params = Vec::with_capacity(m.params.len());
                for p in &m.params {
                    let declared = pattern_declared_ty(p).map_err(at(p.span, file))?;
                    params.push(self.instantiate(&declared, &targs, margs, p.span, file)?);
                }
                let ret = match &m.ret {
                    Some(r) => self.instantiate(r, &targs, margs, m.span, file)?,
                    None => self.unit_ty().map_err(at(span, file))?,
                };
                Ok((params, ret))
            }
            MethodSource::Builtin(sig) => Ok((sig.params.clone(), sig.ret)),
            MethodSource::GenericBuiltin { make, .. } => {
                let sig = make(self, owner, margs).map_err(at(span, file))?;
                Ok((sig.params, sig.ret))
            }
        }
    }

    /// Specialize one member at method type arguments. Cached by equality
    /// on the argument tuple; user-method bodies enter the worklist as
    /// `Pending`.
    fn specialize_method(
        &mut self,
        owner: TypeId,
        member_idx: usize,
        margs: Vec<TypeId>,
        span: Span,
        file: &str,
    ) -> Result<MethodId, TypeError> {
        let key = (owner, member_idx, margs.clone());
        if let Some(&mid) = self.method_cache.get(&key) {
            trace!("method cache hit: {}", self.method(mid).runtime_name);
            return Ok(mid);
        }
        let (params, ret) = self.signature_of(owner, member_idx, &margs, span, file)?;
        let template = self.template(owner, member_idx);
        let runtime_name = self.method_runtime_name(owner, &template, &margs);

        let kind = match &template.source {
            MethodSource::Snuggle(m) => MethodKind::Snuggle {
                body: BodyState::Pending(PendingBody {
                    method: Rc::clone(m),
                    type_args: self.def(owner).args.clone(),
                    method_args: margs.clone(),
                }),
            },
            MethodSource::Builtin(sig) => builtin_kind(&sig.body),
            MethodSource::GenericBuiltin { make, .. } => {
                let sig = make(self, owner, &margs).map_err(at(span, file))?;
                builtin_kind(&sig.body)
            }
        };

        let mid = MethodId(self.methods.len() as u32);
        let is_snuggle = matches!(kind, MethodKind::Snuggle { .. });
        self.methods.push(MethodInstance {
            owner,
            name: template.name.clone(),
            runtime_name,
            is_static: template.is_static,
            params,
            ret,
            kind,
        });
        self.method_cache.insert(key, mid);
        if is_snuggle {
            self.pending.push(mid);
        }
        Ok(mid)
    }

    fn method_runtime_name(
        &self,
        owner: TypeId,
        template: &MethodTemplate,
        margs: &[TypeId],
    ) -> String {
        if template.name == "new" && matches!(self.def(owner).kind, TypeKind::Class) {
            return names::CTOR_NAME.to_string();
        }
        let base = names::disambiguated_name(&template.name, template.disambig);
        if margs.is_empty() {
            base
        } else {
            let suffix = margs
                .iter()
                .map(|a| names::mangle(&self.def(*a).runtime_name))
                .collect::<Vec<_>>()
                .join("$");
            format!("{base}${suffix}")
        }
    }

    /// Overload resolution: walk the member chain in order, first match
    /// wins. Coerces the arguments in place on the matching candidate.
    #[allow(clippy::too_many_arguments)]
    fn resolve_call(
        &mut self,
        owner: TypeId,
        name: &str,
        explicit: &[TypeId],
        args: &mut [TypedExpr],
        want_static: bool,
        own_only: bool,
        span: Span,
        bctx: &BodyCtx,
    ) -> Result<(MethodId, CallKind), TypeError> {
        // Effective argument types for inference: int literals infer as i32.
        let i32_ty = self.int_ty(IntWidth::I32).map_err(at(span, &bctx.file))?;
        let arg_tys: Vec<TypeId> = args
            .iter()
            .map(|a| if self.def(a.ty).is_int_literal() { i32_ty } else { a.ty })
            .collect();

        let mut found_name = false;
        let mut infer_failed = false;
        for ty in self.member_chain(owner, own_only) {
            let Some(members) = self.def(ty).members.as_ref() else { continue };
            let templates = members.methods.clone();
            for (idx, template) in templates.iter().enumerate() {
                if template.name != name || template.is_static != want_static {
                    continue;
                }
                found_name = true;

                let margs: Vec<TypeId> = if template.type_param_count == 0 {
                    if !explicit.is_empty() {
                        continue;
                    }
                    Vec::new()
                } else if !explicit.is_empty() {
                    if explicit.len() != template.type_param_count {
                        continue;
                    }
                    explicit.to_vec()
                } else {
                    let inferred = match &template.source {
                        MethodSource::Snuggle(m) => {
                            let owner_args = self.def(ty).args.clone();
                            self.infer_method_generics(m, &owner_args, &arg_tys)
                        }
                        MethodSource::GenericBuiltin { infer, .. } => infer(&arg_tys),
                        MethodSource::Builtin(_) => None,
                    };
                    match inferred {
                        Some(margs) => margs,
                        None => {
                            infer_failed = true;
                            continue;
                        }
                    }
                };

                let (params, _ret) = self.signature_of(ty, idx, &margs, span, &bctx.file)?;
                if params.len() != args.len() {
                    continue;
                }
                if !args.iter().zip(&params).all(|(a, p)| self.can_coerce(a, *p)) {
                    continue;
                }
                for (a, p) in args.iter_mut().zip(&params) {
                    self.coerce(a, *p);
                }
                let mid = self.specialize_method(ty, idx, margs, span, &bctx.file)?;
                let call = if template.is_static {
                    CallKind::Static
                } else {
                    match self.def(ty).kind {
                        TypeKind::Class | TypeKind::Reflected(_) => CallKind::Virtual,
                        TypeKind::Func => CallKind::Interface,
                        _ => CallKind::Static,
                    }
                };
                return Ok((mid, call));
            }
        }

        let kind = if infer_failed {
            TypeErrorKind::CannotInferGenerics { method: name.to_string() }
        } else if found_name {
            TypeErrorKind::NoMatchingOverload {
                ty: self.display(owner),
                method: name.to_string(),
            }
        } else {
            TypeErrorKind::UnknownMethod {
                ty: self.display(owner),
                method: name.to_string(),
            }
        };
        Err(TypeError::new(kind, span, &bctx.file))
    }

    /// Structural inference of method type arguments from value arguments.
    fn infer_method_generics(
        &self,
        m: &ResolvedMethod,
        owner_args: &[TypeId],
        arg_tys: &[TypeId],
    ) -> Option<Vec<TypeId>> {
        if m.params.len() != arg_tys.len() {
            return None;
        }
        let mut out = vec![None; m.type_params.len()];
        for (p, arg) in m.params.iter().zip(arg_tys) {
            let declared = pattern_declared_ty(p).ok()?;
            self.unify_generics(&declared, *arg, &mut out);
        }
        out.into_iter().collect()
    }

    fn unify_generics(&self, rt: &ResolvedType, arg: TypeId, out: &mut [Option<TypeId>]) {
        match rt {
            ResolvedType::MethodGeneric(i) => {
                if let Some(slot) = out.get_mut(*i) {
                    if slot.is_none() {
                        *slot = Some(arg);
                    }
                }
            }
            ResolvedType::TypeGeneric(_) => {}
            ResolvedType::Def { id, args } => {
                let def = self.def(arg);
                if def.origin == Some(*id) && def.args.len() == args.len() {
                    let def_args = def.args.clone();
                    for (sub, sub_arg) in args.iter().zip(def_args) {
                        self.unify_generics(sub, sub_arg, out);
                    }
                }
            }
            ResolvedType::Tuple(elems) => {
                let def = self.def(arg);
                if def.kind == TypeKind::Tuple && def.args.len() == elems.len() {
                    let def_args = def.args.clone();
                    for (sub, sub_arg) in elems.iter().zip(def_args) {
                        self.unify_generics(sub, sub_arg, out);
                    }
                }
            }
            ResolvedType::Func { params, ret } => {
                let def = self.def(arg);
                if def.kind == TypeKind::Func && def.args.len() == params.len() + 1 {
                    let def_args = def.args.clone();
                    for (sub, sub_arg) in params.iter().zip(&def_args[..params.len()]) {
                        self.unify_generics(sub, *sub_arg, out);
                    }
                    self.unify_generics(ret, def_args[params.len()], out);
                }
            }
        }
    }
}

/// Map a builtin body to its instance kind.
fn builtin_kind(body: &BuiltinBody) -> MethodKind {
    match body {
        BuiltinBody::Bytecode { data, emit } => MethodKind::Bytecode {
            data: data.clone(),
            emit: *emit,
        },
        BuiltinBody::Const { fold } => MethodKind::Const { fold: *fold },
        BuiltinBody::Interface => MethodKind::Interface,
    }
}

// ── Bodies ─────────────────────────────────────────────────────────────

impl<'a> TypeCtx<'a> {
    /// Type a file's top-level code as one body in a static context.
    fn check_file(&mut self, file: &ResolvedFile) -> Result<TypedFile, TypeError> {
        debug!("checking file `{}`", file.name);
        let bctx = BodyCtx {
            file: file.name.clone(),
            owner: None,
            ret: None,
            type_args: Vec::new(),
            method_args: Vec::new(),
        };
        let mut env = Env::new();
        env.push_frame(false, 0);
        let mut typed = Vec::new();
        for expr in &file.exprs {
            typed.push(self.type_expr(expr, None, &mut env, &bctx)?);
        }
        let frame = env.pop_frame();

        let span = typed
            .iter()
            .map(|e| e.span)
            .reduce(Span::merge)
            .unwrap_or(Span::point(0));
        let ty = match typed.last() {
            Some(last) => last.ty,
            None => self.unit_ty().map_err(at(span, &file.name))?,
        };
        Ok(TypedFile {
            name: file.name.clone(),
            body: TypedBody {
                expr: TypedExpr {
                    kind: TypedExprKind::Block(typed),
                    ty,
                    span,
                },
                max_locals: frame.max_index,
            },
        })
    }

    /// Drain the body worklist. Checking one body may specialize further
    /// methods, which push more pending bodies; the loop runs dry only when
    /// every reachable body is resolved.
    fn check_pending_bodies(&mut self) -> Result<(), TypeError> {
        while let Some(mid) = self.pending.pop() {
            self.check_body(mid)?;
        }
        Ok(())
    }

    fn check_body(&mut self, mid: MethodId) -> Result<(), TypeError> {
        let instance = &mut self.methods[mid.0 as usize];
        let MethodKind::Snuggle { body } = &mut instance.kind else {
            return Ok(());
        };
        let state = mem::replace(body, BodyState::Resolving);
        let pending = match state {
            BodyState::Pending(p) => p,
            BodyState::Resolved(done) => {
                *body = BodyState::Resolved(done);
                return Ok(());
            }
            BodyState::Resolving => {
                let name = instance.runtime_name.clone();
                let owner = instance.owner;
                let file = self.origin_file(owner);
                return Err(TypeError::new(
                    TypeErrorKind::Internal(format!("body of `{name}` re-entered while resolving")),
                    Span::point(0),
                    file,
                ));
            }
        };

        let owner = instance.owner;
        let params = instance.params.clone();
        let ret = instance.ret;
        let is_static = instance.is_static;
        trace!("checking body of {}", instance.runtime_name);

        let file = self.origin_file(owner);
        let span = pending.method.span;
        let bctx = BodyCtx {
            file,
            owner: Some(owner),
            ret: Some(ret),
            type_args: pending.type_args.clone(),
            method_args: pending.method_args.clone(),
        };

        let mut env = Env::new();
        env.push_frame(false, 0);
        if !is_static {
            let slots = if self.def(owner).is_plural() {
                self.slots_mut(owner).map_err(at(span, &bctx.file))?
            } else {
                1
            };
            env.declare("this", owner, slots);
        }
        for (pattern, ty) in pending.method.params.iter().zip(&params) {
            self.bind_pattern(pattern, *ty, &mut env, &bctx, false)?;
        }

        let unit = self.unit_ty().map_err(at(span, &bctx.file))?;
        let expected = if ret == unit { None } else { Some(ret) };
        let mut body_expr = self.type_expr(&pending.method.body, expected, &mut env, &bctx)?;
        if ret != unit && !always_returns(&body_expr) {
            if !self.can_coerce(&body_expr, ret) {
                return Err(TypeError::new(
                    TypeErrorKind::Mismatch {
                        expected: self.display(ret),
                        found: self.display(body_expr.ty),
                    },
                    body_expr.span,
                    &bctx.file,
                ));
            }
            self.coerce(&mut body_expr, ret);
        }
        let frame = env.pop_frame();

        let MethodKind::Snuggle { body } = &mut self.methods[mid.0 as usize].kind else {
            unreachable!("kind checked above");
        };
        *body = BodyState::Resolved(TypedBody {
            expr: body_expr,
            max_locals: frame.max_index,
        });
        Ok(())
    }

    /// Bind a pattern's names against a value type. With `check_declared`,
    /// ascriptions are verified (and a strict-subtype ascription -- a
    /// fallible pattern -- is reported as unsupported); without it, the
    /// value types are trusted (parameters, whose declared types built the
    /// signature in the first place).
    fn bind_pattern(
        &mut self,
        pattern: &ResolvedPattern,
        value_ty: TypeId,
        env: &mut Env,
        bctx: &BodyCtx,
        check_declared: bool,
    ) -> Result<Vec<BindingSlot>, TypeError> {
        match &pattern.kind {
            ResolvedPatternKind::Binding { name, ty } => {
                let bound_ty = match ty {
                    Some(rt) if check_declared => {
                        let declared = self.instantiate(
                            rt,
                            &bctx.type_args,
                            &bctx.method_args,
                            pattern.span,
                            &bctx.file,
                        )?;
                        if declared != value_ty {
                            if self.is_subtype(declared, value_ty) {
                                return Err(TypeError::new(
                                    TypeErrorKind::NotYetSupported("fallible patterns"),
                                    pattern.span,
                                    &bctx.file,
                                ));
                            }
                            if !self.is_subtype(value_ty, declared) {
                                return Err(TypeError::new(
                                    TypeErrorKind::Mismatch {
                                        expected: self.display(declared),
                                        found: self.display(value_ty),
                                    },
                                    pattern.span,
                                    &bctx.file,
                                ));
                            }
                        }
                        declared
                    }
                    _ => value_ty,
                };
                let slots = self.slots_mut(bound_ty).map_err(at(pattern.span, &bctx.file))?;
                let index = env.declare(name, bound_ty, slots);
                Ok(vec![BindingSlot {
                    name: name.clone(),
                    index,
                    ty: bound_ty,
                }])
            }
            ResolvedPatternKind::Tuple(elems) => {
                let fields = self.instance_fields(value_ty);
                if !self.def(value_ty).is_plural() || fields.len() != elems.len() {
                    return Err(TypeError::new(
                        TypeErrorKind::Mismatch {
                            expected: format!("a {}-field plural value", elems.len()),
                            found: self.display(value_ty),
                        },
                        pattern.span,
                        &bctx.file,
                    ));
                }
                let mut out = Vec::new();
                for (sub, field) in elems.iter().zip(fields) {
                    out.extend(self.bind_pattern(sub, field.ty, env, bctx, check_declared)?);
                }
                Ok(out)
            }
        }
    }

    fn type_exprs(
        &mut self,
        exprs: &[ResolvedExpr],
        env: &mut Env,
        bctx: &BodyCtx,
    ) -> Result<Vec<TypedExpr>, TypeError> {
        exprs
            .iter()
            .map(|e| self.type_expr(e, None, env, bctx))
            .collect()
    }

    // ── Expression typing ──────────────────────────────────────────────

    fn type_expr(
        &mut self,
        expr: &ResolvedExpr,
        expected: Option<TypeId>,
        env: &mut Env,
        bctx: &BodyCtx,
    ) -> Result<TypedExpr, TypeError> {
        let span = expr.span;
        let err = |kind| TypeError::new(kind, span, &bctx.file);
        match &expr.kind {
            ResolvedExprKind::Import(path) => {
                let unit = self.unit_ty().map_err(at(span, &bctx.file))?;
                Ok(TypedExpr {
                    kind: TypedExprKind::Import(path.clone()),
                    ty: unit,
                    span,
                })
            }

            ResolvedExprKind::IntLiteral { value, width } => {
                let (ty, constant) = match width {
                    Some(w) => {
                        if !int_fits(*value, *w) {
                            return Err(err(TypeErrorKind::Mismatch {
                                expected: w.name().to_string(),
                                found: format!("out-of-range literal `{value}`"),
                            }));
                        }
                        (
                            self.int_ty(*w).map_err(at(span, &bctx.file))?,
                            Constant::Int(*w, *value),
                        )
                    }
                    None => {
                        let lit = self.int_literal_ty().map_err(at(span, &bctx.file))?;
                        (lit, Constant::IntLit(*value))
                    }
                };
                let mut typed = TypedExpr {
                    kind: TypedExprKind::Literal(constant),
                    ty,
                    span,
                };
                if let Some(exp) = expected {
                    if self.can_coerce(&typed, exp) {
                        self.coerce(&mut typed, exp);
                    }
                }
                Ok(typed)
            }

            ResolvedExprKind::FloatLiteral { value, width } => {
                let w = width.unwrap_or_else(|| {
                    expected
                        .and_then(|e| self.def(e).float_width())
                        .unwrap_or(FloatWidth::F64)
                });
                Ok(TypedExpr {
                    kind: TypedExprKind::Literal(Constant::Float(w, *value)),
                    ty: self.float_ty(w).map_err(at(span, &bctx.file))?,
                    span,
                })
            }

            ResolvedExprKind::BoolLiteral(b) => Ok(TypedExpr {
                kind: TypedExprKind::Literal(Constant::Bool(*b)),
                ty: self.bool_ty().map_err(at(span, &bctx.file))?,
                span,
            }),

            ResolvedExprKind::StringLiteral(s) => Ok(TypedExpr {
                kind: TypedExprKind::Literal(Constant::Str(s.clone())),
                ty: self.string_ty().map_err(at(span, &bctx.file))?,
                span,
            }),

            ResolvedExprKind::Variable(name) => match env.lookup(name) {
                Some(VarRef::Local(binding)) => Ok(TypedExpr {
                    kind: TypedExprKind::Local {
                        name: name.clone(),
                        index: binding.index,
                    },
                    ty: binding.ty,
                    span,
                }),
                Some(VarRef::Capture(index, ty)) => Ok(TypedExpr {
                    kind: TypedExprKind::Capture { index },
                    ty,
                    span,
                }),
                None => Err(err(TypeErrorKind::Internal(format!(
                    "local `{name}` escaped resolution"
                )))),
            },

            ResolvedExprKind::StaticFieldAccess { ty, name } => {
                let owner =
                    self.instantiate(ty, &bctx.type_args, &bctx.method_args, span, &bctx.file)?;
                let Some(idx) = self
                    .fields(owner)
                    .iter()
                    .position(|f| f.is_static && f.name == *name)
                else {
                    return Err(err(TypeErrorKind::UnknownField {
                        ty: self.display(owner),
                        field: name.clone(),
                    }));
                };
                let field_ty = self.fields(owner)[idx].ty;
                Ok(TypedExpr {
                    kind: TypedExprKind::StaticField { owner, field: idx },
                    ty: field_ty,
                    span,
                })
            }

            ResolvedExprKind::FieldAccess { receiver, name } => {
                let mut recv = self.type_expr(receiver, None, env, bctx)?;
                self.materialize_default(&mut recv).map_err(at(span, &bctx.file))?;
                let Some((owner, idx)) = self.lookup_field(recv.ty, name) else {
                    return Err(err(TypeErrorKind::UnknownField {
                        ty: self.display(recv.ty),
                        field: name.clone(),
                    }));
                };
                let field_ty = self.fields(owner)[idx].ty;
                Ok(TypedExpr {
                    kind: TypedExprKind::Field {
                        receiver: Box::new(recv),
                        owner,
                        field: idx,
                    },
                    ty: field_ty,
                    span,
                })
            }

            ResolvedExprKind::MethodCall { receiver, name, generics, args } => {
                let mut recv = self.type_expr(receiver, None, env, bctx)?;
                let explicit = self.instantiate_all(generics, span, bctx)?;
                let mut typed_args = self.type_exprs(args, env, bctx)?;

                // Int literals first try their const methods; when folding
                // does not apply, they materialize and take the runtime path.
                if self.def(recv.ty).is_int_literal() {
                    if let Ok((mid, _)) = self.resolve_call(
                        recv.ty, name, &explicit, &mut typed_args, false, false, span, bctx,
                    ) {
                        if let MethodKind::Const { fold } = self.method(mid).kind {
                            if let Some(folded) = try_fold(fold, &recv, &typed_args) {
                                let ret = self.method(mid).ret;
                                let mut typed = TypedExpr {
                                    kind: TypedExprKind::Literal(folded),
                                    ty: ret,
                                    span,
                                };
                                if let Some(exp) = expected {
                                    if self.can_coerce(&typed, exp) {
                                        self.coerce(&mut typed, exp);
                                    }
                                }
                                return Ok(typed);
                            }
                        }
                    }
                    self.materialize_default(&mut recv).map_err(at(span, &bctx.file))?;
                }

                let (mid, call) = self.resolve_call(
                    recv.ty, name, &explicit, &mut typed_args, false, false, span, bctx,
                )?;
                let ret = self.method(mid).ret;
                Ok(TypedExpr {
                    kind: TypedExprKind::Call {
                        call,
                        method: mid,
                        receiver: Some(Box::new(recv)),
                        args: typed_args,
                    },
                    ty: ret,
                    span,
                })
            }

            ResolvedExprKind::StaticMethodCall { ty, name, generics, args } => {
                let owner =
                    self.instantiate(ty, &bctx.type_args, &bctx.method_args, span, &bctx.file)?;
                let explicit = self.instantiate_all(generics, span, bctx)?;
                let mut typed_args = self.type_exprs(args, env, bctx)?;
                let (mid, call) = self.resolve_call(
                    owner, name, &explicit, &mut typed_args, true, false, span, bctx,
                )?;
                let ret = self.method(mid).ret;
                Ok(TypedExpr {
                    kind: TypedExprKind::Call {
                        call,
                        method: mid,
                        receiver: None,
                        args: typed_args,
                    },
                    ty: ret,
                    span,
                })
            }

            ResolvedExprKind::SuperMethodCall { name, generics, args } => {
                let owner = bctx.owner.ok_or_else(|| {
                    err(TypeErrorKind::Internal("`super` outside a method body".to_string()))
                })?;
                let sup = self.supertype(owner).ok_or_else(|| {
                    err(TypeErrorKind::Internal(format!(
                        "`{}` has no supertype for `super`",
                        self.display(owner)
                    )))
                })?;
                let explicit = self.instantiate_all(generics, span, bctx)?;
                let mut typed_args = self.type_exprs(args, env, bctx)?;
                let (mid, _) = self.resolve_call(
                    sup, name, &explicit, &mut typed_args, false, false, span, bctx,
                )?;
                let ret = self.method(mid).ret;
                let this = TypedExpr {
                    kind: TypedExprKind::Local {
                        name: "this".to_string(),
                        index: 0,
                    },
                    ty: owner,
                    span,
                };
                Ok(TypedExpr {
                    kind: TypedExprKind::Call {
                        call: CallKind::Special,
                        method: mid,
                        receiver: Some(Box::new(this)),
                        args: typed_args,
                    },
                    ty: ret,
                    span,
                })
            }

            ResolvedExprKind::ConstructorCall { ty, args } => {
                let cls =
                    self.instantiate(ty, &bctx.type_args, &bctx.method_args, span, &bctx.file)?;
                if !matches!(self.def(cls).kind, TypeKind::Class) {
                    return Err(err(TypeErrorKind::InvalidConstructorTarget {
                        ty: self.display(cls),
                    }));
                }
                let mut typed_args = self.type_exprs(args, env, bctx)?;
                let (mid, _) = self.resolve_call(
                    cls, "new", &[], &mut typed_args, false, true, span, bctx,
                )?;
                Ok(TypedExpr {
                    kind: TypedExprKind::New { ctor: mid, args: typed_args },
                    ty: cls,
                    span,
                })
            }

            ResolvedExprKind::RawStructConstructor { ty, fields } => {
                let st =
                    self.instantiate(ty, &bctx.type_args, &bctx.method_args, span, &bctx.file)?;
                if !matches!(self.def(st).kind, TypeKind::Struct) {
                    return Err(err(TypeErrorKind::NotAStruct { ty: self.display(st) }));
                }
                let def_fields = self.instance_fields(st);
                for (name, _) in fields {
                    if !def_fields.iter().any(|f| &f.name == name) {
                        return Err(err(TypeErrorKind::UnknownField {
                            ty: self.display(st),
                            field: name.clone(),
                        }));
                    }
                }
                let mut values = Vec::with_capacity(def_fields.len());
                for field in &def_fields {
                    let Some((_, value)) = fields.iter().find(|(n, _)| *n == field.name) else {
                        return Err(err(TypeErrorKind::MissingField {
                            ty: self.display(st),
                            field: field.name.clone(),
                        }));
                    };
                    let mut v = self.type_expr(value, Some(field.ty), env, bctx)?;
                    if !self.can_coerce(&v, field.ty) {
                        return Err(TypeError::new(
                            TypeErrorKind::Mismatch {
                                expected: self.display(field.ty),
                                found: self.display(v.ty),
                            },
                            v.span,
                            &bctx.file,
                        ));
                    }
                    self.coerce(&mut v, field.ty);
                    values.push(v);
                }
                Ok(TypedExpr {
                    kind: TypedExprKind::RawStruct { values },
                    ty: st,
                    span,
                })
            }

            ResolvedExprKind::Tuple(elems) => {
                if let Some(exp) = expected {
                    let exp_def = self.def(exp);
                    if exp_def.is_plural()
                        && exp_def.kind != TypeKind::Enum
                        && self.instance_fields(exp).len() == elems.len()
                    {
                        let field_tys: Vec<TypeId> =
                            self.instance_fields(exp).iter().map(|f| f.ty).collect();
                        let mut values = Vec::with_capacity(elems.len());
                        for (e, t) in elems.iter().zip(field_tys) {
                            let mut v = self.type_expr(e, Some(t), env, bctx)?;
                            if !self.can_coerce(&v, t) {
                                return Err(TypeError::new(
                                    TypeErrorKind::Mismatch {
                                        expected: self.display(t),
                                        found: self.display(v.ty),
                                    },
                                    v.span,
                                    &bctx.file,
                                ));
                            }
                            self.coerce(&mut v, t);
                            values.push(v);
                        }
                        return Ok(TypedExpr {
                            kind: TypedExprKind::RawStruct { values },
                            ty: exp,
                            span,
                        });
                    }
                }
                let mut values = self.type_exprs(elems, env, bctx)?;
                for v in &mut values {
                    self.materialize_default(v).map_err(at(span, &bctx.file))?;
                }
                let tys = values.iter().map(|v| v.ty).collect();
                let ty = self.tuple_type(tys).map_err(at(span, &bctx.file))?;
                Ok(TypedExpr {
                    kind: TypedExprKind::RawStruct { values },
                    ty,
                    span,
                })
            }

            ResolvedExprKind::Lambda { params, ret, body } => {
                self.type_lambda(params, ret.as_ref(), body, expected, env, bctx, span)
            }

            ResolvedExprKind::Declaration { pattern, value } => {
                let ascribed = match &pattern.kind {
                    ResolvedPatternKind::Binding { ty: Some(rt), .. } => Some(self.instantiate(
                        rt,
                        &bctx.type_args,
                        &bctx.method_args,
                        pattern.span,
                        &bctx.file,
                    )?),
                    _ => None,
                };
                let mut value_t = self.type_expr(value, ascribed, env, bctx)?;
                match ascribed {
                    Some(exp) => {
                        if !self.can_coerce(&value_t, exp) {
                            if self.is_subtype(exp, value_t.ty) {
                                return Err(err(TypeErrorKind::NotYetSupported(
                                    "fallible patterns",
                                )));
                            }
                            return Err(TypeError::new(
                                TypeErrorKind::Mismatch {
                                    expected: self.display(exp),
                                    found: self.display(value_t.ty),
                                },
                                value_t.span,
                                &bctx.file,
                            ));
                        }
                        self.coerce(&mut value_t, exp);
                    }
                    None => {
                        self.materialize_default(&mut value_t).map_err(at(span, &bctx.file))?;
                    }
                }
                let slots = self.bind_pattern(pattern, value_t.ty, env, bctx, true)?;
                let unit = self.unit_ty().map_err(at(span, &bctx.file))?;
                Ok(TypedExpr {
                    kind: TypedExprKind::Declare {
                        slots,
                        value: Box::new(value_t),
                    },
                    ty: unit,
                    span,
                })
            }

            ResolvedExprKind::Assignment { lhs, rhs } => {
                let lhs_t = self.type_expr(lhs, None, env, bctx)?;
                let assignable = match &lhs_t.kind {
                    TypedExprKind::Local { .. } | TypedExprKind::Field { .. } => true,
                    TypedExprKind::StaticField { owner, field } => {
                        self.fields(*owner)[*field].const_index.is_none()
                    }
                    _ => false,
                };
                if !assignable {
                    return Err(TypeError::new(
                        TypeErrorKind::NotAssignable,
                        lhs_t.span,
                        &bctx.file,
                    ));
                }
                let mut rhs_t = self.type_expr(rhs, Some(lhs_t.ty), env, bctx)?;
                if !self.can_coerce(&rhs_t, lhs_t.ty) {
                    return Err(TypeError::new(
                        TypeErrorKind::Mismatch {
                            expected: self.display(lhs_t.ty),
                            found: self.display(rhs_t.ty),
                        },
                        rhs_t.span,
                        &bctx.file,
                    ));
                }
                self.coerce(&mut rhs_t, lhs_t.ty);
                let unit = self.unit_ty().map_err(at(span, &bctx.file))?;
                Ok(TypedExpr {
                    kind: TypedExprKind::Assign {
                        lhs: Box::new(lhs_t),
                        rhs: Box::new(rhs_t),
                    },
                    ty: unit,
                    span,
                })
            }

            ResolvedExprKind::Return(value) => {
                let Some(ret) = bctx.ret else {
                    return Err(err(TypeErrorKind::ReturnOutsideMethod));
                };
                let unit = self.unit_ty().map_err(at(span, &bctx.file))?;
                let value_t = match value {
                    Some(inner) => {
                        let mut t = self.type_expr(inner, Some(ret), env, bctx)?;
                        if !self.can_coerce(&t, ret) {
                            return Err(TypeError::new(
                                TypeErrorKind::Mismatch {
                                    expected: self.display(ret),
                                    found: self.display(t.ty),
                                },
                                t.span,
                                &bctx.file,
                            ));
                        }
                        self.coerce(&mut t, ret);
                        Some(Box::new(t))
                    }
                    None => {
                        if ret != unit {
                            return Err(err(TypeErrorKind::Mismatch {
                                expected: self.display(ret),
                                found: "()".to_string(),
                            }));
                        }
                        None
                    }
                };
                Ok(TypedExpr {
                    kind: TypedExprKind::Return(value_t),
                    ty: unit,
                    span,
                })
            }

            ResolvedExprKind::If { cond, then, els } => {
                let bool_ty = self.bool_ty().map_err(at(span, &bctx.file))?;
                let cond_t = self.type_expr(cond, Some(bool_ty), env, bctx)?;
                if cond_t.ty != bool_ty {
                    return Err(TypeError::new(
                        TypeErrorKind::Mismatch {
                            expected: "bool".to_string(),
                            found: self.display(cond_t.ty),
                        },
                        cond_t.span,
                        &bctx.file,
                    ));
                }
                let unit = self.unit_ty().map_err(at(span, &bctx.file))?;
                match els {
                    None => {
                        let then_t = self.type_expr(then, None, env, bctx)?;
                        Ok(TypedExpr {
                            kind: TypedExprKind::If {
                                cond: Box::new(cond_t),
                                then: Box::new(then_t),
                                els: None,
                            },
                            ty: unit,
                            span,
                        })
                    }
                    Some(els) => {
                        let mut then_t = self.type_expr(then, expected, env, bctx)?;
                        if expected.is_none() {
                            self.materialize_default(&mut then_t).map_err(at(span, &bctx.file))?;
                        }
                        let mut els_t =
                            self.type_expr(els, expected.or(Some(then_t.ty)), env, bctx)?;
                        let ty = if let Some(exp) = expected {
                            for branch in [&mut then_t, &mut els_t] {
                                if !always_returns(branch) {
                                    if !self.can_coerce(branch, exp) {
                                        return Err(TypeError::new(
                                            TypeErrorKind::Mismatch {
                                                expected: self.display(exp),
                                                found: self.display(branch.ty),
                                            },
                                            branch.span,
                                            &bctx.file,
                                        ));
                                    }
                                    self.coerce(branch, exp);
                                }
                            }
                            exp
                        } else if always_returns(&then_t) {
                            els_t.ty
                        } else if always_returns(&els_t) {
                            then_t.ty
                        } else if self.can_coerce(&els_t, then_t.ty) {
                            self.coerce(&mut els_t, then_t.ty);
                            then_t.ty
                        } else if self.can_coerce(&then_t, els_t.ty) {
                            self.coerce(&mut then_t, els_t.ty);
                            els_t.ty
                        } else {
                            return Err(err(TypeErrorKind::Mismatch {
                                expected: self.display(then_t.ty),
                                found: self.display(els_t.ty),
                            }));
                        };
                        Ok(TypedExpr {
                            kind: TypedExprKind::If {
                                cond: Box::new(cond_t),
                                then: Box::new(then_t),
                                els: Some(Box::new(els_t)),
                            },
                            ty,
                            span,
                        })
                    }
                }
            }

            ResolvedExprKind::While { cond, body } => {
                let bool_ty = self.bool_ty().map_err(at(span, &bctx.file))?;
                let cond_t = self.type_expr(cond, Some(bool_ty), env, bctx)?;
                if cond_t.ty != bool_ty {
                    return Err(TypeError::new(
                        TypeErrorKind::Mismatch {
                            expected: "bool".to_string(),
                            found: self.display(cond_t.ty),
                        },
                        cond_t.span,
                        &bctx.file,
                    ));
                }
                let body_t = self.type_expr(body, None, env, bctx)?;
                let unit = self.unit_ty().map_err(at(span, &bctx.file))?;
                Ok(TypedExpr {
                    kind: TypedExprKind::While {
                        cond: Box::new(cond_t),
                        body: Box::new(body_t),
                    },
                    ty: unit,
                    span,
                })
            }

            ResolvedExprKind::Block(exprs) => {
                let saved = env.save_vars();
                let mut out = Vec::with_capacity(exprs.len());
                for (i, e) in exprs.iter().enumerate() {
                    let exp = if i + 1 == exprs.len() { expected } else { None };
                    out.push(self.type_expr(e, exp, env, bctx)?);
                }
                env.restore_vars(saved);
                let ty = match out.last() {
                    Some(last) => last.ty,
                    None => self.unit_ty().map_err(at(span, &bctx.file))?,
                };
                Ok(TypedExpr {
                    kind: TypedExprKind::Block(out),
                    ty,
                    span,
                })
            }
        }
    }

    fn instantiate_all(
        &mut self,
        types: &[ResolvedType],
        span: Span,
        bctx: &BodyCtx,
    ) -> Result<Vec<TypeId>, TypeError> {
        types
            .iter()
            .map(|t| self.instantiate(t, &bctx.type_args, &bctx.method_args, span, &bctx.file))
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn type_lambda(
        &mut self,
        params: &[ResolvedPattern],
        ret: Option<&ResolvedType>,
        body: &Rc<ResolvedExpr>,
        expected: Option<TypeId>,
        env: &mut Env,
        bctx: &BodyCtx,
        span: Span,
    ) -> Result<TypedExpr, TypeError> {
        // Parameter and return types from the expected function type, when
        // there is one.
        let expected_fn: Option<Vec<TypeId>> = expected.and_then(|e| {
            (self.def(e).kind == TypeKind::Func).then(|| self.def(e).args.clone())
        });

        let mut param_tys = Vec::with_capacity(params.len());
        for (i, p) in params.iter().enumerate() {
            let declared = match pattern_declared_ty(p) {
                Ok(rt) => Some(self.instantiate(
                    &rt,
                    &bctx.type_args,
                    &bctx.method_args,
                    p.span,
                    &bctx.file,
                )?),
                Err(_) => None,
            };
            let from_expected = expected_fn
                .as_ref()
                .filter(|a| i + 1 < a.len())
                .map(|a| a[i]);
            let ty = declared.or(from_expected).ok_or_else(|| {
                let name = p.bound_name();
                TypeError::new(
                    TypeErrorKind::CannotInferLambdaParam { name },
                    p.span,
                    &bctx.file,
                )
            })?;
            param_tys.push(ty);
        }

        let declared_ret = match ret {
            Some(rt) => Some(self.instantiate(
                rt,
                &bctx.type_args,
                &bctx.method_args,
                span,
                &bctx.file,
            )?),
            None => expected_fn.as_ref().and_then(|a| a.last().copied()),
        };

        // Slot 0 of the invoke method is the closure object itself.
        env.push_frame(true, 1);
        for (p, ty) in params.iter().zip(&param_tys) {
            self.bind_pattern(p, *ty, env, bctx, false)?;
        }
        let unit = self.unit_ty().map_err(at(span, &bctx.file))?;
        let lambda_bctx = BodyCtx {
            file: bctx.file.clone(),
            owner: None,
            ret: declared_ret,
            type_args: bctx.type_args.clone(),
            method_args: bctx.method_args.clone(),
        };
        let body_expected = declared_ret.filter(|r| *r != unit);
        let mut body_t = self.type_expr(body, body_expected, env, &lambda_bctx)?;
        let ret_ty = match declared_ret {
            Some(r) => {
                if r != unit && !always_returns(&body_t) {
                    if !self.can_coerce(&body_t, r) {
                        return Err(TypeError::new(
                            TypeErrorKind::Mismatch {
                                expected: self.display(r),
                                found: self.display(body_t.ty),
                            },
                            body_t.span,
                            &bctx.file,
                        ));
                    }
                    self.coerce(&mut body_t, r);
                }
                r
            }
            None => {
                self.materialize_default(&mut body_t).map_err(at(span, &bctx.file))?;
                body_t.ty
            }
        };
        let frame = env.pop_frame();
        let captures: Vec<CaptureSource> = frame.captures.iter().map(|c| c.source).collect();

        let fty = self
            .func_type(param_tys.clone(), ret_ty)
            .map_err(at(span, &bctx.file))?;

        self.lambda_counter += 1;
        let n = self.lambda_counter;
        let impl_ty = self.alloc_type(
            format!("lambda#{n}"),
            format!("lambda${}${n}", names::mangle(&bctx.file)),
            TypeKind::FuncImpl,
            None,
            Vec::new(),
        );
        let cap_fields = captures
            .iter()
            .enumerate()
            .map(|(i, c)| FieldDef {
                name: format!("cap{i}"),
                ty: c.ty(),
                is_static: false,
                const_index: None,
            })
            .collect();
        self.set_members(
            impl_ty,
            TypeMembers {
                supertype: Some(fty),
                fields: cap_fields,
                methods: Vec::new(),
            },
        );
        self.methods.push(MethodInstance {
            owner: impl_ty,
            name: "invoke".to_string(),
            runtime_name: "invoke".to_string(),
            is_static: false,
            params: param_tys,
            ret: ret_ty,
            kind: MethodKind::Snuggle {
                body: BodyState::Resolved(TypedBody {
                    expr: body_t,
                    max_locals: frame.max_index,
                }),
            },
        });

        Ok(TypedExpr {
            kind: TypedExprKind::Lambda { impl_ty, captures },
            ty: fty,
            span,
        })
    }
}

/// Fold a const method call when the receiver and every argument are
/// compile-time constants.
fn try_fold(
    fold: fn(&[Constant]) -> Option<Constant>,
    recv: &TypedExpr,
    args: &[TypedExpr],
) -> Option<Constant> {
    let mut consts = Vec::with_capacity(args.len() + 1);
    let TypedExprKind::Literal(c) = &recv.kind else { return None };
    consts.push(c.clone());
    for a in args {
        let TypedExprKind::Literal(c) = &a.kind else { return None };
        consts.push(c.clone());
    }
    fold(&consts)
}
