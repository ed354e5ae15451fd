//! The resolution pass.
//!
//! Block resolution runs in two phases over the block's own elements:
//!
//! - **Phase A** walks the children once and allocates an unfulfilled arena
//!   slot for every type definition, binding the name so that siblings can
//!   reference siblings (including mutually, including forward).
//! - **Phase B** walks the children again in order. Expressions resolve
//!   against a scope that grows as it goes: declarations bind locals and
//!   imports expose another file's public types to *later* siblings only.
//!   Each type definition resolves its body and fulfills its slot exactly
//!   once.
//!
//! Imports are file-scoped and memoized: the first import of a file parses
//! and resolves it and caches its public members; later imports hit the
//! cache.

use std::rc::Rc;

use log::debug;
use rustc_hash::FxHashMap;
use snuggle_common::{FileLoader, Span};
use snuggle_parser::ast::{
    FloatWidth, IntWidth, ParsedElement, ParsedExpr, ParsedExprKind, ParsedMethod, ParsedPattern,
    ParsedPatternKind, ParsedType, ParsedTypeDef, ParsedTypeDefKind, ParsedTypeKind,
};

use crate::arena::{
    BuiltinKind, DefArena, DefId, ImplTable, ResolvedTypeDef, SnuggleTypeDef, SnuggleTypeDefKind,
};
use crate::ast::{
    ResolvedExpr, ResolvedExprKind, ResolvedField, ResolvedFile, ResolvedMethod, ResolvedPattern,
    ResolvedPatternKind, ResolvedType,
};
use crate::error::{ResolveError, ResolveErrorKind};
use crate::scope::{Scope, ScopeEntry};

/// Arena handles for the builtin type set, in the order the checker wants
/// to reach them.
#[derive(Debug, Clone)]
pub struct BuiltinIds {
    pub bool_: DefId,
    /// i8, i16, i32, i64.
    pub ints: [DefId; 4],
    /// f32, f64.
    pub floats: [DefId; 2],
    pub object: DefId,
    pub string: DefId,
    pub option: DefId,
    pub print: DefId,
    /// Not bound to any source name.
    pub int_literal: DefId,
    /// One per reflect-registry entry, in registry order.
    pub reflected: Vec<DefId>,
}

impl BuiltinIds {
    /// Allocate fulfilled arena slots for every builtin and bind their
    /// names into a fresh root scope.
    pub fn install(arena: &mut DefArena, reflected_names: &[String]) -> (BuiltinIds, Scope) {
        let mut scope = Scope::new();
        let bind = |arena: &mut DefArena, scope: &mut Scope, name: &str, kind: BuiltinKind| {
            let id = arena.alloc_fulfilled(name, ResolvedTypeDef::Builtin(kind));
            scope.bind(name, ScopeEntry::Type(id));
            id
        };

        let bool_ = bind(arena, &mut scope, "bool", BuiltinKind::Bool);
        let ints = [
            bind(arena, &mut scope, "i8", BuiltinKind::Int(IntWidth::I8)),
            bind(arena, &mut scope, "i16", BuiltinKind::Int(IntWidth::I16)),
            bind(arena, &mut scope, "i32", BuiltinKind::Int(IntWidth::I32)),
            bind(arena, &mut scope, "i64", BuiltinKind::Int(IntWidth::I64)),
        ];
        let floats = [
            bind(arena, &mut scope, "f32", BuiltinKind::Float(FloatWidth::F32)),
            bind(arena, &mut scope, "f64", BuiltinKind::Float(FloatWidth::F64)),
        ];
        let object = bind(arena, &mut scope, "object", BuiltinKind::Object);
        let string = bind(arena, &mut scope, "string", BuiltinKind::Str);
        let option = bind(arena, &mut scope, "Option", BuiltinKind::OptionType);
        let print = bind(arena, &mut scope, "print", BuiltinKind::Print);
        // The int-literal type has no source name; nothing binds it.
        let int_literal =
            arena.alloc_fulfilled("<int literal>", ResolvedTypeDef::Builtin(BuiltinKind::IntLiteral));

        let mut reflected = Vec::with_capacity(reflected_names.len());
        for (index, name) in reflected_names.iter().enumerate() {
            let id = arena.alloc_fulfilled(name, ResolvedTypeDef::Reflected(index));
            scope.bind(name, ScopeEntry::Type(id));
            reflected.push(id);
        }

        let ids = BuiltinIds {
            bool_,
            ints,
            floats,
            object,
            string,
            option,
            print,
            int_literal,
            reflected,
        };
        (ids, scope)
    }
}

/// Everything the resolution pass produces.
#[derive(Debug)]
pub struct ResolvedProgram {
    pub arena: DefArena,
    pub impls: ImplTable,
    /// Resolved files in completion order: a file's imports finish before
    /// it does, so the entry file is last.
    pub files: Vec<ResolvedFile>,
    pub builtins: BuiltinIds,
}

/// Resolve a whole program starting from its entry file.
///
/// `reflected_names` are the Snuggle-visible names of the reflect
/// registry's classes, in registry order; they become part of the builtin
/// type set.
pub fn resolve_program(
    entry: &str,
    loader: &dyn FileLoader,
    reflected_names: &[String],
) -> Result<ResolvedProgram, ResolveError> {
    let mut arena = DefArena::new();
    let (builtins, root_scope) = BuiltinIds::install(&mut arena, reflected_names);
    let mut resolver = Resolver {
        loader,
        arena,
        impls: ImplTable::default(),
        files: Vec::new(),
        exports_cache: FxHashMap::default(),
        resolving: Vec::new(),
        root_scope,
    };
    resolver.resolve_file(entry, Span::point(0), entry)?;
    Ok(ResolvedProgram {
        arena: resolver.arena,
        impls: resolver.impls,
        files: resolver.files,
        builtins,
    })
}

/// Per-expression context: which file we are in and whether `super` is
/// currently legal (directly inside a non-static class method).
#[derive(Clone)]
struct Ctx {
    file: String,
    in_class_method: bool,
}

struct Resolver<'a> {
    loader: &'a dyn FileLoader,
    arena: DefArena,
    impls: ImplTable,
    files: Vec<ResolvedFile>,
    /// File-public-members cache, keyed by file name. Grows monotonically.
    exports_cache: FxHashMap<String, Rc<Vec<(String, DefId)>>>,
    /// Files currently being resolved, for import-cycle detection.
    resolving: Vec<String>,
    root_scope: Scope,
}

type ExposedTypes = Vec<(String, DefId)>;

impl Resolver<'_> {
    /// Resolve a file (memoized) and return its public type-defs.
    fn resolve_file(
        &mut self,
        name: &str,
        import_span: Span,
        importer: &str,
    ) -> Result<Rc<ExposedTypes>, ResolveError> {
        if let Some(exports) = self.exports_cache.get(name) {
            return Ok(Rc::clone(exports));
        }
        if self.resolving.iter().any(|f| f == name) {
            return Err(ResolveError::new(
                ResolveErrorKind::ImportCycle(name.to_string()),
                import_span,
                importer,
            ));
        }
        let Some(source) = self.loader.load(name) else {
            return Err(ResolveError::new(
                ResolveErrorKind::MissingFile(name.to_string()),
                import_span,
                importer,
            ));
        };
        debug!("resolving file `{name}`");
        let parsed = snuggle_parser::parse(name, source).map_err(|err| {
            let span = err.span;
            ResolveError::new(ResolveErrorKind::Parse(err), span, name)
        })?;

        self.resolving.push(name.to_string());
        let ctx = Ctx {
            file: name.to_string(),
            in_class_method: false,
        };
        let scope = self.root_scope.clone();
        let result = self.resolve_block(&parsed.elements, &scope, &ctx);
        self.resolving.pop();
        let (exprs, exposed) = result?;

        self.files.push(ResolvedFile {
            name: name.to_string(),
            exprs,
        });
        let exports = Rc::new(exposed);
        self.exports_cache
            .insert(name.to_string(), Rc::clone(&exports));
        debug!("file `{name}` exposes {} public type(s)", exports.len());
        Ok(exports)
    }

    /// Two-phase resolution of one block's elements.
    fn resolve_block(
        &mut self,
        elements: &[ParsedElement],
        parent_scope: &Scope,
        ctx: &Ctx,
    ) -> Result<(Vec<ResolvedExpr>, ExposedTypes), ResolveError> {
        let mut scope = parent_scope.clone();
        let mut exposed = ExposedTypes::new();

        // Phase A: pre-declare every type definition so siblings can
        // reference each other regardless of order. `impl` blocks declare
        // nothing.
        let mut ids: Vec<Option<DefId>> = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                ParsedElement::TypeDef(def)
                    if !matches!(def.kind, ParsedTypeDefKind::Impl { .. }) =>
                {
                    let id = self.arena.alloc(&def.name);
                    scope.bind(&def.name, ScopeEntry::Type(id));
                    if def.is_pub {
                        exposed.push((def.name.clone(), id));
                    }
                    ids.push(Some(id));
                }
                _ => ids.push(None),
            }
        }

        // Phase B: in-order resolution, threading the growing scope.
        let mut exprs = Vec::new();
        for (element, id) in elements.iter().zip(ids) {
            match element {
                ParsedElement::Expr(expr) => {
                    let resolved = self.resolve_expr(expr, &scope, ctx)?;
                    match &expr.kind {
                        ParsedExprKind::Import(path) => {
                            // Cached by resolve_expr already; bind the
                            // exposed types for later siblings.
                            let exports = self.resolve_file(path, expr.span, &ctx.file)?;
                            for (name, def) in exports.iter() {
                                scope.bind(name, ScopeEntry::Type(*def));
                            }
                        }
                        ParsedExprKind::Declaration { pattern, .. } => {
                            for name in pattern.bound_names() {
                                scope.bind(name, ScopeEntry::Local);
                            }
                        }
                        _ => {}
                    }
                    exprs.push(resolved);
                }
                ParsedElement::TypeDef(def) => {
                    self.resolve_type_def(def, id, &scope, ctx)?;
                }
            }
        }

        Ok((exprs, exposed))
    }

    /// Resolve one type definition's body and fulfill its slot.
    fn resolve_type_def(
        &mut self,
        def: &ParsedTypeDef,
        id: Option<DefId>,
        scope: &Scope,
        ctx: &Ctx,
    ) -> Result<(), ResolveError> {
        if let ParsedTypeDefKind::Impl { methods } = &def.kind {
            let Some(target) = scope.type_of(&def.name) else {
                return Err(ResolveError::new(
                    ResolveErrorKind::InvalidImplTarget(def.name.clone()),
                    def.span,
                    &ctx.file,
                ));
            };
            let mut resolved = Vec::with_capacity(methods.len());
            for method in methods {
                resolved.push(self.resolve_method(method, scope, ctx, false)?);
            }
            self.impls.entry(target).or_default().extend(resolved);
            return Ok(());
        }

        let id = id.expect("non-impl type-defs are pre-declared in phase A");

        let resolved_def = match &def.kind {
            ParsedTypeDefKind::Alias(target) => {
                let ty = self.resolve_type(target, scope, ctx)?;
                ResolvedTypeDef::Alias(ty)
            }
            ParsedTypeDefKind::Class { supertype, fields, methods } => {
                let mut type_scope = scope.clone();
                for (i, param) in def.type_params.iter().enumerate() {
                    type_scope.bind(param, ScopeEntry::TypeParam(i));
                }
                let supertype = supertype
                    .as_ref()
                    .map(|t| self.resolve_type(t, &type_scope, ctx))
                    .transpose()?;
                let fields = self.resolve_fields(fields, &type_scope, ctx)?;
                let methods = self.resolve_methods(methods, &type_scope, ctx, true)?;
                ResolvedTypeDef::Snuggle(SnuggleTypeDef {
                    name: def.name.clone(),
                    file: ctx.file.clone(),
                    is_pub: def.is_pub,
                    type_params: def.type_params.clone(),
                    kind: SnuggleTypeDefKind::Class { supertype, fields, methods },
                    span: def.span,
                })
            }
            ParsedTypeDefKind::Struct { fields, methods } => {
                let mut type_scope = scope.clone();
                for (i, param) in def.type_params.iter().enumerate() {
                    type_scope.bind(param, ScopeEntry::TypeParam(i));
                }
                let fields = self.resolve_fields(fields, &type_scope, ctx)?;
                let methods = self.resolve_methods(methods, &type_scope, ctx, false)?;
                ResolvedTypeDef::Snuggle(SnuggleTypeDef {
                    name: def.name.clone(),
                    file: ctx.file.clone(),
                    is_pub: def.is_pub,
                    type_params: def.type_params.clone(),
                    kind: SnuggleTypeDefKind::Struct { fields, methods },
                    span: def.span,
                })
            }
            ParsedTypeDefKind::Enum { variants, methods } => {
                let methods = self.resolve_methods(methods, scope, ctx, false)?;
                ResolvedTypeDef::Snuggle(SnuggleTypeDef {
                    name: def.name.clone(),
                    file: ctx.file.clone(),
                    is_pub: def.is_pub,
                    type_params: Vec::new(),
                    kind: SnuggleTypeDefKind::Enum {
                        variants: variants.clone(),
                        methods,
                    },
                    span: def.span,
                })
            }
            ParsedTypeDefKind::Impl { .. } => unreachable!("handled above"),
        };

        if !self.arena.fulfill(id, resolved_def) {
            return Err(ResolveError::new(
                ResolveErrorKind::DoubleFulfillment(def.name.clone()),
                def.span,
                &ctx.file,
            ));
        }
        Ok(())
    }

    fn resolve_fields(
        &mut self,
        fields: &[snuggle_parser::ast::ParsedField],
        scope: &Scope,
        ctx: &Ctx,
    ) -> Result<Vec<ResolvedField>, ResolveError> {
        fields
            .iter()
            .map(|f| {
                Ok(ResolvedField {
                    name: f.name.clone(),
                    ty: self.resolve_type(&f.ty, scope, ctx)?,
                    is_static: f.is_static,
                    span: f.span,
                })
            })
            .collect()
    }

    fn resolve_methods(
        &mut self,
        methods: &[ParsedMethod],
        scope: &Scope,
        ctx: &Ctx,
        in_class: bool,
    ) -> Result<Vec<Rc<ResolvedMethod>>, ResolveError> {
        methods
            .iter()
            .map(|m| self.resolve_method(m, scope, ctx, in_class))
            .collect()
    }

    /// Resolve one method: its generics become `MethodGeneric` indices, its
    /// parameters become locals, and `this` joins the scope for non-static
    /// methods.
    fn resolve_method(
        &mut self,
        method: &ParsedMethod,
        type_scope: &Scope,
        ctx: &Ctx,
        in_class: bool,
    ) -> Result<Rc<ResolvedMethod>, ResolveError> {
        let mut scope = type_scope.clone();
        for (i, param) in method.type_params.iter().enumerate() {
            scope.bind(param, ScopeEntry::MethodParam(i));
        }

        let mut params = Vec::with_capacity(method.params.len());
        for pattern in &method.params {
            let resolved = self.resolve_pattern(pattern, &scope, ctx)?;
            for name in pattern.bound_names() {
                scope.bind(name, ScopeEntry::Local);
            }
            params.push(resolved);
        }
        if !method.is_static {
            scope.bind("this", ScopeEntry::Local);
        }

        let ret = method
            .ret
            .as_ref()
            .map(|t| self.resolve_type(t, &scope, ctx))
            .transpose()?;

        let body_ctx = Ctx {
            file: ctx.file.clone(),
            in_class_method: in_class && !method.is_static,
        };
        let body = self.resolve_expr(&method.body, &scope, &body_ctx)?;

        Ok(Rc::new(ResolvedMethod {
            name: method.name.clone(),
            is_static: method.is_static,
            type_params: method.type_params.clone(),
            params,
            ret,
            body: Rc::new(body),
            span: method.span,
        }))
    }

    fn resolve_pattern(
        &mut self,
        pattern: &ParsedPattern,
        scope: &Scope,
        ctx: &Ctx,
    ) -> Result<ResolvedPattern, ResolveError> {
        let kind = match &pattern.kind {
            ParsedPatternKind::Binding { name, ty } => ResolvedPatternKind::Binding {
                name: name.clone(),
                ty: ty
                    .as_ref()
                    .map(|t| self.resolve_type(t, scope, ctx))
                    .transpose()?,
            },
            ParsedPatternKind::Tuple(elems) => ResolvedPatternKind::Tuple(
                elems
                    .iter()
                    .map(|p| self.resolve_pattern(p, scope, ctx))
                    .collect::<Result<_, _>>()?,
            ),
        };
        Ok(ResolvedPattern { kind, span: pattern.span })
    }

    /// Map a parsed type to a resolved type, preserving generic parameter
    /// indices.
    fn resolve_type(
        &mut self,
        ty: &ParsedType,
        scope: &Scope,
        ctx: &Ctx,
    ) -> Result<ResolvedType, ResolveError> {
        match &ty.kind {
            ParsedTypeKind::Named { name, args } => match scope.lookup(name) {
                Some(ScopeEntry::Type(id)) => {
                    let args = args
                        .iter()
                        .map(|a| self.resolve_type(a, scope, ctx))
                        .collect::<Result<_, _>>()?;
                    Ok(ResolvedType::Def { id, args })
                }
                Some(ScopeEntry::TypeParam(i)) => {
                    if !args.is_empty() {
                        return Err(ResolveError::new(
                            ResolveErrorKind::GenericTypeParam(name.clone()),
                            ty.span,
                            &ctx.file,
                        ));
                    }
                    Ok(ResolvedType::TypeGeneric(i))
                }
                Some(ScopeEntry::MethodParam(i)) => {
                    if !args.is_empty() {
                        return Err(ResolveError::new(
                            ResolveErrorKind::GenericTypeParam(name.clone()),
                            ty.span,
                            &ctx.file,
                        ));
                    }
                    Ok(ResolvedType::MethodGeneric(i))
                }
                Some(ScopeEntry::Local) | None => Err(ResolveError::new(
                    ResolveErrorKind::UnknownType(name.clone()),
                    ty.span,
                    &ctx.file,
                )),
            },
            ParsedTypeKind::Tuple(elems) => Ok(ResolvedType::Tuple(
                elems
                    .iter()
                    .map(|t| self.resolve_type(t, scope, ctx))
                    .collect::<Result<_, _>>()?,
            )),
            ParsedTypeKind::Func { params, ret } => Ok(ResolvedType::Func {
                params: params
                    .iter()
                    .map(|t| self.resolve_type(t, scope, ctx))
                    .collect::<Result<_, _>>()?,
                ret: Box::new(self.resolve_type(ret, scope, ctx)?),
            }),
        }
    }

    fn resolve_exprs(
        &mut self,
        exprs: &[ParsedExpr],
        scope: &Scope,
        ctx: &Ctx,
    ) -> Result<Vec<ResolvedExpr>, ResolveError> {
        exprs
            .iter()
            .map(|e| self.resolve_expr(e, scope, ctx))
            .collect()
    }

    fn resolve_expr(
        &mut self,
        expr: &ParsedExpr,
        scope: &Scope,
        ctx: &Ctx,
    ) -> Result<ResolvedExpr, ResolveError> {
        let span = expr.span;
        let kind = match &expr.kind {
            ParsedExprKind::Import(path) => {
                self.resolve_file(path, span, &ctx.file)?;
                ResolvedExprKind::Import(path.clone())
            }
            ParsedExprKind::IntLiteral { value, width } => ResolvedExprKind::IntLiteral {
                value: *value,
                width: *width,
            },
            ParsedExprKind::FloatLiteral { value, width } => ResolvedExprKind::FloatLiteral {
                value: *value,
                width: *width,
            },
            ParsedExprKind::BoolLiteral(b) => ResolvedExprKind::BoolLiteral(*b),
            ParsedExprKind::StringLiteral(s) => ResolvedExprKind::StringLiteral(s.clone()),
            ParsedExprKind::Variable(name) => match scope.lookup(name) {
                Some(ScopeEntry::Local) => ResolvedExprKind::Variable(name.clone()),
                Some(_) => {
                    return Err(ResolveError::new(
                        ResolveErrorKind::TypeUsedAsValue(name.clone()),
                        span,
                        &ctx.file,
                    ))
                }
                None => {
                    return Err(ResolveError::new(
                        ResolveErrorKind::UnknownIdentifier(name.clone()),
                        span,
                        &ctx.file,
                    ))
                }
            },
            ParsedExprKind::FieldAccess { receiver, name } => {
                if let Some(ty) = self.receiver_as_type(receiver, scope) {
                    ResolvedExprKind::StaticFieldAccess { ty, name: name.clone() }
                } else {
                    ResolvedExprKind::FieldAccess {
                        receiver: Box::new(self.resolve_expr(receiver, scope, ctx)?),
                        name: name.clone(),
                    }
                }
            }
            ParsedExprKind::MethodCall { receiver, name, generics, args } => {
                let generics = self.resolve_types(generics, scope, ctx)?;
                let args = self.resolve_exprs(args, scope, ctx)?;
                if let Some(ty) = self.receiver_as_type(receiver, scope) {
                    ResolvedExprKind::StaticMethodCall {
                        ty,
                        name: name.clone(),
                        generics,
                        args,
                    }
                } else {
                    ResolvedExprKind::MethodCall {
                        receiver: Box::new(self.resolve_expr(receiver, scope, ctx)?),
                        name: name.clone(),
                        generics,
                        args,
                    }
                }
            }
            ParsedExprKind::SuperCall { name, generics, args } => {
                if !ctx.in_class_method {
                    return Err(ResolveError::new(
                        ResolveErrorKind::StraySuper,
                        span,
                        &ctx.file,
                    ));
                }
                ResolvedExprKind::SuperMethodCall {
                    name: name.clone(),
                    generics: self.resolve_types(generics, scope, ctx)?,
                    args: self.resolve_exprs(args, scope, ctx)?,
                }
            }
            ParsedExprKind::SuperKeyword => {
                return Err(ResolveError::new(
                    ResolveErrorKind::StraySuper,
                    span,
                    &ctx.file,
                ))
            }
            ParsedExprKind::Call { callee, generics, args } => {
                let generics = self.resolve_types(generics, scope, ctx)?;
                let args = self.resolve_exprs(args, scope, ctx)?;
                match &callee.kind {
                    ParsedExprKind::Variable(name) => match scope.lookup(name) {
                        Some(ScopeEntry::Local) => ResolvedExprKind::MethodCall {
                            receiver: Box::new(ResolvedExpr {
                                kind: ResolvedExprKind::Variable(name.clone()),
                                span: callee.span,
                            }),
                            name: "invoke".to_string(),
                            generics,
                            args,
                        },
                        Some(ScopeEntry::Type(id)) => ResolvedExprKind::StaticMethodCall {
                            ty: ResolvedType::def(id),
                            name: "invoke".to_string(),
                            generics,
                            args,
                        },
                        Some(_) => {
                            return Err(ResolveError::new(
                                ResolveErrorKind::TypeUsedAsValue(name.clone()),
                                callee.span,
                                &ctx.file,
                            ))
                        }
                        None => {
                            return Err(ResolveError::new(
                                ResolveErrorKind::UnknownIdentifier(name.clone()),
                                callee.span,
                                &ctx.file,
                            ))
                        }
                    },
                    _ => ResolvedExprKind::MethodCall {
                        receiver: Box::new(self.resolve_expr(callee, scope, ctx)?),
                        name: "invoke".to_string(),
                        generics,
                        args,
                    },
                }
            }
            ParsedExprKind::ConstructorCall { ty, args } => ResolvedExprKind::ConstructorCall {
                ty: self.resolve_type(ty, scope, ctx)?,
                args: self.resolve_exprs(args, scope, ctx)?,
            },
            ParsedExprKind::RawStructConstructor { ty, fields } => {
                ResolvedExprKind::RawStructConstructor {
                    ty: self.resolve_type(ty, scope, ctx)?,
                    fields: fields
                        .iter()
                        .map(|(name, value)| {
                            Ok((name.clone(), self.resolve_expr(value, scope, ctx)?))
                        })
                        .collect::<Result<_, ResolveError>>()?,
                }
            }
            ParsedExprKind::Tuple(elems) => {
                ResolvedExprKind::Tuple(self.resolve_exprs(elems, scope, ctx)?)
            }
            ParsedExprKind::Lambda { params, ret, body } => {
                let mut lambda_scope = scope.clone();
                let mut resolved_params = Vec::with_capacity(params.len());
                for pattern in params {
                    let resolved = self.resolve_pattern(pattern, &lambda_scope, ctx)?;
                    for name in pattern.bound_names() {
                        lambda_scope.bind(name, ScopeEntry::Local);
                    }
                    resolved_params.push(resolved);
                }
                let ret = ret
                    .as_ref()
                    .map(|t| self.resolve_type(t, &lambda_scope, ctx))
                    .transpose()?;
                // `super` cannot cross a lambda boundary.
                let body_ctx = Ctx {
                    file: ctx.file.clone(),
                    in_class_method: false,
                };
                let body = self.resolve_expr(body, &lambda_scope, &body_ctx)?;
                ResolvedExprKind::Lambda {
                    params: resolved_params,
                    ret,
                    body: Rc::new(body),
                }
            }
            ParsedExprKind::Declaration { pattern, value } => {
                // The value cannot see the new bindings; the enclosing block
                // binds them for later siblings.
                let value = self.resolve_expr(value, scope, ctx)?;
                ResolvedExprKind::Declaration {
                    pattern: self.resolve_pattern(pattern, scope, ctx)?,
                    value: Box::new(value),
                }
            }
            ParsedExprKind::Assignment { lhs, rhs } => ResolvedExprKind::Assignment {
                lhs: Box::new(self.resolve_expr(lhs, scope, ctx)?),
                rhs: Box::new(self.resolve_expr(rhs, scope, ctx)?),
            },
            ParsedExprKind::Return(value) => ResolvedExprKind::Return(
                value
                    .as_ref()
                    .map(|v| Ok::<_, ResolveError>(Box::new(self.resolve_expr(v, scope, ctx)?)))
                    .transpose()?,
            ),
            ParsedExprKind::If { cond, then, els } => ResolvedExprKind::If {
                cond: Box::new(self.resolve_expr(cond, scope, ctx)?),
                then: Box::new(self.resolve_expr(then, scope, ctx)?),
                els: els
                    .as_ref()
                    .map(|e| Ok::<_, ResolveError>(Box::new(self.resolve_expr(e, scope, ctx)?)))
                    .transpose()?,
            },
            ParsedExprKind::While { cond, body } => ResolvedExprKind::While {
                cond: Box::new(self.resolve_expr(cond, scope, ctx)?),
                body: Box::new(self.resolve_expr(body, scope, ctx)?),
            },
            ParsedExprKind::Parenthesized(inner) => {
                return self.resolve_expr(inner, scope, ctx);
            }
            ParsedExprKind::Block(elements) => {
                // Nested blocks get their own two-phase pass; their exposed
                // types do not escape.
                let (exprs, _exposed) = self.resolve_block(elements, scope, ctx)?;
                ResolvedExprKind::Block(exprs)
            }
        };
        Ok(ResolvedExpr { kind, span })
    }

    fn resolve_types(
        &mut self,
        types: &[ParsedType],
        scope: &Scope,
        ctx: &Ctx,
    ) -> Result<Vec<ResolvedType>, ResolveError> {
        types
            .iter()
            .map(|t| self.resolve_type(t, scope, ctx))
            .collect()
    }

    /// The static/virtual disambiguation rule: a receiver that is a bare
    /// identifier naming a type in scope resolves statically -- unless a
    /// local of the same name shadows it, in which case the local wins.
    fn receiver_as_type(&self, receiver: &ParsedExpr, scope: &Scope) -> Option<ResolvedType> {
        if let ParsedExprKind::Variable(name) = &receiver.kind {
            scope.type_of(name).map(ResolvedType::def)
        } else {
            None
        }
    }
}
