//! Integration tests for generic specialization and lazy method bodies.

use snuggle_common::SourceSet;
use snuggle_resolver::{resolve_program, ResolvedProgram};
use snuggle_typeck::method::{BodyState, MethodKind};
use snuggle_typeck::{check_program, ReflectRegistry, TypedExprKind};

fn resolve(files: &[(&str, &str)]) -> ResolvedProgram {
    let sources = SourceSet::from_pairs(files.iter().copied());
    resolve_program(files[0].0, &sources, &[]).expect("resolution should succeed")
}

/// Unwrap the value of the n-th top-level declaration in the entry file.
fn nth_decl_value<'t>(
    typed: &'t snuggle_typeck::TypedProgram<'_>,
    n: usize,
) -> &'t snuggle_typeck::TypedExpr {
    let file = typed.files.last().expect("entry file");
    let TypedExprKind::Block(exprs) = &file.body.expr.kind else {
        panic!("file body should be a block");
    };
    let TypedExprKind::Declare { value, .. } = &exprs[n].kind else {
        panic!("expected a declaration at index {n}");
    };
    value
}

#[test]
fn generic_static_method_specializes_at_explicit_args() {
    let resolved = resolve(&[(
        "main",
        "class C { static fn id<T>(x: T): T x } let r = C.id::<i32>(7)",
    )]);
    let registry = ReflectRegistry::empty();
    let typed = check_program(&resolved, &registry).expect("typing should succeed");

    let value = nth_decl_value(&typed, 0);
    assert_eq!(typed.ctx.display(value.ty), "i32");
    let TypedExprKind::Call { method, args, .. } = &value.kind else {
        panic!("expected a call");
    };
    // The literal argument committed to the inferred width.
    assert!(matches!(
        &args[0].kind,
        TypedExprKind::Literal(snuggle_typeck::Constant::Int(
            snuggle_parser::ast::IntWidth::I32,
            7
        ))
    ));
    // The specialization carries the mangled type arguments.
    assert_eq!(typed.ctx.method(*method).runtime_name, "id$i32");
}

#[test]
fn specialization_is_canonical_per_argument_tuple() {
    let resolved = resolve(&[(
        "main",
        "class Box<T> { } \
         let a = new Box<i32>() \
         let b = new Box<i32>() \
         let c = new Box<i64>()",
    )]);
    let registry = ReflectRegistry::empty();
    let typed = check_program(&resolved, &registry).unwrap();

    let a = nth_decl_value(&typed, 0).ty;
    let b = nth_decl_value(&typed, 1).ty;
    let c = nth_decl_value(&typed, 2).ty;
    assert_eq!(a, b, "equal argument tuples must share the specialization");
    assert_ne!(a, c, "distinct argument tuples must not");
    assert_eq!(typed.ctx.display(a), "Box<i32>");
    assert_eq!(typed.ctx.display(c), "Box<i64>");
}

#[test]
fn method_overloads_get_source_order_disambiguation() {
    let resolved = resolve(&[(
        "main",
        "class C { fn f(x: i32): i32 1 fn f(x: string): i32 2 } \
         let c = new C() \
         let a = c.f(5) \
         let b = c.f(\"s\")",
    )]);
    let registry = ReflectRegistry::empty();
    let typed = check_program(&resolved, &registry).unwrap();

    let TypedExprKind::Call { method: by_int, .. } = &nth_decl_value(&typed, 1).kind else {
        panic!("expected call");
    };
    let TypedExprKind::Call { method: by_str, .. } = &nth_decl_value(&typed, 2).kind else {
        panic!("expected call");
    };
    assert_eq!(typed.ctx.method(*by_int).runtime_name, "f");
    assert_eq!(typed.ctx.method(*by_str).runtime_name, "f$1");
}

#[test]
fn mutually_recursive_method_bodies_terminate() {
    // a's body needs b's signature and vice versa; lazy bodies mean neither
    // forces the other's body while its own is in flight.
    let resolved = resolve(&[(
        "main",
        "class A { fn go(): i32 new B().go() } \
         class B { fn go(): i32 new A().go() } \
         let r = new A().go()",
    )]);
    let registry = ReflectRegistry::empty();
    let typed = check_program(&resolved, &registry).unwrap();
    assert_eq!(typed.ctx.display(nth_decl_value(&typed, 0).ty), "i32");
}

#[test]
fn cyclic_field_types_type_check() {
    let resolved = resolve(&[(
        "main",
        "class A { b: B } class B { a: A } let a = new A()",
    )]);
    let registry = ReflectRegistry::empty();
    let typed = check_program(&resolved, &registry).unwrap();
    let a_ty = nth_decl_value(&typed, 0).ty;
    // A's field b is B, whose field a is A again: same handles both ways.
    let fields = typed.ctx.fields(a_ty);
    let b_ty = fields[0].ty;
    assert_eq!(typed.ctx.display(b_ty), "B");
    assert_eq!(typed.ctx.fields(b_ty)[0].ty, a_ty);
}

#[test]
fn every_reachable_body_resolves() {
    let resolved = resolve(&[(
        "main",
        "class C { fn f(): i32 this.g() fn g(): i32 2 } let r = new C().f()",
    )]);
    let registry = ReflectRegistry::empty();
    let typed = check_program(&resolved, &registry).unwrap();
    for m in &typed.ctx.methods {
        if let MethodKind::Snuggle { body } = &m.kind {
            assert!(
                matches!(body, BodyState::Resolved(_)),
                "unresolved body on `{}`",
                m.runtime_name
            );
        }
    }
}

#[test]
fn generic_inference_from_argument_types() {
    let resolved = resolve(&[(
        "main",
        "class C { static fn id<T>(x: T): T x } let s = C.id(\"hello\")",
    )]);
    let registry = ReflectRegistry::empty();
    let typed = check_program(&resolved, &registry).unwrap();
    assert_eq!(typed.ctx.display(nth_decl_value(&typed, 0).ty), "string");
}

#[test]
fn int_literal_arguments_infer_as_i32() {
    let resolved = resolve(&[(
        "main",
        "class C { static fn id<T>(x: T): T x } let n = C.id(7)",
    )]);
    let registry = ReflectRegistry::empty();
    let typed = check_program(&resolved, &registry).unwrap();
    assert_eq!(typed.ctx.display(nth_decl_value(&typed, 0).ty), "i32");
}

#[test]
fn option_some_infers_its_value_type() {
    let resolved = resolve(&[("main", "let o = Option.some(\"hi\") let h = o.has()")]);
    let registry = ReflectRegistry::empty();
    let typed = check_program(&resolved, &registry).unwrap();
    assert_eq!(typed.ctx.display(nth_decl_value(&typed, 0).ty), "Option<string>");
    assert_eq!(typed.ctx.display(nth_decl_value(&typed, 1).ty), "bool");
}
