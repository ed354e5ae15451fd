//! Error-path tests for the checker, plus int-literal const folding.

use snuggle_common::SourceSet;
use snuggle_parser::ast::IntWidth;
use snuggle_resolver::{resolve_program, ResolvedProgram};
use snuggle_typeck::{
    check_program, Constant, ReflectRegistry, TypeError, TypeErrorKind, TypedExprKind,
};

fn resolve(files: &[(&str, &str)]) -> ResolvedProgram {
    let sources = SourceSet::from_pairs(files.iter().copied());
    resolve_program(files[0].0, &sources, &[]).expect("resolution should succeed")
}

fn check_err(source: &str) -> TypeError {
    let resolved = resolve(&[("main", source)]);
    let registry = ReflectRegistry::empty();
    check_program(&resolved, &registry).expect_err("typing should fail")
}

fn first_decl_constant(source: &str) -> Constant {
    let resolved = resolve(&[("main", source)]);
    let registry = ReflectRegistry::empty();
    let typed = check_program(&resolved, &registry).expect("typing should succeed");
    let file = typed.files.last().unwrap();
    let TypedExprKind::Block(exprs) = &file.body.expr.kind else { panic!() };
    let TypedExprKind::Declare { value, .. } = &exprs[0].kind else {
        panic!("expected declaration");
    };
    let TypedExprKind::Literal(c) = &value.kind else {
        panic!("expected the value to fold to a literal, got {:?}", value.kind);
    };
    c.clone()
}

#[test]
fn type_mismatch_reports_expected_and_found() {
    let err = check_err("let x: string = 3");
    let TypeErrorKind::Mismatch { expected, found } = &err.kind else {
        panic!("expected mismatch, got {:?}", err.kind);
    };
    assert_eq!(expected, "string");
    assert!(found.contains("int") || found.contains("i32"), "found: {found}");
    assert_eq!(err.file, "main");
}

#[test]
fn unknown_method_names_the_receiver_type() {
    let err = check_err("let x = true.frobnicate()");
    assert!(matches!(
        &err.kind,
        TypeErrorKind::UnknownMethod { ty, method } if ty == "bool" && method == "frobnicate"
    ));
}

#[test]
fn arity_mismatch_is_an_overload_failure() {
    let err = check_err("class C { fn f(x: i32): i32 x } let r = new C().f(1, 2)");
    assert!(matches!(err.kind, TypeErrorKind::NoMatchingOverload { .. }));
}

#[test]
fn unknown_field_is_reported() {
    let err = check_err("struct P { x: i32 } let p = P { x: 1 } let y = p.y");
    assert!(matches!(
        &err.kind,
        TypeErrorKind::UnknownField { field, .. } if field == "y"
    ));
}

#[test]
fn missing_struct_literal_field() {
    let err = check_err("struct P { x: i32 y: i32 } let p = P { x: 1 }");
    assert!(matches!(
        &err.kind,
        TypeErrorKind::MissingField { field, .. } if field == "y"
    ));
}

#[test]
fn constructor_on_non_class_is_rejected() {
    let err = check_err("struct P { x: i32 } let p = new P(1)");
    assert!(matches!(err.kind, TypeErrorKind::InvalidConstructorTarget { .. }));
}

#[test]
fn struct_literal_on_class_is_rejected() {
    let err = check_err("class C { } let c = C { }");
    assert!(matches!(err.kind, TypeErrorKind::NotAStruct { .. }));
}

#[test]
fn fallible_pattern_reports_not_yet_supported() {
    let err = check_err(
        "class Base { } class Sub: Base { } \
         let b = new Base() \
         let s: Sub = b",
    );
    assert!(matches!(err.kind, TypeErrorKind::NotYetSupported("fallible patterns")));
}

#[test]
fn option_over_value_types_is_not_yet_supported() {
    let err = check_err("let o = Option.some(3)");
    assert!(matches!(
        err.kind,
        TypeErrorKind::NotYetSupported("options over value types")
    ));
}

#[test]
fn return_outside_a_method_is_rejected() {
    let err = check_err("return 3");
    assert!(matches!(err.kind, TypeErrorKind::ReturnOutsideMethod));
}

#[test]
fn condition_must_be_bool() {
    let err = check_err("if 1 2 else 3");
    assert!(matches!(err.kind, TypeErrorKind::Mismatch { .. }));
}

#[test]
fn enum_variants_are_not_assignable() {
    let err = check_err("enum E { A } let x = { E.A = E.A }");
    assert!(matches!(err.kind, TypeErrorKind::NotAssignable));
}

// ── Int-literal const folding ──────────────────────────────────────────

#[test]
fn literal_arithmetic_folds_at_compile_time() {
    assert_eq!(
        first_decl_constant("let x = 1 + 2 * 3"),
        Constant::Int(IntWidth::I32, 7)
    );
    assert_eq!(
        first_decl_constant("let x = -(10 - 4)"),
        Constant::Int(IntWidth::I32, -6)
    );
}

#[test]
fn folded_literals_commit_to_the_ascribed_width() {
    assert_eq!(
        first_decl_constant("let x: i64 = 1 + 2"),
        Constant::Int(IntWidth::I64, 3)
    );
    assert_eq!(
        first_decl_constant("let x: i8 = 100 + 27"),
        Constant::Int(IntWidth::I8, 127)
    );
}

#[test]
fn division_by_zero_literal_does_not_fold() {
    // The fold declines; the call lands on runtime i32 division instead.
    let resolved = resolve(&[("main", "let x = 1 / 0")]);
    let registry = ReflectRegistry::empty();
    let typed = check_program(&resolved, &registry).expect("typing should succeed");
    let file = typed.files.last().unwrap();
    let TypedExprKind::Block(exprs) = &file.body.expr.kind else { panic!() };
    let TypedExprKind::Declare { value, .. } = &exprs[0].kind else { panic!() };
    assert!(matches!(value.kind, TypedExprKind::Call { .. }));
    assert_eq!(typed.ctx.display(value.ty), "i32");
}

#[test]
fn width_suffixed_literals_keep_their_width() {
    assert_eq!(
        first_decl_constant("let x = 7i64"),
        Constant::Int(IntWidth::I64, 7)
    );
}
