//! Integration tests for plural types: structs, tuples, enums, layout.

use snuggle_common::SourceSet;
use snuggle_resolver::{resolve_program, ResolvedProgram};
use snuggle_typeck::{check_program, ReflectRegistry, TypeErrorKind, TypedExprKind};

fn resolve(files: &[(&str, &str)]) -> ResolvedProgram {
    let sources = SourceSet::from_pairs(files.iter().copied());
    resolve_program(files[0].0, &sources, &[]).expect("resolution should succeed")
}

fn decl_ty_names(source: &str) -> Vec<String> {
    let resolved = resolve(&[("main", source)]);
    let registry = ReflectRegistry::empty();
    let typed = check_program(&resolved, &registry).expect("typing should succeed");
    let file = typed.files.last().unwrap();
    let TypedExprKind::Block(exprs) = &file.body.expr.kind else {
        panic!("file body should be a block");
    };
    exprs
        .iter()
        .filter_map(|e| match &e.kind {
            TypedExprKind::Declare { value, .. } => Some(typed.ctx.display(value.ty)),
            _ => None,
        })
        .collect()
}

#[test]
fn struct_literal_and_field_access() {
    let tys = decl_ty_names(
        "struct P { x: i32 y: i32 } let p = P { x: 1, y: 2 } let a = p.x",
    );
    assert_eq!(tys, vec!["P", "i32"]);
}

#[test]
fn struct_stack_slots_are_field_sums() {
    let resolved = resolve(&[(
        "main",
        "struct Inner { a: i32 b: i64 } struct Outer { i: Inner c: i32 } \
         let o = Outer { i: Inner { a: 1, b: 2 }, c: 3 }",
    )]);
    let registry = ReflectRegistry::empty();
    let typed = check_program(&resolved, &registry).unwrap();
    let file = typed.files.last().unwrap();
    let TypedExprKind::Block(exprs) = &file.body.expr.kind else { panic!() };
    let TypedExprKind::Declare { value, .. } = &exprs[0].kind else { panic!() };
    // i32 + i64 + i32 = 1 + 2 + 1 slots
    assert_eq!(typed.ctx.slots(value.ty), Some(4));
    assert!(typed.ctx.def(value.ty).is_plural());
    assert!(!typed.ctx.def(value.ty).is_reference_type());
}

#[test]
fn tuple_literal_coerces_to_expected_struct() {
    let tys = decl_ty_names("struct S { a: i32 b: i32 c: i32 } let s: S = (1, 2, 3)");
    assert_eq!(tys, vec!["S"]);
}

#[test]
fn tuple_pattern_destructures_plural_values() {
    let tys = decl_ty_names("let (a, b) = (1, \"x\") let c = a let d = b");
    assert_eq!(tys, vec!["(i32, string)", "i32", "string"]);
}

#[test]
fn unit_is_the_empty_tuple() {
    let resolved = resolve(&[("main", "let u = ()")]);
    let registry = ReflectRegistry::empty();
    let typed = check_program(&resolved, &registry).unwrap();
    let file = typed.files.last().unwrap();
    let TypedExprKind::Block(exprs) = &file.body.expr.kind else { panic!() };
    let TypedExprKind::Declare { value, .. } = &exprs[0].kind else { panic!() };
    assert_eq!(typed.ctx.slots(value.ty), Some(0));
    assert!(typed.ctx.descriptor_list(value.ty).is_empty());
}

#[test]
fn enum_variants_and_index() {
    let tys = decl_ty_names(
        "enum Color { Red, Green, Blue } let c = Color.Green let i = c.index()",
    );
    assert_eq!(tys, vec!["Color", "i32"]);
}

#[test]
fn enum_variant_reads_are_constants() {
    let resolved = resolve(&[("main", "enum E { A, B } let v = E.B")]);
    let registry = ReflectRegistry::empty();
    let typed = check_program(&resolved, &registry).unwrap();
    let file = typed.files.last().unwrap();
    let TypedExprKind::Block(exprs) = &file.body.expr.kind else { panic!() };
    let TypedExprKind::Declare { value, .. } = &exprs[0].kind else { panic!() };
    let TypedExprKind::StaticField { owner, field } = &value.kind else {
        panic!("variant read should be a static field access");
    };
    assert_eq!(typed.ctx.fields(*owner)[*field].const_index, Some(1));
}

#[test]
fn struct_methods_see_their_receiver() {
    let tys = decl_ty_names(
        "struct V { x: i32 y: i32 fn sum(): i32 this.x + this.y } \
         let v = V { x: 3, y: 4 } \
         let s = v.sum()",
    );
    assert_eq!(tys, vec!["V", "i32"]);
}

#[test]
fn plural_assignment_type_checks() {
    let tys = decl_ty_names(
        "struct P { x: i32 y: i32 } \
         let p = P { x: 1, y: 2 } \
         let before = p.y \
         let q = { p.y = 9 p.y }",
    );
    assert_eq!(tys, vec!["P", "i32", "i32"]);
}

#[test]
fn recursive_value_type_is_rejected() {
    // The lambda parameter forces S to specialize and lay itself out.
    let resolved = resolve(&[("main", "struct S { next: S } let f = fn(x: S): i32 0")]);
    let registry = ReflectRegistry::empty();
    let err = check_program(&resolved, &registry).unwrap_err();
    assert!(matches!(err.kind, TypeErrorKind::RecursiveValueType { .. }));
}

#[test]
fn impl_blocks_extend_structs() {
    let tys = decl_ty_names(
        "struct P { x: i32 } impl P { fn double(): i32 this.x + this.x } \
         let p = P { x: 2 } \
         let d = p.double()",
    );
    assert_eq!(tys, vec!["P", "i32"]);
}
