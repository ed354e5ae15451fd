//! Integration tests for name resolution.

use snuggle_common::SourceSet;
use snuggle_resolver::{
    resolve_program, ResolveErrorKind, ResolvedExprKind, ResolvedProgram, ResolvedType,
    ResolvedTypeDef, SnuggleTypeDefKind,
};

fn resolve(files: &[(&str, &str)]) -> Result<ResolvedProgram, snuggle_resolver::ResolveError> {
    let sources = SourceSet::from_pairs(files.iter().copied());
    resolve_program(files[0].0, &sources, &[])
}

fn resolve_ok(files: &[(&str, &str)]) -> ResolvedProgram {
    resolve(files).expect("resolution should succeed")
}

/// Every allocated indirection is fulfilled by the end of the pass.
fn assert_total(program: &ResolvedProgram) {
    let unfulfilled = program.arena.unfulfilled();
    assert!(
        unfulfilled.is_empty(),
        "unfulfilled indirections: {:?}",
        unfulfilled
            .iter()
            .map(|id| program.arena.name(*id))
            .collect::<Vec<_>>()
    );
}

#[test]
fn cyclic_type_refs_in_one_file() {
    let program = resolve_ok(&[(
        "main",
        "class A { b: B } class B { a: A }",
    )]);
    assert_total(&program);

    // Each field's type points (via the arena) at the other definition.
    let a_id = (0..program.arena.len() as u32)
        .map(snuggle_resolver::DefId)
        .find(|id| program.arena.name(*id) == "A")
        .expect("A allocated");
    let ResolvedTypeDef::Snuggle(a_def) = program.arena.get(a_id).unwrap().as_ref() else {
        panic!("A should be a source-defined type");
    };
    let SnuggleTypeDefKind::Class { fields, .. } = &a_def.kind else {
        panic!("A should be a class");
    };
    let ResolvedType::Def { id: b_id, .. } = &fields[0].ty else {
        panic!("field b should reference a definition");
    };
    assert_eq!(program.arena.name(*b_id), "B");
}

#[test]
fn forward_reference_to_sibling() {
    let program = resolve_ok(&[("main", "let u = new User() class User { }")]);
    assert_total(&program);
    let file = program.files.last().unwrap();
    assert!(matches!(
        file.exprs[0].kind,
        ResolvedExprKind::Declaration { .. }
    ));
}

#[test]
fn import_exposes_public_types_to_later_siblings() {
    let program = resolve_ok(&[
        ("main", "import \"lib\" let k = new K()"),
        ("lib", "pub class K { }"),
    ]);
    assert_total(&program);
    // Imports complete before their importer: lib first, main last.
    let names: Vec<_> = program.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["lib", "main"]);
}

#[test]
fn type_not_visible_before_import_statement() {
    let err = resolve(&[
        ("main", "let k = new K() import \"lib\""),
        ("lib", "pub class K { }"),
    ])
    .unwrap_err();
    assert!(matches!(err.kind, ResolveErrorKind::UnknownType(ref n) if n == "K"));
}

#[test]
fn private_types_are_not_exposed() {
    let err = resolve(&[
        ("main", "import \"lib\" let k = new K()"),
        ("lib", "class K { }"),
    ])
    .unwrap_err();
    assert!(matches!(err.kind, ResolveErrorKind::UnknownType(ref n) if n == "K"));
}

#[test]
fn import_is_memoized_not_duplicated() {
    let program = resolve_ok(&[
        ("main", "import \"lib\" import \"lib\" let k = new K()"),
        ("lib", "pub class K { }"),
    ]);
    // lib resolved once: one resolved file per source file.
    assert_eq!(program.files.len(), 2);
}

#[test]
fn missing_import_reports_the_path() {
    let err = resolve(&[("main", "import \"nope\"")]).unwrap_err();
    assert!(matches!(err.kind, ResolveErrorKind::MissingFile(ref p) if p == "nope"));
    assert_eq!(err.file, "main");
}

#[test]
fn import_cycle_is_detected() {
    let err = resolve(&[
        ("main", "import \"a\""),
        ("a", "import \"main\""),
    ])
    .unwrap_err();
    assert!(matches!(err.kind, ResolveErrorKind::ImportCycle(_)));
}

#[test]
fn unknown_identifier_is_a_resolution_error() {
    let err = resolve(&[("main", "let x = missing")]).unwrap_err();
    assert!(matches!(err.kind, ResolveErrorKind::UnknownIdentifier(ref n) if n == "missing"));
}

#[test]
fn stray_super_is_rejected() {
    let err = resolve(&[("main", "let s = super")]).unwrap_err();
    assert!(matches!(err.kind, ResolveErrorKind::StraySuper));

    // Also rejected as a call receiver outside any class method.
    let err = resolve(&[("main", "super.m()")]).unwrap_err();
    assert!(matches!(err.kind, ResolveErrorKind::StraySuper));
}

#[test]
fn super_call_allowed_inside_class_method() {
    let program = resolve_ok(&[(
        "main",
        "class Base { fn m(): i32 1 } class Sub: Base { fn m(): i32 super.m() }",
    )]);
    assert_total(&program);
}

#[test]
fn type_receiver_resolves_statically() {
    let program = resolve_ok(&[(
        "main",
        "class C { static fn f(): i32 1 } let x = C.f()",
    )]);
    let file = program.files.last().unwrap();
    let ResolvedExprKind::Declaration { value, .. } = &file.exprs[0].kind else {
        panic!("expected declaration");
    };
    assert!(matches!(
        value.kind,
        ResolvedExprKind::StaticMethodCall { .. }
    ));
}

#[test]
fn local_shadows_type_name_in_receiver_position() {
    let program = resolve_ok(&[(
        "main",
        "class C { static fn f(): i32 1 } let v = new C() { let C = v C.f() }",
    )]);
    // Inside the block, `C` is a local, so `C.f()` must be a virtual call.
    let file = program.files.last().unwrap();
    let ResolvedExprKind::Block(exprs) = &file.exprs[1].kind else {
        panic!("expected block");
    };
    assert!(matches!(
        exprs[1].kind,
        ResolvedExprKind::MethodCall { .. }
    ));
}

#[test]
fn bare_type_name_in_value_position_is_rejected() {
    let err = resolve(&[("main", "class C { } let x = C")]).unwrap_err();
    assert!(matches!(err.kind, ResolveErrorKind::TypeUsedAsValue(ref n) if n == "C"));
}

#[test]
fn impl_methods_land_in_the_side_table() {
    let program = resolve_ok(&[(
        "main",
        "class C { } impl C { fn extra(): i32 1 }",
    )]);
    assert_eq!(program.impls.len(), 1);
    let methods = program.impls.values().next().unwrap();
    assert_eq!(methods[0].name, "extra");
}

#[test]
fn alias_resolves_to_target_type() {
    let program = resolve_ok(&[("main", "type Id = i32 struct S { x: Id }")]);
    assert_total(&program);
}

#[test]
fn calling_a_type_becomes_a_static_invoke() {
    let program = resolve_ok(&[("main", "print(\"hi\")")]);
    let file = program.files.last().unwrap();
    let ResolvedExprKind::StaticMethodCall { name, .. } = &file.exprs[0].kind else {
        panic!("expected static invoke call");
    };
    assert_eq!(name, "invoke");
}

#[test]
fn generic_params_resolve_to_indices() {
    let program = resolve_ok(&[(
        "main",
        "class Box<T> { value: T fn get<U>(x: U): T this.value }",
    )]);
    assert_total(&program);
}
