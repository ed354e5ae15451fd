//! Integration tests for the Snuggle parser.

use snuggle_parser::ast::{
    ParsedElement, ParsedExprKind, ParsedPattern, ParsedTypeDefKind, ParsedTypeKind,
};
use snuggle_parser::parse;

fn first_expr(source: &str) -> ParsedExprKind {
    let file = parse("test", source).expect("parse should succeed");
    match file.elements.into_iter().next().expect("one element") {
        ParsedElement::Expr(e) => e.kind,
        ParsedElement::TypeDef(d) => panic!("expected expression, got type-def {}", d.name),
    }
}

#[test]
fn binary_operators_desugar_to_method_calls() {
    let kind = first_expr("1 + 2 * 3");
    // 1.add(2.mul(3))
    let ParsedExprKind::MethodCall { receiver, name, args, .. } = kind else {
        panic!("expected method call");
    };
    assert_eq!(name, "add");
    assert!(matches!(receiver.kind, ParsedExprKind::IntLiteral { value: 1, .. }));
    let ParsedExprKind::MethodCall { name: inner, .. } = &args[0].kind else {
        panic!("expected nested mul call");
    };
    assert_eq!(inner, "mul");
}

#[test]
fn unary_operators_desugar() {
    let kind = first_expr("!true");
    let ParsedExprKind::MethodCall { name, args, .. } = kind else {
        panic!("expected method call");
    };
    assert_eq!(name, "not");
    assert!(args.is_empty());
}

#[test]
fn turbofish_method_call() {
    let kind = first_expr("C.id::<i32>(7)");
    let ParsedExprKind::MethodCall { name, generics, args, .. } = kind else {
        panic!("expected method call");
    };
    assert_eq!(name, "id");
    assert_eq!(generics.len(), 1);
    assert!(matches!(
        &generics[0].kind,
        ParsedTypeKind::Named { name, .. } if name == "i32"
    ));
    assert_eq!(args.len(), 1);
}

#[test]
fn comparison_binds_looser_than_arithmetic() {
    let kind = first_expr("1 + 2 < 4");
    // (1.add(2)).lt(4)
    let ParsedExprKind::MethodCall { name, receiver, .. } = kind else {
        panic!("expected method call");
    };
    assert_eq!(name, "lt");
    assert!(matches!(
        &receiver.kind,
        ParsedExprKind::MethodCall { name, .. } if name == "add"
    ));
}

#[test]
fn class_with_generic_static_method() {
    let file = parse("test", "class C { static fn id<T>(x: T): T x }").unwrap();
    let ParsedElement::TypeDef(def) = &file.elements[0] else {
        panic!("expected type-def");
    };
    assert_eq!(def.name, "C");
    let ParsedTypeDefKind::Class { methods, supertype, .. } = &def.kind else {
        panic!("expected class");
    };
    assert!(supertype.is_none());
    assert_eq!(methods.len(), 1);
    let m = &methods[0];
    assert!(m.is_static);
    assert_eq!(m.type_params, vec!["T".to_string()]);
    assert_eq!(m.params.len(), 1);
    assert!(matches!(m.body.kind, ParsedExprKind::Variable(ref v) if v == "x"));
}

#[test]
fn struct_fields_in_order() {
    let file = parse("test", "struct S { a: i32 b: i32 c: i32 }").unwrap();
    let ParsedElement::TypeDef(def) = &file.elements[0] else {
        panic!("expected type-def");
    };
    let ParsedTypeDefKind::Struct { fields, .. } = &def.kind else {
        panic!("expected struct");
    };
    let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn raw_struct_literal_and_condition_block_disambiguation() {
    let kind = first_expr("S { a: 1, b: 2 }");
    let ParsedExprKind::RawStructConstructor { fields, .. } = kind else {
        panic!("expected raw struct constructor");
    };
    assert_eq!(fields.len(), 2);

    // In condition position `c { ... }` must stay condition + block.
    let kind = first_expr("while c { x }");
    let ParsedExprKind::While { cond, body } = kind else {
        panic!("expected while");
    };
    assert!(matches!(cond.kind, ParsedExprKind::Variable(ref v) if v == "c"));
    assert!(matches!(body.kind, ParsedExprKind::Block(_)));
}

#[test]
fn tuple_paren_and_unit() {
    assert!(matches!(first_expr("()"), ParsedExprKind::Tuple(ref v) if v.is_empty()));
    assert!(matches!(first_expr("(1)"), ParsedExprKind::Parenthesized(_)));
    assert!(matches!(first_expr("(1, 2, 3)"), ParsedExprKind::Tuple(ref v) if v.len() == 3));
}

#[test]
fn constructor_call_and_super_call() {
    let kind = first_expr("new C(1)");
    assert!(matches!(kind, ParsedExprKind::ConstructorCall { .. }));

    let kind = first_expr("super.m(1)");
    let ParsedExprKind::SuperCall { name, args, .. } = kind else {
        panic!("expected super call");
    };
    assert_eq!(name, "m");
    assert_eq!(args.len(), 1);
}

#[test]
fn stray_super_still_parses() {
    // Resolution rejects it; the parser keeps the span.
    assert!(matches!(first_expr("super"), ParsedExprKind::SuperKeyword));
}

#[test]
fn lambda_with_typed_params() {
    let kind = first_expr("fn(x: i32): i32 x");
    let ParsedExprKind::Lambda { params, ret, body } = kind else {
        panic!("expected lambda");
    };
    assert_eq!(params.len(), 1);
    assert!(ret.is_some());
    assert!(matches!(body.kind, ParsedExprKind::Variable(_)));
}

#[test]
fn let_with_tuple_pattern() {
    let kind = first_expr("let (a, b) = p");
    let ParsedExprKind::Declaration { pattern, .. } = kind else {
        panic!("expected declaration");
    };
    let ParsedPattern { kind, .. } = pattern;
    assert!(matches!(kind, snuggle_parser::ast::pat::ParsedPatternKind::Tuple(ref v) if v.len() == 2));
}

#[test]
fn import_and_alias_and_impl() {
    let file = parse(
        "test",
        "import \"lib\" pub type Id = i32 impl C { fn f(): i32 1 }",
    )
    .unwrap();
    assert_eq!(file.elements.len(), 3);
    assert!(matches!(
        &file.elements[0],
        ParsedElement::Expr(e) if matches!(&e.kind, ParsedExprKind::Import(p) if p == "lib")
    ));
    let ParsedElement::TypeDef(alias) = &file.elements[1] else { panic!() };
    assert!(alias.is_pub);
    assert!(matches!(alias.kind, ParsedTypeDefKind::Alias(_)));
    let ParsedElement::TypeDef(impl_def) = &file.elements[2] else { panic!() };
    assert_eq!(impl_def.name, "C");
    assert!(matches!(&impl_def.kind, ParsedTypeDefKind::Impl { methods } if methods.len() == 1));
}

#[test]
fn enum_variants_and_methods() {
    let file = parse("test", "enum Color { Red, Green, Blue fn f(): i32 1 }").unwrap();
    let ParsedElement::TypeDef(def) = &file.elements[0] else { panic!() };
    let ParsedTypeDefKind::Enum { variants, methods } = &def.kind else {
        panic!("expected enum");
    };
    assert_eq!(variants, &["Red", "Green", "Blue"]);
    assert_eq!(methods.len(), 1);
}

#[test]
fn parse_error_reports_expected() {
    let err = parse("test", "class { }").unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("class name"), "unexpected message: {msg}");
}

#[test]
fn nested_generic_types() {
    let file = parse("test", "struct W { inner: Box<Box<i32>> }").unwrap();
    let ParsedElement::TypeDef(def) = &file.elements[0] else { panic!() };
    let ParsedTypeDefKind::Struct { fields, .. } = &def.kind else { panic!() };
    let ParsedTypeKind::Named { name, args } = &fields[0].ty.kind else { panic!() };
    assert_eq!(name, "Box");
    assert!(matches!(
        &args[0].kind,
        ParsedTypeKind::Named { name, args } if name == "Box" && args.len() == 1
    ));
}
