//! End-to-end driver tests: disk discovery, the full pipeline, diagnostics,
//! and the reflect bridge wired through a custom registry.

use std::fs;

use snuggle_common::Phase;
use snuggle_ir::{program::flatten, CallKind, Instruction};
use snuggle_typeck::{ReflectRegistry, ReflectedClassBuilder, ReflectedType};
use snugglec::{compile, compile_sources, discovery};

#[test]
fn compiles_a_multi_file_project_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("util")).unwrap();
    fs::write(
        dir.path().join("main.sng"),
        "import \"util/geometry\"\nlet p = Point { x: 1, y: 2 }\nprint(p.x)\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("util/geometry.sng"),
        "pub struct Point { x: i32 y: i32 }\n",
    )
    .unwrap();

    let sources = discovery::load_sources(dir.path()).unwrap();
    assert_eq!(sources.len(), 2);

    let registry = ReflectRegistry::empty();
    let program = compile("main", &sources, &registry).expect("compile should succeed");

    let names: Vec<&str> = program.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["util/geometry", "main"]);

    // The imported file's generated name survives slash normalization.
    let main = program.file("main").unwrap();
    assert!(flatten(&main.body)
        .iter()
        .any(|i| matches!(i, Instruction::RunImport(p) if p == "util/geometry")));
}

#[test]
fn diagnostics_carry_phase_and_file() {
    let err = compile_sources(
        &[("main", "let x = missing")],
        &ReflectRegistry::empty(),
    )
    .unwrap_err();
    assert_eq!(err.phase, Phase::Resolution);
    assert_eq!(err.file, "main");
    assert!(err.message.contains("missing"));

    let err = compile_sources(
        &[("main", "let x: string = 5")],
        &ReflectRegistry::empty(),
    )
    .unwrap_err();
    assert_eq!(err.phase, Phase::Typing);

    let err = compile_sources(&[("main", "class {")], &ReflectRegistry::empty()).unwrap_err();
    assert_eq!(err.phase, Phase::Parsing);
}

#[test]
fn ir_dump_lists_types_and_files() {
    let program = compile_sources(
        &[("main", "class C { static fn f(): i32 42 } let r = C.f()")],
        &ReflectRegistry::empty(),
    )
    .unwrap();
    let dump = snugglec::emit::dump(&program);
    assert!(dump.contains("class C"), "dump:\n{dump}");
    assert!(dump.contains("file main"), "dump:\n{dump}");
    assert!(dump.contains("static fn f()I"), "dump:\n{dump}");
}

#[test]
fn json_emission_round_trips_through_serde() {
    let program = compile_sources(
        &[("main", "let x = 1 + 2")],
        &ReflectRegistry::empty(),
    )
    .unwrap();
    let json = serde_json::to_string(&program).unwrap();
    assert!(json.contains("\"files\""));
    assert!(json.contains("main"));
}

#[test]
fn reflected_singleton_methods_load_the_instance_first() {
    let console = ReflectedClassBuilder::new("Console", "snuggle/runtime/Console")
        .singleton(0)
        .method("log", false, vec![ReflectedType::Str], ReflectedType::Void)
        .build();
    let registry = ReflectRegistry::new(vec![console]).unwrap();

    let program =
        compile_sources(&[("main", "Console.log(\"hello\")")], &registry).unwrap();
    let main = program.file("main").unwrap();
    let insns = flatten(&main.body);

    // GETSTATIC of the instance field precedes the argument push, and the
    // invocation itself is virtual on the host class.
    let get_at = insns
        .iter()
        .position(|i| matches!(
            i,
            Instruction::GetStaticField(f) if f.name == "INSTANCE"
        ))
        .expect("singleton instance load");
    let push_at = insns
        .iter()
        .position(|i| matches!(i, Instruction::Push { .. }))
        .unwrap();
    assert!(get_at < push_at);
    assert!(insns.iter().any(|i| matches!(
        i,
        Instruction::MethodCall { kind: CallKind::Virtual, method }
            if method.owner == "snuggle/runtime/Console" && method.name == "log"
    )));
}

#[test]
fn reflected_static_methods_dispatch_statically() {
    let mathy = ReflectedClassBuilder::new("Mathy", "snuggle/runtime/Mathy")
        .method("abs", true, vec![ReflectedType::I32], ReflectedType::I32)
        .build();
    let registry = ReflectRegistry::new(vec![mathy]).unwrap();

    let program = compile_sources(&[("main", "let a = Mathy.abs(-5)")], &registry).unwrap();
    let main = program.file("main").unwrap();
    assert!(flatten(&main.body).iter().any(|i| matches!(
        i,
        Instruction::MethodCall { kind: CallKind::Static, method }
            if method.owner == "snuggle/runtime/Mathy"
                && method.name == "abs"
                && method.descriptor == "(I)I"
    )));
}

#[test]
fn renamed_reflected_methods_keep_the_host_name_on_the_wire() {
    let text = ReflectedClassBuilder::new("Text", "snuggle/runtime/Text")
        .method_renamed(
            "shout",
            "toUpperCase",
            true,
            vec![ReflectedType::Str],
            ReflectedType::Str,
        )
        .build();
    let registry = ReflectRegistry::new(vec![text]).unwrap();

    let program =
        compile_sources(&[("main", "let s = Text.shout(\"quiet\")")], &registry).unwrap();
    let main = program.file("main").unwrap();
    assert!(flatten(&main.body).iter().any(|i| matches!(
        i,
        Instruction::MethodCall { method, .. } if method.name == "toUpperCase"
    )));
}
