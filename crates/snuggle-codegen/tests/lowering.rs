//! Instruction-level tests for the lowerer: builtin inlining, the
//! plural-type protocol, return channels, and local-slot management.

use snuggle_codegen::lower_program;
use snuggle_common::SourceSet;
use snuggle_ir::{
    program::flatten, BasicKind, CallKind, GeneratedType, Instruction, IrProgram, RawOp,
};
use snuggle_resolver::resolve_program;
use snuggle_typeck::{check_program, ReflectRegistry};

fn lower(files: &[(&str, &str)]) -> IrProgram {
    let sources = SourceSet::from_pairs(files.iter().copied());
    let resolved =
        resolve_program(files[0].0, &sources, &[]).expect("resolution should succeed");
    let registry = ReflectRegistry::empty();
    let typed = check_program(&resolved, &registry).expect("typing should succeed");
    lower_program(&typed).expect("lowering should succeed")
}

fn entry_instructions(program: &IrProgram) -> Vec<&Instruction> {
    let file = program.files.last().expect("entry file");
    flatten(&file.body)
}

/// All raw ops in a flattened instruction stream, in order.
fn raw_ops(insns: &[&Instruction]) -> Vec<RawOp> {
    insns
        .iter()
        .filter_map(|i| match i {
            Instruction::Bytecodes { ops, .. } => Some(ops.clone()),
            _ => None,
        })
        .flatten()
        .collect()
}

#[test]
fn bool_builtins_inline_the_documented_opcodes() {
    let program = lower(&[(
        "main",
        "let a = true.add(false) let b = true.mul(false) let c = true.not()",
    )]);
    let ops = raw_ops(&entry_instructions(&program));
    assert_eq!(ops, vec![RawOp::Ior, RawOp::Iand, RawOp::Iconst(1), RawOp::Ixor]);
}

#[test]
fn plural_return_uses_static_channels() {
    let program = lower(&[(
        "main",
        "struct S { a: i32 b: i32 c: i32 } \
         class C { static fn make(): S (1, 2, 3) } \
         let s = C.make()",
    )]);

    // Producer side: the method stores every leaf but the first into the
    // return type's channels (top of stack first), then returns the first.
    let make = program
        .types
        .iter()
        .flat_map(|t| t.methods())
        .find(|m| m.runtime_name == "make")
        .expect("make should be generated");
    let body: Vec<&Instruction> = flatten(make.body.instructions().unwrap());
    let puts: Vec<&str> = body
        .iter()
        .filter_map(|i| match i {
            Instruction::PutStaticField(f) => Some(f.name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(puts, vec!["RETURN! $c", "RETURN! $b"]);
    assert!(matches!(body.last(), Some(Instruction::Return(Some(BasicKind::Int)))));

    // Consumer side: first leaf from the stack, the rest read back from the
    // channels in layout order.
    let insns = entry_instructions(&program);
    let call_at = insns
        .iter()
        .position(|i| matches!(i, Instruction::MethodCall { .. }))
        .expect("call site");
    let gets: Vec<&str> = insns[call_at + 1..]
        .iter()
        .filter_map(|i| match i {
            Instruction::GetStaticField(f) => Some(f.name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(gets, vec!["RETURN! $b", "RETURN! $c"]);

    // And the emitted value type declares exactly those channels.
    let value_type = program
        .types
        .iter()
        .find_map(|t| match t {
            GeneratedType::ValueType(v) if v.runtime_name == "S" => Some(v),
            _ => None,
        })
        .expect("S should be generated");
    let channels: Vec<&str> = value_type
        .returning_fields
        .iter()
        .map(|f| f.runtime_name.as_str())
        .collect();
    assert_eq!(channels, vec!["RETURN! $b", "RETURN! $c"]);
}

#[test]
fn call_return_width_matches_leaf_count() {
    let program = lower(&[(
        "main",
        "struct S { a: i32 b: i32 c: i32 } \
         class C { static fn make(): S (1, 2, 3) } \
         let s = C.make()",
    )]);
    let insns = entry_instructions(&program);
    let call_at = insns
        .iter()
        .position(|i| matches!(i, Instruction::MethodCall { .. }))
        .unwrap();
    // One leaf on the stack plus two channel reads = three leaf values,
    // stored into three consecutive slots.
    let stores: Vec<u32> = insns[call_at + 1..]
        .iter()
        .filter_map(|i| match i {
            Instruction::StoreLocal { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(stores, vec![2, 1, 0]);
}

#[test]
fn plural_round_trip_construct_read_assign() {
    let program = lower(&[(
        "main",
        "struct P { x: i32 y: i32 } \
         let p = P { x: 1, y: 2 } \
         let a = p.x \
         p.y = 9 \
         let b = p.y",
    )]);
    let insns = entry_instructions(&program);

    // Construction stores both leaves (top first).
    assert!(matches!(insns[0], Instruction::Push { .. }));
    let stores: Vec<u32> = insns
        .iter()
        .filter_map(|i| match i {
            Instruction::StoreLocal { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    // p = slots 0..2, a = slot 2, y-assign hits slot 1, b = slot 3.
    assert_eq!(stores, vec![1, 0, 2, 1, 3]);

    // Reading p.x touches only slot 0; p.y only slot 1.
    let loads: Vec<u32> = insns
        .iter()
        .filter_map(|i| match i {
            Instruction::LoadLocal { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(loads, vec![0, 1]);
}

#[test]
fn desired_fields_skip_unwanted_constituents() {
    // Reading one field of a freshly built struct emits only that leaf.
    let program = lower(&[(
        "main",
        "struct P { x: i32 y: i32 } let a = P { x: 7, y: 8 }.y",
    )]);
    let insns = entry_instructions(&program);
    let pushes: Vec<&Instruction> = insns
        .iter()
        .filter(|i| matches!(i, Instruction::Push { .. }))
        .copied()
        .collect();
    assert_eq!(pushes.len(), 1, "only the y constituent is emitted");
    assert!(matches!(
        pushes[0],
        Instruction::Push { value: snuggle_ir::ConstValue::Int(8), .. }
    ));
}

#[test]
fn reference_receiver_fields_use_mangled_paths() {
    let program = lower(&[(
        "main",
        "struct S { x: i32 y: i32 } \
         class H { s: S fn new(v: S) { super.new() this.s = v } } \
         let h = new H((1, 2)) \
         let b = h.s.y",
    )]);
    let insns = entry_instructions(&program);
    let gets: Vec<&str> = insns
        .iter()
        .filter_map(|i| match i {
            Instruction::GetReferenceTypeField(f) => Some(f.name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(gets, vec!["s$y"]);

    // The generated class carries the leaf-expanded fields.
    let class = program
        .types
        .iter()
        .find_map(|t| match t {
            GeneratedType::Class(c) if c.runtime_name == "H" => Some(c),
            _ => None,
        })
        .expect("H should be generated");
    let field_names: Vec<&str> = class.fields.iter().map(|f| f.runtime_name.as_str()).collect();
    assert_eq!(field_names, vec!["s$x", "s$y"]);
}

#[test]
fn reference_receiver_assignment_swaps_per_leaf() {
    let program = lower(&[(
        "main",
        "struct S { x: i32 y: i32 } \
         class H { s: S fn new(v: S) { super.new() this.s = v } } \
         let h = new H((1, 2)) \
         h.s = (3, 4)",
    )]);
    let insns = entry_instructions(&program);
    let puts: Vec<&str> = insns
        .iter()
        .filter_map(|i| match i {
            Instruction::PutReferenceTypeField(f) => Some(f.name.as_str()),
            _ => None,
        })
        .collect();
    // Stored top of stack first: y before x.
    assert_eq!(puts, vec!["s$y", "s$x"]);
    assert!(insns
        .iter()
        .any(|i| matches!(i, Instruction::SwapBasic { top: BasicKind::Ref, second: BasicKind::Int })));
}

#[test]
fn local_slots_are_dense_and_respect_widths() {
    let program = lower(&[("main", "let a = 1 let b = 2i64 let c = 3")]);
    let insns = entry_instructions(&program);
    let stores: Vec<(u32, BasicKind)> = insns
        .iter()
        .filter_map(|i| match i {
            Instruction::StoreLocal { index, kind } => Some((*index, *kind)),
            _ => None,
        })
        .collect();
    // i64 takes two slots, so c lands at 3, not 2.
    assert_eq!(
        stores,
        vec![(0, BasicKind::Int), (1, BasicKind::Long), (3, BasicKind::Int)]
    );
}

#[test]
fn enum_variant_reads_lower_to_constants() {
    let program = lower(&[(
        "main",
        "enum Color { Red, Green, Blue } let c = Color.Green let i = c.index()",
    )]);
    let insns = entry_instructions(&program);
    assert!(matches!(
        insns[0],
        Instruction::Push { value: snuggle_ir::ConstValue::Int(1), .. }
    ));
    // index() is an identity builtin: no call is emitted for it.
    assert!(!insns.iter().any(|i| matches!(i, Instruction::MethodCall { .. })));
}

#[test]
fn while_loops_use_label_branching() {
    let program = lower(&[(
        "main",
        "let i = 0 while i.lt(10) { i = i.add(1) }",
    )]);
    let insns = entry_instructions(&program);
    assert!(insns.iter().any(|i| matches!(i, Instruction::Label(_))));
    assert!(insns.iter().any(|i| matches!(i, Instruction::JumpIfFalse(_))));
    assert!(insns.iter().any(|i| matches!(i, Instruction::Jump(_))));
    let ops = raw_ops(&insns);
    assert!(ops.contains(&RawOp::CmpLt(BasicKind::Int)));
    assert!(ops.contains(&RawOp::Iadd));
}

#[test]
fn lambdas_generate_interface_and_impl() {
    let program = lower(&[(
        "main",
        "let n = 5 let f = fn(x: i32): i32 x.add(n) let r = f(2)",
    )]);

    let iface = program
        .types
        .iter()
        .find_map(|t| match t {
            GeneratedType::FuncType(f) => Some(f),
            _ => None,
        })
        .expect("func interface should be generated");
    assert_eq!(iface.methods[0].runtime_name, "invoke");
    assert_eq!(iface.methods[0].descriptor, "(I)I");

    let closure = program
        .types
        .iter()
        .find_map(|t| match t {
            GeneratedType::FuncImpl(f) => Some(f),
            _ => None,
        })
        .expect("func impl should be generated");
    assert_eq!(closure.iface, iface.runtime_name);
    // One capture field plus invoke and the synthesized constructor.
    assert_eq!(closure.fields.len(), 1);
    assert!(closure.methods.iter().any(|m| m.runtime_name == "invoke"));
    assert!(closure.methods.iter().any(|m| m.runtime_name == "<init>"));

    // The call site dispatches through the interface.
    let insns = entry_instructions(&program);
    assert!(insns.iter().any(|i| matches!(
        i,
        Instruction::MethodCall { kind: CallKind::Interface, method } if method.name == "invoke"
    )));
}

#[test]
fn imports_lower_to_run_import() {
    let program = lower(&[
        ("main", "import \"lib\" let k = new K()"),
        ("lib", "pub class K { }"),
    ]);
    let insns = entry_instructions(&program);
    assert!(matches!(insns[0], Instruction::RunImport(name) if name == "lib"));
    assert!(program.file("lib").is_some());
}

#[test]
fn print_dispatches_to_the_runtime_class() {
    let program = lower(&[("main", "print(\"hi\")")]);
    let insns = entry_instructions(&program);
    assert!(insns.iter().any(|i| matches!(
        i,
        Instruction::MethodCall { kind: CallKind::Static, method }
            if method.owner == "snuggle/runtime/SnuggleRuntime" && method.name == "print"
    )));
}
