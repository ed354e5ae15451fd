//! Text dump of the lowered program, for `--emit ir`.

use std::fmt::Write;

use snuggle_ir::{program::flatten, GeneratedType, Instruction, IrProgram, MethodBody};

/// Human-readable dump: one line per instruction, methods and files grouped
/// under headers.
pub fn dump(program: &IrProgram) -> String {
    let mut out = String::new();
    for ty in &program.types {
        match ty {
            GeneratedType::Class(c) => {
                let _ = writeln!(out, "class {} : {}", c.runtime_name, c.supertype);
                for f in &c.fields {
                    let stat = if f.runtime_static { "static " } else { "" };
                    let _ = writeln!(out, "  field {stat}{} {}", f.runtime_name, f.descriptor);
                }
            }
            GeneratedType::ValueType(v) => {
                let _ = writeln!(out, "value {}", v.runtime_name);
                for f in &v.static_fields {
                    let _ = writeln!(out, "  static {} {}", f.runtime_name, f.descriptor);
                }
                for f in &v.returning_fields {
                    let _ = writeln!(out, "  channel {:?} {}", f.runtime_name, f.descriptor);
                }
            }
            GeneratedType::FuncType(f) => {
                let _ = writeln!(out, "interface {}", f.runtime_name);
            }
            GeneratedType::FuncImpl(f) => {
                let _ = writeln!(out, "closure {} implements {}", f.runtime_name, f.iface);
            }
        }
        for m in ty.methods() {
            let stat = if m.is_static { "static " } else { "" };
            let _ = writeln!(out, "  {stat}fn {}{}", m.runtime_name, m.descriptor);
            write_body(&mut out, &m.body);
        }
    }
    for file in &program.files {
        let _ = writeln!(out, "file {}", file.name);
        write_block(&mut out, &file.body);
    }
    out
}

fn write_body(out: &mut String, body: &MethodBody) {
    match body {
        MethodBody::Snuggle(code) | MethodBody::Custom(code) => write_block(out, code),
        MethodBody::Interface => {
            let _ = writeln!(out, "    <abstract>");
        }
    }
}

fn write_block(out: &mut String, code: &[Instruction]) {
    for insn in flatten(code) {
        let _ = writeln!(out, "    {insn:?}");
    }
}
