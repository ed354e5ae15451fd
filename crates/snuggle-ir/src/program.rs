//! The lowered program: generated types plus per-file top-level code.

use serde::Serialize;

use crate::instruction::Instruction;

/// The complete output of the lowerer, ready for the bytecode writer.
#[derive(Debug, Default, Serialize)]
pub struct IrProgram {
    /// Every class file the writer must emit, in generation order.
    pub types: Vec<GeneratedType>,
    /// Top-level instruction block per source file, in compile order.
    /// `RunImport` instructions refer to entries of this list by name.
    pub files: Vec<GeneratedFile>,
}

impl IrProgram {
    /// Find a generated file's top-level block by name.
    pub fn file(&self, name: &str) -> Option<&GeneratedFile> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Find a generated type by runtime name.
    pub fn type_named(&self, runtime_name: &str) -> Option<&GeneratedType> {
        self.types.iter().find(|t| t.runtime_name() == runtime_name)
    }
}

/// One source file's top-level code.
#[derive(Debug, Serialize)]
pub struct GeneratedFile {
    pub name: String,
    pub body: Vec<Instruction>,
}

/// A class file to emit.
#[derive(Debug, Serialize)]
pub enum GeneratedType {
    /// A reference type.
    Class(GeneratedClass),
    /// A plural value type: instance data never exists at runtime, so the
    /// emitted class carries only statics, return channels, and methods.
    ValueType(GeneratedValueType),
    /// The erased interface for one function type.
    FuncType(GeneratedFuncType),
    /// One lambda's implementation of its function interface.
    FuncImpl(GeneratedFuncImpl),
}

impl GeneratedType {
    /// The runtime name of the emitted class, whatever its shape.
    pub fn runtime_name(&self) -> &str {
        match self {
            GeneratedType::Class(c) => &c.runtime_name,
            GeneratedType::ValueType(v) => &v.runtime_name,
            GeneratedType::FuncType(f) => &f.runtime_name,
            GeneratedType::FuncImpl(f) => &f.runtime_name,
        }
    }

    /// The methods of the emitted class.
    pub fn methods(&self) -> &[GeneratedMethod] {
        match self {
            GeneratedType::Class(c) => &c.methods,
            GeneratedType::ValueType(v) => &v.methods,
            GeneratedType::FuncType(f) => &f.methods,
            GeneratedType::FuncImpl(f) => &f.methods,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GeneratedClass {
    pub runtime_name: String,
    /// Runtime name of the primary supertype.
    pub supertype: String,
    /// Leaf-expanded instance and static fields.
    pub fields: Vec<GeneratedField>,
    pub methods: Vec<GeneratedMethod>,
}

#[derive(Debug, Serialize)]
pub struct GeneratedValueType {
    pub runtime_name: String,
    pub supertype: String,
    /// Source-level static fields, leaf-expanded.
    pub static_fields: Vec<GeneratedField>,
    /// The static channels used to carry plural returns of this type: one
    /// per leaf after the first.
    pub returning_fields: Vec<GeneratedField>,
    pub methods: Vec<GeneratedMethod>,
}

#[derive(Debug, Serialize)]
pub struct GeneratedFuncType {
    pub runtime_name: String,
    /// Exactly one abstract `invoke` slot today, kept as a list to match
    /// the emitted class shape.
    pub methods: Vec<GeneratedMethod>,
}

#[derive(Debug, Serialize)]
pub struct GeneratedFuncImpl {
    pub runtime_name: String,
    /// Runtime name of the func-type interface this lambda implements.
    pub iface: String,
    /// Captured variables, leaf-expanded.
    pub fields: Vec<GeneratedField>,
    pub methods: Vec<GeneratedMethod>,
}

/// One emitted field. `runtime_name` differs from the Snuggle source name
/// whenever the field encodes a plural path or a return channel.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedField {
    pub runtime_name: String,
    pub descriptor: String,
    pub runtime_static: bool,
}

/// One emitted method.
#[derive(Debug, Serialize)]
pub struct GeneratedMethod {
    pub runtime_name: String,
    pub descriptor: String,
    pub is_static: bool,
    pub body: MethodBody,
}

/// What the writer puts in the method's code attribute.
#[derive(Debug, Serialize)]
pub enum MethodBody {
    /// A user-written body, lowered to instructions.
    Snuggle(Vec<Instruction>),
    /// A compiler-synthesized body (constructors of func impls and the
    /// like); same instruction vocabulary, no Snuggle source behind it.
    Custom(Vec<Instruction>),
    /// An abstract interface slot: no code.
    Interface,
}

impl MethodBody {
    /// The instruction block, if this body has one.
    pub fn instructions(&self) -> Option<&[Instruction]> {
        match self {
            MethodBody::Snuggle(code) | MethodBody::Custom(code) => Some(code),
            MethodBody::Interface => None,
        }
    }
}

/// Depth-first flattening of an instruction block, entering `CodeBlock`
/// groups. This is the stream the writer drains; dropping the iterator
/// cancels emission with no cleanup required.
pub fn flatten(block: &[Instruction]) -> Vec<&Instruction> {
    let mut out = Vec::new();
    fn walk<'a>(block: &'a [Instruction], out: &mut Vec<&'a Instruction>) {
        for insn in block {
            match insn {
                Instruction::CodeBlock(inner) => walk(inner, out),
                other => out.push(other),
            }
        }
    }
    walk(block, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{BasicKind, ConstValue};

    #[test]
    fn flatten_enters_code_blocks() {
        let block = vec![
            Instruction::CodeBlock(vec![
                Instruction::Push { value: ConstValue::Int(1), kind: BasicKind::Int },
                Instruction::CodeBlock(vec![Instruction::Pop(BasicKind::Int)]),
            ]),
            Instruction::Return(None),
        ];
        let flat = flatten(&block);
        assert_eq!(flat.len(), 3);
        assert!(matches!(flat[0], Instruction::Push { .. }));
        assert!(matches!(flat[1], Instruction::Pop(_)));
        assert!(matches!(flat[2], Instruction::Return(None)));
    }
}
