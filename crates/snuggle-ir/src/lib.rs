// Instruction IR for the Snuggle compiler.
//
// The lowerer emits this vocabulary; the bytecode writer (an external
// collaborator) drains it and serializes class files. Everything here is
// fully erased: types appear only as stack-slot kinds and descriptor
// strings, so the IR has no dependency on the type checker.

pub mod instruction;
pub mod names;
pub mod program;

pub use instruction::{BasicKind, CallKind, ConstValue, FieldRef, Instruction, LabelId, MethodRef, RawOp};
pub use program::{
    GeneratedClass, GeneratedField, GeneratedFile, GeneratedFuncImpl, GeneratedFuncType,
    GeneratedMethod, GeneratedType, GeneratedValueType, IrProgram, MethodBody,
};
