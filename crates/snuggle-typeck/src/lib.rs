// Type checking for the Snuggle compiler.
//
// Consumes the resolved AST and produces typed files plus the arena of
// every specialized type and method instance in the program. Generic
// specialization is monomorphizing and cached by argument-tuple equality;
// method bodies are checked lazily from an explicit worklist so that
// mutually recursive signatures never chase each other's bodies.

pub mod builtins;
pub mod check;
pub mod error;
pub mod method;
pub mod reflect;
pub mod ty;
pub mod typed;

pub use check::{check_program, TypeCtx, TypedProgram};
pub use error::{TypeError, TypeErrorKind};
pub use method::{BodyState, MethodId, MethodInstance, MethodKind};
pub use reflect::{
    ReflectError, ReflectRegistry, ReflectedClass, ReflectedClassBuilder, ReflectedType,
};
pub use ty::{FieldDef, TypeDef, TypeId, TypeKind};
pub use typed::{Constant, TypedBody, TypedExpr, TypedExprKind, TypedFile};
