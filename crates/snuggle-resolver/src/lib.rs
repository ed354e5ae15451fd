// Name resolution for the Snuggle compiler.
//
// Turns parsed ASTs into resolved ASTs: every type identifier becomes a
// handle into the definition arena, forward and cyclic references included.
// Resolution also discovers imported files, so this pass is where the
// compile grows from one file to the full program.

pub mod arena;
pub mod ast;
pub mod error;
pub mod resolve;
pub mod scope;

pub use arena::{BuiltinKind, DefArena, DefId, ImplTable, ResolvedTypeDef, SnuggleTypeDef, SnuggleTypeDefKind};
pub use ast::{ResolvedExpr, ResolvedExprKind, ResolvedField, ResolvedFile, ResolvedMethod, ResolvedPattern, ResolvedPatternKind, ResolvedType};
pub use error::{ResolveError, ResolveErrorKind};
pub use resolve::{resolve_program, BuiltinIds, ResolvedProgram};
pub use scope::{Scope, ScopeEntry};
