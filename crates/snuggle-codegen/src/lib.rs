// Lowering for the Snuggle compiler: typed AST to instruction IR.
//
// The centerpiece is the plural-type protocol -- aggregate value types are
// flattened into independent slots, fields, and static return channels; a
// plural value never touches the operand stack as a single word.

pub mod error;
pub mod generate;
pub mod layout;
pub mod lower;

pub use error::{LowerError, LowerErrorKind};
pub use generate::{ctor_descriptor, method_descriptor};
pub use layout::{layout, select, Leaf};
pub use lower::{lower_program, Lowerer};
