//! The type arena: every specialized type the checker ever produces.
//!
//! A [`TypeId`] is a stable index into the arena; handing out indices
//! instead of references lets cyclic type graphs (class `A` with a field of
//! class `B` and vice versa) exist without cyclic ownership. A slot is
//! allocated first and its members are filled exactly once afterwards, so a
//! specialization can be entered into the cache *before* its members are
//! computed -- that placeholder is what breaks self-referential
//! specialization cycles.

use snuggle_parser::ast::{FloatWidth, IntWidth};
use snuggle_resolver::{BuiltinKind, DefId};

use crate::method::MethodTemplate;

/// A stable index into the type arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub u32);

/// The shape of a specialized type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// A basic builtin (bool, int widths, float widths, object, string,
    /// print, the int-literal type).
    Builtin(BuiltinKind),
    /// `Option<T>` over a reference type: a nullable reference, one slot.
    Option,
    /// A bridged host class.
    Reflected(usize),
    /// A source-defined reference type.
    Class,
    /// A source-defined plural value type.
    Struct,
    /// A source-defined value type with one `i32` discriminant leaf.
    Enum,
    /// An anonymous plural value type; the empty tuple is the unit type.
    Tuple,
    /// The erased interface behind a function type.
    Func,
    /// One lambda's implementation class of its function interface.
    FuncImpl,
}

/// Cache key for the typing cache: which constructor, at which arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKey {
    /// A named definition (source-defined, builtin, or reflected) applied
    /// to type arguments.
    Def(DefId, Vec<TypeId>),
    Tuple(Vec<TypeId>),
    Func(Vec<TypeId>, TypeId),
}

/// One specialized type.
///
/// `members` is `None` between allocation and the end of the owning
/// specialization; nothing reads members in that window except field types,
/// which only need the `TypeId` itself.
#[derive(Debug)]
pub struct TypeDef {
    /// Display name, e.g. `Box<i32>`.
    pub name: String,
    /// Mangled name of the emitted class, e.g. `Box_i32`.
    pub runtime_name: String,
    pub kind: TypeKind,
    /// The definition this type specializes, where one exists.
    pub origin: Option<DefId>,
    /// Generic arguments for `Def` keys; element types for tuples; parameter
    /// types then return type for func types.
    pub args: Vec<TypeId>,
    pub members: Option<TypeMembers>,
    /// Lazily computed stack-slot count with cycle detection.
    pub slots: SlotsState,
}

/// Members of a specialized type: signatures only. Method bodies stay
/// lazy inside the method instances.
#[derive(Debug)]
pub struct TypeMembers {
    /// Primary supertype. For func impls this is the implemented interface.
    pub supertype: Option<TypeId>,
    pub fields: Vec<FieldDef>,
    /// Method templates in source order, impl-block methods appended.
    pub methods: Vec<MethodTemplate>,
}

/// One field of a specialized type.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeId,
    pub is_static: bool,
    /// Enum variants are static fields whose reads lower to this constant.
    pub const_index: Option<i32>,
}

/// Progress of the stack-slot computation for one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotsState {
    Unknown,
    /// Currently being computed; revisiting means the type contains itself
    /// by value.
    InProgress,
    Known(u32),
}

impl TypeDef {
    /// Whether values of this type live behind a reference.
    pub fn is_reference_type(&self) -> bool {
        match self.kind {
            TypeKind::Builtin(kind) => matches!(
                kind,
                BuiltinKind::Object | BuiltinKind::Str | BuiltinKind::Print
            ),
            TypeKind::Option
            | TypeKind::Reflected(_)
            | TypeKind::Class
            | TypeKind::Func
            | TypeKind::FuncImpl => true,
            TypeKind::Struct | TypeKind::Enum | TypeKind::Tuple => false,
        }
    }

    /// Whether this is a plural type: laid out as a concatenation of its
    /// fields, never on the stack as a single word.
    pub fn is_plural(&self) -> bool {
        matches!(self.kind, TypeKind::Struct | TypeKind::Enum | TypeKind::Tuple)
    }

    /// The builtin int width, if this is an int type.
    pub fn int_width(&self) -> Option<IntWidth> {
        match self.kind {
            TypeKind::Builtin(BuiltinKind::Int(w)) => Some(w),
            _ => None,
        }
    }

    /// The builtin float width, if this is a float type.
    pub fn float_width(&self) -> Option<FloatWidth> {
        match self.kind {
            TypeKind::Builtin(BuiltinKind::Float(w)) => Some(w),
            _ => None,
        }
    }

    /// Whether this is the compile-time int-literal type.
    pub fn is_int_literal(&self) -> bool {
        matches!(self.kind, TypeKind::Builtin(BuiltinKind::IntLiteral))
    }

    /// Fields in declaration order, skipping statics: the plural layout.
    pub fn instance_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.members
            .as_ref()
            .map(|m| m.fields.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter(|f| !f.is_static)
    }
}
