//! Plural layouts: the flattened leaves of a type.
//!
//! A plural value occupies one slot range (or field group) per *leaf*: a
//! recursively-flattened non-static field whose type is not itself plural.
//! The lowerer asks questions like "which slots does `pos.x` live in" and
//! "which leaves does this consumer actually want"; both are answered from
//! the leaf list.

use snuggle_ir::BasicKind;
use snuggle_typeck::{TypeCtx, TypeId};

/// One leaf of a type's layout.
#[derive(Debug, Clone)]
pub struct Leaf {
    /// Field names from the root of the value down to this leaf. Empty for
    /// non-plural types, which are their own single leaf.
    pub path: Vec<String>,
    /// The leaf's (non-plural) type.
    pub ty: TypeId,
    pub kind: BasicKind,
    /// Slot offset from the start of the value.
    pub offset: u32,
    /// Host descriptor of the leaf.
    pub descriptor: String,
}

impl Leaf {
    /// The `$`-joined runtime path of this leaf under a root field name.
    pub fn runtime_name_under(&self, root: &str) -> String {
        let mut parts = vec![root.to_string()];
        parts.extend(self.path.iter().cloned());
        snuggle_ir::names::field_path_name(&parts)
    }

    /// The `$`-joined path of the leaf itself (no root prefix).
    pub fn path_name(&self) -> String {
        snuggle_ir::names::field_path_name(&self.path)
    }
}

/// Compute the leaf list of a type. Enums flatten to their single `i32`
/// discriminant; every other plural recurses through its instance fields.
pub fn layout(ctx: &TypeCtx<'_>, ty: TypeId) -> Vec<Leaf> {
    let mut out = Vec::new();
    build(ctx, ty, &mut Vec::new(), &mut 0, &mut out);
    out
}

fn build(ctx: &TypeCtx<'_>, ty: TypeId, path: &mut Vec<String>, offset: &mut u32, out: &mut Vec<Leaf>) {
    let def = ctx.def(ty);
    if def.is_plural() && !matches!(def.kind, snuggle_typeck::TypeKind::Enum) {
        for field in ctx.instance_fields(ty) {
            path.push(field.name.clone());
            build(ctx, field.ty, path, offset, out);
            path.pop();
        }
        return;
    }
    let kind = ctx.basic_kind(ty);
    let descriptor = ctx
        .descriptor_list(ty)
        .into_iter()
        .next()
        .unwrap_or_else(|| "V".to_string());
    out.push(Leaf {
        path: path.clone(),
        ty,
        kind,
        offset: *offset,
        descriptor,
    });
    *offset += kind.slots();
}

/// The leaves a consumer asking for `prefix` actually wants, in layout
/// order. An empty prefix selects everything.
pub fn select<'l>(leaves: &'l [Leaf], prefix: &[String]) -> Vec<&'l Leaf> {
    leaves
        .iter()
        .filter(|leaf| leaf.path.len() >= prefix.len() && leaf.path[..prefix.len()] == *prefix)
        .collect()
}
