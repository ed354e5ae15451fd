//! Runtime-name construction.
//!
//! The target class-file format is stricter about identifiers than Snuggle
//! is, and plural lowering multiplies one source name into many runtime
//! names. All of that string surgery lives here so the conventions stay in
//! one place:
//!
//! - plural-field paths join with `$` (`pos$x`),
//! - plural-return static channels are `RETURN! $` + the leaf path,
//! - characters illegal in host class/field names are normalized to `$`.

/// The constructor name on the target VM.
pub const CTOR_NAME: &str = "<init>";

/// Prefix for the static fields that carry the non-first leaves of a plural
/// return value.
pub const RETURN_CHANNEL_PREFIX: &str = "RETURN! ";

/// Normalize a source-level name into a host-legal identifier chunk.
///
/// File paths are the main offender (`dir/lib`); dots and the host's own
/// reserved punctuation get the same treatment.
pub fn mangle(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '.' | ';' | '[' | '<' | '>' => '$',
            other => other,
        })
        .collect()
}

/// Runtime class name for a source file's top-level code.
pub fn file_class_name(file: &str) -> String {
    format!("file${}", mangle(file))
}

/// Runtime field name for a leaf reached through a chain of plural fields.
pub fn field_path_name(path: &[String]) -> String {
    path.join("$")
}

/// Runtime name of the static return channel carrying one non-first leaf.
pub fn return_channel_name(leaf_path: &str) -> String {
    format!("{RETURN_CHANNEL_PREFIX}${leaf_path}")
}

/// Runtime name for a method among same-named siblings: the first keeps the
/// source name, later ones get a `$n` disambiguation suffix in source order.
pub fn disambiguated_name(name: &str, index: u32) -> String {
    if index == 0 {
        name.to_string()
    } else {
        format!("{name}${index}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mangle_normalizes_slashes_and_dots() {
        assert_eq!(mangle("dir/lib.snuggle"), "dir$lib$snuggle");
        assert_eq!(mangle("plain"), "plain");
    }

    #[test]
    fn file_class_names() {
        assert_eq!(file_class_name("main"), "file$main");
        assert_eq!(file_class_name("a/b"), "file$a$b");
    }

    #[test]
    fn field_paths_join_with_dollar() {
        let path = vec!["pos".to_string(), "x".to_string()];
        assert_eq!(field_path_name(&path), "pos$x");
    }

    #[test]
    fn return_channels_carry_prefix() {
        assert_eq!(return_channel_name("b"), "RETURN! $b");
        assert_eq!(return_channel_name("a$y"), "RETURN! $a$y");
    }

    #[test]
    fn disambiguation_starts_at_zero() {
        assert_eq!(disambiguated_name("f", 0), "f");
        assert_eq!(disambiguated_name("f", 1), "f$1");
        assert_eq!(disambiguated_name("f", 2), "f$2");
    }
}
