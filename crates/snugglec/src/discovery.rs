//! Source discovery for disk-backed compiles.
//!
//! Snuggle files are identified by the string path `import` uses, relative
//! to the project root and without the `.sng` extension. The driver loads
//! the whole tree up front so the resolver's loader hook works against an
//! in-memory [`SourceSet`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use snuggle_common::SourceSet;

/// File extension of Snuggle sources.
pub const EXTENSION: &str = "sng";

/// Recursively load every `.sng` file under `root` into a source set keyed
/// by root-relative, extension-less, slash-separated names.
pub fn load_sources(root: &Path) -> io::Result<SourceSet> {
    let mut set = SourceSet::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|e| e == EXTENSION) {
                let name = source_name(root, &path);
                let text = fs::read_to_string(&path)?;
                set.insert(name, text);
            }
        }
    }
    Ok(set)
}

/// The import name of a source file: root-relative path, forward slashes,
/// no extension.
pub fn source_name(root: &Path, path: &Path) -> String {
    let rel: PathBuf = path
        .strip_prefix(root)
        .unwrap_or(path)
        .with_extension("");
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_names_are_relative_and_extensionless() {
        let root = Path::new("/proj");
        assert_eq!(source_name(root, Path::new("/proj/main.sng")), "main");
        assert_eq!(source_name(root, Path::new("/proj/util/strings.sng")), "util/strings");
    }
}
