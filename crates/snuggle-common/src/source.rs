//! Source-file access for the compiler.
//!
//! Files are identified by string path (the same strings `import` uses).
//! The resolver discovers imported files on demand through a [`FileLoader`],
//! so the driver decides where sources come from: disk for `snugglec`,
//! an in-memory [`SourceSet`] for tests.

use rustc_hash::FxHashMap;

/// Supplies source text for a file name, or `None` if the file is unknown.
///
/// Implementations must be stable for the duration of a compile: asking for
/// the same name twice returns the same text.
pub trait FileLoader {
    fn load(&self, name: &str) -> Option<&str>;
}

/// An in-memory set of source files keyed by name.
#[derive(Debug, Default)]
pub struct SourceSet {
    files: FxHashMap<String, String>,
}

impl SourceSet {
    /// Create an empty source set.
    pub fn new() -> Self {
        Self { files: FxHashMap::default() }
    }

    /// Insert a file, replacing any previous content under the same name.
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.files.insert(name.into(), text.into());
    }

    /// Build a source set from (name, text) pairs.
    pub fn from_pairs<N, T>(pairs: impl IntoIterator<Item = (N, T)>) -> Self
    where
        N: Into<String>,
        T: Into<String>,
    {
        let mut set = Self::new();
        for (name, text) in pairs {
            set.insert(name, text);
        }
        set
    }

    /// Number of files in the set.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the set contains no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileLoader for SourceSet {
    fn load(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_set_lookup() {
        let set = SourceSet::from_pairs([("main", "1"), ("lib", "2")]);
        assert_eq!(set.load("main"), Some("1"));
        assert_eq!(set.load("lib"), Some("2"));
        assert_eq!(set.load("missing"), None);
        assert_eq!(set.len(), 2);
    }
}
