use std::collections::BTreeMap;
use std::path::PathBuf;

/// Read-only key-value store of named standards documents.
///
/// Missing entries are an absent-but-legal state, never an error: the
/// resolver silently skips documents the store does not have.
pub trait StandardsStore {
    /// Return the body of the document named `name`, if present.
    fn read(&self, name: &str) -> Option<String>;

    /// Whether the store root exists at all. An absent store yields an
    /// empty bundle.
    fn exists(&self) -> bool;
}

/// Filesystem-backed store: one document per file under a directory.
///
/// # Examples
///
/// ```no_run
/// use magpie_standards::{DirStore, StandardsStore};
///
/// let store = DirStore::new("standards");
/// let global = store.read("global.md");
/// ```
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Create a store rooted at `root`. The directory does not need to
    /// exist yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl StandardsStore for DirStore {
    fn read(&self, name: &str) -> Option<String> {
        std::fs::read_to_string(self.root.join(name)).ok()
    }

    fn exists(&self) -> bool {
        self.root.is_dir()
    }
}

/// In-memory store, primarily for tests and dry runs.
///
/// # Examples
///
/// ```
/// use magpie_standards::{MemoryStore, StandardsStore};
///
/// let store = MemoryStore::new([("global.md", "Be kind.")]);
/// assert_eq!(store.read("global.md").as_deref(), Some("Be kind."));
/// assert!(store.read("python.md").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    docs: BTreeMap<String, String>,
}

impl MemoryStore {
    /// Build a store from `(name, body)` pairs.
    pub fn new<I, K, V>(docs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            docs: docs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// An empty store that reports itself as absent.
    pub fn absent() -> Self {
        Self::default()
    }
}

impl StandardsStore for MemoryStore {
    fn read(&self, name: &str) -> Option<String> {
        self.docs.get(name).cloned()
    }

    fn exists(&self) -> bool {
        !self.docs.is_empty()
    }
}
