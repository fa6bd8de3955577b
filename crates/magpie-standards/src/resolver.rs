use std::collections::BTreeSet;

use magpie_core::StandardsConfig;

use crate::store::StandardsStore;

/// Marker that names the new-revision path of a changed file in a
/// unified diff.
const ADDED_FILE_MARKER: &str = "+++ b/";

/// Document name of the unconditional global standard.
const GLOBAL_DOC: &str = "global.md";

/// Collect the set of file extensions touched by a diff.
///
/// Scans for `+++ b/<path>` lines and takes the substring after the last
/// `.` in each path, lower-cased. Paths without a dot contribute nothing.
/// The returned set is deduplicated and sorted.
///
/// # Examples
///
/// ```
/// use magpie_standards::changed_extensions;
///
/// let diff = "+++ b/src/app.PY\n+++ b/README\n+++ b/web/site.css\n";
/// let exts: Vec<_> = changed_extensions(diff).into_iter().collect();
/// assert_eq!(exts, vec!["css".to_string(), "py".to_string()]);
/// ```
pub fn changed_extensions(diff: &str) -> BTreeSet<String> {
    let mut extensions = BTreeSet::new();
    for line in diff.lines() {
        let Some(path) = line.strip_prefix(ADDED_FILE_MARKER) else {
            continue;
        };
        let Some((_, ext)) = path.rsplit_once('.') else {
            continue;
        };
        if ext.is_empty() {
            continue;
        }
        extensions.insert(ext.to_lowercase());
    }
    extensions
}

/// Build the standards bundle for a diff.
///
/// The global document, when present, is always prepended under a
/// `GLOBAL STANDARDS` section. Each changed extension that the config
/// maps to a document present in the store contributes its own labeled
/// section, in sorted extension order. Missing mapping entries and
/// missing documents are skipped silently; an absent store yields an
/// empty bundle.
///
/// # Examples
///
/// ```
/// use magpie_core::StandardsConfig;
/// use magpie_standards::{resolve, MemoryStore};
///
/// let store = MemoryStore::new([("global.md", "Write tests.")]);
/// let bundle = resolve("", &store, &StandardsConfig::default());
/// assert!(bundle.contains("--- GLOBAL STANDARDS ---"));
/// assert!(bundle.contains("Write tests."));
/// ```
pub fn resolve(diff: &str, store: &dyn StandardsStore, config: &StandardsConfig) -> String {
    if !store.exists() {
        return String::new();
    }

    let mut bundle = String::new();

    if let Some(body) = store.read(GLOBAL_DOC) {
        bundle.push_str(&format!("\n--- GLOBAL STANDARDS ---\n{body}\n"));
    }

    for ext in changed_extensions(diff) {
        let Some(doc_name) = config.map.get(&ext) else {
            tracing::debug!(extension = %ext, "no standards mapping, skipping");
            continue;
        };
        let Some(body) = store.read(doc_name) else {
            tracing::debug!(document = %doc_name, "standards document missing, skipping");
            continue;
        };
        bundle.push_str(&format!(
            "\n--- SPECIFIC STANDARDS ({}) ---\n{body}\n",
            ext.to_uppercase()
        ));
    }

    bundle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn full_store() -> MemoryStore {
        MemoryStore::new([
            ("global.md", "global body"),
            ("python.md", "python body"),
            ("style.md", "css body"),
            ("react.md", "react body"),
        ])
    }

    #[test]
    fn empty_diff_yields_global_only() {
        let bundle = resolve("", &full_store(), &StandardsConfig::default());
        assert!(bundle.contains("--- GLOBAL STANDARDS ---"));
        assert!(bundle.contains("global body"));
        assert!(!bundle.contains("SPECIFIC"));
    }

    #[test]
    fn unrecognized_lines_are_ignored() {
        let diff = "diff --git a/x b/x\n--- a/src/app.py\n+added line.py\ncontext.css\n";
        let bundle = resolve(diff, &full_store(), &StandardsConfig::default());
        // Only `+++ b/` lines count; none of the above qualify.
        assert!(!bundle.contains("SPECIFIC"));
    }

    #[test]
    fn mapped_extensions_get_sections_unknown_dropped() {
        let diff = "+++ b/src/app.py\n+++ b/web/site.css\n+++ b/data/blob.xyz\n";
        let bundle = resolve(diff, &full_store(), &StandardsConfig::default());

        assert!(bundle.contains("--- SPECIFIC STANDARDS (PY) ---"));
        assert!(bundle.contains("python body"));
        assert!(bundle.contains("--- SPECIFIC STANDARDS (CSS) ---"));
        assert!(bundle.contains("css body"));
        assert!(!bundle.contains("XYZ"));
    }

    #[test]
    fn jsx_and_tsx_share_the_react_document() {
        let diff = "+++ b/ui/App.jsx\n+++ b/ui/Nav.tsx\n";
        let bundle = resolve(diff, &full_store(), &StandardsConfig::default());
        assert!(bundle.contains("(JSX)"));
        assert!(bundle.contains("(TSX)"));
        // Both sections carry the same document body
        assert_eq!(bundle.matches("react body").count(), 2);
    }

    #[test]
    fn mapped_but_missing_document_is_skipped() {
        let store = MemoryStore::new([("global.md", "global body")]);
        let diff = "+++ b/src/app.py\n";
        let bundle = resolve(diff, &store, &StandardsConfig::default());
        assert!(bundle.contains("global body"));
        assert!(!bundle.contains("PY"));
    }

    #[test]
    fn absent_store_yields_empty_bundle() {
        let diff = "+++ b/src/app.py\n";
        let bundle = resolve(diff, &MemoryStore::absent(), &StandardsConfig::default());
        assert_eq!(bundle, "");
    }

    #[test]
    fn missing_global_is_not_an_error() {
        let store = MemoryStore::new([("python.md", "python body")]);
        let diff = "+++ b/src/app.py\n";
        let bundle = resolve(diff, &store, &StandardsConfig::default());
        assert!(!bundle.contains("GLOBAL"));
        assert!(bundle.contains("python body"));
    }

    #[test]
    fn extensions_are_lowercased_and_deduplicated() {
        let diff = "+++ b/a.PY\n+++ b/b.py\n+++ b/c.Py\n";
        let exts: Vec<_> = changed_extensions(diff).into_iter().collect();
        assert_eq!(exts, vec!["py".to_string()]);
    }

    #[test]
    fn dotless_paths_contribute_no_extension() {
        let diff = "+++ b/Makefile\n+++ b/bin/run\n";
        assert!(changed_extensions(diff).is_empty());
    }

    #[test]
    fn resolve_is_deterministic() {
        let diff = "+++ b/web/site.css\n+++ b/src/app.py\n";
        let config = StandardsConfig::default();
        let first = resolve(diff, &full_store(), &config);
        let second = resolve(diff, &full_store(), &config);
        assert_eq!(first, second);
        // Sorted extension order: css section before py section
        let css_at = first.find("(CSS)").unwrap();
        let py_at = first.find("(PY)").unwrap();
        assert!(css_at < py_at);
    }
}
