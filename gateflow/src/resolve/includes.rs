//! Flat `` `include `` scan over Verilog sources.

use super::SOURCE_SUFFIX;
use crate::store::FileStore;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::debug;

#[allow(clippy::expect_used)]
static INCLUDE_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*`include\s+"([^"]+)""#).expect("include pattern is valid")
});

/// Returns every file name referenced by an include directive in `text`.
#[must_use]
pub fn scan_includes(text: &str) -> Vec<String> {
    INCLUDE_DIRECTIVE
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Selects root sources: source files that no other source includes.
///
/// Resolution is a single flat scan, not a transitive closure. Included
/// files stay in the store so synthesis can resolve the directive itself;
/// they are only left out of the explicit read list.
#[derive(Debug, Clone)]
pub struct IncludeResolver {
    suffix: String,
}

impl Default for IncludeResolver {
    fn default() -> Self {
        Self::new(SOURCE_SUFFIX)
    }
}

impl IncludeResolver {
    /// Creates a resolver for sources ending with `suffix`.
    #[must_use]
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    /// Returns the set of names referenced by any candidate source.
    ///
    /// Sources that are not valid UTF-8 count as including nothing.
    #[must_use]
    pub fn referenced(&self, files: &FileStore) -> BTreeSet<String> {
        let mut referenced = BTreeSet::new();
        for path in files.paths_with_suffix(&self.suffix) {
            match files.text(path) {
                Some(text) => referenced.extend(scan_includes(text)),
                None => debug!(path, "Source is not valid UTF-8; treating as include-free"),
            }
        }
        referenced
    }

    /// Returns candidate sources never referenced by another source, in
    /// store order.
    ///
    /// A file that includes others and is itself included is not a root.
    #[must_use]
    pub fn roots(&self, files: &FileStore) -> Vec<String> {
        let referenced = self.referenced(files);
        let roots: Vec<String> = files
            .paths_with_suffix(&self.suffix)
            .filter(|path| !referenced.contains(*path))
            .map(str::to_string)
            .collect();

        debug!(
            candidates = files.paths_with_suffix(&self.suffix).count(),
            referenced = referenced.len(),
            roots = roots.len(),
            "Resolved root sources"
        );
        roots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scan_includes() {
        let text = "`include \"defs.vh\"\nmodule a;\n  `include \"inner.v\"\nendmodule\n";
        assert_eq!(scan_includes(text), vec!["defs.vh", "inner.v"]);
    }

    #[test]
    fn test_scan_ignores_mid_line_mentions() {
        let text = "// see `include \"nope.v\"\nmodule a; endmodule\n";
        assert!(scan_includes(text).is_empty());
    }

    #[test]
    fn test_roots_exclude_included_files() {
        let files = FileStore::new()
            .with_file("A.v", "`include \"B.v\"\nmodule a; endmodule\n")
            .with_file("B.v", "module b; endmodule\n")
            .with_file("C.v", "module c; endmodule\n");

        let roots = IncludeResolver::default().roots(&files);

        assert_eq!(roots, vec!["A.v", "C.v"]);
        assert!(files.contains("B.v"));
    }

    #[test]
    fn test_included_includer_is_not_a_root() {
        let files = FileStore::new()
            .with_file("top.v", "`include \"mid.v\"\n")
            .with_file("mid.v", "`include \"leaf.v\"\n")
            .with_file("leaf.v", "module leaf; endmodule\n");

        assert_eq!(IncludeResolver::default().roots(&files), vec!["top.v"]);
    }

    #[test]
    fn test_resolution_is_not_transitive() {
        // Only direct references count; a.v is reached from nowhere.
        let files = FileStore::new()
            .with_file("a.v", "module a; endmodule\n")
            .with_file("b.v", "`include \"c.v\"\n")
            .with_file("c.v", "module c; endmodule\n");

        assert_eq!(IncludeResolver::default().roots(&files), vec!["a.v", "b.v"]);
    }

    #[test]
    fn test_invalid_utf8_counts_as_no_includes() {
        let files = FileStore::new()
            .with_file("bad.v", [0xffu8, 0xfe, b'`'])
            .with_file("good.v", "module good; endmodule\n");

        assert_eq!(
            IncludeResolver::default().roots(&files),
            vec!["bad.v", "good.v"]
        );
    }

    #[test]
    fn test_non_sources_are_not_scanned() {
        let files = FileStore::new()
            .with_file("notes.txt", "`include \"a.v\"\n")
            .with_file("a.v", "module a; endmodule\n");

        assert_eq!(IncludeResolver::default().roots(&files), vec!["a.v"]);
    }

    #[test]
    fn test_circular_includes_leave_no_roots() {
        let files = FileStore::new()
            .with_file("x.v", "`include \"y.v\"\n")
            .with_file("y.v", "`include \"x.v\"\n");

        assert!(IncludeResolver::default().roots(&files).is_empty());
    }
}
