//! In-memory mapping from logical path to binary content.

use crate::errors::StoreError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path};
use std::sync::Arc;

/// Shared, immutable file content.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
struct FileContent(#[serde(with = "base64_bytes")] Arc<[u8]>);

impl fmt::Debug for FileContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} bytes>", self.0.len())
    }
}

/// A single file borrowed from a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualFile<'a> {
    /// Logical path, `/`-separated and relative.
    pub path: &'a str,
    /// Raw content.
    pub content: &'a [u8],
}

/// Mapping from logical path to content.
///
/// Paths are unique. Content is shared, so cloning a store or merging into
/// it never copies file bytes. Iteration is in path order.
///
/// On the wire a store is a JSON object mapping paths to base64 strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileStore {
    files: BTreeMap<String, FileContent>,
}

impl FileStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a file, returning `self` for chaining.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, content: impl AsRef<[u8]>) -> Self {
        self.insert(path, content);
        self
    }

    /// Inserts or replaces a file.
    pub fn insert(&mut self, path: impl Into<String>, content: impl AsRef<[u8]>) {
        self.files
            .insert(path.into(), FileContent(Arc::from(content.as_ref())));
    }

    /// Returns the content at `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(|c| c.0.as_ref())
    }

    /// Returns the content at `path` decoded as UTF-8.
    ///
    /// `None` if the file is absent or not valid UTF-8.
    #[must_use]
    pub fn text(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    /// Returns true if the store holds `path`.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Returns the number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Returns the total content size in bytes.
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.files.values().map(|c| c.0.len()).sum()
    }

    /// Iterates over all paths.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Iterates over all files.
    pub fn iter(&self) -> impl Iterator<Item = VirtualFile<'_>> {
        self.files.iter().map(|(path, content)| VirtualFile {
            path,
            content: &content.0,
        })
    }

    /// Iterates over paths ending with `suffix`.
    pub fn paths_with_suffix<'a>(&'a self, suffix: &'a str) -> impl Iterator<Item = &'a str> {
        self.paths().filter(move |p| p.ends_with(suffix))
    }

    /// Returns a new store where every path in `delta` overwrites the same
    /// path here and all other entries are kept.
    #[must_use]
    pub fn merge(&self, delta: &Self) -> Self {
        let mut merged = self.clone();
        merged.merge_in(delta.clone());
        merged
    }

    /// Merges `delta` into this store in place.
    pub fn merge_in(&mut self, delta: Self) {
        self.files.extend(delta.files);
    }

    /// Returns a store holding only the listed paths that are present.
    #[must_use]
    pub fn subset<'a>(&self, paths: impl IntoIterator<Item = &'a str>) -> Self {
        let files = paths
            .into_iter()
            .filter_map(|p| self.files.get_key_value(p))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self { files }
    }

    /// Returns the entries that are new or changed relative to `base`.
    #[must_use]
    pub fn diff_from(&self, base: &Self) -> Self {
        let files = self
            .files
            .iter()
            .filter(|(path, content)| base.files.get(path.as_str()) != Some(*content))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self { files }
    }

    /// Returns the hex SHA-256 digest of the file at `path`.
    #[must_use]
    pub fn sha256_hex(&self, path: &str) -> Option<String> {
        self.get(path).map(|bytes| hex::encode(Sha256::digest(bytes)))
    }
}

impl<P, C> FromIterator<(P, C)> for FileStore
where
    P: Into<String>,
    C: AsRef<[u8]>,
{
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (path, content) in iter {
            store.insert(path, content);
        }
        store
    }
}

/// Checks that `path` can be materialized under a working directory.
///
/// Rejects empty paths, absolute paths and any `..` component.
pub fn validate_path(path: &str) -> Result<(), StoreError> {
    if path.is_empty() {
        return Err(StoreError::InvalidPath {
            path: path.to_string(),
            reason: "empty path",
        });
    }
    for component in Path::new(path).components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => {
                return Err(StoreError::InvalidPath {
                    path: path.to_string(),
                    reason: "parent directory reference",
                });
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(StoreError::InvalidPath {
                    path: path.to_string(),
                    reason: "absolute path",
                });
            }
        }
    }
    Ok(())
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::sync::Arc;

    pub fn serialize<S>(bytes: &Arc<[u8]>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Arc<[u8]>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD
            .decode(&s)
            .map(Arc::from)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base() -> FileStore {
        FileStore::new()
            .with_file("a.v", "module a; endmodule")
            .with_file("b.v", "module b; endmodule")
    }

    #[test]
    fn test_merge_overwrites_and_retains() {
        let delta = FileStore::new()
            .with_file("b.v", "replaced")
            .with_file("top.json", "{}");

        let merged = base().merge(&delta);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get("a.v"), Some(&b"module a; endmodule"[..]));
        assert_eq!(merged.get("b.v"), Some(&b"replaced"[..]));
        assert_eq!(merged.get("top.json"), Some(&b"{}"[..]));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let delta = FileStore::new().with_file("b.v", "x").with_file("c.v", "y");
        let once = base().merge(&delta);
        let twice = once.merge(&delta);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_leaves_base_untouched() {
        let original = base();
        let _ = original.merge(&FileStore::new().with_file("a.v", "changed"));
        assert_eq!(original.text("a.v"), Some("module a; endmodule"));
    }

    #[test]
    fn test_lookup_property_over_many_stores() {
        for n in 0..8usize {
            let base: FileStore = (0..n).map(|i| (format!("f{i}"), format!("base{i}"))).collect();
            let delta: FileStore = (0..n)
                .filter(|i| i % 2 == 0)
                .map(|i| (format!("f{i}"), format!("delta{i}")))
                .chain(std::iter::once((format!("new{n}"), "n".to_string())))
                .collect();

            let merged = base.merge(&delta);
            for path in base.paths().chain(delta.paths()) {
                let expected = delta.get(path).or_else(|| base.get(path));
                assert_eq!(merged.get(path), expected, "path {path}");
            }
        }
    }

    #[test]
    fn test_text_rejects_invalid_utf8() {
        let store = FileStore::new().with_file("bin", [0xffu8, 0xfe, 0x00]);
        assert_eq!(store.text("bin"), None);
        assert_eq!(store.get("bin").map(<[u8]>::len), Some(3));
    }

    #[test]
    fn test_paths_with_suffix() {
        let store = base().with_file("pins.cst", "");
        let sources: Vec<_> = store.paths_with_suffix(".v").collect();
        assert_eq!(sources, vec!["a.v", "b.v"]);
    }

    #[test]
    fn test_diff_from_reports_new_and_changed() {
        let after = base().with_file("b.v", "edited").with_file("top.json", "{}");
        let diff = after.diff_from(&base());
        let paths: Vec<_> = diff.paths().collect();
        assert_eq!(paths, vec!["b.v", "top.json"]);
    }

    #[test]
    fn test_subset_skips_missing() {
        let subset = base().subset(["a.v", "nope.v"]);
        assert_eq!(subset.len(), 1);
        assert!(subset.contains("a.v"));
    }

    #[test]
    fn test_wire_format_is_base64_map() {
        let store = FileStore::new().with_file("out.bin", [1u8, 2, 3]);
        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(json, serde_json::json!({"out.bin": "AQID"}));

        let back: FileStore = serde_json::from_value(json).unwrap();
        assert_eq!(back, store);
    }

    #[test]
    fn test_sha256_hex() {
        let store = FileStore::new().with_file("empty", "");
        assert_eq!(
            store.sha256_hex("empty").as_deref(),
            Some("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );
        assert_eq!(store.sha256_hex("missing"), None);
    }

    #[test]
    fn test_validate_path() {
        assert!(validate_path("top.v").is_ok());
        assert!(validate_path("rtl/uart.v").is_ok());
        assert!(validate_path("./rtl/uart.v").is_ok());
        assert!(validate_path("").is_err());
        assert!(validate_path("../escape.v").is_err());
        assert!(validate_path("rtl/../../escape.v").is_err());
        assert!(validate_path("/etc/passwd").is_err());
    }
}
