//! Host-side project handling.
//!
//! A project is a directory of sources, constraint files, helper scripts
//! and an optional `config.json`. Loading walks it recursively and keeps
//! only the files a build reads.

use crate::config::{BuildConfig, CONFIG_FILE_NAME};
use crate::errors::GateflowError;
use crate::resolve::{CONSTRAINT_SUFFIX, SOURCE_SUFFIX};
use crate::store::{validate_path, FileStore};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const SCRIPT_SUFFIX: &str = ".py";

/// Returns true if a project-relative path is loaded for a build.
#[must_use]
pub fn is_project_file(path: &str) -> bool {
    path == CONFIG_FILE_NAME
        || [SOURCE_SUFFIX, CONSTRAINT_SUFFIX, SCRIPT_SUFFIX]
            .iter()
            .any(|suffix| path.ends_with(suffix))
}

/// Loads every build-relevant file under `dir` into a store keyed by
/// `/`-separated relative path.
pub async fn load_project(dir: impl AsRef<Path>) -> Result<FileStore, GateflowError> {
    let root = dir.as_ref();
    let mut store = FileStore::new();
    let mut pending = vec![(root.to_path_buf(), String::new())];

    while let Some((current, prefix)) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let relative = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };

            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                pending.push((entry.path(), relative));
            } else if file_type.is_file() && is_project_file(&relative) {
                store.insert(relative, tokio::fs::read(entry.path()).await?);
            } else {
                debug!(path = %relative, "Skipping project entry");
            }
        }
    }

    info!(
        dir = %root.display(),
        files = store.len(),
        bytes = store.total_bytes(),
        "Loaded project"
    );
    Ok(store)
}

/// Reads `config.json` from `dir`.
///
/// A missing or unparsable file is not an error: a warning is logged and
/// the defaults apply.
pub async fn load_build_config(dir: impl AsRef<Path>) -> BuildConfig {
    let path = dir.as_ref().join(CONFIG_FILE_NAME);
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "No config.json found; using defaults");
            return BuildConfig::default();
        }
    };

    match BuildConfig::from_json(&text) {
        Ok(config) => {
            info!(top = %config.top, output = %config.output, "Loaded config.json");
            config
        }
        Err(e) => {
            warn!(error = %e, "Invalid config.json; using defaults");
            BuildConfig::default()
        }
    }
}

/// Writes a finished artifact into `dir` and returns its path.
pub async fn write_artifact(
    dir: impl AsRef<Path>,
    name: &str,
    bytes: &[u8],
) -> Result<PathBuf, GateflowError> {
    validate_path(name)?;
    let target = dir.as_ref().join(name);
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&target, bytes).await?;
    info!(path = %target.display(), bytes = bytes.len(), "Wrote artifact");
    Ok(target)
}
