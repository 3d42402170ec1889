//! Constraint file fallback.

use super::CONSTRAINT_SUFFIX;
use crate::store::FileStore;
use tracing::{debug, info};

/// Picks the constraint file for place-and-route.
///
/// The configured name wins when present. Otherwise the first file with the
/// constraint suffix in store order is used, and with none present the
/// stage runs unconstrained.
#[must_use]
pub fn select_constraint_file(files: &FileStore, configured: &str) -> Option<String> {
    if !configured.is_empty() && files.contains(configured) {
        debug!(file = configured, "Using configured constraint file");
        return Some(configured.to_string());
    }

    let fallback = files.paths_with_suffix(CONSTRAINT_SUFFIX).next().map(str::to_string);
    match &fallback {
        Some(file) => info!(
            configured,
            file = file.as_str(),
            "Configured constraint file not found; falling back"
        ),
        None => info!(configured, "No constraint file available; running unconstrained"),
    }
    fallback
}
