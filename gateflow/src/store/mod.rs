//! Virtual file store.
//!
//! The store is the exchange medium between pipeline stages and between the
//! orchestrator and its host. Content is opaque bytes.

mod file_store;

pub use file_store::{validate_path, FileStore, VirtualFile};
