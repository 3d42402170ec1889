//! Pre-stage input selection.
//!
//! - Include resolution picks the root sources handed to synthesis
//! - Constraint selection picks the file bound to place-and-route

mod constraints;
mod includes;

pub use constraints::select_constraint_file;
pub use includes::{scan_includes, IncludeResolver};

/// Suffix marking primary-language (Verilog) sources.
pub const SOURCE_SUFFIX: &str = ".v";

/// Suffix marking physical constraint files.
pub const CONSTRAINT_SUFFIX: &str = ".cst";
