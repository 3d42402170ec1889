//! Configuration types.
//!
//! - [`BuildConfig`]: per-project settings from `config.json`
//! - [`ToolchainConfig`]: which programs run each stage

mod build;
mod toolchain;

pub use build::{BuildConfig, CONFIG_FILE_NAME};
pub use toolchain::{InstallPolicy, ToolchainConfig};
