//! Project build configuration.

use crate::core::BuildParameters;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};

/// File name of the project configuration.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Project build settings.
///
/// Every key is optional in `config.json`; missing keys take the defaults,
/// which target a Tang Nano 20K board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Top-level module name.
    #[serde(default = "default_top")]
    pub top: String,
    /// Device family.
    #[serde(default = "default_family")]
    pub family: String,
    /// Device identifier.
    #[serde(default = "default_device")]
    pub device: String,
    /// Preferred constraint file.
    #[serde(default = "default_cst")]
    pub cst: String,
    /// Output artifact name.
    #[serde(default = "default_output")]
    pub output: String,
    /// Board name, used by programmers.
    #[serde(default = "default_board")]
    pub board: String,
}

fn default_top() -> String {
    "top".to_string()
}

fn default_family() -> String {
    "GW2A-18C".to_string()
}

fn default_device() -> String {
    "GW2AR-LV18QN88C8/I7".to_string()
}

fn default_cst() -> String {
    "tangnano20k.cst".to_string()
}

fn default_output() -> String {
    "hello.fs".to_string()
}

fn default_board() -> String {
    "tangnano20k".to_string()
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            top: default_top(),
            family: default_family(),
            device: default_device(),
            cst: default_cst(),
            output: default_output(),
            board: default_board(),
        }
    }
}

impl BuildConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `config.json` content, filling missing keys with defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            file: CONFIG_FILE_NAME.to_string(),
            source,
        })
    }

    /// Sets the top module.
    #[must_use]
    pub fn with_top(mut self, top: impl Into<String>) -> Self {
        self.top = top.into();
        self
    }

    /// Sets the device.
    #[must_use]
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    /// Sets the family.
    #[must_use]
    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = family.into();
        self
    }

    /// Sets the constraint file.
    #[must_use]
    pub fn with_cst(mut self, cst: impl Into<String>) -> Self {
        self.cst = cst.into();
        self
    }

    /// Sets the output artifact name.
    #[must_use]
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    /// Returns the immutable parameters for a pipeline run.
    #[must_use]
    pub fn parameters(&self) -> BuildParameters {
        BuildParameters::new(&self.top, &self.output)
            .with_device(&self.device)
            .with_family(&self.family)
            .with_constraint_file(&self.cst)
    }
}
