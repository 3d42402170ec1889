//! External toolchain settings.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// When the pack stage installs its Python package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallPolicy {
    /// Install on every run.
    Always,
    /// Look the module up and install only when it cannot be found.
    #[default]
    IfMissing,
    /// Never install; the package must already be importable.
    Never,
}

impl fmt::Display for InstallPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "always"),
            Self::IfMissing => write!(f, "if-missing"),
            Self::Never => write!(f, "never"),
        }
    }
}

impl FromStr for InstallPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "if-missing" | "if_missing" => Ok(Self::IfMissing),
            "never" => Ok(Self::Never),
            other => Err(ConfigError::InvalidValue {
                key: "install".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Programs and runtime settings for the three stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Synthesis program.
    #[serde(default = "default_yosys")]
    pub yosys: String,
    /// Yosys synthesis pass for the target family.
    #[serde(default = "default_synth_command")]
    pub synth_command: String,
    /// Place-and-route program.
    #[serde(default = "default_nextpnr")]
    pub nextpnr: String,
    /// Python interpreter hosting the packer.
    #[serde(default = "default_python")]
    pub python: String,
    /// Package providing the packer.
    #[serde(default = "default_pack_package")]
    pub pack_package: String,
    /// Module exposing the packer's `main`.
    #[serde(default = "default_pack_module")]
    pub pack_module: String,
    /// Package install policy.
    #[serde(default)]
    pub install: InstallPolicy,
}

fn default_yosys() -> String {
    "yosys".to_string()
}

fn default_synth_command() -> String {
    "synth_gowin".to_string()
}

fn default_nextpnr() -> String {
    "nextpnr-himbaechel".to_string()
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_pack_package() -> String {
    "apycula".to_string()
}

fn default_pack_module() -> String {
    "apycula.gowin_pack".to_string()
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            yosys: default_yosys(),
            synth_command: default_synth_command(),
            nextpnr: default_nextpnr(),
            python: default_python(),
            pack_package: default_pack_package(),
            pack_module: default_pack_module(),
            install: InstallPolicy::default(),
        }
    }
}

impl ToolchainConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from `GATEFLOW_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// Keys: `GATEFLOW_YOSYS`, `GATEFLOW_SYNTH_COMMAND`, `GATEFLOW_NEXTPNR`,
    /// `GATEFLOW_PYTHON`, `GATEFLOW_PACK_PACKAGE`, `GATEFLOW_PACK_MODULE`,
    /// `GATEFLOW_PACK_INSTALL`. Empty values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(v) = get("GATEFLOW_YOSYS") {
            config.yosys = v;
        }
        if let Some(v) = get("GATEFLOW_SYNTH_COMMAND") {
            config.synth_command = v;
        }
        if let Some(v) = get("GATEFLOW_NEXTPNR") {
            config.nextpnr = v;
        }
        if let Some(v) = get("GATEFLOW_PYTHON") {
            config.python = v;
        }
        if let Some(v) = get("GATEFLOW_PACK_PACKAGE") {
            config.pack_package = v;
        }
        if let Some(v) = get("GATEFLOW_PACK_MODULE") {
            config.pack_module = v;
        }
        if let Some(v) = get("GATEFLOW_PACK_INSTALL") {
            config.install = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "GATEFLOW_PACK_INSTALL".to_string(),
                value: v.clone(),
            })?;
        }

        Ok(config)
    }

    /// Sets the install policy.
    #[must_use]
    pub fn with_install(mut self, install: InstallPolicy) -> Self {
        self.install = install;
        self
    }

    /// Sets the Python interpreter.
    #[must_use]
    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ToolchainConfig::default();
        assert_eq!(config.yosys, "yosys");
        assert_eq!(config.nextpnr, "nextpnr-himbaechel");
        assert_eq!(config.python, "python3");
        assert_eq!(config.install, InstallPolicy::IfMissing);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let vars: HashMap<&str, &str> = [
            ("GATEFLOW_YOSYS", "/opt/yosys/bin/yosys"),
            ("GATEFLOW_PYTHON", ""),
            ("GATEFLOW_PACK_INSTALL", "never"),
        ]
        .into_iter()
        .collect();

        let config =
            ToolchainConfig::from_lookup(|k| vars.get(k).map(|v| (*v).to_string())).unwrap();

        assert_eq!(config.yosys, "/opt/yosys/bin/yosys");
        assert_eq!(config.python, "python3");
        assert_eq!(config.install, InstallPolicy::Never);
    }

    #[test]
    fn test_invalid_install_policy() {
        let err = ToolchainConfig::from_lookup(|k| {
            (k == "GATEFLOW_PACK_INSTALL").then(|| "sometimes".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("GATEFLOW_PACK_INSTALL"));
    }

    #[test]
    fn test_install_policy_parse() {
        assert_eq!("Always".parse::<InstallPolicy>().unwrap(), InstallPolicy::Always);
        assert_eq!("if_missing".parse::<InstallPolicy>().unwrap(), InstallPolicy::IfMissing);
        assert_eq!(InstallPolicy::Never.to_string(), "never");
    }
}
