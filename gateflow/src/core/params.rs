//! Build parameters supplied once per pipeline run.

use serde::{Deserialize, Serialize};

/// Immutable parameters for one pipeline run.
///
/// Device and family strings are passed to the engines verbatim; nothing
/// here validates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildParameters {
    /// Name of the top-level module.
    pub top_module_name: String,
    /// Target device identifier.
    pub target_device: String,
    /// Target device family identifier.
    pub target_family: String,
    /// Preferred constraint file name.
    pub constraint_file_name: String,
    /// Name of the final artifact.
    pub output_file_name: String,
}

impl BuildParameters {
    /// Creates parameters for the given top module and output file, with
    /// empty device, family and constraint settings.
    #[must_use]
    pub fn new(top_module_name: impl Into<String>, output_file_name: impl Into<String>) -> Self {
        Self {
            top_module_name: top_module_name.into(),
            target_device: String::new(),
            target_family: String::new(),
            constraint_file_name: String::new(),
            output_file_name: output_file_name.into(),
        }
    }

    /// Sets the target device.
    #[must_use]
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.target_device = device.into();
        self
    }

    /// Sets the target family.
    #[must_use]
    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.target_family = family.into();
        self
    }

    /// Sets the preferred constraint file.
    #[must_use]
    pub fn with_constraint_file(mut self, name: impl Into<String>) -> Self {
        self.constraint_file_name = name.into();
        self
    }

    /// Name of the synthesized netlist, `<top>.json`.
    #[must_use]
    pub fn netlist_file_name(&self) -> String {
        format!("{}.json", self.top_module_name)
    }

    /// Name of the placed and routed netlist, `<top>_pnr.json`.
    #[must_use]
    pub fn routed_netlist_file_name(&self) -> String {
        format!("{}_pnr.json", self.top_module_name)
    }
}
