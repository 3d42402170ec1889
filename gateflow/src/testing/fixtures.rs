//! Test fixtures for pipeline testing.

use crate::config::{InstallPolicy, ToolchainConfig};
use crate::core::BuildParameters;
use crate::store::FileStore;
use crate::testing::{ScriptedRunner, ToolReply};

/// A small two-file design: `top.v` includes `counter.v`.
#[must_use]
pub fn blinky_sources() -> FileStore {
    FileStore::new()
        .with_file(
            "top.v",
            "`include \"counter.v\"\nmodule top(input clk, output led);\n  counter c(.clk(clk), .out(led));\nendmodule\n",
        )
        .with_file(
            "counter.v",
            "module counter(input clk, output out);\n  reg [23:0] n;\n  always @(posedge clk) n <= n + 1;\n  assign out = n[23];\nendmodule\n",
        )
}

/// Parameters matching [`blinky_sources`].
#[must_use]
pub fn blinky_parameters() -> BuildParameters {
    BuildParameters::new("top", "out.bin")
        .with_device("DEV1")
        .with_family("FAM1")
        .with_constraint_file("top.cst")
}

/// A scripted runner that completes all three default tools for top module
/// `top`, producing `output` from the packer.
#[must_use]
pub fn scripted_toolchain(output: &str) -> (ToolchainConfig, ScriptedRunner) {
    let config = ToolchainConfig::default().with_install(InstallPolicy::Never);
    let runner = ScriptedRunner::new()
        .on(
            config.yosys.clone(),
            ToolReply::files(FileStore::new().with_file("top.json", r#"{"modules":{}}"#))
                .with_lines(["Executing SYNTH_GOWIN pass.", "End of script."]),
        )
        .on(
            config.nextpnr.clone(),
            ToolReply::files(FileStore::new().with_file("top_pnr.json", r#"{"modules":{}}"#))
                .with_lines(["Info: Program finished normally."]),
        )
        .on(
            config.python.clone(),
            ToolReply::files(FileStore::new().with_file(output, [0xA5u8, 0xC3, 0xFF, 0x00]))
                .with_lines(["Writing bitstream"]),
        );
    (config, runner)
}
