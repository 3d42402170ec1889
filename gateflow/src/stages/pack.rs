//! Bitstream pack adapter (gowin_pack inside a Python runtime).
//!
//! The packer reads `sys.argv` when its module is imported, so the entry
//! script assigns the argument vector before the import runs. Arguments
//! reach the script through the interpreter's own command line; nothing is
//! taken from ambient state. The install check locates the module without
//! importing it for the same reason.

use super::runner::{FailureReport, ToolInvocation, ToolRunner};
use super::{expect_output, Stage, StageInput, StageResult};
use crate::config::{InstallPolicy, ToolchainConfig};
use crate::core::{BuildParameters, StageKind};
use crate::errors::StageError;
use crate::events::{NoOpProgressSink, ProgressSink};
use crate::store::FileStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Progress prefix for pack output.
pub const PACK_TOOL: &str = "gowin_pack";

const ENTRY_SCRIPT: &str = r#"import sys
sys.argv = ["gowin_pack"] + sys.argv[1:]
import traceback
try:
    from MODULE import main
    main()
except SystemExit as e:
    if e.code not in (None, 0):
        print("Exit %s" % e.code, file=sys.stderr)
        sys.exit(1)
except BaseException:
    traceback.print_exc()
    sys.exit(1)
"#;

const MODULE_CHECK_SCRIPT: &str = r#"import importlib.util, sys
try:
    found = importlib.util.find_spec("MODULE") is not None
except ImportError:
    found = False
sys.exit(0 if found else 1)
"#;

/// Returns a script exiting zero when `module` can be found on the
/// interpreter's path. The module itself is never executed.
#[must_use]
pub fn module_check_script(module: &str) -> String {
    MODULE_CHECK_SCRIPT.replace("MODULE", module)
}

/// Packs `<top>_pnr.json` into the configured output file.
#[derive(Debug, Clone)]
pub struct PackStage {
    runner: Arc<dyn ToolRunner>,
    python: String,
    package: String,
    module: String,
    install: InstallPolicy,
}

impl PackStage {
    /// Creates the adapter from toolchain settings.
    #[must_use]
    pub fn new(runner: Arc<dyn ToolRunner>, config: &ToolchainConfig) -> Self {
        Self {
            runner,
            python: config.python.clone(),
            package: config.pack_package.clone(),
            module: config.pack_module.clone(),
            install: config.install,
        }
    }

    /// The Python entry script.
    #[must_use]
    pub fn entry_script(&self) -> String {
        ENTRY_SCRIPT.replace("MODULE", &self.module)
    }

    /// The packer's argument vector, without the program name.
    #[must_use]
    pub fn pack_args(params: &BuildParameters) -> Vec<String> {
        vec![
            "-d".to_string(),
            params.target_family.clone(),
            "-o".to_string(),
            params.output_file_name.clone(),
            params.routed_netlist_file_name(),
        ]
    }

    /// Builds the pack invocation.
    ///
    /// A failed pack reports all of stderr so Python tracebacks survive.
    #[must_use]
    pub fn invocation(&self, params: &BuildParameters) -> ToolInvocation {
        ToolInvocation::new(StageKind::Pack, PACK_TOOL, &self.python)
            .arg("-c")
            .arg(self.entry_script())
            .args(Self::pack_args(params))
            .report(FailureReport::FullStderr)
    }

    fn module_check_invocation(&self) -> ToolInvocation {
        ToolInvocation::new(StageKind::Pack, PACK_TOOL, &self.python)
            .arg("-c")
            .arg(module_check_script(&self.module))
    }

    fn install_invocation(&self) -> ToolInvocation {
        ToolInvocation::new(StageKind::Pack, PACK_TOOL, &self.python).args([
            "-m",
            "pip",
            "install",
            "--disable-pip-version-check",
            "--quiet",
            self.package.as_str(),
        ])
    }

    /// Prepares the runtime according to the install policy.
    async fn bootstrap(&self, progress: &dyn ProgressSink) -> Result<(), StageError> {
        progress.line(StageKind::Pack, &format!("[{PACK_TOOL}] Initializing Python runtime..."));
        let empty = FileStore::new();

        match self.install {
            InstallPolicy::Never => return Ok(()),
            InstallPolicy::IfMissing => {
                if self
                    .runner
                    .run(&self.module_check_invocation(), &empty, &NoOpProgressSink)
                    .await
                    .is_ok()
                {
                    debug!(package = %self.package, module = %self.module, "Pack module found");
                    return Ok(());
                }
            }
            InstallPolicy::Always => {}
        }

        info!(package = %self.package, python = %self.python, "Installing pack package");
        progress.line(
            StageKind::Pack,
            &format!("[{PACK_TOOL}] Installing {}...", self.package),
        );
        self.runner
            .run(&self.install_invocation(), &empty, progress)
            .await
            .map(|_| ())
            .map_err(|e| {
                StageError::environment(
                    StageKind::Pack,
                    format!("failed to install {}: {}", self.package, e.message),
                )
            })
    }
}

#[async_trait]
impl Stage for PackStage {
    fn kind(&self) -> StageKind {
        StageKind::Pack
    }

    async fn run(&self, input: &StageInput<'_>, progress: &dyn ProgressSink) -> StageResult {
        self.bootstrap(progress).await?;

        let params = input.params;
        let routed = params.routed_netlist_file_name();
        let inputs = input.files.subset([routed.as_str()]);

        let delta = self
            .runner
            .run(&self.invocation(params), &inputs, progress)
            .await?;
        expect_output(StageKind::Pack, &delta, &params.output_file_name)
    }
}
