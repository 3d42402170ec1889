//! # Gateflow
//!
//! An orchestrator for FPGA builds: Verilog sources and constraint files go
//! in, a device bitstream comes out.
//!
//! Gateflow chains three external engines that know nothing of each other:
//!
//! - **Synthesis** (yosys): root sources to `<top>.json`
//! - **Place-and-route** (nextpnr): `<top>.json` to `<top>_pnr.json`
//! - **Pack** (gowin_pack in a Python runtime): `<top>_pnr.json` to the
//!   output artifact
//!
//! Files travel between stages in an in-memory [`FileStore`](store::FileStore).
//! Builds run on a background worker behind a [`BuildChannel`](channel::BuildChannel)
//! so the host stays responsive while progress streams back.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gateflow::prelude::*;
//!
//! let stages = StageSet::with_processes(&ToolchainConfig::from_env()?);
//! let mut channel = BuildChannel::spawn(stages)?;
//!
//! let files = load_project("blinky").await?;
//! let params = load_build_config("blinky").await.parameters();
//! let output = params.output_file_name.clone();
//!
//! let store = channel
//!     .start(BuildRequest::new(files, params))?
//!     .wait(|stage, line| println!("[{stage}] {line}"))
//!     .await?;
//! write_artifact("blinky", &output, store.get(&output).unwrap_or_default()).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod channel;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod project;
pub mod resolve;
pub mod stages;
pub mod store;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::channel::{BuildChannel, BuildRequest, BuildRun, ChannelMessage};
    pub use crate::config::{BuildConfig, InstallPolicy, ToolchainConfig};
    pub use crate::core::{BuildParameters, ProgressEvent, StageKind};
    pub use crate::errors::{
        ChannelError, ConfigError, GateflowError, StageError, StageErrorKind, StoreError,
    };
    pub use crate::events::{
        CollectingProgressSink, LoggingProgressSink, NoOpProgressSink, ProgressSink,
    };
    pub use crate::pipeline::{PipelineCoordinator, PipelineOutcome, PipelineState};
    pub use crate::project::{load_build_config, load_project, write_artifact};
    pub use crate::resolve::{select_constraint_file, IncludeResolver};
    pub use crate::stages::{ProcessRunner, Stage, StageSet, ToolInvocation, ToolRunner};
    pub use crate::store::FileStore;
}
