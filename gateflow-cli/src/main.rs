//! Command-line host for the gateflow build pipeline.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use gateflow::channel::{BuildChannel, BuildRequest, ChannelMessage};
use gateflow::config::{InstallPolicy, ToolchainConfig};
use gateflow::errors::GateflowError;
use gateflow::observability::{init_subscriber, LogFormat};
use gateflow::project::{load_build_config, load_project, write_artifact};
use gateflow::stages::StageSet;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

/// Gateflow - FPGA build pipeline
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Never install the pack package into the Python runtime
    #[arg(long, global = true)]
    no_install: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a project directory into a bitstream
    Build(BuildArgs),

    /// Run a JSON build request and print one JSON message per line
    Request {
        /// Request file, or `-` for stdin
        #[arg(default_value = "-")]
        input: String,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// Project directory
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Top-level module
    #[arg(long)]
    top: Option<String>,

    /// Target device (e.g., GW2AR-LV18QN88C8/I7)
    #[arg(long)]
    device: Option<String>,

    /// Device family (e.g., GW2A-18C)
    #[arg(long)]
    family: Option<String>,

    /// Constraint file
    #[arg(long)]
    cst: Option<String>,

    /// Output artifact name
    #[arg(short, long)]
    output: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_subscriber(if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    });

    let mut toolchain = ToolchainConfig::from_env().context("invalid toolchain environment")?;
    if cli.no_install {
        toolchain = toolchain.with_install(InstallPolicy::Never);
    }

    match cli.command {
        Commands::Build(args) => build(args, &toolchain).await,
        Commands::Request { input } => request(&input, &toolchain).await,
    }
}

async fn build(args: BuildArgs, toolchain: &ToolchainConfig) -> Result<ExitCode> {
    let mut config = load_build_config(&args.dir).await;
    if let Some(top) = args.top {
        config = config.with_top(top);
    }
    if let Some(device) = args.device {
        config = config.with_device(device);
    }
    if let Some(family) = args.family {
        config = config.with_family(family);
    }
    if let Some(cst) = args.cst {
        config = config.with_cst(cst);
    }
    if let Some(output) = args.output {
        config = config.with_output(output);
    }

    let files = load_project(&args.dir)
        .await
        .with_context(|| format!("failed to load project {}", args.dir.display()))?;
    let params = config.parameters();
    let output = params.output_file_name.clone();

    println!("Starting build for {}...", params.target_device);
    let mut channel = BuildChannel::spawn(StageSet::with_processes(toolchain))?;
    let result = channel
        .start(BuildRequest::new(files, params))?
        .wait(|_, line| println!("{line}"))
        .await;
    if let Err(e) = channel.dispose() {
        warn!(error = %e, "Build worker did not shut down cleanly");
    }

    let store = match result {
        Ok(store) => store,
        Err(GateflowError::BuildFailed { message, .. }) => {
            eprintln!("Build failed: {message}");
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    let bytes = store
        .get(&output)
        .with_context(|| format!("build succeeded but produced no {output}"))?;
    let path = write_artifact(&args.dir, &output, bytes).await?;
    info!(
        bytes = bytes.len(),
        sha256 = %store.sha256_hex(&output).unwrap_or_default(),
        "Bitstream ready"
    );
    println!("Build successful! Bitstream saved as {}", path.display());
    Ok(ExitCode::SUCCESS)
}

async fn request(input: &str, toolchain: &ToolchainConfig) -> Result<ExitCode> {
    let text = if input == "-" {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("failed to read request from stdin")?;
        text
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("failed to read {input}"))?
    };
    let request: BuildRequest = serde_json::from_str(&text).context("invalid build request")?;

    let mut channel = BuildChannel::spawn(StageSet::with_processes(toolchain))?;
    let mut succeeded = false;
    {
        let mut messages = Box::pin(channel.start(request)?.into_stream());
        while let Some(message) = messages.next().await {
            let message = message.unwrap_or_else(|e| ChannelMessage::Error {
                message: e.to_string(),
                stage: None,
            });
            succeeded = matches!(message, ChannelMessage::Success { .. });
            println!("{}", serde_json::to_string(&message)?);
        }
    }
    if let Err(e) = channel.dispose() {
        warn!(error = %e, "Build worker did not shut down cleanly");
    }

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
