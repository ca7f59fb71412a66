//! facegate - run one access session and signal the actuator.
//!
//! Frames, detections and embeddings come from a recorded trace; the decision
//! goes to the configured actuator device as `APPROVED\n` or `DENIED\n`. The
//! session report is printed to stdout as JSON. Ctrl-C cancels the session,
//! which still sends a deny.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use facegate::{
    CancelToken, FacegateConfig, JsonEnrollmentSource, ReplayFeed, build_context, open_actuator,
    run_replay, telemetry,
};
use tracing::{info, warn};

/// facegate CLI
#[derive(Parser)]
#[command(name = "facegate")]
#[command(about = "Face-biometric access session with a one-shot actuator command", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "FACEGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Recorded detection trace (JSON lines)
    #[arg(short, long, env = "FACEGATE_TRACE")]
    trace: PathBuf,

    /// Enrolled subject to authenticate
    #[arg(short, long, env = "FACEGATE_LABEL")]
    label: Option<String>,

    /// Actuator device, e.g. /dev/ttyACM0
    #[arg(short, long, env = "FACEGATE_DEVICE")]
    device: Option<PathBuf>,

    /// Enrollment store path
    #[arg(short, long, env = "FACEGATE_ENROLLMENT")]
    enrollment: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, env = "FACEGATE_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => FacegateConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => FacegateConfig::default(),
    };
    if let Some(label) = cli.label {
        config.enrollment.label = Some(label);
    }
    if let Some(device) = cli.device {
        config.actuator.device = Some(device);
    }
    if let Some(path) = cli.enrollment {
        config.enrollment.path = path;
    }
    if cli.json {
        config.logging.json = true;
    }
    config.validate()?;

    telemetry::init(&config.logging).context("installing tracing subscriber")?;

    let store = JsonEnrollmentSource::from_path(&config.enrollment.path)?;
    let context = build_context(&config, &store)?;
    let mut feed = ReplayFeed::from_path(&cli.trace)?;
    info!(ticks = feed.len(), trace = %cli.trace.display(), "trace loaded");

    // Listen for Ctrl-C before the device is opened, so a cancel during the
    // settle pause still reaches the session and sends a deny.
    let cancel = CancelToken::new();
    let operator = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("cancel requested by operator");
            operator.cancel();
        }
    });

    let mut actuator = open_actuator(&config).await?;

    let report = run_replay(&context, &mut feed, &mut actuator, cancel).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    let code = match (report.decision.is_approved(), report.delivery.is_delivered()) {
        (_, false) => 2,
        (true, true) => 0,
        (false, true) => 1,
    };
    Ok(ExitCode::from(code))
}
