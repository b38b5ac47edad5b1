// # hddnsd - Hetzner DNS sync daemon
//
// This is a THIN integration layer only:
// - DO NOT add reconciliation, DNS or retry logic here
// - All sync logic lives in hddns-core
//
// The hddnsd daemon is responsible for:
// 1. Parsing the command line
// 2. Loading and validating the JSON configuration file
// 3. Building the Hetzner provider and the HTTP IP source
// 4. Running the SyncEngine until SIGTERM/SIGINT
//
// ## Usage
//
// ```bash
// export HETZNER_API_TOKEN=your_token   # referenced as "ENV:HETZNER_API_TOKEN"
// hddnsd /etc/hddns/config.json
//
// # Validate only
// hddnsd --check /etc/hddns/config.json
//
// # Log intended changes without applying them
// HDDNS_MODE=dry-run hddnsd /etc/hddns/config.json
// ```
//
// ## Environment
//
// - `HDDNS_CONFIG`: Configuration file path (instead of the positional argument)
// - `HDDNS_LOG_LEVEL`: trace, debug, info, warn or error (default: info)
// - `HDDNS_MODE`: live (default) or dry-run

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use hddns_core::{ConfigWatcher, EngineEvent, SyncEngine, load_config};
use hddns_ip_http::HttpIpSource;
use hddns_provider_hetzner::HetznerProvider;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum HddnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<HddnsExitCode> for ExitCode {
    fn from(code: HddnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Provider mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Apply changes
    Live,
    /// Log intended changes without applying them
    DryRun,
}

/// Keep Hetzner DNS records in sync with this host's public IP
#[derive(Debug, Parser)]
#[command(name = "hddnsd", version, about)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(env = "HDDNS_CONFIG")]
    config: PathBuf,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,

    /// Maximum log level
    #[arg(long, env = "HDDNS_LOG_LEVEL", default_value = "info")]
    log_level: Level,

    /// Provider mode
    #[arg(long, env = "HDDNS_MODE", value_enum, default_value_t = Mode::Live)]
    mode: Mode,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.check {
        return check_config(&cli);
    }

    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return HddnsExitCode::ConfigError.into();
    }

    info!("Starting hddnsd {}", env!("CARGO_PKG_VERSION"));

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return HddnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let shutdown = CancellationToken::new();

        let (mut engine, event_rx) = match build_engine(&cli) {
            Ok(parts) => parts,
            Err(e) => {
                error!("Startup failed: {:#}", e);
                return HddnsExitCode::ConfigError;
            }
        };

        if let Err(e) = install_shutdown_handler(shutdown.clone()) {
            error!("Startup failed: {:#}", e);
            return HddnsExitCode::ConfigError;
        }

        tokio::spawn(drain_events(event_rx));

        match engine.run(shutdown).await {
            Ok(()) => {
                info!("hddnsd stopped");
                HddnsExitCode::CleanShutdown
            }
            Err(e) => {
                error!("Daemon error: {}", e);
                HddnsExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// `--check`: validate the configuration and print a summary
fn check_config(cli: &Cli) -> ExitCode {
    match load_config(&cli.config) {
        Ok(config) => {
            println!("Configuration valid: {}", cli.config.display());
            println!("  {}", config.summary());
            HddnsExitCode::CleanShutdown.into()
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            HddnsExitCode::ConfigError.into()
        }
    }
}

/// Load the configuration and wire the engine to its collaborators
fn build_engine(cli: &Cli) -> Result<(SyncEngine, mpsc::Receiver<EngineEvent>)> {
    let (watcher, config) = ConfigWatcher::open(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    info!("Configuration: {}", config.summary());

    let provider = HetznerProvider::new(config.global.api_token.clone(), cli.mode == Mode::DryRun)
        .context("Failed to create Hetzner provider")?;
    let ip_source = HttpIpSource::new(config.global.ip_check_url.clone());
    info!("Public IP source: {}", ip_source.url());

    let (engine, event_rx) = SyncEngine::new(Box::new(provider), Box::new(ip_source), config)
        .context("Failed to create sync engine")?;

    Ok((engine.with_config_watcher(watcher), event_rx))
}

/// Log engine events until the engine drops its sender
async fn drain_events(mut event_rx: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = event_rx.recv().await {
        debug!("Engine event: {:?}", event);
    }
}

/// Cancel `shutdown` on SIGTERM or SIGINT
#[cfg(unix)]
fn install_shutdown_handler(shutdown: CancellationToken) -> Result<()> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint =
        signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        info!("Received shutdown signal: {}, finishing current cycle", name);
        shutdown.cancel();
    });

    Ok(())
}

/// Cancel `shutdown` on CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn install_shutdown_handler(shutdown: CancellationToken) -> Result<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal: SIGINT, finishing current cycle"),
            Err(e) => error!("Failed to wait for CTRL-C: {}", e),
        }
        shutdown.cancel();
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["hddnsd", "config.json"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("config.json"));
        assert!(!cli.check);
        assert_eq!(cli.mode, Mode::Live);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "hddnsd",
            "--check",
            "--log-level",
            "debug",
            "--mode",
            "dry-run",
            "/etc/hddns/config.json",
        ])
        .unwrap();
        assert!(cli.check);
        assert_eq!(cli.log_level, Level::DEBUG);
        assert_eq!(cli.mode, Mode::DryRun);
    }

    #[test]
    fn test_cli_rejects_unknown_level() {
        assert!(Cli::try_parse_from(["hddnsd", "--log-level", "loud", "config.json"]).is_err());
    }

    #[test]
    fn test_cli_verifies() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
