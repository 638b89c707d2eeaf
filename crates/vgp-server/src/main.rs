//! Virtual gamepad server entry point.
//!
//! Loads the configuration, picks the mapping profile and output mode, then
//! runs the TCP listener until Ctrl+C.
//!
//! # Usage
//!
//! ```text
//! vgp-server [OPTIONS]
//!
//! Options:
//!   --config <PATH>   Config file [default: platform config dir]
//!   --port <PORT>     Listen port, overrides `server.port`
//!   --mode <MODE>     keyboard-mouse | gamepad, overrides `input.output_mode`
//!   --init-config     Write the effective configuration to the config path and exit
//! ```
//!
//! # Log level
//!
//! `RUST_LOG` wins when set (e.g. `RUST_LOG=vgp_server=debug`); otherwise the
//! config's `server.log_level` applies.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use vgp_core::{MappingStore, OutputMode};
use vgp_server::infrastructure::injection::native_factory;
use vgp_server::infrastructure::network::{GamepadServer, ServerOptions};
use vgp_server::infrastructure::storage::config::{
    config_file_path, load_config, save_config, AppConfig,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Turns a networked game controller into PC keyboard, mouse or gamepad input.
#[derive(Debug, Parser)]
#[command(name = "vgp-server", version)]
struct Cli {
    /// Path of the TOML config file.
    #[arg(long, env = "VGP_CONFIG")]
    config: Option<PathBuf>,

    /// TCP port to listen on.  Values below 1024 select an ephemeral port.
    #[arg(long, env = "VGP_PORT")]
    port: Option<u16>,

    /// What the controller drives.
    #[arg(long, value_enum, env = "VGP_MODE")]
    mode: Option<ModeArg>,

    /// Write the effective configuration to the config path and exit.
    #[arg(long)]
    init_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    KeyboardMouse,
    Gamepad,
}

impl From<ModeArg> for OutputMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::KeyboardMouse => OutputMode::KeyboardMouse,
            ModeArg::Gamepad => OutputMode::Gamepad,
        }
    }
}

impl Cli {
    /// Applies the command-line overrides on top of the loaded file.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(mode) = self.mode {
            config.input.output_mode = mode.into();
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let path = match &cli.config {
        Some(path) => path.clone(),
        None => config_file_path().context("no --config given and no platform config directory")?,
    };
    let mut config =
        load_config(&path).with_context(|| format!("loading config from {}", path.display()))?;
    cli.apply(&mut config);
    config.validate().context("configuration rejected")?;

    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::try_new(&config.server.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
        }))
        .init();

    if cli.init_config {
        save_config(&path, &config)
            .with_context(|| format!("writing config to {}", path.display()))?;
        info!("configuration written to {}", path.display());
        return Ok(());
    }

    info!(
        config = %path.display(),
        profile = %config.input.active_profile,
        mode = ?config.input.output_mode,
        "virtual gamepad server starting"
    );

    let mappings = Arc::new(MappingStore::new(config.mapping_table()?));
    let options = ServerOptions {
        translate: config.input.translate_options(),
        stats_interval: Some(Duration::from_secs(config.server.stats_interval_secs)),
    };
    let server = GamepadServer::bind(
        &config.server.listen_addr(),
        mappings,
        native_factory(),
        options,
    )
    .await?;

    // ── Graceful shutdown flag ─────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    server.run(running).await?;

    info!("virtual gamepad server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
