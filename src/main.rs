//! Binary entry point for garage-connect.
//!
//! Diagnostic CLI for the backend connection facade.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use garage_connect::config::GarageConfig;
use garage_connect::observability::{self, ConnectionEvent};
use garage_connect::storage::{FileKeyValueStore, InMemoryLocalStorage};
use garage_connect::{
    BackendErrorInfo, ConnectionBuilder, ConnectionManager, CredentialBackends, LocalBackend,
    PlatformKind, current_platform, translate,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// garage-connect - backend connection diagnostics for the garage app.
#[derive(Parser)]
#[command(name = "garage-connect")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Print the detected platform.
    Platform,

    /// Build a connection and report its state.
    Check {
        /// Platform to build for: web or native.
        #[arg(short, long)]
        platform: Option<String>,
    },

    /// Print the display string for a backend error code.
    Translate {
        /// Namespaced error code, e.g. auth/wrong-password.
        code: String,

        /// Raw backend message used when the code is not recognized.
        #[arg(short, long)]
        message: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match GarageConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let logging = config.logging.clone().verbose(cli.verbose);
    if let Err(e) = observability::init_logging(&logging) {
        eprintln!("Failed to initialize logging: {e}");
        for warning in config.load_warnings() {
            eprintln!("Warning: {warning}");
        }
        return ExitCode::FAILURE;
    }
    for warning in config.load_warnings() {
        tracing::warn!("{warning}");
    }

    match cli.command {
        Commands::Platform => {
            println!("{}", config.platform.unwrap_or_else(current_platform));
            ExitCode::SUCCESS
        },
        Commands::Check { platform } => run_check(&config, platform.as_deref()).await,
        Commands::Translate { code, message } => {
            println!("{}", translate(&BackendErrorInfo { code: Some(code), message }));
            ExitCode::SUCCESS
        },
    }
}

async fn run_check(config: &GarageConfig, platform: Option<&str>) -> ExitCode {
    let platform = match platform.map(str::parse::<PlatformKind>) {
        Some(Ok(kind)) => kind,
        Some(Err(e)) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        },
        None => config.platform.unwrap_or_else(current_platform),
    };

    let backend = match config.require_backend() {
        Ok(backend) => backend.clone(),
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        },
    };

    let stores = match platform {
        PlatformKind::Web => CredentialBackends::web(Arc::new(InMemoryLocalStorage::new())),
        PlatformKind::NativeMobile => {
            CredentialBackends::native(Arc::new(FileKeyValueStore::in_dir(&config.data_dir)))
        },
    };

    let builder = ConnectionBuilder::new(Arc::new(LocalBackend::new()), backend, stores)
        .with_platform(platform);
    let manager = ConnectionManager::from_builder(builder);
    let mut events = manager.subscribe();

    let result = manager.initialize().await;

    while let Ok(event) = events.try_recv() {
        if let ConnectionEvent::PersistenceDegraded { reason, .. } = event {
            println!("degraded:    {reason}");
        }
    }

    match result {
        Ok(handle) => {
            println!("status:      {}", manager.status());
            println!("platform:    {}", handle.platform());
            println!("persistence: {}", handle.persistence());
            println!("durable:     {}", !handle.is_degraded());
            ExitCode::SUCCESS
        },
        Err(e) => {
            println!("status:      {}", manager.status());
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        },
    }
}
