//! Probe CLI - Command-line driver for the service integration probes.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use probe_core::{SuiteKind, DEFAULT_CONFIG_FILE};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod report;

#[derive(Parser)]
#[command(name = "probe")]
#[command(about = "Integration probes for the auth, registry and relay services")]
#[command(long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the probe suites against live services
    Run {
        /// Which suite to run
        #[arg(long, value_enum, default_value = "all")]
        suite: SuiteArg,
        /// Also run allocate/disconnect with a bearer token
        #[arg(long)]
        include_protected: bool,
        /// Seconds to wait for services before the first case
        #[arg(long)]
        startup_delay: Option<u64>,
        /// Relay receive timeout in milliseconds
        #[arg(long)]
        receive_timeout: Option<u64>,
        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Print every endpoint URL that would be probed
    Endpoints,
    /// Show the effective configuration
    Config {
        /// Write it to the --config path
        #[arg(long)]
        write: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SuiteArg {
    Auth,
    Registry,
    Relay,
    All,
}

impl SuiteArg {
    fn kinds(self) -> Vec<SuiteKind> {
        match self {
            Self::Auth => vec![SuiteKind::Auth],
            Self::Registry => vec![SuiteKind::Registry],
            Self::Relay => vec![SuiteKind::Relay],
            Self::All => SuiteKind::ALL.to_vec(),
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    // Respects RUST_LOG environment variable (e.g., RUST_LOG=debug)
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            suite,
            include_protected,
            startup_delay,
            receive_timeout,
            format,
        } => commands::run::run(
            &cli.config,
            commands::run::RunOptions {
                suites: suite.kinds(),
                include_protected,
                startup_delay,
                receive_timeout,
                format,
            },
        ),
        Commands::Endpoints => commands::endpoints::run(&cli.config).map(|()| ExitCode::SUCCESS),
        Commands::Config { write } => {
            commands::config::run(&cli.config, write).map(|()| ExitCode::SUCCESS)
        }
    }
}
