mod cli;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lattice_core::config::RegistryConfig;
use lattice_core::kernel::constants::CONFIG_FILE_NAME;
use log::{debug, error};
use tracing_log::LogTracer;
use tracing_subscriber::EnvFilter;

use crate::cli::InspectArgs;

/// Lattice: plugin registry inspector
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Simple ping command for testing
    #[arg(long)]
    ping: bool,

    /// Registry configuration file (.json, .yaml or .toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load plugin manifests and print the resulting registry state
    Inspect(InspectArgs),
}

/// Route `log` records through a `tracing` subscriber writing to stderr.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install tracing subscriber: {e}");
        return;
    }
    if let Err(e) = LogTracer::init() {
        eprintln!("Failed to bridge log records to tracing: {e}");
    }
}

fn load_config(path: Option<&Path>) -> Result<RegistryConfig, lattice_core::KernelError> {
    match path {
        Some(path) => Ok(RegistryConfig::load(path)?),
        None => {
            let default_path = Path::new(CONFIG_FILE_NAME);
            if default_path.is_file() {
                debug!("Using {} from the working directory", CONFIG_FILE_NAME);
                Ok(RegistryConfig::load(default_path)?)
            } else {
                Ok(RegistryConfig::default())
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    if args.ping {
        println!("pong");
        return ExitCode::SUCCESS;
    }

    init_logging();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match args.command {
        Some(Commands::Inspect(inspect)) => match cli::run_inspect(inspect, config).await {
            Ok(report) => {
                print!("{report}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Inspection failed: {e}");
                ExitCode::FAILURE
            }
        },
        None => {
            println!("No command given. Run with --help for usage.");
            ExitCode::SUCCESS
        }
    }
}
