use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxledger::core::log::init_logging;
use fxledger::report::Brokerage;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the example configuration
    Setup,
    /// Start the web UI
    Serve,
    /// Convert a brokerage ledger into another currency
    Convert {
        /// Ledger CSV exported by the brokerage
        #[arg(short, long)]
        file: PathBuf,
        /// Ledger layout: firstrade or generic
        #[arg(short, long, default_value = "firstrade")]
        brokerage: Brokerage,
        /// Target currency, e.g. JPY
        #[arg(long)]
        currency: String,
    },
}

impl Commands {
    fn into_app_command(self) -> Option<fxledger::AppCommand> {
        match self {
            Commands::Setup => None,
            Commands::Serve => Some(fxledger::AppCommand::Serve),
            Commands::Convert {
                file,
                brokerage,
                currency,
            } => Some(fxledger::AppCommand::Convert {
                file,
                brokerage,
                currency,
            }),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command.map(Commands::into_app_command) {
        Some(None) => fxledger::cli::setup::setup(),
        Some(Some(cmd)) => fxledger::run_command(cmd, cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
