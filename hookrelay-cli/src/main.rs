use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use hookrelay_replay::ReplayService;

mod commands;
mod config;
mod error;

use config::CliConfig;
use error::CliError;

#[derive(Debug, Parser)]
#[command(
    name = "hookrelay",
    version,
    about = "Forward captured webhook requests to a redirect URL"
)]
struct Cli {
    /// TOML file with defaults (`redirect_url`, `log_filter`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay the captured request in a redirect-info document (`-` reads stdin).
    Replay {
        #[arg(long, short)]
        input: PathBuf,
        /// Destination overriding the document's `redirect_url`.
        #[arg(long)]
        url: Option<String>,
        /// Print the full result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Check that a URL answers an OPTIONS request.
    Probe {
        url: String,
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match cli.config.as_deref().map(CliConfig::load).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };
    init_tracing(cli.verbose, config.log_filter.as_deref());

    match run(cli.command, &config).await {
        Ok(rendered) => {
            println!("{}", rendered.output);
            if rendered.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(2)
        }
    }
}

async fn run(command: Command, config: &CliConfig) -> Result<commands::Rendered, CliError> {
    let service: ReplayService = ReplayService::default();
    match command {
        Command::Replay { input, url, json } => {
            let info = commands::load_redirect_info(&input)?;
            commands::replay(&service, info, url.as_deref(), config, json).await
        }
        Command::Probe { url, json } => commands::probe(&service, &url, json).await,
    }
}

fn init_tracing(verbose: u8, configured: Option<&str>) {
    let filter = match verbose {
        0 => configured.unwrap_or("warn"),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
