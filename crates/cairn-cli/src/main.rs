use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use cairn_core::CairnConfig;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "cairn", version, about = "Cairn audit capture")]
struct Cli {
    /// Path to cairn.yaml. Defaults apply when omitted.
    #[arg(long, short, global = true, env = "CAIRN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Emit one audit event through the capture handler.
    Emit {
        /// Event type, e.g. file.download
        #[arg(long = "type")]
        event_type: String,

        /// Event details as a JSON document
        #[arg(long)]
        details: Option<String>,

        /// Authenticated user id (omit for anonymous)
        #[arg(long)]
        user: Option<String>,

        /// Remote address of the originating request (omit outside a request)
        #[arg(long)]
        ip: Option<String>,
    },

    /// Load and validate the configuration, then open the configured store.
    CheckConfig,
}

fn load_config(path: Option<&PathBuf>) -> Result<CairnConfig> {
    match path {
        Some(path) => Ok(CairnConfig::load_with_context(path)?),
        None => Ok(CairnConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.cmd {
        Command::Emit {
            event_type,
            details,
            user,
            ip,
        } => {
            commands::emit::run(
                &config,
                commands::emit::EmitArgs {
                    event_type,
                    details,
                    user,
                    ip,
                },
            )
            .await?
        }
        Command::CheckConfig => commands::check::run(&config)?,
    }

    Ok(())
}
