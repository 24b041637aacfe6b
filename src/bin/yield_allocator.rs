//! CLI entrypoint for the yield allocator.
//! Serves the HTTP API by default; the other subcommands run a single
//! computation and print it as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use yield_allocator::config::{generate_commented_config_template, Config};
use yield_allocator::utils::init_logging;
use yield_allocator::{server, AllocationService};

#[derive(Debug, Parser)]
#[command(name = "yield-allocator", author, version, about = "Risk-adjusted yield allocation service", long_about = None)]
struct Args {
    /// Path to the configuration file (TOML)
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Print the default configuration to stdout and exit
    #[arg(long)]
    print_default_config: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Compute one allocation recommendation and print it
    Recommend,
    /// Print the overall risk assessment
    Risk,
    /// Print a historical yield series for a protocol
    History {
        /// Protocol name (Aave, Morpho, Spark, Uniswap), any casing
        protocol: String,
        /// Number of days
        #[arg(long)]
        days: Option<u32>,
    },
    /// Write a commented configuration template
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn load_config(path: &str) -> Result<Config> {
    if Path::new(path).exists() {
        Config::from_file(path).with_context(|| format!("Failed to load configuration from {}", path))
    } else {
        log::warn!("Configuration file '{}' not found, using defaults", path);
        Config::load().context("Failed to load configuration")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    if args.print_default_config {
        println!("{}", Config::default_toml()?);
        return Ok(());
    }

    if let Some(Command::Init { config, force }) = &args.command {
        if config.exists() && !force {
            anyhow::bail!("{} already exists. Use --force to overwrite.", config.display());
        }
        generate_commented_config_template(config)?;
        println!("Wrote default config to {}", config.display());
        return Ok(());
    }

    let mut config = load_config(&args.config)?;
    init_logging(&config.app.log_level);

    let service = Arc::new(AllocationService::from_config(&config)?);
    log::info!("Using {} predictor", service.predictor_name());

    match args.command {
        | Some(Command::Recommend) => {
            println!("{}", serde_json::to_string_pretty(&service.recommend()?)?);
        }
        | Some(Command::Risk) => {
            println!("{}", serde_json::to_string_pretty(&service.risk_report()?)?);
        }
        | Some(Command::History { protocol, days }) => {
            println!("{}", serde_json::to_string_pretty(&service.history(&protocol, days)?)?);
        }
        | Some(Command::Serve { port }) => {
            if let Some(port) = port {
                config.server.port = port;
            }
            run_server(&config, service).await?;
        }
        | None => run_server(&config, service).await?,
        // handled before configuration load
        | Some(Command::Init { .. }) => {}
    }
    Ok(())
}

async fn run_server(config: &Config, service: Arc<AllocationService>) -> Result<()> {
    yield_allocator::metrics::init()?;
    let listener = server::bind(&config.server).context("Failed to bind HTTP listener")?;
    server::serve(listener, service, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Shutdown signal received. Stopping...");
        }
    })
    .await?;
    Ok(())
}
