//! Run activation handlers against scenario files
//!
//! Usage:
//!   activation_scan scan config/scenarios/pattern.toml
//!   activation_scan scan config/scenarios/makespan.toml --config config/activation.toml --json
//!   activation_scan handlers --config config/activation.toml

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use orbitope_activation::config::Config;
use orbitope_activation::detectors::include_default_handlers;
use orbitope_activation::scenario::Scenario;
use orbitope_activation::HandlerRegistry;

#[derive(Parser)]
#[command(name = "activation_scan")]
#[command(about = "Detect activated sub-orbitopes in scenario files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a scenario and print the submatrices its fixings activate
    Scan {
        scenario: String,
        /// Config file; built-in defaults when omitted
        #[arg(long)]
        config: Option<String>,
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the handlers the config includes
    Handlers {
        #[arg(long)]
        config: Option<String>,
    },
}

fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Ok(Config::default()),
    }
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run_scan(scenario_path: &str, config: &Config, json: bool) -> Result<()> {
    let scenario = Scenario::load(scenario_path)?;
    tracing::info!(
        "Scanning {} with <{}>",
        scenario_path,
        scenario.detector.handler_name()
    );

    let result = scenario.run(config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.is_empty() {
        println!("No activated submatrices");
        return Ok(());
    }
    for (i, subm) in result.iter().enumerate() {
        println!(
            "{:>3}: {:?} rows={:?} cols={:?}",
            i, subm.kind, subm.rows, subm.cols
        );
    }
    Ok(())
}

fn run_handlers(config: &Config) -> Result<()> {
    let mut registry = HandlerRegistry::new();
    include_default_handlers(&mut registry, &config.handlers)?;
    for record in registry.iter() {
        println!("{:<12} {}", record.name(), record.desc());
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { scenario, config, json } => {
            let config = load_config(config.as_deref())?;
            init_logging(&config);
            run_scan(&scenario, &config, json)?;
        }
        Commands::Handlers { config } => {
            let config = load_config(config.as_deref())?;
            init_logging(&config);
            run_handlers(&config)?;
        }
    }

    Ok(())
}
