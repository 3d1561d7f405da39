mod cli;
mod config;
mod db;
mod error;
mod logic;
mod models;
mod sensors;

use anyhow::{Context as _, Result};
use clap::Parser as _;
use cli::{Cli, Commands, ConfigAction};
use config::AppConfig;
use db::Database;
use logic::{ControlLoop, LoopOptions, LoopState, RulesEngine, StopOutcome};
use sensors::{ReadingSource as _, Simulator};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_ref();
    let data_dir = cli.data_dir.as_ref();

    match cli.command.unwrap_or(Commands::Run { seed: None }) {
        Commands::Init => {
            AppConfig::setup_interactive(config_path).context("setup failed")?;
            Ok(())
        }
        Commands::Run { seed } => {
            let (config, db) = open_store(config_path, data_dir)?;
            run_monitor(&config, data_dir, db, seed).await
        }
        Commands::Export { output, limit } => {
            let (config, db) = open_store(config_path, data_dir)?;
            let path = match output {
                Some(p) => p,
                None => config.export_path(data_dir)?,
            };
            let limit = limit.unwrap_or(config.export.limit);
            let path = db.export_json(&path, Some(limit))?;
            println!("Exported measurements to {}", path.display());
            Ok(())
        }
        Commands::History { limit } => {
            let (_, db) = open_store(config_path, data_dir)?;
            for m in db.list_measurements(Some(limit))? {
                println!(
                    "{:>6}  {}  temp {:>6.2}°C  air {:>6.2}%  soil {:>6.2}%  pump {}",
                    m.id.unwrap_or_default(),
                    m.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    m.temperature,
                    m.air_humidity,
                    m.soil_humidity,
                    if m.pump_active { "ON" } else { "off" }
                );
            }
            Ok(())
        }
        Commands::Alerts { limit } => {
            let (_, db) = open_store(config_path, data_dir)?;
            for a in db.list_alerts(Some(limit))? {
                println!(
                    "{:>6}  {}  {:<12}  {}",
                    a.id.unwrap_or_default(),
                    a.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    a.kind.as_str(),
                    a.message
                );
            }
            Ok(())
        }
        Commands::Config { action } => {
            let (config, db) = open_store(config_path, data_dir)?;
            db.seed_defaults(config.defaults.entries())?;
            match action {
                ConfigAction::List => {
                    for (name, value) in db.list_settings()? {
                        println!("{name} = {value}");
                    }
                }
                ConfigAction::Get { name } => match db.get_setting(&name)? {
                    Some(value) => println!("{value}"),
                    None => anyhow::bail!("parameter '{name}' is not set"),
                },
                ConfigAction::Set { name, value } => {
                    db.set_setting(&name, &value)?;
                    println!("{name} = {value}");
                }
            }
            Ok(())
        }
        Commands::Rules => {
            for (i, (id, name)) in RulesEngine::new().list_rules().into_iter().enumerate() {
                println!("{}. {:<14} {}", i + 1, id, name);
            }
            Ok(())
        }
    }
}

fn open_store(
    config_path: Option<&PathBuf>,
    data_dir: Option<&PathBuf>,
) -> Result<(AppConfig, Database)> {
    let config = AppConfig::load(config_path).context("failed to load configuration")?;
    let db_path = config.db_path(data_dir)?;
    let db = Database::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    Ok((config, db))
}

async fn run_monitor(
    config: &AppConfig,
    data_dir: Option<&PathBuf>,
    db: Database,
    seed: Option<u64>,
) -> Result<()> {
    let source = match seed {
        Some(seed) => Simulator::with_seed(seed),
        None => Simulator::new(),
    };

    let source_name = source.name();
    let mut control = ControlLoop::new(db.clone(), Box::new(source), &config.defaults)?
        .with_options(LoopOptions::from(&config.control));

    control.start().await?;
    let mut status = control.subscribe();
    println!(
        "Monitoring greenhouse with the {} source (database {}). Press Ctrl-C to stop.",
        source_name,
        db.path().display()
    );

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            println!();
            println!("Stopping...");
        }
        _ = status.wait_for(|s| s.state == LoopState::Idle) => {
            tracing::error!("Control loop ended unexpectedly");
        }
    }

    if control.stop().await == StopOutcome::Abandoned {
        eprintln!("Warning: control loop did not stop within the timeout");
    }
    // Applies directly now that the loop is no longer running.
    control.turn_pump_off();

    let status = control.status();
    println!(
        "Cycles: {}  Stored measurements: {}  Pump: {}",
        status.cycles,
        db.count_measurements()?,
        if status.pump_active { "ON" } else { "off" }
    );

    let export_path = config.export_path(data_dir)?;
    let exported = db
        .export_json(&export_path, Some(config.export.limit))
        .context("final export failed")?;
    println!("Exported measurements to {}", exported.display());

    Ok(())
}
