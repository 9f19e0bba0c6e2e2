// gridpick entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, stdout is reserved for JSON output)
// 2. Load config, copying defaults on first run
// 3. Open database and seed the driver catalog
// 4. Build the draft engine and run the requested command

mod cli;

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::{error, info, warn};

use gridpick_core::catalog;
use gridpick_core::config::{self, Config};
use gridpick_core::db::Database;
use gridpick_core::draft::DraftEngine;
use gridpick_core::DraftError;

use cli::{Cli, Command, WeekAction};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Initialize tracing
    init_tracing()?;
    info!("gridpick starting: {:?}", cli.command);

    // 2. Load config
    let base_dir = std::env::current_dir().context("failed to resolve working directory")?;
    let config = config::load_config(&base_dir).context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, {} required participants, {} rounds",
        config.league.name,
        config.league.participants.len(),
        config.league.rounds_total
    );

    // 3. Open database and seed the catalog
    let db = Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);
    seed_catalog(&db, &base_dir, &config);

    // 4. Run the command
    let engine =
        DraftEngine::new(db).with_required_participants(config.league.participants.clone());

    match run(&engine, &config, cli.command) {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Command failed: {:#}", e);
            Err(e)
        }
    }
}

/// Import the configured driver list. A missing or unreadable file is not
/// fatal: drafts can still run on previously imported or custom drivers.
fn seed_catalog(db: &Database, base_dir: &Path, config: &Config) {
    let path = base_dir.join(&config.drivers_path);
    let drivers = match catalog::load_drivers(&path) {
        Ok(drivers) => drivers,
        Err(e) => {
            warn!("Driver catalog not loaded: {}", e);
            return;
        }
    };
    match db.import_catalog(&drivers) {
        Ok(added) if added > 0 => info!("Imported {} new drivers from {}", added, path.display()),
        Ok(_) => {}
        Err(e) => warn!("Driver catalog import failed: {:#}", e),
    }
}

fn run(engine: &DraftEngine<Database>, config: &Config, command: Command) -> anyhow::Result<()> {
    let db = engine.store();
    let week = |period: Option<u32>| -> anyhow::Result<u32> {
        match period {
            Some(p) => Ok(p),
            None => db.current_period(),
        }
    };

    match command {
        Command::Start {
            period,
            order,
            rounds,
        } => {
            let period = week(period)?;
            let rounds = rounds.unwrap_or(config.league.rounds_total);
            let instance = engine.start_draft(period, &order, rounds).map_err(outcome)?;
            print_json(&instance)
        }
        Command::Pick {
            period,
            participant,
            item,
            custom,
        } => {
            let period = week(period)?;
            if custom {
                engine.register_item(&item).map_err(outcome)?;
            }
            let receipt = engine
                .submit_pick(period, &participant, &item)
                .map_err(outcome)?;
            print_json(&receipt)
        }
        Command::State { period } => {
            let snapshot = engine.get_state(week(period)?).map_err(outcome)?;
            print_json(&snapshot)
        }
        Command::Rosters { period } => {
            let rosters = engine.rosters(week(period)?).map_err(outcome)?;
            print_json(&rosters)
        }
        Command::Picks {
            period,
            participant,
        } => {
            let period = week(period)?;
            let picks = match participant {
                Some(p) => engine.picks_for(period, &p),
                None => engine.picks(period),
            }
            .map_err(outcome)?;
            print_json(&picks)
        }
        Command::Consolidate { period } => {
            let report = engine.consolidate(week(period)?).map_err(outcome)?;
            print_json(&report)
        }
        Command::RegisterItem { name } => {
            let added = engine.register_item(&name).map_err(outcome)?;
            print_json(&serde_json::json!({ "name": name.trim(), "added": added }))
        }
        Command::Week { action } => {
            let period = match action {
                WeekAction::Show => db.current_period()?,
                WeekAction::Set { period } => {
                    db.set_current_period(period)?;
                    period
                }
                WeekAction::Advance => db.advance_period()?,
            };
            print_json(&serde_json::json!({ "current_period": period }))
        }
    }
}

/// Attach the outcome kind so the terminal error reads e.g.
/// `NotYourTurn: it is player1's turn, not player2's`.
fn outcome(e: DraftError) -> anyhow::Error {
    let kind = e.kind();
    anyhow::Error::new(e).context(kind)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{text}");
    Ok(())
}

/// Initialize tracing to write logs to a file in the `logs/` directory.
///
/// Logs go to a file rather than the terminal so command output stays
/// machine-readable.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("gridpick.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gridpick=info,gridpick_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
