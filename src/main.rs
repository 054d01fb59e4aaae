//! # SPM - Construction Site Planning CLI
//!
//! A command-line planning tool for construction and real-estate development
//! sites, with an optional terminal schedule board (TUI).
//!
//! ## Key Features
//!
//! - **Date Propagation**: moving a task re-lays its later siblings and the
//!   project's later top-level tasks back-to-back, rolls parents up to the
//!   envelope of their children, and keeps the project end date current
//! - **Overdue Sweep**: `spm sweep` closes open tasks whose deadline has passed
//! - **Development Model**: a real-estate development waterfall per project,
//!   from land area through costs and sales to investor and developer profits
//! - **Material Requisitions**: approval workflow, one RFQ per vendor, and
//!   arrival marking restricted to configured users
//! - **Budgets & KPIs**: planned vs achieved budgets, completion, SPI and cost
//!   spent per project
//!
//! ## Quick Start
//!
//! ```bash
//! spm sites --new "North Tower"
//! spm project add "Tower A" --start 2025-03-01 --allocated-days 120
//! spm task add "Excavation" --project "Tower A" --start 2025-03-01 --duration 10
//! spm task add "Foundations" --project "Tower A" --start 2025-03-11 --duration 15
//! spm task shift Excavation 3
//! spm ui
//! ```
//!
//! Data is stored in `~/.spm/` (or `$SPM_DIR`), one JSON workbook per site,
//! with optional settings in `config.toml` next to them.

use std::path::Path;

use clap::Parser;

pub mod budget;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod fields;
pub mod finance;
pub mod project;
pub mod requisition;
pub mod schedule;
pub mod site;
pub mod task;
pub mod work_type;
pub mod tui {
    pub mod app;
    pub mod colors;
    pub mod enums;
    pub mod run;
    pub mod utils;
}

use cli::Cli;
use cmd::*;
use config::Config;
use db::Database;
use error::Result;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let data_dir = config::data_dir();
    let config = Config::load(&data_dir)?;

    // Commands that don't need a workbook.
    match &cli.command {
        Commands::Completions { shell } => {
            cmd_completions(*shell);
            return Ok(());
        }
        Commands::Sites { new } => return cmd_sites(&data_dir, new.clone()),
        _ => {}
    }

    let db_path = site::resolve_workbook(cli.db, config.default_site.as_deref(), &data_dir)?;
    if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| error::AppError::Io {
            path: dir.display().to_string(),
            source,
        })?;
    }
    log::debug!("using workbook {}", db_path.display());

    if let Commands::Ui = cli.command {
        return cmd_ui(&db_path, &config);
    }

    let mut db = Database::load(&db_path)?;
    dispatch(cli.command, &mut db, &db_path, &config, cli.user.as_deref())
}

fn dispatch(
    command: Commands,
    db: &mut Database,
    db_path: &Path,
    config: &Config,
    user: Option<&str>,
) -> Result<()> {
    match command {
        Commands::Ui | Commands::Sites { .. } | Commands::Completions { .. } => {
            unreachable!("handled before the workbook is loaded")
        }
        Commands::Project { action } => cmd_project(db, db_path, action),
        Commands::Task { action } => cmd_task(db, db_path, config, action),
        Commands::Sweep { date } => cmd_sweep(db, db_path, date),
        Commands::Finance { action } => cmd_finance(db, db_path, action),
        Commands::Requisition { action } => cmd_requisition(db, db_path, config, user, action),
        Commands::WorkType { action } => cmd_work_type(db, db_path, action),
        Commands::Budget { action } => cmd_budget(db, db_path, action),
        Commands::Dashboard { filter } => {
            cmd_dashboard(db, config, filter);
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
