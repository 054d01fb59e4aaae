use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Construction site planning CLI.
/// Storage defaults to the most recent site workbook in ~/.spm or a path passed via --db.
#[derive(Parser)]
#[command(name = "spm", version, about = "Construction site planning CLI")]
pub struct Cli {
    /// Path to the JSON workbook file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// User performing the command, for permission checks.
    #[arg(long, global = true, env = "SPM_USER")]
    pub user: Option<String>,

    /// Log more (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}
