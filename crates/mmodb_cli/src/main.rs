//! mmodb CLI
//!
//! Maintenance tools for account flat files and party databases.
//!
//! # Commands
//!
//! - `inspect` - Record counts, next free id and layout versions
//! - `verify` - Report every line the loader would skip
//! - `upgrade` - Rewrite a legacy account file in the current layout
//! - `dump` - Print every account or party

mod commands;

use clap::{Parser, Subcommand};
use commands::Target;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// mmodb command-line maintenance tools.
#[derive(Parser)]
#[command(name = "mmodb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to an account flat file
    #[arg(global = true, short, long, conflicts_with = "parties")]
    accounts: Option<PathBuf>,

    /// Path to a SQLite database holding party tables
    #[arg(global = true, short, long)]
    parties: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display record counts and format information
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check that every line of an account file loads
    Verify,

    /// Rewrite an account file in the current layout
    Upgrade {
        /// Show what would be done without writing
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Print every record
    Dump {
        /// Maximum number of records to print
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

impl Cli {
    fn target(&self) -> Result<Target, Box<dyn std::error::Error>> {
        match (&self.accounts, &self.parties) {
            (Some(path), None) => Ok(Target::Accounts(path.clone())),
            (None, Some(path)) => Ok(Target::Parties(path.clone())),
            _ => Err("exactly one of --accounts or --parties is required".into()),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Inspect { format } => commands::inspect::run(&cli.target()?, format)?,
        Commands::Verify => match cli.target()? {
            Target::Accounts(path) => commands::verify::run(&path)?,
            Target::Parties(_) => return Err("verify applies to account files only".into()),
        },
        Commands::Upgrade { dry_run } => match cli.target()? {
            Target::Accounts(path) => commands::upgrade::run(&path, *dry_run)?,
            Target::Parties(_) => return Err("upgrade applies to account files only".into()),
        },
        Commands::Dump { limit, format } => commands::dump::run(&cli.target()?, *limit, format)?,
        Commands::Version => {
            println!("mmodb CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("account file format {}", mmodb_codec::CURRENT_VERSION);
        }
    }

    Ok(())
}
