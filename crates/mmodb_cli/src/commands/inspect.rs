//! Inspect command implementation.

use super::{open_accounts, open_parties, Target};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Account file summary.
#[derive(Debug, Serialize)]
pub struct AccountInfo {
    /// File inspected.
    pub path: String,
    /// Accounts loaded.
    pub accounts: usize,
    /// Id the next create receives.
    pub next_id: u32,
    /// Record count per layout version.
    pub records_by_version: BTreeMap<u32, usize>,
    /// Comment lines.
    pub comments: usize,
    /// Duplicate ids ignored.
    pub duplicates: usize,
    /// Lines that failed to parse.
    pub skipped: usize,
}

/// Party database summary.
#[derive(Debug, Serialize)]
pub struct PartyInfo {
    /// Database inspected.
    pub path: String,
    /// Parties stored.
    pub parties: usize,
    /// Characters in some party.
    pub members: usize,
    /// Highest party id, 0 if there are none.
    pub max_id: u32,
}

/// Runs the inspect command.
pub fn run(target: &Target, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    match target {
        Target::Accounts(path) => {
            let info = inspect_accounts(path)?;
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                print_accounts(&info);
            }
        }
        Target::Parties(path) => {
            let info = inspect_parties(path)?;
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                print_parties(&info);
            }
        }
    }
    Ok(())
}

/// Loads an account file and summarizes it.
pub fn inspect_accounts(path: &Path) -> Result<AccountInfo, Box<dyn std::error::Error>> {
    let (db, report) = open_accounts(path)?;
    Ok(AccountInfo {
        path: path.display().to_string(),
        accounts: db.len(),
        next_id: db.next_id()?,
        records_by_version: report.records_by_version,
        comments: report.comments,
        duplicates: report.duplicates,
        skipped: report.skipped.len(),
    })
}

/// Opens a party database and summarizes it.
pub fn inspect_parties(path: &Path) -> Result<PartyInfo, Box<dyn std::error::Error>> {
    let db = open_parties(path)?;
    let mut members = 0;
    let mut max_id = 0;
    for party in mmodb_core::PersistenceBackend::iter(&db)? {
        let party = party?;
        members += party.members.len();
        max_id = max_id.max(party.id);
    }
    Ok(PartyInfo {
        path: path.display().to_string(),
        parties: db.count()?,
        members,
        max_id,
    })
}

fn print_accounts(info: &AccountInfo) {
    println!("Account file: {}", info.path);
    println!();
    println!("  Accounts:    {}", info.accounts);
    println!("  Next id:     {}", info.next_id);
    println!("  Comments:    {}", info.comments);
    println!("  Duplicates:  {}", info.duplicates);
    println!("  Skipped:     {}", info.skipped);
    println!();
    println!("  Records by layout:");
    for (version, count) in &info.records_by_version {
        println!("    {version:>10}: {count}");
    }
}

fn print_parties(info: &PartyInfo) {
    println!("Party database: {}", info.path);
    println!();
    println!("  Parties:  {}", info.parties);
    println!("  Members:  {}", info.members);
    println!("  Max id:   {}", info.max_id);
}
