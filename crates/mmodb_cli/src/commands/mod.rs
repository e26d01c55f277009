//! CLI command implementations.

pub mod dump;
pub mod inspect;
pub mod upgrade;
pub mod verify;

use mmodb_core::{AccountDbConfig, AccountTxtDb, LoadReport, PartyDbConfig, PartySqlDb, PersistenceBackend};
use mmodb_storage::{ManualScheduler, Scheduler};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What a command operates on.
#[derive(Debug, Clone)]
pub enum Target {
    /// An account flat file.
    Accounts(PathBuf),
    /// A SQLite database with party tables.
    Parties(PathBuf),
}

/// Opens an account file. Nothing runs the periodic flush; commands that
/// write call `sync` themselves.
pub fn open_accounts(path: &Path) -> Result<(AccountTxtDb, LoadReport), Box<dyn std::error::Error>> {
    let scheduler: Arc<dyn Scheduler> = Arc::new(ManualScheduler::new());
    let mut db = AccountTxtDb::new(AccountDbConfig::new(path), scheduler);
    let report = db.init()?;
    Ok((db, report))
}

/// Opens a party database read-only.
pub fn open_parties(path: &Path) -> Result<PartySqlDb, Box<dyn std::error::Error>> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let mut db = PartySqlDb::new(conn, PartyDbConfig::default());
    db.init()?;
    Ok(db)
}
