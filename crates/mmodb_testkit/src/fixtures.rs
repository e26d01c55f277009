//! Test fixtures and backend helpers.
//!
//! Every fixture opens its backend ready to use and keeps whatever it needs
//! alive (temp directories, schedulers, store handles) next to it.

use mmodb_codec::CURRENT_VERSION;
use mmodb_core::{AccountDbConfig, AccountTxtDb, PartyDbConfig, PartySqlDb, PersistenceBackend};
use mmodb_storage::{ManualScheduler, MemoryStore, Scheduler};
use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Contents of an account file with no records.
pub fn empty_account_file() -> String {
    format!("{CURRENT_VERSION}\n")
}

/// An account backend over an in-memory store.
pub struct TestAccounts {
    /// The open backend.
    pub db: AccountTxtDb,
    /// Handle on the backing store, for inspecting flushes.
    pub store: MemoryStore,
    /// Scheduler driving the periodic flush.
    pub scheduler: Arc<ManualScheduler>,
}

impl TestAccounts {
    /// Opens an empty in-memory account backend.
    pub fn memory() -> Self {
        Self::with_contents(&empty_account_file(), AccountDbConfig::default())
    }

    /// Opens an in-memory account backend preloaded with `text`.
    pub fn with_contents(text: &str, config: AccountDbConfig) -> Self {
        let store = MemoryStore::with_contents(text);
        let scheduler = Arc::new(ManualScheduler::new());
        let mut db = AccountTxtDb::with_store(
            config,
            store.clone(),
            Arc::clone(&scheduler) as Arc<dyn Scheduler>,
        );
        db.init().expect("Failed to open account backend");
        Self { db, store, scheduler }
    }

    /// Opens a second backend over the same store, as a restart would.
    pub fn reopen(&self) -> AccountTxtDb {
        let scheduler: Arc<dyn Scheduler> = Arc::new(ManualScheduler::new());
        let mut db = AccountTxtDb::with_store(self.db.config().clone(), self.store.clone(), scheduler);
        db.init().expect("Failed to reopen account backend");
        db
    }
}

/// An account file in a temporary directory.
pub struct TempAccountFile {
    dir: TempDir,
    path: PathBuf,
}

impl TempAccountFile {
    /// Creates a file holding only the version line.
    pub fn empty() -> Self {
        Self::with_contents(&empty_account_file())
    }

    /// Creates a file holding `text`.
    pub fn with_contents(text: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("account.txt");
        fs::write(&path, text).expect("Failed to write account file");
        Self { dir, path }
    }

    /// Path of the account file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the file.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Current file contents.
    pub fn read(&self) -> String {
        fs::read_to_string(&self.path).expect("Failed to read account file")
    }

    /// Opens a backend over the file with a manual scheduler.
    pub fn open(&self) -> (AccountTxtDb, Arc<ManualScheduler>) {
        let scheduler = Arc::new(ManualScheduler::new());
        let mut db = AccountTxtDb::new(
            AccountDbConfig::new(&self.path),
            Arc::clone(&scheduler) as Arc<dyn Scheduler>,
        );
        db.init().expect("Failed to open account file");
        (db, scheduler)
    }
}

/// A party backend over an in-memory SQLite database.
pub struct TestParties {
    /// The open backend.
    pub db: PartySqlDb,
    config: PartyDbConfig,
}

impl TestParties {
    /// Opens a party backend with the default configuration.
    pub fn memory() -> Self {
        Self::with_config(PartyDbConfig::default())
    }

    /// Opens a party backend with `config`, creating the schema.
    pub fn with_config(config: PartyDbConfig) -> Self {
        let conn = Connection::open_in_memory().expect("Failed to open SQLite");
        let mut db = PartySqlDb::new(conn, config.clone());
        db.ensure_schema().expect("Failed to create party schema");
        db.init().expect("Failed to open party backend");
        Self { db, config }
    }

    /// Inserts a character row with no party.
    pub fn add_character(&self, account_id: u32, char_id: u32, name: &str) {
        let sql = format!(
            "INSERT INTO \"{}\" (char_id, account_id, name) VALUES (?1, ?2, ?3)",
            self.config.char_table
        );
        self.db
            .connection()
            .lock()
            .execute(&sql, params![char_id, account_id, name])
            .expect("Failed to insert character");
    }

    /// Inserts `count` characters with ids `1..=count`, owned by account
    /// `id * 100`.
    pub fn add_characters(&self, count: u32) {
        for id in 1..=count {
            self.add_character(id * 100, id, &format!("char{id}"));
        }
    }

    /// Party id currently stored on a character row.
    pub fn party_of(&self, char_id: u32) -> u32 {
        let sql = format!(
            "SELECT party_id FROM \"{}\" WHERE char_id = ?1",
            self.config.char_table
        );
        self.db
            .connection()
            .lock()
            .query_row(&sql, [char_id], |row| row.get(0))
            .expect("Failed to read character")
    }

    /// Makes every following update of `char_id` fail inside SQLite.
    pub fn fail_updates_of(&self, char_id: u32) {
        let sql = format!(
            "CREATE TRIGGER IF NOT EXISTS fail_char_{char_id} BEFORE UPDATE ON \"{}\"
             WHEN NEW.char_id = {char_id}
             BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
            self.config.char_table
        );
        self.db
            .connection()
            .lock()
            .execute_batch(&sql)
            .expect("Failed to install failure trigger");
    }
}
