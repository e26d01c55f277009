//! Backend configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Saves absorbed in memory before the account file is rewritten.
pub const DEFAULT_FLUSH_THRESHOLD: u32 = 10;

/// Interval of the periodic account flush.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(60);

/// First id handed out by an empty account store.
pub const DEFAULT_FIRST_ACCOUNT_ID: u32 = 2_000_000;

/// Maximum members of one party.
pub const DEFAULT_MAX_PARTY_MEMBERS: usize = 12;

/// Configuration for the cached-file account backend.
#[derive(Debug, Clone)]
pub struct AccountDbConfig {
    /// Path of the account flat file.
    pub path: PathBuf,

    /// Number of saves absorbed before a flush is forced.
    pub flush_threshold: u32,

    /// How often the periodic flush checks for unflushed saves.
    pub flush_interval: Duration,

    /// Lowest id the auto-increment counter starts from.
    pub first_account_id: u32,
}

impl Default for AccountDbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("save/account.txt"),
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            first_account_id: DEFAULT_FIRST_ACCOUNT_ID,
        }
    }
}

impl AccountDbConfig {
    /// Creates a configuration for the file at `path` with default values.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Sets the number of saves absorbed before a flush. Zero is treated as one.
    #[must_use]
    pub const fn flush_threshold(mut self, saves: u32) -> Self {
        self.flush_threshold = if saves == 0 { 1 } else { saves };
        self
    }

    /// Sets the periodic flush interval.
    #[must_use]
    pub const fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Sets the first auto-assigned account id. Zero is treated as one.
    #[must_use]
    pub const fn first_account_id(mut self, id: u32) -> Self {
        self.first_account_id = if id == 0 { 1 } else { id };
        self
    }
}

/// Configuration for the relational party backend.
#[derive(Debug, Clone)]
pub struct PartyDbConfig {
    /// Table holding one row per party.
    pub party_table: String,

    /// Character table whose `party_id` column links members.
    pub char_table: String,

    /// Whether name lookups compare case-sensitively.
    pub case_sensitive: bool,

    /// Maximum members loaded per party.
    pub max_members: usize,
}

impl Default for PartyDbConfig {
    fn default() -> Self {
        Self {
            party_table: "party".to_string(),
            char_table: "char".to_string(),
            case_sensitive: false,
            max_members: DEFAULT_MAX_PARTY_MEMBERS,
        }
    }
}

impl PartyDbConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the party table name.
    #[must_use]
    pub fn party_table(mut self, name: impl Into<String>) -> Self {
        self.party_table = name.into();
        self
    }

    /// Sets the character table name.
    #[must_use]
    pub fn char_table(mut self, name: impl Into<String>) -> Self {
        self.char_table = name.into();
        self
    }

    /// Sets case-sensitive name lookup.
    #[must_use]
    pub const fn case_sensitive(mut self, value: bool) -> Self {
        self.case_sensitive = value;
        self
    }

    /// Sets the membership cap.
    #[must_use]
    pub const fn max_members(mut self, count: usize) -> Self {
        self.max_members = count;
        self
    }
}
