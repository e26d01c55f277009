//! Known column layouts of the account flat file.
//!
//! A layout is selected by the format version declared earlier in the file
//! together with the number of tab-separated columns on the line. The last
//! column of every layout is the registry text.
//!
//! | version    | columns | layout                                                              |
//! |------------|---------|---------------------------------------------------------------------|
//! | `20080409` | 13      | id, userid, pass, sex, email, level, state, unban_time, expiration_time, logincount, lastlogin, last_ip, registry |
//! | `0`        | 14      | id, userid, pass, lastlogin, sex, logincount, state, email, error_message, expiration_time, last_ip, memo, unban_time, registry |
//! | `0`        | 13      | id, userid, pass, lastlogin, sex, logincount, state, email, error_message, expiration_time, last_ip, memo, registry |
//! | `0`        | 8       | id, userid, pass, lastlogin, sex, logincount, state, registry       |
//!
//! `error_message` and `memo` are read past and dropped.

/// Version number of the layout written by the encoder.
pub const CURRENT_VERSION: u32 = 20080409;

/// Version in effect before any version line is seen.
pub const LEGACY_VERSION: u32 = 0;

/// A supported column layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    /// The canonical layout, `(20080409, 13)`.
    Current,
    /// Pre-versioned layout with a trailing ban timestamp, `(0, 14)`.
    LegacyBan,
    /// Pre-versioned layout with email and expiration, `(0, 13)`.
    LegacyFull,
    /// Oldest layout, `(0, 8)`.
    LegacyMinimal,
}

impl Layout {
    /// Picks the layout for a line, if the combination is known.
    #[must_use]
    pub const fn select(version: u32, columns: usize) -> Option<Self> {
        match (version, columns) {
            (CURRENT_VERSION, 13) => Some(Self::Current),
            (LEGACY_VERSION, 14) => Some(Self::LegacyBan),
            (LEGACY_VERSION, 13) => Some(Self::LegacyFull),
            (LEGACY_VERSION, 8) => Some(Self::LegacyMinimal),
            _ => None,
        }
    }

    /// Number of columns, registry included.
    #[must_use]
    pub const fn columns(self) -> usize {
        match self {
            Self::Current | Self::LegacyFull => 13,
            Self::LegacyBan => 14,
            Self::LegacyMinimal => 8,
        }
    }

    /// Version number that introduced this layout.
    #[must_use]
    pub const fn version(self) -> u32 {
        match self {
            Self::Current => CURRENT_VERSION,
            _ => LEGACY_VERSION,
        }
    }

    /// Returns `true` for the layout the encoder emits.
    #[must_use]
    pub const fn is_current(self) -> bool {
        matches!(self, Self::Current)
    }
}
