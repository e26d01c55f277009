//! Canonical flat-file encoder.

use crate::account::Account;
use crate::decoder::NEXT_ID_MARKER;
use crate::layout::CURRENT_VERSION;
use std::borrow::Cow;
use std::fmt::Write as _;
use std::io::{self, Write};

/// Explanatory block written after the version line. Never parsed back.
const HEADER_COMMENTS: &[&str] = &[
    "// Accounts file: every account known to the login server.",
    "// Structure: ID, account name, password, sex, email, level, state, ban timestamp, expiration timestamp, # of logins, last login time, last (accepted) login ip, repeated(register key, register value)",
    "// Some explanations:",
    "//   account name    : between 4 to 23 char for a normal account.",
    "//   account password: between 4 to 32 char",
    "//   sex             : M or F for normal accounts, S for server accounts",
    "//   level           : GM level, 0 for a regular player",
    "//   state           : 0: account is ok, 1 to 256: login refusal reason + 1",
    "//   email           : between 3 to 39 char (a@a.com is like no email)",
    "//   ban timestamp   : 0: no ban, <other value>: banned until this unix time",
    "//   expiration time : 0: unlimited account, <other value>: valid until this unix time",
];

/// Encodes one account in the canonical layout, terminated by a newline.
///
/// Registry entries with an empty key or value are omitted.
#[must_use]
pub fn encode_account(account: &Account) -> String {
    let mut line = String::with_capacity(128 + account.registry.len() * 16);
    let sex = if account.sex == '\0' {
        String::new()
    } else {
        account.sex.to_string()
    };

    // Writing into a String cannot fail.
    let _ = write!(
        line,
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t",
        account.id,
        clean(&account.userid),
        clean(&account.pass),
        clean(&sex),
        clean(&account.email),
        account.level,
        account.state,
        account.unban_time,
        account.expiration_time,
        account.logincount,
        clean(&account.lastlogin),
        clean(&account.last_ip),
    );

    for entry in account.registry.iter().filter(|e| e.is_set()) {
        let _ = write!(line, "{},{} ", clean(&entry.key), clean(&entry.value));
    }

    line.push('\n');
    line
}

/// Streaming writer for a complete account file.
///
/// A full dump is the version line, the comment block, one line per account,
/// then the auto-increment marker.
///
/// # Example
///
/// ```
/// use mmodb_codec::{Account, AccountEncoder};
///
/// let mut encoder = AccountEncoder::new(Vec::new());
/// encoder.write_header().unwrap();
/// let mut account = Account::new("hero", "secret", 'M');
/// account.id = 2000000;
/// encoder.write_account(&account).unwrap();
/// encoder.write_next_id(2000001).unwrap();
///
/// let text = String::from_utf8(encoder.into_inner()).unwrap();
/// assert!(text.starts_with("20080409\n"));
/// assert!(text.ends_with("2000001\t%newid%\n"));
/// ```
pub struct AccountEncoder<W: Write> {
    writer: W,
    records: usize,
}

impl<W: Write> AccountEncoder<W> {
    /// Creates an encoder writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer, records: 0 }
    }

    /// Writes the version line and the comment block.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn write_header(&mut self) -> io::Result<()> {
        writeln!(self.writer, "{CURRENT_VERSION}")?;
        for comment in HEADER_COMMENTS {
            writeln!(self.writer, "{comment}")?;
        }
        Ok(())
    }

    /// Writes one account line.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn write_account(&mut self, account: &Account) -> io::Result<()> {
        self.writer.write_all(encode_account(account).as_bytes())?;
        self.records += 1;
        Ok(())
    }

    /// Writes the trailing auto-increment marker.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn write_next_id(&mut self, next_id: u32) -> io::Result<()> {
        writeln!(self.writer, "{next_id}\t{NEXT_ID_MARKER}")
    }

    /// Number of account lines written so far.
    #[must_use]
    pub fn records(&self) -> usize {
        self.records
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

const SEPARATORS: &[char] = &['\t', '\n', '\r'];

/// Column separators inside a value would break the layout.
fn clean(s: &str) -> Cow<'_, str> {
    if s.contains(SEPARATORS) {
        Cow::Owned(s.replace(SEPARATORS, " "))
    } else {
        Cow::Borrowed(s)
    }
}
