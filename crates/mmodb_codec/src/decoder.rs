//! Flat-file line decoder.

use crate::account::{
    bounded, Account, RegistryEntry, EMAIL_MAX, LASTLOGIN_MAX, LAST_IP_MAX, PASSWORD_MAX,
    REGISTRY_KEY_MAX, REGISTRY_MAX, REGISTRY_VALUE_MAX, USERID_MAX,
};
use crate::error::{CodecError, CodecResult};
use crate::layout::{Layout, LEGACY_VERSION};

/// Marker that follows the auto-increment value on the trailing line.
pub const NEXT_ID_MARKER: &str = "%newid%";

/// Prefix of comment lines.
pub const COMMENT_PREFIX: &str = "//";

/// One classified line of an account file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Empty line.
    Blank,
    /// Comment line, ignored.
    Comment,
    /// Format version declaration for the lines that follow.
    Version(u32),
    /// Auto-increment marker carrying the next free id.
    NextId(u32),
    /// An account record.
    Account(Account),
}

/// Stateful decoder that tracks the declared format version.
///
/// Files start in the legacy version; a line holding only an integer switches
/// the layout used for every following record until the next such line.
///
/// # Example
///
/// ```
/// use mmodb_codec::{Line, LineDecoder};
///
/// let mut decoder = LineDecoder::new();
/// assert_eq!(decoder.decode("20080409\n").unwrap(), Line::Version(20080409));
/// let line = "1001\tuser1\tpass1\tM\tu1@x.com\t0\t0\t0\t0\t3\t2024-01-01\t1.2.3.4\tkk,vv \n";
/// match decoder.decode(line).unwrap() {
///     Line::Account(account) => assert_eq!(account.userid, "user1"),
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct LineDecoder {
    version: u32,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDecoder {
    /// Creates a decoder positioned before any version line.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            version: LEGACY_VERSION,
        }
    }

    /// Format version currently in effect.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Classifies and decodes one line. The line terminator is optional.
    ///
    /// # Errors
    ///
    /// Returns an error if the line looks like a record but cannot be
    /// decoded under the version in effect.
    pub fn decode(&mut self, raw: &str) -> CodecResult<Line> {
        let line = strip_terminator(raw);

        if line.starts_with(COMMENT_PREFIX) {
            return Ok(Line::Comment);
        }
        if line.is_empty() {
            return Ok(Line::Blank);
        }
        if let Ok(version) = line.parse::<u32>() {
            self.version = version;
            return Ok(Line::Version(version));
        }
        if let Some(next) = line
            .strip_suffix(NEXT_ID_MARKER)
            .and_then(|rest| rest.strip_suffix('\t'))
            .and_then(|n| n.parse::<u32>().ok())
        {
            return Ok(Line::NextId(next));
        }

        decode_account(line, self.version).map(Line::Account)
    }
}

/// Decodes one record line under the given format version.
///
/// # Errors
///
/// Returns [`CodecError::UnsupportedLayout`] when `(version, columns)` is not
/// a known layout, and [`CodecError::ReservedId`] when the id column reads
/// as 0. Other numeric columns never fail: they read like `strtol`.
pub fn decode_account(line: &str, version: u32) -> CodecResult<Account> {
    let line = strip_terminator(line);
    let columns: Vec<&str> = line.split('\t').collect();

    let mut account = Account::default();
    let registry = match (Layout::select(version, columns.len()), columns.as_slice()) {
        (
            Some(Layout::Current),
            &[id, userid, pass, sex, email, level, state, unban, expiration, logins, lastlogin, ip, registry],
        ) => {
            account.id = decode_id(id)?;
            account.userid = bounded(userid, USERID_MAX);
            account.pass = bounded(pass, PASSWORD_MAX);
            account.sex = decode_sex(sex);
            account.email = bounded(email, EMAIL_MAX);
            account.level = leading_number(level);
            account.state = leading_number(state);
            account.unban_time = leading_number(unban);
            account.expiration_time = leading_number(expiration);
            account.logincount = leading_number(logins);
            account.lastlogin = bounded(lastlogin, LASTLOGIN_MAX);
            account.last_ip = bounded(ip, LAST_IP_MAX);
            registry
        }
        (
            Some(Layout::LegacyBan),
            &[id, userid, pass, lastlogin, sex, logins, state, email, _error_message, expiration, ip, _memo, unban, registry],
        ) => {
            decode_legacy_head(&mut account, [id, userid, pass, lastlogin, sex, logins, state])?;
            account.email = bounded(email, EMAIL_MAX);
            account.expiration_time = leading_number(expiration);
            account.last_ip = bounded(ip, LAST_IP_MAX);
            account.unban_time = leading_number(unban);
            registry
        }
        (
            Some(Layout::LegacyFull),
            &[id, userid, pass, lastlogin, sex, logins, state, email, _error_message, expiration, ip, _memo, registry],
        ) => {
            decode_legacy_head(&mut account, [id, userid, pass, lastlogin, sex, logins, state])?;
            account.email = bounded(email, EMAIL_MAX);
            account.expiration_time = leading_number(expiration);
            account.last_ip = bounded(ip, LAST_IP_MAX);
            registry
        }
        (
            Some(Layout::LegacyMinimal),
            &[id, userid, pass, lastlogin, sex, logins, state, registry],
        ) => {
            decode_legacy_head(&mut account, [id, userid, pass, lastlogin, sex, logins, state])?;
            registry
        }
        _ => {
            return Err(CodecError::UnsupportedLayout {
                version,
                columns: columns.len(),
            })
        }
    };

    account.registry = decode_registry(registry);
    Ok(account)
}

/// Parses the registry column: `key,value` groups separated by whitespace.
///
/// Parsing stops at the first group that does not fit the grammar or after
/// [`REGISTRY_MAX`] entries. A group with an empty key (`,value`) is consumed
/// without producing an entry so the rest of the column stays aligned.
#[must_use]
pub fn decode_registry(text: &str) -> Vec<RegistryEntry> {
    let mut entries = Vec::new();
    let mut rest = text;

    while entries.len() < REGISTRY_MAX {
        if let Some((key, value, tail)) = scan_pair(rest) {
            entries.push(RegistryEntry {
                key: key.to_string(),
                value: value.to_string(),
            });
            rest = tail;
            continue;
        }
        match scan_keyless(rest) {
            Some(tail) => rest = tail,
            None => break,
        }
    }

    entries
}

fn decode_legacy_head(account: &mut Account, head: [&str; 7]) -> CodecResult<()> {
    let [id, userid, pass, lastlogin, sex, logins, state] = head;
    account.id = decode_id(id)?;
    account.userid = bounded(userid, USERID_MAX);
    account.pass = bounded(pass, PASSWORD_MAX);
    account.lastlogin = bounded(lastlogin, LASTLOGIN_MAX);
    account.sex = decode_sex(sex);
    account.logincount = leading_number(logins);
    account.state = leading_number(state);
    Ok(())
}

fn decode_id(raw: &str) -> CodecResult<u32> {
    match leading_number(raw) {
        0 => Err(CodecError::ReservedId),
        id => Ok(id),
    }
}

fn decode_sex(raw: &str) -> char {
    raw.chars().next().unwrap_or('\0')
}

/// Reads a numeric column the way `strtol` does: leading whitespace, an
/// optional sign, then as many digits as follow. A column with no digits,
/// or whose value does not fit `T`, reads as 0.
fn leading_number<T: TryFrom<i64> + Default>(raw: &str) -> T {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| acc.saturating_mul(10).saturating_add(i64::from(d - b'0')));
    let value = if negative { -magnitude } else { magnitude };
    T::try_from(value).unwrap_or_default()
}

fn strip_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Splits off the longest prefix of at most `max` bytes whose characters do
/// not satisfy `stop`.
fn take_until(s: &str, max: usize, stop: impl Fn(char) -> bool) -> (&str, &str) {
    let mut end = 0;
    for (i, c) in s.char_indices() {
        if stop(c) || i + c.len_utf8() > max {
            break;
        }
        end = i + c.len_utf8();
    }
    s.split_at(end)
}

fn scan_pair(s: &str) -> Option<(&str, &str, &str)> {
    let (key, rest) = take_until(s, REGISTRY_KEY_MAX, |c| c == '\t' || c == ',');
    if key.is_empty() {
        return None;
    }
    let rest = rest.strip_prefix(',')?;
    let (value, rest) = take_until(rest, REGISTRY_VALUE_MAX, |c| c == '\t' || c == ' ');
    if value.is_empty() {
        return None;
    }
    Some((key, value, rest.trim_start()))
}

fn scan_keyless(s: &str) -> Option<&str> {
    let rest = s.strip_prefix(',')?;
    let (value, rest) = take_until(rest, usize::MAX, |c| c == '\t' || c == ' ');
    if value.is_empty() {
        None
    } else {
        Some(rest.trim_start())
    }
}
