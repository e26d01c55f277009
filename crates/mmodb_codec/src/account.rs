//! Account record types.

use serde::{Deserialize, Serialize};

/// Maximum length in bytes of a login name.
pub const USERID_MAX: usize = 23;
/// Maximum length in bytes of a password credential.
pub const PASSWORD_MAX: usize = 32;
/// Maximum length in bytes of an email address.
pub const EMAIL_MAX: usize = 39;
/// Maximum length in bytes of the last-login timestamp text.
pub const LASTLOGIN_MAX: usize = 23;
/// Maximum length in bytes of the last-seen address.
pub const LAST_IP_MAX: usize = 15;
/// Maximum length in bytes of a registry key.
pub const REGISTRY_KEY_MAX: usize = 31;
/// Maximum length in bytes of a registry value.
pub const REGISTRY_VALUE_MAX: usize = 255;
/// Maximum number of registry entries per account.
pub const REGISTRY_MAX: usize = 16;

/// A persisted player account.
///
/// Id `0` means "unassigned": backends replace it with a fresh id on create.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Account {
    /// Account id. Immutable once assigned.
    pub id: u32,
    /// Login name.
    pub userid: String,
    /// Password credential.
    pub pass: String,
    /// Sex/type flag: `M`, `F`, or `S` for server accounts. `'\0'` when unset.
    pub sex: char,
    /// Email address.
    pub email: String,
    /// Privilege level.
    pub level: u32,
    /// State / ban-reason code. 0 means the account is in good standing.
    pub state: u32,
    /// Unix time the temporary ban lifts, 0 for none.
    pub unban_time: i64,
    /// Unix time the account expires, 0 for unlimited.
    pub expiration_time: i64,
    /// Number of successful logins.
    pub logincount: u32,
    /// Last login timestamp, as text.
    pub lastlogin: String,
    /// Last accepted login address.
    pub last_ip: String,
    /// Ordered account-wide registry.
    pub registry: Vec<RegistryEntry>,
}

/// One `key,value` pair of the account registry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Registry key, at most [`REGISTRY_KEY_MAX`] bytes.
    pub key: String,
    /// Registry value, at most [`REGISTRY_VALUE_MAX`] bytes.
    pub value: String,
}

impl RegistryEntry {
    /// Creates an entry, truncating key and value to their bounds.
    pub fn new(key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        Self {
            key: bounded(key.as_ref(), REGISTRY_KEY_MAX),
            value: bounded(value.as_ref(), REGISTRY_VALUE_MAX),
        }
    }

    /// An entry with an empty key or value is unset and is never stored.
    #[must_use]
    pub fn is_set(&self) -> bool {
        !self.key.is_empty() && !self.value.is_empty()
    }
}

impl Account {
    /// Creates an unassigned account with the given credentials.
    #[must_use]
    pub fn new(userid: &str, pass: &str, sex: char) -> Self {
        Self {
            userid: bounded(userid, USERID_MAX),
            pass: bounded(pass, PASSWORD_MAX),
            sex,
            ..Self::default()
        }
    }

    /// Returns the registry value stored under `key`.
    #[must_use]
    pub fn registry_value(&self, key: &str) -> Option<&str> {
        self.registry
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value.as_str())
    }

    /// Sets a registry value, appending a new entry if the key is absent.
    /// An empty value removes the entry.
    ///
    /// Returns `false` when the registry is already full.
    pub fn set_registry(&mut self, key: &str, value: &str) -> bool {
        let entry = RegistryEntry::new(key, value);
        if !entry.is_set() {
            self.registry.retain(|e| e.key != entry.key);
            return true;
        }
        if let Some(existing) = self.registry.iter_mut().find(|e| e.key == entry.key) {
            existing.value = entry.value;
            return true;
        }
        if self.registry.len() >= REGISTRY_MAX {
            return false;
        }
        self.registry.push(entry);
        true
    }

    /// Truncates every bounded text field to its maximum length and drops
    /// unset registry entries.
    pub fn clamp(&mut self) {
        self.userid = bounded(&self.userid, USERID_MAX);
        self.pass = bounded(&self.pass, PASSWORD_MAX);
        self.email = bounded(&self.email, EMAIL_MAX);
        self.lastlogin = bounded(&self.lastlogin, LASTLOGIN_MAX);
        self.last_ip = bounded(&self.last_ip, LAST_IP_MAX);
        self.registry.retain(RegistryEntry::is_set);
        self.registry.truncate(REGISTRY_MAX);
        for entry in &mut self.registry {
            *entry = RegistryEntry::new(&entry.key, &entry.value);
        }
    }
}

/// Copies at most `max` bytes of `s`, never splitting a character.
#[must_use]
pub fn bounded(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}
