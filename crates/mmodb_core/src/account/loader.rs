//! Reads an account flat file into memory.

use crate::error::{CoreError, CoreResult};
use mmodb_codec::{Account, Line, LineDecoder};
use mmodb_storage::{FlatStore, StorageError};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::io::BufRead;

/// A line the loader could not use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    /// 1-based line number.
    pub line: usize,
    /// Why the line was skipped.
    pub reason: String,
}

/// Statistics gathered while loading an account file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Records loaded.
    pub records: usize,
    /// Loaded records per declared format version.
    pub records_by_version: BTreeMap<u32, usize>,
    /// Comment lines seen.
    pub comments: usize,
    /// Version declaration lines seen.
    pub version_lines: usize,
    /// Records discarded because an earlier line had the same id.
    pub duplicates: usize,
    /// Lines that could not be decoded.
    pub skipped: Vec<SkippedLine>,
    /// Next free id after loading.
    pub next_id: u32,
}

impl LoadReport {
    /// Whether every line was used.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.duplicates == 0
    }

    /// Whether any record used a layout other than the current one.
    #[must_use]
    pub fn has_legacy_records(&self) -> bool {
        self.records_by_version
            .keys()
            .any(|&version| version != mmodb_codec::CURRENT_VERSION)
    }
}

/// Accounts read from a flat store.
#[derive(Debug, Default)]
pub(crate) struct Loaded {
    pub accounts: HashMap<u32, Account>,
    pub next_id: u32,
    pub report: LoadReport,
}

/// Loads every account from `store`.
///
/// The first record with a given id wins. A `%newid%` line only raises the
/// counter, and after loading the counter is raised past the largest id.
pub(crate) fn load_store(store: &dyn FlatStore, first_id: u32) -> CoreResult<Loaded> {
    let reader = match store.open_reader() {
        Ok(reader) => reader,
        Err(StorageError::Missing { .. }) => {
            tracing::error!(location = %store.location(), "account file not found");
            return Err(CoreError::missing_resource(store.location()));
        }
        Err(e) => {
            tracing::error!(location = %store.location(), error = %e, "account file unreadable");
            return Err(e.into());
        }
    };

    let mut loaded = Loaded {
        next_id: first_id,
        ..Loaded::default()
    };
    let mut decoder = LineDecoder::new();
    let mut max_id = 0u32;

    for (index, raw) in read_lines(reader)?.into_iter().enumerate() {
        let number = index + 1;
        match decoder.decode(&raw) {
            Ok(Line::Blank) => {}
            Ok(Line::Comment) => loaded.report.comments += 1,
            Ok(Line::Version(_)) => loaded.report.version_lines += 1,
            Ok(Line::NextId(next)) => {
                if next > loaded.next_id {
                    loaded.next_id = next;
                }
            }
            Ok(Line::Account(account)) => {
                let id = account.id;
                if loaded.accounts.contains_key(&id) {
                    tracing::warn!(line = number, id, "duplicate account id, keeping the first");
                    loaded.report.duplicates += 1;
                    continue;
                }
                max_id = max_id.max(id);
                *loaded
                    .report
                    .records_by_version
                    .entry(decoder.version())
                    .or_insert(0) += 1;
                loaded.accounts.insert(id, account);
            }
            Err(e) => {
                tracing::warn!(line = number, error = %e, "skipping malformed account line");
                loaded.report.skipped.push(SkippedLine {
                    line: number,
                    reason: e.to_string(),
                });
            }
        }
    }

    if max_id >= loaded.next_id {
        loaded.next_id = max_id.saturating_add(1);
    }
    loaded.report.records = loaded.accounts.len();
    loaded.report.next_id = loaded.next_id;

    tracing::debug!(
        location = %store.location(),
        records = loaded.report.records,
        skipped = loaded.report.skipped.len(),
        next_id = loaded.next_id,
        "loaded account file"
    );
    Ok(loaded)
}

/// Splits the input into lines, decoding each leniently so that a stray
/// non-UTF-8 byte damages one field instead of the whole load.
fn read_lines(mut reader: Box<dyn BufRead + '_>) -> CoreResult<Vec<String>> {
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        lines.push(String::from_utf8_lossy(&buf).into_owned());
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmodb_storage::MemoryStore;

    const SCENARIO: &str = "20080409\n// comment\n1001\tuser1\tpass1\tM\tu1@x.com\t0\t0\t0\t0\t3\t2024-01-01\t1.2.3.4\tkk,vv \n1002\t%newid%\n";

    #[test]
    fn scenario_file_loads_one_account() {
        let store = MemoryStore::with_contents(SCENARIO);
        let loaded = load_store(&store, 1).unwrap();

        assert_eq!(loaded.accounts.len(), 1);
        let account = &loaded.accounts[&1001];
        assert_eq!(account.userid, "user1");
        assert_eq!(account.registry.len(), 1);
        assert_eq!(account.registry_value("kk"), Some("vv"));
        assert_eq!(loaded.next_id, 1002);
        assert_eq!(loaded.report.comments, 1);
        assert_eq!(loaded.report.version_lines, 1);
        assert!(loaded.report.is_clean());
    }

    #[test]
    fn missing_file_is_fatal() {
        let store = MemoryStore::new();
        assert!(matches!(
            load_store(&store, 1),
            Err(CoreError::MissingResource { .. })
        ));
    }

    #[test]
    fn first_duplicate_wins() {
        let text = "20080409\n\
            5\tfirst\tp\tM\t\t0\t0\t0\t0\t0\t\t\t\n\
            5\tsecond\tp\tF\t\t0\t0\t0\t0\t0\t\t\t\n";
        let loaded = load_store(&MemoryStore::with_contents(text), 1).unwrap();

        assert_eq!(loaded.accounts[&5].userid, "first");
        assert_eq!(loaded.report.duplicates, 1);
    }

    #[test]
    fn next_id_marker_never_lowers_counter() {
        let text = "20080409\n10\t%newid%\n";
        let loaded = load_store(&MemoryStore::with_contents(text), 2_000_000).unwrap();
        assert_eq!(loaded.next_id, 2_000_000);
    }

    #[test]
    fn counter_raised_past_largest_id() {
        let text = "20080409\n\
            2000007\tbig\tp\tM\t\t0\t0\t0\t0\t0\t\t\t\n\
            2000001\t%newid%\n";
        let loaded = load_store(&MemoryStore::with_contents(text), 2_000_000).unwrap();
        assert_eq!(loaded.next_id, 2_000_008);
    }

    #[test]
    fn unsupported_layout_is_skipped_and_loading_continues() {
        let text = "20080409\n\
            1\tshort\tline\n\
            2\tgood\tp\tM\t\t0\t0\t0\t0\t0\t\t\t\n";
        let loaded = load_store(&MemoryStore::with_contents(text), 1).unwrap();

        assert_eq!(loaded.accounts.len(), 1);
        assert!(loaded.accounts.contains_key(&2));
        assert_eq!(loaded.report.skipped.len(), 1);
        assert_eq!(loaded.report.skipped[0].line, 2);
    }

    #[test]
    fn loose_numeric_columns_keep_the_record() {
        let text = "5\tlegacy\tpw\t-\tM\t\tz\t\n\
            20080409\n\
            3\tblank\tp\tM\t\t\t\t\t\t\t\t\t\n\
            4\tsuffix\tp\tF\t\t7x\t0\t0\t0\t2y\t\t\t\n";
        let loaded = load_store(&MemoryStore::with_contents(text), 1).unwrap();

        assert!(loaded.report.skipped.is_empty());
        assert_eq!(loaded.accounts.len(), 3);
        assert_eq!(loaded.accounts[&3].level, 0);
        assert_eq!(loaded.accounts[&4].level, 7);
        assert_eq!(loaded.accounts[&4].logincount, 2);
        assert_eq!(loaded.accounts[&5].state, 0);
    }

    #[test]
    fn legacy_records_are_counted_per_version() {
        let text = "1\told\tpw\t-\tM\t4\t0\t\n\
            20080409\n\
            2\tnew\tpw\tF\t\t0\t0\t0\t0\t0\t\t\t\n";
        let loaded = load_store(&MemoryStore::with_contents(text), 1).unwrap();

        assert_eq!(loaded.report.records_by_version.get(&0), Some(&1));
        assert_eq!(loaded.report.records_by_version.get(&20080409), Some(&1));
        assert!(loaded.report.has_legacy_records());
        assert_eq!(loaded.accounts[&1].logincount, 4);
    }
}
