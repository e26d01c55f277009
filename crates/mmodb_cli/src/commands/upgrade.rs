//! Upgrade command implementation.

use super::open_accounts;
use mmodb_codec::CURRENT_VERSION;
use mmodb_core::PersistenceBackend;
use std::path::Path;

/// What the upgrade did or would do.
#[derive(Debug, PartialEq, Eq)]
pub struct UpgradeOutcome {
    /// Records carried over.
    pub records: usize,
    /// Records read from a legacy layout.
    pub legacy_records: usize,
    /// Lines that will not survive the rewrite.
    pub dropped_lines: usize,
    /// Whether the file was rewritten.
    pub rewritten: bool,
}

/// Runs the upgrade command.
pub fn run(path: &Path, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = upgrade(path, dry_run)?;

    println!("Account file: {:?}", path);
    println!("  Records:         {}", outcome.records);
    println!("  Legacy records:  {}", outcome.legacy_records);
    if outcome.dropped_lines > 0 {
        println!("  Dropped lines:   {}", outcome.dropped_lines);
    }
    println!();

    if outcome.rewritten {
        println!("✓ Rewritten in layout {CURRENT_VERSION}");
    } else if dry_run {
        println!("Dry run, nothing written");
    } else {
        println!("✓ Already in layout {CURRENT_VERSION}");
    }
    Ok(())
}

/// Loads the file and, unless `dry_run`, rewrites it in the current layout
/// when anything in it is not already canonical.
pub fn upgrade(path: &Path, dry_run: bool) -> Result<UpgradeOutcome, Box<dyn std::error::Error>> {
    let (mut db, report) = open_accounts(path)?;
    let legacy_records = report
        .records_by_version
        .iter()
        .filter(|(&version, _)| version != CURRENT_VERSION)
        .map(|(_, &count)| count)
        .sum::<usize>();
    let dropped_lines = report.skipped.len() + report.duplicates;
    let needed = report.has_legacy_records() || !report.is_clean() || report.version_lines != 1;

    let rewritten = needed && !dry_run;
    if rewritten {
        tracing::info!(path = %path.display(), legacy_records, dropped_lines, "rewriting account file");
        db.sync()?;
    }

    Ok(UpgradeOutcome {
        records: report.records,
        legacy_records,
        dropped_lines,
        rewritten,
    })
}
