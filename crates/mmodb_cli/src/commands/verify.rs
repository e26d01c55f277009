//! Verify command implementation.

use super::open_accounts;
use mmodb_core::LoadReport;
use std::path::Path;

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying account file at {:?}", path);
    println!();

    let report = verify(path)?;
    print_report(&report);

    println!();
    if report.is_clean() {
        println!("✓ Account file verification passed");
        Ok(())
    } else {
        println!("✗ Account file verification failed");
        Err("Verification failed".into())
    }
}

/// Loads the file and returns what the loader saw.
pub fn verify(path: &Path) -> Result<LoadReport, Box<dyn std::error::Error>> {
    let (_db, report) = open_accounts(path)?;
    Ok(report)
}

fn print_report(report: &LoadReport) {
    println!("  Records loaded:  {}", report.records);
    println!("  Duplicate ids:   {}", report.duplicates);
    println!("  Skipped lines:   {}", report.skipped.len());
    if report.has_legacy_records() {
        println!("  Legacy records present, run `upgrade` to rewrite them");
    }

    if !report.skipped.is_empty() {
        println!();
        println!("  Skipped:");
        for skipped in report.skipped.iter().take(10) {
            println!("    - line {}: {}", skipped.line, skipped.reason);
        }
        if report.skipped.len() > 10 {
            println!("    ... and {} more", report.skipped.len() - 10);
        }
    }
}
