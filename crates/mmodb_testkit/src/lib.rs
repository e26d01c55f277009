//! # mmodb Testkit
//!
//! Test utilities for mmodb.
//!
//! This crate provides:
//! - Fixtures that open either backend ready to use
//! - Property-based generators for accounts and parties
//! - Contract checks that every [`mmodb_core::PersistenceBackend`] must pass
//!
//! ## Usage
//!
//! ```rust
//! use mmodb_codec::Account;
//! use mmodb_testkit::{contract, TestAccounts};
//!
//! let mut accounts = TestAccounts::memory();
//! let hero = contract::create_then_load(&mut accounts.db, Account::new("hero", "pw", 'M'));
//! contract::lookup_by_name(&accounts.db, &hero);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod contract;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::contract;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
