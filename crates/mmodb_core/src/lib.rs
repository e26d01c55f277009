//! # mmodb Core
//!
//! Persistence layer for game accounts and parties.
//!
//! Services talk to a [`PersistenceBackend`] and never to a storage medium.
//! This crate provides:
//! - The backend contract and one-shot [`EntityIter`]
//! - [`AccountTxtDb`], a write-back cache over the account flat file
//! - [`PartySqlDb`], transactional party storage over SQLite
//! - [`KeysetIter`], lock-per-row key iteration over any SQLite table
//! - Builder-style configuration and one error taxonomy for both
//!
//! ## Example
//!
//! ```rust
//! use mmodb_codec::Account;
//! use mmodb_core::{AccountBackend, AccountDbConfig, AccountTxtDb, CoreError, PersistenceBackend};
//! use mmodb_storage::{ManualScheduler, MemoryStore};
//! use std::sync::Arc;
//!
//! let scheduler = Arc::new(ManualScheduler::new());
//! let mut accounts: Box<AccountBackend> = Box::new(AccountTxtDb::with_store(
//!     AccountDbConfig::default(),
//!     MemoryStore::with_contents("20080409\n"),
//!     scheduler,
//! ));
//! accounts.init().unwrap();
//!
//! let mut hero = Account::new("hero", "secret", 'M');
//! accounts.create(&mut hero).unwrap();
//! assert_eq!(accounts.id_by_name("hero").unwrap(), Some(hero.id));
//!
//! accounts.remove(hero.id).unwrap();
//! assert!(matches!(accounts.remove(hero.id), Err(CoreError::NotFound { .. })));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod account;
mod backend;
mod config;
mod error;
mod iter;
mod keyset;
mod party;

pub use account::{AccountTxtDb, LoadReport, SkippedLine};
pub use backend::{Entity, PersistenceBackend};
pub use config::{
    AccountDbConfig, PartyDbConfig, DEFAULT_FIRST_ACCOUNT_ID, DEFAULT_FLUSH_INTERVAL,
    DEFAULT_FLUSH_THRESHOLD, DEFAULT_MAX_PARTY_MEMBERS,
};
pub use error::{CoreError, CoreResult};
pub use iter::EntityIter;
pub use keyset::KeysetIter;
pub use party::{Party, PartyChange, PartyMember, PartySqlDb, PartyUpdate, PARTY_NAME_MAX};

/// Account backend as seen by services.
pub type AccountBackend = dyn PersistenceBackend<Entity = mmodb_codec::Account, Update = (), Report = LoadReport>;

/// Party backend as seen by services.
pub type PartyBackend = dyn PersistenceBackend<Entity = Party, Update = PartyUpdate, Report = ()>;
