//! # mmodb Storage
//!
//! Durable flat-store primitives and the scheduling collaborator for mmodb.
//!
//! Flat stores are **opaque text holders**: they hand out a reader over the
//! current durable copy and a scoped writer that replaces it wholesale. They
//! know nothing about account layouts.
//!
//! ## Design Principles
//!
//! - A dump is published only when its writer commits
//! - A dropped or failed dump never damages the previous copy
//! - Periodic work is registered with a host-supplied [`Scheduler`], never
//!   run on a private thread
//!
//! ## Available Stores
//!
//! - [`FileStore`] - Lock file, temp file, fsync, rename
//! - [`MemoryStore`] - For testing and benchmarks
//!
//! ## Example
//!
//! ```rust
//! use mmodb_storage::{FlatStore, MemoryStore};
//! use std::io::{BufRead, Write};
//!
//! let mut store = MemoryStore::new();
//! let mut dump = store.begin_dump().unwrap();
//! dump.write_all(b"20080409\n").unwrap();
//! dump.commit().unwrap();
//!
//! let first = store.open_reader().unwrap().lines().next().unwrap().unwrap();
//! assert_eq!(first, "20080409");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod schedule;
mod store;

pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use schedule::{ManualScheduler, Scheduler, Task, TimerId};
pub use store::{DumpWriter, FlatStore};
