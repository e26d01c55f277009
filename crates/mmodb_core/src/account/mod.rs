//! Cached-file account backend.
//!
//! Every account lives in memory; the flat file is rewritten wholesale.
//! Creates and removes flush immediately, saves flush every
//! `flush_threshold` calls, and a periodic task flushes whatever is left.

mod loader;

pub use loader::{LoadReport, SkippedLine};

use crate::backend::{Entity, PersistenceBackend};
use crate::config::AccountDbConfig;
use crate::error::{CoreError, CoreResult};
use crate::iter::EntityIter;
use loader::load_store;
use mmodb_codec::{Account, AccountEncoder};
use mmodb_storage::{FileStore, FlatStore, Scheduler, TimerId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

impl Entity for Account {
    const KIND: &'static str = "account";

    fn id(&self) -> u32 {
        self.id
    }

    fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    fn name(&self) -> &str {
        &self.userid
    }
}

/// In-memory state of an open account backend.
struct AccountCache {
    accounts: HashMap<u32, Account>,
    next_id: u32,
    /// Saves left before a forced flush. Equal to `threshold` when clean.
    saves_left: u32,
    threshold: u32,
    store: Box<dyn FlatStore>,
}

impl AccountCache {
    fn is_dirty(&self) -> bool {
        self.saves_left < self.threshold
    }

    /// Rewrites the whole store from memory.
    fn flush(&mut self) -> CoreResult<()> {
        let mut records: Vec<&Account> = self.accounts.values().collect();
        records.sort_unstable_by_key(|account| account.id);

        let mut dump = self.store.begin_dump()?;
        let mut encoder = AccountEncoder::new(&mut dump);
        encoder.write_header()?;
        for account in records {
            encoder.write_account(account)?;
        }
        encoder.write_next_id(self.next_id)?;
        let written = encoder.records();
        drop(encoder);
        dump.commit()?;

        self.saves_left = self.threshold;
        tracing::debug!(records = written, next_id = self.next_id, "flushed account file");
        Ok(())
    }

    /// Flushes, logging any failure.
    fn flush_logged(&mut self, reason: &'static str) -> CoreResult<()> {
        self.flush().inspect_err(|e| self.warn_failed(reason, e))
    }

    /// Flushes on a path whose failure is retried by a later save or tick.
    /// The cache stays dirty when the flush fails.
    fn flush_or_log(&mut self, reason: &'static str) {
        if let Err(e) = self.flush() {
            self.warn_failed(reason, &e);
        }
    }

    fn warn_failed(&self, reason: &'static str, error: &CoreError) {
        tracing::warn!(location = %self.store.location(), reason, %error, "account flush failed");
    }
}

/// Write-back cached account backend over a flat file.
///
/// # Example
///
/// ```rust
/// use mmodb_codec::Account;
/// use mmodb_core::{AccountDbConfig, AccountTxtDb, PersistenceBackend};
/// use mmodb_storage::{ManualScheduler, MemoryStore};
/// use std::sync::Arc;
///
/// let store = MemoryStore::with_contents("20080409\n");
/// let scheduler = Arc::new(ManualScheduler::new());
/// let mut db = AccountTxtDb::with_store(AccountDbConfig::default(), store.clone(), scheduler);
/// db.init().unwrap();
///
/// let mut account = Account::new("hero", "secret", 'M');
/// db.create(&mut account).unwrap();
/// assert_eq!(account.id, 2_000_000);
/// assert!(store.contents().unwrap().contains("hero"));
/// ```
pub struct AccountTxtDb {
    config: AccountDbConfig,
    scheduler: Arc<dyn Scheduler>,
    /// Held while closed; moved into the cache by `init`.
    store: Option<Box<dyn FlatStore>>,
    cache: Arc<Mutex<Option<AccountCache>>>,
    timer: Option<TimerId>,
}

impl AccountTxtDb {
    /// Creates a backend over the file named in `config`.
    pub fn new(config: AccountDbConfig, scheduler: Arc<dyn Scheduler>) -> Self {
        let store = FileStore::new(config.path.clone());
        Self::with_store(config, store, scheduler)
    }

    /// Creates a backend over an arbitrary flat store.
    pub fn with_store(
        config: AccountDbConfig,
        store: impl FlatStore + 'static,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            config,
            scheduler,
            store: Some(Box::new(store)),
            cache: Arc::new(Mutex::new(None)),
            timer: None,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &AccountDbConfig {
        &self.config
    }

    /// Whether `init` has succeeded and `destroy` has not been called.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.cache.lock().is_some()
    }

    /// Number of accounts in memory.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.lock().as_ref().map_or(0, |cache| cache.accounts.len())
    }

    /// Whether no account is in memory.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The id the next unassigned create will receive.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::Closed`] if the backend is not open.
    pub fn next_id(&self) -> CoreResult<u32> {
        self.with_cache(|cache| Ok(cache.next_id))
    }

    /// Saves absorbed since the last flush.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::Closed`] if the backend is not open.
    pub fn pending_saves(&self) -> CoreResult<u32> {
        self.with_cache(|cache| Ok(cache.threshold - cache.saves_left))
    }

    fn with_cache<T>(&self, f: impl FnOnce(&mut AccountCache) -> CoreResult<T>) -> CoreResult<T> {
        let mut guard = self.cache.lock();
        let cache = guard.as_mut().ok_or(CoreError::Closed)?;
        f(cache)
    }

    fn not_found(id: u32) -> CoreError {
        CoreError::NotFound {
            kind: Account::KIND,
            id,
        }
    }
}

impl PersistenceBackend for AccountTxtDb {
    type Entity = Account;
    type Update = ();
    type Report = LoadReport;

    fn init(&mut self) -> CoreResult<LoadReport> {
        if self.is_open() {
            return Err(CoreError::AlreadyOpen);
        }
        let store = self.store.take().ok_or(CoreError::Closed)?;
        let loaded = match load_store(store.as_ref(), self.config.first_account_id) {
            Ok(loaded) => loaded,
            Err(e) => {
                self.store = Some(store);
                return Err(e);
            }
        };

        let threshold = self.config.flush_threshold.max(1);
        *self.cache.lock() = Some(AccountCache {
            accounts: loaded.accounts,
            next_id: loaded.next_id,
            saves_left: threshold,
            threshold,
            store,
        });

        let cache = Arc::clone(&self.cache);
        let timer = self.scheduler.schedule_interval(
            self.config.flush_interval,
            Box::new(move || {
                if let Some(cache) = cache.lock().as_mut() {
                    if cache.is_dirty() {
                        cache.flush_or_log("periodic");
                    }
                }
            }),
        );
        self.timer = Some(timer);

        tracing::debug!(records = loaded.report.records, %timer, "account backend open");
        Ok(loaded.report)
    }

    fn destroy(&mut self) -> CoreResult<()> {
        if let Some(timer) = self.timer.take() {
            self.scheduler.cancel(timer);
        }
        let Some(mut cache) = self.cache.lock().take() else {
            return Err(CoreError::Closed);
        };
        let result = cache.flush_logged("shutdown");
        self.store = Some(cache.store);
        result
    }

    fn sync(&mut self) -> CoreResult<()> {
        self.with_cache(|cache| cache.flush_logged("sync"))
    }

    /// Stores a bounded copy and flushes. On success `account` is replaced
    /// by the stored copy: its id assigned, its text fields truncated and its
    /// unset registry entries dropped.
    fn create(&mut self, account: &mut Account) -> CoreResult<()> {
        self.with_cache(|cache| {
            let id = match account.id {
                0 => cache.next_id,
                id => id,
            };
            if cache.accounts.contains_key(&id) {
                return Err(CoreError::Conflict {
                    kind: Account::KIND,
                    id,
                });
            }

            let mut record = account.clone();
            record.id = id;
            record.clamp();
            let previous_next = cache.next_id;
            cache.accounts.insert(id, record);
            if id >= cache.next_id {
                cache.next_id = id.saturating_add(1);
            }

            if let Err(e) = cache.flush_logged("create") {
                cache.accounts.remove(&id);
                cache.next_id = previous_next;
                return Err(e);
            }
            if let Some(stored) = cache.accounts.get(&id) {
                account.clone_from(stored);
            }
            Ok(())
        })
    }

    fn remove(&mut self, id: u32) -> CoreResult<()> {
        self.with_cache(|cache| {
            let removed = cache.accounts.remove(&id).ok_or_else(|| Self::not_found(id))?;
            if let Err(e) = cache.flush_logged("remove") {
                cache.accounts.insert(id, removed);
                return Err(e);
            }
            Ok(())
        })
    }

    /// Replaces the stored copy. The file is rewritten on every
    /// `flush_threshold`-th save; a failed flush keeps the change in memory
    /// and is retried by the next save or the periodic task.
    fn save(&mut self, account: &Account, _update: &()) -> CoreResult<()> {
        self.with_cache(|cache| {
            let slot = cache
                .accounts
                .get_mut(&account.id)
                .ok_or_else(|| Self::not_found(account.id))?;
            *slot = account.clone();
            slot.clamp();

            cache.saves_left = cache.saves_left.saturating_sub(1);
            if cache.saves_left == 0 {
                cache.flush_or_log("save threshold");
            }
            Ok(())
        })
    }

    fn load(&self, id: u32) -> CoreResult<Option<Account>> {
        self.with_cache(|cache| Ok(cache.accounts.get(&id).cloned()))
    }

    /// Case-sensitive scan over login names.
    fn id_by_name(&self, name: &str) -> CoreResult<Option<u32>> {
        self.with_cache(|cache| {
            let matches: Vec<u32> = cache
                .accounts
                .values()
                .filter(|account| account.userid == name)
                .map(|account| account.id)
                .collect();
            match matches.as_slice() {
                [] => Ok(None),
                [id] => Ok(Some(*id)),
                _ => {
                    tracing::error!(name, matches = matches.len(), "duplicate account login name");
                    Err(CoreError::ambiguous(name, matches.len()))
                }
            }
        })
    }

    /// Iterates over the ids present when the iterator was created. Records
    /// removed in the meantime are skipped.
    fn iter(&self) -> CoreResult<EntityIter<'_, Account>> {
        let ids: Vec<u32> = self.with_cache(|cache| Ok(cache.accounts.keys().copied().collect()))?;
        let cache = Arc::clone(&self.cache);
        Ok(EntityIter::new(ids.into_iter().filter_map(move |id| {
            match cache.lock().as_ref() {
                Some(open) => open.accounts.get(&id).cloned().map(Ok),
                None => Some(Err(CoreError::Closed)),
            }
        })))
    }
}

impl Drop for AccountTxtDb {
    fn drop(&mut self) {
        let dirty = self
            .cache
            .lock()
            .as_ref()
            .is_some_and(AccountCache::is_dirty);
        if dirty {
            let _ = self.destroy();
        } else if let Some(timer) = self.timer.take() {
            self.scheduler.cancel(timer);
        }
    }
}
