//! The persistence contract shared by every backend.

use crate::error::{CoreError, CoreResult};
use crate::iter::EntityIter;

/// A persisted record with a numeric identity and a human-readable name.
///
/// Id `0` is the "unassigned" sentinel: [`PersistenceBackend::create`]
/// replaces it with a fresh id.
pub trait Entity: Clone + Send + 'static {
    /// Entity kind, used in error messages and logs.
    const KIND: &'static str;

    /// Returns the id, `0` when unassigned.
    fn id(&self) -> u32;

    /// Replaces the id.
    fn set_id(&mut self, id: u32);

    /// Returns the name used by [`PersistenceBackend::id_by_name`].
    fn name(&self) -> &str;
}

/// Uniform storage contract for one entity kind.
///
/// Services hold a `Box<dyn PersistenceBackend<..>>` and never learn which
/// medium sits behind it. Every method runs synchronously on the caller's
/// thread.
///
/// # Outcomes
///
/// - `load` and `id_by_name` report an absent record as `Ok(None)`
/// - `remove` and `save` of an absent record fail with
///   [`CoreError::NotFound`]
/// - `id_by_name` fails with [`CoreError::Ambiguous`] when several records
///   share the name
/// - A failed mutation leaves the backend as it was before the call, unless
///   the backend documents otherwise
/// - Every method except `init` fails with [`CoreError::Closed`] before
///   `init` and after `destroy`
///
/// # Implementors
///
/// - [`crate::AccountTxtDb`] - Write-back cache over a flat file
/// - [`crate::PartySqlDb`] - Transactional SQLite tables
pub trait PersistenceBackend: Send {
    /// The entity kind stored.
    type Entity: Entity;

    /// Partial update accepted by [`save`](Self::save).
    type Update;

    /// Summary produced by [`init`](Self::init).
    type Report;

    /// Acquires resources and loads the initial state.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::MissingResource`] when the backing file or
    /// table is unavailable. The owning service cannot start in that case.
    fn init(&mut self) -> CoreResult<Self::Report>;

    /// Releases resources. Backends with deferred writes flush first.
    ///
    /// The backend is closed afterwards even when the final flush fails.
    ///
    /// # Errors
    ///
    /// Returns the final flush error, if any.
    fn destroy(&mut self) -> CoreResult<()>;

    /// Makes every deferred write durable now.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn sync(&mut self) -> CoreResult<()>;

    /// Persists a new record and writes its assigned id back into `entity`.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::Conflict`] when the requested id is taken.
    fn create(&mut self, entity: &mut Self::Entity) -> CoreResult<()>;

    /// Deletes a record and its associations.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::NotFound`] if no such record exists.
    fn remove(&mut self, id: u32) -> CoreResult<()>;

    /// Applies `update` from `entity` atomically.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::NotFound`] if the record does not exist.
    fn save(&mut self, entity: &Self::Entity, update: &Self::Update) -> CoreResult<()>;

    /// Fetches the current state of a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn load(&self, id: u32) -> CoreResult<Option<Self::Entity>>;

    /// Resolves a name to the id of the only record carrying it.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::Ambiguous`] when more than one record matches.
    fn id_by_name(&self, name: &str) -> CoreResult<Option<u32>>;

    /// Starts a one-shot pass over every record. Order is unspecified.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is closed.
    fn iter(&self) -> CoreResult<EntityIter<'_, Self::Entity>>;

    /// Resolves `name` and loads the matching record.
    ///
    /// # Errors
    ///
    /// Same as [`id_by_name`](Self::id_by_name) and [`load`](Self::load).
    fn load_by_name(&self, name: &str) -> CoreResult<Option<Self::Entity>> {
        match self.id_by_name(name)? {
            Some(id) => self.load(id),
            None => Ok(None),
        }
    }

    /// Loads a record that must exist.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::NotFound`] if it does not.
    fn fetch(&self, id: u32) -> CoreResult<Self::Entity> {
        self.load(id)?.ok_or(CoreError::NotFound {
            kind: <Self::Entity as Entity>::KIND,
            id,
        })
    }
}
