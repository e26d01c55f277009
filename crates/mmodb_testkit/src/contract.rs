//! Backend-agnostic checks of the persistence contract.
//!
//! Each check drives a backend only through [`PersistenceBackend`] and
//! panics on the first violation, so the same assertions run against every
//! implementation.

use mmodb_core::{CoreError, Entity, PersistenceBackend};
use std::collections::BTreeSet;
use std::fmt::Debug;

/// A name no generator produces.
pub const UNKNOWN_NAME: &str = "\u{1}no such name";

/// Creates `entity` with an unassigned id and checks that it loads back
/// unchanged. Returns the entity with its assigned id.
pub fn create_then_load<B>(db: &mut B, mut entity: B::Entity) -> B::Entity
where
    B: PersistenceBackend + ?Sized,
    B::Entity: PartialEq + Debug,
{
    entity.set_id(0);
    db.create(&mut entity).expect("create failed");
    assert!(entity.id() > 0, "create must assign a positive id");

    let loaded = db.load(entity.id()).expect("load failed");
    assert_eq!(loaded.as_ref(), Some(&entity), "loaded record differs from created");
    entity
}

/// Removes a record and checks it is gone for good.
pub fn remove_then_load<B>(db: &mut B, id: u32)
where
    B: PersistenceBackend + ?Sized,
{
    db.remove(id).expect("remove failed");
    assert!(db.load(id).expect("load failed").is_none(), "removed record still loads");
    assert!(
        matches!(db.remove(id), Err(CoreError::NotFound { .. })),
        "second remove must report not found"
    );
}

/// Checks that creating `newcomer` under the id of `existing` fails and
/// leaves `existing` untouched.
pub fn explicit_id_conflicts<B>(db: &mut B, existing: &B::Entity, mut newcomer: B::Entity)
where
    B: PersistenceBackend + ?Sized,
    B::Entity: PartialEq + Debug,
{
    let before = db.load(existing.id()).expect("load failed");
    newcomer.set_id(existing.id());
    assert!(
        matches!(db.create(&mut newcomer), Err(CoreError::Conflict { .. })),
        "create over a taken id must conflict"
    );
    assert_eq!(db.load(existing.id()).expect("load failed"), before);
}

/// Checks unique and missing name lookups for a stored entity whose name
/// no other record shares.
pub fn lookup_by_name<B>(db: &B, entity: &B::Entity)
where
    B: PersistenceBackend + ?Sized,
    B::Entity: PartialEq + Debug,
{
    assert_eq!(db.id_by_name(entity.name()).expect("lookup failed"), Some(entity.id()));
    assert_eq!(db.id_by_name(UNKNOWN_NAME).expect("lookup failed"), None);
    assert_eq!(
        db.load_by_name(entity.name()).expect("load by name failed").as_ref(),
        Some(entity)
    );
}

/// Creates both entities under the same name and checks that the name no
/// longer resolves to either.
pub fn shared_name_is_ambiguous<B>(db: &mut B, mut first: B::Entity, mut second: B::Entity)
where
    B: PersistenceBackend + ?Sized,
{
    first.set_id(0);
    second.set_id(0);
    db.create(&mut first).expect("create failed");
    db.create(&mut second).expect("create failed");
    assert_eq!(first.name(), second.name(), "entities must share a name");

    match db.id_by_name(first.name()) {
        Err(CoreError::Ambiguous { matches, .. }) => assert_eq!(matches, 2),
        other => panic!("expected an ambiguous lookup, got {other:?}"),
    }
}

/// Checks that a pass yields exactly `expected` and that a fresh iterator
/// yields the same set again.
pub fn iteration_is_complete<B>(db: &B, expected: &[u32])
where
    B: PersistenceBackend + ?Sized,
{
    let expected: BTreeSet<u32> = expected.iter().copied().collect();
    for _ in 0..2 {
        let mut seen = BTreeSet::new();
        for entity in db.iter().expect("iter failed") {
            let id = entity.expect("iteration failed").id();
            assert!(seen.insert(id), "id {id} yielded twice");
        }
        assert_eq!(seen, expected);
    }
}

/// Checks that `destroy` closes the backend.
pub fn closed_after_destroy<B>(db: &mut B)
where
    B: PersistenceBackend + ?Sized,
{
    db.destroy().expect("destroy failed");
    assert!(matches!(db.load(1), Err(CoreError::Closed)));
    assert!(matches!(db.id_by_name(UNKNOWN_NAME), Err(CoreError::Closed)));
    assert!(matches!(db.iter(), Err(CoreError::Closed)));
    assert!(matches!(db.sync(), Err(CoreError::Closed)));
}
