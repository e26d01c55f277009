//! Persistence contract checks for the cached-file account backend.

use mmodb_codec::Account;
use mmodb_core::{AccountBackend, PersistenceBackend};
use mmodb_testkit::prelude::*;
use proptest::prelude::*;

#[test]
fn create_load_remove() {
    let mut accounts = TestAccounts::memory();
    let created = contract::create_then_load(&mut accounts.db, Account::new("alice", "pw", 'F'));
    contract::remove_then_load(&mut accounts.db, created.id);
}

#[test]
fn explicit_id_conflict() {
    let mut accounts = TestAccounts::memory();
    let existing = contract::create_then_load(&mut accounts.db, Account::new("owner", "pw", 'M'));
    contract::explicit_id_conflicts(&mut accounts.db, &existing, Account::new("intruder", "pw", 'M'));
}

#[test]
fn name_lookups() {
    let mut accounts = TestAccounts::memory();
    let unique = contract::create_then_load(&mut accounts.db, Account::new("unique", "pw", 'M'));
    contract::lookup_by_name(&accounts.db, &unique);
    contract::shared_name_is_ambiguous(
        &mut accounts.db,
        Account::new("twin", "pw1", 'M'),
        Account::new("twin", "pw2", 'F'),
    );
}

#[test]
fn iteration_and_destroy() {
    let mut accounts = TestAccounts::memory();
    let ids: Vec<u32> = ["a", "b", "c", "d"]
        .into_iter()
        .map(|name| contract::create_then_load(&mut accounts.db, Account::new(name, "pw", 'M')).id)
        .collect();
    contract::iteration_is_complete(&accounts.db, &ids);
    contract::closed_after_destroy(&mut accounts.db);
}

#[test]
fn contract_holds_through_trait_object() {
    let mut accounts = TestAccounts::memory();
    let db: &mut AccountBackend = &mut accounts.db;
    let created = contract::create_then_load(db, Account::new("boxed", "pw", 'M'));
    contract::lookup_by_name(&*db, &created);
    contract::remove_then_load(db, created.id);
}

#[test]
fn saves_survive_restart_after_threshold() {
    let mut accounts = TestAccounts::memory();
    let mut account = contract::create_then_load(&mut accounts.db, Account::new("grinder", "pw", 'M'));

    for round in 1..=10 {
        account.logincount = round;
        account.set_registry("round", &round.to_string());
        accounts.db.save(&account, &()).unwrap();
    }

    let restarted = accounts.reopen();
    assert_eq!(restarted.load(account.id).unwrap(), Some(account));
}

#[test]
fn empty_registry_value_keeps_later_entries_after_restart() {
    let mut accounts = TestAccounts::memory();
    let mut account = Account::new("keeper", "pw", 'F');
    account.registry = vec![
        mmodb_codec::RegistryEntry::new("blank", ""),
        mmodb_codec::RegistryEntry::new("zeny", "500"),
    ];
    let created = contract::create_then_load(&mut accounts.db, account);

    let restarted = accounts.reopen();
    let loaded = restarted.load(created.id).unwrap().unwrap();
    assert_eq!(loaded.registry_value("zeny"), Some("500"));
    assert_eq!(loaded.registry_value("blank"), None);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn generated_accounts_survive_restart(batch in prop::collection::vec(unassigned_account_strategy(), 1..8)) {
        let mut accounts = TestAccounts::memory();
        let mut created = Vec::new();
        for account in batch {
            created.push(contract::create_then_load(&mut accounts.db, account));
        }

        let restarted = accounts.reopen();
        for account in &created {
            let loaded = restarted.load(account.id).unwrap();
            prop_assert_eq!(loaded.as_ref(), Some(account));
        }
    }

    #[test]
    fn save_then_load_round_trips(original in unassigned_account_strategy(), edited in unassigned_account_strategy()) {
        let mut accounts = TestAccounts::memory();
        let created = contract::create_then_load(&mut accounts.db, original);

        let mut edited = edited;
        edited.id = created.id;
        accounts.db.save(&edited, &()).unwrap();
        accounts.db.sync().unwrap();

        let mut stored = edited;
        stored.clamp();
        prop_assert_eq!(accounts.db.load(created.id).unwrap(), Some(stored.clone()));
        prop_assert_eq!(accounts.reopen().load(created.id).unwrap(), Some(stored));
    }
}
