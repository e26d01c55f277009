//! Property-based test generators using proptest.
//!
//! Generated text fields always satisfy the field bounds. Registries may
//! hold entries with an empty value, which a store drops; compare against
//! [`Account::clamp`]ed copies.

use mmodb_codec::{
    Account, RegistryEntry, EMAIL_MAX, LASTLOGIN_MAX, LAST_IP_MAX, PASSWORD_MAX, REGISTRY_MAX,
};
use mmodb_core::{Party, PartyMember, PARTY_NAME_MAX};
use proptest::prelude::*;

fn text(max: usize) -> impl Strategy<Value = String> {
    prop::string::string_regex(&format!("[a-zA-Z0-9@._:-]{{0,{max}}}")).expect("Invalid regex")
}

/// Strategy for login names: 4 to 23 word characters.
pub fn login_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_]{3,22}").expect("Invalid regex")
}

/// Strategy for registries with unique, non-empty keys and possibly empty
/// values.
pub fn registry_strategy() -> impl Strategy<Value = Vec<RegistryEntry>> {
    prop::collection::btree_map(
        prop::string::string_regex("[a-zA-Z#][a-zA-Z0-9_]{0,30}").expect("Invalid regex"),
        prop::string::string_regex("[a-zA-Z0-9_.-]{0,64}").expect("Invalid regex"),
        0..=REGISTRY_MAX,
    )
    .prop_map(|map| {
        map.into_iter()
            .map(|(key, value)| RegistryEntry { key, value })
            .collect()
    })
}

prop_compose! {
    /// Strategy for accounts with the "unassigned" id.
    pub fn unassigned_account_strategy()(
        userid in login_name_strategy(),
        pass in text(PASSWORD_MAX),
        sex in prop::sample::select(vec!['M', 'F']),
        email in text(EMAIL_MAX),
        level in 0u32..100,
        state in 0u32..=256,
        unban_time in 0i64..=i64::from(u32::MAX),
        expiration_time in 0i64..=i64::from(u32::MAX),
        logincount in any::<u32>(),
        lastlogin in text(LASTLOGIN_MAX),
        last_ip in text(LAST_IP_MAX),
        registry in registry_strategy(),
    ) -> Account {
        Account {
            id: 0, userid, pass, sex, email, level, state, unban_time,
            expiration_time, logincount, lastlogin, last_ip, registry,
        }
    }
}

/// Strategy for accounts with an assigned id.
pub fn account_strategy() -> impl Strategy<Value = Account> {
    (1u32.., unassigned_account_strategy()).prop_map(|(id, mut account)| {
        account.id = id;
        account
    })
}

/// Strategy for party names.
pub fn party_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex(&format!("[a-zA-Z][a-zA-Z0-9 ]{{0,{}}}", PARTY_NAME_MAX - 1))
        .expect("Invalid regex")
}

prop_compose! {
    /// Strategy for new parties founded by one of the first `max_char`
    /// characters, as created by [`crate::TestParties::add_characters`].
    pub fn new_party_strategy(max_char: u32)(
        name in party_name_strategy(),
        exp_share in 0u8..=1,
        item_share in 0u8..=3,
        founder in 1..=max_char,
    ) -> Party {
        let mut party = Party::new(&name, PartyMember::new(founder * 100, founder));
        party.exp_share = exp_share;
        party.item_share = item_share;
        party
    }
}
