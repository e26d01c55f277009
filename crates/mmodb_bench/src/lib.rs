//! Shared data generators for the mmodb benchmarks.

use mmodb_codec::{Account, CURRENT_VERSION};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// A random alphanumeric string of `len` characters.
pub fn random_text(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// An unassigned account with `registry` random variables.
pub fn random_account(registry: usize) -> Account {
    let mut rng = rand::thread_rng();
    let mut account = Account::new(&random_text(12), &random_text(16), if rng.gen() { 'M' } else { 'F' });
    account.email = format!("{}@example.com", random_text(8));
    account.level = rng.gen_range(0..100);
    account.logincount = rng.gen_range(0..10_000);
    account.lastlogin = "2024-01-01 12:00:00".to_string();
    account.last_ip = "10.0.0.1".to_string();
    for i in 0..registry {
        account.set_registry(&format!("var{i}"), &rng.gen::<u32>().to_string());
    }
    account
}

/// The text of an account file holding `count` accounts from id 1.
pub fn account_file(count: u32, registry: usize) -> String {
    let mut text = format!("{CURRENT_VERSION}\n");
    for id in 1..=count {
        let mut account = random_account(registry);
        account.id = id;
        text.push_str(&mmodb_codec::encode_account(&account));
    }
    text.push_str(&format!("{}\t%newid%\n", count + 1));
    text
}
