//! Dump command implementation.

use super::{open_accounts, open_parties, Target};
use mmodb_codec::Account;
use mmodb_core::{Party, PersistenceBackend};
use std::path::Path;

/// Runs the dump command.
pub fn run(target: &Target, limit: Option<usize>, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let json = format == "json";
    match target {
        Target::Accounts(path) => {
            let accounts = accounts(path, limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&accounts)?);
            } else {
                for account in &accounts {
                    print_account(account);
                }
                println!("{} account(s)", accounts.len());
            }
        }
        Target::Parties(path) => {
            let parties = parties(path, limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&parties)?);
            } else {
                for party in &parties {
                    print_party(party);
                }
                println!("{} part(ies)", parties.len());
            }
        }
    }
    Ok(())
}

/// Every account in the file, ordered by id.
pub fn accounts(path: &Path, limit: Option<usize>) -> Result<Vec<Account>, Box<dyn std::error::Error>> {
    let (db, _) = open_accounts(path)?;
    let mut accounts = db.iter()?.collect::<Result<Vec<_>, _>>()?;
    accounts.sort_unstable_by_key(|account| account.id);
    accounts.truncate(limit.unwrap_or(usize::MAX));
    Ok(accounts)
}

/// Parties in id order, stopping after `limit`.
pub fn parties(path: &Path, limit: Option<usize>) -> Result<Vec<Party>, Box<dyn std::error::Error>> {
    let db = open_parties(path)?;
    let parties = db
        .iter()?
        .take(limit.unwrap_or(usize::MAX))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parties)
}

fn print_account(account: &Account) {
    println!(
        "{:>8}  {:<23}  {}  level {:<3} logins {:<5} last {} from {}",
        account.id,
        account.userid,
        account.sex,
        account.level,
        account.logincount,
        account.lastlogin,
        account.last_ip,
    );
    for entry in &account.registry {
        println!("            {} = {}", entry.key, entry.value);
    }
}

fn print_party(party: &Party) {
    println!(
        "{:>8}  {:<23}  exp {} item {}",
        party.id, party.name, party.exp_share, party.item_share
    );
    for member in &party.members {
        let marker = if member.leader { "*" } else { " " };
        println!("           {marker} account {} char {}", member.account_id, member.char_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmodb_core::{PartyDbConfig, PartyMember, PartySqlDb};
    use mmodb_testkit::TempAccountFile;
    use rusqlite::Connection;
    use tempfile::TempDir;

    #[test]
    fn accounts_are_sorted_and_limited() {
        let file = TempAccountFile::with_contents(
            "20080409\n\
             30\tc\tpw\tM\t-\t0\t0\t0\t0\t0\t-\t-\t\n\
             10\ta\tpw\tM\t-\t0\t0\t0\t0\t0\t-\t-\tk,v \n\
             20\tb\tpw\tF\t-\t0\t0\t0\t0\t0\t-\t-\t\n",
        );

        let all = accounts(file.path(), None).unwrap();
        assert_eq!(all.iter().map(|a| a.id).collect::<Vec<_>>(), vec![10, 20, 30]);
        assert_eq!(all[0].registry_value("k"), Some("v"));

        let first_two = accounts(file.path(), Some(2)).unwrap();
        assert_eq!(first_two.len(), 2);
        assert_eq!(first_two[1].userid, "b");
    }

    #[test]
    fn parties_come_back_in_id_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("parties.db");
        {
            let mut db = PartySqlDb::new(Connection::open(&path).unwrap(), PartyDbConfig::default());
            db.ensure_schema().unwrap();
            db.init().unwrap();
            let conn = db.connection();
            for char_id in 1..=3u32 {
                conn.lock()
                    .execute(
                        "INSERT INTO \"char\" (char_id, account_id, name) VALUES (?1, ?2, ?3)",
                        rusqlite::params![char_id, char_id * 100, format!("c{char_id}")],
                    )
                    .unwrap();
            }
            for char_id in 1..=3u32 {
                let mut party = Party::new(&format!("p{char_id}"), PartyMember::new(char_id * 100, char_id));
                db.create(&mut party).unwrap();
            }
        }

        let all = parties(&path, None).unwrap();
        assert_eq!(all.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(all.iter().all(|p| p.leader().is_some()));
        assert_eq!(parties(&path, Some(1)).unwrap().len(), 1);
    }
}
