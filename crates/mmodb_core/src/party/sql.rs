//! Relational party backend over SQLite.

use super::{Party, PartyChange, PartyMember, PartyUpdate, PARTY_NAME_MAX};
use crate::backend::{Entity, PersistenceBackend};
use crate::config::PartyDbConfig;
use crate::error::{CoreError, CoreResult};
use crate::iter::EntityIter;
use crate::keyset::{quote_ident, KeysetIter};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::sync::Arc;

/// SQL text for every statement, rendered once from the configured table
/// names.
#[derive(Debug)]
pub(crate) struct Statements {
    party_table: String,
    char_table: String,
    max_members: usize,
    select_party: String,
    select_members: String,
    party_exists: String,
    insert_party: String,
    update_basic: String,
    update_leader: String,
    link_member: String,
    unlink_member: String,
    unlink_all: String,
    delete_party: String,
    id_by_name: String,
    count: String,
}

impl Statements {
    fn new(config: &PartyDbConfig) -> Self {
        let party = quote_ident(&config.party_table);
        let chars = quote_ident(&config.char_table);
        let collate = if config.case_sensitive { "" } else { " COLLATE NOCASE" };
        Self {
            party_table: config.party_table.clone(),
            char_table: config.char_table.clone(),
            max_members: config.max_members,
            select_party: format!(
                "SELECT party_id, name, exp, item, leader_id, leader_char FROM {party} WHERE party_id = ?1"
            ),
            select_members: format!(
                "SELECT account_id, char_id FROM {chars} WHERE party_id = ?1 ORDER BY char_id LIMIT ?2"
            ),
            party_exists: format!("SELECT 1 FROM {party} WHERE party_id = ?1"),
            insert_party: format!(
                "INSERT INTO {party} (party_id, name, exp, item, leader_id, leader_char) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
            ),
            update_basic: format!(
                "UPDATE {party} SET name = ?1, exp = ?2, item = ?3 WHERE party_id = ?4"
            ),
            update_leader: format!(
                "UPDATE {party} SET leader_id = ?1, leader_char = ?2 WHERE party_id = ?3"
            ),
            link_member: format!(
                "UPDATE {chars} SET party_id = ?1 WHERE account_id = ?2 AND char_id = ?3"
            ),
            unlink_member: format!(
                "UPDATE {chars} SET party_id = 0 WHERE party_id = ?1 AND account_id = ?2 AND char_id = ?3"
            ),
            unlink_all: format!("UPDATE {chars} SET party_id = 0 WHERE party_id = ?1"),
            delete_party: format!("DELETE FROM {party} WHERE party_id = ?1"),
            id_by_name: format!("SELECT party_id FROM {party} WHERE name = ?1{collate} ORDER BY party_id"),
            count: format!("SELECT COUNT(*) FROM {party}"),
        }
    }

    /// Reads one party and its members.
    ///
    /// The leader flag is derived from the leader pair on the party row.
    pub(crate) fn load(&self, conn: &Connection, party_id: u32) -> CoreResult<Option<Party>> {
        let head = conn
            .query_row(&self.select_party, [party_id], |row| {
                Ok((
                    Party {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        exp_share: row.get(2)?,
                        item_share: row.get(3)?,
                        members: Vec::new(),
                    },
                    row.get::<_, u32>(4)?,
                    row.get::<_, u32>(5)?,
                ))
            })
            .optional()?;
        let Some((mut party, leader_id, leader_char)) = head else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(&self.select_members)?;
        let limit = i64::try_from(self.max_members).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![party_id, limit], |row| {
            Ok(PartyMember::new(row.get(0)?, row.get(1)?))
        })?;
        for member in rows {
            let mut member = member?;
            member.leader = member.is(leader_id, leader_char);
            party.members.push(member);
        }
        Ok(Some(party))
    }

    fn exists(&self, conn: &Connection, party_id: u32) -> CoreResult<bool> {
        Ok(conn
            .query_row(&self.party_exists, [party_id], |_| Ok(()))
            .optional()?
            .is_some())
    }

    fn apply(&self, tx: &Transaction<'_>, party: &Party, change: PartyChange) -> CoreResult<()> {
        match change {
            PartyChange::Basic => {
                let name = mmodb_codec::bounded(&party.name, PARTY_NAME_MAX);
                tx.execute(
                    &self.update_basic,
                    params![name, party.exp_share, party.item_share, party.id],
                )?;
            }
            PartyChange::Leader(index) => {
                let leader = member_at(party, index)?;
                tx.execute(
                    &self.update_leader,
                    params![leader.account_id, leader.char_id, party.id],
                )?;
            }
            PartyChange::AddMember(index) => {
                let member = member_at(party, index)?;
                tx.execute(
                    &self.link_member,
                    params![party.id, member.account_id, member.char_id],
                )?;
            }
            PartyChange::RemoveMember(index) => {
                let member = member_at(party, index)?;
                tx.execute(
                    &self.unlink_member,
                    params![party.id, member.account_id, member.char_id],
                )?;
            }
        }
        Ok(())
    }
}

fn member_at(party: &Party, index: usize) -> CoreResult<&PartyMember> {
    party.members.get(index).ok_or_else(|| {
        CoreError::invalid_update(format!(
            "party {} has no member at index {index}",
            party.id
        ))
    })
}

/// Transactional party backend.
///
/// Parties live in the configured party table; membership is the
/// `party_id` column of the shared character table, `0` meaning "no party".
/// Every mutation runs in one SQLite transaction and is rolled back whole
/// when any statement fails.
///
/// # Example
///
/// ```rust
/// use mmodb_core::{Party, PartyDbConfig, PartyMember, PartySqlDb, PersistenceBackend};
/// use rusqlite::Connection;
///
/// let conn = Connection::open_in_memory().unwrap();
/// let mut db = PartySqlDb::new(conn, PartyDbConfig::default());
/// db.ensure_schema().unwrap();
/// db.init().unwrap();
///
/// let mut party = Party::new("Adventurers", PartyMember::new(2000000, 150000));
/// db.create(&mut party).unwrap();
/// assert!(party.id > 0);
/// assert_eq!(db.id_by_name("adventurers").unwrap(), Some(party.id));
/// ```
pub struct PartySqlDb {
    conn: Arc<Mutex<Connection>>,
    sql: Arc<Statements>,
    open: bool,
}

impl PartySqlDb {
    /// Creates a backend owning `conn`.
    pub fn new(conn: Connection, config: PartyDbConfig) -> Self {
        Self::shared(Arc::new(Mutex::new(conn)), config)
    }

    /// Creates a backend over a connection shared with other stores.
    pub fn shared(conn: Arc<Mutex<Connection>>, config: PartyDbConfig) -> Self {
        Self {
            conn,
            sql: Arc::new(Statements::new(&config)),
            open: false,
        }
    }

    /// Returns the shared connection handle.
    #[must_use]
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    /// Creates the party table and a minimal character table when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the DDL fails.
    pub fn ensure_schema(&self) -> CoreResult<()> {
        let party = quote_ident(&self.sql.party_table);
        let chars = quote_ident(&self.sql.char_table);
        let index = quote_ident(&format!("{}_party_id", self.sql.char_table));
        self.conn.lock().execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {party} (
                party_id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL DEFAULT '',
                exp INTEGER NOT NULL DEFAULT 0,
                item INTEGER NOT NULL DEFAULT 0,
                leader_id INTEGER NOT NULL DEFAULT 0,
                leader_char INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS {chars} (
                char_id INTEGER PRIMARY KEY,
                account_id INTEGER NOT NULL DEFAULT 0,
                name TEXT NOT NULL DEFAULT '',
                party_id INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS {index} ON {chars} (party_id);"
        ))?;
        Ok(())
    }

    /// Number of parties stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is closed or the query fails.
    pub fn count(&self) -> CoreResult<usize> {
        self.ensure_open()?;
        let count: i64 = self.conn.lock().query_row(&self.sql.count, [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(CoreError::Closed)
        }
    }

    fn not_found(id: u32) -> CoreError {
        CoreError::NotFound {
            kind: Party::KIND,
            id,
        }
    }

    /// Runs `f` in a transaction, committing on success and rolling back on
    /// any error.
    fn transaction<T>(
        &self,
        op: &'static str,
        party_id: u32,
        f: impl FnOnce(&Transaction<'_>) -> CoreResult<T>,
    ) -> CoreResult<T> {
        self.ensure_open()?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        match f(&tx) {
            Ok(value) => {
                tx.commit().inspect_err(|e| {
                    tracing::warn!(op, party_id, error = %e, "party commit failed");
                })?;
                Ok(value)
            }
            Err(e) => {
                if !e.is_not_found() {
                    tracing::warn!(op, party_id, error = %e, "party transaction rolled back");
                }
                Err(e)
            }
        }
    }

    fn table_exists(conn: &Connection, table: &str) -> CoreResult<bool> {
        Ok(conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |_| Ok(()),
            )
            .optional()?
            .is_some())
    }
}

impl PersistenceBackend for PartySqlDb {
    type Entity = Party;
    type Update = PartyUpdate;
    type Report = ();

    fn init(&mut self) -> CoreResult<()> {
        if self.open {
            return Err(CoreError::AlreadyOpen);
        }
        {
            let conn = self.conn.lock();
            for table in [&self.sql.party_table, &self.sql.char_table] {
                if !Self::table_exists(&conn, table)? {
                    tracing::error!(table = %table, "party storage table missing");
                    return Err(CoreError::missing_resource(format!("table {table}")));
                }
            }
        }
        self.open = true;
        tracing::debug!(party_table = %self.sql.party_table, char_table = %self.sql.char_table, "party backend open");
        Ok(())
    }

    fn destroy(&mut self) -> CoreResult<()> {
        self.ensure_open()?;
        self.open = false;
        Ok(())
    }

    fn sync(&mut self) -> CoreResult<()> {
        self.ensure_open()
    }

    /// Inserts the party row and links the founding member, who becomes
    /// leader, in one transaction. A new party holds exactly its founder;
    /// further members join through [`PartyChange::AddMember`].
    fn create(&mut self, party: &mut Party) -> CoreResult<()> {
        let founder = match party.members.as_slice() {
            [founder] => *founder,
            [] => return Err(CoreError::invalid_update("a party needs a founding member")),
            more => {
                return Err(CoreError::invalid_update(format!(
                    "a new party holds only its founder, got {} members",
                    more.len()
                )))
            }
        };
        let requested = party.id;
        let name = mmodb_codec::bounded(&party.name, PARTY_NAME_MAX);
        let sql = Arc::clone(&self.sql);

        let assigned = self.transaction("create", requested, |tx| {
            if requested != 0 && sql.exists(tx, requested)? {
                return Err(CoreError::Conflict {
                    kind: Party::KIND,
                    id: requested,
                });
            }
            tx.execute(
                &sql.insert_party,
                params![
                    (requested != 0).then_some(requested),
                    name,
                    party.exp_share,
                    party.item_share,
                    founder.account_id,
                    founder.char_id,
                ],
            )?;
            let inserted = u32::try_from(tx.last_insert_rowid()).map_err(|_| {
                CoreError::invalid_update("generated party id out of range")
            })?;
            if requested != 0 && inserted != requested {
                return Err(CoreError::invalid_update(format!(
                    "requested party id {requested}, store assigned {inserted}"
                )));
            }
            tx.execute(
                &sql.link_member,
                params![inserted, founder.account_id, founder.char_id],
            )?;
            Ok(inserted)
        })?;

        party.id = assigned;
        party.name = name;
        party.set_leader(0);
        tracing::debug!(party_id = assigned, "party created");
        Ok(())
    }

    fn remove(&mut self, id: u32) -> CoreResult<()> {
        let sql = Arc::clone(&self.sql);
        self.transaction("remove", id, |tx| {
            tx.execute(&sql.unlink_all, [id])?;
            if tx.execute(&sql.delete_party, [id])? == 0 {
                return Err(Self::not_found(id));
            }
            Ok(())
        })
    }

    fn save(&mut self, party: &Party, update: &PartyUpdate) -> CoreResult<()> {
        let sql = Arc::clone(&self.sql);
        self.transaction("save", party.id, |tx| {
            if !sql.exists(tx, party.id)? {
                return Err(Self::not_found(party.id));
            }
            for &change in update.changes() {
                sql.apply(tx, party, change)?;
            }
            Ok(())
        })
    }

    fn load(&self, id: u32) -> CoreResult<Option<Party>> {
        self.ensure_open()?;
        self.sql.load(&self.conn.lock(), id)
    }

    fn id_by_name(&self, name: &str) -> CoreResult<Option<u32>> {
        self.ensure_open()?;
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&self.sql.id_by_name)?;
        let ids = stmt
            .query_map([name], |row| row.get::<_, u32>(0))?
            .collect::<Result<Vec<u32>, _>>()?;
        match ids.as_slice() {
            [] => Ok(None),
            [id] => Ok(Some(*id)),
            _ => {
                tracing::error!(name, ?ids, "several parties share one name");
                Err(CoreError::ambiguous(name, ids.len()))
            }
        }
    }

    /// Walks party ids with a [`KeysetIter`] and loads each one. Parties
    /// removed between advances are skipped.
    fn iter(&self) -> CoreResult<EntityIter<'_, Party>> {
        self.ensure_open()?;
        let conn = Arc::clone(&self.conn);
        let sql = Arc::clone(&self.sql);
        let ids = KeysetIter::<u32>::new(Arc::clone(&self.conn), &self.sql.party_table, "party_id");
        Ok(EntityIter::new(ids.filter_map(move |id| {
            id.and_then(|id| sql.load(&conn.lock(), id)).transpose()
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_db(config: PartyDbConfig) -> PartySqlDb {
        let conn = Connection::open_in_memory().unwrap();
        let mut db = PartySqlDb::new(conn, config);
        db.ensure_schema().unwrap();
        db.conn
            .lock()
            .execute_batch(
                "INSERT INTO \"char\" (char_id, account_id, name) VALUES
                    (1, 100, 'Alpha'), (2, 200, 'Beta'), (3, 300, 'Gamma'), (666, 600, 'Cursed');",
            )
            .unwrap();
        db.init().unwrap();
        db
    }

    fn char_party(db: &PartySqlDb, char_id: u32) -> u32 {
        db.conn
            .lock()
            .query_row("SELECT party_id FROM \"char\" WHERE char_id = ?1", [char_id], |row| row.get(0))
            .unwrap()
    }

    fn fail_updates_of(db: &PartySqlDb, char_id: u32) {
        db.conn
            .lock()
            .execute_batch(&format!(
                "CREATE TRIGGER fail_char BEFORE UPDATE ON \"char\" WHEN NEW.char_id = {char_id}
                 BEGIN SELECT RAISE(ABORT, 'injected failure'); END;"
            ))
            .unwrap();
    }

    #[test]
    fn create_assigns_id_and_links_founder() {
        let mut db = open_db(PartyDbConfig::default());
        let mut party = Party::new("Heroes", PartyMember::new(100, 1));
        db.create(&mut party).unwrap();

        assert!(party.id > 0);
        assert_eq!(char_party(&db, 1), party.id);
        assert_eq!(db.load(party.id).unwrap(), Some(party));
    }

    #[test]
    fn create_with_taken_id_conflicts_without_mutation() {
        let mut db = open_db(PartyDbConfig::default());
        let mut first = Party::new("First", PartyMember::new(100, 1));
        db.create(&mut first).unwrap();

        let mut clash = Party::new("Clash", PartyMember::new(200, 2));
        clash.id = first.id;
        assert!(matches!(db.create(&mut clash), Err(CoreError::Conflict { .. })));
        assert_eq!(db.load(first.id).unwrap(), Some(first));
        assert_eq!(char_party(&db, 2), 0);
    }

    #[test]
    fn create_with_free_explicit_id_is_honoured() {
        let mut db = open_db(PartyDbConfig::default());
        let mut party = Party::new("Chosen", PartyMember::new(100, 1));
        party.id = 77;
        db.create(&mut party).unwrap();
        assert_eq!(party.id, 77);
    }

    #[test]
    fn create_without_members_is_rejected() {
        let mut db = open_db(PartyDbConfig::default());
        let mut party = Party::default();
        assert!(matches!(db.create(&mut party), Err(CoreError::InvalidUpdate { .. })));
        assert_eq!(db.count().unwrap(), 0);
    }

    #[test]
    fn create_with_several_members_is_rejected() {
        let mut db = open_db(PartyDbConfig::default());
        let mut party = Party::new("Crowd", PartyMember::new(100, 1));
        party.members.push(PartyMember::new(200, 2));

        assert!(matches!(db.create(&mut party), Err(CoreError::InvalidUpdate { .. })));
        assert_eq!(party.id, 0);
        assert_eq!(db.count().unwrap(), 0);
        assert_eq!(char_party(&db, 1), 0);
        assert_eq!(char_party(&db, 2), 0);
    }

    #[test]
    fn second_member_joins_through_save() {
        let mut db = open_db(PartyDbConfig::default());
        let mut party = Party::new("Pair", PartyMember::new(100, 1));
        db.create(&mut party).unwrap();

        party.members.push(PartyMember::new(200, 2));
        db.save(&party, &PartyChange::AddMember(1).into()).unwrap();

        assert_eq!(char_party(&db, 2), party.id);
        assert_eq!(db.load(party.id).unwrap().unwrap().members.len(), 2);
    }

    #[test]
    fn failed_create_leaves_no_party_row() {
        let mut db = open_db(PartyDbConfig::default());
        fail_updates_of(&db, 666);

        let mut party = Party::new("Doomed", PartyMember::new(600, 666));
        assert!(matches!(db.create(&mut party), Err(CoreError::Sql(_))));
        assert_eq!(party.id, 0);
        assert_eq!(db.count().unwrap(), 0);
    }

    #[test]
    fn save_applies_every_change() {
        let mut db = open_db(PartyDbConfig::default());
        let mut party = Party::new("Heroes", PartyMember::new(100, 1));
        db.create(&mut party).unwrap();

        party.name = "Legends".to_string();
        party.exp_share = 1;
        party.members.push(PartyMember::new(200, 2));
        party.set_leader(1);
        let update: PartyUpdate = [PartyChange::Basic, PartyChange::AddMember(1), PartyChange::Leader(1)]
            .into_iter()
            .collect();
        db.save(&party, &update).unwrap();

        let loaded = db.load(party.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Legends");
        assert_eq!(loaded.exp_share, 1);
        assert_eq!(loaded.members.len(), 2);
        assert_eq!(loaded.leader().map(|m| m.char_id), Some(2));
    }

    #[test]
    fn failed_save_rolls_back_every_change() {
        let mut db = open_db(PartyDbConfig::default());
        let mut party = Party::new("Heroes", PartyMember::new(100, 1));
        db.create(&mut party).unwrap();
        let before = db.load(party.id).unwrap();
        fail_updates_of(&db, 666);

        let mut changed = party.clone();
        changed.name = "Renamed".to_string();
        changed.members.push(PartyMember::new(600, 666));
        let update: PartyUpdate = [PartyChange::Basic, PartyChange::AddMember(1)].into_iter().collect();
        assert!(db.save(&changed, &update).is_err());

        assert_eq!(db.load(party.id).unwrap(), before);
    }

    #[test]
    fn save_with_bad_member_index_rolls_back() {
        let mut db = open_db(PartyDbConfig::default());
        let mut party = Party::new("Heroes", PartyMember::new(100, 1));
        db.create(&mut party).unwrap();

        let mut changed = party.clone();
        changed.name = "Renamed".to_string();
        let update: PartyUpdate = [PartyChange::Basic, PartyChange::Leader(4)].into_iter().collect();
        assert!(matches!(db.save(&changed, &update), Err(CoreError::InvalidUpdate { .. })));
        assert_eq!(db.load(party.id).unwrap().unwrap().name, "Heroes");
    }

    #[test]
    fn save_of_unknown_party_is_not_found() {
        let mut db = open_db(PartyDbConfig::default());
        let mut ghost = Party::new("Ghost", PartyMember::new(100, 1));
        ghost.id = 999;
        assert!(matches!(
            db.save(&ghost, &PartyChange::Basic.into()),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn remove_member_is_scoped_to_party() {
        let mut db = open_db(PartyDbConfig::default());
        let mut party = Party::new("Heroes", PartyMember::new(100, 1));
        db.create(&mut party).unwrap();
        party.members.push(PartyMember::new(200, 2));
        db.save(&party, &PartyChange::AddMember(1).into()).unwrap();

        let mut other = Party::new("Others", PartyMember::new(300, 3));
        db.create(&mut other).unwrap();
        // A stale removal from a party the character already left is a no-op.
        let mut stale = other.clone();
        stale.members.push(PartyMember::new(200, 2));
        db.save(&stale, &PartyChange::RemoveMember(1).into()).unwrap();
        assert_eq!(char_party(&db, 2), party.id);

        db.save(&party, &PartyChange::RemoveMember(1).into()).unwrap();
        assert_eq!(char_party(&db, 2), 0);
    }

    #[test]
    fn remove_unlinks_members_and_deletes_row() {
        let mut db = open_db(PartyDbConfig::default());
        let mut party = Party::new("Heroes", PartyMember::new(100, 1));
        db.create(&mut party).unwrap();
        party.members.push(PartyMember::new(200, 2));
        db.save(&party, &PartyChange::AddMember(1).into()).unwrap();

        db.remove(party.id).unwrap();
        assert_eq!(db.load(party.id).unwrap(), None);
        assert_eq!(char_party(&db, 1), 0);
        assert_eq!(char_party(&db, 2), 0);
        assert!(matches!(db.remove(party.id), Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn failed_remove_keeps_party_and_links() {
        let mut db = open_db(PartyDbConfig::default());
        let mut party = Party::new("Heroes", PartyMember::new(100, 1));
        db.create(&mut party).unwrap();
        fail_updates_of(&db, 1);

        assert!(db.remove(party.id).is_err());
        assert_eq!(db.load(party.id).unwrap(), Some(party.clone()));
        assert_eq!(char_party(&db, 1), party.id);
    }

    #[test]
    fn name_lookup_is_case_insensitive_by_default() {
        let mut db = open_db(PartyDbConfig::default());
        let mut party = Party::new("Heroes", PartyMember::new(100, 1));
        db.create(&mut party).unwrap();

        assert_eq!(db.id_by_name("HEROES").unwrap(), Some(party.id));
        assert_eq!(db.id_by_name("Villains").unwrap(), None);
    }

    #[test]
    fn name_lookup_honours_case_sensitivity() {
        let mut db = open_db(PartyDbConfig::new().case_sensitive(true));
        let mut party = Party::new("Heroes", PartyMember::new(100, 1));
        db.create(&mut party).unwrap();

        assert_eq!(db.id_by_name("Heroes").unwrap(), Some(party.id));
        assert_eq!(db.id_by_name("heroes").unwrap(), None);
    }

    #[test]
    fn shared_name_is_ambiguous() {
        let mut db = open_db(PartyDbConfig::default());
        db.create(&mut Party::new("Twins", PartyMember::new(100, 1))).unwrap();
        db.create(&mut Party::new("twins", PartyMember::new(200, 2))).unwrap();

        assert!(matches!(
            db.id_by_name("Twins"),
            Err(CoreError::Ambiguous { matches: 2, .. })
        ));
    }

    #[test]
    fn load_caps_members() {
        let mut db = open_db(PartyDbConfig::new().max_members(2));
        let mut party = Party::new("Crowd", PartyMember::new(100, 1));
        db.create(&mut party).unwrap();
        party.members.push(PartyMember::new(200, 2));
        party.members.push(PartyMember::new(300, 3));
        let update: PartyUpdate = [PartyChange::AddMember(1), PartyChange::AddMember(2)].into_iter().collect();
        db.save(&party, &update).unwrap();

        assert_eq!(db.load(party.id).unwrap().unwrap().members.len(), 2);
    }

    #[test]
    fn init_requires_tables() {
        let conn = Connection::open_in_memory().unwrap();
        let mut db = PartySqlDb::new(conn, PartyDbConfig::default());
        assert!(matches!(db.init(), Err(CoreError::MissingResource { .. })));
        assert!(matches!(db.load(1), Err(CoreError::Closed)));
    }

    #[test]
    fn destroyed_backend_is_closed() {
        let mut db = open_db(PartyDbConfig::default());
        db.destroy().unwrap();
        assert!(matches!(db.iter(), Err(CoreError::Closed)));
        assert!(matches!(db.destroy(), Err(CoreError::Closed)));
    }

    #[test]
    fn custom_table_names() {
        let conn = Connection::open_in_memory().unwrap();
        let config = PartyDbConfig::new().party_table("guild party").char_table("characters");
        let mut db = PartySqlDb::new(conn, config);
        db.ensure_schema().unwrap();
        db.conn
            .lock()
            .execute("INSERT INTO characters (char_id, account_id) VALUES (5, 50)", [])
            .unwrap();
        db.init().unwrap();

        let mut party = Party::new("Spaced", PartyMember::new(50, 5));
        db.create(&mut party).unwrap();
        assert_eq!(db.load(party.id).unwrap().unwrap().members.len(), 1);
        let names: Vec<String> = db.iter().unwrap().map(|p| p.unwrap().name).collect();
        assert_eq!(names, vec!["Spaced"]);
    }

    fn db_with_parties(names: &[&str]) -> PartySqlDb {
        let mut db = open_db(PartyDbConfig::default());
        for (i, name) in names.iter().enumerate() {
            let char_id = u32::try_from(i).unwrap() + 1;
            db.create(&mut Party::new(name, PartyMember::new(char_id * 100, char_id)))
                .unwrap();
        }
        db
    }

    #[test]
    fn iter_visits_every_party_in_id_order() {
        let db = db_with_parties(&["a", "b", "c"]);
        let names: Vec<String> = db.iter().unwrap().map(|p| p.unwrap().name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn iter_over_no_parties_ends_immediately() {
        let db = db_with_parties(&[]);
        let mut iter = db.iter().unwrap();
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }

    #[test]
    fn iter_skips_parties_removed_between_advances() {
        let db = db_with_parties(&["a", "b", "c"]);
        let second = db.id_by_name("b").unwrap().unwrap();
        let conn = db.connection();
        let mut iter = db.iter().unwrap();

        assert_eq!(iter.next().unwrap().unwrap().name, "a");
        conn.lock()
            .execute("DELETE FROM party WHERE party_id = ?1", [second])
            .unwrap();

        let rest: Vec<String> = iter.map(|p| p.unwrap().name).collect();
        assert_eq!(rest, vec!["c"]);
    }

    #[test]
    fn each_iter_is_independent() {
        let db = db_with_parties(&["x", "y"]);
        assert_eq!(db.iter().unwrap().count(), 2);
        assert_eq!(db.iter().unwrap().count(), 2);
    }
}
