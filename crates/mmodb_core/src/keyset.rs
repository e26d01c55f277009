//! Keyset iteration over any SQLite table.

use crate::error::CoreResult;
use parking_lot::Mutex;
use rusqlite::types::FromSql;
use rusqlite::{Connection, OptionalExtension, ToSql};
use std::sync::Arc;

/// Quotes an SQL identifier.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Walks the keys of one table column in ascending order, one row per
/// advance.
///
/// Each advance asks for the smallest key above the last one returned, so
/// the connection is locked only for that single query and no statement
/// stays open in between. Other calls can interleave with an unfinished
/// iteration: rows deleted ahead of the iterator are not returned, rows
/// inserted ahead of it are. After the last row or the first error the
/// iterator is exhausted.
///
/// Backends layer their entity iteration on top by loading each key.
pub struct KeysetIter<K> {
    conn: Arc<Mutex<Connection>>,
    first: String,
    after: String,
    last: Option<K>,
    done: bool,
}

impl<K> KeysetIter<K>
where
    K: FromSql + ToSql + Clone,
{
    /// Iterates `key_column` of `table`. Both names are quoted as
    /// identifiers.
    pub fn new(conn: Arc<Mutex<Connection>>, table: &str, key_column: &str) -> Self {
        let table = quote_ident(table);
        let key = quote_ident(key_column);
        Self {
            conn,
            first: format!("SELECT {key} FROM {table} ORDER BY {key} LIMIT 1"),
            after: format!("SELECT {key} FROM {table} WHERE {key} > ?1 ORDER BY {key} LIMIT 1"),
            last: None,
            done: false,
        }
    }

    fn advance(&self) -> CoreResult<Option<K>> {
        let conn = self.conn.lock();
        let next = match &self.last {
            None => conn.query_row(&self.first, [], |row| row.get(0)),
            Some(last) => conn.query_row(&self.after, [last], |row| row.get(0)),
        };
        Ok(next.optional()?)
    }
}

impl<K> Iterator for KeysetIter<K>
where
    K: FromSql + ToSql + Clone,
{
    type Item = CoreResult<K>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.advance() {
            Ok(Some(key)) => {
                self.last = Some(key.clone());
                Some(Ok(key))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
