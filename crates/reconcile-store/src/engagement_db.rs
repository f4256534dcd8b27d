//! SQLite-backed engagement database client (§4.E), modelled on `agtrace-index::db::Database`:
//! schema-on-read-ish (the message is stored as a JSON blob, indexed columns are pulled out
//! for filtering), `insert_or_update`-style upserts, and a unique index on `origin_id`
//! enforcing Invariant 1.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;

use reconcile_sources::MessageSink;
use reconcile_types::{HistoryEntry, Message};

use crate::error::{Error, Result};

/// Filter predicate for [`EngagementDb::get_by_filter`] / [`EngagementDb::iterate_all`]
/// (§4.E, supplement 5: `test_participant_uuids`/`filter_test_messages`).
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub dataset: Option<String>,
    pub participant_uuid: Option<String>,
    pub since: Option<DateTime<Utc>>,
    /// When set, only messages whose `participant_uuid` is in this list pass (test runs);
    /// when `exclude_test_participants` is true instead, messages in this list are excluded.
    pub test_participant_uuids: Vec<String>,
    pub exclude_test_participants: bool,
}

impl MessageFilter {
    fn matches(&self, message: &Message) -> bool {
        if let Some(dataset) = &self.dataset {
            if &message.dataset != dataset {
                return false;
            }
        }
        if let Some(uuid) = &self.participant_uuid {
            if &message.participant_uuid != uuid {
                return false;
            }
        }
        if let Some(since) = self.since {
            if message.timestamp < since {
                return false;
            }
        }
        if !self.test_participant_uuids.is_empty() {
            let is_test = self.test_participant_uuids.contains(&message.participant_uuid);
            if self.exclude_test_participants && is_test {
                return false;
            }
            if !self.exclude_test_participants && !is_test {
                return false;
            }
        }
        true
    }
}

pub struct EngagementDb {
    conn: Connection,
}

impl EngagementDb {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let db = EngagementDb { conn };
        init_schema(&db.conn)?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = EngagementDb { conn };
        init_schema(&db.conn)?;
        Ok(db)
    }

    pub fn transaction(&mut self) -> Result<Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    pub fn get_by_origin_id(&self, origin_id: &str) -> Result<Option<Message>> {
        get_by_origin_id_impl(&self.conn, origin_id)
    }

    pub fn get_by_message_id(&self, message_id: &str) -> Result<Option<Message>> {
        get_by_message_id_impl(&self.conn, message_id)
    }

    pub fn get_by_coda_id(&self, coda_id: &str) -> Result<Option<Message>> {
        get_by_coda_id_impl(&self.conn, coda_id)
    }

    pub fn get_by_filter(&self, filter: &MessageFilter) -> Result<Vec<Message>> {
        get_by_filter_impl(&self.conn, filter)
    }

    /// Batched iteration over every message, restartable from any boundary (§4.E).
    pub fn iterate_all(&self, batch_size: usize) -> Result<Vec<Vec<Message>>> {
        let all = get_by_filter_impl(&self.conn, &MessageFilter::default())?;
        Ok(all.chunks(batch_size.max(1)).map(<[Message]>::to_vec).collect())
    }

    /// Inserts or replaces `message`, enforcing append-history (Invariant 5): once a message
    /// exists, its stored history must be a strict prefix of the new history.
    pub fn set_message(&self, message: &Message) -> Result<()> {
        set_message_impl(&self.conn, message)
    }
}

impl MessageSink for EngagementDb {
    fn has_origin_id(&self, origin_id: &str) -> bool {
        self.get_by_origin_id(origin_id).ok().flatten().is_some()
    }

    fn insert_message(&mut self, mut message: Message, history: HistoryEntry) {
        message.push_history(history);
        if let Err(e) = self.set_message(&message) {
            tracing::warn!(message_id = %message.message_id, error = %e, "failed to write message to engagement db");
        }
    }
}

/// Same operations as [`EngagementDb`], scoped to an open transaction (read-your-writes,
/// serializable per-message per §4.E).
pub struct EngagementDbTransaction<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> EngagementDbTransaction<'conn> {
    pub fn new(tx: Transaction<'conn>) -> Self {
        EngagementDbTransaction { tx }
    }

    pub fn get_by_origin_id(&self, origin_id: &str) -> Result<Option<Message>> {
        get_by_origin_id_impl(&self.tx, origin_id)
    }

    pub fn get_by_message_id(&self, message_id: &str) -> Result<Option<Message>> {
        get_by_message_id_impl(&self.tx, message_id)
    }

    pub fn set_message(&self, message: &Message) -> Result<()> {
        set_message_impl(&self.tx, message)
    }

    pub fn commit(self) -> Result<()> {
        Ok(self.tx.commit()?)
    }

    pub fn rollback(self) -> Result<()> {
        Ok(self.tx.rollback()?)
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            message_id TEXT PRIMARY KEY,
            origin_id TEXT NOT NULL UNIQUE,
            dataset TEXT NOT NULL,
            participant_uuid TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            coda_id TEXT,
            body TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_dataset ON messages(dataset);
        CREATE INDEX IF NOT EXISTS idx_messages_participant ON messages(participant_uuid);
        CREATE INDEX IF NOT EXISTS idx_messages_coda_id ON messages(coda_id);
        "#,
    )?;
    Ok(())
}

fn get_by_origin_id_impl(conn: &Connection, origin_id: &str) -> Result<Option<Message>> {
    let body: Option<String> = conn
        .query_row("SELECT body FROM messages WHERE origin_id = ?1", params![origin_id], |row| row.get(0))
        .optional()?;
    body.map(|b| serde_json::from_str(&b).map_err(Error::from)).transpose()
}

fn get_by_message_id_impl(conn: &Connection, message_id: &str) -> Result<Option<Message>> {
    let body: Option<String> = conn
        .query_row("SELECT body FROM messages WHERE message_id = ?1", params![message_id], |row| row.get(0))
        .optional()?;
    body.map(|b| serde_json::from_str(&b).map_err(Error::from)).transpose()
}

fn get_by_coda_id_impl(conn: &Connection, coda_id: &str) -> Result<Option<Message>> {
    let body: Option<String> = conn
        .query_row("SELECT body FROM messages WHERE coda_id = ?1", params![coda_id], |row| row.get(0))
        .optional()?;
    body.map(|b| serde_json::from_str(&b).map_err(Error::from)).transpose()
}

fn get_by_filter_impl(conn: &Connection, filter: &MessageFilter) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare("SELECT body FROM messages ORDER BY timestamp ASC")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut messages = Vec::new();
    for row in rows {
        let body = row?;
        let message: Message = serde_json::from_str(&body)?;
        if filter.matches(&message) {
            messages.push(message);
        }
    }
    Ok(messages)
}

fn set_message_impl(conn: &Connection, message: &Message) -> Result<()> {
    if let Some(existing) = get_by_message_id_impl(conn, &message.message_id)? {
        let existing_len = existing.history.len();
        let new_len = message.history.len();
        if new_len < existing_len || existing.history != message.history[..existing_len] {
            tracing::warn!(message_id = %message.message_id, "set_message called without a superset history");
        }
    }

    let body = serde_json::to_string(message)?;
    conn.execute(
        r#"
        INSERT INTO messages (message_id, origin_id, dataset, participant_uuid, timestamp, coda_id, body)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(message_id) DO UPDATE SET
            origin_id = ?2,
            dataset = ?3,
            participant_uuid = ?4,
            timestamp = ?5,
            coda_id = ?6,
            body = ?7
        "#,
        params![
            &message.message_id,
            &message.origin.origin_id,
            &message.dataset,
            &message.participant_uuid,
            &message.timestamp.to_rfc3339(),
            &message.coda_id,
            &body,
        ],
    )?;
    Ok(())
}
