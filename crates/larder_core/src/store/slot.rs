//! Named key-value slots backing persisted client state.
//!
//! # Responsibility
//! - Abstract a durable "one named value" storage primitive.
//! - Provide an in-memory fake and a SQLite implementation.
//!
//! # Invariants
//! - `remove` deletes the slot; a later `read` returns `None`, not `""`.
//! - Slot values are opaque text; parsing belongs to the caller.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{table_exists, DbError};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, PoisonError};

pub type SlotResult<T> = Result<T, SlotError>;

/// Storage error for slot access.
#[derive(Debug)]
pub enum SlotError {
    Db(DbError),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
}

impl Display for SlotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "slot store schema version {actual_version} does not match expected {expected_version}"
            ),
        }
    }
}

impl Error for SlotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::UninitializedConnection { .. } => None,
        }
    }
}

impl From<DbError> for SlotError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SlotError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable storage for named text slots.
pub trait KeyValueSlot: Send {
    fn read(&self, name: &str) -> SlotResult<Option<String>>;
    fn write(&self, name: &str, value: &str) -> SlotResult<()>;
    fn remove(&self, name: &str) -> SlotResult<()>;
}

/// In-memory slot store.
///
/// Clones share the same slots, so a test can keep one handle to inspect raw
/// values while another is owned by a flag store.
#[derive(Debug, Clone, Default)]
pub struct MemorySlotStore {
    slots: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw slot value without parsing.
    pub fn raw(&self, name: &str) -> Option<String> {
        self.lock().get(name).cloned()
    }

    /// Writes a raw slot value, bypassing serialization.
    pub fn put_raw(&self, name: &str, value: impl Into<String>) {
        self.lock().insert(name.to_string(), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueSlot for MemorySlotStore {
    fn read(&self, name: &str) -> SlotResult<Option<String>> {
        Ok(self.raw(name))
    }

    fn write(&self, name: &str, value: &str) -> SlotResult<()> {
        self.put_raw(name, value);
        Ok(())
    }

    fn remove(&self, name: &str) -> SlotResult<()> {
        self.lock().remove(name);
        Ok(())
    }
}

/// SQLite-backed slot store over the `kv_slots` table.
///
/// Owns its connection so it can move into the day-boundary task.
pub struct SqliteSlotStore {
    conn: Connection,
}

impl SqliteSlotStore {
    /// Wraps a migrated connection.
    pub fn try_new(conn: Connection) -> SlotResult<Self> {
        let expected_version = latest_version();
        let actual_version = current_user_version(&conn)?;
        if actual_version != expected_version || !table_exists(&conn, "kv_slots")? {
            return Err(SlotError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }
}

impl KeyValueSlot for SqliteSlotStore {
    fn read(&self, name: &str) -> SlotResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_slots WHERE name = ?1;",
                [name],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write(&self, name: &str, value: &str) -> SlotResult<()> {
        self.conn.execute(
            "INSERT INTO kv_slots (name, value) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![name, value],
        )?;
        Ok(())
    }

    fn remove(&self, name: &str) -> SlotResult<()> {
        self.conn
            .execute("DELETE FROM kv_slots WHERE name = ?1;", [name])?;
        Ok(())
    }
}
