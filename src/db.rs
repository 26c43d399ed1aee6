//! Conversation history persistence
//!
//! A single ordered log of `(role, content)` messages. An empty log is
//! seeded with the assistant greeting on first read and after a reset.

mod schema;

pub use schema::{greeting, HistoryRecord, SCHEMA};

use crate::feed::{HistoryEntry, Role};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Cannot create database directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unknown role in history row {id}: {role}")]
    InvalidRole { id: i64, role: String },
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> DbResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Full ordered history, seeding `greeting` if the log is empty
    pub fn load_history(&self, greeting: &str) -> DbResult<Vec<HistoryRecord>> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;
        if count == 0 {
            insert(&conn, Role::Ai, greeting)?;
        }
        select_all(&conn)
    }

    /// Append one message to the log
    pub fn append(&self, entry: &HistoryEntry) -> DbResult<HistoryRecord> {
        let conn = self.conn();
        insert(&conn, entry.role, &entry.content)
    }

    /// Clear the log and re-seed the greeting
    pub fn reset(&self, greeting: &str) -> DbResult<Vec<HistoryRecord>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM history", [])?;
        insert(&tx, Role::Ai, greeting)?;
        let records = select_all(&tx)?;
        tx.commit()?;
        Ok(records)
    }
}

fn insert(conn: &Connection, role: Role, content: &str) -> DbResult<HistoryRecord> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO history (role, content, created_at) VALUES (?1, ?2, ?3)",
        params![role.as_str(), content, now.to_rfc3339()],
    )?;
    Ok(HistoryRecord {
        id: conn.last_insert_rowid(),
        role,
        content: content.to_string(),
        created_at: now,
    })
}

fn select_all(conn: &Connection) -> DbResult<Vec<HistoryRecord>> {
    let mut stmt = conn.prepare("SELECT id, role, content, created_at FROM history ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (id, role, content, created_at) = row?;
        let role = Role::parse(&role).ok_or(DbError::InvalidRole { id, role })?;
        records.push(HistoryRecord {
            id,
            role,
            content,
            created_at: parse_datetime(&created_at),
        });
    }
    Ok(records)
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
