//! SQLite-backed credential records.
//!
//! One table, one row per user:
//! - `users`: username (primary key, case-insensitive), stored_hash
//!
//! The store never interprets the hash string; shape and staleness are the
//! hasher's business. Rows are never deleted here — account removal belongs
//! to the surrounding administrative tooling.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection};

use crate::error::AuthError;

/// Durable username → stored-hash mapping.
///
/// The connection is guarded by a mutex, so writes to the same record
/// serialize; SQLite replaces a row value atomically, so a reader never
/// observes a half-written hash.
pub struct UserStore {
    conn: Mutex<Connection>,
}

impl UserStore {
    /// Open (or create) the credential database at the given path.
    pub fn open(db_path: &Path) -> Result<Self, AuthError> {
        let conn = Connection::open(db_path)?;

        // WAL mode for concurrent reads + crash safety
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        Self::init_schema(conn)
    }

    /// Open an ephemeral in-memory store. Useful for tests and hosts that
    /// don't need durability.
    pub fn open_in_memory() -> Result<Self, AuthError> {
        Self::init_schema(Connection::open_in_memory()?)
    }

    fn init_schema(conn: Connection) -> Result<Self, AuthError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                username TEXT PRIMARY KEY COLLATE NOCASE,
                stored_hash TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert a record iff the username is free. Returns true on insert,
    /// false on conflict; the store is untouched on conflict.
    pub fn insert_unique(&self, username: &str, stored_hash: &str) -> Result<bool, AuthError> {
        let conn = self.conn.lock();
        let result = conn.execute(
            "INSERT INTO users (username, stored_hash) VALUES (?1, ?2)",
            params![username, stored_hash],
        );

        match result {
            Ok(_) => Ok(true),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch the stored hash for a username, or `None` for unknown users.
    pub fn lookup(&self, username: &str) -> Result<Option<String>, AuthError> {
        let conn = self.conn.lock();
        let row = conn.query_row(
            "SELECT stored_hash FROM users WHERE username = ?1",
            params![username],
            |row| row.get(0),
        );

        match row {
            Ok(hash) => Ok(Some(hash)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the stored hash for an existing username. Returns whether a
    /// record was updated.
    pub fn update_hash(&self, username: &str, new_stored_hash: &str) -> Result<bool, AuthError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE users SET stored_hash = ?1 WHERE username = ?2",
            params![new_stored_hash, username],
        )?;
        Ok(changed > 0)
    }

    /// Count registered users.
    pub fn user_count(&self) -> Result<u64, AuthError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
