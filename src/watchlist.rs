// Watchlist persistence: the set of player ids each user follows, keyed by
// email. The store is a collaborator with its own failure modes; callers
// treat failures as non-fatal and log them.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use crate::players::PlayerId;

#[derive(Debug, thiserror::Error)]
pub enum WatchlistError {
    #[error("watchlist database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("failed to encode watchlist ids: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Async CRUD interface over per-user watchlist storage.
///
/// `add` and `remove_player` are read-modify-write over `get` + `save`;
/// implementations only need the three primitives.
#[async_trait]
pub trait WatchlistStore: Send + Sync {
    /// The watched player ids for `email`. An unknown email yields an empty
    /// list, not an error.
    async fn get(&self, email: &str) -> Result<Vec<PlayerId>, WatchlistError>;

    /// Replace the watched set for `email` (upsert).
    async fn save(&self, email: &str, ids: &[PlayerId]) -> Result<(), WatchlistError>;

    /// Remove the stored watchlist for `email` entirely.
    async fn clear(&self, email: &str) -> Result<(), WatchlistError>;

    /// Add a single player. Already-present ids are a no-op success.
    async fn add(&self, email: &str, id: PlayerId) -> Result<(), WatchlistError> {
        let mut ids = self.get(email).await?;
        if ids.contains(&id) {
            return Ok(());
        }
        ids.push(id);
        self.save(email, &ids).await
    }

    /// Remove a single player (no-op if absent).
    async fn remove_player(&self, email: &str, id: PlayerId) -> Result<(), WatchlistError> {
        let mut ids = self.get(email).await?;
        ids.retain(|&existing| existing != id);
        self.save(email, &ids).await
    }
}

/// SQLite-backed watchlist store. Ids are stored as a JSON array string in a
/// single row per email, upserted on save. Pass `":memory:"` for an
/// ephemeral database (useful for tests).
pub struct SqliteWatchlistStore {
    conn: Mutex<Connection>,
}

impl SqliteWatchlistStore {
    pub fn open(path: &str) -> Result<Self, WatchlistError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;

             CREATE TABLE IF NOT EXISTS watched_players (
                 email      TEXT PRIMARY KEY,
                 player_ids TEXT NOT NULL,
                 updated_at TEXT NOT NULL
             );",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("watchlist database mutex poisoned")
    }
}

#[async_trait]
impl WatchlistStore for SqliteWatchlistStore {
    async fn get(&self, email: &str) -> Result<Vec<PlayerId>, WatchlistError> {
        let conn = self.conn();
        let stored: Option<String> = conn
            .query_row(
                "SELECT player_ids FROM watched_players WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()?;

        let Some(json) = stored else {
            return Ok(Vec::new());
        };

        // A corrupted cell is recoverable: treat it as an empty watchlist
        // rather than locking the user out.
        match serde_json::from_str::<Vec<PlayerId>>(&json) {
            Ok(ids) => Ok(ids),
            Err(e) => {
                warn!("malformed watchlist row for {email}: {e}; treating as empty");
                Ok(Vec::new())
            }
        }
    }

    async fn save(&self, email: &str, ids: &[PlayerId]) -> Result<(), WatchlistError> {
        let json = serde_json::to_string(ids)?;
        let conn = self.conn();
        conn.execute(
            "INSERT INTO watched_players (email, player_ids, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(email) DO UPDATE SET
                 player_ids = excluded.player_ids,
                 updated_at = excluded.updated_at",
            params![email, json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    async fn clear(&self, email: &str) -> Result<(), WatchlistError> {
        let conn = self.conn();
        conn.execute(
            "DELETE FROM watched_players WHERE email = ?1",
            params![email],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteWatchlistStore {
        SqliteWatchlistStore::open(":memory:").unwrap()
    }

    #[tokio::test]
    async fn unknown_email_yields_empty_list() {
        let store = store();
        let ids = store.get("nobody@example.com").await.unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let store = store();
        store.save("a@example.com", &[3, 5, 9]).await.unwrap();
        assert_eq!(store.get("a@example.com").await.unwrap(), vec![3, 5, 9]);

        // Upsert replaces the previous set.
        store.save("a@example.com", &[7]).await.unwrap();
        assert_eq!(store.get("a@example.com").await.unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn users_are_isolated_by_email() {
        let store = store();
        store.save("a@example.com", &[1]).await.unwrap();
        store.save("b@example.com", &[2]).await.unwrap();
        assert_eq!(store.get("a@example.com").await.unwrap(), vec![1]);
        assert_eq!(store.get("b@example.com").await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn add_appends_and_deduplicates() {
        let store = store();
        store.add("a@example.com", 4).await.unwrap();
        store.add("a@example.com", 8).await.unwrap();
        store.add("a@example.com", 4).await.unwrap();
        assert_eq!(store.get("a@example.com").await.unwrap(), vec![4, 8]);
    }

    #[tokio::test]
    async fn remove_player_filters_the_id() {
        let store = store();
        store.save("a@example.com", &[1, 2, 3]).await.unwrap();
        store.remove_player("a@example.com", 2).await.unwrap();
        assert_eq!(store.get("a@example.com").await.unwrap(), vec![1, 3]);

        // Removing an absent id is a no-op.
        store.remove_player("a@example.com", 42).await.unwrap();
        assert_eq!(store.get("a@example.com").await.unwrap(), vec![1, 3]);
    }

    #[tokio::test]
    async fn clear_deletes_the_row() {
        let store = store();
        store.save("a@example.com", &[1, 2]).await.unwrap();
        store.clear("a@example.com").await.unwrap();
        assert!(store.get("a@example.com").await.unwrap().is_empty());

        // Clearing an unknown email is fine.
        store.clear("nobody@example.com").await.unwrap();
    }

    #[tokio::test]
    async fn malformed_row_is_treated_as_empty() {
        let store = store();
        {
            let conn = store.conn();
            conn.execute(
                "INSERT INTO watched_players (email, player_ids, updated_at)
                 VALUES (?1, ?2, ?3)",
                params!["a@example.com", "not json", Utc::now().to_rfc3339()],
            )
            .unwrap();
        }
        assert!(store.get("a@example.com").await.unwrap().is_empty());
    }
}
