use crate::error::Error;
use crate::timecard::TimeEntry;
use crate::usage::{Identity, UsageStore};
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

pub struct ResultStore {
    conn: Connection,
}

/// One processed image's outcome as persisted.
#[derive(Debug)]
pub struct StoredResult {
    pub uid: String,
    pub file_name: String,
    pub detected_name: String,
    /// "ok" or "failed"
    pub status: String,
    pub entries: Vec<TimeEntry>,
}

impl ResultStore {
    /// Create a new result store with SQLite backend
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, Error> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS results (
                uid TEXT PRIMARY KEY,
                file_name TEXT NOT NULL,
                detected_name TEXT NOT NULL,
                status TEXT NOT NULL,
                entries_json TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        // Daily quota counters, keyed by identity and calendar date
        conn.execute(
            "CREATE TABLE IF NOT EXISTS usage (
                identity TEXT NOT NULL,
                date TEXT NOT NULL,
                count INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (identity, date)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_results_detected_name ON results(detected_name)",
            [],
        )?;

        info!("Database initialized successfully");
        Ok(Self { conn })
    }

    /// Generate a unique ID for one processed image from its file name
    /// and content
    pub fn generate_uid(file_name: &str, image_bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(file_name.as_bytes());
        hasher.update(image_bytes);
        let hash = hasher.finalize();
        format!("{hash:x}")[..16].to_string()
    }

    /// Insert or replace one processed image's outcome
    pub fn upsert_result(&self, result: &StoredResult) -> Result<(), Error> {
        let entries_json = serde_json::to_string(&result.entries)
            .map_err(|e| Error::Extraction(format!("unserializable entries: {e}")))?;

        self.conn.execute(
            "INSERT OR REPLACE INTO results
                (uid, file_name, detected_name, status, entries_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                result.uid,
                result.file_name,
                result.detected_name,
                result.status,
                entries_json,
            ],
        )?;
        Ok(())
    }

    /// Get counts of stored results by status
    pub fn get_counts(&self) -> Result<(usize, usize), Error> {
        let total: usize = self
            .conn
            .query_row("SELECT COUNT(*) FROM results", [], |row| row.get(0))?;

        let succeeded: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM results WHERE status = 'ok'",
            [],
            |row| row.get(0),
        )?;

        Ok((total, succeeded))
    }
}

impl UsageStore for ResultStore {
    fn get(&self, identity: &Identity, date: &str) -> Result<u32, Error> {
        let count = self
            .conn
            .query_row(
                "SELECT count FROM usage WHERE identity = ?1 AND date = ?2",
                params![identity.key(), date],
                |row| row.get::<_, u32>(0),
            )
            .optional()?;
        Ok(count.unwrap_or(0))
    }

    fn set(&self, identity: &Identity, date: &str, count: u32) -> Result<(), Error> {
        self.conn.execute(
            "INSERT INTO usage (identity, date, count) VALUES (?1, ?2, ?3)
             ON CONFLICT(identity, date) DO UPDATE SET count = ?3",
            params![identity.key(), date, count],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uid_generation() {
        let uid1 = ResultStore::generate_uid("card.jpg", b"bytes");
        let uid2 = ResultStore::generate_uid("card.jpg", b"bytes");
        let uid3 = ResultStore::generate_uid("card.jpg", b"other bytes");

        assert_eq!(uid1, uid2); // Same inputs = same hash
        assert_ne!(uid1, uid3); // Different inputs = different hash
        assert_eq!(uid1.len(), 16);
    }

    #[test]
    fn test_usage_counter_roundtrip() {
        let store = ResultStore::new(":memory:").unwrap();
        let guest = Identity::Guest;

        assert_eq!(store.get(&guest, "2026-08-29").unwrap(), 0);
        assert_eq!(store.increment(&guest, "2026-08-29").unwrap(), 1);
        assert_eq!(store.increment(&guest, "2026-08-29").unwrap(), 2);

        // A new date reads zero again
        assert_eq!(store.get(&guest, "2026-08-30").unwrap(), 0);

        // Accounts are counted independently of guests
        let account = Identity::Account("u1".into());
        assert_eq!(store.get(&account, "2026-08-29").unwrap(), 0);
    }

    #[test]
    fn test_result_roundtrip_counts() {
        let store = ResultStore::new(":memory:").unwrap();

        store
            .upsert_result(&StoredResult {
                uid: "abc".into(),
                file_name: "card.jpg".into(),
                detected_name: "山田".into(),
                status: "ok".into(),
                entries: vec![TimeEntry::blank(1)],
            })
            .unwrap();
        store
            .upsert_result(&StoredResult {
                uid: "def".into(),
                file_name: "bad.jpg".into(),
                detected_name: "エラー".into(),
                status: "failed".into(),
                entries: Vec::new(),
            })
            .unwrap();

        assert_eq!(store.get_counts().unwrap(), (2, 1));
    }
}
