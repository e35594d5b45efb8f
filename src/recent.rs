//! Recently loaded sources, persisted in the settings database

use crate::corpus::rank_suggestions;
use crate::error::KonkordError;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentSource {
    pub id: i64,
    pub identifier: String,
    pub loaded_at: String,
}

/// Most recent first; re-adding a source moves it to the front.
pub struct RecentSources {
    db_path: PathBuf,
    limit: usize,
}

impl RecentSources {
    pub fn open(db_path: impl Into<PathBuf>, limit: usize) -> Result<Self, KonkordError> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                KonkordError::Database(format!("Failed to create data directory: {}", e))
            })?;
        }
        let recent = Self { db_path, limit };
        Self::init_db(&recent.connection()?)?;
        Ok(recent)
    }

    fn connection(&self) -> Result<Connection, KonkordError> {
        Connection::open(&self.db_path)
            .map_err(|e| KonkordError::Database(format!("unable to open database file: {}", e)))
    }

    fn init_db(conn: &Connection) -> Result<(), KonkordError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS recent_sources (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                identifier TEXT NOT NULL UNIQUE,
                loaded_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_recent_sources_loaded
            ON recent_sources(loaded_at DESC);
            "#,
        )?;
        Ok(())
    }

    pub fn add(&self, identifier: &str) -> Result<(), KonkordError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Ok(());
        }
        let conn = self.connection()?;
        let now = chrono::Utc::now().to_rfc3339();

        conn.execute("DELETE FROM recent_sources WHERE identifier = ?1", [identifier])?;
        conn.execute(
            "INSERT INTO recent_sources (identifier, loaded_at) VALUES (?1, ?2)",
            rusqlite::params![identifier, now],
        )?;

        // Keep only the newest `limit` entries
        conn.execute(
            "DELETE FROM recent_sources WHERE id NOT IN (
                SELECT id FROM recent_sources ORDER BY id DESC LIMIT ?1
            )",
            [self.limit as i64],
        )?;
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<RecentSource>, KonkordError> {
        let conn = self.connection()?;
        let mut stmt =
            conn.prepare("SELECT id, identifier, loaded_at FROM recent_sources ORDER BY id DESC")?;
        let entries = stmt
            .query_map([], |row: &Row| {
                Ok(RecentSource {
                    id: row.get(0)?,
                    identifier: row.get(1)?,
                    loaded_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Identifiers completing `input`: prefix matches, then substring
    /// matches, each most recent first.
    pub fn suggest(&self, input: &str) -> Result<Vec<String>, KonkordError> {
        let entries = self.list()?;
        Ok(rank_suggestions(entries.iter().map(|e| e.identifier.as_str()), input))
    }

    pub fn clear(&self) -> Result<(), KonkordError> {
        self.connection()?.execute("DELETE FROM recent_sources", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn identifiers(recent: &RecentSources) -> Vec<String> {
        recent.list().unwrap().into_iter().map(|e| e.identifier).collect()
    }

    #[test]
    fn test_move_to_front_and_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let recent = RecentSources::open(dir.path().join("settings.db"), 3).unwrap();
        for id in ["/a", "/b", "/c", "/a", "/d", "  "] {
            recent.add(id).unwrap();
        }
        assert_eq!(identifiers(&recent), vec!["/d", "/a", "/c"]);

        recent.clear().unwrap();
        assert!(identifiers(&recent).is_empty());
    }

    #[test]
    fn test_suggest_ranks_prefix_first() {
        let dir = tempfile::tempdir().unwrap();
        let recent = RecentSources::open(dir.path().join("nested/settings.db"), 10).unwrap();
        recent.add("https://en.wikipedia.org/wiki/Java").unwrap();
        recent.add("/corpora/java.txt").unwrap();
        recent.add("/corpora/rust.txt").unwrap();

        assert_eq!(
            recent.suggest("/corpora").unwrap(),
            vec!["/corpora/rust.txt", "/corpora/java.txt"]
        );
        assert_eq!(
            recent.suggest("java").unwrap(),
            vec!["/corpora/java.txt"]
        );
        assert_eq!(recent.suggest("").unwrap().len(), 3);
    }

    #[test]
    fn test_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.db");
        RecentSources::open(&path, 5).unwrap().add("/x").unwrap();
        let reopened = RecentSources::open(&path, 5).unwrap();
        assert_eq!(identifiers(&reopened), vec!["/x"]);
    }
}
