// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed knowledge store.
//!
//! All access goes through tokio-rusqlite's single background thread, so
//! concurrent readers and writers never hit SQLITE_BUSY.

use rusqlite::params;
use tokio_rusqlite::Connection;

use async_trait::async_trait;
use lexrelay_core::error::RelayError;
use lexrelay_core::traits::KnowledgeStore;
use lexrelay_core::types::KnowledgeEntry;

fn map_db_err(e: tokio_rusqlite::Error) -> RelayError {
    RelayError::Knowledge {
        source: Box::new(e),
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> Result<KnowledgeEntry, rusqlite::Error> {
    Ok(KnowledgeEntry {
        id: row.get(0)?,
        knowledge_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        category: row.get(4)?,
        subcategory: row.get(5)?,
        keywords: row.get(6)?,
        status: row.get(7)?,
    })
}

const SELECT_COLUMNS: &str =
    "id, knowledge_id, title, content, category, subcategory, keywords, status";

/// Knowledge store over a SQLite database file.
#[derive(Clone)]
pub struct SqliteKnowledgeStore {
    conn: Connection,
}

impl SqliteKnowledgeStore {
    /// Opens (or creates) the database at `path` and applies the schema.
    pub async fn open(path: &str) -> Result<Self, RelayError> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| map_db_err(tokio_rusqlite::Error::Error(e)))?;
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 CREATE TABLE IF NOT EXISTS knowledge_base (
                     id INTEGER PRIMARY KEY AUTOINCREMENT,
                     knowledge_id TEXT NOT NULL UNIQUE,
                     title TEXT NOT NULL,
                     content TEXT NOT NULL,
                     category TEXT NOT NULL,
                     subcategory TEXT,
                     keywords TEXT,
                     status TEXT NOT NULL DEFAULT 'active'
                 );
                 CREATE INDEX IF NOT EXISTS idx_knowledge_category
                     ON knowledge_base (category);
                 CREATE INDEX IF NOT EXISTS idx_knowledge_status
                     ON knowledge_base (status);",
            )?;
            Ok(())
        })
        .await
        .map_err(map_db_err)?;
        Ok(Self { conn })
    }

    /// Number of entries, regardless of status.
    pub async fn count(&self) -> Result<usize, RelayError> {
        self.conn
            .call(|conn| {
                let n: usize =
                    conn.query_row("SELECT COUNT(*) FROM knowledge_base", [], |row| row.get(0))?;
                Ok(n)
            })
            .await
            .map_err(map_db_err)
    }
}

#[async_trait]
impl KnowledgeStore for SqliteKnowledgeStore {
    async fn insert(&self, entry: &KnowledgeEntry) -> Result<i64, RelayError> {
        let entry = entry.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO knowledge_base
                     (knowledge_id, title, content, category, subcategory, keywords, status)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     ON CONFLICT(knowledge_id) DO UPDATE SET
                         title = excluded.title,
                         content = excluded.content,
                         category = excluded.category,
                         subcategory = excluded.subcategory,
                         keywords = excluded.keywords,
                         status = excluded.status",
                    params![
                        entry.knowledge_id,
                        entry.title,
                        entry.content,
                        entry.category,
                        entry.subcategory,
                        entry.keywords,
                        entry.status,
                    ],
                )?;
                let id: i64 = conn.query_row(
                    "SELECT id FROM knowledge_base WHERE knowledge_id = ?1",
                    params![entry.knowledge_id],
                    |row| row.get(0),
                )?;
                Ok(id)
            })
            .await
            .map_err(map_db_err)
    }

    async fn get_by_knowledge_id(
        &self,
        knowledge_id: &str,
    ) -> Result<Option<KnowledgeEntry>, RelayError> {
        let knowledge_id = knowledge_id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM knowledge_base WHERE knowledge_id = ?1"
                ))?;
                let entry = stmt
                    .query_row(params![knowledge_id], row_to_entry)
                    .map(Some)
                    .or_else(|e| match e {
                        rusqlite::Error::QueryReturnedNoRows => Ok(None),
                        other => Err(other),
                    })?;
                Ok(entry)
            })
            .await
            .map_err(map_db_err)
    }

    async fn active_entries(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<KnowledgeEntry>, RelayError> {
        let category = category.map(|c| c.to_string());
        self.conn
            .call(move |conn| {
                let entries = match category {
                    Some(cat) => {
                        let mut stmt = conn.prepare(&format!(
                            "SELECT {SELECT_COLUMNS} FROM knowledge_base
                             WHERE status = 'active' AND category = ?1
                             ORDER BY id"
                        ))?;
                        let rows = stmt.query_map(params![cat], row_to_entry)?;
                        rows.collect::<Result<Vec<_>, _>>()?
                    }
                    None => {
                        let mut stmt = conn.prepare(&format!(
                            "SELECT {SELECT_COLUMNS} FROM knowledge_base
                             WHERE status = 'active'
                             ORDER BY id"
                        ))?;
                        let rows = stmt.query_map([], row_to_entry)?;
                        rows.collect::<Result<Vec<_>, _>>()?
                    }
                };
                Ok(entries)
            })
            .await
            .map_err(map_db_err)
    }
}
