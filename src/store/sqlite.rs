//! SQLite-based review store.

use super::{QuestionnaireRecord, ReviewStore, SEGMENTATION_SLOT};
use crate::segment::PartitionResult;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const DB_FILE: &str = "review-desk.db";

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS questionnaires (
    task_id TEXT PRIMARY KEY NOT NULL,
    record_json TEXT NOT NULL,
    saved_at TEXT NOT NULL,
    uploaded_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_questionnaires_saved_at ON questionnaires(saved_at DESC);

CREATE TABLE IF NOT EXISTS segmentation_slot (
    slot TEXT PRIMARY KEY NOT NULL,
    result_json TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

pub struct SqliteReviewStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteReviewStore {
    pub async fn new(base_dir: PathBuf) -> Result<Self, String> {
        tokio::fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| format!("Failed to create review store dir: {}", e))?;
        let db_path = base_dir.join(DB_FILE);

        // Open database in blocking task
        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)
                .map_err(|e| format!("Failed to open SQLite database: {}", e))?;

            conn.execute_batch(SCHEMA)
                .map_err(|e| format!("Failed to run schema: {}", e))?;

            Ok::<_, String>(conn)
        })
        .await
        .map_err(|e| format!("Task join error: {}", e))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl ReviewStore for SqliteReviewStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn upsert_record(&self, record: &QuestionnaireRecord) -> Result<(), String> {
        let record_json = serde_json::to_string(record)
            .map_err(|e| format!("Failed to serialize record: {}", e))?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO questionnaires (task_id, record_json, saved_at, uploaded_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(task_id) DO UPDATE SET
                 record_json = excluded.record_json,
                 saved_at = excluded.saved_at,
                 uploaded_at = excluded.uploaded_at",
            params![
                record.task_id,
                record_json,
                record.saved_at,
                record.uploaded_at
            ],
        )
        .map_err(|e| format!("Failed to upsert record: {}", e))?;
        Ok(())
    }

    async fn get_record(&self, task_id: &str) -> Result<Option<QuestionnaireRecord>, String> {
        let conn = self.conn.lock().await;
        let record_json: Option<String> = conn
            .query_row(
                "SELECT record_json FROM questionnaires WHERE task_id = ?1",
                params![task_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| format!("Failed to query record: {}", e))?;
        match record_json {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| format!("Failed to parse stored record: {}", e)),
            None => Ok(None),
        }
    }

    async fn list_records(&self) -> Result<Vec<QuestionnaireRecord>, String> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT record_json FROM questionnaires ORDER BY task_id")
            .map_err(|e| format!("Failed to prepare list query: {}", e))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| format!("Failed to query records: {}", e))?;

        let mut records = Vec::new();
        for row in rows {
            let json = row.map_err(|e| format!("Failed to read record row: {}", e))?;
            let record = serde_json::from_str(&json)
                .map_err(|e| format!("Failed to parse stored record: {}", e))?;
            records.push(record);
        }
        Ok(records)
    }

    async fn clear_records(&self) -> Result<(), String> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM questionnaires", [])
            .map_err(|e| format!("Failed to clear records: {}", e))?;
        Ok(())
    }

    async fn load_segmentation(&self) -> Result<Option<PartitionResult>, String> {
        let conn = self.conn.lock().await;
        let result_json: Option<String> = conn
            .query_row(
                "SELECT result_json FROM segmentation_slot WHERE slot = ?1",
                params![SEGMENTATION_SLOT],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| format!("Failed to query segmentation: {}", e))?;
        match result_json {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| format!("Failed to parse stored segmentation: {}", e)),
            None => Ok(None),
        }
    }

    async fn save_segmentation(&self, segmentation: &PartitionResult) -> Result<(), String> {
        let result_json = serde_json::to_string(segmentation)
            .map_err(|e| format!("Failed to serialize segmentation: {}", e))?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO segmentation_slot (slot, result_json, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(slot) DO UPDATE SET
                 result_json = excluded.result_json,
                 updated_at = excluded.updated_at",
            params![SEGMENTATION_SLOT, result_json, super::now_string()],
        )
        .map_err(|e| format!("Failed to save segmentation: {}", e))?;
        Ok(())
    }
}
