//! Review storage module with pluggable backends.
//!
//! Holds the reviewer's questionnaire records plus the single segmentation
//! slot. Supports:
//! - `memory`: In-memory storage (non-persistent, for testing)
//! - `file`: JSON file-based storage
//! - `sqlite`: SQLite database (default)

mod file;
mod memory;
mod sqlite;

pub use file::FileReviewStore;
pub use memory::InMemoryReviewStore;
pub use sqlite::SqliteReviewStore;

use crate::segment::PartitionResult;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the single overwritable segmentation slot.
pub const SEGMENTATION_SLOT: &str = "segmentation_v1";

/// A saved questionnaire for one task, keyed by `task_id`.
///
/// The answer fields are deliberately schemaless: the panel's fixed form
/// lands in `answers` as-is and is never validated here. `part` is the
/// 1-based part index captured when the reviewer opened the task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireRecord {
    pub task_id: String,
    #[serde(default)]
    pub part: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_risk_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_path: Option<String>,
    /// When the record was last saved locally (RFC 3339).
    pub saved_at: String,
    /// When the record was last included in a successful upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<String>,
    /// Response from the upload target for the last upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_response: Option<serde_json::Value>,
    /// The questionnaire answers themselves (q1..q15, comments, ...).
    #[serde(flatten)]
    pub answers: serde_json::Map<String, serde_json::Value>,
}

/// Get current timestamp as RFC3339 string.
pub fn now_string() -> String {
    Utc::now().to_rfc3339()
}

/// Sanitize a string for use as a filename.
pub fn sanitize_filename(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        "default".to_string()
    } else {
        out
    }
}

/// Review store trait - implemented by all storage backends.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// Insert or replace a record, keyed by its `task_id`.
    async fn upsert_record(&self, record: &QuestionnaireRecord) -> Result<(), String>;

    /// Get a single record by task id.
    async fn get_record(&self, task_id: &str) -> Result<Option<QuestionnaireRecord>, String>;

    /// List all records, ordered by task id.
    async fn list_records(&self) -> Result<Vec<QuestionnaireRecord>, String>;

    /// Delete every record.
    async fn clear_records(&self) -> Result<(), String>;

    /// Load the current segmentation, if one has been saved.
    async fn load_segmentation(&self) -> Result<Option<PartitionResult>, String>;

    /// Overwrite the segmentation slot wholesale. Last write wins.
    async fn save_segmentation(&self, segmentation: &PartitionResult) -> Result<(), String>;
}

/// Review store type selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreType {
    Memory,
    File,
    #[default]
    Sqlite,
}

impl StoreType {
    /// Parse from environment variable value.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" => Self::Memory,
            "file" | "json" => Self::File,
            "sqlite" | "db" => Self::Sqlite,
            _ => Self::default(),
        }
    }
}

/// Create a review store based on type and configuration.
pub async fn create_review_store(
    store_type: StoreType,
    base_dir: PathBuf,
) -> Result<Box<dyn ReviewStore>, String> {
    match store_type {
        StoreType::Memory => Ok(Box::new(InMemoryReviewStore::new())),
        StoreType::File => {
            let store = FileReviewStore::new(base_dir).await?;
            Ok(Box::new(store))
        }
        StoreType::Sqlite => {
            let store = SqliteReviewStore::new(base_dir).await?;
            Ok(Box::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn record(task_id: &str, part: u32) -> QuestionnaireRecord {
        let mut answers = serde_json::Map::new();
        answers.insert("q1".to_string(), serde_json::json!("4"));
        answers.insert("comments".to_string(), serde_json::json!("looks fine"));
        QuestionnaireRecord {
            task_id: task_id.to_string(),
            part,
            task_type: Some("regular".to_string()),
            task_level: Some("stable".to_string()),
            task_risk_label: None,
            task_path: Some(format!("{}/doctor_report.html", task_id)),
            saved_at: now_string(),
            uploaded_at: None,
            upload_response: None,
            answers,
        }
    }

    #[test]
    fn store_type_parses_env_values() {
        assert_eq!(StoreType::from_str("memory"), StoreType::Memory);
        assert_eq!(StoreType::from_str("FILE"), StoreType::File);
        assert_eq!(StoreType::from_str("json"), StoreType::File);
        assert_eq!(StoreType::from_str("sqlite"), StoreType::Sqlite);
        assert_eq!(StoreType::from_str("db"), StoreType::Sqlite);
        assert_eq!(StoreType::from_str("anything-else"), StoreType::Sqlite);
    }

    #[test]
    fn sanitize_filename_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("patient_001"), "patient_001");
        assert_eq!(sanitize_filename("a/b:c"), "a_b_c");
        assert_eq!(sanitize_filename(""), "default");
    }

    #[test]
    fn record_answers_round_trip_through_flatten() {
        let rec = record("patient_001", 2);
        let json = serde_json::to_value(&rec).expect("serialize");
        assert_eq!(json["q1"], "4");
        assert_eq!(json["comments"], "looks fine");
        assert_eq!(json["task_id"], "patient_001");

        let back: QuestionnaireRecord = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, rec);
    }

    #[tokio::test]
    async fn factory_builds_the_requested_backend() {
        let store = create_review_store(StoreType::Memory, PathBuf::from("/unused"))
            .await
            .expect("memory store");
        assert!(!store.is_persistent());
    }
}
