//! JSON file-based review store.
//!
//! One snapshot file holds both the questionnaire records and the
//! segmentation slot; every mutation rewrites it via tmp + rename.

use super::{QuestionnaireRecord, ReviewStore};
use crate::segment::PartitionResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};

const SNAPSHOT_FILE: &str = "review_store.json";

#[derive(Debug, Serialize, Deserialize, Default)]
struct ReviewStoreSnapshot {
    records: HashMap<String, QuestionnaireRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    segmentation: Option<PartitionResult>,
}

#[derive(Clone)]
pub struct FileReviewStore {
    path: PathBuf,
    records: Arc<RwLock<HashMap<String, QuestionnaireRecord>>>,
    segmentation: Arc<RwLock<Option<PartitionResult>>>,
    persist_lock: Arc<Mutex<()>>,
}

impl FileReviewStore {
    pub async fn new(base_dir: PathBuf) -> Result<Self, String> {
        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| format!("Failed to create review store dir: {}", e))?;
        let path = base_dir.join(SNAPSHOT_FILE);
        let snapshot = match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<ReviewStoreSnapshot>(&bytes) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!("Failed to parse review store {}: {}", path.display(), e);
                    ReviewStoreSnapshot::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                ReviewStoreSnapshot::default()
            }
            Err(err) => {
                tracing::warn!("Failed to read review store {}: {}", path.display(), err);
                ReviewStoreSnapshot::default()
            }
        };

        Ok(Self {
            path,
            records: Arc::new(RwLock::new(snapshot.records)),
            segmentation: Arc::new(RwLock::new(snapshot.segmentation)),
            persist_lock: Arc::new(Mutex::new(())),
        })
    }

    async fn persist(&self) -> Result<(), String> {
        let _guard = self.persist_lock.lock().await;
        let snapshot = ReviewStoreSnapshot {
            records: self.records.read().await.clone(),
            segmentation: self.segmentation.read().await.clone(),
        };
        let data = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| format!("Failed to serialize review store: {}", e))?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, data)
            .await
            .map_err(|e| format!("Failed to write review store: {}", e))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| format!("Failed to finalize review store: {}", e))?;
        Ok(())
    }
}

#[async_trait]
impl ReviewStore for FileReviewStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn upsert_record(&self, record: &QuestionnaireRecord) -> Result<(), String> {
        self.records
            .write()
            .await
            .insert(record.task_id.clone(), record.clone());
        self.persist().await
    }

    async fn get_record(&self, task_id: &str) -> Result<Option<QuestionnaireRecord>, String> {
        Ok(self.records.read().await.get(task_id).cloned())
    }

    async fn list_records(&self) -> Result<Vec<QuestionnaireRecord>, String> {
        let mut records: Vec<QuestionnaireRecord> =
            self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        Ok(records)
    }

    async fn clear_records(&self) -> Result<(), String> {
        self.records.write().await.clear();
        self.persist().await
    }

    async fn load_segmentation(&self) -> Result<Option<PartitionResult>, String> {
        Ok(self.segmentation.read().await.clone())
    }

    async fn save_segmentation(&self, segmentation: &PartitionResult) -> Result<(), String> {
        *self.segmentation.write().await = Some(segmentation.clone());
        self.persist().await
    }
}
