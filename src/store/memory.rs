//! In-memory review store (non-persistent).

use super::{QuestionnaireRecord, ReviewStore};
use crate::segment::PartitionResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct InMemoryReviewStore {
    records: Arc<RwLock<HashMap<String, QuestionnaireRecord>>>,
    segmentation: Arc<RwLock<Option<PartitionResult>>>,
}

impl InMemoryReviewStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            segmentation: Arc::new(RwLock::new(None)),
        }
    }
}

impl Default for InMemoryReviewStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReviewStore for InMemoryReviewStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn upsert_record(&self, record: &QuestionnaireRecord) -> Result<(), String> {
        self.records
            .write()
            .await
            .insert(record.task_id.clone(), record.clone());
        Ok(())
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
        Ok(())
    }

    async fn load_segmentation(&self) -> Result<Option<PartitionResult>, String> {
        Ok(self.segmentation.read().await.clone())
    }

    async fn save_segmentation(&self, segmentation: &PartitionResult) -> Result<(), String> {
        *self.segmentation.write().await = Some(segmentation.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::record;

    #[tokio::test]
    async fn upsert_replaces_by_task_id() {
        let store = InMemoryReviewStore::new();
        let mut rec = record("patient_001", 1);
        store.upsert_record(&rec).await.expect("upsert");

        rec.part = 3;
        store.upsert_record(&rec).await.expect("upsert again");

        let records = store.list_records().await.expect("list");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].part, 3);
    }

    #[tokio::test]
    async fn list_is_ordered_by_task_id() {
        let store = InMemoryReviewStore::new();
        for id in ["patient_b", "patient_a", "patient_c"] {
            store.upsert_record(&record(id, 1)).await.expect("upsert");
        }
        let ids: Vec<String> = store
            .list_records()
            .await
            .expect("list")
            .into_iter()
            .map(|r| r.task_id)
            .collect();
        assert_eq!(ids, vec!["patient_a", "patient_b", "patient_c"]);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let store = InMemoryReviewStore::new();
        store
            .upsert_record(&record("patient_001", 1))
            .await
            .expect("upsert");
        store.clear_records().await.expect("clear");
        assert!(store.list_records().await.expect("list").is_empty());
        assert!(store
            .get_record("patient_001")
            .await
            .expect("get")
            .is_none());
    }
}
