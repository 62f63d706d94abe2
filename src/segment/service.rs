//! Persistence wrapper over the pure partitioning core.
//!
//! `ensure` and `recompute` both fully recompute from the task list and
//! overwrite the store's segmentation slot; there is no caching keyed by
//! input. They exist as separate entry points because the panel calls them
//! at different moments (page load vs the explicit reshuffle action).

use super::{partition, PartitionResult, SegmentError};
use crate::catalog::Task;
use crate::store::ReviewStore;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SegmentServiceError {
    #[error(transparent)]
    Invalid(#[from] SegmentError),

    #[error("failed to persist segmentation: {0}")]
    Store(String),
}

/// Derives the current segmentation and keeps the store slot up to date.
#[derive(Debug, Clone, Copy)]
pub struct Segmenter {
    parts_count: usize,
}

impl Segmenter {
    pub fn new(parts_count: usize) -> Self {
        Self { parts_count }
    }

    pub fn parts_count(&self) -> usize {
        self.parts_count
    }

    /// Derive the current segmentation and persist it.
    pub async fn ensure(
        &self,
        tasks: &[Task],
        store: &dyn ReviewStore,
    ) -> Result<PartitionResult, SegmentServiceError> {
        self.split_and_save(tasks, store).await
    }

    /// Force a fresh segmentation and persist it.
    pub async fn recompute(
        &self,
        tasks: &[Task],
        store: &dyn ReviewStore,
    ) -> Result<PartitionResult, SegmentServiceError> {
        self.split_and_save(tasks, store).await
    }

    async fn split_and_save(
        &self,
        tasks: &[Task],
        store: &dyn ReviewStore,
    ) -> Result<PartitionResult, SegmentServiceError> {
        let result = partition(tasks, self.parts_count)?;
        store
            .save_segmentation(&result)
            .await
            .map_err(SegmentServiceError::Store)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryReviewStore, ReviewStore};

    fn task(id: &str, level: &str) -> Task {
        Task {
            id: id.to_string(),
            label: id.to_string(),
            task_type: "regular".to_string(),
            level: Some(level.to_string()),
            risk_score: None,
            risk_label: None,
            path: format!("{}/doctor_report.html", id),
        }
    }

    #[tokio::test]
    async fn ensure_persists_the_result() {
        let store = InMemoryReviewStore::new();
        let tasks = vec![task("a", "urgent"), task("b", "stable")];

        let segmenter = Segmenter::new(2);
        let result = segmenter.ensure(&tasks, &store).await.expect("ensure");

        let saved = store
            .load_segmentation()
            .await
            .expect("load")
            .expect("slot populated");
        assert_eq!(saved, result);
    }

    #[tokio::test]
    async fn recompute_overwrites_the_slot_wholesale() {
        let store = InMemoryReviewStore::new();
        let segmenter = Segmenter::new(2);

        let first = vec![task("a", "urgent")];
        segmenter.ensure(&first, &store).await.expect("ensure");

        let second = vec![task("a", "urgent"), task("b", "watch"), task("c", "stable")];
        let result = segmenter.recompute(&second, &store).await.expect("recompute");

        let saved = store
            .load_segmentation()
            .await
            .expect("load")
            .expect("slot populated");
        assert_eq!(saved, result);
        assert_eq!(saved.total, 3);
    }

    #[tokio::test]
    async fn invalid_parts_count_does_not_touch_the_store() {
        let store = InMemoryReviewStore::new();
        let segmenter = Segmenter::new(0);

        let err = segmenter
            .ensure(&[task("a", "urgent")], &store)
            .await
            .expect_err("zero parts is invalid");
        assert!(matches!(err, SegmentServiceError::Invalid(_)));
        assert!(store.load_segmentation().await.expect("load").is_none());
    }
}
