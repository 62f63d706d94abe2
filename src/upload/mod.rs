//! Upload of questionnaire records to a GitHub repository.
//!
//! Records are written as JSON files through the contents API
//! (`PUT /repos/{owner}/{repo}/contents/{path}`), either as one bundle of
//! every saved record or one file per record. Successful uploads stamp the
//! stored records with `uploaded_at` and the API response.
//!
//! There is deliberately no retry or backoff here: a failed upload leaves
//! the records unstamped and the reviewer triggers the upload again.

use crate::store::{now_string, sanitize_filename, QuestionnaireRecord, ReviewStore};
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no saved questionnaires to upload")]
    NoRecords,

    #[error("GitHub API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("upload request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to build upload payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(String),
}

/// Where uploads land. All fields come from the environment (see `Config`).
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Directory inside the repository that receives the JSON files.
    pub storage_path: String,
    /// API endpoint, normally `https://api.github.com`.
    pub api_base: String,
}

/// What a successful upload produced.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
    pub bundle_id: Uuid,
    pub filename: String,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Local upload bookkeeping: how many records exist and how many carry an
/// upload stamp.
#[derive(Debug, Clone, Serialize)]
pub struct UploadStatus {
    pub total: usize,
    pub uploaded: usize,
    pub all_uploaded: bool,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: Option<ContentInfo>,
}

#[derive(Debug, Deserialize)]
struct ContentInfo {
    sha: String,
    html_url: Option<String>,
}

/// Replace characters GitHub paths and our filename scheme dislike.
fn sanitize_timestamp(timestamp: &str) -> String {
    timestamp.replace([':', '.'], "-")
}

fn bundle_filename(storage_path: &str, timestamp: &str) -> String {
    format!("{}/bundle_{}.json", storage_path, sanitize_timestamp(timestamp))
}

fn record_filename(storage_path: &str, timestamp: &str, task_id: &str) -> String {
    format!(
        "{}/{}_{}.json",
        storage_path,
        sanitize_timestamp(timestamp),
        sanitize_filename(task_id)
    )
}

/// The bundle body: upload time, count, and the records themselves.
fn bundle_payload(records: &[QuestionnaireRecord], uploaded_at: &str) -> serde_json::Value {
    serde_json::json!({
        "uploaded_at": uploaded_at,
        "count": records.len(),
        "records": records,
    })
}

/// Summarize local upload bookkeeping for the status endpoint.
pub async fn upload_status(store: &dyn ReviewStore) -> Result<UploadStatus, String> {
    let records = store.list_records().await?;
    let total = records.len();
    let uploaded = records.iter().filter(|r| r.uploaded_at.is_some()).count();
    Ok(UploadStatus {
        total,
        uploaded,
        all_uploaded: total > 0 && uploaded == total,
    })
}

/// GitHub contents API client.
pub struct GithubUploader {
    client: Client,
    config: UploadConfig,
}

impl GithubUploader {
    pub fn new(config: UploadConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn contents_url(&self, filename: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.owner,
            self.config.repo,
            filename
        )
    }

    async fn put_file(
        &self,
        filename: &str,
        content: &str,
        message: &str,
    ) -> Result<Option<ContentInfo>, UploadError> {
        let body = serde_json::json!({
            "message": message,
            "content": STANDARD.encode(content),
            "branch": self.config.branch,
        });

        let resp = self
            .client
            .put(self.contents_url(filename))
            .header("Authorization", format!("Bearer {}", self.config.token))
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", "review-desk")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(UploadError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ContentsResponse = serde_json::from_str(&text)?;
        Ok(parsed.content)
    }

    /// Upload every saved record as one bundle, then stamp the records.
    pub async fn upload_all(&self, store: &dyn ReviewStore) -> Result<UploadReceipt, UploadError> {
        let records = store.list_records().await.map_err(UploadError::Store)?;
        if records.is_empty() {
            return Err(UploadError::NoRecords);
        }

        let uploaded_at = now_string();
        let filename = bundle_filename(&self.config.storage_path, &uploaded_at);
        let payload = bundle_payload(&records, &uploaded_at);
        let content = serde_json::to_string_pretty(&payload)?;

        tracing::info!("Uploading {} questionnaires to {}", records.len(), filename);
        let info = self
            .put_file(
                &filename,
                &content,
                &format!("Add questionnaire data: {}", filename),
            )
            .await?;

        let bundle_id = Uuid::new_v4();
        let response = serde_json::json!({
            "bundle_id": bundle_id,
            "filename": filename,
            "sha": info.as_ref().map(|c| c.sha.clone()),
            "url": info.as_ref().and_then(|c| c.html_url.clone()),
        });

        for mut record in records.clone() {
            record.uploaded_at = Some(uploaded_at.clone());
            record.upload_response = Some(response.clone());
            store
                .upsert_record(&record)
                .await
                .map_err(UploadError::Store)?;
        }

        Ok(UploadReceipt {
            bundle_id,
            filename,
            count: records.len(),
            sha: info.as_ref().map(|c| c.sha.clone()),
            url: info.and_then(|c| c.html_url),
        })
    }

    /// Upload a single record as its own file. Does not stamp the store;
    /// the caller decides whether to persist the outcome.
    pub async fn upload_record(
        &self,
        record: &QuestionnaireRecord,
    ) -> Result<UploadReceipt, UploadError> {
        let uploaded_at = now_string();
        let filename = record_filename(&self.config.storage_path, &uploaded_at, &record.task_id);

        let mut stamped = record.clone();
        stamped.uploaded_at = Some(uploaded_at);
        let content = serde_json::to_string_pretty(&stamped)?;

        let info = self
            .put_file(
                &filename,
                &content,
                &format!("Add questionnaire data: {}", filename),
            )
            .await?;

        Ok(UploadReceipt {
            bundle_id: Uuid::new_v4(),
            filename,
            count: 1,
            sha: info.as_ref().map(|c| c.sha.clone()),
            url: info.and_then(|c| c.html_url),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryReviewStore;

    fn record(task_id: &str, uploaded: bool) -> QuestionnaireRecord {
        QuestionnaireRecord {
            task_id: task_id.to_string(),
            part: 1,
            task_type: Some("regular".to_string()),
            task_level: None,
            task_risk_label: None,
            task_path: None,
            saved_at: now_string(),
            uploaded_at: uploaded.then(now_string),
            upload_response: None,
            answers: serde_json::Map::new(),
        }
    }

    #[test]
    fn bundle_filename_sanitizes_the_timestamp() {
        let filename = bundle_filename("questionnaire_data", "2025-11-02T10:15:30.123+00:00");
        assert_eq!(
            filename,
            "questionnaire_data/bundle_2025-11-02T10-15-30-123+00-00.json"
        );
    }

    #[test]
    fn record_filename_sanitizes_the_task_id() {
        let filename = record_filename("data", "2025-11-02T10:15:30+00:00", "patient/001");
        assert_eq!(filename, "data/2025-11-02T10-15-30+00-00_patient_001.json");
    }

    #[test]
    fn bundle_payload_carries_count_and_records() {
        let records = vec![record("a", false), record("b", false)];
        let payload = bundle_payload(&records, "2025-11-02T10:00:00+00:00");
        assert_eq!(payload["count"], 2);
        assert_eq!(payload["uploaded_at"], "2025-11-02T10:00:00+00:00");
        assert_eq!(payload["records"][0]["task_id"], "a");
        assert_eq!(payload["records"][1]["task_id"], "b");
    }

    #[test]
    fn contents_url_joins_repo_and_path() {
        let uploader = GithubUploader::new(UploadConfig {
            token: "t".to_string(),
            owner: "acme".to_string(),
            repo: "audits".to_string(),
            branch: "main".to_string(),
            storage_path: "questionnaire_data".to_string(),
            api_base: "https://api.github.com/".to_string(),
        });
        assert_eq!(
            uploader.contents_url("questionnaire_data/bundle_x.json"),
            "https://api.github.com/repos/acme/audits/contents/questionnaire_data/bundle_x.json"
        );
    }

    #[tokio::test]
    async fn upload_all_refuses_an_empty_store() {
        let uploader = GithubUploader::new(UploadConfig {
            token: "t".to_string(),
            owner: "acme".to_string(),
            repo: "audits".to_string(),
            branch: "main".to_string(),
            storage_path: "data".to_string(),
            api_base: "https://api.github.com".to_string(),
        });
        let store = InMemoryReviewStore::new();
        let err = uploader
            .upload_all(&store)
            .await
            .expect_err("empty store must not upload");
        assert!(matches!(err, UploadError::NoRecords));
    }

    #[tokio::test]
    async fn upload_status_reflects_stamped_records() {
        let store = InMemoryReviewStore::new();
        let status = upload_status(&store).await.expect("status");
        assert_eq!((status.total, status.uploaded, status.all_uploaded), (0, 0, false));

        store.upsert_record(&record("a", true)).await.expect("upsert");
        store.upsert_record(&record("b", false)).await.expect("upsert");
        let status = upload_status(&store).await.expect("status");
        assert_eq!((status.total, status.uploaded, status.all_uploaded), (2, 1, false));

        store.upsert_record(&record("b", true)).await.expect("upsert");
        let status = upload_status(&store).await.expect("status");
        assert!(status.all_uploaded);
    }
}
