//! Task catalog: the manifest of audit report tasks under review.
//!
//! The manifest (`tasks.json`) is produced by the report scanner (see
//! [`scan`] and the `manifest-scan` binary) and consumed read-only by the
//! rest of the system.

pub mod scan;

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One audit report task.
///
/// All fields come from the manifest and are read-only to the rest of the
/// system. `level` holds a canonical severity tier when the scanner could
/// determine one; `risk_label` is the free-text risk grade lifted from the
/// report and is used as a fallback classification hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_label: Option<String>,
    pub path: String,
}

/// The scanner-produced task manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskManifest {
    pub generated_at: String,
    #[serde(default)]
    pub task_count: usize,
    pub tasks: Vec<Task>,
}

impl TaskManifest {
    /// Build a manifest from a task list, stamping `generated_at`.
    pub fn new(tasks: Vec<Task>, generated_at: String) -> Self {
        Self {
            generated_at,
            task_count: tasks.len(),
            tasks,
        }
    }

    /// Number of tasks, preferring the explicit count when present.
    pub fn len(&self) -> usize {
        if self.task_count > 0 {
            self.task_count
        } else {
            self.tasks.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Load and parse a manifest from disk.
pub fn load_manifest(path: &Path) -> Result<TaskManifest, CatalogError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| CatalogError::Parse {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_parses_scanner_output() {
        let raw = r#"{
            "generated_at": "2025-11-02T10:00:00",
            "task_count": 2,
            "tasks": [
                {
                    "id": "patient_regular_001",
                    "label": "patient_regular_001",
                    "type": "regular",
                    "level": "stable",
                    "risk_score": 22,
                    "risk_label": "低",
                    "path": "patient_regular_001/compliance_a/doctor_report.html"
                },
                {
                    "id": "patient_urgent_002",
                    "label": "patient_urgent_002",
                    "type": "urgent",
                    "level": null,
                    "risk_score": null,
                    "risk_label": null,
                    "path": "patient_urgent_002/compliance_b/doctor_report.html"
                }
            ]
        }"#;

        let manifest: TaskManifest = serde_json::from_str(raw).expect("manifest should parse");
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.tasks[0].level.as_deref(), Some("stable"));
        assert_eq!(manifest.tasks[1].level, None);
        assert_eq!(manifest.tasks[1].task_type, "urgent");
    }

    #[test]
    fn manifest_without_task_count_falls_back_to_list_length() {
        let raw = r#"{"generated_at": "2025-11-02T10:00:00", "tasks": []}"#;
        let manifest: TaskManifest = serde_json::from_str(raw).expect("manifest should parse");
        assert_eq!(manifest.len(), 0);
        assert!(manifest.is_empty());
    }

    #[test]
    fn load_manifest_missing_file_is_io_error() {
        let err = load_manifest(Path::new("/nonexistent/tasks.json"))
            .expect_err("missing file should fail");
        assert!(matches!(err, CatalogError::Io { .. }));
    }
}
