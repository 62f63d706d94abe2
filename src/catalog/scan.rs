//! Report scanner: builds the task manifest from a reports directory tree.
//!
//! Layout expected under the reports root:
//!
//! ```text
//! patient_<kind>_<nnn>/compliance_<...>/doctor_report.html
//! ```
//!
//! Each report HTML is probed for a severity tier (urgency banner CSS class,
//! then visible tier label or status emoji, then risk-label keywords, then
//! risk-score thresholds). An optional `task_levels.json` map at the root
//! overrides detection per task id.

use super::{Task, TaskManifest};
use crate::segment::Severity;
use chrono::{SecondsFormat, Utc};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

const REPORT_FILE: &str = "doctor_report.html";
const LEVELS_FILE: &str = "task_levels.json";

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("reports root {0} is not a directory")]
    NotADirectory(String),

    #[error("failed to scan reports: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid scanner pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("failed to write manifest: {0}")]
    Write(#[from] serde_json::Error),
}

/// Compiled detection patterns for report HTML.
pub struct ReportScanner {
    banner_class: Regex,
    risk_score: Regex,
    risk_label: Regex,
}

impl ReportScanner {
    pub fn new() -> Result<Self, ScanError> {
        Ok(Self {
            banner_class: Regex::new(r#"(?i)class\s*=\s*"([^"]*urgency-banner[^"]*)""#)?,
            risk_score: Regex::new(r"风险评分[:：]\s*(\d+)\s*/\s*100")?,
            risk_label: Regex::new(r"风险等级[:：]\s*([\p{Han}A-Za-z]+)")?,
        })
    }

    /// Risk score out of 100, when the report prints one.
    pub fn detect_risk_score(&self, html: &str) -> Option<i64> {
        self.risk_score
            .captures(html)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Free-text risk grade printed next to the score.
    pub fn detect_risk_label(&self, html: &str) -> Option<String> {
        self.risk_label
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
    }

    /// Severity tier, by detection precedence.
    pub fn detect_level(
        &self,
        html: &str,
        risk_score: Option<i64>,
        risk_label: Option<&str>,
    ) -> Option<Severity> {
        // 1) CSS class on the urgency banner
        if let Some(classes) = self
            .banner_class
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_lowercase())
        {
            let classes: Vec<&str> = classes.split_whitespace().collect();
            if classes.contains(&"urgency-urgent") {
                return Some(Severity::Urgent);
            }
            if ["urgency-attention", "urgency-warning", "urgency-yellow"]
                .iter()
                .any(|c| classes.contains(c))
            {
                return Some(Severity::Watch);
            }
            if ["urgency-stable", "urgency-green", "urgency-normal", "urgency-low"]
                .iter()
                .any(|c| classes.contains(c))
            {
                return Some(Severity::Stable);
            }
        }

        // 2) Visible tier labels / status emojis
        if html.contains("紧急级") || html.contains('🔴') {
            return Some(Severity::Urgent);
        }
        if html.contains("关注级") || html.contains('🟡') {
            return Some(Severity::Watch);
        }
        if html.contains("稳定级") || html.contains('🟢') {
            return Some(Severity::Stable);
        }

        // 3) Risk label keywords
        if let Some(tier) = risk_label.and_then(Severity::from_risk_text) {
            return Some(tier);
        }

        // 4) Risk score thresholds
        if let Some(score) = risk_score {
            return Some(if score >= 60 {
                Severity::Urgent
            } else if score >= 40 {
                Severity::Watch
            } else {
                Severity::Stable
            });
        }

        None
    }
}

/// Infer the task type from its directory name.
fn infer_type(dir_name: &str) -> &'static str {
    if dir_name.contains("regular") {
        "regular"
    } else if dir_name.contains("urgent") {
        "urgent"
    } else {
        "unknown"
    }
}

/// Per-task tier overrides from `task_levels.json`, when present.
fn load_levels_map(root: &Path) -> HashMap<String, String> {
    let path = root.join(LEVELS_FILE);
    if !path.exists() {
        return HashMap::new();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", path.display(), e);
                HashMap::new()
            }
        },
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", path.display(), e);
            HashMap::new()
        }
    }
}

/// Find the report HTML for one task directory: `compliance_*/` first, then
/// anywhere below the task directory.
fn find_report(task_dir: &Path) -> Option<PathBuf> {
    let mut compliance_dirs: Vec<PathBuf> = std::fs::read_dir(task_dir)
        .ok()?
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.is_dir()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("compliance_"))
        })
        .collect();
    compliance_dirs.sort();

    for dir in compliance_dirs {
        let candidate = dir.join(REPORT_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    WalkDir::new(task_dir)
        .sort_by_file_name()
        .into_iter()
        .flatten()
        .find(|e| e.file_type().is_file() && e.file_name().to_str() == Some(REPORT_FILE))
        .map(|e| e.into_path())
}

/// Walk the reports root and build the manifest.
///
/// Task directories are `patient_*` children of the root, visited in name
/// order. Directories without a report file are skipped.
pub fn scan_reports(root: &Path) -> Result<TaskManifest, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.display().to_string()));
    }

    let scanner = ReportScanner::new()?;
    let levels_map = load_levels_map(root);

    let mut task_dirs: Vec<PathBuf> = std::fs::read_dir(root)?
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.is_dir()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("patient_"))
        })
        .collect();
    task_dirs.sort();

    let mut tasks = Vec::new();
    for dir in task_dirs {
        let Some(dir_name) = dir.file_name().and_then(|n| n.to_str()).map(String::from) else {
            continue;
        };
        let Some(report) = find_report(&dir) else {
            tracing::debug!("No {} under {}, skipping", REPORT_FILE, dir.display());
            continue;
        };

        let html = match std::fs::read_to_string(&report) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", report.display(), e);
                String::new()
            }
        };

        let risk_score = scanner.detect_risk_score(&html);
        let risk_label = scanner.detect_risk_label(&html);
        let level = match levels_map.get(&dir_name) {
            Some(level) => Some(level.clone()),
            None => scanner
                .detect_level(&html, risk_score, risk_label.as_deref())
                .map(|tier| tier.as_str().to_string()),
        };

        let rel_path = report
            .strip_prefix(root)
            .unwrap_or(report.as_path())
            .to_string_lossy()
            .replace('\\', "/");

        tasks.push(Task {
            id: dir_name.clone(),
            label: dir_name.clone(),
            task_type: infer_type(&dir_name).to_string(),
            level,
            risk_score,
            risk_label,
            path: rel_path,
        });
    }

    Ok(TaskManifest::new(
        tasks,
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    ))
}

/// Scan and write the manifest JSON to `out`.
pub fn write_manifest(root: &Path, out: &Path) -> Result<TaskManifest, ScanError> {
    let manifest = scan_reports(root)?;
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_vec_pretty(&manifest)?;
    std::fs::write(out, data)?;
    tracing::info!("Wrote {} tasks to {}", manifest.task_count, out.display());
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> ReportScanner {
        ReportScanner::new().expect("patterns compile")
    }

    #[test]
    fn banner_class_beats_everything_else() {
        let html = r#"<div class="urgency-banner urgency-stable">稳定级</div> 紧急级 🔴"#;
        assert_eq!(
            scanner().detect_level(html, Some(90), Some("高")),
            Some(Severity::Stable)
        );
    }

    #[test]
    fn visible_label_is_the_second_choice() {
        let html = "<p>当前状态：关注级</p>";
        assert_eq!(scanner().detect_level(html, None, None), Some(Severity::Watch));
        assert_eq!(scanner().detect_level("🟢 正常", None, None), Some(Severity::Stable));
    }

    #[test]
    fn risk_label_keywords_are_the_third_choice() {
        assert_eq!(
            scanner().detect_level("<p>nothing here</p>", None, Some("高")),
            Some(Severity::Urgent)
        );
    }

    #[test]
    fn risk_score_thresholds_are_the_last_resort() {
        let s = scanner();
        assert_eq!(s.detect_level("", Some(72), None), Some(Severity::Urgent));
        assert_eq!(s.detect_level("", Some(45), None), Some(Severity::Watch));
        assert_eq!(s.detect_level("", Some(12), None), Some(Severity::Stable));
        assert_eq!(s.detect_level("", None, None), None);
    }

    #[test]
    fn risk_score_and_label_extraction() {
        let html = "<p>风险评分: 67 / 100</p><p>风险等级：中</p>";
        let s = scanner();
        assert_eq!(s.detect_risk_score(html), Some(67));
        assert_eq!(s.detect_risk_label(html), Some("中".to_string()));
    }

    #[test]
    fn type_comes_from_the_directory_name() {
        assert_eq!(infer_type("patient_regular_001"), "regular");
        assert_eq!(infer_type("patient_urgent_007"), "urgent");
        assert_eq!(infer_type("patient_misc_003"), "unknown");
    }

    #[test]
    fn scan_builds_a_manifest_from_a_reports_tree() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();

        let a = root.join("patient_urgent_001/compliance_a");
        std::fs::create_dir_all(&a).expect("mkdir");
        std::fs::write(
            a.join(REPORT_FILE),
            r#"<div class="urgency-banner urgency-urgent"></div>风险评分: 80 / 100 风险等级：高"#,
        )
        .expect("write report");

        let b = root.join("patient_regular_002/compliance_b");
        std::fs::create_dir_all(&b).expect("mkdir");
        std::fs::write(b.join(REPORT_FILE), "风险评分: 20 / 100").expect("write report");

        // no report file: skipped
        std::fs::create_dir_all(root.join("patient_regular_003")).expect("mkdir");
        // not a task dir: ignored
        std::fs::create_dir_all(root.join("assets")).expect("mkdir");

        let manifest = scan_reports(root).expect("scan");
        assert_eq!(manifest.task_count, 2);

        let urgent = &manifest.tasks[1];
        assert_eq!(urgent.id, "patient_urgent_001");
        assert_eq!(urgent.task_type, "urgent");
        assert_eq!(urgent.level.as_deref(), Some("urgent"));
        assert_eq!(urgent.risk_score, Some(80));
        assert_eq!(urgent.risk_label.as_deref(), Some("高"));
        assert_eq!(
            urgent.path,
            "patient_urgent_001/compliance_a/doctor_report.html"
        );

        let regular = &manifest.tasks[0];
        assert_eq!(regular.id, "patient_regular_002");
        assert_eq!(regular.level.as_deref(), Some("stable"));
    }

    #[test]
    fn levels_file_overrides_detection() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();

        let a = root.join("patient_urgent_001/compliance_a");
        std::fs::create_dir_all(&a).expect("mkdir");
        std::fs::write(a.join(REPORT_FILE), "风险评分: 95 / 100").expect("write report");
        std::fs::write(
            root.join(LEVELS_FILE),
            r#"{"patient_urgent_001": "watch"}"#,
        )
        .expect("write levels");

        let manifest = scan_reports(root).expect("scan");
        assert_eq!(manifest.tasks[0].level.as_deref(), Some("watch"));
    }
}
