//! Segmentation of the task catalog into balanced reviewer parts.
//!
//! The split is stratified: tasks are grouped by severity tier (or, failing
//! that, by task type) and each group is distributed round-robin across the
//! parts, then part sizes are rebalanced so no two parts differ by more than
//! one task. The whole computation is deterministic: the same task list and
//! part count always produce the same assignment, regardless of input order.

pub mod service;

use crate::catalog::Task;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("parts count must be at least 1, got {0}")]
    InvalidPartsCount(usize),
}

/// Canonical severity tiers, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Urgent,
    Watch,
    Stable,
}

impl Severity {
    /// Position in the canonical tier order (urgent < watch < stable).
    pub fn rank(self) -> usize {
        match self {
            Severity::Urgent => 0,
            Severity::Watch => 1,
            Severity::Stable => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Urgent => "urgent",
            Severity::Watch => "watch",
            Severity::Stable => "stable",
        }
    }

    /// Parse a tier name. Accepts the canonical names and the legacy
    /// manifest labels (紧急级/关注级/稳定级).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "urgent" | "紧急级" => Some(Severity::Urgent),
            "watch" | "关注级" => Some(Severity::Watch),
            "stable" | "稳定级" => Some(Severity::Stable),
            _ => None,
        }
    }

    /// Infer a tier from free-text risk wording. Recognises the high /
    /// medium / low keywords in both the report language (高/中/低) and
    /// English, checked highest first.
    pub fn from_risk_text(text: &str) -> Option<Self> {
        let lowered = text.to_lowercase();
        if lowered.contains('高') || lowered.contains("high") {
            return Some(Severity::Urgent);
        }
        if lowered.contains('中') || lowered.contains("medium") {
            return Some(Severity::Watch);
        }
        if lowered.contains('低') || lowered.contains("low") {
            return Some(Severity::Stable);
        }
        None
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolved grouping key of a task.
///
/// Resolution order: the task's `level` (parsed as a tier), then a tier
/// inferred from `risk_label`, then the task `type`, then `unknown`.
/// Non-tier keys sort after all canonical tiers; their relative order is
/// decided only by the secondary id sort.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Tier(Severity),
    Custom(String),
    Unknown,
}

impl GroupKey {
    pub fn resolve(task: &Task) -> Self {
        if let Some(level) = task.level.as_deref().filter(|s| !s.trim().is_empty()) {
            return match Severity::parse(level) {
                Some(tier) => GroupKey::Tier(tier),
                None => GroupKey::Custom(level.trim().to_string()),
            };
        }
        if let Some(tier) = task.risk_label.as_deref().and_then(Severity::from_risk_text) {
            return GroupKey::Tier(tier);
        }
        match task.task_type.trim() {
            "" | "unknown" => GroupKey::Unknown,
            kind => match Severity::parse(kind) {
                Some(tier) => GroupKey::Tier(tier),
                None => GroupKey::Custom(kind.to_string()),
            },
        }
    }

    /// Sort rank: canonical tiers first, everything else after.
    pub fn rank(&self) -> usize {
        match self {
            GroupKey::Tier(tier) => tier.rank(),
            GroupKey::Custom(_) | GroupKey::Unknown => 3,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            GroupKey::Tier(tier) => tier.as_str(),
            GroupKey::Custom(key) => key,
            GroupKey::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A computed segmentation: `parts_count` ordered groups plus distribution
/// totals. Persisted wholesale to the store's segmentation slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionResult {
    pub parts: Vec<Vec<Task>>,
    pub totals: BTreeMap<String, usize>,
    pub total: usize,
}

impl PartitionResult {
    /// The tasks of one part, addressed by 1-based index (the index shown
    /// to reviewers and stamped on questionnaire records).
    pub fn part(&self, number: usize) -> Option<&[Task]> {
        if number == 0 {
            return None;
        }
        self.parts.get(number - 1).map(|p| p.as_slice())
    }
}

/// Distribution summary by grouping key, independent of any segmentation.
pub fn totals_by_key(tasks: &[Task]) -> BTreeMap<String, usize> {
    let mut totals = BTreeMap::new();
    for task in tasks {
        *totals
            .entry(GroupKey::resolve(task).label().to_string())
            .or_insert(0) += 1;
    }
    totals
}

/// Split `tasks` into `parts_count` balanced parts.
///
/// Three phases: a stable sort by (tier rank, id), a per-key round-robin
/// distribution, and a global size rebalance. The result covers every input
/// task exactly once and part sizes never differ by more than one. The
/// rebalance moves the last-appended task of an oversized part to the first
/// undersized one, which can shift a task across tiers; overall size
/// equality wins over strict per-key proportionality at the margins.
///
/// The input slice is never mutated. `parts_count` of zero is an error;
/// every other input (empty list, more parts than tasks) yields a
/// well-formed result.
pub fn partition(tasks: &[Task], parts_count: usize) -> Result<PartitionResult, SegmentError> {
    if parts_count == 0 {
        return Err(SegmentError::InvalidPartsCount(parts_count));
    }

    // Phase A: stable order by (tier rank, id). Makes the output
    // reproducible regardless of input order.
    let mut sorted: Vec<(GroupKey, &Task)> =
        tasks.iter().map(|t| (GroupKey::resolve(t), t)).collect();
    sorted.sort_by(|(ka, a), (kb, b)| ka.rank().cmp(&kb.rank()).then_with(|| a.id.cmp(&b.id)));

    // Group into key buckets, preserving first-appearance order from the
    // sorted list so bucket contents stay in stable order.
    let mut bucket_of: HashMap<String, usize> = HashMap::new();
    let mut buckets: Vec<(String, Vec<&Task>)> = Vec::new();
    for (key, task) in &sorted {
        let label = key.label().to_string();
        let idx = match bucket_of.get(&label) {
            Some(&idx) => idx,
            None => {
                buckets.push((label.clone(), Vec::new()));
                bucket_of.insert(label, buckets.len() - 1);
                buckets.len() - 1
            }
        };
        buckets[idx].1.push(*task);
    }

    // Phase B: per-key round-robin. The first `remainder` parts in array
    // order each take one extra item.
    let mut parts: Vec<Vec<Task>> = vec![Vec::new(); parts_count];
    let mut totals = BTreeMap::new();
    for (label, items) in &buckets {
        totals.insert(label.clone(), items.len());
        let base = items.len() / parts_count;
        let mut remainder = items.len() % parts_count;
        let mut drain = items.iter();
        for part in parts.iter_mut() {
            let take = base + usize::from(remainder > 0);
            remainder = remainder.saturating_sub(1);
            for task in drain.by_ref().take(take) {
                part.push((*task).clone());
            }
        }
    }

    // Phase C: rebalance to the global targets. Each move strictly shrinks
    // an over-target part and fills an under-target one, so this terminates.
    let total = tasks.len();
    let desired = total / parts_count;
    let remainder = total % parts_count;
    let targets: Vec<usize> = (0..parts_count)
        .map(|i| desired + usize::from(i < remainder))
        .collect();

    for p in 0..parts_count {
        while parts[p].len() > targets[p] {
            let Some(task) = parts[p].pop() else {
                break;
            };
            let dest = (0..parts_count)
                .find(|&q| parts[q].len() < targets[q])
                .unwrap_or(0);
            parts[dest].push(task);
        }
    }

    Ok(PartitionResult {
        parts,
        totals,
        total,
    })
}
