//! manifest-scan - Task Manifest Generator
//!
//! Walks a reports directory tree, classifies every report, and writes the
//! task manifest the server loads at startup.
//!
//! Usage: `manifest-scan [REPORTS_ROOT] [OUTPUT]`
//! Defaults: reports root `.`, output `<root>/web/tasks.json`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use review_desk::catalog::scan;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "review_desk=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let root = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    let out = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| root.join("web/tasks.json"));

    let manifest = scan::write_manifest(&root, &out)?;

    // Distribution summary, mirrored in the panel's stats endpoint.
    let mut levels: BTreeMap<&str, usize> = BTreeMap::new();
    let mut risk_labels: BTreeMap<&str, usize> = BTreeMap::new();
    let mut types: BTreeMap<&str, usize> = BTreeMap::new();
    for task in &manifest.tasks {
        if let Some(level) = task.level.as_deref() {
            *levels.entry(level).or_insert(0) += 1;
        }
        if let Some(label) = task.risk_label.as_deref() {
            *risk_labels.entry(label).or_insert(0) += 1;
        }
        *types.entry(&task.task_type).or_insert(0) += 1;
    }

    info!("Wrote {} tasks to {}", manifest.task_count, out.display());
    if !levels.is_empty() {
        info!("Levels: {:?}", levels);
    }
    if !risk_labels.is_empty() {
        info!("Risk labels: {:?}", risk_labels);
    }
    info!("Types: {:?}", types);

    Ok(())
}
