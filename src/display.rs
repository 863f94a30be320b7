//! Terminal presentation of the queue: progress lines, result export and the
//! pass summary

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::media;
use crate::pipeline::BoatInsights;
use crate::processing::PassSummary;
use crate::state::{ItemStatus, QueueEvent, QueueItem, QueueStats, QueueStore};

/// Turns queue events into one-line progress messages
#[derive(Debug, Default)]
pub struct ProgressRenderer {
    names: HashMap<String, String>,
}

impl ProgressRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The line to print for an event, if any
    pub fn render(&mut self, event: &QueueEvent) -> Option<String> {
        match event {
            QueueEvent::Added { id, name } => {
                self.names.insert(id.clone(), name.clone());
                Some(format!("➕ {} queued", name))
            }
            QueueEvent::Updated { id, status, logs } => {
                let name = self.names.get(id).map(String::as_str).unwrap_or(id.as_str());
                let latest = logs.last()?;
                Some(format!("{} {} [{}] {}", status_icon(*status), name, status, latest))
            }
            QueueEvent::Removed { id } => {
                let name = self.names.remove(id).unwrap_or_else(|| id.clone());
                Some(format!("🗑️  {} removed", name))
            }
            QueueEvent::Cleared { count } => {
                self.names.clear();
                Some(format!("🧹 Queue cleared ({} items)", count))
            }
        }
    }
}

fn status_icon(status: ItemStatus) -> &'static str {
    match status {
        ItemStatus::Ready => "⏳",
        ItemStatus::Analyzing => "🔍",
        ItemStatus::Generating => "🎨",
        ItemStatus::Verifying => "🧪",
        ItemStatus::Complete => "✅",
        ItemStatus::Error => "❌",
    }
}

/// Print progress for every store event until the task is aborted
pub fn spawn_progress(store: &QueueStore) -> JoinHandle<()> {
    let mut events = store.subscribe();
    tokio::spawn(async move {
        let mut renderer = ProgressRenderer::new();
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(line) = renderer.render(&event) {
                        info!("{}", line);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Progress display skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Sidecar report written next to each generated image
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemReport<'a> {
    source: &'a str,
    queued_at: DateTime<Utc>,
    summary: &'a str,
    prompt: &'a str,
    quality_report: &'a str,
    insights: &'a BoatInsights,
    logs: &'a [String],
}

/// Write the image and report of every completed item into `output_dir`.
///
/// Items sharing a file stem get numbered names (`boat`, `boat-2`, ...).
/// Returns the paths of the written images.
pub async fn export_results(items: &[QueueItem], output_dir: &Path) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut written = Vec::new();
    let mut used_stems = HashSet::new();

    for item in items {
        let Some(result) = item.result.as_ref() else {
            continue;
        };

        let stem = Path::new(&item.file.name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| item.id.clone());
        let stem = unique_stem(&mut used_stems, stem);

        let (mime_type, bytes) = media::decode_data_uri(&result.generated_image)
            .with_context(|| format!("Generated image for {} is not a valid data URI", item.file.name))?;

        let image_path = output_dir.join(format!("{}-on-water.{}", stem, media::extension_for_mime(&mime_type)));
        tokio::fs::write(&image_path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", image_path.display()))?;

        let report = ItemReport {
            source: &item.file.name,
            queued_at: item.created_at,
            summary: &result.summary,
            prompt: &result.prompt,
            quality_report: &result.quality_report,
            insights: &result.insights,
            logs: &item.logs,
        };
        let report_path = output_dir.join(format!("{}-report.json", stem));
        tokio::fs::write(&report_path, serde_json::to_string_pretty(&report)?)
            .await
            .with_context(|| format!("Failed to write {}", report_path.display()))?;

        info!("💾 Saved {}", image_path.display());
        written.push(image_path);
    }

    Ok(written)
}

fn unique_stem(used: &mut HashSet<String>, stem: String) -> String {
    let mut candidate = stem.clone();
    let mut counter = 2;
    while !used.insert(candidate.clone()) {
        candidate = format!("{}-{}", stem, counter);
        counter += 1;
    }
    candidate
}

/// Human readable end-of-pass report
pub fn summary_lines(summary: &PassSummary, stats: &QueueStats, failures: &[(String, String)]) -> Vec<String> {
    let success_rate = if summary.processed > 0 {
        summary.succeeded as f64 / summary.processed as f64 * 100.0
    } else {
        0.0
    };

    let mut lines = vec![
        format!("🎉 Pass completed in {:.2}s", summary.total_time.as_secs_f64()),
        format!("✅ Successful: {}", summary.succeeded),
        format!("❌ Failed: {}", summary.failed),
        format!("📊 Success rate: {:.1}%", success_rate),
        format!(
            "📋 Queue: {} total, {} ready, {} complete, {} failed",
            stats.total, stats.ready, stats.complete, stats.failed
        ),
    ];

    for (name, error) in failures {
        lines.push(format!("   {}: {}", name, error));
    }

    lines
}
