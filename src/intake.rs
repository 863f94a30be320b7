//! Upload intake: filters candidate files and creates queue items

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::media;
use crate::state::{QueueItem, QueueStore, SourceFile};

/// What happened to one intake batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntakeReport {
    /// Ids of the queue items created, in selection order
    pub accepted: Vec<String>,
    /// Names of files that were skipped for having an unsupported type
    pub dropped: Vec<String>,
}

/// Move every supported file out of `selection` into the queue.
///
/// The selection is always left empty so the same files can be picked again.
/// Unsupported files produce no item and no error.
pub async fn intake(store: &QueueStore, selection: &mut Vec<SourceFile>) -> IntakeReport {
    let mut report = IntakeReport::default();
    let mut items = Vec::new();

    for file in selection.drain(..) {
        if !media::is_supported_upload(&file.mime_type) {
            debug!("Skipping {} with unsupported type {}", file.name, file.mime_type);
            report.dropped.push(file.name);
            continue;
        }

        let preview = store.previews().create(&file);
        let item = QueueItem::new(file, preview);
        report.accepted.push(item.id.clone());
        items.push(item);
    }

    store.add(items).await;
    report
}

/// Read a local file into a `SourceFile`, declaring its type from the extension
pub async fn load_source_file(path: &Path) -> Result<SourceFile> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    Ok(SourceFile::new(name, media::mime_for_path(path), data))
}

/// Expand files and directories into a sorted list of file paths
pub fn collect_paths(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .follow_links(true)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .collect();
            found.sort();
            paths.extend(found);
        } else {
            paths.push(input.clone());
        }
    }

    paths
}
