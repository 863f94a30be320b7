use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::pipeline::ProcessedResult;

const EVENT_CAPACITY: usize = 256;

/// An uploaded image owned by a queue item
#[derive(Clone)]
pub struct SourceFile {
    pub name: String,
    /// Declared MIME type, as reported by the file source
    pub mime_type: String,
    pub data: Arc<[u8]>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// Processing status of a queue item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[serde(alias = "idle")]
    Ready,
    Analyzing,
    Generating,
    Verifying,
    Complete,
    Error,
}

impl ItemStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Complete | ItemStatus::Error)
    }

    /// Items in this status are picked up by the next orchestrator pass
    pub fn is_eligible(&self) -> bool {
        matches!(self, ItemStatus::Ready)
    }

    /// Forward-only transitions; `Error` is reachable from any non-terminal status.
    /// Terminal statuses accept nothing, not even themselves, so an attached
    /// result or error is never replaced.
    pub fn can_transition_to(&self, next: ItemStatus) -> bool {
        if *self == next {
            return !self.is_terminal();
        }
        match (self, next) {
            (from, ItemStatus::Error) => !from.is_terminal(),
            (ItemStatus::Ready, ItemStatus::Analyzing)
            | (ItemStatus::Analyzing, ItemStatus::Generating)
            | (ItemStatus::Generating, ItemStatus::Verifying)
            | (ItemStatus::Verifying, ItemStatus::Complete) => true,
            _ => false,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ItemStatus::Ready => "ready",
            ItemStatus::Analyzing => "analyzing",
            ItemStatus::Generating => "generating",
            ItemStatus::Verifying => "verifying",
            ItemStatus::Complete => "complete",
            ItemStatus::Error => "error",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Revocable reference to a locally previewable copy of a source file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewHandle(String);


/// Tracks live preview handles so they can be released with their items
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    live: Arc<Mutex<HashMap<String, Arc<[u8]>>>>,
}

impl PreviewRegistry {
    pub fn create(&self, file: &SourceFile) -> PreviewHandle {
        let handle = PreviewHandle(format!("preview://{}", uuid::Uuid::new_v4()));
        self.lock().insert(handle.0.clone(), Arc::clone(&file.data));
        handle
    }

    /// Bytes behind a handle, if it has not been revoked
    pub fn resolve(&self, handle: &PreviewHandle) -> Option<Arc<[u8]>> {
        self.lock().get(&handle.0).cloned()
    }

    pub fn revoke(&self, handle: &PreviewHandle) -> bool {
        self.lock().remove(&handle.0).is_some()
    }

    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<[u8]>>> {
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One uploaded photo and everything that happened to it
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub id: String,
    pub file: SourceFile,
    pub preview: PreviewHandle,
    pub status: ItemStatus,
    /// Append-only, in order of occurrence
    pub logs: Vec<String>,
    /// Present exactly when `status` is `Complete`
    pub result: Option<ProcessedResult>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl QueueItem {
    pub fn new(file: SourceFile, preview: PreviewHandle) -> Self {
        let initial_log = format!("Queued {} ({} KB)", file.name, file.size().div_ceil(1024));
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file,
            preview,
            status: ItemStatus::Ready,
            logs: vec![initial_log],
            result: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Merge an update into this item. Logs are always appended; the status
    /// change and the result/error that ride along with it are dropped when the
    /// transition is not allowed. Returns whether the status change applied.
    fn apply(&mut self, update: ItemUpdate) -> bool {
        self.logs.extend(update.logs);

        let Some(next) = update.status else {
            return true;
        };

        if !self.status.can_transition_to(next) {
            warn!("Refusing transition {} -> {} for item {}", self.status, next, self.id);
            return false;
        }

        match next {
            ItemStatus::Complete => {
                let Some(result) = update.result else {
                    warn!("Refusing to complete item {} without a result", self.id);
                    return false;
                };
                self.result = Some(result);
                self.error = None;
            }
            ItemStatus::Error => {
                self.result = None;
                self.error = Some(update.error.unwrap_or_else(|| "Unknown error".to_string()));
            }
            _ => {
                self.result = None;
            }
        }

        self.status = next;
        true
    }
}

/// Partial update for a queue item
#[derive(Debug, Clone, Default)]
pub struct ItemUpdate {
    pub status: Option<ItemStatus>,
    pub logs: Vec<String>,
    pub result: Option<ProcessedResult>,
    pub error: Option<String>,
}

impl ItemUpdate {
    pub fn status(status: ItemStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn log_only(message: impl Into<String>) -> Self {
        Self::default().log(message)
    }

    pub fn log(mut self, message: impl Into<String>) -> Self {
        self.logs.push(message.into());
        self
    }

    pub fn with_result(mut self, result: ProcessedResult) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Change notifications for whatever renders the queue
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QueueEvent {
    Added { id: String, name: String },
    Updated { id: String, status: ItemStatus, logs: Vec<String> },
    Removed { id: String },
    Cleared { count: usize },
}

/// Ordered queue of items: the single source of truth for rendering
#[derive(Debug, Clone)]
pub struct QueueStore {
    items: Arc<RwLock<Vec<QueueItem>>>,
    previews: PreviewRegistry,
    events: broadcast::Sender<QueueEvent>,
}

impl Default for QueueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            items: Arc::new(RwLock::new(Vec::new())),
            previews: PreviewRegistry::default(),
            events,
        }
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    /// Append items in order
    pub async fn add(&self, new_items: Vec<QueueItem>) {
        if new_items.is_empty() {
            return;
        }

        let mut items = self.items.write().await;
        for item in new_items {
            debug!("➕ Queued {} as {}", item.file.name, item.id);
            self.emit(QueueEvent::Added {
                id: item.id.clone(),
                name: item.file.name.clone(),
            });
            items.push(item);
        }
    }

    /// Remove an item and release its preview. Unknown ids are a no-op.
    pub async fn remove(&self, id: &str) -> bool {
        let removed = {
            let mut items = self.items.write().await;
            items
                .iter()
                .position(|item| item.id == id)
                .map(|index| items.remove(index))
        };

        match removed {
            Some(item) => {
                self.previews.revoke(&item.preview);
                self.emit(QueueEvent::Removed { id: item.id });
                true
            }
            None => false,
        }
    }

    /// Remove everything and release all previews
    pub async fn clear(&self) -> usize {
        let drained: Vec<QueueItem> = self.items.write().await.drain(..).collect();
        for item in &drained {
            self.previews.revoke(&item.preview);
        }

        if !drained.is_empty() {
            info!("🧹 Cleared {} queue items", drained.len());
        }
        self.emit(QueueEvent::Cleared { count: drained.len() });
        drained.len()
    }

    /// Merge a partial update into an item. Returns false when the id is unknown.
    pub async fn update(&self, id: &str, update: ItemUpdate) -> bool {
        let mut items = self.items.write().await;
        let Some(item) = items.iter_mut().find(|item| item.id == id) else {
            debug!("Ignoring update for unknown item {}", id);
            return false;
        };

        let appended = update.logs.clone();
        item.apply(update);

        self.emit(QueueEvent::Updated {
            id: item.id.clone(),
            status: item.status,
            logs: appended,
        });
        true
    }

    pub async fn get(&self, id: &str) -> Option<QueueItem> {
        self.items.read().await.iter().find(|item| item.id == id).cloned()
    }

    pub async fn snapshot(&self) -> Vec<QueueItem> {
        self.items.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Ids of items a pass would pick up, in queue order
    pub async fn eligible_ids(&self) -> Vec<String> {
        self.items
            .read()
            .await
            .iter()
            .filter(|item| item.status.is_eligible())
            .map(|item| item.id.clone())
            .collect()
    }

    pub async fn statistics(&self) -> QueueStats {
        let items = self.items.read().await;
        let mut stats = QueueStats {
            total: items.len(),
            ..QueueStats::default()
        };

        for item in items.iter() {
            match item.status {
                ItemStatus::Ready => stats.ready += 1,
                ItemStatus::Complete => stats.complete += 1,
                ItemStatus::Error => stats.failed += 1,
                _ => stats.in_progress += 1,
            }
        }

        stats
    }

    fn emit(&self, event: QueueEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Queue counters by status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: usize,
    pub ready: usize,
    pub in_progress: usize,
    pub complete: usize,
    pub failed: usize,
}
