use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::ClientError;
use crate::pipeline::ProcessedResult;
use crate::state::{ItemStatus, ItemUpdate, QueueStore, SourceFile};
use crate::style::StyleParams;

/// Where the orchestrator sends each item
#[async_trait]
pub trait ProcessingEndpoint: Send + Sync {
    async fn process(&self, file: &SourceFile, style: &StyleParams) -> Result<ProcessedResult, ClientError>;
}

/// Counters for one finished pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_time: Duration,
}

/// Result of asking the orchestrator to run
#[derive(Debug, Clone, PartialEq)]
pub enum PassOutcome {
    /// Another pass holds the claim; nothing was touched
    AlreadyRunning,
    /// No item was `ready`
    NothingToProcess,
    Finished(PassSummary),
}

/// Sequential queue processor.
///
/// At most one pass runs at a time: a pass owns the guard for its whole
/// duration and concurrent callers get `AlreadyRunning` back.
#[derive(Clone)]
pub struct Orchestrator {
    store: QueueStore,
    endpoint: Arc<dyn ProcessingEndpoint>,
    active: Arc<Mutex<()>>,
}

impl Orchestrator {
    pub fn new(store: QueueStore, endpoint: Arc<dyn ProcessingEndpoint>) -> Self {
        Self {
            store,
            endpoint,
            active: Arc::new(Mutex::new(())),
        }
    }

    pub fn store(&self) -> &QueueStore {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.active.try_lock().is_err()
    }

    /// Process every item that is `ready` when the pass starts, in queue order.
    ///
    /// `style` is the snapshot applied to all items of this pass.
    pub async fn run_pass(&self, style: StyleParams) -> PassOutcome {
        let Ok(_claim) = Arc::clone(&self.active).try_lock_owned() else {
            warn!("A processing pass is already running");
            return PassOutcome::AlreadyRunning;
        };

        let pending = self.store.eligible_ids().await;
        if pending.is_empty() {
            info!("Nothing to process");
            return PassOutcome::NothingToProcess;
        }

        let start_time = Instant::now();
        let total = pending.len();
        info!("🚀 Starting pass over {} items", total);

        let mut summary = PassSummary::default();

        for (index, id) in pending.iter().enumerate() {
            let Some(item) = self.store.get(id).await else {
                // Removed while earlier items were processing
                continue;
            };
            if !item.status.is_eligible() {
                continue;
            }

            info!("📸 Processing item {}/{}: {}", index + 1, total, item.file.name);
            match self.process_item(id, &item.file, &style).await {
                Some(succeeded) => {
                    summary.processed += 1;
                    if succeeded {
                        summary.succeeded += 1;
                    } else {
                        summary.failed += 1;
                    }
                }
                None => info!("🗑️  {} was removed while processing", item.file.name),
            }
        }

        summary.total_time = start_time.elapsed();
        info!(
            "🎉 Pass finished in {:.2}s: {} succeeded, {} failed",
            summary.total_time.as_secs_f64(),
            summary.succeeded,
            summary.failed
        );

        PassOutcome::Finished(summary)
    }

    /// Run one item through the endpoint. Failures are recorded on the item.
    ///
    /// Returns `None` when the item left the queue before its outcome could be
    /// recorded.
    async fn process_item(&self, id: &str, file: &SourceFile, style: &StyleParams) -> Option<bool> {
        let claimed = self
            .store
            .update(
                id,
                ItemUpdate::status(ItemStatus::Analyzing).log(format!(
                    "Starting processing ({}, {}, {})",
                    style.lens.label(),
                    style.dynamic.label(),
                    style.location
                )),
            )
            .await;
        if !claimed {
            return None;
        }

        match self.endpoint.process(file, style).await {
            Ok(result) => {
                self.store
                    .update(
                        id,
                        ItemUpdate::status(ItemStatus::Generating)
                            .log(format!("Analysis: {}", result.summary)),
                    )
                    .await;
                self.store
                    .update(
                        id,
                        ItemUpdate::status(ItemStatus::Verifying).log("On-water image generated"),
                    )
                    .await;
                let recorded = self
                    .store
                    .update(
                        id,
                        ItemUpdate::status(ItemStatus::Complete)
                            .log(format!("Quality check: {}", result.quality_report))
                            .with_result(result),
                    )
                    .await;
                recorded.then_some(true)
            }
            Err(e) => {
                let message = e.to_string();
                error!("❌ {} failed: {}", file.name, message);
                let recorded = self
                    .store
                    .update(
                        id,
                        ItemUpdate::status(ItemStatus::Error)
                            .log(format!("Error: {}", message))
                            .with_error(message),
                    )
                    .await;
                recorded.then_some(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::intake;
    use crate::pipeline::BoatInsights;
    use crate::style::{LensProfile, ShotDynamic};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;

    /// Fails files whose name starts with "bad", succeeds otherwise
    #[derive(Default)]
    struct RecordingEndpoint {
        seen: StdMutex<Vec<(String, StyleParams)>>,
    }

    #[async_trait]
    impl ProcessingEndpoint for RecordingEndpoint {
        async fn process(&self, file: &SourceFile, style: &StyleParams) -> Result<ProcessedResult, ClientError> {
            self.seen.lock().unwrap().push((file.name.clone(), style.clone()));
            if file.name.starts_with("bad") {
                return Err(ClientError::Server {
                    status: 422,
                    message: "trailer visible".to_string(),
                });
            }
            Ok(ProcessedResult {
                generated_image: "data:image/png;base64,AA==".to_string(),
                prompt: format!("prompt for {}", file.name),
                summary: "summary".to_string(),
                quality_report: "clean".to_string(),
                insights: BoatInsights::default(),
            })
        }
    }

    /// Blocks inside `process` until released
    struct GatedEndpoint {
        calls: AtomicUsize,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ProcessingEndpoint for GatedEndpoint {
        async fn process(&self, _file: &SourceFile, _style: &StyleParams) -> Result<ProcessedResult, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.entered.notify_one();
            self.release.notified().await;
            Err(ClientError::Decode("released".to_string()))
        }
    }

    async fn queue(store: &QueueStore, names: &[&str]) -> Vec<String> {
        let mut selection: Vec<SourceFile> = names
            .iter()
            .map(|n| SourceFile::new(*n, "image/jpeg", vec![0xFF, 0xD8]))
            .collect();
        intake(store, &mut selection).await.accepted
    }

    #[tokio::test]
    async fn test_pass_processes_in_order_and_continues_past_failures() {
        let store = QueueStore::new();
        let ids = queue(&store, &["one.jpg", "bad.jpg", "three.jpg"]).await;
        let endpoint = Arc::new(RecordingEndpoint::default());
        let orchestrator = Orchestrator::new(store.clone(), endpoint.clone());

        let outcome = orchestrator.run_pass(StyleParams::default()).await;
        let PassOutcome::Finished(summary) = outcome else {
            panic!("expected a finished pass");
        };
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);

        let seen: Vec<String> = endpoint.seen.lock().unwrap().iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(seen, vec!["one.jpg", "bad.jpg", "three.jpg"]);

        let first = store.get(&ids[0]).await.unwrap();
        assert_eq!(first.status, ItemStatus::Complete);
        assert!(first.result.is_some());
        assert!(first.error.is_none());

        let failed = store.get(&ids[1]).await.unwrap();
        assert_eq!(failed.status, ItemStatus::Error);
        assert!(failed.result.is_none());
        assert_eq!(failed.error.as_deref(), Some("trailer visible"));

        assert_eq!(store.get(&ids[2]).await.unwrap().status, ItemStatus::Complete);
    }

    #[tokio::test]
    async fn test_logs_grow_through_the_stages() {
        let store = QueueStore::new();
        let ids = queue(&store, &["one.jpg"]).await;
        let orchestrator = Orchestrator::new(store.clone(), Arc::new(RecordingEndpoint::default()));

        orchestrator.run_pass(StyleParams::default()).await;

        let item = store.get(&ids[0]).await.unwrap();
        assert_eq!(item.logs.len(), 5);
        assert!(item.logs[0].starts_with("Queued one.jpg"));
        assert!(item.logs[1].starts_with("Starting processing"));
        assert_eq!(item.logs[2], "Analysis: summary");
        assert_eq!(item.logs[3], "On-water image generated");
        assert_eq!(item.logs[4], "Quality check: clean");
    }

    #[tokio::test]
    async fn test_completed_items_are_skipped_on_rerun() {
        let store = QueueStore::new();
        queue(&store, &["one.jpg", "bad.jpg"]).await;
        let endpoint = Arc::new(RecordingEndpoint::default());
        let orchestrator = Orchestrator::new(store.clone(), endpoint.clone());

        orchestrator.run_pass(StyleParams::default()).await;
        assert_eq!(endpoint.seen.lock().unwrap().len(), 2);

        // Errors are not retried automatically either
        let outcome = orchestrator.run_pass(StyleParams::default()).await;
        assert_eq!(outcome, PassOutcome::NothingToProcess);
        assert_eq!(endpoint.seen.lock().unwrap().len(), 2);

        queue(&store, &["four.jpg"]).await;
        orchestrator.run_pass(StyleParams::default()).await;
        let seen = endpoint.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2].0, "four.jpg");
    }

    #[tokio::test]
    async fn test_empty_queue_refuses_to_start() {
        let orchestrator = Orchestrator::new(QueueStore::new(), Arc::new(RecordingEndpoint::default()));
        assert_eq!(
            orchestrator.run_pass(StyleParams::default()).await,
            PassOutcome::NothingToProcess
        );
    }

    #[tokio::test]
    async fn test_style_snapshot_applies_to_whole_pass() {
        let store = QueueStore::new();
        queue(&store, &["one.jpg", "two.jpg"]).await;
        let endpoint = Arc::new(RecordingEndpoint::default());
        let orchestrator = Orchestrator::new(store, endpoint.clone());

        let style = StyleParams::default()
            .with_lens(LensProfile::LuxuryShowcase)
            .with_dynamic(ShotDynamic::Anchored)
            .with_location("Lake Como")
            .with_interiors(true);
        orchestrator.run_pass(style.clone()).await;

        for (_, seen_style) in endpoint.seen.lock().unwrap().iter() {
            assert_eq!(seen_style, &style);
        }
    }

    #[tokio::test]
    async fn test_reinvocation_during_pass_is_a_no_op() {
        let store = QueueStore::new();
        let ids = queue(&store, &["one.jpg", "two.jpg"]).await;
        let endpoint = Arc::new(GatedEndpoint {
            calls: AtomicUsize::new(0),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let orchestrator = Orchestrator::new(store.clone(), endpoint.clone());

        let running = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.run_pass(StyleParams::default()).await })
        };

        endpoint.entered.notified().await;
        assert!(orchestrator.is_running());

        let before: Vec<(ItemStatus, usize)> = store
            .snapshot()
            .await
            .iter()
            .map(|i| (i.status, i.logs.len()))
            .collect();

        assert_eq!(
            orchestrator.run_pass(StyleParams::default()).await,
            PassOutcome::AlreadyRunning
        );
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 1);

        let after: Vec<(ItemStatus, usize)> = store
            .snapshot()
            .await
            .iter()
            .map(|i| (i.status, i.logs.len()))
            .collect();
        assert_eq!(before, after);

        // Let the first pass finish both items
        endpoint.release.notify_one();
        endpoint.entered.notified().await;
        endpoint.release.notify_one();

        let PassOutcome::Finished(summary) = running.await.unwrap() else {
            panic!("expected a finished pass");
        };
        assert_eq!(summary.processed, 2);
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 2);
        assert!(!orchestrator.is_running());
        assert_eq!(store.get(&ids[1]).await.unwrap().status, ItemStatus::Error);
    }

    #[tokio::test]
    async fn test_item_removed_mid_pass_is_skipped() {
        let store = QueueStore::new();
        let ids = queue(&store, &["one.jpg", "two.jpg"]).await;
        let endpoint = Arc::new(GatedEndpoint {
            calls: AtomicUsize::new(0),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let orchestrator = Orchestrator::new(store.clone(), endpoint.clone());

        let running = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.run_pass(StyleParams::default()).await })
        };

        endpoint.entered.notified().await;
        assert!(store.remove(&ids[1]).await);
        endpoint.release.notify_one();

        let PassOutcome::Finished(summary) = running.await.unwrap() else {
            panic!("expected a finished pass");
        };
        assert_eq!(summary.processed, 1);
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_in_flight_item_removed_is_not_counted() {
        let store = QueueStore::new();
        let ids = queue(&store, &["one.jpg", "two.jpg"]).await;
        let endpoint = Arc::new(GatedEndpoint {
            calls: AtomicUsize::new(0),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let orchestrator = Orchestrator::new(store.clone(), endpoint.clone());

        let running = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.run_pass(StyleParams::default()).await })
        };

        endpoint.entered.notified().await;
        assert!(store.remove(&ids[0]).await);
        endpoint.release.notify_one();
        endpoint.entered.notified().await;
        endpoint.release.notify_one();

        let PassOutcome::Finished(summary) = running.await.unwrap() else {
            panic!("expected a finished pass");
        };
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 2);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded, 0);
        assert!(store.get(&ids[0]).await.is_none());
    }
}
