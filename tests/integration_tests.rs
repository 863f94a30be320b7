use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use boat_studio::api::{build_router, AppState};
use boat_studio::display;
use boat_studio::intake::intake;
use boat_studio::pipeline::VERIFICATION_INSTRUCTION;
use boat_studio::{
    ClientConfig, Config, ConfigBuilder, GenerativeModel, HttpProcessingEndpoint, InlineImage, ItemStatus,
    LensProfile, ModelError, Orchestrator, PassOutcome, QueueStore, ShotDynamic, SourceFile, StyleParams,
};

/// Rejects any photo whose bytes start with "trailer"
#[derive(Default)]
struct MarinaModel {
    generations: AtomicUsize,
    last_prompt: std::sync::Mutex<String>,
}

#[async_trait]
impl GenerativeModel for MarinaModel {
    async fn describe_image(&self, instruction: &str, image: &InlineImage) -> Result<String, ModelError> {
        if instruction == VERIFICATION_INSTRUCTION {
            return Ok("Hull intact, waterline looks natural.".to_string());
        }
        if image.data.starts_with(b"trailer") {
            return Ok(r#"Sure! {"shouldReject": true, "rejectionReason": "trailer visible"}"#.to_string());
        }
        Ok(r#"```json
{"shouldReject": false, "summary": "Blue bowrider", "insights": {"boatOverview": "21ft bowrider", "focalPoints": ["bimini top", "blue hull stripe"]}}
```"#
            .to_string())
    }

    async fn generate_image(&self, prompt: &str) -> Result<Option<InlineImage>, ModelError> {
        self.generations.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = prompt.to_string();
        Ok(Some(InlineImage::new("image/png", vec![0x89, 0x50, 0x4e, 0x47])))
    }

    fn name(&self) -> &str {
        "marina"
    }
}

/// Serve the router on an ephemeral port and return its base URL
async fn spawn_server(model: Arc<MarinaModel>) -> String {
    let config = Arc::new(ConfigBuilder::new().build());
    let app = build_router(AppState::with_model(model, config));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

async fn orchestrator_for(server_url: String) -> Orchestrator {
    let client_config = ClientConfig {
        server_url,
        ..ClientConfig::default()
    };
    let endpoint = HttpProcessingEndpoint::new(&client_config).unwrap();
    Orchestrator::new(QueueStore::new(), Arc::new(endpoint))
}

#[tokio::test]
async fn test_end_to_end_pass() {
    let model = Arc::new(MarinaModel::default());
    let orchestrator = orchestrator_for(spawn_server(model.clone()).await).await;
    let store = orchestrator.store().clone();

    let mut selection = vec![
        SourceFile::new("bowrider.jpg", "image/jpeg", b"clean photo".to_vec()),
        SourceFile::new("brochure.pdf", "application/pdf", b"%PDF".to_vec()),
        SourceFile::new("on-trailer.png", "image/png", b"trailer everywhere".to_vec()),
    ];
    let report = intake(&store, &mut selection).await;
    assert_eq!(report.accepted.len(), 2);
    assert_eq!(report.dropped, vec!["brochure.pdf"]);

    let style = StyleParams::default()
        .with_lens(LensProfile::ActionZoom)
        .with_dynamic(ShotDynamic::Harbor)
        .with_location("Lake Minnetonka");

    let PassOutcome::Finished(summary) = orchestrator.run_pass(style).await else {
        panic!("expected a finished pass");
    };
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);

    let items = store.snapshot().await;

    let complete = &items[0];
    assert_eq!(complete.status, ItemStatus::Complete);
    let result = complete.result.as_ref().unwrap();
    assert!(result.generated_image.starts_with("data:image/png;base64,"));
    assert_eq!(result.summary, "Blue bowrider");
    assert_eq!(result.quality_report, "Hull intact, waterline looks natural.");
    assert_eq!(result.insights.boat_overview.as_deref(), Some("21ft bowrider"));
    assert!(result.prompt.contains("Lake Minnetonka"));
    assert!(result.prompt.contains(LensProfile::ActionZoom.directive()));
    assert!(result.prompt.contains(ShotDynamic::Harbor.directive()));
    assert_eq!(*model.last_prompt.lock().unwrap(), result.prompt);

    let rejected = &items[1];
    assert_eq!(rejected.status, ItemStatus::Error);
    assert_eq!(rejected.error.as_deref(), Some("trailer visible"));
    assert!(rejected.result.is_none());
    assert!(rejected.logs.len() > 1);

    // Only the accepted photo reached the image model
    assert_eq!(model.generations.load(Ordering::SeqCst), 1);

    // A second pass has nothing left to do
    assert_eq!(
        orchestrator.run_pass(StyleParams::default()).await,
        PassOutcome::NothingToProcess
    );

    let output = TempDir::new().unwrap();
    let written = display::export_results(&items, output.path()).await.unwrap();
    assert_eq!(written, vec![output.path().join("bowrider-on-water.png")]);
    assert!(output.path().join("bowrider-report.json").exists());
}

#[tokio::test]
async fn test_missing_credential_marks_items_failed() {
    let config = Arc::new(Config::default());
    let app = build_router(AppState::from_config(config));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let orchestrator = orchestrator_for(format!("http://{}", addr)).await;
    let store = orchestrator.store().clone();
    let mut selection = vec![SourceFile::new("skiff.webp", "image/webp", b"skiff".to_vec())];
    intake(&store, &mut selection).await;

    orchestrator.run_pass(StyleParams::default()).await;

    let item = &store.snapshot().await[0];
    assert_eq!(item.status, ItemStatus::Error);
    assert!(item.result.is_none());
    assert!(item.error.as_deref().unwrap().contains("credential"));
}

#[tokio::test]
async fn test_unreachable_server_records_transport_error() {
    // Nothing listens on port 9 of localhost in the test environment
    let orchestrator = orchestrator_for("http://127.0.0.1:9".to_string()).await;
    let store = orchestrator.store().clone();
    let mut selection = vec![SourceFile::new("jon.heic", "image/heic", b"heic".to_vec())];
    intake(&store, &mut selection).await;

    let PassOutcome::Finished(summary) = orchestrator.run_pass(StyleParams::default()).await else {
        panic!("expected a finished pass");
    };
    assert_eq!(summary.failed, 1);

    let item = &store.snapshot().await[0];
    assert_eq!(item.status, ItemStatus::Error);
    assert!(!item.error.as_deref().unwrap().is_empty());
}
