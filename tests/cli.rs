mod common;

use assert_cmd::Command;
use common::{spawn_mock_hypha, write_model_dir, Behaviour};
use predicates::prelude::*;
use serial_test::serial;
use tempfile::tempdir;

/// A command isolated from any developer `.env` and HYPHA_* variables.
fn isolated_cmd(cwd: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("model-upload").expect("Binary exists");
    cmd.current_dir(cwd)
        .env_remove("HYPHA_SERVER_URL")
        .env_remove("HYPHA_API_TOKEN")
        .env_remove("HYPHA_WORKSPACE")
        .env_remove("HYPHA_COLLECTION");
    cmd
}

#[test]
fn fails_with_clear_message_when_token_missing() {
    let cwd = tempdir().unwrap();
    let model = tempdir().unwrap();
    write_model_dir(model.path(), "no-token-model");

    isolated_cmd(cwd.path())
        .arg(model.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("HYPHA_API_TOKEN"));
}

#[test]
fn requires_model_argument() {
    let cwd = tempdir().unwrap();
    isolated_cmd(cwd.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("MODEL"));
}

#[tokio::test(flavor = "multi_thread")]
async fn uploads_model_dir_against_mock_server() {
    let server = spawn_mock_hypha(Behaviour::default()).await;
    let cwd = tempdir().unwrap();
    let model = tempdir().unwrap();
    write_model_dir(model.path(), "cli-model");

    let mut cmd = isolated_cmd(cwd.path());
    cmd.arg("cli-model")
        .arg("--model-dir")
        .arg(model.path())
        .env("HYPHA_SERVER_URL", &server.base_url)
        .env("HYPHA_API_TOKEN", "cli-token")
        .env("RUST_LOG", "info");

    let assert = tokio::task::spawn_blocking(move || cmd.assert())
        .await
        .expect("command thread");
    assert
        .success()
        .stdout(predicate::str::contains("Upload complete"));

    assert_eq!(server.uploads().len(), 3);
    assert_eq!(server.rpc_calls().last().map(String::as_str), Some("commit"));
    assert!(server
        .requests()
        .iter()
        .filter(|r| r.rpc_method().is_some())
        .all(|r| r.authorization.as_deref() == Some("Bearer cli-token")));
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_upload_exits_non_zero() {
    let server = spawn_mock_hypha(Behaviour {
        fail_upload_containing: Some("weights.bin"),
        ..Default::default()
    })
    .await;
    let cwd = tempdir().unwrap();
    let model = tempdir().unwrap();
    write_model_dir(model.path(), "broken-model");

    let mut cmd = isolated_cmd(cwd.path());
    cmd.arg(model.path())
        .env("HYPHA_SERVER_URL", &server.base_url)
        .env("HYPHA_API_TOKEN", "cli-token");

    let assert = tokio::task::spawn_blocking(move || cmd.assert())
        .await
        .expect("command thread");
    assert
        .failure()
        .stderr(predicate::str::contains("500"));
    assert!(!server.rpc_calls().contains(&"commit".to_string()));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*; // needed for .with()
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
#[serial]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use model_upload::cli::{run, Cli};

    // Settings or the directory will fail; only the opening event matters here.
    let cli = Cli {
        model: "does-not-exist".to_string(),
        model_dir: None,
    };
    let _ = run(cli).await;

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
