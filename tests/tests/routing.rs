use std::fs;

use lingo_gateway::{Gateway, GatewayError};
use lingo_kernel::types::{AdapterKind, AdapterSpec, AdapterStatus, ErrorKind};
use lingo_kernel::{GatewayConfig, Params, RoutingTable};
use lingo_testing::{MockAdapter, assert_loaded_times, init_tracing, params};
use serde_json::json;

fn routed_gateway() -> (Gateway, MockAdapter, MockAdapter) {
    init_tracing();
    let routing = RoutingTable::new()
        .with_route("transcribe", "whisper")
        .with_operation("transcribe", "echo")
        .with_route("synthesize-speech", "kokoro")
        .with_route("chat", "qwen");
    let gateway = Gateway::new(GatewayConfig::default().with_routing(routing)).unwrap();

    let whisper = MockAdapter::new("whisper");
    let kokoro = MockAdapter::new("kokoro");
    whisper
        .register(&gateway, AdapterSpec::new("whisper", AdapterKind::SpeechToText))
        .unwrap();
    kokoro
        .register(&gateway, AdapterSpec::new("kokoro", AdapterKind::TextToSpeech))
        .unwrap();
    (gateway, whisper, kokoro)
}

#[tokio::test]
async fn execute_task_routes_to_the_mapped_operation() {
    let (gateway, whisper, kokoro) = routed_gateway();

    let result = gateway
        .execute_task("transcribe", params([("audio", json!("clip.wav"))]), None)
        .await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.adapter_name, "whisper");
    assert_eq!(result.data.unwrap()["params"]["audio"], "clip.wav");
    assert_eq!(whisper.history().await[0].0, "echo");

    // no explicit operation falls back to "execute"
    let spoken = gateway.execute_task("synthesize-speech", Params::new(), None).await;
    assert!(spoken.success);
    assert_loaded_times!(kokoro, 1);
}

#[tokio::test]
async fn unknown_task_touches_no_adapter() {
    let (gateway, whisper, kokoro) = routed_gateway();
    gateway.ensure_loaded("whisper").await.unwrap();
    let before = gateway.status();

    let result = gateway.execute_task("nonexistent-task", Params::new(), None).await;

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::Routing));
    assert!(result.error.unwrap().contains("nonexistent-task"));
    assert_eq!(gateway.status().adapters, before.adapters);
    assert_loaded_times!(whisper, 1);
    assert_loaded_times!(kokoro, 0);
}

#[tokio::test]
async fn route_to_unregistered_adapter_is_a_routing_error() {
    let (gateway, _, _) = routed_gateway();

    assert!(matches!(
        gateway.route("chat"),
        Err(GatewayError::UnroutedAdapter { .. })
    ));
    let result = gateway.execute_task("chat", Params::new(), None).await;
    assert_eq!(result.error_kind, Some(ErrorKind::Routing));
    assert_eq!(result.adapter_name, "qwen");
    assert_eq!(gateway.route("transcribe").unwrap(), "whisper");
}

#[tokio::test]
async fn registration_rejects_a_route_the_adapter_cannot_serve() {
    init_tracing();
    let routing = RoutingTable::new()
        .with_route("score-pronunciation", "scorer")
        .with_operation("score-pronunciation", "score");
    let gateway = Gateway::new(GatewayConfig::default().with_routing(routing)).unwrap();

    let err = MockAdapter::new("scorer")
        .register(&gateway, AdapterSpec::new("scorer", AdapterKind::Scoring))
        .unwrap_err();
    assert!(matches!(err, GatewayError::InvalidRoute { .. }));
    assert!(!gateway.is_registered("scorer"));
}

const GATEWAY_YAML: &str = r#"
max_memory_mb: 4000
default_timeout_ms: 5000
routing:
  routes:
    transcribe: whisper
    chat: qwen
adapters:
  - name: whisper
    kind: speech-to-text
    estimated_memory_mb: 1500
    priority: critical
    preload: true
  - name: qwen
    kind: generation
    estimated_memory_mb: 2000
    preload: true
  - name: kokoro
    kind: text-to-speech
    estimated_memory_mb: 300
"#;

#[tokio::test]
async fn configured_gateway_preloads_serves_and_shuts_down() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("gateway.yaml");
    fs::write(&path, GATEWAY_YAML)?;

    let config = GatewayConfig::from_file(path.to_str().unwrap())?;
    let gateway = Gateway::new(config)?;

    let whisper = MockAdapter::new("whisper");
    let qwen = MockAdapter::new("qwen");
    let kokoro = MockAdapter::new("kokoro");
    for adapter in [&whisper, &qwen, &kokoro] {
        gateway.register_configured(adapter.name(), adapter.clone(), adapter.operations())?;
    }
    qwen.set_fail_loads(true);

    let report = gateway.preload_all().await;
    assert!(!report.success);
    assert_eq!(report.preloaded, vec!["whisper".to_string()]);
    assert_eq!(report.failed, vec!["qwen".to_string()]);
    assert_eq!(gateway.adapter_status("kokoro"), Some(AdapterStatus::Unloaded));

    qwen.set_fail_loads(false);
    let chat = gateway.execute_task("chat", params([("prompt", json!("¿qué tal?"))]), None).await;
    assert!(chat.success, "{:?}", chat.error);

    gateway.start();
    assert!(gateway.status().gateway.sweeper_running);

    let shutdown = gateway.shutdown().await;
    assert_eq!(shutdown.unloaded, vec!["whisper".to_string(), "qwen".to_string()]);
    assert!(shutdown.failed.is_empty());
    assert_eq!(whisper.unload_count(), 1);
    assert!(gateway.status().gateway.loaded_adapters.is_empty());
    assert!(!gateway.status().gateway.sweeper_running);

    // still usable after shutdown
    assert!(gateway.execute_task("transcribe", Params::new(), None).await.success);
    assert_loaded_times!(whisper, 2);
    Ok(())
}
