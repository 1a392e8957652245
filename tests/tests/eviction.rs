use std::time::Duration;

use lingo_gateway::{Gateway, GatewayError};
use lingo_kernel::types::{AdapterKind, AdapterSpec, AdapterStatus, PriorityTier};
use lingo_kernel::{GatewayConfig, OverBudgetPolicy};
use lingo_testing::{MockAdapter, init_tracing, params};
use serde_json::json;

struct Fleet {
    gateway: Gateway,
    a: MockAdapter,
    b: MockAdapter,
}

/// Budget 1000MB with A (Normal, 600MB) and B (Low, 500MB) both resident.
///
/// B is loaded while A is busy, so nothing can be evicted and B lands
/// over budget.
async fn over_budget_fleet() -> Fleet {
    init_tracing();
    let gateway = Gateway::new(GatewayConfig::default().with_max_memory_mb(1000)).unwrap();

    let a = MockAdapter::new("a");
    let b = MockAdapter::new("b");
    a.register(
        &gateway,
        AdapterSpec::new("a", AdapterKind::Generation).with_memory_mb(600),
    )
    .unwrap();
    b.register(
        &gateway,
        AdapterSpec::new("b", AdapterKind::TextToSpeech)
            .with_memory_mb(500)
            .with_priority(PriorityTier::Low),
    )
    .unwrap();

    gateway.ensure_loaded("a").await.unwrap();
    let busy = tokio::spawn({
        let gateway = gateway.clone();
        async move { gateway.invoke("a", "sleep", params([("ms", json!(100))]), None).await }
    });
    while gateway.adapter_status("a") != Some(AdapterStatus::Busy) {
        tokio::task::yield_now().await;
    }
    gateway.ensure_loaded("b").await.unwrap();
    assert!(busy.await.unwrap().success);

    assert_eq!(gateway.status().gateway.used_memory_mb, 1100);
    Fleet { gateway, a, b }
}

fn register_c(gateway: &Gateway, memory_mb: u64) -> MockAdapter {
    let c = MockAdapter::new("c");
    c.register(
        gateway,
        AdapterSpec::new("c", AdapterKind::Translation).with_memory_mb(memory_mb),
    )
    .unwrap();
    c
}

#[tokio::test(start_paused = true)]
async fn low_priority_is_evicted_alone_when_it_frees_enough() {
    let Fleet { gateway, a, b } = over_budget_fleet().await;
    register_c(&gateway, 500);

    gateway.ensure_loaded("c").await.unwrap();

    assert_eq!(gateway.adapter_status("b"), Some(AdapterStatus::Unloaded));
    assert_eq!(gateway.adapter_status("a"), Some(AdapterStatus::Ready));
    assert_eq!(gateway.adapter_status("c"), Some(AdapterStatus::Ready));
    assert_eq!(b.unload_count(), 1);
    assert_eq!(a.unload_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn normal_priority_goes_next_when_low_is_not_enough() {
    let Fleet { gateway, a, b } = over_budget_fleet().await;
    register_c(&gateway, 700);

    gateway.ensure_loaded("c").await.unwrap();

    assert_eq!(b.unload_count(), 1);
    assert_eq!(a.unload_count(), 1);
    assert_eq!(gateway.status().gateway.loaded_adapters, vec!["c".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn least_recently_used_goes_first_within_a_tier() {
    init_tracing();
    let gateway = Gateway::new(GatewayConfig::default().with_max_memory_mb(1000)).unwrap();
    for name in ["old", "new", "next"] {
        MockAdapter::new(name)
            .register(
                &gateway,
                AdapterSpec::new(name, AdapterKind::Scoring).with_memory_mb(400),
            )
            .unwrap();
    }

    gateway.ensure_loaded("old").await.unwrap();
    tokio::time::advance(Duration::from_secs(5)).await;
    gateway.ensure_loaded("new").await.unwrap();
    tokio::time::advance(Duration::from_secs(5)).await;
    // touching old makes new the least recently used
    assert!(gateway.invoke("old", "echo", Default::default(), None).await.success);

    gateway.ensure_loaded("next").await.unwrap();
    assert_eq!(gateway.adapter_status("new"), Some(AdapterStatus::Unloaded));
    assert_eq!(gateway.adapter_status("old"), Some(AdapterStatus::Ready));
}

#[tokio::test]
async fn refuse_policy_fails_the_load_after_evicting_what_it_can() {
    init_tracing();
    let config = GatewayConfig::default()
        .with_max_memory_mb(1000)
        .with_over_budget(OverBudgetPolicy::Refuse);
    let gateway = Gateway::new(config).unwrap();
    let a = MockAdapter::new("a");
    a.register(
        &gateway,
        AdapterSpec::new("a", AdapterKind::Generation).with_memory_mb(600),
    )
    .unwrap();
    let c = register_c(&gateway, 1200);
    gateway.ensure_loaded("a").await.unwrap();

    let err = gateway.ensure_loaded("c").await.unwrap_err();
    assert!(matches!(err, GatewayError::MemoryPressure { needed_mb: 1200, .. }));
    assert_eq!(a.unload_count(), 1);
    assert_eq!(c.load_count(), 0);
    assert_eq!(gateway.adapter_status("c"), Some(AdapterStatus::Unloaded));
}
