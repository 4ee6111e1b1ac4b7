mod common;

use axum::http::StatusCode;
use common::{build_test_context, request_text, sample_lines, FakeAks};

fn two_clusters() -> FakeAks {
    FakeAks::default()
        .cluster("aks-1", "rg-a", "Succeeded")
        .node_pool("system", "aks-1", "rg-a", "Succeeded")
        .node_pool("user", "aks-1", "rg-a", "Upgrading")
        .cluster("aks-2", "rg-b", "ReconcilingClusterETCDCertificates")
        .node_pool("system", "aks-2", "rg-b", "Deleting")
}

#[tokio::test(flavor = "multi_thread")]
async fn health_returns_ok() {
    let ctx = build_test_context(FakeAks::default()).unwrap();

    let (status, _, body) = request_text(&ctx.app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
    assert!(ctx.aks.calls.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn metrics_exports_cluster_and_node_pool_states() {
    let ctx = build_test_context(two_clusters()).unwrap();

    let (status, content_type, body) = request_text(&ctx.app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/plain"));

    let lines = sample_lines(&body);
    assert!(lines.contains(&r#"aks_cluster_provisioning_state{name="aks-1",resource_group="rg-a"} 1"#));
    assert!(lines.contains(&r#"aks_cluster_provisioning_state{name="aks-2",resource_group="rg-b"} 9"#));
    assert!(lines.contains(
        &r#"aks_nodepool_provisioning_state{cluster="aks-1",name="user",resource_group="rg-a"} 7"#
    ));
    assert!(lines.contains(
        &r#"aks_nodepool_provisioning_state{cluster="aks-2",name="system",resource_group="rg-b"} 6"#
    ));
    assert_eq!(lines.len(), 5);

    assert!(body.contains(
        "# HELP aks_cluster_provisioning_state The provisioning state of the cluster (0 - Unknown, 1 - Succeeded"
    ));
    assert!(body.contains("# TYPE aks_nodepool_provisioning_state gauge"));
}

#[tokio::test(flavor = "multi_thread")]
async fn every_scrape_queries_the_api_again() {
    let ctx = build_test_context(two_clusters()).unwrap();

    request_text(&ctx.app, "/metrics").await;
    request_text(&ctx.app, "/metrics").await;

    let calls = ctx.aks.calls.lock().unwrap();
    assert_eq!(calls.iter().filter(|c| *c == "clusters").count(), 2);
    assert_eq!(calls.len(), 6);
}

#[tokio::test(flavor = "multi_thread")]
async fn cluster_listing_failure_still_returns_ok_without_samples() {
    let ctx = build_test_context(FakeAks {
        fail_clusters: true,
        ..two_clusters()
    })
    .unwrap();

    let (status, _, body) = request_text(&ctx.app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(sample_lines(&body).is_empty());
    assert!(!body.contains("aks_cluster_provisioning_state"));
}

#[tokio::test(flavor = "multi_thread")]
async fn node_pool_failure_keeps_samples_emitted_before_it() {
    let ctx = build_test_context(FakeAks {
        fail_node_pools_for: Some("aks-1".to_string()),
        ..two_clusters()
    })
    .unwrap();

    let (status, _, body) = request_text(&ctx.app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        sample_lines(&body),
        vec![r#"aks_cluster_provisioning_state{name="aks-1",resource_group="rg-a"} 1"#]
    );
    assert_eq!(
        *ctx.aks.calls.lock().unwrap(),
        vec!["clusters", "node_pools:rg-a/aks-1"]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn responses_carry_a_trace_id() {
    let ctx = build_test_context(FakeAks::default()).unwrap();
    let req = axum::http::Request::builder()
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();

    let resp = tower::util::ServiceExt::oneshot(ctx.app.clone(), req).await.unwrap();
    let trace_id = resp.headers().get("x-trace-id").unwrap().to_str().unwrap();
    assert_eq!(trace_id.len(), 16);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_paths_are_not_found() {
    let ctx = build_test_context(FakeAks::default()).unwrap();

    let (status, _, _) = request_text(&ctx.app, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
