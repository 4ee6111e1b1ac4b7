#![allow(dead_code)]

use aks_cloud::{AksClient, AksError, Cluster, NodePool};
use aks_exporter::app;
use aks_exporter::exporter::Exporter;
use aks_exporter::state::AppState;
use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use prometheus::Registry;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tower::util::ServiceExt;
use tracing::Dispatch;

/// In-memory AKS control plane.
#[derive(Default)]
pub struct FakeAks {
    pub clusters: Vec<Cluster>,
    pub node_pools: Vec<NodePool>,
    pub fail_clusters: bool,
    pub fail_node_pools_for: Option<String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeAks {
    pub fn cluster(mut self, name: &str, resource_group: &str, state: &str) -> Self {
        self.clusters.push(Cluster {
            name: name.to_string(),
            resource_group: resource_group.to_string(),
            provisioning_state: state.to_string(),
        });
        self
    }

    pub fn node_pool(mut self, name: &str, cluster: &str, resource_group: &str, state: &str) -> Self {
        self.node_pools.push(NodePool {
            name: name.to_string(),
            cluster: cluster.to_string(),
            resource_group: resource_group.to_string(),
            provisioning_state: state.to_string(),
        });
        self
    }
}

fn failure() -> AksError {
    AksError::HttpError {
        status: 503,
        url: "https://management.azure.com/".to_string(),
        body: "unavailable".to_string(),
    }
}

#[async_trait::async_trait]
impl AksClient for FakeAks {
    async fn get_clusters(&self) -> aks_cloud::Result<Vec<Cluster>> {
        self.calls.lock().unwrap().push("clusters".to_string());
        if self.fail_clusters {
            return Err(failure());
        }
        Ok(self.clusters.clone())
    }

    async fn get_node_pools(
        &self,
        cluster_name: &str,
        resource_group: &str,
    ) -> aks_cloud::Result<Vec<NodePool>> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("node_pools:{resource_group}/{cluster_name}"));
        if self.fail_node_pools_for.as_deref() == Some(cluster_name) {
            return Err(failure());
        }
        Ok(self
            .node_pools
            .iter()
            .filter(|p| p.cluster == cluster_name && p.resource_group == resource_group)
            .cloned()
            .collect())
    }
}

pub struct TestContext {
    pub aks: Arc<FakeAks>,
    pub app: axum::Router,
}

/// Router wired like the binary, backed by `aks`. Must be called from a
/// multi-threaded runtime.
pub fn build_test_context(aks: FakeAks) -> Result<TestContext> {
    let aks = Arc::new(aks);
    let exporter = Exporter::new(aks.clone(), Handle::current(), Dispatch::none())?;
    let registry = Registry::new();
    registry.register(Box::new(exporter))?;

    let app = app::build_http_app(AppState {
        registry,
        logger: Dispatch::none(),
    });
    Ok(TestContext { aks, app })
}

pub async fn request_text(app: &axum::Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");

    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should succeed");
    let status = resp.status();
    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    (
        status,
        content_type,
        String::from_utf8(body.to_vec()).expect("body should be utf-8"),
    )
}

/// Sample lines of the exposition, without comments.
pub fn sample_lines(body: &str) -> Vec<&str> {
    body.lines()
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect()
}
