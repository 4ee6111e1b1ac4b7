use crate::credential::ClientSecretCredential;
use crate::error::{AksError, Result};
use crate::pager::Pager;
use crate::transport::{ArmTransport, HttpTransport};
use crate::{AksClient, AksConfig, Cluster, Endpoints, NodePool};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::sync::Arc;

const CONTAINER_SERVICE_PROVIDER: &str = "Microsoft.ContainerService";

/// Managed cluster or agent pool as returned by ARM. Only the fields the
/// exporter needs are decoded.
#[derive(Debug, Deserialize)]
struct ArmResource {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    properties: Option<ArmProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmProperties {
    #[serde(default)]
    provisioning_state: Option<String>,
}

impl ArmResource {
    fn name(&self) -> String {
        self.name.clone().unwrap_or_default()
    }

    fn provisioning_state(&self) -> String {
        self.properties
            .as_ref()
            .and_then(|p| p.provisioning_state.clone())
            .unwrap_or_default()
    }
}

pub struct AzureAksClient {
    subscription_id: String,
    resource_groups: Vec<String>,
    resource_manager: Url,
    api_version: String,
    transport: Arc<dyn ArmTransport>,
}

impl AzureAksClient {
    /// Build the client with a client-secret credential. The credential is
    /// created once here and shared by every later request.
    pub fn new(config: AksConfig) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let credential = ClientSecretCredential::new(
            http.clone(),
            &config.endpoints.authority_host,
            &config.credentials.tenant_id,
            &config.credentials.client_id,
            &config.credentials.client_secret,
            &config.endpoints.resource_manager,
        )?;

        Self::with_transport(&config, Arc::new(HttpTransport::new(http, credential)))
    }

    /// Build the client on top of an arbitrary transport.
    pub fn with_transport(config: &AksConfig, transport: Arc<dyn ArmTransport>) -> Result<Self> {
        if config.credentials.subscription_id.is_empty() {
            return Err(AksError::ConfigError("subscription id is empty".to_string()));
        }

        Ok(Self {
            subscription_id: config.credentials.subscription_id.clone(),
            resource_groups: config.resource_groups.clone(),
            resource_manager: parse_base_url(&config.endpoints)?,
            api_version: config.endpoints.api_version.clone(),
            transport,
        })
    }

    fn managed_clusters_url(&self, resource_group: &str) -> Result<String> {
        self.resource_url(&[
            "subscriptions",
            &self.subscription_id,
            "resourceGroups",
            resource_group,
            "providers",
            CONTAINER_SERVICE_PROVIDER,
            "managedClusters",
        ])
    }

    fn agent_pools_url(&self, resource_group: &str, cluster_name: &str) -> Result<String> {
        self.resource_url(&[
            "subscriptions",
            &self.subscription_id,
            "resourceGroups",
            resource_group,
            "providers",
            CONTAINER_SERVICE_PROVIDER,
            "managedClusters",
            cluster_name,
            "agentPools",
        ])
    }

    fn resource_url(&self, segments: &[&str]) -> Result<String> {
        let mut url = self.resource_manager.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AksError::ConfigError(format!(
                    "resource manager endpoint {} cannot be a base URL",
                    self.resource_manager
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url.to_string())
    }
}

fn parse_base_url(endpoints: &Endpoints) -> Result<Url> {
    let url = Url::parse(&endpoints.resource_manager).map_err(|e| {
        AksError::ConfigError(format!(
            "invalid resource manager endpoint {:?}: {}",
            endpoints.resource_manager, e
        ))
    })?;
    if url.cannot_be_a_base() {
        return Err(AksError::ConfigError(format!(
            "resource manager endpoint {} cannot be a base URL",
            endpoints.resource_manager
        )));
    }
    Ok(url)
}

#[async_trait::async_trait]
impl AksClient for AzureAksClient {
    async fn get_clusters(&self) -> Result<Vec<Cluster>> {
        let mut clusters = Vec::new();

        for resource_group in &self.resource_groups {
            let mut pager: Pager<'_, ArmResource> =
                Pager::new(self.transport.as_ref(), self.managed_clusters_url(resource_group)?);

            while pager.more() {
                let page = pager.next_page().await?;
                clusters.extend(page.into_iter().map(|resource| Cluster {
                    name: resource.name(),
                    resource_group: resource_group.clone(),
                    provisioning_state: resource.provisioning_state(),
                }));
            }

            tracing::debug!(
                resource_group = %resource_group,
                pages = pager.pages_fetched(),
                "Listed managed clusters"
            );
        }

        Ok(clusters)
    }

    async fn get_node_pools(
        &self,
        cluster_name: &str,
        resource_group: &str,
    ) -> Result<Vec<NodePool>> {
        let mut node_pools = Vec::new();
        let mut pager: Pager<'_, ArmResource> = Pager::new(
            self.transport.as_ref(),
            self.agent_pools_url(resource_group, cluster_name)?,
        );

        while pager.more() {
            let page = pager.next_page().await?;
            node_pools.extend(page.into_iter().map(|resource| NodePool {
                name: resource.name(),
                cluster: cluster_name.to_string(),
                resource_group: resource_group.to_string(),
                provisioning_state: resource.provisioning_state(),
            }));
        }

        Ok(node_pools)
    }
}
