pub mod azure;
pub mod credential;
pub mod error;
pub mod pager;
pub mod transport;

#[cfg(test)]
mod test_support;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use error::{AksError, Result};

/// Public cloud authority used to request tokens.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
/// Public cloud Azure Resource Manager endpoint.
pub const DEFAULT_RESOURCE_MANAGER: &str = "https://management.azure.com";
/// Container service API version used for listing clusters and agent pools.
pub const DEFAULT_API_VERSION: &str = "2024-05-01";

/// A managed cluster as discovered during one collection cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    pub resource_group: String,
    pub provisioning_state: String,
}

/// An agent pool of a managed cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePool {
    pub name: String,
    /// Name of the owning cluster
    pub cluster: String,
    pub resource_group: String,
    pub provisioning_state: String,
}

/// Service principal used to authenticate against Entra ID.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "subscriptionID", default)]
    pub subscription_id: String,
    #[serde(rename = "tenantID", default)]
    pub tenant_id: String,
    #[serde(rename = "clientID", default)]
    pub client_id: String,
    #[serde(rename = "clientSecret", default)]
    pub client_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("subscription_id", &self.subscription_id)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

/// Endpoints of the Azure cloud to talk to. Defaults target the public cloud;
/// override them for sovereign clouds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoints {
    #[serde(default = "default_authority_host")]
    pub authority_host: String,
    #[serde(default = "default_resource_manager")]
    pub resource_manager: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            authority_host: default_authority_host(),
            resource_manager: default_resource_manager(),
            api_version: default_api_version(),
        }
    }
}

fn default_authority_host() -> String {
    DEFAULT_AUTHORITY_HOST.to_string()
}

fn default_resource_manager() -> String {
    DEFAULT_RESOURCE_MANAGER.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

/// AKS section of the exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AksConfig {
    #[serde(default)]
    pub credentials: Credentials,
    /// Resource groups to scan, in order
    #[serde(default)]
    pub resource_groups: Vec<String>,
    #[serde(default)]
    pub endpoints: Endpoints,
}

/// Read access to the AKS control plane.
#[async_trait::async_trait]
pub trait AksClient: Send + Sync {
    /// List the clusters of every configured resource group, in configuration
    /// order. Any failed page fails the whole call.
    async fn get_clusters(&self) -> Result<Vec<Cluster>>;

    /// List all node pools of one cluster.
    async fn get_node_pools(&self, cluster_name: &str, resource_group: &str)
        -> Result<Vec<NodePool>>;
}

/// Build the production client from configuration.
///
/// # Errors
///
/// Returns [`AksError::ConfigError`] if the credentials or endpoints are
/// invalid, or [`AksError::NetworkError`] if the HTTP client cannot be built.
pub fn build_client(config: AksConfig) -> Result<Arc<dyn AksClient>> {
    Ok(Arc::new(azure::AzureAksClient::new(config)?))
}
