use crate::provisioning;
use aks_cloud::{AksClient, Cluster, NodePool};
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::Dispatch;

pub const CLUSTER_METRIC: &str = "aks_cluster_provisioning_state";
pub const NODE_POOL_METRIC: &str = "aks_nodepool_provisioning_state";

const CLUSTER_LABELS: &[&str] = &["name", "resource_group"];
const NODE_POOL_LABELS: &[&str] = &["name", "cluster", "resource_group"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Cluster,
    NodePool,
}

/// Static description of one exported metric family.
#[derive(Debug)]
pub struct Descriptor {
    name: &'static str,
    help: String,
    labels: &'static [&'static str],
    desc: Desc,
}

impl Descriptor {
    fn new(name: &'static str, help: String, labels: &'static [&'static str]) -> prometheus::Result<Self> {
        let desc = Desc::new(
            name.to_string(),
            help.clone(),
            labels.iter().map(|l| l.to_string()).collect(),
            HashMap::new(),
        )?;
        Ok(Self {
            name,
            help,
            labels,
            desc,
        })
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn labels(&self) -> &[&'static str] {
        self.labels
    }

    /// A fresh, empty gauge family matching this descriptor.
    fn gauge_vec(&self) -> prometheus::Result<GaugeVec> {
        GaugeVec::new(Opts::new(self.name, self.help.clone()), self.labels)
    }
}

/// One gauge value produced by a collection cycle. Label values follow the
/// label order of the descriptor for `kind`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub kind: MetricKind,
    pub label_values: Vec<String>,
    pub value: f64,
}

impl Sample {
    fn cluster(cluster: &Cluster) -> Self {
        Self {
            kind: MetricKind::Cluster,
            label_values: vec![cluster.name.clone(), cluster.resource_group.clone()],
            value: provisioning::state_code(&cluster.provisioning_state),
        }
    }

    fn node_pool(node_pool: &NodePool) -> Self {
        Self {
            kind: MetricKind::NodePool,
            label_values: vec![
                node_pool.name.clone(),
                node_pool.cluster.clone(),
                node_pool.resource_group.clone(),
            ],
            value: provisioning::state_code(&node_pool.provisioning_state),
        }
    }
}

/// Prometheus collector exporting AKS provisioning states.
///
/// Every scrape runs one collection cycle against the AKS API; nothing is
/// cached between scrapes.
pub struct Exporter {
    client: Arc<dyn AksClient>,
    cluster_state: Descriptor,
    node_pool_state: Descriptor,
    runtime: Handle,
    logger: Dispatch,
}

impl Exporter {
    /// `runtime` drives the API calls of a cycle when the registry calls
    /// [`Collector::collect`]; that call must happen outside of async context
    /// (for example on a `spawn_blocking` thread).
    pub fn new(client: Arc<dyn AksClient>, runtime: Handle, logger: Dispatch) -> prometheus::Result<Self> {
        let cluster_state = Descriptor::new(
            CLUSTER_METRIC,
            provisioning::help_text("cluster"),
            CLUSTER_LABELS,
        )?;
        let node_pool_state = Descriptor::new(
            NODE_POOL_METRIC,
            provisioning::help_text("node pool"),
            NODE_POOL_LABELS,
        )?;

        Ok(Self {
            client,
            cluster_state,
            node_pool_state,
            runtime,
            logger,
        })
    }

    /// Both metric descriptors, independent of any collected data.
    pub fn describe(&self) -> [&Descriptor; 2] {
        [&self.cluster_state, &self.node_pool_state]
    }

    pub fn descriptor(&self, kind: MetricKind) -> &Descriptor {
        match kind {
            MetricKind::Cluster => &self.cluster_state,
            MetricKind::NodePool => &self.node_pool_state,
        }
    }

    /// Run one collection cycle and return the samples in emission order.
    ///
    /// A failure to list clusters yields no samples. A failure to list the
    /// node pools of a cluster ends the cycle: samples gathered so far are
    /// kept, later clusters are not visited.
    pub async fn run_cycle(&self) -> Vec<Sample> {
        tracing::debug!("Collecting metrics");
        let mut samples = Vec::new();

        let clusters = match self.client.get_clusters().await {
            Ok(clusters) => clusters,
            Err(e) => {
                tracing::error!(error = %e, "Failed to get clusters");
                return samples;
            }
        };

        tracing::debug!(count = clusters.len(), "Collecting metrics for clusters");

        for cluster in &clusters {
            tracing::debug!(
                name = %cluster.name,
                resource_group = %cluster.resource_group,
                provisioning_state = %cluster.provisioning_state,
                "Collecting metrics for cluster"
            );
            samples.push(Sample::cluster(cluster));

            let node_pools = match self
                .client
                .get_node_pools(&cluster.name, &cluster.resource_group)
                .await
            {
                Ok(node_pools) => node_pools,
                Err(e) => {
                    tracing::error!(
                        cluster = %cluster.name,
                        resource_group = %cluster.resource_group,
                        error = %e,
                        "Failed to get node pools"
                    );
                    return samples;
                }
            };

            tracing::debug!(
                cluster = %cluster.name,
                resource_group = %cluster.resource_group,
                count = node_pools.len(),
                "Collecting metrics for node pools"
            );

            for node_pool in &node_pools {
                tracing::debug!(
                    name = %node_pool.name,
                    cluster = %node_pool.cluster,
                    resource_group = %node_pool.resource_group,
                    provisioning_state = %node_pool.provisioning_state,
                    "Collecting metrics for node pool"
                );
                samples.push(Sample::node_pool(node_pool));
            }
        }

        samples
    }

    /// Turn cycle samples into metric families.
    pub fn encode(&self, samples: &[Sample]) -> Vec<MetricFamily> {
        let (clusters, node_pools) = match (
            self.cluster_state.gauge_vec(),
            self.node_pool_state.gauge_vec(),
        ) {
            (Ok(clusters), Ok(node_pools)) => (clusters, node_pools),
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!(error = %e, "Failed to build gauge families");
                return Vec::new();
            }
        };

        for sample in samples {
            let family = match sample.kind {
                MetricKind::Cluster => &clusters,
                MetricKind::NodePool => &node_pools,
            };
            let values: Vec<&str> = sample.label_values.iter().map(String::as_str).collect();
            match family.get_metric_with_label_values(&values) {
                Ok(gauge) => gauge.set(sample.value),
                Err(e) => tracing::error!(error = %e, labels = ?values, "Dropping sample"),
            }
        }

        let mut families = clusters.collect();
        families.extend(node_pools.collect());
        families
    }
}

impl Collector for Exporter {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.cluster_state.desc, &self.node_pool_state.desc]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        tracing::dispatcher::with_default(&self.logger, || {
            let samples = self.runtime.block_on(self.run_cycle());
            self.encode(&samples)
        })
    }
}
