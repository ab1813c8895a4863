use ipnetwork::IpNetwork;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// GKE cluster (`google_container_cluster` with its node pools)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContainerCluster {
    pub name: String,

    pub network: String,

    pub subnetwork: String,

    pub default_max_pods_per_node: Option<u32>,

    pub ip_allocation_policy: Option<IpAllocationPolicy>,

    #[serde(default = "default_deletion_protection")]
    pub deletion_protection: bool,

    pub logging_service: Option<String>,

    pub monitoring_service: Option<String>,

    #[serde(default)]
    pub release_channel: ReleaseChannel,

    pub private_cluster_config: Option<PrivateClusterConfig>,

    pub addons_config: Option<AddonsConfig>,

    pub database_encryption: Option<DatabaseEncryption>,

    pub cluster_autoscaling: Option<ClusterAutoscaling>,

    #[serde(default)]
    pub node_pools: Vec<NodePool>,
}

/// Names of the subnetwork secondary ranges used for pods and services
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IpAllocationPolicy {
    pub cluster_secondary_range_name: Option<String>,
    pub services_secondary_range_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReleaseChannel {
    pub channel: String,
}

impl Default for ReleaseChannel {
    fn default() -> Self {
        Self {
            channel: "UNSPECIFIED".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PrivateClusterConfig {
    pub enable_private_nodes: Option<bool>,

    /// Control-plane range
    #[schemars(with = "Option<String>")]
    pub master_ipv4_cidr_block: Option<IpNetwork>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AddonsConfig {
    pub network_policy_config: Option<AddonDisabled>,
    pub gce_persistent_disk_csi_driver_config: Option<AddonEnabled>,
    pub gcs_fuse_csi_driver_config: Option<AddonEnabled>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AddonDisabled {
    pub disabled: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AddonEnabled {
    pub enabled: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DatabaseEncryption {
    pub state: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClusterAutoscaling {
    pub autoscaling_profile: Option<String>,
}

/// GKE node pool (`google_container_node_pool`)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NodePool {
    pub name: String,

    #[serde(default = "default_initial_node_count")]
    pub initial_node_count: u32,

    pub autoscaling: Option<NodePoolAutoscaling>,

    pub max_pods_constraint: Option<MaxPodsConstraint>,

    pub management: Option<NodeManagement>,

    pub upgrade_settings: Option<UpgradeSettings>,

    #[serde(default)]
    pub node_config: NodeConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NodePoolAutoscaling {
    pub enabled: Option<bool>,
    pub total_min_node_count: Option<u32>,
    pub total_max_node_count: Option<u32>,
    pub max_node_count: Option<u32>,
    pub min_node_count: Option<u32>,
    pub location_policy: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MaxPodsConstraint {
    pub max_pods_per_node: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NodeManagement {
    pub auto_repair: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UpgradeSettings {
    pub max_surge: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NodeConfig {
    pub machine_type: Option<String>,
    pub disk_size_gb: Option<u32>,
    pub disk_type: Option<String>,
    pub image_type: Option<String>,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    pub service_account: Option<String>,

    #[serde(default)]
    pub oauth_scopes: Vec<String>,

    /// Passed through verbatim
    pub shielded_instance_config: Option<serde_json::Value>,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    /// Passed through verbatim
    pub linux_node_config: Option<serde_json::Value>,
}

fn default_deletion_protection() -> bool {
    true
}

fn default_initial_node_count() -> u32 {
    1
}
