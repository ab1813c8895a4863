use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dataproc cluster (`google_dataproc_cluster`)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DataprocCluster {
    pub cluster_name: String,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    #[serde(default)]
    pub cluster_config: DataprocClusterConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DataprocClusterConfig {
    pub gce_cluster_config: Option<GceClusterConfig>,
    pub master_config: Option<NodeGroupConfig>,
    pub worker_config: Option<NodeGroupConfig>,
    pub software_config: Option<SoftwareConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GceClusterConfig {
    pub internal_ip_only: Option<bool>,

    /// Name of the subnetwork the cluster VMs run in
    pub subnetwork: String,

    /// Network tags matched by firewall rules
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Master or worker instance group
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NodeGroupConfig {
    pub num_instances: Option<u32>,
    pub machine_type: Option<String>,
    pub image: Option<String>,
    pub preemptibility: Option<String>,
    pub disk_config: Option<DiskConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DiskConfig {
    pub boot_disk_size_gb: Option<u32>,
    pub boot_disk_type: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SoftwareConfig {
    pub image_version: Option<String>,

    /// `prefix:property` keyed cluster properties
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}
