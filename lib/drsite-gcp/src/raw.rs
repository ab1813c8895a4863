//! gcloud JSON output, as returned by the Cloud APIs (camelCase)
//!
//! Only the fields the generator reads are declared; everything is
//! optional or defaulted so partial responses still deserialize.

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Last path segment of a resource URL or relative resource name
pub fn basename(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

/// int64 fields arrive as JSON strings; accept either form
fn lenient_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Deserialize<'de>,
    T::Err: std::fmt::Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString<T> {
        Number(T),
        String(String),
    }

    match Option::<NumberOrString<T>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawNetwork {
    pub name: String,
    pub description: Option<String>,
    pub auto_create_subnetworks: Option<bool>,
    pub routing_config: Option<RawRoutingConfig>,
    pub mtu: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRoutingConfig {
    pub routing_mode: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSubnetwork {
    pub name: String,
    pub network: String,
    pub description: Option<String>,
    pub ip_cidr_range: String,
    pub gateway_address: Option<String>,
    pub private_ip_google_access: Option<bool>,
    pub secondary_ip_ranges: Vec<RawSecondaryRange>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSecondaryRange {
    pub range_name: String,
    pub ip_cidr_range: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRouter {
    pub name: String,
    pub network: String,
    pub description: Option<String>,
    pub nats: Vec<RawRouterNat>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRouterNat {
    pub name: String,
    pub nat_ip_allocate_option: Option<String>,
    pub source_subnetwork_ip_ranges_to_nat: Option<String>,
    pub max_ports_per_vm: Option<u32>,
    pub log_config: Option<RawNatLogConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawNatLogConfig {
    pub enable: bool,
    pub filter: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawConnector {
    /// projects/P/locations/R/connectors/NAME
    pub name: String,
    pub network: Option<String>,
    pub ip_cidr_range: Option<String>,
    pub min_throughput: Option<u32>,
    pub max_throughput: Option<u32>,
    pub machine_type: Option<String>,
    pub subnet: Option<RawConnectorSubnet>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawConnectorSubnet {
    pub name: Option<String>,
    pub project_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawDataprocCluster {
    pub cluster_name: String,
    pub labels: BTreeMap<String, String>,
    pub config: RawDataprocConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawDataprocConfig {
    pub gce_cluster_config: Option<RawGceClusterConfig>,
    pub master_config: Option<RawInstanceGroupConfig>,
    pub worker_config: Option<RawInstanceGroupConfig>,
    pub software_config: Option<RawSoftwareConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawGceClusterConfig {
    pub internal_ip_only: Option<bool>,
    pub subnetwork_uri: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawInstanceGroupConfig {
    pub num_instances: Option<u32>,
    pub machine_type_uri: Option<String>,
    pub image_uri: Option<String>,
    pub preemptibility: Option<String>,
    pub disk_config: Option<RawDiskConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawDiskConfig {
    pub boot_disk_size_gb: Option<u32>,
    pub boot_disk_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSoftwareConfig {
    pub image_version: Option<String>,
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawContainerCluster {
    pub name: String,
    pub network: String,
    pub subnetwork: String,
    pub default_max_pods_constraint: Option<RawMaxPodsConstraint>,
    pub ip_allocation_policy: Option<RawIpAllocationPolicy>,
    pub deletion_protection: Option<bool>,
    pub logging_service: Option<String>,
    pub monitoring_service: Option<String>,
    pub release_channel: Option<RawReleaseChannel>,
    pub private_cluster_config: Option<RawPrivateClusterConfig>,
    pub addons_config: Option<RawAddonsConfig>,
    pub database_encryption: Option<RawDatabaseEncryption>,
    pub autoscaling: Option<RawClusterAutoscaling>,
    pub node_pools: Vec<RawNodePool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawMaxPodsConstraint {
    #[serde(deserialize_with = "lenient_number")]
    pub max_pods_per_node: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawIpAllocationPolicy {
    pub cluster_secondary_range_name: Option<String>,
    pub services_secondary_range_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawReleaseChannel {
    pub channel: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPrivateClusterConfig {
    pub enable_private_nodes: Option<bool>,
    pub master_ipv4_cidr_block: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAddonsConfig {
    pub network_policy_config: Option<RawAddonToggle>,
    pub gce_persistent_disk_csi_driver_config: Option<RawAddonToggle>,
    pub gcs_fuse_csi_driver_config: Option<RawAddonToggle>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAddonToggle {
    pub disabled: Option<bool>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawDatabaseEncryption {
    pub state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawClusterAutoscaling {
    pub autoscaling_profile: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawNodePool {
    pub name: String,
    pub initial_node_count: Option<u32>,
    pub autoscaling: Option<RawNodePoolAutoscaling>,
    pub max_pods_constraint: Option<RawMaxPodsConstraint>,
    pub management: Option<RawNodeManagement>,
    pub upgrade_settings: Option<RawUpgradeSettings>,
    pub config: Option<RawNodeConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawNodePoolAutoscaling {
    pub enabled: Option<bool>,
    pub total_min_node_count: Option<u32>,
    pub total_max_node_count: Option<u32>,
    pub max_node_count: Option<u32>,
    pub min_node_count: Option<u32>,
    pub location_policy: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawNodeManagement {
    pub auto_repair: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawUpgradeSettings {
    pub max_surge: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawNodeConfig {
    pub machine_type: Option<String>,
    pub disk_size_gb: Option<u32>,
    pub disk_type: Option<String>,
    pub image_type: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub service_account: Option<String>,
    pub oauth_scopes: Vec<String>,
    pub shielded_instance_config: Option<serde_json::Value>,
    pub metadata: BTreeMap<String, String>,
    pub linux_node_config: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAddress {
    pub name: String,
    pub description: Option<String>,
    pub address_type: Option<String>,
    pub purpose: Option<String>,
    pub ip_version: Option<String>,
    pub network_tier: Option<String>,
    pub subnetwork: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawFunction {
    /// projects/P/locations/R/functions/NAME
    pub name: String,
    pub runtime: Option<String>,
    pub available_memory_mb: Option<u32>,
    /// gs://BUCKET/OBJECT
    pub source_archive_url: Option<String>,
    /// Duration string such as "60s"
    pub timeout: Option<String>,
    pub entry_point: Option<String>,
    pub https_trigger: Option<serde_json::Value>,
    pub vpc_connector: Option<String>,
    pub vpc_connector_egress_settings: Option<String>,
    pub environment_variables: BTreeMap<String, String>,
    pub min_instances: Option<u32>,
    pub max_instances: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRunService {
    pub metadata: RawObjectMeta,
    pub spec: RawRunServiceSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawObjectMeta {
    pub name: String,
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRunServiceSpec {
    pub template: RawRevisionTemplate,
    pub traffic: Vec<RawTrafficTarget>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRevisionTemplate {
    pub metadata: RawObjectMeta,
    pub spec: RawRevisionSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRevisionSpec {
    pub timeout_seconds: Option<u32>,
    pub container_concurrency: Option<u32>,
    pub containers: Vec<RawContainer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawContainer {
    pub image: String,
    pub command: Option<Vec<String>>,
    pub args: Option<Vec<String>>,
    pub env: Vec<RawEnvVar>,
    pub resources: Option<serde_json::Value>,
    pub ports: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawEnvVar {
    pub name: String,
    pub value: Option<String>,
    pub value_from: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTrafficTarget {
    pub percent: Option<u32>,
    pub latest_revision: Option<bool>,
    pub revision_name: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawFirewall {
    pub name: String,
    pub network: String,
    pub description: Option<String>,
    pub priority: Option<u32>,
    pub direction: Option<String>,
    pub disabled: Option<bool>,
    pub source_ranges: Vec<String>,
    pub destination_ranges: Vec<String>,
    pub source_tags: Vec<String>,
    pub target_tags: Vec<String>,
    pub source_service_accounts: Vec<String>,
    pub target_service_accounts: Vec<String>,
    pub allowed: Vec<RawFirewallPorts>,
    pub denied: Vec<RawFirewallPorts>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawFirewallPorts {
    #[serde(rename = "IPProtocol")]
    pub ip_protocol: String,
    pub ports: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRedisInstance {
    /// projects/P/locations/R/instances/NAME
    pub name: String,
    pub display_name: Option<String>,
    /// projects/P/global/networks/NAME
    pub authorized_network: Option<String>,
    pub redis_version: Option<String>,
    pub tier: Option<String>,
    pub memory_size_gb: Option<u32>,
    pub port: Option<u16>,
    pub connect_mode: Option<String>,
    pub auth_enabled: Option<bool>,
    pub transit_encryption_mode: Option<String>,
    pub redis_configs: BTreeMap<String, String>,
    pub replica_count: Option<u32>,
    pub read_replicas_mode: Option<String>,
    pub persistence_config: Option<RawPersistenceConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPersistenceConfig {
    pub persistence_mode: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSqlInstance {
    pub name: String,
    pub database_version: String,
    pub instance_type: Option<String>,
    pub settings: Option<RawSqlSettings>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSqlSettings {
    pub tier: Option<String>,
    pub database_flags: Vec<RawDatabaseFlag>,
    pub deletion_protection_enabled: Option<bool>,
    pub backup_configuration: Option<RawBackupConfiguration>,
    pub ip_configuration: Option<RawSqlIpConfiguration>,
    pub availability_type: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub data_disk_size_gb: Option<u64>,
    pub data_disk_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawDatabaseFlag {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawBackupConfiguration {
    pub enabled: Option<bool>,
    pub binary_log_enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSqlIpConfiguration {
    pub ipv4_enabled: Option<bool>,
    /// projects/P/global/networks/NAME
    pub private_network: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawSqlDatabase {
    pub name: String,
}
