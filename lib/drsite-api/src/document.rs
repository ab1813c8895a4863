//! Terraform variable document (`<cluster>.tfvars.json`)

use crate::resources::{
    CloudFunction, CloudRunService, ComputeAddress, ContainerCluster, DataprocCluster,
    FirewallRule, NatRouter, Network, RedisInstance, SqlInstance, Subnetwork, VpcConnector,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One site's resources laid out the way the declarative layer declares its
/// variables. Every collection is always present; single-object kinds are
/// written as `{}` when the site has none.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VariableDocument {
    /// RFC 3339 generation time
    pub timestamp: String,

    pub project: String,

    pub region: String,

    #[serde(default, with = "empty_object")]
    #[schemars(with = "Option<Network>")]
    pub compute_network: Option<Network>,

    #[serde(default)]
    pub compute_subnetworks: Vec<Subnetwork>,

    /// Keyed by router name
    #[serde(default)]
    pub nat_routers: BTreeMap<String, NatRouter>,

    #[serde(default)]
    pub vpc_access_connectors: Vec<VpcConnector>,

    #[serde(default, with = "empty_object")]
    #[schemars(with = "Option<DataprocCluster>")]
    pub dataproc_cluster: Option<DataprocCluster>,

    #[serde(default)]
    pub container_clusters: Vec<ContainerCluster>,

    #[serde(default)]
    pub cloud_functions: Vec<CloudFunction>,

    #[serde(default)]
    pub cloud_run_services: Vec<CloudRunService>,

    #[serde(default)]
    pub firewall_rules: Vec<FirewallRule>,

    #[serde(default)]
    pub compute_addresses: Vec<ComputeAddress>,

    #[serde(default)]
    pub redis_instances: Vec<RedisInstance>,

    #[serde(default)]
    pub sql_postgres_instances: Vec<SqlInstance>,
}

impl VariableDocument {
    /// Top-level keys every document carries
    pub const KEYS: [&'static str; 15] = [
        "timestamp",
        "project",
        "region",
        "compute_network",
        "compute_subnetworks",
        "nat_routers",
        "vpc_access_connectors",
        "dataproc_cluster",
        "container_clusters",
        "cloud_functions",
        "cloud_run_services",
        "firewall_rules",
        "compute_addresses",
        "redis_instances",
        "sql_postgres_instances",
    ];

    /// Number of resources in the document, excluding metadata fields
    pub fn resource_count(&self) -> usize {
        usize::from(self.compute_network.is_some())
            + self.compute_subnetworks.len()
            + self.nat_routers.len()
            + self.vpc_access_connectors.len()
            + usize::from(self.dataproc_cluster.is_some())
            + self.container_clusters.len()
            + self.cloud_functions.len()
            + self.cloud_run_services.len()
            + self.firewall_rules.len()
            + self.compute_addresses.len()
            + self.redis_instances.len()
            + self.sql_postgres_instances.len()
    }
}

/// `Option<T>` written as `{}` instead of `null` when absent
mod empty_object {
    use serde::de::{DeserializeOwned, Error};
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_map(Some(0))?.end(),
        }
    }

    /// `{}` and `null` read back as `None`
    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: DeserializeOwned,
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            Value::Object(map) if map.is_empty() => Ok(None),
            value => T::deserialize(value).map(Some).map_err(D::Error::custom),
        }
    }
}
