/// GCP resource kinds handled by the generator

pub mod container;
pub mod database;
pub mod dataproc;
pub mod firewall;
pub mod network;
pub mod serverless;

pub use container::{ContainerCluster, IpAllocationPolicy, NodePool, PrivateClusterConfig};
pub use database::{RedisInstance, SqlInstance};
pub use dataproc::DataprocCluster;
pub use firewall::{FirewallDirection, FirewallPorts, FirewallRule};
pub use network::{ComputeAddress, NatRouter, Network, SecondaryRange, Subnetwork, VpcConnector};
pub use serverless::{CloudFunction, CloudRunService, VPC_CONNECTOR_ANNOTATION};

use crate::Site;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminant of [`Resource`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Network,
    Subnetwork,
    NatRouter,
    VpcConnector,
    DataprocCluster,
    ContainerCluster,
    ComputeAddress,
    CloudFunction,
    CloudRunService,
    FirewallRule,
    RedisInstance,
    SqlInstance,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 12] = [
        ResourceKind::Network,
        ResourceKind::Subnetwork,
        ResourceKind::NatRouter,
        ResourceKind::VpcConnector,
        ResourceKind::DataprocCluster,
        ResourceKind::ContainerCluster,
        ResourceKind::ComputeAddress,
        ResourceKind::CloudFunction,
        ResourceKind::CloudRunService,
        ResourceKind::FirewallRule,
        ResourceKind::RedisInstance,
        ResourceKind::SqlInstance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Network => "network",
            ResourceKind::Subnetwork => "subnetwork",
            ResourceKind::NatRouter => "nat_router",
            ResourceKind::VpcConnector => "vpc_connector",
            ResourceKind::DataprocCluster => "dataproc_cluster",
            ResourceKind::ContainerCluster => "container_cluster",
            ResourceKind::ComputeAddress => "compute_address",
            ResourceKind::CloudFunction => "cloud_function",
            ResourceKind::CloudRunService => "cloud_run_service",
            ResourceKind::FirewallRule => "firewall_rule",
            ResourceKind::RedisInstance => "redis_instance",
            ResourceKind::SqlInstance => "sql_instance",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A GCP resource of any supported kind
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "spec", rename_all = "snake_case")]
pub enum Resource {
    Network(Network),
    Subnetwork(Subnetwork),
    NatRouter(NatRouter),
    VpcConnector(VpcConnector),
    DataprocCluster(DataprocCluster),
    ContainerCluster(ContainerCluster),
    ComputeAddress(ComputeAddress),
    CloudFunction(CloudFunction),
    CloudRunService(CloudRunService),
    FirewallRule(FirewallRule),
    RedisInstance(RedisInstance),
    SqlInstance(SqlInstance),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Network(_) => ResourceKind::Network,
            Resource::Subnetwork(_) => ResourceKind::Subnetwork,
            Resource::NatRouter(_) => ResourceKind::NatRouter,
            Resource::VpcConnector(_) => ResourceKind::VpcConnector,
            Resource::DataprocCluster(_) => ResourceKind::DataprocCluster,
            Resource::ContainerCluster(_) => ResourceKind::ContainerCluster,
            Resource::ComputeAddress(_) => ResourceKind::ComputeAddress,
            Resource::CloudFunction(_) => ResourceKind::CloudFunction,
            Resource::CloudRunService(_) => ResourceKind::CloudRunService,
            Resource::FirewallRule(_) => ResourceKind::FirewallRule,
            Resource::RedisInstance(_) => ResourceKind::RedisInstance,
            Resource::SqlInstance(_) => ResourceKind::SqlInstance,
        }
    }

    /// Resource name, unique per kind within a site
    pub fn name(&self) -> &str {
        match self {
            Resource::Network(r) => &r.name,
            Resource::Subnetwork(r) => &r.name,
            Resource::NatRouter(r) => &r.name,
            Resource::VpcConnector(r) => &r.name,
            Resource::DataprocCluster(r) => &r.cluster_name,
            Resource::ContainerCluster(r) => &r.name,
            Resource::ComputeAddress(r) => &r.name,
            Resource::CloudFunction(r) => &r.name,
            Resource::CloudRunService(r) => &r.name,
            Resource::FirewallRule(r) => &r.name,
            Resource::RedisInstance(r) => &r.name,
            Resource::SqlInstance(r) => &r.name,
        }
    }

    /// Name of the VPC network this resource is attached to, if it carries one
    pub fn network(&self) -> Option<&str> {
        match self {
            Resource::Subnetwork(r) => Some(&r.network),
            Resource::NatRouter(r) => Some(&r.network),
            Resource::VpcConnector(r) => Some(&r.network),
            Resource::ContainerCluster(r) => Some(&r.network),
            Resource::FirewallRule(r) => Some(&r.network),
            Resource::RedisInstance(r) => Some(&r.authorized_network),
            Resource::SqlInstance(r) => r
                .ip_configuration
                .as_ref()
                .and_then(|ip| ip.private_network.as_deref()),
            Resource::Network(_)
            | Resource::DataprocCluster(_)
            | Resource::ComputeAddress(_)
            | Resource::CloudFunction(_)
            | Resource::CloudRunService(_) => None,
        }
    }

    /// Name of the subnetwork this resource is placed in, if any
    pub fn subnetwork(&self) -> Option<&str> {
        match self {
            Resource::VpcConnector(r) => r.subnet.as_ref().map(|s| s.name.as_str()),
            Resource::DataprocCluster(r) => r
                .cluster_config
                .gce_cluster_config
                .as_ref()
                .map(|gce| gce.subnetwork.as_str()),
            Resource::ContainerCluster(r) => Some(&r.subnetwork),
            Resource::ComputeAddress(r) => r.subnetwork.as_deref(),
            _ => None,
        }
    }
}

/// A resource together with the site it belongs to
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub site: Site,
    pub resource: Resource,
}

impl ResourceDescriptor {
    pub fn new(site: Site, resource: Resource) -> Self {
        Self { site, resource }
    }

    pub fn kind(&self) -> ResourceKind {
        self.resource.kind()
    }

    pub fn name(&self) -> &str {
        self.resource.name()
    }

    pub fn network(&self) -> Option<&str> {
        self.resource.network()
    }

    pub fn subnetwork(&self) -> Option<&str> {
        self.resource.subnetwork()
    }
}

macro_rules! impl_from_kind {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Resource {
                fn from(value: $variant) -> Self {
                    Resource::$variant(value)
                }
            }
        )*
    };
}

impl_from_kind!(
    Network,
    Subnetwork,
    NatRouter,
    VpcConnector,
    DataprocCluster,
    ContainerCluster,
    ComputeAddress,
    CloudFunction,
    CloudRunService,
    FirewallRule,
    RedisInstance,
    SqlInstance,
);
