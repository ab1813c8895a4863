//! Raw inventory items to resource types

use crate::error::{DiscoveryError, Result};
use crate::raw::*;
use drsite_api::resources::container::{
    AddonDisabled, AddonEnabled, AddonsConfig, ClusterAutoscaling, DatabaseEncryption,
    MaxPodsConstraint, NodeConfig, NodeManagement, NodePoolAutoscaling, ReleaseChannel,
    UpgradeSettings,
};
use drsite_api::resources::database::{
    BackupConfiguration, DatabaseFlag, PersistenceConfig, SqlIpConfiguration,
};
use drsite_api::resources::dataproc::{
    DataprocClusterConfig, DiskConfig, GceClusterConfig, NodeGroupConfig, SoftwareConfig,
};
use drsite_api::resources::network::{ConnectorSubnet, NatLogConfig, RouterNat};
use drsite_api::resources::serverless::{
    EnvVar, RunContainer, RunTemplate, RunTemplateMetadata, RunTemplateSpec, RunTraffic,
};
use drsite_api::resources::{
    CloudFunction, CloudRunService, ComputeAddress, ContainerCluster, DataprocCluster,
    FirewallDirection, FirewallPorts, FirewallRule, IpAllocationPolicy, NatRouter, Network,
    NodePool, PrivateClusterConfig, RedisInstance, SecondaryRange, SqlInstance, Subnetwork,
    VpcConnector, VPC_CONNECTOR_ANNOTATION,
};
use ipnetwork::IpNetwork;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::net::IpAddr;

/// Dataproc properties carried into the variable file
pub const DATAPROC_PROPERTIES: [&str; 5] = [
    "dataproc:dataproc.monitoring.stackdriver.enable",
    "mapred:mapreduce.map.speculative",
    "mapred:mapreduce.reduce.speculative",
    "spark:spark.eventLog.enabled",
    "yarn:yarn.nodemanager.resource.cpu-vcores",
];

/// Labels with this prefix are set by GCP itself
pub const SYSTEM_LABEL_PREFIX: &str = "goog-";

/// Egress setting used when a function does not report one
pub const DEFAULT_CONNECTOR_EGRESS: &str = "PRIVATE_RANGES_ONLY";

/// Deserialize every item of a list response
pub fn decode<T: DeserializeOwned>(what: &str, items: Vec<Value>) -> Result<Vec<T>> {
    items
        .into_iter()
        .map(|item| {
            serde_json::from_value(item).map_err(|e| DiscoveryError::Malformed {
                what: what.to_string(),
                message: e.to_string(),
            })
        })
        .collect()
}

fn malformed(what: impl Into<String>, message: impl Into<String>) -> DiscoveryError {
    DiscoveryError::Malformed {
        what: what.into(),
        message: message.into(),
    }
}

fn cidr(owner: &str, value: &str) -> Result<IpNetwork> {
    value
        .parse()
        .map_err(|e| malformed(owner, format!("invalid CIDR '{}': {}", value, e)))
}

pub fn network(raw: RawNetwork) -> Network {
    Network {
        name: raw.name,
        description: raw.description.unwrap_or_default(),
        auto_create_subnetworks: raw.auto_create_subnetworks.unwrap_or(false),
        routing_mode: raw.routing_config.and_then(|c| c.routing_mode),
        mtu: raw.mtu,
    }
}

pub fn subnetwork(raw: RawSubnetwork) -> Result<Subnetwork> {
    let owner = format!("subnetwork {}", raw.name);
    let ip_cidr_range = cidr(&owner, &raw.ip_cidr_range)?;
    let gateway_address = raw
        .gateway_address
        .map(|addr| {
            addr.parse::<IpAddr>()
                .map_err(|e| malformed(&owner, format!("invalid gateway '{}': {}", addr, e)))
        })
        .transpose()?;
    let secondary_ip_range = raw
        .secondary_ip_ranges
        .into_iter()
        .map(|range| {
            Ok(SecondaryRange {
                ip_cidr_range: cidr(&owner, &range.ip_cidr_range)?,
                range_name: range.range_name,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Subnetwork {
        network: basename(&raw.network).to_string(),
        name: raw.name,
        description: raw.description.unwrap_or_default(),
        ip_cidr_range,
        gateway_address,
        private_ip_google_access: raw.private_ip_google_access.unwrap_or(false),
        secondary_ip_range,
    })
}

/// Only the first NAT config of a router is carried
pub fn nat_router(raw: RawRouter) -> NatRouter {
    let nat = raw.nats.into_iter().next().map(|nat| RouterNat {
        name: nat.name,
        nat_ip_allocate_option: nat.nat_ip_allocate_option.unwrap_or_default(),
        source_subnetwork_ip_ranges_to_nat: nat.source_subnetwork_ip_ranges_to_nat.unwrap_or_default(),
        max_ports_per_vm: nat.max_ports_per_vm,
        log_config: nat.log_config.map(|log| NatLogConfig {
            enable: log.enable,
            filter: log.filter.unwrap_or_default(),
        }),
    });

    NatRouter {
        network: basename(&raw.network).to_string(),
        name: raw.name,
        description: raw.description.unwrap_or_default(),
        nat,
    }
}

pub fn vpc_connector(raw: RawConnector) -> Result<VpcConnector> {
    let name = basename(&raw.name).to_string();
    let ip_cidr_range = raw
        .ip_cidr_range
        .filter(|range| !range.is_empty())
        .map(|range| cidr(&format!("connector {}", name), &range))
        .transpose()?;

    Ok(VpcConnector {
        network: raw.network.as_deref().map(basename).unwrap_or_default().to_string(),
        ip_cidr_range,
        min_throughput: raw.min_throughput,
        max_throughput: raw.max_throughput,
        machine_type: raw.machine_type,
        subnet: raw
            .subnet
            .and_then(|subnet| subnet.name)
            .map(|subnet| ConnectorSubnet {
                name: basename(&subnet).to_string(),
            }),
        name,
    })
}

fn node_group(raw: RawInstanceGroupConfig) -> NodeGroupConfig {
    NodeGroupConfig {
        num_instances: raw.num_instances,
        machine_type: raw.machine_type_uri.as_deref().map(basename).map(str::to_string),
        image: raw.image_uri.as_deref().map(basename).map(str::to_string),
        preemptibility: raw.preemptibility,
        disk_config: raw.disk_config.map(|disk| DiskConfig {
            boot_disk_size_gb: disk.boot_disk_size_gb,
            boot_disk_type: disk.boot_disk_type,
        }),
    }
}

/// GCP-managed labels are dropped; only allow-listed software properties are kept
pub fn dataproc_cluster(raw: RawDataprocCluster) -> DataprocCluster {
    let RawDataprocConfig {
        gce_cluster_config,
        master_config,
        worker_config,
        software_config,
    } = raw.config;

    let labels = raw
        .labels
        .into_iter()
        .filter(|(key, _)| !key.starts_with(SYSTEM_LABEL_PREFIX))
        .collect();

    DataprocCluster {
        cluster_name: raw.cluster_name,
        labels,
        cluster_config: DataprocClusterConfig {
            gce_cluster_config: gce_cluster_config.map(|gce| GceClusterConfig {
                internal_ip_only: gce.internal_ip_only,
                subnetwork: gce
                    .subnetwork_uri
                    .as_deref()
                    .map(basename)
                    .unwrap_or_default()
                    .to_string(),
                tags: gce.tags,
            }),
            master_config: master_config.map(node_group),
            worker_config: worker_config.map(node_group),
            software_config: software_config.map(|software| SoftwareConfig {
                image_version: software.image_version,
                properties: software
                    .properties
                    .into_iter()
                    .filter(|(key, _)| DATAPROC_PROPERTIES.contains(&key.as_str()))
                    .collect(),
            }),
        },
    }
}

fn node_pool(raw: RawNodePool) -> NodePool {
    let config = raw.config.unwrap_or_default();
    NodePool {
        name: raw.name,
        initial_node_count: raw.initial_node_count.unwrap_or(1),
        autoscaling: raw.autoscaling.map(|a| NodePoolAutoscaling {
            enabled: a.enabled,
            total_min_node_count: a.total_min_node_count,
            total_max_node_count: a.total_max_node_count,
            max_node_count: a.max_node_count,
            min_node_count: a.min_node_count,
            location_policy: a.location_policy,
        }),
        max_pods_constraint: raw.max_pods_constraint.map(|c| MaxPodsConstraint {
            max_pods_per_node: c.max_pods_per_node,
        }),
        management: raw.management.map(|m| NodeManagement {
            auto_repair: m.auto_repair,
        }),
        upgrade_settings: raw.upgrade_settings.map(|u| UpgradeSettings {
            max_surge: u.max_surge,
        }),
        node_config: NodeConfig {
            machine_type: config.machine_type,
            disk_size_gb: config.disk_size_gb,
            disk_type: config.disk_type,
            image_type: config.image_type,
            labels: config.labels,
            service_account: config.service_account,
            oauth_scopes: config.oauth_scopes,
            shielded_instance_config: config.shielded_instance_config,
            metadata: config.metadata,
            linux_node_config: config.linux_node_config,
        },
    }
}

pub fn container_cluster(raw: RawContainerCluster) -> Result<ContainerCluster> {
    let owner = format!("container cluster {}", raw.name);
    let private_cluster_config = raw
        .private_cluster_config
        .map(|config| -> Result<PrivateClusterConfig> {
            Ok(PrivateClusterConfig {
                enable_private_nodes: config.enable_private_nodes,
                master_ipv4_cidr_block: config
                    .master_ipv4_cidr_block
                    .filter(|block| !block.is_empty())
                    .map(|block| cidr(&owner, &block))
                    .transpose()?,
            })
        })
        .transpose()?;

    Ok(ContainerCluster {
        network: basename(&raw.network).to_string(),
        subnetwork: basename(&raw.subnetwork).to_string(),
        name: raw.name,
        default_max_pods_per_node: raw
            .default_max_pods_constraint
            .and_then(|c| c.max_pods_per_node),
        ip_allocation_policy: raw.ip_allocation_policy.map(|policy| IpAllocationPolicy {
            cluster_secondary_range_name: policy.cluster_secondary_range_name,
            services_secondary_range_name: policy.services_secondary_range_name,
        }),
        deletion_protection: raw.deletion_protection.unwrap_or(true),
        logging_service: raw.logging_service,
        monitoring_service: raw.monitoring_service,
        release_channel: raw
            .release_channel
            .and_then(|c| c.channel)
            .map(|channel| ReleaseChannel { channel })
            .unwrap_or_default(),
        private_cluster_config,
        addons_config: raw.addons_config.map(|addons| AddonsConfig {
            network_policy_config: addons
                .network_policy_config
                .map(|c| AddonDisabled { disabled: c.disabled }),
            gce_persistent_disk_csi_driver_config: addons
                .gce_persistent_disk_csi_driver_config
                .map(|c| AddonEnabled { enabled: c.enabled }),
            gcs_fuse_csi_driver_config: addons
                .gcs_fuse_csi_driver_config
                .map(|c| AddonEnabled { enabled: c.enabled }),
        }),
        database_encryption: raw
            .database_encryption
            .map(|e| DatabaseEncryption { state: e.state }),
        cluster_autoscaling: raw.autoscaling.map(|a| ClusterAutoscaling {
            autoscaling_profile: a.autoscaling_profile,
        }),
        node_pools: raw.node_pools.into_iter().map(node_pool).collect(),
    })
}

pub fn compute_address(raw: RawAddress) -> ComputeAddress {
    ComputeAddress {
        name: raw.name,
        description: raw.description.unwrap_or_default(),
        address_type: raw.address_type.unwrap_or_default(),
        purpose: raw.purpose.unwrap_or_default(),
        ip_version: raw.ip_version,
        network_tier: raw.network_tier,
        subnetwork: raw.subnetwork.as_deref().map(basename).map(str::to_string),
    }
}

/// Split `gs://bucket/path/to/object` into bucket and object
fn split_archive_url(url: &str) -> Option<(String, String)> {
    let path = url.strip_prefix("gs://")?;
    let (bucket, object) = path.split_once('/')?;
    if bucket.is_empty() || object.is_empty() {
        return None;
    }
    Some((bucket.to_string(), object.to_string()))
}

/// Timeouts are reported as duration strings ("60s")
fn parse_seconds(value: &str) -> Option<u32> {
    value.trim_end_matches('s').parse().ok()
}

pub fn cloud_function(raw: RawFunction) -> Result<CloudFunction> {
    let name = basename(&raw.name).to_string();
    let owner = format!("function {}", name);

    let url = raw
        .source_archive_url
        .ok_or_else(|| malformed(&owner, "no sourceArchiveUrl"))?;
    let (source_archive_bucket, source_archive_object) = split_archive_url(&url)
        .ok_or_else(|| malformed(&owner, format!("unexpected source archive '{}'", url)))?;

    Ok(CloudFunction {
        runtime: raw.runtime.unwrap_or_default(),
        available_memory_mb: raw.available_memory_mb,
        source_archive_bucket,
        source_archive_object,
        timeout: raw.timeout.as_deref().and_then(parse_seconds),
        entry_point: raw.entry_point,
        trigger_http: raw.https_trigger.is_some(),
        vpc_connector: raw.vpc_connector.as_deref().map(basename).unwrap_or_default().to_string(),
        vpc_connector_egress_settings: raw
            .vpc_connector_egress_settings
            .unwrap_or_else(|| DEFAULT_CONNECTOR_EGRESS.to_string()),
        environment_variables: raw.environment_variables,
        min_instances: raw.min_instances.unwrap_or(0),
        max_instances: raw.max_instances.unwrap_or(0),
        name,
    })
}

/// Variables sourced from secrets or config maps are dropped. The connector
/// annotation is reduced to the connector name.
pub fn cloud_run_service(raw: RawRunService) -> CloudRunService {
    let RawRunServiceSpec { template, traffic } = raw.spec;

    let mut annotations = template.metadata.annotations;
    if let Some(connector) = annotations.get_mut(VPC_CONNECTOR_ANNOTATION) {
        *connector = basename(connector).to_string();
    }

    let containers = template
        .spec
        .containers
        .into_iter()
        .map(|container| RunContainer {
            image: container.image,
            command: container.command,
            args: container.args,
            env: container
                .env
                .into_iter()
                .filter(|var| var.value_from.is_none())
                .filter_map(|var| var.value.map(|value| EnvVar { name: var.name, value }))
                .collect(),
            resources: container.resources,
            ports: container.ports,
        })
        .collect();

    CloudRunService {
        name: raw.metadata.name,
        template: RunTemplate {
            metadata: RunTemplateMetadata { annotations },
            spec: RunTemplateSpec {
                timeout_seconds: template.spec.timeout_seconds,
                container_concurrency: template.spec.container_concurrency,
                containers,
            },
        },
        traffic: traffic
            .into_iter()
            .map(|t| RunTraffic {
                percent: t.percent,
                latest_revision: t.latest_revision,
                revision_name: t.revision_name,
                tag: t.tag,
            })
            .collect(),
    }
}

fn ports(raw: Vec<RawFirewallPorts>) -> Vec<FirewallPorts> {
    raw.into_iter()
        .map(|p| FirewallPorts {
            ip_protocol: p.ip_protocol,
            ports: p.ports,
        })
        .collect()
}

pub fn firewall_rule(raw: RawFirewall) -> Result<FirewallRule> {
    let direction = match raw.direction.as_deref() {
        None | Some("INGRESS") => FirewallDirection::Ingress,
        Some("EGRESS") => FirewallDirection::Egress,
        Some(other) => {
            return Err(malformed(
                format!("firewall rule {}", raw.name),
                format!("unknown direction '{}'", other),
            ))
        }
    };

    Ok(FirewallRule {
        network: basename(&raw.network).to_string(),
        name: raw.name,
        description: raw.description.unwrap_or_default(),
        priority: raw.priority.unwrap_or(1000),
        direction,
        disabled: raw.disabled.unwrap_or(false),
        source_ranges: raw.source_ranges,
        destination_ranges: raw.destination_ranges,
        source_tags: raw.source_tags,
        target_tags: raw.target_tags,
        source_service_accounts: raw.source_service_accounts,
        target_service_accounts: raw.target_service_accounts,
        allowed: ports(raw.allowed),
        denied: ports(raw.denied),
    })
}

pub fn redis_instance(raw: RawRedisInstance) -> RedisInstance {
    RedisInstance {
        name: basename(&raw.name).to_string(),
        display_name: raw.display_name.unwrap_or_default(),
        authorized_network: raw
            .authorized_network
            .as_deref()
            .map(basename)
            .unwrap_or_default()
            .to_string(),
        redis_version: raw.redis_version.unwrap_or_default(),
        tier: raw.tier.unwrap_or_default(),
        memory_size_gb: raw.memory_size_gb.unwrap_or(0),
        port: raw.port.unwrap_or(6379),
        connect_mode: raw.connect_mode.unwrap_or_default(),
        auth_enabled: raw.auth_enabled.unwrap_or(false),
        transit_encryption_mode: raw.transit_encryption_mode.unwrap_or_default(),
        redis_configs: raw.redis_configs,
        replica_count: raw.replica_count.unwrap_or(0),
        read_replicas_mode: raw.read_replicas_mode.unwrap_or_default(),
        persistence_config: raw.persistence_config.map(|p| PersistenceConfig {
            persistence_mode: p.persistence_mode.unwrap_or_default(),
        }),
    }
}

/// Built-in database every PostgreSQL instance carries
pub const BUILTIN_DATABASE: &str = "postgres";

pub fn sql_instance(raw: RawSqlInstance, databases: Vec<RawSqlDatabase>) -> SqlInstance {
    let settings = raw.settings.unwrap_or_default();
    SqlInstance {
        name: basename(&raw.name).to_string(),
        database_version: raw.database_version,
        instance_type: raw.instance_type.unwrap_or_default(),
        machine_type: settings.tier.unwrap_or_default(),
        database_flags: settings
            .database_flags
            .into_iter()
            .map(|flag| DatabaseFlag {
                name: flag.name,
                value: flag.value,
            })
            .collect(),
        deletion_protection: settings.deletion_protection_enabled.unwrap_or(false),
        backup_configuration: settings.backup_configuration.map(|b| BackupConfiguration {
            enabled: b.enabled.unwrap_or(false),
            binary_log_enabled: b.binary_log_enabled.unwrap_or(false),
        }),
        ip_configuration: settings.ip_configuration.map(|ip| SqlIpConfiguration {
            ipv4_enabled: ip.ipv4_enabled.unwrap_or(false),
            private_network: ip.private_network.as_deref().map(basename).map(str::to_string),
        }),
        availability_type: settings.availability_type.unwrap_or_default(),
        data_disk_size_gb: settings.data_disk_size_gb.unwrap_or(0),
        data_disk_type: settings.data_disk_type.unwrap_or_default(),
        databases: databases
            .into_iter()
            .map(|db| db.name)
            .filter(|name| name != BUILTIN_DATABASE)
            .collect(),
    }
}
