//! Primary to DR transform
//!
//! Every per-kind function destructures its input completely, so a field
//! added to a resource type must be handled here before the crate builds.
//! Only names, references and site-specific IP ranges change; everything
//! else is copied.

use crate::firewall::FirewallClassifier;
use crate::naming::{dr_label, dr_name};
use crate::network::gateway_address;
use crate::resource_set::ResourceSet;
use crate::Result;
use drsite_api::resources::container::{IpAllocationPolicy, NodePool, PrivateClusterConfig};
use drsite_api::resources::dataproc::{DataprocClusterConfig, GceClusterConfig};
use drsite_api::resources::database::SqlIpConfiguration;
use drsite_api::resources::network::{ConnectorSubnet, RouterNat, SecondaryRange};
use drsite_api::resources::serverless::{RunTemplate, RunTemplateMetadata};
use drsite_api::resources::{
    CloudFunction, CloudRunService, ComputeAddress, ContainerCluster, DataprocCluster,
    FirewallRule, NatRouter, Network, RedisInstance, SqlInstance, Subnetwork, VpcConnector,
    VPC_CONNECTOR_ANNOTATION,
};
use drsite_api::{Resource, ResourceKind, Site, SiteIpRanges};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Maps a primary-site resource set onto the DR site
#[derive(Clone, Debug)]
pub struct DrTransform {
    ranges: SiteIpRanges,
    classifier: FirewallClassifier,
}

impl DrTransform {
    pub fn new(dr_ranges: SiteIpRanges, classifier: FirewallClassifier) -> Self {
        Self {
            ranges: dr_ranges,
            classifier,
        }
    }

    /// Transform every resource of `primary` into its DR counterpart
    pub fn transform(&self, primary: &ResourceSet) -> Result<ResourceSet> {
        let scope = Scope::new(primary);
        let mut dr = ResourceSet::new(Site::Dr);

        for resource in primary.iter() {
            let transformed = self.transform_resource(&scope, resource)?;
            debug!(
                "Transformed {} {} -> {}",
                resource.kind(),
                resource.name(),
                transformed.name()
            );
            dr.insert(transformed)?;
        }

        info!("Transformed {} resources for the DR site", dr.len());
        Ok(dr)
    }

    fn transform_resource(&self, scope: &Scope<'_>, resource: &Resource) -> Result<Resource> {
        let transformed = match resource {
            Resource::Network(r) => Resource::from(self.network(r)?),
            Resource::Subnetwork(r) => Resource::from(self.subnetwork(scope, r)?),
            Resource::NatRouter(r) => Resource::from(self.nat_router(scope, r)?),
            Resource::VpcConnector(r) => Resource::from(self.vpc_connector(scope, r)?),
            Resource::DataprocCluster(r) => Resource::from(self.dataproc_cluster(scope, r)?),
            Resource::ContainerCluster(r) => Resource::from(self.container_cluster(scope, r)?),
            Resource::ComputeAddress(r) => Resource::from(self.compute_address(scope, r)?),
            Resource::CloudFunction(r) => Resource::from(self.cloud_function(scope, r)?),
            Resource::CloudRunService(r) => Resource::from(self.cloud_run_service(scope, r)?),
            Resource::FirewallRule(r) => Resource::from(self.firewall_rule(scope, r)?),
            Resource::RedisInstance(r) => Resource::from(self.redis_instance(scope, r)?),
            Resource::SqlInstance(r) => Resource::from(self.sql_instance(scope, r)?),
        };
        Ok(transformed)
    }

    fn network(&self, network: &Network) -> Result<Network> {
        let Network {
            name,
            description,
            auto_create_subnetworks,
            routing_mode,
            mtu,
        } = network.clone();

        Ok(Network {
            name: dr_name(&name)?,
            description,
            auto_create_subnetworks,
            routing_mode,
            mtu,
        })
    }

    fn subnetwork(&self, scope: &Scope<'_>, subnet: &Subnetwork) -> Result<Subnetwork> {
        let Subnetwork {
            name,
            network,
            description,
            ip_cidr_range: _,
            gateway_address: _,
            private_ip_google_access,
            secondary_ip_range,
        } = subnet.clone();

        // Workload subnets carry GKE secondary ranges; the rest back connectors
        let cidr = if secondary_ip_range.is_empty() {
            self.ranges.vpc_connector_ip_cidr_range
        } else {
            self.ranges.subnet_ip_cidr_range
        };

        let secondary_ip_range = secondary_ip_range
            .into_iter()
            .map(|SecondaryRange { range_name, ip_cidr_range: _ }| -> Result<SecondaryRange> {
                let ip_cidr_range = if scope.is_pod_range(&range_name) {
                    self.ranges.secondary_ip_range_pod
                } else {
                    self.ranges.secondary_ip_range_svc
                };
                Ok(SecondaryRange {
                    range_name: dr_name(&range_name)?,
                    ip_cidr_range,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Subnetwork {
            network: scope.reference(ResourceKind::Network, &network, &name)?,
            name: dr_name(&name)?,
            description,
            ip_cidr_range: cidr,
            gateway_address: Some(gateway_address(&cidr)?),
            private_ip_google_access,
            secondary_ip_range,
        })
    }

    fn nat_router(&self, scope: &Scope<'_>, router: &NatRouter) -> Result<NatRouter> {
        let NatRouter {
            name,
            network,
            description,
            nat,
        } = router.clone();

        let nat = nat
            .map(
                |RouterNat {
                     name,
                     nat_ip_allocate_option,
                     source_subnetwork_ip_ranges_to_nat,
                     max_ports_per_vm,
                     log_config,
                 }|
                 -> Result<RouterNat> {
                    Ok(RouterNat {
                        name: dr_name(&name)?,
                        nat_ip_allocate_option,
                        source_subnetwork_ip_ranges_to_nat,
                        max_ports_per_vm,
                        log_config,
                    })
                },
            )
            .transpose()?;

        Ok(NatRouter {
            network: scope.reference(ResourceKind::Network, &network, &name)?,
            name: dr_name(&name)?,
            description,
            nat,
        })
    }

    fn vpc_connector(&self, scope: &Scope<'_>, connector: &VpcConnector) -> Result<VpcConnector> {
        let VpcConnector {
            name,
            network,
            ip_cidr_range,
            min_throughput,
            max_throughput,
            machine_type,
            subnet,
        } = connector.clone();

        let subnet = subnet
            .map(|ConnectorSubnet { name: subnet_name }| -> Result<ConnectorSubnet> {
                Ok(ConnectorSubnet {
                    name: scope.reference(ResourceKind::Subnetwork, &subnet_name, &name)?,
                })
            })
            .transpose()?;

        Ok(VpcConnector {
            network: scope.reference(ResourceKind::Network, &network, &name)?,
            name: dr_name(&name)?,
            ip_cidr_range: ip_cidr_range.map(|_| self.ranges.vpc_connector_ip_cidr_range),
            min_throughput,
            max_throughput,
            machine_type,
            subnet,
        })
    }

    fn dataproc_cluster(
        &self,
        scope: &Scope<'_>,
        cluster: &DataprocCluster,
    ) -> Result<DataprocCluster> {
        let DataprocCluster {
            cluster_name,
            labels,
            cluster_config:
                DataprocClusterConfig {
                    gce_cluster_config,
                    master_config,
                    worker_config,
                    software_config,
                },
        } = cluster.clone();

        let gce_cluster_config = gce_cluster_config
            .map(
                |GceClusterConfig {
                     internal_ip_only,
                     subnetwork,
                     tags,
                 }|
                 -> Result<GceClusterConfig> {
                    Ok(GceClusterConfig {
                        internal_ip_only,
                        subnetwork: scope.reference(
                            ResourceKind::Subnetwork,
                            &subnetwork,
                            &cluster_name,
                        )?,
                        tags,
                    })
                },
            )
            .transpose()?;

        Ok(DataprocCluster {
            cluster_name: dr_name(&cluster_name)?,
            labels,
            cluster_config: DataprocClusterConfig {
                gce_cluster_config,
                master_config,
                worker_config,
                software_config,
            },
        })
    }

    fn container_cluster(
        &self,
        scope: &Scope<'_>,
        cluster: &ContainerCluster,
    ) -> Result<ContainerCluster> {
        let ContainerCluster {
            name,
            network,
            subnetwork,
            default_max_pods_per_node,
            ip_allocation_policy,
            deletion_protection,
            logging_service,
            monitoring_service,
            release_channel,
            private_cluster_config,
            addons_config,
            database_encryption,
            cluster_autoscaling,
            node_pools,
        } = cluster.clone();

        let ip_allocation_policy = ip_allocation_policy
            .map(
                |IpAllocationPolicy {
                     cluster_secondary_range_name,
                     services_secondary_range_name,
                 }|
                 -> Result<IpAllocationPolicy> {
                    Ok(IpAllocationPolicy {
                        cluster_secondary_range_name: cluster_secondary_range_name
                            .map(|range| scope.range_reference(&range, &name))
                            .transpose()?,
                        services_secondary_range_name: services_secondary_range_name
                            .map(|range| scope.range_reference(&range, &name))
                            .transpose()?,
                    })
                },
            )
            .transpose()?;

        let private_cluster_config = private_cluster_config.map(
            |PrivateClusterConfig {
                 enable_private_nodes,
                 master_ipv4_cidr_block,
             }| PrivateClusterConfig {
                enable_private_nodes,
                master_ipv4_cidr_block: master_ipv4_cidr_block
                    .map(|_| self.ranges.gke_master_ip_cidr_range),
            },
        );

        let node_pools = node_pools
            .into_iter()
            .map(|pool| -> Result<NodePool> {
                let NodePool {
                    name,
                    initial_node_count,
                    autoscaling,
                    max_pods_constraint,
                    management,
                    upgrade_settings,
                    node_config,
                } = pool;
                Ok(NodePool {
                    name: dr_name(&name)?,
                    initial_node_count,
                    autoscaling,
                    max_pods_constraint,
                    management,
                    upgrade_settings,
                    node_config,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ContainerCluster {
            network: scope.reference(ResourceKind::Network, &network, &name)?,
            subnetwork: scope.reference(ResourceKind::Subnetwork, &subnetwork, &name)?,
            name: dr_name(&name)?,
            default_max_pods_per_node,
            ip_allocation_policy,
            deletion_protection,
            logging_service,
            monitoring_service,
            release_channel,
            private_cluster_config,
            addons_config,
            database_encryption,
            cluster_autoscaling,
            node_pools,
        })
    }

    fn compute_address(&self, scope: &Scope<'_>, address: &ComputeAddress) -> Result<ComputeAddress> {
        let ComputeAddress {
            name,
            description,
            address_type,
            purpose,
            ip_version,
            network_tier,
            subnetwork,
        } = address.clone();

        Ok(ComputeAddress {
            subnetwork: subnetwork
                .map(|subnet| scope.reference(ResourceKind::Subnetwork, &subnet, &name))
                .transpose()?,
            name: dr_name(&name)?,
            description,
            address_type,
            purpose,
            ip_version,
            network_tier,
        })
    }

    fn cloud_function(&self, scope: &Scope<'_>, function: &CloudFunction) -> Result<CloudFunction> {
        let CloudFunction {
            name,
            runtime,
            available_memory_mb,
            source_archive_bucket,
            source_archive_object,
            timeout,
            entry_point,
            trigger_http,
            vpc_connector,
            vpc_connector_egress_settings,
            environment_variables,
            min_instances,
            max_instances,
        } = function.clone();

        Ok(CloudFunction {
            vpc_connector: scope.reference(ResourceKind::VpcConnector, &vpc_connector, &name)?,
            name: dr_name(&name)?,
            runtime,
            available_memory_mb,
            source_archive_bucket,
            source_archive_object,
            timeout,
            entry_point,
            trigger_http,
            vpc_connector_egress_settings,
            environment_variables,
            min_instances,
            max_instances,
        })
    }

    fn cloud_run_service(
        &self,
        scope: &Scope<'_>,
        service: &CloudRunService,
    ) -> Result<CloudRunService> {
        let CloudRunService {
            name,
            template:
                RunTemplate {
                    metadata: RunTemplateMetadata { mut annotations },
                    spec,
                },
            traffic,
        } = service.clone();

        if let Some(connector) = annotations.get_mut(VPC_CONNECTOR_ANNOTATION) {
            *connector = scope.reference(ResourceKind::VpcConnector, connector, &name)?;
        }

        Ok(CloudRunService {
            name: dr_name(&name)?,
            template: RunTemplate {
                metadata: RunTemplateMetadata { annotations },
                spec,
            },
            traffic,
        })
    }

    fn firewall_rule(&self, scope: &Scope<'_>, rule: &FirewallRule) -> Result<FirewallRule> {
        let source_ranges = self.classifier.dr_source_ranges(rule, &self.ranges)?;

        let FirewallRule {
            name,
            network,
            description,
            priority,
            direction,
            disabled,
            source_ranges: _,
            destination_ranges,
            source_tags,
            target_tags,
            source_service_accounts,
            target_service_accounts,
            allowed,
            denied,
        } = rule.clone();

        Ok(FirewallRule {
            network: scope.reference(ResourceKind::Network, &network, &name)?,
            name: dr_name(&name)?,
            description,
            priority,
            direction,
            disabled,
            source_ranges,
            destination_ranges,
            source_tags,
            target_tags,
            source_service_accounts,
            target_service_accounts,
            allowed,
            denied,
        })
    }

    fn redis_instance(&self, scope: &Scope<'_>, instance: &RedisInstance) -> Result<RedisInstance> {
        let RedisInstance {
            name,
            display_name,
            authorized_network,
            redis_version,
            tier,
            memory_size_gb,
            port,
            connect_mode,
            auth_enabled,
            transit_encryption_mode,
            redis_configs,
            replica_count,
            read_replicas_mode,
            persistence_config,
        } = instance.clone();

        Ok(RedisInstance {
            authorized_network: scope.reference(ResourceKind::Network, &authorized_network, &name)?,
            name: dr_name(&name)?,
            display_name: dr_label(&display_name),
            redis_version,
            tier,
            memory_size_gb,
            port,
            connect_mode,
            auth_enabled,
            transit_encryption_mode,
            redis_configs,
            replica_count,
            read_replicas_mode,
            persistence_config,
        })
    }

    fn sql_instance(&self, scope: &Scope<'_>, instance: &SqlInstance) -> Result<SqlInstance> {
        let SqlInstance {
            name,
            database_version,
            instance_type,
            machine_type,
            database_flags,
            deletion_protection,
            backup_configuration,
            ip_configuration,
            availability_type,
            data_disk_size_gb,
            data_disk_type,
            databases,
        } = instance.clone();

        let ip_configuration = ip_configuration
            .map(
                |SqlIpConfiguration {
                     ipv4_enabled,
                     private_network,
                 }|
                 -> Result<SqlIpConfiguration> {
                    Ok(SqlIpConfiguration {
                        ipv4_enabled,
                        private_network: private_network
                            .map(|network| scope.reference(ResourceKind::Network, &network, &name))
                            .transpose()?,
                    })
                },
            )
            .transpose()?;

        Ok(SqlInstance {
            name: dr_name(&name)?,
            database_version,
            instance_type,
            machine_type,
            database_flags,
            deletion_protection,
            backup_configuration,
            ip_configuration,
            availability_type,
            data_disk_size_gb,
            data_disk_type,
            databases,
        })
    }
}

/// Names reachable from the primary set, used to decide which references move
struct Scope<'a> {
    primary: &'a ResourceSet,
    secondary_ranges: BTreeSet<&'a str>,
    pod_ranges: BTreeSet<&'a str>,
    service_ranges: BTreeSet<&'a str>,
}

impl<'a> Scope<'a> {
    fn new(primary: &'a ResourceSet) -> Self {
        let mut secondary_ranges = BTreeSet::new();
        let mut pod_ranges = BTreeSet::new();
        let mut service_ranges = BTreeSet::new();

        for resource in primary.iter() {
            match resource {
                Resource::Subnetwork(subnet) => {
                    for range in &subnet.secondary_ip_range {
                        secondary_ranges.insert(range.range_name.as_str());
                    }
                }
                Resource::ContainerCluster(cluster) => {
                    if let Some(policy) = &cluster.ip_allocation_policy {
                        if let Some(pods) = &policy.cluster_secondary_range_name {
                            pod_ranges.insert(pods.as_str());
                        }
                        if let Some(services) = &policy.services_secondary_range_name {
                            service_ranges.insert(services.as_str());
                        }
                    }
                }
                _ => {}
            }
        }

        Self {
            primary,
            secondary_ranges,
            pod_ranges,
            service_ranges,
        }
    }

    /// Pod role comes from a cluster's allocation policy, then from the range name
    fn is_pod_range(&self, range_name: &str) -> bool {
        if self.pod_ranges.contains(range_name) {
            return true;
        }
        if self.service_ranges.contains(range_name) {
            return false;
        }
        range_name.ends_with("pod") || range_name.ends_with("pods")
    }

    /// DR name of `name` if a `kind` of that name is being transformed,
    /// otherwise the reference is kept as is
    fn reference(&self, kind: ResourceKind, name: &str, holder: &str) -> Result<String> {
        if name.is_empty() {
            return Ok(String::new());
        }
        if self.primary.contains(kind, name) {
            return dr_name(name);
        }
        warn!(
            "{} references {} {} which is not in the primary set, keeping it unchanged",
            holder, kind, name
        );
        Ok(name.to_string())
    }

    fn range_reference(&self, range_name: &str, holder: &str) -> Result<String> {
        if self.secondary_ranges.contains(range_name) {
            return dr_name(range_name);
        }
        warn!(
            "{} references secondary range {} which is not in the primary set, keeping it unchanged",
            holder, range_name
        );
        Ok(range_name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firewall::{FirewallPolicy, UnknownAudiencePolicy};
    use crate::CoreError;
    use std::collections::BTreeMap;
    use std::net::IpAddr;

    fn dr_ranges() -> SiteIpRanges {
        SiteIpRanges {
            subnet_ip_cidr_range: "10.6.6.0/28".parse().unwrap(),
            secondary_ip_range_pod: "10.7.7.0/24".parse().unwrap(),
            secondary_ip_range_svc: "10.8.8.0/24".parse().unwrap(),
            vpc_connector_ip_cidr_range: "10.9.9.0/28".parse().unwrap(),
            gke_master_ip_cidr_range: "10.10.10.0/28".parse().unwrap(),
        }
    }

    fn engine() -> DrTransform {
        DrTransform::new(dr_ranges(), FirewallClassifier::default())
    }

    fn network() -> Network {
        Network {
            name: "rai-vpc".to_string(),
            routing_mode: Some("REGIONAL".to_string()),
            ..Default::default()
        }
    }

    fn workload_subnet() -> Subnetwork {
        Subnetwork {
            name: "rai-subnet".to_string(),
            network: "rai-vpc".to_string(),
            description: String::new(),
            ip_cidr_range: "10.1.1.0/28".parse().unwrap(),
            gateway_address: Some("10.1.1.1".parse().unwrap()),
            private_ip_google_access: true,
            secondary_ip_range: vec![
                SecondaryRange {
                    range_name: "rai-gke-pods".to_string(),
                    ip_cidr_range: "10.2.0.0/16".parse().unwrap(),
                },
                SecondaryRange {
                    range_name: "rai-gke-services".to_string(),
                    ip_cidr_range: "10.3.0.0/20".parse().unwrap(),
                },
            ],
        }
    }

    fn connector_subnet() -> Subnetwork {
        Subnetwork {
            name: "rai-func".to_string(),
            network: "rai-vpc".to_string(),
            description: String::new(),
            ip_cidr_range: "10.4.4.0/28".parse().unwrap(),
            gateway_address: None,
            private_ip_google_access: false,
            secondary_ip_range: vec![],
        }
    }

    fn gke_rule() -> FirewallRule {
        FirewallRule {
            name: "allow-gke-rai".to_string(),
            network: "rai-vpc".to_string(),
            source_ranges: vec!["10.2.2.0/24".to_string()],
            target_tags: vec!["rai-node".to_string()],
            ..Default::default()
        }
    }

    fn primary_set(resources: Vec<Resource>) -> ResourceSet {
        ResourceSet::from_resources(Site::Primary, resources).unwrap()
    }

    fn find<'a>(set: &'a ResourceSet, kind: ResourceKind, name: &str) -> &'a Resource {
        set.get(kind, name)
            .unwrap_or_else(|| panic!("{} {} not in set", kind, name))
    }

    #[test]
    fn test_subnet_and_gke_rule_scenario() {
        let dr = engine()
            .transform(&primary_set(vec![
                Resource::from(workload_subnet()),
                Resource::from(gke_rule()),
            ]))
            .unwrap();

        let Resource::Subnetwork(subnet) = find(&dr, ResourceKind::Subnetwork, "rai-subnet-dr") else {
            panic!("expected subnetwork");
        };
        assert_eq!(subnet.ip_cidr_range.to_string(), "10.6.6.0/28");
        assert_eq!(subnet.gateway_address, Some("10.6.6.1".parse::<IpAddr>().unwrap()));

        let Resource::FirewallRule(rule) = find(&dr, ResourceKind::FirewallRule, "allow-gke-rai-dr")
        else {
            panic!("expected firewall rule");
        };
        assert_eq!(rule.source_ranges, vec!["10.7.7.0/24", "10.8.8.0/24"]);
        assert_eq!(rule.target_tags, vec!["rai-node"]);
    }

    #[test]
    fn test_every_name_suffixed() {
        let primary = primary_set(vec![
            Resource::from(network()),
            Resource::from(workload_subnet()),
            Resource::from(gke_rule()),
        ]);
        let dr = engine().transform(&primary).unwrap();

        assert_eq!(dr.site(), Site::Dr);
        assert_eq!(dr.len(), primary.len());
        for resource in primary.iter() {
            let expected = dr_name(resource.name()).unwrap();
            assert!(dr.contains(resource.kind(), &expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_transform_is_idempotent_on_names() {
        let primary = primary_set(vec![
            Resource::from(network()),
            Resource::from(workload_subnet()),
        ]);
        let once = engine().transform(&primary).unwrap();
        let twice = engine().transform(&once).unwrap();
        let names = |set: &ResourceSet| set.iter().map(|r| r.name().to_string()).collect::<Vec<_>>();
        assert_eq!(names(&once), names(&twice));
    }

    #[test]
    fn test_secondary_ranges_by_role() {
        let dr = engine()
            .transform(&primary_set(vec![Resource::from(workload_subnet())]))
            .unwrap();
        let Resource::Subnetwork(subnet) = find(&dr, ResourceKind::Subnetwork, "rai-subnet-dr") else {
            panic!("expected subnetwork");
        };
        assert_eq!(subnet.secondary_ip_range[0].range_name, "rai-gke-pods-dr");
        assert_eq!(subnet.secondary_ip_range[0].ip_cidr_range.to_string(), "10.7.7.0/24");
        assert_eq!(subnet.secondary_ip_range[1].range_name, "rai-gke-services-dr");
        assert_eq!(subnet.secondary_ip_range[1].ip_cidr_range.to_string(), "10.8.8.0/24");
    }

    #[test]
    fn test_pod_role_from_cluster_policy() {
        let mut subnet = workload_subnet();
        subnet.secondary_ip_range[0].range_name = "rai-range-a".to_string();
        subnet.secondary_ip_range[1].range_name = "rai-range-b".to_string();

        let cluster = ContainerCluster {
            name: "rai-gke".to_string(),
            network: "rai-vpc".to_string(),
            subnetwork: "rai-subnet".to_string(),
            ip_allocation_policy: Some(IpAllocationPolicy {
                cluster_secondary_range_name: Some("rai-range-b".to_string()),
                services_secondary_range_name: Some("rai-range-a".to_string()),
            }),
            ..Default::default()
        };

        let dr = engine()
            .transform(&primary_set(vec![
                Resource::from(subnet),
                Resource::from(cluster),
            ]))
            .unwrap();

        let Resource::Subnetwork(subnet) = find(&dr, ResourceKind::Subnetwork, "rai-subnet-dr") else {
            panic!("expected subnetwork");
        };
        assert_eq!(subnet.secondary_ip_range[0].ip_cidr_range.to_string(), "10.8.8.0/24");
        assert_eq!(subnet.secondary_ip_range[1].ip_cidr_range.to_string(), "10.7.7.0/24");

        let Resource::ContainerCluster(cluster) = find(&dr, ResourceKind::ContainerCluster, "rai-gke-dr")
        else {
            panic!("expected container cluster");
        };
        let policy = cluster.ip_allocation_policy.as_ref().unwrap();
        assert_eq!(policy.cluster_secondary_range_name.as_deref(), Some("rai-range-b-dr"));
        assert_eq!(policy.services_secondary_range_name.as_deref(), Some("rai-range-a-dr"));
    }

    #[test]
    fn test_connector_subnet_gets_connector_range() {
        let dr = engine()
            .transform(&primary_set(vec![Resource::from(connector_subnet())]))
            .unwrap();
        let Resource::Subnetwork(subnet) = find(&dr, ResourceKind::Subnetwork, "rai-func-dr") else {
            panic!("expected subnetwork");
        };
        assert_eq!(subnet.ip_cidr_range.to_string(), "10.9.9.0/28");
        assert_eq!(subnet.gateway_address, Some("10.9.9.1".parse::<IpAddr>().unwrap()));
    }

    #[test]
    fn test_references_follow_primary_set() {
        let connector = VpcConnector {
            name: "rai-conn".to_string(),
            network: "rai-vpc".to_string(),
            subnet: Some(ConnectorSubnet {
                name: "rai-func".to_string(),
            }),
            ..Default::default()
        };
        let function = CloudFunction {
            name: "rai-ingest".to_string(),
            runtime: "python311".to_string(),
            vpc_connector: "rai-conn".to_string(),
            vpc_connector_egress_settings: "PRIVATE_RANGES_ONLY".to_string(),
            ..Default::default()
        };
        let mut annotations = BTreeMap::new();
        annotations.insert(VPC_CONNECTOR_ANNOTATION.to_string(), "rai-conn".to_string());
        let service = CloudRunService {
            name: "rai-api".to_string(),
            template: RunTemplate {
                metadata: RunTemplateMetadata { annotations },
                ..Default::default()
            },
            ..Default::default()
        };

        let dr = engine()
            .transform(&primary_set(vec![
                Resource::from(network()),
                Resource::from(connector_subnet()),
                Resource::from(connector),
                Resource::from(function),
                Resource::from(service),
            ]))
            .unwrap();

        let Resource::VpcConnector(connector) = find(&dr, ResourceKind::VpcConnector, "rai-conn-dr")
        else {
            panic!("expected connector");
        };
        assert_eq!(connector.network, "rai-vpc-dr");
        assert_eq!(connector.subnet.as_ref().unwrap().name, "rai-func-dr");

        let Resource::CloudFunction(function) = find(&dr, ResourceKind::CloudFunction, "rai-ingest-dr")
        else {
            panic!("expected function");
        };
        assert_eq!(function.vpc_connector, "rai-conn-dr");
        assert_eq!(function.vpc_connector_egress_settings, "PRIVATE_RANGES_ONLY");

        let Resource::CloudRunService(service) = find(&dr, ResourceKind::CloudRunService, "rai-api-dr")
        else {
            panic!("expected run service");
        };
        assert_eq!(service.vpc_connector(), Some("rai-conn-dr"));
    }

    #[test]
    fn test_cross_site_reference_passes_through() {
        // The network lives elsewhere (shared VPC), so the rule keeps pointing at it
        let dr = engine()
            .transform(&primary_set(vec![Resource::from(gke_rule())]))
            .unwrap();
        let Resource::FirewallRule(rule) = find(&dr, ResourceKind::FirewallRule, "allow-gke-rai-dr")
        else {
            panic!("expected firewall rule");
        };
        assert_eq!(rule.network, "rai-vpc");
    }

    #[test]
    fn test_cluster_ranges_and_node_pools() {
        let cluster = ContainerCluster {
            name: "rai-gke".to_string(),
            network: "rai-vpc".to_string(),
            subnetwork: "rai-subnet".to_string(),
            deletion_protection: true,
            private_cluster_config: Some(PrivateClusterConfig {
                enable_private_nodes: Some(true),
                master_ipv4_cidr_block: Some("10.5.5.0/28".parse().unwrap()),
            }),
            node_pools: vec![NodePool {
                name: "default-pool".to_string(),
                initial_node_count: 3,
                ..Default::default()
            }],
            ..Default::default()
        };

        let dr = engine()
            .transform(&primary_set(vec![
                Resource::from(network()),
                Resource::from(workload_subnet()),
                Resource::from(cluster),
            ]))
            .unwrap();

        let Resource::ContainerCluster(cluster) = find(&dr, ResourceKind::ContainerCluster, "rai-gke-dr")
        else {
            panic!("expected container cluster");
        };
        assert_eq!(cluster.network, "rai-vpc-dr");
        assert_eq!(cluster.subnetwork, "rai-subnet-dr");
        assert!(cluster.deletion_protection);
        assert_eq!(
            cluster
                .private_cluster_config
                .as_ref()
                .and_then(|c| c.master_ipv4_cidr_block)
                .map(|c| c.to_string()),
            Some("10.10.10.0/28".to_string())
        );
        assert_eq!(cluster.node_pools[0].name, "default-pool-dr");
        assert_eq!(cluster.node_pools[0].initial_node_count, 3);
    }

    #[test]
    fn test_data_services() {
        let redis = RedisInstance {
            name: "rai-cache".to_string(),
            display_name: "RAI cache".to_string(),
            authorized_network: "rai-vpc".to_string(),
            memory_size_gb: 5,
            ..Default::default()
        };
        let sql = SqlInstance {
            name: "rai-db".to_string(),
            database_version: "POSTGRES_15".to_string(),
            ip_configuration: Some(SqlIpConfiguration {
                ipv4_enabled: false,
                private_network: Some("rai-vpc".to_string()),
            }),
            databases: vec!["rai".to_string()],
            ..Default::default()
        };

        let dr = engine()
            .transform(&primary_set(vec![
                Resource::from(network()),
                Resource::from(redis),
                Resource::from(sql),
            ]))
            .unwrap();

        let Resource::RedisInstance(redis) = find(&dr, ResourceKind::RedisInstance, "rai-cache-dr")
        else {
            panic!("expected redis");
        };
        assert_eq!(redis.display_name, "RAI cache-dr");
        assert_eq!(redis.authorized_network, "rai-vpc-dr");
        assert_eq!(redis.memory_size_gb, 5);

        let Resource::SqlInstance(sql) = find(&dr, ResourceKind::SqlInstance, "rai-db-dr") else {
            panic!("expected sql");
        };
        assert_eq!(
            sql.ip_configuration.as_ref().unwrap().private_network.as_deref(),
            Some("rai-vpc-dr")
        );
        assert_eq!(sql.databases, vec!["rai"]);
    }

    #[test]
    fn test_unknown_rule_rejected_by_policy() {
        let engine = DrTransform::new(
            dr_ranges(),
            FirewallClassifier::new(FirewallPolicy {
                unknown: UnknownAudiencePolicy::Reject,
                ..Default::default()
            }),
        );
        let rule = FirewallRule {
            name: "allow-iap".to_string(),
            network: "rai-vpc".to_string(),
            ..Default::default()
        };
        let err = engine
            .transform(&primary_set(vec![Resource::from(rule)]))
            .unwrap_err();
        assert!(matches!(err, CoreError::TransformPolicy(_)));
    }

    #[test]
    fn test_empty_set() {
        let dr = engine().transform(&ResourceSet::new(Site::Primary)).unwrap();
        assert!(dr.is_empty());
        assert_eq!(dr.site(), Site::Dr);
    }
}
