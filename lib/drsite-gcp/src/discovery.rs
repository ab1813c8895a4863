//! Primary-site discovery
//!
//! Discovery runs in two phases. The first lists the network, its
//! subnetworks and the VPC access connectors; the second lists every other
//! kind concurrently and keeps the items attached to what phase one found.

use crate::client::{InventoryRequest, InventorySource, Query};
use crate::error::{DiscoveryError, Result};
use crate::parse;
use crate::policy::RetryPolicy;
use crate::raw::*;
use drsite_api::resources::VPC_CONNECTOR_ANNOTATION;
use drsite_api::{Resource, Site};
use drsite_core::ResourceSet;
use futures::future::try_join_all;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What to discover: one VPC in one project and region
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveryRequest {
    pub project: String,
    pub region: String,
    pub vpc: String,
    /// Firewall rules must also match this pattern when set
    pub firewall_name_filter: Option<String>,
}

/// Names found in phase one that phase two filters on
struct Anchors {
    vpc: String,
    subnetworks: BTreeSet<String>,
    connectors: BTreeSet<String>,
}

impl Anchors {
    fn on_vpc(&self, network: &str) -> bool {
        basename(network) == self.vpc
    }

    fn on_subnetwork(&self, subnetwork: Option<&str>) -> bool {
        subnetwork.is_some_and(|s| self.subnetworks.contains(basename(s)))
    }

    fn on_connector(&self, connector: Option<&str>) -> bool {
        connector.is_some_and(|c| self.connectors.contains(basename(c)))
    }
}

pub struct Discovery {
    source: Arc<dyn InventorySource>,
    retry: RetryPolicy,
}

impl Discovery {
    pub fn new(source: Arc<dyn InventorySource>, retry: RetryPolicy) -> Self {
        Self { source, retry }
    }

    /// List every supported kind attached to the requested VPC.
    ///
    /// Kinds that do not exist in the project come back empty. The first
    /// fatal failure aborts the whole discovery.
    pub async fn discover(&self, request: &DiscoveryRequest) -> Result<ResourceSet> {
        let firewall_filter = request
            .firewall_name_filter
            .as_deref()
            .map(Regex::new)
            .transpose()?;

        info!(
            "Discovering resources of {} in {}/{}",
            request.vpc, request.project, request.region
        );

        let (networks, subnetworks, connectors) = futures::try_join!(
            self.fetch_as::<RawNetwork>(request, Query::Networks),
            self.fetch_as::<RawSubnetwork>(request, Query::Subnetworks),
            self.fetch_as::<RawConnector>(request, Query::VpcConnectors),
        )?;

        let network = networks.into_iter().find(|n| n.name == request.vpc);
        if network.is_none() {
            warn!("Network {} not found in {}", request.vpc, request.project);
        }

        let mut anchors = Anchors {
            vpc: request.vpc.clone(),
            subnetworks: BTreeSet::new(),
            connectors: BTreeSet::new(),
        };

        let subnetworks: Vec<RawSubnetwork> = subnetworks
            .into_iter()
            .filter(|s| anchors.on_vpc(&s.network))
            .collect();
        anchors.subnetworks = subnetworks.iter().map(|s| s.name.clone()).collect();

        let connectors: Vec<RawConnector> = connectors
            .into_iter()
            .filter(|c| {
                c.network.as_deref().is_some_and(|n| anchors.on_vpc(n))
                    || anchors.on_subnetwork(c.subnet.as_ref().and_then(|s| s.name.as_deref()))
            })
            .collect();
        anchors.connectors = connectors.iter().map(|c| basename(&c.name).to_string()).collect();

        let (routers, dataproc, clusters, addresses, functions, services, firewalls, redis, sql) =
            futures::try_join!(
                self.fetch_as::<RawRouter>(request, Query::Routers),
                self.fetch_as::<RawDataprocCluster>(request, Query::DataprocClusters),
                self.fetch_as::<RawContainerCluster>(request, Query::ContainerClusters),
                self.fetch_as::<RawAddress>(request, Query::Addresses),
                self.fetch_as::<RawFunction>(request, Query::Functions),
                self.fetch_as::<RawRunService>(request, Query::RunServices),
                self.fetch_as::<RawFirewall>(request, Query::FirewallRules),
                self.fetch_as::<RawRedisInstance>(request, Query::RedisInstances),
                self.discover_sql(request),
            )?;

        let mut resources: Vec<Resource> = Vec::new();
        resources.extend(network.map(parse::network).map(Resource::from));
        for subnetwork in subnetworks {
            resources.push(parse::subnetwork(subnetwork)?.into());
        }
        for connector in connectors {
            resources.push(parse::vpc_connector(connector)?.into());
        }

        resources.extend(
            routers
                .into_iter()
                .filter(|r| anchors.on_vpc(&r.network))
                .map(parse::nat_router)
                .map(Resource::from),
        );

        let mut dataproc = dataproc.into_iter().filter(|c| {
            anchors.on_subnetwork(
                c.config
                    .gce_cluster_config
                    .as_ref()
                    .and_then(|gce| gce.subnetwork_uri.as_deref()),
            )
        });
        if let Some(cluster) = dataproc.next() {
            let skipped: Vec<String> = dataproc.map(|c| c.cluster_name).collect();
            if !skipped.is_empty() {
                warn!(
                    "Keeping dataproc cluster {}, ignoring {}",
                    cluster.cluster_name,
                    skipped.join(", ")
                );
            }
            resources.push(parse::dataproc_cluster(cluster).into());
        }

        for cluster in clusters.into_iter().filter(|c| anchors.on_vpc(&c.network)) {
            resources.push(parse::container_cluster(cluster)?.into());
        }

        resources.extend(
            addresses
                .into_iter()
                .filter(|a| anchors.on_subnetwork(a.subnetwork.as_deref()))
                .map(parse::compute_address)
                .map(Resource::from),
        );

        for function in functions
            .into_iter()
            .filter(|f| anchors.on_connector(f.vpc_connector.as_deref()))
        {
            resources.push(parse::cloud_function(function)?.into());
        }

        resources.extend(
            services
                .into_iter()
                .filter(|s| {
                    anchors.on_connector(
                        s.spec
                            .template
                            .metadata
                            .annotations
                            .get(VPC_CONNECTOR_ANNOTATION)
                            .map(String::as_str),
                    )
                })
                .map(parse::cloud_run_service)
                .map(Resource::from),
        );

        for rule in firewalls.into_iter().filter(|r| {
            anchors.on_vpc(&r.network)
                && firewall_filter.as_ref().map_or(true, |f| f.is_match(&r.name))
        }) {
            resources.push(parse::firewall_rule(rule)?.into());
        }

        resources.extend(
            redis
                .into_iter()
                .filter(|r| r.authorized_network.as_deref().is_some_and(|n| anchors.on_vpc(n)))
                .map(parse::redis_instance)
                .map(Resource::from),
        );

        resources.extend(
            sql.into_iter()
                .map(|(instance, databases)| parse::sql_instance(instance, databases))
                .map(Resource::from),
        );

        let set = ResourceSet::from_resources(Site::Primary, resources)?;
        info!(
            "Discovered {} resources of {} in {}",
            set.len(),
            request.vpc,
            request.project
        );
        Ok(set)
    }

    /// PostgreSQL instances on the VPC with their user databases
    async fn discover_sql(
        &self,
        request: &DiscoveryRequest,
    ) -> Result<Vec<(RawSqlInstance, Vec<RawSqlDatabase>)>> {
        let instances: Vec<RawSqlInstance> = self
            .fetch_as::<RawSqlInstance>(request, Query::SqlInstances)
            .await?
            .into_iter()
            .filter(|i| i.database_version.starts_with("POSTGRES"))
            .filter(|i| {
                i.settings
                    .as_ref()
                    .and_then(|s| s.ip_configuration.as_ref())
                    .and_then(|ip| ip.private_network.as_deref())
                    .is_some_and(|n| basename(n) == request.vpc)
            })
            .collect();

        let databases = try_join_all(instances.iter().map(|instance| {
            self.fetch_as::<RawSqlDatabase>(
                request,
                Query::SqlDatabases {
                    instance: basename(&instance.name).to_string(),
                },
            )
        }))
        .await?;

        Ok(instances.into_iter().zip(databases).collect())
    }

    async fn fetch_as<T: DeserializeOwned>(
        &self,
        request: &DiscoveryRequest,
        query: Query,
    ) -> Result<Vec<T>> {
        let request = InventoryRequest::new(&request.project, &request.region, query);
        let items = self.fetch(&request).await?;
        parse::decode(&request.query.to_string(), items)
    }

    /// One list call with the retry budget applied
    async fn fetch(&self, request: &InventoryRequest) -> Result<Vec<Value>> {
        let mut retries = 0;
        loop {
            match self.source.list(request).await {
                Ok(items) => {
                    debug!("Listed {} items: {}", items.len(), request);
                    return Ok(items);
                }
                Err(e) if e.is_not_found() => {
                    debug!("Nothing to list: {}: {}", request, e);
                    return Ok(Vec::new());
                }
                Err(e) if e.is_transient() => {
                    if retries >= self.retry.max_retries {
                        return Err(DiscoveryError::RetriesExhausted {
                            attempts: retries + 1,
                            last: Box::new(e),
                        });
                    }
                    let backoff = self.retry.backoff_duration(retries);
                    warn!("Retrying {} in {:?}: {}", request, backoff, e);
                    tokio::time::sleep(backoff).await;
                    retries += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use drsite_api::ResourceKind;
    use serde_json::json;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replies are consumed in order; an exhausted or missing query lists nothing
    #[derive(Default)]
    struct FakeInventory {
        replies: Mutex<HashMap<Query, VecDeque<Result<Vec<Value>>>>>,
        calls: Mutex<Vec<Query>>,
    }

    impl FakeInventory {
        fn reply(self, query: Query, reply: Result<Vec<Value>>) -> Self {
            self.replies
                .lock()
                .unwrap()
                .entry(query)
                .or_default()
                .push_back(reply);
            self
        }

        fn items(self, query: Query, items: Value) -> Self {
            let items = items.as_array().cloned().unwrap_or_default();
            self.reply(query, Ok(items))
        }

        fn calls_to(&self, query: &Query) -> usize {
            self.calls.lock().unwrap().iter().filter(|q| *q == query).count()
        }
    }

    #[async_trait]
    impl InventorySource for FakeInventory {
        async fn list(&self, request: &InventoryRequest) -> Result<Vec<Value>> {
            self.calls.lock().unwrap().push(request.query.clone());
            self.replies
                .lock()
                .unwrap()
                .get_mut(&request.query)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn fast_retry(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
        }
    }

    fn request() -> DiscoveryRequest {
        DiscoveryRequest {
            project: "rai-prod".to_string(),
            region: "us-central1".to_string(),
            vpc: "rai-vpc".to_string(),
            firewall_name_filter: None,
        }
    }

    fn transient() -> DiscoveryError {
        DiscoveryError::Transient {
            command: "gcloud compute firewall-rules list".to_string(),
            message: "RESOURCE_EXHAUSTED: rate limit".to_string(),
        }
    }

    fn inventory() -> FakeInventory {
        FakeInventory::default()
            .items(
                Query::Networks,
                json!([{"name": "rai-vpc"}, {"name": "default"}]),
            )
            .items(
                Query::Subnetworks,
                json!([
                    {
                        "name": "rai-subnet",
                        "network": "projects/rai-prod/global/networks/rai-vpc",
                        "ipCidrRange": "10.1.1.0/28",
                        "secondaryIpRanges": [
                            {"rangeName": "rai-pod", "ipCidrRange": "10.2.2.0/24"},
                            {"rangeName": "rai-svc", "ipCidrRange": "10.3.3.0/24"}
                        ]
                    },
                    {
                        "name": "rai-func-subnet",
                        "network": "projects/rai-prod/global/networks/rai-vpc",
                        "ipCidrRange": "10.4.4.0/28"
                    },
                    {
                        "name": "other-subnet",
                        "network": "projects/rai-prod/global/networks/default",
                        "ipCidrRange": "10.128.0.0/20"
                    }
                ]),
            )
            .items(
                Query::VpcConnectors,
                json!([
                    {
                        "name": "projects/rai-prod/locations/us-central1/connectors/rai-func",
                        "subnet": {"name": "rai-func-subnet"}
                    },
                    {
                        "name": "projects/rai-prod/locations/us-central1/connectors/other",
                        "network": "default",
                        "ipCidrRange": "10.8.0.0/28"
                    }
                ]),
            )
            .items(
                Query::FirewallRules,
                json!([
                    {
                        "name": "allow-gke-rai",
                        "network": "https://www.googleapis.com/compute/v1/projects/rai-prod/global/networks/rai-vpc",
                        "sourceRanges": ["10.2.2.0/24"],
                        "allowed": [{"IPProtocol": "tcp"}]
                    },
                    {
                        "name": "legacy-ssh",
                        "network": "https://www.googleapis.com/compute/v1/projects/rai-prod/global/networks/rai-vpc"
                    },
                    {
                        "name": "allow-vms-default",
                        "network": "https://www.googleapis.com/compute/v1/projects/rai-prod/global/networks/default"
                    }
                ]),
            )
            .items(
                Query::Functions,
                json!([
                    {
                        "name": "projects/rai-prod/locations/us-central1/functions/rai-ingest",
                        "sourceArchiveUrl": "gs://rai-artifacts/ingest.zip",
                        "vpcConnector": "projects/rai-prod/locations/us-central1/connectors/rai-func"
                    },
                    {
                        "name": "projects/rai-prod/locations/us-central1/functions/unrelated"
                    }
                ]),
            )
            .items(
                Query::RunServices,
                json!([
                    {
                        "metadata": {"name": "rai-api"},
                        "spec": {"template": {"metadata": {"annotations": {
                            "run.googleapis.com/vpc-access-connector": "projects/rai-prod/locations/us-central1/connectors/rai-func"
                        }}}}
                    },
                    {"metadata": {"name": "public-site"}}
                ]),
            )
            .items(
                Query::DataprocClusters,
                json!([
                    {"clusterName": "rai-druid", "config": {"gceClusterConfig": {"subnetworkUri": "rai-subnet"}}},
                    {"clusterName": "rai-druid-2", "config": {"gceClusterConfig": {"subnetworkUri": "rai-subnet"}}},
                    {"clusterName": "elsewhere", "config": {"gceClusterConfig": {"subnetworkUri": "other-subnet"}}}
                ]),
            )
            .items(
                Query::SqlInstances,
                json!([
                    {
                        "name": "rai-db",
                        "databaseVersion": "POSTGRES_15",
                        "settings": {"ipConfiguration": {"privateNetwork": "projects/rai-prod/global/networks/rai-vpc"}}
                    },
                    {
                        "name": "rai-mysql",
                        "databaseVersion": "MYSQL_8_0",
                        "settings": {"ipConfiguration": {"privateNetwork": "projects/rai-prod/global/networks/rai-vpc"}}
                    }
                ]),
            )
            .items(
                Query::SqlDatabases {
                    instance: "rai-db".to_string(),
                },
                json!([{"name": "postgres"}, {"name": "rai"}]),
            )
    }

    #[tokio::test]
    async fn test_discover_filters_on_vpc() {
        let discovery = Discovery::new(Arc::new(inventory()), fast_retry(0));
        let set = discovery.discover(&request()).await.unwrap();

        assert!(set.contains(ResourceKind::Network, "rai-vpc"));
        assert!(!set.contains(ResourceKind::Network, "default"));
        assert!(set.contains(ResourceKind::Subnetwork, "rai-subnet"));
        assert!(set.contains(ResourceKind::Subnetwork, "rai-func-subnet"));
        assert!(!set.contains(ResourceKind::Subnetwork, "other-subnet"));
        assert!(set.contains(ResourceKind::VpcConnector, "rai-func"));
        assert!(!set.contains(ResourceKind::VpcConnector, "other"));
        assert!(set.contains(ResourceKind::CloudFunction, "rai-ingest"));
        assert!(!set.contains(ResourceKind::CloudFunction, "unrelated"));
        assert!(set.contains(ResourceKind::FirewallRule, "allow-gke-rai"));
        assert!(set.contains(ResourceKind::FirewallRule, "legacy-ssh"));
        assert!(!set.contains(ResourceKind::FirewallRule, "allow-vms-default"));
        assert!(!set.contains(ResourceKind::CloudRunService, "public-site"));
        assert_eq!(set.site(), Site::Primary);

        let Some(Resource::CloudRunService(service)) =
            set.get(ResourceKind::CloudRunService, "rai-api")
        else {
            panic!("expected run service");
        };
        assert_eq!(service.vpc_connector(), Some("rai-func"));
    }

    #[tokio::test]
    async fn test_firewall_name_filter() {
        let discovery = Discovery::new(Arc::new(inventory()), fast_retry(0));
        let request = DiscoveryRequest {
            firewall_name_filter: Some("^allow-.*".to_string()),
            ..request()
        };
        let set = discovery.discover(&request).await.unwrap();
        assert!(set.contains(ResourceKind::FirewallRule, "allow-gke-rai"));
        assert!(!set.contains(ResourceKind::FirewallRule, "legacy-ssh"));
    }

    #[tokio::test]
    async fn test_invalid_filter_lists_nothing() {
        let source = Arc::new(inventory());
        let discovery = Discovery::new(source.clone(), fast_retry(0));
        let request = DiscoveryRequest {
            firewall_name_filter: Some("(".to_string()),
            ..request()
        };
        let err = discovery.discover(&request).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidFilter(_)));
        assert_eq!(source.calls.lock().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_first_dataproc_cluster_only() {
        let discovery = Discovery::new(Arc::new(inventory()), fast_retry(0));
        let set = discovery.discover(&request()).await.unwrap();
        let clusters: Vec<&str> = set
            .of_kind(ResourceKind::DataprocCluster)
            .map(Resource::name)
            .collect();
        assert_eq!(clusters, vec!["rai-druid"]);
    }

    #[tokio::test]
    async fn test_sql_postgres_databases() {
        let source = Arc::new(inventory());
        let discovery = Discovery::new(source.clone(), fast_retry(0));
        let set = discovery.discover(&request()).await.unwrap();

        assert!(!set.contains(ResourceKind::SqlInstance, "rai-mysql"));
        match set.get(ResourceKind::SqlInstance, "rai-db") {
            Some(Resource::SqlInstance(instance)) => {
                assert_eq!(instance.databases, vec!["rai"]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            source.calls_to(&Query::SqlDatabases {
                instance: "rai-mysql".to_string()
            }),
            0
        );
    }

    #[tokio::test]
    async fn test_not_found_is_empty() {
        let source = FakeInventory::default()
            .items(Query::Networks, json!([{"name": "rai-vpc"}]))
            .reply(
                Query::RedisInstances,
                Err(DiscoveryError::NotFound {
                    command: "gcloud redis instances list".to_string(),
                    message: "SERVICE_DISABLED".to_string(),
                }),
            );
        let discovery = Discovery::new(Arc::new(source), fast_retry(3));
        let set = discovery.discover(&request()).await.unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.count_by_kind()[&ResourceKind::RedisInstance], 0);
    }

    #[tokio::test]
    async fn test_permission_denied_not_retried() {
        let source = Arc::new(FakeInventory::default().reply(
            Query::FirewallRules,
            Err(DiscoveryError::PermissionDenied {
                command: "gcloud compute firewall-rules list".to_string(),
                message: "PERMISSION_DENIED".to_string(),
            }),
        ));
        let discovery = Discovery::new(source.clone(), fast_retry(3));
        let err = discovery.discover(&request()).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::PermissionDenied { .. }));
        assert_eq!(source.calls_to(&Query::FirewallRules), 1);
    }

    #[tokio::test]
    async fn test_throttling_retried_until_success() {
        let source = Arc::new(
            FakeInventory::default()
                .reply(Query::FirewallRules, Err(transient()))
                .reply(Query::FirewallRules, Err(transient()))
                .items(
                    Query::FirewallRules,
                    json!([{"name": "allow-vms-rai", "network": "rai-vpc"}]),
                ),
        );
        let discovery = Discovery::new(source.clone(), fast_retry(3));
        let set = discovery.discover(&request()).await.unwrap();
        assert!(set.contains(ResourceKind::FirewallRule, "allow-vms-rai"));
        assert_eq!(source.calls_to(&Query::FirewallRules), 3);
    }

    #[tokio::test]
    async fn test_throttling_exhausts_budget() {
        let mut source = FakeInventory::default();
        for _ in 0..5 {
            source = source.reply(Query::FirewallRules, Err(transient()));
        }
        let source = Arc::new(source);
        let discovery = Discovery::new(source.clone(), fast_retry(2));
        let err = discovery.discover(&request()).await.unwrap_err();
        match err {
            DiscoveryError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(last.is_transient());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(source.calls_to(&Query::FirewallRules), 3);
    }
}
