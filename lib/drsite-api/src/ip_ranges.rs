use ipnetwork::IpNetwork;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Fixed IP plan of one site of one (environment, cluster)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SiteIpRanges {
    /// Primary range of the workload subnetwork
    #[schemars(with = "String")]
    pub subnet_ip_cidr_range: IpNetwork,

    /// Secondary range used for GKE pods
    #[schemars(with = "String")]
    pub secondary_ip_range_pod: IpNetwork,

    /// Secondary range used for GKE services
    #[schemars(with = "String")]
    pub secondary_ip_range_svc: IpNetwork,

    /// Range of the serverless VPC access connector subnetwork
    #[schemars(with = "String")]
    pub vpc_connector_ip_cidr_range: IpNetwork,

    /// GKE control-plane range
    #[schemars(with = "String")]
    pub gke_master_ip_cidr_range: IpNetwork,
}

impl SiteIpRanges {
    /// All ranges paired with their config key, in declaration order
    pub fn named_ranges(&self) -> [(&'static str, IpNetwork); 5] {
        [
            ("subnet_ip_cidr_range", self.subnet_ip_cidr_range),
            ("secondary_ip_range_pod", self.secondary_ip_range_pod),
            ("secondary_ip_range_svc", self.secondary_ip_range_svc),
            ("vpc_connector_ip_cidr_range", self.vpc_connector_ip_cidr_range),
            ("gke_master_ip_cidr_range", self.gke_master_ip_cidr_range),
        ]
    }

    /// Every pair of ranges in this site that share at least one address
    pub fn overlapping_pairs(&self) -> Vec<(&'static str, &'static str)> {
        let ranges = self.named_ranges();
        let mut pairs = Vec::new();
        for (i, (left_name, left)) in ranges.iter().enumerate() {
            for (right_name, right) in &ranges[i + 1..] {
                if networks_overlap(left, right) {
                    pairs.push((*left_name, *right_name));
                }
            }
        }
        pairs
    }
}

/// Two CIDR blocks overlap iff one contains the other's network address
pub fn networks_overlap(a: &IpNetwork, b: &IpNetwork) -> bool {
    match (a, b) {
        (IpNetwork::V4(_), IpNetwork::V4(_)) | (IpNetwork::V6(_), IpNetwork::V6(_)) => {
            a.contains(b.network()) || b.contains(a.network())
        }
        _ => false,
    }
}
