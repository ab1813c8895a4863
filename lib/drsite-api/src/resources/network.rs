use ipnetwork::IpNetwork;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// VPC network (`google_compute_network`)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Network {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub auto_create_subnetworks: bool,

    /// REGIONAL or GLOBAL
    pub routing_mode: Option<String>,

    pub mtu: Option<u32>,
}

/// Subnetwork (`google_compute_subnetwork`)
///
/// A subnetwork with secondary ranges hosts GKE workloads; one without
/// secondary ranges backs a serverless VPC access connector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Subnetwork {
    pub name: String,

    /// Name of the parent network
    pub network: String,

    #[serde(default)]
    pub description: String,

    #[schemars(with = "String")]
    pub ip_cidr_range: IpNetwork,

    /// First usable host of `ip_cidr_range`
    pub gateway_address: Option<IpAddr>,

    #[serde(default)]
    pub private_ip_google_access: bool,

    #[serde(default)]
    pub secondary_ip_range: Vec<SecondaryRange>,
}

impl Subnetwork {
    /// Whether this subnetwork carries GKE secondary ranges
    pub fn is_workload_subnet(&self) -> bool {
        !self.secondary_ip_range.is_empty()
    }
}

/// Secondary (alias IP) range of a subnetwork
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SecondaryRange {
    #[serde(rename = "name")]
    pub range_name: String,

    #[schemars(with = "String")]
    pub ip_cidr_range: IpNetwork,
}

/// Cloud Router with a NAT config (`google_compute_router` + `google_compute_router_nat`)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NatRouter {
    pub name: String,

    pub network: String,

    #[serde(default)]
    pub description: String,

    pub nat: Option<RouterNat>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RouterNat {
    pub name: String,

    #[serde(default)]
    pub nat_ip_allocate_option: String,

    #[serde(default)]
    pub source_subnetwork_ip_ranges_to_nat: String,

    pub max_ports_per_vm: Option<u32>,

    pub log_config: Option<NatLogConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NatLogConfig {
    pub enable: bool,
    pub filter: String,
}

/// Serverless VPC access connector (`google_vpc_access_connector`)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VpcConnector {
    pub name: String,

    pub network: String,

    /// Set when the connector owns a /28 instead of using a subnetwork
    #[schemars(with = "Option<String>")]
    pub ip_cidr_range: Option<IpNetwork>,

    pub min_throughput: Option<u32>,

    pub max_throughput: Option<u32>,

    pub machine_type: Option<String>,

    pub subnet: Option<ConnectorSubnet>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConnectorSubnet {
    /// Name of the subnetwork the connector runs in
    pub name: String,
}

/// Reserved static address (`google_compute_address`)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ComputeAddress {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// INTERNAL or EXTERNAL
    #[serde(default)]
    pub address_type: String,

    #[serde(default)]
    pub purpose: String,

    pub ip_version: Option<String>,

    pub network_tier: Option<String>,

    pub subnetwork: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secondary_range_field_name() {
        let range = SecondaryRange {
            range_name: "rai-pod".to_string(),
            ip_cidr_range: "10.7.7.0/24".parse().unwrap(),
        };
        let value = serde_json::to_value(&range).unwrap();
        assert_eq!(value["name"], "rai-pod");
        assert_eq!(value["ip_cidr_range"], "10.7.7.0/24");
    }

    #[test]
    fn test_workload_subnet() {
        let mut subnet = Subnetwork {
            name: "rai-subnet".to_string(),
            network: "rai-vpc".to_string(),
            description: String::new(),
            ip_cidr_range: "10.1.1.0/28".parse().unwrap(),
            gateway_address: None,
            private_ip_google_access: true,
            secondary_ip_range: vec![],
        };
        assert!(!subnet.is_workload_subnet());

        subnet.secondary_ip_range.push(SecondaryRange {
            range_name: "rai-pod".to_string(),
            ip_cidr_range: "10.2.0.0/16".parse().unwrap(),
        });
        assert!(subnet.is_workload_subnet());
    }
}
