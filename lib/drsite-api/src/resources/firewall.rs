use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// VPC firewall rule (`google_compute_firewall`)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FirewallRule {
    pub name: String,

    pub network: String,

    #[serde(default)]
    pub description: String,

    /// Lower value wins
    #[serde(default = "default_priority")]
    pub priority: u32,

    #[serde(default)]
    pub direction: FirewallDirection,

    #[serde(default)]
    pub disabled: bool,

    /// Kept as written in the source rule (CIDRs or bare addresses)
    #[serde(default)]
    pub source_ranges: Vec<String>,

    #[serde(default)]
    pub destination_ranges: Vec<String>,

    #[serde(default)]
    pub source_tags: Vec<String>,

    #[serde(default)]
    pub target_tags: Vec<String>,

    #[serde(default)]
    pub source_service_accounts: Vec<String>,

    #[serde(default)]
    pub target_service_accounts: Vec<String>,

    #[serde(default)]
    pub allowed: Vec<FirewallPorts>,

    #[serde(default)]
    pub denied: Vec<FirewallPorts>,
}

/// Traffic direction of a firewall rule
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum FirewallDirection {
    #[default]
    Ingress,
    Egress,
}

/// Protocol and port list of an allow/deny entry
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FirewallPorts {
    /// tcp, udp, icmp, all or an IP protocol number
    pub ip_protocol: String,

    #[serde(default)]
    pub ports: Vec<String>,
}

fn default_priority() -> u32 {
    1000
}
