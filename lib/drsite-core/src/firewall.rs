//! Firewall rule audience classification

use crate::{CoreError, Result};
use drsite_api::resources::FirewallRule;
use drsite_api::SiteIpRanges;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_GKE_PATTERN: &str = "allow-gke";
pub const DEFAULT_VM_PATTERN: &str = "allow-vms";

/// Workloads a firewall rule admits traffic from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Audience {
    /// GKE pods and services
    Gke,
    /// VMs in the workload subnetwork
    Vm,
    Unknown,
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Audience::Gke => f.write_str("gke"),
            Audience::Vm => f.write_str("vm"),
            Audience::Unknown => f.write_str("unknown"),
        }
    }
}

/// What to do with rules neither pattern matches
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownAudiencePolicy {
    /// Keep the rule's source ranges as they are
    #[default]
    PassThrough,
    /// Fail the transform
    Reject,
}

/// Per-cluster firewall settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewallPolicy {
    /// Substring marking rules for GKE traffic
    pub gke_pattern: String,

    /// Substring marking rules for VM traffic
    pub vm_pattern: String,

    pub unknown: UnknownAudiencePolicy,

    /// Regex on rule names; only matching rules are discovered
    pub name_filter: Option<String>,
}

impl Default for FirewallPolicy {
    fn default() -> Self {
        Self {
            gke_pattern: DEFAULT_GKE_PATTERN.to_string(),
            vm_pattern: DEFAULT_VM_PATTERN.to_string(),
            unknown: UnknownAudiencePolicy::default(),
            name_filter: None,
        }
    }
}

/// Classifies rules by name and computes their DR source ranges
#[derive(Clone, Debug)]
pub struct FirewallClassifier {
    policy: FirewallPolicy,
}

impl FirewallClassifier {
    pub fn new(policy: FirewallPolicy) -> Self {
        Self { policy }
    }

    /// GKE pattern is checked first
    pub fn classify(&self, rule_name: &str) -> Audience {
        if !self.policy.gke_pattern.is_empty() && rule_name.contains(&self.policy.gke_pattern) {
            Audience::Gke
        } else if !self.policy.vm_pattern.is_empty() && rule_name.contains(&self.policy.vm_pattern) {
            Audience::Vm
        } else {
            Audience::Unknown
        }
    }

    /// Source ranges the DR counterpart of `rule` should carry
    pub fn dr_source_ranges(&self, rule: &FirewallRule, dr: &SiteIpRanges) -> Result<Vec<String>> {
        match self.classify(&rule.name) {
            Audience::Gke => Ok(vec![
                dr.secondary_ip_range_pod.to_string(),
                dr.secondary_ip_range_svc.to_string(),
            ]),
            Audience::Vm => Ok(vec![dr.subnet_ip_cidr_range.to_string()]),
            Audience::Unknown => match self.policy.unknown {
                UnknownAudiencePolicy::PassThrough => Ok(rule.source_ranges.clone()),
                UnknownAudiencePolicy::Reject => Err(CoreError::TransformPolicy(format!(
                    "firewall rule '{}' matches neither '{}' nor '{}'",
                    rule.name, self.policy.gke_pattern, self.policy.vm_pattern
                ))),
            },
        }
    }
}

impl Default for FirewallClassifier {
    fn default() -> Self {
        Self::new(FirewallPolicy::default())
    }
}
