//! Site configuration store
//!
//! `configs/config.json` (or YAML) maps each environment to its projects,
//! regions and clusters. Each cluster carries its VPC name, the primary and
//! DR IP plans and optional firewall settings:
//!
//! ```json
//! {
//!   "prod-us": {
//!     "project_id": "rai-prod",
//!     "region": "us-central1",
//!     "dr_region": "us-east1",
//!     "r1-rai": {
//!       "vpc": "rai-vpc",
//!       "ip_ranges": { "primary": { ... }, "dr": { ... } },
//!       "firewall": { "unknown": "reject" }
//!     }
//!   }
//! }
//! ```

use crate::firewall::FirewallPolicy;
use crate::{CoreError, Result};
use drsite_api::{Site, SiteContext, SiteIpRanges};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Whole configuration file, keyed by environment
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteConfig {
    environments: BTreeMap<String, EnvironmentConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub project_id: String,

    pub region: String,

    /// Defaults to `project_id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dr_project_id: Option<String>,

    pub dr_region: String,

    /// Every other key is a cluster
    #[serde(flatten)]
    pub clusters: BTreeMap<String, ClusterConfig>,
}

impl EnvironmentConfig {
    pub fn project_for(&self, site: Site) -> &str {
        match site {
            Site::Primary => &self.project_id,
            Site::Dr => self.dr_project_id.as_deref().unwrap_or(&self.project_id),
        }
    }

    pub fn region_for(&self, site: Site) -> &str {
        match site {
            Site::Primary => &self.region,
            Site::Dr => &self.dr_region,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Name of the VPC network discovery is scoped to
    pub vpc: String,

    pub ip_ranges: ClusterIpRanges,

    #[serde(default)]
    pub firewall: FirewallPolicy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterIpRanges {
    pub primary: SiteIpRanges,
    pub dr: SiteIpRanges,
}

impl ClusterIpRanges {
    pub fn for_site(&self, site: Site) -> &SiteIpRanges {
        match site {
            Site::Primary => &self.primary,
            Site::Dr => &self.dr,
        }
    }
}

/// Everything one (environment, cluster, site) needs, resolved from the file
#[derive(Clone, Debug, PartialEq)]
pub struct SiteSettings {
    pub context: SiteContext,
    pub project_id: String,
    pub region: String,
    pub vpc: String,
    pub ip_ranges: SiteIpRanges,
    pub firewall: FirewallPolicy,
}

impl SiteConfig {
    /// Load and validate a config file; `.yaml`/`.yml` is read as YAML, anything else as JSON
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;

        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text)?,
            _ => Self::from_json_str(&text)?,
        };

        info!(
            "Loaded site configuration from {} ({} environments)",
            path.display(),
            config.environments.len()
        );
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: SiteConfig = serde_json::from_str(text)
            .map_err(|e| CoreError::Configuration(format!("invalid JSON configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: SiteConfig = serde_yaml::from_str(text)
            .map_err(|e| CoreError::Configuration(format!("invalid YAML configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check required values, IP plan overlaps and firewall filters
    pub fn validate(&self) -> Result<()> {
        for (env_name, env) in &self.environments {
            for (key, value) in [
                ("project_id", &env.project_id),
                ("region", &env.region),
                ("dr_region", &env.dr_region),
            ] {
                if value.trim().is_empty() {
                    return Err(CoreError::Configuration(format!(
                        "environment '{}': {} is empty",
                        env_name, key
                    )));
                }
            }

            for (cluster_name, cluster) in &env.clusters {
                if cluster.vpc.trim().is_empty() {
                    return Err(CoreError::Configuration(format!(
                        "environment '{}' cluster '{}': vpc is empty",
                        env_name, cluster_name
                    )));
                }

                for site in [Site::Primary, Site::Dr] {
                    let overlaps = cluster.ip_ranges.for_site(site).overlapping_pairs();
                    if let Some((left, right)) = overlaps.first() {
                        return Err(CoreError::Configuration(format!(
                            "environment '{}' cluster '{}' site {}: {} overlaps {}",
                            env_name, cluster_name, site, left, right
                        )));
                    }
                }

                if let Some(filter) = &cluster.firewall.name_filter {
                    Regex::new(filter).map_err(|e| {
                        CoreError::Configuration(format!(
                            "environment '{}' cluster '{}': invalid firewall name filter: {}",
                            env_name, cluster_name, e
                        ))
                    })?;
                }

                debug!("Validated cluster {}/{}", env_name, cluster_name);
            }
        }
        Ok(())
    }

    pub fn environment(&self, name: &str) -> Result<&EnvironmentConfig> {
        self.environments.get(name).ok_or_else(|| {
            CoreError::Configuration(format!("environment '{}' not found in configuration", name))
        })
    }

    pub fn cluster(&self, environment: &str, cluster: &str) -> Result<&ClusterConfig> {
        self.environment(environment)?
            .clusters
            .get(cluster)
            .ok_or_else(|| {
                CoreError::Configuration(format!(
                    "cluster '{}' not found in environment '{}'",
                    cluster, environment
                ))
            })
    }

    /// Resolve project, region, VPC and IP plan for one site
    pub fn site_settings(&self, context: &SiteContext) -> Result<SiteSettings> {
        let env = self.environment(&context.environment)?;
        let cluster = self.cluster(&context.environment, &context.cluster)?;

        Ok(SiteSettings {
            context: context.clone(),
            project_id: env.project_for(context.site).to_string(),
            region: env.region_for(context.site).to_string(),
            vpc: cluster.vpc.clone(),
            ip_ranges: *cluster.ip_ranges.for_site(context.site),
            firewall: cluster.firewall.clone(),
        })
    }

    pub fn environments(&self) -> impl Iterator<Item = (&str, &EnvironmentConfig)> {
        self.environments.iter().map(|(name, env)| (name.as_str(), env))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firewall::UnknownAudiencePolicy;
    use std::io::Write;

    const CONFIG: &str = r#"{
        "prod-us": {
            "project_id": "rai-prod",
            "region": "us-central1",
            "dr_region": "us-east1",
            "r1-rai": {
                "vpc": "rai-vpc",
                "ip_ranges": {
                    "primary": {
                        "subnet_ip_cidr_range": "10.1.1.0/28",
                        "secondary_ip_range_pod": "10.2.2.0/24",
                        "secondary_ip_range_svc": "10.3.3.0/24",
                        "vpc_connector_ip_cidr_range": "10.4.4.0/28",
                        "gke_master_ip_cidr_range": "10.5.5.0/28"
                    },
                    "dr": {
                        "subnet_ip_cidr_range": "10.6.6.0/28",
                        "secondary_ip_range_pod": "10.7.7.0/24",
                        "secondary_ip_range_svc": "10.8.8.0/24",
                        "vpc_connector_ip_cidr_range": "10.9.9.0/28",
                        "gke_master_ip_cidr_range": "10.10.10.0/28"
                    }
                },
                "firewall": { "unknown": "reject", "name_filter": "^dpc.*-allow-.*" }
            }
        }
    }"#;

    #[test]
    fn test_site_settings() {
        let config = SiteConfig::from_json_str(CONFIG).unwrap();

        let primary = config
            .site_settings(&SiteContext::new("prod-us", "r1-rai", Site::Primary))
            .unwrap();
        assert_eq!(primary.project_id, "rai-prod");
        assert_eq!(primary.region, "us-central1");
        assert_eq!(primary.vpc, "rai-vpc");
        assert_eq!(primary.ip_ranges.subnet_ip_cidr_range.to_string(), "10.1.1.0/28");

        let dr = config
            .site_settings(&SiteContext::new("prod-us", "r1-rai", Site::Dr))
            .unwrap();
        // No dr_project_id: same project, DR region
        assert_eq!(dr.project_id, "rai-prod");
        assert_eq!(dr.region, "us-east1");
        assert_eq!(dr.ip_ranges.subnet_ip_cidr_range.to_string(), "10.6.6.0/28");
        assert_eq!(dr.firewall.unknown, UnknownAudiencePolicy::Reject);
    }

    #[test]
    fn test_dr_project_override() {
        let text = CONFIG.replace(
            r#""dr_region": "us-east1","#,
            r#""dr_region": "us-east1", "dr_project_id": "rai-prod-dr","#,
        );
        let config = SiteConfig::from_json_str(&text).unwrap();
        let env = config.environment("prod-us").unwrap();
        assert_eq!(env.project_for(Site::Dr), "rai-prod-dr");
        assert_eq!(env.project_for(Site::Primary), "rai-prod");
    }

    #[test]
    fn test_unknown_environment_and_cluster() {
        let config = SiteConfig::from_json_str(CONFIG).unwrap();
        assert!(matches!(
            config.environment("staging"),
            Err(CoreError::Configuration(_))
        ));
        assert!(matches!(
            config.cluster("prod-us", "r9-rai"),
            Err(CoreError::Configuration(_))
        ));
    }

    #[test]
    fn test_overlapping_ranges_rejected() {
        let text = CONFIG.replace(
            r#""secondary_ip_range_svc": "10.8.8.0/24""#,
            r#""secondary_ip_range_svc": "10.7.7.128/25""#,
        );
        let err = SiteConfig::from_json_str(&text).unwrap_err();
        match err {
            CoreError::Configuration(msg) => {
                assert!(msg.contains("site dr"), "{}", msg);
                assert!(msg.contains("secondary_ip_range_pod"), "{}", msg);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_invalid_cidr_rejected() {
        let text = CONFIG.replace("10.6.6.0/28", "10.6.6.0/40");
        assert!(matches!(
            SiteConfig::from_json_str(&text),
            Err(CoreError::Configuration(_))
        ));
    }

    #[test]
    fn test_invalid_name_filter_rejected() {
        let text = CONFIG.replace("^dpc.*-allow-.*", "dpc-(");
        assert!(matches!(
            SiteConfig::from_json_str(&text),
            Err(CoreError::Configuration(_))
        ));
    }

    #[test]
    fn test_load_yaml_by_extension() {
        let json: serde_json::Value = serde_json::from_str(CONFIG).unwrap();
        let yaml = serde_yaml::to_string(&json).unwrap();

        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = SiteConfig::load(file.path()).unwrap();
        assert_eq!(config.cluster("prod-us", "r1-rai").unwrap().vpc, "rai-vpc");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SiteConfig::load(&dir.path().join("config.json")).unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
    }
}
