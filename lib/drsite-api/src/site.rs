use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Separator between the parts of a workspace name
pub const WORKSPACE_SEPARATOR: &str = "-";

/// Deployment site of a resource set
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    /// The main operational deployment
    #[default]
    Primary,
    /// The disaster recovery deployment in the DR project/region
    Dr,
}

impl Site {
    pub fn as_str(&self) -> &'static str {
        match self {
            Site::Primary => "primary",
            Site::Dr => "dr",
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("unknown site '{0}' (expected 'primary' or 'dr')")]
pub struct ParseSiteError(pub String);

impl FromStr for Site {
    type Err = ParseSiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(Site::Primary),
            "dr" => Ok(Site::Dr),
            other => Err(ParseSiteError(other.to_string())),
        }
    }
}

/// Explicit execution context threaded through discovery, transform,
/// emit and provisioning.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteContext {
    pub environment: String,
    pub cluster: String,
    pub site: Site,
}

impl SiteContext {
    pub fn new(environment: impl Into<String>, cluster: impl Into<String>, site: Site) -> Self {
        Self {
            environment: environment.into(),
            cluster: cluster.into(),
            site,
        }
    }

    /// Same environment and cluster, different site
    pub fn with_site(&self, site: Site) -> Self {
        Self {
            site,
            ..self.clone()
        }
    }

    /// Workspace name: environment, cluster and site joined in that order
    pub fn workspace_name(&self) -> String {
        [self.environment.as_str(), self.cluster.as_str(), self.site.as_str()]
            .join(WORKSPACE_SEPARATOR)
    }
}

impl fmt::Display for SiteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "environment={} cluster={} site={}",
            self.environment, self.cluster, self.site
        )
    }
}
