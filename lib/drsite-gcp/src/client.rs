//! Inventory backends

use crate::error::{classify_failure, DiscoveryError, Result};
use crate::policy::TimeoutPolicy;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// One list call against the cloud inventory
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Query {
    Networks,
    Subnetworks,
    Routers,
    VpcConnectors,
    DataprocClusters,
    ContainerClusters,
    Addresses,
    Functions,
    RunServices,
    FirewallRules,
    RedisInstances,
    SqlInstances,
    SqlDatabases { instance: String },
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Networks => f.write_str("networks"),
            Query::Subnetworks => f.write_str("subnetworks"),
            Query::Routers => f.write_str("routers"),
            Query::VpcConnectors => f.write_str("vpc connectors"),
            Query::DataprocClusters => f.write_str("dataproc clusters"),
            Query::ContainerClusters => f.write_str("container clusters"),
            Query::Addresses => f.write_str("addresses"),
            Query::Functions => f.write_str("functions"),
            Query::RunServices => f.write_str("run services"),
            Query::FirewallRules => f.write_str("firewall rules"),
            Query::RedisInstances => f.write_str("redis instances"),
            Query::SqlInstances => f.write_str("sql instances"),
            Query::SqlDatabases { instance } => write!(f, "sql databases of {}", instance),
        }
    }
}

/// A query scoped to a project and region
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventoryRequest {
    pub project: String,
    pub region: String,
    pub query: Query,
}

impl InventoryRequest {
    pub fn new(project: &str, region: &str, query: Query) -> Self {
        Self {
            project: project.to_string(),
            region: region.to_string(),
            query,
        }
    }
}

impl fmt::Display for InventoryRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}/{}", self.query, self.project, self.region)
    }
}

/// Read-only access to the cloud inventory
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Return the raw JSON items of one list call
    async fn list(&self, request: &InventoryRequest) -> Result<Vec<Value>>;
}

/// Inventory backed by the gcloud CLI
#[derive(Clone, Debug)]
pub struct GcloudCli {
    program: PathBuf,
    timeout: TimeoutPolicy,
}

impl GcloudCli {
    pub fn new(program: impl Into<PathBuf>, timeout: TimeoutPolicy) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Command-line arguments for a request
    pub fn args(request: &InventoryRequest) -> Vec<String> {
        let region = request.region.as_str();
        let mut args: Vec<&str> = match &request.query {
            Query::Networks => vec!["compute", "networks", "list"],
            Query::Subnetworks => vec!["compute", "networks", "subnets", "list", "--regions", region],
            Query::Routers => vec!["compute", "routers", "list", "--regions", region],
            Query::VpcConnectors => vec![
                "compute", "networks", "vpc-access", "connectors", "list", "--region", region,
            ],
            Query::DataprocClusters => vec!["dataproc", "clusters", "list", "--region", region],
            Query::ContainerClusters => vec!["container", "clusters", "list"],
            Query::Addresses => vec!["compute", "addresses", "list", "--regions", region],
            Query::Functions => vec!["functions", "list", "--regions", region],
            Query::RunServices => vec!["run", "services", "list", "--platform", "managed", "--region", region],
            Query::FirewallRules => vec!["compute", "firewall-rules", "list"],
            Query::RedisInstances => vec!["redis", "instances", "list", "--region", region],
            Query::SqlInstances => vec!["sql", "instances", "list"],
            Query::SqlDatabases { instance } => {
                vec!["sql", "databases", "list", "--instance", instance.as_str()]
            }
        };
        args.extend(["--project", request.project.as_str(), "--format", "json", "--quiet"]);
        args.into_iter().map(str::to_string).collect()
    }
}

#[async_trait]
impl InventorySource for GcloudCli {
    async fn list(&self, request: &InventoryRequest) -> Result<Vec<Value>> {
        let args = Self::args(request);
        let command_line = format!("{} {}", self.program.display(), args.join(" "));
        debug!("Running {}", command_line);

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout.call_timeout, command.output())
            .await
            .map_err(|_| DiscoveryError::Timeout {
                command: command_line.clone(),
                timeout: self.timeout.call_timeout,
            })?
            .map_err(|source| DiscoveryError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&command_line, &stderr));
        }

        parse_list_output(&command_line, &output.stdout)
    }
}

/// gcloud prints nothing (or `[]`) for an empty list
pub(crate) fn parse_list_output(command: &str, stdout: &[u8]) -> Result<Vec<Value>> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(stdout).map_err(|e| DiscoveryError::Malformed {
        what: format!("output of {}", command),
        message: e.to_string(),
    })
}
