use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Template annotation naming the VPC access connector of a Cloud Run service
pub const VPC_CONNECTOR_ANNOTATION: &str = "run.googleapis.com/vpc-access-connector";

/// Cloud Function, 1st gen (`google_cloudfunctions_function`)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CloudFunction {
    pub name: String,

    pub runtime: String,

    pub available_memory_mb: Option<u32>,

    pub source_archive_bucket: String,

    pub source_archive_object: String,

    /// Seconds
    pub timeout: Option<u32>,

    pub entry_point: Option<String>,

    #[serde(default)]
    pub trigger_http: bool,

    /// Name of the VPC access connector
    pub vpc_connector: String,

    pub vpc_connector_egress_settings: String,

    #[serde(default)]
    pub environment_variables: BTreeMap<String, String>,

    #[serde(default)]
    pub min_instances: u32,

    #[serde(default)]
    pub max_instances: u32,
}

/// Cloud Run service (`google_cloud_run_service`)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CloudRunService {
    pub name: String,

    #[serde(default)]
    pub template: RunTemplate,

    #[serde(default)]
    pub traffic: Vec<RunTraffic>,
}

impl CloudRunService {
    /// Connector referenced by the revision template, if any
    pub fn vpc_connector(&self) -> Option<&str> {
        self.template
            .metadata
            .annotations
            .get(VPC_CONNECTOR_ANNOTATION)
            .map(String::as_str)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RunTemplate {
    #[serde(default)]
    pub metadata: RunTemplateMetadata,

    #[serde(default)]
    pub spec: RunTemplateSpec,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RunTemplateMetadata {
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RunTemplateSpec {
    pub timeout_seconds: Option<u32>,

    pub container_concurrency: Option<u32>,

    #[serde(default)]
    pub containers: Vec<RunContainer>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RunContainer {
    pub image: String,

    pub command: Option<Vec<String>>,

    pub args: Option<Vec<String>>,

    /// Literal-valued variables only
    #[serde(default)]
    pub env: Vec<EnvVar>,

    /// Passed through verbatim
    pub resources: Option<serde_json::Value>,

    /// Passed through verbatim
    pub ports: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RunTraffic {
    pub percent: Option<u32>,
    pub latest_revision: Option<bool>,
    pub revision_name: Option<String>,
    pub tag: Option<String>,
}
