use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Memorystore for Redis instance (`google_redis_instance`)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RedisInstance {
    pub name: String,

    #[serde(default)]
    pub display_name: String,

    /// Name of the VPC network allowed to connect
    pub authorized_network: String,

    #[serde(default)]
    pub redis_version: String,

    /// BASIC or STANDARD_HA
    #[serde(default)]
    pub tier: String,

    #[serde(default)]
    pub memory_size_gb: u32,

    #[serde(default = "default_redis_port")]
    pub port: u16,

    #[serde(default)]
    pub connect_mode: String,

    #[serde(default)]
    pub auth_enabled: bool,

    #[serde(default)]
    pub transit_encryption_mode: String,

    #[serde(default)]
    pub redis_configs: BTreeMap<String, String>,

    #[serde(default)]
    pub replica_count: u32,

    #[serde(default)]
    pub read_replicas_mode: String,

    pub persistence_config: Option<PersistenceConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PersistenceConfig {
    pub persistence_mode: String,
}

/// Cloud SQL for PostgreSQL instance (`google_sql_database_instance`)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SqlInstance {
    pub name: String,

    pub database_version: String,

    #[serde(default)]
    pub instance_type: String,

    /// Settings tier, e.g. db-custom-2-7680
    #[serde(default)]
    pub machine_type: String,

    #[serde(default)]
    pub database_flags: Vec<DatabaseFlag>,

    #[serde(default)]
    pub deletion_protection: bool,

    pub backup_configuration: Option<BackupConfiguration>,

    pub ip_configuration: Option<SqlIpConfiguration>,

    #[serde(default)]
    pub availability_type: String,

    #[serde(default)]
    pub data_disk_size_gb: u64,

    #[serde(default)]
    pub data_disk_type: String,

    /// User databases (the built-in `postgres` database is excluded)
    #[serde(default)]
    pub databases: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DatabaseFlag {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BackupConfiguration {
    pub enabled: bool,
    pub binary_log_enabled: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SqlIpConfiguration {
    pub ipv4_enabled: bool,

    /// Name of the VPC network used for private services access
    pub private_network: Option<String>,
}

fn default_redis_port() -> u16 {
    6379
}
