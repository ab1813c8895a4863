//! Variable document emission

use crate::resource_set::ResourceSet;
use crate::{CoreError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use drsite_api::{Resource, Site, VariableDocument, DR_SUFFIX};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const DOCUMENT_EXTENSION: &str = ".tfvars.json";

/// Output locations for one (environment, cluster)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentPaths {
    pub primary: PathBuf,
    pub dr: PathBuf,
}

impl DocumentPaths {
    /// `<config_dir>/<environment>/<cluster>.tfvars.json` and its `-dr` sibling
    pub fn new(config_dir: &Path, environment: &str, cluster: &str) -> Self {
        let dir = config_dir.join(environment);
        Self {
            primary: dir.join(format!("{}{}", cluster, DOCUMENT_EXTENSION)),
            dr: dir.join(format!("{}{}{}", cluster, DR_SUFFIX, DOCUMENT_EXTENSION)),
        }
    }

    pub fn for_site(&self, site: Site) -> &Path {
        match site {
            Site::Primary => &self.primary,
            Site::Dr => &self.dr,
        }
    }
}

/// A document and where it goes
#[derive(Clone, Debug, PartialEq)]
pub struct EmittedDocument {
    pub site: Site,
    pub path: PathBuf,
    pub document: VariableDocument,
}

/// Lay out a site's resources as a variable document
pub fn build_document(
    set: &ResourceSet,
    project: &str,
    region: &str,
    generated_at: DateTime<Utc>,
) -> Result<VariableDocument> {
    let mut document = VariableDocument {
        timestamp: generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        project: project.to_string(),
        region: region.to_string(),
        ..Default::default()
    };

    for resource in set.iter() {
        match resource.clone() {
            Resource::Network(network) => {
                if let Some(existing) = &document.compute_network {
                    return Err(CoreError::Emit(format!(
                        "{} site has more than one network ({}, {})",
                        set.site(),
                        existing.name,
                        network.name
                    )));
                }
                document.compute_network = Some(network);
            }
            Resource::Subnetwork(subnet) => document.compute_subnetworks.push(subnet),
            Resource::NatRouter(router) => {
                document.nat_routers.insert(router.name.clone(), router);
            }
            Resource::VpcConnector(connector) => document.vpc_access_connectors.push(connector),
            Resource::DataprocCluster(cluster) => {
                if let Some(existing) = &document.dataproc_cluster {
                    return Err(CoreError::Emit(format!(
                        "{} site has more than one Dataproc cluster ({}, {})",
                        set.site(),
                        existing.cluster_name,
                        cluster.cluster_name
                    )));
                }
                document.dataproc_cluster = Some(cluster);
            }
            Resource::ContainerCluster(cluster) => document.container_clusters.push(cluster),
            Resource::ComputeAddress(address) => document.compute_addresses.push(address),
            Resource::CloudFunction(function) => document.cloud_functions.push(function),
            Resource::CloudRunService(service) => document.cloud_run_services.push(service),
            Resource::FirewallRule(rule) => document.firewall_rules.push(rule),
            Resource::RedisInstance(instance) => document.redis_instances.push(instance),
            Resource::SqlInstance(instance) => document.sql_postgres_instances.push(instance),
        }
    }

    debug!(
        "Built {} document with {} resources",
        set.site(),
        document.resource_count()
    );
    Ok(document)
}

/// Write every document or none of them.
///
/// All documents are serialized and written to temporary files next to
/// their destinations first; they are renamed into place only once every
/// write has succeeded. Existing documents are copied aside before the
/// renames and put back if a later rename fails.
pub fn write_documents(documents: &[EmittedDocument]) -> Result<()> {
    let mut staged: Vec<(NamedTempFile, &EmittedDocument)> = Vec::with_capacity(documents.len());

    for emitted in documents {
        let mut body = serde_json::to_vec_pretty(&emitted.document)?;
        body.push(b'\n');

        let dir = match emitted.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| {
            CoreError::Emit(format!("cannot create {}: {}", dir.display(), e))
        })?;

        let mut temp = NamedTempFile::new_in(&dir)?;
        temp.write_all(&body)?;
        temp.as_file().sync_all()?;
        staged.push((temp, emitted));
    }

    let backups = staged
        .iter()
        .map(|(_, emitted)| backup(&emitted.path))
        .collect::<Result<Vec<_>>>()?;

    let mut persisted = 0;
    for (temp, emitted) in staged {
        if let Err(e) = temp.persist(&emitted.path) {
            restore(&documents[..persisted], backups);
            return Err(CoreError::Emit(format!(
                "cannot move document into {}: {}",
                emitted.path.display(),
                e.error
            )));
        }
        persisted += 1;
    }

    for emitted in documents {
        info!(
            "Wrote {} variables ({} resources) to {}",
            emitted.site,
            emitted.document.resource_count(),
            emitted.path.display()
        );
    }
    Ok(())
}

/// Copy of an existing document, kept next to it until the write completes
fn backup(path: &Path) -> Result<Option<NamedTempFile>> {
    if !path.is_file() {
        return Ok(None);
    }
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let copy = NamedTempFile::new_in(dir)?;
    std::fs::copy(path, copy.path())?;
    Ok(Some(copy))
}

/// Undo the renames of `persisted`, restoring prior content where there was some
fn restore(persisted: &[EmittedDocument], backups: Vec<Option<NamedTempFile>>) {
    for (emitted, backup) in persisted.iter().zip(backups) {
        let restored = match backup {
            Some(copy) => copy.persist(&emitted.path).map(drop).map_err(|e| e.error),
            None => std::fs::remove_file(&emitted.path),
        };
        if let Err(e) = restored {
            warn!("Cannot roll back {}: {}", emitted.path.display(), e);
        }
    }
}
