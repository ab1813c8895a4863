//! Discover, transform and emit both variable documents for one cluster

use chrono::Utc;
use drsite_api::{Site, SiteContext};
use drsite_core::{
    build_document, write_documents, DocumentPaths, DrTransform, EmittedDocument,
    FirewallClassifier, SiteConfig,
};
use drsite_gcp::{Discovery, DiscoveryRequest};
use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, Level};

/// Step of the generation pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Configuration,
    Discovery,
    Transform,
    Emit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Configuration => f.write_str("configuration"),
            Stage::Discovery => f.write_str("discovery"),
            Stage::Transform => f.write_str("transform"),
            Stage::Emit => f.write_str("emit"),
        }
    }
}

#[derive(Error, Debug)]
#[error("{stage} failed ({context}): {source}")]
pub struct PipelineError {
    pub context: SiteContext,
    pub stage: Stage,
    #[source]
    pub source: Box<dyn StdError + Send + Sync>,
}

impl PipelineError {
    fn at<E>(context: &SiteContext, stage: Stage) -> impl FnOnce(E) -> Self + '_
    where
        E: StdError + Send + Sync + 'static,
    {
        move |source| Self {
            context: context.clone(),
            stage,
            source: Box::new(source),
        }
    }
}

pub struct Pipeline {
    config: SiteConfig,
    config_dir: PathBuf,
    discovery: Discovery,
}

impl Pipeline {
    pub fn new(config: SiteConfig, config_dir: impl Into<PathBuf>, discovery: Discovery) -> Self {
        Self {
            config,
            config_dir: config_dir.into(),
            discovery,
        }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Regenerate the primary and DR documents of one cluster.
    ///
    /// Nothing is written unless every stage succeeds for both sites.
    pub async fn generate(
        &self,
        environment: &str,
        cluster: &str,
    ) -> Result<DocumentPaths, PipelineError> {
        let primary_context = SiteContext::new(environment, cluster, Site::Primary);
        let dr_context = primary_context.with_site(Site::Dr);

        let primary = self
            .config
            .site_settings(&primary_context)
            .map_err(PipelineError::at(&primary_context, Stage::Configuration))?;
        let dr = self
            .config
            .site_settings(&dr_context)
            .map_err(PipelineError::at(&dr_context, Stage::Configuration))?;

        let request = DiscoveryRequest {
            project: primary.project_id.clone(),
            region: primary.region.clone(),
            vpc: primary.vpc.clone(),
            firewall_name_filter: primary.firewall.name_filter.clone(),
        };
        let primary_set = self
            .discovery
            .discover(&request)
            .await
            .map_err(PipelineError::at(&primary_context, Stage::Discovery))?;

        let transform = DrTransform::new(dr.ip_ranges, FirewallClassifier::new(dr.firewall.clone()));
        let dr_set = transform
            .transform(&primary_set)
            .map_err(PipelineError::at(&dr_context, Stage::Transform))?;
        if tracing::enabled!(Level::DEBUG) {
            for descriptor in dr_set.descriptors() {
                debug!(
                    "{} {} {} (network {})",
                    descriptor.site,
                    descriptor.kind(),
                    descriptor.name(),
                    descriptor.network().unwrap_or("-")
                );
            }
        }

        let paths = DocumentPaths::new(&self.config_dir, environment, cluster);
        let generated_at = Utc::now();
        let documents = vec![
            EmittedDocument {
                site: Site::Primary,
                path: paths.primary.clone(),
                document: build_document(
                    &primary_set,
                    &primary.project_id,
                    &primary.region,
                    generated_at,
                )
                .map_err(PipelineError::at(&primary_context, Stage::Emit))?,
            },
            EmittedDocument {
                site: Site::Dr,
                path: paths.dr.clone(),
                document: build_document(&dr_set, &dr.project_id, &dr.region, generated_at)
                    .map_err(PipelineError::at(&dr_context, Stage::Emit))?,
            },
        ];
        write_documents(&documents).map_err(PipelineError::at(&primary_context, Stage::Emit))?;

        info!(
            "Generated {} ({} resources) and {} ({} resources)",
            paths.primary.display(),
            primary_set.len(),
            paths.dr.display(),
            dr_set.len()
        );
        Ok(paths)
    }
}
