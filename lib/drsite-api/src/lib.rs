//! Resource types for the GCP primary/DR site generator
//!
//! This library defines the data model shared by discovery, transform and emit:
//! - Site and SiteContext: which (environment, cluster, site) a run targets
//! - SiteIpRanges: the fixed IP plan of one site
//! - Resource: tagged union over every supported GCP resource kind
//! - VariableDocument: the Terraform variable file layout

pub mod document;
pub mod ip_ranges;
pub mod resources;
pub mod site;

pub use document::VariableDocument;
pub use ip_ranges::SiteIpRanges;
pub use resources::{Resource, ResourceDescriptor, ResourceKind};
pub use site::{ParseSiteError, Site, SiteContext};

/// Suffix appended to every DR-site resource name
pub const DR_SUFFIX: &str = "-dr";
