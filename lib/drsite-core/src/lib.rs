//! Site configuration, DR transform and variable file emission
//!
//! This library provides:
//! - Site configuration store with IP plan validation
//! - Resource set keyed by (kind, name)
//! - DR transform engine (naming, references, IP ranges, firewall audiences)
//! - Variable document emitter with atomic writes

pub mod config;
pub mod emit;
pub mod error;
pub mod firewall;
pub mod naming;
pub mod network;
pub mod resource_set;
pub mod transform;

pub use config::{ClusterConfig, EnvironmentConfig, SiteConfig, SiteSettings};
pub use emit::{build_document, write_documents, DocumentPaths, EmittedDocument};
pub use error::{CoreError, Result};
pub use firewall::{Audience, FirewallClassifier, FirewallPolicy, UnknownAudiencePolicy};
pub use naming::dr_name;
pub use network::gateway_address;
pub use resource_set::ResourceSet;
pub use transform::DrTransform;
