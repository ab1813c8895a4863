//! GCP inventory discovery
//!
//! This library provides:
//! - Inventory source trait with a gcloud CLI backend
//! - Timeout and retry policies for inventory calls
//! - Typed parsing of raw Cloud API responses
//! - Two-phase discovery of the resources attached to one VPC

pub mod client;
pub mod discovery;
pub mod error;
pub mod parse;
pub mod policy;
pub mod raw;

pub use client::{GcloudCli, InventoryRequest, InventorySource, Query};
pub use discovery::{Discovery, DiscoveryRequest};
pub use error::{DiscoveryError, Result};
pub use policy::{RetryPolicy, TimeoutPolicy};
