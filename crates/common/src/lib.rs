//! Shared configuration, error types, and observability primitives for varve crates.
//!
//! Architecture role:
//! - defines the client configuration passed across layers
//! - provides common [`VarveError`] / [`Result`] contracts
//! - hosts the scan metrics registry
//!
//! Key modules:
//! - [`config`]
//! - [`error`]
//! - [`metrics`]

pub mod config;
pub mod error;
pub mod metrics;

pub use config::ScanConfig;
pub use error::{Result, VarveError};
pub use metrics::{global_metrics, MetricsRegistry};
