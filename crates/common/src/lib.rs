//! Shared configuration, error types, IDs, and observability primitives for Veloq crates.
//!
//! Architecture role:
//! - defines engine configuration passed across layers
//! - provides common [`VeloqError`] / [`Result`] contracts
//! - hosts the prometheus metrics registry
//!
//! Key modules:
//! - [`config`]
//! - [`error`]
//! - [`ids`]
//! - [`metrics`]

pub mod config;
pub mod error;
pub mod ids;
pub mod metrics;

pub use config::EngineConfig;
pub use error::{Result, VeloqError};
pub use ids::*;
pub use metrics::MetricsRegistry;
