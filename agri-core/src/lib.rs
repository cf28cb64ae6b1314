//! Core library for the `agri` farming-assistant CLI.
//!
//! This crate defines:
//! - Configuration, persisted client state and the user session
//! - An HTTP adapter over the dashboard backend, plus weather providers
//! - Domain façades (weather, yield, soil, pest, crops, irrigation) that
//!   normalize backend payloads and substitute deterministic defaults when a
//!   read fails
//! - The dashboard aggregator that fans out to several façades at once
//!
//! It is used by `agri-cli`, but can also be reused by other binaries or services.

pub mod aggregator;
pub mod cancel;
pub mod config;
pub mod error;
pub mod fallback;
pub mod geo;
pub mod http;
pub mod model;
pub mod provider;
pub mod service;
pub mod session;
pub mod storage;

#[cfg(test)]
mod testing;

pub use aggregator::DashboardAggregator;
pub use cancel::CancelToken;
pub use config::{Config, ProviderConfig};
pub use error::{ClientError, ClientResult};
pub use geo::Location;
pub use http::{ApiClient, Transport};
pub use model::{DashboardComposite, DataSource, Sourced, WeatherReport, WeatherSnapshot};
pub use provider::{ProviderId, WeatherProvider};
pub use session::{Session, UserProfile};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
