//! Core library for the `caddie` CLI.
//!
//! This crate defines:
//! - Shot geometry: distance, bearing and wind classification between two points
//! - Abstraction over weather providers
//! - A client for the caddie backend (auth, clubs, rounds, recommendations)
//! - Configuration and session persistence
//!
//! It is used by `caddie-cli`, but can also be reused by other binaries or services.

pub mod backend;
pub mod config;
pub mod error;
pub mod geometry;
pub mod model;
pub mod provider;
pub mod round;
pub mod session;

pub use backend::BackendClient;
pub use config::{Config, ProviderConfig};
pub use error::BackendError;
pub use model::{GeoPoint, ShotGeometry, WindClassification, WindObservation};
pub use provider::{ProviderId, WeatherProvider};
pub use round::{RoundStats, RoundTracker};
pub use session::Session;
