// fiskal-api: Async Rust client for the KassenSichV TSE middleware API
//
// Layers, leaves first:
// - `payload`: order-preserving wrapper for response bodies
// - `auth`: bearer token with expiry tracking
// - `route`: operation descriptors (verb + path, optional UUID and query)
// - `client`: configuration, token cache, dispatcher, admin operations
// - `provisioning`: CREATED -> INITIALIZED workflow for new TSS devices

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod log;
pub mod payload;
pub mod provisioning;
pub mod route;
pub mod transport;

pub use auth::AuthToken;
pub use client::TseClient;
pub use config::{ClientConfig, ConfigPatch, DEFAULT_BASE_URL};
pub use error::Error;
pub use log::Verbosity;
pub use payload::{FromBody, Payload, Shape};
pub use provisioning::{ProvisionStep, generate_admin_pin};
pub use route::{Operation, Verb};
pub use transport::{TlsMode, TransportConfig};
