//! Composable TLS configuration for services.
//!
//! This crate provides:
//! - Certificate pool building from the platform store, certificates and PEM files
//! - Named hardening presets and ad hoc policy options
//! - Client and server configurations, converted to `rustls` on demand
//! - File-backed endpoint settings
//! - Test fixtures for throwaway certificate authorities (`certtest` feature)

#[cfg(any(test, feature = "certtest"))]
pub mod certtest;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod identity;
mod pem;
pub mod policy;
pub mod pool;

pub use config::{
    ClientAuth, ClientConfig, ClientOption, Config, ServerConfig, ServerOption, TlsOption, build,
    with_authority, with_cipher_suites, with_client_authentication, with_curve_preferences,
    with_identity, with_internal_service_defaults, with_min_version, with_pivotal_defaults,
};
pub use endpoint::{ClientEndpoint, ServerEndpoint};
pub use error::{Error, Result};
pub use identity::Identity;
pub use policy::Policy;
pub use pool::{CertPool, PoolBuilder, PoolOption, from_empty_pool, from_system_pool, with_cert, with_certs_from_file};
