//! File-backed endpoint settings for servers and clients.
//!
//! These settings name where identities and authorities live on disk and
//! resolve them into role configurations using the internal service preset.

use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::info;

use crate::config::{
    ClientConfig, ServerConfig, build, with_authority, with_client_authentication,
    with_identity, with_internal_service_defaults,
};
use crate::error::Result;
use crate::identity::Identity;
use crate::pool::{from_empty_pool, with_certs_from_file};

/// Server endpoint settings.
#[derive(Debug, Clone)]
pub struct ServerEndpoint {
    /// Address to bind the server to.
    pub bind_addr: SocketAddr,
    /// Idle timeout in seconds.
    pub idle_timeout_secs: u64,
    /// PEM certificate chain presented to clients, leaf first.
    pub cert_file: PathBuf,
    /// PEM private key matching `cert_file`.
    pub key_file: PathBuf,
    /// PEM bundle of authorities client certificates must chain to.
    /// `None` disables client authentication.
    pub client_ca_file: Option<PathBuf>,
}

impl Default for ServerEndpoint {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 4433)),
            idle_timeout_secs: 30,
            cert_file: PathBuf::from("certs/server.crt"),
            key_file: PathBuf::from("certs/server.key"),
            client_ca_file: Some(PathBuf::from("certs/ca.crt")),
        }
    }
}

impl ServerEndpoint {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    pub fn with_identity_files(mut self, cert_file: impl Into<PathBuf>, key_file: impl Into<PathBuf>) -> Self {
        self.cert_file = cert_file.into();
        self.key_file = key_file.into();
        self
    }

    pub fn with_client_ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.client_ca_file = Some(path.into());
        self
    }

    pub fn without_client_auth(mut self) -> Self {
        self.client_ca_file = None;
        self
    }

    pub fn with_idle_timeout(mut self, secs: u64) -> Self {
        self.idle_timeout_secs = secs;
        self
    }

    /// Load the identity and client authorities and assemble the server config.
    pub fn tls_config(&self) -> Result<ServerConfig> {
        let identity = Identity::from_pem_files(&self.cert_file, &self.key_file)?;
        let base = build([with_internal_service_defaults(), with_identity(identity)]);

        let config = match &self.client_ca_file {
            Some(path) => {
                let pool = from_empty_pool([with_certs_from_file(path)]).build()?;
                info!("Requiring client certificates signed by {}", path.display());
                base.server([with_client_authentication(pool)])
            }
            None => base.server([]),
        };
        Ok(config)
    }
}

/// Client endpoint settings.
#[derive(Debug, Clone)]
pub struct ClientEndpoint {
    /// Server address to connect to.
    pub server_addr: SocketAddr,
    /// Server name for TLS (SNI) and certificate verification.
    pub server_name: String,
    /// PEM certificate chain and key presented for mutual TLS.
    pub identity_files: Option<(PathBuf, PathBuf)>,
    /// PEM bundle of authorities the server must chain to.
    /// `None` uses the platform trust store.
    pub ca_file: Option<PathBuf>,
}

impl Default for ClientEndpoint {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 4433)),
            server_name: "localhost".to_string(),
            identity_files: Some((
                PathBuf::from("certs/client.crt"),
                PathBuf::from("certs/client.key"),
            )),
            ca_file: Some(PathBuf::from("certs/ca.crt")),
        }
    }
}

impl ClientEndpoint {
    pub fn new(server_addr: SocketAddr, server_name: impl Into<String>) -> Self {
        Self {
            server_addr,
            server_name: server_name.into(),
            ..Default::default()
        }
    }

    pub fn with_identity_files(mut self, cert_file: impl Into<PathBuf>, key_file: impl Into<PathBuf>) -> Self {
        self.identity_files = Some((cert_file.into(), key_file.into()));
        self
    }

    pub fn with_ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_file = Some(path.into());
        self
    }

    /// Trust the platform store instead of a CA file.
    pub fn with_system_roots(mut self) -> Self {
        self.ca_file = None;
        self
    }

    /// Load the identity and authorities and assemble the client config.
    pub fn tls_config(&self) -> Result<ClientConfig> {
        let mut options = vec![with_internal_service_defaults()];
        if let Some((cert_file, key_file)) = &self.identity_files {
            options.push(with_identity(Identity::from_pem_files(cert_file, key_file)?));
        }
        let base = build(options);

        let config = match &self.ca_file {
            Some(path) => {
                let pool = from_empty_pool([with_certs_from_file(path)]).build()?;
                base.client([with_authority(pool)])
            }
            None => base.client([]),
        };
        Ok(config)
    }
}
