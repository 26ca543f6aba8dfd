//! TLS configuration building for clients and servers.
//!
//! [`build`] resolves a base [`Config`] from [`TlsOption`]s: a policy plus an
//! optional identity. The base is then specialized with
//! [`Config::client`] or [`Config::server`]. None of these steps can fail;
//! problems with the assembled values surface from the engine, either in
//! `to_rustls` or during the handshake.
//!
//! ```
//! use tlsconfig::{build, certtest, with_authority, with_client_authentication,
//!     with_identity, with_internal_service_defaults};
//!
//! let ca = certtest::build_ca("example-ca")?;
//! let pool = ca.cert_pool()?;
//! let server_cert = ca.build_signed_certificate("server")?;
//! let client_cert = ca.build_signed_certificate("client")?;
//!
//! let server = build([with_internal_service_defaults(), with_identity(server_cert.identity())])
//!     .server([with_client_authentication(pool.clone())]);
//! let client = build([with_internal_service_defaults(), with_identity(client_cert.identity())])
//!     .client([with_authority(pool)]);
//!
//! let _ = (server.to_rustls()?, client.to_rustls()?);
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::fmt;
use std::sync::Arc;

use rustls::server::{ResolvesServerCertUsingSni, WebPkiClientVerifier};
use rustls::{CipherSuite, NamedGroup, ProtocolVersion};
use tracing::debug;

use crate::error::Result;
use crate::identity::Identity;
use crate::policy::Policy;
use crate::pool::{self, CertPool};

/// Base configuration shared by both roles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    policy: Policy,
    identity: Option<Identity>,
}

macro_rules! option_type {
    ($(#[$meta:meta])* $name:ident, $target:ty) => {
        $(#[$meta])*
        pub struct $name(Box<dyn FnOnce(&mut $target) + Send>);

        impl $name {
            fn new<F>(apply: F) -> Self
            where
                F: FnOnce(&mut $target) + Send + 'static,
            {
                $name(Box::new(apply))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(concat!(stringify!($name), "(..)"))
            }
        }
    };
}

option_type!(
    /// Amends the base configuration.
    TlsOption,
    Config
);
option_type!(
    /// Amends a client configuration.
    ClientOption,
    ClientConfig
);
option_type!(
    /// Amends a server configuration.
    ServerOption,
    ServerConfig
);

/// Resolve a base configuration. Options apply in order; later ones win.
pub fn build(options: impl IntoIterator<Item = TlsOption>) -> Config {
    let mut config = Config::default();
    for option in options {
        (option.0)(&mut config);
    }
    config
}

/// Present `identity` during the handshake. Valid for either role.
pub fn with_identity(identity: Identity) -> TlsOption {
    TlsOption::new(move |config| config.identity = Some(identity))
}

/// Replace the whole policy with [`Policy::pivotal_defaults`].
pub fn with_pivotal_defaults() -> TlsOption {
    TlsOption::new(|config| config.policy = Policy::pivotal_defaults())
}

/// Replace the whole policy with [`Policy::internal_service_defaults`].
pub fn with_internal_service_defaults() -> TlsOption {
    TlsOption::new(|config| config.policy = Policy::internal_service_defaults())
}

/// Set the lowest protocol version allowed.
pub fn with_min_version(version: ProtocolVersion) -> TlsOption {
    TlsOption::new(move |config| config.policy.set_min_version(version))
}

/// Set the TLS 1.2 cipher suite allowlist, most preferred first.
pub fn with_cipher_suites(suites: impl IntoIterator<Item = CipherSuite>) -> TlsOption {
    let suites: Vec<_> = suites.into_iter().collect();
    TlsOption::new(move |config| config.policy.set_cipher_suites(suites))
}

/// Set the key exchange curve order, most preferred first.
pub fn with_curve_preferences(curves: impl IntoIterator<Item = NamedGroup>) -> TlsOption {
    let curves: Vec<_> = curves.into_iter().collect();
    TlsOption::new(move |config| config.policy.set_curve_preferences(curves))
}

impl Config {
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Finalize a client configuration. The base is left untouched.
    pub fn client(&self, options: impl IntoIterator<Item = ClientOption>) -> ClientConfig {
        let mut config = ClientConfig {
            policy: self.policy.clone(),
            identity: self.identity.clone(),
            authority: None,
        };
        for option in options {
            (option.0)(&mut config);
        }
        config
    }

    /// Finalize a server configuration. The base is left untouched.
    pub fn server(&self, options: impl IntoIterator<Item = ServerOption>) -> ServerConfig {
        let mut config = ServerConfig {
            policy: self.policy.clone(),
            identity: self.identity.clone(),
            client_auth: ClientAuth::None,
            client_cas: None,
        };
        for option in options {
            (option.0)(&mut config);
        }
        config
    }
}

/// Trust `pool` when validating the server's certificate chain.
///
/// Without this option the platform's default trust store is used.
pub fn with_authority(pool: CertPool) -> ClientOption {
    ClientOption::new(move |config| config.authority = Some(pool))
}

/// Require clients to present a certificate that chains to `pool`.
pub fn with_client_authentication(pool: CertPool) -> ServerOption {
    ServerOption::new(move |config| {
        config.client_cas = Some(pool);
        config.client_auth = ClientAuth::RequireAndVerify;
    })
}

/// Whether a server asks for client certificates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClientAuth {
    /// Client certificates are not requested.
    #[default]
    None,
    /// Every client must present a certificate that verifies.
    RequireAndVerify,
}

/// A finished client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    policy: Policy,
    identity: Option<Identity>,
    authority: Option<CertPool>,
}

impl ClientConfig {
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Pool used to validate servers. `None` means the platform store.
    pub fn authority(&self) -> Option<&CertPool> {
        self.authority.as_ref()
    }

    /// Convert into an engine configuration.
    pub fn to_rustls(&self) -> Result<rustls::ClientConfig> {
        let provider = Arc::new(self.policy.crypto_provider());
        let roots = match &self.authority {
            Some(pool) => pool.roots(),
            None => pool::from_system_pool([]).build()?.roots(),
        };

        let builder = rustls::ClientConfig::builder_with_provider(provider)
            .with_protocol_versions(&self.policy.protocol_versions())?
            .with_root_certificates(roots);

        let config = match &self.identity {
            Some(identity) => builder
                .with_client_auth_cert(identity.chain().to_vec(), identity.private_key().clone_key())?,
            None => builder.with_no_client_auth(),
        };

        debug!(
            "Assembled client TLS config (client identity: {})",
            self.identity.is_some()
        );
        Ok(config)
    }
}

/// A finished server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    policy: Policy,
    identity: Option<Identity>,
    client_auth: ClientAuth,
    client_cas: Option<CertPool>,
}

impl ServerConfig {
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn client_auth(&self) -> ClientAuth {
        self.client_auth
    }

    /// Pool used to verify client certificates.
    pub fn client_cas(&self) -> Option<&CertPool> {
        self.client_cas.as_ref()
    }

    /// Convert into an engine configuration.
    ///
    /// A server without an identity converts successfully but fails every
    /// handshake, since it has no certificate to present.
    pub fn to_rustls(&self) -> Result<rustls::ServerConfig> {
        let provider = Arc::new(self.policy.crypto_provider());

        let builder = rustls::ServerConfig::builder_with_provider(Arc::clone(&provider))
            .with_protocol_versions(&self.policy.protocol_versions())?;

        let builder = match (self.client_auth, &self.client_cas) {
            (ClientAuth::RequireAndVerify, Some(pool)) => {
                let verifier = WebPkiClientVerifier::builder_with_provider(pool.roots(), provider).build()?;
                builder.with_client_cert_verifier(verifier)
            }
            _ => builder.with_no_client_auth(),
        };

        let mut config = match &self.identity {
            Some(identity) => {
                builder.with_single_cert(identity.chain().to_vec(), identity.private_key().clone_key())?
            }
            None => builder.with_cert_resolver(Arc::new(ResolvesServerCertUsingSni::new())),
        };
        config.ignore_client_order = self.policy.prefer_server_cipher_suites();

        debug!(
            "Assembled server TLS config (client auth: {:?})",
            self.client_auth
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certtest;

    #[test]
    fn empty_build_uses_engine_defaults() {
        let config = build([]);
        assert_eq!(config.policy(), &Policy::default());
        assert!(config.identity().is_none());
    }

    #[test]
    fn preset_replaces_earlier_fields() {
        let config = build([
            with_min_version(ProtocolVersion::TLSv1_3),
            with_cipher_suites([CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256]),
            with_pivotal_defaults(),
        ]);
        assert_eq!(config.policy(), &Policy::pivotal_defaults());
    }

    #[test]
    fn later_field_option_overrides_preset_field() {
        let config = build([
            with_internal_service_defaults(),
            with_min_version(ProtocolVersion::TLSv1_3),
        ]);
        let policy = config.policy();
        assert_eq!(policy.min_version(), Some(ProtocolVersion::TLSv1_3));
        assert_eq!(
            policy.cipher_suites(),
            Policy::internal_service_defaults().cipher_suites()
        );
        assert!(policy.prefer_server_cipher_suites());
    }

    #[test]
    fn last_identity_wins() {
        let ca = certtest::build_ca("identity-order").unwrap();
        let first = ca.build_signed_certificate("first").unwrap().identity();
        let second = ca.build_signed_certificate("second").unwrap().identity();

        let config = build([with_identity(first), with_identity(second.clone())]);
        assert_eq!(config.identity(), Some(&second));
    }

    #[test]
    fn one_base_derives_both_roles() {
        let ca = certtest::build_ca("shared-base").unwrap();
        let pool = ca.cert_pool().unwrap();
        let base = build([with_pivotal_defaults()]);

        let client = base.client([with_authority(pool.clone())]);
        let server = base.server([with_client_authentication(pool.clone())]);

        assert_eq!(client.policy(), base.policy());
        assert_eq!(server.policy(), base.policy());
        assert_eq!(client.authority(), Some(&pool));
        assert_eq!(server.client_cas(), Some(&pool));
        assert_eq!(base, build([with_pivotal_defaults()]));
    }

    #[test]
    fn client_authentication_sets_pool_and_requirement() {
        let ca = certtest::build_ca("client-auth").unwrap();
        let plain = build([]).server([]);
        assert_eq!(plain.client_auth(), ClientAuth::None);
        assert!(plain.client_cas().is_none());

        let mutual = build([]).server([with_client_authentication(ca.cert_pool().unwrap())]);
        assert_eq!(mutual.client_auth(), ClientAuth::RequireAndVerify);
        assert_eq!(mutual.client_cas().map(CertPool::len), Some(1));
    }

    #[test]
    fn server_without_identity_still_converts() {
        let config = build([with_internal_service_defaults()]).server([]);
        let rustls_config = config.to_rustls().unwrap();
        assert!(rustls_config.ignore_client_order);
    }

    #[test]
    fn client_auth_with_empty_pool_fails_at_engine_boundary() {
        let config = build([]).server([with_client_authentication(CertPool::default())]);
        assert!(matches!(config.to_rustls(), Err(crate::Error::Verifier(_))));
    }

    #[test]
    fn unusable_policy_fails_at_engine_boundary() {
        let config = build([with_curve_preferences([NamedGroup::Unknown(0x7777)])])
            .client([with_authority(CertPool::default())]);
        assert!(matches!(config.to_rustls(), Err(crate::Error::Engine(_))));
    }

    #[test]
    fn client_without_authority_trusts_platform_store() {
        let config = build([with_internal_service_defaults()]).client([]);
        assert!(config.authority().is_none());

        match (pool::from_system_pool([]).build(), config.to_rustls()) {
            (Ok(_), Ok(rustls_config)) => {
                assert!(!rustls_config.client_auth_cert_resolver.has_certs());
            }
            // Hosts without any trust store cannot say anything more here.
            (Err(crate::Error::SystemPool(_)), Err(crate::Error::SystemPool(_))) => {}
            (platform, converted) => panic!(
                "platform store and client conversion disagree: {:?} vs {:?}",
                platform.map(|p| p.len()),
                converted.map(|_| ())
            ),
        }
    }

    #[test]
    fn configs_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Config>();
        assert_send_sync::<ClientConfig>();
        assert_send_sync::<ServerConfig>();
    }
}
