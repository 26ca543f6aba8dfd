//! TLS hardening policy and its named presets.
//!
//! A [`Policy`] fixes the protocol floor, the TLS 1.2 cipher suite allowlist,
//! the key exchange curve order, and whether the server's suite order wins.
//! Empty fields defer to the engine's defaults. TLS 1.3 suites are always
//! enabled and are not affected by the allowlist.

use rustls::crypto::{CryptoProvider, aws_lc_rs};
use rustls::{CipherSuite, NamedGroup, ProtocolVersion, SupportedCipherSuite, SupportedProtocolVersion};
use tracing::{debug, warn};

/// The cipher suite HTTP/2 requires every TLS 1.2 deployment to offer
/// (RFC 7540 §9.2.2).
pub const HTTP2_REQUIRED_CIPHER_SUITE: CipherSuite =
    CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256;

const HARDENED_CIPHER_SUITES: [CipherSuite; 2] = [
    CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
    HTTP2_REQUIRED_CIPHER_SUITE,
];

const HARDENED_CURVES: [NamedGroup; 2] = [NamedGroup::secp384r1, NamedGroup::secp256r1];

/// Protocol version floor, cipher suites and curve preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    min_version: Option<ProtocolVersion>,
    cipher_suites: Vec<CipherSuite>,
    curve_preferences: Vec<NamedGroup>,
    prefer_server_cipher_suites: bool,
}

impl Policy {
    /// The Pivotal hardening preset.
    pub fn pivotal_defaults() -> Self {
        Self::hardened()
    }

    /// The preset for service-to-service traffic inside the platform.
    ///
    /// Currently identical to [`Policy::pivotal_defaults`].
    pub fn internal_service_defaults() -> Self {
        Self::hardened()
    }

    fn hardened() -> Self {
        Self {
            min_version: Some(ProtocolVersion::TLSv1_2),
            cipher_suites: HARDENED_CIPHER_SUITES.to_vec(),
            curve_preferences: HARDENED_CURVES.to_vec(),
            prefer_server_cipher_suites: true,
        }
    }

    /// Lowest protocol version allowed, if restricted.
    pub fn min_version(&self) -> Option<ProtocolVersion> {
        self.min_version
    }

    /// TLS 1.2 cipher suites in preference order. Empty means engine defaults.
    pub fn cipher_suites(&self) -> &[CipherSuite] {
        &self.cipher_suites
    }

    /// Key exchange groups in preference order. Empty means engine defaults.
    pub fn curve_preferences(&self) -> &[NamedGroup] {
        &self.curve_preferences
    }

    pub fn prefer_server_cipher_suites(&self) -> bool {
        self.prefer_server_cipher_suites
    }

    pub(crate) fn set_min_version(&mut self, version: ProtocolVersion) {
        self.min_version = Some(version);
    }

    pub(crate) fn set_cipher_suites(&mut self, suites: Vec<CipherSuite>) {
        self.cipher_suites = suites;
    }

    pub(crate) fn set_curve_preferences(&mut self, curves: Vec<NamedGroup>) {
        self.curve_preferences = curves;
    }

    /// Protocol versions the engine should enable, newest first.
    pub fn protocol_versions(&self) -> Vec<&'static SupportedProtocolVersion> {
        match self.min_version {
            None => rustls::DEFAULT_VERSIONS.to_vec(),
            Some(min) => rustls::ALL_VERSIONS
                .iter()
                .copied()
                .filter(|v| u16::from(v.version) >= u16::from(min))
                .collect(),
        }
    }

    /// An `aws_lc_rs` provider restricted to this policy's suites and curves.
    pub fn crypto_provider(&self) -> CryptoProvider {
        let mut provider = aws_lc_rs::default_provider();

        if !self.cipher_suites.is_empty() {
            let mut suites: Vec<SupportedCipherSuite> = provider
                .cipher_suites
                .iter()
                .copied()
                .filter(is_tls13)
                .collect();

            for id in &self.cipher_suites {
                match aws_lc_rs::ALL_CIPHER_SUITES.iter().find(|s| s.suite() == *id) {
                    Some(suite) if is_tls13(suite) => {
                        debug!("Ignoring TLS 1.3 suite {:?} in allowlist", id);
                    }
                    Some(suite) => suites.push(*suite),
                    None => warn!("Cipher suite {:?} is not supported; skipping", id),
                }
            }
            provider.cipher_suites = suites;
        }

        if !self.curve_preferences.is_empty() {
            provider.kx_groups = self
                .curve_preferences
                .iter()
                .filter_map(|name| {
                    let group = aws_lc_rs::ALL_KX_GROUPS
                        .iter()
                        .find(|g| g.name() == *name)
                        .copied();
                    if group.is_none() {
                        warn!("Key exchange group {:?} is not supported; skipping", name);
                    }
                    group
                })
                .collect();
        }

        provider
    }
}

fn is_tls13(suite: &SupportedCipherSuite) -> bool {
    suite.version().version == ProtocolVersion::TLSv1_3
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tls12_suites(provider: &CryptoProvider) -> Vec<CipherSuite> {
        provider
            .cipher_suites
            .iter()
            .filter(|s| !is_tls13(s))
            .map(|s| s.suite())
            .collect()
    }

    #[test]
    fn presets_are_distinct_entry_points_with_equal_values() {
        assert_eq!(Policy::pivotal_defaults(), Policy::internal_service_defaults());
    }

    #[test]
    fn hardened_preset_values() {
        let policy = Policy::internal_service_defaults();
        assert_eq!(policy.min_version(), Some(ProtocolVersion::TLSv1_2));
        assert!(policy.prefer_server_cipher_suites());
        assert_eq!(
            policy.cipher_suites(),
            &[
                CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
                CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
            ]
        );
        assert_eq!(
            policy.curve_preferences(),
            &[NamedGroup::secp384r1, NamedGroup::secp256r1]
        );
        assert!(policy.cipher_suites().contains(&HTTP2_REQUIRED_CIPHER_SUITE));
    }

    #[test]
    fn hardened_provider_keeps_allowlist_order() {
        let provider = Policy::pivotal_defaults().crypto_provider();
        assert_eq!(tls12_suites(&provider), HARDENED_CIPHER_SUITES.to_vec());

        let groups: Vec<NamedGroup> = provider.kx_groups.iter().map(|g| g.name()).collect();
        assert_eq!(groups, HARDENED_CURVES.to_vec());

        assert!(provider.cipher_suites.iter().any(is_tls13));
    }

    #[test]
    fn default_policy_defers_to_engine() {
        let provider = Policy::default().crypto_provider();
        let engine = aws_lc_rs::default_provider();

        let ids = |p: &CryptoProvider| p.cipher_suites.iter().map(|s| s.suite()).collect::<Vec<_>>();
        assert_eq!(ids(&provider), ids(&engine));
        assert_eq!(provider.kx_groups.len(), engine.kx_groups.len());
        assert_eq!(
            Policy::default().protocol_versions(),
            rustls::DEFAULT_VERSIONS.to_vec()
        );
    }

    #[test]
    fn version_floor_filters_older_versions() {
        let mut policy = Policy::default();
        policy.set_min_version(ProtocolVersion::TLSv1_3);
        assert_eq!(policy.protocol_versions(), vec![&rustls::version::TLS13]);

        policy.set_min_version(ProtocolVersion::TLSv1_2);
        assert_eq!(
            policy.protocol_versions(),
            vec![&rustls::version::TLS13, &rustls::version::TLS12]
        );
    }

    #[test]
    fn unknown_entries_are_skipped() {
        let mut policy = Policy::default();
        policy.set_cipher_suites(vec![
            CipherSuite::Unknown(0xfefe),
            CipherSuite::TLS13_AES_128_GCM_SHA256,
            CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
        ]);
        policy.set_curve_preferences(vec![NamedGroup::Unknown(0x7777), NamedGroup::X25519]);

        let provider = policy.crypto_provider();
        assert_eq!(
            tls12_suites(&provider),
            vec![CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256]
        );
        let groups: Vec<NamedGroup> = provider.kx_groups.iter().map(|g| g.name()).collect();
        assert_eq!(groups, vec![NamedGroup::X25519]);
    }
}
