//! Identity certificates presented during a handshake.

use std::fmt;
use std::path::Path;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};

use crate::error::{Error, Result};
use crate::pem;

/// A leaf certificate, its chain, and the matching private key.
///
/// The chain is ordered leaf first, followed by any intermediates a peer
/// needs to reach a trusted root.
pub struct Identity {
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
}

impl Identity {
    /// Build an identity from DER parts. `chain` must start with the leaf.
    pub fn new(chain: Vec<CertificateDer<'static>>, key: PrivateKeyDer<'static>) -> Result<Self> {
        if chain.is_empty() {
            return Err(Error::Identity("certificate chain is empty".into()));
        }
        Ok(Self { chain, key })
    }

    /// Parse a PEM certificate chain (leaf first) and a PEM private key.
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self> {
        Self::parse(cert_pem, "certificate PEM", key_pem, "key PEM")
    }

    /// Load the certificate chain and private key from two PEM files.
    ///
    /// ```no_run
    /// use tlsconfig::Identity;
    ///
    /// let identity = Identity::from_pem_files("server.crt", "server.key")?;
    /// # Ok::<(), tlsconfig::Error>(())
    /// ```
    pub fn from_pem_files(cert_path: impl AsRef<Path>, key_path: impl AsRef<Path>) -> Result<Self> {
        let (cert_path, key_path) = (cert_path.as_ref(), key_path.as_ref());
        let cert_pem = pem::read_file(cert_path)?;
        let key_pem = pem::read_file(key_path)?;
        Self::parse(
            &cert_pem,
            &cert_path.display().to_string(),
            &key_pem,
            &key_path.display().to_string(),
        )
    }

    pub(crate) fn from_leaf(leaf: CertificateDer<'static>, key: PrivateKeyDer<'static>) -> Self {
        Self {
            chain: vec![leaf],
            key,
        }
    }

    fn parse(cert_pem: &[u8], cert_origin: &str, key_pem: &[u8], key_origin: &str) -> Result<Self> {
        let chain = pem::certs(cert_pem, cert_origin)?;
        if chain.is_empty() {
            return Err(Error::Identity(format!("{cert_origin}: no certificates found")));
        }
        let key = pem::private_key(key_pem, key_origin)?;
        Ok(Self { chain, key })
    }

    /// The certificate that identifies the holder.
    pub fn leaf(&self) -> &CertificateDer<'static> {
        &self.chain[0]
    }

    /// Full chain, leaf first.
    pub fn chain(&self) -> &[CertificateDer<'static>] {
        &self.chain
    }

    pub fn private_key(&self) -> &PrivateKeyDer<'static> {
        &self.key
    }
}

impl Clone for Identity {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            key: self.key.clone_key(),
        }
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.chain == other.chain && self.key.secret_der() == other.key.secret_der()
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("chain_len", &self.chain.len())
            .finish_non_exhaustive()
    }
}
