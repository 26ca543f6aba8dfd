//! PEM helpers shared by pool and identity loading.

use std::fs;
use std::path::Path;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};

use crate::error::{Error, Result};

/// Read a whole file. The handle is closed before this returns.
pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::io(path, e))
}

/// Parse every `CERTIFICATE` block in `pem`, in order.
///
/// Empty or whitespace-only input yields no certificates. Any other input
/// without a single certificate block is rejected.
pub(crate) fn certs(pem: &[u8], origin: &str) -> Result<Vec<CertificateDer<'static>>> {
    if pem.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let certs = rustls_pemfile::certs(&mut &pem[..])
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::parse(origin, e))?;

    if certs.is_empty() {
        return Err(Error::parse(origin, "no PEM certificate blocks found"));
    }

    Ok(certs)
}

/// Parse the first private key block in `pem`.
pub(crate) fn private_key(pem: &[u8], origin: &str) -> Result<PrivateKeyDer<'static>> {
    rustls_pemfile::private_key(&mut &pem[..])
        .map_err(|e| Error::Identity(format!("{origin}: {e}")))?
        .ok_or_else(|| Error::Identity(format!("{origin}: no private key found")))
}
