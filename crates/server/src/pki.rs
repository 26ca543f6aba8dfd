//! Development PKI provisioning.

use std::fs;
use std::path::Path;

use tlsconfig::certtest;
use tracing::info;

/// Write `ca.crt` plus server and client key pairs into `dir` unless a CA is
/// already there.
pub fn ensure_dev_pki(dir: &Path) -> anyhow::Result<()> {
    if dir.join("ca.crt").exists() {
        info!("Using existing PKI in {}", dir.display());
        return Ok(());
    }

    fs::create_dir_all(dir)?;

    let ca = certtest::build_ca("tlsconfig dev ca")?;
    fs::write(dir.join("ca.crt"), ca.certificate_pem())?;

    for name in ["server", "client"] {
        let (cert, key) = ca
            .build_signed_certificate(name)?
            .certificate_pem_and_private_key();
        fs::write(dir.join(format!("{name}.crt")), cert)?;
        fs::write(dir.join(format!("{name}.key")), key)?;
    }

    info!("Generated development PKI in {}", dir.display());
    Ok(())
}
