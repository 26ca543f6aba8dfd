//! Certificate pool building.
//!
//! A pool starts from a seed (empty, or the platform's trust store) and
//! accumulates certificates through [`PoolOption`]s. Options are captured
//! when attached and only run inside [`PoolBuilder::build`], so composing a
//! builder never touches the filesystem and never fails. A failed build
//! returns no pool at all.
//!
//! ```no_run
//! use tlsconfig::pool::{from_empty_pool, with_certs_from_file};
//!
//! let pool = from_empty_pool([with_certs_from_file("/etc/ssl/internal-ca.pem")]).build()?;
//! # Ok::<(), tlsconfig::Error>(())
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use rustls::pki_types::CertificateDer;
use rustls::{DistinguishedName, RootCertStore};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::pem;

/// An immutable set of trusted certificate authorities.
///
/// Anchors keep the order they were added in. Cloning is cheap and the pool
/// can be shared across threads.
#[derive(Clone)]
pub struct CertPool {
    roots: Arc<RootCertStore>,
}

impl CertPool {
    /// Number of trust anchors in the pool.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// DER-encoded subject names, in insertion order.
    pub fn subjects(&self) -> Vec<DistinguishedName> {
        self.roots.subjects()
    }

    /// The underlying engine trust store.
    pub fn roots(&self) -> Arc<RootCertStore> {
        Arc::clone(&self.roots)
    }
}

impl Default for CertPool {
    fn default() -> Self {
        Self {
            roots: Arc::new(RootCertStore::empty()),
        }
    }
}

impl PartialEq for CertPool {
    fn eq(&self, other: &Self) -> bool {
        self.roots.roots == other.roots.roots
    }
}

impl Eq for CertPool {}

impl fmt::Debug for CertPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertPool")
            .field("len", &self.roots.len())
            .finish()
    }
}

/// A deferred addition to a pool under construction.
pub struct PoolOption(Box<dyn FnOnce(&mut RootCertStore) -> Result<()> + Send>);

impl PoolOption {
    fn new<F>(apply: F) -> Self
    where
        F: FnOnce(&mut RootCertStore) -> Result<()> + Send + 'static,
    {
        PoolOption(Box::new(apply))
    }
}

impl fmt::Debug for PoolOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PoolOption(..)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seed {
    Empty,
    System,
}

/// Collects pool options until [`build`](PoolBuilder::build) is called.
#[derive(Debug)]
pub struct PoolBuilder {
    seed: Seed,
    options: Vec<PoolOption>,
}

/// Start a pool with no trusted certificates.
pub fn from_empty_pool(options: impl IntoIterator<Item = PoolOption>) -> PoolBuilder {
    PoolBuilder::new(Seed::Empty, options)
}

/// Start a pool from the platform's default trust store.
///
/// The store is read when the pool is built, not here.
pub fn from_system_pool(options: impl IntoIterator<Item = PoolOption>) -> PoolBuilder {
    PoolBuilder::new(Seed::System, options)
}

impl PoolBuilder {
    fn new(seed: Seed, options: impl IntoIterator<Item = PoolOption>) -> Self {
        Self {
            seed,
            options: options.into_iter().collect(),
        }
    }

    /// Append another option after the ones already attached.
    pub fn with(mut self, option: PoolOption) -> Self {
        self.options.push(option);
        self
    }

    /// Load the seed and apply every option in order.
    pub fn build(self) -> Result<CertPool> {
        let mut roots = match self.seed {
            Seed::Empty => RootCertStore::empty(),
            Seed::System => system_roots()?,
        };

        for option in self.options {
            (option.0)(&mut roots)?;
        }

        debug!("Built certificate pool with {} trust anchor(s)", roots.len());

        Ok(CertPool {
            roots: Arc::new(roots),
        })
    }
}

/// Add one certificate to the pool.
///
/// The certificate is parsed when the pool is built; a certificate the
/// engine cannot use as a trust anchor fails the build.
pub fn with_cert(cert: CertificateDer<'static>) -> PoolOption {
    PoolOption::new(move |roots| add_cert(roots, cert, "certificate"))
}

/// Add every PEM certificate found in the file at `path`, in file order.
///
/// The file is read during the build. An unreadable file is an I/O error;
/// malformed content is a parse error; an empty file adds nothing.
pub fn with_certs_from_file(path: impl Into<PathBuf>) -> PoolOption {
    let path = path.into();
    PoolOption::new(move |roots| {
        let contents = pem::read_file(&path)?;
        let origin = path.display().to_string();
        let certs = pem::certs(&contents, &origin)?;

        debug!("Loaded {} certificate(s) from {}", certs.len(), origin);

        for cert in certs {
            add_cert(roots, cert, &origin)?;
        }
        Ok(())
    })
}

fn add_cert(roots: &mut RootCertStore, cert: CertificateDer<'static>, origin: &str) -> Result<()> {
    roots.add(cert).map_err(|e| Error::parse(origin, e))
}

fn system_roots() -> Result<RootCertStore> {
    let loaded = rustls_native_certs::load_native_certs();

    if loaded.certs.is_empty() && !loaded.errors.is_empty() {
        let reasons: Vec<String> = loaded.errors.iter().map(ToString::to_string).collect();
        return Err(Error::SystemPool(reasons.join("; ")));
    }

    for err in &loaded.errors {
        warn!("Partial failure loading system certificates: {}", err);
    }

    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(loaded.certs);
    if ignored > 0 {
        warn!("Skipped {} unparsable certificate(s) from the system store", ignored);
    }
    debug!("Loaded {} certificate(s) from the system store", added);

    Ok(roots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certtest;

    fn contains(subject: &DistinguishedName, needle: &str) -> bool {
        subject
            .as_ref()
            .windows(needle.len())
            .any(|w| w == needle.as_bytes())
    }

    #[test]
    fn empty_pool_is_empty() {
        let pool = from_empty_pool([]).build().unwrap();
        assert!(pool.is_empty());
        assert_eq!(pool, CertPool::default());
    }

    #[test]
    fn system_pool_matches_platform_store() {
        let pool = match from_system_pool([]).build() {
            Ok(pool) => pool,
            // Hosts without any trust store cannot say anything here.
            Err(Error::SystemPool(_)) => return,
            Err(e) => panic!("unexpected error when building system pool: {e}"),
        };

        let mut expected = RootCertStore::empty();
        expected.add_parsable_certificates(rustls_native_certs::load_native_certs().certs);
        assert_eq!(pool.roots().roots, expected.roots);
    }

    #[test]
    fn with_cert_adds_one_anchor() {
        let ca = certtest::build_ca("theauthority").unwrap();
        let pool = from_empty_pool([with_cert(ca.certificate())]).build().unwrap();

        assert_eq!(pool.len(), 1);
        assert!(contains(&pool.subjects()[0], "theauthority"));
    }

    #[test]
    fn options_apply_in_order_without_dedup() {
        let a = certtest::build_ca("alpha").unwrap();
        let b = certtest::build_ca("beta").unwrap();

        let pool = from_empty_pool([with_cert(b.certificate()), with_cert(a.certificate())])
            .with(with_cert(b.certificate()))
            .build()
            .unwrap();

        let subjects = pool.subjects();
        assert_eq!(subjects.len(), 3);
        assert!(contains(&subjects[0], "beta"));
        assert!(contains(&subjects[1], "alpha"));
        assert!(contains(&subjects[2], "beta"));
    }

    #[test]
    fn garbage_der_fails_at_build_time() {
        let builder = from_empty_pool([with_cert(CertificateDer::from(vec![0x30, 0x03, 0x01]))]);
        let err = builder.build().unwrap_err();
        assert!(err.is_parse(), "unexpected error: {err}");
    }

    #[test]
    fn missing_file_fails_at_build_time_only() {
        let builder = from_empty_pool([with_certs_from_file("/nonexistent/tlsconfig/ca.pem")]);
        let err = builder.build().unwrap_err();
        assert!(err.is_io(), "unexpected error: {err}");
    }

    #[test]
    fn pool_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        fn assert_send<T: Send>() {}
        assert_send_sync::<CertPool>();
        assert_send::<PoolBuilder>();
    }
}
