//! Error types for pool and configuration building.
//!
//! Attaching options never fails. Errors only come out of the build step
//! (`PoolBuilder::build`, identity loading) and the engine boundary
//! (`to_rustls`).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by `tlsconfig`.
#[derive(Debug, Error)]
pub enum Error {
    /// A source file could not be opened or read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Content was not valid PEM, or a certificate was not valid X.509.
    #[error("failed to parse certificate from {origin}: {reason}")]
    Parse { origin: String, reason: String },

    /// The platform trust store could not be loaded.
    #[error("unable to load system certificate pool: {0}")]
    SystemPool(String),

    /// Certificate and key material did not form a usable identity.
    #[error("invalid identity: {0}")]
    Identity(String),

    /// The TLS engine rejected the assembled configuration.
    #[error("TLS engine rejected configuration: {0}")]
    Engine(#[from] rustls::Error),

    /// The client certificate verifier could not be built.
    #[error("failed to build client certificate verifier: {0}")]
    Verifier(#[from] rustls::server::VerifierBuilderError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(origin: impl Into<String>, reason: impl ToString) -> Self {
        Error::Parse {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true if this error came from reading a file.
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io { .. })
    }

    /// Returns true if this error came from malformed PEM or X.509 content.
    pub fn is_parse(&self) -> bool {
        matches!(self, Error::Parse { .. })
    }
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
