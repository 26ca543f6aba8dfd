//! Mutual TLS HTTP/3 Server
//!
//! Demonstrates serving with a configuration assembled by `tlsconfig`:
//! - Internal service hardening preset
//! - Server identity loaded from PEM files
//! - Client certificates required and verified against a CA bundle

mod pki;
mod server;

use std::path::Path;

use tlsconfig::ServerEndpoint;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ServerEndpoint::default().with_idle_timeout(30);

    // Local runs get a throwaway PKI so the client has something to present.
    pki::ensure_dev_pki(Path::new("certs"))?;

    info!("Starting mTLS HTTP/3 server on {}", config.bind_addr);

    server::run(config).await
}
