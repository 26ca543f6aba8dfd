//! HTTP/3 server over a mutual TLS configuration.

use bytes::Bytes;
use h3::error::ConnectionError;
use h3::server::RequestStream;
use http::{Request, Response, StatusCode};
use quinn::{Endpoint, ServerConfig as QuinnServerConfig};
use rustls::pki_types::CertificateDer;
use std::sync::Arc;
use std::time::Duration;
use tlsconfig::ServerEndpoint;
use tracing::{debug, error, info};

const GREETING: &str = "hello, world!";

/// Run the HTTP/3 server with the given endpoint settings.
pub async fn run(config: ServerEndpoint) -> anyhow::Result<()> {
    let mut tls_config = config.tls_config()?.to_rustls()?;
    tls_config.alpn_protocols = vec![b"h3".to_vec()];

    let mut server_config = QuinnServerConfig::with_crypto(Arc::new(
        quinn::crypto::rustls::QuicServerConfig::try_from(tls_config)?,
    ));

    let mut transport_config = quinn::TransportConfig::default();
    transport_config.max_idle_timeout(Some(
        Duration::from_secs(config.idle_timeout_secs).try_into()?,
    ));
    server_config.transport_config(Arc::new(transport_config));

    let endpoint = Endpoint::server(server_config, config.bind_addr)?;

    info!("HTTP/3 server listening on {}", config.bind_addr);

    while let Some(incoming) = endpoint.accept().await {
        tokio::spawn(async move {
            match incoming.await {
                Ok(conn) => {
                    let remote = conn.remote_address();
                    debug!(
                        "New connection from {} presenting {} certificate(s)",
                        remote,
                        peer_chain_len(&conn)
                    );

                    if let Err(e) = handle_connection(conn).await {
                        error!("Connection error from {}: {:?}", remote, e);
                    }
                }
                Err(e) => {
                    // Handshake failures, including clients without a trusted certificate.
                    error!("Failed to accept connection: {:?}", e);
                }
            }
        });
    }

    Ok(())
}

fn peer_chain_len(conn: &quinn::Connection) -> usize {
    conn.peer_identity()
        .and_then(|identity| identity.downcast::<Vec<CertificateDer<'static>>>().ok())
        .map_or(0, |chain| chain.len())
}

async fn handle_connection(conn: quinn::Connection) -> anyhow::Result<()> {
    let remote = conn.remote_address();
    let mut h3_conn = h3::server::Connection::new(h3_quinn::Connection::new(conn)).await?;

    loop {
        match h3_conn.accept().await {
            Ok(Some(req_resolver)) => {
                tokio::spawn(async move {
                    let (req, stream) = match req_resolver.resolve_request().await {
                        Ok(resolved) => resolved,
                        Err(e) => {
                            error!("Failed to resolve request: {:?}", e);
                            return;
                        }
                    };
                    if let Err(e) = handle_request(req, stream).await {
                        debug!("Request handling ended: {:?}", e);
                    }
                });
            }
            Ok(None) => {
                debug!("Connection closed by client: {}", remote);
                break;
            }
            Err(e) => {
                match CloseKind::of(&e) {
                    CloseKind::Graceful => debug!("Connection closed gracefully: {}", remote),
                    CloseKind::TimedOut => debug!("Connection timed out: {}", remote),
                    CloseKind::Failed => error!("Connection error from {}: {:?}", remote, e),
                }
                break;
            }
        }
    }

    Ok(())
}

/// How an HTTP/3 connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseKind {
    /// Either side closed with `H3_NO_ERROR`.
    Graceful,
    TimedOut,
    Failed,
}

impl CloseKind {
    fn of(err: &ConnectionError) -> Self {
        if err.is_h3_no_error() {
            return CloseKind::Graceful;
        }
        match err {
            ConnectionError::Timeout { .. } => CloseKind::TimedOut,
            _ => CloseKind::Failed,
        }
    }
}

async fn handle_request(
    req: Request<()>,
    stream: RequestStream<h3_quinn::BidiStream<Bytes>, Bytes>,
) -> anyhow::Result<()> {
    info!("{} {}", req.method(), req.uri().path());

    match req.uri().path() {
        "/" => send_text(stream, StatusCode::OK, GREETING).await,
        _ => send_text(stream, StatusCode::NOT_FOUND, "not found").await,
    }
}

async fn send_text(
    mut stream: RequestStream<h3_quinn::BidiStream<Bytes>, Bytes>,
    status: StatusCode,
    body: &'static str,
) -> anyhow::Result<()> {
    let response = Response::builder()
        .status(status)
        .header("content-type", "text/plain")
        .header("content-length", body.len())
        .body(())?;

    stream.send_response(response).await?;
    stream.send_data(Bytes::from_static(body.as_bytes())).await?;
    stream.finish().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_timeout_is_not_a_failure() {
        assert_eq!(CloseKind::of(&ConnectionError::Timeout), CloseKind::TimedOut);
    }
}
