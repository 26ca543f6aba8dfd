//! Mutual TLS HTTP/3 Client
//!
//! Presents `certs/client.crt` to the demo server, trusts only
//! `certs/ca.crt`, fetches `/` and shuts the connection down gracefully.

use bytes::Buf;
use http::{Request, Uri};
use quinn::Endpoint;
use std::sync::Arc;
use tlsconfig::ClientEndpoint;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let config = ClientEndpoint::default();

    let mut tls_config = config.tls_config()?.to_rustls()?;
    tls_config.alpn_protocols = vec![b"h3".to_vec()];

    let client_config = quinn::ClientConfig::new(Arc::new(
        quinn::crypto::rustls::QuicClientConfig::try_from(tls_config)?,
    ));

    let mut endpoint = Endpoint::client("0.0.0.0:0".parse()?)?;
    endpoint.set_default_client_config(client_config);

    info!("Connecting to {}...", config.server_addr);

    let conn = endpoint
        .connect(config.server_addr, &config.server_name)?
        .await?;

    info!("Connected!");

    let quinn_conn = h3_quinn::Connection::new(conn);
    let (mut driver, mut send_request) = h3::client::new(quinn_conn).await?;

    let driver_handle = tokio::spawn(async move {
        futures::future::poll_fn(|cx| driver.poll_close(cx)).await
    });

    let uri: Uri = format!(
        "https://{}:{}/",
        config.server_name,
        config.server_addr.port()
    )
    .parse()?;

    let req = Request::builder().method("GET").uri(uri).body(())?;

    info!("GET /");
    let mut stream = send_request.send_request(req).await?;
    stream.finish().await?;

    let response = stream.recv_response().await?;
    info!("  Status: {}", response.status());

    let body = read_body(&mut stream).await?;
    info!("  Body: {}", body);

    // Dropping the sender lets the driver see GOAWAY and finish.
    drop(send_request);
    let _ = driver_handle.await;
    endpoint.wait_idle().await;

    info!("Connection closed cleanly");

    Ok(())
}

/// Read the entire response body into a string.
async fn read_body<S, B>(stream: &mut h3::client::RequestStream<S, B>) -> anyhow::Result<String>
where
    S: h3::quic::RecvStream,
    B: bytes::Buf,
{
    let mut body = Vec::new();
    while let Some(mut chunk) = stream.recv_data().await? {
        while chunk.has_remaining() {
            let bytes = chunk.chunk();
            body.extend_from_slice(bytes);
            chunk.advance(bytes.len());
        }
    }
    Ok(String::from_utf8_lossy(&body).to_string())
}
