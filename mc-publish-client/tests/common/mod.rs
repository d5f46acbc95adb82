#![allow(dead_code)]

use std::net::SocketAddr;

use axum::Router;
use mc_publish_client::Dispatcher;
use mc_publish_client::middleware::TraceMiddleware;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve `app` on an ephemeral local port.
pub async fn spawn_server(app: Router) -> anyhow::Result<SocketAddr> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("test server error: {e}");
        }
    });
    Ok(addr)
}

/// Answer every connection with the raw HTTP/1.1 bytes of `response`.
pub async fn spawn_raw_server(response: &'static str) -> anyhow::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    Ok(addr)
}

/// A dispatcher over the real transport, rooted at the test server.
pub fn dispatcher(addr: SocketAddr) -> anyhow::Result<Dispatcher> {
    Ok(Dispatcher::builder()
        .base_url(format!("http://{addr}/"))
        .default_header("user-agent", "mc-publish-test")
        .with_middleware(TraceMiddleware::new())
        .build()?)
}
