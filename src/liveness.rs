//! Tiny HTTP endpoint for hosting platforms that probe whether the process is up.

use crate::{log_error, log_internal};
use anyhow::Result;
use axum::{routing::get, Router};

const ALIVE: &str = "Bot is alive!";

async fn alive() -> &'static str {
    ALIVE
}

fn router() -> Router {
    Router::new().route("/", get(alive))
}

/// Bind `bind_address` and serve the probe in the background.  A bind failure is returned; the
/// server failing later is only logged, as the bot itself is unaffected.
pub async fn spawn(bind_address: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    log_internal!("Liveness probe listening on {}", bind_address);

    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router()).await {
            log_error!("Liveness probe stopped: {}", err);
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn answers_alive() {
        assert_eq!(alive().await, "Bot is alive!");
    }

    #[tokio::test]
    async fn serves_over_http() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router()).await });

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.ends_with(ALIVE), "{response}");
    }
}
