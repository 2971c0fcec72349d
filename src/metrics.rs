//! Prometheus metrics exporter.

use std::net::SocketAddr;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::MetricsError;

/// Renders every metric in `registry` in Prometheus text format.
pub fn gather(registry: &Registry) -> Result<String, MetricsError> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| MetricsError::Encode(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| MetricsError::Encode(e.to_string()))
}

/// HTTP server for Prometheus metrics.
pub struct MetricsServer {
    /// Registry exported on `/metrics`.
    registry: Registry,
    /// Port to listen on.
    port: u16,
}

impl MetricsServer {
    /// Creates a new metrics server.
    pub fn new(registry: Registry, port: u16) -> Self {
        Self { registry, port }
    }

    /// Binds the listening socket.
    pub async fn bind(&self) -> Result<TcpListener, MetricsError> {
        let addr: SocketAddr = ([0, 0, 0, 0], self.port).into();
        TcpListener::bind(addr)
            .await
            .map_err(|e| MetricsError::Server(e.to_string()))
    }

    /// Binds and serves until `token` is cancelled.
    pub async fn start(self, token: CancellationToken) -> Result<(), MetricsError> {
        let listener = self.bind().await?;
        self.serve(listener, token).await
    }

    /// Serves metrics on an already bound listener until `token` is cancelled.
    pub async fn serve(
        self,
        listener: TcpListener,
        token: CancellationToken,
    ) -> Result<(), MetricsError> {
        let local_addr = listener
            .local_addr()
            .map_err(|e| MetricsError::Server(e.to_string()))?;
        info!(addr = %local_addr, "Starting Prometheus metrics server");

        loop {
            let (stream, _) = tokio::select! {
                _ = token.cancelled() => {
                    info!("Prometheus metrics server stopped");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    accepted.map_err(|e| MetricsError::Server(e.to_string()))?
                }
            };

            let io = TokioIo::new(stream);
            let registry = self.registry.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let registry = registry.clone();
                    async move { Ok::<_, hyper::Error>(respond(&registry, req.uri().path())) }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    error!(error = %e, "Error serving connection");
                }
            });
        }
    }
}

fn respond(registry: &Registry, path: &str) -> Response<Full<Bytes>> {
    let (status, body) = if path == "/metrics" {
        match gather(registry) {
            Ok(body) => (StatusCode::OK, body),
            Err(e) => {
                error!(error = %e, "Failed to render metrics");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        }
    } else {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    };

    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Gauge;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[test]
    fn gather_renders_text_format() {
        let registry = Registry::new();
        let gauge = Gauge::new("test_gauge", "A test gauge").unwrap();
        registry.register(Box::new(gauge.clone())).unwrap();
        gauge.set(3.0);

        let text = gather(&registry).unwrap();
        assert!(text.contains("# HELP test_gauge A test gauge"));
        assert!(text.contains("test_gauge 3"));
    }

    #[tokio::test]
    async fn serves_metrics_until_cancelled() {
        let registry = Registry::new();
        let gauge = Gauge::new("served_gauge", "Served").unwrap();
        registry.register(Box::new(gauge.clone())).unwrap();
        gauge.set(1.0);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let token = CancellationToken::new();
        let server = tokio::spawn(MetricsServer::new(registry, 0).serve(listener, token.clone()));

        let ok = get(addr, "/metrics").await;
        assert!(ok.starts_with("HTTP/1.1 200"));
        assert!(ok.contains("served_gauge 1"));

        let missing = get(addr, "/other").await;
        assert!(missing.starts_with("HTTP/1.1 404"));

        token.cancel();
        tokio_test::assert_ok!(server.await.unwrap());
    }
}
