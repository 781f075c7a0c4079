//! Minimal end-to-end run of the HAR capture middleware.
//!
//! Wraps a toy echo service, sends a handful of requests through it,
//! then flushes the batch so a `.har` file lands in `./har-out`.

use bytes::Bytes;
use har_capture::{CaptureConfig, HarCaptureLayer, TapBody};
use http_body_util::{BodyExt, Full};
use std::convert::Infallible;
use std::time::Duration;
use tower::{Layer, Service, ServiceExt};

async fn echo(
    req: http::Request<TapBody<Full<Bytes>>>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let body = req
        .into_body()
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .unwrap_or_default();
    let reply = if body.is_empty() {
        Bytes::from_static(b"hello from capture-demo")
    } else {
        body
    };
    Ok(http::Response::builder()
        .header("content-type", "text/plain")
        .body(Full::new(reply))
        .unwrap())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "capture_demo=info,har_capture=debug".into()),
        )
        .init();

    let layer = HarCaptureLayer::with_config(
        CaptureConfig::new()
            .output_dir("./har-out")
            .save_body(true)
            .max_capture_requests(100)
            .max_capture_window(Duration::from_secs(60))
            .filter(|head| !head.path().starts_with("/health"))
            .name_resolver(|doc| Some(format!("{}-entries", doc.log.entries.len()))),
    );
    let flush = layer.flush_handle();
    let mut service = layer.layer(tower::service_fn(echo));

    let requests = [
        ("GET", "/", None),
        ("GET", "/health", None),
        ("PUT", "/notes?tag=demo", Some("some body")),
        ("POST", "/echo", Some("This is quite OK")),
    ];

    for (method, uri, body) in requests {
        let req = http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::from(body.unwrap_or(""))))
            .unwrap();

        let response = service
            .ready()
            .await
            .unwrap()
            .call(req)
            .await
            .unwrap();
        let status = response.status();
        let reply = response.into_body().collect().await.unwrap().to_bytes();
        tracing::info!(method, uri, %status, reply_bytes = reply.len(), "exchange complete");
    }

    tracing::info!(pending = flush.pending(), "flushing batch");
    flush.flush();

    // Persistence is fire-and-forget; give the write a moment
    tokio::time::sleep(Duration::from_millis(200)).await;
    tracing::info!("done, see ./har-out");
}
