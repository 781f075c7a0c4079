//! Tower layer wiring the capture pipeline together.
//!
//! `HarCaptureLayer` wraps an inner service so that each accepted
//! exchange gets a capture session: the request body is tapped on its
//! way into the inner service, the response body is wrapped with a
//! completion hook, and the finished entry is appended to the shared
//! buffer when the response finalizes. Capture never affects the
//! exchange being served — the inner response is always returned.

use crate::buffer::CaptureBuffer;
use crate::config::CaptureConfig;
use crate::entry::build_entry;
use crate::finalize::{FinalizeBody, FinalizeCallback};
use crate::head::{RequestHead, ResponseHead};
use crate::session::CaptureSession;
use crate::sink::{FileSink, Sink};
use crate::tap::TapBody;
use bytes::Bytes;
use http_body::Body;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// HAR capture middleware layer.
///
/// Records each accepted request/response exchange as a HAR entry and
/// persists batches of entries through the configured sink.
///
/// # Example
///
/// ```ignore
/// use har_capture::{CaptureConfig, HarCaptureLayer};
/// use tower::ServiceBuilder;
///
/// let capture = HarCaptureLayer::with_config(
///     CaptureConfig::new()
///         .output_dir("./har-out")
///         .save_body(true)
///         .filter(|head| head.path().starts_with("/api")),
/// );
///
/// let service = ServiceBuilder::new()
///     .layer(capture)
///     .service(inner);
/// ```
#[derive(Clone)]
pub struct HarCaptureLayer {
    config: Arc<CaptureConfig>,
    buffer: Arc<CaptureBuffer>,
}

impl HarCaptureLayer {
    /// Create a layer with default configuration, writing batches to the
    /// process working directory.
    pub fn new() -> Self {
        Self::with_config(CaptureConfig::new())
    }

    /// Create a layer with custom configuration and a file sink.
    pub fn with_config(config: CaptureConfig) -> Self {
        let sink = FileSink::new(config.output_dir.clone(), config.name_resolver.clone());
        Self::with_sink(config, sink)
    }

    /// Create a layer persisting through a custom sink.
    pub fn with_sink<K>(config: CaptureConfig, sink: K) -> Self
    where
        K: Sink + 'static,
    {
        let config = Arc::new(config);
        let buffer = CaptureBuffer::new(&config, Arc::new(sink));
        Self { config, buffer }
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Handle for external force-flush control.
    pub fn flush_handle(&self) -> FlushHandle {
        FlushHandle {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

impl Default for HarCaptureLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for HarCaptureLayer {
    type Service = HarCapture<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HarCapture {
            inner,
            config: Arc::clone(&self.config),
            buffer: Arc::clone(&self.buffer),
        }
    }
}

/// External control over the capture buffer.
///
/// Cheap to clone; all handles refer to the same buffer.
#[derive(Clone)]
pub struct FlushHandle {
    buffer: Arc<CaptureBuffer>,
}

impl FlushHandle {
    /// Flush the pending batch immediately. A flush on an empty buffer
    /// is a no-op.
    pub fn flush(&self) {
        self.buffer.flush();
    }

    /// Number of entries waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.buffer.pending()
    }
}

/// The capture middleware service produced by [`HarCaptureLayer`].
pub struct HarCapture<S> {
    inner: S,
    config: Arc<CaptureConfig>,
    buffer: Arc<CaptureBuffer>,
}

impl<S: Clone> Clone for HarCapture<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
            buffer: Arc::clone(&self.buffer),
        }
    }
}

impl<S> std::fmt::Debug for HarCapture<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarCapture")
            .field("config", &self.config)
            .finish()
    }
}

impl<S, ReqB, ResB> Service<http::Request<ReqB>> for HarCapture<S>
where
    S: Service<http::Request<TapBody<ReqB>>, Response = http::Response<ResB>>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
    ReqB: Body<Data = Bytes> + Send + 'static,
    ResB: Body<Data = Bytes>,
{
    type Response = http::Response<FinalizeBody<ResB>>;
    type Error = S::Error;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<ReqB>) -> Self::Future {
        let config = Arc::clone(&self.config);
        let buffer = Arc::clone(&self.buffer);
        // Take the ready inner service and leave a fresh clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let head = RequestHead::from_request(&req);

            // Evaluated before filtering, so a rejected exchange can
            // still force the previous batch out
            if (config.pre_request_flush)(&head) {
                buffer.flush();
            }

            if !(config.filter)(&head) {
                let response = inner.call(req.map(TapBody::passthrough)).await?;
                return Ok(response.map(FinalizeBody::passthrough));
            }

            let session = CaptureSession::new(head, &config);
            let tap = session.tap_handle();
            let response = inner.call(req.map(|body| TapBody::new(body, tap))).await?;

            let (parts, body) = response.into_parts();
            let response_head = ResponseHead::from_parts(&parts);
            let save_body = config.save_body;

            let callback: FinalizeCallback = Box::new(move |data| {
                let force = (config.post_request_flush)(&session.head);
                let entry = build_entry(session, &response_head, data);
                buffer.append(entry, force);
            });

            Ok(http::Response::from_parts(
                parts,
                FinalizeBody::new(body, save_body, callback),
            ))
        })
    }
}
