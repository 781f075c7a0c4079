//! Configuration for the HAR capture middleware.
//!
//! This module provides the `CaptureConfig` builder for customizing
//! filtering, body capture, batching, and persistence behavior.

use crate::har::HarDocument;
use crate::head::RequestHead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Predicate over an inbound request's metadata.
///
/// Used for the capture filter and the pre-/post-request force-flush
/// hooks.
pub type RequestPredicate = Arc<dyn Fn(&RequestHead) -> bool + Send + Sync>;

/// Resolver that derives a file-name suffix from an assembled batch
/// document. Returning `None` leaves the timestamp-only name.
pub type NameResolver = Arc<dyn Fn(&HarDocument) -> Option<String> + Send + Sync>;

/// Resolver that picks the text decoding strategy for a request's body.
pub type DecodingResolver = Arc<dyn Fn(&RequestHead) -> BodyDecoding + Send + Sync>;

/// Default capture window: 10 minutes.
pub const DEFAULT_CAPTURE_WINDOW: Duration = Duration::from_secs(600);

/// Default maximum number of entries per batch.
pub const DEFAULT_CAPTURE_REQUESTS: usize = 1000;

/// Strategy for decoding captured body bytes into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyDecoding {
    /// Decode as UTF-8, replacing invalid sequences.
    #[default]
    Utf8,
    /// Map each byte to the corresponding U+0000..U+00FF code point.
    Latin1,
}

impl BodyDecoding {
    /// Decode raw body bytes into text. Never fails; invalid input
    /// degrades to replacement characters.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            BodyDecoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            BodyDecoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

/// Configuration for the HAR capture middleware.
///
/// Immutable once the layer is constructed. Use the builder pattern to
/// customize behavior:
///
/// ```ignore
/// use har_capture::CaptureConfig;
/// use std::time::Duration;
///
/// let config = CaptureConfig::new()
///     .output_dir("./har-out")
///     .save_body(true)
///     .max_capture_requests(200)
///     .max_capture_window(Duration::from_secs(60))
///     .filter(|head| head.path().starts_with("/api"));
/// ```
#[derive(Clone)]
pub struct CaptureConfig {
    /// Directory batch files are written to. Default: the process
    /// working directory.
    pub(crate) output_dir: PathBuf,

    /// Whether to retain and decode body bytes. Default: false (sizes
    /// are still reported).
    pub(crate) save_body: bool,

    /// Maximum time between flushes while entries are pending.
    pub(crate) max_capture_window: Duration,

    /// Maximum entries per batch; reaching it flushes immediately.
    pub(crate) max_capture_requests: usize,

    /// Gate deciding whether an exchange is captured at all.
    pub(crate) filter: RequestPredicate,

    /// Force-flush hook evaluated before a new exchange is filtered.
    pub(crate) pre_request_flush: RequestPredicate,

    /// Force-flush hook evaluated after an exchange completes.
    pub(crate) post_request_flush: RequestPredicate,

    /// Optional file-name suffix resolver.
    pub(crate) name_resolver: Option<NameResolver>,

    /// Body text decoding strategy resolver.
    pub(crate) body_decoding: DecodingResolver,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureConfig {
    /// Create a configuration with default values.
    ///
    /// Defaults:
    /// - Output directory: process working directory
    /// - Body saving: disabled
    /// - Capture window: 600 seconds
    /// - Batch size: 1000 entries
    /// - Filter: accept all
    /// - Force-flush hooks: never
    /// - Body decoding: UTF-8
    pub fn new() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            save_body: false,
            max_capture_window: DEFAULT_CAPTURE_WINDOW,
            max_capture_requests: DEFAULT_CAPTURE_REQUESTS,
            filter: Arc::new(|_| true),
            pre_request_flush: Arc::new(|_| false),
            post_request_flush: Arc::new(|_| false),
            name_resolver: None,
            body_decoding: Arc::new(|_| BodyDecoding::Utf8),
        }
    }

    /// Set the directory batch files are written to.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Enable or disable body capture.
    ///
    /// When disabled, body sizes are still recorded but text fields stay
    /// empty.
    pub fn save_body(mut self, save: bool) -> Self {
        self.save_body = save;
        self
    }

    /// Set the maximum time between flushes while entries are pending.
    ///
    /// The window is anchored to the last flush, not the last append, so
    /// bursts of requests cannot postpone a flush indefinitely.
    pub fn max_capture_window(mut self, window: Duration) -> Self {
        self.max_capture_window = window;
        self
    }

    /// Set the maximum number of entries per batch.
    ///
    /// Clamped to at least 1; a flush fires the instant the pending count
    /// reaches this limit.
    pub fn max_capture_requests(mut self, max: usize) -> Self {
        self.max_capture_requests = max.max(1);
        self
    }

    /// Set the capture filter.
    ///
    /// Returning `false` short-circuits all instrumentation for that
    /// exchange; control passes straight to the inner service.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&RequestHead) -> bool + Send + Sync + 'static,
    {
        self.filter = Arc::new(filter);
        self
    }

    /// Set the pre-request force-flush hook.
    ///
    /// Evaluated against each incoming request before filtering; `true`
    /// flushes the current batch immediately (a flush on an empty buffer
    /// is a no-op).
    pub fn pre_request_flush<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&RequestHead) -> bool + Send + Sync + 'static,
    {
        self.pre_request_flush = Arc::new(predicate);
        self
    }

    /// Set the post-request force-flush hook.
    ///
    /// Evaluated against the just-completed request after its entry is
    /// built; `true` flushes the batch including that entry.
    pub fn post_request_flush<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&RequestHead) -> bool + Send + Sync + 'static,
    {
        self.post_request_flush = Arc::new(predicate);
        self
    }

    /// Set the file-name suffix resolver.
    ///
    /// The resolver sees the fully assembled batch document, so the
    /// suffix can be derived from captured content (a header value, for
    /// example).
    pub fn name_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&HarDocument) -> Option<String> + Send + Sync + 'static,
    {
        self.name_resolver = Some(Arc::new(resolver));
        self
    }

    /// Set the body decoding strategy resolver.
    pub fn body_decoding<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&RequestHead) -> BodyDecoding + Send + Sync + 'static,
    {
        self.body_decoding = Arc::new(resolver);
        self
    }
}

impl std::fmt::Debug for CaptureConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureConfig")
            .field("output_dir", &self.output_dir)
            .field("save_body", &self.save_body)
            .field("max_capture_window", &self.max_capture_window)
            .field("max_capture_requests", &self.max_capture_requests)
            .field("name_resolver", &self.name_resolver.is_some())
            .finish()
    }
}
