//! Per-exchange capture state.

use crate::config::{BodyDecoding, CaptureConfig};
use crate::head::RequestHead;
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime};

/// Accumulator shared between the request body tap and the session.
///
/// The tap records chunks from the body's poll path; the entry builder
/// drains the result once the response finalizes.
pub(crate) struct TapShared {
    state: Mutex<TapState>,
    save: bool,
}

struct TapState {
    size: u64,
    chunks: Vec<Bytes>,
}

impl TapShared {
    pub(crate) fn new(save: bool) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(TapState {
                size: 0,
                chunks: Vec::new(),
            }),
            save,
        })
    }

    /// Record one observed data chunk. Size is always counted; bytes are
    /// retained only when body saving is enabled.
    pub(crate) fn record(&self, data: &Bytes) {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.size += data.len() as u64;
        if self.save {
            state.chunks.push(data.clone());
        }
    }

    /// Total bytes observed, concatenated and decoded text. Zero chunks
    /// yield size 0 and an empty string.
    pub(crate) fn finish(&self, decoding: BodyDecoding) -> (u64, String) {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let size = state.size;
        if !self.save || state.chunks.is_empty() {
            return (size, String::new());
        }
        let chunks = std::mem::take(&mut state.chunks);
        let mut raw = Vec::with_capacity(chunks.iter().map(Bytes::len).sum());
        for chunk in &chunks {
            raw.extend_from_slice(chunk);
        }
        (size, decoding.decode(&raw))
    }
}

/// Ephemeral state for one in-flight exchange.
///
/// Created when the filter accepts the exchange, consumed exactly once by
/// the entry builder when the response completion hook fires. Never
/// shared across exchanges.
pub(crate) struct CaptureSession {
    pub(crate) head: RequestHead,
    pub(crate) started_at: SystemTime,
    pub(crate) started: Instant,
    pub(crate) tap: Arc<TapShared>,
    pub(crate) decoding: BodyDecoding,
    pub(crate) save_body: bool,
}

impl CaptureSession {
    pub(crate) fn new(head: RequestHead, config: &CaptureConfig) -> Self {
        let decoding = (config.body_decoding)(&head);
        Self {
            head,
            started_at: SystemTime::now(),
            started: Instant::now(),
            tap: TapShared::new(config.save_body),
            decoding,
            save_body: config.save_body,
        }
    }

    /// Handle for the request body tap to record into.
    pub(crate) fn tap_handle(&self) -> Arc<TapShared> {
        Arc::clone(&self.tap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tap_counts_without_saving() {
        let tap = TapShared::new(false);
        tap.record(&Bytes::from_static(b"some "));
        tap.record(&Bytes::from_static(b"body"));

        let (size, text) = tap.finish(BodyDecoding::Utf8);
        assert_eq!(size, 9);
        assert_eq!(text, "");
    }

    #[test]
    fn test_tap_saves_and_decodes() {
        let tap = TapShared::new(true);
        tap.record(&Bytes::from_static(b"some "));
        tap.record(&Bytes::from_static(b"body"));

        let (size, text) = tap.finish(BodyDecoding::Utf8);
        assert_eq!(size, 9);
        assert_eq!(text, "some body");
    }

    #[test]
    fn test_tap_empty_body() {
        let tap = TapShared::new(true);
        let (size, text) = tap.finish(BodyDecoding::Utf8);
        assert_eq!(size, 0);
        assert_eq!(text, "");
    }

    #[test]
    fn test_session_resolves_decoding() {
        let config = CaptureConfig::new().body_decoding(|_| BodyDecoding::Latin1);
        let req = http::Request::builder().uri("/").body(()).unwrap();
        let head = RequestHead::from_request(&req);

        let session = CaptureSession::new(head, &config);
        assert_eq!(session.decoding, BodyDecoding::Latin1);
    }
}
