//! Request body tap.
//!
//! `TapBody` wraps the request body handed to the inner service and
//! observes data frames as the downstream consumer polls them. Every
//! frame is passed through untouched, so body parsers behind the
//! middleware see the identical stream.

use crate::session::TapShared;
use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

pin_project_lite::pin_project! {
    /// A request body wrapper that counts (and optionally retains) data
    /// frames on their way to the inner service.
    pub struct TapBody<B> {
        #[pin]
        body: B,
        tap: Option<Arc<TapShared>>,
    }
}

impl<B> TapBody<B> {
    pub(crate) fn new(body: B, tap: Arc<TapShared>) -> Self {
        Self {
            body,
            tap: Some(tap),
        }
    }

    /// Inert wrapper used for filtered-out exchanges; frames pass through
    /// without being observed.
    pub(crate) fn passthrough(body: B) -> Self {
        Self { body, tap: None }
    }

    /// Unwrap the inner body.
    pub fn into_inner(self) -> B {
        self.body
    }
}

impl<B> Body for TapBody<B>
where
    B: Body<Data = Bytes>,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.project();
        let result = ready!(this.body.poll_frame(cx));
        if let Some(Ok(frame)) = &result {
            if let Some(tap) = this.tap.as_ref() {
                // Trailer frames are metadata, not body data
                if let Some(data) = frame.data_ref() {
                    tap.record(data);
                }
            }
        }
        Poll::Ready(result)
    }

    fn is_end_stream(&self) -> bool {
        self.body.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.body.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BodyDecoding;
    use http_body_util::{BodyExt, Full, StreamBody};

    #[tokio::test]
    async fn test_tap_observes_without_consuming() {
        let tap = TapShared::new(true);
        let body = TapBody::new(Full::new(Bytes::from_static(b"some body")), tap.clone());

        // The downstream consumer still sees the full body
        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected, Bytes::from_static(b"some body"));

        let (size, text) = tap.finish(BodyDecoding::Utf8);
        assert_eq!(size, 9);
        assert_eq!(text, "some body");
    }

    #[tokio::test]
    async fn test_tap_accumulates_multiple_chunks() {
        let chunks: Vec<Result<_, std::convert::Infallible>> = vec![
            Ok(Frame::data(Bytes::from_static(b"hello "))),
            Ok(Frame::data(Bytes::from_static(b"world"))),
        ];
        let stream = futures_util::stream::iter(chunks);
        let tap = TapShared::new(true);
        let body = TapBody::new(StreamBody::new(stream), tap.clone());

        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected, Bytes::from_static(b"hello world"));

        let (size, text) = tap.finish(BodyDecoding::Utf8);
        assert_eq!(size, 11);
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn test_tap_empty_body() {
        let tap = TapShared::new(true);
        let body = TapBody::new(Full::new(Bytes::new()), tap.clone());

        let collected = body.collect().await.unwrap().to_bytes();
        assert!(collected.is_empty());

        let (size, text) = tap.finish(BodyDecoding::Utf8);
        assert_eq!(size, 0);
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_passthrough_records_nothing() {
        let body = TapBody::passthrough(Full::new(Bytes::from_static(b"ignored")));
        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected, Bytes::from_static(b"ignored"));
    }
}
