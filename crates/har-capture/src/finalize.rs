//! Response completion hook.
//!
//! `FinalizeBody` wraps the response body and fires a callback exactly
//! once when the body reaches end of stream — the point at which no
//! further response data will be written. Completion is detected both
//! from a final `poll_frame` returning `None` and, at drop time, from
//! the inner body reporting `is_end_stream()`; consumers like hyper
//! stop polling as soon as `is_end_stream()` turns true, so the final
//! poll cannot be relied on. The callback receives the data that
//! accompanied finalization: the final data frame of the stream.
//! Responses written through multiple partial frames are therefore
//! recorded incompletely; this mirrors the capture format's documented
//! behavior and is kept on purpose.

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

/// Data observed at response finalization.
pub(crate) struct FinalizeData {
    /// Size of the final data frame, 0 when the body ended without data.
    pub(crate) size: u64,
    /// Bytes of the final data frame when body saving is enabled.
    pub(crate) data: Option<Bytes>,
}

/// Callback invoked once at response finalization.
pub(crate) type FinalizeCallback = Box<dyn FnOnce(FinalizeData) + Send>;

struct Hook {
    callback: FinalizeCallback,
    save: bool,
    last_size: u64,
    last_data: Option<Bytes>,
}

impl Hook {
    fn fire(self) {
        (self.callback)(FinalizeData {
            size: self.last_size,
            data: self.last_data,
        });
    }
}

pin_project_lite::pin_project! {
    /// A response body wrapper that intercepts the end-of-stream event.
    ///
    /// If the body is dropped or errors before completing, the callback
    /// never fires and the capture session is abandoned silently.
    pub struct FinalizeBody<B>
    where
        B: Body,
    {
        #[pin]
        body: B,
        hook: Option<Hook>,
    }

    impl<B> PinnedDrop for FinalizeBody<B>
    where
        B: Body,
    {
        fn drop(this: Pin<&mut Self>) {
            let this = this.project();
            // A consumer may stop polling once is_end_stream() turns
            // true, without a final poll returning None. A body dropped
            // mid-stream keeps is_end_stream() false and is abandoned.
            if this.body.is_end_stream() {
                if let Some(hook) = this.hook.take() {
                    hook.fire();
                }
            }
        }
    }
}

impl<B> FinalizeBody<B>
where
    B: Body,
{
    pub(crate) fn new(body: B, save: bool, callback: FinalizeCallback) -> Self {
        Self {
            body,
            hook: Some(Hook {
                callback,
                save,
                last_size: 0,
                last_data: None,
            }),
        }
    }

    /// Inert wrapper used for filtered-out exchanges.
    pub(crate) fn passthrough(body: B) -> Self {
        Self { body, hook: None }
    }
}

impl<B> Body for FinalizeBody<B>
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
        match ready!(this.body.poll_frame(cx)) {
            Some(Ok(frame)) => {
                if let Some(hook) = this.hook.as_mut() {
                    if let Some(data) = frame.data_ref() {
                        hook.last_size = data.len() as u64;
                        hook.last_data = if hook.save { Some(data.clone()) } else { None };
                    }
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Some(Err(err)) => {
                // The exchange aborted mid-body; abandon the capture.
                this.hook.take();
                Poll::Ready(Some(Err(err)))
            }
            None => {
                if let Some(hook) = this.hook.take() {
                    hook.fire();
                }
                Poll::Ready(None)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.body.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.body.size_hint()
    }
}
