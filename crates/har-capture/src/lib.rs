//! # har-capture
//!
//! Tower middleware that records HTTP exchanges into batched HAR
//! (HTTP Archive) trace files for later inspection or replay.
//!
//! The layer sits between a server's routing layer and downstream
//! handlers and observes traffic without altering it:
//!
//! - a **filter predicate** gates which exchanges are captured at all;
//! - a **request body tap** counts (and optionally retains) body bytes
//!   as the inner service consumes them;
//! - a **response completion hook** snapshots response metadata exactly
//!   once, after the response body finishes;
//! - an **entry builder** assembles one normalized HAR entry per
//!   exchange, in finalization order;
//! - a **flush scheduler** batches entries and persists them through a
//!   pluggable sink under count- and time-based triggers, with
//!   externally controllable force-flush hooks.
//!
//! Capture failures never affect the exchange being served.
//!
//! ## Example
//!
//! ```ignore
//! use har_capture::{CaptureConfig, HarCaptureLayer};
//! use std::time::Duration;
//! use tower::ServiceBuilder;
//!
//! let capture = HarCaptureLayer::with_config(
//!     CaptureConfig::new()
//!         .output_dir("./har-out")
//!         .save_body(true)
//!         .max_capture_requests(200)
//!         .max_capture_window(Duration::from_secs(60)),
//! );
//!
//! let service = ServiceBuilder::new().layer(capture).service(handler);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod buffer;
pub mod config;
pub mod finalize;
pub mod har;
pub mod head;
pub mod layer;
pub mod sink;
pub mod tap;

mod entry;
mod session;

pub use buffer::CaptureBuffer;
pub use config::{
    BodyDecoding, CaptureConfig, DecodingResolver, NameResolver, RequestPredicate,
    DEFAULT_CAPTURE_REQUESTS, DEFAULT_CAPTURE_WINDOW,
};
pub use finalize::FinalizeBody;
pub use har::{Entry, HarDocument, HarLog, HarPair};
pub use head::{RequestHead, ResponseHead};
pub use layer::{FlushHandle, HarCapture, HarCaptureLayer};
pub use sink::{FileSink, MemorySink, Sink, SinkError};
pub use tap::TapBody;
