//! HAR (HTTP Archive) document model.
//!
//! One `HarDocument` is persisted per flushed batch. The field set and
//! sentinel values follow the HAR 1.1 schema as produced by server-side
//! capture: phase timings other than `wait` are not measurable on the
//! server, so they carry sentinels and an explanatory comment.

use serde::{Deserialize, Serialize};

/// HAR schema version written into every document.
pub const HAR_VERSION: &str = "1.1";

/// Sentinel for sizes that cannot be determined.
pub const UNKNOWN_SIZE: i64 = -1;

/// Comment attached to timing blocks.
pub(crate) const TIMING_COMMENT: &str = "Server-side processing only";

/// Top-level persisted document, one per flushed batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarDocument {
    /// The HAR log envelope.
    pub log: HarLog,
}

impl HarDocument {
    /// Assemble a document from a batch of entries, in the order they
    /// were appended (finalization order).
    pub fn new(entries: Vec<Entry>) -> Self {
        Self {
            log: HarLog {
                version: HAR_VERSION.to_string(),
                creator: Creator {
                    name: env!("CARGO_PKG_NAME").to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                },
                pages: Vec::new(),
                entries,
            },
        }
    }
}

/// The `log` object of a HAR document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarLog {
    /// HAR schema version.
    pub version: String,
    /// Tool that produced the document.
    pub creator: Creator,
    /// Page records. Always empty; this capture is not page-oriented.
    pub pages: Vec<serde_json::Value>,
    /// Captured entries in finalization order.
    pub entries: Vec<Entry>,
}

/// Identifies the software that produced the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creator {
    /// Crate name.
    pub name: String,
    /// Crate version.
    pub version: String,
}

/// One normalized trace record for a completed exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Wall-clock start of the exchange, RFC 3339 with milliseconds.
    pub started_date_time: String,
    /// Total elapsed time in milliseconds.
    pub time: u64,
    /// Entry-level phase timings.
    pub timings: EntryTimings,
    /// Request snapshot.
    pub request: HarRequest,
    /// Response snapshot.
    pub response: HarResponse,
    /// Cache information. Always empty.
    pub cache: serde_json::Map<String, serde_json::Value>,
    /// Reference to the owning page record.
    pub pageref: String,
}

/// Entry-level timing block. `send` and `receive` are not measurable
/// server-side and carry the `-1` sentinel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryTimings {
    /// Not applicable server-side.
    pub send: i64,
    /// Not applicable server-side.
    pub receive: i64,
    /// Server processing time in milliseconds.
    pub wait: u64,
    /// Explains the sentinel values.
    pub comment: String,
}

impl EntryTimings {
    pub(crate) fn server_side(wait: u64) -> Self {
        Self {
            send: UNKNOWN_SIZE,
            receive: UNKNOWN_SIZE,
            wait,
            comment: TIMING_COMMENT.to_string(),
        }
    }
}

/// Request half of an entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarRequest {
    /// HTTP method.
    pub method: String,
    /// Full request URL as received.
    pub url: String,
    /// Protocol version, e.g. `HTTP/1.1`.
    pub http_version: String,
    /// Approximate header block size in bytes.
    pub headers_size: i64,
    /// Every request header, in received order.
    pub headers: Vec<HarPair>,
    /// Parsed query parameters, one entry per key.
    pub query_string: Vec<HarPair>,
    /// Cookie records. Cookie parsing is out of scope; always empty.
    pub cookies: Vec<serde_json::Value>,
    /// Request body size in bytes.
    pub body_size: u64,
    /// Captured request body.
    pub post_data: PostData,
}

/// Captured request body data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostData {
    /// Request content type, empty when absent.
    pub mime_type: String,
    /// Parsed parameters. Always empty; the raw text is kept instead.
    pub params: Vec<serde_json::Value>,
    /// Decoded body text; empty when body saving is disabled.
    pub text: String,
    /// Free-form comment.
    pub comment: String,
}

/// Response half of an entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarResponse {
    /// Status code.
    pub status: u16,
    /// Redirect target. Mirrors the request URL for parity with the
    /// original capture format.
    #[serde(rename = "redirectURL")]
    pub redirect_url: String,
    /// Protocol version, e.g. `HTTP/1.1`.
    pub http_version: String,
    /// Approximate header block size in bytes, or -1 when unknown.
    pub headers_size: i64,
    /// Canonical reason phrase.
    pub status_text: String,
    /// Response headers as transmitted.
    pub headers: Vec<HarPair>,
    /// Cookie records. Always empty.
    pub cookies: Vec<serde_json::Value>,
    /// Response body size in bytes.
    pub body_size: u64,
    /// Captured response content.
    pub content: Content,
    /// Response-level phase timings.
    pub timings: ResponseTimings,
}

/// Captured response content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    /// Content size in bytes.
    pub size: u64,
    /// Response content type, empty when absent.
    pub mime_type: String,
    /// Decoded content text; empty when body saving is disabled.
    pub text: String,
}

/// Response-level timing block. `send` and `receive` are fixed at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseTimings {
    /// Not measured server-side.
    pub send: i64,
    /// Not measured server-side.
    pub receive: i64,
    /// Server processing time in milliseconds.
    pub wait: u64,
    /// Explains the sentinel values.
    pub comment: String,
}

impl ResponseTimings {
    pub(crate) fn server_side(wait: u64) -> Self {
        Self {
            send: 0,
            receive: 0,
            wait,
            comment: TIMING_COMMENT.to_string(),
        }
    }
}

/// A name/value pair used for headers and query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarPair {
    /// Pair name.
    pub name: String,
    /// Pair value.
    pub value: String,
}

impl HarPair {
    /// Create a pair.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_entry() -> Entry {
        Entry {
            started_date_time: "2026-01-01T00:00:00.000Z".to_string(),
            time: 12,
            timings: EntryTimings::server_side(12),
            request: HarRequest {
                method: "GET".to_string(),
                url: "/".to_string(),
                http_version: "HTTP/1.1".to_string(),
                headers_size: 0,
                headers: Vec::new(),
                query_string: Vec::new(),
                cookies: Vec::new(),
                body_size: 0,
                post_data: PostData {
                    mime_type: String::new(),
                    params: Vec::new(),
                    text: String::new(),
                    comment: String::new(),
                },
            },
            response: HarResponse {
                status: 200,
                redirect_url: "/".to_string(),
                http_version: "HTTP/1.1".to_string(),
                headers_size: UNKNOWN_SIZE,
                status_text: "OK".to_string(),
                headers: Vec::new(),
                cookies: Vec::new(),
                body_size: 0,
                content: Content {
                    size: 0,
                    mime_type: String::new(),
                    text: String::new(),
                },
                timings: ResponseTimings::server_side(12),
            },
            cache: serde_json::Map::new(),
            pageref: "page0".to_string(),
        }
    }

    #[test]
    fn test_document_envelope() {
        let doc = HarDocument::new(vec![minimal_entry()]);
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(value["log"]["version"], "1.1");
        assert_eq!(value["log"]["creator"]["name"], env!("CARGO_PKG_NAME"));
        assert!(value["log"]["pages"].as_array().unwrap().is_empty());
        assert_eq!(value["log"]["entries"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_entry_field_names_are_camel_case() {
        let doc = HarDocument::new(vec![minimal_entry()]);
        let value = serde_json::to_value(&doc).unwrap();
        let entry = &value["log"]["entries"][0];

        assert!(entry.get("startedDateTime").is_some());
        assert!(entry["request"].get("httpVersion").is_some());
        assert!(entry["request"].get("headersSize").is_some());
        assert!(entry["request"].get("queryString").is_some());
        assert!(entry["request"].get("bodySize").is_some());
        assert!(entry["request"]["postData"].get("mimeType").is_some());
        assert!(entry["response"].get("redirectURL").is_some());
        assert!(entry["response"].get("statusText").is_some());
        assert!(entry["cache"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_timing_sentinels() {
        let entry = minimal_entry();
        assert_eq!(entry.timings.send, -1);
        assert_eq!(entry.timings.receive, -1);
        assert_eq!(entry.response.timings.send, 0);
        assert_eq!(entry.response.timings.receive, 0);
        assert_eq!(entry.timings.comment, "Server-side processing only");
    }

    #[test]
    fn test_round_trips_through_json() {
        let doc = HarDocument::new(vec![minimal_entry()]);
        let json = serde_json::to_string(&doc).unwrap();
        let back: HarDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back.log.entries.len(), 1);
        assert_eq!(back.log.entries[0].time, 12);
    }
}
