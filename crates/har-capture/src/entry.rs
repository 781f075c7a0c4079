//! Entry builder.
//!
//! Combines a completed capture session, the response snapshot, and the
//! finalization data into one immutable HAR entry. There are no error
//! paths here: missing or malformed inputs degrade to empty lists and
//! sentinel values, never a failure.

use crate::finalize::FinalizeData;
use crate::har::{
    Content, Entry, EntryTimings, HarPair, HarRequest, HarResponse, PostData, ResponseTimings,
    UNKNOWN_SIZE,
};
use crate::head::ResponseHead;
use crate::session::CaptureSession;
use chrono::{DateTime, SecondsFormat, Utc};
use http::{HeaderMap, Version};
use std::collections::HashSet;

/// Build the entry for a finalized exchange. Consumes the session.
pub(crate) fn build_entry(
    session: CaptureSession,
    response: &ResponseHead,
    finalize: FinalizeData,
) -> Entry {
    let elapsed_ms = session.started.elapsed().as_millis() as u64;
    let started: DateTime<Utc> = session.started_at.into();
    let pageref = format!("page{}", started.timestamp_millis());

    let url = session.head.uri.to_string();
    let (body_size, body_text) = session.tap.finish(session.decoding);

    let request = HarRequest {
        method: session.head.method.to_string(),
        url: url.clone(),
        http_version: version_string(session.head.version),
        headers_size: approximate_headers_size(&session.head.headers),
        headers: header_pairs(&session.head.headers),
        query_string: parse_query(session.head.query()),
        cookies: Vec::new(),
        body_size,
        post_data: PostData {
            mime_type: session.head.content_type().unwrap_or("").to_string(),
            params: Vec::new(),
            text: body_text,
            comment: String::new(),
        },
    };

    let content_text = if session.save_body {
        finalize
            .data
            .as_ref()
            .map(|data| session.decoding.decode(data))
            .unwrap_or_default()
    } else {
        String::new()
    };

    let response = HarResponse {
        status: response.status.as_u16(),
        redirect_url: url,
        http_version: version_string(response.version),
        headers_size: if response.headers.is_empty() {
            UNKNOWN_SIZE
        } else {
            approximate_headers_size(&response.headers)
        },
        status_text: response.status.canonical_reason().unwrap_or("").to_string(),
        headers: header_pairs(&response.headers),
        cookies: Vec::new(),
        body_size: finalize.size,
        content: Content {
            size: finalize.size,
            mime_type: response.content_type().unwrap_or("").to_string(),
            text: content_text,
        },
        timings: ResponseTimings::server_side(elapsed_ms),
    };

    Entry {
        started_date_time: started.to_rfc3339_opts(SecondsFormat::Millis, true),
        time: elapsed_ms,
        timings: EntryTimings::server_side(elapsed_ms),
        request,
        response,
        cache: serde_json::Map::new(),
        pageref,
    }
}

/// `HTTP/<x>` rendering of a protocol version.
fn version_string(version: Version) -> String {
    match version {
        Version::HTTP_09 => "HTTP/0.9".to_string(),
        Version::HTTP_10 => "HTTP/1.0".to_string(),
        Version::HTTP_11 => "HTTP/1.1".to_string(),
        Version::HTTP_2 => "HTTP/2.0".to_string(),
        Version::HTTP_3 => "HTTP/3.0".to_string(),
        other => format!("{:?}", other),
    }
}

/// Every header as a name/value pair. Non-UTF-8 values degrade lossily.
fn header_pairs(headers: &HeaderMap) -> Vec<HarPair> {
    headers
        .iter()
        .map(|(name, value)| {
            HarPair::new(
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

/// Approximate serialized header block size: `name: value\r\n` per header.
fn approximate_headers_size(headers: &HeaderMap) -> i64 {
    headers
        .iter()
        .map(|(name, value)| (name.as_str().len() + value.as_bytes().len() + 2) as i64)
        .sum()
}

/// Parse a raw query string into name/value pairs, one entry per key.
///
/// A repeated key keeps its first occurrence; later duplicates are
/// silently dropped (known limitation, no multi-value merging).
fn parse_query(query: Option<&str>) -> Vec<HarPair> {
    let Some(query) = query else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    let mut pairs = Vec::new();
    for part in query.split('&') {
        if part.is_empty() {
            continue;
        }
        let mut kv = part.splitn(2, '=');
        let name = decode_component(kv.next().unwrap_or(""));
        let value = decode_component(kv.next().unwrap_or(""));
        if seen.insert(name.clone()) {
            pairs.push(HarPair::new(name, value));
        }
    }
    pairs
}

fn decode_component(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CaptureConfig;
    use crate::head::RequestHead;
    use bytes::Bytes;

    fn session_for(req: http::Request<()>, config: &CaptureConfig) -> CaptureSession {
        CaptureSession::new(RequestHead::from_request(&req), config)
    }

    fn response_head(status: u16, content_type: Option<&str>) -> ResponseHead {
        let mut builder = http::Response::builder().status(status);
        if let Some(ct) = content_type {
            builder = builder.header("content-type", ct);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        ResponseHead::from_parts(&parts)
    }

    #[test]
    fn test_version_strings() {
        assert_eq!(version_string(Version::HTTP_11), "HTTP/1.1");
        assert_eq!(version_string(Version::HTTP_10), "HTTP/1.0");
        assert_eq!(version_string(Version::HTTP_2), "HTTP/2.0");
    }

    #[test]
    fn test_headers_size_approximation() {
        let mut headers = HeaderMap::new();
        headers.insert("host", "example.com".parse().unwrap());
        headers.insert("accept", "*/*".parse().unwrap());
        // (4 + 11 + 2) + (6 + 3 + 2)
        assert_eq!(approximate_headers_size(&headers), 28);
    }

    #[test]
    fn test_parse_query_basic() {
        let pairs = parse_query(Some("page=1&limit=10"));
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], HarPair::new("page", "1"));
        assert_eq!(pairs[1], HarPair::new("limit", "10"));
    }

    #[test]
    fn test_parse_query_duplicate_keys_dropped() {
        let pairs = parse_query(Some("tag=a&tag=b&other=c"));
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], HarPair::new("tag", "a"));
        assert_eq!(pairs[1], HarPair::new("other", "c"));
    }

    #[test]
    fn test_parse_query_percent_decoding() {
        let pairs = parse_query(Some("q=hello%20world"));
        assert_eq!(pairs[0], HarPair::new("q", "hello world"));
    }

    #[test]
    fn test_parse_query_absent_and_valueless() {
        assert!(parse_query(None).is_empty());
        let pairs = parse_query(Some("flag"));
        assert_eq!(pairs[0], HarPair::new("flag", ""));
    }

    #[test]
    fn test_build_entry_request_fields() {
        let config = CaptureConfig::new().save_body(true);
        let req = http::Request::builder()
            .method("PUT")
            .uri("/items?page=2")
            .header("content-type", "text/plain")
            .body(())
            .unwrap();
        let session = session_for(req, &config);
        session.tap.record(&Bytes::from_static(b"some body"));

        let entry = build_entry(
            session,
            &response_head(200, Some("text/plain")),
            FinalizeData {
                size: 16,
                data: Some(Bytes::from_static(b"This is quite OK")),
            },
        );

        assert_eq!(entry.request.method, "PUT");
        assert_eq!(entry.request.url, "/items?page=2");
        assert_eq!(entry.request.http_version, "HTTP/1.1");
        assert_eq!(entry.request.body_size, 9);
        assert_eq!(entry.request.post_data.text, "some body");
        assert_eq!(entry.request.post_data.mime_type, "text/plain");
        assert_eq!(entry.request.query_string, vec![HarPair::new("page", "2")]);

        assert_eq!(entry.response.status, 200);
        assert_eq!(entry.response.status_text, "OK");
        assert_eq!(entry.response.redirect_url, "/items?page=2");
        assert_eq!(entry.response.body_size, 16);
        assert_eq!(entry.response.content.text, "This is quite OK");
        assert_eq!(entry.response.content.mime_type, "text/plain");

        assert_eq!(entry.timings.wait, entry.time);
        assert!(entry.pageref.starts_with("page"));
    }

    #[test]
    fn test_build_entry_without_body_saving() {
        let config = CaptureConfig::new();
        let req = http::Request::builder().uri("/").body(()).unwrap();
        let session = session_for(req, &config);
        session.tap.record(&Bytes::from_static(b"counted"));

        let entry = build_entry(
            session,
            &response_head(204, None),
            FinalizeData {
                size: 5,
                data: None,
            },
        );

        assert_eq!(entry.request.body_size, 7);
        assert_eq!(entry.request.post_data.text, "");
        assert_eq!(entry.response.body_size, 5);
        assert_eq!(entry.response.content.text, "");
        assert_eq!(entry.response.content.mime_type, "");
    }

    #[test]
    fn test_headerless_response_size_sentinel() {
        let config = CaptureConfig::new();
        let req = http::Request::builder().uri("/").body(()).unwrap();
        let session = session_for(req, &config);

        let entry = build_entry(
            session,
            &response_head(200, None),
            FinalizeData { size: 0, data: None },
        );

        assert_eq!(entry.response.headers_size, UNKNOWN_SIZE);
        assert!(entry.response.headers.is_empty());
    }
}
