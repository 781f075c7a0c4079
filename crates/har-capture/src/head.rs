//! Request and response metadata snapshots.
//!
//! The capture pipeline hands the real `http` request and response to the
//! inner service, so predicates and the entry builder work on cheap owned
//! snapshots taken before the parts move on.

use http::{HeaderMap, Method, StatusCode, Uri, Version};

/// Snapshot of an inbound request's metadata.
///
/// Taken before the request is handed to the inner service. This is what
/// the filter and flush predicates see, and what the entry builder reads
/// at finalization time.
#[derive(Clone)]
pub struct RequestHead {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) version: Version,
    pub(crate) headers: HeaderMap,
}

impl RequestHead {
    /// Snapshot the metadata of a request.
    pub fn from_request<B>(req: &http::Request<B>) -> Self {
        Self {
            method: req.method().clone(),
            uri: req.uri().clone(),
            version: req.version(),
            headers: req.headers().clone(),
        }
    }

    /// Get the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the full request URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Get the HTTP version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Get the request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the request path.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Get the raw query string, if any.
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Get the value of a header as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get the `content-type` header value, if present.
    pub fn content_type(&self) -> Option<&str> {
        self.header(http::header::CONTENT_TYPE.as_str())
    }
}

impl std::fmt::Debug for RequestHead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHead")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("version", &self.version)
            .finish()
    }
}

/// Snapshot of a response's metadata, taken when the completion hook is
/// attached — after the inner service produced the response, so status and
/// headers are final.
#[derive(Clone)]
pub struct ResponseHead {
    pub(crate) status: StatusCode,
    pub(crate) version: Version,
    pub(crate) headers: HeaderMap,
}

impl ResponseHead {
    /// Snapshot the metadata of response parts.
    pub fn from_parts(parts: &http::response::Parts) -> Self {
        Self {
            status: parts.status,
            version: parts.version,
            headers: parts.headers.clone(),
        }
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the HTTP version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Get the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the `content-type` header value, if present.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

impl std::fmt::Debug for ResponseHead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseHead")
            .field("status", &self.status)
            .field("version", &self.version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_head_snapshot() {
        let req = http::Request::builder()
            .method(Method::POST)
            .uri("/items?page=2")
            .header("content-type", "application/json")
            .body(())
            .unwrap();

        let head = RequestHead::from_request(&req);

        assert_eq!(head.method(), &Method::POST);
        assert_eq!(head.path(), "/items");
        assert_eq!(head.query(), Some("page=2"));
        assert_eq!(head.content_type(), Some("application/json"));
    }

    #[test]
    fn test_response_head_snapshot() {
        let res = http::Response::builder()
            .status(StatusCode::CREATED)
            .header("content-type", "text/plain")
            .body(())
            .unwrap();

        let (parts, _) = res.into_parts();
        let head = ResponseHead::from_parts(&parts);

        assert_eq!(head.status(), StatusCode::CREATED);
        assert_eq!(head.content_type(), Some("text/plain"));
    }

    #[test]
    fn test_missing_content_type() {
        let req = http::Request::builder().uri("/").body(()).unwrap();
        let head = RequestHead::from_request(&req);
        assert_eq!(head.content_type(), None);
    }
}
