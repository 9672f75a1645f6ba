//! Inbound request boundary.
//!
//! The hosting transport hands the dispatcher anything implementing
//! [`InboundRequest`]. [`DispatchRequest`] is an owned implementation that
//! can be built directly or converted from an `http::Request<String>`.

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use tracing::debug;

/// What the dispatcher needs to know about an inbound request.
pub trait InboundRequest {
    fn method(&self) -> &Method;
    /// Full request path, without the query string.
    fn path(&self) -> &str;
    /// Mount point stripped from [`path`](Self::path) before routing (`""` for none).
    fn context_path(&self) -> &str;
    /// Query parameters in arrival order; a name may repeat.
    fn query_params(&self) -> &[(String, String)];
    fn headers(&self) -> &HeaderMap;
    /// Raw request body text (`""` when absent).
    fn body(&self) -> &str;
}

/// Owned [`InboundRequest`].
#[derive(Debug, Clone, Default)]
pub struct DispatchRequest {
    pub method: Method,
    pub path: String,
    pub context_path: String,
    pub query_params: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: String,
}

impl DispatchRequest {
    /// Start a request for `method path`.
    ///
    /// A query string on `path` is split off and parsed.
    pub fn new(method: Method, path: &str) -> Self {
        let (path, query_params) = split_query(path);
        Self {
            method,
            path,
            query_params,
            ..Default::default()
        }
    }

    /// Set the mount point stripped before routing.
    #[must_use]
    pub fn with_context_path(mut self, context_path: impl Into<String>) -> Self {
        self.context_path = context_path.into();
        self
    }

    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((name.into(), value.into()));
        self
    }

    /// Add a header. Invalid names or values are dropped with a debug log.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(n), Ok(v)) => {
                self.headers.append(n, v);
            }
            _ => debug!(header = %name, "Dropping invalid header"),
        }
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Convert an `http::Request` whose body has already been read as text.
    pub fn from_http(req: http::Request<String>, context_path: impl Into<String>) -> Self {
        let (parts, body) = req.into_parts();
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());
        let (path, query_params) = split_query(&path_and_query);
        Self {
            method: parts.method,
            path,
            context_path: context_path.into(),
            query_params,
            headers: parts.headers,
            body,
        }
    }
}

impl InboundRequest for DispatchRequest {
    fn method(&self) -> &Method {
        &self.method
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn context_path(&self) -> &str {
        &self.context_path
    }

    fn query_params(&self) -> &[(String, String)] {
        &self.query_params
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn body(&self) -> &str {
        &self.body
    }
}

/// Split `path?query` and URL-decode the query pairs.
#[must_use]
pub fn split_query(path: &str) -> (String, Vec<(String, String)>) {
    match path.split_once('?') {
        Some((p, query_str)) => (
            p.to_string(),
            url::form_urlencoded::parse(query_str.as_bytes())
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ),
        None => (path.to_string(), Vec::new()),
    }
}
