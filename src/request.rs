//! Inbound request shape consumed by the route table and the signature checker.

use http::Method;
use std::borrow::Cow;

/// The parts of an HTTP request the route engine looks at.
///
/// `path` is kept exactly as received (still percent-encoded); matching and
/// binding work on [`RouteRequest::decoded_path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub domain: Option<String>,
    pub secure: bool,
    pub port: Option<u16>,
}

impl RouteRequest {
    /// Build a request from a method and a path that may carry a query string.
    pub fn new(method: Method, path: impl AsRef<str>) -> Self {
        let raw = path.as_ref();
        let (path, query) = match raw.split_once('?') {
            Some((p, q)) => (p, Some(q.to_string())),
            None => (raw, None),
        };
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        Self {
            method,
            path,
            query,
            domain: None,
            secure: false,
            port: None,
        }
    }

    /// Build a request from an absolute URL.
    pub fn from_url(method: Method, url: &str) -> Result<Self, url::ParseError> {
        let parsed = url::Url::parse(url)?;
        Ok(Self {
            method,
            path: parsed.path().to_string(),
            query: parsed.query().map(str::to_string),
            domain: parsed.host_str().map(str::to_string),
            secure: parsed.scheme() == "https",
            port: parsed.port(),
        })
    }

    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn scheme(&self) -> &'static str {
        if self.secure {
            "https"
        } else {
            "http"
        }
    }

    /// Effective port, falling back to the scheme default.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(if self.secure { 443 } else { 80 })
    }

    /// Path with trailing slashes removed (`/` for the root), percent-decoded.
    #[must_use]
    pub fn decoded_path(&self) -> String {
        let trimmed = self.path.trim_end_matches('/');
        let trimmed = if trimmed.is_empty() { "/" } else { trimmed };
        let bytes: Cow<'_, [u8]> = urlencoding::decode_binary(trimmed.as_bytes());
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// `scheme://host[:port]`, omitting the port when it is the scheme default.
    #[must_use]
    pub fn root(&self) -> String {
        let host = self.domain.as_deref().unwrap_or("localhost");
        let port = self.port();
        let default_port = if self.secure { 443 } else { 80 };
        if port == default_port {
            format!("{}://{}", self.scheme(), host)
        } else {
            format!("{}://{}:{}", self.scheme(), host, port)
        }
    }

    /// Absolute URL without query string or trailing slash.
    #[must_use]
    pub fn url(&self) -> String {
        format!("{}{}", self.root(), self.path)
            .trim_end_matches('/')
            .to_string()
    }

    /// Raw query string, empty when there is none.
    #[must_use]
    pub fn query_string(&self) -> &str {
        self.query.as_deref().unwrap_or("")
    }

    /// Decoded value of a query parameter (last occurrence wins).
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<String> {
        url::form_urlencoded::parse(self.query_string().as_bytes())
            .filter(|(k, _)| k == key)
            .last()
            .map(|(_, v)| v.into_owned())
    }
}
