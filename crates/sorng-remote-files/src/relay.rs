//! CORS contract of the optional pass-through relay.
//!
//! Browsers cannot reach most WebDAV servers directly, so a relay forwards
//! requests unchanged and decorates the responses. This module only computes
//! what the relay must send; it does not run one. Point a `ClientConfig` at
//! the relay URL to route through it.

use crate::error::{RemoteFsError, RemoteFsResult};
use serde::{Deserialize, Serialize};
use url::Url;

pub const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS, PROPFIND, MKCOL, COPY, MOVE";
pub const ALLOW_HEADERS: &str =
    "Authorization, Content-Type, Depth, OCS-APIRequest, X-Requested-With, Content-Length";
pub const MAX_AGE_SECS: u32 = 86_400;
/// Status of a preflight answer.
pub const PREFLIGHT_STATUS: u16 = 204;

const WILDCARD: &str = "*";

/// Request headers the relay drops before forwarding.
const HOP_HEADERS: [&str; 2] = ["host", "origin"];

/// Injected relay configuration: upstream server and origin allow-list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayPolicy {
    #[serde(default)]
    pub upstream: Option<String>,
    /// Explicit origins; a `"*"` entry allows every origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl RelayPolicy {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            upstream: None,
            allowed_origins: origins.into_iter().map(Into::into).collect(),
        }
    }

    pub fn wildcard() -> Self {
        Self::new([WILDCARD])
    }

    pub fn with_upstream(mut self, upstream: &str) -> Self {
        self.upstream = Some(upstream.trim().trim_end_matches('/').to_string());
        self
    }

    /// `{"upstream": "...", "allowedOrigins": ["https://app.example"]}`.
    pub fn from_json(json: &str) -> RemoteFsResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_wildcard(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == WILDCARD)
    }

    /// Whether responses to `origin` carry CORS grants. A missing origin is
    /// only allowed under the wildcard.
    pub fn allows(&self, origin: Option<&str>) -> bool {
        if self.is_wildcard() {
            return true;
        }
        let Some(origin) = origin else {
            return false;
        };
        let wanted = canonical_origin(origin);
        self.allowed_origins
            .iter()
            .any(|o| canonical_origin(o) == wanted)
    }

    /// Value for `Access-Control-Allow-Origin`: the request origin echoed
    /// back, `*` when there is none.
    pub fn allow_origin(&self, origin: Option<&str>) -> Option<String> {
        self.allows(origin)
            .then(|| origin.unwrap_or(WILDCARD).to_string())
    }

    /// Headers for a `204` answer to an `OPTIONS` preflight.
    pub fn preflight_headers(&self, origin: Option<&str>) -> Vec<(&'static str, String)> {
        let mut headers = Vec::with_capacity(5);
        if let Some(allowed) = self.allow_origin(origin) {
            headers.push(("Access-Control-Allow-Origin", allowed));
        }
        headers.push(("Access-Control-Allow-Methods", ALLOW_METHODS.to_string()));
        headers.push(("Access-Control-Allow-Headers", ALLOW_HEADERS.to_string()));
        headers.push(("Access-Control-Allow-Credentials", "true".to_string()));
        headers.push(("Access-Control-Max-Age", MAX_AGE_SECS.to_string()));
        headers
    }

    /// Headers added to a forwarded response. Empty for a disallowed origin.
    pub fn response_headers(&self, origin: Option<&str>) -> Vec<(&'static str, String)> {
        match self.allow_origin(origin) {
            Some(allowed) => vec![
                ("Access-Control-Allow-Origin", allowed),
                ("Access-Control-Allow-Credentials", "true".to_string()),
                ("Access-Control-Expose-Headers", WILDCARD.to_string()),
            ],
            None => Vec::new(),
        }
    }

    /// Upstream URL for a relayed path and query, unchanged otherwise.
    pub fn forward_url(&self, path: &str, query: Option<&str>) -> RemoteFsResult<String> {
        let upstream = self
            .upstream
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(RemoteFsError::not_configured)?;
        let mut target = format!("{}/{}", upstream, path.trim_start_matches('/'));
        if let Some(q) = query.filter(|q| !q.is_empty()) {
            target.push('?');
            target.push_str(q.trim_start_matches('?'));
        }
        Ok(target)
    }

    /// Whether a request header is passed through to the upstream.
    pub fn forwards_header(name: &str) -> bool {
        !HOP_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name))
    }
}

/// `scheme://host[:port]`, lowercased; falls back to the raw text.
fn canonical_origin(origin: &str) -> String {
    match Url::parse(origin.trim()) {
        Ok(url) => url.origin().ascii_serialization(),
        Err(_) => origin.trim().to_string(),
    }
}
