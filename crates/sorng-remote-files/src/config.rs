// ──────────────────────────────────────────────────────────────────────────────
// sorng-remote-files · config
// ──────────────────────────────────────────────────────────────────────────────
// Credential triple and everything derived from it:
//  • Normalisation of the server URL
//  • Basic-auth header
//  • WebDAV root / per-path URLs (recomputed on every call)
//  • OCS sharing endpoint
// ──────────────────────────────────────────────────────────────────────────────

use crate::error::{RemoteFsError, RemoteFsResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-user WebDAV files collection, relative to the server URL.
pub const DAV_FILES_PREFIX: &str = "/remote.php/dav/files/";

/// OCS Share API v1 endpoint, relative to the server URL.
pub const SHARES_API: &str = "ocs/v2.php/apps/files_sharing/api/v1/shares";

/// Characters escaped inside a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b']')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}')
    .add(b'/');

/// Server URL, username and app password / token.
///
/// Immutable once built; `RemoteFsClient::configure` swaps in a fresh value.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawClientConfig")]
pub struct ClientConfig {
    server_url: String,
    username: String,
    #[serde(skip_serializing)]
    secret: String,
}

/// Wire shape accepted when loading a config from JSON.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClientConfig {
    #[serde(default)]
    server_url: String,
    #[serde(default)]
    username: String,
    #[serde(default, alias = "appPassword", alias = "password")]
    secret: String,
}

impl From<RawClientConfig> for ClientConfig {
    fn from(raw: RawClientConfig) -> Self {
        Self::new(&raw.server_url, &raw.username, &raw.secret)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("server_url", &self.server_url)
            .field("username", &self.username)
            .field("secret", &self.masked_secret())
            .finish()
    }
}

impl ClientConfig {
    pub fn new(server_url: &str, username: &str, secret: &str) -> Self {
        Self {
            server_url: normalize_server_url(server_url),
            username: username.to_string(),
            secret: secret.to_string(),
        }
    }

    /// Parse a JSON document such as
    /// `{"serverUrl": "...", "username": "...", "appPassword": "..."}`.
    pub fn from_json(json: &str) -> RemoteFsResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| RemoteFsError::parse(format!("invalid client config: {}", e)))
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// True iff server URL, username and secret are all non-empty.
    pub fn is_configured(&self) -> bool {
        !self.server_url.is_empty() && !self.username.is_empty() && !self.secret.is_empty()
    }

    pub fn masked_secret(&self) -> String {
        match self.secret.char_indices().nth(4) {
            Some((idx, _)) => format!("{}****", &self.secret[..idx]),
            None => "****".to_string(),
        }
    }

    // ── Auth ─────────────────────────────────────────────────────────────

    /// `Authorization` header value: `Basic base64(username:secret)`.
    pub fn auth_header(&self) -> String {
        let credentials = format!("{}:{}", self.username, self.secret);
        format!("Basic {}", STANDARD.encode(credentials))
    }

    // ── URL builders ─────────────────────────────────────────────────────

    /// Server-relative DAV root as it appears in multistatus hrefs, e.g.
    /// `/remote.php/dav/files/alice`.
    pub fn dav_root_path(&self) -> String {
        format!("{}{}", DAV_FILES_PREFIX, self.username)
    }

    /// Absolute WebDAV endpoint for the current user, e.g.
    /// `https://cloud.example.com/remote.php/dav/files/alice`.
    pub fn dav_root(&self) -> String {
        format!(
            "{}{}{}",
            self.server_url,
            DAV_FILES_PREFIX,
            encode_segment(&self.username)
        )
    }

    /// Absolute WebDAV URL of `path` (relative to the user root).
    pub fn dav_url(&self, path: &str) -> String {
        format!("{}/{}", self.dav_root(), encode_dav_path(path))
    }

    /// Absolute OCS URL for an endpoint path.
    pub fn ocs_url(&self, path: &str) -> String {
        format!("{}/{}", self.server_url, path.trim_start_matches('/'))
    }

    /// Share-creation endpoint with JSON format negotiation.
    pub fn shares_url(&self) -> String {
        format!("{}?format=json", self.ocs_url(SHARES_API))
    }
}

fn normalize_server_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Percent-encode each segment of a user-relative path. A leading slash is
/// dropped; a trailing slash is kept.
pub fn encode_dav_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_url_is_trimmed() {
        let c = ClientConfig::new("  https://nc.test/  ", "u", "p");
        assert_eq!(c.server_url(), "https://nc.test");
    }

    #[test]
    fn configured_requires_all_three() {
        assert!(ClientConfig::new("https://nc.test", "u", "p").is_configured());
        assert!(!ClientConfig::new("", "u", "p").is_configured());
        assert!(!ClientConfig::new("https://nc.test", "", "p").is_configured());
        assert!(!ClientConfig::new("https://nc.test", "u", "").is_configured());
        assert!(!ClientConfig::default().is_configured());
    }

    #[test]
    fn auth_header_is_basic() {
        let c = ClientConfig::new("https://nc.test", "alice", "secret");
        // base64("alice:secret")
        assert_eq!(c.auth_header(), "Basic YWxpY2U6c2VjcmV0");
    }

    #[test]
    fn dav_root_url() {
        let c = ClientConfig::new("https://nc.test/", "alice", "pw");
        assert_eq!(c.dav_root(), "https://nc.test/remote.php/dav/files/alice");
        assert_eq!(c.dav_root_path(), "/remote.php/dav/files/alice");
    }

    #[test]
    fn dav_url_encodes_segments() {
        let c = ClientConfig::new("https://nc.test", "alice", "pw");
        assert_eq!(
            c.dav_url("/Documents/hello world.pdf"),
            "https://nc.test/remote.php/dav/files/alice/Documents/hello%20world.pdf"
        );
        assert_eq!(c.dav_url("/"), "https://nc.test/remote.php/dav/files/alice/");
    }

    #[test]
    fn encode_dav_path_keeps_trailing_slash() {
        assert_eq!(encode_dav_path("/Photos/"), "Photos/");
        assert_eq!(encode_dav_path("a#b/c?d"), "a%23b/c%3Fd");
    }

    #[test]
    fn shares_url_negotiates_json() {
        let c = ClientConfig::new("https://nc.test", "u", "p");
        assert_eq!(
            c.shares_url(),
            "https://nc.test/ocs/v2.php/apps/files_sharing/api/v1/shares?format=json"
        );
    }

    #[test]
    fn masked_secret_short_and_long() {
        assert_eq!(ClientConfig::new("x", "u", "ab").masked_secret(), "****");
        assert_eq!(
            ClientConfig::new("x", "u", "secret-password").masked_secret(),
            "secr****"
        );
    }

    #[test]
    fn debug_never_prints_secret() {
        let c = ClientConfig::new("https://nc.test", "u", "super-secret-token");
        let dbg = format!("{:?}", c);
        assert!(!dbg.contains("super-secret-token"));
    }

    #[test]
    fn from_json_accepts_app_password_alias() {
        let c = ClientConfig::from_json(
            r#"{"serverUrl":"https://nc.test/","username":"bob","appPassword":"tok"}"#,
        )
        .unwrap();
        assert_eq!(c.server_url(), "https://nc.test");
        assert!(c.is_configured());
    }

    #[test]
    fn serialized_config_omits_secret() {
        let c = ClientConfig::new("https://nc.test", "bob", "tok");
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("serverUrl"));
        assert!(!json.contains("tok\""));
        assert!(!json.contains("secret"));
    }
}
