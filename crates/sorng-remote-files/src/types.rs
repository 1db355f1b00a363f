// ──────────────────────────────────────────────────────────────────────────────
// sorng-remote-files · types
// ──────────────────────────────────────────────────────────────────────────────
// Type catalogue covering:
//  • Canonical filesystem record (`RemoteItem`)
//  • Raw transport output (`DavEntry`, `DavPayload`)
//  • Operation acknowledgements and share records
//  • OCS response envelope
// ──────────────────────────────────────────────────────────────────────────────

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Canonical item model ─────────────────────────────────────────────────────

/// Whether an entry is a plain resource or a collection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    File,
    Directory,
}

/// One filesystem entry, identical regardless of which transport produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteItem {
    /// Decoded leaf name (final path segment).
    pub name: String,
    /// User-relative path, DAV root stripped, percent-decoded.
    pub path: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Byte length; 0 for directories or when the server omitted it.
    pub size: u64,
    /// HTTP-date as sent by the server, or "" when absent.
    pub last_modified: String,
    /// Content type; "" for directories.
    pub mime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl RemoteItem {
    pub fn is_directory(&self) -> bool {
        self.item_type == ItemType::Directory
    }

    /// Parsed `last_modified`, when it is a valid RFC 2822 / HTTP-date.
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc2822(&self.last_modified)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

// ── Raw transport output ─────────────────────────────────────────────────────

/// A single `<d:response>` (or structured stat result) before normalisation.
///
/// Every property is optional; the normaliser decides the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DavEntry {
    /// Href as sent by the server (percent-encoded, may be absolute).
    pub href: String,
    /// A `collection` marker was present inside `resourcetype`.
    pub is_collection: bool,
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub last_modified: Option<String>,
    pub etag: Option<String>,
}

/// The two result shapes a transport may hand back for a property query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DavPayload {
    /// Raw multistatus XML body.
    Multistatus(String),
    /// Entries already parsed by the transport, in server order.
    Entries(Vec<DavEntry>),
}

/// Depth header value for PROPFIND requests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PropfindDepth {
    Zero,
    One,
    Infinity,
}

impl PropfindDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zero => "0",
            Self::One => "1",
            Self::Infinity => "infinity",
        }
    }
}

// ── Acknowledgements ─────────────────────────────────────────────────────────

/// Uniform ack for create / delete / upload / move / copy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl OperationResult {
    pub fn done() -> Self {
        Self {
            success: true,
            path: None,
        }
    }

    pub fn at(path: &str) -> Self {
        Self {
            success: true,
            path: Some(path.to_string()),
        }
    }
}

/// Uploads acknowledge with the same shape.
pub type UploadResult = OperationResult;

// ── Sharing ──────────────────────────────────────────────────────────────────

/// A freshly created public link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShareRecord {
    pub success: bool,
    pub share_url: String,
    pub token: String,
    pub id: String,
}

impl ShareRecord {
    /// Direct-download variant of the public link.
    pub fn download_url(&self) -> String {
        format!("{}/download", self.share_url.trim_end_matches('/'))
    }
}

/// OCS share permissions bitmap.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SharePermissions(pub u32);

impl SharePermissions {
    pub const READ: u32 = 1;
    pub const UPDATE: u32 = 2;
    pub const CREATE: u32 = 4;
    pub const DELETE: u32 = 8;
    pub const SHARE: u32 = 16;
    pub const ALL: u32 = 31;

    pub fn can_read(&self) -> bool {
        self.0 & Self::READ != 0
    }
    pub fn can_update(&self) -> bool {
        self.0 & Self::UPDATE != 0
    }
}

impl Default for SharePermissions {
    fn default() -> Self {
        Self(Self::READ)
    }
}

/// Options accepted by `create_share_link`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShareOptions {
    /// Defaults to read-only when unset.
    pub permissions: Option<u32>,
    pub password: Option<String>,
    /// `YYYY-MM-DD`.
    pub expire_date: Option<String>,
}

impl ShareOptions {
    pub fn read_only() -> Self {
        Self::default()
    }

    pub fn with_permissions(mut self, permissions: u32) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn with_expire_date(mut self, date: &str) -> Self {
        self.expire_date = Some(date.to_string());
        self
    }

    /// Requested permissions, read-only when unset. An empty bitmap is not a
    /// usable link, so `0` also falls back to read-only.
    pub fn effective_permissions(&self) -> SharePermissions {
        self.permissions
            .filter(|bits| *bits != 0)
            .map(SharePermissions)
            .unwrap_or_default()
    }
}

// ── Generic OCS envelope ─────────────────────────────────────────────────────

/// Standard OCS response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcsResponse<T> {
    pub ocs: OcsEnvelope<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcsEnvelope<T> {
    pub meta: Option<OcsMeta>,
    pub data: Option<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcsMeta {
    pub status: Option<String>,
    pub statuscode: Option<u32>,
    pub message: Option<String>,
}
