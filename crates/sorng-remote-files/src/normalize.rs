//! Turns transport output into the canonical `RemoteItem` model.
//!
//! This is the only place item records are built; both payload shapes go
//! through `normalize_entry`.

use crate::error::{RemoteFsError, RemoteFsResult};
use crate::multistatus::parse_multistatus;
use crate::types::{DavEntry, DavPayload, ItemType, RemoteItem};
use percent_encoding::percent_decode_str;

/// Flatten either payload shape into raw entries, preserving server order.
pub fn payload_entries(payload: DavPayload) -> RemoteFsResult<Vec<DavEntry>> {
    match payload {
        DavPayload::Multistatus(xml) => parse_multistatus(&xml),
        DavPayload::Entries(entries) => Ok(entries),
    }
}

/// Listing result: every entry except the first, which is the queried
/// collection itself.
pub fn normalize_listing(payload: DavPayload, dav_root_path: &str) -> RemoteFsResult<Vec<RemoteItem>> {
    let entries = payload_entries(payload)?;
    Ok(entries
        .iter()
        .skip(1)
        .map(|e| normalize_entry(e, dav_root_path))
        .collect())
}

/// Metadata result: the first entry, or `NotFound` when there is none.
pub fn normalize_single(
    payload: DavPayload,
    dav_root_path: &str,
    requested: &str,
) -> RemoteFsResult<RemoteItem> {
    payload_entries(payload)?
        .first()
        .map(|e| normalize_entry(e, dav_root_path))
        .ok_or_else(|| RemoteFsError::not_found(format!("no entry returned for {}", requested)))
}

/// Build one `RemoteItem`.
///
/// Missing properties are not an error: size defaults to 0, strings to "".
/// Directories always report size 0 and an empty mime.
pub fn normalize_entry(entry: &DavEntry, dav_root_path: &str) -> RemoteItem {
    let path = relative_path(&entry.href, dav_root_path);
    let name = leaf_name(&path);
    let item_type = if entry.is_collection {
        ItemType::Directory
    } else {
        ItemType::File
    };

    let (size, mime) = match item_type {
        ItemType::Directory => (0, String::new()),
        ItemType::File => (
            entry.content_length.unwrap_or(0),
            entry.content_type.clone().unwrap_or_default(),
        ),
    };

    RemoteItem {
        name,
        path,
        item_type,
        size,
        last_modified: entry.last_modified.clone().unwrap_or_default(),
        mime,
        etag: entry.etag.clone().filter(|e| !e.is_empty()),
    }
}

/// Decode an href and strip everything up to and including the DAV root.
///
/// Works for server-relative hrefs, absolute URLs and servers installed under a
/// sub-path. The result always starts with `/` and has no trailing slash
/// (except the root itself).
pub fn relative_path(href: &str, dav_root_path: &str) -> String {
    let decoded = percent_decode_str(href).decode_utf8_lossy();
    let decoded: &str = &decoded;
    let rest = strip_dav_root(decoded, dav_root_path).unwrap_or(decoded);

    let trimmed = rest.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn strip_dav_root<'a>(decoded: &'a str, root: &str) -> Option<&'a str> {
    let mut search_from = 0;
    while let Some(pos) = decoded[search_from..].find(root) {
        let end = search_from + pos + root.len();
        let rest = &decoded[end..];
        // "/files/al" must not match "/files/alice".
        if rest.is_empty() || rest.starts_with('/') {
            return Some(rest);
        }
        search_from = end;
    }
    None
}

/// Final non-empty segment of a path; "" for the root.
pub fn leaf_name(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .last()
        .unwrap_or_default()
        .to_string()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
