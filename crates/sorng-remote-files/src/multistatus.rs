// ──────────────────────────────────────────────────────────────────────────────
// sorng-remote-files · multistatus
// ──────────────────────────────────────────────────────────────────────────────
// WebDAV XML on the wire:
//  • PROPFIND request body
//  • Multistatus response parsing into raw `DavEntry` values
// ──────────────────────────────────────────────────────────────────────────────

use crate::error::{RemoteFsError, RemoteFsResult};
use crate::types::DavEntry;
use quick_xml::events::Event;
use quick_xml::Reader;

/// PROPFIND body requesting the properties the item model is built from.
pub const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<d:propfind xmlns:d="DAV:">
  <d:prop>
    <d:getlastmodified/>
    <d:getcontentlength/>
    <d:resourcetype/>
    <d:getcontenttype/>
    <d:getetag/>
  </d:prop>
</d:propfind>"#;

/// Parse a multistatus body into one `DavEntry` per `<response>`, in document
/// order.
///
/// Properties missing from the document stay `None`. A body without a
/// `multistatus` root, or one that ends with open elements, is a parse error.
pub fn parse_multistatus(xml: &str) -> RemoteFsResult<Vec<DavEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut entries: Vec<DavEntry> = Vec::new();
    let mut current: Option<DavEntry> = None;
    let mut current_tag: Option<String> = None;
    let mut in_resourcetype = false;
    // Depth at which the open `<response>` started; only its direct `<href>`
    // names the entry.
    let mut response_depth = 0usize;
    let mut saw_root = false;
    let mut depth = 0usize;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                depth += 1;
                let local = local_name(e.name().as_ref());
                match local.as_str() {
                    "multistatus" if depth == 1 => saw_root = true,
                    "response" => {
                        current = Some(DavEntry::default());
                        response_depth = depth;
                    }
                    "href" if depth == response_depth + 1 => current_tag = Some(local),
                    "resourcetype" => in_resourcetype = true,
                    "collection" if in_resourcetype => mark_collection(&mut current),
                    "getcontenttype" | "getcontentlength" | "getetag" | "getlastmodified" => {
                        current_tag = Some(local)
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(ref e)) => {
                let local = local_name(e.name().as_ref());
                if depth == 0 && local == "multistatus" {
                    saw_root = true;
                }
                if local == "collection" && in_resourcetype {
                    mark_collection(&mut current);
                }
            }
            Ok(Event::Text(ref e)) => {
                if let (Some(tag), Some(entry)) = (current_tag.as_deref(), current.as_mut()) {
                    let text = e.unescape()?.into_owned();
                    apply_property(entry, tag, text);
                }
            }
            Ok(Event::CData(ref e)) => {
                if let (Some(tag), Some(entry)) = (current_tag.as_deref(), current.as_mut()) {
                    let text = String::from_utf8_lossy(e).into_owned();
                    apply_property(entry, tag, text);
                }
            }
            Ok(Event::End(ref e)) => {
                depth = depth.saturating_sub(1);
                let local = local_name(e.name().as_ref());
                match local.as_str() {
                    "response" => {
                        if let Some(entry) = current.take() {
                            entries.push(entry);
                        }
                    }
                    "resourcetype" => in_resourcetype = false,
                    _ => {
                        if current_tag.as_deref() == Some(local.as_str()) {
                            current_tag = None;
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(RemoteFsError::parse("response is not a WebDAV multistatus document"));
    }
    if depth != 0 {
        return Err(RemoteFsError::parse("truncated multistatus document"));
    }
    Ok(entries)
}

fn mark_collection(current: &mut Option<DavEntry>) {
    if let Some(entry) = current.as_mut() {
        entry.is_collection = true;
    }
}

fn apply_property(entry: &mut DavEntry, tag: &str, text: String) {
    match tag {
        "href" => entry.href = text,
        "getcontenttype" => entry.content_type = Some(text),
        // Unparseable lengths fall back to "absent".
        "getcontentlength" => entry.content_length = text.trim().parse().ok(),
        "getetag" => entry.etag = Some(text.trim_matches('"').to_string()),
        "getlastmodified" => entry.last_modified = Some(text),
        _ => {}
    }
}

/// Extract the local name from a possibly-namespaced XML tag.
fn local_name(raw: &[u8]) -> String {
    let s = String::from_utf8_lossy(raw);
    match s.rfind(':') {
        Some(pos) => s[pos + 1..].to_string(),
        None => s.to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
