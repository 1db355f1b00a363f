//! Public-link sharing over the OCS Share API.
//!
//! Building the form body and reading the OCS envelope back are kept apart
//! from the client so both transports share one interpretation.

use crate::error::{RemoteFsError, RemoteFsResult};
use crate::types::{OcsResponse, ShareOptions, ShareRecord};
use serde::Deserialize;
use serde_json::Value;

/// OCS share type for a public link.
pub const SHARE_TYPE_PUBLIC_LINK: u8 = 3;

/// The `data` object of a share-creation response. Nextcloud returns `id`
/// as a string, older servers as a number.
#[derive(Debug, Deserialize)]
struct CreatedShare {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    token: Option<Value>,
    #[serde(default)]
    url: Option<String>,
}

/// Form fields for a public-link POST.
pub fn build_share_form(path: &str, options: &ShareOptions) -> Vec<(String, String)> {
    let mut form = vec![
        ("path".to_string(), share_path(path)),
        ("shareType".to_string(), SHARE_TYPE_PUBLIC_LINK.to_string()),
        (
            "permissions".to_string(),
            options.effective_permissions().0.to_string(),
        ),
    ];
    if let Some(password) = options.password.as_deref().filter(|p| !p.is_empty()) {
        form.push(("password".to_string(), password.to_string()));
    }
    if let Some(date) = options.expire_date.as_deref().filter(|d| !d.is_empty()) {
        form.push(("expireDate".to_string(), date.to_string()));
    }
    form
}

/// Share paths are user-relative with a leading slash.
fn share_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

/// Extract a `ShareRecord` from a decoded OCS body.
///
/// A body without a usable `ocs.data.url` is rejected even when the HTTP
/// status was 2xx.
pub fn share_record_from_ocs(body: &Value) -> RemoteFsResult<ShareRecord> {
    let resp: OcsResponse<Value> = serde_json::from_value(body.clone())
        .map_err(|e| RemoteFsError::invalid_response(format!("not an OCS envelope: {}", e)))?;

    let server_message = resp
        .ocs
        .meta
        .as_ref()
        .and_then(|m| m.message.clone())
        .filter(|m| !m.is_empty());

    // Failures carry `"data": []`, so only an object is read as a share.
    let data = resp
        .ocs
        .data
        .filter(Value::is_object)
        .and_then(|d| serde_json::from_value::<CreatedShare>(d).ok());
    let url = data
        .as_ref()
        .and_then(|d| d.url.clone())
        .filter(|u| !u.is_empty());

    let Some(share_url) = url else {
        let msg = match server_message {
            Some(m) => format!("share response has no url: {}", m),
            None => "share response has no url".to_string(),
        };
        return Err(RemoteFsError::invalid_response(msg));
    };

    let (id, token) = data
        .map(|d| (scalar_string(d.id), scalar_string(d.token)))
        .unwrap_or_default();

    Ok(ShareRecord {
        success: true,
        share_url,
        token,
        id,
    })
}

fn scalar_string(value: Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}
