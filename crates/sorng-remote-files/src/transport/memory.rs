// ──────────────────────────────────────────────────────────────────────────────
// sorng-remote-files · transport::memory
// ──────────────────────────────────────────────────────────────────────────────
// In-process transport holding a file tree:
//  • Returns pre-parsed `DavEntry` lists (the structured result shape)
//  • Mirrors WebDAV status codes (404, 405, 409, 412, 507)
//  • Optional byte quota to exercise storage-full uploads
//  • Public-link shares with generated tokens
// ──────────────────────────────────────────────────────────────────────────────

use super::{DavTransport, UploadContent};
use crate::config::{encode_dav_path, ClientConfig};
use crate::error::{RemoteFsError, RemoteFsResult};
use crate::progress::ProgressSink;
use crate::types::{DavEntry, DavPayload, PropfindDepth};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use futures::StreamExt;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Simulated wire chunk used for progress reporting.
const CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone)]
enum Node {
    Dir {
        modified: String,
        etag: String,
    },
    File {
        data: Bytes,
        mime: String,
        modified: String,
        etag: String,
    },
}

impl Node {
    fn dir() -> Self {
        Node::Dir {
            modified: http_date(),
            etag: new_etag(),
        }
    }

    fn is_dir(&self) -> bool {
        matches!(self, Node::Dir { .. })
    }

    fn size(&self) -> u64 {
        match self {
            Node::Dir { .. } => 0,
            Node::File { data, .. } => data.len() as u64,
        }
    }
}

#[derive(Debug)]
struct MemoryState {
    nodes: BTreeMap<String, Node>,
    next_share_id: u64,
}

impl Default for MemoryState {
    fn default() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::dir());
        Self {
            nodes,
            next_share_id: 1,
        }
    }
}

/// File tree kept in memory, shared by every clone of the client using it.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    state: Mutex<MemoryState>,
    quota: Option<u64>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject uploads that would push total file bytes past `bytes` with 507.
    pub fn with_quota(bytes: u64) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::default()
        }
    }

    /// Total bytes held in files.
    pub fn used_bytes(&self) -> u64 {
        self.lock().nodes.values().map(Node::size).sum()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn entries(
        &self,
        config: &ClientConfig,
        path: &str,
        depth: Option<PropfindDepth>,
    ) -> RemoteFsResult<DavPayload> {
        let key = clean_path(path);
        let state = self.lock();
        let node = state.nodes.get(&key).ok_or_else(not_found)?;

        let mut entries = vec![dav_entry(config, &key, node)];
        if node.is_dir() && depth != Some(PropfindDepth::Zero) {
            let direct_only = depth == Some(PropfindDepth::One);
            entries.extend(
                descendants(&state.nodes, &key)
                    .filter(|(child, _)| !direct_only || is_direct_child(&key, child))
                    .map(|(child, node)| dav_entry(config, child, node)),
            );
        }
        Ok(DavPayload::Entries(entries))
    }
}

#[async_trait]
impl DavTransport for MemoryTransport {
    async fn list_raw(
        &self,
        config: &ClientConfig,
        path: &str,
        depth: Option<PropfindDepth>,
    ) -> RemoteFsResult<DavPayload> {
        self.entries(config, path, depth)
    }

    async fn stat_raw(&self, config: &ClientConfig, path: &str) -> RemoteFsResult<DavPayload> {
        self.entries(config, path, Some(PropfindDepth::Zero))
    }

    async fn put_raw(
        &self,
        _config: &ClientConfig,
        path: &str,
        content: UploadContent,
        progress: ProgressSink,
    ) -> RemoteFsResult<()> {
        let key = clean_path(path);
        {
            let state = self.lock();
            check_parent(&state.nodes, &key)?;
            if state.nodes.get(&key).is_some_and(Node::is_dir) {
                return Err(RemoteFsError::from_status(405, "Method Not Allowed"));
            }
        }

        let data = receive(content, &progress).await?;

        let mut state = self.lock();
        // The tree may have changed while the body was streaming in.
        check_parent(&state.nodes, &key)?;
        if let Some(quota) = self.quota {
            let used: u64 = state.nodes.values().map(Node::size).sum();
            let replaced = state.nodes.get(&key).map_or(0, Node::size);
            if used - replaced + data.len() as u64 > quota {
                return Err(RemoteFsError::from_status(507, "Insufficient Storage"));
            }
        }
        let mime = mime_guess::from_path(&key)
            .first_or_octet_stream()
            .to_string();
        state.nodes.insert(
            key,
            Node::File {
                data,
                mime,
                modified: http_date(),
                etag: new_etag(),
            },
        );
        Ok(())
    }

    async fn get_raw(&self, _config: &ClientConfig, path: &str) -> RemoteFsResult<Bytes> {
        let state = self.lock();
        match state.nodes.get(&clean_path(path)) {
            Some(Node::File { data, .. }) => Ok(data.clone()),
            Some(Node::Dir { .. }) => Err(RemoteFsError::from_status(405, "Method Not Allowed")),
            None => Err(not_found()),
        }
    }

    async fn mkcol_raw(&self, _config: &ClientConfig, path: &str) -> RemoteFsResult<()> {
        let key = clean_path(path);
        let mut state = self.lock();
        if state.nodes.contains_key(&key) {
            return Err(RemoteFsError::from_status(405, "Method Not Allowed"));
        }
        check_parent(&state.nodes, &key)?;
        state.nodes.insert(key, Node::dir());
        Ok(())
    }

    async fn delete_raw(&self, _config: &ClientConfig, path: &str) -> RemoteFsResult<()> {
        let key = clean_path(path);
        if key == "/" {
            return Err(RemoteFsError::from_status(403, "Forbidden"));
        }
        let mut state = self.lock();
        if state.nodes.remove(&key).is_none() {
            return Err(not_found());
        }
        remove_tree(&mut state.nodes, &key);
        Ok(())
    }

    async fn move_raw(
        &self,
        _config: &ClientConfig,
        from: &str,
        to: &str,
        overwrite: bool,
    ) -> RemoteFsResult<()> {
        let mut state = self.lock();
        let (src, dst) = prepare_transfer(&mut state.nodes, from, to, overwrite)?;
        for (path, node) in subtree(&state.nodes, &src) {
            state.nodes.remove(&path);
            state.nodes.insert(rebase(&path, &src, &dst), node);
        }
        Ok(())
    }

    async fn copy_raw(
        &self,
        _config: &ClientConfig,
        from: &str,
        to: &str,
        overwrite: bool,
    ) -> RemoteFsResult<()> {
        let mut state = self.lock();
        let (src, dst) = prepare_transfer(&mut state.nodes, from, to, overwrite)?;
        for (path, node) in subtree(&state.nodes, &src) {
            state.nodes.insert(rebase(&path, &src, &dst), node);
        }
        Ok(())
    }

    async fn share_raw(
        &self,
        config: &ClientConfig,
        form: &[(String, String)],
    ) -> RemoteFsResult<serde_json::Value> {
        let field = |name: &str| {
            form.iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };
        let path = clean_path(field("path").unwrap_or_default());
        if field("shareType") != Some("3") {
            return Err(RemoteFsError::from_status(400, "Bad Request"));
        }

        let mut state = self.lock();
        let node = state.nodes.get(&path).ok_or_else(not_found)?;
        let item_type = if node.is_dir() { "folder" } else { "file" };
        let id = state.next_share_id;
        state.next_share_id += 1;

        let token: String = Uuid::new_v4().simple().to_string().chars().take(15).collect();
        let permissions: u32 = field("permissions")
            .and_then(|p| p.parse().ok())
            .unwrap_or(1);
        Ok(json!({
            "ocs": {
                "meta": { "status": "ok", "statuscode": 200, "message": "OK" },
                "data": {
                    "id": id.to_string(),
                    "share_type": 3,
                    "permissions": permissions,
                    "uid_owner": config.username(),
                    "path": path,
                    "item_type": item_type,
                    "token": token,
                    "url": format!("{}/s/{}", config.server_url(), token),
                    "expiration": field("expireDate"),
                    "password": field("password").map(|_| "***"),
                }
            }
        }))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn not_found() -> RemoteFsError {
    RemoteFsError::from_status(404, "Not Found")
}

fn http_date() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn new_etag() -> String {
    Uuid::new_v4().simple().to_string()
}

/// `/a//b/` → `/a/b`; empty → `/`.
fn clean_path(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", parts.join("/"))
}

fn parent_of(key: &str) -> String {
    match key.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(pos) => key[..pos].to_string(),
    }
}

fn check_parent(nodes: &BTreeMap<String, Node>, key: &str) -> RemoteFsResult<()> {
    match nodes.get(&parent_of(key)) {
        Some(node) if node.is_dir() => Ok(()),
        _ => Err(RemoteFsError::from_status(409, "Conflict")),
    }
}

fn child_prefix(key: &str) -> String {
    if key == "/" {
        "/".to_string()
    } else {
        format!("{}/", key)
    }
}

fn descendants<'a>(
    nodes: &'a BTreeMap<String, Node>,
    key: &str,
) -> impl Iterator<Item = (&'a String, &'a Node)> {
    let prefix = child_prefix(key);
    let own = key.to_string();
    nodes
        .range(prefix.clone()..)
        .take_while(move |(k, _)| k.starts_with(&prefix))
        .filter(move |(k, _)| **k != own)
}

fn is_direct_child(parent: &str, child: &str) -> bool {
    !child[child_prefix(parent).len()..].contains('/')
}

/// The node at `key` and everything below it, cloned.
fn subtree(nodes: &BTreeMap<String, Node>, key: &str) -> Vec<(String, Node)> {
    let mut out = Vec::new();
    if let Some(node) = nodes.get(key) {
        out.push((key.to_string(), node.clone()));
    }
    out.extend(descendants(nodes, key).map(|(k, n)| (k.clone(), n.clone())));
    out
}

fn remove_tree(nodes: &mut BTreeMap<String, Node>, key: &str) {
    let doomed: Vec<String> = descendants(nodes, key).map(|(k, _)| k.clone()).collect();
    for k in doomed {
        nodes.remove(&k);
    }
}

fn rebase(path: &str, src: &str, dst: &str) -> String {
    format!("{}{}", dst, &path[src.len()..])
}

/// Validate a MOVE/COPY and clear an overwritten destination.
fn prepare_transfer(
    nodes: &mut BTreeMap<String, Node>,
    from: &str,
    to: &str,
    overwrite: bool,
) -> RemoteFsResult<(String, String)> {
    let src = clean_path(from);
    let dst = clean_path(to);
    if !nodes.contains_key(&src) {
        return Err(not_found());
    }
    if src == "/" || dst == src || dst.starts_with(&child_prefix(&src)) {
        return Err(RemoteFsError::from_status(403, "Forbidden"));
    }
    check_parent(nodes, &dst)?;
    if nodes.contains_key(&dst) {
        if !overwrite {
            return Err(RemoteFsError::from_status(412, "Precondition Failed"));
        }
        nodes.remove(&dst);
        remove_tree(nodes, &dst);
    }
    Ok((src, dst))
}

fn dav_entry(config: &ClientConfig, key: &str, node: &Node) -> DavEntry {
    let encoded = encode_dav_path(key);
    match node {
        Node::Dir { modified, etag } => DavEntry {
            href: if encoded.is_empty() {
                format!("{}/", config.dav_root_path())
            } else {
                format!("{}/{}/", config.dav_root_path(), encoded)
            },
            is_collection: true,
            content_length: None,
            content_type: None,
            last_modified: Some(modified.clone()),
            etag: Some(etag.clone()),
        },
        Node::File {
            data,
            mime,
            modified,
            etag,
        } => DavEntry {
            href: format!("{}/{}", config.dav_root_path(), encoded),
            is_collection: false,
            content_length: Some(data.len() as u64),
            content_type: Some(mime.clone()),
            last_modified: Some(modified.clone()),
            etag: Some(etag.clone()),
        },
    }
}

/// Drain the upload body, reporting progress per simulated wire chunk.
async fn receive(content: UploadContent, progress: &ProgressSink) -> RemoteFsResult<Bytes> {
    match content {
        UploadContent::Bytes(data) => {
            let total = data.len() as u64;
            let mut sent = 0u64;
            while sent < total {
                sent = (sent + CHUNK as u64).min(total);
                progress.report(sent, total);
                tokio::task::yield_now().await;
            }
            Ok(data)
        }
        UploadContent::Stream { mut body, length } => {
            let total = length.unwrap_or(0);
            let mut buf = BytesMut::new();
            while let Some(chunk) = body.next().await {
                let chunk =
                    chunk.map_err(|e| RemoteFsError::network(format!("upload body: {}", e)))?;
                buf.extend_from_slice(&chunk);
                progress.report(buf.len() as u64, total);
            }
            Ok(buf.freeze())
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
