// ──────────────────────────────────────────────────────────────────────────────
// sorng-remote-files · client
// ──────────────────────────────────────────────────────────────────────────────
// Caller-facing facade over a `DavTransport`:
//  • Configuration gate (fails fast before any request)
//  • Listing / metadata through the single normalisation routine
//  • Upload with a per-call progress channel, download, mkcol, delete
//  • MOVE / COPY and public-link sharing
// ──────────────────────────────────────────────────────────────────────────────

use crate::config::ClientConfig;
use crate::error::{RemoteFsError, RemoteFsErrorKind, RemoteFsResult};
use crate::normalize::{normalize_listing, normalize_single};
use crate::progress::ProgressSink;
use crate::share::{build_share_form, share_record_from_ocs};
use crate::transport::{DavTransport, HttpTransport, UploadContent};
use crate::types::{OperationResult, PropfindDepth, RemoteItem, ShareOptions, ShareRecord, UploadResult};
use bytes::Bytes;
use log::{debug, warn};
use std::fmt;
use std::sync::Arc;

/// Remote files client.
///
/// Cheap to clone; clones share the transport. The config is replaced
/// wholesale by [`configure`](Self::configure) and never mutated in place.
#[derive(Clone)]
pub struct RemoteFsClient {
    config: ClientConfig,
    transport: Arc<dyn DavTransport>,
}

impl fmt::Debug for RemoteFsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteFsClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RemoteFsClient {
    // ── Constructors ─────────────────────────────────────────────────────

    pub fn new(config: ClientConfig, transport: Arc<dyn DavTransport>) -> Self {
        Self { config, transport }
    }

    /// Client speaking WebDAV/OCS over a default `reqwest` client.
    pub fn with_http(config: ClientConfig) -> Self {
        Self::new(config, Arc::new(HttpTransport::new()))
    }

    // ── Configuration ────────────────────────────────────────────────────

    /// Replace the credentials. No request is made.
    pub fn configure(&mut self, server_url: &str, username: &str, secret: &str) {
        self.config = ClientConfig::new(server_url, username, secret);
        debug!(
            "remote files client configured for {} as {}",
            self.config.server_url(),
            self.config.username()
        );
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    pub fn auth_header(&self) -> String {
        self.config.auth_header()
    }

    fn ready(&self) -> RemoteFsResult<&ClientConfig> {
        if self.config.is_configured() {
            Ok(&self.config)
        } else {
            Err(RemoteFsError::not_configured())
        }
    }

    // ── Listing & metadata ───────────────────────────────────────────────

    /// Children of a collection. The server picks the depth.
    pub async fn list_directory(&self, path: &str) -> RemoteFsResult<Vec<RemoteItem>> {
        self.list(path, None).await
    }

    /// Children of a collection with an explicit `Depth` header.
    pub async fn list_directory_with_depth(
        &self,
        path: &str,
        depth: PropfindDepth,
    ) -> RemoteFsResult<Vec<RemoteItem>> {
        self.list(path, Some(depth)).await
    }

    async fn list(&self, path: &str, depth: Option<PropfindDepth>) -> RemoteFsResult<Vec<RemoteItem>> {
        let path = or_root(path);
        let config = self.ready().map_err(|e| failed("list_directory", path, e))?;
        let payload = self
            .transport
            .list_raw(config, path, depth)
            .await
            .map_err(|e| failed("list_directory", path, e))?;
        let items = normalize_listing(payload, &config.dav_root_path())
            .map_err(|e| failed("list_directory", path, e))?;
        debug!("listed {} entries under {}", items.len(), path);
        Ok(items)
    }

    /// Metadata for a single file or collection.
    pub async fn get_item_info(&self, path: &str) -> RemoteFsResult<RemoteItem> {
        let path = or_root(path);
        let config = self.ready().map_err(|e| failed("get_item_info", path, e))?;
        let payload = self
            .transport
            .stat_raw(config, path)
            .await
            .map_err(|e| failed("get_item_info", path, missing_as_not_found(e)))?;
        normalize_single(payload, &config.dav_root_path(), path)
            .map_err(|e| failed("get_item_info", path, e))
    }

    // ── Transfers ────────────────────────────────────────────────────────

    /// Write `content` to `path`, replacing any existing file.
    ///
    /// When a sink is given it receives non-decreasing percentages (only if
    /// the content length is known) and then exactly one `Completed` or
    /// `Failed`.
    pub async fn upload_file(
        &self,
        path: &str,
        content: impl Into<UploadContent>,
        progress: Option<ProgressSink>,
    ) -> RemoteFsResult<UploadResult> {
        let sink = progress.unwrap_or_default();
        let content = content.into();

        let config = match self.ready() {
            Ok(config) => config,
            Err(e) => {
                sink.fail(&e);
                return Err(failed("upload_file", path, e));
            }
        };

        debug!("uploading {:?} to {}", content, path);
        match self
            .transport
            .put_raw(config, path, content, sink.clone())
            .await
        {
            Ok(()) => {
                sink.complete();
                Ok(OperationResult::at(path))
            }
            Err(e) => {
                sink.fail(&e);
                Err(failed("upload_file", path, e))
            }
        }
    }

    pub async fn download_file(&self, path: &str) -> RemoteFsResult<Bytes> {
        let config = self.ready().map_err(|e| failed("download_file", path, e))?;
        let data = self
            .transport
            .get_raw(config, path)
            .await
            .map_err(|e| failed("download_file", path, e))?;
        debug!("downloaded {} bytes from {}", data.len(), path);
        Ok(data)
    }

    // ── Collections & items ──────────────────────────────────────────────

    /// MKCOL. An existing path is reported by the server, not ignored.
    pub async fn create_directory(&self, path: &str) -> RemoteFsResult<OperationResult> {
        let config = self.ready().map_err(|e| failed("create_directory", path, e))?;
        self.transport
            .mkcol_raw(config, path)
            .await
            .map_err(|e| failed("create_directory", path, e))?;
        Ok(OperationResult::at(path))
    }

    pub async fn delete_item(&self, path: &str) -> RemoteFsResult<OperationResult> {
        let config = self.ready().map_err(|e| failed("delete_item", path, e))?;
        self.transport
            .delete_raw(config, path)
            .await
            .map_err(|e| failed("delete_item", path, e))?;
        Ok(OperationResult::done())
    }

    /// MOVE `from` to `to`. Without `overwrite` an existing target fails.
    pub async fn move_item(
        &self,
        from: &str,
        to: &str,
        overwrite: bool,
    ) -> RemoteFsResult<OperationResult> {
        let config = self.ready().map_err(|e| failed("move_item", from, e))?;
        self.transport
            .move_raw(config, from, to, overwrite)
            .await
            .map_err(|e| failed("move_item", from, e))?;
        Ok(OperationResult::at(to))
    }

    pub async fn copy_item(
        &self,
        from: &str,
        to: &str,
        overwrite: bool,
    ) -> RemoteFsResult<OperationResult> {
        let config = self.ready().map_err(|e| failed("copy_item", from, e))?;
        self.transport
            .copy_raw(config, from, to, overwrite)
            .await
            .map_err(|e| failed("copy_item", from, e))?;
        Ok(OperationResult::at(to))
    }

    // ── Sharing ──────────────────────────────────────────────────────────

    /// Create a public link. Succeeds only when the server returns a URL.
    pub async fn create_share_link(
        &self,
        path: &str,
        options: ShareOptions,
    ) -> RemoteFsResult<ShareRecord> {
        let config = self.ready().map_err(|e| failed("create_share_link", path, e))?;
        let form = build_share_form(path, &options);
        let body = self
            .transport
            .share_raw(config, &form)
            .await
            .map_err(|e| failed("create_share_link", path, e))?;
        let record =
            share_record_from_ocs(&body).map_err(|e| failed("create_share_link", path, e))?;
        debug!("public link {} created for {}", record.id, path);
        Ok(record)
    }
}

fn or_root(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

/// A 404 on a single-item lookup means the item is gone, not a transport fault.
fn missing_as_not_found(err: RemoteFsError) -> RemoteFsError {
    if err.status == Some(404) {
        RemoteFsError {
            kind: RemoteFsErrorKind::NotFound,
            ..err
        }
    } else {
        err
    }
}

fn failed(op: &str, path: &str, err: RemoteFsError) -> RemoteFsError {
    warn!("{} {} failed: {}", op, path, err);
    err
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{progress_channel, UploadEvent};
    use crate::transport::MemoryTransport;
    use crate::types::ItemType;
    use futures::StreamExt;

    fn client() -> RemoteFsClient {
        RemoteFsClient::new(
            ClientConfig::new("https://nc.test/", "alice", "pw"),
            Arc::new(MemoryTransport::new()),
        )
    }

    #[test]
    fn configure_replaces_credentials() {
        let mut c = RemoteFsClient::new(ClientConfig::default(), Arc::new(MemoryTransport::new()));
        assert!(!c.is_configured());
        c.configure(" https://cloud.example.com/ ", "bob", "tok");
        assert!(c.is_configured());
        assert_eq!(c.config().server_url(), "https://cloud.example.com");
        assert_eq!(c.auth_header(), "Basic Ym9iOnRvaw==");
    }

    #[test]
    fn debug_hides_secret() {
        let rendered = format!("{:?}", client());
        assert!(!rendered.contains("\"pw\""));
    }

    #[tokio::test]
    async fn unconfigured_fails_fast() {
        let c = RemoteFsClient::new(ClientConfig::default(), Arc::new(MemoryTransport::new()));
        let err = c.list_directory("/").await.unwrap_err();
        assert_eq!(err.kind, RemoteFsErrorKind::NotConfigured);
        let err = c.create_share_link("/x", ShareOptions::default()).await.unwrap_err();
        assert_eq!(err.kind, RemoteFsErrorKind::NotConfigured);
    }

    #[tokio::test]
    async fn unconfigured_upload_settles_progress() {
        let c = RemoteFsClient::new(ClientConfig::default(), Arc::new(MemoryTransport::new()));
        let (sink, stream) = progress_channel();
        assert!(c.upload_file("/a.txt", "x".to_string(), Some(sink)).await.is_err());
        let events: Vec<UploadEvent> = stream.collect().await;
        assert!(matches!(events.as_slice(), [UploadEvent::Failed(e)] if e.kind == RemoteFsErrorKind::NotConfigured));
    }

    #[tokio::test]
    async fn empty_path_lists_root() {
        let c = client();
        c.create_directory("/Docs").await.unwrap();
        let items = c.list_directory("").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].path, "/Docs");
        assert_eq!(items[0].item_type, ItemType::Directory);
    }

    #[tokio::test]
    async fn explicit_depth_limits_listing() {
        let c = client();
        c.create_directory("/A").await.unwrap();
        c.create_directory("/A/B").await.unwrap();
        c.upload_file("/A/B/c.txt", b"c".to_vec(), None).await.unwrap();

        assert_eq!(c.list_directory("/A").await.unwrap().len(), 2);
        let direct = c
            .list_directory_with_depth("/A", PropfindDepth::One)
            .await
            .unwrap();
        assert_eq!(direct.len(), 1);
        assert_eq!(direct[0].name, "B");
    }

    #[tokio::test]
    async fn move_returns_destination() {
        let c = client();
        c.upload_file("/a.txt", b"a".to_vec(), None).await.unwrap();
        let ack = c.move_item("/a.txt", "/b.txt", false).await.unwrap();
        assert_eq!(ack, OperationResult::at("/b.txt"));
        assert!(c.get_item_info("/a.txt").await.unwrap_err().is_not_found());
        assert_eq!(c.download_file("/b.txt").await.unwrap(), "a");
    }

    #[tokio::test]
    async fn copy_keeps_source() {
        let c = client();
        c.upload_file("/a.txt", b"a".to_vec(), None).await.unwrap();
        c.copy_item("/a.txt", "/b.txt", false).await.unwrap();
        assert_eq!(c.download_file("/a.txt").await.unwrap(), "a");
        assert_eq!(c.download_file("/b.txt").await.unwrap(), "a");
    }

    #[tokio::test]
    async fn mkcol_twice_surfaces_status() {
        let c = client();
        c.create_directory("/A").await.unwrap();
        let err = c.create_directory("/A").await.unwrap_err();
        assert_eq!(err.kind, RemoteFsErrorKind::TransportError);
        assert_eq!(err.status, Some(405));
    }

    #[tokio::test]
    async fn share_link_uses_server_url() {
        let c = client();
        c.upload_file("/doc.pdf", b"%PDF".to_vec(), None).await.unwrap();
        let rec = c
            .create_share_link("/doc.pdf", ShareOptions::read_only())
            .await
            .unwrap();
        assert!(rec.share_url.starts_with("https://nc.test/s/"));
        assert!(rec.share_url.ends_with(&rec.token));
        assert_eq!(rec.download_url(), format!("{}/download", rec.share_url));
    }
}
