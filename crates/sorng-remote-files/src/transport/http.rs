// ──────────────────────────────────────────────────────────────────────────────
// sorng-remote-files · transport::http
// ──────────────────────────────────────────────────────────────────────────────
// reqwest-backed transport covering:
//  • WebDAV requests (PROPFIND, PUT, GET, MKCOL, DELETE, MOVE, COPY)
//  • OCS share creation (form POST, JSON response)
//  • Streamed upload bodies with byte-progress reporting
// No retries: every request is sent exactly once.
// ──────────────────────────────────────────────────────────────────────────────

use super::{DavTransport, UploadContent};
use crate::config::ClientConfig;
use crate::error::{ensure_success, RemoteFsError, RemoteFsResult};
use crate::multistatus::PROPFIND_BODY;
use crate::progress::ProgressSink;
use crate::types::{DavPayload, PropfindDepth};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use log::debug;
use reqwest::{header, Body, Client, Method, RequestBuilder, Response};

/// Size of the slices a buffered upload is streamed in.
const UPLOAD_CHUNK: usize = 64 * 1024;

/// WebDAV/OCS transport over HTTP(S).
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self { http: Client::new() }
    }

    /// Use a pre-built client (proxy, TLS roots, timeouts are the caller's call).
    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    fn request(&self, config: &ClientConfig, method: Method, url: &str) -> RequestBuilder {
        debug!("{} {}", method, url);
        self.http
            .request(method, url)
            .header(header::AUTHORIZATION, config.auth_header())
    }

    /// Send once and reject non-2xx statuses.
    ///
    /// The error's `status_text` is the canonical reason phrase for the code.
    /// A custom phrase on the server's status line is not kept.
    async fn send(&self, req: RequestBuilder) -> RemoteFsResult<Response> {
        let resp = req.send().await?;
        let status = resp.status();
        ensure_success(status.as_u16(), status.canonical_reason().unwrap_or(""))?;
        Ok(resp)
    }

    async fn propfind(
        &self,
        config: &ClientConfig,
        path: &str,
        depth: Option<PropfindDepth>,
    ) -> RemoteFsResult<DavPayload> {
        let url = config.dav_url(path);
        let mut req = self
            .request(config, dav_method(b"PROPFIND")?, &url)
            .header(header::CONTENT_TYPE, "application/xml; charset=utf-8")
            .body(PROPFIND_BODY);
        if let Some(d) = depth {
            req = req.header("Depth", d.as_str());
        }

        let resp = self.send(req).await?;
        let text = resp.text().await?;
        Ok(DavPayload::Multistatus(text))
    }

    async fn transfer(
        &self,
        config: &ClientConfig,
        method: &'static [u8],
        from: &str,
        to: &str,
        overwrite: bool,
    ) -> RemoteFsResult<()> {
        let req = self
            .request(config, dav_method(method)?, &config.dav_url(from))
            .header("Destination", config.dav_url(to))
            .header("Overwrite", if overwrite { "T" } else { "F" });
        self.send(req).await.map(|_| ())
    }
}

#[async_trait]
impl DavTransport for HttpTransport {
    async fn list_raw(
        &self,
        config: &ClientConfig,
        path: &str,
        depth: Option<PropfindDepth>,
    ) -> RemoteFsResult<DavPayload> {
        self.propfind(config, path, depth).await
    }

    async fn stat_raw(&self, config: &ClientConfig, path: &str) -> RemoteFsResult<DavPayload> {
        self.propfind(config, path, Some(PropfindDepth::Zero)).await
    }

    async fn put_raw(
        &self,
        config: &ClientConfig,
        path: &str,
        content: UploadContent,
        progress: ProgressSink,
    ) -> RemoteFsResult<()> {
        let url = config.dav_url(path);
        let length = content.length();
        let mut req = self
            .request(config, Method::PUT, &url)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(progress_body(content, progress));
        if let Some(len) = length {
            req = req.header(header::CONTENT_LENGTH, len);
        }
        self.send(req).await.map(|_| ())
    }

    async fn get_raw(&self, config: &ClientConfig, path: &str) -> RemoteFsResult<Bytes> {
        let req = self.request(config, Method::GET, &config.dav_url(path));
        let resp = self.send(req).await?;
        Ok(resp.bytes().await?)
    }

    async fn mkcol_raw(&self, config: &ClientConfig, path: &str) -> RemoteFsResult<()> {
        let req = self.request(config, dav_method(b"MKCOL")?, &config.dav_url(path));
        self.send(req).await.map(|_| ())
    }

    async fn delete_raw(&self, config: &ClientConfig, path: &str) -> RemoteFsResult<()> {
        let req = self.request(config, Method::DELETE, &config.dav_url(path));
        self.send(req).await.map(|_| ())
    }

    async fn move_raw(
        &self,
        config: &ClientConfig,
        from: &str,
        to: &str,
        overwrite: bool,
    ) -> RemoteFsResult<()> {
        self.transfer(config, b"MOVE", from, to, overwrite).await
    }

    async fn copy_raw(
        &self,
        config: &ClientConfig,
        from: &str,
        to: &str,
        overwrite: bool,
    ) -> RemoteFsResult<()> {
        self.transfer(config, b"COPY", from, to, overwrite).await
    }

    async fn share_raw(
        &self,
        config: &ClientConfig,
        form: &[(String, String)],
    ) -> RemoteFsResult<serde_json::Value> {
        let req = self
            .request(config, Method::POST, &config.shares_url())
            .header("OCS-APIRequest", "true")
            .header(header::ACCEPT, "application/json")
            .form(form);
        let resp = self.send(req).await?;
        let text = resp.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            RemoteFsError::parse(format!(
                "OCS JSON parse error: {}; body: {}",
                e,
                truncate(&text, 500)
            ))
        })
    }
}

// ── Free-standing helpers ────────────────────────────────────────────────────

fn dav_method(name: &'static [u8]) -> RemoteFsResult<Method> {
    Method::from_bytes(name)
        .map_err(|e| RemoteFsError::network(format!("invalid HTTP method: {}", e)))
}

/// Wrap upload content in a streaming body that reports bytes as the
/// connection pulls them.
fn progress_body(content: UploadContent, progress: ProgressSink) -> Body {
    match content {
        UploadContent::Bytes(data) => {
            let total = data.len() as u64;
            let mut sent = 0u64;
            let chunks = stream::iter(split_chunks(data)).map(move |chunk| {
                sent += chunk.len() as u64;
                progress.report(sent, total);
                Ok::<Bytes, std::io::Error>(chunk)
            });
            Body::wrap_stream(chunks)
        }
        UploadContent::Stream { body, length } => {
            let total = length.unwrap_or(0);
            let mut sent = 0u64;
            let chunks = body.map(move |chunk| {
                chunk.map(|bytes| {
                    sent += bytes.len() as u64;
                    progress.report(sent, total);
                    bytes
                })
            });
            Body::wrap_stream(chunks)
        }
    }
}

fn split_chunks(data: Bytes) -> Vec<Bytes> {
    (0..data.len())
        .step_by(UPLOAD_CHUNK)
        .map(|start| data.slice(start..(start + UPLOAD_CHUNK).min(data.len())))
        .collect()
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteFsErrorKind;
    use crate::progress::progress_channel;
    use wiremock::matchers::{body_string, header as header_eq, method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    const MULTISTATUS: &str = r#"<d:multistatus xmlns:d="DAV:"><d:response><d:href>/remote.php/dav/files/alice/a.txt</d:href></d:response></d:multistatus>"#;

    fn config_for(server: &MockServer) -> ClientConfig {
        ClientConfig::new(&server.uri(), "alice", "secret")
    }

    async fn only_request(server: &MockServer) -> Request {
        let mut received = server.received_requests().await.unwrap();
        assert_eq!(received.len(), 1, "expected exactly one request");
        received.remove(0)
    }

    #[test]
    fn split_chunks_covers_all_bytes() {
        let data = Bytes::from(vec![7u8; UPLOAD_CHUNK * 2 + 10]);
        let chunks = split_chunks(data);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 10);
        assert!(split_chunks(Bytes::new()).is_empty());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("ääää", 2), "ää");
        assert_eq!(truncate("ab", 5), "ab");
    }

    #[tokio::test]
    async fn propfind_sends_auth_and_depth() {
        let server = MockServer::start().await;
        Mock::given(method("PROPFIND"))
            .and(path("/remote.php/dav/files/alice/a.txt"))
            .and(header_eq("Depth", "0"))
            .and(header_eq("Authorization", "Basic YWxpY2U6c2VjcmV0"))
            .respond_with(ResponseTemplate::new(207).set_body_string(MULTISTATUS))
            .expect(1)
            .mount(&server)
            .await;

        let payload = HttpTransport::new()
            .stat_raw(&config_for(&server), "/a.txt")
            .await
            .unwrap();
        assert_eq!(payload, DavPayload::Multistatus(MULTISTATUS.to_string()));

        let request = only_request(&server).await;
        let body = String::from_utf8_lossy(&request.body);
        assert!(body.contains("<d:getcontentlength/>"));
    }

    #[tokio::test]
    async fn listing_leaves_depth_to_server() {
        let server = MockServer::start().await;
        Mock::given(method("PROPFIND"))
            .and(path("/remote.php/dav/files/alice/Projects"))
            .respond_with(
                ResponseTemplate::new(207).set_body_string(r#"<d:multistatus xmlns:d="DAV:"/>"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        HttpTransport::new()
            .list_raw(&config_for(&server), "/Projects", None)
            .await
            .unwrap();

        let request = only_request(&server).await;
        assert!(request.headers.get("depth").is_none());
    }

    #[tokio::test]
    async fn non_success_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/remote.php/dav/files/alice/missing.txt"))
            .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
            .expect(1)
            .mount(&server)
            .await;

        let err = HttpTransport::new()
            .get_raw(&config_for(&server), "/missing.txt")
            .await
            .unwrap_err();
        assert_eq!(err.kind, RemoteFsErrorKind::TransportError);
        assert_eq!(err.status, Some(404));
        assert_eq!(err.message, "HTTP 404: Not Found");
    }

    #[tokio::test]
    async fn put_streams_body_with_progress() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/remote.php/dav/files/alice/big.bin"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        let data = vec![b'x'; UPLOAD_CHUNK * 3];
        let (sink, _events) = progress_channel();

        HttpTransport::new()
            .put_raw(
                &config_for(&server),
                "/big.bin",
                UploadContent::from(data.clone()),
                sink.clone(),
            )
            .await
            .unwrap();

        assert_eq!(sink.last_percent(), Some(100));
        let request = only_request(&server).await;
        let expected_len = data.len().to_string();
        assert_eq!(
            request.headers.get("content-length").and_then(|v| v.to_str().ok()),
            Some(expected_len.as_str())
        );
        assert_eq!(request.body, data);
    }

    #[tokio::test]
    async fn put_unknown_length_stream_is_chunked() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/remote.php/dav/files/alice/pipe.log"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        let parts: Vec<std::io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"first line\n")),
            Ok(Bytes::from_static(b"second line\n")),
            Ok(Bytes::from_static(b"third line\n")),
        ];
        let (sink, _events) = progress_channel();

        HttpTransport::new()
            .put_raw(
                &config_for(&server),
                "/pipe.log",
                UploadContent::stream(Box::pin(stream::iter(parts)), None),
                sink.clone(),
            )
            .await
            .unwrap();

        // No total, so no percentage is ever derived.
        assert_eq!(sink.last_percent(), None);
        let request = only_request(&server).await;
        assert!(request.headers.get("content-length").is_none());
        assert_eq!(
            request
                .headers
                .get("transfer-encoding")
                .and_then(|v| v.to_str().ok()),
            Some("chunked")
        );
        assert_eq!(request.body, b"first line\nsecond line\nthird line\n".to_vec());
    }

    #[tokio::test]
    async fn put_insufficient_storage() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(507))
            .expect(1)
            .mount(&server)
            .await;
        let (sink, _events) = progress_channel();

        let err = HttpTransport::new()
            .put_raw(
                &config_for(&server),
                "/big.bin",
                UploadContent::from(b"abc".to_vec()),
                sink,
            )
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(507));
        assert_eq!(err.status_text.as_deref(), Some("Insufficient Storage"));
    }

    #[tokio::test]
    async fn share_posts_ocs_form() {
        let server = MockServer::start().await;
        let body = r#"{"ocs":{"meta":{"status":"ok","statuscode":200},"data":{"id":"5","token":"tok","url":"https://nc.test/s/tok"}}}"#;
        Mock::given(method("POST"))
            .and(path("/ocs/v2.php/apps/files_sharing/api/v1/shares"))
            .and(query_param("format", "json"))
            .and(header_eq("OCS-APIRequest", "true"))
            .and(header_eq("Content-Type", "application/x-www-form-urlencoded"))
            .and(body_string("path=%2Fdoc.pdf&shareType=3"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
            .expect(1)
            .mount(&server)
            .await;
        let form = vec![
            ("path".to_string(), "/doc.pdf".to_string()),
            ("shareType".to_string(), "3".to_string()),
        ];

        let json = HttpTransport::new()
            .share_raw(&config_for(&server), &form)
            .await
            .unwrap();
        assert_eq!(json["ocs"]["data"]["token"], "tok");
    }

    #[tokio::test]
    async fn share_non_json_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html/>", "text/html"))
            .mount(&server)
            .await;

        let err = HttpTransport::new()
            .share_raw(&config_for(&server), &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind, RemoteFsErrorKind::ParseError);
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let config = ClientConfig::new(&base, "alice", "secret");

        let err = HttpTransport::new().mkcol_raw(&config, "/dir").await.unwrap_err();
        assert_eq!(err.kind, RemoteFsErrorKind::NetworkError);
    }

    #[tokio::test]
    async fn upload_events_unaffected_without_listener() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        let (sink, events) = progress_channel();
        drop(events);

        HttpTransport::new()
            .put_raw(&config_for(&server), "/f", UploadContent::from(b"z".to_vec()), sink.clone())
            .await
            .unwrap();
        assert_eq!(sink.last_percent(), Some(100));
    }
}
