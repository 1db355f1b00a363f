//! Transport adapters.
//!
//! A transport turns one request into either raw server output (multistatus
//! XML, bytes, decoded OCS JSON) or a typed failure. It never builds
//! `RemoteItem`s itself; that is `normalize`'s job.
//!
//! Two adapters ship with the crate: [`HttpTransport`] speaks WebDAV/OCS over
//! `reqwest`, [`MemoryTransport`] keeps an in-process tree and returns
//! pre-parsed entries.

mod http;
mod memory;

pub use http::HttpTransport;
pub use memory::MemoryTransport;

use crate::config::ClientConfig;
use crate::error::{RemoteFsError, RemoteFsResult};
use crate::progress::ProgressSink;
use crate::types::{DavPayload, PropfindDepth};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::TryStreamExt;
use std::fmt;

/// Request body for an upload.
pub enum UploadContent {
    /// Fully buffered content; length is always known.
    Bytes(Bytes),
    /// Streamed content. Progress is reported only when `length` is given.
    Stream {
        body: BoxStream<'static, std::io::Result<Bytes>>,
        length: Option<u64>,
    },
}

impl UploadContent {
    pub fn stream(
        body: BoxStream<'static, std::io::Result<Bytes>>,
        length: Option<u64>,
    ) -> Self {
        Self::Stream { body, length }
    }

    /// Total byte length when it is known up front.
    pub fn length(&self) -> Option<u64> {
        match self {
            Self::Bytes(b) => Some(b.len() as u64),
            Self::Stream { length, .. } => *length,
        }
    }

    /// Drain the content into memory.
    pub async fn into_bytes(self) -> RemoteFsResult<Bytes> {
        match self {
            Self::Bytes(b) => Ok(b),
            Self::Stream { body, .. } => {
                let buf = body
                    .try_fold(BytesMut::new(), |mut acc, chunk| async move {
                        acc.extend_from_slice(&chunk);
                        Ok::<_, std::io::Error>(acc)
                    })
                    .await
                    .map_err(|e| RemoteFsError::network(format!("upload body: {}", e)))?;
                Ok(buf.freeze())
            }
        }
    }
}

impl fmt::Debug for UploadContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Self::Stream { length, .. } => {
                f.debug_struct("Stream").field("length", length).finish()
            }
        }
    }
}

impl From<Bytes> for UploadContent {
    fn from(b: Bytes) -> Self {
        Self::Bytes(b)
    }
}

impl From<Vec<u8>> for UploadContent {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(v))
    }
}

impl From<&'static [u8]> for UploadContent {
    fn from(v: &'static [u8]) -> Self {
        Self::Bytes(Bytes::from_static(v))
    }
}

impl From<String> for UploadContent {
    fn from(s: String) -> Self {
        Self::Bytes(Bytes::from(s))
    }
}

/// The capability set the client needs from a WebDAV + OCS backend.
///
/// Every method receives the current config so URLs and credentials are
/// derived per call. Non-success statuses must come back as
/// `TransportError`, connection failures as `NetworkError`.
#[async_trait]
pub trait DavTransport: Send + Sync {
    /// PROPFIND on a collection. `None` leaves the depth to the server.
    async fn list_raw(
        &self,
        config: &ClientConfig,
        path: &str,
        depth: Option<PropfindDepth>,
    ) -> RemoteFsResult<DavPayload>;

    /// PROPFIND `Depth: 0` on a single resource.
    async fn stat_raw(&self, config: &ClientConfig, path: &str) -> RemoteFsResult<DavPayload>;

    /// Content-replacing write. Byte progress goes to `progress`; settling the
    /// channel is left to the caller.
    async fn put_raw(
        &self,
        config: &ClientConfig,
        path: &str,
        content: UploadContent,
        progress: ProgressSink,
    ) -> RemoteFsResult<()>;

    async fn get_raw(&self, config: &ClientConfig, path: &str) -> RemoteFsResult<Bytes>;

    async fn mkcol_raw(&self, config: &ClientConfig, path: &str) -> RemoteFsResult<()>;

    async fn delete_raw(&self, config: &ClientConfig, path: &str) -> RemoteFsResult<()>;

    async fn move_raw(
        &self,
        config: &ClientConfig,
        from: &str,
        to: &str,
        overwrite: bool,
    ) -> RemoteFsResult<()>;

    async fn copy_raw(
        &self,
        config: &ClientConfig,
        from: &str,
        to: &str,
        overwrite: bool,
    ) -> RemoteFsResult<()>;

    /// Form POST to the share-creation endpoint; returns the decoded JSON body.
    async fn share_raw(
        &self,
        config: &ClientConfig,
        form: &[(String, String)],
    ) -> RemoteFsResult<serde_json::Value>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn stream_content_collects() {
        let chunks: Vec<std::io::Result<Bytes>> =
            vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cd"))];
        let content = UploadContent::stream(Box::pin(stream::iter(chunks)), None);
        assert_eq!(content.length(), None);
        assert_eq!(content.into_bytes().await.unwrap(), Bytes::from_static(b"abcd"));
    }

    #[tokio::test]
    async fn stream_error_is_network_error() {
        let chunks: Vec<std::io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"ab")),
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone")),
        ];
        let content = UploadContent::stream(Box::pin(stream::iter(chunks)), Some(4));
        let err = content.into_bytes().await.unwrap_err();
        assert_eq!(err.kind, crate::error::RemoteFsErrorKind::NetworkError);
    }

    #[test]
    fn bytes_content_length() {
        let content = UploadContent::from(b"hello".to_vec());
        assert_eq!(content.length(), Some(5));
    }
}
