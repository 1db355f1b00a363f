//! # SortOfRemote NG – Remote Files
//!
//! Client for a personal cloud file store reached over WebDAV and the OCS
//! Share API:
//!
//! - **Listing & metadata** — PROPFIND, multistatus parsing, one canonical item model
//! - **Transfers** — PUT with a per-upload progress stream, GET
//! - **Items** — MKCOL, DELETE, MOVE, COPY
//! - **Sharing** — public-link creation (OCS `shareType=3`)
//! - **Transports** — `reqwest`-backed HTTP and an in-memory tree
//! - **Relay** — CORS contract for an optional browser-facing proxy
//!
//! ```no_run
//! use sorng_remote_files::{ClientConfig, RemoteFsClient};
//!
//! # async fn demo() -> sorng_remote_files::RemoteFsResult<()> {
//! let client = RemoteFsClient::with_http(ClientConfig::new(
//!     "https://cloud.example.com",
//!     "alice",
//!     "app-password",
//! ));
//! for item in client.list_directory("/Documents").await? {
//!     println!("{} {}", item.path, item.size);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod config;
pub mod types;
pub mod multistatus;
pub mod normalize;
pub mod progress;
pub mod transport;
pub mod share;
pub mod relay;
pub mod client;

pub use client::RemoteFsClient;
pub use config::ClientConfig;
pub use error::{RemoteFsError, RemoteFsErrorKind, RemoteFsResult};
pub use progress::{progress_channel, ProgressSink, ProgressStream, UploadEvent};
pub use relay::RelayPolicy;
pub use transport::{DavTransport, HttpTransport, MemoryTransport, UploadContent};
pub use types::{
    ItemType, OperationResult, PropfindDepth, RemoteItem, ShareOptions, SharePermissions,
    ShareRecord, UploadResult,
};
