//! Outbound media fetching.
//!
//! The stream proxy talks to the media host only through [`MediaFetcher`], so
//! how connections are routed (direct, through an HTTP proxy, or faked in
//! tests) is decided where the fetcher is built.

mod http;

pub use http::HttpFetcher;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;
use tubeproxy_common::{ByteRange, Error, ProbeInfo, Result};

/// Upstream payload as it arrives, chunk by chunk.
pub type ByteStream = BoxStream<'static, std::result::Result<Bytes, Error>>;

#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Header-only request for size and type.
    async fn fetch_head(&self, url: &str) -> Result<ProbeInfo>;

    /// Start the payload transfer, optionally restricted to `range`.
    ///
    /// `cancel` fires when the client that asked for these bytes goes away;
    /// implementations must stop pulling from the network once it does.
    async fn fetch_body(
        &self,
        url: &str,
        range: Option<ByteRange>,
        cancel: CancellationToken,
    ) -> Result<ByteStream>;
}
