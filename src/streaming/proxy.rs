//! Range-aware streaming proxy for YouTube renditions.
//!
//! A request flows through: resolve metadata, select a progressive MP4,
//! probe its size, then relay either the whole body (200) or one byte range
//! (206). The probe always completes before the payload fetch starts, and the
//! payload is never buffered.

use axum::body::Body;
use axum::http::{header, response::Builder, HeaderValue, StatusCode};
use axum::response::Response;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tubeproxy_common::{
    parse_range_header, select_format, ByteRange, Error, FormatDescriptor, Result,
};

use super::relay::{relay_body, RelayGuard};
use crate::config::UpstreamConfig;
use crate::resolver::VideoResolver;
use crate::upstream::MediaFetcher;

/// Used when the probe does not report a type.
pub const DEFAULT_CONTENT_TYPE: &str = "video/mp4";

const CACHE_CONTROL: &str = "public, max-age=31536000";

/// Inputs of one `/stream` request.
#[derive(Debug, Clone, Default)]
pub struct StreamRequest {
    pub video_id: Option<String>,
    pub range_header: Option<String>,
}

/// What the probe and selection established about the media.
struct MediaTarget {
    video_id: String,
    url: String,
    total: u64,
    content_type: String,
    permit: OwnedSemaphorePermit,
}

#[derive(Clone)]
pub struct StreamProxy {
    resolver: Arc<dyn VideoResolver>,
    fetcher: Arc<dyn MediaFetcher>,
    limiter: Arc<Semaphore>,
    acquire_timeout: Duration,
    idle_timeout: Duration,
}

impl StreamProxy {
    pub fn new(
        resolver: Arc<dyn VideoResolver>,
        fetcher: Arc<dyn MediaFetcher>,
        config: &UpstreamConfig,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            limiter: Arc::new(Semaphore::new(config.max_connections)),
            acquire_timeout: config.acquire_timeout(),
            idle_timeout: config.idle_timeout(),
        }
    }

    /// Upstream connection slots currently free.
    pub fn available_connections(&self) -> usize {
        self.limiter.available_permits()
    }

    pub async fn handle(&self, request: StreamRequest) -> Result<Response> {
        let video_id = request
            .video_id
            .filter(|id| !id.is_empty())
            .ok_or_else(Error::missing_video_id)?;

        let format = self.select(&video_id).await?;
        tracing::debug!(video_id = %video_id, format = %format, "Selected rendition");

        let target = self.probe(video_id, format).await?;

        match request.range_header.as_deref().and_then(parse_range_header) {
            None => self.stream_full(target).await,
            Some(spec) => {
                let range = spec.resolve(target.total)?;
                self.stream_range(target, range).await
            }
        }
    }

    async fn select(&self, video_id: &str) -> Result<FormatDescriptor> {
        let info = self.resolver.resolve(video_id).await.map_err(|e| {
            let detail = format!("{e:#}");
            tracing::warn!(video_id = %video_id, error = %detail, "Metadata resolution failed");
            Error::metadata_unavailable(detail)
        })?;

        if info.formats.is_empty() {
            return Err(Error::metadata_unavailable(format!(
                "Resolver returned no formats for {video_id}"
            )));
        }

        select_format(&info.formats)
            .cloned()
            .ok_or(Error::NoSuitableFormat)
    }

    async fn probe(&self, video_id: String, format: FormatDescriptor) -> Result<MediaTarget> {
        let acquire = self.limiter.clone().acquire_owned();
        let permit = tokio::time::timeout(self.acquire_timeout, acquire)
            .await
            .map_err(|_| {
                tracing::warn!(
                    video_id = %video_id,
                    wait_secs = self.acquire_timeout.as_secs(),
                    "No upstream connection slot freed up"
                );
                Error::Busy
            })?
            .map_err(|_| Error::internal("Upstream connection limiter closed"))?;

        let probe = self.fetcher.fetch_head(&format.url).await?;
        let total = probe.content_length.ok_or(Error::SizeUnknown)?;

        Ok(MediaTarget {
            video_id,
            url: format.url,
            total,
            content_type: probe
                .content_type
                .filter(|ct| HeaderValue::from_str(ct).is_ok())
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            permit,
        })
    }

    async fn stream_full(&self, target: MediaTarget) -> Result<Response> {
        let cancel = CancellationToken::new();
        let upstream = self
            .fetcher
            .fetch_body(&target.url, None, cancel.clone())
            .await
            .map_err(|e| payload_failed(&target.video_id, e))?;

        let response = media_headers(StatusCode::OK, &target.content_type, target.total);
        let guard = RelayGuard::new(target.video_id, cancel, target.total, Some(target.permit));

        finish(response, relay_body(upstream, guard, self.idle_timeout))
    }

    async fn stream_range(&self, target: MediaTarget, range: ByteRange) -> Result<Response> {
        let cancel = CancellationToken::new();
        let upstream = self
            .fetcher
            .fetch_body(&target.url, Some(range), cancel.clone())
            .await
            .map_err(|e| payload_failed(&target.video_id, e))?;

        let response = media_headers(StatusCode::PARTIAL_CONTENT, &target.content_type, range.len())
            .header(header::CONTENT_RANGE, range.content_range(target.total));
        let guard = RelayGuard::new(target.video_id, cancel, range.len(), Some(target.permit));

        finish(response, relay_body(upstream, guard, self.idle_timeout))
    }
}

/// Any failure to start the payload transfer surfaces as a stream error.
fn payload_failed(video_id: &str, err: Error) -> Error {
    tracing::error!(video_id = %video_id, error = %err, "Payload fetch failed");
    match err {
        Error::UpstreamStream(_) => err,
        other => Error::upstream(other.to_string()),
    }
}

/// Headers shared by full and partial responses.
fn media_headers(status: StatusCode, content_type: &str, content_length: u64) -> Builder {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CACHE_CONTROL, CACHE_CONTROL)
        .header(header::CONNECTION, "keep-alive")
        .header(header::CONTENT_DISPOSITION, "inline")
        .header(header::CONTENT_LENGTH, content_length)
}

fn finish(builder: Builder, body: Body) -> Result<Response> {
    builder
        .body(body)
        .map_err(|e| Error::internal(format!("Failed to build stream response: {e}")))
}
