//! Video metadata and search collaborators.
//!
//! Both are external services. The server only needs the small surface
//! defined here: a resolver that lists renditions for a video id, and a
//! search provider that turns a query into video summaries.

mod youtube;

pub use youtube::{YoutubeResolver, YoutubeSearch};

use async_trait::async_trait;
use serde_json::Value;
use tubeproxy_common::{FormatDescriptor, VideoSummary};

/// Everything the resolver knows about one video.
#[derive(Debug, Clone, Default)]
pub struct VideoInfo {
    /// Available renditions, in the resolver's order.
    pub formats: Vec<FormatDescriptor>,
    /// Opaque video details passed through to `/info` (`Null` if unknown).
    pub details: Value,
    /// Opaque related-video list passed through to `/info`.
    pub related: Vec<Value>,
}

/// Resolves a video id to its renditions.
#[async_trait]
pub trait VideoResolver: Send + Sync {
    async fn resolve(&self, video_id: &str) -> anyhow::Result<VideoInfo>;
}

/// Free-text video search.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> anyhow::Result<Vec<VideoSummary>>;
}
