//! YouTube-backed resolver and search provider via `rusty_ytdl`.

use super::{SearchProvider, VideoInfo, VideoResolver};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusty_ytdl::search::{SearchOptions, SearchResult, SearchType, YouTube};
use rusty_ytdl::{Video, VideoFormat};
use tubeproxy_common::{FormatDescriptor, VideoSummary};

/// How many results to request per search; pagination happens locally.
const SEARCH_RESULT_LIMIT: u64 = 50;

#[derive(Debug, Clone, Default)]
pub struct YoutubeResolver;

impl YoutubeResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl VideoResolver for YoutubeResolver {
    async fn resolve(&self, video_id: &str) -> Result<VideoInfo> {
        let video = Video::new(video_id)
            .with_context(|| format!("Invalid video id: {video_id}"))?;
        let info = video
            .get_info()
            .await
            .with_context(|| format!("Failed to fetch video info for {video_id}"))?;

        let formats = info.formats.iter().map(to_descriptor).collect();
        let details = serde_json::to_value(&info.video_details)
            .context("Failed to serialize video details")?;
        let related = info
            .related_videos
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to serialize related videos")?;

        Ok(VideoInfo {
            formats,
            details,
            related,
        })
    }
}

fn to_descriptor(format: &VideoFormat) -> FormatDescriptor {
    FormatDescriptor {
        itag: format.itag,
        container: format.mime_type.container.clone(),
        has_video: format.has_video,
        has_audio: format.has_audio,
        url: format.url.clone(),
        height: format.height,
        bitrate: Some(format.bitrate),
        quality_label: format.quality_label.clone(),
        mime_type: Some(format.mime_type.mime.to_string()),
    }
}

pub struct YoutubeSearch {
    client: YouTube,
}

impl YoutubeSearch {
    pub fn new() -> Result<Self> {
        let client = YouTube::new().context("Failed to create YouTube search client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SearchProvider for YoutubeSearch {
    async fn search(&self, query: &str) -> Result<Vec<VideoSummary>> {
        let options = SearchOptions {
            limit: SEARCH_RESULT_LIMIT,
            search_type: SearchType::Video,
            safe_search: false,
        };

        let results = self
            .client
            .search(query, Some(&options))
            .await
            .with_context(|| format!("YouTube search failed for {query:?}"))?;

        let videos = results
            .into_iter()
            .filter_map(|result| match result {
                SearchResult::Video(video) => Some(VideoSummary {
                    thumbnail: video
                        .thumbnails
                        .iter()
                        .max_by_key(|t| t.width)
                        .map(|t| t.url.clone())
                        .unwrap_or_default(),
                    id: video.id,
                    title: video.title,
                    description: video.description,
                    upload_date: video.uploaded_at,
                    // rusty_ytdl reports milliseconds
                    duration: video.duration / 1000,
                }),
                _ => None,
            })
            .collect();

        Ok(videos)
    }
}
