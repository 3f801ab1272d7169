//! Core type definitions for renditions, probes, and search results.
//!
//! Field names serialize in camelCase to match what the player frontend
//! reads from `/info` and `/search`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One encoded rendition of a video as reported by the metadata resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatDescriptor {
    /// Platform format identifier (YouTube "itag").
    pub itag: u64,
    /// Container name, e.g. `mp4` or `webm`.
    pub container: String,
    /// Whether the rendition carries a video track.
    pub has_video: bool,
    /// Whether the rendition carries an audio track.
    pub has_audio: bool,
    /// Direct URL of the media on the upstream host.
    pub url: String,
    /// Nominal frame height in pixels.
    #[serde(default)]
    pub height: Option<u64>,
    /// Nominal bitrate in bits per second.
    #[serde(default)]
    pub bitrate: Option<u64>,
    /// Human label such as `360p`.
    #[serde(default)]
    pub quality_label: Option<String>,
    /// Full MIME type including codecs.
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl FormatDescriptor {
    /// True for a multiplexed MP4 with both audio and video.
    pub fn is_progressive_mp4(&self) -> bool {
        self.container.eq_ignore_ascii_case("mp4") && self.has_video && self.has_audio
    }
}

impl fmt::Display for FormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "itag {} ({}", self.itag, self.container)?;
        if let Some(ref label) = self.quality_label {
            write!(f, " {label}")?;
        }
        let tracks = match (self.has_video, self.has_audio) {
            (true, true) => "video+audio",
            (true, false) => "video only",
            (false, true) => "audio only",
            (false, false) => "no tracks",
        };
        write!(f, ", {tracks})")
    }
}

/// Size and type learned from a header-only upstream request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeInfo {
    /// Total content length in bytes, if the upstream reported one.
    pub content_length: Option<u64>,
    /// Upstream `Content-Type`, if any.
    pub content_type: Option<String>,
}

/// A single video in a search result list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    /// Relative upload date as shown by YouTube ("3 years ago").
    pub upload_date: Option<String>,
    /// Duration in whole seconds.
    pub duration: u64,
}
