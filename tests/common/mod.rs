//! Shared test harness for integration tests.
//!
//! Provides in-memory fakes for the resolver, media fetcher and search
//! provider, plus [`TestHarness`] which wires them into a full
//! [`AppContext`] and router.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::Router;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use http_body_util::BodyExt;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use tubeproxy::config::Config;
use tubeproxy::resolver::{SearchProvider, VideoInfo, VideoResolver};
use tubeproxy::server::{create_router, AppContext};
use tubeproxy::upstream::{ByteStream, MediaFetcher};
use tubeproxy_common::{ByteRange, Error, FormatDescriptor, ProbeInfo, VideoSummary};

pub const MEDIA_URL: &str = "https://media.test/videoplayback?itag=18";

/// A progressive 360p MP4 rendition.
pub fn progressive_mp4(url: &str) -> FormatDescriptor {
    FormatDescriptor {
        itag: 18,
        container: "mp4".to_string(),
        has_video: true,
        has_audio: true,
        url: url.to_string(),
        height: Some(360),
        bitrate: Some(500_000),
        quality_label: Some("360p".to_string()),
        mime_type: Some("video/mp4; codecs=\"avc1.42001E, mp4a.40.2\"".to_string()),
    }
}

/// A video-only WebM rendition, never selectable.
pub fn video_only_webm() -> FormatDescriptor {
    FormatDescriptor {
        itag: 248,
        container: "webm".to_string(),
        has_video: true,
        has_audio: false,
        url: "https://media.test/videoplayback?itag=248".to_string(),
        height: Some(1080),
        bitrate: Some(2_500_000),
        quality_label: Some("1080p".to_string()),
        mime_type: Some("video/webm; codecs=\"vp9\"".to_string()),
    }
}

/// Deterministic payload of `len` bytes.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

pub enum FakeResolver {
    Ok(VideoInfo),
    Fail(String),
}

impl FakeResolver {
    pub fn with_formats(formats: Vec<FormatDescriptor>) -> Self {
        Self::Ok(VideoInfo {
            formats,
            details: json!({ "videoId": "abc123", "title": "Test Video" }),
            related: vec![json!({ "id": "rel1" })],
        })
    }
}

#[async_trait]
impl VideoResolver for FakeResolver {
    async fn resolve(&self, _video_id: &str) -> anyhow::Result<VideoInfo> {
        match self {
            FakeResolver::Ok(info) => Ok(info.clone()),
            FakeResolver::Fail(msg) => Err(anyhow::anyhow!(msg.clone())),
        }
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// How the fake body stream behaves.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    /// Serve the requested bytes in small chunks.
    Complete,
    /// Fail before any bytes are produced.
    FailToStart,
    /// Yield one chunk, then never produce another.
    StallAfterFirstChunk,
}

pub struct FakeFetcher {
    pub data: Vec<u8>,
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub mode: BodyMode,
    pub chunk_size: usize,
    pub head_calls: AtomicUsize,
    pub body_calls: AtomicUsize,
    pub last_range: Mutex<Option<ByteRange>>,
    pub last_cancel: Mutex<Option<CancellationToken>>,
}

impl FakeFetcher {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            content_length: Some(data.len() as u64),
            data,
            content_type: Some("video/mp4".to_string()),
            mode: BodyMode::Complete,
            chunk_size: 100,
            head_calls: AtomicUsize::new(0),
            body_calls: AtomicUsize::new(0),
            last_range: Mutex::new(None),
            last_cancel: Mutex::new(None),
        }
    }

    pub fn without_length(mut self) -> Self {
        self.content_length = None;
        self
    }

    pub fn with_content_type(mut self, content_type: Option<&str>) -> Self {
        self.content_type = content_type.map(str::to_owned);
        self
    }

    pub fn with_mode(mut self, mode: BodyMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }

    pub fn body_calls(&self) -> usize {
        self.body_calls.load(Ordering::SeqCst)
    }

    pub fn last_range(&self) -> Option<ByteRange> {
        *self.last_range.lock().unwrap()
    }

    pub fn last_cancel(&self) -> Option<CancellationToken> {
        self.last_cancel.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn fetch_head(&self, _url: &str) -> tubeproxy_common::Result<ProbeInfo> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ProbeInfo {
            content_length: self.content_length,
            content_type: self.content_type.clone(),
        })
    }

    async fn fetch_body(
        &self,
        _url: &str,
        range: Option<ByteRange>,
        cancel: CancellationToken,
    ) -> tubeproxy_common::Result<ByteStream> {
        self.body_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_range.lock().unwrap() = range;
        *self.last_cancel.lock().unwrap() = Some(cancel.clone());

        if self.mode == BodyMode::FailToStart {
            return Err(Error::upstream("connection reset by peer"));
        }

        let slice = match range {
            Some(r) => self.data[r.start as usize..=r.end as usize].to_vec(),
            None => self.data.clone(),
        };
        let chunks: Vec<Result<Bytes, Error>> = slice
            .chunks(self.chunk_size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();

        let stream = match self.mode {
            BodyMode::StallAfterFirstChunk => stream::iter(chunks.into_iter().take(1))
                .chain(stream::pending())
                .boxed(),
            _ => stream::iter(chunks).boxed(),
        };

        Ok(stream
            .take_until(async move { cancel.cancelled().await })
            .boxed())
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

pub enum FakeSearch {
    Results(Vec<VideoSummary>),
    Fail,
}

impl FakeSearch {
    pub fn with_count(n: usize) -> Self {
        Self::Results(
            (0..n)
                .map(|i| VideoSummary {
                    id: format!("vid{i}"),
                    title: format!("Song {i}"),
                    description: format!("Description {i}"),
                    thumbnail: format!("https://img.test/{i}.jpg"),
                    upload_date: Some("2 years ago".to_string()),
                    duration: 180 + i as u64,
                })
                .collect(),
        )
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, _query: &str) -> anyhow::Result<Vec<VideoSummary>> {
        match self {
            FakeSearch::Results(videos) => Ok(videos.clone()),
            FakeSearch::Fail => Err(anyhow::anyhow!("search backend unreachable")),
        }
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Test harness wrapping a fully-constructed [`AppContext`] and its fakes.
pub struct TestHarness {
    pub ctx: AppContext,
    pub fetcher: Arc<FakeFetcher>,
}

impl TestHarness {
    /// A video with one progressive MP4 of `len` bytes.
    pub fn with_media(len: usize) -> Self {
        Self::build(
            FakeResolver::with_formats(vec![video_only_webm(), progressive_mp4(MEDIA_URL)]),
            FakeFetcher::new(payload(len)),
            FakeSearch::with_count(25),
            Config::default(),
        )
    }

    pub fn build(
        resolver: FakeResolver,
        fetcher: FakeFetcher,
        search: FakeSearch,
        config: Config,
    ) -> Self {
        let fetcher = Arc::new(fetcher);
        let ctx = AppContext::new(
            config,
            Arc::new(resolver),
            fetcher.clone(),
            Arc::new(search),
        );
        Self { ctx, fetcher }
    }

    pub fn router(&self) -> Router {
        create_router(self.ctx.clone(), None)
    }

    /// Start an Axum server on a random port.
    pub async fn serve(&self) -> SocketAddr {
        let app = self.router();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        addr
    }
}

pub async fn body_bytes(body: Body) -> Vec<u8> {
    body.collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(body: Body) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(body).await).unwrap()
}
