//! Upstream-to-client byte relay.
//!
//! The relay owns the upstream stream for as long as the client keeps
//! reading. hyper drops the response body when the client disconnects, which
//! drops the [`RelayGuard`]; an unfinished guard fires the cancellation token
//! handed to the fetcher and releases the upstream connection permit.
//!
//! A watchdog task enforces the idle timeout independently of body polling:
//! a client that stops reading (a paused `<video>`) stops hyper from polling
//! the body, and the permit must still come back.

use axum::body::Body;
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, OwnedSemaphorePermit};
use tokio_util::sync::CancellationToken;
use tubeproxy_common::Error;

use crate::upstream::ByteStream;

/// Permit shared between the guard and its watchdog; whichever ends the
/// relay first takes it.
type PermitSlot = Arc<Mutex<Option<OwnedSemaphorePermit>>>;

fn release(slot: &PermitSlot) {
    if let Ok(mut permit) = slot.lock() {
        permit.take();
    }
}

/// Lifecycle record for one relay.
pub struct RelayGuard {
    video_id: String,
    cancel: CancellationToken,
    expected: u64,
    sent: u64,
    finished: bool,
    permit: PermitSlot,
    progress: watch::Sender<u64>,
}

impl RelayGuard {
    pub fn new(
        video_id: impl Into<String>,
        cancel: CancellationToken,
        expected: u64,
        permit: Option<OwnedSemaphorePermit>,
    ) -> Self {
        let (progress, _) = watch::channel(0);
        Self {
            video_id: video_id.into(),
            cancel,
            expected,
            sent: 0,
            finished: false,
            permit: Arc::new(Mutex::new(permit)),
            progress,
        }
    }

    fn record(&mut self, bytes: usize) {
        self.sent += bytes as u64;
        self.progress.send_replace(self.sent);
    }

    fn finish(&mut self) {
        self.finished = true;
    }

    /// Cancel the relay and free its permit once `idle_timeout` passes
    /// without a chunk reaching the body.
    fn spawn_watchdog(&self, idle_timeout: Duration) {
        let mut progress = self.progress.subscribe();
        let cancel = self.cancel.clone();
        let permit = self.permit.clone();
        let video_id = self.video_id.clone();

        tokio::spawn(async move {
            loop {
                match tokio::time::timeout(idle_timeout, progress.changed()).await {
                    Ok(Ok(())) => continue,
                    // Guard dropped: relay finished or client went away
                    Ok(Err(_)) => return,
                    Err(_) => {
                        let sent = *progress.borrow();
                        tracing::warn!(
                            video_id = %video_id,
                            sent,
                            idle_secs = idle_timeout.as_secs(),
                            "Relay idle, abandoning upstream fetch"
                        );
                        cancel.cancel();
                        release(&permit);
                        return;
                    }
                }
            }
        });
    }
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(
                video_id = %self.video_id,
                sent = self.sent,
                expected = self.expected,
                "Client disconnected, aborting upstream fetch"
            );
            self.cancel.cancel();
        }
        release(&self.permit);
    }
}

struct RelayState {
    upstream: ByteStream,
    guard: RelayGuard,
}

/// Wrap an upstream stream into a response body.
///
/// Chunks are forwarded as they arrive. An upstream error, or no chunk
/// forwarded within `idle_timeout`, ends the body with an error so hyper
/// aborts the connection instead of completing a truncated response cleanly.
/// Must be called from within a tokio runtime.
pub fn relay_body(upstream: ByteStream, guard: RelayGuard, idle_timeout: Duration) -> Body {
    guard.spawn_watchdog(idle_timeout);
    let state = RelayState { upstream, guard };

    let stream = futures::stream::unfold(Some(state), |state| async move {
        let mut state = state?;
        let next = tokio::select! {
            biased;
            _ = state.guard.cancel.cancelled() => None,
            item = state.upstream.next() => Some(item),
        };

        match next {
            Some(Some(Ok(chunk))) => {
                state.guard.record(chunk.len());
                Some((Ok(chunk), Some(state)))
            }
            Some(Some(Err(e))) => {
                tracing::error!(
                    video_id = %state.guard.video_id,
                    sent = state.guard.sent,
                    error = %e,
                    "Video stream error after headers were sent"
                );
                state.guard.finish();
                Some((Err(e), None))
            }
            Some(None) => {
                let guard = &mut state.guard;
                if guard.sent < guard.expected {
                    tracing::warn!(
                        video_id = %guard.video_id,
                        sent = guard.sent,
                        expected = guard.expected,
                        "Upstream ended early"
                    );
                } else {
                    tracing::debug!(
                        video_id = %guard.video_id,
                        sent = guard.sent,
                        "Relay finished"
                    );
                }
                guard.finish();
                None
            }
            // The watchdog gave up on this relay
            None => {
                state.guard.finish();
                Some((Err(Error::upstream("Relay idle timeout")), None))
            }
        }
    });

    Body::from_stream(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::BodyExt;
    use tokio::sync::Semaphore;

    fn chunks(parts: Vec<std::result::Result<Bytes, Error>>) -> ByteStream {
        futures::stream::iter(parts).boxed()
    }

    #[tokio::test]
    async fn test_relays_all_chunks() {
        let cancel = CancellationToken::new();
        let guard = RelayGuard::new("abc", cancel.clone(), 6, None);
        let body = relay_body(
            chunks(vec![
                Ok(Bytes::from_static(b"abc")),
                Ok(Bytes::from_static(b"def")),
            ]),
            guard,
            Duration::from_secs(5),
        );

        let bytes = body.collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"abcdef");
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_upstream_error_fails_body() {
        let cancel = CancellationToken::new();
        let guard = RelayGuard::new("abc", cancel.clone(), 6, None);
        let body = relay_body(
            chunks(vec![
                Ok(Bytes::from_static(b"abc")),
                Err(Error::upstream("connection reset")),
            ]),
            guard,
            Duration::from_secs(5),
        );

        assert!(body.collect().await.is_err());
    }

    #[tokio::test]
    async fn test_drop_before_finish_cancels() {
        let cancel = CancellationToken::new();
        let guard = RelayGuard::new("abc", cancel.clone(), 6, None);
        let upstream = futures::stream::iter(vec![Ok(Bytes::from_static(b"abc"))])
            .chain(futures::stream::pending())
            .boxed();
        let mut body = relay_body(upstream, guard, Duration::from_secs(5));

        let first = body.frame().await.unwrap().unwrap();
        assert_eq!(first.into_data().unwrap(), Bytes::from_static(b"abc"));
        assert!(!cancel.is_cancelled());

        drop(body);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_permit_released_on_drop() {
        let limiter = Arc::new(Semaphore::new(1));
        let permit = limiter.clone().acquire_owned().await.unwrap();
        let guard = RelayGuard::new("abc", CancellationToken::new(), 1, Some(permit));
        assert_eq!(limiter.available_permits(), 0);

        let body = relay_body(futures::stream::pending().boxed(), guard, Duration::from_secs(5));
        drop(body);
        assert_eq!(limiter.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_unread_body_releases_permit_after_idle_timeout() {
        let limiter = Arc::new(Semaphore::new(1));
        let permit = limiter.clone().acquire_owned().await.unwrap();
        let cancel = CancellationToken::new();
        let guard = RelayGuard::new("abc", cancel.clone(), 3, Some(permit));
        let body = relay_body(
            chunks(vec![Ok(Bytes::from_static(b"abc"))]),
            guard,
            Duration::from_millis(50),
        );

        // Nobody polls the body
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(cancel.is_cancelled());
        assert_eq!(limiter.available_permits(), 1);

        // A late read sees the abandoned relay as an error
        assert!(body.collect().await.is_err());
    }

    #[tokio::test]
    async fn test_steady_chunks_keep_relay_alive() {
        let cancel = CancellationToken::new();
        let guard = RelayGuard::new("abc", cancel.clone(), 5, None);
        let upstream = futures::stream::iter(0..5u8)
            .then(|i| async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok(Bytes::from(vec![i]))
            })
            .boxed();
        let body = relay_body(upstream, guard, Duration::from_millis(100));

        let bytes = body.collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], &[0, 1, 2, 3, 4]);
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_idle_timeout_cancels_upstream() {
        let cancel = CancellationToken::new();
        let guard = RelayGuard::new("abc", cancel.clone(), 10, None);
        let body = relay_body(
            futures::stream::pending().boxed(),
            guard,
            Duration::from_millis(50),
        );

        assert!(body.collect().await.is_err());
        assert!(cancel.is_cancelled());
    }
}
