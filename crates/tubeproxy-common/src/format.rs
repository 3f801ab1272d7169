//! Rendition selection.
//!
//! The player only handles progressive MP4, so selection never falls back to
//! audio-only or video-only streams even when nothing else is on offer.

use crate::types::FormatDescriptor;

/// YouTube's 360p progressive MP4 (H.264 + AAC). Almost always present and
/// the most reliable rendition to proxy.
pub const PREFERRED_ITAG: u64 = 18;

/// Pick the rendition to stream.
///
/// 1. itag [`PREFERRED_ITAG`] if it is a progressive MP4.
/// 2. Otherwise the highest-ranked progressive MP4 by `(height, bitrate)`.
///    Ties keep the earliest candidate.
/// 3. Otherwise `None`.
pub fn select_format(formats: &[FormatDescriptor]) -> Option<&FormatDescriptor> {
    if let Some(preferred) = formats
        .iter()
        .find(|f| f.itag == PREFERRED_ITAG && f.is_progressive_mp4())
    {
        return Some(preferred);
    }

    formats
        .iter()
        .filter(|f| f.is_progressive_mp4())
        .reduce(|best, candidate| {
            if quality_rank(candidate) > quality_rank(best) {
                candidate
            } else {
                best
            }
        })
}

fn quality_rank(format: &FormatDescriptor) -> (u64, u64) {
    (format.height.unwrap_or(0), format.bitrate.unwrap_or(0))
}
