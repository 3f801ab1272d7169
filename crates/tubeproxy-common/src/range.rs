//! HTTP `Range` header parsing and resolution against a known content size.
//!
//! Only single ranges are supported. A header listing several ranges is
//! reduced to its first one rather than rejected, which is what browsers and
//! media players seeking through a video actually send.

use crate::error::{Error, Result};

/// A parsed but not yet bounds-checked byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// `bytes=START-` or `bytes=START-END`.
    FromTo { start: u64, end: Option<u64> },
    /// `bytes=-N`: the last N bytes.
    Suffix(u64),
}

/// An inclusive, in-bounds byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

/// Parse a `Range` header value.
///
/// Returns `None` when the value is not a byte range at all; callers treat
/// that as if no header had been sent.
pub fn parse_range_header(value: &str) -> Option<RangeSpec> {
    let spec = value.trim().strip_prefix("bytes=")?;
    let first = spec.split(',').next()?.trim();
    let (start, end) = first.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());

    match (start.is_empty(), end.is_empty()) {
        (true, true) => None,
        (true, false) => Some(RangeSpec::Suffix(end.parse().ok()?)),
        (false, true) => Some(RangeSpec::FromTo {
            start: start.parse().ok()?,
            end: None,
        }),
        (false, false) => Some(RangeSpec::FromTo {
            start: start.parse().ok()?,
            end: Some(end.parse().ok()?),
        }),
    }
}

impl RangeSpec {
    /// Check the range against `total` bytes of content.
    ///
    /// An explicit end at or past the content size is unsatisfiable rather
    /// than clamped.
    pub fn resolve(self, total: u64) -> Result<ByteRange> {
        let unsatisfiable = Error::RangeNotSatisfiable { total };
        match self {
            RangeSpec::FromTo { start, end } => {
                if start >= total {
                    return Err(unsatisfiable);
                }
                let end = end.unwrap_or(total - 1);
                if end >= total || start > end {
                    return Err(unsatisfiable);
                }
                Ok(ByteRange { start, end })
            }
            RangeSpec::Suffix(len) => {
                if len == 0 || total == 0 {
                    return Err(unsatisfiable);
                }
                Ok(ByteRange {
                    start: total.saturating_sub(len),
                    end: total - 1,
                })
            }
        }
    }
}

impl ByteRange {
    /// Number of bytes covered (always at least one).
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false; a resolved range covers at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// `Content-Range` value for a 206 response.
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }

    /// `Range` value to forward upstream.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// `Content-Range` value for a 416 response.
pub fn unsatisfied_content_range(total: u64) -> String {
    format!("bytes */{total}")
}
