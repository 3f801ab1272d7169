//! Tubeproxy-Common: Shared types, errors, and pure streaming logic.
//!
//! This crate holds everything the streaming proxy needs that does not touch
//! the network:
//!
//! - **Error Handling**: the request error taxonomy and its HTTP mapping
//! - **Core Types**: format descriptors and search summaries
//! - **Format Selection**: the progressive-MP4 rendition policy
//! - **Range Math**: `Range` header parsing and bounds resolution
//!
//! # Examples
//!
//! ```
//! use tubeproxy_common::range::parse_range_header;
//! use tubeproxy_common::Error;
//!
//! let spec = parse_range_header("bytes=0-999").unwrap();
//! let range = spec.resolve(1000).unwrap();
//! assert_eq!(range.len(), 1000);
//! assert_eq!(range.content_range(1000), "bytes 0-999/1000");
//!
//! let err = parse_range_header("bytes=1000-").unwrap().resolve(1000).unwrap_err();
//! assert!(matches!(err, Error::RangeNotSatisfiable { total: 1000 }));
//! ```

pub mod error;
pub mod format;
pub mod range;
pub mod types;

pub use error::{Error, Result};
pub use format::select_format;
pub use range::{parse_range_header, ByteRange, RangeSpec};
pub use types::*;
