//! Error taxonomy for stream, search, and info requests.
//!
//! Every failure a request can hit is funnelled into [`Error`]. The HTTP
//! layer derives the status from [`Error::http_status`] and the wire body from
//! [`Error::public_message`]; the `Display` text carries internal detail and is
//! only ever logged.

/// Common error type for tubeproxy.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Client input was missing or malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The metadata resolver failed or returned no formats.
    #[error("Metadata unavailable: {0}")]
    MetadataUnavailable(String),

    /// No progressive MP4 rendition (video + audio) exists.
    #[error("No suitable format found for streaming")]
    NoSuitableFormat,

    /// The upstream probe did not report a usable content length.
    #[error("Unable to determine content length")]
    SizeUnknown,

    /// The requested byte range lies outside the content.
    #[error("Requested range not satisfiable (total {total} bytes)")]
    RangeNotSatisfiable {
        /// Total content size in bytes, echoed in `Content-Range: bytes */N`.
        total: u64,
    },

    /// The upstream payload fetch failed before any bytes were relayed.
    #[error("Upstream stream error: {0}")]
    UpstreamStream(String),

    /// Every upstream connection slot stayed taken for the whole wait.
    #[error("All upstream connections busy")]
    Busy,

    /// A lookup produced no results. The message is shown to the client.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Anything else. Detail is logged, never sent to the client.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidRequest(_) => 400,
            Error::MetadataUnavailable(_) => 404,
            Error::NoSuitableFormat => 400,
            Error::SizeUnknown => 500,
            Error::RangeNotSatisfiable { .. } => 416,
            Error::UpstreamStream(_) => 500,
            Error::Busy => 503,
            Error::NotFound(_) => 404,
            Error::Internal(_) => 500,
        }
    }

    /// The exact message placed in the `{"error": ...}` response body.
    pub fn public_message(&self) -> String {
        match self {
            Error::InvalidRequest(msg) | Error::NotFound(msg) => msg.clone(),
            Error::MetadataUnavailable(_) => "Video formats not found".to_string(),
            Error::NoSuitableFormat => "No suitable format found for streaming".to_string(),
            Error::SizeUnknown => "Unable to determine content length".to_string(),
            Error::RangeNotSatisfiable { .. } => "Requested range not satisfiable".to_string(),
            Error::UpstreamStream(_) => "Failed to stream video".to_string(),
            Error::Busy => "Too many active streams, try again later".to_string(),
            Error::Internal(_) => "Internal Server Error".to_string(),
        }
    }

    /// Create a new InvalidRequest error.
    pub fn invalid_request<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a new MetadataUnavailable error.
    pub fn metadata_unavailable<S: Into<String>>(detail: S) -> Self {
        Self::MetadataUnavailable(detail.into())
    }

    /// Create a new UpstreamStream error.
    pub fn upstream<S: Into<String>>(detail: S) -> Self {
        Self::UpstreamStream(detail.into())
    }

    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(detail: S) -> Self {
        Self::Internal(detail.into())
    }

    /// The error raised when a request carries no video id.
    pub fn missing_video_id() -> Self {
        Self::invalid_request("Video ID (id) is required")
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
