//! Media streaming module.
//!
//! Proxies YouTube renditions to the player with HTTP range support.
//!
//! # Routes
//!
//! - `GET /stream?id={video_id}` - Full body (200) or, with a `Range` header,
//!   a single byte range (206)

mod proxy;
mod relay;

pub use proxy::{StreamProxy, StreamRequest, DEFAULT_CONTENT_TYPE};
pub use relay::{relay_body, RelayGuard};

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::server::error::AppError;
use crate::server::AppContext;
use tubeproxy_common::Error;

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    id: Option<String>,
}

/// GET /stream?id=...
pub async fn stream(
    State(ctx): State<AppContext>,
    query: Result<Query<StreamQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    // Duplicate or malformed parameters leave no usable id
    let Query(query) = query.map_err(|rejection| {
        tracing::debug!(%rejection, "Rejected /stream query string");
        Error::missing_video_id()
    })?;

    let range_header = headers
        .get(header::RANGE)
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned);

    let response = ctx
        .stream_proxy
        .handle(StreamRequest {
            video_id: query.id,
            range_header,
        })
        .await?;

    Ok(response)
}

/// Create the streaming router.
pub fn stream_router() -> Router<AppContext> {
    Router::new().route("/stream", get(stream))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_router_creation() {
        let _router: Router<AppContext> = stream_router();
    }
}
