use crate::server::error::AppError;
use crate::server::AppContext;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tubeproxy_common::{select_format, Error, VideoSummary};

pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(search))
        .route("/info", get(info))
        .route("/related", get(info))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

/// One page of search results.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub page: usize,
    pub limit: usize,
    pub total_results: usize,
    pub total_pages: usize,
    pub results: Vec<VideoSummary>,
}

/// Slice `videos` into 1-based page `page` of `limit` entries.
pub fn paginate(videos: Vec<VideoSummary>, page: usize, limit: usize) -> SearchPage {
    let total_results = videos.len();
    let start = (page - 1).saturating_mul(limit);
    let results = videos.into_iter().skip(start).take(limit).collect();

    SearchPage {
        page,
        limit,
        total_results,
        total_pages: total_results.div_ceil(limit),
        results,
    }
}

fn parse_positive(value: Option<&str>, default: usize) -> Result<usize, Error> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| Error::invalid_request("Page and limit must be positive integers")),
    }
}

async fn search(
    State(ctx): State<AppContext>,
    params: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<SearchPage>, AppError> {
    let Query(params) = params.map_err(|rejection| {
        tracing::debug!(%rejection, "Rejected /search query string");
        Error::invalid_request("Query (q) is required")
    })?;

    let query = params
        .q
        .filter(|q| !q.is_empty())
        .ok_or_else(|| Error::invalid_request("Query (q) is required"))?;

    let search_config = &ctx.config.search;
    let page = parse_positive(params.page.as_deref(), 1)?;
    let limit = parse_positive(params.limit.as_deref(), search_config.default_limit)?
        .min(search_config.max_limit);

    let videos = ctx
        .search
        .search(&query)
        .await
        .map_err(|e| Error::internal(format!("Search failed for {query:?}: {e:#}")))?;

    if videos.is_empty() {
        return Err(Error::not_found("No videos found for the given query").into());
    }

    tracing::debug!(query = %query, found = videos.len(), page, limit, "Search completed");

    Ok(Json(paginate(videos, page, limit)))
}

#[derive(Deserialize)]
struct InfoQuery {
    id: Option<String>,
}

/// GET /info and GET /related: details, related videos, and renditions.
async fn info(
    State(ctx): State<AppContext>,
    params: Result<Query<InfoQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(params) = params.map_err(|rejection| {
        tracing::debug!(%rejection, "Rejected /info query string");
        Error::missing_video_id()
    })?;

    let video_id = params
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(Error::missing_video_id)?;

    let info = ctx
        .resolver
        .resolve(&video_id)
        .await
        .map_err(|e| Error::internal(format!("Failed to resolve {video_id}: {e:#}")))?;

    if info.details.is_null() {
        return Err(Error::not_found("Video details not found for the given ID").into());
    }

    let best_format = select_format(&info.formats).cloned();

    Ok(Json(json!({
        "videoDetails": info.details,
        "related_videos": info.related,
        "formats": info.formats,
        "bestFormat": best_format,
    })))
}
