//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`tubeproxy_common::Error`] so that route
//! handlers can return `Result<T, AppError>` and use `?` on any request error.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tubeproxy_common::range::unsatisfied_content_range;
use tubeproxy_common::Error;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError(Error);

impl AppError {
    pub fn new(inner: Error) -> Self {
        Self(inner)
    }
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.0,
                "Server error in request handler"
            );
        } else {
            tracing::debug!(status = %status, error = %self.0, "Request rejected");
        }

        let body = json!({ "error": self.0.public_message() });
        let mut response = (status, axum::Json(body)).into_response();

        if let Error::RangeNotSatisfiable { total } = self.0 {
            if let Ok(value) = HeaderValue::try_from(unsatisfied_content_range(total)) {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
        }

        response
    }
}
