//! Maps the error taxonomy onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::LibraryError;

/// Wrapper so service errors flow out of handlers with `?`.
///
/// Not-found conditions map to 404, invalid arguments to 400 with the
/// offending field attached as `param`, conflicts to 409, everything else to
/// 500.
pub struct ApiError(LibraryError);

impl From<LibraryError> for ApiError {
    fn from(err: LibraryError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, param) = match &self.0 {
            LibraryError::InvalidArgument { field, .. } => (StatusCode::BAD_REQUEST, Some(*field)),
            LibraryError::NotFound { .. } => (StatusCode::NOT_FOUND, None),
            LibraryError::Conflict(_) => (StatusCode::CONFLICT, None),
            _ => {
                tracing::error!(error = %self.0, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        };

        let mut body = serde_json::json!({ "error": self.0.to_string() });
        if let Some(param) = param {
            body["param"] = param.into();
        }
        (status, Json(body)).into_response()
    }
}
