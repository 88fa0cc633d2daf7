use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use contentlib::keys::KeyError;
use contentlib::LibraryError;
use serde_json::json;
use tracing::error;

/// Library errors rendered as JSON with the status from the shared error taxonomy.
#[derive(Debug)]
pub struct ApiError(pub LibraryError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<LibraryError> for ApiError {
    fn from(err: LibraryError) -> Self {
        ApiError(err)
    }
}

impl From<KeyError> for ApiError {
    fn from(err: KeyError) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if !self.0.is_client_error() {
            error!("Request failed: {}", self.0);
        }

        let body = Json(json!({
            "error": self.0.error_code(),
            "message": self.0.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statuses_follow_error_kind() {
        let cases = [
            (
                LibraryError::not_found("component", "lb:Axim:Demo:problem:q1"),
                StatusCode::NOT_FOUND,
            ),
            (LibraryError::PermissionDenied("nope".into()), StatusCode::FORBIDDEN),
            (LibraryError::AlreadyExists("dup".into()), StatusCode::CONFLICT),
            (LibraryError::InvalidPath("..".into()), StatusCode::BAD_REQUEST),
            (LibraryError::QuotaExceeded("big".into()), StatusCode::PAYLOAD_TOO_LARGE),
            (LibraryError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_key_errors_render_as_not_found() {
        let key_err = "lib:".parse::<contentlib::keys::LibraryKey>().unwrap_err();
        let response = ApiError::from(key_err).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
