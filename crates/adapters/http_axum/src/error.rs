//! HTTP error response mapping.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use shadehub_domain::error::{NotFoundError, ShadeHubError, ValidationError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

/// Maps [`ShadeHubError`] and malformed request bodies to an HTTP response
/// with appropriate status code.
#[derive(Debug)]
pub enum ApiError {
    Domain(ShadeHubError),
    /// The JSON body could not be read or did not match the expected shape.
    Body(JsonRejection),
}

impl From<ShadeHubError> for ApiError {
    fn from(err: ShadeHubError) -> Self {
        Self::Domain(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Domain(err.into())
    }
}

impl From<NotFoundError> for ApiError {
    fn from(err: NotFoundError) -> Self {
        Self::Domain(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Domain(err @ ShadeHubError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            Self::Domain(err @ ShadeHubError::NotFound(_)) => (StatusCode::NOT_FOUND, err.to_string()),
            Self::Body(rejection) => (StatusCode::BAD_REQUEST, rejection.body_text()),
        };
        tracing::debug!(%status, error = %message, "request rejected");
        (
            status,
            Json(ErrorBody {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_map_validation_to_bad_request() {
        let response = ApiError::from(ValidationError::PositionOutOfRange(150)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn should_map_not_found_to_404() {
        let response = ApiError::from(NotFoundError {
            entity: "Device",
            id: "attic".into(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
