use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::{AppError, ErrorKind};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, message) = match kind {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, self.to_string()),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ErrorKind::Precondition => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            ErrorKind::Storage => {
                tracing::error!(error = %self, "Storage failure while serving request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                AppError::from(ValidationError::InvalidSort("title".to_string())),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::user_not_found("7"), StatusCode::NOT_FOUND),
            (
                AppError::InsufficientShelf {
                    required: 5,
                    found: 1,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::Storage(sqlx::Error::PoolTimedOut),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
