//! Maps `scholarly_core::Error` onto HTTP status codes (§7: "each error
//! member maps onto..."). Grounded on the teacher's `llmspell-web` pattern
//! of a thin `IntoResponse` wrapper around the core error type — no
//! business logic, just a status/code/body mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use scholarly_core::error::Error;
use serde_json::json;

pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::UnknownTool(_) | Error::Configuration(_) => StatusCode::BAD_REQUEST,
            Error::Cancelled => StatusCode::BAD_REQUEST,
            Error::EmbeddingUnavailable(_) | Error::IndexUnavailable(_) | Error::Store(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Error::Tool { .. } | Error::Provider { .. } | Error::SchemaParse(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(json!({
            "error": self.0.to_string(),
            "code": self.0.code(),
        }));
        (status, body).into_response()
    }
}
