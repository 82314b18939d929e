use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use bragger_core::ServiceError;

pub type AppSuccess = GenericResponse;

/// Success envelope: `{"success": true, "message": ..., "data": ...}`. The
/// status code travels on the wire, not in the body.
#[derive(Debug, Clone)]
pub struct GenericResponse {
    pub status: StatusCode,
    pub message: String,
    pub data: serde_json::Value,
}

impl GenericResponse {
    pub fn new(status: StatusCode, message: &str, data: serde_json::Value) -> Self {
        Self {
            status,
            message: message.to_string(),
            data,
        }
    }
}

impl IntoResponse for GenericResponse {
    fn into_response(self) -> Response {
        let body = json!({
            "success": true,
            "message": self.message,
            "data": self.data,
        });
        (self.status, Json(body)).into_response()
    }
}

// Our own error that wraps `anyhow::Error` together with the status it maps to.
#[derive(Debug)]
pub struct AppError(pub StatusCode, pub anyhow::Error);

impl AppError {
    pub fn new(status: StatusCode, err: anyhow::Error) -> Self {
        Self(status, err)
    }
}

// Tell axum how to convert `AppError` into a response. Internal errors keep
// their message only in development.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("CODE: {}, MESSAGE: {}", self.0.as_u16(), self.1);
        let message = if self.0 == StatusCode::INTERNAL_SERVER_ERROR && !development() {
            "Internal server error".to_string()
        } else {
            self.1.to_string()
        };
        (self.0, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

fn development() -> bool {
    std::env::var("APP_ENV").map(|v| v != "production").unwrap_or(true)
}

/// Each service error kind maps to exactly one status code.
impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let status = match &err {
            ServiceError::Validation(_) | ServiceError::Conflict(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self(status, err.into())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self(StatusCode::INTERNAL_SERVER_ERROR, err.into())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self(StatusCode::INTERNAL_SERVER_ERROR, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn success_envelope_shape() {
        let response = GenericResponse::new(
            StatusCode::CREATED,
            "Category created successfully",
            json!({"name": "Development"}),
        )
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Category created successfully");
        assert_eq!(body["data"]["name"], "Development");
    }

    #[tokio::test]
    async fn error_envelope_shape() {
        let response = AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow::anyhow!("Category name already exists"),
        )
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Category name already exists");
    }

    #[test]
    fn service_error_kinds_map_to_fixed_statuses() {
        let cases = [
            (
                ServiceError::validation("Title is required"),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::not_found("Achievement not found"),
                StatusCode::NOT_FOUND,
            ),
            (
                ServiceError::conflict("Tag name already exists"),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::Database(sqlx::Error::PoolClosed),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            let AppError(status, _) = AppError::from(err);
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn message_text_is_preserved() {
        let AppError(_, err) = AppError::from(ServiceError::conflict(
            "Cannot delete category that is in use by achievements",
        ));
        assert_eq!(
            err.to_string(),
            "Cannot delete category that is in use by achievements"
        );
    }
}
