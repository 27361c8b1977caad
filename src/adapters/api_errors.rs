use crate::domain::error::LifecycleError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Newtype over the domain error so axum's trait can be implemented here.
pub struct ApiError(pub LifecycleError);

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self.0 {
            LifecycleError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                msg.clone(),
            ),
            LifecycleError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("{what} not found"),
            ),
            LifecycleError::Gateway(err) => {
                tracing::warn!("gateway error: {err}");
                (
                    StatusCode::BAD_GATEWAY,
                    "gateway_error",
                    "payment gateway unavailable".to_string(),
                )
            }
            LifecycleError::ProtocolViolation(err) => {
                tracing::error!("protocol violation: {err}");
                (
                    StatusCode::BAD_GATEWAY,
                    "gateway_protocol_error",
                    "payment gateway returned an unexpected response".to_string(),
                )
            }
            LifecycleError::RetryCreation { .. } => (
                StatusCode::BAD_GATEWAY,
                "gateway_error",
                "payment gateway unavailable".to_string(),
            ),
            err @ (LifecycleError::Notification(_)
            | LifecycleError::Database(_)
            | LifecycleError::Serialization(_)
            | LifecycleError::Task(_)) => {
                tracing::error!("internal error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error_code": error_code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}
