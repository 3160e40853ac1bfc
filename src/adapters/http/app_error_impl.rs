use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::DatabaseError,
                None,
            ),
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, ErrorCode::InvalidCredentials, None)
            }
            AppError::InvalidInput(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorCode::InvalidInput,
                Some(msg.clone()),
            ),
            AppError::PlanNotFound => (StatusCode::NOT_FOUND, ErrorCode::PlanNotFound, None),
            AppError::PlanUnavailable => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::PlanUnavailable,
                None,
            ),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, ErrorCode::UserNotFound, None),
            AppError::RecordNotFound => (StatusCode::NOT_FOUND, ErrorCode::RecordNotFound, None),
            // Gateway details stay in the logs
            AppError::Gateway(_) => (StatusCode::BAD_GATEWAY, ErrorCode::GatewayError, None),
            AppError::Conflict(msg) => {
                (StatusCode::CONFLICT, ErrorCode::Conflict, Some(msg.clone()))
            }
            AppError::ReconcileBusy => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorCode::ReconcileBusy,
                None,
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalError,
                None,
            ),
        };

        // Log the error before it gets converted into a status response.
        // A paid payment whose plan is gone needs an operator, whatever the status.
        if status.is_server_error() || matches!(self, AppError::PlanUnavailable) {
            tracing::error!(error = ?self, status = %status, "Request failed");
        } else {
            tracing::warn!(error = ?self, status = %status, "Request rejected");
        }

        error_resp(status, code, message)
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: Option<String>) -> Response {
    let body = match message {
        Some(msg) => serde_json::json!({ "code": code.as_str(), "message": msg }),
        None => serde_json::json!({ "code": code.as_str() }),
    };
    (status, Json(body)).into_response()
}
