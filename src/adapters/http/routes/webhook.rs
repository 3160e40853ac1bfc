//! Gateway notification endpoint.
//!
//! MercadoPago delivers at-least-once and retries on any non-2xx answer, so
//! transient failures (missing record, busy lock, storage errors) are surfaced as
//! errors on purpose while duplicates are acknowledged with 200.

use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    domain::entities::gateway_action::GatewayAction,
    infra::mercadopago_client::verify_webhook_signature,
    use_cases::payment_lifecycle::PaymentNotification,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(handle_notification))
}

#[derive(Debug, Deserialize)]
struct NotificationPayload {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    data: Option<NotificationData>,
}

#[derive(Debug, Deserialize)]
struct NotificationData {
    #[serde(default)]
    id: Option<serde_json::Value>,
}

impl NotificationPayload {
    /// Payment ids arrive as strings, older deliveries send numbers.
    fn data_id(&self) -> String {
        match self.data.as_ref().and_then(|d| d.id.as_ref()) {
            Some(serde_json::Value::String(s)) => s.trim().to_string(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }
}

/// POST /api/webhook
async fn handle_notification(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> AppResult<impl IntoResponse> {
    let payload: NotificationPayload = serde_json::from_str(&body)
        .map_err(|e| AppError::InvalidInput(format!("Invalid notification payload: {}", e)))?;
    let data_id = payload.data_id();

    if let Some(secret) = &app_state.config.mercadopago_webhook_secret {
        let signature = headers
            .get("x-signature")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::InvalidCredentials)?;
        let request_id = headers.get("x-request-id").and_then(|v| v.to_str().ok());

        verify_webhook_signature(signature, request_id, &data_id, secret)?;
    }

    let notification = PaymentNotification {
        action: GatewayAction::parse(payload.action.as_deref().unwrap_or_default()),
        gateway_payment_id: data_id,
    };

    tracing::debug!(
        action = notification.action.as_str(),
        gateway_payment_id = %notification.gateway_payment_id,
        "Gateway notification received"
    );

    let outcome = app_state
        .payment_use_cases
        .handle_notification(&notification)
        .await?;

    Ok(Json(serde_json::json!({ "status": outcome.as_str() })))
}
