use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, header::AUTHORIZATION},
    response::IntoResponse,
    routing::post,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::jwt,
};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(create_payment))
}

#[derive(Deserialize)]
struct CreatePaymentPayload {
    plan_id: Uuid,
}

/// POST /api/payments
/// Starts a payment for a plan on behalf of the signed-in user.
async fn create_payment(
    State(app_state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(payload): Json<CreatePaymentPayload>,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user_id(&app_state, &jar, &headers)?;

    let idempotency_key = match headers.get(IDEMPOTENCY_KEY_HEADER) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| AppError::InvalidInput("Invalid Idempotency-Key header".into()))?,
        ),
        None => None,
    };

    let created = app_state
        .payment_use_cases
        .create_payment(user_id, payload.plan_id, idempotency_key)
        .await?;

    Ok(Json(created))
}

/// The access token comes from the auth cookie, or from a bearer header for API clients.
fn current_user_id(app_state: &AppState, jar: &CookieJar, headers: &HeaderMap) -> AppResult<Uuid> {
    let cookie_token = jar.get(ACCESS_TOKEN_COOKIE).map(|c| c.value().to_owned());
    let bearer_token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_owned());

    let token = cookie_token
        .or(bearer_token)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::InvalidCredentials)?;

    jwt::user_id_from_token(&token, &app_state.config.jwt_secret)
}
