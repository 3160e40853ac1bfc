mod health;
mod payments;
mod webhook;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/payments", payments::router())
        .nest("/webhook", webhook::router())
        .nest("/health", health::router())
}
