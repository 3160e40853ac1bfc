use std::net::SocketAddr;
use std::time::Duration;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

/// Which payment gateway backs payment creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayKind {
    MercadoPago,
    /// Local gateway that never leaves the process. For development only.
    Dummy,
}

impl std::str::FromStr for GatewayKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mercadopago" => Ok(GatewayKind::MercadoPago),
            "dummy" => Ok(GatewayKind::Dummy),
            _ => Err(format!("Invalid payment gateway: {}", s)),
        }
    }
}

pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub jwt_secret: SecretString,
    pub cors_origin: HeaderValue,
    pub gateway: GatewayKind,
    /// Required when `gateway` is MercadoPago.
    pub mercadopago_access_token: Option<SecretString>,
    /// When set, notification signatures are verified.
    pub mercadopago_webhook_secret: Option<SecretString>,
    pub mercadopago_api_base: Url,
    /// Where the gateway delivers notifications for payments we create.
    pub notification_url: Option<Url>,
    /// Gateway payment method id, e.g. "pix".
    pub payment_method: String,
    pub payment_description: String,
    pub gateway_timeout: Duration,
    /// When set, reconciliation locks live in Redis instead of in-process.
    pub redis_url: Option<String>,
    pub reconcile_lock_ttl: Duration,
    pub reconcile_lock_wait: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", "127.0.0.1:3000".parse().unwrap());
        let database_url: String = get_env("DATABASE_URL");
        let jwt_secret: SecretString = SecretString::new(get_env::<String>("JWT_SECRET").into());
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:5173"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");

        let gateway: GatewayKind = get_env_default("PAYMENT_GATEWAY", String::from("mercadopago"))
            .parse()
            .expect("PAYMENT_GATEWAY must be 'mercadopago' or 'dummy'");
        let mercadopago_access_token = optional_env("MERCADOPAGO_ACCESS_TOKEN")
            .map(|token| SecretString::new(token.into()));
        let mercadopago_webhook_secret = optional_env("MERCADOPAGO_WEBHOOK_SECRET")
            .map(|secret| SecretString::new(secret.into()));
        let mercadopago_api_base: Url = get_env_default(
            "MERCADOPAGO_API_BASE",
            "https://api.mercadopago.com".parse().unwrap(),
        );
        let notification_url: Option<Url> = optional_env("NOTIFICATION_URL").map(|raw| {
            raw.parse()
                .expect("NOTIFICATION_URL must be a valid URL")
        });

        let payment_method: String = get_env_default("PAYMENT_METHOD", String::from("pix"));
        let payment_description: String =
            get_env_default("PAYMENT_DESCRIPTION", String::from("Subscription plan purchase"));
        let gateway_timeout_ms: u64 = get_env_default("GATEWAY_TIMEOUT_MS", 5_000);

        let redis_url = optional_env("REDIS_URL");
        let reconcile_lock_ttl_secs: u64 = get_env_default("RECONCILE_LOCK_TTL_SECS", 30);
        let reconcile_lock_wait_ms: u64 = get_env_default("RECONCILE_LOCK_WAIT_MS", 10_000);

        Self {
            bind_addr,
            database_url,
            jwt_secret,
            cors_origin,
            gateway,
            mercadopago_access_token,
            mercadopago_webhook_secret,
            mercadopago_api_base,
            notification_url,
            payment_method,
            payment_description,
            gateway_timeout: Duration::from_millis(gateway_timeout_ms),
            redis_url,
            reconcile_lock_ttl: Duration::from_secs(reconcile_lock_ttl_secs),
            reconcile_lock_wait: Duration::from_millis(reconcile_lock_wait_ms),
        }
    }
}

/// Unset and empty are the same thing.
fn optional_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
