use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{error::InfraError, http_client::try_build_client};
use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_gateway::{
        CreateGatewayPayment, GatewayPayment, GatewayPaymentId, PaymentGatewayPort, Redemption,
    },
};

/// MercadoPago payments API client.
#[derive(Clone)]
pub struct MercadoPagoClient {
    client: Client,
    api_base: Url,
    access_token: SecretString,
}

impl MercadoPagoClient {
    pub fn new(
        access_token: SecretString,
        api_base: Url,
        timeout: Duration,
    ) -> Result<Self, InfraError> {
        let client = try_build_client(timeout).map_err(InfraError::HttpClient)?;
        Ok(Self {
            client,
            api_base,
            access_token,
        })
    }

    fn payments_url(&self) -> AppResult<Url> {
        self.api_base
            .join("/v1/payments")
            .map_err(|e| AppError::Internal(format!("Invalid MercadoPago API base: {}", e)))
    }

    async fn handle_response(&self, response: reqwest::Response) -> AppResult<GatewayPayment> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Gateway(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "MercadoPago API error");

            if let Ok(error) = serde_json::from_str::<MercadoPagoErrorResponse>(&body) {
                return Err(AppError::Gateway(format!(
                    "MercadoPago error: {}",
                    error.message.or(error.error).unwrap_or_else(|| status.to_string())
                )));
            }

            return Err(AppError::Gateway(format!("MercadoPago API error: {}", status)));
        }

        let payment: MercadoPagoPayment = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(body = %body, error = %e, "Failed to parse MercadoPago response");
            AppError::Gateway(format!("Failed to parse MercadoPago response: {}", e))
        })?;

        payment.into_gateway_payment()
    }
}

#[async_trait]
impl PaymentGatewayPort for MercadoPagoClient {
    fn name(&self) -> &'static str {
        "mercadopago"
    }

    async fn create_payment(&self, request: &CreateGatewayPayment) -> AppResult<GatewayPayment> {
        let body = PaymentRequestBody::from_request(request)?;

        let response = self
            .client
            .post(self.payments_url()?)
            .bearer_auth(self.access_token.expose_secret())
            .header("X-Idempotency-Key", request.idempotency_token.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Gateway("MercadoPago request timed out".into())
                } else {
                    AppError::Gateway(format!("MercadoPago request failed: {}", e))
                }
            })?;

        self.handle_response(response).await
    }
}

// ============================================================================
// Webhook Signatures
// ============================================================================

/// Maximum distance between a notification's `ts` and now.
const SIGNATURE_TOLERANCE_SECS: u64 = 300;

/// `ts` values above this are milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Verify the `x-signature` header of a MercadoPago notification.
///
/// Header format: `ts=<timestamp>,v1=<hex hmac>`. The signed manifest is
/// `id:<data.id>;request-id:<x-request-id>;ts:<ts>;`, with absent parts left out.
/// Notifications whose `ts` is more than five minutes from now are rejected as replays.
pub fn verify_webhook_signature(
    signature_header: &str,
    request_id: Option<&str>,
    data_id: &str,
    secret: &SecretString,
) -> AppResult<()> {
    verify_webhook_signature_at(
        signature_header,
        request_id,
        data_id,
        secret,
        chrono::Utc::now().timestamp(),
    )
}

fn verify_webhook_signature_at(
    signature_header: &str,
    request_id: Option<&str>,
    data_id: &str,
    secret: &SecretString,
    now: i64,
) -> AppResult<()> {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let mut timestamp: Option<&str> = None;
    let mut signature: Option<&str> = None;

    for part in signature_header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key.trim() {
            "ts" => timestamp = Some(value.trim()),
            "v1" => signature = Some(value.trim()),
            _ => {}
        }
    }

    let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
        return Err(AppError::InvalidCredentials);
    };

    let mut manifest = String::new();
    if !data_id.is_empty() {
        // Alphanumeric ids are signed lowercased
        manifest.push_str(&format!("id:{};", data_id.to_lowercase()));
    }
    if let Some(request_id) = request_id.filter(|r| !r.is_empty()) {
        manifest.push_str(&format!("request-id:{};", request_id));
    }
    manifest.push_str(&format!("ts:{};", timestamp));

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|_| AppError::Internal("HMAC error".into()))?;
    mac.update(manifest.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if !constant_time_compare(signature, &expected) {
        return Err(AppError::InvalidCredentials);
    }

    let ts: i64 = timestamp.parse().map_err(|_| AppError::InvalidCredentials)?;
    let ts_secs = if ts > MILLIS_THRESHOLD { ts / 1000 } else { ts };
    if now.abs_diff(ts_secs) > SIGNATURE_TOLERANCE_SECS {
        tracing::warn!(ts, now, "Notification signature timestamp outside tolerance");
        return Err(AppError::InvalidCredentials);
    }

    Ok(())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

// ============================================================================
// MercadoPago Types
// ============================================================================

#[derive(Debug, Serialize)]
struct PaymentRequestBody {
    transaction_amount: f64,
    description: String,
    payment_method_id: String,
    payer: Payer,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct Payer {
    email: String,
}

/// The only currency our MercadoPago account charges in.
const SUPPORTED_CURRENCY: &str = "BRL";

impl PaymentRequestBody {
    fn from_request(request: &CreateGatewayPayment) -> AppResult<Self> {
        // MercadoPago charges in the account's currency, so anything else would be
        // charged at the wrong price.
        if !request.currency.eq_ignore_ascii_case(SUPPORTED_CURRENCY) {
            return Err(AppError::Gateway(format!(
                "MercadoPago cannot charge in {}",
                request.currency
            )));
        }

        Ok(Self {
            transaction_amount: request.amount_cents as f64 / 100.0,
            description: request.description.clone(),
            payment_method_id: request.method.clone(),
            payer: Payer {
                email: request.payer_email.clone(),
            },
            notification_url: request.notification_url.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct MercadoPagoPayment {
    id: Option<serde_json::Value>,
    point_of_interaction: Option<PointOfInteraction>,
}

#[derive(Debug, Deserialize)]
struct PointOfInteraction {
    transaction_data: Option<TransactionData>,
}

#[derive(Debug, Deserialize)]
struct TransactionData {
    qr_code: Option<String>,
    ticket_url: Option<String>,
}

impl MercadoPagoPayment {
    fn into_gateway_payment(self) -> AppResult<GatewayPayment> {
        // Ids are numeric today; accept strings too rather than guessing
        let id = match self.id {
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(serde_json::Value::String(s)) if !s.is_empty() => s,
            _ => return Err(AppError::Gateway("MercadoPago response has no payment id".into())),
        };

        let transaction_data = self
            .point_of_interaction
            .and_then(|poi| poi.transaction_data);
        let redemption = match transaction_data {
            Some(data) => Redemption {
                code: data.qr_code.filter(|c| !c.is_empty()),
                url: data.ticket_url.filter(|u| !u.is_empty()),
            },
            None => Redemption::default(),
        };

        Ok(GatewayPayment {
            id: GatewayPaymentId::new(id),
            redemption,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MercadoPagoErrorResponse {
    message: Option<String>,
    error: Option<String>,
}
