use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_error::AppResult;

// ============================================================================
// Port Types - Gateway-agnostic types
// ============================================================================

/// Identifier assigned by the payment gateway to a single payment attempt
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GatewayPaymentId(pub String);

impl GatewayPaymentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GatewayPaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token sent with a creation call so the gateway does not double-create on its own retries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyToken(pub String);

impl IdempotencyToken {
    /// Fresh random token. Protects a single attempt only.
    pub fn fresh() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Deterministic token for a caller-supplied request key, scoped to the user.
    pub fn derived(user_id: Uuid, request_key: &str) -> Self {
        let name = format!("{}:{}", user_id, request_key);
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Payment creation request handed to the gateway
#[derive(Debug, Clone)]
pub struct CreateGatewayPayment {
    pub amount_cents: i64,
    pub currency: String,
    /// Gateway payment method id (e.g. "pix")
    pub method: String,
    pub payer_email: String,
    pub description: String,
    pub notification_url: Option<String>,
    pub idempotency_token: IdempotencyToken,
}

/// Method-specific artifact the payer uses to complete the payment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Redemption {
    /// Scannable/copyable code (e.g. Pix "copia e cola")
    pub code: Option<String>,
    /// Hosted page where the payer can redeem
    pub url: Option<String>,
}

impl Redemption {
    pub fn is_empty(&self) -> bool {
        self.code.is_none() && self.url.is_none()
    }
}

/// Validated result of a successful creation call
#[derive(Debug, Clone)]
pub struct GatewayPayment {
    pub id: GatewayPaymentId,
    pub redemption: Redemption,
}

// ============================================================================
// Payment Gateway Port
// ============================================================================

#[async_trait]
pub trait PaymentGatewayPort: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Create a payment with the gateway.
    ///
    /// Any transport failure, timeout, or unusable response is `AppError::Gateway`.
    async fn create_payment(&self, request: &CreateGatewayPayment) -> AppResult<GatewayPayment>;
}
