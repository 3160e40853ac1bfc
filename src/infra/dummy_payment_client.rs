use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_gateway::{
        CreateGatewayPayment, GatewayPayment, GatewayPaymentId, PaymentGatewayPort, Redemption,
    },
};

/// Dummy payment gateway for local development.
///
/// Creates payments in memory without any external call. Like a real gateway, a
/// repeated idempotency token returns the payment created for it the first time.
/// Notifications must be posted to the webhook endpoint by hand.
#[derive(Default)]
pub struct DummyPaymentClient {
    by_token: Mutex<HashMap<String, GatewayPayment>>,
}

impl DummyPaymentClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn generate_payment(&self, request: &CreateGatewayPayment) -> GatewayPayment {
        let id = format!("dummy_pay_{}", Uuid::new_v4().simple());
        GatewayPayment {
            redemption: Redemption {
                code: Some(format!(
                    "DUMMY-{}-{}-{}",
                    request.method.to_uppercase(),
                    request.amount_cents,
                    id
                )),
                url: Some(format!("https://dummy.invalid/payments/{}", id)),
            },
            id: GatewayPaymentId::new(id),
        }
    }
}

#[async_trait]
impl PaymentGatewayPort for DummyPaymentClient {
    fn name(&self) -> &'static str {
        "dummy"
    }

    async fn create_payment(&self, request: &CreateGatewayPayment) -> AppResult<GatewayPayment> {
        if request.amount_cents <= 0 {
            return Err(AppError::Gateway("Invalid transaction amount".into()));
        }

        let mut by_token = self
            .by_token
            .lock()
            .map_err(|_| AppError::Internal("dummy gateway state poisoned".into()))?;

        let payment = by_token
            .entry(request.idempotency_token.as_str().to_string())
            .or_insert_with(|| self.generate_payment(request))
            .clone();

        tracing::debug!(gateway_payment_id = %payment.id, "Dummy payment created");
        Ok(payment)
    }
}
