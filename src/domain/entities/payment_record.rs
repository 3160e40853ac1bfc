use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use super::payment_status::PaymentStatus;

/// Local record of a payment created with the gateway, keyed by the gateway's id.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub gateway_payment_id: String,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl PaymentRecord {
    pub fn is_complete(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether a replayed creation refers to the same purchase.
    pub fn belongs_to(&self, user_id: Uuid, plan_id: Uuid) -> bool {
        self.user_id == user_id && self.plan_id == plan_id
    }
}
