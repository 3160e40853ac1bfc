//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::{
    domain::entities::{payment_record::PaymentRecord, payment_status::PaymentStatus, plan::Plan},
    use_cases::payment_lifecycle::UserProfile,
};

/// Create a test user with a unique email.
pub fn create_test_user(overrides: impl FnOnce(&mut UserProfile)) -> UserProfile {
    let id = Uuid::new_v4();
    let mut user = UserProfile {
        id,
        email: format!("user-{}@example.com", id.simple()),
    };
    overrides(&mut user);
    user
}

/// Create a test plan with sensible defaults.
pub fn create_test_plan(overrides: impl FnOnce(&mut Plan)) -> Plan {
    let mut plan = Plan {
        id: Uuid::new_v4(),
        name: "Monthly".to_string(),
        price_cents: 1990,
        currency: "BRL".to_string(),
        duration_days: 30,
    };
    overrides(&mut plan);
    plan
}

/// Create a pending payment record for an unrelated user and plan.
pub fn create_test_record(
    gateway_payment_id: &str,
    overrides: impl FnOnce(&mut PaymentRecord),
) -> PaymentRecord {
    let mut record = PaymentRecord {
        id: Uuid::new_v4(),
        gateway_payment_id: gateway_payment_id.to_string(),
        user_id: Uuid::new_v4(),
        plan_id: Uuid::new_v4(),
        amount_cents: 1990,
        currency: "BRL".to_string(),
        status: PaymentStatus::Pending,
        created_at: Some(test_datetime()),
        updated_at: Some(test_datetime()),
    };
    overrides(&mut record);
    record
}

/// Fixed timestamp for deterministic fixtures.
pub fn test_datetime() -> NaiveDateTime {
    chrono::DateTime::from_timestamp(1_704_067_200, 0)
        .unwrap()
        .naive_utc()
}
