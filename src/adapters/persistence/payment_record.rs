use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    domain::entities::{payment_record::PaymentRecord, payment_status::PaymentStatus},
    use_cases::payment_lifecycle::{InsertOutcome, NewPaymentRecord, PaymentRecordRepo},
};

const RECORD_COLUMNS: &str = "id, gateway_payment_id, user_id, plan_id, amount_cents, currency, status, created_at, updated_at";

#[derive(FromRow)]
struct DbPaymentRecord {
    id: Uuid,
    gateway_payment_id: String,
    user_id: Uuid,
    plan_id: Uuid,
    amount_cents: i64,
    currency: String,
    status: PaymentStatus,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl From<DbPaymentRecord> for PaymentRecord {
    fn from(db: DbPaymentRecord) -> Self {
        PaymentRecord {
            id: db.id,
            gateway_payment_id: db.gateway_payment_id,
            user_id: db.user_id,
            plan_id: db.plan_id,
            amount_cents: db.amount_cents,
            currency: db.currency,
            status: db.status,
            created_at: Some(db.created_at),
            updated_at: Some(db.updated_at),
        }
    }
}

#[async_trait]
impl PaymentRecordRepo for PostgresPersistence {
    async fn create_pending(&self, input: &NewPaymentRecord) -> AppResult<InsertOutcome> {
        let inserted = sqlx::query_as::<_, DbPaymentRecord>(&format!(
            r#"INSERT INTO payment_records (id, gateway_payment_id, user_id, plan_id, amount_cents, currency, status)
               VALUES ($1, $2, $3, $4, $5, $6, 'pending')
               ON CONFLICT (gateway_payment_id) DO NOTHING
               RETURNING {RECORD_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(&input.gateway_payment_id)
        .bind(input.user_id)
        .bind(input.plan_id)
        .bind(input.amount_cents)
        .bind(&input.currency)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(rec) = inserted {
            return Ok(InsertOutcome::Created(rec.into()));
        }

        // The conflicting row cannot be deleted, records are never removed.
        let existing = sqlx::query_as::<_, DbPaymentRecord>(&format!(
            r#"SELECT {RECORD_COLUMNS} FROM payment_records WHERE gateway_payment_id = $1"#
        ))
        .bind(&input.gateway_payment_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(InsertOutcome::Existing(existing.into()))
    }

    async fn get_by_gateway_id(&self, gateway_payment_id: &str) -> AppResult<Option<PaymentRecord>> {
        let rec = sqlx::query_as::<_, DbPaymentRecord>(&format!(
            r#"SELECT {RECORD_COLUMNS} FROM payment_records WHERE gateway_payment_id = $1"#
        ))
        .bind(gateway_payment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rec.map(PaymentRecord::from))
    }
}

/// Conditional `pending -> complete` inside the caller's transaction.
pub(super) async fn mark_complete(
    tx: &mut Transaction<'_, Postgres>,
    gateway_payment_id: &str,
) -> AppResult<()> {
    let result = sqlx::query(
        r#"UPDATE payment_records
           SET status = 'complete', updated_at = now()
           WHERE gateway_payment_id = $1 AND status = 'pending'"#,
    )
    .bind(gateway_payment_id)
    .execute(tx.as_mut())
    .await?;

    // The row was locked as pending by the caller.
    if result.rows_affected() != 1 {
        return Err(AppError::Internal("Locked pending record was not updated".into()));
    }

    Ok(())
}
