use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::{
    adapters::persistence::{PostgresPersistence, payment_record},
    app_error::{AppError, AppResult},
    use_cases::payment_lifecycle::PlanGrantRepo,
};

#[async_trait]
impl PlanGrantRepo for PostgresPersistence {
    async fn grant_and_complete(&self, gateway_payment_id: &str) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        // The row lock is held until commit, so a second delivery waits here and then
        // sees the record complete.
        let claimed = sqlx::query_as::<_, (Uuid, Uuid)>(
            r#"SELECT user_id, plan_id FROM payment_records
               WHERE gateway_payment_id = $1 AND status = 'pending'
               FOR UPDATE"#,
        )
        .bind(gateway_payment_id)
        .fetch_optional(tx.as_mut())
        .await?;

        let Some((user_id, plan_id)) = claimed else {
            tx.rollback().await?;
            return Ok(false);
        };

        grant_plan(&mut tx, user_id, plan_id).await?;
        payment_record::mark_complete(&mut tx, gateway_payment_id).await?;

        tx.commit().await?;
        Ok(true)
    }
}

async fn grant_plan(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    plan_id: Uuid,
) -> AppResult<()> {
    // Expiry is computed from the plan row so a missing plan inserts nothing.
    let result = sqlx::query(
        r#"INSERT INTO user_plans (user_id, plan_id, granted_at, expires_at)
           SELECT $1, p.id, now(), now() + make_interval(days => p.duration_days)
           FROM plans p
           WHERE p.id = $2
           ON CONFLICT (user_id)
           DO UPDATE SET
                plan_id = EXCLUDED.plan_id,
                granted_at = EXCLUDED.granted_at,
                expires_at = EXCLUDED.expires_at"#,
    )
    .bind(user_id)
    .bind(plan_id)
    .execute(tx.as_mut())
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::PlanUnavailable);
    }

    Ok(())
}
