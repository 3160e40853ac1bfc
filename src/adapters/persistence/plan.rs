use async_trait::async_trait;
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::AppResult,
    domain::entities::plan::Plan,
    use_cases::payment_lifecycle::PlanCatalogRepo,
};

#[derive(FromRow)]
struct DbPlan {
    id: Uuid,
    name: String,
    price_cents: i64,
    currency: String,
    duration_days: i32,
}

impl From<DbPlan> for Plan {
    fn from(db: DbPlan) -> Self {
        Plan {
            id: db.id,
            name: db.name,
            price_cents: db.price_cents,
            currency: db.currency,
            duration_days: db.duration_days,
        }
    }
}

#[async_trait]
impl PlanCatalogRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Plan>> {
        let rec = sqlx::query_as::<_, DbPlan>(
            r#"SELECT id, name, price_cents, currency, duration_days
               FROM plans
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rec.map(Plan::from))
    }
}
