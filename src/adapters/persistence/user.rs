use async_trait::async_trait;
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::AppResult,
    use_cases::payment_lifecycle::{UserProfile, UserRepo},
};

#[derive(FromRow)]
struct DbUser {
    id: Uuid,
    email: String,
}

#[async_trait]
impl UserRepo for PostgresPersistence {
    async fn get_profile_by_id(&self, id: Uuid) -> AppResult<Option<UserProfile>> {
        let rec = sqlx::query_as::<_, DbUser>(r#"SELECT id, email FROM users WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(rec.map(|r| UserProfile {
            id: r.id,
            email: r.email,
        }))
    }
}
