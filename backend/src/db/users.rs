use anyhow::Result;
use sqlx::PgPool;

use crate::models::{User, UserPublic};

pub async fn get_user(pool: &PgPool, user_id: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, avatar_url, created_at, updated_at FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn get_user_public(pool: &PgPool, user_id: &str) -> Result<Option<UserPublic>> {
    Ok(get_user(pool, user_id).await?.map(UserPublic::from))
}
