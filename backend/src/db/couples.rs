use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::{Couple, IncomingRequest, PairRequest, UserPublic, ordered_pair};

// Request operations

/// Inserts a pairing proposal, or refreshes the timestamp of the existing one
/// for the same (from, to) pair. Re-sending is an idempotent retry, never a
/// duplicate row.
pub async fn upsert_request(
    pool: &PgPool,
    from_user_id: &str,
    to_user_id: &str,
) -> Result<PairRequest> {
    let request = sqlx::query_as::<_, PairRequest>(
        r#"
        INSERT INTO pair_requests (from_user_id, to_user_id)
        VALUES ($1, $2)
        ON CONFLICT (from_user_id, to_user_id)
            DO UPDATE SET created_at = NOW()
        RETURNING id, from_user_id, to_user_id, created_at
        "#,
    )
    .bind(from_user_id)
    .bind(to_user_id)
    .fetch_one(pool)
    .await?;

    Ok(request)
}

#[derive(FromRow)]
struct IncomingRequestRow {
    id: Uuid,
    from_user_id: String,
    to_user_id: String,
    created_at: DateTime<Utc>,
    sender_username: String,
    sender_avatar_url: Option<String>,
}

/// All proposals addressed to `to_user_id`, sender identity attached,
/// newest first.
pub async fn list_incoming_requests(
    pool: &PgPool,
    to_user_id: &str,
) -> Result<Vec<IncomingRequest>> {
    let rows = sqlx::query_as::<_, IncomingRequestRow>(
        r#"
        SELECT r.id, r.from_user_id, r.to_user_id, r.created_at,
               u.username AS sender_username, u.avatar_url AS sender_avatar_url
        FROM pair_requests r
        JOIN users u ON u.id = r.from_user_id
        WHERE r.to_user_id = $1
        ORDER BY r.created_at DESC
        "#,
    )
    .bind(to_user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| IncomingRequest {
            from_user: UserPublic {
                id: row.from_user_id.clone(),
                username: row.sender_username,
                avatar_url: row.sender_avatar_url,
            },
            request: PairRequest {
                id: row.id,
                from_user_id: row.from_user_id,
                to_user_id: row.to_user_id,
                created_at: row.created_at,
            },
        })
        .collect())
}

pub async fn get_request(
    executor: impl PgExecutor<'_>,
    request_id: Uuid,
) -> Result<Option<PairRequest>> {
    let request = sqlx::query_as::<_, PairRequest>(
        "SELECT id, from_user_id, to_user_id, created_at FROM pair_requests WHERE id = $1",
    )
    .bind(request_id)
    .fetch_optional(executor)
    .await?;

    Ok(request)
}

/// Row-locks the request so concurrent accepts of the same proposal serialize
/// on it.
pub async fn get_request_for_update(
    executor: impl PgExecutor<'_>,
    request_id: Uuid,
) -> Result<Option<PairRequest>> {
    let request = sqlx::query_as::<_, PairRequest>(
        "SELECT id, from_user_id, to_user_id, created_at FROM pair_requests WHERE id = $1 FOR UPDATE",
    )
    .bind(request_id)
    .fetch_optional(executor)
    .await?;

    Ok(request)
}

pub async fn delete_request(executor: impl PgExecutor<'_>, request_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM pair_requests WHERE id = $1")
        .bind(request_id)
        .execute(executor)
        .await?;

    Ok(())
}

/// Clears every proposal between the two users, in both directions, so an
/// accepted pair leaves no mirror request behind.
pub async fn delete_requests_between(
    executor: impl PgExecutor<'_>,
    user_a: &str,
    user_b: &str,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM pair_requests
        WHERE (from_user_id = $1 AND to_user_id = $2)
           OR (from_user_id = $2 AND to_user_id = $1)
        "#,
    )
    .bind(user_a)
    .bind(user_b)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

// Couple operations

pub async fn create_couple(
    executor: impl PgExecutor<'_>,
    user_a: &str,
    user_b: &str,
) -> Result<Couple> {
    let (user1_id, user2_id) = ordered_pair(user_a, user_b);

    let couple = sqlx::query_as::<_, Couple>(
        r#"
        INSERT INTO couples (user1_id, user2_id, active)
        VALUES ($1, $2, TRUE)
        RETURNING id, user1_id, user2_id, active, created_at
        "#,
    )
    .bind(user1_id)
    .bind(user2_id)
    .fetch_one(executor)
    .await?;

    Ok(couple)
}

/// The single active couple containing `user_id`, if any.
pub async fn active_couple_for(
    executor: impl PgExecutor<'_>,
    user_id: &str,
) -> Result<Option<Couple>> {
    let couple = sqlx::query_as::<_, Couple>(
        r#"
        SELECT id, user1_id, user2_id, active, created_at
        FROM couples
        WHERE active AND (user1_id = $1 OR user2_id = $1)
        "#,
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await?;

    Ok(couple)
}

pub async fn active_couple_between(
    executor: impl PgExecutor<'_>,
    user_a: &str,
    user_b: &str,
) -> Result<Option<Couple>> {
    let (user1_id, user2_id) = ordered_pair(user_a, user_b);

    let couple = sqlx::query_as::<_, Couple>(
        r#"
        SELECT id, user1_id, user2_id, active, created_at
        FROM couples
        WHERE active AND user1_id = $1 AND user2_id = $2
        "#,
    )
    .bind(user1_id)
    .bind(user2_id)
    .fetch_optional(executor)
    .await?;

    Ok(couple)
}

/// True only if an active couple with this id exists and `user_id` is one of
/// its members. Shared by the /validate route and the room-join handshake.
pub async fn relation_is_valid(pool: &PgPool, couple_id: Uuid, user_id: &str) -> Result<bool> {
    let valid = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM couples
            WHERE id = $1 AND active AND (user1_id = $2 OR user2_id = $2)
        )
        "#,
    )
    .bind(couple_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(valid)
}

pub async fn delete_couple(executor: impl PgExecutor<'_>, couple_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM couples WHERE id = $1")
        .bind(couple_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}
