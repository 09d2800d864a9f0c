use anyhow::Result;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::events::CoupleEventRow;
use crate::models::{CoupleEvent, EventKind, Position};

/// Fields of an update request; `None` means "leave unchanged".
#[derive(Debug, Default, Clone)]
pub struct EventPatch {
    pub content: Option<String>,
    pub kind: Option<EventKind>,
    pub position: Option<Position>,
    pub completed: Option<bool>,
}

pub async fn list_events(pool: &PgPool, couple_id: Uuid) -> Result<Vec<CoupleEvent>> {
    let rows = sqlx::query_as::<_, CoupleEventRow>(
        r#"
        SELECT id, couple_id, creator_id, content, kind,
               position_x, position_y, completed, created_at, updated_at
        FROM couple_events
        WHERE couple_id = $1
        ORDER BY created_at
        "#,
    )
    .bind(couple_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(CoupleEvent::from).collect())
}

pub async fn create_event(
    pool: &PgPool,
    couple_id: Uuid,
    creator_id: &str,
    content: &str,
    kind: EventKind,
    position: Option<Position>,
) -> Result<CoupleEvent> {
    let row = sqlx::query_as::<_, CoupleEventRow>(
        r#"
        INSERT INTO couple_events (couple_id, creator_id, content, kind, position_x, position_y)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, couple_id, creator_id, content, kind,
                  position_x, position_y, completed, created_at, updated_at
        "#,
    )
    .bind(couple_id)
    .bind(creator_id)
    .bind(content)
    .bind(kind.as_str())
    .bind(position.map(|p| p.x))
    .bind(position.map(|p| p.y))
    .fetch_one(pool)
    .await?;

    Ok(CoupleEvent::from(row))
}

pub async fn get_event(pool: &PgPool, event_id: Uuid) -> Result<Option<CoupleEvent>> {
    let row = sqlx::query_as::<_, CoupleEventRow>(
        r#"
        SELECT id, couple_id, creator_id, content, kind,
               position_x, position_y, completed, created_at, updated_at
        FROM couple_events
        WHERE id = $1
        "#,
    )
    .bind(event_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(CoupleEvent::from))
}

pub async fn update_event(pool: &PgPool, event_id: Uuid, patch: EventPatch) -> Result<CoupleEvent> {
    let row = sqlx::query_as::<_, CoupleEventRow>(
        r#"
        UPDATE couple_events
        SET content = COALESCE($2, content),
            kind = COALESCE($3, kind),
            position_x = COALESCE($4, position_x),
            position_y = COALESCE($5, position_y),
            completed = COALESCE($6, completed),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, couple_id, creator_id, content, kind,
                  position_x, position_y, completed, created_at, updated_at
        "#,
    )
    .bind(event_id)
    .bind(patch.content)
    .bind(patch.kind.map(|k| k.as_str()))
    .bind(patch.position.map(|p| p.x))
    .bind(patch.position.map(|p| p.y))
    .bind(patch.completed)
    .fetch_one(pool)
    .await?;

    Ok(CoupleEvent::from(row))
}

pub async fn delete_event(pool: &PgPool, event_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM couple_events WHERE id = $1")
        .bind(event_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Bulk delete on unbind; the couple row goes next, inside the same
/// transaction.
pub async fn delete_events_for_couple(
    executor: impl PgExecutor<'_>,
    couple_id: Uuid,
) -> Result<u64> {
    let result = sqlx::query("DELETE FROM couple_events WHERE couple_id = $1")
        .bind(couple_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}
