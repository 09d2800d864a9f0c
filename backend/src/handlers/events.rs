use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthUser;
use crate::constants::EVENT_CONTENT_CHAR_LIMIT;
use crate::db::{couples, events};
use crate::error::{ApiError, ApiResult};
use crate::handlers::Ack;
use crate::models::{Couple, CoupleEvent, EventKind, Position};

/// Every event operation is scoped to the caller's active couple.
async fn require_couple(pool: &PgPool, user_id: &str) -> ApiResult<Couple> {
    couples::active_couple_for(pool, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("未找到绑定关系".to_string()))
}

fn parse_kind(raw: &str) -> ApiResult<EventKind> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("无效的事件类型".to_string()))
}

fn check_content_length(content: &str) -> ApiResult<()> {
    if content.chars().count() > EVENT_CONTENT_CHAR_LIMIT {
        return Err(ApiError::BadRequest("内容过长".to_string()));
    }
    Ok(())
}

/// GET /events — all shared items of the caller's couple, in creation order.
pub async fn list_events(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Vec<CoupleEvent>>> {
    let couple = require_couple(&state.pool, &user_id).await?;
    let events = events::list_events(&state.pool, couple.id).await?;
    Ok(Json(events))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    pub position: Option<Position>,
}

/// POST /events — add a shared item.
pub async fn create_event(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CreateEventRequest>,
) -> ApiResult<Json<CoupleEvent>> {
    let content = req.content.trim();
    if content.is_empty() || req.kind.is_empty() {
        return Err(ApiError::BadRequest("内容和类型不能为空".to_string()));
    }
    check_content_length(content)?;
    let kind = parse_kind(&req.kind)?;

    let couple = require_couple(&state.pool, &user_id).await?;
    let event =
        events::create_event(&state.pool, couple.id, &user_id, content, kind, req.position)
            .await?;

    Ok(Json(event))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub position: Option<Position>,
    pub completed: Option<bool>,
}

/// Both members may mutate any item of their couple; nobody else may.
async fn require_owned_event(
    pool: &PgPool,
    user_id: &str,
    event_id: Uuid,
) -> ApiResult<CoupleEvent> {
    let couple = require_couple(pool, user_id).await?;
    let Some(event) = events::get_event(pool, event_id).await? else {
        return Err(ApiError::NotFound("事件不存在".to_string()));
    };
    if event.couple_id != couple.id {
        return Err(ApiError::Forbidden("无权操作此事件".to_string()));
    }
    Ok(event)
}

/// PUT /events/{id} — partial update; omitted fields stay unchanged.
pub async fn update_event(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(event_id): Path<Uuid>,
    Json(req): Json<UpdateEventRequest>,
) -> ApiResult<Json<CoupleEvent>> {
    require_owned_event(&state.pool, &user_id, event_id).await?;

    let content = match req.content {
        Some(raw) => {
            let trimmed = raw.trim().to_string();
            if trimmed.is_empty() {
                return Err(ApiError::BadRequest("内容和类型不能为空".to_string()));
            }
            check_content_length(&trimmed)?;
            Some(trimmed)
        }
        None => None,
    };
    let kind = req.kind.as_deref().map(parse_kind).transpose()?;

    let patch = events::EventPatch {
        content,
        kind,
        position: req.position,
        completed: req.completed,
    };
    let updated = events::update_event(&state.pool, event_id, patch).await?;

    Ok(Json(updated))
}

/// DELETE /events/{id}
pub async fn delete_event(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(event_id): Path<Uuid>,
) -> ApiResult<Json<Ack>> {
    require_owned_event(&state.pool, &user_id, event_id).await?;
    events::delete_event(&state.pool, event_id).await?;
    Ok(Json(Ack::ok()))
}
