use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthUser;
use crate::db::{couples, users};
use crate::error::{ApiError, ApiResult};
use crate::handlers::Ack;
use crate::models::{Couple, CoupleWithPartner, IncomingRequest, PairRequest, UserPublic};
use crate::realtime::ServerMessage;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindRequest {
    #[serde(default)]
    pub partner_id: String,
}

/// POST /bind — propose a pairing. Re-sending the same proposal refreshes
/// the existing request instead of duplicating it.
pub async fn bind(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<BindRequest>,
) -> ApiResult<Json<PairRequest>> {
    let partner_id = req.partner_id.trim();
    if partner_id.is_empty() {
        return Err(ApiError::BadRequest("缺少对方ID".to_string()));
    }
    if partner_id == user_id {
        return Err(ApiError::BadRequest("不能绑定自己".to_string()));
    }
    if users::get_user(&state.pool, partner_id).await?.is_none() {
        return Err(ApiError::NotFound("对方不存在".to_string()));
    }
    if couples::active_couple_between(&state.pool, &user_id, partner_id)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("已经绑定过了".to_string()));
    }

    let request = couples::upsert_request(&state.pool, &user_id, partner_id).await?;
    tracing::info!(from = %user_id, to = %partner_id, "pairing request sent");

    Ok(Json(request))
}

/// GET /requests — proposals addressed to the caller, newest first.
pub async fn pending_requests(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Vec<IncomingRequest>>> {
    let requests = couples::list_incoming_requests(&state.pool, &user_id).await?;
    Ok(Json(requests))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestIdBody {
    pub request_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptResponse {
    pub couple: Couple,
    pub partner: UserPublic,
}

/// POST /accept — turn a proposal into a couple. The request row is locked
/// and both members re-checked inside one transaction so two racing accepts
/// cannot produce two active couples; the partial unique index on the
/// normalized pair backstops it.
pub async fn accept(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<RequestIdBody>,
) -> ApiResult<Json<AcceptResponse>> {
    let Some(request_id) = req.request_id else {
        return Err(ApiError::BadRequest("缺少请求ID".to_string()));
    };

    let mut tx = state.pool.begin().await?;

    let Some(request) = couples::get_request_for_update(&mut *tx, request_id).await? else {
        return Err(ApiError::NotFound("请求不存在".to_string()));
    };
    if request.to_user_id != user_id {
        return Err(ApiError::Forbidden("无权操作此请求".to_string()));
    }
    for member in [&request.from_user_id, &request.to_user_id] {
        if couples::active_couple_for(&mut *tx, member).await?.is_some() {
            return Err(ApiError::Conflict("已经绑定过了".to_string()));
        }
    }

    let couple =
        couples::create_couple(&mut *tx, &request.from_user_id, &request.to_user_id).await?;
    // Clears the accepted request and any mirror proposal the other way.
    couples::delete_requests_between(&mut *tx, &request.from_user_id, &request.to_user_id).await?;
    tx.commit().await?;

    let sender = users::get_user_public(&state.pool, &request.from_user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user {} missing after accept", request.from_user_id))?;
    let acceptor = users::get_user_public(&state.pool, &request.to_user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user {} missing after accept", request.to_user_id))?;

    // Best-effort: if neither side has joined the room yet this reaches
    // nobody, and clients reconcile through GET /relation.
    state
        .rooms
        .broadcast(
            couple.id,
            &ServerMessage::CoupleBound {
                couple: couple.clone(),
                users: vec![sender.clone(), acceptor],
            },
        )
        .await;

    tracing::info!(couple = %couple.id, "couple bound");

    Ok(Json(AcceptResponse {
        couple,
        partner: sender,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectResponse {
    pub from_user_id: String,
}

/// POST /reject — discard a proposal; returns the sender id for UI feedback.
pub async fn reject(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<RequestIdBody>,
) -> ApiResult<Json<RejectResponse>> {
    let Some(request_id) = req.request_id else {
        return Err(ApiError::BadRequest("缺少请求ID".to_string()));
    };

    let Some(request) = couples::get_request(&state.pool, request_id).await? else {
        return Err(ApiError::NotFound("请求不存在".to_string()));
    };
    if request.to_user_id != user_id {
        return Err(ApiError::Forbidden("无权操作此请求".to_string()));
    }

    couples::delete_request(&state.pool, request_id).await?;

    Ok(Json(RejectResponse {
        from_user_id: request.from_user_id,
    }))
}

/// GET /relation — the caller's active couple with partner identity, or an
/// explicit null.
pub async fn relation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Option<CoupleWithPartner>>> {
    let Some(couple) = couples::active_couple_for(&state.pool, &user_id).await? else {
        return Ok(Json(None));
    };

    let partner_id = couple
        .partner_of(&user_id)
        .ok_or_else(|| anyhow::anyhow!("couple {} does not contain {}", couple.id, user_id))?
        .to_string();
    let partner = users::get_user_public(&state.pool, &partner_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("partner {partner_id} missing"))?;

    Ok(Json(Some(CoupleWithPartner { couple, partner })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    #[serde(default)]
    pub couple_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub couple_id: Option<Uuid>,
}

/// POST /validate — membership check used by route guards and the room-join
/// handshake. Never errors: malformed or unknown input is just invalid.
pub async fn validate(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<ValidateRequest>,
) -> ApiResult<Json<ValidateResponse>> {
    let Some(couple_id) = req
        .couple_id
        .as_deref()
        .and_then(|raw| Uuid::parse_str(raw).ok())
    else {
        return Ok(Json(ValidateResponse {
            valid: false,
            couple_id: None,
        }));
    };

    let valid = couples::relation_is_valid(&state.pool, couple_id, &user_id).await?;

    Ok(Json(ValidateResponse {
        valid,
        couple_id: valid.then_some(couple_id),
    }))
}

/// POST /unbind — dissolve the caller's couple. Events go first, the couple
/// row second, in one transaction; the room is notified and torn down after
/// commit.
pub async fn unbind(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Ack>> {
    let mut tx = state.pool.begin().await?;

    let Some(couple) = couples::active_couple_for(&mut *tx, &user_id).await? else {
        return Err(ApiError::NotFound("未找到绑定关系".to_string()));
    };

    let events_removed = crate::db::events::delete_events_for_couple(&mut *tx, couple.id).await?;
    couples::delete_couple(&mut *tx, couple.id).await?;
    tx.commit().await?;

    state.rooms.notify_unbound(couple.id).await;
    tracing::info!(couple = %couple.id, events_removed, "couple unbound");

    Ok(Json(Ack::ok()))
}
