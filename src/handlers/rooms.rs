//! HTTP surface for room management: listing, creation, join-by-code and
//! the operator cleanup trigger.
//!
//! Interactive lookups run the same expiry predicate as the scheduled
//! sweep, so an expired room is removed the moment someone touches it
//! instead of waiting for the next tick.

use crate::cleanup;
use crate::error::RoomError;
use crate::identity::{Identity, IdentityParams};
use crate::registry::{Room, Visibility};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Serialize)]
pub struct RoomSummary {
    pub room_code: String,
    pub name: String,
    pub description: String,
    pub owner: String,
    pub member_count: usize,
}

#[derive(Debug, Serialize)]
pub struct RoomDetail {
    pub room_code: String,
    pub name: String,
    pub description: String,
    pub visibility: Visibility,
    pub owner: String,
    pub member_count: usize,
    pub members: Vec<String>,
    pub is_owner: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    /// Optional user-supplied room code; generated when absent.
    #[serde(default)]
    pub code: Option<String>,
    /// Optional explicit expiry deadline, seconds from now.
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
}

fn summarize(state: &AppState, room: &Room) -> RoomSummary {
    RoomSummary {
        room_code: room.code.clone(),
        name: room.name.clone(),
        description: room.description.clone(),
        owner: room.owner_name.clone(),
        member_count: state.memberships.count_active(&room.code),
    }
}

fn detail(state: &AppState, room: &Room, viewer: &Identity) -> RoomDetail {
    let members = state.memberships.active_members(&room.code);
    RoomDetail {
        room_code: room.code.clone(),
        name: room.name.clone(),
        description: room.description.clone(),
        visibility: room.visibility,
        owner: room.owner_name.clone(),
        member_count: members.len(),
        members: members.into_iter().map(|m| m.username).collect(),
        is_owner: viewer.id == Some(room.owner_id),
    }
}

/// `GET /api/rooms` — public rooms with active member counts. Runs the
/// on-demand expiry pass first.
pub async fn list_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummary>> {
    cleanup::sweep_expired(&state, Instant::now());

    let mut rooms: Vec<RoomSummary> = state
        .registry
        .list_public()
        .iter()
        .map(|room| summarize(&state, room))
        .collect();
    rooms.sort_by(|a, b| a.room_code.cmp(&b.room_code));
    Json(rooms)
}

/// `POST /api/rooms` — create a room; the creator joins as its first
/// member.
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IdentityParams>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomDetail>), RoomError> {
    let identity: Identity = params.into();
    let (user_id, username) = match (identity.id, identity.username.as_deref()) {
        (Some(id), Some(name)) => (id, name.to_string()),
        _ => return Err(RoomError::Unauthorized),
    };

    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(RoomError::InvalidInput("room name is required".to_string()));
    }

    let room = state.registry.create(
        name,
        req.description.unwrap_or_default(),
        req.visibility.unwrap_or(Visibility::Public),
        user_id,
        username.clone(),
        req.code.as_deref(),
    )?;

    state.join_room_member(&room, user_id, &username);

    // After the creator's join, or the activity touch would clear it.
    if let Some(ttl) = req.ttl_seconds {
        state
            .registry
            .set_expiry(&room.code, Instant::now() + Duration::from_secs(ttl));
    }

    tracing::info!(room_code = %room.code, owner = %username, "Room created");

    Ok((StatusCode::CREATED, Json(detail(&state, &room, &identity))))
}

/// `GET /api/rooms/:room_code` — join-by-code. Deletes the room on the
/// spot when its expiry has passed; enforces capacity; registers the
/// caller as an active member. Well-known protected codes (the global
/// room) are created on first join.
pub async fn room_detail(
    State(state): State<Arc<AppState>>,
    Path(room_code): Path<String>,
    Query(params): Query<IdentityParams>,
) -> Result<Json<RoomDetail>, RoomError> {
    let identity: Identity = params.into();
    let (user_id, username) = match (identity.id, identity.username.as_deref()) {
        (Some(id), Some(name)) => (id, name.to_string()),
        _ => return Err(RoomError::Unauthorized),
    };

    let room = match state.registry.find_by_code(&room_code) {
        Ok(room) => room,
        Err(RoomError::NotFound(code)) if state.is_protected(&code) => {
            let (room, created) = state.registry.get_or_create_by_code(
                &code,
                "Global Chat Room",
                "A public space where everyone can chat and study together!",
                user_id,
                &username,
            )?;
            if created {
                tracing::info!(room_code = %room.code, "Global room created on first join");
            }
            room
        }
        Err(e) => return Err(e),
    };

    if !state.is_protected(&room.code) && room.is_expired(Instant::now()) {
        state.delete_room(&room.code);
        return Err(RoomError::Expired(room.code));
    }

    state.ensure_capacity(&room, user_id)?;

    state.join_room_member(&room, user_id, &username);
    Ok(Json(detail(&state, &room, &identity)))
}

/// `POST /api/rooms/:room_code/leave` — deactivate the caller's
/// membership; the row is preserved.
pub async fn leave_room(
    State(state): State<Arc<AppState>>,
    Path(room_code): Path<String>,
    Query(params): Query<IdentityParams>,
) -> Result<Json<serde_json::Value>, RoomError> {
    let identity: Identity = params.into();
    let user_id = identity.id.ok_or(RoomError::Unauthorized)?;

    let room = state.registry.find_by_code(&room_code)?;
    if !state.is_protected(&room.code) && room.is_expired(Instant::now()) {
        state.delete_room(&room.code);
        return Err(RoomError::Expired(room.code));
    }

    let left = state.memberships.leave(user_id, &room.code);
    Ok(Json(serde_json::json!({ "left": left })))
}

/// `POST /api/admin/cleanup` — operator one-shot sweep, identical to a
/// scheduled tick.
pub async fn run_cleanup(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let deleted = cleanup::run_all_cleanup(&state).await;
    Json(serde_json::json!({ "deleted": deleted }))
}
