use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use rendezvous_core::{session, AppState};
use rendezvous_models::LatLng;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{AuthUser, MaybeAuthUser, AUTH_COOKIE_NAME};

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    pub username: String,
    #[serde(default)]
    pub location: Option<LatLng>,
}

#[derive(Deserialize)]
pub struct JoinSessionRequest {
    pub username: String,
    #[serde(default)]
    pub location: Option<LatLng>,
}

#[derive(Deserialize)]
pub struct InviteTokenQuery {
    pub token: Option<String>,
}

#[derive(Deserialize)]
pub struct OverrideLocationRequest {
    pub lat: f64,
    pub lng: f64,
}

fn build_auth_cookie(token: &str, ttl_seconds: u64, secure: bool) -> String {
    let secure_attr = if secure { "; Secure" } else { "" };
    format!(
        "{name}={value}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age}{secure}",
        name = AUTH_COOKIE_NAME,
        value = token,
        max_age = ttl_seconds,
        secure = secure_attr,
    )
}

fn header_value(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value).map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))
}

fn issue_token(state: &AppState, user_id: i64) -> Result<(String, HeaderValue), ApiError> {
    let token = rendezvous_core::auth::create_token(
        user_id,
        &state.config.jwt_secret,
        state.config.jwt_expiry_seconds,
    )
    .map_err(|e| ApiError::Internal(anyhow::anyhow!(e.to_string())))?;
    let cookie = build_auth_cookie(
        &token,
        state.config.jwt_expiry_seconds,
        state.config.cookie_secure(),
    );
    Ok((token.clone(), header_value(&cookie)?))
}

fn session_json(row: &rendezvous_db::sessions::SessionRow) -> Value {
    json!({
        "id": row.id.to_string(),
        "status": row.status,
        "created_by": row.created_by.to_string(),
        "invite_token": row.invite_token,
        "computed_location": row.computed_location,
        "override_location": row.override_location,
        "created_at": row.created_at.to_rfc3339(),
        "updated_at": row.updated_at.map(|t| t.to_rfc3339()),
        "ended_at": row.ended_at.map(|t| t.to_rfc3339()),
    })
}

fn participant_json(user: &rendezvous_db::users::UserRow) -> Value {
    // Participants only ever see each other's raw coordinates, not the
    // provenance metadata stored alongside them.
    let location = user
        .location
        .as_ref()
        .and_then(session::location_from_json)
        .map(|info| json!({ "lat": info.lat, "lng": info.lng }));
    json!({
        "username": user.username,
        "role": user.role,
        "location": location,
    })
}

fn require_invite_token(query: InviteTokenQuery) -> Result<String, ApiError> {
    query
        .token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing invite token".into()))
}

pub async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new = session::create_session(&state.db, &body.username, body.location).await?;
    let (token, cookie) = issue_token(&state, new.initiator.id)?;
    let invite_url = state
        .config
        .invite_url(new.session.id, &new.session.invite_token);

    Ok((
        StatusCode::CREATED,
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(json!({
            "session": {
                "id": new.session.id.to_string(),
                "invite_token": new.session.invite_token,
                "invite_url": invite_url,
            },
            "token": token,
        })),
    ))
}

pub async fn get_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(session_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let details = session::session_info(&state.db, session_id, auth.user_id).await?;

    let mut body = session_json(&details.session);
    body["participants"] = Value::Array(
        details
            .participants
            .iter()
            .map(participant_json)
            .collect(),
    );
    Ok(Json(json!({ "session": body })))
}

pub async fn validate_session(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Query(query): Query<InviteTokenQuery>,
) -> Result<Json<Value>, ApiError> {
    let token = require_invite_token(query)?;
    session::validate_invite(&state.db, session_id, &token).await?;
    Ok(Json(json!({ "message": "ok" })))
}

pub async fn join_session(
    State(state): State<AppState>,
    auth: MaybeAuthUser,
    Path(session_id): Path<i64>,
    Query(query): Query<InviteTokenQuery>,
    Json(body): Json<JoinSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let invite_token = require_invite_token(query)?;
    let authenticated = auth.0.map(|user| user.user_id);

    let outcome = session::join_session(
        &state.db,
        session_id,
        &invite_token,
        authenticated,
        &body.username,
        body.location,
    )
    .await?;

    let (token, cookie) = issue_token(&state, outcome.user().id)?;
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(json!({ "message": "ok", "token": token })),
    ))
}

pub async fn override_location(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(session_id): Path<i64>,
    Json(body): Json<OverrideLocationRequest>,
) -> Result<Json<Value>, ApiError> {
    let point = LatLng {
        lat: body.lat,
        lng: body.lng,
    };
    let updated = session::override_location(&state.db, session_id, auth.user_id, point).await?;
    Ok(Json(json!({ "session": session_json(&updated) })))
}

pub async fn end_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(session_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let updated = session::end_session(&state.db, session_id, auth.user_id).await?;
    Ok(Json(json!({ "session": session_json(&updated) })))
}

pub async fn compute_meeting_point(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(session_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let computed = session::compute_meeting_point(&state.db, session_id, auth.user_id).await?;
    Ok(Json(json!({ "computed_location": computed })))
}
