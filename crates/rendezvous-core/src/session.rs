use rendezvous_db::{sessions, users, DbPool};
use rendezvous_models::{LatLng, LocationInfo, SessionStatus, UserRole};
use uuid::Uuid;

use crate::error::CoreError;
use crate::geo;

/// A freshly created session together with its initiator identity.
pub struct NewSession {
    pub session: sessions::SessionRow,
    pub initiator: users::UserRow,
}

/// A session plus everyone in it, for the info endpoint.
pub struct SessionDetails {
    pub session: sessions::SessionRow,
    pub participants: Vec<users::UserRow>,
}

pub enum JoinOutcome {
    /// The caller already had a valid identity inside this session.
    Existing(users::UserRow),
    Created(users::UserRow),
}

impl JoinOutcome {
    pub fn user(&self) -> &users::UserRow {
        match self {
            Self::Existing(user) | Self::Created(user) => user,
        }
    }
}

pub(crate) fn location_to_json(info: &LocationInfo) -> Result<serde_json::Value, CoreError> {
    serde_json::to_value(info).map_err(|e| CoreError::Internal(e.to_string()))
}

pub fn location_from_json(value: &serde_json::Value) -> Option<LocationInfo> {
    serde_json::from_value(value.clone()).ok()
}

fn is_active(session: &sessions::SessionRow) -> bool {
    SessionStatus::parse(&session.status) == Some(SessionStatus::Active)
}

/// Create a session and its initiator in one transaction and hand both back.
/// The invite token is minted here and never rotates.
pub async fn create_session(
    pool: &DbPool,
    username: &str,
    location: Option<LatLng>,
) -> Result<NewSession, CoreError> {
    rendezvous_util::validation::validate_username(username)
        .map_err(|e| CoreError::BadRequest(format!("invalid username: {e}")))?;
    if let Some(point) = location {
        rendezvous_util::validation::validate_coordinates(point.lat, point.lng)
            .map_err(|e| CoreError::BadRequest(format!("invalid location: {e}")))?;
    }

    let session_id = rendezvous_util::snowflake::generate(1);
    let user_id = rendezvous_util::snowflake::generate(1);
    let invite_token = Uuid::new_v4().to_string();
    let location_json = location
        .map(|point| location_to_json(&LocationInfo::manual(point)))
        .transpose()?;

    let (session, initiator) = sessions::create_session_with_initiator(
        pool,
        session_id,
        user_id,
        username.trim(),
        UserRole::Initiator.as_str(),
        location_json.as_ref(),
        &invite_token,
    )
    .await?;

    tracing::info!(session_id, "session created");
    Ok(NewSession { session, initiator })
}

/// An invite is valid only for an existing, still-active session whose token
/// matches exactly. All three failure modes look identical to the caller.
pub async fn validate_invite(
    pool: &DbPool,
    session_id: i64,
    invite_token: &str,
) -> Result<sessions::SessionRow, CoreError> {
    let session = sessions::get_session(pool, session_id).await?;
    match session {
        Some(session) if is_active(&session) && session.invite_token == invite_token => {
            Ok(session)
        }
        _ => Err(CoreError::BadRequest("Invalid invite token".into())),
    }
}

/// Join a session through its invite token. A valid authenticated identity
/// that already belongs to the session is reused; anything else gets a new
/// participant identity.
pub async fn join_session(
    pool: &DbPool,
    session_id: i64,
    invite_token: &str,
    authenticated: Option<i64>,
    username: &str,
    location: Option<LatLng>,
) -> Result<JoinOutcome, CoreError> {
    validate_invite(pool, session_id, invite_token).await?;

    if let Some(user_id) = authenticated {
        if let Some(user) = users::get_user_by_id(pool, user_id).await? {
            if user.session_id == session_id {
                return Ok(JoinOutcome::Existing(user));
            }
        }
    }

    let user =
        crate::user::create_user(pool, session_id, username, UserRole::Participant, location)
            .await?;
    tracing::info!(session_id, user_id = user.id, "participant joined");
    Ok(JoinOutcome::Created(user))
}

/// Load a session the caller belongs to, with its participant list.
pub async fn session_info(
    pool: &DbPool,
    session_id: i64,
    user_id: i64,
) -> Result<SessionDetails, CoreError> {
    let session = sessions::get_session(pool, session_id)
        .await?
        .ok_or(CoreError::NotFound)?;

    let is_member = users::get_user_by_id(pool, user_id)
        .await?
        .is_some_and(|user| user.session_id == session_id);
    if !is_member {
        return Err(CoreError::Forbidden);
    }

    let participants = users::get_session_users(pool, session_id).await?;
    Ok(SessionDetails {
        session,
        participants,
    })
}

/// The session must exist, be active, and be owned by the caller.
async fn ensure_active_initiator(
    pool: &DbPool,
    session_id: i64,
    user_id: i64,
) -> Result<sessions::SessionRow, CoreError> {
    let session = sessions::get_session(pool, session_id)
        .await?
        .filter(is_active)
        .ok_or_else(|| CoreError::BadRequest("Invalid session".into()))?;

    if session.created_by != user_id {
        return Err(CoreError::Forbidden);
    }
    Ok(session)
}

/// End a session. Single-shot: the status guard is enforced in the UPDATE,
/// so a lost race surfaces as the same "Invalid session" the pre-check gives.
pub async fn end_session(
    pool: &DbPool,
    session_id: i64,
    user_id: i64,
) -> Result<sessions::SessionRow, CoreError> {
    ensure_active_initiator(pool, session_id, user_id).await?;

    let session = sessions::end_session(pool, session_id)
        .await?
        .ok_or_else(|| CoreError::BadRequest("Invalid session".into()))?;
    tracing::info!(session_id, "session ended");
    Ok(session)
}

/// Manually pin the meeting point, replacing whatever was computed.
pub async fn override_location(
    pool: &DbPool,
    session_id: i64,
    user_id: i64,
    point: LatLng,
) -> Result<sessions::SessionRow, CoreError> {
    rendezvous_util::validation::validate_coordinates(point.lat, point.lng)
        .map_err(|e| CoreError::BadRequest(format!("invalid location: {e}")))?;
    ensure_active_initiator(pool, session_id, user_id).await?;

    let info = LocationInfo::manual(point);
    let session = sessions::set_override_location(pool, session_id, &location_to_json(&info)?)
        .await?
        .ok_or_else(|| CoreError::BadRequest("Invalid session".into()))?;
    Ok(session)
}

/// Compute and store the meeting point. Requires at least two submitted
/// locations and refuses to overwrite an existing result.
pub async fn compute_meeting_point(
    pool: &DbPool,
    session_id: i64,
    user_id: i64,
) -> Result<LocationInfo, CoreError> {
    let session = ensure_active_initiator(pool, session_id, user_id).await?;

    if session.computed_location.is_some() {
        return Err(CoreError::BadRequest(
            "Meeting point already computed".into(),
        ));
    }

    let participants = users::get_session_users(pool, session_id).await?;
    let points: Vec<LatLng> = participants
        .iter()
        .filter_map(|user| user.location.as_ref())
        .filter_map(location_from_json)
        .map(|info| info.point())
        .collect();

    if points.len() < 2 {
        return Err(CoreError::BadRequest(
            "Not enough submitted locations".into(),
        ));
    }

    let center = geo::centroid(&points)
        .ok_or_else(|| CoreError::Internal("centroid of empty point set".into()))?;
    let info = LocationInfo::automatic(center);

    sessions::set_computed_location(pool, session_id, &location_to_json(&info)?)
        .await?
        .ok_or_else(|| CoreError::BadRequest("Meeting point already computed".into()))?;

    tracing::info!(session_id, lat = info.lat, lng = info.lng, "meeting point computed");
    Ok(info)
}
