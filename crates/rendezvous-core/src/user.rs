use rendezvous_db::{users, DbPool};
use rendezvous_models::{LatLng, LocationInfo, UserRole};

use crate::error::CoreError;
use crate::session::location_to_json;

/// Create a per-session user identity. Users are not accounts: they exist
/// only inside the session they were created for.
pub async fn create_user(
    pool: &DbPool,
    session_id: i64,
    username: &str,
    role: UserRole,
    location: Option<LatLng>,
) -> Result<users::UserRow, CoreError> {
    rendezvous_util::validation::validate_username(username)
        .map_err(|e| CoreError::BadRequest(format!("invalid username: {e}")))?;
    if let Some(point) = location {
        rendezvous_util::validation::validate_coordinates(point.lat, point.lng)
            .map_err(|e| CoreError::BadRequest(format!("invalid location: {e}")))?;
    }

    let id = rendezvous_util::snowflake::generate(1);
    let location_json = location
        .map(|point| location_to_json(&LocationInfo::manual(point)))
        .transpose()?;

    let row = users::create_user(
        pool,
        id,
        username.trim(),
        session_id,
        role.as_str(),
        location_json.as_ref(),
    )
    .await?;
    Ok(row)
}

pub async fn get_user(pool: &DbPool, user_id: i64) -> Result<users::UserRow, CoreError> {
    users::get_user_by_id(pool, user_id)
        .await?
        .ok_or(CoreError::NotFound)
}
