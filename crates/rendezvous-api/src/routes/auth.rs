use axum::{extract::State, Json};
use rendezvous_core::AppState;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthUser;

/// Who the presented token belongs to.
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let user = rendezvous_core::user::get_user(&state.db, auth.user_id)
        .await
        .map_err(|_| ApiError::Unauthorized)?;

    Ok(Json(json!({
        "user": {
            "username": user.username,
            "role": user.role,
            "session_id": user.session_id.to_string(),
        }
    })))
}
