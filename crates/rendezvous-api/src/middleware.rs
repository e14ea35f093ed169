use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
};
use rendezvous_core::AppState;

/// Cookie carrying the signed token, set on create/join responses.
pub const AUTH_COOKIE_NAME: &str = "rendezvous_token";

pub struct AuthUser {
    pub user_id: i64,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn cookie_token(parts: &Parts) -> Option<&str> {
    for value in parts.headers.get_all(header::COOKIE) {
        let Ok(raw) = value.to_str() else { continue };
        for pair in raw.split(';') {
            if let Some(token) = pair.trim().strip_prefix(AUTH_COOKIE_NAME) {
                if let Some(token) = token.strip_prefix('=') {
                    if !token.is_empty() {
                        return Some(token);
                    }
                }
            }
        }
    }
    None
}

fn authenticate(parts: &Parts, state: &AppState) -> Result<AuthUser, (StatusCode, &'static str)> {
    let token = bearer_token(parts)
        .or_else(|| cookie_token(parts))
        .ok_or((StatusCode::UNAUTHORIZED, "Missing auth token"))?;

    let claims = rendezvous_core::auth::validate_token(token, &state.config.jwt_secret)
        .map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid or expired token"))?;

    Ok(AuthUser {
        user_id: claims.sub,
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)
    }
}

/// Extractor for routes where a caller may or may not already have an
/// identity (the join flow). A bad token is treated as no token.
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(authenticate(parts, state).ok()))
    }
}
