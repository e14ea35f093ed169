use crate::{DbError, DbPool};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    pub id: i64,
    pub status: String,
    pub created_by: i64,
    pub invite_token: String,
    pub computed_location: Option<serde_json::Value>,
    pub override_location: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

const SESSION_COLUMNS: &str = "id, status, created_by, invite_token, computed_location, override_location, created_at, updated_at, ended_at";

/// Create a session and its initiator user atomically. The user row is
/// written first to match the reference order; neither table carries a
/// foreign key to the other, so insert order is free but the transaction
/// keeps a crash from leaving an orphan on either side.
#[allow(clippy::too_many_arguments)]
pub async fn create_session_with_initiator(
    pool: &DbPool,
    session_id: i64,
    user_id: i64,
    username: &str,
    role: &str,
    user_location: Option<&serde_json::Value>,
    invite_token: &str,
) -> Result<(SessionRow, crate::users::UserRow), DbError> {
    let mut tx = pool.begin().await?;

    let user = sqlx::query_as::<_, crate::users::UserRow>(
        "INSERT INTO users (id, username, session_id, role, location)
         VALUES (?1, ?2, ?3, ?4, ?5)
         RETURNING id, username, session_id, role, location, created_at, updated_at",
    )
    .bind(user_id)
    .bind(username)
    .bind(session_id)
    .bind(role)
    .bind(user_location)
    .fetch_one(&mut *tx)
    .await?;

    let session = sqlx::query_as::<_, SessionRow>(
        "INSERT INTO sessions (id, status, created_by, invite_token)
         VALUES (?1, 'active', ?2, ?3)
         RETURNING id, status, created_by, invite_token, computed_location, override_location, created_at, updated_at, ended_at",
    )
    .bind(session_id)
    .bind(user_id)
    .bind(invite_token)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok((session, user))
}

pub async fn get_session(pool: &DbPool, id: i64) -> Result<Option<SessionRow>, DbError> {
    let row = sqlx::query_as::<_, SessionRow>(&format!(
        "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Mark a session ended. Returns None when the session is missing or has
/// already ended; the status guard lives in the WHERE clause so concurrent
/// end requests cannot both succeed.
pub async fn end_session(pool: &DbPool, id: i64) -> Result<Option<SessionRow>, DbError> {
    let row = sqlx::query_as::<_, SessionRow>(&format!(
        "UPDATE sessions
         SET status = 'ended', ended_at = datetime('now'), updated_at = datetime('now')
         WHERE id = ?1 AND status = 'active'
         RETURNING {SESSION_COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn set_override_location(
    pool: &DbPool,
    id: i64,
    location: &serde_json::Value,
) -> Result<Option<SessionRow>, DbError> {
    let row = sqlx::query_as::<_, SessionRow>(&format!(
        "UPDATE sessions
         SET override_location = ?2, updated_at = datetime('now')
         WHERE id = ?1 AND status = 'active'
         RETURNING {SESSION_COLUMNS}"
    ))
    .bind(id)
    .bind(location)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Write the computed meeting point. The IS NULL guard makes the write
/// first-wins: once a session has a computed location it keeps it.
pub async fn set_computed_location(
    pool: &DbPool,
    id: i64,
    location: &serde_json::Value,
) -> Result<Option<SessionRow>, DbError> {
    let row = sqlx::query_as::<_, SessionRow>(&format!(
        "UPDATE sessions
         SET computed_location = ?2, updated_at = datetime('now')
         WHERE id = ?1 AND status = 'active' AND computed_location IS NULL
         RETURNING {SESSION_COLUMNS}"
    ))
    .bind(id)
    .bind(location)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use serde_json::json;

    async fn test_pool() -> DbPool {
        let pool = create_pool("sqlite::memory:", 1).await.expect("pool");
        run_migrations(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn create_and_fetch_session() {
        let pool = test_pool().await;
        let (session, user) = create_session_with_initiator(
            &pool,
            10,
            20,
            "ada",
            "initiator",
            None,
            "tok-1",
        )
        .await
        .expect("create");

        assert_eq!(session.id, 10);
        assert_eq!(session.status, "active");
        assert_eq!(session.created_by, 20);
        assert_eq!(user.session_id, 10);
        assert_eq!(user.role, "initiator");

        let fetched = get_session(&pool, 10).await.expect("get").expect("exists");
        assert_eq!(fetched.invite_token, "tok-1");
        assert!(fetched.computed_location.is_none());
        assert!(fetched.ended_at.is_none());
    }

    #[tokio::test]
    async fn invite_tokens_are_unique() {
        let pool = test_pool().await;
        create_session_with_initiator(&pool, 1, 2, "a", "initiator", None, "dup")
            .await
            .expect("first");
        let err = create_session_with_initiator(&pool, 3, 4, "b", "initiator", None, "dup")
            .await
            .expect_err("duplicate token must fail");
        assert!(matches!(err, DbError::Sqlx(_)));
    }

    #[tokio::test]
    async fn end_session_is_single_shot() {
        let pool = test_pool().await;
        create_session_with_initiator(&pool, 1, 2, "a", "initiator", None, "t")
            .await
            .expect("create");

        let ended = end_session(&pool, 1).await.expect("end").expect("first end");
        assert_eq!(ended.status, "ended");
        assert!(ended.ended_at.is_some());

        assert!(end_session(&pool, 1).await.expect("end again").is_none());
        assert!(end_session(&pool, 999).await.expect("missing").is_none());
    }

    #[tokio::test]
    async fn computed_location_writes_once() {
        let pool = test_pool().await;
        create_session_with_initiator(&pool, 1, 2, "a", "initiator", None, "t")
            .await
            .expect("create");

        let loc = json!({"lat": 1.5, "lng": 2.5, "source": "automatic", "updated_at": "2026-08-06T00:00:00Z"});
        let row = set_computed_location(&pool, 1, &loc)
            .await
            .expect("set")
            .expect("first write");
        assert_eq!(row.computed_location.as_ref().unwrap()["lat"], 1.5);

        let again = json!({"lat": 9.0, "lng": 9.0, "source": "automatic", "updated_at": "2026-08-06T00:00:00Z"});
        assert!(set_computed_location(&pool, 1, &again)
            .await
            .expect("second write")
            .is_none());
    }

    #[tokio::test]
    async fn override_requires_active_session() {
        let pool = test_pool().await;
        create_session_with_initiator(&pool, 1, 2, "a", "initiator", None, "t")
            .await
            .expect("create");

        let loc = json!({"lat": 3.0, "lng": 4.0, "source": "manual", "updated_at": "2026-08-06T00:00:00Z"});
        let row = set_override_location(&pool, 1, &loc)
            .await
            .expect("set")
            .expect("active session");
        assert_eq!(row.override_location.as_ref().unwrap()["lng"], 4.0);

        end_session(&pool, 1).await.expect("end");
        assert!(set_override_location(&pool, 1, &loc)
            .await
            .expect("set after end")
            .is_none());
    }
}
