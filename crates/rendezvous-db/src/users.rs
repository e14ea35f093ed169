use crate::{DbError, DbPool};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub session_id: i64,
    pub role: String,
    pub location: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

pub async fn create_user(
    pool: &DbPool,
    id: i64,
    username: &str,
    session_id: i64,
    role: &str,
    location: Option<&serde_json::Value>,
) -> Result<UserRow, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (id, username, session_id, role, location)
         VALUES (?1, ?2, ?3, ?4, ?5)
         RETURNING id, username, session_id, role, location, created_at, updated_at",
    )
    .bind(id)
    .bind(username)
    .bind(session_id)
    .bind(role)
    .bind(location)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn get_user_by_id(pool: &DbPool, id: i64) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, session_id, role, location, created_at, updated_at
         FROM users WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn get_session_users(pool: &DbPool, session_id: i64) -> Result<Vec<UserRow>, DbError> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, session_id, role, location, created_at, updated_at
         FROM users WHERE session_id = ?1
         ORDER BY created_at ASC, id ASC",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
