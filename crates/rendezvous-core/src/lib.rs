pub mod auth;
pub mod error;
pub mod geo;
pub mod session;
pub mod user;

use rendezvous_db::DbPool;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub jwt_expiry_seconds: u64,
    /// The public URL of this server (e.g., https://meet.example.com).
    /// Used for invite links and the Secure cookie attribute.
    pub public_url: Option<String>,
}

impl AppConfig {
    pub fn cookie_secure(&self) -> bool {
        self.public_url
            .as_deref()
            .map(|url| url.starts_with("https://"))
            .unwrap_or(false)
    }

    /// Absolute join link for an invite, when a public URL is configured.
    pub fn invite_url(&self, session_id: i64, invite_token: &str) -> Option<String> {
        self.public_url.as_deref().map(|base| {
            format!(
                "{}/s/{}/join?token={}",
                base.trim_end_matches('/'),
                session_id,
                invite_token
            )
        })
    }
}
