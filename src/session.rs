//! Server-side sessions.
//!
//! The browser only carries a random session id in a signed cookie; the
//! bearer token stays in the in-memory store and expires with it.

use crate::errors::AppError;
use crate::handlers::AppState;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use moka::future::Cache;
use sha2::{Digest, Sha512};
use std::time::Duration;

pub const SESSION_COOKIE: &str = "lead_sync_session";
pub const OAUTH_STATE_COOKIE: &str = "lead_sync_oauth_state";

/// What an authenticated browser session holds.
#[derive(Debug, Clone)]
pub struct UserSession {
    pub access_token: String,
    pub user_id: String,
    pub display_name: String,
    pub email: Option<String>,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Cache<String, UserSession>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(10_000)
                .build(),
        }
    }

    /// Stores `session` under a fresh id and returns the id.
    pub async fn create(&self, session: UserSession) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.sessions.insert(id.clone(), session).await;
        id
    }

    pub async fn get(&self, id: &str) -> Option<UserSession> {
        self.sessions.get(id).await
    }

    pub async fn remove(&self, id: &str) {
        self.sessions.invalidate(id).await;
    }
}

/// Cookie signing key. Derived from `SECRET_KEY` when set, random otherwise.
pub fn cookie_key(secret: Option<&str>) -> Key {
    match secret {
        Some(secret) => {
            let digest = Sha512::digest(secret.as_bytes());
            Key::from(digest.as_slice())
        }
        None => Key::generate(),
    }
}

fn private_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn session_cookie(session_id: String) -> Cookie<'static> {
    private_cookie(SESSION_COOKIE, session_id)
}

pub fn state_cookie(state: String) -> Cookie<'static> {
    private_cookie(OAUTH_STATE_COOKIE, state)
}

/// Cookie shape used for removal; path must match the one set.
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

/// Extractor for routes that require a logged-in user.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub session_id: String,
    pub user: UserSession,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = SignedCookieJar::from_headers(&parts.headers, state.cookie_key.clone());

        let session_id = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or_else(|| AppError::Unauthorized("Missing session cookie".to_string()))?;

        let user = state
            .sessions
            .get(&session_id)
            .await
            .ok_or_else(|| AppError::Unauthorized("Session expired or unknown".to_string()))?;

        Ok(AuthSession { session_id, user })
    }
}
