use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{error::AppError, models::UserResponse, routes::AppState};

/// How long a login lasts unless configured otherwise
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Debug, Clone)]
struct Session {
    user: UserResponse,
    expires_at: Instant,
}

/// Logged-in users, keyed by the bearer token handed out at login
///
/// Sessions expire `ttl` after login. Expired sessions stop resolving at
/// once and are swept out whenever a new session opens.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::default(),
            ttl,
        }
    }

    /// Starts a session for `user` and returns its token
    pub async fn open(&self, user: UserResponse) -> Uuid {
        let token = Uuid::new_v4();
        let now = Instant::now();

        let mut sessions = self.inner.write().await;
        sessions.retain(|_, session| session.expires_at > now);
        sessions.insert(
            token,
            Session {
                user,
                expires_at: now + self.ttl,
            },
        );

        token
    }

    pub async fn resolve(&self, token: &Uuid) -> Option<UserResponse> {
        self.inner
            .read()
            .await
            .get(token)
            .filter(|session| session.expires_at > Instant::now())
            .map(|session| session.user.clone())
    }

    /// Ends a session; returns whether it existed
    pub async fn close(&self, token: &Uuid) -> bool {
        self.inner.write().await.remove(token).is_some()
    }

    /// Number of sessions held, expired ones included until the next sweep
    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

/// Reads the session token from an `Authorization: Bearer <token>` header
pub fn bearer_token(parts: &Parts) -> Option<Uuid> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
}

/// The user behind the current request's session
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub token: Uuid,
    pub user: UserResponse,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;
        let user = state
            .sessions
            .resolve(&token)
            .await
            .ok_or(AppError::Unauthorized)?;

        Ok(CurrentUser { token, user })
    }
}
