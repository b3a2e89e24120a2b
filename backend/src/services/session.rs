use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::{
    models::session::{NewSession, Session, SessionMetadata},
    repositories::{SessionStore, StoreError},
    types::UserId,
    utils::{generate_session_token, hash_session_token},
};

/// Token regenerations allowed when the store reports a collision.
pub const MAX_CREATE_ATTEMPTS: u32 = 3;

/// A freshly created session together with the only copy of its raw token.
#[derive(Debug)]
pub struct StartedSession {
    pub token: String,
    pub session: Session,
}

/// Lifecycle of the revocable, server-tracked credential.
///
/// Raw tokens never reach the store; every operation hashes the presented token first.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Opens a session for `user_id`. A token collision regenerates the token and tries again, up
    /// to [`MAX_CREATE_ATTEMPTS`]; the colliding row is never replaced.
    pub async fn start(
        &self,
        user_id: UserId,
        metadata: &SessionMetadata,
    ) -> Result<StartedSession, StoreError> {
        let mut attempt = 1;
        loop {
            let token = generate_session_token();
            let new_session = NewSession {
                user_id,
                token_hash: hash_session_token(&token),
                user_agent: metadata.user_agent.clone(),
                ip_address: metadata.ip_address.clone(),
                expires_at: Utc::now() + self.ttl,
            };

            match self.store.create_session(new_session).await {
                Ok(session) => {
                    tracing::debug!(%user_id, session_id = %session.id, "Session created");
                    return Ok(StartedSession { token, session });
                }
                Err(StoreError::Conflict(constraint)) if attempt < MAX_CREATE_ATTEMPTS => {
                    tracing::warn!(
                        %user_id,
                        attempt,
                        constraint = %constraint,
                        "Session token collided with an existing session; regenerating"
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Finds the active, unexpired session behind `token`.
    pub async fn resolve(&self, token: &str) -> Result<Option<Session>, StoreError> {
        if token.is_empty() {
            return Ok(None);
        }
        self.store
            .get_session_by_token(&hash_session_token(token), Utc::now())
            .await
    }

    /// Deactivates the session behind `token`. Unknown or already inactive sessions are not an
    /// error.
    pub async fn end(&self, token: &str) -> Result<bool, StoreError> {
        if token.is_empty() {
            return Ok(false);
        }
        self.store
            .deactivate_session(&hash_session_token(token))
            .await
    }

    /// Revokes every session of the user and returns how many were usable beforehand.
    pub async fn end_all(&self, user_id: UserId) -> Result<u64, StoreError> {
        // Count first: the figure reported to the caller is the pre-revocation state.
        let active = self
            .store
            .count_active_user_sessions(user_id, Utc::now())
            .await?;
        let deactivated = self.store.deactivate_all_user_sessions(user_id).await?;
        tracing::info!(%user_id, active, deactivated, "Revoked all sessions");
        Ok(active)
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("ttl_seconds", &self.ttl.num_seconds())
            .finish_non_exhaustive()
    }
}
