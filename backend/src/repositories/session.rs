use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::StoreError;
use crate::models::session::{NewSession, Session};
use crate::types::UserId;

/// Server-side session records, keyed by the digest of their token.
///
/// Every method is a single-row or single-predicate operation; atomicity is the backend's job.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts a session. An existing `token_hash` is [`StoreError::Conflict`] and the stored row
    /// is left untouched.
    async fn create_session(&self, new_session: NewSession) -> Result<Session, StoreError>;

    /// Returns the session only while it is active and `now < expires_at`.
    async fn get_session_by_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, StoreError>;

    /// Flips the session inactive. Returns whether an active row was changed.
    async fn deactivate_session(&self, token_hash: &str) -> Result<bool, StoreError>;

    /// Flips every active session of the user inactive and returns how many changed.
    async fn deactivate_all_user_sessions(&self, user_id: UserId) -> Result<u64, StoreError>;

    /// Sessions of the user that could still back a refresh at `now`.
    async fn count_active_user_sessions(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Hard-deletes rows that stopped being usable (deactivated or expired) before `older_than`.
    async fn purge_sessions(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError>;
}
