//! In-memory store with the same semantics as [`PgStore`](super::PgStore).
//!
//! Used by the integration tests and handy for running the service without a database.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{
    SessionStore, StoreError, UserStore, SESSIONS_TOKEN_CONSTRAINT, USERS_EMAIL_CONSTRAINT,
};
use crate::models::session::{NewSession, Session};
use crate::models::user::{NewUser, User};
use crate::types::UserId;

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    users_by_email: HashMap<String, UserId>,
    /// Keyed by token hash, which is unique.
    sessions: HashMap<String, Session>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every session row of the user, active or not, oldest first.
    pub async fn sessions_for_user(&self, user_id: UserId) -> Vec<Session> {
        let tables = self.tables.read().await;
        let mut sessions: Vec<Session> = tables
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.created_at);
        sessions
    }

    /// Toggles an account's `is_active` flag. Returns false if the user does not exist.
    pub async fn set_user_active(&self, user_id: UserId, active: bool) -> bool {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&user_id) {
            Some(user) => {
                user.is_active = active;
                user.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users_by_email.contains_key(&new_user.email) {
            return Err(StoreError::Conflict(USERS_EMAIL_CONSTRAINT.to_string()));
        }
        let user = User::from_new(new_user);
        tables.users_by_email.insert(user.email.clone(), user.id);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users_by_email
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn create_session(&self, new_session: NewSession) -> Result<Session, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.sessions.contains_key(&new_session.token_hash) {
            return Err(StoreError::Conflict(SESSIONS_TOKEN_CONSTRAINT.to_string()));
        }
        let session = Session::from_new(new_session, Utc::now());
        tables
            .sessions
            .insert(session.token_hash.clone(), session.clone());
        Ok(session)
    }

    async fn get_session_by_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .get(token_hash)
            .filter(|s| s.is_usable(now))
            .cloned())
    }

    async fn deactivate_session(&self, token_hash: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.sessions.get_mut(token_hash) {
            Some(session) if session.is_active => {
                session.is_active = false;
                session.deactivated_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn deactivate_all_user_sessions(&self, user_id: UserId) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let mut changed = 0;
        for session in tables
            .sessions
            .values_mut()
            .filter(|s| s.user_id == user_id && s.is_active)
        {
            session.is_active = false;
            session.deactivated_at = Some(now);
            changed += 1;
        }
        Ok(changed)
    }

    async fn count_active_user_sessions(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        let count = tables
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && s.is_usable(now))
            .count();
        Ok(count as u64)
    }

    async fn purge_sessions(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, s| {
            let deactivated_long_ago =
                !s.is_active && s.deactivated_at.unwrap_or(s.created_at) < older_than;
            !(deactivated_long_ago || s.expires_at < older_than)
        });
        Ok((before - tables.sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password_hash: "$argon2id$placeholder".into(),
            full_name: "Test User".into(),
            date_of_birth: None,
        }
    }

    fn new_session(user_id: UserId, token_hash: &str, ttl: Duration) -> NewSession {
        NewSession {
            user_id,
            token_hash: token_hash.into(),
            user_agent: Some("test-agent".into()),
            ip_address: Some("127.0.0.1".into()),
            expires_at: Utc::now() + ttl,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let store = InMemoryStore::new();
        store.create_user(new_user("a@example.com")).await.expect("first");
        let err = store
            .create_user(new_user("a@example.com"))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, StoreError::Conflict(c) if c == USERS_EMAIL_CONSTRAINT));
    }

    #[tokio::test]
    async fn users_are_found_by_email_and_id() {
        let store = InMemoryStore::new();
        let user = store.create_user(new_user("a@example.com")).await.expect("user");
        let by_email = store
            .get_user_by_email("a@example.com")
            .await
            .expect("lookup")
            .expect("found");
        assert_eq!(by_email.id, user.id);
        assert!(store.get_user_by_id(user.id).await.expect("lookup").is_some());
        assert!(store
            .get_user_by_email("b@example.com")
            .await
            .expect("lookup")
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_token_is_conflict_and_does_not_overwrite() {
        let store = InMemoryStore::new();
        let first_owner = UserId::new();
        store
            .create_session(new_session(first_owner, "h1", Duration::days(1)))
            .await
            .expect("first");
        let err = store
            .create_session(new_session(UserId::new(), "h1", Duration::days(1)))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, StoreError::Conflict(_)));

        let kept = store
            .get_session_by_token("h1", Utc::now())
            .await
            .expect("lookup")
            .expect("found");
        assert_eq!(kept.user_id, first_owner);
    }

    #[tokio::test]
    async fn lookup_hides_expired_and_inactive_sessions() {
        let store = InMemoryStore::new();
        let user_id = UserId::new();
        store
            .create_session(new_session(user_id, "live", Duration::days(1)))
            .await
            .expect("live");
        store
            .create_session(new_session(user_id, "stale", Duration::seconds(-1)))
            .await
            .expect("stale");

        let now = Utc::now();
        assert!(store.get_session_by_token("live", now).await.expect("q").is_some());
        assert!(store.get_session_by_token("stale", now).await.expect("q").is_none());

        assert!(store.deactivate_session("live").await.expect("deactivate"));
        assert!(store.get_session_by_token("live", now).await.expect("q").is_none());
    }

    #[tokio::test]
    async fn deactivation_is_idempotent() {
        let store = InMemoryStore::new();
        let user_id = UserId::new();
        store
            .create_session(new_session(user_id, "h", Duration::days(1)))
            .await
            .expect("create");
        assert!(store.deactivate_session("h").await.expect("first"));
        assert!(!store.deactivate_session("h").await.expect("second"));
        assert!(!store.deactivate_session("missing").await.expect("missing"));

        let rows = store.sessions_for_user(user_id).await;
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].is_active);
        assert!(rows[0].deactivated_at.is_some());
    }

    #[tokio::test]
    async fn bulk_deactivation_only_touches_the_user() {
        let store = InMemoryStore::new();
        let alice = UserId::new();
        let bob = UserId::new();
        for hash in ["a1", "a2", "a3"] {
            store
                .create_session(new_session(alice, hash, Duration::days(1)))
                .await
                .expect("create");
        }
        store
            .create_session(new_session(bob, "b1", Duration::days(1)))
            .await
            .expect("create");

        let now = Utc::now();
        assert_eq!(store.count_active_user_sessions(alice, now).await.expect("count"), 3);
        assert_eq!(store.deactivate_all_user_sessions(alice).await.expect("all"), 3);
        assert_eq!(store.deactivate_all_user_sessions(alice).await.expect("again"), 0);
        assert_eq!(store.count_active_user_sessions(alice, now).await.expect("count"), 0);
        assert_eq!(store.count_active_user_sessions(bob, now).await.expect("count"), 1);
    }

    #[tokio::test]
    async fn purge_removes_only_long_dead_rows() {
        let store = InMemoryStore::new();
        let user_id = UserId::new();
        store
            .create_session(new_session(user_id, "live", Duration::days(1)))
            .await
            .expect("live");
        store
            .create_session(new_session(user_id, "expired", Duration::days(-10)))
            .await
            .expect("expired");
        store
            .create_session(new_session(user_id, "revoked", Duration::days(1)))
            .await
            .expect("revoked");
        store.deactivate_session("revoked").await.expect("deactivate");

        let purged = store
            .purge_sessions(Utc::now() - Duration::days(5))
            .await
            .expect("purge");
        assert_eq!(purged, 1);

        let remaining: Vec<String> = store
            .sessions_for_user(user_id)
            .await
            .into_iter()
            .map(|s| s.token_hash)
            .collect();
        assert_eq!(remaining.len(), 2);
        assert!(!remaining.contains(&"expired".to_string()));
    }
}
