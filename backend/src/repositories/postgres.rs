use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{SessionStore, StoreError, UserStore};
use crate::models::session::{NewSession, Session};
use crate::models::user::{NewUser, User, UserRole};
use crate::types::{SessionId, UserId};

const USER_COLUMNS: &str = "id, email, password_hash, full_name, date_of_birth, email_verified, \
     is_active, role, created_at, updated_at";

const SESSION_COLUMNS: &str = "id, user_id, token_hash, user_agent, ip_address, created_at, \
     expires_at, is_active, deactivated_at";

/// PostgreSQL implementation of both store traits.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let query = format!(
            "INSERT INTO users (id, email, password_hash, full_name, date_of_birth, role) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(UserId::new())
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .bind(&new_user.full_name)
            .bind(new_user.date_of_birth)
            .bind(UserRole::User)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn create_session(&self, new_session: NewSession) -> Result<Session, StoreError> {
        // Plain INSERT: a duplicate token hash must fail, never upsert.
        let query = format!(
            "INSERT INTO sessions (id, user_id, token_hash, user_agent, ip_address, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {SESSION_COLUMNS}"
        );
        let session = sqlx::query_as::<_, Session>(&query)
            .bind(SessionId::new())
            .bind(new_session.user_id)
            .bind(&new_session.token_hash)
            .bind(&new_session.user_agent)
            .bind(&new_session.ip_address)
            .bind(new_session.expires_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(session)
    }

    async fn get_session_by_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, StoreError> {
        let query = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions \
             WHERE token_hash = $1 AND is_active AND expires_at > $2"
        );
        let session = sqlx::query_as::<_, Session>(&query)
            .bind(token_hash)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    async fn deactivate_session(&self, token_hash: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET is_active = FALSE, deactivated_at = NOW()
            WHERE token_hash = $1 AND is_active
            "#,
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_all_user_sessions(&self, user_id: UserId) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET is_active = FALSE, deactivated_at = NOW()
            WHERE user_id = $1 AND is_active
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn count_active_user_sessions(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM sessions
            WHERE user_id = $1 AND is_active AND expires_at > $2
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn purge_sessions(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM sessions
            WHERE (NOT is_active AND COALESCE(deactivated_at, created_at) < $1)
               OR expires_at < $1
            "#,
        )
        .bind(older_than)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
