//! Models for server-tracked login sessions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::types::{SessionId, UserId};

#[derive(Debug, Clone, Serialize, FromRow)]
/// Database representation of a login session.
///
/// Rows are never mutated except to flip `is_active` off, so inactive rows double as an audit
/// trail until the cleanup job purges them.
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    /// SHA-256 hex digest of the opaque session token.
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub deactivated_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Whether the session can still back a refresh at `now`.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now < self.expires_at
    }
}

/// What the transport knows about the client opening a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMetadata {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: UserId,
    pub token_hash: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn from_new(new: NewSession, created_at: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            user_id: new.user_id,
            token_hash: new.token_hash,
            user_agent: new.user_agent,
            ip_address: new.ip_address,
            created_at,
            expires_at: new.expires_at,
            is_active: true,
            deactivated_at: None,
        }
    }
}
