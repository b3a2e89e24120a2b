//! Persistence collaborators.
//!
//! The services only see the [`UserStore`] and [`SessionStore`] capability traits. [`PgStore`] backs
//! them with PostgreSQL; [`InMemoryStore`] gives the same semantics without a database.

pub mod memory;
pub mod postgres;
pub mod session;
pub mod user;

pub use memory::InMemoryStore;
pub use postgres::PgStore;
pub use session::SessionStore;
pub use user::UserStore;

#[cfg(test)]
pub use session::MockSessionStore;
#[cfg(test)]
pub use user::MockUserStore;

/// Failures surfaced by a store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique key already exists. Carries the violated constraint.
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unique").to_string();
                return StoreError::Conflict(constraint);
            }
        }
        StoreError::Database(err)
    }
}

/// Constraint names shared by the migrations and the in-memory backend.
pub const USERS_EMAIL_CONSTRAINT: &str = "users_email_key";
pub const SESSIONS_TOKEN_CONSTRAINT: &str = "sessions_token_hash_key";
