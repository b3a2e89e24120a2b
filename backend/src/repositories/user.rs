use async_trait::async_trait;

use super::StoreError;
use crate::models::user::{NewUser, User};
use crate::types::UserId;

/// Account lookups the auth flows depend on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a new account. A taken email is [`StoreError::Conflict`].
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError>;

    /// Exact match on the normalised email.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;
}
