//! Login, refresh, logout and logout-all orchestration.

use std::{future::Future, sync::Arc};

use chrono::NaiveDate;
use tokio::task::JoinError;

use crate::{
    models::{
        session::SessionMetadata,
        user::{normalize_email, NewUser, User},
    },
    repositories::{SessionStore, StoreError, UserStore},
    services::session::SessionManager,
    types::UserId,
    utils::{
        AccessTokenClaims, IssuedToken, PasswordError, PasswordHasher, TokenCodec, TokenError,
        TokenSubject,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Wrong password, unknown email and disabled account all collapse into this.
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("email is already registered")]
    EmailTaken,
    /// Missing, unknown, revoked or expired session token.
    #[error("session is not valid")]
    InvalidSession,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error("background task failed: {0}")]
    Task(#[from] JoinError),
}

#[derive(Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
    pub metadata: SessionMetadata,
}

/// Both credentials produced by a successful login.
#[derive(Debug)]
pub struct LoginOutcome {
    pub access: IssuedToken,
    pub session_token: String,
    pub user_id: UserId,
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: SessionManager,
    tokens: Arc<dyn TokenCodec>,
    hasher: PasswordHasher,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: SessionManager,
        tokens: Arc<dyn TokenCodec>,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            users,
            sessions,
            tokens,
            hasher,
        }
    }

    /// Wires the service over a single backend that provides both stores.
    pub fn with_store<S>(
        store: Arc<S>,
        session_ttl: chrono::Duration,
        tokens: Arc<dyn TokenCodec>,
        hasher: PasswordHasher,
    ) -> Self
    where
        S: UserStore + SessionStore + 'static,
    {
        let users: Arc<dyn UserStore> = store.clone();
        let sessions: Arc<dyn SessionStore> = store;
        Self::new(
            users,
            SessionManager::new(sessions, session_ttl),
            tokens,
            hasher,
        )
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        let email = normalize_email(&registration.email);
        if self.users.get_user_by_email(&email).await?.is_some() {
            tracing::debug!("Registration rejected: email already registered");
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.hash_password(registration.password).await?;
        let new_user = NewUser {
            email,
            password_hash,
            full_name: registration.full_name.trim().to_string(),
            date_of_birth: registration.date_of_birth,
        };

        match self.users.create_user(new_user).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, role = user.role.as_str(), "User registered");
                Ok(user)
            }
            // Lost a race with a concurrent registration of the same email.
            Err(StoreError::Conflict(_)) => Err(AuthError::EmailTaken),
            Err(err) => Err(err.into()),
        }
    }

    /// Verifies the password, issues an access token, then opens a session.
    pub async fn login(&self, input: LoginInput) -> Result<LoginOutcome, AuthError> {
        let email = normalize_email(&input.email);
        let Some(user) = self.users.get_user_by_email(&email).await? else {
            // Spend the same hashing work so response time does not reveal unknown accounts.
            let hasher = self.hasher.clone();
            tokio::task::spawn_blocking(move || hasher.verify_dummy(&input.password)).await?;
            tracing::debug!("Login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        let verified = self
            .verify_password(user.password_hash.clone(), input.password)
            .await?;
        if !verified || !user.is_active {
            tracing::debug!(user_id = %user.id, "Login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let access = self.tokens.issue(TokenSubject::from(&user))?;
        let started = self.sessions.start(user.id, &input.metadata).await?;
        tracing::info!(user_id = %user.id, session_id = %started.session.id, "User logged in");

        Ok(LoginOutcome {
            access,
            session_token: started.token,
            user_id: user.id,
        })
    }

    /// Issues a new access token for the user behind an active session. Never rotates the session.
    pub async fn refresh(&self, session_token: Option<&str>) -> Result<IssuedToken, AuthError> {
        let token = session_token.ok_or(AuthError::InvalidSession)?;
        let session = self
            .sessions
            .resolve(token)
            .await?
            .ok_or(AuthError::InvalidSession)?;

        let user = match self.users.get_user_by_id(session.user_id).await? {
            Some(user) if user.is_active => user,
            _ => {
                tracing::warn!(
                    user_id = %session.user_id,
                    session_id = %session.id,
                    "Session owner is missing or disabled"
                );
                return Err(AuthError::InvalidSession);
            }
        };

        let access = self.tokens.issue(TokenSubject::from(&user))?;
        tracing::debug!(user_id = %user.id, session_id = %session.id, "Access token refreshed");
        Ok(access)
    }

    /// Ends the session if there is one. Returns whether an active session was deactivated.
    pub async fn logout(&self, session_token: Option<&str>) -> Result<bool, AuthError> {
        let Some(token) = session_token else {
            return Ok(false);
        };
        let ended = self.sessions.end(token).await?;
        tracing::debug!(ended, "Logout");
        Ok(ended)
    }

    /// Revokes every session of an already authenticated user. Returns the number ended.
    pub async fn logout_all(&self, user_id: UserId) -> Result<u64, AuthError> {
        Ok(self.sessions.end_all(user_id).await?)
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AccessTokenClaims, AuthError> {
        Ok(self.tokens.verify(token)?)
    }

    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password)).await??;
        Ok(hash)
    }

    async fn verify_password(&self, credential: String, password: String) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let verified =
            tokio::task::spawn_blocking(move || hasher.verify(&credential, &password)).await?;
        Ok(verified)
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("sessions", &self.sessions)
            .field("hasher", &self.hasher)
            .finish_non_exhaustive()
    }
}

/// Runs a flow on its own task so a client disconnect cannot abandon it half applied.
pub async fn run_to_completion<F, T>(flow: F) -> Result<T, AuthError>
where
    F: Future<Output = Result<T, AuthError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(flow).await?
}
