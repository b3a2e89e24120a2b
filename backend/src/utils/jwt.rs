use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::{models::user::User, types::UserId};

/// The only algorithm this service signs with or accepts.
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;
/// Secrets shorter than this still work but are flagged at startup.
pub const RECOMMENDED_SECRET_LENGTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: UserId,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub email_verified: bool,
    pub iat: i64, // issued at
    pub exp: i64, // expiration time
}

/// Identity fields stamped into an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub email_verified: bool,
}

impl From<&User> for TokenSubject {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            name: user.full_name.clone(),
            email_verified: user.email_verified,
        }
    }
}

impl AccessTokenClaims {
    pub fn subject(&self) -> TokenSubject {
        TokenSubject {
            user_id: self.sub,
            email: self.email.clone(),
            name: self.name.clone(),
            email_verified: self.email_verified,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    /// Lifetime in seconds from issuance.
    pub expires_in: i64,
    pub claims: AccessTokenClaims,
}

impl IssuedToken {
    /// Unix timestamp after which the token no longer verifies.
    pub fn expires_at(&self) -> i64 {
        self.claims.exp
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("access token signing key is not configured")]
    MissingSigningKey,
    #[error("access token is invalid")]
    Invalid,
    #[error("access token has expired")]
    Expired,
    #[error("failed to sign access token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Stateless bearer-credential codec.
pub trait TokenCodec: Send + Sync {
    /// Stamps `iat`/`exp` and signs the claims.
    fn issue(&self, subject: TokenSubject) -> Result<IssuedToken, TokenError>;

    /// Checks signature, algorithm and expiry, returning the embedded claims.
    fn verify(&self, token: &str) -> Result<AccessTokenClaims, TokenError>;
}

/// HS256 JWT implementation of [`TokenCodec`].
#[derive(Clone)]
pub struct JwtCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtCodec {
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, TokenError> {
        if secret.trim().is_empty() {
            return Err(TokenError::MissingSigningKey);
        }
        if secret.len() < RECOMMENDED_SECRET_LENGTH {
            tracing::warn!(
                length = secret.len(),
                recommended = RECOMMENDED_SECRET_LENGTH,
                "Access token signing key is shorter than recommended"
            );
        }

        let mut validation = Validation::new(TOKEN_ALGORITHM);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl TokenCodec for JwtCodec {
    fn issue(&self, subject: TokenSubject) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let exp = now + self.ttl;
        let claims = AccessTokenClaims {
            sub: subject.user_id,
            email: subject.email,
            name: subject.name,
            email_verified: subject.email_verified,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let token = encode(&Header::new(TOKEN_ALGORITHM), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)?;

        Ok(IssuedToken {
            token,
            expires_in: self.ttl.num_seconds(),
            claims,
        })
    }

    fn verify(&self, token: &str) -> Result<AccessTokenClaims, TokenError> {
        let data = decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })?;

        // The validity window is [iat, exp); the library accepts exp == now.
        if data.claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}

impl fmt::Debug for JwtCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtCodec")
            .field("algorithm", &TOKEN_ALGORITHM)
            .field("ttl_seconds", &self.ttl.num_seconds())
            .finish_non_exhaustive()
    }
}
