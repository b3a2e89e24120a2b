pub mod cookies;
pub mod jwt;
pub mod password;
pub mod session_token;

pub use jwt::{AccessTokenClaims, IssuedToken, JwtCodec, TokenCodec, TokenError, TokenSubject};
pub use password::{HashingParams, PasswordError, PasswordHasher};
pub use session_token::{generate_session_token, hash_session_token};
