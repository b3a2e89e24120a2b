use std::sync::Arc;

use crate::{
    config::Config,
    repositories::{SessionStore, UserStore},
    services::AuthService,
    utils::{cookies::AuthCookies, JwtCodec, PasswordHasher},
};

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub cookies: AuthCookies,
    /// Whether client-supplied forwarding headers name the session's IP address.
    pub trust_proxy_headers: bool,
}

impl AppState {
    pub fn new(auth: Arc<AuthService>, cookies: AuthCookies, trust_proxy_headers: bool) -> Self {
        Self {
            auth,
            cookies,
            trust_proxy_headers,
        }
    }

    /// Builds the signing codec, hasher and flow controller over `store`.
    ///
    /// Fails when the signing key or hashing parameters are unusable, so the caller never starts
    /// serving with a broken credential stack.
    pub fn from_config<S>(config: &Config, store: Arc<S>) -> anyhow::Result<Self>
    where
        S: UserStore + SessionStore + 'static,
    {
        let tokens = JwtCodec::new(&config.jwt_secret, config.access_token_ttl())?;
        let hasher = PasswordHasher::new(config.hashing)?;
        let auth = AuthService::with_store(store, config.session_ttl(), Arc::new(tokens), hasher);
        let cookies = AuthCookies::new(
            config.cookie_secure,
            config.access_token_ttl(),
            config.session_ttl(),
        );
        Ok(Self::new(
            Arc::new(auth),
            cookies,
            config.trust_proxy_headers,
        ))
    }
}
