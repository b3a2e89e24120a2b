use axum::http::{header, HeaderMap};
use chrono::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
            SameSite::None => "None",
        }
    }
}

pub const ACCESS_COOKIE_NAME: &str = "access_token";
pub const SESSION_COOKIE_NAME: &str = "session_token";
pub const ACCESS_COOKIE_PATH: &str = "/";
/// The session cookie is only ever sent to the auth endpoints.
pub const SESSION_COOKIE_PATH: &str = "/api/v1/auth";

/// Builds the `Set-Cookie` values for the two transport credentials.
///
/// Both cookies are `HttpOnly` so scripts never see them. They are always separate cookies with
/// their own path and lifetime.
#[derive(Debug, Clone)]
pub struct AuthCookies {
    secure: bool,
    same_site: SameSite,
    access_max_age: Duration,
    session_max_age: Duration,
}

impl AuthCookies {
    pub fn new(secure: bool, access_max_age: Duration, session_max_age: Duration) -> Self {
        Self {
            secure,
            same_site: SameSite::Strict,
            access_max_age,
            session_max_age,
        }
    }

    pub fn access(&self, token: &str) -> String {
        self.render(
            ACCESS_COOKIE_NAME,
            token,
            ACCESS_COOKIE_PATH,
            self.access_max_age.num_seconds(),
        )
    }

    pub fn session(&self, token: &str) -> String {
        self.render(
            SESSION_COOKIE_NAME,
            token,
            SESSION_COOKIE_PATH,
            self.session_max_age.num_seconds(),
        )
    }

    /// Expiring replacements for both cookies, in `[access, session]` order.
    pub fn cleared(&self) -> [String; 2] {
        [
            self.render(ACCESS_COOKIE_NAME, "", ACCESS_COOKIE_PATH, 0),
            self.render(SESSION_COOKIE_NAME, "", SESSION_COOKIE_PATH, 0),
        ]
    }

    fn render(&self, name: &str, value: &str, path: &str, max_age: i64) -> String {
        let mut cookie = format!(
            "{}={}; Path={}; Max-Age={}; HttpOnly; SameSite={}",
            name,
            value,
            path,
            max_age.max(0),
            self.same_site.as_str()
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Finds `name` across every `Cookie` header of the request. Empty values count as absent.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
        .filter(|value| !value.is_empty())
}
