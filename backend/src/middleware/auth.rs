use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::{
    error::{AppError, INVALID_TOKEN},
    state::AppState,
    utils::cookies::{read_cookie, ACCESS_COOKIE_NAME},
};

/// Verifies the access token and exposes its claims to handlers as
/// `Extension<AccessTokenClaims>`.
pub async fn require_access_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = access_token_from_headers(request.headers())
        .ok_or_else(|| AppError::Unauthorized(INVALID_TOKEN.to_string()))?;

    let claims = state.auth.verify_access_token(&token).map_err(|err| {
        tracing::debug!(error = %err, "Access token rejected");
        AppError::from(err)
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Bearer header first, then the access-token cookie.
pub fn access_token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer_token)
        .map(str::to_string)
        .or_else(|| read_cookie(headers, ACCESS_COOKIE_NAME))
}

fn parse_bearer_token(header: &str) -> Option<&str> {
    let (scheme, rest) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    (!token.is_empty()).then_some(token)
}
