use std::{convert::Infallible, net::SocketAddr};

use axum::{
    extract::{ConnectInfo, Extension, FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
    Json,
};

use crate::{
    error::AppError,
    models::{
        auth::{
            LoginRequest, LoginResponse, LogoutAllResponse, LogoutResponse, RefreshResponse,
            RegisterRequest, RegisterResponse,
        },
        session::SessionMetadata,
        ApiResponse,
    },
    services::{run_to_completion, LoginInput, Registration},
    state::AppState,
    utils::{
        cookies::{read_cookie, SESSION_COOKIE_NAME},
        AccessTokenClaims,
    },
    validation::ValidatedJson,
};

const MAX_USER_AGENT_LEN: usize = 512;

pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let registration = Registration {
        date_of_birth: payload.parsed_date_of_birth(),
        email: payload.email,
        password: payload.password,
        full_name: payload.full_name,
    };
    let auth = state.auth.clone();
    let user = run_to_completion(async move { auth.register(registration).await }).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "User created successfully",
            RegisterResponse { user_id: user.id },
        )),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    metadata: SessionMetadata,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let input = LoginInput {
        email: payload.email,
        password: payload.password,
        metadata,
    };
    let auth = state.auth.clone();
    let outcome = run_to_completion(async move { auth.login(input).await }).await?;

    let cookies = AppendHeaders([
        (header::SET_COOKIE, state.cookies.access(&outcome.access.token)),
        (header::SET_COOKIE, state.cookies.session(&outcome.session_token)),
    ]);
    let body = LoginResponse::bearer(outcome.access.token, outcome.access.expires_in);
    Ok((cookies, Json(ApiResponse::success("Login successful", body))))
}

/// Re-issues the access token. The session token is only ever read from its cookie.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let session_token = read_cookie(&headers, SESSION_COOKIE_NAME);
    let access = state.auth.refresh(session_token.as_deref()).await?;

    let body = RefreshResponse {
        expires_at: access.expires_at(),
        expires_in: access.expires_in,
        access_token: access.token,
    };
    let cookie = AppendHeaders([(header::SET_COOKIE, state.cookies.access(&body.access_token))]);
    Ok((
        cookie,
        Json(ApiResponse::success("Token refreshed successfully", body)),
    ))
}

/// Always clears both cookies, whether or not a session was found.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session_token = read_cookie(&headers, SESSION_COOKIE_NAME);
    let auth = state.auth.clone();
    let result = run_to_completion(async move { auth.logout(session_token.as_deref()).await }).await;
    let cleared = AppendHeaders(state.cookies.cleared().map(|c| (header::SET_COOKIE, c)));

    match result {
        Ok(_) => (
            cleared,
            Json(ApiResponse::success(
                "Logout successful",
                LogoutResponse {
                    success: true,
                    message: "Logout successful".to_string(),
                },
            )),
        )
            .into_response(),
        Err(err) => (cleared, AppError::from(err)).into_response(),
    }
}

pub async fn logout_all(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessTokenClaims>,
) -> Result<impl IntoResponse, AppError> {
    let auth = state.auth.clone();
    let user_id = claims.sub;
    let sessions_ended = run_to_completion(async move { auth.logout_all(user_id).await }).await?;

    let cleared = AppendHeaders(state.cookies.cleared().map(|c| (header::SET_COOKIE, c)));
    let message = "All sessions terminated successfully";
    Ok((
        cleared,
        Json(ApiResponse::success(
            message,
            LogoutAllResponse {
                success: true,
                message: message.to_string(),
                sessions_ended,
            },
        )),
    ))
}

/// Returns the verified claims of the presented access token.
pub async fn me(
    Extension(claims): Extension<AccessTokenClaims>,
) -> Json<ApiResponse<AccessTokenClaims>> {
    Json(ApiResponse::success("Authenticated", claims))
}

impl FromRequestParts<AppState> for SessionMetadata {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(session_metadata(
            &parts.headers,
            peer,
            state.trust_proxy_headers,
        ))
    }
}

/// Forwarding headers are client-controlled, so they only count when a trusted proxy sets them.
fn session_metadata(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy_headers: bool,
) -> SessionMetadata {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.chars().take(MAX_USER_AGENT_LEN).collect());

    let ip_address = if trust_proxy_headers {
        forwarded_ip(headers).or_else(|| peer.map(|addr| addr.ip().to_string()))
    } else {
        peer.map(|addr| addr.ip().to_string())
    };

    SessionMetadata {
        user_agent,
        ip_address,
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    forwarded.or(real_ip).map(str::to_string)
}
