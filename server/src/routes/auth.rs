//! Auth routes — registration, login, session cookie, WS tickets.

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use time::Duration;

use crate::services::{auth as auth_svc, session};
use crate::state::AppState;

const COOKIE_NAME: &str = "session_token";

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

pub(crate) fn cookie_secure() -> bool {
    env_bool("COOKIE_SECURE").unwrap_or(false)
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(cookie_secure())
        .max_age(Duration::days(30))
        .build()
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated user extracted from the session cookie.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub user: session::SessionUser,
    pub token: String,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(COOKIE_NAME).map(Cookie::value).unwrap_or_default();
        if token.is_empty() {
            return Err(StatusCode::UNAUTHORIZED);
        }

        let app_state = AppState::from_ref(state);
        let user = session::validate_session(&app_state.pool, token)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(Self { user, token: token.to_owned() })
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Deserialize)]
pub struct RegisterBody {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// `POST /api/auth/register` — create a user, start a session.
pub async fn register(State(state): State<AppState>, Json(body): Json<RegisterBody>) -> Response {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return (StatusCode::BAD_REQUEST, "email and password required").into_response();
    }

    let user_id = match auth_svc::register_user(&state.pool, body.email.trim(), body.name.trim(), &body.password).await
    {
        Ok(id) => id,
        Err(auth_svc::AuthError::EmailTaken) => {
            return (StatusCode::CONFLICT, "email already registered").into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "registration failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "registration failed").into_response();
        }
    };

    start_session(&state, user_id).await
}

#[derive(Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

/// `POST /api/auth/login` — check credentials, start a session.
pub async fn login(State(state): State<AppState>, Json(body): Json<LoginBody>) -> Response {
    let user_id = match auth_svc::authenticate(&state.pool, body.email.trim(), &body.password).await {
        Ok(id) => id,
        Err(auth_svc::AuthError::InvalidCredentials) => {
            return (StatusCode::UNAUTHORIZED, "invalid email or password").into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "login failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "login failed").into_response();
        }
    };

    start_session(&state, user_id).await
}

async fn start_session(state: &AppState, user_id: uuid::Uuid) -> Response {
    let token = match session::create_session(&state.pool, user_id).await {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, "session creation failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "session creation failed").into_response();
        }
    };

    let user = match session::validate_session(&state.pool, &token).await {
        Ok(Some(user)) => user,
        _ => return (StatusCode::INTERNAL_SERVER_ERROR, "session lookup failed").into_response(),
    };

    let jar = CookieJar::new().add(session_cookie(token));
    (jar, Json(user)).into_response()
}

/// `POST /api/auth/logout` — drop the session and clear the cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> Response {
    if let Err(e) = session::delete_session(&state.pool, &auth.token).await {
        tracing::error!(error = %e, "logout failed");
        return (StatusCode::INTERNAL_SERVER_ERROR, "logout failed").into_response();
    }

    let jar = CookieJar::new().remove(Cookie::build((COOKIE_NAME, "")).path("/").build());
    (jar, StatusCode::NO_CONTENT).into_response()
}

/// `GET /api/auth/me` — the authenticated user.
pub async fn me(auth: AuthUser) -> Json<session::SessionUser> {
    Json(auth.user)
}

/// `POST /api/auth/ws-ticket` — mint a one-time websocket ticket.
pub async fn ws_ticket(State(state): State<AppState>, auth: AuthUser) -> Response {
    match session::create_ws_ticket(&state.pool, auth.user.id).await {
        Ok(ticket) => Json(serde_json::json!({ "ticket": ticket })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "ws ticket creation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "ticket creation failed").into_response()
        }
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
