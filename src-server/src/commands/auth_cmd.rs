//! Auth Commands
//!
//! Single shared PIN. A correct PIN earns a constant session cookie which the
//! gate checks on every other route.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::AppState;

pub const AUTH_COOKIE: &str = "freelance-auth-token";
pub const AUTH_COOKIE_VALUE: &str = "authenticated";
pub const LOGIN_PATH: &str = "/login";

/// Paths reachable without the session cookie
const PUBLIC_PREFIXES: [&str; 2] = ["/login", "/auth"];

const COOKIE_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 365;

#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    pub pin: String,
}

fn auth_failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "error": message }))).into_response()
}

/// `Set-Cookie` value for an authenticated session
pub fn session_cookie(secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        AUTH_COOKIE, AUTH_COOKIE_VALUE, COOKIE_MAX_AGE_SECS
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// POST /auth
pub async fn authenticate(
    State(state): State<AppState>,
    payload: Result<Json<AuthRequest>, JsonRejection>,
) -> Response {
    let Some(expected) = state.config.pin_code.as_deref() else {
        log::error!("APP_PIN_CODE is not configured");
        return auth_failure(StatusCode::INTERNAL_SERVER_ERROR, "Server configuration missing");
    };

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            log::warn!("Malformed auth request: {}", rejection);
            return auth_failure(StatusCode::BAD_REQUEST, "Malformed request");
        }
    };

    if request.pin != expected {
        log::warn!("Rejected login attempt");
        return auth_failure(StatusCode::UNAUTHORIZED, "Incorrect PIN");
    }

    log::info!("Login accepted");
    (
        StatusCode::OK,
        [(SET_COOKIE, session_cookie(state.config.secure_cookies))],
        Json(json!({ "success": true })),
    )
        .into_response()
}

/// GET /login
pub async fn login_page() -> &'static str {
    "Authentication required: POST {\"pin\": \"...\"} to /auth"
}

/// True if any `Cookie` header carries the session cookie with its exact value
pub fn has_session_cookie(headers: &HeaderMap) -> bool {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .any(|(name, value)| name == AUTH_COOKIE && value == AUTH_COOKIE_VALUE)
}

fn is_public(path: &str) -> bool {
    PUBLIC_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Redirects every request without the session cookie to the login page
pub async fn auth_gate(req: Request, next: Next) -> Response {
    if is_public(req.uri().path()) || has_session_cookie(req.headers()) {
        return next.run(req).await;
    }
    Redirect::temporary(LOGIN_PATH).into_response()
}
