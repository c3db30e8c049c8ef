// Session guard middleware - resolves the caller's session and redirects by sign-in state
use crate::domain::session::{guard, RouteDecision, Session};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use chrono::Utc;
use std::sync::Arc;

/// Cookie carrying the access token for browser clients.
pub const SESSION_COOKIE: &str = "access_token";

/// Access token sent by the caller, from `Authorization: Bearer` or the session cookie.
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    if let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() {
        return Some(bearer.token().to_string());
    }
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

async fn resolve_session(state: &AppState, headers: &HeaderMap) -> Option<Session> {
    let token = access_token(headers)?;
    match state.sessions.get_session(&token).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!("Could not resolve session: {}", e);
            None
        }
    }
}

/// Applies the route guard and hands the caller's `Session` to handlers as an extension.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = resolve_session(&state, request.headers()).await;
    match guard(request.uri().path(), session.as_ref(), Utc::now()) {
        RouteDecision::Pass => {
            if let Some(session) = session {
                request.extensions_mut().insert(session);
            }
            next.run(request).await
        }
        RouteDecision::Redirect(target) => {
            tracing::debug!("Redirecting {} to {}", request.uri().path(), target);
            Redirect::to(target).into_response()
        }
    }
}
