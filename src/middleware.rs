use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::database::{self, AppState};
use crate::error::AppError;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "sid";

/// Identity of the caller, attached to the request by [`require_session`]
///
/// Protected handlers take it with `Extension<AuthUser>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

/// Session token from `Authorization: Bearer <token>` or the session cookie
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
    })
}

/// Middleware guarding routes that need a signed-in caller
///
/// A request without a token is rejected before any storage access. A token
/// that does not resolve to a live session is rejected as well. Otherwise the
/// caller's [`AuthUser`] is inserted into the request extensions.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = session_token(request.headers()) else {
        tracing::debug!("Rejected request without session token");
        return Err(AppError::Unauthorized);
    };

    let Some(session) = database::find_session(&state.db, &token)? else {
        tracing::debug!("Rejected request with unknown or expired session");
        return Err(AppError::Unauthorized);
    };

    request.extensions_mut().insert(AuthUser {
        user_id: session.user_id,
    });

    Ok(next.run(request).await)
}
