//! Route definitions for the URL shortener API
//!
//! This module configures all HTTP routes and maps them to their respective handlers.

use axum::routing::{get, post};
use axum::{middleware, Router};

use crate::database::AppState;
use crate::handler::{
    alias_analytics, create_short_url, home, list_urls, overall_analytics, redirect_url,
    topic_analytics,
};
use crate::middleware::require_session;
use crate::oauth::{google_callback, google_login, logout, profile};

/// Creates and configures the Axum application router with all routes
///
/// # Route Definitions
///
/// - `GET /` - Health check
/// - `GET /auth/google` - Starts the OAuth login
/// - `GET /auth/google/callback` - OAuth redirect target, opens a session
/// - `GET /auth/profile` - Signed-in user, or redirect to the login
/// - `POST /auth/logout` - Ends the session
/// - `POST /api/shorten` - Creates a short URL (session required)
/// - `GET /api/urls` - Lists the caller's URLs (session required)
/// - `GET /api/shorten/{alias}` - Records a click and redirects (public)
/// - `GET /api/analytics/{alias}` - Statistics for one alias (public)
/// - `GET /api/analytics/topic/{topic}` - Statistics for a topic (public)
/// - `GET /api/analytics/overall` - Statistics for the caller's URLs (session required)
pub fn create_app(state: AppState) -> Router {
    // Routes that need a signed-in caller
    let protected = Router::new()
        .route("/shorten", post(create_short_url))
        .route("/urls", get(list_urls))
        .route("/analytics/overall", get(overall_analytics))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    let public = Router::new()
        .route("/shorten/{alias}", get(redirect_url))
        .route("/analytics/{alias}", get(alias_analytics))
        .route("/analytics/topic/{topic}", get(topic_analytics));

    let auth = Router::new()
        .route("/google", get(google_login))
        .route("/google/callback", get(google_callback))
        .route("/profile", get(profile))
        .route("/logout", post(logout));

    Router::new()
        .route("/", get(home))
        .nest("/auth", auth)
        .nest("/api", public.merge(protected))
        .with_state(state)
}
