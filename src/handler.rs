//! HTTP request handlers for the URL shortener API
//!
//! This module implements:
//! - Creating short URLs with random or custom aliases
//! - Listing the caller's own URLs
//! - Redirecting aliases while recording one click per traversal
//! - Click analytics per alias, per topic and per user

use axum::{
    body::Bytes,
    extract::{ConnectInfo, FromRequestParts, Path, Query, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    Extension, Json,
};
use chrono::Utc;
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;

use crate::analytics;
use crate::database::{self, random_token, AppState};
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::model::{ListParams, ListResponse, ShortenRequest, ShortenResponse, UrlRecord};

/// Length of generated aliases
pub const ALIAS_LEN: usize = 8;
/// Longest accepted custom alias
pub const MAX_ALIAS_LEN: usize = 64;
pub const DEFAULT_TOPIC: &str = "general";

/// Aliases shadowed by static `/analytics/...` routes
pub const RESERVED_ALIASES: [&str; 1] = ["overall"];

/// Attempts at finding a free random alias before giving up
const ALIAS_ATTEMPTS: usize = 5;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 100;

/// Health check
pub async fn home() -> impl IntoResponse {
    Json(json!({ "message": "App works", "status": "success" }))
}

fn validate_original_url(raw: Option<String>) -> Result<String, AppError> {
    let original_url = raw
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| AppError::validation("Original URL is required"))?;

    match url::Url::parse(&original_url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(original_url),
        _ => Err(AppError::validation(
            "Original URL must be an absolute http(s) URL",
        )),
    }
}

fn validate_custom_alias(alias: &str) -> Result<(), AppError> {
    let valid_chars = alias
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if alias.len() > MAX_ALIAS_LEN || !valid_chars {
        return Err(AppError::validation(format!(
            "Custom alias must be at most {} characters of letters, digits, '-' or '_'",
            MAX_ALIAS_LEN
        )));
    }
    if RESERVED_ALIASES.contains(&alias) {
        return Err(AppError::validation(format!(
            "Custom alias '{}' is reserved",
            alias
        )));
    }
    Ok(())
}

/// Creates a new short URL for the signed-in caller
///
/// # Request Body
///
/// ```json
/// {
///   "originalUrl": "https://example.com/very/long/url",
///   "topic": "marketing",      // Optional, defaults to "general"
///   "customAlias": "my-link"   // Optional
/// }
/// ```
///
/// # Response
///
/// - **201 Created** - `{shortUrl, originalUrl, topic, createdAt}`
/// - **400 Bad Request** - missing or invalid `originalUrl`, bad alias, bad JSON
/// - **409 Conflict** - custom alias already taken
///
/// Shortening the same URL twice yields two different aliases.
pub async fn create_short_url(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    // An empty body is treated like `{}` so it fails on the missing field
    let payload: ShortenRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ShortenRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|err| AppError::validation(format!("Invalid JSON body: {}", err)))?
    };

    let original_url = validate_original_url(payload.original_url)?;
    let topic = payload
        .topic
        .map(|topic| topic.trim().to_string())
        .filter(|topic| !topic.is_empty())
        .unwrap_or_else(|| DEFAULT_TOPIC.to_string());
    let custom_alias = payload.custom_alias.filter(|alias| !alias.is_empty());

    let mut record = UrlRecord {
        owner_id: user.user_id,
        original_url,
        alias: String::new(),
        topic,
        created_at: Utc::now(),
    };

    match custom_alias {
        Some(alias) => {
            validate_custom_alias(&alias)?;
            record.alias = alias;
            if !database::insert_url(&state.db, &record)? {
                return Err(AppError::Conflict(
                    "Custom alias already taken. Please choose another.".to_string(),
                ));
            }
        }
        None => {
            let mut stored = false;
            for _ in 0..ALIAS_ATTEMPTS {
                record.alias = random_token(ALIAS_LEN);
                if database::insert_url(&state.db, &record)? {
                    stored = true;
                    break;
                }
                tracing::debug!(alias = %record.alias, "Generated alias collided, retrying");
            }
            if !stored {
                return Err(AppError::storage("could not allocate a free alias"));
            }
        }
    }

    tracing::info!(alias = %record.alias, owner = %record.owner_id, "Short URL created");

    let response = ShortenResponse {
        short_url: record.alias,
        original_url: record.original_url,
        topic: record.topic,
        created_at: record.created_at,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Lists the caller's URLs in creation order
///
/// # Query Parameters
///
/// - `page` (optional) - Page number, starts from 1 (default: 1)
/// - `limit` (optional) - Items per page, max 100 (default: 50)
pub async fn list_urls(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = (page - 1).saturating_mul(limit);

    let all = database::urls_by_owner(&state.db, &user.user_id)?;
    let total = all.len();
    let urls = all.into_iter().skip(offset).take(limit).collect();

    Ok(Json(ListResponse {
        page,
        limit,
        total,
        urls,
    }))
}

/// Socket peer of the request, absent when the server was not started with
/// connect info (e.g. when driving the router directly in tests)
pub struct PeerAddr(pub Option<SocketAddr>);

impl<S: Send + Sync> FromRequestParts<S> for PeerAddr {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(PeerAddr(addr))
    }
}

/// Address the click is attributed to: the first `X-Forwarded-For` hop when
/// the proxy is trusted, else the socket peer
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string()).unwrap_or_default()
}

/// Redirects an alias to its original URL
///
/// Every traversal appends exactly one click record (timestamp, user agent,
/// client IP) before the redirect is sent.
///
/// # Response
///
/// - **307 Temporary Redirect** - to the original URL
/// - **404 Not Found** - unknown alias, nothing recorded
pub async fn redirect_url(
    Path(alias): Path<String>,
    State(state): State<AppState>,
    PeerAddr(peer): PeerAddr,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user_agent = headers
        .get(header::USER_AGENT)
        .map(|value| String::from_utf8_lossy(value.as_bytes()))
        .unwrap_or_default();
    let ip_address = client_ip(&headers, peer, state.config.trust_proxy);

    let url = database::record_click(&state.db, &alias, &user_agent, &ip_address)?
        .ok_or_else(|| AppError::not_found("URL not found"))?;

    tracing::debug!(alias = %alias, ip = %ip_address, "Redirect recorded");
    Ok(Redirect::temporary(&url.original_url))
}

/// Click statistics for one alias
pub async fn alias_analytics(
    Path(alias): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    if database::find_url(&state.db, &alias)?.is_none() {
        return Err(AppError::not_found("URL not found"));
    }

    let clicks = database::clicks_for(&state.db, [alias.as_str()])?;
    Ok(Json(analytics::alias_report(&clicks)))
}

/// Click statistics across every alias labelled `topic`
pub async fn topic_analytics(
    Path(topic): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let urls = database::urls_by_topic(&state.db, &topic)?;
    if urls.is_empty() {
        return Err(AppError::not_found("No URLs found for this topic"));
    }

    let clicks = database::clicks_for(&state.db, urls.iter().map(|url| url.alias.as_str()))?;
    Ok(Json(analytics::topic_report(&urls, &clicks)))
}

/// Click statistics across every alias the caller owns
pub async fn overall_analytics(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let urls = database::urls_by_owner(&state.db, &user.user_id)?;
    if urls.is_empty() {
        return Err(AppError::not_found("No URLs found for this user"));
    }

    let clicks = database::clicks_for(&state.db, urls.iter().map(|url| url.alias.as_str()))?;
    Ok(Json(analytics::overall_report(&urls, &clicks)))
}
