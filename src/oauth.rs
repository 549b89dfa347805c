//! OAuth login flow
//!
//! The authorization-code exchange is hidden behind [`IdentityProvider`] so
//! the HTTP flow (state cookie, user upsert, session cookie) does not depend
//! on a specific provider. [`GoogleProvider`] is the production
//! implementation.

use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::config::GoogleConfig;
use crate::database::{self, random_token, AppState};
use crate::error::AppError;
use crate::middleware::{session_token, SESSION_COOKIE};

pub const STATE_COOKIE: &str = "oauth_state";

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const GOOGLE_SCOPE: &str = "openid profile email";

const STATE_LEN: usize = 32;
const STATE_MAX_AGE_SECS: i64 = 600;

/// Identity returned by the provider once the code exchange succeeds
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    /// Stable account id at the provider
    pub subject: String,
    pub display_name: String,
    pub email: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL the browser is sent to in order to start the login
    fn authorize_url(&self, state: &str) -> String;

    /// Trades an authorization code for the signed-in user's profile
    async fn exchange(&self, code: &str) -> Result<ProviderProfile, AppError>;
}

pub struct GoogleProvider {
    client: Client,
    config: GoogleConfig,
}

impl GoogleProvider {
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct GoogleUserInfo {
    sub: String,
    name: Option<String>,
    email: Option<String>,
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorize_url(&self, state: &str) -> String {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.callback_url.as_str()),
            ("response_type", "code"),
            ("scope", GOOGLE_SCOPE),
            ("state", state),
        ];
        match url::Url::parse_with_params(GOOGLE_AUTHORIZE_URL, &params) {
            Ok(url) => url.into(),
            // The base URL is a constant, parsing it cannot fail
            Err(_) => GOOGLE_AUTHORIZE_URL.to_string(),
        }
    }

    async fn exchange(&self, code: &str) -> Result<ProviderProfile, AppError> {
        let token: TokenResponse = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.callback_url.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let info: GoogleUserInfo = self
            .client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(ProviderProfile {
            display_name: info.name.unwrap_or_else(|| info.sub.clone()),
            subject: info.sub,
            email: info.email,
        })
    }
}

/// HttpOnly cookie scoped to the whole site; a zero `max_age` clears it
fn site_cookie(
    name: &str,
    value: String,
    max_age: time::Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name.to_string(), value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .secure(secure)
        .build()
}

fn cleared_cookie(name: &str, secure: bool) -> Cookie<'static> {
    site_cookie(name, String::new(), time::Duration::ZERO, secure)
}

/// Starts the login: remembers a random state in a cookie and sends the
/// browser to the provider
pub async fn google_login(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let oauth_state = random_token(STATE_LEN);
    let redirect = Redirect::to(&state.identity.authorize_url(&oauth_state));
    let state_cookie = site_cookie(
        STATE_COOKIE,
        oauth_state,
        time::Duration::seconds(STATE_MAX_AGE_SECS),
        state.config.cookie_secure,
    );

    (jar.add(state_cookie), redirect)
}

#[derive(Deserialize, Debug)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Completes the login and opens a session
///
/// Any failure (provider error, state mismatch, storage error) ends with a
/// redirect to `/`.
pub async fn google_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> Response {
    let secure = state.config.cookie_secure;
    let outcome = complete_login(&state, &params, &jar).await;
    let jar = jar.add(cleared_cookie(STATE_COOKIE, secure));

    match outcome {
        Ok(token) => {
            let session_cookie = site_cookie(
                SESSION_COOKIE,
                token,
                time::Duration::seconds(state.config.session_ttl.num_seconds()),
                secure,
            );
            (jar.add(session_cookie), Redirect::to("/auth/profile")).into_response()
        }
        Err(err) => {
            tracing::warn!("OAuth callback failed: {}", err);
            (jar, Redirect::to("/")).into_response()
        }
    }
}

async fn complete_login(
    state: &AppState,
    params: &CallbackParams,
    jar: &CookieJar,
) -> Result<String, AppError> {
    if let Some(error) = &params.error {
        return Err(AppError::Provider(format!("authorization denied: {}", error)));
    }

    let expected = jar
        .get(STATE_COOKIE)
        .map(|cookie| cookie.value())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::validation("missing OAuth state cookie"))?;
    if params.state.as_deref() != Some(expected) {
        return Err(AppError::validation("OAuth state mismatch"));
    }

    let code = params
        .code
        .as_deref()
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AppError::validation("missing authorization code"))?;

    let profile = state.identity.exchange(code).await?;
    let user = database::upsert_user(&state.db, &profile)?;
    let token = database::create_session(&state.db, &user.id, state.config.session_ttl)?;

    tracing::info!(user_id = %user.id, "User signed in");
    Ok(token)
}

/// Returns the signed-in user, or restarts the login when there is none
pub async fn profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let Some(token) = session_token(&headers) else {
        return Ok(Redirect::to("/auth/google").into_response());
    };
    let Some(session) = database::find_session(&state.db, &token)? else {
        return Ok(Redirect::to("/auth/google").into_response());
    };
    let Some(user) = database::find_user(&state.db, &session.user_id)? else {
        return Ok(Redirect::to("/auth/google").into_response());
    };

    Ok(Json(json!({ "user": user })).into_response())
}

/// Ends the current session, if any
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if let Some(token) = session_token(&headers) {
        database::delete_session(&state.db, &token)?;
    }

    let jar = jar.add(cleared_cookie(SESSION_COOKIE, state.config.cookie_secure));
    Ok((StatusCode::NO_CONTENT, jar).into_response())
}
