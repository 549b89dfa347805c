//! Data models for the URL shortener application
//!
//! This module defines the records persisted in redb (stored as JSON strings)
//! and the request/response bodies of the HTTP API. Field names on the wire
//! are camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A shortened URL
///
/// Created once on a shorten request and never modified afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UrlRecord {
    /// Id of the user who created the link
    #[serde(rename = "userId")]
    pub owner_id: String,

    /// The destination visitors are redirected to
    pub original_url: String,

    /// The short alias, unique across the whole database
    #[serde(rename = "shortUrl")]
    pub alias: String,

    /// Free-text label grouping links for combined reporting
    pub topic: String,

    pub created_at: DateTime<Utc>,
}

/// One redirect traversal
///
/// Append-only. `alias` points at a [`UrlRecord`] but nothing enforces it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClickRecord {
    #[serde(rename = "shortUrl")]
    pub alias: String,
    pub timestamp: DateTime<Utc>,
    /// Raw `User-Agent` header, empty when the client sent none
    pub user_agent: String,
    pub ip_address: String,
}

/// A user known through the OAuth provider
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    /// Stable account id issued by the provider (`sub` claim)
    pub subject: String,
    pub display_name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Server-side state of a login session, keyed by its token
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Request payload for creating a new short URL
///
/// Every field is optional at the parsing level so that a missing
/// `originalUrl` is reported as a validation error rather than a JSON
/// rejection.
///
/// # Example
/// ```json
/// {
///   "originalUrl": "https://example.com/very/long/url",
///   "topic": "marketing",
///   "customAlias": "spring-sale"
/// }
/// ```
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ShortenRequest {
    pub original_url: Option<String>,
    pub topic: Option<String>,
    pub custom_alias: Option<String>,
}

/// Response returned after successfully creating a short URL
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ShortenResponse {
    pub short_url: String,
    pub original_url: String,
    pub topic: String,
    pub created_at: DateTime<Utc>,
}

/// Query parameters for listing the caller's URLs
///
/// Query string: `?page=2&limit=20`
#[derive(Deserialize, Debug, Default)]
pub struct ListParams {
    /// Page number, starts from 1
    pub page: Option<usize>,
    /// Items per page, capped at 100
    pub limit: Option<usize>,
}

#[derive(Serialize, Debug)]
pub struct ListResponse {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub urls: Vec<UrlRecord>,
}

/// Clicks falling on one calendar day (UTC)
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DateCount {
    /// `YYYY-MM-DD`
    pub date: String,
    pub count: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OsStat {
    pub os_name: String,
    pub unique_clicks: usize,
    pub unique_users: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStat {
    pub device_name: String,
    pub unique_clicks: usize,
    pub unique_users: usize,
}

/// Statistics for a single alias
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AliasAnalytics {
    pub total_clicks: usize,
    pub unique_users: usize,
    pub clicks_by_date: Vec<DateCount>,
    pub os_type: Vec<OsStat>,
    pub device_type: Vec<DeviceStat>,
}

/// Per-alias totals inside a topic report
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UrlClicks {
    pub short_url: String,
    pub total_clicks: usize,
    pub unique_users: usize,
}

/// Statistics across all aliases sharing a topic
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopicAnalytics {
    pub total_clicks: usize,
    pub unique_users: usize,
    pub clicks_by_date: Vec<DateCount>,
    pub urls: Vec<UrlClicks>,
}

/// Statistics across every alias a user owns
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OverallAnalytics {
    pub total_urls: usize,
    pub total_clicks: usize,
    pub unique_users: usize,
    pub clicks_by_date: Vec<DateCount>,
    pub os_type: Vec<OsStat>,
    pub device_type: Vec<DeviceStat>,
}
