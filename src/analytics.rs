//! Click aggregation
//!
//! Pure reductions over click records that have already been loaded from
//! storage. Nothing here touches the database.
//!
//! The OS and device labels come from a deliberately crude user-agent
//! heuristic: the OS is whatever precedes the first space, and a client is
//! "mobile" when its user agent contains the token `Mobile`. Existing reports
//! depend on these exact labels.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::model::{
    AliasAnalytics, ClickRecord, DateCount, DeviceStat, OsStat, OverallAnalytics, TopicAnalytics,
    UrlClicks, UrlRecord,
};

pub const MOBILE_TOKEN: &str = "Mobile";
pub const DEVICE_MOBILE: &str = "mobile";
pub const DEVICE_DESKTOP: &str = "desktop";

/// OS label: the user agent up to its first space
pub fn os_label(user_agent: &str) -> &str {
    user_agent.split(' ').next().unwrap_or_default()
}

pub fn device_label(user_agent: &str) -> &'static str {
    if user_agent.contains(MOBILE_TOKEN) {
        DEVICE_MOBILE
    } else {
        DEVICE_DESKTOP
    }
}

/// Distinct IP addresses, compared as exact strings
pub fn unique_users<'a, I>(clicks: I) -> usize
where
    I: IntoIterator<Item = &'a ClickRecord>,
{
    clicks
        .into_iter()
        .map(|click| click.ip_address.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Click counts per UTC calendar day, ascending by date
pub fn clicks_by_date(clicks: &[ClickRecord]) -> Vec<DateCount> {
    let mut days: BTreeMap<String, usize> = BTreeMap::new();
    for click in clicks {
        *days
            .entry(click.timestamp.format("%Y-%m-%d").to_string())
            .or_default() += 1;
    }

    days.into_iter()
        .map(|(date, count)| DateCount { date, count })
        .collect()
}

#[derive(Default)]
struct Tally<'a> {
    clicks: usize,
    ips: HashSet<&'a str>,
}

/// Groups clicks by `label`, counting clicks and distinct IPs per group
fn breakdown<'a, F>(clicks: &'a [ClickRecord], label: F) -> BTreeMap<&'a str, Tally<'a>>
where
    F: Fn(&'a ClickRecord) -> &'a str,
{
    let mut groups: BTreeMap<&str, Tally> = BTreeMap::new();
    for click in clicks {
        let tally = groups.entry(label(click)).or_default();
        tally.clicks += 1;
        tally.ips.insert(click.ip_address.as_str());
    }
    groups
}

pub fn os_breakdown(clicks: &[ClickRecord]) -> Vec<OsStat> {
    breakdown(clicks, |click| os_label(&click.user_agent))
        .into_iter()
        .map(|(name, tally)| OsStat {
            os_name: name.to_string(),
            unique_clicks: tally.clicks,
            unique_users: tally.ips.len(),
        })
        .collect()
}

pub fn device_breakdown(clicks: &[ClickRecord]) -> Vec<DeviceStat> {
    breakdown(clicks, |click| device_label(&click.user_agent))
        .into_iter()
        .map(|(name, tally)| DeviceStat {
            device_name: name.to_string(),
            unique_clicks: tally.clicks,
            unique_users: tally.ips.len(),
        })
        .collect()
}

/// Report for a single alias
pub fn alias_report(clicks: &[ClickRecord]) -> AliasAnalytics {
    AliasAnalytics {
        total_clicks: clicks.len(),
        unique_users: unique_users(clicks),
        clicks_by_date: clicks_by_date(clicks),
        os_type: os_breakdown(clicks),
        device_type: device_breakdown(clicks),
    }
}

/// Report for every alias sharing a topic
///
/// `urls` decides which aliases appear in the per-URL list and in what order;
/// clicks for aliases outside `urls` still count toward the combined totals.
pub fn topic_report(urls: &[UrlRecord], clicks: &[ClickRecord]) -> TopicAnalytics {
    let mut by_alias: HashMap<&str, Vec<&ClickRecord>> = HashMap::new();
    for click in clicks {
        by_alias.entry(click.alias.as_str()).or_default().push(click);
    }

    let per_url = urls
        .iter()
        .map(|url| {
            let url_clicks = by_alias
                .get(url.alias.as_str())
                .map(Vec::as_slice)
                .unwrap_or_default();
            UrlClicks {
                short_url: url.alias.clone(),
                total_clicks: url_clicks.len(),
                unique_users: unique_users(url_clicks.iter().copied()),
            }
        })
        .collect();

    TopicAnalytics {
        total_clicks: clicks.len(),
        unique_users: unique_users(clicks),
        clicks_by_date: clicks_by_date(clicks),
        urls: per_url,
    }
}

/// Report across everything a user owns
pub fn overall_report(urls: &[UrlRecord], clicks: &[ClickRecord]) -> OverallAnalytics {
    let aliases: HashSet<&str> = urls.iter().map(|url| url.alias.as_str()).collect();

    OverallAnalytics {
        total_urls: aliases.len(),
        total_clicks: clicks.len(),
        unique_users: unique_users(clicks),
        clicks_by_date: clicks_by_date(clicks),
        os_type: os_breakdown(clicks),
        device_type: device_breakdown(clicks),
    }
}
