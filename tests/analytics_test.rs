//! Tests for the click aggregation functions

use chrono::{TimeZone, Utc};

use linklens::analytics::{
    alias_report, clicks_by_date, device_breakdown, device_label, os_breakdown, os_label,
    overall_report, topic_report, unique_users,
};
use linklens::model::{ClickRecord, DateCount, UrlRecord};

fn click(alias: &str, day: u32, hour: u32, user_agent: &str, ip: &str) -> ClickRecord {
    ClickRecord {
        alias: alias.to_string(),
        timestamp: Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap(),
        user_agent: user_agent.to_string(),
        ip_address: ip.to_string(),
    }
}

fn url(alias: &str, topic: &str) -> UrlRecord {
    UrlRecord {
        owner_id: "owner".to_string(),
        original_url: format!("https://example.com/{}", alias),
        alias: alias.to_string(),
        topic: topic.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
    }
}

#[test]
fn test_empty_input_yields_zeroes() {
    let report = alias_report(&[]);

    assert_eq!(report.total_clicks, 0);
    assert_eq!(report.unique_users, 0);
    assert!(report.clicks_by_date.is_empty());
    assert!(report.os_type.is_empty());
    assert!(report.device_type.is_empty());
}

#[test]
fn test_os_label_takes_text_before_first_space() {
    assert_eq!(
        os_label("Mozilla/5.0 (Windows NT 10.0; Win64; x64)"),
        "Mozilla/5.0"
    );
    assert_eq!(os_label("curl/8.4.0"), "curl/8.4.0");
    assert_eq!(os_label(""), "");
    assert_eq!(os_label(" leading"), "");
}

#[test]
fn test_device_label_matches_mobile_token() {
    assert_eq!(device_label("Mozilla/5.0 (iPhone) Mobile/15E148"), "mobile");
    assert_eq!(device_label("Mozilla/5.0 (Mobile)"), "mobile");
    // Case-sensitive literal match
    assert_eq!(device_label("Mozilla/5.0 (mobile)"), "desktop");
    assert_eq!(device_label(""), "desktop");
}

#[test]
fn test_unique_users_compares_exact_strings() {
    let clicks = vec![
        click("a", 1, 0, "ua", "1.1.1.1"),
        click("a", 1, 1, "ua", "1.1.1.1"),
        click("a", 1, 2, "ua", "::ffff:1.1.1.1"),
    ];

    assert_eq!(unique_users(&clicks), 2);
}

#[test]
fn test_clicks_by_date_groups_by_utc_day() {
    let clicks = vec![
        click("a", 2, 23, "ua", "1.1.1.1"),
        click("a", 1, 0, "ua", "1.1.1.1"),
        click("a", 2, 1, "ua", "2.2.2.2"),
        click("a", 1, 23, "ua", "3.3.3.3"),
        click("a", 1, 12, "ua", "3.3.3.3"),
    ];

    assert_eq!(
        clicks_by_date(&clicks),
        vec![
            DateCount {
                date: "2024-03-01".to_string(),
                count: 3
            },
            DateCount {
                date: "2024-03-02".to_string(),
                count: 2
            },
        ]
    );
}

#[test]
fn test_os_breakdown_counts_clicks_and_distinct_ips() {
    let clicks = vec![
        click("a", 1, 0, "Mozilla/5.0 (X11)", "1.1.1.1"),
        click("a", 1, 1, "Mozilla/5.0 (Mobile)", "1.1.1.1"),
        click("a", 1, 2, "Mozilla/5.0 (X11)", "2.2.2.2"),
        click("a", 1, 3, "curl/8.0", "3.3.3.3"),
    ];

    let os = os_breakdown(&clicks);

    assert_eq!(os.len(), 2);
    assert_eq!(os[0].os_name, "Mozilla/5.0");
    assert_eq!(os[0].unique_clicks, 3);
    assert_eq!(os[0].unique_users, 2);
    assert_eq!(os[1].os_name, "curl/8.0");
    assert_eq!(os[1].unique_clicks, 1);
    assert_eq!(os[1].unique_users, 1);
}

#[test]
fn test_device_breakdown_only_lists_present_buckets() {
    let clicks = vec![
        click("a", 1, 0, "Desktop Browser", "1.1.1.1"),
        click("a", 1, 1, "Desktop Browser", "2.2.2.2"),
    ];

    let devices = device_breakdown(&clicks);

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].device_name, "desktop");
    assert_eq!(devices[0].unique_clicks, 2);
    assert_eq!(devices[0].unique_users, 2);
}

#[test]
fn test_report_invariants_hold_for_mixed_traffic() {
    let agents = ["Mozilla/5.0 (Mobile)", "Mozilla/5.0 (X11)", "curl/8.0", ""];
    let clicks: Vec<ClickRecord> = (0..40u32)
        .map(|i| {
            click(
                "a",
                1 + i % 5,
                i % 24,
                agents[(i % 4) as usize],
                &format!("10.0.0.{}", i % 7),
            )
        })
        .collect();

    let report = alias_report(&clicks);

    assert_eq!(report.total_clicks, 40);
    assert_eq!(report.unique_users, 7);
    assert!(report.unique_users <= report.total_clicks);
    assert_eq!(
        report.clicks_by_date.iter().map(|d| d.count).sum::<usize>(),
        report.total_clicks
    );
    assert_eq!(
        report
            .device_type
            .iter()
            .map(|d| d.unique_clicks)
            .sum::<usize>(),
        report.total_clicks
    );
    assert_eq!(
        report.os_type.iter().map(|o| o.unique_clicks).sum::<usize>(),
        report.total_clicks
    );
}

#[test]
fn test_unique_users_equals_total_when_every_ip_differs() {
    let clicks: Vec<ClickRecord> = (0..5u32)
        .map(|i| click("a", 1, i, "ua", &format!("192.168.0.{}", i)))
        .collect();

    let report = alias_report(&clicks);

    assert_eq!(report.unique_users, report.total_clicks);
}

#[test]
fn test_topic_report_lists_every_url_including_idle_ones() {
    let urls = vec![url("first", "news"), url("second", "news"), url("idle", "news")];
    let clicks = vec![
        click("first", 1, 0, "ua", "1.1.1.1"),
        click("second", 1, 1, "ua", "1.1.1.1"),
        click("first", 2, 0, "ua", "2.2.2.2"),
        click("first", 2, 1, "ua", "2.2.2.2"),
    ];

    let report = topic_report(&urls, &clicks);

    assert_eq!(report.total_clicks, 4);
    assert_eq!(report.unique_users, 2);
    assert_eq!(report.clicks_by_date.len(), 2);

    let per_url: Vec<(&str, usize, usize)> = report
        .urls
        .iter()
        .map(|u| (u.short_url.as_str(), u.total_clicks, u.unique_users))
        .collect();
    assert_eq!(
        per_url,
        vec![("first", 3, 2), ("second", 1, 1), ("idle", 0, 0)]
    );
}

#[test]
fn test_overall_report_counts_urls() {
    let urls = vec![url("one", "a"), url("two", "b")];
    let clicks = vec![
        click("one", 1, 0, "Mozilla/5.0 (Mobile)", "1.1.1.1"),
        click("two", 1, 0, "Mozilla/5.0 (X11)", "1.1.1.1"),
    ];

    let report = overall_report(&urls, &clicks);

    assert_eq!(report.total_urls, 2);
    assert_eq!(report.total_clicks, 2);
    assert_eq!(report.unique_users, 1);
    assert_eq!(report.device_type.len(), 2);
    assert_eq!(report.os_type.len(), 1);
}

#[test]
fn test_overall_report_serializes_camel_case() {
    let urls = vec![url("one", "a")];
    let clicks = vec![click("one", 1, 0, "Mozilla/5.0 (Mobile)", "1.1.1.1")];

    let value = serde_json::to_value(overall_report(&urls, &clicks)).unwrap();

    assert_eq!(value["totalUrls"], 1);
    assert_eq!(value["clicksByDate"][0]["date"], "2024-03-01");
    assert_eq!(value["osType"][0]["osName"], "Mozilla/5.0");
    assert_eq!(value["deviceType"][0]["deviceName"], "mobile");
}
