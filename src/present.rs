//! Display derivations for an eSIM record
//!
//! Everything here is a pure function of the record the backend returned.
//! Plan-name parsing is best effort only: explicit fields always win, then
//! whatever can be pattern matched out of the plan name, then "N/A".

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

use crate::api::EsimRecord;

pub const NOT_AVAILABLE: &str = "N/A";

/// Statuses that may be renewed (compared case-insensitively)
pub const RENEWABLE_STATUSES: [&str; 3] = ["inactive", "expired", "disabled"];

/// True for absent, blank or "N/A" values
pub fn is_missing(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => {
            let v = v.trim();
            v.is_empty() || v.eq_ignore_ascii_case(NOT_AVAILABLE)
        }
    }
}

fn is_literal_na(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case(NOT_AVAILABLE))
}

/// Text for display, "N/A" when absent
pub fn or_na(value: Option<&str>) -> String {
    if is_missing(value) {
        NOT_AVAILABLE.to_string()
    } else {
        value.unwrap_or_default().trim().to_string()
    }
}

/// Parse the first number out of strings like "2.5GB" or "512 MB".
/// Absent, "N/A" and unparseable input all yield 0.
pub fn parse_data_value(value: Option<&str>) -> f64 {
    let Some(s) = value else { return 0.0 };
    if s.trim().eq_ignore_ascii_case(NOT_AVAILABLE) {
        return 0.0;
    }

    let Some(start) = s.find(|c: char| c.is_ascii_digit() || c == '.') else {
        return 0.0;
    };

    let mut number = String::new();
    let mut seen_dot = false;
    for c in s[start..].chars() {
        match c {
            '0'..='9' => number.push(c),
            '.' if !seen_dot => {
                seen_dot = true;
                number.push(c);
            }
            _ => break,
        }
    }

    number.parse().unwrap_or(0.0)
}

/// Unit suffix of a data string, defaulting to GB
pub fn data_unit(value: Option<&str>) -> &'static str {
    let upper = value.unwrap_or_default().to_ascii_uppercase();
    if upper.contains("MB") {
        "MB"
    } else if upper.contains("KB") {
        "KB"
    } else if upper.contains("TB") {
        "TB"
    } else {
        "GB"
    }
}

/// Every run of ASCII digits with the text that follows it
fn digit_runs(s: &str) -> impl Iterator<Item = (&str, &str)> {
    let bytes = s.as_bytes();
    let mut i = 0;
    std::iter::from_fn(move || {
        while i < bytes.len() && !bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        Some((&s[start..i], &s[i..]))
    })
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

/// "Turkey 7 Day 5GB" -> "7 Days"
pub fn extract_validity(plan_name: &str) -> Option<String> {
    digit_runs(plan_name).find_map(|(digits, rest)| {
        strip_prefix_ignore_case(rest.trim_start(), "day")?;
        let days: u64 = digits.parse().ok()?;
        Some(format!("{} {}", days, if days == 1 { "Day" } else { "Days" }))
    })
}

/// "Turkey 7 Day 5GB" -> "5 GB"
pub fn extract_capacity(plan_name: &str) -> Option<String> {
    digit_runs(plan_name).find_map(|(digits, rest)| {
        let rest = rest.trim_start();
        ["GB", "MB"]
            .into_iter()
            .find(|unit| strip_prefix_ignore_case(rest, unit).is_some())
            .map(|unit| format!("{} {}", digits, unit))
    })
}

/// Explicit field, else plan-name pattern, else "N/A"
fn with_plan_fallback(explicit: Option<&str>, plan_name: Option<&str>, extract: fn(&str) -> Option<String>) -> String {
    if !is_missing(explicit) {
        return or_na(explicit);
    }
    plan_name
        .and_then(extract)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Human-readable timestamp; unknown formats are shown as-is
pub fn format_timestamp(value: Option<&str>) -> String {
    if is_missing(value) {
        return NOT_AVAILABLE.to_string();
    }
    let raw = value.unwrap_or_default().trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Local).format("%b %-d, %Y %H:%M").to_string();
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return dt.format("%b %-d, %Y %H:%M").to_string();
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%b %-d, %Y").to_string();
    }

    raw.to_string()
}

/// Renewal is offered only for inactive, expired or disabled eSIMs
pub fn renewal_eligible(status: Option<&str>) -> bool {
    let Some(status) = status else { return false };
    let status = status.trim();
    RENEWABLE_STATUSES
        .iter()
        .any(|s| status.eq_ignore_ascii_case(s))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Active,
    Attention,
}

/// Values for the consumed/remaining chart
#[derive(Debug, Clone, PartialEq)]
pub struct UsageChart {
    pub consumed: f64,
    pub remaining: f64,
    pub unit: &'static str,
}

impl UsageChart {
    /// Share of the plan still available, 0.0..=1.0
    pub fn remaining_ratio(&self) -> f64 {
        let total = self.consumed + self.remaining;
        if total <= 0.0 {
            0.0
        } else {
            (self.remaining / total).clamp(0.0, 1.0)
        }
    }
}

/// Everything the results screen shows, derived once per lookup
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsView {
    pub iccid: String,
    pub order_sim_id: String,
    pub provider: String,
    pub plan_name: String,
    pub status: String,
    pub status_tone: StatusTone,
    pub purchase_date: String,
    pub validity: String,
    pub capacity: String,
    pub activation_code: String,
    pub apn: String,
    pub data_consumed: String,
    pub data_remaining: String,
    pub last_updated: String,
    pub total_capacity: f64,
    /// `None` when the backend reported "N/A" usage
    pub usage: Option<UsageChart>,
    pub can_renew: bool,
}

impl ResultsView {
    pub fn from_record(record: &EsimRecord) -> Self {
        let status = record.status.as_deref();
        let plan = record.plan_name.as_deref();
        let consumed = record.data_consumed.as_deref();
        let remaining = record.data_remaining.as_deref();

        let usage = if is_literal_na(consumed) || is_literal_na(remaining) {
            None
        } else {
            Some(UsageChart {
                consumed: parse_data_value(consumed),
                remaining: parse_data_value(remaining),
                unit: data_unit(remaining.or(consumed)),
            })
        };

        let status_tone = match status {
            Some(s) if s.trim().eq_ignore_ascii_case("active") => StatusTone::Active,
            _ => StatusTone::Attention,
        };

        Self {
            iccid: or_na(record.iccid.as_deref()),
            order_sim_id: or_na(record.order_sim_id.as_deref()),
            provider: or_na(record.api_provider.as_deref()),
            plan_name: or_na(plan),
            status: or_na(status),
            status_tone,
            purchase_date: format_timestamp(record.purchase_date.as_deref()),
            validity: with_plan_fallback(record.validity.as_deref(), plan, extract_validity),
            capacity: with_plan_fallback(record.data_capacity.as_deref(), plan, extract_capacity),
            activation_code: or_na(record.activation_code.as_deref()),
            apn: or_na(record.apn.as_deref()),
            data_consumed: or_na(consumed),
            data_remaining: or_na(remaining),
            last_updated: format_timestamp(record.last_updated.as_deref()),
            total_capacity: parse_data_value(record.data_capacity.as_deref()),
            usage,
            can_renew: renewal_eligible(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(plan: &str) -> EsimRecord {
        EsimRecord {
            iccid: Some("8934071010012043449".to_string()),
            plan_name: Some(plan.to_string()),
            status: Some("Active".to_string()),
            ..EsimRecord::default()
        }
    }

    #[test]
    fn test_parse_data_value() {
        assert_eq!(parse_data_value(Some("2.5GB")), 2.5);
        assert_eq!(parse_data_value(Some("512 MB")), 512.0);
        assert_eq!(parse_data_value(Some("Remaining: 1.25 GB")), 1.25);
        assert_eq!(parse_data_value(Some("N/A")), 0.0);
        assert_eq!(parse_data_value(Some("unlimited")), 0.0);
        assert_eq!(parse_data_value(Some("1.2.3")), 1.2);
        assert_eq!(parse_data_value(None), 0.0);
    }

    #[test]
    fn test_usage_chart_suppressed_for_na() {
        let mut r = record("Plan");
        r.data_consumed = Some("N/A".to_string());
        r.data_remaining = Some("3GB".to_string());
        assert_eq!(ResultsView::from_record(&r).usage, None);

        r.data_consumed = Some("1GB".to_string());
        r.data_remaining = Some("N/A".to_string());
        assert_eq!(ResultsView::from_record(&r).usage, None);
    }

    #[test]
    fn test_usage_chart_values() {
        let mut r = record("Plan");
        r.data_consumed = Some("1GB".to_string());
        r.data_remaining = Some("3GB".to_string());
        let usage = ResultsView::from_record(&r).usage.unwrap();
        assert_eq!(usage.consumed, 1.0);
        assert_eq!(usage.remaining, 3.0);
        assert_eq!(usage.unit, "GB");
        assert_eq!(usage.remaining_ratio(), 0.75);

        // Missing fields chart as zero rather than hiding the chart
        let view = ResultsView::from_record(&record("Plan"));
        let usage = view.usage.unwrap();
        assert_eq!(usage.remaining_ratio(), 0.0);
        assert_eq!(view.data_remaining, "N/A");
    }

    #[test]
    fn test_plan_name_fallbacks() {
        let view = ResultsView::from_record(&record("Turkey 7 Day 5GB"));
        assert_eq!(view.validity, "7 Days");
        assert_eq!(view.capacity, "5 GB");

        let view = ResultsView::from_record(&record("Europe 1 day 500 mb"));
        assert_eq!(view.validity, "1 Day");
        assert_eq!(view.capacity, "500 MB");

        let view = ResultsView::from_record(&record("Generic Plan"));
        assert_eq!(view.validity, "N/A");
        assert_eq!(view.capacity, "N/A");
    }

    #[test]
    fn test_explicit_fields_win() {
        let mut r = record("Turkey 7 Day 5GB");
        r.validity = Some("30 Days".to_string());
        r.data_capacity = Some("10GB".to_string());
        let view = ResultsView::from_record(&r);
        assert_eq!(view.validity, "30 Days");
        assert_eq!(view.capacity, "10GB");
        assert_eq!(view.total_capacity, 10.0);

        // "N/A" counts as absent
        r.validity = Some("N/A".to_string());
        assert_eq!(ResultsView::from_record(&r).validity, "7 Days");
    }

    #[test]
    fn test_capacity_skips_decimal_prefix() {
        assert_eq!(extract_capacity("Asia 2.5GB").as_deref(), Some("5 GB"));
        assert_eq!(extract_capacity("Days only 30 Days"), None);
    }

    #[test]
    fn test_renewal_eligibility() {
        for status in ["inactive", "EXPIRED", " Disabled "] {
            assert!(renewal_eligible(Some(status)), "{} should renew", status);
        }
        for status in ["active", "released", "pending", ""] {
            assert!(!renewal_eligible(Some(status)), "{} should not renew", status);
        }
        assert!(!renewal_eligible(None));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(Some("2024-03-05")), "Mar 5, 2024");
        assert_eq!(format_timestamp(Some("2024-03-05 14:07:00")), "Mar 5, 2024 14:07");
        assert_eq!(format_timestamp(Some("yesterday")), "yesterday");
        assert_eq!(format_timestamp(None), "N/A");
        assert_ne!(format_timestamp(Some("2024-03-05T14:07:00Z")), "2024-03-05T14:07:00Z");
    }

    #[test]
    fn test_status_tone() {
        assert_eq!(ResultsView::from_record(&record("x")).status_tone, StatusTone::Active);
        let mut r = record("x");
        r.status = Some("expired".to_string());
        let view = ResultsView::from_record(&r);
        assert_eq!(view.status_tone, StatusTone::Attention);
        assert!(view.can_renew);
    }
}
