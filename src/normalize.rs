//! URN and timestamp normalization for lead payloads.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

pub const SPONSORED_ACCOUNT_URN: &str = "urn:li:sponsoredAccount:";
pub const SPONSORED_CAMPAIGN_URN: &str = "urn:li:sponsoredCampaign:";
pub const SPONSORED_CREATIVE_URN: &str = "urn:li:sponsoredCreative:";

const URN_PREFIXES: [&str; 3] = [
    SPONSORED_ACCOUNT_URN,
    SPONSORED_CAMPAIGN_URN,
    SPONSORED_CREATIVE_URN,
];

/// Output format of submission timestamps.
pub const UTC_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Strip the sponsored account/campaign/creative URN prefix.
///
/// Absent input yields an empty string. Bare ids come back unchanged, so
/// stripping twice is the same as stripping once.
pub fn strip_urn(urn: Option<&str>) -> String {
    let Some(urn) = urn else {
        return String::new();
    };

    let mut bare = urn;
    while let Some(rest) = URN_PREFIXES
        .iter()
        .find_map(|prefix| bare.strip_prefix(prefix))
    {
        bare = rest;
    }
    bare.to_string()
}

fn form_id_regex() -> &'static Regex {
    static FORM_ID: OnceLock<Regex> = OnceLock::new();
    FORM_ID.get_or_init(|| Regex::new(r"urn:li:leadGenForm:(\d+)").expect("valid form id regex"))
}

/// Extract the numeric form id from a `versionedLeadGenFormUrn`.
///
/// Only the explicit `urn:li:leadGenForm:{digits}` form is recognised.
pub fn extract_form_id(versioned_urn: Option<&str>) -> Option<String> {
    let urn = versioned_urn?;
    form_id_regex()
        .captures(urn)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Format an epoch-millisecond timestamp as `YYYY-MM-DD HH:MM:SS` (UTC).
///
/// `None` and out-of-range values yield `None`.
pub fn convert_epoch_to_utc(epoch_ms: Option<i64>) -> Option<String> {
    let epoch_ms = epoch_ms?;
    DateTime::<Utc>::from_timestamp_millis(epoch_ms).map(|dt| dt.format(UTC_FORMAT).to_string())
}

/// True when `account_id` (bare or URN) is a non-empty run of digits.
pub fn is_valid_account_id(account_id: &str) -> bool {
    let bare = strip_urn(Some(account_id.trim()));
    !bare.is_empty() && bare.chars().all(|c| c.is_ascii_digit())
}
