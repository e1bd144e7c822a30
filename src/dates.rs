//! Publish-date normalization for feed items.
//!
//! Feeds publish `pubDate` in one of two RFC 1123 flavours: with a numeric
//! zone (`Tue, 10 Nov 2020 10:00:00 +0000`) or with a named zone
//! (`Tue, 10 Nov 2020 10:00:00 GMT`). Which flavour applies is decided by
//! sniffing the last three characters: if they parse as an integer the
//! numeric rule is used, otherwise the named one. The rules are tried in
//! order and the first that applies and parses wins.

use crate::error::DateError;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use tracing::debug;

/// A candidate parse rule for `pubDate` text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRule {
    /// RFC 1123 with a numeric zone, e.g. `+0000` or `-0500`.
    NumericOffset,
    /// RFC 1123 with a zone abbreviation, e.g. `GMT` or `EST`.
    NamedZone,
}

const RULES: [DateRule; 2] = [DateRule::NumericOffset, DateRule::NamedZone];

impl DateRule {
    fn applies(self, raw: &str) -> bool {
        let numeric = trailing_zone_is_numeric(raw);
        match self {
            DateRule::NumericOffset => numeric,
            DateRule::NamedZone => !numeric,
        }
    }

    fn parse(self, raw: &str) -> Option<DateTime<Utc>> {
        let body = strip_weekday(raw);
        match self {
            DateRule::NumericOffset => DateTime::parse_from_str(body, "%d %b %Y %H:%M:%S %z")
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            DateRule::NamedZone => {
                let (stamp, zone) = body.rsplit_once(char::is_whitespace)?;
                let offset = zone_offset(zone)?;
                let naive = NaiveDateTime::parse_from_str(stamp.trim_end(), "%d %b %Y %H:%M:%S").ok()?;
                offset
                    .from_local_datetime(&naive)
                    .single()
                    .map(|dt| dt.with_timezone(&Utc))
            }
        }
    }
}

/// Normalize a raw `pubDate` into a UTC timestamp.
///
/// Returns the rule that accepted the text alongside the timestamp.
pub fn normalize_pub_date(raw: &str) -> Result<(DateTime<Utc>, DateRule), DateError> {
    let raw = raw.trim();
    for rule in RULES {
        if !rule.applies(raw) {
            continue;
        }
        if let Some(date) = rule.parse(raw) {
            debug!(?rule, %raw, %date, "Normalized publish date");
            return Ok((date, rule));
        }
    }
    Err(DateError::Unrecognised(raw.to_string()))
}

fn trailing_zone_is_numeric(raw: &str) -> bool {
    let count = raw.chars().count();
    if count < 3 {
        return false;
    }
    let tail: String = raw.chars().skip(count - 3).collect();
    tail.parse::<i32>().is_ok()
}

// Feeds get the weekday wrong often enough that it is not worth validating.
fn strip_weekday(raw: &str) -> &str {
    match raw.split_once(',') {
        Some((day, rest)) if day.chars().all(char::is_alphabetic) => rest.trim_start(),
        _ => raw,
    }
}

fn zone_offset(zone: &str) -> Option<FixedOffset> {
    if zone.is_empty() || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let hours = match zone.to_ascii_uppercase().as_str() {
        "GMT" | "UT" | "UTC" | "Z" => 0,
        "EST" => -5,
        "EDT" => -4,
        "CST" => -6,
        "CDT" => -5,
        "MST" => -7,
        "MDT" => -6,
        "PST" => -8,
        "PDT" => -7,
        "BST" | "CET" => 1,
        "CEST" => 2,
        other => {
            debug!(zone = other, "Unknown zone abbreviation; assuming UTC");
            0
        }
    };
    FixedOffset::east_opt(hours * 3600)
}
