//! Turns located blocks into series and match records.

use crate::constants::{BASE_URL, TITLE_SUFFIX_PATTERN};
use crate::fetcher::RawPage;
use crate::locator::{MatchLinkBlock, SeriesBlock};
use crate::types::SeriesRecord;
use chrono::{Datelike, Utc};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

const MONTHS_FULL: &str = "January|February|March|April|May|June|July|August|September|October|November|December";
const MONTHS_ABBR: &str = "Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec";

/// A match link reduced to its attribution-relevant parts. Becomes a
/// MatchRecord only after the attribution engine accepts it for a series.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub external_id: String,
    pub slug: String,
    pub title: String,
    pub url: String,
    pub date: String,
}

/// Extract series records from located blocks. Dedupe is by canonical URL
/// within the run; the storage layer's unique-URL constraint guards the rest.
pub fn series(blocks: &[SeriesBlock], page: &RawPage) -> Vec<SeriesRecord> {
    static ID_RE: OnceLock<Regex> = OnceLock::new();
    let id_re = ID_RE.get_or_init(|| Regex::new(r"/cricket-series/(\d+)/").unwrap());
    let (month, year) = page_month_year(&page.html);

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for block in blocks {
        let base = block.href.trim_end_matches('/').trim_end_matches("/matches").to_string();
        if !seen.insert(base.clone()) {
            continue;
        }

        let mut url = format!("{}{}", BASE_URL, block.href);
        if !url.contains("/matches") {
            url = format!("{}/matches", url.trim_end_matches('/'));
        }

        let (name, range_from_name) = split_name_and_range(&block.name);
        if name.len() < 3 {
            continue;
        }
        let date_range = if block.date_text.is_empty() { range_from_name } else { block.date_text.clone() };

        records.push(SeriesRecord {
            id: None,
            external_id: id_re.captures(&block.href).map(|c| c[1].to_string()),
            month: month.clone(),
            year: year.clone(),
            name,
            date_range,
            url,
            created_at: Utc::now(),
        });
    }
    records
}

/// Extract match candidates from located links, deduplicated by external id.
pub fn matches(blocks: &[MatchLinkBlock], page: &RawPage) -> Vec<MatchCandidate> {
    static LINK_RE: OnceLock<Regex> = OnceLock::new();
    static SUFFIX_RE: OnceLock<Regex> = OnceLock::new();
    let link_re =
        LINK_RE.get_or_init(|| Regex::new(r"/live-cricket-scores/(\d+)/([^/?#]+)").unwrap());
    let suffix_re = SUFFIX_RE.get_or_init(|| Regex::new(TITLE_SUFFIX_PATTERN).unwrap());

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for block in blocks {
        let Some(caps) = link_re.captures(&block.href) else { continue };
        let external_id = caps[1].to_string();
        let slug = caps[2].to_lowercase();
        if !seen.insert(external_id.clone()) {
            continue;
        }

        let title = suffix_re.replace(&block.title, "").trim().to_string();
        if title.len() <= 2 {
            continue;
        }

        let date = match_date(&page.html, &external_id, &block.title);
        candidates.push(MatchCandidate {
            url: format!("{}{}", BASE_URL, block.href),
            external_id,
            slug,
            title,
            date,
        });
    }
    candidates
}

/// Month/year header of the schedule page, falling back to the current date
/// when no header survives the layout of the day.
fn page_month_year(html: &str) -> (String, String) {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re =
        RE.get_or_init(|| Regex::new(&format!(r"({})\s+(\d{{4}})", MONTHS_FULL)).unwrap());
    if let Some(caps) = re.captures(html) {
        return (caps[1].to_string(), caps[2].to_string());
    }
    let now = Utc::now();
    (now.format("%B").to_string(), now.year().to_string())
}

/// Split a series row's display text into a name and an optional
/// "Jan 5 - Jan 9" style date range.
pub fn split_name_and_range(text: &str) -> (String, String) {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(&format!(
            r"^(.*?)\s*((?:{m})\s+\d{{1,2}}\s*-\s*(?:{m})\s+\d{{1,2}})\s*$",
            m = MONTHS_ABBR
        ))
        .unwrap()
    });
    match re.captures(text.trim()) {
        Some(caps) => (caps[1].trim().to_string(), caps[2].trim().to_string()),
        None => (text.trim().to_string(), String::new()),
    }
}

/// Best-effort match date, first successful tier wins:
/// 1. an embedded epoch-millis timestamp near the match id in the raw page,
/// 2. a month/day pair inside the link's status fragment,
/// 3. the nearest preceding weekday-prefixed date text.
///
/// Tiers 2 and 3 yield a month/day display string without a year on purpose:
/// pinning the scrape-time year mis-dates fixtures that cross a year
/// boundary, so no year is fabricated.
fn match_date(html: &str, external_id: &str, raw_title: &str) -> String {
    if let Some(date) = date_from_embedded_timestamp(html, external_id) {
        return date;
    }
    if let Some(date) = date_from_month_day(raw_title) {
        return date;
    }
    date_from_preceding_weekday(html, external_id).unwrap_or_default()
}

fn date_from_embedded_timestamp(html: &str, external_id: &str) -> Option<String> {
    let pos = html.find(&format!("/live-cricket-scores/{}/", external_id))?;
    // The schedule markup keeps the timestamp attribute within the same card.
    let window_start = pos.saturating_sub(600);
    let window_end = (pos + 600).min(html.len());
    let window = &html[window_start..window_end];

    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r#"timestamp="(\d{10,13})""#).unwrap());
    let millis: i64 = re.captures(window)?.get(1)?.as_str().parse().ok()?;
    let millis = if millis < 10_000_000_000 { millis * 1000 } else { millis };
    chrono::DateTime::from_timestamp_millis(millis).map(|dt| dt.format("%b %d, %Y").to_string())
}

fn date_from_month_day(fragment: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE
        .get_or_init(|| Regex::new(&format!(r"\b({})\s+(\d{{1,2}})\b", MONTHS_ABBR)).unwrap());
    re.captures(fragment).map(|caps| format!("{} {}", &caps[1], &caps[2]))
}

fn date_from_preceding_weekday(html: &str, external_id: &str) -> Option<String> {
    let pos = html.find(&format!("/live-cricket-scores/{}/", external_id))?;
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?:Mon|Tue|Wed|Thu|Fri|Sat|Sun)[a-z]*,?\s+(({m})[a-z]*\s+\d{{1,2}})",
            m = MONTHS_ABBR
        ))
        .unwrap()
    });
    re.captures_iter(&html[..pos])
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
