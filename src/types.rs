use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A series (tournament or tour) discovered on the schedule page.
///
/// The canonical URL is the unique key: re-scraping the schedule page must
/// never insert a second row for the same URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesRecord {
    pub id: Option<Uuid>,
    pub external_id: Option<String>,
    pub month: String,
    pub year: String,
    pub name: String,
    pub date_range: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// A fixture within a series. Unique on (series_id, external_id) so that
/// re-scraping a series page is idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: Option<Uuid>,
    pub series_id: Uuid,
    pub external_id: String,
    pub title: String,
    pub url: String,
    /// Best-effort display date; may be empty when no fallback tier matched.
    pub date: String,
    pub created_at: DateTime<Utc>,
}

/// One batting line of an innings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattingRow {
    pub name: String,
    pub dismissal: String,
    pub runs: u32,
    pub balls: u32,
    pub fours: u32,
    pub sixes: u32,
    pub strike_rate: Option<f64>,
}

/// One bowling line of an innings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BowlingRow {
    pub name: String,
    pub overs: f64,
    pub maidens: u32,
    pub runs: u32,
    pub wickets: u32,
    pub no_balls: u32,
    pub wides: u32,
    pub economy: Option<f64>,
}

/// One team's batting turn with full detail rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Innings {
    pub team: String,
    pub score: String,
    pub batting: Vec<BattingRow>,
    pub bowling: Vec<BowlingRow>,
    pub extras: Option<String>,
    pub total: Option<String>,
}

/// Stored scorecard, keyed by the external match id. Joined to MatchRecord
/// through that id even though the two are populated by independent passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorecardRecord {
    pub id: Option<Uuid>,
    pub match_external_id: String,
    pub title: String,
    pub status_text: String,
    pub is_live: bool,
    /// One "{team} {score}" entry per innings, joined with " vs ".
    pub final_score: String,
    pub innings: Vec<Innings>,
    /// SHA-256 of the source page; lets the live refresher skip unchanged pages.
    pub page_digest: String,
    pub last_updated: DateTime<Utc>,
}

/// Auxiliary team lookup row (flag images, display names).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRecord {
    pub id: Option<Uuid>,
    pub external_id: String,
    pub name: String,
    pub team_type: String,
    pub flag_url: Option<String>,
}

/// Auxiliary player lookup row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: Option<Uuid>,
    pub external_id: String,
    pub team_external_id: String,
    pub name: String,
    pub role: Option<String>,
    pub batting_style: Option<String>,
    pub bowling_style: Option<String>,
    pub image_url: Option<String>,
}

/// Flat success/message shape handed back to the embedding CRUD layer.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeOutcome {
    pub success: bool,
    pub message: String,
}

impl ScrapeOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}

/// Result of a single scorecard scrape, shaped for the display layer.
#[derive(Debug, Clone, Serialize)]
pub struct ScorecardOutcome {
    pub success: bool,
    pub message: String,
    pub final_score: String,
    pub is_live: bool,
    pub status_text: String,
}

/// Summary of a batch operation. Per-item diagnostics stay in the logs;
/// callers only get counts.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub inserted: usize,
    /// Per-item storage failures.
    pub failed: usize,
    /// Series whose fixture page could not be scraped at all; only set by
    /// batch match scrapes.
    pub failed_series: usize,
}
