//! Scorecard page parsing.
//!
//! Content shape never fails this parser: a page with no innings tables is a
//! legitimate pre-match state and yields a placeholder result. Only the
//! fetch layer produces hard failures.

use crate::constants::COMPLETION_MARKERS;
use crate::fetcher::RawPage;
use crate::locator::{self, InningsBlock};
use crate::types::{BattingRow, BowlingRow, Innings};
use regex::Regex;
use scraper::{Html, Selector};

/// Markers whose presence suggests an in-progress match. Status text wins
/// over all of them.
const LIVE_INDICATORS: &[&str] = &["cb-text-live", "cb-text-inprogress", r#""isLive":true"#];

pub const NOT_AVAILABLE: &str = "Scorecard not available yet";

#[derive(Debug, Clone)]
pub struct ScorecardResult {
    /// False when the page held no innings data at all (pre-match page).
    pub available: bool,
    pub title: String,
    pub status_text: String,
    pub is_live: bool,
    pub final_score: String,
    pub innings: Vec<Innings>,
}

/// Parse one scorecard page.
pub fn parse(page: &RawPage) -> ScorecardResult {
    let blocks = locator::locate_innings(page);
    let innings: Vec<Innings> = blocks.into_iter().map(typed_innings).collect();

    let title = page_title(page);
    let status_text = status_text(page);
    let is_live = live_flag(&page.html, &status_text);
    let final_score = final_score(&innings);

    ScorecardResult {
        available: !innings.is_empty(),
        title,
        status_text,
        is_live,
        final_score,
        innings,
    }
}

/// A match is live when a live indicator is present AND the status text does
/// not carry completion language; explicit completion always wins.
pub fn live_flag(html: &str, status_text: &str) -> bool {
    let indicator = LIVE_INDICATORS.iter().any(|m| html.contains(m));
    if !indicator {
        return false;
    }
    let status = status_text.to_lowercase();
    !COMPLETION_MARKERS.iter().any(|m| status.contains(m))
}

/// "{team} {score}" for up to the first two innings, joined with " vs ".
pub fn final_score(innings: &[Innings]) -> String {
    innings
        .iter()
        .take(2)
        .filter(|i| !i.team.is_empty())
        .map(|i| format!("{} {}", i.team, i.score).trim().to_string())
        .collect::<Vec<_>>()
        .join(" vs ")
}

fn typed_innings(block: InningsBlock) -> Innings {
    Innings {
        team: block.team,
        score: block.score,
        batting: block.batting.iter().filter_map(|c| batting_row(c)).collect(),
        bowling: block.bowling.iter().filter_map(|c| bowling_row(c)).collect(),
        extras: block.extras,
        total: block.total,
    }
}

/// Cells: name, dismissal, runs, balls, fours, sixes, strike rate.
fn batting_row(cells: &[String]) -> Option<BattingRow> {
    if cells.len() < 7 {
        return None;
    }
    Some(BattingRow {
        name: cells[0].trim().to_string(),
        dismissal: cells[1].trim().to_string(),
        runs: int_cell(&cells[2]),
        balls: int_cell(&cells[3]),
        fours: int_cell(&cells[4]),
        sixes: int_cell(&cells[5]),
        strike_rate: rate_cell(&cells[6]),
    })
}

/// Cells: name, overs, maidens, runs, wickets, no-balls, wides, economy.
fn bowling_row(cells: &[String]) -> Option<BowlingRow> {
    if cells.len() < 8 {
        return None;
    }
    Some(BowlingRow {
        name: cells[0].trim().to_string(),
        overs: rate_cell(&cells[1]).unwrap_or(0.0),
        maidens: int_cell(&cells[2]),
        runs: int_cell(&cells[3]),
        wickets: int_cell(&cells[4]),
        no_balls: int_cell(&cells[5]),
        wides: int_cell(&cells[6]),
        economy: rate_cell(&cells[7]),
    })
}

/// "-" placeholders parse to zero.
fn int_cell(cell: &str) -> u32 {
    cell.trim().parse().unwrap_or(0)
}

/// "-" placeholders parse to None.
fn rate_cell(cell: &str) -> Option<f64> {
    cell.trim().parse().ok()
}

fn page_title(page: &RawPage) -> String {
    let document = Html::parse_document(&page.html);
    for sel in ["h1", "title"] {
        let selector = Selector::parse(sel).unwrap();
        if let Some(el) = document.select(&selector).next() {
            let text = el.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                // Page titles carry site boilerplate after the match name.
                return text
                    .split(" | ")
                    .next()
                    .unwrap_or(&text)
                    .trim()
                    .to_string();
            }
        }
    }
    String::new()
}

fn status_text(page: &RawPage) -> String {
    let document = Html::parse_document(&page.html);
    let selectors = [
        r#"div[class*="text-complete"]"#,
        r#"div[class*="text-live"]"#,
        r#"div[class*="text-inprogress"]"#,
        r#"div[class*="text-preview"]"#,
    ];
    for sel in selectors {
        let selector = Selector::parse(sel).unwrap();
        if let Some(el) = document.select(&selector).next() {
            let text = el.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                return text;
            }
        }
    }
    // Regex fallback for layouts that dropped the status classes.
    let re = Regex::new(r"(?i)([A-Za-z ]+ won by [^<.]+|Match drawn|Match tied|No result|Match abandoned[^<.]*)").unwrap();
    re.captures(&page.html)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_default()
}
