//! Layered markup location.
//!
//! The source site has shipped several incompatible layouts over time, so
//! every block type is located by an ordered list of strategies: structural
//! CSS selectors first, raw-text regex last. The first strategy that yields
//! at least one block wins. Zero candidates is a valid low-information
//! result, never an error.

use crate::constants::NON_PLAYER_LABELS;
use crate::fetcher::RawPage;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// A series row located on the schedule page.
#[derive(Debug, Clone)]
pub struct SeriesBlock {
    pub href: String,
    pub name: String,
    pub date_text: String,
}

/// A match link located on a series page.
#[derive(Debug, Clone)]
pub struct MatchLinkBlock {
    pub href: String,
    pub title: String,
}

/// One innings region of a scorecard page with raw cell rows. Typed rows are
/// built downstream by the scorecard parser.
#[derive(Debug, Clone, Default)]
pub struct InningsBlock {
    pub team: String,
    pub score: String,
    pub batting: Vec<Vec<String>>,
    pub bowling: Vec<Vec<String>>,
    pub extras: Option<String>,
    pub total: Option<String>,
}

/// A single locate-candidates capability. Strategies are pure over the page.
pub trait Locate<B>: Sync {
    fn name(&self) -> &'static str;
    fn locate(&self, page: &RawPage) -> Vec<B>;
}

/// Try strategies in order, stopping at the first non-empty result.
fn run_ordered<B>(page: &RawPage, strategies: &[&dyn Locate<B>], what: &str) -> Vec<B> {
    for strategy in strategies {
        let blocks = strategy.locate(page);
        if !blocks.is_empty() {
            debug!("{}: strategy '{}' located {} blocks", what, strategy.name(), blocks.len());
            return blocks;
        }
    }
    debug!("{}: no strategy located any blocks", what);
    Vec::new()
}

pub fn locate_series(page: &RawPage) -> Vec<SeriesBlock> {
    run_ordered(page, &[&SeriesAnchors, &SeriesAnchorRegex], "series")
}

pub fn locate_match_links(page: &RawPage) -> Vec<MatchLinkBlock> {
    run_ordered(page, &[&MatchAnchors, &MatchAnchorRegex], "match links")
}

pub fn locate_innings(page: &RawPage) -> Vec<InningsBlock> {
    run_ordered(page, &[&ScorecardSections, &ScorecardTables], "innings")
}

fn text_of(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// True when a cell holds an integer, a rate, or the literal placeholder "-".
fn numeric_or_dash(cell: &str) -> bool {
    let cell = cell.trim();
    cell == "-" || cell.parse::<f64>().is_ok()
}

/// A table-like row is only a player row when it is wide enough, its first
/// cell is not a known summary label, and its numeric columns look numeric.
pub fn accept_player_row(cells: &[String], min_cols: usize, numeric_from: usize) -> bool {
    if cells.len() < min_cols {
        return false;
    }
    let first = cells[0].trim();
    if first.is_empty() || NON_PLAYER_LABELS.iter().any(|l| first.starts_with(l)) {
        return false;
    }
    cells[numeric_from..min_cols].iter().all(|c| numeric_or_dash(c))
}

// --- series strategies ----------------------------------------------------

struct SeriesAnchors;

impl Locate<SeriesBlock> for SeriesAnchors {
    fn name(&self) -> &'static str {
        "series-anchors"
    }

    fn locate(&self, page: &RawPage) -> Vec<SeriesBlock> {
        let document = Html::parse_document(&page.html);
        let anchor_sel = Selector::parse(r#"a[href*="/cricket-series/"]"#).unwrap();
        let name_sel = Selector::parse(r#"div[class*="text-ellipsis"]"#).unwrap();
        let date_sel = Selector::parse(r#"div[class*="text-cbTxtSec"]"#).unwrap();
        let href_re = Regex::new(r"^/cricket-series/\d+/").unwrap();

        let mut blocks = Vec::new();
        for anchor in document.select(&anchor_sel) {
            let Some(href) = anchor.value().attr("href") else { continue };
            if !href_re.is_match(href) {
                continue;
            }
            let title = anchor.value().attr("title").unwrap_or("").trim().to_string();
            let name = anchor
                .select(&name_sel)
                .next()
                .map(|d| text_of(&d))
                .filter(|n| !n.is_empty())
                .unwrap_or(title);
            let date_text = anchor.select(&date_sel).next().map(|d| text_of(&d)).unwrap_or_default();
            if !name.is_empty() {
                blocks.push(SeriesBlock { href: href.to_string(), name, date_text });
            }
        }
        blocks
    }
}

struct SeriesAnchorRegex;

impl Locate<SeriesBlock> for SeriesAnchorRegex {
    fn name(&self) -> &'static str {
        "series-anchor-regex"
    }

    fn locate(&self, page: &RawPage) -> Vec<SeriesBlock> {
        let re = Regex::new(r#"(?i)<a[^>]*href="(/cricket-series/\d+/[^"]+)"[^>]*>([^<]+)</a>"#)
            .unwrap();
        re.captures_iter(&page.html)
            .filter_map(|caps| {
                let name = caps[2].trim().to_string();
                if name.len() < 3 {
                    return None;
                }
                Some(SeriesBlock { href: caps[1].to_string(), name, date_text: String::new() })
            })
            .collect()
    }
}

// --- match link strategies ------------------------------------------------

struct MatchAnchors;

impl Locate<MatchLinkBlock> for MatchAnchors {
    fn name(&self) -> &'static str {
        "match-anchors"
    }

    fn locate(&self, page: &RawPage) -> Vec<MatchLinkBlock> {
        let document = Html::parse_document(&page.html);
        let anchor_sel = Selector::parse(r#"a[href*="/live-cricket-scores/"]"#).unwrap();
        let href_re = Regex::new(r"^/live-cricket-scores/\d+/").unwrap();

        let mut blocks = Vec::new();
        for anchor in document.select(&anchor_sel) {
            let Some(href) = anchor.value().attr("href") else { continue };
            if !href_re.is_match(href) {
                continue;
            }
            let title = anchor
                .value()
                .attr("title")
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| text_of(&anchor));
            if !title.is_empty() {
                blocks.push(MatchLinkBlock { href: href.to_string(), title });
            }
        }
        blocks
    }
}

struct MatchAnchorRegex;

impl Locate<MatchLinkBlock> for MatchAnchorRegex {
    fn name(&self) -> &'static str {
        "match-anchor-regex"
    }

    fn locate(&self, page: &RawPage) -> Vec<MatchLinkBlock> {
        let re =
            Regex::new(r#"(?i)href="(/live-cricket-scores/\d+/[^"]+)"[^>]*title="([^"]+)""#)
                .unwrap();
        re.captures_iter(&page.html)
            .map(|caps| MatchLinkBlock { href: caps[1].to_string(), title: caps[2].trim().to_string() })
            .collect()
    }
}

// --- innings strategies ---------------------------------------------------

const BATTING_MIN_COLS: usize = 7;
const BOWLING_MIN_COLS: usize = 8;

/// Current layout: one `div[id^="innings_"]` section per innings, a header
/// row with team and score, then cell-per-div item rows. Batting rows carry
/// seven columns, bowling rows eight.
struct ScorecardSections;

impl Locate<InningsBlock> for ScorecardSections {
    fn name(&self) -> &'static str {
        "scorecard-sections"
    }

    fn locate(&self, page: &RawPage) -> Vec<InningsBlock> {
        let document = Html::parse_document(&page.html);
        let innings_sel = Selector::parse(r#"div[id^="innings_"]"#).unwrap();
        let header_sel = Selector::parse(r#"div[class*="scrd-hdr"] span"#).unwrap();
        let row_sel = Selector::parse(r#"div[class*="scrd-itms"]"#).unwrap();

        let mut blocks = Vec::new();
        for section in document.select(&innings_sel) {
            let mut block = InningsBlock::default();
            let headers: Vec<String> =
                section.select(&header_sel).map(|s| text_of(&s)).collect();
            if let Some(team) = headers.first() {
                block.team = team.clone();
            }
            if let Some(score) = headers.get(1) {
                block.score = score.clone();
            }

            for row in section.select(&row_sel) {
                // Cells are the row's direct div children; nested markup
                // (dismissal links, bold runs) collapses into cell text.
                let cells: Vec<String> = row
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|e| e.value().name() == "div")
                    .map(|c| text_of(&c))
                    .collect();
                sort_row(&mut block, cells);
            }

            if !block.batting.is_empty() || !block.bowling.is_empty() || !block.team.is_empty() {
                blocks.push(block);
            }
        }
        blocks
    }
}

/// Older layout: plain tables headed "Batter"/"Batsman" and "Bowler",
/// innings headers carried as "<Team> Innings <score>" rows above them.
struct ScorecardTables;

impl Locate<InningsBlock> for ScorecardTables {
    fn name(&self) -> &'static str {
        "scorecard-tables"
    }

    fn locate(&self, page: &RawPage) -> Vec<InningsBlock> {
        let document = Html::parse_document(&page.html);
        let table_sel = Selector::parse("table").unwrap();
        let row_sel = Selector::parse("tr").unwrap();
        let cell_sel = Selector::parse("td, th").unwrap();
        let header_re = Regex::new(r"(?i)^(.+?)\s+Innings\s+(.+)$").unwrap();

        // Innings headers appear in page order before their tables; walk the
        // raw text once to pair them up afterwards.
        let headers: Vec<(String, String)> = {
            let text = document.root_element().text().collect::<Vec<_>>().join("\n");
            text.lines()
                .filter_map(|line| {
                    header_re.captures(line.trim()).map(|c| {
                        (c[1].trim().to_string(), c[2].trim().to_string())
                    })
                })
                .collect()
        };

        let mut blocks: Vec<InningsBlock> = Vec::new();
        let mut current: Option<InningsBlock> = None;

        for table in document.select(&table_sel) {
            let mut rows = table.select(&row_sel);
            let Some(first_row) = rows.next() else { continue };
            let head_cells: Vec<String> =
                first_row.select(&cell_sel).map(|c| text_of(&c)).collect();
            let Some(first_cell) = head_cells.first() else { continue };

            let is_batting = first_cell.eq_ignore_ascii_case("batter")
                || first_cell.eq_ignore_ascii_case("batsman");
            let is_bowling = first_cell.eq_ignore_ascii_case("bowler");
            if !is_batting && !is_bowling {
                continue;
            }

            if is_batting {
                // A batting table opens the next innings.
                if let Some(done) = current.take() {
                    blocks.push(done);
                }
                let mut block = InningsBlock::default();
                if let Some((team, score)) = headers.get(blocks.len()) {
                    block.team = team.clone();
                    block.score = score.clone();
                }
                current = Some(block);
            }
            let block = match current.as_mut() {
                Some(b) => b,
                None => continue,
            };

            for row in rows {
                let cells: Vec<String> = row.select(&cell_sel).map(|c| text_of(&c)).collect();
                sort_row(block, cells);
            }
        }
        if let Some(done) = current.take() {
            blocks.push(done);
        }
        blocks
    }
}

/// Route a raw cell row into the innings block: player rows by width and
/// numeric shape, Extras/Total rows into their slots, everything else dropped.
fn sort_row(block: &mut InningsBlock, cells: Vec<String>) {
    if cells.is_empty() {
        return;
    }
    let first = cells[0].trim();
    if first.starts_with("Extras") {
        block.extras = cells.get(1).or(cells.last()).map(|c| c.trim().to_string());
        return;
    }
    if first.starts_with("Total") {
        block.total = cells.get(1).or(cells.last()).map(|c| c.trim().to_string());
        return;
    }
    if accept_player_row(&cells, BOWLING_MIN_COLS, 1) {
        block.bowling.push(cells);
    } else if accept_player_row(&cells, BATTING_MIN_COLS, 2) {
        block.batting.push(cells);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn extras_row_is_never_a_player_row() {
        let cells = row(&["Extras", "(b 4, lb 2, w 6)", "12", "0", "0", "0", "0.0"]);
        assert!(!accept_player_row(&cells, BATTING_MIN_COLS, 2));
    }

    #[test]
    fn narrow_rows_are_rejected() {
        let cells = row(&["V Kohli", "82", "54"]);
        assert!(!accept_player_row(&cells, BATTING_MIN_COLS, 2));
    }

    #[test]
    fn dash_placeholder_counts_as_numeric() {
        let cells = row(&["Yet-to-settle N", "not out", "4", "9", "-", "-", "44.44"]);
        assert!(accept_player_row(&cells, BATTING_MIN_COLS, 2));
    }

    #[test]
    fn non_numeric_tail_is_rejected() {
        let cells = row(&["V Kohli", "c Smith b Starc", "82", "fifty", "7", "3", "151.85"]);
        assert!(!accept_player_row(&cells, BATTING_MIN_COLS, 2));
    }

    #[test]
    fn match_regex_fallback_finds_links() {
        let html = r#"<div><a class="x" href="/live-cricket-scores/1234/1st-odi-ind-vs-pak-2026" title="India vs Pakistan, 1st ODI">India vs Pakistan</a></div>"#;
        let page = RawPage::new("http://t", html);
        let blocks = MatchAnchorRegex.locate(&page);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].title, "India vs Pakistan, 1st ODI");
    }

    #[test]
    fn series_strategies_fall_back_in_order() {
        // No ellipsis/date divs, but the regex strategy still finds anchors.
        let html = r#"<a href="/cricket-series/5678/india-tour-of-england-2026">India tour of England, 2026</a>"#;
        let page = RawPage::new("http://t", html);
        let blocks = locate_series(&page);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].name, "India tour of England, 2026");
    }

    #[test]
    fn zero_candidates_is_an_empty_vec() {
        let page = RawPage::new("http://t", "<html><body>nothing here</body></html>");
        assert!(locate_series(&page).is_empty());
        assert!(locate_match_links(&page).is_empty());
        assert!(locate_innings(&page).is_empty());
    }
}
