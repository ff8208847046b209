//! Assigns discovered matches to series.
//!
//! No foreign key exists in the source pages, so membership is decided by an
//! ordered chain of pure rules over the candidate slug/title and the series
//! metadata. The first decisive rule wins; the two veto rules in front can
//! never be overridden by the permissive rules behind them. A candidate no
//! rule claims is silently dropped — on a schedule page most matches belong
//! to some other series, so ambiguity is not an error.

use crate::constants::{
    country_aliases, DISJOINT_COMPETITION_MARKERS, JUNIOR_WOMENS_MARKERS, LEAGUE_MARKERS,
};
use crate::extract::MatchCandidate;
use crate::types::SeriesRecord;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// Series metadata pre-digested for rule evaluation.
#[derive(Debug, Clone)]
pub struct SeriesContext {
    pub name: String,
    pub slug: String,
    pub is_league: bool,
    pub is_junior_or_womens: bool,
    /// One alias set per country named in the series title.
    pub alias_sets: Vec<Vec<String>>,
}

impl SeriesContext {
    pub fn new(series: &SeriesRecord) -> Self {
        static SLUG_RE: OnceLock<Regex> = OnceLock::new();
        let slug_re =
            SLUG_RE.get_or_init(|| Regex::new(r"/cricket-series/\d+/([^/?#]+)").unwrap());

        let name = series.name.to_lowercase();
        let slug = slug_re
            .captures(&series.url)
            .map(|c| c[1].trim_end_matches("/matches").to_lowercase())
            .unwrap_or_default();
        let hyphenated_name = crate::roster::slugify(&series.name);

        let is_league = LEAGUE_MARKERS
            .iter()
            .any(|m| slug.contains(m) || hyphenated_name.contains(m));
        let is_junior_or_womens = JUNIOR_WOMENS_MARKERS
            .iter()
            .any(|m| slug.contains(m) || hyphenated_name.contains(m));

        let alias_sets = country_aliases()
            .into_iter()
            .filter(|(country, _)| name.contains(country))
            .map(|(_, aliases)| aliases.into_iter().map(str::to_string).collect())
            .collect();

        Self { name, slug, is_league, is_junior_or_womens, alias_sets }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Verdict {
    Accept,
    Reject,
}

type Rule = fn(&MatchCandidate, &SeriesContext) -> Option<Verdict>;

/// The chain, in authoritative order.
const RULES: &[(&str, Rule)] = &[
    ("veto-junior-womens", veto_junior_womens),
    ("veto-league-international", veto_league_international),
    ("slug-containment", accept_slug_containment),
    ("two-team-aliases", accept_two_team_aliases),
    ("single-team-alias", accept_single_team_alias),
    ("league-default", league_default),
    ("keyword-fallback", accept_keyword_fallback),
];

/// Decide whether a candidate match belongs to the series.
pub fn belongs_to(candidate: &MatchCandidate, series: &SeriesContext) -> bool {
    for (name, rule) in RULES {
        if let Some(verdict) = rule(candidate, series) {
            debug!(
                "attribution: '{}' decided {:?} for match {} against '{}'",
                name, verdict, candidate.slug, series.name
            );
            return verdict == Verdict::Accept;
        }
    }
    false
}

/// Women's/U-19 fixtures never belong to the parallel men's tournament.
fn veto_junior_womens(c: &MatchCandidate, s: &SeriesContext) -> Option<Verdict> {
    let title = c.title.to_lowercase().replace(' ', "-");
    let candidate_is_junior = JUNIOR_WOMENS_MARKERS
        .iter()
        .any(|m| c.slug.contains(m) || title.contains(m));
    if candidate_is_junior && !s.is_junior_or_womens {
        return Some(Verdict::Reject);
    }
    None
}

/// Leagues and bilateral series share team abbreviations; an international
/// ordinal marker ("3rd ODI", "1st Test") disqualifies a league attribution.
fn veto_league_international(c: &MatchCandidate, s: &SeriesContext) -> Option<Verdict> {
    if s.is_league && international_marker(&c.slug) {
        return Some(Verdict::Reject);
    }
    None
}

fn international_marker(slug: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|-)\d+(?:st|nd|rd|th)-(?:odi|t20i|test)(?:-|$)").unwrap()
    })
    .is_match(slug)
}

/// Strongest signal: the series' own slug embedded in the match slug.
fn accept_slug_containment(c: &MatchCandidate, s: &SeriesContext) -> Option<Verdict> {
    if !s.slug.is_empty() && c.slug.contains(&s.slug) {
        return Some(Verdict::Accept);
    }
    None
}

/// Both teams of a bilateral series recognized by alias.
fn accept_two_team_aliases(c: &MatchCandidate, s: &SeriesContext) -> Option<Verdict> {
    let found = s
        .alias_sets
        .iter()
        .filter(|aliases| aliases.iter().any(|a| slug_has_token(&c.slug, a)))
        .count();
    if found >= 2 {
        return Some(Verdict::Accept);
    }
    None
}

/// A single-team context (e.g. "England tour of ...") matched by alias.
fn accept_single_team_alias(c: &MatchCandidate, s: &SeriesContext) -> Option<Verdict> {
    if s.alias_sets.len() == 1 && s.alias_sets[0].iter().any(|a| slug_has_token(&c.slug, a)) {
        return Some(Verdict::Accept);
    }
    None
}

/// Franchise league pages list only their own fixtures, so accept by default
/// unless the slug names a disjoint domestic competition.
fn league_default(c: &MatchCandidate, s: &SeriesContext) -> Option<Verdict> {
    if !s.is_league {
        return None;
    }
    if DISJOINT_COMPETITION_MARKERS.iter().any(|m| c.slug.contains(m)) {
        return Some(Verdict::Reject);
    }
    Some(Verdict::Accept)
}

/// Last resort: any distinctive keyword from the series name or slug.
fn accept_keyword_fallback(c: &MatchCandidate, s: &SeriesContext) -> Option<Verdict> {
    static YEAR_RE: OnceLock<Regex> = OnceLock::new();
    let year_re = YEAR_RE.get_or_init(|| Regex::new(r"^\d{4}$").unwrap());
    let stopwords = ["tour", "series", "cricket"];
    let keywords = s
        .name
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .chain(s.slug.split('-'))
        .filter(|w| w.len() > 3 && !year_re.is_match(w) && !stopwords.contains(w));

    for keyword in keywords {
        if c.slug.contains(keyword) {
            return Some(Verdict::Accept);
        }
    }
    None
}

/// Aliases match on hyphen boundaries only, so "ind" never fires inside
/// "windies".
fn slug_has_token(slug: &str, alias: &str) -> bool {
    slug == alias
        || slug.starts_with(&format!("{}-", alias))
        || slug.ends_with(&format!("-{}", alias))
        || slug.contains(&format!("-{}-", alias))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn series(name: &str, url_slug: &str) -> SeriesContext {
        SeriesContext::new(&SeriesRecord {
            id: None,
            external_id: Some("1".into()),
            month: "January".into(),
            year: "2026".into(),
            name: name.into(),
            date_range: String::new(),
            url: format!("https://www.cricbuzz.com/cricket-series/1/{}/matches", url_slug),
            created_at: Utc::now(),
        })
    }

    fn candidate(slug: &str, title: &str) -> MatchCandidate {
        MatchCandidate {
            external_id: "9".into(),
            slug: slug.into(),
            title: title.into(),
            url: format!("https://www.cricbuzz.com/live-cricket-scores/9/{}", slug),
            date: String::new(),
        }
    }

    #[test]
    fn slug_containment_accepts_without_aliases() {
        let s = series("India vs Pakistan, 2026", "india-vs-pakistan-2026");
        let c = candidate("1st-odi-ind-vs-pak-india-vs-pakistan-2026", "India vs Pakistan, 1st ODI");
        assert!(belongs_to(&c, &s));
    }

    #[test]
    fn short_team_abbreviations_accept_bilateral_match() {
        let s = series("India vs Pakistan, 2026", "india-vs-pakistan-2026");
        let c = candidate("1st-odi-ind-vs-pak-2026", "India vs Pakistan, 1st ODI");
        assert!(belongs_to(&c, &s));
    }

    #[test]
    fn two_alias_sets_accept_bilateral_match() {
        let s = series("India tour of Australia", "india-tour-of-australia-2026");
        let c = candidate("2nd-t20-ind-vs-aus-sydney", "India vs Australia, 2nd T20");
        assert!(belongs_to(&c, &s));
    }

    #[test]
    fn single_alias_accepts_when_only_one_team_configured() {
        let s = series("England domestic preparation", "england-warmups-2026");
        let c = candidate("warm-up-eng-vs-lions", "England vs Lions");
        assert_eq!(s.alias_sets.len(), 1);
        assert!(belongs_to(&c, &s));
    }

    #[test]
    fn league_veto_beats_alias_match() {
        // Rule 2 must fire before rule 4 gets a chance to accept.
        let s = series("Indian Premier League 2026", "indian-premier-league-2026");
        let c = candidate("3rd-odi-ind-vs-aus", "India vs Australia, 3rd ODI");
        assert!(s.is_league);
        assert!(!belongs_to(&c, &s));
    }

    #[test]
    fn womens_fixture_rejected_for_mens_series() {
        let s = series("India tour of Australia", "india-tour-of-australia-2026");
        let c = candidate("1st-odi-ind-women-vs-aus-women", "INDW vs AUSW, 1st ODI");
        assert!(!belongs_to(&c, &s));
    }

    #[test]
    fn womens_series_keeps_womens_fixture() {
        let s = series("India Women tour of Australia", "india-women-tour-of-australia-2026");
        let c = candidate("1st-odi-ind-women-vs-aus-women", "INDW vs AUSW, 1st ODI");
        assert!(belongs_to(&c, &s));
    }

    #[test]
    fn league_accepts_own_fixture_by_default() {
        let s = series("Indian Premier League 2026", "indian-premier-league-2026");
        let c = candidate("qualifier-1-csk-vs-mi", "CSK vs MI, Qualifier 1");
        assert!(belongs_to(&c, &s));
    }

    #[test]
    fn league_rejects_disjoint_domestic_competition() {
        let s = series("Indian Premier League 2026", "indian-premier-league-2026");
        let c = candidate("ranji-trophy-final-mumbai-vs-karnataka", "Mumbai vs Karnataka, Final");
        assert!(!belongs_to(&c, &s));
    }

    #[test]
    fn keyword_fallback_accepts_distinctive_word() {
        let s = series("Asia Cup 2026", "asia-cup-2026");
        let c = candidate("super-four-asia-clash-ind-vs-sl", "India vs Sri Lanka");
        assert!(belongs_to(&c, &s));
    }

    #[test]
    fn unrelated_match_is_silently_rejected() {
        let s = series("India vs Pakistan, 2026", "india-vs-pakistan-2026");
        let c = candidate("1st-test-eng-vs-nz-lords", "England vs New Zealand, 1st Test");
        assert!(!belongs_to(&c, &s));
    }

    #[test]
    fn alias_tokens_respect_hyphen_boundaries() {
        assert!(slug_has_token("1st-odi-ind-vs-pak", "ind"));
        assert!(slug_has_token("ind-vs-pak", "ind"));
        assert!(slug_has_token("pak-vs-ind", "ind"));
        assert!(!slug_has_token("windies-vs-pak", "ind"));
    }
}
