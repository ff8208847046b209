/// Source-site constants shared across the locator, extractor and attribution
/// stages. Marker tables live here so the heuristics stay in one place.

/// Base URL for cricbuzz.com
pub const BASE_URL: &str = "https://www.cricbuzz.com";

/// Schedule page listing every series
pub const SCHEDULE_PATH: &str = "/cricket-schedule/series/all";

/// Browser user agent; the source site rejects default client agents.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Build the series schedule URL
pub fn schedule_url() -> String {
    format!("{}{}", BASE_URL, SCHEDULE_PATH)
}

/// Build a scorecard URL from an external match id
pub fn scorecard_url(match_id: &str) -> String {
    format!("{}/live-cricket-scorecard/{}", BASE_URL, match_id)
}

/// Rewrite a stored match URL into its scorecard-family equivalent, keeping
/// the id and slug intact. Returns None when the URL belongs to no known
/// scores family; callers fall back to `scorecard_url`.
pub fn scorecard_url_from_match(match_url: &str) -> Option<String> {
    for family in ["/live-cricket-scores/", "/cricket-scores/"] {
        if match_url.contains(family) {
            return Some(match_url.replacen(family, "/live-cricket-scorecard/", 1));
        }
    }
    None
}

/// Build a team index URL for a team type (international, league, domestic, women)
pub fn teams_url(team_type: &str) -> String {
    format!("{}/cricket-team/{}", BASE_URL, team_type)
}

/// Build a team roster URL from an external team id
pub fn players_url(team_id: &str) -> String {
    format!("{}/cricket-team/players/{}", BASE_URL, team_id)
}

/// Build a player profile URL from an external player id
pub fn player_profile_url(player_id: &str) -> String {
    format!("{}/profiles/{}", BASE_URL, player_id)
}

/// First-cell labels that mark a table row as non-player summary content.
pub const NON_PLAYER_LABELS: &[&str] = &[
    "Extras",
    "Total",
    "Did not Bat",
    "Fall of Wickets",
    "Yet to Bat",
];

/// Trailing status suffixes stripped from match titles.
pub const TITLE_SUFFIX_PATTERN: &str =
    r"\s*-\s*(Preview|Live|Stumps|Result|Scheduled|Need\s.*)$";

/// Status fragments that mean a match has finished; these override any live
/// indicator found on the page.
pub const COMPLETION_MARKERS: &[&str] = &[
    "won",
    "drawn",
    "match tied",
    "no result",
    "abandoned",
];

/// Slug fragments identifying franchise league series.
pub const LEAGUE_MARKERS: &[&str] = &[
    "premier-league",
    "indian-premier",
    "ipl",
    "big-bash",
    "bbl",
    "psl",
    "cpl",
    "sa20",
    "the-hundred",
    "t20-blast",
    "lanka-premier",
    "major-league-cricket",
    "ilt20",
    "super-smash",
];

/// Slug fragments identifying women's and under-19 fixtures.
pub const JUNIOR_WOMENS_MARKERS: &[&str] = &["women", "womens", "u19", "under-19"];

/// Domestic competitions that share team names with franchise leagues but
/// never belong to them.
pub const DISJOINT_COMPETITION_MARKERS: &[&str] = &[
    "ranji-trophy",
    "duleep-trophy",
    "vijay-hazare",
    "syed-mushtaq-ali",
    "sheffield-shield",
    "county-championship",
    "plunket-shield",
];

/// Country name to slug-alias sets used by the attribution engine. Every
/// alias is matched against hyphen-delimited match slugs.
pub fn country_aliases() -> Vec<(&'static str, Vec<&'static str>)> {
    vec![
        ("india", vec!["ind", "india"]),
        ("new zealand", vec!["nz", "new-zealand", "newzealand"]),
        ("australia", vec!["aus", "australia"]),
        ("england", vec!["eng", "england"]),
        ("pakistan", vec!["pak", "pakistan"]),
        ("south africa", vec!["sa", "rsa", "south-africa", "southafrica"]),
        ("sri lanka", vec!["sl", "sri-lanka", "srilanka"]),
        ("bangladesh", vec!["ban", "bangladesh"]),
        ("west indies", vec!["wi", "west-indies", "westindies", "windies"]),
        ("afghanistan", vec!["afg", "afghanistan"]),
        ("zimbabwe", vec!["zim", "zimbabwe"]),
        ("ireland", vec!["ire", "ireland"]),
        ("uae", vec!["uae"]),
        ("usa", vec!["usa"]),
        ("nepal", vec!["nep", "nepal"]),
        ("namibia", vec!["nam", "namibia"]),
        ("netherlands", vec!["ned", "netherlands"]),
        ("scotland", vec!["sco", "scotland"]),
        ("oman", vec!["oman"]),
        ("canada", vec!["can", "canada"]),
        ("kenya", vec!["ken", "kenya"]),
        ("hong kong", vec!["hk", "hong-kong", "hongkong"]),
        ("papua new guinea", vec!["png", "papua-new-guinea"]),
        ("bermuda", vec!["ber", "bermuda"]),
        ("jersey", vec!["jer", "jersey"]),
    ]
}
