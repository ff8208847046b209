//! Team and player page extraction, plus the name-normalization helpers the
//! attribution engine shares.

use crate::fetcher::RawPage;
use crate::types::{PlayerRecord, TeamRecord};
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;

/// Lowercase, hyphen-delimited form of a display name, the shape used in
/// source-site slugs.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_hyphen = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            out.push('-');
            last_hyphen = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Collapse internal whitespace and trim; display names come out of markup
/// with stray newlines and double spaces.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract team rows from a team-index page.
pub fn teams(page: &RawPage, team_type: &str) -> Vec<TeamRecord> {
    let document = Html::parse_document(&page.html);
    let anchor_sel = Selector::parse(r#"a[href*="/cricket-team/"]"#).unwrap();
    let img_sel = Selector::parse("img").unwrap();
    let href_re = Regex::new(r"/cricket-team/[^/]+/(\d+)").unwrap();

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for anchor in document.select(&anchor_sel) {
        let Some(href) = anchor.value().attr("href") else { continue };
        let Some(caps) = href_re.captures(href) else { continue };
        let external_id = caps[1].to_string();
        if !seen.insert(external_id.clone()) {
            continue;
        }

        let name = normalize_name(&anchor.text().collect::<String>());
        if name.is_empty() {
            continue;
        }
        let flag_url = anchor
            .select(&img_sel)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(|s| s.to_string());

        records.push(TeamRecord {
            id: None,
            external_id,
            name,
            team_type: team_type.to_string(),
            flag_url,
        });
    }
    records
}

/// Extract player rows from a team roster page.
pub fn players(page: &RawPage, team_external_id: &str) -> Vec<PlayerRecord> {
    let document = Html::parse_document(&page.html);
    let anchor_sel = Selector::parse(r#"a[href*="/profiles/"]"#).unwrap();
    let img_sel = Selector::parse("img").unwrap();
    let href_re = Regex::new(r"/profiles/(\d+)").unwrap();

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for anchor in document.select(&anchor_sel) {
        let Some(href) = anchor.value().attr("href") else { continue };
        let Some(caps) = href_re.captures(href) else { continue };
        let external_id = caps[1].to_string();
        if !seen.insert(external_id.clone()) {
            continue;
        }

        let name = normalize_name(&anchor.text().collect::<String>());
        if name.is_empty() {
            continue;
        }
        let image_url = anchor
            .select(&img_sel)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(|s| s.to_string());

        records.push(PlayerRecord {
            id: None,
            external_id,
            team_external_id: team_external_id.to_string(),
            name,
            role: None,
            batting_style: None,
            bowling_style: None,
            image_url,
        });
    }
    records
}

/// Fill profile detail fields from a player page. The detail block is a
/// label/value list; a flat text scan survives the layout variants better
/// than positional selectors.
pub fn fill_player_profile(page: &RawPage, record: &mut PlayerRecord) {
    let document = Html::parse_document(&page.html);
    let chunks: Vec<String> = document
        .root_element()
        .text()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    record.role = label_value(&chunks, "Role");
    record.batting_style = label_value(&chunks, "Batting Style");
    record.bowling_style = label_value(&chunks, "Bowling Style");
}

fn label_value(chunks: &[String], label: &str) -> Option<String> {
    chunks
        .iter()
        .position(|c| c.eq_ignore_ascii_case(label))
        .and_then(|i| chunks.get(i + 1))
        .map(|v| normalize_name(v))
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_matches_source_site_shape() {
        assert_eq!(slugify("West Indies"), "west-indies");
        assert_eq!(slugify("India  Women"), "india-women");
        assert_eq!(slugify("SA20, 2026"), "sa20-2026");
    }

    #[test]
    fn extracts_teams_with_flags() {
        let html = r#"
        <div>
          <a href="/cricket-team/india/2"><img src="/i/flags/in.png"/>India</a>
          <a href="/cricket-team/india/2">India</a>
          <a href="/cricket-team/australia/4">Australia</a>
          <a href="/other/7">Not a team</a>
        </div>"#;
        let page = RawPage::new("http://t", html);
        let records = teams(&page, "international");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].external_id, "2");
        assert_eq!(records[0].name, "India");
        assert_eq!(records[0].flag_url.as_deref(), Some("/i/flags/in.png"));
        assert_eq!(records[1].name, "Australia");
    }

    #[test]
    fn extracts_players_for_team() {
        let html = r#"
        <div>
          <a href="/profiles/1413/virat-kohli">Virat  Kohli</a>
          <a href="/profiles/576/rohit-sharma">Rohit Sharma</a>
        </div>"#;
        let page = RawPage::new("http://t", html);
        let records = players(&page, "2");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Virat Kohli");
        assert_eq!(records[0].team_external_id, "2");
    }

    #[test]
    fn profile_labels_fill_detail_fields() {
        let html = r#"
        <div>
          <div>Role</div><div>Batter</div>
          <div>Batting Style</div><div>Right Handed Bat</div>
          <div>Bowling Style</div><div>Right-arm medium</div>
        </div>"#;
        let page = RawPage::new("http://t", html);
        let mut record = PlayerRecord {
            id: None,
            external_id: "1413".into(),
            team_external_id: "2".into(),
            name: "Virat Kohli".into(),
            role: None,
            batting_style: None,
            bowling_style: None,
            image_url: None,
        };
        fill_player_profile(&page, &mut record);
        assert_eq!(record.role.as_deref(), Some("Batter"));
        assert_eq!(record.batting_style.as_deref(), Some("Right Handed Bat"));
        assert_eq!(record.bowling_style.as_deref(), Some("Right-arm medium"));
    }
}
