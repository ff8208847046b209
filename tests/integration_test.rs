use anyhow::Result;
use chrono::Utc;
use cric_scraper::attribution::{self, SeriesContext};
use cric_scraper::config::Config;
use cric_scraper::constants;
use cric_scraper::extract;
use cric_scraper::fetcher::RawPage;
use cric_scraper::locator;
use cric_scraper::pipeline::Pipeline;
use cric_scraper::scorecard;
use cric_scraper::storage::{InMemoryStorage, Storage};
use cric_scraper::types::{MatchRecord, ScorecardRecord, SeriesRecord};
use std::sync::Arc;

const SCHEDULE_PAGE: &str = r#"
<html><body>
<h2>January 2026</h2>
<div>
  <a href="/cricket-series/9237/india-tour-of-england-2026">
    <div class="text-ellipsis">India tour of England 2026</div>
    <div class="text-cbTxtSec">Jan 5 - Feb 2</div>
  </a>
  <a href="/cricket-series/9237/india-tour-of-england-2026/matches">
    <div class="text-ellipsis">India tour of England 2026</div>
  </a>
  <a href="/cricket-series/9301/indian-premier-league-2026">
    <div class="text-ellipsis">Indian Premier League 2026</div>
    <div class="text-cbTxtSec">Mar 20 - May 31</div>
  </a>
</div>
</body></html>
"#;

const FIXTURES_PAGE: &str = r#"
<html><body>
<div>Mon, Jan 05</div>
<a href="/live-cricket-scores/118921/1st-test-ind-vs-eng-india-tour-of-england-2026"
   title="India vs England, 1st Test">India vs England, 1st Test</a>
<a href="/live-cricket-scores/118950/1st-odi-ind-women-vs-eng-women"
   title="INDW vs ENGW, 1st ODI">INDW vs ENGW, 1st ODI</a>
<a href="/live-cricket-scores/119001/1st-test-aus-vs-nz-trans-tasman"
   title="Australia vs New Zealand, 1st Test">Australia vs New Zealand, 1st Test</a>
</body></html>
"#;

#[tokio::test]
async fn schedule_scrape_is_idempotent() -> Result<()> {
    let storage = Arc::new(InMemoryStorage::new());
    let page = RawPage::new("https://www.cricbuzz.com/cricket-schedule/series/all", SCHEDULE_PAGE);

    for pass in 0..2 {
        let blocks = locator::locate_series(&page);
        let records = extract::series(&blocks, &page);
        assert_eq!(records.len(), 2, "duplicate anchor must collapse");

        let mut inserted = 0;
        for mut record in records {
            if storage.upsert_series(&mut record).await? {
                inserted += 1;
            }
        }
        let expected = if pass == 0 { 2 } else { 0 };
        assert_eq!(inserted, expected);
    }

    let all = storage.list_series().await?;
    assert_eq!(all.len(), 2);
    let tour = all.iter().find(|s| s.name.contains("tour")).unwrap();
    assert!(tour.url.ends_with("/matches"));
    assert_eq!(tour.month, "January");
    assert_eq!(tour.year, "2026");
    assert_eq!(tour.date_range, "Jan 5 - Feb 2");
    Ok(())
}

#[tokio::test]
async fn fixture_scrape_attributes_and_stores_only_own_matches() -> Result<()> {
    let storage = Arc::new(InMemoryStorage::new());

    let schedule = RawPage::new("https://t", SCHEDULE_PAGE);
    let series_records = extract::series(&locator::locate_series(&schedule), &schedule);
    let mut series = series_records
        .into_iter()
        .find(|s| s.name.contains("tour"))
        .unwrap();
    storage.upsert_series(&mut series).await?;
    let series_id = series.id.unwrap();

    let page = RawPage::new(&series.url, FIXTURES_PAGE);
    let candidates = extract::matches(&locator::locate_match_links(&page), &page);
    assert_eq!(candidates.len(), 3);

    let context = SeriesContext::new(&series);
    let mut stored = 0;
    for candidate in candidates {
        if !attribution::belongs_to(&candidate, &context) {
            continue;
        }
        let mut record = MatchRecord {
            id: None,
            series_id,
            external_id: candidate.external_id,
            title: candidate.title,
            url: candidate.url,
            date: candidate.date,
            created_at: Utc::now(),
        };
        storage.upsert_match(&mut record).await?;
        stored += 1;
    }

    // The women's fixture and the unrelated tour must not attach.
    assert_eq!(stored, 1);
    let kept = storage.get_match_by_external_id("118921").await?.unwrap();
    assert_eq!(kept.title, "India vs England, 1st Test");
    assert_eq!(kept.date, "Jan 05");
    assert!(storage.get_match_by_external_id("118950").await?.is_none());
    assert!(storage.get_match_by_external_id("119001").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn scorecard_snapshot_round_trips_through_storage() -> Result<()> {
    let storage = Arc::new(InMemoryStorage::new());

    let html = r#"
    <html><body>
    <h1>India vs England, 1st Test | Scorecard</h1>
    <div class="cb-text-inprogress">Day 2: India trail by 102 runs</div>
    <div id="innings_1">
      <div class="cb-col cb-scrd-hdr-rw"><span>ENG</span><span>341 (92.3 Ov)</span></div>
      <div class="cb-col cb-scrd-itms"><div>J Root</div><div>c Pant b Bumrah</div><div>118</div><div>201</div><div>14</div><div>0</div><div>58.70</div></div>
    </div>
    </body></html>"#;
    let page = RawPage::new("https://t/live-cricket-scorecard/118921", html);

    let parsed = scorecard::parse(&page);
    assert!(parsed.available);
    assert!(parsed.is_live);

    let mut record = ScorecardRecord {
        id: None,
        match_external_id: "118921".into(),
        title: parsed.title,
        status_text: parsed.status_text,
        is_live: parsed.is_live,
        final_score: parsed.final_score,
        innings: parsed.innings,
        page_digest: page.digest.clone(),
        last_updated: Utc::now(),
    };
    storage.upsert_scorecard(&mut record).await?;

    let live = storage.list_live_scorecards().await?;
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].final_score, "ENG 341 (92.3 Ov)");

    // A later cycle sees the same digest and can skip the write entirely.
    let again = storage.get_scorecard("118921").await?.unwrap();
    assert_eq!(again.page_digest, page.digest);

    storage.set_scorecard_live("118921", false).await?;
    assert!(storage.list_live_scorecards().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn completed_match_is_stored_as_not_live() -> Result<()> {
    let storage = Arc::new(InMemoryStorage::new());

    let html = r#"
    <html><body>
    <h1>India vs England, 1st Test</h1>
    <div class="cb-text-live">x</div>
    <div class="cb-col cb-text-complete">England won by 48 runs</div>
    <div id="innings_1">
      <div class="cb-col cb-scrd-hdr-rw"><span>ENG</span><span>341 (92.3 Ov)</span></div>
      <div class="cb-col cb-scrd-itms"><div>J Root</div><div>c Pant b Bumrah</div><div>118</div><div>201</div><div>14</div><div>0</div><div>58.70</div></div>
    </div>
    </body></html>"#;
    let page = RawPage::new("https://t/live-cricket-scorecard/118921", html);

    let parsed = scorecard::parse(&page);
    assert!(!parsed.is_live, "completion text must override the live marker");

    let mut record = ScorecardRecord {
        id: None,
        match_external_id: "118921".into(),
        title: parsed.title,
        status_text: parsed.status_text.clone(),
        is_live: parsed.is_live,
        final_score: parsed.final_score,
        innings: parsed.innings,
        page_digest: page.digest,
        last_updated: Utc::now(),
    };
    storage.upsert_scorecard(&mut record).await?;

    assert!(storage.list_live_scorecards().await?.is_empty());
    assert_eq!(
        storage.get_scorecard("118921").await?.unwrap().status_text,
        "England won by 48 runs"
    );
    Ok(())
}

fn stored_series(url: &str) -> SeriesRecord {
    SeriesRecord {
        id: None,
        external_id: Some("1".into()),
        month: "January".into(),
        year: "2026".into(),
        name: "India tour of England 2026".into(),
        date_range: String::new(),
        url: url.into(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn scorecard_url_is_rederived_from_stored_match_url() -> Result<()> {
    let storage = Arc::new(InMemoryStorage::new());
    let pipeline = Pipeline::new(Arc::clone(&storage) as Arc<dyn Storage>, Config::default());

    let mut series =
        stored_series("https://www.cricbuzz.com/cricket-series/9237/india-tour-of-england-2026/matches");
    storage.upsert_series(&mut series).await?;
    let mut m = MatchRecord {
        id: None,
        series_id: series.id.unwrap(),
        external_id: "42".into(),
        title: "India vs England, 1st Test".into(),
        url: "https://www.cricbuzz.com/live-cricket-scores/42/1st-test-ind-vs-eng".into(),
        date: String::new(),
        created_at: Utc::now(),
    };
    storage.upsert_match(&mut m).await?;

    // The stored URL's family is rewritten, slug and all.
    assert_eq!(
        pipeline.scorecard_target_url("42").await?,
        "https://www.cricbuzz.com/live-cricket-scorecard/42/1st-test-ind-vs-eng"
    );
    // Unknown matches reconstruct from the external id alone.
    assert_eq!(
        pipeline.scorecard_target_url("999").await?,
        constants::scorecard_url("999")
    );

    // A stored URL from a foreign page family also falls back to reconstruction.
    let mut odd = MatchRecord {
        id: None,
        series_id: series.id.unwrap(),
        external_id: "77".into(),
        title: "India vs England, 2nd Test".into(),
        url: "https://www.cricbuzz.com/cricket-series/9237/india-tour-of-england-2026".into(),
        date: String::new(),
        created_at: Utc::now(),
    };
    storage.upsert_match(&mut odd).await?;
    assert_eq!(
        pipeline.scorecard_target_url("77").await?,
        constants::scorecard_url("77")
    );
    Ok(())
}

#[tokio::test]
async fn vanished_innings_clear_the_stored_live_flag() -> Result<()> {
    let storage = Arc::new(InMemoryStorage::new());
    let pipeline = Pipeline::new(Arc::clone(&storage) as Arc<dyn Storage>, Config::default());

    let mut record = ScorecardRecord {
        id: None,
        match_external_id: "118921".into(),
        title: "India vs England, 1st Test".into(),
        status_text: "Day 2: India trail by 102 runs".into(),
        is_live: true,
        final_score: "ENG 341 (92.3 Ov)".into(),
        innings: vec![],
        page_digest: "previous-digest".into(),
        last_updated: Utc::now(),
    };
    storage.upsert_scorecard(&mut record).await?;

    // A layout change (or pulled page) yields no innings; the stored flag
    // must drop so the refresher stops polling this match.
    let page = RawPage::new(
        "https://www.cricbuzz.com/live-cricket-scorecard/118921",
        "<html><body><p>Match starts soon</p></body></html>",
    );
    let outcome = pipeline.ingest_scorecard_page("118921", &page).await?;

    assert!(outcome.success);
    assert!(!outcome.is_live);
    assert!(storage.list_live_scorecards().await?.is_empty());
    assert!(!storage.get_scorecard("118921").await?.unwrap().is_live);
    Ok(())
}

#[tokio::test]
async fn whole_series_fetch_failure_is_counted_apart_from_match_failures() -> Result<()> {
    let storage = Arc::new(InMemoryStorage::new());
    let pipeline = Pipeline::new(Arc::clone(&storage) as Arc<dyn Storage>, Config::default());

    // Nothing listens here, so the fixtures fetch fails outright.
    let mut series = stored_series("http://127.0.0.1:9/cricket-series/1/x/matches");
    storage.upsert_series(&mut series).await?;

    let summary = pipeline.scrape_all_matches().await?;
    assert_eq!(summary.failed_series, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.inserted, 0);
    Ok(())
}
