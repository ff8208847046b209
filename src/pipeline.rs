use crate::attribution::{self, SeriesContext};
use crate::config::Config;
use crate::constants;
use crate::error::{Result, ScraperError};
use crate::extract;
use crate::fetcher::{Fetcher, RawPage};
use crate::locator;
use crate::rate_limiter::RateLimiter;
use crate::roster;
use crate::scorecard;
use crate::storage::Storage;
use crate::types::{
    BatchSummary, MatchRecord, ScorecardOutcome, ScorecardRecord, ScrapeOutcome, SeriesRecord,
};
use chrono::Utc;
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Orchestrates fetch, locate, extract, attribute, and persist for every
/// scrape operation. One instance is shared by the CLI and the live refresher.
pub struct Pipeline {
    storage: Arc<dyn Storage>,
    fetcher: Fetcher,
    limiter: RateLimiter,
}

impl Pipeline {
    pub fn new(storage: Arc<dyn Storage>, config: Config) -> Self {
        let fetcher = Fetcher::new(&config.scraping);
        let limiter = RateLimiter::new(
            config.scraping.requests_per_minute,
            Duration::from_millis(config.scraping.delay_ms),
        );
        Self { storage, fetcher, limiter }
    }

    pub fn storage(&self) -> Arc<dyn Storage> {
        Arc::clone(&self.storage)
    }

    /// Scrape the schedule page and upsert every series found on it.
    #[instrument(skip(self))]
    pub async fn scrape_series_list(&self) -> Result<BatchSummary> {
        info!("🚀 Starting series list scrape");
        println!("🚀 Scraping series list...");
        counter!("cric_series_runs_total").increment(1);
        let t_run = Instant::now();

        let url = constants::schedule_url();
        self.limiter.acquire().await;
        let page = self.fetcher.fetch(&url).await?;
        let blocks = locator::locate_series(&page);
        let records = extract::series(&blocks, &page);
        info!("✅ Located {} series on schedule page", records.len());
        println!("✅ Found {} series", records.len());

        let mut summary = BatchSummary::default();
        for mut record in records {
            summary.processed += 1;
            match self.storage.upsert_series(&mut record).await {
                Ok(true) => summary.inserted += 1,
                Ok(false) => {}
                Err(e) => {
                    error!("Failed to store series '{}': {}", record.name, e);
                    summary.failed += 1;
                }
            }
        }

        counter!("cric_series_inserted_total").increment(summary.inserted as u64);
        histogram!("cric_series_scrape_duration_seconds").record(t_run.elapsed().as_secs_f64());
        info!(
            "💾 Series scrape complete: {} processed, {} new, {} failed",
            summary.processed, summary.inserted, summary.failed
        );
        println!(
            "💾 Done: {} processed, {} new, {} failed",
            summary.processed, summary.inserted, summary.failed
        );
        Ok(summary)
    }

    /// Scrape one series' fixtures page and store the matches the
    /// attribution rules accept for it.
    #[instrument(skip(self))]
    pub async fn scrape_matches_for_series(&self, series_id: Uuid) -> Result<BatchSummary> {
        let Some(series) = self.storage.get_series(series_id).await? else {
            return Err(ScraperError::MissingField(format!(
                "no series with id {series_id}"
            )));
        };
        self.scrape_matches(&series).await
    }

    /// Scrape fixtures for every stored series, sequentially; the rate
    /// limiter paces the page fetches. One failing series never aborts the
    /// rest, and whole-series failures are counted apart from per-match ones.
    #[instrument(skip(self))]
    pub async fn scrape_all_matches(&self) -> Result<BatchSummary> {
        let all = self.storage.list_series().await?;
        info!("🚀 Scraping matches for {} series", all.len());
        println!("🚀 Scraping matches for {} series...", all.len());
        let t_run = Instant::now();

        let mut total = BatchSummary::default();
        for series in &all {
            match self.scrape_matches(series).await {
                Ok(summary) => {
                    total.processed += summary.processed;
                    total.inserted += summary.inserted;
                    total.failed += summary.failed;
                }
                Err(e) => {
                    error!("Match scrape failed for series '{}': {}", series.name, e);
                    println!("   ⚠️ Skipping '{}': {}", series.name, e);
                    total.failed_series += 1;
                }
            }
        }

        histogram!("cric_all_matches_duration_seconds").record(t_run.elapsed().as_secs_f64());
        info!(
            "💾 Match scrape complete: {} processed, {} new, {} failed, {} series skipped",
            total.processed, total.inserted, total.failed, total.failed_series
        );
        println!(
            "💾 Done: {} processed, {} new, {} failed, {} series skipped",
            total.processed, total.inserted, total.failed, total.failed_series
        );
        Ok(total)
    }

    async fn scrape_matches(&self, series: &SeriesRecord) -> Result<BatchSummary> {
        let series_id = series.id.ok_or_else(|| {
            ScraperError::MissingField(format!("series '{}' has no stored id", series.name))
        })?;

        info!("📡 Fetching fixtures for '{}'", series.name);
        // Fixture lists only render through script execution, so this page
        // goes through the rendering proxy when one is configured.
        self.limiter.acquire().await;
        let page = self.fetcher.fetch_rendered(&series.url).await?;
        let blocks = locator::locate_match_links(&page);
        let candidates = extract::matches(&blocks, &page);

        let context = SeriesContext::new(series);
        let mut summary = BatchSummary::default();
        for candidate in candidates {
            if !attribution::belongs_to(&candidate, &context) {
                continue;
            }
            summary.processed += 1;
            let mut record = MatchRecord {
                id: None,
                series_id,
                external_id: candidate.external_id,
                title: candidate.title,
                url: candidate.url,
                date: candidate.date,
                created_at: Utc::now(),
            };
            match self.storage.upsert_match(&mut record).await {
                Ok(true) => summary.inserted += 1,
                Ok(false) => {}
                Err(e) => {
                    error!("Failed to store match '{}': {}", record.title, e);
                    summary.failed += 1;
                }
            }
        }

        counter!("cric_matches_inserted_total").increment(summary.inserted as u64);
        info!(
            "✅ '{}': {} matches attributed, {} new",
            series.name, summary.processed, summary.inserted
        );
        Ok(summary)
    }

    /// Resolve the scorecard URL for a match: prefer rewriting the stored
    /// MatchRecord's URL into the scorecard family, reconstruct from the
    /// external id only when no usable stored URL exists.
    pub async fn scorecard_target_url(&self, match_id: &str) -> Result<String> {
        if let Some(record) = self.storage.get_match_by_external_id(match_id).await? {
            if let Some(url) = constants::scorecard_url_from_match(&record.url) {
                return Ok(url);
            }
        }
        Ok(constants::scorecard_url(match_id))
    }

    /// Scrape one scorecard by external match id and upsert the snapshot.
    /// Returns a flat outcome; a page with no innings yet is a success with
    /// the placeholder message, never an error.
    #[instrument(skip(self))]
    pub async fn scrape_scorecard(&self, match_id: &str) -> Result<ScorecardOutcome> {
        counter!("cric_scorecard_runs_total").increment(1);
        let url = self.scorecard_target_url(match_id).await?;
        self.limiter.acquire().await;
        let page = self.fetcher.fetch(&url).await?;
        self.ingest_scorecard_page(match_id, &page).await
    }

    /// Parse and persist one already-fetched scorecard page.
    pub async fn ingest_scorecard_page(
        &self,
        match_id: &str,
        page: &RawPage,
    ) -> Result<ScorecardOutcome> {
        let t_run = Instant::now();

        let existing = self.storage.get_scorecard(match_id).await?;

        // Unchanged page means unchanged snapshot; skip the parse and write.
        if let Some(existing) = existing.as_ref().filter(|e| e.page_digest == page.digest) {
            info!("Scorecard for match {} unchanged, skipping", match_id);
            counter!("cric_scorecard_unchanged_total").increment(1);
            return Ok(ScorecardOutcome {
                success: true,
                message: "Scorecard unchanged".to_string(),
                final_score: existing.final_score.clone(),
                is_live: existing.is_live,
                status_text: existing.status_text.clone(),
            });
        }

        let parsed = scorecard::parse(page);
        if !parsed.available {
            // A stored snapshot that was live must leave the live set, or
            // the refresher would re-poll this page forever.
            if existing.is_some_and(|e| e.is_live) {
                self.storage.set_scorecard_live(match_id, false).await?;
            }
            info!("Scorecard for match {} not available yet", match_id);
            return Ok(ScorecardOutcome {
                success: true,
                message: scorecard::NOT_AVAILABLE.to_string(),
                final_score: String::new(),
                is_live: false,
                status_text: parsed.status_text,
            });
        }

        let mut record = ScorecardRecord {
            id: None,
            match_external_id: match_id.to_string(),
            title: parsed.title,
            status_text: parsed.status_text.clone(),
            is_live: parsed.is_live,
            final_score: parsed.final_score.clone(),
            innings: parsed.innings,
            page_digest: page.digest.clone(),
            last_updated: Utc::now(),
        };
        self.storage.upsert_scorecard(&mut record).await?;

        histogram!("cric_scorecard_duration_seconds").record(t_run.elapsed().as_secs_f64());
        info!(
            "💾 Stored scorecard for match {}: {}",
            match_id, record.final_score
        );
        Ok(ScorecardOutcome {
            success: true,
            message: "Scorecard updated".to_string(),
            final_score: parsed.final_score,
            is_live: parsed.is_live,
            status_text: parsed.status_text,
        })
    }

    /// Scrape a team index page for one team type.
    #[instrument(skip(self))]
    pub async fn scrape_teams(&self, team_type: &str) -> Result<BatchSummary> {
        info!("🚀 Scraping {} teams", team_type);
        println!("🚀 Scraping {} teams...", team_type);

        self.limiter.acquire().await;
        let page = self.fetcher.fetch(&constants::teams_url(team_type)).await?;
        let records = roster::teams(&page, team_type);

        let mut summary = BatchSummary::default();
        for mut record in records {
            summary.processed += 1;
            match self.storage.upsert_team(&mut record).await {
                Ok(true) => summary.inserted += 1,
                Ok(false) => {}
                Err(e) => {
                    error!("Failed to store team '{}': {}", record.name, e);
                    summary.failed += 1;
                }
            }
        }

        counter!("cric_teams_inserted_total").increment(summary.inserted as u64);
        println!(
            "💾 Done: {} processed, {} new, {} failed",
            summary.processed, summary.inserted, summary.failed
        );
        Ok(summary)
    }

    /// Scrape a team's roster page.
    #[instrument(skip(self))]
    pub async fn scrape_players(&self, team_id: &str) -> Result<BatchSummary> {
        info!("🚀 Scraping players for team {}", team_id);
        println!("🚀 Scraping players for team {}...", team_id);

        self.limiter.acquire().await;
        let page = self.fetcher.fetch(&constants::players_url(team_id)).await?;
        let records = roster::players(&page, team_id);

        let mut summary = BatchSummary::default();
        for mut record in records {
            summary.processed += 1;
            match self.storage.upsert_player(&mut record).await {
                Ok(true) => summary.inserted += 1,
                Ok(false) => {}
                Err(e) => {
                    error!("Failed to store player '{}': {}", record.name, e);
                    summary.failed += 1;
                }
            }
        }

        counter!("cric_players_inserted_total").increment(summary.inserted as u64);
        println!(
            "💾 Done: {} processed, {} new, {} failed",
            summary.processed, summary.inserted, summary.failed
        );
        Ok(summary)
    }

    /// Scrape one player's profile page and fill the detail fields on the
    /// stored record.
    #[instrument(skip(self))]
    pub async fn scrape_player_profile(&self, player_id: &str) -> Result<ScrapeOutcome> {
        let Some(mut record) = self.storage.get_player(player_id).await? else {
            return Ok(ScrapeOutcome::failed(format!(
                "No stored player with id {player_id}"
            )));
        };

        self.limiter.acquire().await;
        let page = self
            .fetcher
            .fetch(&constants::player_profile_url(player_id))
            .await?;
        roster::fill_player_profile(&page, &mut record);
        self.storage.update_player(&record).await?;

        info!("💾 Updated profile for {}", record.name);
        Ok(ScrapeOutcome::ok(format!("Updated profile for {}", record.name)))
    }

    /// Delete every stored match.
    pub async fn clear_matches(&self) -> Result<usize> {
        let count = self.storage.clear_matches().await?;
        warn!("Cleared {} matches", count);
        Ok(count)
    }

    /// Delete every stored series and their matches.
    pub async fn clear_series(&self) -> Result<usize> {
        let count = self.storage.clear_series().await?;
        warn!("Cleared {} series", count);
        Ok(count)
    }
}
