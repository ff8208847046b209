//! Background refresher for in-progress matches.
//!
//! Every interval tick, each scorecard still flagged live is re-scraped
//! individually. A failing match only loses its own live flag; the other
//! matches in the cycle are untouched and the loop keeps running.

use crate::pipeline::Pipeline;
use crate::types::BatchSummary;
use metrics::counter;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct LiveRefresher {
    pipeline: Arc<Pipeline>,
    interval: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl LiveRefresher {
    pub fn new(pipeline: Arc<Pipeline>, interval_seconds: u64) -> Self {
        Self {
            pipeline,
            interval: Duration::from_secs(interval_seconds),
            handle: Mutex::new(None),
        }
    }

    /// Spawn the refresh loop. Returns false when a loop is already running;
    /// repeated triggers from the embedding layer must never stack loops.
    pub fn start(&self) -> bool {
        let mut guard = self.handle.lock().unwrap();
        if guard.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }

        let pipeline = Arc::clone(&self.pipeline);
        let interval = self.interval;
        info!("Starting live refresh loop (every {:?})", interval);
        *guard = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let summary = refresh_cycle(&pipeline).await;
                if summary.processed > 0 {
                    info!(
                        "Live refresh cycle: {} refreshed, {} dropped",
                        summary.processed - summary.failed,
                        summary.failed
                    );
                }
            }
        }));
        true
    }

    /// Abort the refresh loop if one is running.
    pub fn shutdown(&self) {
        let mut guard = self.handle.lock().unwrap();
        if let Some(handle) = guard.take() {
            handle.abort();
            info!("Live refresh loop stopped");
        }
    }
}

impl Drop for LiveRefresher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// One refresh pass over every live-flagged scorecard. Each match is fetched
/// and stored on its own; there is no batch transaction to poison.
pub async fn refresh_cycle(pipeline: &Pipeline) -> BatchSummary {
    let storage = pipeline.storage();
    let live = match storage.list_live_scorecards().await {
        Ok(live) => live,
        Err(e) => {
            warn!("Could not list live scorecards: {}", e);
            return BatchSummary::default();
        }
    };

    let mut summary = BatchSummary::default();
    for record in live {
        summary.processed += 1;
        match pipeline.scrape_scorecard(&record.match_external_id).await {
            Ok(outcome) => {
                if !outcome.is_live {
                    info!(
                        "Match {} no longer live: {}",
                        record.match_external_id, outcome.status_text
                    );
                }
            }
            Err(e) => {
                // The page may be gone or the site may be refusing us; stop
                // polling this match but keep the rest of the cycle going.
                warn!(
                    "Refresh failed for match {}: {}; clearing live flag",
                    record.match_external_id, e
                );
                counter!("cric_live_refresh_failures_total").increment(1);
                if let Err(e) = storage
                    .set_scorecard_live(&record.match_external_id, false)
                    .await
                {
                    warn!(
                        "Could not clear live flag for match {}: {}",
                        record.match_external_id, e
                    );
                }
                summary.failed += 1;
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::InMemoryStorage;

    fn refresher() -> LiveRefresher {
        let storage = Arc::new(InMemoryStorage::new());
        let pipeline = Arc::new(Pipeline::new(storage, Config::default()));
        LiveRefresher::new(pipeline, 90)
    }

    #[tokio::test]
    async fn start_is_idempotent_until_shutdown() {
        let refresher = refresher();
        assert!(refresher.start());
        assert!(!refresher.start());

        refresher.shutdown();
        assert!(refresher.start());
        refresher.shutdown();
    }

    #[tokio::test]
    async fn shutdown_without_start_is_a_noop() {
        let refresher = refresher();
        refresher.shutdown();
        assert!(refresher.start());
        refresher.shutdown();
    }
}
