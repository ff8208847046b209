use crate::error::Result;
use crate::types::{MatchRecord, PlayerRecord, ScorecardRecord, SeriesRecord, TeamRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

/// Storage trait for the extraction pipeline's persisted records.
///
/// Every write is an atomic insert-or-update by the record's unique key, so
/// concurrent scrape triggers can never produce duplicate rows. Upserts
/// return `true` when a new row was inserted.
#[async_trait]
pub trait Storage: Send + Sync {
    // Series operations (unique on canonical URL)
    async fn upsert_series(&self, series: &mut SeriesRecord) -> Result<bool>;
    async fn get_series(&self, id: Uuid) -> Result<Option<SeriesRecord>>;
    async fn list_series(&self) -> Result<Vec<SeriesRecord>>;

    // Match operations (unique on (series_id, external_id))
    async fn upsert_match(&self, record: &mut MatchRecord) -> Result<bool>;
    async fn get_match_by_external_id(&self, external_id: &str) -> Result<Option<MatchRecord>>;
    async fn list_matches_for_series(&self, series_id: Uuid) -> Result<Vec<MatchRecord>>;

    // Scorecard operations (unique on match external id)
    async fn upsert_scorecard(&self, record: &mut ScorecardRecord) -> Result<()>;
    async fn get_scorecard(&self, match_external_id: &str) -> Result<Option<ScorecardRecord>>;
    async fn list_live_scorecards(&self) -> Result<Vec<ScorecardRecord>>;
    async fn set_scorecard_live(&self, match_external_id: &str, is_live: bool) -> Result<()>;

    // Team/player lookup operations (unique on external id)
    async fn upsert_team(&self, record: &mut TeamRecord) -> Result<bool>;
    async fn upsert_player(&self, record: &mut PlayerRecord) -> Result<bool>;
    async fn get_player(&self, external_id: &str) -> Result<Option<PlayerRecord>>;
    async fn update_player(&self, record: &PlayerRecord) -> Result<()>;

    // Administrative bulk clears
    async fn clear_matches(&self) -> Result<usize>;
    async fn clear_series(&self) -> Result<usize>;
}

/// In-memory storage implementation for development/testing and for
/// embedding callers that persist elsewhere.
pub struct InMemoryStorage {
    series: Arc<Mutex<HashMap<Uuid, SeriesRecord>>>,
    matches: Arc<Mutex<HashMap<Uuid, MatchRecord>>>,
    scorecards: Arc<Mutex<HashMap<Uuid, ScorecardRecord>>>,
    teams: Arc<Mutex<HashMap<Uuid, TeamRecord>>>,
    players: Arc<Mutex<HashMap<Uuid, PlayerRecord>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            series: Arc::new(Mutex::new(HashMap::new())),
            matches: Arc::new(Mutex::new(HashMap::new())),
            scorecards: Arc::new(Mutex::new(HashMap::new())),
            teams: Arc::new(Mutex::new(HashMap::new())),
            players: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn upsert_series(&self, series: &mut SeriesRecord) -> Result<bool> {
        let mut map = self.series.lock().unwrap();
        if let Some(existing) = map.values().find(|s| s.url == series.url) {
            series.id = existing.id;
            return Ok(false);
        }
        let id = Uuid::new_v4();
        series.id = Some(id);
        map.insert(id, series.clone());
        debug!("Created series: {} with id {}", series.name, id);
        Ok(true)
    }

    async fn get_series(&self, id: Uuid) -> Result<Option<SeriesRecord>> {
        Ok(self.series.lock().unwrap().get(&id).cloned())
    }

    async fn list_series(&self) -> Result<Vec<SeriesRecord>> {
        let map = self.series.lock().unwrap();
        let mut all: Vec<SeriesRecord> = map.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn upsert_match(&self, record: &mut MatchRecord) -> Result<bool> {
        let mut map = self.matches.lock().unwrap();
        if let Some(existing) = map
            .values()
            .find(|m| m.series_id == record.series_id && m.external_id == record.external_id)
        {
            record.id = existing.id;
            return Ok(false);
        }
        let id = Uuid::new_v4();
        record.id = Some(id);
        map.insert(id, record.clone());
        debug!("Created match: {} with id {}", record.title, id);
        Ok(true)
    }

    async fn get_match_by_external_id(&self, external_id: &str) -> Result<Option<MatchRecord>> {
        let map = self.matches.lock().unwrap();
        Ok(map.values().find(|m| m.external_id == external_id).cloned())
    }

    async fn list_matches_for_series(&self, series_id: Uuid) -> Result<Vec<MatchRecord>> {
        let map = self.matches.lock().unwrap();
        let mut out: Vec<MatchRecord> =
            map.values().filter(|m| m.series_id == series_id).cloned().collect();
        out.sort_by(|a, b| a.external_id.cmp(&b.external_id));
        Ok(out)
    }

    async fn upsert_scorecard(&self, record: &mut ScorecardRecord) -> Result<()> {
        let mut map = self.scorecards.lock().unwrap();
        if let Some(existing) =
            map.values().find(|s| s.match_external_id == record.match_external_id)
        {
            record.id = existing.id;
        } else {
            record.id = Some(Uuid::new_v4());
        }
        let id = record.id.unwrap();
        map.insert(id, record.clone());
        debug!("Upserted scorecard for match {}", record.match_external_id);
        Ok(())
    }

    async fn get_scorecard(&self, match_external_id: &str) -> Result<Option<ScorecardRecord>> {
        let map = self.scorecards.lock().unwrap();
        Ok(map.values().find(|s| s.match_external_id == match_external_id).cloned())
    }

    async fn list_live_scorecards(&self) -> Result<Vec<ScorecardRecord>> {
        let map = self.scorecards.lock().unwrap();
        Ok(map.values().filter(|s| s.is_live).cloned().collect())
    }

    async fn set_scorecard_live(&self, match_external_id: &str, is_live: bool) -> Result<()> {
        let mut map = self.scorecards.lock().unwrap();
        if let Some(record) =
            map.values_mut().find(|s| s.match_external_id == match_external_id)
        {
            record.is_live = is_live;
        }
        Ok(())
    }

    async fn upsert_team(&self, record: &mut TeamRecord) -> Result<bool> {
        let mut map = self.teams.lock().unwrap();
        if let Some(existing) = map.values().find(|t| t.external_id == record.external_id) {
            record.id = existing.id;
            return Ok(false);
        }
        let id = Uuid::new_v4();
        record.id = Some(id);
        map.insert(id, record.clone());
        Ok(true)
    }

    async fn upsert_player(&self, record: &mut PlayerRecord) -> Result<bool> {
        let mut map = self.players.lock().unwrap();
        if let Some(existing) = map.values().find(|p| p.external_id == record.external_id) {
            record.id = existing.id;
            return Ok(false);
        }
        let id = Uuid::new_v4();
        record.id = Some(id);
        map.insert(id, record.clone());
        Ok(true)
    }

    async fn get_player(&self, external_id: &str) -> Result<Option<PlayerRecord>> {
        let map = self.players.lock().unwrap();
        Ok(map.values().find(|p| p.external_id == external_id).cloned())
    }

    async fn update_player(&self, record: &PlayerRecord) -> Result<()> {
        let mut map = self.players.lock().unwrap();
        if let Some(id) = record.id {
            map.insert(id, record.clone());
        }
        Ok(())
    }

    async fn clear_matches(&self) -> Result<usize> {
        let mut map = self.matches.lock().unwrap();
        let count = map.len();
        map.clear();
        Ok(count)
    }

    async fn clear_series(&self) -> Result<usize> {
        self.matches.lock().unwrap().clear();
        let mut map = self.series.lock().unwrap();
        let count = map.len();
        map.clear();
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn series(url: &str) -> SeriesRecord {
        SeriesRecord {
            id: None,
            external_id: Some("1".into()),
            month: "January".into(),
            year: "2026".into(),
            name: "India tour of England".into(),
            date_range: String::new(),
            url: url.into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn series_upsert_is_idempotent_by_url() {
        let storage = InMemoryStorage::new();
        let mut first = series("https://example.com/cricket-series/1/x/matches");
        let mut second = series("https://example.com/cricket-series/1/x/matches");

        assert!(storage.upsert_series(&mut first).await.unwrap());
        assert!(!storage.upsert_series(&mut second).await.unwrap());
        assert_eq!(first.id, second.id);
        assert_eq!(storage.list_series().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn match_upsert_is_idempotent_by_series_and_external_id() {
        let storage = InMemoryStorage::new();
        let mut s = series("https://example.com/cricket-series/1/x/matches");
        storage.upsert_series(&mut s).await.unwrap();
        let series_id = s.id.unwrap();

        let mut m = MatchRecord {
            id: None,
            series_id,
            external_id: "42".into(),
            title: "A vs B, 1st ODI".into(),
            url: "https://example.com/live-cricket-scores/42/a-vs-b".into(),
            date: String::new(),
            created_at: Utc::now(),
        };
        assert!(storage.upsert_match(&mut m).await.unwrap());
        let mut again = m.clone();
        again.id = None;
        assert!(!storage.upsert_match(&mut again).await.unwrap());
        assert_eq!(storage.list_matches_for_series(series_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clearing_series_clears_matches_too() {
        let storage = InMemoryStorage::new();
        let mut s = series("https://example.com/cricket-series/1/x/matches");
        storage.upsert_series(&mut s).await.unwrap();
        let mut m = MatchRecord {
            id: None,
            series_id: s.id.unwrap(),
            external_id: "42".into(),
            title: "A vs B".into(),
            url: String::new(),
            date: String::new(),
            created_at: Utc::now(),
        };
        storage.upsert_match(&mut m).await.unwrap();

        assert_eq!(storage.clear_series().await.unwrap(), 1);
        assert!(storage.list_series().await.unwrap().is_empty());
        assert!(storage.get_match_by_external_id("42").await.unwrap().is_none());
    }
}
