use crate::error::{Result, ScraperError};
use crate::storage::Storage;
use crate::types::{MatchRecord, PlayerRecord, ScorecardRecord, SeriesRecord, TeamRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Builder, Connection, Database, Row};
use std::env;
use tracing::{debug, info};
use uuid::Uuid;

pub struct DatabaseManager {
    db: Database,
}

impl DatabaseManager {
    /// Create a new database manager with connection to Turso
    pub async fn new() -> Result<Self> {
        let url = env::var("LIBSQL_URL").map_err(|_| ScraperError::Database {
            message: "LIBSQL_URL environment variable not set".to_string(),
        })?;

        let auth_token = env::var("LIBSQL_AUTH_TOKEN").map_err(|_| ScraperError::Database {
            message: "LIBSQL_AUTH_TOKEN environment variable not set".to_string(),
        })?;

        info!("Connecting to Turso database at {}", url);

        let db = Builder::new_remote(url, auth_token)
            .build()
            .await
            .map_err(|e| ScraperError::Database {
                message: format!("Failed to connect to database: {e}"),
            })?;

        Ok(Self { db })
    }

    /// Get a connection to the database
    pub async fn get_connection(&self) -> Result<Connection> {
        self.db.connect().map_err(|e| ScraperError::Database {
            message: format!("Failed to get database connection: {e}"),
        })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");

        let conn = self.get_connection().await?;
        let migration_sql = include_str!("../migrations/001_create_schedule_tables.sql");

        conn.execute_batch(migration_sql)
            .await
            .map_err(|e| ScraperError::Database {
                message: format!("Failed to run migrations: {e}"),
            })?;

        info!("Database migrations completed successfully");
        Ok(())
    }
}

fn db_err(context: &str, e: impl std::fmt::Display) -> ScraperError {
    ScraperError::Database {
        message: format!("{context}: {e}"),
    }
}

fn get_text(row: &Row, idx: i32, name: &str) -> Result<String> {
    row.get::<String>(idx)
        .map_err(|e| db_err(&format!("Failed to get {name}"), e))
}

fn get_opt_text(row: &Row, idx: i32) -> Option<String> {
    row.get::<String>(idx).ok().filter(|s| !s.is_empty())
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| db_err("Invalid stored id", e))
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn series_from_row(row: &Row) -> Result<SeriesRecord> {
    Ok(SeriesRecord {
        id: Some(parse_uuid(&get_text(row, 0, "id")?)?),
        external_id: get_opt_text(row, 1),
        month: get_text(row, 2, "month")?,
        year: get_text(row, 3, "year")?,
        name: get_text(row, 4, "name")?,
        date_range: get_opt_text(row, 5).unwrap_or_default(),
        url: get_text(row, 6, "url")?,
        created_at: parse_timestamp(&get_text(row, 7, "created_at")?),
    })
}

fn match_from_row(row: &Row) -> Result<MatchRecord> {
    Ok(MatchRecord {
        id: Some(parse_uuid(&get_text(row, 0, "id")?)?),
        series_id: parse_uuid(&get_text(row, 1, "series_id")?)?,
        external_id: get_text(row, 2, "external_id")?,
        title: get_text(row, 3, "title")?,
        url: get_text(row, 4, "url")?,
        date: get_opt_text(row, 5).unwrap_or_default(),
        created_at: parse_timestamp(&get_text(row, 6, "created_at")?),
    })
}

fn scorecard_from_row(row: &Row) -> Result<ScorecardRecord> {
    let innings_json = get_text(row, 6, "innings")?;
    Ok(ScorecardRecord {
        id: Some(parse_uuid(&get_text(row, 0, "id")?)?),
        match_external_id: get_text(row, 1, "match_external_id")?,
        title: get_text(row, 2, "title")?,
        status_text: get_opt_text(row, 3).unwrap_or_default(),
        is_live: row.get::<i64>(4).unwrap_or(0) != 0,
        final_score: get_opt_text(row, 5).unwrap_or_default(),
        innings: serde_json::from_str(&innings_json)?,
        page_digest: get_text(row, 7, "page_digest")?,
        last_updated: parse_timestamp(&get_text(row, 8, "last_updated")?),
    })
}

const SERIES_COLUMNS: &str = "id, external_id, month, year, name, date_range, url, created_at";
const MATCH_COLUMNS: &str = "id, series_id, external_id, title, url, match_date, created_at";
const SCORECARD_COLUMNS: &str =
    "id, match_external_id, title, status_text, is_live, final_score, innings, page_digest, last_updated";

#[async_trait]
impl Storage for DatabaseManager {
    async fn upsert_series(&self, series: &mut SeriesRecord) -> Result<bool> {
        let conn = self.get_connection().await?;

        let mut rows = conn
            .query(
                "SELECT id FROM series WHERE url = ?",
                libsql::params![series.url.clone()],
            )
            .await
            .map_err(|e| db_err("Failed to query series", e))?;

        if let Some(row) = rows
            .next()
            .await
            .map_err(|e| db_err("Failed to read row", e))?
        {
            series.id = Some(parse_uuid(&get_text(&row, 0, "id")?)?);
            return Ok(false);
        }

        let id = Uuid::new_v4();
        series.id = Some(id);
        conn.execute(
            "INSERT INTO series (id, external_id, month, year, name, date_range, url, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            libsql::params![
                id.to_string(),
                series.external_id.clone(),
                series.month.clone(),
                series.year.clone(),
                series.name.clone(),
                series.date_range.clone(),
                series.url.clone(),
                series.created_at.to_rfc3339()
            ],
        )
        .await
        .map_err(|e| db_err("Failed to insert series", e))?;

        debug!("Created series: {} with id {}", series.name, id);
        Ok(true)
    }

    async fn get_series(&self, id: Uuid) -> Result<Option<SeriesRecord>> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {SERIES_COLUMNS} FROM series WHERE id = ?"),
                libsql::params![id.to_string()],
            )
            .await
            .map_err(|e| db_err("Failed to query series", e))?;

        match rows
            .next()
            .await
            .map_err(|e| db_err("Failed to read row", e))?
        {
            Some(row) => Ok(Some(series_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_series(&self) -> Result<Vec<SeriesRecord>> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {SERIES_COLUMNS} FROM series ORDER BY name"),
                libsql::params![],
            )
            .await
            .map_err(|e| db_err("Failed to query series", e))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| db_err("Failed to read row", e))?
        {
            results.push(series_from_row(&row)?);
        }
        Ok(results)
    }

    async fn upsert_match(&self, record: &mut MatchRecord) -> Result<bool> {
        let conn = self.get_connection().await?;

        let mut rows = conn
            .query(
                "SELECT id FROM matches WHERE series_id = ? AND external_id = ?",
                libsql::params![record.series_id.to_string(), record.external_id.clone()],
            )
            .await
            .map_err(|e| db_err("Failed to query match", e))?;

        if let Some(row) = rows
            .next()
            .await
            .map_err(|e| db_err("Failed to read row", e))?
        {
            record.id = Some(parse_uuid(&get_text(&row, 0, "id")?)?);
            return Ok(false);
        }

        let id = Uuid::new_v4();
        record.id = Some(id);
        conn.execute(
            "INSERT INTO matches (id, series_id, external_id, title, url, match_date, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
            libsql::params![
                id.to_string(),
                record.series_id.to_string(),
                record.external_id.clone(),
                record.title.clone(),
                record.url.clone(),
                record.date.clone(),
                record.created_at.to_rfc3339()
            ],
        )
        .await
        .map_err(|e| db_err("Failed to insert match", e))?;

        debug!("Created match: {} with id {}", record.title, id);
        Ok(true)
    }

    async fn get_match_by_external_id(&self, external_id: &str) -> Result<Option<MatchRecord>> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {MATCH_COLUMNS} FROM matches WHERE external_id = ?"),
                libsql::params![external_id],
            )
            .await
            .map_err(|e| db_err("Failed to query match", e))?;

        match rows
            .next()
            .await
            .map_err(|e| db_err("Failed to read row", e))?
        {
            Some(row) => Ok(Some(match_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_matches_for_series(&self, series_id: Uuid) -> Result<Vec<MatchRecord>> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {MATCH_COLUMNS} FROM matches WHERE series_id = ? ORDER BY external_id"),
                libsql::params![series_id.to_string()],
            )
            .await
            .map_err(|e| db_err("Failed to query matches", e))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| db_err("Failed to read row", e))?
        {
            results.push(match_from_row(&row)?);
        }
        Ok(results)
    }

    async fn upsert_scorecard(&self, record: &mut ScorecardRecord) -> Result<()> {
        let conn = self.get_connection().await?;

        if record.id.is_none() {
            record.id = Some(Uuid::new_v4());
        }
        let innings_json = serde_json::to_string(&record.innings)?;

        // The unique key is the match's external id, so a re-scrape replaces
        // the previous snapshot in place.
        conn.execute(
            "INSERT INTO scorecards (id, match_external_id, title, status_text, is_live, final_score, innings, page_digest, last_updated) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (match_external_id) DO UPDATE SET \
               title = excluded.title, status_text = excluded.status_text, is_live = excluded.is_live, \
               final_score = excluded.final_score, innings = excluded.innings, \
               page_digest = excluded.page_digest, last_updated = excluded.last_updated",
            libsql::params![
                record.id.map(|u| u.to_string()),
                record.match_external_id.clone(),
                record.title.clone(),
                record.status_text.clone(),
                record.is_live as i64,
                record.final_score.clone(),
                innings_json,
                record.page_digest.clone(),
                record.last_updated.to_rfc3339()
            ],
        )
        .await
        .map_err(|e| db_err("Failed to upsert scorecard", e))?;

        debug!("Upserted scorecard for match {}", record.match_external_id);
        Ok(())
    }

    async fn get_scorecard(&self, match_external_id: &str) -> Result<Option<ScorecardRecord>> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {SCORECARD_COLUMNS} FROM scorecards WHERE match_external_id = ?"),
                libsql::params![match_external_id],
            )
            .await
            .map_err(|e| db_err("Failed to query scorecard", e))?;

        match rows
            .next()
            .await
            .map_err(|e| db_err("Failed to read row", e))?
        {
            Some(row) => Ok(Some(scorecard_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_live_scorecards(&self) -> Result<Vec<ScorecardRecord>> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {SCORECARD_COLUMNS} FROM scorecards WHERE is_live = 1"),
                libsql::params![],
            )
            .await
            .map_err(|e| db_err("Failed to query live scorecards", e))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| db_err("Failed to read row", e))?
        {
            results.push(scorecard_from_row(&row)?);
        }
        Ok(results)
    }

    async fn set_scorecard_live(&self, match_external_id: &str, is_live: bool) -> Result<()> {
        let conn = self.get_connection().await?;
        conn.execute(
            "UPDATE scorecards SET is_live = ? WHERE match_external_id = ?",
            libsql::params![is_live as i64, match_external_id],
        )
        .await
        .map_err(|e| db_err("Failed to update live flag", e))?;
        Ok(())
    }

    async fn upsert_team(&self, record: &mut TeamRecord) -> Result<bool> {
        let conn = self.get_connection().await?;

        let mut rows = conn
            .query(
                "SELECT id FROM teams WHERE external_id = ?",
                libsql::params![record.external_id.clone()],
            )
            .await
            .map_err(|e| db_err("Failed to query team", e))?;

        if let Some(row) = rows
            .next()
            .await
            .map_err(|e| db_err("Failed to read row", e))?
        {
            record.id = Some(parse_uuid(&get_text(&row, 0, "id")?)?);
            conn.execute(
                "UPDATE teams SET name = ?, team_type = ?, flag_url = ? WHERE external_id = ?",
                libsql::params![
                    record.name.clone(),
                    record.team_type.clone(),
                    record.flag_url.clone(),
                    record.external_id.clone()
                ],
            )
            .await
            .map_err(|e| db_err("Failed to update team", e))?;
            return Ok(false);
        }

        let id = Uuid::new_v4();
        record.id = Some(id);
        conn.execute(
            "INSERT INTO teams (id, external_id, name, team_type, flag_url) VALUES (?, ?, ?, ?, ?)",
            libsql::params![
                id.to_string(),
                record.external_id.clone(),
                record.name.clone(),
                record.team_type.clone(),
                record.flag_url.clone()
            ],
        )
        .await
        .map_err(|e| db_err("Failed to insert team", e))?;
        Ok(true)
    }

    async fn upsert_player(&self, record: &mut PlayerRecord) -> Result<bool> {
        let conn = self.get_connection().await?;

        let mut rows = conn
            .query(
                "SELECT id FROM players WHERE external_id = ?",
                libsql::params![record.external_id.clone()],
            )
            .await
            .map_err(|e| db_err("Failed to query player", e))?;

        if let Some(row) = rows
            .next()
            .await
            .map_err(|e| db_err("Failed to read row", e))?
        {
            record.id = Some(parse_uuid(&get_text(&row, 0, "id")?)?);
            return Ok(false);
        }

        let id = Uuid::new_v4();
        record.id = Some(id);
        conn.execute(
            "INSERT INTO players (id, external_id, team_external_id, name, role, batting_style, bowling_style, image_url) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            libsql::params![
                id.to_string(),
                record.external_id.clone(),
                record.team_external_id.clone(),
                record.name.clone(),
                record.role.clone(),
                record.batting_style.clone(),
                record.bowling_style.clone(),
                record.image_url.clone()
            ],
        )
        .await
        .map_err(|e| db_err("Failed to insert player", e))?;
        Ok(true)
    }

    async fn get_player(&self, external_id: &str) -> Result<Option<PlayerRecord>> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                "SELECT id, external_id, team_external_id, name, role, batting_style, bowling_style, image_url FROM players WHERE external_id = ?",
                libsql::params![external_id],
            )
            .await
            .map_err(|e| db_err("Failed to query player", e))?;

        match rows
            .next()
            .await
            .map_err(|e| db_err("Failed to read row", e))?
        {
            Some(row) => Ok(Some(PlayerRecord {
                id: Some(parse_uuid(&get_text(&row, 0, "id")?)?),
                external_id: get_text(&row, 1, "external_id")?,
                team_external_id: get_text(&row, 2, "team_external_id")?,
                name: get_text(&row, 3, "name")?,
                role: get_opt_text(&row, 4),
                batting_style: get_opt_text(&row, 5),
                bowling_style: get_opt_text(&row, 6),
                image_url: get_opt_text(&row, 7),
            })),
            None => Ok(None),
        }
    }

    async fn update_player(&self, record: &PlayerRecord) -> Result<()> {
        let conn = self.get_connection().await?;
        conn.execute(
            "UPDATE players SET name = ?, role = ?, batting_style = ?, bowling_style = ?, image_url = ? WHERE external_id = ?",
            libsql::params![
                record.name.clone(),
                record.role.clone(),
                record.batting_style.clone(),
                record.bowling_style.clone(),
                record.image_url.clone(),
                record.external_id.clone()
            ],
        )
        .await
        .map_err(|e| db_err("Failed to update player", e))?;
        Ok(())
    }

    async fn clear_matches(&self) -> Result<usize> {
        let conn = self.get_connection().await?;
        let count = conn
            .execute("DELETE FROM matches", libsql::params![])
            .await
            .map_err(|e| db_err("Failed to clear matches", e))?;
        info!("Cleared {} matches from database", count);
        Ok(count as usize)
    }

    async fn clear_series(&self) -> Result<usize> {
        let conn = self.get_connection().await?;

        // Matches reference series, so they go first.
        conn.execute("DELETE FROM matches", libsql::params![])
            .await
            .map_err(|e| db_err("Failed to clear matches", e))?;

        let count = conn
            .execute("DELETE FROM series", libsql::params![])
            .await
            .map_err(|e| db_err("Failed to clear series", e))?;
        info!("Cleared {} series from database", count);
        Ok(count as usize)
    }
}
