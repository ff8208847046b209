use clap::{Parser, Subcommand};
use cric_scraper::config::Config;
use cric_scraper::error::Result;
use cric_scraper::live::LiveRefresher;
use cric_scraper::pipeline::Pipeline;
use cric_scraper::logging;
use cric_scraper::storage::Storage;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "cric_scraper")]
#[command(about = "Cricket schedule, scorecard and roster scraper")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the schedule page for series
    Series,
    /// Scrape fixtures for one series, or for all stored series
    Matches {
        /// Series id to scrape
        #[arg(long)]
        series_id: Option<Uuid>,
        /// Scrape every stored series sequentially
        #[arg(long)]
        all: bool,
    },
    /// Scrape one scorecard by external match id
    Scorecard {
        match_id: String,
    },
    /// Scrape a team index page
    Teams {
        /// Team type: international, league, domestic, women
        #[arg(long, default_value = "international")]
        team_type: String,
    },
    /// Scrape a team's roster page
    Players {
        team_id: String,
    },
    /// Scrape one player's profile page
    PlayerProfile {
        player_id: String,
    },
    /// Run the live refresh loop until interrupted
    LiveWatch,
    /// Delete stored matches, or series together with their matches
    Clear {
        /// What to delete: matches, series
        #[arg(long, default_value = "matches")]
        what: String,
    },
}

#[cfg(feature = "db")]
async fn create_storage() -> Result<Arc<dyn Storage>> {
    let db = cric_scraper::db::DatabaseManager::new().await?;
    db.run_migrations().await?;
    Ok(Arc::new(db))
}

#[cfg(not(feature = "db"))]
async fn create_storage() -> Result<Arc<dyn Storage>> {
    warn!("Running with in-memory storage; nothing will persist");
    Ok(Arc::new(cric_scraper::storage::InMemoryStorage::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("Could not load config.toml ({}), using defaults", e);
            Config::default()
        }
    };

    let storage = create_storage().await?;
    let pipeline = Arc::new(Pipeline::new(storage, config.clone()));

    match cli.command {
        Commands::Series => {
            pipeline.scrape_series_list().await?;
        }
        Commands::Matches { series_id, all } => {
            if all {
                pipeline.scrape_all_matches().await?;
            } else if let Some(series_id) = series_id {
                pipeline.scrape_matches_for_series(series_id).await?;
            } else {
                println!("⚠️  Pass --series-id <id> or --all");
            }
        }
        Commands::Scorecard { match_id } => {
            let outcome = pipeline.scrape_scorecard(&match_id).await?;
            println!("📊 {}", outcome.message);
            if !outcome.final_score.is_empty() {
                println!("   {}", outcome.final_score);
            }
            if !outcome.status_text.is_empty() {
                println!("   {}", outcome.status_text);
            }
            if outcome.is_live {
                println!("   🔴 live");
            }
        }
        Commands::Teams { team_type } => {
            pipeline.scrape_teams(&team_type).await?;
        }
        Commands::Players { team_id } => {
            pipeline.scrape_players(&team_id).await?;
        }
        Commands::PlayerProfile { player_id } => {
            let outcome = pipeline.scrape_player_profile(&player_id).await?;
            if outcome.success {
                println!("✅ {}", outcome.message);
            } else {
                println!("❌ {}", outcome.message);
            }
        }
        Commands::LiveWatch => {
            let refresher = LiveRefresher::new(
                Arc::clone(&pipeline),
                config.live_refresh.interval_seconds,
            );
            refresher.start();
            println!(
                "🔴 Watching live matches every {}s, press Ctrl-C to stop",
                config.live_refresh.interval_seconds
            );
            tokio::signal::ctrl_c().await?;
            refresher.shutdown();
            info!("Live watch stopped");
        }
        Commands::Clear { what } => match what.as_str() {
            "matches" => {
                let count = pipeline.clear_matches().await?;
                println!("🗑️  Deleted {} matches", count);
            }
            "series" => {
                let count = pipeline.clear_series().await?;
                println!("🗑️  Deleted {} series and their matches", count);
            }
            other => {
                error!("Unknown clear target: {}", other);
                println!("⚠️  Unknown target '{}', expected matches or series", other);
            }
        },
    }

    Ok(())
}
