pub mod attribution;
pub mod config;
pub mod constants;
#[cfg(feature = "db")]
pub mod db;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod live;
pub mod locator;
pub mod logging;
pub mod pipeline;
pub mod rate_limiter;
pub mod roster;
pub mod scorecard;
pub mod storage;
pub mod types;
