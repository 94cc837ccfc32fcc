//! # oejp-meter - Octopus Energy Japan half-hourly meter poller
//!
//! Polls the Kraken GraphQL API for half-hourly electricity readings, keeps
//! an authenticated session alive, and turns the readings into JST calendar
//! metrics plus a restart-durable lifetime energy total.
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `time`: API timestamp parsing and JST calendar boundaries
//! - `kraken`: GraphQL client, session and readings repository
//! - `dashboard`: Today / yesterday / month sums and the recent list
//! - `accumulator`: Monotonic lifetime total with deduplication
//! - `persistence`: State file for the lifetime total
//! - `cost`: Yen costs from a flat price per kWh
//! - `coordinator`: One refresh cycle as the scheduler drives it

pub mod accumulator;
pub mod config;
pub mod coordinator;
pub mod cost;
pub mod dashboard;
pub mod error;
pub mod kraken;
pub mod logging;
pub mod persistence;
pub mod time;

// Re-export commonly used types
pub use accumulator::{CumulativeEnergyAccumulator, CumulativeState};
pub use config::Config;
pub use coordinator::{Coordinator, RefreshFailure};
pub use dashboard::{DashboardAggregator, DashboardSnapshot, RecentReading};
pub use error::{MeterError, Result};
