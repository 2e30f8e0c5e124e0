/// MatchdayWatcher
///
/// Polls live match feeds, detects state transitions (lineups, kick-off
/// soon, kick-off, half-time, second half, full time, goals) and pushes
/// exactly one notification per transition.

pub mod config;
pub mod watcher;

pub use config::Config;
pub use watcher::{CycleSummary, TickOutcome, Watcher};
