/// MatchdayWatcher — Match Feed
///
/// Everything between the raw per-match JSON feed and a canonical `MatchState`:
///   - `normalize`: best-effort field extraction across feed shapes
///   - `kickoff`:   venue-local date/time/offset → absolute kickoff instant
///   - `client`:    HTTP fetch with cache busting (`FeedSource` for the scheduler)
///   - `discovery`: which match ids to poll this cycle

pub mod client;
pub mod discovery;
pub mod kickoff;
pub mod normalize;

#[cfg(test)]
mod test_http;

pub use client::{FeedError, FeedSource, HttpFeed};
pub use discovery::{Discovered, IdDiscovery, TrackedMatch};
pub use kickoff::{parse_offset_minutes, resolve_kickoff};
pub use normalize::normalize;

use serde::{Deserialize, Serialize};

pub const HOME_PLACEHOLDER: &str = "Home";
pub const AWAY_PLACEHOLDER: &str = "Away";

// ── Status ids used by the feed ──────────────────────────────────────────────

pub const STATUS_NOT_STARTED: i64 = 0;
pub const STATUS_IN_PROGRESS: i64 = 1;
pub const STATUS_FINISHED:    i64 = 2;
pub const STATUS_HALFTIME:    i64 = 5;
pub const STATUS_SECOND_HALF: i64 = 6;

/// Canonical snapshot of one match, replaced wholesale on every poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchState {
    pub match_id:          String,
    pub scope:             String,
    pub status_id:         i64,
    pub home_goals:        u32,
    pub away_goals:        u32,
    pub lineups_published: bool,
    pub home_team_id:      String,
    pub away_team_id:      String,
    pub home_name:         String,
    pub away_name:         String,
    /// Live minute as the feed prints it ("67", "45+2"), may be empty
    pub minute:            String,
    /// YYYYMMDD, venue-local
    pub scheduled_date:    String,
    /// HH:MM, venue-local
    pub scheduled_time:    String,
    /// Offset text exactly as the feed sent it ("-06:00", "-6", ...)
    pub venue_offset:      String,
    /// `venue_offset` parsed to signed minutes east of UTC
    pub utc_offset_min:    i32,
}

impl MatchState {
    pub fn score_line(&self) -> String {
        format!("{}-{}", self.home_goals, self.away_goals)
    }
}
