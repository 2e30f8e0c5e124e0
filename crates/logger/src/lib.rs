/// MatchdayWatcher — Logger
/// JSONL audit stream: one file per UTC day, one event per line

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event typy ────────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct WatcherHeartbeatEvent {
    pub ts:              String,
    pub event:           &'static str,   // "WATCHER_HEARTBEAT"
    pub tracked_matches: usize,
    pub fetch_ok:        usize,
    pub fetch_failed:    usize,
    pub events_detected: usize,
    pub pushes_sent:     usize,
    pub store_mode:      String,         // "redis" | "memory"
}

#[derive(Serialize, Debug)]
pub struct FeedFetchFailedEvent {
    pub ts:       String,
    pub event:    &'static str,   // "FEED_FETCH_FAILED"
    pub match_id: String,
    pub message:  String,
}

#[derive(Serialize, Debug)]
pub struct MatchEventLogged {
    pub ts:         String,
    pub event:      &'static str,   // "MATCH_EVENT"
    pub match_id:   String,
    pub kind:       String,         // "GOAL", "START", ...
    pub key:        String,         // idempotency key
    pub claimed:    bool,           // false = duplicate, dispatch skipped
    pub home_goals: u32,
    pub away_goals: u32,
    pub status_id:  i64,
}

#[derive(Serialize, Debug)]
pub struct PushResultEvent {
    pub ts:         String,
    pub event:      &'static str,   // "PUSH_SENT" | "PUSH_FAILED"
    pub match_id:   String,
    pub kind:       String,
    pub target:     String,         // topic name or condition expression
    pub message_id: Option<String>,
    pub error:      Option<String>,
}
