/// MatchdayWatcher — Transition Detector
///
/// Compares the previous and current `MatchState` of one match and reports
/// which semantic events fired. Pure: same inputs, same events, no I/O.
/// The prior-state table lives in `StateStore`, owned by the scheduler.

mod event;
mod store;

pub use event::{Event, EventKind, ParseKindError, Side};
pub use store::StateStore;

use chrono::{DateTime, Duration, Utc};
use match_feed::{
    resolve_kickoff, MatchState, STATUS_FINISHED, STATUS_HALFTIME, STATUS_IN_PROGRESS,
    STATUS_NOT_STARTED, STATUS_SECOND_HALF,
};

pub const DEFAULT_LEAD_MINUTES: i64 = 30;

/// Claims for most kinds must outlive any plausible re-detection of the same match day.
pub const DEFAULT_CLAIM_TTL: std::time::Duration = std::time::Duration::from_secs(36 * 3600);
pub const GOAL_CLAIM_TTL:    std::time::Duration = std::time::Duration::from_secs(24 * 3600);

#[derive(Debug, Clone)]
pub struct Detector {
    lead_minutes: i64,
}

impl Default for Detector {
    fn default() -> Self {
        Self::new(DEFAULT_LEAD_MINUTES)
    }
}

impl Detector {
    pub fn new(lead_minutes: i64) -> Self {
        Self { lead_minutes: lead_minutes.max(1) }
    }

    pub fn lead_minutes(&self) -> i64 {
        self.lead_minutes
    }

    /// Kickoff is known and strictly in the future, at most `lead_minutes` away.
    pub fn in_lead_window(&self, state: &MatchState, now: DateTime<Utc>) -> bool {
        match resolve_kickoff(state) {
            Some(kickoff) => {
                let until = kickoff - now;
                until > Duration::zero() && until <= Duration::minutes(self.lead_minutes)
            }
            None => false,
        }
    }

    /// Events fired by the step `prior → current`. The first observation
    /// of a match (`prior == None`) only seeds the table and fires nothing.
    pub fn detect(
        &self,
        prior: Option<&MatchState>,
        current: &MatchState,
        now: DateTime<Utc>,
    ) -> Vec<Event> {
        let Some(prior) = prior else {
            return Vec::new();
        };

        let mut events = Vec::new();
        let mut fire = |kind: EventKind, scorer: Option<Side>| {
            events.push(Event::new(kind, current.clone(), scorer));
        };

        if self.in_lead_window(current, now) {
            fire(EventKind::PreKickoff, None);
        }

        if !prior.lineups_published && current.lineups_published {
            fire(EventKind::Lineups, None);
        }

        let status_changed = prior.status_id != current.status_id;
        if prior.status_id == STATUS_NOT_STARTED && current.status_id == STATUS_IN_PROGRESS {
            fire(EventKind::Start, None);
        }
        if status_changed && current.status_id == STATUS_HALFTIME {
            fire(EventKind::Halftime, None);
        }
        if status_changed && current.status_id == STATUS_SECOND_HALF {
            fire(EventKind::SecondHalf, None);
        }
        if status_changed && current.status_id == STATUS_FINISHED {
            fire(EventKind::End, None);
        }

        // goals only ever count up; a correction downwards is silently ignored
        let home_scored = current.home_goals > prior.home_goals;
        let away_scored = current.away_goals > prior.away_goals;
        if home_scored || away_scored {
            let side = if home_scored { Side::Home } else { Side::Away };
            fire(EventKind::Goal, Some(side));
        }

        events
    }

    /// Deterministic dedup key. Goals key on the resulting scoreline so each
    /// distinct score fires once; pre-kickoff keys on the lead window so it
    /// fires once per match however often the window is polled.
    pub fn idempotency_key(&self, event: &Event) -> String {
        let tag = match event.kind {
            EventKind::Lineups    => "lineups".to_string(),
            EventKind::PreKickoff => format!("pre{}", self.lead_minutes),
            EventKind::Start      => "start".to_string(),
            EventKind::Halftime   => "ht".to_string(),
            EventKind::SecondHalf => "st".to_string(),
            EventKind::End        => "end".to_string(),
            EventKind::Goal       => format!(
                "score-{}-{}",
                event.snapshot.home_goals, event.snapshot.away_goals
            ),
        };
        format!("sent:{}:{}", event.match_id, tag)
    }

    pub fn claim_ttl(&self, kind: EventKind) -> std::time::Duration {
        match kind {
            EventKind::Goal => GOAL_CLAIM_TTL,
            _ => DEFAULT_CLAIM_TTL,
        }
    }
}
