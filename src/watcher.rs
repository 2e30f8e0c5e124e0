//! Poll → normalize → detect → claim → dispatch, per match and per cycle.

use chrono::{DateTime, Utc};
use idempotency_gate::IdempotencyGate;
use logger::{now_iso, EventLogger, FeedFetchFailedEvent, MatchEventLogged, WatcherHeartbeatEvent};
use match_feed::{normalize, FeedSource, IdDiscovery, TrackedMatch};
use push_dispatcher::Dispatcher;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use transition_detector::{Detector, StateStore};

/// What one per-match poll did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub fetched: bool,
    pub events:  usize,
    pub claimed: usize,
    pub pushes:  usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub tracked:      usize,
    pub fetch_ok:     usize,
    pub fetch_failed: usize,
    pub events:       usize,
    pub claimed:      usize,
    pub pushes:       usize,
}

impl CycleSummary {
    fn add(&mut self, t: TickOutcome) {
        if t.fetched { self.fetch_ok += 1 } else { self.fetch_failed += 1 }
        self.events  += t.events;
        self.claimed += t.claimed;
        self.pushes  += t.pushes;
    }
}

pub struct Watcher {
    feed:          Arc<dyn FeedSource>,
    states:        StateStore,
    detector:      Detector,
    gate:          IdempotencyGate,
    dispatcher:    Dispatcher,
    default_scope: String,
    audit:         Option<Arc<EventLogger>>,
}

impl Watcher {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        detector: Detector,
        gate: IdempotencyGate,
        dispatcher: Dispatcher,
        default_scope: impl Into<String>,
    ) -> Self {
        Self {
            feed,
            states: StateStore::new(),
            detector,
            gate,
            dispatcher,
            default_scope: default_scope.into(),
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: Arc<EventLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn states(&self) -> &StateStore {
        &self.states
    }

    pub fn gate(&self) -> &IdempotencyGate {
        &self.gate
    }

    fn audit<T: serde::Serialize>(&self, event: &T) {
        if let Some(audit) = &self.audit {
            let _ = audit.log(event);
        }
    }

    /// One poll of one match. A fetch error skips the match for this cycle
    /// and leaves its prior state untouched.
    pub async fn tick(&self, target: &TrackedMatch, now: DateTime<Utc>) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        let raw = match self.feed.fetch_match(target).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("[fetch] {} {}", target.id, e);
                self.audit(&FeedFetchFailedEvent {
                    ts: now_iso(),
                    event: "FEED_FETCH_FAILED",
                    match_id: target.id.clone(),
                    message: e.to_string(),
                });
                return outcome;
            }
        };
        outcome.fetched = true;

        let scope = target.scope.as_deref().unwrap_or(&self.default_scope);
        let mut current = normalize(&raw, scope);
        if current.match_id.is_empty() {
            current.match_id = target.id.clone();
        }

        debug!(
            match_id = %current.match_id,
            status = current.status_id,
            score = %current.score_line(),
            lineups = current.lineups_published,
            "{} vs {} | ids={} {}",
            current.home_name, current.away_name, current.home_team_id, current.away_team_id
        );

        // prior is replaced whatever happens to the dispatches below
        let Some(prior) = self.states.replace(&target.id, current.clone()) else {
            info!("[state] init {} {} vs {}", current.match_id, current.home_name, current.away_name);
            return outcome;
        };

        let events = self.detector.detect(Some(&prior), &current, now);
        outcome.events = events.len();

        for event in &events {
            let key = self.detector.idempotency_key(event);
            let claimed = self.gate.try_claim(&key, self.detector.claim_ttl(event.kind)).await;

            self.audit(&MatchEventLogged {
                ts: now_iso(),
                event: "MATCH_EVENT",
                match_id: event.match_id.clone(),
                kind: event.kind.to_string(),
                key: key.clone(),
                claimed,
                home_goals: event.snapshot.home_goals,
                away_goals: event.snapshot.away_goals,
                status_id: event.snapshot.status_id,
            });

            if !claimed {
                debug!(%key, "already sent, skipping");
                continue;
            }
            outcome.claimed += 1;
            info!(match_id = %event.match_id, kind = %event.kind, %key, "event claimed");

            let report = self.dispatcher.dispatch(event).await;
            outcome.pushes += report.delivered;
            if report.all_failed() {
                // nothing was delivered: give the claim back so a later
                // re-detection (here or on another worker) can retry
                warn!(%key, "all targets failed, releasing claim");
                self.gate.release(&key).await;
            }
        }

        outcome
    }

    /// Poll every tracked match concurrently and wait for all of them.
    pub async fn run_cycle(self: &Arc<Self>, targets: &[TrackedMatch]) -> CycleSummary {
        let mut summary = CycleSummary { tracked: targets.len(), ..CycleSummary::default() };
        let mut tasks = JoinSet::new();

        for target in targets.iter().cloned() {
            let watcher = Arc::clone(self);
            tasks.spawn(async move { watcher.tick(&target, Utc::now()).await });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => summary.add(outcome),
                Err(e) => {
                    error!("[loop] match task failed: {}", e);
                    summary.fetch_failed += 1;
                }
            }
        }

        self.audit(&WatcherHeartbeatEvent {
            ts: now_iso(),
            event: "WATCHER_HEARTBEAT",
            tracked_matches: summary.tracked,
            fetch_ok: summary.fetch_ok,
            fetch_failed: summary.fetch_failed,
            events_detected: summary.events,
            pushes_sent: summary.pushes,
            store_mode: self.gate.mode().to_string(),
        });

        summary
    }

    /// Ids to poll this cycle. Only a list-document answer evicts state of
    /// matches that are no longer listed; the static fallback never does.
    pub async fn refresh_targets(&self, discovery: &IdDiscovery) -> Vec<TrackedMatch> {
        let found = discovery.discover().await;
        if found.from_list {
            let evicted = self.states.retain_tracked(found.targets.iter().map(|t| t.id.as_str()));
            if evicted > 0 {
                debug!(evicted, "dropped state for matches no longer listed");
            }
        }
        found.targets
    }

    /// Scheduler loop: one cycle per `poll_interval` until `shutdown`
    /// resolves. A cycle in flight always runs to completion.
    pub async fn run_until<S>(self: Arc<Self>, discovery: &IdDiscovery, poll_interval: Duration, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut targets = Vec::new();
        let mut first = true;

        loop {
            if first || discovery.is_dynamic() {
                targets = self.refresh_targets(discovery).await;
                if first && targets.is_empty() {
                    warn!("No MATCH_IDS nor FEED_LIST_URL with valid ids.");
                }
                first = false;
            }

            let summary = self.run_cycle(&targets).await;
            info!(
                tracked = summary.tracked,
                ok = summary.fetch_ok,
                failed = summary.fetch_failed,
                events = summary.events,
                pushes = summary.pushes,
                "--- poll cycle done ---"
            );

            tokio::select! {
                _ = &mut shutdown => {
                    info!("[watcher] shutting down");
                    break;
                }
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }
    }
}
