use match_feed::MatchState;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// Last observed `MatchState` per tracked match id (last write wins).
///
/// Keyed by the id the scheduler polls, which is also the state's
/// `match_id` unless the feed reports a different one. Owned by the
/// scheduler and shared with the per-match tasks; each id is polled by at
/// most one task per cycle, so the lock is only held for the swap itself.
#[derive(Debug, Default)]
pub struct StateStore {
    inner: Mutex<HashMap<String, MatchState>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, MatchState>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, match_id: &str) -> Option<MatchState> {
        self.map().get(match_id).cloned()
    }

    /// Store `current` under `match_id` and hand back what it replaced.
    pub fn replace(&self, match_id: &str, current: MatchState) -> Option<MatchState> {
        self.map().insert(match_id.to_string(), current)
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    /// Drop ids that are no longer polled. Returns how many were evicted.
    pub fn retain_tracked<'a>(&self, tracked: impl IntoIterator<Item = &'a str>) -> usize {
        let keep: HashSet<&str> = tracked.into_iter().collect();
        let mut map = self.map();
        let before = map.len();
        map.retain(|id, _| keep.contains(id.as_str()));
        before - map.len()
    }
}
