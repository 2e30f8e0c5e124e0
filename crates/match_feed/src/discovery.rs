//! Which matches to poll.
//!
//! Either a static comma-separated list or a list document refetched every
//! cycle. List documents come in three shapes:
//!   - `["4410", 4411]`                                   plain ids
//!   - `[{"matchId": 4410, "scope": "mexico"}, {"id": 7}]` objects
//!   - `{"mexico:4410": {...}, "guatemala_7": {...}}`      keys encode scope + id

use serde_json::Value;
use std::collections::HashSet;
use tracing::{error, warn};

use crate::client::{build_client, fetch_json};
use crate::normalize::{pick, to_text};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackedMatch {
    pub id:    String,
    pub scope: Option<String>,
}

impl TrackedMatch {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), scope: None }
    }
}

fn non_empty(s: String) -> Option<String> {
    let s = s.trim().to_string();
    (!s.is_empty()).then_some(s)
}

fn from_map_key(key: &str) -> TrackedMatch {
    let split = key.rsplit_once(':').or_else(|| key.rsplit_once('_'));
    match split {
        Some((scope, id)) if !scope.is_empty() && !id.is_empty() => TrackedMatch {
            id:    id.to_string(),
            scope: Some(scope.to_string()),
        },
        _ => TrackedMatch::new(key),
    }
}

fn from_array_item(item: &Value) -> Option<TrackedMatch> {
    match item {
        Value::Object(_) => {
            let id = non_empty(pick(item, &["matchId", "id"]).map(to_text)?)?;
            let scope = pick(item, &["scope", "channel"]).map(to_text).and_then(non_empty);
            Some(TrackedMatch { id, scope })
        }
        other => non_empty(to_text(other)).map(TrackedMatch::new),
    }
}

/// First occurrence of each id wins; order is preserved.
fn dedup(items: impl IntoIterator<Item = TrackedMatch>) -> Vec<TrackedMatch> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|m| seen.insert(m.id.clone()))
        .collect()
}

/// Parse a list document. Unknown shapes yield an empty list.
pub fn parse_id_list(doc: &Value) -> Vec<TrackedMatch> {
    match doc {
        Value::Array(items) => dedup(items.iter().filter_map(from_array_item)),
        Value::Object(map) => dedup(
            map.keys()
                .filter(|k| !k.trim().is_empty())
                .map(|k| from_map_key(k.trim())),
        ),
        _ => Vec::new(),
    }
}

/// `MATCH_IDS="4410, 4411,,4412"` → three matches.
pub fn parse_static_ids(csv: &str) -> Vec<TrackedMatch> {
    dedup(
        csv.split(',')
            .filter_map(|s| non_empty(s.to_string()))
            .map(TrackedMatch::new),
    )
}

pub struct IdDiscovery {
    client:     reqwest::Client,
    list_url:   Option<String>,
    static_ids: Vec<TrackedMatch>,
}

impl IdDiscovery {
    pub fn new(list_url: Option<String>, static_ids: Vec<TrackedMatch>) -> Self {
        Self {
            client: build_client(),
            list_url: list_url.filter(|u| !u.trim().is_empty()),
            static_ids,
        }
    }

    /// True when the id list must be refetched every cycle.
    pub fn is_dynamic(&self) -> bool {
        self.list_url.is_some()
    }

    /// Current ids, and whether they came from the list document. A failing
    /// list document falls back to the static list; only a list answer is
    /// authoritative about which matches left.
    pub async fn discover(&self) -> Discovered {
        if let Some(url) = &self.list_url {
            match fetch_json(&self.client, url).await {
                Ok(doc) => {
                    let targets = parse_id_list(&doc);
                    if targets.is_empty() {
                        warn!(%url, "id list document has no usable ids");
                    }
                    return Discovered { targets, from_list: true };
                }
                Err(e) => error!(%url, "FEED_LIST_URL error: {}", e),
            }
        }
        Discovered { targets: self.static_ids.clone(), from_list: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovered {
    pub targets:   Vec<TrackedMatch>,
    pub from_list: bool,
}
