//! Who receives a push.
//!
//! `Topics` sends one message per topic (match, home team, away team,
//! legacy). `Condition` sends a single message to
//! `'match_1' in topics || 'team_2' in topics || ...`, so a device
//! subscribed to several of them still gets it once; only this mode can add
//! the general news topic.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use transition_detector::{Event, EventKind};

/// FCM accepts at most five topics in one condition.
pub const MAX_CONDITION_TOPICS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Topic(String),
    Condition(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Topic(t) => write!(f, "topic:{t}"),
            Target::Condition(c) => write!(f, "condition:{c}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetMode {
    #[default]
    Topics,
    Condition,
}

impl FromStr for TargetMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "topics" | "topic" => Ok(TargetMode::Topics),
            "condition" => Ok(TargetMode::Condition),
            other => Err(format!("unknown TARGET_MODE: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Targeting {
    pub mode:          TargetMode,
    pub topic_prefix:  String,
    pub team_prefix:   String,
    pub legacy_topic:  Option<String>,
    pub news_topic:    Option<String>,
    pub news_events:   Vec<EventKind>,
    /// Empty = every team qualifies for the news topic
    pub news_team_ids: Vec<String>,
}

impl Default for Targeting {
    fn default() -> Self {
        Self {
            mode:          TargetMode::Topics,
            topic_prefix:  "match_".to_string(),
            team_prefix:   "team_".to_string(),
            legacy_topic:  None,
            news_topic:    None,
            news_events:   vec![EventKind::Goal, EventKind::End],
            news_team_ids: Vec::new(),
        }
    }
}

/// Topic names may only contain `[a-zA-Z0-9-_.~%]`.
fn topic_name(prefix: &str, id: &str) -> String {
    format!("{prefix}{id}")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || "-_.~%".contains(c) { c } else { '_' })
        .collect()
}

/// Configured topic (legacy, news) in sanitized form, if any.
fn configured_topic(topic: &Option<String>) -> Option<String> {
    topic
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| topic_name("", t))
}

impl Targeting {
    /// Event-specific topics in delivery order, empties and repeats skipped.
    pub fn topics_for(&self, event: &Event) -> Vec<String> {
        let m = &event.snapshot;
        let mut topics = vec![topic_name(&self.topic_prefix, &event.match_id)];
        for team_id in [&m.home_team_id, &m.away_team_id] {
            if !team_id.is_empty() {
                topics.push(topic_name(&self.team_prefix, team_id));
            }
        }
        topics.extend(configured_topic(&self.legacy_topic));

        let mut seen = HashSet::new();
        topics.retain(|t| seen.insert(t.clone()));
        topics
    }

    fn wants_news(&self, event: &Event) -> bool {
        if !self.news_events.contains(&event.kind) {
            return false;
        }
        let m = &event.snapshot;
        self.news_team_ids.is_empty()
            || self
                .news_team_ids
                .iter()
                .any(|id| *id == m.home_team_id || *id == m.away_team_id)
    }

    pub fn condition_for(&self, event: &Event) -> String {
        let mut topics = self.topics_for(event);
        if let Some(news) = configured_topic(&self.news_topic) {
            if self.wants_news(event) && !topics.contains(&news) {
                topics.push(news);
            }
        }
        topics.truncate(MAX_CONDITION_TOPICS);
        topics
            .iter()
            .map(|t| format!("'{t}' in topics"))
            .collect::<Vec<_>>()
            .join(" || ")
    }

    pub fn targets_for(&self, event: &Event) -> Vec<Target> {
        match self.mode {
            TargetMode::Topics => self.topics_for(event).into_iter().map(Target::Topic).collect(),
            TargetMode::Condition => vec![Target::Condition(self.condition_for(event))],
        }
    }
}
