//! Environment configuration (`.env` is loaded by the binary before this runs).

use match_feed::discovery::parse_static_ids;
use match_feed::TrackedMatch;
use push_dispatcher::{ServiceAccount, TargetMode, Targeting, TokenSource};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, warn};
use transition_detector::{EventKind, DEFAULT_LEAD_MINUTES};

#[derive(Debug, Clone)]
pub struct Config {
    pub poll_interval:     Duration,
    pub feed_template:     String,
    pub feed_list_url:     Option<String>,
    pub match_ids:         Vec<TrackedMatch>,
    pub scope_default:     String,
    pub targeting:         Targeting,
    pub lead_minutes:      i64,
    pub send_test_on_boot: bool,
    pub redis_url:         Option<String>,
    pub fcm_project_id:    Option<String>,
    pub fcm_client_email:  Option<String>,
    pub fcm_private_key:   Option<String>,
    /// Fixed bearer token; overrides the service account when set
    pub fcm_access_token:  Option<String>,
    pub log_dir:           PathBuf,
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn csv(v: Option<String>) -> Vec<String> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn event_kinds(names: Vec<String>) -> Vec<EventKind> {
    names
        .iter()
        .filter_map(|name| match name.parse::<EventKind>() {
            Ok(kind) => Some(kind),
            Err(e) => {
                warn!("NEWS_EVENTS: {}", e);
                None
            }
        })
        .collect()
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; invalid numbers fall back to defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let poll_ms = get("POLL_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(15_000);

        let lead_minutes = get("PRE_PUSH_MIN")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_LEAD_MINUTES);

        let mode = match non_empty(get("TARGET_MODE")) {
            Some(raw) => raw.parse::<TargetMode>().unwrap_or_else(|e| {
                warn!("{}, using topics", e);
                TargetMode::Topics
            }),
            None => TargetMode::Topics,
        };

        let news_events = match non_empty(get("NEWS_EVENTS")) {
            Some(raw) => event_kinds(csv(Some(raw))),
            None => vec![EventKind::Goal, EventKind::End],
        };

        let targeting = Targeting {
            mode,
            topic_prefix:  get("TOPIC_PREFIX").unwrap_or_else(|| "match_".to_string()),
            team_prefix:   get("TEAM_PREFIX").unwrap_or_else(|| "team_".to_string()),
            legacy_topic:  non_empty(get("LEGACY_TOPIC")),
            news_topic:    non_empty(get("NEWS_TOPIC")),
            news_events,
            news_team_ids: csv(get("NEWS_TEAM_IDS")),
        };

        Self {
            poll_interval:     Duration::from_millis(poll_ms),
            feed_template:     get("FEED_TMPL").unwrap_or_default(),
            feed_list_url:     non_empty(get("FEED_LIST_URL")),
            match_ids:         parse_static_ids(&get("MATCH_IDS").unwrap_or_default()),
            scope_default:     non_empty(get("SCOPE_DEFAULT")).unwrap_or_else(|| "guatemala".to_string()),
            targeting,
            lead_minutes,
            send_test_on_boot: get("SEND_TEST_ON_BOOT").as_deref() == Some("1"),
            redis_url:         non_empty(get("REDIS_URL")),
            fcm_project_id:    non_empty(get("FCM_PROJECT_ID")),
            fcm_client_email:  non_empty(get("FCM_CLIENT_EMAIL")),
            fcm_private_key:   non_empty(get("FCM_PRIVATE_KEY")),
            fcm_access_token:  non_empty(get("FCM_ACCESS_TOKEN")),
            log_dir:           non_empty(get("WATCHER_LOG_DIR")).unwrap_or_else(|| "logs".to_string()).into(),
        }
    }
}

impl Config {
    /// FCM project + token source, or `None` when pushes can only be dry-run.
    pub fn fcm_credentials(&self) -> Option<(String, TokenSource)> {
        let project = self.fcm_project_id.clone()?;
        if let Some(token) = &self.fcm_access_token {
            return Some((project, TokenSource::Static(token.clone())));
        }
        let email = self.fcm_client_email.as_ref()?;
        let key = self.fcm_private_key.as_ref()?;
        match ServiceAccount::new(email, key) {
            Ok(account) => Some((project, TokenSource::ServiceAccount(account))),
            Err(e) => {
                error!("FCM service account unusable: {:#}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let c = config(&[]);
        assert_eq!(c.poll_interval, Duration::from_millis(15_000));
        assert_eq!(c.lead_minutes, 30);
        assert_eq!(c.scope_default, "guatemala");
        assert_eq!(c.targeting.topic_prefix, "match_");
        assert_eq!(c.targeting.mode, TargetMode::Topics);
        assert_eq!(c.targeting.news_events, vec![EventKind::Goal, EventKind::End]);
        assert!(c.match_ids.is_empty());
        assert!(c.redis_url.is_none());
        assert!(!c.send_test_on_boot);
        assert_eq!(c.log_dir, PathBuf::from("logs"));
    }

    #[test]
    fn parses_everything() {
        let c = config(&[
            ("POLL_MS", "5000"),
            ("PRE_PUSH_MIN", "1"),
            ("MATCH_IDS", "4410, 4411"),
            ("FEED_TMPL", "https://feed/{id}.json"),
            ("TARGET_MODE", "condition"),
            ("NEWS_TOPIC", "news"),
            ("NEWS_EVENTS", "goal, HT, bogus"),
            ("NEWS_TEAM_IDS", "17,23"),
            ("LEGACY_TOPIC", "all"),
            ("SEND_TEST_ON_BOOT", "1"),
            ("REDIS_URL", "redis://localhost:6379"),
        ]);
        assert_eq!(c.poll_interval, Duration::from_secs(5));
        assert_eq!(c.lead_minutes, 1);
        assert_eq!(c.match_ids.len(), 2);
        assert_eq!(c.targeting.mode, TargetMode::Condition);
        assert_eq!(c.targeting.news_events, vec![EventKind::Goal, EventKind::Halftime]);
        assert_eq!(c.targeting.news_team_ids, vec!["17", "23"]);
        assert_eq!(c.targeting.legacy_topic.as_deref(), Some("all"));
        assert!(c.send_test_on_boot);
        assert_eq!(c.redis_url.as_deref(), Some("redis://localhost:6379"));
    }

    #[test]
    fn fcm_credentials_need_project_and_auth() {
        assert!(config(&[]).fcm_credentials().is_none());
        assert!(config(&[("FCM_PROJECT_ID", "p")]).fcm_credentials().is_none());
        assert!(config(&[("FCM_ACCESS_TOKEN", "t")]).fcm_credentials().is_none());
        assert!(config(&[
            ("FCM_PROJECT_ID", "p"),
            ("FCM_CLIENT_EMAIL", "watcher@p.iam.gserviceaccount.com"),
            ("FCM_PRIVATE_KEY", "garbage"),
        ])
        .fcm_credentials()
        .is_none());
    }

    #[test]
    fn static_token_overrides_service_account() {
        let c = config(&[
            ("FCM_PROJECT_ID", "p"),
            ("FCM_CLIENT_EMAIL", "watcher@p.iam.gserviceaccount.com"),
            ("FCM_PRIVATE_KEY", "garbage"),
            ("FCM_ACCESS_TOKEN", "ya29.fixed"),
        ]);
        let (project, tokens) = c.fcm_credentials().unwrap();
        assert_eq!(project, "p");
        assert!(matches!(tokens, TokenSource::Static(t) if t == "ya29.fixed"));
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let c = config(&[("POLL_MS", "fast"), ("PRE_PUSH_MIN", "-5"), ("TARGET_MODE", "mesh")]);
        assert_eq!(c.poll_interval, Duration::from_millis(15_000));
        assert_eq!(c.lead_minutes, 30);
        assert_eq!(c.targeting.mode, TargetMode::Topics);
    }
}
