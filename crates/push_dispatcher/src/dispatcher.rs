use logger::{now_iso, EventLogger, PushResultEvent};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use transition_detector::Event;

use crate::compose::{compose, ComposedPush, Notification};
use crate::targeting::{Target, Targeting};
use crate::transport::PushTransport;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed:    usize,
}

impl DispatchReport {
    /// Nothing reached the provider.
    pub fn all_failed(&self) -> bool {
        self.delivered == 0 && self.failed > 0
    }
}

pub struct Dispatcher {
    transport:     Arc<dyn PushTransport>,
    targeting:     Targeting,
    default_scope: String,
    lead_minutes:  i64,
    audit:         Option<Arc<EventLogger>>,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn PushTransport>,
        targeting: Targeting,
        default_scope: impl Into<String>,
        lead_minutes: i64,
    ) -> Self {
        Self {
            transport,
            targeting,
            default_scope: default_scope.into(),
            lead_minutes,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: Arc<EventLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Compose and send one event to all of its targets. Failures are
    /// logged per target; the report says how many went through.
    pub async fn dispatch(&self, event: &Event) -> DispatchReport {
        let push = compose(event, &self.default_scope, self.lead_minutes);
        let targets = self.targeting.targets_for(event);
        self.send_all(&targets, &push, &event.match_id, event.kind.as_str()).await
    }

    /// "Watcher started" push to the legacy topic, if there is one.
    pub async fn send_boot_test(&self) -> DispatchReport {
        let Some(topic) = self.targeting.legacy_topic.clone().filter(|t| !t.is_empty()) else {
            warn!("SEND_TEST_ON_BOOT set but LEGACY_TOPIC is empty, skipping boot push");
            return DispatchReport::default();
        };
        let mut data = BTreeMap::new();
        data.insert("screen".to_string(), "Match".to_string());
        data.insert("tab".to_string(), "details".to_string());
        let push = ComposedPush {
            notification: Notification {
                title: "Watcher OK".to_string(),
                body:  "Started successfully.".to_string(),
            },
            data,
        };
        self.send_all(&[Target::Topic(topic)], &push, "", "BOOT_TEST").await
    }

    async fn send_all(
        &self,
        targets: &[Target],
        push: &ComposedPush,
        match_id: &str,
        kind: &str,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        for target in targets {
            let (message_id, err) = match self.transport.send(target, push).await {
                Ok(id) => {
                    info!("[push] ok {} {} {}", target, id, push.notification.title);
                    report.delivered += 1;
                    (Some(id), None)
                }
                Err(e) => {
                    error!(match_id, kind, "[push] error {}: {}", target, e);
                    report.failed += 1;
                    (None, Some(e.to_string()))
                }
            };
            if let Some(audit) = &self.audit {
                let _ = audit.log(&PushResultEvent {
                    ts: now_iso(),
                    event: if err.is_none() { "PUSH_SENT" } else { "PUSH_FAILED" },
                    match_id: match_id.to_string(),
                    kind: kind.to_string(),
                    target: target.to_string(),
                    message_id,
                    error: err,
                });
            }
        }
        report
    }
}
