//! FCM HTTP v1 transport.
//!
//! Needs a project id and a `TokenSource`: service-account credentials
//! (tokens minted and refreshed in-process) or a fixed access token. Every
//! message is sent with high Android priority and APNs priority 10.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::auth::TokenSource;
use crate::compose::ComposedPush;
use crate::targeting::Target;
use crate::transport::{DispatchError, PushTransport};

const FCM_BASE: &str = "https://fcm.googleapis.com/v1/projects";

pub struct FcmTransport {
    client:     reqwest::Client,
    project_id: String,
    tokens:     TokenSource,
}

impl FcmTransport {
    pub fn new(project_id: impl Into<String>, tokens: TokenSource) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            project_id: project_id.into(),
            tokens,
        }
    }

    pub fn auth_kind(&self) -> &'static str {
        self.tokens.kind()
    }

    fn endpoint(&self) -> String {
        format!("{}/{}/messages:send", FCM_BASE, self.project_id)
    }
}

/// Request body for `messages:send`.
pub fn message_body(target: &Target, push: &ComposedPush) -> Value {
    let mut message = json!({
        "notification": {
            "title": push.notification.title,
            "body":  push.notification.body,
        },
        "data": push.data,
        "android": { "priority": "high" },
        "apns": { "headers": { "apns-priority": "10" } },
    });
    match target {
        Target::Topic(topic) => message["topic"] = json!(topic),
        Target::Condition(condition) => message["condition"] = json!(condition),
    }
    json!({ "message": message })
}

#[async_trait]
impl PushTransport for FcmTransport {
    fn name(&self) -> &'static str {
        "fcm"
    }

    async fn send(&self, target: &Target, push: &ComposedPush) -> Result<String, DispatchError> {
        let bearer = self
            .tokens
            .bearer()
            .await
            .map_err(|e| DispatchError::Transport(format!("auth: {e:#}")))?;

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(bearer)
            .json(&message_body(target, push))
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            warn!("FCM rejected the access token, minting a new one next send");
            self.tokens.invalidate().await;
        }
        if !status.is_success() {
            let body: String = body.chars().take(300).collect();
            return Err(DispatchError::Rejected { status: status.as_u16(), body });
        }

        let name = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["name"].as_str().map(str::to_string))
            .unwrap_or_default();
        debug!(%target, %name, "fcm accepted");
        Ok(name)
    }
}
