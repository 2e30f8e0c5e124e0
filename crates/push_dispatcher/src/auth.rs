//! OAuth2 access tokens for FCM HTTP v1.
//!
//! A service account signs an RS256 JWT assertion and trades it at the token
//! endpoint for an access token that lives about an hour. The token is cached
//! and minted again once it gets within `REFRESH_MARGIN_SECS` of expiry.
//! A fixed `FCM_ACCESS_TOKEN` overrides all of this.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const FCM_SCOPE:         &str = "https://www.googleapis.com/auth/firebase.messaging";
const JWT_BEARER_GRANT:  &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS:     i64 = 300;

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss:   String,
    scope: String,
    aud:   String,
    iat:   i64,
    exp:   i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in:   i64,
}

struct CachedToken {
    value:      String,
    expires_at: DateTime<Utc>,
}

pub struct ServiceAccount {
    client_email: String,
    key:          EncodingKey,
    token_uri:    String,
    client:       reqwest::Client,
    cached:       Mutex<Option<CachedToken>>,
}

impl ServiceAccount {
    /// `private_key` is the PEM from the service-account JSON. Literal `\n`
    /// escapes, the way env vars usually carry it, are accepted.
    pub fn new(client_email: impl Into<String>, private_key: &str) -> Result<Self> {
        let pem = private_key.replace("\\n", "\n");
        let key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .context("FCM_PRIVATE_KEY is not an RSA PEM key")?;
        Ok(Self {
            client_email: client_email.into(),
            key,
            token_uri:    GOOGLE_TOKEN_URI.to_string(),
            client:       reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            cached:       Mutex::new(None),
        })
    }

    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let claims = AssertionClaims {
            iss:   self.client_email.clone(),
            scope: FCM_SCOPE.to_string(),
            aud:   self.token_uri.clone(),
            iat:   now.timestamp(),
            exp:   now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.key).context("signing JWT assertion")
    }

    /// Cached token, minted anew when missing or about to expire.
    pub async fn access_token(&self) -> Result<String> {
        let now = Utc::now();
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at - now > Duration::seconds(REFRESH_MARGIN_SECS) {
                return Ok(token.value.clone());
            }
            debug!(expires_at = %token.expires_at, "FCM access token due for refresh");
        }
        let fresh = self.mint(now).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    /// Forget the cached token, e.g. after FCM answered 401.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn mint(&self, now: DateTime<Utc>) -> Result<CachedToken> {
        let assertion = self.assertion(now)?;
        let resp = self
            .client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .context("token request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body: String = resp.text().await.unwrap_or_default().chars().take(300).collect();
            bail!("token endpoint answered {status}: {body}");
        }
        let token: TokenResponse = resp.json().await.context("malformed token response")?;
        info!(expires_in = token.expires_in, "FCM access token minted");
        Ok(CachedToken {
            value:      token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}

/// Where the bearer token for FCM comes from.
pub enum TokenSource {
    Static(String),
    ServiceAccount(ServiceAccount),
}

impl TokenSource {
    pub async fn bearer(&self) -> Result<String> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::ServiceAccount(account) => account.access_token().await,
        }
    }

    pub async fn invalidate(&self) {
        if let TokenSource::ServiceAccount(account) = self {
            account.invalidate().await;
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TokenSource::Static(_) => "static token",
            TokenSource::ServiceAccount(_) => "service account",
        }
    }
}
