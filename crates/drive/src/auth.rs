//! App-only OAuth2 access tokens (client credentials grant).

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;
use vox_protocol::drive::TokenResponse;

use crate::error::StoreError;

const DEFAULT_LOGIN_URL: &str = "https://login.microsoftonline.com";
const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Azure AD application credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_secret: String,
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        !self.tenant_id.is_empty() && !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Fetches and caches access tokens for the Graph API.
pub struct TokenProvider {
    http: reqwest::Client,
    credentials: Credentials,
    login_url: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(http: reqwest::Client, credentials: Credentials) -> Self {
        Self {
            http,
            credentials,
            login_url: DEFAULT_LOGIN_URL.to_string(),
            cached: Mutex::new(None),
        }
    }

    /// Sets a custom login URL (for testing).
    #[cfg(test)]
    pub(crate) fn with_login_url(mut self, url: String) -> Self {
        self.login_url = url;
        self
    }

    /// Returns a valid access token, fetching a new one when needed.
    pub async fn token(&self) -> Result<String, StoreError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.fetch().await?;
        let lifetime = Duration::from_secs(fresh.expires_in).saturating_sub(REFRESH_MARGIN);
        debug!(expires_in = fresh.expires_in, "access token acquired");
        let value = fresh.access_token;
        *cached = Some(CachedToken {
            value: value.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(value)
    }

    async fn fetch(&self) -> Result<TokenResponse, StoreError> {
        if !self.credentials.is_complete() {
            return Err(StoreError::Auth("missing tenant, client id or secret".into()));
        }

        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_url, self.credentials.tenant_id
        );
        let form = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("scope", GRAPH_SCOPE),
            ("grant_type", "client_credentials"),
        ];
        let resp = self.http.post(&url).form(&form).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        if !status.is_success() {
            let detail = serde_json::from_slice::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error_description").and_then(|d| d.as_str()).map(String::from))
                .unwrap_or_else(|| String::from_utf8_lossy(&body).into_owned());
            return Err(StoreError::Auth(format!("{}: {detail}", status.as_u16())));
        }

        Ok(serde_json::from_slice(&body)?)
    }
}
