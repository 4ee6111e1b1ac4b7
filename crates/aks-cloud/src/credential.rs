use crate::error::{AksError, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

/// Tokens are renewed once they are this close to expiry.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

/// A bearer token together with its expiry.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub secret: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Whether the token can still be used at `now` without refreshing.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) > now
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
}

/// OAuth2 client-credentials flow against Entra ID.
///
/// The token is requested lazily on first use, cached, and re-requested when
/// it gets close to expiry. Concurrent callers share one refresh.
pub struct ClientSecretCredential {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
    cache: Mutex<Option<AccessToken>>,
}

impl ClientSecretCredential {
    pub fn new(
        http: Client,
        authority_host: &str,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
        resource_manager: &str,
    ) -> Result<Self> {
        validate_tenant_id(tenant_id)?;
        if client_id.is_empty() {
            return Err(AksError::ConfigError("client id is empty".to_string()));
        }
        if client_secret.is_empty() {
            return Err(AksError::ConfigError("client secret is empty".to_string()));
        }

        Ok(Self {
            http,
            token_url: format!(
                "{}/{}/oauth2/v2.0/token",
                authority_host.trim_end_matches('/'),
                tenant_id
            ),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            scope: format!("{}/.default", resource_manager.trim_end_matches('/')),
            cache: Mutex::new(None),
        })
    }

    /// Return a valid bearer token, requesting a new one if needed.
    pub async fn token(&self) -> Result<String> {
        let mut cache = self.cache.lock().await;
        if let Some(token) = cache.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.secret.clone());
        }

        let token = self.request_token().await?;
        tracing::debug!(expires_at = %token.expires_at, "Acquired access token");
        let secret = token.secret.clone();
        *cache = Some(token);
        Ok(secret)
    }

    async fn request_token(&self) -> Result<AccessToken> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let reason = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => format!("{}: {}", err.error, err.error_description),
                Err(_) => body,
            };
            return Err(AksError::AuthError(format!(
                "status={}, {}",
                status.as_u16(),
                reason
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)?;
        Ok(AccessToken {
            secret: parsed.access_token,
            expires_at: Utc::now() + Duration::seconds(parsed.expires_in),
        })
    }
}

fn validate_tenant_id(tenant_id: &str) -> Result<()> {
    if tenant_id.is_empty() {
        return Err(AksError::ConfigError("tenant id is empty".to_string()));
    }
    if !tenant_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return Err(AksError::ConfigError(format!(
            "invalid tenant id {tenant_id:?}: only alphanumeric characters, '-' and '.' are allowed"
        )));
    }
    Ok(())
}
