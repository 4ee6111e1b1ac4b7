use crate::credential::ClientSecretCredential;
use crate::error::{AksError, Result};
use reqwest::Client;
use serde::Deserialize;

/// Authenticated read access to Azure Resource Manager.
#[async_trait::async_trait]
pub trait ArmTransport: Send + Sync {
    /// GET an absolute management URL and decode the JSON body.
    async fn get_json(&self, url: &str) -> Result<serde_json::Value>;
}

#[derive(Debug, Deserialize)]
struct ArmErrorResponse {
    error: ArmErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ArmErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Production transport: reqwest plus a bearer token from the credential.
pub struct HttpTransport {
    http: Client,
    credential: ClientSecretCredential,
}

impl HttpTransport {
    pub fn new(http: Client, credential: ClientSecretCredential) -> Self {
        Self { http, credential }
    }
}

#[async_trait::async_trait]
impl ArmTransport for HttpTransport {
    async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        let token = self.credential.token().await?;

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<ArmErrorResponse>(&body) {
                Ok(err) => AksError::ApiResponseError {
                    code: err.error.code,
                    message: err.error.message,
                },
                Err(_) => AksError::HttpError {
                    status: status.as_u16(),
                    url: url.to_string(),
                    body,
                },
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}
