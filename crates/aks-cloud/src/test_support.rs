use crate::error::{AksError, Result};
use crate::transport::ArmTransport;
use std::collections::HashMap;
use std::sync::Mutex;

/// Transport answering from a fixed URL -> response table and recording
/// every request in order.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: HashMap<String, std::result::Result<serde_json::Value, String>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: serde_json::Value) -> Self {
        self.responses.insert(url.to_string(), Ok(body));
        self
    }

    pub fn fail(mut self, url: &str, code: &str) -> Self {
        self.responses.insert(url.to_string(), Err(code.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ArmTransport for ScriptedTransport {
    async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.responses.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(code)) => Err(AksError::ApiResponseError {
                code: code.clone(),
                message: "scripted failure".to_string(),
            }),
            None => Err(AksError::HttpError {
                status: 404,
                url: url.to_string(),
                body: String::new(),
            }),
        }
    }
}
