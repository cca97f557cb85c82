//! HTTP text-generation adapter
//!
//! Posts the rendered prompt together with the structured payload and
//! accepts either `{"text": "..."}` (or `completion`/`output`) or a raw
//! text body. The client is built per call so credentials never outlive
//! the request.

use advisor_lib::recommender::{PromptPayload, TextGenerator};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Longest error body echoed into logs
const MAX_ERROR_BODY: usize = 512;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    prompt: String,
    payload: &'a PromptPayload,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(alias = "completion", alias = "output")]
    text: String,
}

/// Text generator backed by an HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpTextGenerator {
    endpoint: Url,
    api_token: Option<String>,
    request_timeout: Duration,
}

impl HttpTextGenerator {
    pub fn new(endpoint: &str, api_token: Option<String>, request_timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint).context("Invalid model endpoint URL")?;
        Ok(Self {
            endpoint,
            api_token,
            request_timeout,
        })
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, payload: &PromptPayload) -> Result<String> {
        let client = Client::builder()
            .timeout(self.request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let mut request = client.post(self.endpoint.clone()).json(&GenerateRequest {
            prompt: payload.render(),
            payload,
        });
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("Failed to reach model endpoint")?;
        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read model response")?;

        if !status.is_success() {
            let excerpt: String = body.chars().take(MAX_ERROR_BODY).collect();
            anyhow::bail!("Model endpoint error ({}): {}", status, excerpt);
        }

        Ok(match serde_json::from_str::<GenerateResponse>(&body) {
            Ok(parsed) => parsed.text,
            Err(_) => body,
        })
    }

    fn name(&self) -> &str {
        self.endpoint.as_str()
    }
}
