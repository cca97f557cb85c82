//! API client for communicating with the advisor service

use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// Advisor API prefix
const API_PREFIX: [&str; 2] = ["api", "v1"];

/// Error body returned by the advisor
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// API client for the advisor service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Invalid API URL: {}", base_url);
        }

        Ok(Self { client, base_url })
    }

    /// Endpoint URL under `/api/v1`; each segment is percent-encoded
    pub fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Invalid API URL: {}", self.base_url))?
            .pop_if_empty()
            .extend(API_PREFIX)
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// GET an endpoint that must exist
    pub async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.endpoint(segments, query)?;
        self.get_optional_url(url.clone())
            .await?
            .with_context(|| format!("Not found: {}", url.path()))
    }

    /// GET an endpoint, mapping 404 to `None`
    pub async fn get_optional<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<Option<T>> {
        let url = self.endpoint(segments, &[])?;
        self.get_optional_url(url).await
    }

    async fn get_optional_url<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to reach the advisor")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map(Some)
            .context("Failed to parse response")
    }

    /// POST a JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T> {
        let url = self.endpoint(segments, &[])?;
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to reach the advisor")?;

        let response = check_status(response).await?;
        response.json().await.context("Failed to parse response")
    }
}

/// Turn a non-success status into an error carrying the advisor's message
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or(body);
    anyhow::bail!("Advisor returned {}: {}", status, message)
}
