//! Reading the indexed document count back from the store.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store answered HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

pub struct CountClient {
    client: Client,
    base_url: String,
}

impl CountClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, VerifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(2))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Document count of `index`.
    pub async fn count(&self, index: &str) -> Result<u64, VerifyError> {
        let response = self
            .client
            .get(format!("{}/{}/_count", self.base_url, index))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VerifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<CountResponse>().await?.count)
    }
}
