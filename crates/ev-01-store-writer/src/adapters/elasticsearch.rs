//! Elasticsearch over its HTTP API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use shared_types::ProcessedEvent;
use std::time::Duration;
use tracing::debug;

use crate::domain::{BulkItemResult, ClusterStatus, StoreError};
use crate::ports::BulkStore;

/// Connection settings.
#[derive(Debug, Clone)]
pub struct ElasticsearchConfig {
    /// Base URL, e.g. `http://localhost:9200`.
    pub url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// `BulkStore` backed by an Elasticsearch cluster.
#[derive(Clone)]
pub struct ElasticsearchStore {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
    items: Vec<Value>,
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Deserialize)]
struct SearchHits {
    hits: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    #[serde(rename = "_source")]
    source: ProcessedEvent,
}

#[derive(Deserialize)]
struct HealthResponse {
    status: ClusterStatus,
}

impl ElasticsearchStore {
    pub fn new(config: ElasticsearchConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| StoreError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        request.send().await.map_err(transport_error)
    }

    /// Send and require a 2xx answer.
    async fn send_ok(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = self.send(request).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(status_error(status, body))
    }
}

fn transport_error(e: reqwest::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::Timeout
    } else {
        StoreError::Connection(e.to_string())
    }
}

fn status_error(status: StatusCode, body: String) -> StoreError {
    if status.is_server_error() {
        StoreError::Server {
            status: status.as_u16(),
            body,
        }
    } else if body.contains("resource_already_exists_exception") {
        StoreError::AlreadyExists(body)
    } else {
        StoreError::Rejected {
            status: status.as_u16(),
            body,
        }
    }
}

async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, StoreError> {
    response
        .json::<T>()
        .await
        .map_err(|e| StoreError::Decode(e.to_string()))
}

/// NDJSON body: one `index` action line plus the document per event.
fn bulk_body(index: &str, documents: &[ProcessedEvent]) -> Result<String, StoreError> {
    let mut body = String::new();
    for doc in documents {
        let action = json!({ "index": { "_index": index, "_id": doc.event_id } });
        body.push_str(&action.to_string());
        body.push('\n');
        let source =
            serde_json::to_string(doc).map_err(|e| StoreError::Decode(e.to_string()))?;
        body.push_str(&source);
        body.push('\n');
    }
    Ok(body)
}

/// Map per-item bulk results back onto the submitted documents.
fn bulk_items(
    response: BulkResponse,
    documents: &[ProcessedEvent],
) -> Result<Vec<BulkItemResult>, StoreError> {
    if response.items.len() != documents.len() {
        return Err(StoreError::Decode(format!(
            "bulk response has {} items for {} documents",
            response.items.len(),
            documents.len()
        )));
    }

    Ok(response
        .items
        .iter()
        .zip(documents)
        .map(|(item, doc)| {
            let Some(result) = item.get("index") else {
                return BulkItemResult::failed(doc.event_id.clone(), "missing index result");
            };
            match result.get("error") {
                Some(error) => {
                    let reason = match (error.get("type"), error.get("reason")) {
                        (Some(Value::String(kind)), Some(Value::String(reason))) => {
                            format!("{}: {}", kind, reason)
                        }
                        _ => error.to_string(),
                    };
                    BulkItemResult::failed(doc.event_id.clone(), reason)
                }
                None => BulkItemResult::ok(doc.event_id.clone()),
            }
        })
        .collect())
}

#[async_trait]
impl BulkStore for ElasticsearchStore {
    async fn index_exists(&self, index: &str) -> Result<bool, StoreError> {
        let response = self.send(self.client.head(self.url(index))).await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(status_error(status, String::new())),
        }
    }

    async fn put_lifecycle_policy(&self, name: &str, policy: &Value) -> Result<(), StoreError> {
        let url = self.url(&format!("_ilm/policy/{}", name));
        self.send_ok(self.client.put(url).json(&json!({ "policy": policy })))
            .await?;
        debug!(policy = name, "Lifecycle policy installed");
        Ok(())
    }

    async fn create_index(&self, index: &str, definition: &Value) -> Result<(), StoreError> {
        self.send_ok(self.client.put(self.url(index)).json(definition))
            .await?;
        Ok(())
    }

    async fn bulk_index(
        &self,
        index: &str,
        documents: &[ProcessedEvent],
    ) -> Result<Vec<BulkItemResult>, StoreError> {
        let body = bulk_body(index, documents)?;
        let request = self
            .client
            .post(self.url("_bulk?refresh=false"))
            .header("Content-Type", "application/x-ndjson")
            .body(body);

        let response: BulkResponse = decode(self.send_ok(request).await?).await?;
        if response.errors {
            debug!(index, "Bulk response reports item errors");
        }
        bulk_items(response, documents)
    }

    async fn count(&self, index: &str) -> Result<u64, StoreError> {
        let url = self.url(&format!("{}/_count", index));
        let response: CountResponse = decode(self.send_ok(self.client.get(url)).await?).await?;
        Ok(response.count)
    }

    async fn search(&self, index: &str, body: &Value) -> Result<Vec<ProcessedEvent>, StoreError> {
        let url = self.url(&format!("{}/_search", index));
        let response: SearchResponse =
            decode(self.send_ok(self.client.post(url).json(body)).await?).await?;
        Ok(response.hits.hits.into_iter().map(|hit| hit.source).collect())
    }

    async fn cluster_health(&self) -> Result<ClusterStatus, StoreError> {
        let response: HealthResponse =
            decode(self.send_ok(self.client.get(self.url("_cluster/health"))).await?).await?;
        Ok(response.status)
    }
}
