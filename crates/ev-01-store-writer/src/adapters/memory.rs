use async_trait::async_trait;
use chrono::DateTime;
use parking_lot::Mutex;
use serde_json::Value;
use shared_types::{ProcessedEvent, UserId};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::domain::{BulkItemResult, ClusterStatus, StoreError};
use crate::ports::BulkStore;

/// Store requests, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    IndexExists,
    PutPolicy,
    CreateIndex,
    Bulk,
    Count,
    Search,
    Health,
}

#[derive(Default)]
struct MemoryState {
    indices: HashMap<String, HashMap<String, ProcessedEvent>>,
    policies: HashMap<String, Value>,
    scripted: HashMap<StoreOp, VecDeque<StoreError>>,
    persistent: HashMap<StoreOp, StoreError>,
    refused: HashMap<String, String>,
    calls: HashMap<StoreOp, usize>,
    health: Option<ClusterStatus>,
}

impl MemoryState {
    fn enter(&mut self, op: StoreOp) -> Result<(), StoreError> {
        *self.calls.entry(op).or_insert(0) += 1;
        if let Some(err) = self.scripted.get_mut(&op).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        match self.persistent.get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Per-document mapping checks the strict schema would apply.
    fn verdict(&self, doc: &ProcessedEvent) -> Option<String> {
        if let Some(reason) = self.refused.get(&doc.event_id) {
            return Some(reason.clone());
        }
        if let UserId::Text(_) = doc.user_id {
            return Some(
                "mapper_parsing_exception: failed to parse field [userId] of type [long]"
                    .to_string(),
            );
        }
        None
    }
}

/// In-memory search store.
///
/// Cloning yields another handle on the same data, so tests can keep one
/// handle while the writer owns another. Documents whose `userId` is not an
/// integer are refused, as the `long` mapping with coercion disabled would.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `op` request with `err`. Queues up.
    pub fn fail_next(&self, op: StoreOp, err: StoreError) {
        self.state
            .lock()
            .scripted
            .entry(op)
            .or_default()
            .push_back(err);
    }

    /// Fail every `op` request with `err` until [`InMemoryStore::heal`].
    pub fn fail_always(&self, op: StoreOp, err: StoreError) {
        self.state.lock().persistent.insert(op, err);
    }

    pub fn heal(&self, op: StoreOp) {
        let mut state = self.state.lock();
        state.persistent.remove(&op);
        state.scripted.remove(&op);
    }

    /// Refuse the document with this id in every bulk request.
    pub fn refuse_event(&self, event_id: &str, reason: &str) {
        self.state
            .lock()
            .refused
            .insert(event_id.to_string(), reason.to_string());
    }

    pub fn set_health(&self, status: ClusterStatus) {
        self.state.lock().health = Some(status);
    }

    /// Requests of kind `op` received so far, failed ones included.
    pub fn calls(&self, op: StoreOp) -> usize {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn has_index(&self, index: &str) -> bool {
        self.state.lock().indices.contains_key(index)
    }

    pub fn has_policy(&self, name: &str) -> bool {
        self.state.lock().policies.contains_key(name)
    }

    pub fn document(&self, index: &str, event_id: &str) -> Option<ProcessedEvent> {
        self.state
            .lock()
            .indices
            .get(index)
            .and_then(|docs| docs.get(event_id))
            .cloned()
    }

    pub fn document_total(&self, index: &str) -> usize {
        self.state.lock().indices.get(index).map_or(0, HashMap::len)
    }
}

fn matches_query(query: &Value, doc: &ProcessedEvent) -> bool {
    let Some(term) = query.get("term").and_then(Value::as_object) else {
        // match_all and anything unsupported
        return true;
    };
    let Ok(doc) = serde_json::to_value(doc) else {
        return false;
    };
    term.iter().all(|(field, expected)| {
        let expected = expected.get("value").unwrap_or(expected);
        doc.get(field) == Some(expected)
    })
}

fn sort_key(doc: &ProcessedEvent) -> i64 {
    DateTime::parse_from_rfc3339(&doc.timestamp)
        .map(|t| t.timestamp_millis())
        .unwrap_or(i64::MIN)
}

#[async_trait]
impl BulkStore for InMemoryStore {
    async fn index_exists(&self, index: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        state.enter(StoreOp::IndexExists)?;
        Ok(state.indices.contains_key(index))
    }

    async fn put_lifecycle_policy(&self, name: &str, policy: &Value) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.enter(StoreOp::PutPolicy)?;
        state.policies.insert(name.to_string(), policy.clone());
        Ok(())
    }

    async fn create_index(&self, index: &str, _definition: &Value) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.enter(StoreOp::CreateIndex)?;
        if state.indices.contains_key(index) {
            return Err(StoreError::AlreadyExists(index.to_string()));
        }
        state.indices.insert(index.to_string(), HashMap::new());
        Ok(())
    }

    async fn bulk_index(
        &self,
        index: &str,
        documents: &[ProcessedEvent],
    ) -> Result<Vec<BulkItemResult>, StoreError> {
        let mut state = self.state.lock();
        state.enter(StoreOp::Bulk)?;

        let verdicts: Vec<Option<String>> = documents.iter().map(|d| state.verdict(d)).collect();
        let docs = state.indices.entry(index.to_string()).or_default();

        Ok(documents
            .iter()
            .zip(verdicts)
            .map(|(doc, verdict)| match verdict {
                Some(reason) => BulkItemResult::failed(doc.event_id.clone(), reason),
                None => {
                    docs.insert(doc.event_id.clone(), doc.clone());
                    BulkItemResult::ok(doc.event_id.clone())
                }
            })
            .collect())
    }

    async fn count(&self, index: &str) -> Result<u64, StoreError> {
        let mut state = self.state.lock();
        state.enter(StoreOp::Count)?;
        Ok(state.indices.get(index).map_or(0, |docs| docs.len() as u64))
    }

    async fn search(&self, index: &str, body: &Value) -> Result<Vec<ProcessedEvent>, StoreError> {
        let mut state = self.state.lock();
        state.enter(StoreOp::Search)?;

        let size = body
            .get("size")
            .and_then(Value::as_u64)
            .map_or(10, |s| s as usize);
        let query = body.get("query").cloned().unwrap_or(Value::Null);

        let mut hits: Vec<ProcessedEvent> = state
            .indices
            .get(index)
            .map(|docs| {
                docs.values()
                    .filter(|doc| matches_query(&query, doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        hits.sort_by_key(|doc| std::cmp::Reverse(sort_key(doc)));
        hits.truncate(size);
        Ok(hits)
    }

    async fn cluster_health(&self) -> Result<ClusterStatus, StoreError> {
        let mut state = self.state.lock();
        state.enter(StoreOp::Health)?;
        Ok(state.health.unwrap_or(ClusterStatus::Green))
    }
}
