//! In-memory gateway backed by DashMap

use std::collections::BTreeSet;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use super::Gateway;
use super::ensure_non_empty;
use crate::error::GatewayError;
use crate::model::Row;
use crate::query::Filter;
use crate::query::ListRequest;

/// A gateway holding rows in process memory.
///
/// Filters, ordering and pagination are evaluated with [`Filter::matches`]
/// and [`OrderBy::compare`](crate::query::OrderBy::compare); rows that compare
/// equal keep insertion order. `create` takes a complete row and `update`
/// replaces the stored row, so `Fields` and `Patch` are both `R`.
///
/// Failures can be injected for tests: [`set_unavailable`](Self::set_unavailable)
/// fails every call, [`set_partial_batches`](Self::set_partial_batches) makes
/// multi-row deletes remove only the first id and report
/// [`GatewayError::Partial`].
///
/// # Example
///
/// ```
/// use blogdesk_lib::gateway::InMemoryGateway;
/// use blogdesk_lib::model::Record;
///
/// let gateway = InMemoryGateway::with_rows([Record::new("a"), Record::new("b")]);
/// assert_eq!(gateway.len(), 2);
/// ```
#[derive(Debug)]
pub struct InMemoryGateway<R> {
    rows: DashMap<String, (u64, R)>,
    next_seq: AtomicU64,
    unavailable: AtomicBool,
    partial_batches: AtomicBool,
    latency: Option<Duration>,
}

impl<R: Row> Default for InMemoryGateway<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Row> InMemoryGateway<R> {
    /// Creates an empty gateway.
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            next_seq: AtomicU64::new(0),
            unavailable: AtomicBool::new(false),
            partial_batches: AtomicBool::new(false),
            latency: None,
        }
    }

    /// Creates a gateway holding `rows`, in that insertion order.
    pub fn with_rows(rows: impl IntoIterator<Item = R>) -> Self {
        let gateway = Self::new();
        for row in rows {
            gateway.insert(row);
        }
        gateway
    }

    /// Delays every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Inserts or replaces a row, keeping its original position on replace.
    pub fn insert(&self, row: R) {
        let id = row.id().to_string();
        if let Some(mut entry) = self.rows.get_mut(&id) {
            entry.1 = row;
            return;
        }
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.rows.insert(id, (seq, row));
    }

    pub fn get(&self, id: &str) -> Option<R> {
        self.rows.get(id).map(|entry| entry.1.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rows.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Makes every call fail with [`GatewayError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    /// Makes multi-row deletes apply partially.
    pub fn set_partial_batches(&self, partial: bool) {
        self.partial_batches.store(partial, Ordering::Relaxed);
    }

    async fn enter(&self) -> Result<(), GatewayError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(GatewayError::unavailable("in-memory gateway is offline"));
        }
        Ok(())
    }

    fn matching(&self, filter: &Filter) -> Vec<(u64, R)> {
        self.rows
            .iter()
            .filter(|entry| filter.matches(&entry.value().1))
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl<R: Row> Gateway for InMemoryGateway<R> {
    type Row = R;
    type Fields = R;
    type Patch = R;

    async fn list(&self, request: &ListRequest) -> Result<Vec<R>, GatewayError> {
        self.enter().await?;
        let mut rows = self.matching(&request.filter);
        rows.sort_by(|(a_seq, a), (b_seq, b)| request.order.compare(a, b).then(a_seq.cmp(b_seq)));
        Ok(rows
            .into_iter()
            .skip(request.pagination.offset())
            .take(request.pagination.limit())
            .map(|(_, row)| row)
            .collect())
    }

    async fn count(&self, filter: &Filter) -> Result<u64, GatewayError> {
        self.enter().await?;
        Ok(self.matching(filter).len() as u64)
    }

    async fn create(&self, row: R) -> Result<R, GatewayError> {
        self.enter().await?;
        if self.contains(row.id()) {
            return Err(GatewayError::rejected(format!("row '{}' already exists", row.id())));
        }
        self.insert(row.clone());
        Ok(row)
    }

    async fn update(&self, id: &str, row: R) -> Result<R, GatewayError> {
        self.enter().await?;
        if row.id() != id {
            return Err(GatewayError::rejected(format!(
                "cannot change row id '{}' to '{}'",
                id,
                row.id()
            )));
        }
        if !self.contains(id) {
            return Err(GatewayError::NotFound(id.to_string()));
        }
        self.insert(row.clone());
        Ok(row)
    }

    async fn delete(&self, ids: &BTreeSet<String>) -> Result<(), GatewayError> {
        ensure_non_empty(ids)?;
        self.enter().await?;
        if let Some(missing) = ids.iter().find(|id| !self.contains(id)) {
            return Err(GatewayError::NotFound(missing.clone()));
        }
        if ids.len() > 1 && self.partial_batches.load(Ordering::Relaxed) {
            if let Some(first) = ids.iter().next() {
                self.rows.remove(first);
            }
            return Err(GatewayError::Partial {
                removed: 1,
                failed: ids.len() - 1,
            });
        }
        for id in ids {
            self.rows.remove(id);
        }
        Ok(())
    }
}
