//! Remote list/count/mutation gateway
//!
//! The [`Gateway`] trait is everything the table core needs from a data
//! source. Two implementations ship with the crate:
//!
//! - [`InMemoryGateway`] - rows in a `DashMap`, filtered and sorted in process
//! - [`SqliteStore`] - SQLite tables for organizations, members and blogs,
//!   exposed through [`BlogGateway`] and [`OrganizationGateway`]

mod memory;
mod sqlite;

pub use memory::*;
pub use sqlite::*;

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::model::Row;
use crate::query::Filter;
use crate::query::ListRequest;
use crate::query::ListResult;

/// Data source of one table.
///
/// `list` must apply the filter as AND-combined column predicates, the order
/// as a priority comparator and the pagination as offset/limit. `count`
/// ignores pagination. `delete` is a single batch: it either removes every
/// id or reports an error; implementations that cannot guarantee that
/// return [`GatewayError::Partial`].
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Row type produced by `list`, `create` and `update`.
    type Row: Row;
    /// Payload for `create`.
    type Fields: Send + 'static;
    /// Payload for `update`.
    type Patch: Send + 'static;

    /// Returns one page of matching rows.
    async fn list(&self, request: &ListRequest) -> Result<Vec<Self::Row>, GatewayError>;

    /// Returns the number of rows matching `filter`.
    async fn count(&self, filter: &Filter) -> Result<u64, GatewayError>;

    /// Creates a row.
    async fn create(&self, fields: Self::Fields) -> Result<Self::Row, GatewayError>;

    /// Updates the row with the given id.
    async fn update(&self, id: &str, patch: Self::Patch) -> Result<Self::Row, GatewayError>;

    /// Deletes every row in `ids`. The set must not be empty.
    async fn delete(&self, ids: &BTreeSet<String>) -> Result<(), GatewayError>;
}

/// Rejects an empty delete batch.
pub fn ensure_non_empty(ids: &BTreeSet<String>) -> Result<(), GatewayError> {
    if ids.is_empty() {
        return Err(GatewayError::rejected("delete requires at least one id"));
    }
    Ok(())
}

/// Runs `list` and `count` for a request concurrently.
pub async fn fetch_page<G: Gateway + ?Sized>(
    gateway: &G,
    request: &ListRequest,
) -> Result<ListResult<G::Row>, GatewayError> {
    let (rows, total) = futures::future::try_join(gateway.list(request), gateway.count(&request.filter)).await?;
    Ok(ListResult::new(rows, total))
}
