//! The capability interface every store backend implements. Exactly the
//! six operations the planner and driver need; everything dialect-specific
//! stays behind it.

use crate::error::{ReconError, ReconResult};
use crate::query::Query;
use crate::row::{Row, Value};
use async_trait::async_trait;

#[async_trait]
pub trait StoreAdapter: Send + Sync {
    async fn connect(&self) -> ReconResult<()>;

    async fn fetch(&self, query: &Query, op_name: &str) -> ReconResult<Vec<Row>>;

    /// Defaults to the first row from [`fetch`](Self::fetch); fails if the
    /// query returned nothing, since callers use this for aggregate probes
    /// that should always return exactly one row.
    async fn fetch_one(&self, query: &Query, op_name: &str) -> ReconResult<Row> {
        let mut rows = self.fetch(query, op_name).await?;
        if rows.is_empty() {
            return Err(ReconError::Adapter(format!("{op_name}: query returned no rows")));
        }
        Ok(rows.swap_remove(0))
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> ReconResult<()>;

    async fn upsert(&self, table_fqn: &str, row: &Row) -> ReconResult<()>;

    async fn close(&self) -> ReconResult<()>;
}
