//! Hierarchical, partition-aware block-hash reconciliation engine.
//!
//! Builds a tree of data "blocks" over an ordering key, compares block
//! hashes computed by the source and sink stores, and adaptively subdivides
//! blocks that are too large or that disagree until every leaf is either
//! small enough to ship or confirmed identical. The engine never fetches
//! rows itself — every comparison is a single aggregate query pushed into
//! the store through the [`adapter::StoreAdapter`] trait.

pub mod adapter;
pub mod align;
pub mod block;
pub mod config;
pub mod driver;
pub mod error;
pub mod intervals;
pub mod merge;
pub mod partition;
pub mod planner;
pub mod query;
pub mod range;
pub mod row;

pub use adapter::StoreAdapter;
pub use block::{Block, PartitionValue, Status};
pub use config::{
    AdapterConfig, BoundValue, FilterConfig, JoinConfig, MetaColumns, ReconciliationConfig, Role,
};
pub use error::{ReconError, ReconResult};
pub use query::{
    BlockHashMeta, BlockNameMeta, Field, FieldKind, Filter, FilterOp, FilterValue, HashStrategy,
    Join, JoinType, OrderBy, PartitionColumnType, Query, RowHashMeta, SortDirection, Table,
};
pub use row::{Row, Value};

/// Cancellation token threaded down from the driver; adapters and the
/// recursive driver check it between fetches. Re-exported so downstream
/// crates don't need a direct `tokio-util` dependency.
pub use tokio_util::sync::CancellationToken;
