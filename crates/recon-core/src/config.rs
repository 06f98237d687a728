//! Configuration DTOs consumed by the planner and driver.
//!
//! These are plain data; parsing them from a file (with `${ENV_VAR}`
//! credential substitution) lives in the CLI crate, following the
//! `WorkerConfig::from_env` convention of keeping config structs themselves
//! free of I/O.

use crate::block::PartitionValue;
use crate::error::{ReconError, ReconResult};
use crate::query::{FilterOp, FilterValue, HashStrategy, JoinType, PartitionColumnType};
use chrono::{Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Source,
    Sink,
    SourceState,
    SinkState,
}

#[derive(Debug, Clone)]
pub struct JoinConfig {
    pub table: String,
    pub alias: Option<String>,
    pub on: String,
    pub join_type: JoinType,
}

#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub column: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

/// The columns a role's table uses for ordering, hashing, and
/// partitioning. Distinct from `AdapterConfig.fields`, which lists the
/// columns folded into a row/block hash.
#[derive(Debug, Clone)]
pub struct MetaColumns {
    pub partition_column: String,
    pub hash_column: Option<String>,
    pub order_column: Option<String>,
    pub unique_key: Vec<String>,
}

/// Table/join/filter shape plus meta-columns for one role (source, sink,
/// sourcestate, or sinkstate) against one store.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub table: String,
    pub schema: Option<String>,
    pub alias: Option<String>,
    pub joins: Vec<JoinConfig>,
    pub filters: Vec<FilterConfig>,
    /// Columns folded into the row/block hash when no `hash_column` is
    /// available on the meta-columns for this role.
    pub fields: Vec<String>,
    pub batch_size: u64,
    pub meta: MetaColumns,
}

/// Start/end bound that may need to be resolved at run time rather than
/// parsed once from a literal, e.g. "the last 30 days" for a nightly job.
/// Replaces the original implementation's `eval()`-based dynamic field
/// parsing with an explicit, closed set of variants.
#[derive(Debug, Clone)]
pub enum BoundValue {
    Literal(PartitionValue),
    Now,
    NowMinus(Duration),
}

impl BoundValue {
    pub fn resolve(&self) -> PartitionValue {
        match self {
            BoundValue::Literal(v) => *v,
            BoundValue::Now => PartitionValue::DateTime(Utc::now()),
            BoundValue::NowMinus(d) => PartitionValue::DateTime(Utc::now() - *d),
        }
    }
}

/// Parameters for one reconciliation pass: hashing strategy, partition
/// column type, the interval ladder inputs, optional pinned bounds, and
/// per-role meta-column overrides used when planning block-hash queries
/// against the state adapters.
#[derive(Debug, Clone)]
pub struct ReconciliationConfig {
    pub strategy: HashStrategy,
    pub partition_column_type: PartitionColumnType,
    pub initial_partition_interval: i64,
    pub max_block_size: u64,
    pub interval_reduction_factor: i64,
    pub start: Option<BoundValue>,
    pub end: Option<BoundValue>,
    pub source_state_meta: MetaColumns,
    pub sink_state_meta: MetaColumns,
}

impl ReconciliationConfig {
    pub fn validate(&self) -> ReconResult<()> {
        if self.partition_column_type == PartitionColumnType::Str {
            return Err(ReconError::Config(
                "string/uuid partition columns are not yet supported".into(),
            ));
        }
        if self.interval_reduction_factor <= 1 {
            return Err(ReconError::Config("interval_reduction_factor must be > 1".into()));
        }
        if self.max_block_size == 0 {
            return Err(ReconError::Config("max_block_size must be > 0".into()));
        }
        if self.strategy == HashStrategy::HashMd5
            && (self.source_state_meta.order_column.is_none() || self.sink_state_meta.order_column.is_none())
        {
            return Err(ReconError::Config(
                "HASH_MD5 strategy requires an order_column on both state adapters".into(),
            ));
        }
        if let (Some(src_hash), Some(sink_hash)) =
            (&self.source_state_meta.hash_column, &self.sink_state_meta.hash_column)
        {
            if src_hash != sink_hash {
                return Err(ReconError::Config(
                    "source and sink hash_column must agree when both are configured".into(),
                ));
            }
        }
        Ok(())
    }
}
