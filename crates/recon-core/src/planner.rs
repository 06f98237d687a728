//! Builds the two queries the driver actually issues: the data-range probe
//! (`min`/`max` over the partition column) and the per-level block-hash
//! query (`COUNT`, block hash, block name, grouped by block name).

use crate::block::PartitionValue;
use crate::config::{AdapterConfig, MetaColumns, ReconciliationConfig};
use crate::error::{ReconError, ReconResult};
use crate::query::{
    BlockHashMeta, BlockNameMeta, Field, FieldKind, Filter, FilterOp, FilterValue, Join, JoinType, Query, Table,
};

fn table_from_config(cfg: &AdapterConfig) -> Table {
    Table { table: cfg.table.clone(), schema: cfg.schema.clone(), alias: cfg.alias.clone() }
}

fn joins_from_config(cfg: &AdapterConfig) -> Vec<Join> {
    cfg.joins
        .iter()
        .map(|j| Join { table: j.table.clone(), alias: j.alias.clone(), on: j.on.clone(), join_type: j.join_type })
        .collect()
}

fn filters_from_config(cfg: &AdapterConfig) -> Vec<Filter> {
    cfg.filters
        .iter()
        .map(|f| Filter { column: f.column.clone(), op: f.op, value: f.value.clone() })
        .collect()
}

fn partition_filter_value(value: PartitionValue) -> FilterValue {
    match value {
        PartitionValue::Int(v) => FilterValue::Int(v),
        PartitionValue::DateTime(dt) => FilterValue::DateTime(dt),
    }
}

/// `min(partition_column) AS start, max(partition_column) AS end`, scoped
/// by the adapter's own table/joins/filters.
pub fn plan_range_query(adapter_config: &AdapterConfig, meta: &MetaColumns) -> Query {
    let mut query = Query::new(table_from_config(adapter_config));
    query.select = vec![
        Field::aliased(format!("min({})", meta.partition_column), "start"),
        Field::aliased(format!("max({})", meta.partition_column), "end"),
    ];
    query.joins = joins_from_config(adapter_config);
    query.filters = filters_from_config(adapter_config);
    query
}

/// `COUNT(1) AS row_count`, the block hash, and the block name, grouped by
/// block name, scoped to `[start, end)` at the given recursion level.
pub fn plan_block_hash_query(
    start: PartitionValue,
    end: PartitionValue,
    level: usize,
    intervals: &[i64],
    adapter_config: &AdapterConfig,
    meta: &MetaColumns,
    recon: &ReconciliationConfig,
) -> ReconResult<Query> {
    if recon.partition_column_type == crate::query::PartitionColumnType::Str {
        return Err(ReconError::Config("string/uuid partition columns are not yet supported".into()));
    }
    if intervals.len() < level || level == 0 {
        return Err(ReconError::Config(format!(
            "no interval defined for level {level} (ladder has {} levels)",
            intervals.len()
        )));
    }

    let block_hash_meta = BlockHashMeta {
        strategy: recon.strategy,
        hash_column: meta.hash_column.clone(),
        order_column: meta.order_column.clone(),
        partition_column: meta.partition_column.clone(),
        partition_column_type: recon.partition_column_type,
        fields: adapter_config.fields.clone(),
    };
    let block_name_meta = BlockNameMeta {
        level,
        intervals: intervals.to_vec(),
        partition_column: meta.partition_column.clone(),
        partition_column_type: recon.partition_column_type,
    };

    let mut query = Query::new(table_from_config(adapter_config));
    query.select = vec![
        Field::aliased("COUNT(1)", "row_count"),
        Field {
            expr: meta.partition_column.clone(),
            alias: Some("blockhash".into()),
            kind: FieldKind::BlockHash(block_hash_meta),
        },
        Field {
            expr: meta.partition_column.clone(),
            alias: Some("blockname".into()),
            kind: FieldKind::BlockName(block_name_meta),
        },
    ];
    query.joins = joins_from_config(adapter_config);

    let mut filters = vec![
        Filter { column: meta.partition_column.clone(), op: FilterOp::Gte, value: partition_filter_value(start) },
        Filter { column: meta.partition_column.clone(), op: FilterOp::Lt, value: partition_filter_value(end) },
    ];
    filters.extend(filters_from_config(adapter_config));
    query.filters = filters;

    query.group_by = vec![Field::column("blockname")];
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetaColumns;
    use crate::query::{HashStrategy, PartitionColumnType};

    fn adapter_config() -> AdapterConfig {
        AdapterConfig {
            table: "orders".into(),
            schema: None,
            alias: None,
            joins: vec![],
            filters: vec![],
            fields: vec!["amount".into(), "status".into()],
            batch_size: 1000,
            meta: MetaColumns {
                partition_column: "id".into(),
                hash_column: None,
                order_column: None,
                unique_key: vec!["id".into()],
            },
        }
    }

    fn recon_config() -> ReconciliationConfig {
        ReconciliationConfig {
            strategy: HashStrategy::Md5Sum,
            partition_column_type: PartitionColumnType::Int,
            initial_partition_interval: 10_000,
            max_block_size: 100,
            interval_reduction_factor: 10,
            start: None,
            end: None,
            source_state_meta: adapter_config().meta,
            sink_state_meta: adapter_config().meta,
        }
    }

    #[test]
    fn block_hash_query_carries_partition_bounds() {
        let cfg = adapter_config();
        let recon = recon_config();
        let query = plan_block_hash_query(
            PartitionValue::Int(0),
            PartitionValue::Int(1000),
            1,
            &[10_000, 1_000, 100],
            &cfg,
            &cfg.meta,
            &recon,
        )
        .unwrap();
        assert_eq!(query.filters.len(), 2);
        assert_eq!(query.group_by.len(), 1);
        assert_eq!(query.select.len(), 3);
    }

    #[test]
    fn rejects_level_beyond_ladder() {
        let cfg = adapter_config();
        let recon = recon_config();
        let err = plan_block_hash_query(
            PartitionValue::Int(0),
            PartitionValue::Int(1000),
            5,
            &[10_000, 1_000, 100],
            &cfg,
            &cfg.meta,
            &recon,
        )
        .unwrap_err();
        assert!(matches!(err, ReconError::Config(_)));
    }
}
