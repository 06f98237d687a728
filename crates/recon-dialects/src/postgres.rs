//! Postgres expansion of the abstract field kinds. Mirrors
//! `original_source/adapters/postgres.py`'s `_build_group_name_expr` /
//! `_build_blockhash_expr`: block names are `FLOOR`/`MOD` segments joined
//! with `'-'`, block hashes are either a numeric `sum()` (`Md5Sum`) or an
//! ordered `string_agg` digest (`HashMd5`).

use crate::render::Dialect;
use recon_core::{
    BlockHashMeta, BlockNameMeta, Field, FieldKind, HashStrategy, PartitionColumnType, ReconError,
    ReconResult, RowHashMeta,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn expand_abstract_field(&self, field: &Field) -> ReconResult<String> {
        match &field.kind {
            FieldKind::BlockName(meta) => group_name_expr(&field.expr, meta),
            FieldKind::BlockHash(meta) => block_hash_expr(meta),
            FieldKind::RowHash(meta) => row_hash_expr(meta),
            FieldKind::Column => unreachable!("dispatched by Dialect::expand_field"),
        }
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }
}

fn group_name_expr(col: &str, meta: &BlockNameMeta) -> ReconResult<String> {
    if meta.level == 0 || meta.level > meta.intervals.len() {
        return Err(ReconError::Config(format!(
            "block name level {} out of range for {} intervals",
            meta.level,
            meta.intervals.len()
        )));
    }
    let base = match meta.partition_column_type {
        PartitionColumnType::Int => col.to_string(),
        PartitionColumnType::Datetime => format!("EXTRACT(EPOCH FROM {col})::bigint"),
        PartitionColumnType::Str => {
            return Err(ReconError::Config("string/uuid partition columns are not yet supported".into()))
        }
    };
    let mut segments = Vec::with_capacity(meta.level);
    for idx in 0..meta.level {
        let segment = if idx == 0 {
            format!("FLOOR({base} / {})::text", meta.intervals[0])
        } else {
            format!("FLOOR(MOD({base}, {}) / {})::text", meta.intervals[idx - 1], meta.intervals[idx])
        };
        segments.push(segment);
    }
    Ok(segments.join(" || '-' || "))
}

fn block_hash_expr(meta: &BlockHashMeta) -> ReconResult<String> {
    match (meta.strategy, &meta.hash_column) {
        (HashStrategy::Md5Sum, Some(col)) => Ok(format!("sum({col}::bigint)")),
        (HashStrategy::Md5Sum, None) => {
            let concat = concat_fields(&meta.fields)?;
            Ok(format!("sum((('x' || substr(md5({concat}), 1, 8))::bit(32)::int)::numeric)"))
        }
        (HashStrategy::HashMd5, Some(col)) => {
            let order = order_column(meta.order_column.as_deref())?;
            Ok(format!("md5(string_agg({col}, ',' order by {order}))"))
        }
        (HashStrategy::HashMd5, None) => {
            let order = order_column(meta.order_column.as_deref())?;
            let concat = concat_fields(&meta.fields)?;
            Ok(format!("md5(string_agg(md5({concat}), ',' order by {order}))"))
        }
    }
}

fn row_hash_expr(meta: &RowHashMeta) -> ReconResult<String> {
    match (meta.strategy, &meta.hash_column) {
        (HashStrategy::Md5Sum, Some(col)) => Ok(format!("{col}::bigint")),
        (HashStrategy::Md5Sum, None) => {
            let concat = concat_fields(&meta.fields)?;
            Ok(format!("(('x' || substr(md5({concat}), 1, 8))::bit(32)::int)"))
        }
        (HashStrategy::HashMd5, Some(col)) => Ok(col.clone()),
        (HashStrategy::HashMd5, None) => {
            let concat = concat_fields(&meta.fields)?;
            Ok(format!("md5({concat})"))
        }
    }
}

fn order_column(order_column: Option<&str>) -> ReconResult<&str> {
    order_column.ok_or_else(|| ReconError::Config("HASH_MD5 strategy requires an order_column".into()))
}

fn concat_fields(fields: &[String]) -> ReconResult<String> {
    if fields.is_empty() {
        return Err(ReconError::Config(
            "block hash requires at least one field when no hash_column is configured".into(),
        ));
    }
    Ok(format!("CONCAT({})", fields.join(", ")))
}
