//! ClickHouse expansion of the abstract field kinds. Grounded on
//! `original_source/adapters/clickhouse.py`'s active implementation, which
//! uses `intDiv`/`CityHash64` rather than Postgres's `FLOOR`/`md5`. Unlike
//! the Postgres dialect there is no `Md5Sum`/`HashMd5` split — ClickHouse's
//! native hash covers both cases with a single `sum(reinterpretAsUInt32(...))`
//! expression, matching the Python original's single `"hash"` strategy for
//! this backend.

use crate::render::Dialect;
use recon_core::{
    BlockHashMeta, BlockNameMeta, Field, FieldKind, JoinType, PartitionColumnType, ReconError,
    ReconResult, RowHashMeta,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct ClickHouseDialect;

impl Dialect for ClickHouseDialect {
    fn expand_abstract_field(&self, field: &Field) -> ReconResult<String> {
        match &field.kind {
            FieldKind::BlockName(meta) => group_name_expr(&field.expr, meta),
            FieldKind::BlockHash(meta) => block_hash_expr(meta),
            FieldKind::RowHash(meta) => row_hash_expr(meta),
            FieldKind::Column => unreachable!("dispatched by Dialect::expand_field"),
        }
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("`{ident}`")
    }

    fn join_keyword(&self, join_type: JoinType) -> &'static str {
        match join_type {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL JOIN",
        }
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
        PartitionColumnType::Datetime => format!("toUnixTimestamp({col})"),
        PartitionColumnType::Str => {
            return Err(ReconError::Config("string/uuid partition columns are not yet supported".into()))
        }
    };
    let mut segments = Vec::with_capacity(meta.level);
    for idx in 0..meta.level {
        let segment = if idx == 0 {
            format!("toString(intDiv({base}, {}))", meta.intervals[0])
        } else {
            format!("toString(intDiv({base} % {}, {}))", meta.intervals[idx - 1], meta.intervals[idx])
        };
        segments.push(segment);
    }
    Ok(segments.join(" || '-' || "))
}

fn block_hash_expr(meta: &BlockHashMeta) -> ReconResult<String> {
    let expr = match &meta.hash_column {
        Some(col) => format!("toString({col})"),
        None => concat_fields(&meta.fields)?,
    };
    Ok(format!("sum(reinterpretAsUInt32(substring(CityHash64({expr}), 1, 4)))"))
}

fn row_hash_expr(meta: &RowHashMeta) -> ReconResult<String> {
    let expr = match &meta.hash_column {
        Some(col) => format!("toString({col})"),
        None => concat_fields(&meta.fields)?,
    };
    Ok(format!("reinterpretAsUInt32(substring(CityHash64({expr}), 1, 4))"))
}

fn concat_fields(fields: &[String]) -> ReconResult<String> {
    if fields.is_empty() {
        return Err(ReconError::Config(
            "block hash requires at least one field when no hash_column is configured".into(),
        ));
    }
    let casted: Vec<String> = fields.iter().map(|f| format!("toString({f})")).collect();
    Ok(format!("concat({})", casted.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_core::{Field, FieldKind, HashStrategy};

    fn name_meta(level: usize) -> BlockNameMeta {
        BlockNameMeta {
            level,
            intervals: vec![200, 40, 8],
            partition_column: "id".to_string(),
            partition_column_type: PartitionColumnType::Int,
        }
    }

    #[test]
    fn group_name_expr_uses_intdiv() {
        let dialect = ClickHouseDialect;
        let field = Field {
            expr: "id".to_string(),
            alias: Some("blockname".to_string()),
            kind: FieldKind::BlockName(name_meta(2)),
        };
        let rendered = dialect.expand_field(&field).unwrap();
        assert_eq!(rendered.matches("intDiv").count(), 2);
    }

    #[test]
    fn block_hash_uses_cityhash() {
        let meta = BlockHashMeta {
            strategy: HashStrategy::Md5Sum,
            hash_column: Some("row_hash".to_string()),
            order_column: None,
            partition_column: "id".to_string(),
            partition_column_type: PartitionColumnType::Int,
            fields: vec![],
        };
        let expr = block_hash_expr(&meta).unwrap();
        assert!(expr.contains("CityHash64(toString(row_hash))"));
    }

    #[test]
    fn quote_ident_uses_backticks() {
        let dialect = ClickHouseDialect;
        assert_eq!(dialect.quote_ident("events"), "`events`");
    }
}
