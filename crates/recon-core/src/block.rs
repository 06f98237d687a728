//! Blocks: the unit the aligner and driver reason about.

use crate::error::{ReconError, ReconResult};
use crate::query::PartitionColumnType;
use crate::row::{Row, Value};
use chrono::{TimeZone, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PartitionValue {
    Int(i64),
    DateTime(chrono::DateTime<Utc>),
}

impl PartitionValue {
    /// Extend a probe-derived end bound by one unit, per the range
    /// inferrer's half-open interval rule.
    pub fn add_one_unit(self) -> Self {
        match self {
            PartitionValue::Int(v) => PartitionValue::Int(v + 1),
            PartitionValue::DateTime(dt) => PartitionValue::DateTime(dt + chrono::Duration::seconds(1)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Identical,
    Modified,
    AddedSource,
    DeletedSink,
}

impl Status {
    pub fn code(self) -> char {
        match self {
            Status::Identical => 'N',
            Status::Modified => 'M',
            Status::AddedSource => 'A',
            Status::DeletedSink => 'D',
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A span of the ordering key at a given recursion level, with the
/// aggregate hash the store computed for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub start: PartitionValue,
    pub end: PartitionValue,
    pub level: usize,
    pub num_rows: u64,
    pub hash: String,
}

pub type BlockKey = (PartitionValue, PartitionValue, usize);

impl Block {
    pub fn key(&self) -> BlockKey {
        (self.start, self.end, self.level)
    }
}

/// Decode the `row_count` / `blockhash` / `blockname` columns a block-hash
/// query returns into [`Block`]s, clamping each decoded span to the
/// partition range it was queried over.
pub fn rows_to_blocks(
    rows: &[Row],
    intervals: &[i64],
    level: usize,
    range_start: PartitionValue,
    range_end: PartitionValue,
    partition_type: PartitionColumnType,
) -> ReconResult<Vec<Block>> {
    let mut blocks = Vec::with_capacity(rows.len());
    for row in rows {
        let blockname = match row.get("blockname") {
            Some(Value::Text(s)) => s.clone(),
            other => {
                return Err(ReconError::Adapter(format!(
                    "block_hash query returned non-text blockname: {other:?}"
                )))
            }
        };
        let row_count = match row.get("row_count") {
            Some(Value::Int(n)) => *n as u64,
            other => {
                return Err(ReconError::Adapter(format!(
                    "block_hash query returned non-integer row_count: {other:?}"
                )))
            }
        };
        let hash = match row.get("blockhash") {
            Some(Value::Text(s)) => s.clone(),
            Some(Value::Int(n)) => n.to_string(),
            Some(Value::Float(n)) => n.to_string(),
            other => {
                return Err(ReconError::Adapter(format!(
                    "block_hash query returned unsupported blockhash value: {other:?}"
                )))
            }
        };

        let parts: Vec<i64> = blockname
            .split('-')
            .map(|p| {
                p.parse::<i64>()
                    .map_err(|_| ReconError::Adapter(format!("invalid blockname segment in '{blockname}'")))
            })
            .collect::<ReconResult<_>>()?;

        let mut block_start_p: i64 = 0;
        for (idx, part) in parts.iter().enumerate() {
            let width = intervals.get(idx).copied().unwrap_or(1);
            block_start_p += part * width;
        }
        let block_end_p = block_start_p
            + intervals
                .get(level - 1)
                .copied()
                .ok_or_else(|| ReconError::Adapter(format!("no interval defined for level {level}")))?;

        let (block_start, block_end) = match partition_type {
            PartitionColumnType::Int => (PartitionValue::Int(block_start_p), PartitionValue::Int(block_end_p)),
            PartitionColumnType::Datetime => (
                PartitionValue::DateTime(
                    Utc.timestamp_opt(block_start_p, 0)
                        .single()
                        .ok_or_else(|| ReconError::Adapter("invalid block start timestamp".into()))?,
                ),
                PartitionValue::DateTime(
                    Utc.timestamp_opt(block_end_p, 0)
                        .single()
                        .ok_or_else(|| ReconError::Adapter("invalid block end timestamp".into()))?,
                ),
            ),
            PartitionColumnType::Str => {
                return Err(ReconError::Config("string/uuid partition columns are not yet supported".into()))
            }
        };

        blocks.push(Block {
            start: block_start.max(range_start),
            end: block_end.min(range_end),
            level,
            num_rows: row_count,
            hash,
        });
    }
    Ok(blocks)
}
