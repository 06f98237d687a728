//! Top-level partition generator: chunks `[start, end)` by
//! `initial_partition_interval`, the coarsest width in the interval ladder.

use crate::block::PartitionValue;
use crate::error::{ReconError, ReconResult};
use chrono::{TimeZone, Utc};

/// Chunk `[start, end)` into consecutive, non-overlapping spans of at most
/// `interval` width. Finite: the last chunk is clipped to `end`.
pub fn generate_partitions(
    start: PartitionValue,
    end: PartitionValue,
    interval: i64,
) -> ReconResult<Vec<(PartitionValue, PartitionValue)>> {
    if interval <= 0 {
        return Err(ReconError::Config("initial_partition_interval must be > 0".into()));
    }
    match (start, end) {
        (PartitionValue::Int(s), PartitionValue::Int(e)) => Ok(int_partitions(s, e, interval)
            .into_iter()
            .map(|(a, b)| (PartitionValue::Int(a), PartitionValue::Int(b)))
            .collect()),
        (PartitionValue::DateTime(s), PartitionValue::DateTime(e)) => {
            let pairs = int_partitions(s.timestamp(), e.timestamp(), interval);
            pairs
                .into_iter()
                .map(|(a, b)| {
                    let a = Utc
                        .timestamp_opt(a, 0)
                        .single()
                        .ok_or_else(|| ReconError::Adapter("invalid partition start timestamp".into()))?;
                    let b = Utc
                        .timestamp_opt(b, 0)
                        .single()
                        .ok_or_else(|| ReconError::Adapter("invalid partition end timestamp".into()))?;
                    Ok((PartitionValue::DateTime(a), PartitionValue::DateTime(b)))
                })
                .collect()
        }
        _ => Err(ReconError::Config(
            "range start and end must be the same partition value variant".into(),
        )),
    }
}

fn int_partitions(start: i64, end: i64, interval: i64) -> Vec<(i64, i64)> {
    let mut out = Vec::new();
    let mut cur = start;
    while cur < end {
        let aligned_next = ((cur + interval) / interval) * interval;
        let next = aligned_next.min(end);
        out.push((cur, next));
        if next <= cur {
            break;
        }
        cur = next;
    }
    out
}
