//! Infers the `[start, end)` universe to reconcile over when the caller
//! hasn't pinned both bounds, by probing `min`/`max` on both state
//! adapters and taking the widest span across them.

use crate::adapter::StoreAdapter;
use crate::block::PartitionValue;
use crate::config::{AdapterConfig, MetaColumns, ReconciliationConfig};
use crate::error::{ReconError, ReconResult};
use crate::planner::plan_range_query;
use crate::row::{Row, Value};

fn extract_bound(row: &Row, key: &str) -> ReconResult<Option<PartitionValue>> {
    match row.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Int(v)) => Ok(Some(PartitionValue::Int(*v))),
        Some(Value::DateTime(v)) => Ok(Some(PartitionValue::DateTime(*v))),
        Some(other) => Err(ReconError::Adapter(format!(
            "range probe column '{key}' returned an unsupported value: {other:?}"
        ))),
    }
}

fn min_opt(a: Option<PartitionValue>, b: Option<PartitionValue>) -> Option<PartitionValue> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (Some(x), None) => Some(x),
        (None, Some(y)) => Some(y),
        (None, None) => None,
    }
}

fn max_opt(a: Option<PartitionValue>, b: Option<PartitionValue>) -> Option<PartitionValue> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (Some(x), None) => Some(x),
        (None, Some(y)) => Some(y),
        (None, None) => None,
    }
}

/// Resolve the universe to reconcile over. Returns `None` if both sides
/// are empty (nothing to do); otherwise a half-open `[start, end)` range.
#[allow(clippy::too_many_arguments)]
pub async fn resolve(
    sourcestate: &dyn StoreAdapter,
    sinkstate: &dyn StoreAdapter,
    source_adapter_config: &AdapterConfig,
    sink_adapter_config: &AdapterConfig,
    source_state_meta: &MetaColumns,
    sink_state_meta: &MetaColumns,
    user_start: Option<PartitionValue>,
    user_end: Option<PartitionValue>,
) -> ReconResult<Option<(PartitionValue, PartitionValue)>> {
    if let (Some(s), Some(e)) = (user_start, user_end) {
        if s >= e {
            return Err(ReconError::Range(format!("start {s:?} must be before end {e:?}")));
        }
        return Ok(Some((s, e)));
    }

    let mut start = user_start;
    let mut end = user_end;

    let src_query = plan_range_query(source_adapter_config, source_state_meta);
    let snk_query = plan_range_query(sink_adapter_config, sink_state_meta);

    let src_row = sourcestate.fetch_one(&src_query, "range_probe_source").await?;
    let snk_row = sinkstate.fetch_one(&snk_query, "range_probe_sink").await?;

    let probed_start = min_opt(extract_bound(&src_row, "start")?, extract_bound(&snk_row, "start")?);
    let mut probed_end = max_opt(extract_bound(&src_row, "end")?, extract_bound(&snk_row, "end")?);
    // The probed end came from an inclusive max(); extend by one unit so
    // the half-open range actually covers the last row.
    probed_end = probed_end.map(PartitionValue::add_one_unit);

    start = start.or(probed_start);
    end = end.or(probed_end);

    if let (Some(us), Some(s)) = (user_start, start) {
        start = Some(s.max(us));
    }
    if let (Some(ue), Some(e)) = (user_end, end) {
        end = Some(e.min(ue));
    }

    match (start, end) {
        (None, _) | (_, None) => Ok(None),
        (Some(s), Some(e)) if s < e => Ok(Some((s, e))),
        (Some(s), Some(e)) => Err(ReconError::Range(format!("resolved start {s:?} >= end {e:?}"))),
    }
}
