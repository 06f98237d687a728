//! The recursive driver: resolves the range, generates top-level
//! partitions, and for each one walks the interval ladder level by level —
//! fetching block hashes from both sides, classifying, and recursing into
//! any block that's still too large or disagrees — before merging adjacent
//! runs once across the whole result.

use crate::adapter::StoreAdapter;
use crate::align::classify;
use crate::block::{Block, PartitionValue, Status};
use crate::config::{AdapterConfig, ReconciliationConfig};
use crate::error::{ReconError, ReconResult};
use crate::merge::merge_adjacent;
use crate::partition::generate_partitions;
use crate::planner::plan_block_hash_query;
use crate::range;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Bounds how many partition/recursion branches run concurrently. Adapters
/// are not assumed safe for concurrent use by multiple callers at once, so
/// this also bounds concurrent calls into a single adapter instance.
#[derive(Debug, Clone, Copy)]
pub struct DriverLimits {
    pub max_parallel: usize,
}

impl Default for DriverLimits {
    fn default() -> Self {
        DriverLimits { max_parallel: 4 }
    }
}

/// Runs one full reconciliation pass and returns the final, merged block
/// list with its per-block statuses.
#[allow(clippy::too_many_arguments)]
#[instrument(skip_all)]
pub async fn build_blocks(
    sourcestate: Arc<dyn StoreAdapter>,
    sinkstate: Arc<dyn StoreAdapter>,
    source_adapter_config: Arc<AdapterConfig>,
    sink_adapter_config: Arc<AdapterConfig>,
    recon: Arc<ReconciliationConfig>,
    intervals: Arc<Vec<i64>>,
    cancel: CancellationToken,
    limits: DriverLimits,
) -> ReconResult<(Vec<Block>, Vec<Status>)> {
    recon.validate()?;
    let max_level = intervals.len();

    let user_start = recon.start.as_ref().map(|b| b.resolve());
    let user_end = recon.end.as_ref().map(|b| b.resolve());

    let range = range::resolve(
        sourcestate.as_ref(),
        sinkstate.as_ref(),
        &source_adapter_config,
        &sink_adapter_config,
        &recon.source_state_meta,
        &recon.sink_state_meta,
        user_start,
        user_end,
    )
    .await?;

    let Some((start, end)) = range else {
        debug!("resolved range is empty; nothing to reconcile");
        return Ok((Vec::new(), Vec::new()));
    };

    let top_interval = intervals.first().copied().ok_or_else(|| ReconError::Config("empty interval ladder".into()))?;
    let partitions = generate_partitions(start, end, top_interval)?;

    let semaphore = Arc::new(Semaphore::new(limits.max_parallel.max(1)));
    let mut join_set = JoinSet::new();
    let partition_count = partitions.len();

    for (range_id, (p_start, p_end)) in partitions.into_iter().enumerate() {
        let sourcestate = sourcestate.clone();
        let sinkstate = sinkstate.clone();
        let source_adapter_config = source_adapter_config.clone();
        let sink_adapter_config = sink_adapter_config.clone();
        let recon = recon.clone();
        let intervals = intervals.clone();
        let cancel = cancel.clone();
        let semaphore = semaphore.clone();
        join_set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
            let result = calculate_blocks(
                sourcestate,
                sinkstate,
                source_adapter_config,
                sink_adapter_config,
                p_start,
                p_end,
                1,
                recon,
                intervals,
                max_level,
                cancel,
            )
            .await;
            (range_id, result)
        });
    }

    let mut ordered: Vec<Option<ReconResult<(Vec<Block>, Vec<Status>)>>> = (0..partition_count).map(|_| None).collect();
    while let Some(joined) = join_set.join_next().await {
        let (range_id, result) = joined.map_err(|e| ReconError::Adapter(format!("partition task panicked: {e}")))?;
        ordered[range_id] = Some(result);
    }

    let mut all_blocks = Vec::new();
    let mut all_statuses = Vec::new();
    for entry in ordered {
        let (blocks, statuses) = entry.expect("every range_id was spawned exactly once")?;
        all_blocks.extend(blocks);
        all_statuses.extend(statuses);
    }

    Ok(merge_adjacent(all_blocks, all_statuses, recon.max_block_size))
}

/// Recurses one level at a time over `[start, end)`. Async recursion needs
/// boxing since the compiler can't compute an infinite-size future type.
#[allow(clippy::too_many_arguments)]
fn calculate_blocks(
    sourcestate: Arc<dyn StoreAdapter>,
    sinkstate: Arc<dyn StoreAdapter>,
    source_adapter_config: Arc<AdapterConfig>,
    sink_adapter_config: Arc<AdapterConfig>,
    start: PartitionValue,
    end: PartitionValue,
    level: usize,
    recon: Arc<ReconciliationConfig>,
    intervals: Arc<Vec<i64>>,
    max_level: usize,
    cancel: CancellationToken,
) -> BoxFuture<'static, ReconResult<(Vec<Block>, Vec<Status>)>> {
    Box::pin(async move {
        if cancel.is_cancelled() {
            return Err(ReconError::Cancellation);
        }

        let src_query = plan_block_hash_query(
            start,
            end,
            level,
            &intervals,
            &source_adapter_config,
            &recon.source_state_meta,
            &recon,
        )?;
        let snk_query = plan_block_hash_query(
            start,
            end,
            level,
            &intervals,
            &sink_adapter_config,
            &recon.sink_state_meta,
            &recon,
        )?;

        let src_rows = sourcestate.fetch(&src_query, "block_hash_source").await?;
        if cancel.is_cancelled() {
            return Err(ReconError::Cancellation);
        }
        let snk_rows = sinkstate.fetch(&snk_query, "block_hash_sink").await?;

        let src_blocks = crate::block::rows_to_blocks(&src_rows, &intervals, level, start, end, recon.partition_column_type)?;
        let snk_blocks = crate::block::rows_to_blocks(&snk_rows, &intervals, level, start, end, recon.partition_column_type)?;

        let (blocks, statuses) = classify(src_blocks, snk_blocks);
        let entries: Vec<(Block, Status)> = blocks.into_iter().zip(statuses).collect();

        let recurse_indices: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, (block, status))| {
                matches!(status, Status::Modified | Status::AddedSource)
                    && block.num_rows > recon.max_block_size
                    && level < max_level
            })
            .map(|(i, _)| i)
            .collect();

        let mut deeper: std::collections::HashMap<usize, (Vec<Block>, Vec<Status>)> = std::collections::HashMap::new();
        if !recurse_indices.is_empty() {
            let mut join_set = JoinSet::new();
            for idx in &recurse_indices {
                let (block, _) = &entries[*idx];
                let sourcestate = sourcestate.clone();
                let sinkstate = sinkstate.clone();
                let source_adapter_config = source_adapter_config.clone();
                let sink_adapter_config = sink_adapter_config.clone();
                let recon = recon.clone();
                let intervals = intervals.clone();
                let cancel = cancel.clone();
                let idx = *idx;
                let b_start = block.start;
                let b_end = block.end;
                join_set.spawn(async move {
                    let result = calculate_blocks(
                        sourcestate,
                        sinkstate,
                        source_adapter_config,
                        sink_adapter_config,
                        b_start,
                        b_end,
                        level + 1,
                        recon,
                        intervals,
                        max_level,
                        cancel,
                    )
                    .await;
                    (idx, result)
                });
            }
            while let Some(joined) = join_set.join_next().await {
                let (idx, result) = joined.map_err(|e| ReconError::Adapter(format!("recursion task panicked: {e}")))?;
                deeper.insert(idx, result?);
            }
        }

        let mut final_blocks = Vec::with_capacity(entries.len());
        let mut final_statuses = Vec::with_capacity(entries.len());
        for (i, (block, status)) in entries.into_iter().enumerate() {
            if let Some((deeper_blocks, deeper_statuses)) = deeper.remove(&i) {
                final_blocks.extend(deeper_blocks);
                final_statuses.extend(deeper_statuses);
            } else {
                final_blocks.push(block);
                final_statuses.push(status);
            }
        }

        Ok((final_blocks, final_statuses))
    })
}
