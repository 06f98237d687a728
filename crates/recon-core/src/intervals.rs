//! Interval ladder derivation: the strictly decreasing sequence of block
//! widths the driver recurses through, from `initial_partition_interval`
//! down to (and including) the first value `<= max_block_size`.

use crate::error::{ReconError, ReconResult};

pub fn derive_intervals(
    initial_partition_interval: i64,
    max_block_size: u64,
    interval_reduction_factor: i64,
) -> ReconResult<Vec<i64>> {
    if interval_reduction_factor <= 1 {
        return Err(ReconError::Config("interval_reduction_factor must be > 1".into()));
    }
    let max_block_size = max_block_size as i64;
    if initial_partition_interval < max_block_size {
        return Err(ReconError::Range(
            "initial_partition_interval must be >= max_block_size".into(),
        ));
    }

    let mut intervals = Vec::new();
    let mut interval = initial_partition_interval;
    while interval > max_block_size {
        intervals.push(interval);
        interval /= interval_reduction_factor;
    }
    intervals.push(interval);
    Ok(intervals)
}
