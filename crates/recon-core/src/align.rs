//! Aligns source and sink blocks keyed by `(start, end, level)` and
//! classifies each into Identical/Modified/AddedSource/DeletedSink.

use crate::block::{Block, BlockKey, Status};
use std::collections::{BTreeMap, BTreeSet};

/// Classify every block present on either side. Returns blocks and their
/// statuses in ascending `(start, end, level)` order — the ordering the
/// driver and merger depend on.
pub fn classify(src_blocks: Vec<Block>, snk_blocks: Vec<Block>) -> (Vec<Block>, Vec<Status>) {
    let mut src_map: BTreeMap<BlockKey, Block> = src_blocks.into_iter().map(|b| (b.key(), b)).collect();
    let mut snk_map: BTreeMap<BlockKey, Block> = snk_blocks.into_iter().map(|b| (b.key(), b)).collect();

    let mut keys: BTreeSet<BlockKey> = src_map.keys().copied().collect();
    keys.extend(snk_map.keys().copied());

    let mut blocks = Vec::with_capacity(keys.len());
    let mut statuses = Vec::with_capacity(keys.len());

    for key in keys {
        let src = src_map.remove(&key);
        let snk = snk_map.remove(&key);
        let (block, status) = match (src, snk) {
            (Some(s), Some(k)) => {
                if s.num_rows == k.num_rows && s.hash == k.hash {
                    (s, Status::Identical)
                } else {
                    // Larger side wins the representative row count; source
                    // wins ties.
                    let chosen = if s.num_rows >= k.num_rows { s } else { k };
                    (chosen, Status::Modified)
                }
            }
            (Some(s), None) => (s, Status::AddedSource),
            (None, Some(k)) => (k, Status::DeletedSink),
            (None, None) => unreachable!("key came from one of the two maps"),
        };
        blocks.push(block);
        statuses.push(status);
    }

    (blocks, statuses)
}
