//! Single-pass merge of adjacent same-status blocks, bounded by
//! `max_block_size`. Only `Modified`/`AddedSource` runs are merged —
//! `Identical` and `DeletedSink` blocks are left as-is so their row counts
//! stay meaningful on their own.

use crate::block::{Block, Status};

pub fn merge_adjacent(blocks: Vec<Block>, statuses: Vec<Status>, max_block_size: u64) -> (Vec<Block>, Vec<Status>) {
    let mut merged_blocks: Vec<Block> = Vec::with_capacity(blocks.len());
    let mut merged_statuses: Vec<Status> = Vec::with_capacity(statuses.len());

    for (block, status) in blocks.into_iter().zip(statuses) {
        let mergeable_status = matches!(status, Status::Modified | Status::AddedSource);
        let can_merge = mergeable_status
            && merged_statuses.last() == Some(&status)
            && merged_blocks
                .last()
                .map(|prev| prev.num_rows + block.num_rows <= max_block_size)
                .unwrap_or(false);

        if can_merge {
            let prev = merged_blocks.last_mut().expect("checked above");
            prev.end = prev.end.max(block.end);
            prev.num_rows += block.num_rows;
        } else {
            merged_blocks.push(block);
            merged_statuses.push(status);
        }
    }

    (merged_blocks, merged_statuses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::PartitionValue;

    fn block(start: i64, end: i64, rows: u64) -> Block {
        Block { start: PartitionValue::Int(start), end: PartitionValue::Int(end), level: 2, num_rows: rows, hash: String::new() }
    }

    #[test]
    fn merges_adjacent_modified_blocks_under_cap() {
        let blocks = vec![block(0, 100, 40), block(100, 200, 40)];
        let statuses = vec![Status::Modified, Status::Modified];
        let (merged, st) = merge_adjacent(blocks, statuses, 100);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].start, PartitionValue::Int(0));
        assert_eq!(merged[0].end, PartitionValue::Int(200));
        assert_eq!(merged[0].num_rows, 80);
        assert_eq!(st, vec![Status::Modified]);
    }

    #[test]
    fn does_not_merge_past_cap() {
        let blocks = vec![block(0, 100, 60), block(100, 200, 60)];
        let statuses = vec![Status::Modified, Status::Modified];
        let (merged, _) = merge_adjacent(blocks, statuses, 100);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn never_merges_identical_or_deleted_blocks() {
        let blocks = vec![block(0, 100, 1), block(100, 200, 1)];
        let statuses = vec![Status::Identical, Status::Identical];
        let (merged, _) = merge_adjacent(blocks, statuses, 1000);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn does_not_merge_across_status_boundary() {
        let blocks = vec![block(0, 100, 1), block(100, 200, 1), block(200, 300, 1)];
        let statuses = vec![Status::Modified, Status::AddedSource, Status::Modified];
        let (merged, st) = merge_adjacent(blocks, statuses, 1000);
        assert_eq!(merged.len(), 3);
        assert_eq!(st, vec![Status::Modified, Status::AddedSource, Status::Modified]);
    }
}
