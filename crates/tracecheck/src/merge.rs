//! Merge: k-way merge of per-source event streams into one total order.
//!
//! Ordering key, in priority:
//! 1. timestamp (ms) ascending
//! 2. position of the source in the caller-supplied list
//! 3. position of the event within its source
//!
//! Millisecond timestamps cannot separate genuinely concurrent events, so
//! ties are broken arbitrarily but reproducibly. The result is deterministic;
//! it is not a causal order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use tracing::{debug, warn};

use crate::event::LogEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct HeadKey {
    timestamp_ms: i64,
    source_rank: usize,
    position: usize,
}

/// Merge already-sorted sources. O(total · log k).
///
/// `sources[i]` is ranked `i` for tie-breaking. Each source must be
/// non-decreasing in timestamp (see [`ensure_sorted`]). Every input event
/// appears exactly once in the output.
pub fn merge(sources: Vec<Vec<LogEvent>>) -> Vec<LogEvent> {
    let total: usize = sources.iter().map(Vec::len).sum();
    let mut cursors: Vec<std::vec::IntoIter<LogEvent>> =
        sources.into_iter().map(Vec::into_iter).collect();

    let mut heap = BinaryHeap::with_capacity(cursors.len());
    let mut heads: Vec<Option<LogEvent>> = Vec::with_capacity(cursors.len());

    for (rank, cursor) in cursors.iter_mut().enumerate() {
        let head = cursor.next();
        if let Some(event) = &head {
            heap.push(Reverse(HeadKey {
                timestamp_ms: event.timestamp_ms,
                source_rank: rank,
                position: 0,
            }));
        }
        heads.push(head);
    }

    let mut merged = Vec::with_capacity(total);
    while let Some(Reverse(key)) = heap.pop() {
        let rank = key.source_rank;
        let Some(event) = heads[rank].take() else {
            continue;
        };
        merged.push(event);

        if let Some(next) = cursors[rank].next() {
            heap.push(Reverse(HeadKey {
                timestamp_ms: next.timestamp_ms,
                source_rank: rank,
                position: key.position + 1,
            }));
            heads[rank] = Some(next);
        }
    }

    debug!("Merged {} events from {} sources", merged.len(), cursors.len());
    merged
}

/// Restore the per-source timestamp order the merge relies on.
///
/// Replica logs are append-only, so this is normally a no-op. When a clock
/// step makes timestamps go backwards, the source is stable-sorted (equal
/// timestamps keep file order). Returns how many backward steps were seen.
pub fn ensure_sorted(events: &mut [LogEvent]) -> u64 {
    let regressions = events
        .windows(2)
        .filter(|w| w[1].timestamp_ms < w[0].timestamp_ms)
        .count() as u64;

    if regressions > 0 {
        if let Some(first) = events.first() {
            warn!(
                source = %first.source,
                "{} timestamp regression(s) within source, reordering by timestamp",
                regressions
            );
        }
        events.sort_by_key(|e| e.timestamp_ms);
    }

    regressions
}
