//! K-way merge over sorted `(key, Payload)` streams.
//!
//! Produces entries in ascending key order. When the same key appears in
//! multiple streams, only the entry from the stream with the lowest rank is
//! emitted; callers order their streams newest-first, so rank decides
//! recency and newest wins.
//!
//! This is the shared primitive behind range queries (memtable stream plus
//! one stream per SSTable) and compaction (one stream per SSTable).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::Result;
use crate::memtable::Payload;

/// A sorted source stream, addressed by its rank (0 = newest).
type Source<'a> = Box<dyn Iterator<Item = Result<(Vec<u8>, Payload)>> + 'a>;

/// The head entry of one source, ordered for the min-heap.
struct HeapEntry {
    key: Vec<u8>,
    payload: Payload,
    /// Index into the sources vec; lower = newer.
    rank: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.rank == other.rank
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse the comparison so the smallest
        // key surfaces first, and on equal keys the lowest rank (newest
        // source) surfaces first.
        other
            .key
            .cmp(&self.key)
            .then_with(|| other.rank.cmp(&self.rank))
    }
}

/// Merges N sorted streams into one ascending, deduplicated stream.
///
/// Yields `(key, Payload)` pairs; tombstones are passed through, the caller
/// decides whether to surface or drop them.
pub struct MergeIterator<'a> {
    sources: Vec<Source<'a>>,
    heap: BinaryHeap<HeapEntry>,
    /// Set after a source error; the merge result is unusable past it.
    failed: bool,
}

impl<'a> MergeIterator<'a> {
    /// Create a merge over the given streams, ordered newest-first.
    pub fn new(mut sources: Vec<Source<'a>>) -> Result<Self> {
        let mut heap = BinaryHeap::new();

        for (rank, source) in sources.iter_mut().enumerate() {
            if let Some(item) = source.next() {
                let (key, payload) = item?;
                heap.push(HeapEntry { key, payload, rank });
            }
        }

        Ok(Self {
            sources,
            heap,
            failed: false,
        })
    }

    /// Pull the next entry of `rank`'s stream into the heap.
    fn advance(&mut self, rank: usize) -> Result<()> {
        if let Some(item) = self.sources[rank].next() {
            let (key, payload) = item?;
            self.heap.push(HeapEntry { key, payload, rank });
        }
        Ok(())
    }
}

impl<'a> Iterator for MergeIterator<'a> {
    type Item = Result<(Vec<u8>, Payload)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        // Smallest key; on ties, the newest source (lowest rank) wins.
        let winner = self.heap.pop()?;
        if let Err(e) = self.advance(winner.rank) {
            self.failed = true;
            return Some(Err(e));
        }

        // Discard entries for the same key from older sources.
        while let Some(peek) = self.heap.peek() {
            if peek.key != winner.key {
                break;
            }
            let loser = self.heap.pop().expect("peeked entry present");
            if let Err(e) = self.advance(loser.rank) {
                self.failed = true;
                return Some(Err(e));
            }
        }

        Some(Ok((winner.key, winner.payload)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(entries: Vec<(&str, Payload)>) -> Source<'static> {
        let entries: Vec<(Vec<u8>, Payload)> = entries
            .into_iter()
            .map(|(k, p)| (k.as_bytes().to_vec(), p))
            .collect();
        Box::new(entries.into_iter().map(Ok))
    }

    fn value(v: &str) -> Payload {
        Payload::Value(v.as_bytes().to_vec())
    }

    fn collect(merge: MergeIterator<'_>) -> Vec<(Vec<u8>, Payload)> {
        merge.map(|item| item.unwrap()).collect()
    }

    #[test]
    fn test_merge_disjoint_streams() {
        let merge = MergeIterator::new(vec![
            source(vec![("b", value("2"))]),
            source(vec![("a", value("1")), ("c", value("3"))]),
        ])
        .unwrap();

        let keys: Vec<_> = collect(merge).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn test_merge_newest_wins_on_tie() {
        let merge = MergeIterator::new(vec![
            source(vec![("k", value("new"))]),
            source(vec![("k", value("old"))]),
        ])
        .unwrap();

        let entries = collect(merge);
        assert_eq!(entries, vec![(b"k".to_vec(), value("new"))]);
    }

    #[test]
    fn test_merge_passes_tombstones_through() {
        let merge = MergeIterator::new(vec![
            source(vec![("k", Payload::Tombstone)]),
            source(vec![("k", value("old"))]),
        ])
        .unwrap();

        let entries = collect(merge);
        assert_eq!(entries, vec![(b"k".to_vec(), Payload::Tombstone)]);
    }

    #[test]
    fn test_merge_three_way_tie() {
        let merge = MergeIterator::new(vec![
            source(vec![("k", value("v2"))]),
            source(vec![("k", value("v1"))]),
            source(vec![("k", value("v0"))]),
        ])
        .unwrap();

        let entries = collect(merge);
        assert_eq!(entries, vec![(b"k".to_vec(), value("v2"))]);
    }

    #[test]
    fn test_merge_empty_sources() {
        let merge = MergeIterator::new(vec![source(vec![]), source(vec![])]).unwrap();
        assert!(collect(merge).is_empty());
    }
}
