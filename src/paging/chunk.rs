//! Sorted chunk set with a parallel recency list.
//!
//! Chunks are kept ordered by offset so a logical index can be located by
//! binary search. The recency list stores positions into that ordering,
//! most recently used first, and is shifted whenever a chunk is inserted or
//! removed so both sides always describe the same set.
//!
//! Index shifting is linear in the number of cached chunks. At the sizes a
//! result table needs (around a hundred pages) that is cheaper than keeping
//! an order-statistics tree in sync.

use std::cmp::Ordering;

/// One fetched (or in-flight) page of results.
#[derive(Debug, Clone)]
pub struct Chunk<H> {
  /// Unique per cache instance, used to find the chunk again after shifts
  pub id: u64,
  /// First logical index covered
  pub offset: u64,
  /// Number of logical indices covered
  pub length: u64,
  pub handle: H,
}

impl<H> Chunk<H> {
  pub fn covers(&self, index: u64) -> bool {
    self.locate(index) == Ordering::Equal
  }

  /// Position of this chunk relative to `index`: `Less` when the chunk ends
  /// before it, `Greater` when it starts after it.
  fn locate(&self, index: u64) -> Ordering {
    if index < self.offset {
      Ordering::Greater
    } else if index >= self.offset.saturating_add(self.length) {
      Ordering::Less
    } else {
      Ordering::Equal
    }
  }
}

#[derive(Debug)]
pub struct ChunkIndex<H> {
  sorted: Vec<Chunk<H>>,
  recency: Vec<usize>,
  capacity: usize,
}

impl<H> ChunkIndex<H> {
  pub fn new(capacity: usize) -> Self {
    Self {
      sorted: Vec::new(),
      recency: Vec::new(),
      capacity: capacity.max(1),
    }
  }

  pub fn most_recent(&self) -> Option<&Chunk<H>> {
    self.recency.first().and_then(|&pos| self.sorted.get(pos))
  }

  /// Locate the chunk covering `index`.
  ///
  /// `Ok(pos)` is the covering chunk, `Err(pos)` is where a chunk starting
  /// at the aligned offset for `index` must be inserted.
  pub fn search(&self, index: u64) -> Result<usize, usize> {
    self.sorted.binary_search_by(|chunk| chunk.locate(index))
  }

  /// The chunk covering `index`, promoted to most recently used, or the
  /// sorted position for a new chunk when nothing covers it.
  pub fn lookup(&mut self, index: u64) -> Result<&Chunk<H>, usize> {
    let pos = self.search(index)?;
    self.touch(pos);
    Ok(&self.sorted[pos])
  }

  /// Mark the chunk at `pos` as most recently used.
  pub fn touch(&mut self, pos: usize) {
    if let Some(rank) = self.recency.iter().position(|&p| p == pos) {
      if rank > 0 {
        self.recency.remove(rank);
        self.recency.insert(0, pos);
      }
    }
  }

  /// Insert `chunk` at sorted position `pos` as the most recently used
  /// entry. Returns the evicted chunk when capacity is exceeded.
  pub fn insert(&mut self, pos: usize, chunk: Chunk<H>) -> Option<Chunk<H>> {
    for p in self.recency.iter_mut() {
      if *p >= pos {
        *p += 1;
      }
    }
    self.recency.insert(0, pos);
    self.sorted.insert(pos, chunk);

    if self.recency.len() > self.capacity {
      let victim = self.recency.pop()?;
      self.forget(victim);
      return Some(self.sorted.remove(victim));
    }
    None
  }

  /// Remove the chunk with the given id, wherever it currently sits.
  pub fn purge(&mut self, id: u64) -> Option<Chunk<H>> {
    let pos = self.sorted.iter().position(|chunk| chunk.id == id)?;
    self.recency.retain(|&p| p != pos);
    self.forget(pos);
    Some(self.sorted.remove(pos))
  }

  /// Offsets of all cached chunks in ascending order.
  pub fn offsets(&self) -> Vec<u64> {
    self.sorted.iter().map(|chunk| chunk.offset).collect()
  }

  // Shift recency entries down after `pos` leaves the sorted set.
  fn forget(&mut self, pos: usize) {
    for p in self.recency.iter_mut() {
      if *p > pos {
        *p -= 1;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn chunk(id: u64, offset: u64) -> Chunk<()> {
    Chunk {
      id,
      offset,
      length: 10,
      handle: (),
    }
  }

  fn assert_consistent(index: &ChunkIndex<()>) {
    assert_eq!(index.recency.len(), index.sorted.len());
    let mut seen = index.recency.clone();
    seen.sort_unstable();
    assert_eq!(seen, (0..index.sorted.len()).collect::<Vec<_>>());
    for pair in index.sorted.windows(2) {
      assert!(pair[0].offset + pair[0].length <= pair[1].offset);
    }
    assert!(index.sorted.len() <= index.capacity);
  }

  fn insert_at(index: &mut ChunkIndex<()>, id: u64, offset: u64) -> Option<Chunk<()>> {
    let pos = index.search(offset).unwrap_err();
    index.insert(pos, chunk(id, offset))
  }

  #[test]
  fn test_search_finds_covering_chunk() {
    let mut index = ChunkIndex::new(10);
    insert_at(&mut index, 1, 20);
    insert_at(&mut index, 2, 0);
    insert_at(&mut index, 3, 40);

    assert_eq!(index.search(0), Ok(0));
    assert_eq!(index.search(9), Ok(0));
    assert_eq!(index.search(25), Ok(1));
    assert_eq!(index.search(49), Ok(2));
    assert_eq!(index.search(10), Err(1));
    assert_eq!(index.search(35), Err(2));
    assert_eq!(index.search(55), Err(3));
    assert_consistent(&index);
  }

  #[test]
  fn test_insert_keeps_recency_pointing_at_same_chunks() {
    let mut index = ChunkIndex::new(10);
    insert_at(&mut index, 1, 30);
    insert_at(&mut index, 2, 10);
    insert_at(&mut index, 3, 0);

    assert_eq!(index.offsets(), vec![0, 10, 30]);
    let by_recency: Vec<u64> = index
      .recency
      .iter()
      .map(|&p| index.sorted[p].id)
      .collect();
    assert_eq!(by_recency, vec![3, 2, 1]);
    assert_eq!(index.most_recent().map(|c| c.id), Some(3));
    assert_consistent(&index);
  }

  #[test]
  fn test_insert_evicts_least_recently_used() {
    let mut index = ChunkIndex::new(2);
    assert!(insert_at(&mut index, 1, 0).is_none());
    assert!(insert_at(&mut index, 2, 30).is_none());
    let evicted = insert_at(&mut index, 3, 60);

    assert_eq!(evicted.map(|c| c.offset), Some(0));
    assert_eq!(index.offsets(), vec![30, 60]);
    assert_consistent(&index);
  }

  #[test]
  fn test_touch_protects_chunk_from_eviction() {
    let mut index = ChunkIndex::new(2);
    insert_at(&mut index, 1, 0);
    insert_at(&mut index, 2, 30);
    index.touch(0);
    let evicted = insert_at(&mut index, 3, 60);

    assert_eq!(evicted.map(|c| c.offset), Some(30));
    assert_eq!(index.offsets(), vec![0, 60]);
    assert_consistent(&index);
  }

  #[test]
  fn test_purge_shifts_remaining_positions() {
    let mut index = ChunkIndex::new(10);
    insert_at(&mut index, 1, 0);
    insert_at(&mut index, 2, 10);
    insert_at(&mut index, 3, 20);

    let purged = index.purge(2);
    assert_eq!(purged.map(|c| c.offset), Some(10));
    assert_eq!(index.offsets(), vec![0, 20]);
    assert_eq!(index.most_recent().map(|c| c.id), Some(3));
    assert_consistent(&index);

    assert!(index.purge(2).is_none());
  }

  #[test]
  fn test_zero_capacity_is_clamped() {
    let mut index = ChunkIndex::new(0);
    insert_at(&mut index, 1, 0);
    let evicted = insert_at(&mut index, 2, 10);
    assert_eq!(evicted.map(|c| c.id), Some(1));
    assert_eq!(index.offsets(), vec![10]);
    assert_consistent(&index);
  }

  #[test]
  fn test_random_workload_preserves_invariants() {
    let mut index = ChunkIndex::new(4);
    let mut next_id = 0;
    for step in 0..200u64 {
      let target = (step * 37) % 200;
      match index.search(target) {
        Ok(pos) => index.touch(pos),
        Err(pos) => {
          next_id += 1;
          index.insert(pos, chunk(next_id, target / 10 * 10));
        }
      }
      if step % 7 == 0 {
        index.purge(next_id.saturating_sub(2));
      }
      assert_consistent(&index);
    }
  }

  #[test]
  fn test_lookup_promotes_hit() {
    let mut index = ChunkIndex::new(2);
    insert_at(&mut index, 1, 0);
    insert_at(&mut index, 2, 30);

    assert_eq!(index.lookup(5).map(|c| c.id), Ok(1));
    assert_eq!(index.most_recent().map(|c| c.id), Some(1));
    assert_eq!(index.lookup(15).map(|c| c.id), Err(1));
    assert_consistent(&index);
  }

  #[test]
  fn test_chunk_at_end_of_range_does_not_overflow() {
    let last = Chunk {
      id: 1,
      offset: u64::MAX - 5,
      length: u64::MAX,
      handle: (),
    };
    assert!(last.covers(u64::MAX - 1));
    assert!(!last.covers(u64::MAX - 6));
  }
}
