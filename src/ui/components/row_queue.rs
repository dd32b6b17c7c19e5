use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Quiet period before queued rows are requested.
pub const ROW_REQUEST_DELAY: Duration = Duration::from_millis(500);

/// Rows requested per flush; older entries are dropped.
pub const ROW_REQUEST_LIMIT: usize = 20;

/// Debounce queue for table rows that scrolled into view.
///
/// Every newly queued row restarts the quiet period. When it elapses only
/// the most recently queued rows are released, so fast scrolling past
/// thousands of rows requests just what the user stopped on.
#[derive(Debug)]
pub struct RowRequestQueue {
  order: Vec<i64>,
  queued: HashSet<i64>,
  deadline: Option<Instant>,
  delay: Duration,
  limit: usize,
}

impl Default for RowRequestQueue {
  fn default() -> Self {
    Self::new(ROW_REQUEST_DELAY, ROW_REQUEST_LIMIT)
  }
}

impl RowRequestQueue {
  pub fn new(delay: Duration, limit: usize) -> Self {
    Self {
      order: Vec::new(),
      queued: HashSet::new(),
      deadline: None,
      delay,
      limit: limit.max(1),
    }
  }

  /// Queue a row. Rows already waiting keep their place and do not
  /// restart the timer.
  pub fn enqueue(&mut self, index: i64, now: Instant) {
    if self.queued.insert(index) {
      self.order.push(index);
      self.deadline = Some(now + self.delay);
    }
  }

  pub fn is_queued(&self, index: i64) -> bool {
    self.queued.contains(&index)
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.order.is_empty()
  }

  /// Take the rows to request if the quiet period is over.
  pub fn take_due(&mut self, now: Instant) -> Option<Vec<i64>> {
    match self.deadline {
      Some(deadline) if now >= deadline => {
        let start = self.order.len().saturating_sub(self.limit);
        let due = self.order.split_off(start);
        self.clear();
        Some(due)
      }
      _ => None,
    }
  }

  pub fn clear(&mut self) {
    self.order.clear();
    self.queued.clear();
    self.deadline = None;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_waits_for_quiet_period() {
    let start = Instant::now();
    let mut queue = RowRequestQueue::default();
    queue.enqueue(3, start);
    queue.enqueue(4, start + Duration::from_millis(300));

    assert_eq!(queue.take_due(start + Duration::from_millis(600)), None);
    assert_eq!(
      queue.take_due(start + Duration::from_millis(800)),
      Some(vec![3, 4])
    );
    assert!(queue.is_empty());
    assert_eq!(queue.take_due(start + Duration::from_secs(5)), None);
  }

  #[test]
  fn test_duplicates_do_not_restart_timer() {
    let start = Instant::now();
    let mut queue = RowRequestQueue::default();
    queue.enqueue(7, start);
    queue.enqueue(7, start + Duration::from_millis(400));
    assert!(queue.is_queued(7));
    assert_eq!(
      queue.take_due(start + Duration::from_millis(500)),
      Some(vec![7])
    );
    assert!(!queue.is_queued(7));
  }

  #[test]
  fn test_only_most_recent_rows_released() {
    let start = Instant::now();
    let mut queue = RowRequestQueue::default();
    for i in 0..50 {
      queue.enqueue(i, start);
    }
    let due = queue.take_due(start + ROW_REQUEST_DELAY).unwrap();
    assert_eq!(due, (30..50).collect::<Vec<_>>());
    assert!(!queue.is_queued(0));
  }

  #[test]
  fn test_clear_drops_pending_rows() {
    let start = Instant::now();
    let mut queue = RowRequestQueue::new(Duration::ZERO, 5);
    queue.enqueue(1, start);
    queue.clear();
    assert_eq!(queue.take_due(start), None);
  }
}
