//! Priority queue implementation for job scheduling

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::time::Instant;

use crate::types::JobId;

/// Ordering key: higher priority first, then insertion sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueueKey {
    priority: Reverse<i32>,
    seq: u64,
}

impl QueueKey {
    pub fn new(priority: i32, seq: u64) -> Self {
        Self {
            priority: Reverse(priority),
            seq,
        }
    }

    pub fn priority(&self) -> i32 {
        self.priority.0
    }
}

/// Trait for items that can be held in the queue
pub trait QueueEntry {
    fn job_id(&self) -> JobId;

    fn queue_key(&self) -> QueueKey;

    /// Whether the item may be dispatched at `now`
    fn is_eligible(&self, _now: Instant) -> bool {
        true
    }
}

/// Priority queue for pending jobs
///
/// Items are kept in a `BTreeMap` keyed by [`QueueKey`], so insert, removal
/// by id and extraction of the head are all O(log n), and items with equal
/// priority come out in insertion order.
#[derive(Debug)]
pub struct PriorityQueue<T> {
    entries: BTreeMap<QueueKey, T>,
    index: HashMap<JobId, QueueKey>,
}

impl<T> PriorityQueue<T>
where
    T: QueueEntry,
{
    /// Create a new priority queue
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    /// Add an item, replacing any queued item with the same job id
    pub fn push(&mut self, item: T) {
        let job_id = item.job_id();
        if let Some(old) = self.index.remove(&job_id) {
            self.entries.remove(&old);
        }
        let key = item.queue_key();
        self.index.insert(job_id, key);
        self.entries.insert(key, item);
    }

    /// Remove and return the highest priority item eligible at `now`
    pub fn pop_first_eligible(&mut self, now: Instant) -> Option<T> {
        let key = self
            .entries
            .iter()
            .find(|(_, item)| item.is_eligible(now))
            .map(|(key, _)| *key)?;

        let item = self.entries.remove(&key)?;
        self.index.remove(&item.job_id());
        Some(item)
    }

    /// Highest priority eligible item whose id is not in `excluding`
    pub fn peek_next(&self, excluding: &HashSet<JobId>, now: Instant) -> Option<&T> {
        self.entries
            .values()
            .find(|item| item.is_eligible(now) && !excluding.contains(&item.job_id()))
    }

    /// Remove a specific item by job id
    pub fn remove(&mut self, job_id: &JobId) -> Option<T> {
        let key = self.index.remove(job_id)?;
        self.entries.remove(&key)
    }

    /// Check if the queue contains a job
    pub fn contains(&self, job_id: &JobId) -> bool {
        self.index.contains_key(job_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Job ids in dispatch order, ignoring retry backoff
    pub fn ids_in_order(&self) -> Vec<JobId> {
        self.entries.values().map(QueueEntry::job_id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }
}

impl<T> Default for PriorityQueue<T>
where
    T: QueueEntry,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Debug, Clone)]
    struct TestJob {
        id: JobId,
        priority: i32,
        seq: u64,
        not_before: Option<Instant>,
    }

    impl TestJob {
        fn new(priority: i32, seq: u64) -> Self {
            Self {
                id: JobId::new(),
                priority,
                seq,
                not_before: None,
            }
        }
    }

    impl QueueEntry for TestJob {
        fn job_id(&self) -> JobId {
            self.id
        }

        fn queue_key(&self) -> QueueKey {
            QueueKey::new(self.priority, self.seq)
        }

        fn is_eligible(&self, now: Instant) -> bool {
            self.not_before.map_or(true, |at| at <= now)
        }
    }

    #[test]
    fn test_priority_queue_ordering() {
        let mut queue = PriorityQueue::new();
        queue.push(TestJob::new(1, 0));
        queue.push(TestJob::new(5, 1));
        queue.push(TestJob::new(3, 2));

        let now = Instant::now();
        let drained: Vec<i32> = std::iter::from_fn(|| queue.pop_first_eligible(now))
            .map(|job| job.priority)
            .collect();
        assert_eq!(drained, vec![5, 3, 1]);
    }

    #[test]
    fn test_equal_priority_keeps_insertion_order() {
        let mut queue = PriorityQueue::new();
        let first = TestJob::new(2, 0);
        let second = TestJob::new(2, 1);
        let (first_id, second_id) = (first.id, second.id);
        queue.push(second);
        queue.push(first);

        assert_eq!(queue.ids_in_order(), vec![first_id, second_id]);
    }

    #[test]
    fn test_priority_queue_remove() {
        let mut queue = PriorityQueue::new();
        let task2 = TestJob::new(2, 1);
        let id2 = task2.id;

        queue.push(TestJob::new(3, 0));
        queue.push(task2);
        queue.push(TestJob::new(1, 2));

        assert_eq!(queue.len(), 3);
        assert!(queue.contains(&id2));

        let removed = queue.remove(&id2);
        assert_eq!(removed.map(|j| j.id), Some(id2));
        assert_eq!(queue.len(), 2);
        assert!(!queue.contains(&id2));
        assert!(queue.remove(&id2).is_none());
    }

    #[test]
    fn test_backoff_items_are_skipped() {
        let now = Instant::now();
        let mut queue = PriorityQueue::new();
        let mut delayed = TestJob::new(10, 0);
        delayed.not_before = Some(now + Duration::from_secs(30));
        let delayed_id = delayed.id;
        let ready = TestJob::new(1, 1);
        let ready_id = ready.id;
        queue.push(delayed);
        queue.push(ready);

        assert_eq!(queue.peek_next(&HashSet::new(), now).map(|j| j.id), Some(ready_id));
        assert_eq!(queue.pop_first_eligible(now).map(|j| j.id), Some(ready_id));
        assert!(queue.pop_first_eligible(now).is_none());
        assert_eq!(
            queue
                .pop_first_eligible(now + Duration::from_secs(30))
                .map(|j| j.id),
            Some(delayed_id)
        );
    }

    #[test]
    fn test_peek_next_excluding() {
        let mut queue = PriorityQueue::new();
        let top = TestJob::new(9, 0);
        let next = TestJob::new(4, 1);
        let (top_id, next_id) = (top.id, next.id);
        queue.push(top);
        queue.push(next);

        let excluding: HashSet<JobId> = [top_id].into_iter().collect();
        let now = Instant::now();
        assert_eq!(queue.peek_next(&excluding, now).map(|j| j.id), Some(next_id));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_push_same_id_replaces() {
        let mut queue = PriorityQueue::new();
        let job = TestJob::new(1, 0);
        let mut moved = job.clone();
        moved.seq = 5;
        queue.push(job);
        queue.push(moved);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.iter().next().map(|j| j.seq), Some(5));
    }
}
