//! Bounded trigger queue shared by producers and the worker.
//!
//! Producers never block: a full queue rejects the trigger. The single
//! consumer blocks in [`TriggerQueue::pop`] until a trigger arrives or the
//! queue is closed.

use crate::error::QueueError;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

struct Inner {
    items: VecDeque<String>,
    closed: bool,
    /// Triggers accepted but not yet completed or discarded.
    unfinished: usize,
}

/// Bounded FIFO of trigger names.
pub struct TriggerQueue {
    inner: Mutex<Inner>,
    capacity: usize,
    /// Signalled when an item is pushed or the queue is closed.
    available: Condvar,
    /// Signalled when `unfinished` drops to zero.
    idle: Condvar,
}

impl TriggerQueue {
    /// Creates a queue holding at most `capacity` triggers.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                closed: false,
                unfinished: 0,
            }),
            capacity,
            available: Condvar::new(),
            idle: Condvar::new(),
        }
    }

    /// Appends a trigger, failing fast when full or closed.
    pub fn push(&self, trigger: impl Into<String>) -> Result<(), QueueError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(QueueError::Closed);
        }
        if inner.items.len() >= self.capacity {
            return Err(QueueError::Full {
                capacity: self.capacity,
            });
        }
        inner.items.push_back(trigger.into());
        inner.unfinished += 1;
        drop(inner);
        self.available.notify_one();
        Ok(())
    }

    /// Blocks until a trigger is available.
    ///
    /// Returns `None` once the queue is closed. Every returned trigger must
    /// be acknowledged with [`TriggerQueue::task_done`].
    pub fn pop(&self) -> Option<String> {
        let mut inner = self.inner.lock();
        loop {
            if inner.closed {
                return None;
            }
            if let Some(trigger) = inner.items.pop_front() {
                return Some(trigger);
            }
            self.available.wait(&mut inner);
        }
    }

    /// Returns the next trigger without blocking.
    pub fn try_pop(&self) -> Option<String> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return None;
        }
        inner.items.pop_front()
    }

    /// Marks a popped trigger as fully handled.
    pub fn task_done(&self) {
        let mut inner = self.inner.lock();
        inner.unfinished = inner.unfinished.saturating_sub(1);
        if inner.unfinished == 0 {
            self.idle.notify_all();
        }
    }

    /// Closes the queue. Idempotent; wakes a blocked consumer.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        drop(inner);
        self.available.notify_all();
    }

    /// Removes and returns every queued trigger.
    pub fn drain(&self) -> Vec<String> {
        let mut inner = self.inner.lock();
        let drained: Vec<String> = inner.items.drain(..).collect();
        inner.unfinished = inner.unfinished.saturating_sub(drained.len());
        if inner.unfinished == 0 {
            self.idle.notify_all();
        }
        drained
    }

    /// Waits until every accepted trigger is done or discarded.
    ///
    /// Returns false on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        while inner.unfinished > 0 {
            if self.idle.wait_until(&mut inner, deadline).timed_out() {
                return inner.unfinished == 0;
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_push_pop_fifo() {
        let queue = TriggerQueue::new(4);
        queue.push("a").unwrap();
        queue.push("b").unwrap();
        queue.push("c").unwrap();

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop().as_deref(), Some("a"));
        assert_eq!(queue.pop().as_deref(), Some("b"));
        assert_eq!(queue.try_pop().as_deref(), Some("c"));
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn test_full_queue_rejects_without_change() {
        let queue = TriggerQueue::new(1);
        queue.push("first").unwrap();

        assert_eq!(queue.push("second"), Err(QueueError::Full { capacity: 1 }));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop().as_deref(), Some("first"));
    }

    #[test]
    fn test_close_unblocks_consumer() {
        let queue = Arc::new(TriggerQueue::new(2));
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop())
        };

        thread::sleep(Duration::from_millis(20));
        queue.close();
        queue.close();

        assert_eq!(consumer.join().unwrap(), None);
        assert!(queue.is_closed());
        assert_eq!(queue.push("late"), Err(QueueError::Closed));
    }

    #[test]
    fn test_blocked_consumer_receives_push() {
        let queue = Arc::new(TriggerQueue::new(2));
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop())
        };

        thread::sleep(Duration::from_millis(20));
        queue.push("wake").unwrap();
        assert_eq!(consumer.join().unwrap().as_deref(), Some("wake"));
    }

    #[test]
    fn test_drain_discards_and_settles_idle() {
        let queue = TriggerQueue::new(8);
        for i in 0..5 {
            queue.push(format!("t{}", i)).unwrap();
        }
        assert!(!queue.wait_idle(Duration::from_millis(10)));

        let drained = queue.drain();
        assert_eq!(drained.len(), 5);
        assert!(queue.is_empty());
        assert!(queue.wait_idle(Duration::from_millis(10)));
    }

    #[test]
    fn test_wait_idle_tracks_task_done() {
        let queue = Arc::new(TriggerQueue::new(4));
        queue.push("a").unwrap();
        queue.push("b").unwrap();

        let worker = {
            let queue = queue.clone();
            thread::spawn(move || {
                for _ in 0..2 {
                    queue.pop().unwrap();
                    queue.task_done();
                }
            })
        };

        assert!(queue.wait_idle(Duration::from_secs(5)));
        worker.join().unwrap();
    }

    #[test]
    fn test_concurrent_producers_respect_capacity() {
        let queue = Arc::new(TriggerQueue::new(10));
        let handles: Vec<_> = (0..4)
            .map(|p| {
                let queue = queue.clone();
                thread::spawn(move || {
                    (0..10)
                        .filter(|i| queue.push(format!("p{}-{}", p, i)).is_ok())
                        .count()
                })
            })
            .collect();

        let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(accepted, 10);
        assert_eq!(queue.len(), 10);
    }

    proptest! {
        #[test]
        fn prop_fifo_and_capacity(capacity in 1usize..16, triggers in proptest::collection::vec("[a-z]{1,6}", 0..32)) {
            let queue = TriggerQueue::new(capacity);
            let mut accepted = Vec::new();
            for t in &triggers {
                match queue.push(t.clone()) {
                    Ok(()) => accepted.push(t.clone()),
                    Err(e) => prop_assert_eq!(e, QueueError::Full { capacity }),
                }
            }
            prop_assert_eq!(accepted.len(), triggers.len().min(capacity));

            let mut popped = Vec::new();
            while let Some(t) = queue.try_pop() {
                popped.push(t);
            }
            prop_assert_eq!(popped, accepted);
        }
    }
}
