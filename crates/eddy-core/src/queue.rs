//! Bounded MPMC event queue with backpressure and a closable end state.
//!
//! [`BoundedQueue`] is the only channel type in the engine: every graph
//! edge materializes to exactly one of these. It is a fixed-capacity ring
//! buffer guarded by a single mutex with two condition variables
//! (`not_full` / `not_empty`), which keeps the blocking, timed, and
//! non-blocking variants of push/pop trivially linearizable.
//!
//! # Design
//!
//! - Capacity is rounded up to a power of two so ring indices wrap with a
//!   bitmask instead of a division.
//! - `close()` is one-way and idempotent: pushes start failing immediately,
//!   pops keep draining in FIFO order until the ring is empty, then return
//!   `None`. Both condvars are broadcast so every blocked thread observes
//!   the transition.
//! - A push refused because the queue is closed is *not* an error; it is
//!   the normal end-of-stream signal to the producer. No operation on the
//!   queue panics.
//!
//! Counters are maintained under the same lock as the ring, so a
//! [`QueueStats`] snapshot is internally consistent.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::event::Event;

/// Point-in-time queue statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueStats {
    /// Successful pushes.
    pub push_count: u64,
    /// Successful pops.
    pub pop_count: u64,
    /// Blocking episodes on the producer side (full queue).
    pub push_blocked_count: u64,
    /// Blocking episodes on the consumer side (empty queue).
    pub pop_blocked_count: u64,
    /// Size at snapshot time.
    pub current_size: usize,
    /// Maximum size ever observed.
    pub high_watermark: usize,
    /// Fixed capacity.
    pub capacity: usize,
}

/// State behind the queue mutex: the ring plus its bookkeeping.
struct Ring {
    buf: Box<[Option<Event>]>,
    head: usize,
    tail: usize,
    len: usize,
    closed: bool,
    push_count: u64,
    pop_count: u64,
    push_blocked_count: u64,
    pop_blocked_count: u64,
    high_watermark: usize,
}

/// Bounded multi-producer multi-consumer FIFO queue of [`Event`]s.
///
/// Thread-safe; shared between the upstream operator's emit context and
/// the downstream operator's instance via `Arc`.
///
/// # Example
///
/// ```
/// use eddy_core::event::Event;
/// use eddy_core::queue::BoundedQueue;
///
/// let queue = BoundedQueue::new(64);
/// assert!(queue.push(Event::new(42i64)));
/// assert_eq!(queue.pop().and_then(|e| e.as_int()), Some(42));
/// queue.close();
/// assert!(!queue.push(Event::new(1i64)));
/// assert!(queue.pop().is_none());
/// ```
pub struct BoundedQueue {
    ring: Mutex<Ring>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
    mask: usize,
}

impl BoundedQueue {
    /// Creates a queue with the requested capacity, rounded up to the next
    /// power of two (minimum 2).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2).next_power_of_two();
        let buf: Vec<Option<Event>> = (0..capacity).map(|_| None).collect();
        Self {
            ring: Mutex::new(Ring {
                buf: buf.into_boxed_slice(),
                head: 0,
                tail: 0,
                len: 0,
                closed: false,
                push_count: 0,
                pop_count: 0,
                push_blocked_count: 0,
                pop_blocked_count: 0,
                high_watermark: 0,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
            mask: capacity - 1,
        }
    }

    /// Pushes an event, blocking while the queue is full.
    ///
    /// Returns `true` on acceptance, `false` if the queue is (or becomes)
    /// closed while waiting.
    pub fn push(&self, event: Event) -> bool {
        let mut ring = self.ring.lock();
        if ring.len == self.capacity && !ring.closed {
            ring.push_blocked_count += 1;
            while ring.len == self.capacity && !ring.closed {
                self.not_full.wait(&mut ring);
            }
        }
        if ring.closed {
            return false;
        }
        self.enqueue(&mut ring, event);
        drop(ring);
        self.not_empty.notify_one();
        true
    }

    /// Pushes an event without blocking.
    ///
    /// Returns `false` if the queue is full or closed.
    pub fn try_push(&self, event: Event) -> bool {
        let mut ring = self.ring.lock();
        if ring.len == self.capacity || ring.closed {
            return false;
        }
        self.enqueue(&mut ring, event);
        drop(ring);
        self.not_empty.notify_one();
        true
    }

    /// Pushes an event, blocking up to `timeout` while the queue is full.
    ///
    /// Returns `false` on timeout or closure.
    pub fn push_for(&self, event: Event, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut ring = self.ring.lock();
        if ring.len == self.capacity && !ring.closed {
            ring.push_blocked_count += 1;
            while ring.len == self.capacity && !ring.closed {
                if self.not_full.wait_until(&mut ring, deadline).timed_out() {
                    return false;
                }
            }
        }
        if ring.closed {
            return false;
        }
        self.enqueue(&mut ring, event);
        drop(ring);
        self.not_empty.notify_one();
        true
    }

    /// Pops the oldest event, blocking while the queue is empty and open.
    ///
    /// Returns `None` only once the queue is closed and fully drained.
    pub fn pop(&self) -> Option<Event> {
        let mut ring = self.ring.lock();
        if ring.len == 0 && !ring.closed {
            ring.pop_blocked_count += 1;
            while ring.len == 0 && !ring.closed {
                self.not_empty.wait(&mut ring);
            }
        }
        if ring.len == 0 {
            return None;
        }
        let event = self.dequeue(&mut ring);
        drop(ring);
        self.not_full.notify_one();
        event
    }

    /// Pops the oldest event without blocking.
    pub fn try_pop(&self) -> Option<Event> {
        let mut ring = self.ring.lock();
        if ring.len == 0 {
            return None;
        }
        let event = self.dequeue(&mut ring);
        drop(ring);
        self.not_full.notify_one();
        event
    }

    /// Pops the oldest event, blocking up to `timeout` while the queue is
    /// empty and open.
    ///
    /// Returns `None` on timeout, or on closed-and-drained.
    pub fn pop_for(&self, timeout: Duration) -> Option<Event> {
        let deadline = Instant::now() + timeout;
        let mut ring = self.ring.lock();
        if ring.len == 0 && !ring.closed {
            ring.pop_blocked_count += 1;
            while ring.len == 0 && !ring.closed {
                if self.not_empty.wait_until(&mut ring, deadline).timed_out() {
                    return None;
                }
            }
        }
        if ring.len == 0 {
            return None;
        }
        let event = self.dequeue(&mut ring);
        drop(ring);
        self.not_full.notify_one();
        event
    }

    /// Closes the queue. Idempotent.
    ///
    /// Blocked pushers wake and return `false`; blocked poppers wake and
    /// drain the remaining items before observing `None`.
    pub fn close(&self) {
        {
            let mut ring = self.ring.lock();
            ring.closed = true;
        }
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    /// Returns `true` if the queue has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.ring.lock().closed
    }

    /// Returns the current number of queued events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.lock().len
    }

    /// Returns `true` if the queue holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.lock().len == 0
    }

    /// Returns `true` if the queue is at capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.ring.lock().len == self.capacity
    }

    /// Returns the fixed capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns a consistent snapshot of the queue counters.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        let ring = self.ring.lock();
        QueueStats {
            push_count: ring.push_count,
            pop_count: ring.pop_count,
            push_blocked_count: ring.push_blocked_count,
            pop_blocked_count: ring.pop_blocked_count,
            current_size: ring.len,
            high_watermark: ring.high_watermark,
            capacity: self.capacity,
        }
    }

    fn enqueue(&self, ring: &mut Ring, event: Event) {
        let tail = ring.tail;
        ring.buf[tail] = Some(event);
        ring.tail = (tail + 1) & self.mask;
        ring.len += 1;
        ring.push_count += 1;
        if ring.len > ring.high_watermark {
            ring.high_watermark = ring.len;
        }
    }

    fn dequeue(&self, ring: &mut Ring) -> Option<Event> {
        let head = ring.head;
        let event = ring.buf[head].take();
        debug_assert!(event.is_some(), "ring slot empty below len");
        ring.head = (head + 1) & self.mask;
        ring.len -= 1;
        ring.pop_count += 1;
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    // --- Basic push/pop tests ---

    #[test]
    fn test_push_pop_round_trip() {
        let queue = BoundedQueue::new(64);
        assert!(queue.push(Event::new(42i64)));
        let event = queue.pop().expect("event expected");
        assert_eq!(event.as_int(), Some(42));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_capacity_rounds_to_power_of_two() {
        assert_eq!(BoundedQueue::new(100).capacity(), 128);
        assert_eq!(BoundedQueue::new(4).capacity(), 4);
        assert_eq!(BoundedQueue::new(0).capacity(), 2);
    }

    #[test]
    fn test_fifo_order() {
        let queue = BoundedQueue::new(16);
        for i in 0..10i64 {
            assert!(queue.push(Event::new(i)));
        }
        for i in 0..10i64 {
            assert_eq!(queue.pop().and_then(|e| e.as_int()), Some(i));
        }
    }

    #[test]
    fn test_try_push_full_queue_fails() {
        let queue = BoundedQueue::new(4);
        for i in 0..4i64 {
            assert!(queue.try_push(Event::new(i)));
        }
        assert!(!queue.try_push(Event::new(99i64)));
        assert_eq!(queue.len(), 4);
        assert!(queue.is_full());
    }

    #[test]
    fn test_try_pop_empty_queue() {
        let queue = BoundedQueue::new(4);
        assert!(queue.try_pop().is_none());
    }

    // --- Close semantics ---

    #[test]
    fn test_close_drains_then_ends() {
        let queue = BoundedQueue::new(8);
        assert!(queue.push(Event::new(1i64)));
        assert!(queue.push(Event::new(2i64)));
        queue.close();
        assert!(!queue.push(Event::new(3i64)));
        assert_eq!(queue.pop().and_then(|e| e.as_int()), Some(1));
        assert_eq!(queue.pop().and_then(|e| e.as_int()), Some(2));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_close_is_idempotent() {
        let queue = BoundedQueue::new(8);
        queue.push(Event::new(1i64));
        queue.close();
        queue.close();
        assert!(queue.is_closed());
        assert_eq!(queue.pop().and_then(|e| e.as_int()), Some(1));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_close_wakes_blocked_popper() {
        let queue = Arc::new(BoundedQueue::new(4));
        let q = Arc::clone(&queue);
        let popper = thread::spawn(move || q.pop());
        thread::sleep(Duration::from_millis(20));
        queue.close();
        assert!(popper.join().unwrap().is_none());
    }

    #[test]
    fn test_close_wakes_blocked_pusher() {
        let queue = Arc::new(BoundedQueue::new(2));
        assert!(queue.push(Event::new(0i64)));
        assert!(queue.push(Event::new(1i64)));
        let q = Arc::clone(&queue);
        let pusher = thread::spawn(move || q.push(Event::new(2i64)));
        thread::sleep(Duration::from_millis(20));
        queue.close();
        assert!(!pusher.join().unwrap());
    }

    // --- Timed variants ---

    #[test]
    fn test_pop_for_times_out_on_empty() {
        let queue = BoundedQueue::new(4);
        let start = Instant::now();
        assert!(queue.pop_for(Duration::from_millis(30)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_push_for_times_out_on_full() {
        let queue = BoundedQueue::new(2);
        assert!(queue.push(Event::new(0i64)));
        assert!(queue.push(Event::new(1i64)));
        assert!(!queue.push_for(Event::new(2i64), Duration::from_millis(30)));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_push_for_succeeds_when_space_opens() {
        let queue = Arc::new(BoundedQueue::new(2));
        assert!(queue.push(Event::new(0i64)));
        assert!(queue.push(Event::new(1i64)));
        let q = Arc::clone(&queue);
        let helper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            q.pop()
        });
        assert!(queue.push_for(Event::new(2i64), Duration::from_millis(500)));
        assert!(helper.join().unwrap().is_some());
    }

    // --- Blocking handoff ---

    #[test]
    fn test_blocking_pop_receives_later_push() {
        let queue = Arc::new(BoundedQueue::new(4));
        let q = Arc::clone(&queue);
        let popper = thread::spawn(move || q.pop());
        thread::sleep(Duration::from_millis(20));
        assert!(queue.push(Event::new(7i64)));
        assert_eq!(popper.join().unwrap().and_then(|e| e.as_int()), Some(7));
    }

    // --- Stats ---

    #[test]
    fn test_stats_counts_and_watermark() {
        let queue = BoundedQueue::new(8);
        for i in 0..5i64 {
            queue.push(Event::new(i));
        }
        queue.pop();
        queue.pop();
        let stats = queue.stats();
        assert_eq!(stats.push_count, 5);
        assert_eq!(stats.pop_count, 2);
        assert_eq!(stats.current_size, 3);
        assert_eq!(stats.high_watermark, 5);
        assert_eq!(stats.capacity, 8);
    }

    #[test]
    fn test_stats_blocked_counts() {
        let queue = Arc::new(BoundedQueue::new(2));
        queue.push(Event::new(0i64));
        queue.push(Event::new(1i64));
        let q = Arc::clone(&queue);
        let pusher = thread::spawn(move || q.push(Event::new(2i64)));
        thread::sleep(Duration::from_millis(20));
        queue.pop();
        assert!(pusher.join().unwrap());
        let stats = queue.stats();
        assert!(stats.push_blocked_count >= 1);
    }

    // --- Contention ---

    #[test]
    fn test_mpmc_contention_preserves_bound_and_count() {
        const PRODUCERS: usize = 4;
        const CONSUMERS: usize = 4;
        const PER_PRODUCER: usize = 500;

        let queue = Arc::new(BoundedQueue::new(16));
        let mut handles = Vec::new();

        for p in 0..PRODUCERS {
            let q = Arc::clone(&queue);
            handles.push(thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    assert!(q.push(Event::new((p * PER_PRODUCER + i) as i64)));
                    assert!(q.len() <= q.capacity());
                }
            }));
        }

        let mut consumers = Vec::new();
        for _ in 0..CONSUMERS {
            let q = Arc::clone(&queue);
            consumers.push(thread::spawn(move || {
                let mut seen = 0u64;
                while q.pop().is_some() {
                    seen += 1;
                }
                seen
            }));
        }

        for h in handles {
            h.join().unwrap();
        }
        queue.close();
        let total: u64 = consumers.into_iter().map(|c| c.join().unwrap()).sum();
        assert_eq!(total, (PRODUCERS * PER_PRODUCER) as u64);
    }

    #[test]
    fn test_single_producer_consumer_fifo_under_threads() {
        let queue = Arc::new(BoundedQueue::new(8));
        let q = Arc::clone(&queue);
        let producer = thread::spawn(move || {
            for i in 0..1000i64 {
                assert!(q.push(Event::new(i)));
            }
            q.close();
        });
        let mut expected = 0i64;
        while let Some(event) = queue.pop() {
            assert_eq!(event.as_int(), Some(expected));
            expected += 1;
        }
        assert_eq!(expected, 1000);
        producer.join().unwrap();
    }
}
