//! Fixed pool of period buffers shared by the generator and drain threads.

use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Observer, Producer};
use ringbuf::HeapRb;

use super::semaphore::Semaphore;

/// One period buffer, owned by whichever side currently holds it.
///
/// Slots move by value: the pool while free or queued, the generator between
/// acquire and enqueue, the drain loop between dequeue and release. Payload
/// bytes are never shared.
#[derive(Debug)]
pub(crate) struct Slot {
    index: usize,
    data: Vec<u8>,
}

impl Slot {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// A slot taken off the filled queue.
#[derive(Debug)]
pub(crate) struct Dequeued {
    pub slot: Slot,
    /// No further slots will follow.
    pub last: bool,
}

/// Where the pool's slots are at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Occupancy {
    /// Ready to be acquired.
    pub free: usize,
    /// Filled and waiting to be written.
    pub queued: usize,
    /// Held by the generator or the drain loop.
    pub in_flight: usize,
}

struct PoolState {
    free: HeapRb<Slot>,
    filled: HeapRb<Slot>,
    finished: bool,
    closed: bool,
}

/// Bounded buffer coordinating one producer and one consumer.
///
/// `empty` counts free slots and throttles the generator; `full` counts
/// queued slots and parks the drain loop. The lock guards only the free list,
/// the filled queue and the termination flags, never a fill or a write.
pub(crate) struct BufferPool {
    state: Mutex<PoolState>,
    empty: Semaphore,
    full: Semaphore,
    capacity: usize,
    slot_bytes: usize,
}

impl BufferPool {
    /// Allocates `capacity` zeroed slots of `slot_bytes` each.
    pub fn new(capacity: usize, slot_bytes: usize) -> Self {
        let mut free = HeapRb::new(capacity);
        for index in 0..capacity {
            let pushed = free.try_push(Slot {
                index,
                data: vec![0; slot_bytes],
            });
            debug_assert!(pushed.is_ok());
        }

        Self {
            state: Mutex::new(PoolState {
                free,
                filled: HeapRb::new(capacity),
                finished: false,
                closed: false,
            }),
            empty: Semaphore::new(capacity),
            full: Semaphore::new(0),
            capacity,
            slot_bytes,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn slot_bytes(&self) -> usize {
        self.slot_bytes
    }

    /// Blocks until a slot is free and takes it, zeroed.
    ///
    /// Returns `None` once the pool has been closed.
    pub fn acquire_free_slot(&self) -> Option<Slot> {
        self.empty.acquire();
        let mut slot = {
            let mut state = self.state.lock();
            if state.closed {
                return None;
            }
            // A permit from `empty` guarantees a free slot
            state.free.try_pop()?
        };
        slot.data.fill(0);
        Some(slot)
    }

    /// Appends a filled slot to the write queue.
    ///
    /// `last` marks the end of the stream; it is recorded in the same
    /// critical section as the push so the drain side can never observe the
    /// flag without the final slot.
    pub fn enqueue_filled(&self, slot: Slot, last: bool) {
        {
            let mut state = self.state.lock();
            if last {
                state.finished = true;
            }
            let pushed = state.filled.try_push(slot);
            debug_assert!(pushed.is_ok(), "filled queue overflow");
        }
        self.full.release(1);
    }

    /// Blocks until a filled slot is queued and takes the oldest one.
    ///
    /// Returns `None` once the pool has been closed and the queue is empty.
    pub fn dequeue_filled(&self) -> Option<Dequeued> {
        self.full.acquire();
        let mut state = self.state.lock();
        let slot = state.filled.try_pop()?;
        let last = state.finished && state.filled.is_empty();
        Some(Dequeued { slot, last })
    }

    /// Returns a written slot to the free list.
    pub fn release_slot(&self, slot: Slot) {
        {
            let mut state = self.state.lock();
            let pushed = state.free.try_push(slot);
            debug_assert!(pushed.is_ok(), "free list overflow");
        }
        self.empty.release(1);
    }

    /// Wakes both sides for shutdown after one of them has died.
    ///
    /// Blocked and future acquires return `None`; dequeues keep returning
    /// queued slots, then `None`.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.empty.release(self.capacity);
        self.full.release(self.capacity);
    }

    /// Returns `true` once the final slot has been enqueued.
    pub fn is_finished(&self) -> bool {
        self.state.lock().finished
    }

    pub fn occupancy(&self) -> Occupancy {
        let state = self.state.lock();
        let free = state.free.occupied_len();
        let queued = state.filled.occupied_len();
        Occupancy {
            free,
            queued,
            in_flight: self.capacity - free - queued,
        }
    }
}

/// Closes the pool if the owning thread unwinds, so the other side is never
/// left blocked on a slot that will not arrive.
pub(crate) struct CloseOnUnwind<'a>(pub &'a BufferPool);

impl Drop for CloseOnUnwind<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::debug!("Pipeline thread unwinding, closing buffer pool");
            self.0.close();
        }
    }
}
