//! Byte ring queue over a shared byte store and control block
//!
//! ## Synchronization
//!
//! Every `put`, `get` and `status` holds the cross-process
//! [`ControlLock`](crate::lock::ControlLock) for its whole duration, so the
//! head/tail/has-data cells always change together as seen by another
//! queue handle. Inside the lock the payload is copied first and the
//! cursors are published afterwards with `Release` stores, so a lock-free
//! observer never sees a cursor ahead of its data.
//!
//! The lock is held for one bounded copy and never while waiting for the
//! peer: a `put` on a full queue or a `get` on an empty one returns an error
//! immediately.

use crate::control::{ControlBlock, ControlSnapshot, QueueState};
use crate::error::{GetError, PutError, ShmError, ShmResult};
use crate::lifecycle::{CreationRollback, unlink_regions};
use crate::naming::QueueNames;
use crate::platform::get_current_pid;
use crate::region::SharedRegion;
use rawq::consts::{CELL_SIZE, FLAG_SIZE, SHM_MAX_SIZE};
use serde::Serialize;
use std::cell::Cell;
use std::marker::PhantomData;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// How long `open_or_create` waits for a concurrent creator to finish
pub const OPEN_RETRY_TIMEOUT: Duration = Duration::from_secs(1);

const OPEN_RETRY_BACKOFF_MIN: Duration = Duration::from_micros(100);
const OPEN_RETRY_BACKOFF_MAX: Duration = Duration::from_millis(10);

/// Consistent view of a queue taken under the control lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    /// Base name
    pub name: String,
    /// Ring capacity in bytes
    pub capacity: usize,
    /// Next write offset
    pub head: usize,
    /// Next read offset
    pub tail: usize,
    /// Has-data flag
    pub has_data: bool,
    /// Unread bytes
    pub used: usize,
    /// Free bytes
    pub free: usize,
    /// Occupancy classification
    pub state: QueueState,
    /// Whether this handle created (and will unlink) the regions
    pub owner: bool,
}

/// Single-producer / single-consumer byte ring queue in shared memory
///
/// The producer and the consumer each hold their own handle. A handle is
/// `Send` but not `Sync`: the control lock is per open descriptor, so one
/// handle must not be used from two threads at once.
///
/// Dropping the handle releases it; [`RingQueue::release`] does the same
/// but reports unlink failures.
#[derive(Debug)]
pub struct RingQueue {
    names: QueueNames,
    store: SharedRegion,
    control: ControlBlock,
    capacity: usize,
    owner: bool,
    released: bool,
    _not_sync: PhantomData<Cell<()>>,
}

fn validate_capacity(capacity: usize) -> ShmResult<()> {
    if capacity == 0 || capacity > SHM_MAX_SIZE {
        return Err(ShmError::InvalidCapacity {
            capacity,
            max: SHM_MAX_SIZE,
        });
    }
    Ok(())
}

impl RingQueue {
    /// Create the queue, or attach to it if its byte store already exists
    ///
    /// On the attach path the stored capacity must equal `capacity`. A
    /// creator racing this call may not have finished its regions yet, so
    /// `NotFound` and `NotInitialized` are retried for up to
    /// [`OPEN_RETRY_TIMEOUT`] before being returned.
    pub fn open_or_create(name: &str, capacity: usize) -> ShmResult<Self> {
        let names = QueueNames::new(name)?;
        let deadline = Instant::now() + OPEN_RETRY_TIMEOUT;
        let mut backoff = OPEN_RETRY_BACKOFF_MIN;

        loop {
            let attached = match Self::create(name, capacity) {
                Err(ShmError::AlreadyExists { name: region }) if region == names.store => {
                    Self::attach(name)
                }
                other => return other,
            };

            match attached {
                Ok(queue) if queue.capacity != capacity => {
                    return Err(ShmError::CapacityMismatch {
                        name: name.to_string(),
                        actual: queue.capacity,
                        requested: capacity,
                    });
                }
                Ok(queue) => return Ok(queue),
                // Creator still building the regions, or it rolled back and
                // the next create will succeed.
                Err(ShmError::NotFound { .. } | ShmError::NotInitialized { .. })
                    if Instant::now() < deadline =>
                {
                    debug!(queue = name, ?backoff, "queue not ready, retrying open");
                    std::thread::sleep(backoff);
                    backoff = (backoff * 2).min(OPEN_RETRY_BACKOFF_MAX);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Create all five regions and become their owner
    ///
    /// Fails with `AlreadyExists` if any region name is taken; regions
    /// created before the failure are unlinked again.
    pub fn create(name: &str, capacity: usize) -> ShmResult<Self> {
        validate_capacity(capacity)?;
        let names = QueueNames::new(name)?;
        let mut rollback = CreationRollback::new();

        let store = SharedRegion::create(&names.store, capacity)?;
        rollback.push(&names.store);
        let head = SharedRegion::create(&names.head, CELL_SIZE)?;
        rollback.push(&names.head);
        let tail = SharedRegion::create(&names.tail, CELL_SIZE)?;
        rollback.push(&names.tail);
        let has_data = SharedRegion::create(&names.has_data, FLAG_SIZE)?;
        rollback.push(&names.has_data);
        let len = SharedRegion::create(&names.len, CELL_SIZE)?;
        rollback.push(&names.len);

        let control = ControlBlock::from_regions(len, head, tail, has_data)?;
        control.initialize(capacity as u64);
        rollback.disarm();

        info!(
            queue = name,
            capacity,
            pid = get_current_pid(),
            "created shared memory queue"
        );

        Ok(Self {
            names,
            store,
            control,
            capacity,
            owner: true,
            released: false,
            _not_sync: PhantomData,
        })
    }

    /// Attach to an existing queue without taking ownership
    pub fn attach(name: &str) -> ShmResult<Self> {
        let names = QueueNames::new(name)?;

        let len = SharedRegion::open(&names.len)?;
        let head = SharedRegion::open(&names.head)?;
        let tail = SharedRegion::open(&names.tail)?;
        let has_data = SharedRegion::open(&names.has_data)?;
        let control = ControlBlock::from_regions(len, head, tail, has_data)?;

        let capacity = control.capacity() as usize;
        if capacity == 0 {
            return Err(ShmError::NotInitialized {
                name: name.to_string(),
            });
        }

        let store = SharedRegion::open(&names.store)?;
        if store.len() != capacity {
            return Err(ShmError::NotInitialized {
                name: name.to_string(),
            });
        }

        info!(
            queue = name,
            capacity,
            pid = get_current_pid(),
            "attached to shared memory queue"
        );

        Ok(Self {
            names,
            store,
            control,
            capacity,
            owner: false,
            released: false,
            _not_sync: PhantomData,
        })
    }

    /// Append `data` to the ring
    ///
    /// All-or-nothing: on error no cursor, flag or payload byte changes.
    pub fn put(&mut self, data: &[u8]) -> Result<(), PutError> {
        let capacity = self.capacity;
        let len = data.len();
        if len > capacity {
            return Err(PutError::ItemTooLarge { len, capacity });
        }

        let _lock = self.control.lock().map_err(|source| PutError::Lock { source })?;
        let cursors = self.cursors();
        if cursors.state() == QueueState::Full {
            return Err(PutError::QueueFull);
        }
        if len == 0 {
            return Ok(());
        }

        let head = cursors.head as usize;
        let tail = cursors.tail as usize;

        let new_head = if tail <= head {
            let to_end = capacity - head;
            if len <= to_end {
                self.write_store(head, data);
                (head + len) % capacity
            } else if len <= to_end + tail {
                let (first, second) = data.split_at(to_end);
                self.write_store(head, first);
                self.write_store(0, second);
                second.len()
            } else {
                return Err(PutError::InsufficientSpace {
                    len,
                    free: to_end + tail,
                });
            }
        } else {
            let gap = tail - head;
            if len > gap {
                return Err(PutError::InsufficientSpace { len, free: gap });
            }
            self.write_store(head, data);
            head + len
        };

        self.control.set_head(new_head as u64);
        self.control.set_has_data(true);

        trace!(queue = self.names.base(), len, head = new_head, tail, "put");
        Ok(())
    }

    /// Remove exactly `length` bytes from the ring, oldest first
    ///
    /// All-or-nothing: fails rather than returning a short read.
    pub fn get(&mut self, length: usize) -> Result<Vec<u8>, GetError> {
        let capacity = self.capacity;

        let _lock = self.control.lock().map_err(|source| GetError::Lock { source })?;
        let cursors = self.cursors();
        if !cursors.has_data {
            return Err(GetError::QueueEmpty);
        }

        let available = cursors.used() as usize;
        if length > available {
            return Err(GetError::InsufficientData {
                requested: length,
                available,
            });
        }
        if length == 0 {
            return Ok(Vec::new());
        }

        let head = cursors.head as usize;
        let tail = cursors.tail as usize;
        let mut out = Vec::with_capacity(length);

        let to_end = capacity - tail;
        let new_tail = if length <= to_end {
            self.read_store(tail, length, &mut out);
            (tail + length) % capacity
        } else {
            let rest = length - to_end;
            self.read_store(tail, to_end, &mut out);
            self.read_store(0, rest, &mut out);
            rest
        };

        self.control.set_tail(new_tail as u64);
        if new_tail == head {
            self.control.set_has_data(false);
        }

        trace!(queue = self.names.base(), length, head, tail = new_tail, "get");
        Ok(out)
    }

    /// Locked snapshot of the queue state
    pub fn status(&self) -> ShmResult<QueueStatus> {
        let _lock = self.control.lock()?;
        let cursors = self.cursors();
        Ok(QueueStatus {
            name: self.names.base().to_string(),
            capacity: self.capacity,
            head: cursors.head as usize,
            tail: cursors.tail as usize,
            has_data: cursors.has_data,
            used: cursors.used() as usize,
            free: cursors.free() as usize,
            state: cursors.state(),
            owner: self.owner,
        })
    }

    /// Unread bytes (lock-free, advisory while the peer is active)
    pub fn len(&self) -> usize {
        self.cursors().used() as usize
    }

    /// Free bytes (lock-free, advisory while the peer is active)
    pub fn free_space(&self) -> usize {
        self.cursors().free() as usize
    }

    /// Whether the queue currently holds no data
    pub fn is_empty(&self) -> bool {
        self.cursors().state() == QueueState::Empty
    }

    /// Whether the queue currently has no free space
    pub fn is_full(&self) -> bool {
        self.cursors().state() == QueueState::Full
    }

    /// Ring capacity in bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Base name
    pub fn name(&self) -> &str {
        self.names.base()
    }

    /// Whether this handle created the regions
    pub fn is_owner(&self) -> bool {
        self.owner
    }

    /// Direct access to the control cells
    pub fn control(&self) -> &ControlBlock {
        &self.control
    }

    /// Detach, and for the owner unlink all five regions
    ///
    /// Consuming `self` makes a second release or a use after release a
    /// compile error. Dropping a handle without calling this performs the
    /// same teardown.
    pub fn release(mut self) -> ShmResult<()> {
        self.teardown()
    }

    fn teardown(&mut self) -> ShmResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        if !self.owner {
            debug!(queue = self.names.base(), "detached from shared memory queue");
            return Ok(());
        }

        let removed = unlink_regions(&self.names)?;
        info!(queue = self.names.base(), removed, "released shared memory queue");
        Ok(())
    }

    /// Cursors reduced modulo capacity so a scribbled cell can never yield
    /// an out-of-range offset
    fn cursors(&self) -> ControlSnapshot {
        let capacity = self.capacity as u64;
        ControlSnapshot {
            capacity,
            head: self.control.head() % capacity,
            tail: self.control.tail() % capacity,
            has_data: self.control.has_data(),
        }
    }

    fn write_store(&self, offset: usize, src: &[u8]) {
        debug_assert!(offset + src.len() <= self.capacity);
        unsafe {
            std::ptr::copy_nonoverlapping(src.as_ptr(), self.store.as_ptr().add(offset), src.len());
        }
    }

    fn read_store(&self, offset: usize, len: usize, out: &mut Vec<u8>) {
        debug_assert!(offset + len <= self.capacity);
        let start = out.len();
        out.reserve(len);
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.store.as_ptr().add(offset),
                out.as_mut_ptr().add(start),
                len,
            );
            out.set_len(start + len);
        }
    }
}

impl Drop for RingQueue {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            warn!(queue = self.names.base(), error = %e, "queue teardown failed");
        }
    }
}
