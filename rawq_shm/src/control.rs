//! Control block: the four shared scalar cells describing queue state
//!
//! Each cell lives in its own shm object (see [`crate::naming`]) and is
//! accessed as a single atomic load or store, so a peer never observes a
//! half-written cursor. Loads use `Acquire` and stores use `Release`.
//!
//! The cells are independent: nothing here makes a change to two cells
//! appear atomic. [`RingQueue`](crate::RingQueue) holds the
//! [`ControlLock`] across each composite update.

use crate::error::{ShmError, ShmResult};
use crate::lock::ControlLock;
use crate::region::SharedRegion;
use rawq::consts::{CELL_SIZE, FLAG_SIZE};
use serde::Serialize;
use static_assertions::const_assert_eq;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

const_assert_eq!(core::mem::size_of::<AtomicU64>(), CELL_SIZE);
const_assert_eq!(core::mem::size_of::<AtomicBool>(), FLAG_SIZE);

/// Logical occupancy of a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueState {
    /// `head == tail`, no data
    Empty,
    /// Some bytes stored, some free
    Partial,
    /// `head == tail` with data: zero bytes free
    Full,
}

/// Plain copy of the control cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlSnapshot {
    /// Ring capacity in bytes
    pub capacity: u64,
    /// Next write offset
    pub head: u64,
    /// Next read offset
    pub tail: u64,
    /// Disambiguates `head == tail`
    pub has_data: bool,
}

impl ControlSnapshot {
    /// Number of unread bytes
    pub fn used(&self) -> u64 {
        if self.capacity == 0 {
            return 0;
        }
        // Cells read without the lock may hold anything; stay in range.
        let head = self.head % self.capacity;
        let tail = self.tail % self.capacity;
        if head == tail {
            if self.has_data { self.capacity } else { 0 }
        } else {
            (head + self.capacity - tail) % self.capacity
        }
    }

    /// Number of bytes a `put` could still add
    pub fn free(&self) -> u64 {
        self.capacity - self.used()
    }

    /// Empty / partial / full classification
    pub fn state(&self) -> QueueState {
        let wrapped = match self.capacity {
            0 => self.head == self.tail,
            capacity => self.head % capacity == self.tail % capacity,
        };
        match (wrapped, self.has_data) {
            (true, true) => QueueState::Full,
            (true, false) => QueueState::Empty,
            _ => QueueState::Partial,
        }
    }
}

/// Mapped capacity, head, tail and has-data cells
#[derive(Debug)]
pub struct ControlBlock {
    len: SharedRegion,
    head: SharedRegion,
    tail: SharedRegion,
    has_data: SharedRegion,
}

impl ControlBlock {
    /// Wrap the four mapped cells, checking each is large enough
    pub fn from_regions(
        len: SharedRegion,
        head: SharedRegion,
        tail: SharedRegion,
        has_data: SharedRegion,
    ) -> ShmResult<Self> {
        for (region, size) in [
            (&len, CELL_SIZE),
            (&head, CELL_SIZE),
            (&tail, CELL_SIZE),
            (&has_data, FLAG_SIZE),
        ] {
            if region.len() < size {
                return Err(ShmError::NotInitialized {
                    name: region.name().to_string(),
                });
            }
        }

        Ok(Self {
            len,
            head,
            tail,
            has_data,
        })
    }

    fn u64_cell(region: &SharedRegion) -> &AtomicU64 {
        // Mappings are page aligned and at least CELL_SIZE long.
        unsafe { &*(region.as_ptr() as *const AtomicU64) }
    }

    fn flag_cell(&self) -> &AtomicBool {
        unsafe { &*(self.has_data.as_ptr() as *const AtomicBool) }
    }

    /// Zero the cursors, clear has-data, then publish the capacity
    ///
    /// Capacity goes last: attachers treat a zero capacity as "creator
    /// still initializing".
    pub(crate) fn initialize(&self, capacity: u64) {
        self.set_head(0);
        self.set_tail(0);
        self.set_has_data(false);
        Self::u64_cell(&self.len).store(capacity, Ordering::Release);
    }

    /// Capacity cell. Written once by the creator, never mutated afterwards.
    pub fn capacity(&self) -> u64 {
        Self::u64_cell(&self.len).load(Ordering::Acquire)
    }

    /// Head (next write offset)
    pub fn head(&self) -> u64 {
        Self::u64_cell(&self.head).load(Ordering::Acquire)
    }

    /// Publish a new head
    pub fn set_head(&self, value: u64) {
        Self::u64_cell(&self.head).store(value, Ordering::Release);
    }

    /// Tail (next read offset)
    pub fn tail(&self) -> u64 {
        Self::u64_cell(&self.tail).load(Ordering::Acquire)
    }

    /// Publish a new tail
    pub fn set_tail(&self, value: u64) {
        Self::u64_cell(&self.tail).store(value, Ordering::Release);
    }

    /// Has-data flag
    pub fn has_data(&self) -> bool {
        self.flag_cell().load(Ordering::Acquire)
    }

    /// Publish the has-data flag
    pub fn set_has_data(&self, value: bool) {
        self.flag_cell().store(value, Ordering::Release);
    }

    /// Read all four cells without locking
    ///
    /// Each value is untorn, but the combination may be transiently
    /// inconsistent while a peer is mid-update.
    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            capacity: self.capacity(),
            head: self.head(),
            tail: self.tail(),
            has_data: self.has_data(),
        }
    }

    /// Take the cross-process lock guarding composite updates
    pub fn lock(&self) -> io::Result<ControlLock<'_>> {
        ControlLock::acquire(self.len.file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(capacity: u64, head: u64, tail: u64, has_data: bool) -> ControlSnapshot {
        ControlSnapshot {
            capacity,
            head,
            tail,
            has_data,
        }
    }

    #[test]
    fn test_used_and_free() {
        assert_eq!(snap(10, 0, 0, false).used(), 0);
        assert_eq!(snap(10, 4, 4, true).used(), 10);
        assert_eq!(snap(10, 7, 2, true).used(), 5);
        assert_eq!(snap(10, 2, 7, true).used(), 5);
        assert_eq!(snap(10, 2, 7, true).free(), 5);
        assert_eq!(snap(10, 3, 3, true).free(), 0);
    }

    #[test]
    fn test_state_classification() {
        assert_eq!(snap(10, 5, 5, false).state(), QueueState::Empty);
        assert_eq!(snap(10, 5, 5, true).state(), QueueState::Full);
        assert_eq!(snap(10, 6, 5, true).state(), QueueState::Partial);
    }

    #[test]
    fn test_out_of_range_cursors_stay_in_range() {
        let scribbled = snap(10, 0, 15, true);
        assert_eq!(scribbled.used(), 5);
        assert_eq!(scribbled.free(), 5);
        assert_eq!(scribbled.state(), QueueState::Partial);

        let aliased = snap(10, 23, 3, true);
        assert_eq!(aliased.used(), 10);
        assert_eq!(aliased.state(), QueueState::Full);

        assert_eq!(snap(10, u64::MAX, 0, false).used(), 5);
    }
}
