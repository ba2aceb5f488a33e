//! Error types for shared memory queue operations

use thiserror::Error;

/// Errors that can occur while creating, attaching to, or releasing a queue
#[derive(Error, Debug)]
pub enum ShmError {
    /// Region already exists
    #[error("Shared memory region already exists: {name}")]
    AlreadyExists {
        /// Region name
        name: String,
    },

    /// Region not found
    #[error("Shared memory region not found: {name}")]
    NotFound {
        /// Region name
        name: String,
    },

    /// Base name cannot be used to derive the five region names
    #[error("Invalid queue name '{name}': {reason}")]
    InvalidName {
        /// Offending base name
        name: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Capacity outside the supported range
    #[error("Invalid queue capacity: {capacity} bytes (must be 1..={max})")]
    InvalidCapacity {
        /// Requested capacity
        capacity: usize,
        /// Largest supported capacity
        max: usize,
    },

    /// Attached queue has a different capacity than requested
    #[error("Queue '{name}' has capacity {actual}, requested {requested}")]
    CapacityMismatch {
        /// Queue base name
        name: String,
        /// Capacity stored in the control block
        actual: usize,
        /// Capacity the caller asked for
        requested: usize,
    },

    /// Regions exist but the creator has not finished initializing them
    #[error("Queue '{name}' is not initialized yet")]
    NotInitialized {
        /// Queue base name
        name: String,
    },

    /// Permission denied
    #[error("Permission denied accessing region: {name}")]
    PermissionDenied {
        /// Region name
        name: String,
    },

    /// IO error
    #[error("IO error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },

    /// Nix system call error
    #[error("System call error: {source}")]
    Nix {
        /// Source nix error
        #[from]
        source: nix::Error,
    },
}

/// Result type for shared memory lifecycle operations
pub type ShmResult<T> = Result<T, ShmError>;

/// Errors returned by [`RingQueue::put`](crate::RingQueue::put)
#[derive(Error, Debug)]
pub enum PutError {
    /// Item is longer than the whole ring; retrying unchanged never succeeds
    #[error("Item of {len} bytes exceeds queue capacity of {capacity} bytes")]
    ItemTooLarge {
        /// Item length
        len: usize,
        /// Queue capacity
        capacity: usize,
    },

    /// No free space at all
    #[error("Queue is full")]
    QueueFull,

    /// Item fits the capacity but not the space currently free
    #[error("Not enough space in queue: item of {len} bytes, {free} bytes free")]
    InsufficientSpace {
        /// Item length
        len: usize,
        /// Free bytes at the time of the call
        free: usize,
    },

    /// Cross-process control lock could not be taken
    #[error("Failed to lock queue control block: {source}")]
    Lock {
        /// Source IO error
        source: std::io::Error,
    },
}

impl PutError {
    /// Whether the same call may succeed later once the consumer makes room
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::QueueFull | Self::InsufficientSpace { .. })
    }
}

/// Errors returned by [`RingQueue::get`](crate::RingQueue::get)
#[derive(Error, Debug)]
pub enum GetError {
    /// No data in queue
    #[error("Queue is empty")]
    QueueEmpty,

    /// Fewer bytes available than requested
    #[error("Not enough data in queue: requested {requested} bytes, {available} available")]
    InsufficientData {
        /// Requested length
        requested: usize,
        /// Bytes available at the time of the call
        available: usize,
    },

    /// Cross-process control lock could not be taken
    #[error("Failed to lock queue control block: {source}")]
    Lock {
        /// Source IO error
        source: std::io::Error,
    },
}

impl GetError {
    /// Whether the same call may succeed later once the producer adds data
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::QueueEmpty | Self::InsufficientData { .. })
    }
}
