//! # rawq Shared Memory Ring Queue
//!
//! A fixed-capacity byte ring buffer whose payload and bookkeeping live in
//! POSIX shared memory, so one producer process and one consumer process can
//! exchange a byte stream without a kernel round trip per operation.
//!
//! ## Layout
//!
//! A queue named `<base>` is five shm objects:
//!
//! ```text
//! /dev/shm/<base>            capacity bytes   ring payload
//! /dev/shm/<base>_len        8 bytes          capacity (u64)
//! /dev/shm/<base>_head       8 bytes          next write offset (u64)
//! /dev/shm/<base>_tail       8 bytes          next read offset (u64)
//! /dev/shm/<base>_has_data   1 byte           disambiguates head == tail
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use rawq_shm::{GetError, RingQueue};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let name = format!("doc_example_{}", std::process::id());
//! // Producer (owner)
//! let mut producer = RingQueue::open_or_create(&name, 64)?;
//! producer.put(b"temperature: 25.5")?;
//!
//! // Consumer, normally in another process
//! let mut consumer = RingQueue::attach(&name)?;
//! assert_eq!(consumer.get(12)?, b"temperature:");
//! assert!(matches!(consumer.get(64), Err(GetError::InsufficientData { .. })));
//!
//! consumer.release()?;
//! producer.release()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Semantics
//!
//! - `put` and `get` are all-or-nothing and never wait: a full queue, an
//!   empty queue, or too little space/data is reported as an error at once.
//! - Exactly one producer and one consumer. Each uses its own handle.
//! - The creating handle owns the regions and unlinks them on release;
//!   attached handles only unmap.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod control;
pub mod discovery;
pub mod error;
pub mod lifecycle;
pub mod lock;
pub mod naming;
pub mod platform;
pub mod queue;
pub mod region;

pub use control::{ControlBlock, ControlSnapshot, QueueState};
pub use discovery::{QueueInfo, find_queue, list_queues};
pub use error::{GetError, PutError, ShmError, ShmResult};
pub use lifecycle::unlink_queue;
pub use naming::QueueNames;
pub use queue::{OPEN_RETRY_TIMEOUT, QueueStatus, RingQueue};

/// Initialize tracing with an `EnvFilter` read from `RUST_LOG`
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
