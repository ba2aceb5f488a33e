//! Region naming convention
//!
//! A queue with base name `<base>` owns five POSIX shm objects:
//!
//! | Region        | Name               | Size       |
//! |---------------|--------------------|------------|
//! | Byte store    | `/<base>`          | `capacity` |
//! | Capacity cell | `/<base>_len`      | 8 bytes    |
//! | Head cell     | `/<base>_head`     | 8 bytes    |
//! | Tail cell     | `/<base>_tail`     | 8 bytes    |
//! | HasData cell  | `/<base>_has_data` | 1 byte     |

use crate::error::{ShmError, ShmResult};
use rawq::consts::{HAS_DATA_SUFFIX, HEAD_SUFFIX, LEN_SUFFIX, NAME_MAX, TAIL_SUFFIX};

/// The five shm object names derived from one base name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueNames {
    base: String,
    /// Byte store
    pub store: String,
    /// Capacity cell
    pub len: String,
    /// Head cell
    pub head: String,
    /// Tail cell
    pub tail: String,
    /// HasData cell
    pub has_data: String,
}

impl QueueNames {
    /// Validate `base` and derive the region names
    pub fn new(base: &str) -> ShmResult<Self> {
        let invalid = |reason| ShmError::InvalidName {
            name: base.to_string(),
            reason,
        };

        if base.is_empty() {
            return Err(invalid("name is empty"));
        }
        if base.contains('/') {
            return Err(invalid("name contains '/'"));
        }
        if base.contains('\0') {
            return Err(invalid("name contains NUL"));
        }
        if base.len() + HAS_DATA_SUFFIX.len() > NAME_MAX {
            return Err(invalid("name too long"));
        }

        Ok(Self {
            base: base.to_string(),
            store: format!("/{base}"),
            len: format!("/{base}{LEN_SUFFIX}"),
            head: format!("/{base}{HEAD_SUFFIX}"),
            tail: format!("/{base}{TAIL_SUFFIX}"),
            has_data: format!("/{base}{HAS_DATA_SUFFIX}"),
        })
    }

    /// Base name as given by the caller
    pub fn base(&self) -> &str {
        &self.base
    }

    /// All five names, byte store first and capacity cell last
    ///
    /// This is the creation order: a non-zero capacity cell means the other
    /// four regions are already in place.
    pub fn all(&self) -> [&str; 5] {
        [
            &self.store,
            &self.head,
            &self.tail,
            &self.has_data,
            &self.len,
        ]
    }
}
