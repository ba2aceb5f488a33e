//! Shared memory constants.
//!
//! Single source of truth for the queue region layout and size limits.
//! Every crate that needs to know how a queue is laid out in `/dev/shm`
//! imports from here.

/// Maximum ring capacity in bytes.
///
/// Set to 1GB as a reasonable upper limit to prevent excessive memory usage.
pub const SHM_MAX_SIZE: usize = 1_073_741_824; // 1GB

/// Capacity used by the CLI when neither the config nor the command line
/// names one.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Size of an unsigned cursor/capacity cell in bytes (native-endian `u64`).
pub const CELL_SIZE: usize = 8;

/// Size of the has-data flag cell in bytes.
pub const FLAG_SIZE: usize = 1;

/// Suffix of the capacity cell region.
pub const LEN_SUFFIX: &str = "_len";

/// Suffix of the head (write cursor) cell region.
pub const HEAD_SUFFIX: &str = "_head";

/// Suffix of the tail (read cursor) cell region.
pub const TAIL_SUFFIX: &str = "_tail";

/// Suffix of the has-data flag region.
pub const HAS_DATA_SUFFIX: &str = "_has_data";

/// Directory where Linux exposes POSIX shared memory objects.
pub const SHM_DIR: &str = "/dev/shm";

/// Longest file name the kernel accepts for a shm object.
pub const NAME_MAX: usize = 255;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shm_max_size_is_1gb() {
        assert_eq!(SHM_MAX_SIZE, 1024 * 1024 * 1024);
    }

    #[test]
    fn test_cell_sizes() {
        assert_eq!(CELL_SIZE, core::mem::size_of::<u64>());
        assert_eq!(FLAG_SIZE, core::mem::size_of::<bool>());
    }

    #[test]
    fn test_has_data_suffix_is_longest() {
        for suffix in [LEN_SUFFIX, HEAD_SUFFIX, TAIL_SUFFIX] {
            assert!(suffix.len() < HAS_DATA_SUFFIX.len());
        }
    }

    #[test]
    fn test_default_capacity_in_range() {
        assert!(DEFAULT_CAPACITY > 0);
        assert!(DEFAULT_CAPACITY <= SHM_MAX_SIZE);
    }
}
