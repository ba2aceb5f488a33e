//! Named shared memory region

use crate::error::{ShmError, ShmResult};
use crate::platform::{create_shm_file, map_shm_file, open_shm_file};
use memmap2::MmapMut;
use std::fs::File;
use std::ptr::NonNull;

/// One mapped POSIX shm object
///
/// Dropping the region unmaps it and closes the descriptor; it never
/// unlinks the name. Unlinking is the queue owner's job.
pub struct SharedRegion {
    /// POSIX shm name (leading `/`)
    name: String,
    /// Base address of the mapping
    ptr: NonNull<u8>,
    /// Mapped length
    len: usize,
    /// Memory mapping
    _mmap: MmapMut,
    /// Descriptor kept open for advisory locking
    file: File,
}

// The mapping is process-shared memory; all mutation goes through raw
// pointers or atomics.
unsafe impl Send for SharedRegion {}
unsafe impl Sync for SharedRegion {}

impl SharedRegion {
    /// Exclusively create and map a zero-filled region of `len` bytes
    pub fn create(name: &str, len: usize) -> ShmResult<Self> {
        let file = create_shm_file(name, len)?;
        Self::map(name, file, len)
    }

    /// Open and map an existing region at its current size
    pub fn open(name: &str) -> ShmResult<Self> {
        let file = open_shm_file(name)?;
        let len = file.metadata()?.len() as usize;
        if len == 0 {
            return Err(ShmError::NotInitialized {
                name: name.to_string(),
            });
        }
        Self::map(name, file, len)
    }

    fn map(name: &str, file: File, len: usize) -> ShmResult<Self> {
        let mut mmap = map_shm_file(&file, len)?;
        let ptr = NonNull::new(mmap.as_mut_ptr()).ok_or_else(|| ShmError::NotFound {
            name: name.to_string(),
        })?;

        tracing::debug!(region = name, len, "mapped shared memory region");

        Ok(Self {
            name: name.to_string(),
            ptr,
            len,
            _mmap: mmap,
            file,
        })
    }

    /// POSIX shm name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mapped length in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the mapping is zero bytes long (never true for a mapped region)
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Base address of the mapping
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Open descriptor backing the mapping
    pub fn file(&self) -> &File {
        &self.file
    }
}

impl std::fmt::Debug for SharedRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRegion")
            .field("name", &self.name)
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::unlink_shm;

    #[test]
    fn test_region_create_and_open() {
        let name = format!("/rawq_region_{}", std::process::id());
        let created = SharedRegion::create(&name, 64).unwrap();
        assert_eq!(created.len(), 64);
        assert_eq!(created.name(), name);
        assert_eq!(created.as_ptr() as usize % 8, 0);

        unsafe { created.as_ptr().add(10).write(0x5A) };

        let opened = SharedRegion::open(&name).unwrap();
        assert_eq!(opened.len(), 64);
        assert_eq!(unsafe { opened.as_ptr().add(10).read() }, 0x5A);

        unlink_shm(&name).unwrap();
    }

    #[test]
    fn test_region_open_missing() {
        let result = SharedRegion::open("/rawq_region_missing_never_created");
        assert!(matches!(result, Err(ShmError::NotFound { .. })));
    }
}
