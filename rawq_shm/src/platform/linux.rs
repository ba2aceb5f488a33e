//! Linux-specific shared memory operations

use crate::error::{ShmError, ShmResult};
use memmap2::{MmapMut, MmapOptions};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::mman::{shm_open, shm_unlink};
use nix::sys::stat::Mode;
use nix::unistd::getpid;
use std::fs::File;

/// Translate a failed shm syscall into a lifecycle error for `name`
fn map_errno(name: &str, errno: Errno) -> ShmError {
    match errno {
        Errno::EEXIST => ShmError::AlreadyExists {
            name: name.to_string(),
        },
        Errno::ENOENT => ShmError::NotFound {
            name: name.to_string(),
        },
        Errno::EACCES | Errno::EPERM => ShmError::PermissionDenied {
            name: name.to_string(),
        },
        other => ShmError::Nix { source: other },
    }
}

/// Exclusively create a shm object of `size` bytes (zero-filled by the kernel)
///
/// Fails with `AlreadyExists` if the name is taken. On a sizing failure the
/// name is unlinked again so no half-created object is left behind.
pub fn create_shm_file(name: &str, size: usize) -> ShmResult<File> {
    let fd = shm_open(
        name,
        OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR,
        Mode::S_IRUSR | Mode::S_IWUSR,
    )
    .map_err(|errno| map_errno(name, errno))?;

    let file = File::from(fd);
    if let Err(e) = file.set_len(size as u64) {
        let _ = shm_unlink(name);
        return Err(e.into());
    }

    Ok(file)
}

/// Open an existing shm object read/write
pub fn open_shm_file(name: &str) -> ShmResult<File> {
    let fd = shm_open(name, OFlag::O_RDWR, Mode::empty()).map_err(|errno| map_errno(name, errno))?;
    Ok(File::from(fd))
}

/// Map `len` bytes of a shm object shared and writable
pub fn map_shm_file(file: &File, len: usize) -> ShmResult<MmapMut> {
    // Fault the pages in up front so the first put/get does not pay for it
    let mmap = unsafe { MmapOptions::new().len(len).populate().map_mut(file)? };
    Ok(mmap)
}

/// Remove a shm name
///
/// Returns `Ok(false)` if the name did not exist.
pub fn unlink_shm(name: &str) -> ShmResult<bool> {
    match shm_unlink(name) {
        Ok(()) => Ok(true),
        Err(Errno::ENOENT) => Ok(false),
        Err(errno) => Err(map_errno(name, errno)),
    }
}

/// Get current process ID
pub fn get_current_pid() -> u32 {
    getpid().as_raw() as u32
}
