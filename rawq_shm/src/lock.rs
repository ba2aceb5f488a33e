//! Cross-process control block lock
//!
//! `flock(2)` locks belong to the open file description, so every queue
//! handle opens its own descriptor of the capacity cell and locks that.
//! Two handles exclude each other whether they live in the same process
//! or in different ones.

use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;

/// RAII guard holding an exclusive `flock` on a region descriptor
///
/// The lock is released when the guard is dropped.
#[derive(Debug)]
pub struct ControlLock<'a> {
    file: &'a File,
}

impl<'a> ControlLock<'a> {
    /// Take the exclusive lock, retrying on `EINTR`
    pub fn acquire(file: &'a File) -> io::Result<Self> {
        let fd = file.as_raw_fd();
        loop {
            if unsafe { libc::flock(fd, libc::LOCK_EX) } == 0 {
                return Ok(Self { file });
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }

    /// Take the lock only if nobody else holds it
    ///
    /// Returns `Ok(None)` when another descriptor holds it.
    pub fn try_acquire(file: &'a File) -> io::Result<Option<Self>> {
        let fd = file.as_raw_fd();
        if unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) } == 0 {
            return Ok(Some(Self { file }));
        }
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::WouldBlock {
            Ok(None)
        } else {
            Err(err)
        }
    }
}

impl Drop for ControlLock<'_> {
    fn drop(&mut self) {
        unsafe { libc::flock(self.file.as_raw_fd(), libc::LOCK_UN) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{create_shm_file, open_shm_file, unlink_shm};

    #[test]
    fn test_lock_excludes_other_descriptor() {
        let name = format!("/rawq_lock_{}", std::process::id());
        let first = create_shm_file(&name, 8).unwrap();
        let second = open_shm_file(&name).unwrap();

        let guard = ControlLock::acquire(&first).unwrap();
        assert!(ControlLock::try_acquire(&second).unwrap().is_none());

        drop(guard);
        let guard = ControlLock::try_acquire(&second).unwrap();
        assert!(guard.is_some());

        unlink_shm(&name).unwrap();
    }
}
