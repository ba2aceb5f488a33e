//! Region teardown and operator cleanup

use crate::error::{ShmError, ShmResult};
use crate::naming::QueueNames;
use crate::platform::unlink_shm;

/// Unlink every region of a queue
///
/// All five names are attempted even if one fails; names that are already
/// gone are skipped. Returns how many were removed, or the first error.
pub fn unlink_regions(names: &QueueNames) -> ShmResult<usize> {
    let mut removed = 0;
    let mut first_error: Option<ShmError> = None;

    for name in names.all() {
        match unlink_shm(name) {
            Ok(true) => removed += 1,
            Ok(false) => tracing::debug!(region = name, "region already unlinked"),
            Err(e) => {
                tracing::warn!(region = name, error = %e, "failed to unlink region");
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(removed),
    }
}

/// Force-remove the regions of a queue by base name
///
/// Meant for cleaning up after an owner that exited without releasing.
/// Processes still attached keep their mappings; only the names go away.
pub fn unlink_queue(name: &str) -> ShmResult<usize> {
    let names = QueueNames::new(name)?;
    let removed = unlink_regions(&names)?;
    tracing::info!(queue = name, removed, "unlinked queue regions");
    Ok(removed)
}

/// Unlinks regions created so far unless disarmed
///
/// Used while a queue is being created so a failure half-way does not leave
/// stray objects in `/dev/shm`.
#[derive(Debug)]
pub(crate) struct CreationRollback {
    created: Vec<String>,
    armed: bool,
}

impl CreationRollback {
    pub(crate) fn new() -> Self {
        Self {
            created: Vec::new(),
            armed: true,
        }
    }

    pub(crate) fn push(&mut self, name: &str) {
        self.created.push(name.to_string());
    }

    pub(crate) fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CreationRollback {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        for name in self.created.iter().rev() {
            if let Err(e) = unlink_shm(name) {
                tracing::warn!(region = %name, error = %e, "rollback unlink failed");
            }
        }
    }
}
