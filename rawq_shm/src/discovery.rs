//! Queue discovery by scanning `/dev/shm`

use crate::control::ControlBlock;
use crate::error::{ShmError, ShmResult};
use crate::naming::QueueNames;
use crate::region::SharedRegion;
use rawq::consts::{HAS_DATA_SUFFIX, SHM_DIR};
use serde::Serialize;
use std::path::Path;

/// Queue found in `/dev/shm`
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct QueueInfo {
    /// Base name
    pub name: String,
    /// Capacity recorded in the capacity cell
    pub capacity: u64,
    /// Size of the byte store object
    pub store_size: u64,
}

/// List every complete five-region queue
///
/// A queue is recognized by its `_has_data` cell; sets with a missing
/// sibling region or an uninitialized capacity are skipped.
pub fn list_queues() -> ShmResult<Vec<QueueInfo>> {
    list_queues_in(Path::new(SHM_DIR))
}

fn list_queues_in(dir: &Path) -> ShmResult<Vec<QueueInfo>> {
    let mut queues = Vec::new();
    if !dir.exists() {
        return Ok(queues);
    }

    let entries = std::fs::read_dir(dir).map_err(|e| ShmError::Io { source: e })?;
    for entry in entries.flatten() {
        let Ok(file_name) = entry.file_name().into_string() else {
            continue;
        };
        let Some(base) = file_name.strip_suffix(HAS_DATA_SUFFIX) else {
            continue;
        };
        match inspect(dir, base) {
            Ok(info) => queues.push(info),
            Err(e) => tracing::debug!(queue = base, error = %e, "skipping incomplete queue"),
        }
    }

    queues.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(queues)
}

fn inspect(dir: &Path, base: &str) -> ShmResult<QueueInfo> {
    let names = QueueNames::new(base)?;
    for name in names.all() {
        let path = dir.join(name.trim_start_matches('/'));
        if !path.exists() {
            return Err(ShmError::NotFound {
                name: name.to_string(),
            });
        }
    }

    let store_size = std::fs::metadata(dir.join(base))?.len();
    let control = ControlBlock::from_regions(
        SharedRegion::open(&names.len)?,
        SharedRegion::open(&names.head)?,
        SharedRegion::open(&names.tail)?,
        SharedRegion::open(&names.has_data)?,
    )?;
    let capacity = control.capacity();
    if capacity == 0 {
        return Err(ShmError::NotInitialized {
            name: base.to_string(),
        });
    }

    Ok(QueueInfo {
        name: base.to_string(),
        capacity,
        store_size,
    })
}

/// Find a single queue by base name
pub fn find_queue(name: &str) -> ShmResult<Option<QueueInfo>> {
    Ok(list_queues()?.into_iter().find(|q| q.name == name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::RingQueue;

    #[test]
    fn test_discovery_finds_created_queue() {
        let name = format!("rawq_discovery_{}", std::process::id());
        let queue = RingQueue::create(&name, 128).unwrap();

        let found = find_queue(&name).unwrap().expect("queue should be listed");
        assert_eq!(found.capacity, 128);
        assert_eq!(found.store_size, 128);

        queue.release().unwrap();
        assert!(find_queue(&name).unwrap().is_none());
    }

    #[test]
    fn test_missing_directory_lists_nothing() {
        let queues = list_queues_in(Path::new("/nonexistent/rawq/shm")).unwrap();
        assert!(queues.is_empty());
    }
}
