use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::{
    io::AsyncWriteExt,
    sync::{OwnedSemaphorePermit, Semaphore},
};

use crate::{constants::SLOT_LOCK_FILE, core::errors::JudgeError};

const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Fixed pool of reusable build workspaces.
///
/// A semaphore bounds how many builds this process runs at once. Across
/// processes each slot is claimed by atomically creating a lock marker that
/// holds the owner's pid. Markers whose owner no longer runs are reclaimed.
#[derive(Debug)]
pub struct BuildSlotPool {
    root: PathBuf,
    size: usize,
    permits: Arc<Semaphore>,
    next: AtomicUsize,
}

/// Exclusive claim on one slot, released on drop.
#[derive(Debug)]
pub struct SlotGuard {
    index: usize,
    dir: PathBuf,
    marker: PathBuf,
    _permit: OwnedSemaphorePermit,
}

impl SlotGuard {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.marker) {
            tracing::warn!("Failed to release build slot {}: {}", self.index, e);
        }
    }
}

impl BuildSlotPool {
    pub fn new<P: AsRef<Path>>(root: P, size: usize) -> Self {
        let size = size.max(1);
        BuildSlotPool {
            root: root.as_ref().into(),
            size,
            permits: Arc::new(Semaphore::new(size)),
            next: AtomicUsize::new(0),
        }
    }

    pub fn slot_dir(&self, index: usize) -> PathBuf {
        self.root.join(format!("slot{}", index))
    }

    /// Waits for a free slot, scanning round-robin from the last handed-out one.
    #[tracing::instrument(skip(self))]
    pub async fn acquire(&self) -> Result<SlotGuard, JudgeError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| JudgeError::Internal { msg: e.to_string() })?;

        loop {
            let start = self.next.fetch_add(1, Ordering::Relaxed);
            for offset in 0..self.size {
                let index = (start + offset) % self.size;
                let dir = self.slot_dir(index);
                tokio::fs::create_dir_all(&dir).await?;

                let marker = dir.join(SLOT_LOCK_FILE);
                if claim(&marker).await? {
                    tracing::debug!("Acquired build slot {}", index);
                    return Ok(SlotGuard {
                        index,
                        dir,
                        marker,
                        _permit: permit,
                    });
                }
            }

            // Every slot is held by another process.
            tokio::time::sleep(RETRY_DELAY).await;
        }
    }
}

/// Creates the marker if absent. A marker left by a dead owner is removed
/// and the claim retried once.
async fn claim(marker: &Path) -> Result<bool, JudgeError> {
    for _ in 0..2 {
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(marker)
            .await
        {
            Ok(mut file) => {
                file.write_all(std::process::id().to_string().as_bytes())
                    .await?;
                file.flush().await?;
                return Ok(true);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if !is_stale(marker).await {
                    return Ok(false);
                }
                tracing::warn!("Reclaiming stale build slot marker {}", marker.display());
                match tokio::fs::remove_file(marker).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(false)
}

async fn is_stale(marker: &Path) -> bool {
    let Ok(content) = tokio::fs::read_to_string(marker).await else {
        return false;
    };
    match content.trim().parse::<u32>() {
        Ok(pid) => !process_alive(pid),
        // Being written right now by its owner.
        Err(_) => false,
    }
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_distinct_slots_and_markers() {
        let root = tempfile::tempdir().unwrap();
        let pool = BuildSlotPool::new(root.path(), 2);

        let first = pool.acquire().await.unwrap();
        let second = pool.acquire().await.unwrap();
        assert_ne!(first.index(), second.index());

        let marker = first.dir().join(SLOT_LOCK_FILE);
        let owner = std::fs::read_to_string(&marker).unwrap();
        assert_eq!(owner, std::process::id().to_string());

        drop(first);
        assert!(!marker.exists());
        assert!(second.dir().join(SLOT_LOCK_FILE).exists());
    }

    #[tokio::test]
    async fn test_full_pool_waits_for_release() {
        let root = tempfile::tempdir().unwrap();
        let pool = Arc::new(BuildSlotPool::new(root.path(), 1));

        let held = pool.acquire().await.unwrap();
        let waiting =
            tokio::time::timeout(Duration::from_millis(150), pool.acquire()).await;
        assert!(waiting.is_err());

        let index = held.index();
        drop(held);
        let next = tokio::time::timeout(Duration::from_secs(2), pool.acquire())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next.index(), index);
    }

    #[tokio::test]
    async fn test_workspace_survives_release() {
        let root = tempfile::tempdir().unwrap();
        let pool = BuildSlotPool::new(root.path(), 1);

        let slot = pool.acquire().await.unwrap();
        std::fs::write(slot.dir().join("Solution.csproj"), "<Project/>").unwrap();
        drop(slot);

        let slot = pool.acquire().await.unwrap();
        assert!(slot.dir().join("Solution.csproj").exists());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_dead_owner_marker_is_reclaimed() {
        let root = tempfile::tempdir().unwrap();
        let pool = BuildSlotPool::new(root.path(), 1);
        std::fs::create_dir_all(pool.slot_dir(0)).unwrap();
        std::fs::write(pool.slot_dir(0).join(SLOT_LOCK_FILE), u32::MAX.to_string()).unwrap();

        let slot = tokio::time::timeout(Duration::from_secs(2), pool.acquire())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(slot.index(), 0);
    }
}
