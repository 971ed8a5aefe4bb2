//! Per-user workflow exclusivity via advisory file locks

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::domain::result::{Error, Result};

/// Hands out one exclusive lock per user.
///
/// Locks are `flock`-style advisory locks on `<dir>/<user_id>.lock`, so
/// they serialise runs across threads and across processes sharing the
/// data directory.
#[derive(Debug, Clone)]
pub struct UserLocks {
    dir: PathBuf,
}

/// Held for the duration of a workflow run; unlocks on drop
#[derive(Debug)]
pub struct UserLockGuard {
    file: File,
    user_id: String,
}

impl UserLockGuard {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl Drop for UserLockGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl UserLocks {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Take the user's lock without waiting, `WorkflowBusy` if it is held
    pub fn try_acquire(&self, user_id: &str) -> Result<UserLockGuard> {
        let path = self.dir.join(format!("{}.lock", user_id));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        file.try_lock_exclusive()
            .map_err(|_| Error::WorkflowBusy(user_id.to_string()))?;

        Ok(UserLockGuard {
            file,
            user_id: user_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_second_acquire_is_busy_until_release() {
        let dir = tempdir().unwrap();
        let locks = UserLocks::new(dir.path());

        let guard = locks.try_acquire("alice").unwrap();
        assert_eq!(guard.user_id(), "alice");
        assert!(matches!(locks.try_acquire("alice"), Err(Error::WorkflowBusy(u)) if u == "alice"));

        drop(guard);
        assert!(locks.try_acquire("alice").is_ok());
    }

    #[test]
    fn test_different_users_do_not_contend() {
        let dir = tempdir().unwrap();
        let locks = UserLocks::new(dir.path());

        let _alice = locks.try_acquire("alice").unwrap();
        assert!(locks.try_acquire("bob").is_ok());
    }
}
