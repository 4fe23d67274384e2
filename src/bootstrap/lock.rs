use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

pub const BUILD_LOCK_NAME: &str = ".build.lock";

/// Exclusive lock on a scratch directory.
///
/// The lock file is left in place on drop: waiters blocked on it must end up
/// holding the same inode a later caller opens.
#[derive(Debug)]
pub struct BuildLock {
    file: File,
    path: PathBuf,
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl BuildLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_lock_file(p: &Path) -> io::Result<File> {
    if let Some(parent) = p.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(true)
        .open(p)
}

/// Block until the build lock for `scratch_dir` is held.
pub fn acquire_build_lock(scratch_dir: &Path) -> io::Result<BuildLock> {
    let path = scratch_dir.join(BUILD_LOCK_NAME);
    let file = open_lock_file(&path)?;
    debug!(path = %path.display(), "waiting for build lock");
    file.lock_exclusive()?;
    Ok(BuildLock { file, path })
}

/// Non-blocking variant; `WouldBlock` when another holder exists.
pub fn try_acquire_build_lock(scratch_dir: &Path) -> io::Result<BuildLock> {
    let path = scratch_dir.join(BUILD_LOCK_NAME);
    let file = open_lock_file(&path)?;
    match file.try_lock_exclusive() {
        Ok(()) => Ok(BuildLock { file, path }),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(io::Error::new(
            io::ErrorKind::WouldBlock,
            format!("build lock held: {}", path.display()),
        )),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_holder_would_block_until_release() {
        let td = tempfile::tempdir().expect("tempdir");
        let held = acquire_build_lock(td.path()).expect("first lock");
        let err = try_acquire_build_lock(td.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
        let lock_path = held.path().to_path_buf();
        drop(held);
        assert!(lock_path.exists());
        assert!(try_acquire_build_lock(td.path()).is_ok());
    }

    #[test]
    fn blocked_waiter_and_late_caller_share_one_lock_file() {
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;

        let td = tempfile::tempdir().expect("tempdir");
        let dir = td.path().to_path_buf();
        let held = acquire_build_lock(&dir).expect("first lock");

        let (tx, rx) = mpsc::channel();
        let waiter_dir = dir.clone();
        let waiter = thread::spawn(move || {
            let lock = acquire_build_lock(&waiter_dir).expect("waiter lock");
            tx.send(()).expect("notify");
            thread::sleep(Duration::from_millis(200));
            drop(lock);
        });

        thread::sleep(Duration::from_millis(50));
        drop(held);
        rx.recv().expect("waiter acquired");
        let err = try_acquire_build_lock(&dir).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
        waiter.join().expect("join");
        assert!(try_acquire_build_lock(&dir).is_ok());
    }
}
