use std::fs;
use std::io;
use std::path::Path;

/// Permission applied to created directories and installed binaries.
pub const EXEC_PERM: u32 = 0o755;

/// Create a directory tree and set 0755 on the leaf.
pub fn ensure_dir(p: &Path) -> io::Result<()> {
    fs::create_dir_all(p)?;
    set_mode(p, EXEC_PERM)
}

/// Copy `src` to `dest`, creating the parent, and mark the copy executable.
pub fn copy_executable(src: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }
    fs::copy(src, dest)?;
    set_mode(dest, EXEC_PERM)
}

/// Copy a regular file, creating parent directories as needed.
pub fn copy_file_with_parents(src: &Path, dest: &Path) -> io::Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dest)
}

#[cfg(unix)]
fn set_mode(p: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(p, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_p: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
