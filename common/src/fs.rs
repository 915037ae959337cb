//! Directory helpers for the processes embedding the client

use std::os::unix::fs::DirBuilderExt;
use std::path::Path;

/// user and group may read, write and search
const DIRECTORY_MODE: u32 = 0o770;

/// Whether `path` exists and is a directory
///
/// Symlinks are followed.
#[must_use]
pub fn directory_exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().is_dir()
}

/// Creates the directory at `path`, returning whether it exists afterwards
///
/// Only the last component is created. A directory that is already there counts as a success,
/// anything else in the way does not.
#[must_use]
pub fn create_directory(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    if directory_exists(path) {
        return true;
    }
    std::fs::DirBuilder::new()
        .mode(DIRECTORY_MODE)
        .create(path)
        .is_ok()
}
