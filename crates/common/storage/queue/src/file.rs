// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Filesystem primitives the queue relies on for cross-process atomicity.
//!
//! Only `mkdir`, `link` and `unlink` mutate shared state. None of them ever
//! replaces an existing name, so two processes can never both believe they
//! created or took the same file. Each
//! helper maps the "somebody else got there first" outcome of its primitive
//! to `Ok(false)` and every other failure to [`QueueError::Io`] naming the
//! operation and path.

use std::{
    fs::{self, DirBuilder, OpenOptions},
    io::{self, ErrorKind, Write},
    os::unix::fs::{DirBuilderExt, OpenOptionsExt},
    path::Path,
    time::{Duration, SystemTime},
};

use nix::sys::{
    stat::{UtimensatFlags, utimensat},
    time::TimeSpec,
};
use snafu::{IntoError, ResultExt};

use crate::{QueueError, Result, error::IoSnafu};

fn io_error(op: &'static str, path: &Path, source: io::Error) -> QueueError {
    IoSnafu { op, path }.into_error(source)
}

/// Creates a directory; `Ok(false)` if it already exists.
pub(crate) fn create_dir(path: &Path, mode: u32) -> Result<bool> {
    match DirBuilder::new().mode(mode).create(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(io_error("create directory", path, e)),
    }
}

/// Creates a directory and its missing parents.
pub(crate) fn create_dir_all(path: &Path, mode: u32) -> Result<()> {
    DirBuilder::new()
        .recursive(true)
        .mode(mode)
        .create(path)
        .context(IoSnafu {
            op: "create directory",
            path,
        })
}

/// Writes `data` to a new file and syncs it to stable storage.
///
/// Fails if the file already exists.
pub(crate) fn write_new(path: &Path, data: &[u8], mode: u32) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(mode)
        .open(path)
        .context(IoSnafu { op: "create", path })?;
    file.write_all(data).context(IoSnafu { op: "write", path })?;
    file.sync_all().context(IoSnafu { op: "sync", path })
}

pub(crate) fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).context(IoSnafu { op: "read", path })
}

/// Hard links `src` to `dst`; `Ok(false)` if `dst` already exists.
pub(crate) fn link(src: &Path, dst: &Path) -> Result<bool> {
    match fs::hard_link(src, dst) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(io_error("link", dst, e)),
    }
}

/// Hard links `src` to `dst`; `Ok(false)` if `src` is gone or `dst` already
/// exists.
pub(crate) fn link_existing(src: &Path, dst: &Path) -> Result<bool> {
    match fs::hard_link(src, dst) {
        Ok(()) => Ok(true),
        Err(e) if matches!(e.kind(), ErrorKind::AlreadyExists | ErrorKind::NotFound) => Ok(false),
        Err(e) => Err(io_error("link", dst, e)),
    }
}

/// Unlinks a file; `Ok(false)` if it was already gone.
pub(crate) fn remove(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(io_error("remove", path, e)),
    }
}

/// Removes a directory if it is empty; `Ok(false)` if it is not empty or
/// already gone.
pub(crate) fn remove_empty_dir(path: &Path) -> Result<bool> {
    match fs::remove_dir(path) {
        Ok(()) => Ok(true),
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::DirectoryNotEmpty) => {
            Ok(false)
        }
        Err(e) => Err(io_error("remove directory", path, e)),
    }
}

/// Sets the modification time to now; `Ok(false)` if the file is gone.
///
/// Uses `UTIME_NOW`, which only needs write permission, so a consumer can
/// touch elements written by another user of a shared queue.
pub(crate) fn touch(path: &Path) -> Result<bool> {
    match utimensat(
        None,
        path,
        &TimeSpec::UTIME_OMIT,
        &TimeSpec::UTIME_NOW,
        UtimensatFlags::FollowSymlink,
    ) {
        Ok(()) => Ok(true),
        Err(errno) => {
            let e = io::Error::from(errno);
            if e.kind() == ErrorKind::NotFound {
                Ok(false)
            } else {
                Err(io_error("touch", path, e))
            }
        }
    }
}

/// Whether `path` names an existing file, without following symlinks.
pub(crate) fn exists(path: &Path) -> Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(io_error("stat", path, e)),
    }
}

/// Time since the last modification; `None` if the file is gone.
///
/// Modification times in the future count as zero age.
pub(crate) fn age(path: &Path, now: SystemTime) -> Result<Option<Duration>> {
    match fs::symlink_metadata(path).and_then(|m| m.modified()) {
        Ok(mtime) => Ok(Some(now.duration_since(mtime).unwrap_or_default())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error("stat", path, e)),
    }
}

/// Sorted UTF-8 entry names of a directory; `None` if it does not exist.
///
/// Entries that vanish while listing are simply not reported.
pub(crate) fn list_names(dir: &Path) -> Result<Option<Vec<String>>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error("list", dir, e)),
    };
    let mut names = Vec::new();
    for entry in entries {
        match entry {
            Ok(entry) => {
                if let Ok(name) = entry.file_name().into_string() {
                    names.push(name);
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_error("list", dir, e)),
        }
    }
    names.sort_unstable();
    Ok(Some(names))
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use filetime::FileTime;

    use super::*;

    #[test]
    fn test_create_dir_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("00000000");
        assert!(create_dir(&path, 0o777).unwrap());
        assert!(!create_dir(&path, 0o777).unwrap());
    }

    #[test]
    fn test_write_new_refuses_existing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("element");
        write_new(&path, b"first", 0o600).unwrap();
        let err = write_new(&path, b"second", 0o600).unwrap_err();
        assert!(err.to_string().contains("create"));
        assert_eq!(read(&path).unwrap(), b"first");
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode & !0o600, 0);
    }

    #[test]
    fn test_link_reports_collision() {
        let temp_dir = tempfile::tempdir().unwrap();
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        write_new(&src, b"x", 0o644).unwrap();
        assert!(link(&src, &dst).unwrap());
        assert!(!link(&src, &dst).unwrap());
    }

    #[test]
    fn test_link_and_remove_missing_source() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("missing");
        assert!(!link_existing(&missing, &temp_dir.path().join("other")).unwrap());
        assert!(!remove(&missing).unwrap());
        assert!(!touch(&missing).unwrap());
        assert!(age(&missing, SystemTime::now()).unwrap().is_none());
        assert!(list_names(&missing).unwrap().is_none());
    }

    #[test]
    fn test_remove_empty_dir_keeps_populated() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("00000000");
        create_dir(&dir, 0o755).unwrap();
        write_new(&dir.join("f"), b"", 0o644).unwrap();
        assert!(!remove_empty_dir(&dir).unwrap());
        remove(&dir.join("f")).unwrap();
        assert!(remove_empty_dir(&dir).unwrap());
        assert!(!remove_empty_dir(&dir).unwrap());
    }

    #[test]
    fn test_age_uses_mtime() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("old");
        write_new(&path, b"", 0o644).unwrap();
        let an_hour_ago = SystemTime::now() - Duration::from_secs(3600);
        filetime::set_file_mtime(&path, FileTime::from_system_time(an_hour_ago)).unwrap();
        let age = age(&path, SystemTime::now()).unwrap().unwrap();
        assert!(age >= Duration::from_secs(3599));
        touch(&path).unwrap();
        assert!(age_of(&path) < Duration::from_secs(60));
    }

    fn age_of(path: &Path) -> Duration { age(path, SystemTime::now()).unwrap().unwrap() }

    #[test]
    fn test_link_existing_never_replaces() {
        let temp_dir = tempfile::tempdir().unwrap();
        let src = temp_dir.path().join("00000000000000");
        let dst = temp_dir.path().join("00000000000000.lck");
        write_new(&src, b"new", 0o644).unwrap();
        write_new(&dst, b"held", 0o644).unwrap();

        assert!(!link_existing(&src, &dst).unwrap());
        assert_eq!(read(&dst).unwrap(), b"held");
        assert_eq!(read(&src).unwrap(), b"new");
    }

    #[test]
    fn test_touch_keeps_access_time() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("element");
        write_new(&path, b"", 0o666).unwrap();
        let long_ago = FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_times(&path, long_ago, long_ago).unwrap();

        assert!(touch(&path).unwrap());
        let meta = fs::metadata(&path).unwrap();
        assert_eq!(FileTime::from_last_access_time(&meta), long_ago);
        assert!(age_of(&path) < Duration::from_secs(60));
    }
}
