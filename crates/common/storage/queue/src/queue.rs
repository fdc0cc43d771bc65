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

//! The "simple" directory queue: one file per element.
//!
//! ## Element lifecycle
//!
//! ```text
//!            write + fsync          link + unlink         link + unlink
//!  (none) ─────────────────▶ temporary ───────────▶ visible ◀───────────▶ locked
//!                               │                               │
//!                               └── purge (max_temp)            ├── remove
//!                                                               └── purge (max_lock)
//! ```
//!
//! Every transition starts with a `link` to a name that must not exist yet,
//! so a name taken by another process is never replaced. A process killed
//! between the `link` and the following `unlink` leaves the element under
//! both names: it stays locked until purge reclaims the locked name, after
//! which the visible name can be consumed again. Content of a published
//! element is never modified in place.
//!
//! A [`SimpleQueue`] holds no locks. Several instances, in one process or in
//! many processes on hosts sharing the filesystem, can use the same queue
//! directory at the same time.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use bytes::Bytes;
use snafu::ensure;
use tracing::{debug, info, warn};

use crate::{
    DirectoryQueue, QueueConfig, Result,
    element::{ElementId, temporary_name},
    error::NotLockedSnafu,
    file,
    iter::Elements,
    name::{NameGenerator, is_element_name},
    path::Layout,
    purge::{PurgeReport, purge},
};

/// A directory queue storing each element as a single file.
#[derive(Debug)]
pub struct SimpleQueue {
    /// Options the queue was opened with.
    config: QueueConfig,
    /// Path mapping for the queue root.
    layout: Layout,
    /// Element name source, unique to this instance.
    names:  NameGenerator,
    /// Written into temporary names to tell writers apart.
    pid:    u32,
}

impl SimpleQueue {
    /// Opens the queue at `config.path`, creating the root directory if it
    /// does not exist.
    pub fn open(config: QueueConfig) -> Result<Self> {
        config.validate()?;
        let layout = Layout::new(&config);
        layout.create_root()?;

        info!(
            path = ?config.path,
            granularity = config.granularity,
            rndhex = config.rndhex,
            "Directory queue opened"
        );

        Ok(Self {
            names: NameGenerator::new(config.rndhex),
            pid: std::process::id(),
            config,
            layout,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &QueueConfig { &self.config }

    #[must_use]
    pub fn path(&self) -> &Path { self.layout.root() }

    #[must_use]
    pub const fn layout(&self) -> &Layout { &self.layout }

    /// Writes `data` under a temporary name in the current intermediate
    /// directory.
    fn write_temporary(&self, data: &[u8]) -> Result<PathBuf> {
        loop {
            let (_, dir_path) = self.layout.current_intermediate_dir()?;
            let tmp = dir_path.join(temporary_name(&self.names.next_name(), self.pid));
            match file::write_new(&tmp, data, self.config.file_mode()) {
                Ok(()) => return Ok(tmp),
                // Directory purged right after creation, or name taken.
                Err(e)
                    if matches!(
                        e.io_kind(),
                        Some(ErrorKind::NotFound | ErrorKind::AlreadyExists)
                    ) =>
                {
                    debug!(path = ?tmp, error = %e, "Retrying temporary write");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Links `src` under a fresh visible name and unlinks `src`.
    ///
    /// The link is the point at which the element becomes visible. A crash
    /// before the unlink leaves a redundant temporary name that purge
    /// reclaims.
    fn publish(&self, src: &Path) -> Result<ElementId> {
        loop {
            let (dir, dir_path) = self.layout.current_intermediate_dir()?;
            let name = self.names.next_name();
            match file::link(src, &dir_path.join(&name)) {
                Ok(true) => {
                    let id = ElementId::new(dir, name);
                    // Already published; a stray source link is left to purge.
                    if let Err(e) = file::remove(src) {
                        warn!(element = %id, error = %e, "Failed to unlink published source");
                    }
                    debug!(element = %id, "Element added");
                    return Ok(id);
                }
                // Another process published the same name first.
                Ok(false) => {}
                Err(e)
                    if e.io_kind() == Some(ErrorKind::NotFound)
                        && std::fs::symlink_metadata(src).is_ok() =>
                {
                    debug!(dir = %dir, "Intermediate directory vanished, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl DirectoryQueue for SimpleQueue {
    type Elements<'a> = Elements<'a>;

    fn add(&self, data: &[u8]) -> Result<ElementId> {
        let tmp = self.write_temporary(data)?;
        self.publish(&tmp)
    }

    fn add_path(&self, path: &Path) -> Result<ElementId> { self.publish(path) }

    fn count(&self) -> Result<usize> {
        let mut count = 0;
        for dir in self.layout.list_intermediate_dirs()? {
            if let Some(names) = self.layout.list_dir(&dir)? {
                count += names.iter().filter(|n| is_element_name(n)).count();
            }
        }
        Ok(count)
    }

    fn purge(
        &self,
        max_lock: Option<Duration>,
        max_temp: Option<Duration>,
    ) -> Result<PurgeReport> {
        purge(&self.layout, max_lock, max_temp)
    }

    fn iter(&self) -> Elements<'_> { Elements::new(&self.layout) }

    fn lock(&self, id: &ElementId) -> Result<bool> {
        let visible = self.layout.visible_path(id);
        // The locked name shares the inode, and lock age must count from now.
        if !file::touch(&visible)? {
            return Ok(false);
        }
        // Fails if another consumer holds a lock under the same name.
        let locked = file::link_existing(&visible, &self.layout.locked_path(id))?;
        if locked {
            file::remove(&visible)?;
        }
        debug!(element = %id, locked, "Lock attempted");
        Ok(locked)
    }

    fn unlock(&self, id: &ElementId) -> Result<()> {
        let locked = self.layout.locked_path(id);
        if file::link_existing(&locked, &self.layout.visible_path(id))? {
            file::remove(&locked)?;
            debug!(element = %id, "Element unlocked");
            return Ok(());
        }
        ensure!(file::exists(&locked)?, NotLockedSnafu { id: id.to_string() });
        // A newer element took the visible name meanwhile.
        let republished = self.publish(&locked)?;
        debug!(element = %id, republished = %republished, "Element unlocked under a new name");
        Ok(())
    }

    fn get(&self, id: &ElementId) -> Result<Bytes> {
        match file::read(&self.layout.locked_path(id)) {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.io_kind() == Some(ErrorKind::NotFound) => {
                NotLockedSnafu { id: id.to_string() }.fail()
            }
            Err(e) => Err(e),
        }
    }

    fn get_path(&self, id: &ElementId) -> Result<PathBuf> {
        let locked = self.layout.locked_path(id);
        ensure!(file::exists(&locked)?, NotLockedSnafu { id: id.to_string() });
        Ok(locked)
    }

    fn remove(&self, id: &ElementId) -> Result<()> {
        let removed = file::remove(&self.layout.locked_path(id))?;
        ensure!(removed, NotLockedSnafu { id: id.to_string() });
        debug!(element = %id, "Element removed");
        Ok(())
    }
}
