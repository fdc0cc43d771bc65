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

//! Queue directory layout: `root/<intermediate dir>/<element file>`.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
    QueueConfig, Result,
    element::ElementId,
    file,
    name::{intermediate_dir_name, is_intermediate_dir, now_secs},
};

/// Returns the intermediate directory path for a point in time:
/// `root/%08x`.
pub fn time_based_dir<P: AsRef<Path>>(root: P, secs: u64, granularity: u32) -> PathBuf {
    root.as_ref().join(intermediate_dir_name(secs, granularity))
}

/// Maps time buckets and element identifiers to paths under the queue root.
#[derive(Debug, Clone)]
pub struct Layout {
    root:        PathBuf,
    granularity: u32,
    dir_mode:    u32,
}

impl Layout {
    #[must_use]
    pub fn new(config: &QueueConfig) -> Self {
        Self {
            root:        config.path.clone(),
            granularity: config.granularity,
            dir_mode:    config.dir_mode(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path { &self.root }

    /// Creates the queue root and its missing parents.
    pub fn create_root(&self) -> Result<()> { file::create_dir_all(&self.root, self.dir_mode) }

    #[must_use]
    pub fn dir_path(&self, dir: &str) -> PathBuf { self.root.join(dir) }

    /// Path of the element in visible state.
    #[must_use]
    pub fn visible_path(&self, id: &ElementId) -> PathBuf {
        self.root.join(id.dir()).join(id.name())
    }

    /// Path of the element in locked state.
    #[must_use]
    pub fn locked_path(&self, id: &ElementId) -> PathBuf {
        self.root.join(id.dir()).join(id.locked_name())
    }

    /// Returns the intermediate directory for the current time bucket,
    /// creating it if needed.
    ///
    /// Concurrent creation by another process counts as success, so every
    /// caller in the same bucket gets the same directory.
    pub fn current_intermediate_dir(&self) -> Result<(String, PathBuf)> {
        let name = intermediate_dir_name(now_secs(), self.granularity);
        let path = self.root.join(&name);
        if file::create_dir(&path, self.dir_mode)? {
            debug!(path = ?path, "Created intermediate directory");
        }
        Ok((name, path))
    }

    /// Sorted names of the intermediate directories currently present.
    ///
    /// Entries that do not look like intermediate directories are ignored.
    pub fn list_intermediate_dirs(&self) -> Result<Vec<String>> {
        let mut names = file::list_names(&self.root)?.unwrap_or_default();
        names.retain(|name| is_intermediate_dir(name));
        Ok(names)
    }

    /// Sorted entry names of an intermediate directory; `None` if the
    /// directory has been removed.
    pub fn list_dir(&self, dir: &str) -> Result<Option<Vec<String>>> {
        file::list_names(&self.root.join(dir))
    }
}
