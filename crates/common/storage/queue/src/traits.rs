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

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use bytes::Bytes;

use crate::{ElementId, PurgeReport, Result};

/// Operations every directory queue variant provides.
///
/// Consumers follow the same pattern regardless of the variant:
///
/// ```ignore
/// for id in queue.iter() {
///     let id = id?;
///     if !queue.lock(&id)? {
///         continue; // somebody else took it
///     }
///     let body = queue.get(&id)?;
///     queue.remove(&id)?;
/// }
/// ```
pub trait DirectoryQueue {
    /// Lazy pass over the visible elements.
    type Elements<'a>: Iterator<Item = Result<ElementId>>
    where
        Self: 'a;

    /// Adds an element holding `data` and returns its identifier once it is
    /// durable and visible to other processes.
    fn add(&self, data: &[u8]) -> Result<ElementId>;

    /// Adds the file at `path` as a new element, moving it into the queue.
    ///
    /// The file must live on the same filesystem as the queue and must
    /// already be complete and synced.
    fn add_path(&self, path: &Path) -> Result<ElementId>;

    /// Number of visible elements; a point-in-time approximation under
    /// concurrent use.
    fn count(&self) -> Result<usize>;

    /// Reclaims locked and temporary elements older than the given ages
    /// (`None` or zero disables each) and removes stale empty intermediate
    /// directories.
    fn purge(&self, max_lock: Option<Duration>, max_temp: Option<Duration>)
    -> Result<PurgeReport>;

    /// Starts a pass over the visible elements, oldest first.
    fn iter(&self) -> Self::Elements<'_>;

    /// Tries to take the element. `Ok(false)` means another consumer locked
    /// or removed it first, or holds a lock on an element of the same name.
    fn lock(&self, id: &ElementId) -> Result<bool>;

    /// Gives a locked element back to the queue.
    ///
    /// If a newer element has taken its visible name in the meantime, the
    /// element is published again under a fresh name.
    fn unlock(&self, id: &ElementId) -> Result<()>;

    /// Reads a locked element.
    fn get(&self, id: &ElementId) -> Result<Bytes>;

    /// Path of a locked element, for callers that stream its content.
    fn get_path(&self, id: &ElementId) -> Result<PathBuf>;

    /// Deletes a locked element.
    fn remove(&self, id: &ElementId) -> Result<()>;
}
