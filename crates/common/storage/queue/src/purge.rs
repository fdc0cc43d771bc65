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

//! Reclaiming elements abandoned by crashed processes.
//!
//! Purge runs without any producer or consumer being active and never holds
//! anything across two filesystem operations:
//! 1. Remove locked elements older than `max_lock`; their consumer is assumed
//!    dead, and their content is dropped.
//! 2. Remove temporary elements older than `max_temp`; their writer is
//!    assumed dead before publishing.
//! 3. Remove empty intermediate directories, except the newest one, which a
//!    producer may be about to fill.

use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use crate::{Result, element::ElementFile, file, path::Layout};

/// What a purge pass removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeReport {
    /// Locked elements older than `max_lock`.
    pub locked_removed:    usize,
    /// Temporary elements older than `max_temp`.
    pub temporary_removed: usize,
    /// Empty intermediate directories.
    pub dirs_removed:      usize,
}

/// Treats a zero threshold like an absent one.
fn threshold(max_age: Option<Duration>) -> Option<Duration> {
    max_age.filter(|age| !age.is_zero())
}

pub(crate) fn purge(
    layout: &Layout,
    max_lock: Option<Duration>,
    max_temp: Option<Duration>,
) -> Result<PurgeReport> {
    let max_lock = threshold(max_lock);
    let max_temp = threshold(max_temp);
    let now = SystemTime::now();
    let mut report = PurgeReport::default();

    let dirs = layout.list_intermediate_dirs()?;

    if max_lock.is_some() || max_temp.is_some() {
        for dir in &dirs {
            let Some(entries) = layout.list_dir(dir)? else {
                continue;
            };
            for entry in &entries {
                let max_age = match ElementFile::parse(entry) {
                    ElementFile::Locked(_) => max_lock,
                    ElementFile::Temporary { .. } => max_temp,
                    ElementFile::Visible(_) | ElementFile::Foreign => None,
                };
                let Some(max_age) = max_age else {
                    continue;
                };
                let path = layout.dir_path(dir).join(entry);
                let Some(age) = file::age(&path, now)? else {
                    continue;
                };
                if age <= max_age {
                    continue;
                }
                if file::remove(&path)? {
                    warn!(path = ?path, age_secs = age.as_secs(), "Removed stale element file");
                    match ElementFile::parse(entry) {
                        ElementFile::Locked(_) => report.locked_removed += 1,
                        _ => report.temporary_removed += 1,
                    }
                }
            }
        }
    }

    // The newest directory is kept even when empty.
    if let Some((_, older)) = dirs.split_last() {
        for dir in older {
            if file::remove_empty_dir(&layout.dir_path(dir))? {
                debug!(dir = %dir, "Removed empty intermediate directory");
                report.dirs_removed += 1;
            }
        }
    }

    info!(
        locked_removed = report.locked_removed,
        temporary_removed = report.temporary_removed,
        dirs_removed = report.dirs_removed,
        "Purge complete"
    );
    Ok(report)
}
