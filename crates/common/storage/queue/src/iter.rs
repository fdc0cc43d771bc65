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

//! Lazy enumeration of visible elements.
//!
//! [`Elements`] lists the intermediate directories when a pass starts and
//! lists each directory only when the scan reaches it, so elements added to
//! a later directory during the pass are seen, while elements added to a
//! directory already scanned are not. Ordering is therefore FIFO on a best
//! effort basis.
//!
//! An element yielded by the iterator may already have been locked or
//! removed by another process; consumers must check the result of
//! [`lock`](crate::DirectoryQueue::lock).

use std::{collections::VecDeque, iter::FusedIterator};

use crate::{ElementId, Result, name::is_element_name, path::Layout};

/// A pass over the visible elements of a queue, oldest first.
#[derive(Debug)]
pub struct Elements<'a> {
    layout:  &'a Layout,
    /// Intermediate directories not scanned yet. `None` before the pass
    /// starts.
    dirs:    Option<VecDeque<String>>,
    /// Directory currently being drained.
    current: Option<String>,
    /// Visible names left in `current`.
    names:   VecDeque<String>,
}

impl<'a> Elements<'a> {
    pub(crate) const fn new(layout: &'a Layout) -> Self {
        Self {
            layout,
            dirs: None,
            current: None,
            names: VecDeque::new(),
        }
    }

    /// Restarts the pass from the oldest directory.
    pub fn rewind(&mut self) {
        self.dirs = None;
        self.current = None;
        self.names.clear();
    }

    fn next_element(&mut self) -> Result<Option<ElementId>> {
        if self.dirs.is_none() {
            self.dirs = Some(self.layout.list_intermediate_dirs()?.into());
        }
        loop {
            if let (Some(dir), Some(name)) = (&self.current, self.names.pop_front()) {
                return Ok(Some(ElementId::new(dir.clone(), name)));
            }
            let Some(dir) = self.dirs.as_mut().and_then(VecDeque::pop_front) else {
                self.current = None;
                return Ok(None);
            };
            // A directory purged since the pass started is skipped.
            let names = self.layout.list_dir(&dir)?.unwrap_or_default();
            self.names = names.into_iter().filter(|n| is_element_name(n)).collect();
            self.current = Some(dir);
        }
    }
}

impl Iterator for Elements<'_> {
    type Item = Result<ElementId>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_element() {
            Ok(next) => next.map(Ok),
            Err(e) => {
                // Stop after reporting the failure.
                self.dirs = Some(VecDeque::new());
                self.current = None;
                self.names.clear();
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for Elements<'_> {}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::{DirectoryQueue, ElementId, QueueBuilder, SimpleQueue};

    fn ids(queue: &SimpleQueue) -> Vec<ElementId> {
        queue.iter().collect::<crate::Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn test_empty_queue() {
        let temp_dir = TempDir::new().unwrap();
        let queue = QueueBuilder::new(temp_dir.path()).build().unwrap();
        assert!(ids(&queue).is_empty());
    }

    #[test]
    fn test_yields_in_order_across_directories() {
        let temp_dir = TempDir::new().unwrap();
        let queue = QueueBuilder::new(temp_dir.path()).build().unwrap();
        // Older buckets created by hand sort before the current one.
        for (dir, name) in [("00000002", "00000002000000"), ("00000001", "00000001000000")] {
            std::fs::create_dir(temp_dir.path().join(dir)).unwrap();
            std::fs::write(temp_dir.path().join(dir).join(name), b"old").unwrap();
        }
        let added = queue.add(b"new").unwrap();

        let names: Vec<String> = ids(&queue).iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            vec![
                "00000001/00000001000000".to_string(),
                "00000002/00000002000000".to_string(),
                added.to_string(),
            ]
        );
    }

    #[test]
    fn test_skips_locked_and_temporary() {
        let temp_dir = TempDir::new().unwrap();
        let queue = QueueBuilder::new(temp_dir.path()).build().unwrap();
        let first = queue.add(b"1").unwrap();
        let second = queue.add(b"2").unwrap();
        assert!(queue.lock(&first).unwrap());
        std::fs::write(
            queue
                .layout()
                .dir_path(second.dir())
                .join("00000000000000.1.tmp"),
            b"partial",
        )
        .unwrap();

        assert_eq!(ids(&queue), vec![second]);
    }

    #[test]
    fn test_rewind_restarts_pass() {
        let temp_dir = TempDir::new().unwrap();
        let queue = QueueBuilder::new(temp_dir.path()).build().unwrap();
        let id = queue.add(b"x").unwrap();

        let mut iter = queue.iter();
        assert_eq!(iter.next().unwrap().unwrap(), id);
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());

        iter.rewind();
        assert_eq!(iter.next().unwrap().unwrap(), id);
    }

    #[test]
    fn test_tolerates_vanished_directory() {
        let temp_dir = TempDir::new().unwrap();
        let queue = QueueBuilder::new(temp_dir.path())
            .granularity(0)
            .build()
            .unwrap();
        let id = queue.add(b"x").unwrap();
        std::fs::create_dir(temp_dir.path().join("ffffffff")).unwrap();

        let mut iter = queue.iter();
        assert_eq!(iter.next().unwrap().unwrap(), id);
        // Purged after the pass listed it but before the scan reached it.
        std::fs::remove_dir(temp_dir.path().join("ffffffff")).unwrap();
        assert!(iter.next().is_none());

        iter.rewind();
        assert_eq!(iter.next().unwrap().unwrap(), id);
    }

    #[test]
    fn test_sees_elements_added_to_unscanned_directories() {
        let temp_dir = TempDir::new().unwrap();
        let queue = QueueBuilder::new(temp_dir.path())
            .granularity(0)
            .build()
            .unwrap();
        let first = queue.add(b"a").unwrap();
        let later_dir = temp_dir.path().join("ffffffff");
        std::fs::create_dir(&later_dir).unwrap();

        let mut iter = queue.iter();
        assert_eq!(iter.next().unwrap().unwrap(), first);
        // Too late for the directory already scanned, in time for the next.
        queue.add(b"b").unwrap();
        std::fs::write(later_dir.join("ffffffff000000"), b"c").unwrap();

        assert_eq!(
            iter.next().unwrap().unwrap().to_string(),
            "ffffffff/ffffffff000000"
        );
        assert!(iter.next().is_none());
    }
}
