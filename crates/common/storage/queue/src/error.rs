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

use std::{io, path::PathBuf};

use snafu::Snafu;

/// Directory queue errors.
///
/// Lock contention is not an error: [`lock`](crate::DirectoryQueue::lock)
/// reports it as `Ok(false)`.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum QueueError {
    /// Filesystem operation failed.
    #[snafu(display("Failed to {op} {}: {source}", path.display()))]
    Io {
        op:     &'static str,
        path:   PathBuf,
        source: io::Error,
    },

    /// The element is not in locked state but the operation requires it.
    #[snafu(display("Element {id} is not locked"))]
    NotLocked { id: String },

    /// Malformed element identifier.
    #[snafu(display("Invalid element identifier: {id}"))]
    InvalidElement { id: String },

    /// Rejected queue option.
    #[snafu(display("Invalid queue configuration: {message}"))]
    InvalidConfig { message: String },
}

impl QueueError {
    /// Kind of the underlying filesystem error, if any.
    #[must_use]
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
