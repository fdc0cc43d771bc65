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

//! A persistent queue made of plain files and directories.
//!
//! Independent processes, possibly on different hosts sharing a filesystem,
//! add, lock, consume and purge elements without a daemon or any other
//! coordinator: every state change is an atomic no-replace `link` or an
//! `unlink`.
//!
//! ```ignore
//! use dirq::{DirectoryQueue, QueueBuilder};
//!
//! let queue = QueueBuilder::new("/var/spool/jobs").build()?;
//! queue.add(b"job 1")?;
//!
//! for id in queue.iter() {
//!     let id = id?;
//!     if queue.lock(&id)? {
//!         let body = queue.get(&id)?;
//!         queue.remove(&id)?;
//!     }
//! }
//! ```

pub mod builder;
pub mod config;
pub mod element;
pub mod error;
mod file;
pub mod iter;
pub mod name;
pub mod path;
pub mod purge;
pub mod queue;
pub mod traits;

pub use builder::QueueBuilder;
pub use config::QueueConfig;
pub use element::ElementId;
pub use error::{QueueError, Result};
pub use iter::Elements;
pub use purge::PurgeReport;
pub use queue::SimpleQueue;
pub use traits::DirectoryQueue;
