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

use std::path::PathBuf;

use crate::{QueueConfig, Result, SimpleQueue};

pub struct QueueBuilder {
    config: QueueConfig,
}

impl QueueBuilder {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config: QueueConfig {
                path: path.into(),
                ..Default::default()
            },
        }
    }

    #[must_use]
    pub const fn granularity(mut self, seconds: u32) -> Self {
        self.config.granularity = seconds;
        self
    }

    #[must_use]
    pub const fn rndhex(mut self, digit: u8) -> Self {
        self.config.rndhex = digit;
        self
    }

    #[must_use]
    pub const fn umask(mut self, umask: u32) -> Self {
        self.config.umask = Some(umask);
        self
    }

    /// Opens the queue, creating its root directory if needed.
    pub fn build(self) -> Result<SimpleQueue> { SimpleQueue::open(self.config) }
}

impl From<QueueConfig> for QueueBuilder {
    fn from(config: QueueConfig) -> Self { Self { config } }
}
