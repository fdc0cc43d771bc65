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

use rand::Rng;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use snafu::ensure;

use crate::{Result, error::InvalidConfigSnafu};

/// Default width of an intermediate directory time bucket, in seconds.
pub const DEFAULT_GRANULARITY: u32 = 60;

/// Largest accepted `rndhex` value (a single hex digit).
pub const MAX_RNDHEX: u8 = 0xf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SmartDefault)]
#[serde(default)]
pub struct QueueConfig {
    /// Queue root directory.
    #[default(PathBuf::from("./dirq"))]
    pub path:        PathBuf,
    /// Time bucket width in seconds; `0` puts every element in one bucket.
    #[default(DEFAULT_GRANULARITY)]
    pub granularity: u32,
    /// Hex digit appended to every element name produced by this queue.
    #[default(rand::thread_rng().gen_range(0..=MAX_RNDHEX))]
    pub rndhex:      u8,
    /// Extra bits cleared from the creation mode of files and directories.
    pub umask:       Option<u32>,
}

impl QueueConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.rndhex <= MAX_RNDHEX,
            InvalidConfigSnafu {
                message: format!("rndhex must be a single hex digit, got {}", self.rndhex),
            }
        );
        if let Some(umask) = self.umask {
            ensure!(
                umask <= 0o777,
                InvalidConfigSnafu {
                    message: format!("umask out of range: {umask:o}"),
                }
            );
        }
        Ok(())
    }

    /// Creation mode for element files.
    #[must_use]
    pub fn file_mode(&self) -> u32 { 0o666 & !self.umask.unwrap_or(0) }

    /// Creation mode for the root and intermediate directories.
    #[must_use]
    pub fn dir_mode(&self) -> u32 { 0o777 & !self.umask.unwrap_or(0) }
}
