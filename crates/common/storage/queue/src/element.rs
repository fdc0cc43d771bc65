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

//! Element identity and the file names of each element state.
//!
//! An element lives in exactly one intermediate directory and is in exactly
//! one of three states, told apart by its file name:
//!
//! ```text
//! visible     0123456789abcd
//! temporary   0123456789abcd.<pid>.tmp
//! locked      0123456789abcd.lck
//! ```

use std::{fmt, str::FromStr};

use snafu::ensure;

use crate::{
    QueueError,
    error::InvalidElementSnafu,
    name::{is_element_name, is_intermediate_dir},
};

pub const TEMPORARY_SUFFIX: &str = ".tmp";
pub const LOCKED_SUFFIX: &str = ".lck";

/// Identifier of a published element: `(intermediate directory, name)`.
///
/// Displayed and parsed as `"<dir>/<name>"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId {
    dir:  String,
    name: String,
}

impl ElementId {
    pub(crate) const fn new(dir: String, name: String) -> Self { Self { dir, name } }

    /// Intermediate directory holding the element.
    #[must_use]
    pub fn dir(&self) -> &str { &self.dir }

    /// Visible file name of the element.
    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    pub(crate) fn locked_name(&self) -> String { format!("{}{LOCKED_SUFFIX}", self.name) }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.dir, self.name)
    }
}

impl FromStr for ElementId {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (dir, name) = s
            .split_once('/')
            .ok_or_else(|| InvalidElementSnafu { id: s }.build())?;
        ensure!(
            is_intermediate_dir(dir) && is_element_name(name),
            InvalidElementSnafu { id: s }
        );
        Ok(Self::new(dir.to_string(), name.to_string()))
    }
}

/// State of an entry found inside an intermediate directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementFile<'a> {
    Visible(&'a str),
    Temporary { name: &'a str, pid: u32 },
    Locked(&'a str),
    /// Anything else; the queue never creates such entries.
    Foreign,
}

impl<'a> ElementFile<'a> {
    #[must_use]
    pub fn parse(file_name: &'a str) -> Self {
        if is_element_name(file_name) {
            return Self::Visible(file_name);
        }
        if let Some(name) = file_name.strip_suffix(LOCKED_SUFFIX)
            && is_element_name(name)
        {
            return Self::Locked(name);
        }
        if let Some((name, pid)) = file_name
            .strip_suffix(TEMPORARY_SUFFIX)
            .and_then(|rest| rest.split_once('.'))
            && is_element_name(name)
            && let Ok(pid) = pid.parse()
        {
            return Self::Temporary { name, pid };
        }
        Self::Foreign
    }
}

/// Temporary file name for an element being written by `pid`.
#[must_use]
pub fn temporary_name(name: &str, pid: u32) -> String { format!("{name}.{pid}{TEMPORARY_SUFFIX}") }

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn test_element_id_display_and_parse() {
        let id = ElementId::new("6553f0ec".to_string(), "6553f10000001a".to_string());
        assert_eq!(id.to_string(), "6553f0ec/6553f10000001a");
        let parsed: ElementId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(parsed.dir(), "6553f0ec");
        assert_eq!(parsed.locked_name(), format!("{}.lck", parsed.name()));
    }

    #[test_case("6553f0ec" ; "no separator")]
    #[test_case("6553f0ec/xyz" ; "bad name")]
    #[test_case("tmp/6553f10000001a" ; "bad dir")]
    #[test_case("6553f0ec/6553f10000001a.lck" ; "locked name")]
    fn test_element_id_rejects(input: &str) {
        assert!(input.parse::<ElementId>().is_err());
    }

    #[test]
    fn test_parse_element_files() {
        assert_eq!(
            ElementFile::parse("6553f10000001a"),
            ElementFile::Visible("6553f10000001a")
        );
        assert_eq!(
            ElementFile::parse("6553f10000001a.lck"),
            ElementFile::Locked("6553f10000001a")
        );
        assert_eq!(
            ElementFile::parse(&temporary_name("6553f10000001a", 4242)),
            ElementFile::Temporary {
                name: "6553f10000001a",
                pid:  4242,
            }
        );
        assert_eq!(ElementFile::parse("6553f10000001a.x.tmp"), ElementFile::Foreign);
        assert_eq!(ElementFile::parse(".nfs000123"), ElementFile::Foreign);
    }

    #[test]
    fn test_pidless_temporary_is_foreign() {
        // Other directory queue implementations write `<name>.tmp`; purge
        // leaves those alone.
        assert_eq!(ElementFile::parse("6553f10000001a.tmp"), ElementFile::Foreign);
    }
}
