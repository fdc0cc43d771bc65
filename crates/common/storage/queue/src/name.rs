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

//! Element and intermediate directory naming.
//!
//! ## Format (version 1)
//!
//! ```text
//! intermediate directory:  %08x                 bucket start, Unix seconds
//! element name:            %08x %05x %01x       seconds, microseconds, rndhex
//! ```
//!
//! Both are fixed-width lowercase hex, so lexicographic order is
//! chronological order. Directory and visible element names follow the
//! "simple" directory queue of the Perl, Python and Java implementations,
//! but the temporary and locked states do not: those implementations lock by
//! linking while keeping the visible file and write temporaries as
//! `<name>.tmp`. Do not mix them with this crate on one queue.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Length of a visible element name.
pub const ELEMENT_NAME_LEN: usize = 14;

/// Length of an intermediate directory name.
pub const DIR_NAME_LEN: usize = 8;

const MICROS_PER_SECOND: u64 = 1_000_000;

/// Generates element names that strictly increase within one generator.
///
/// When the clock has not moved since the previous name (or went backwards),
/// the microsecond field is bumped past the last issued value. Names from
/// different processes can still collide; publishing detects that and asks
/// for another name.
#[derive(Debug)]
pub struct NameGenerator {
    rndhex:      u8,
    /// Last issued timestamp, microseconds since the epoch.
    last_issued: AtomicU64,
}

impl NameGenerator {
    #[must_use]
    pub const fn new(rndhex: u8) -> Self {
        Self {
            rndhex,
            last_issued: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub const fn rndhex(&self) -> u8 { self.rndhex }

    pub fn next_name(&self) -> String {
        let now = now_micros();
        let (Ok(prev) | Err(prev)) =
            self.last_issued
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                    Some(now.max(last + 1))
                });
        element_name(now.max(prev + 1), self.rndhex)
    }
}

/// Formats an element name from a microsecond timestamp.
#[must_use]
pub fn element_name(micros: u64, rndhex: u8) -> String {
    let secs = micros / MICROS_PER_SECOND;
    let usecs = micros % MICROS_PER_SECOND;
    format!("{secs:08x}{usecs:05x}{:01x}", rndhex & 0xf)
}

/// Intermediate directory name for a point in time.
#[must_use]
pub fn intermediate_dir_name(secs: u64, granularity: u32) -> String {
    let bucket = match u64::from(granularity) {
        0 => 0,
        g => secs - secs % g,
    };
    format!("{bucket:08x}")
}

#[must_use]
pub fn is_element_name(name: &str) -> bool { is_lower_hex(name, ELEMENT_NAME_LEN) }

#[must_use]
pub fn is_intermediate_dir(name: &str) -> bool { is_lower_hex(name, DIR_NAME_LEN) }

fn is_lower_hex(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

pub(crate) fn now_micros() -> u64 { u64::try_from(Utc::now().timestamp_micros()).unwrap_or(0) }

pub(crate) fn now_secs() -> u64 { now_micros() / MICROS_PER_SECOND }

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn test_element_name_layout() {
        let micros = 0x5f5e_1000 * MICROS_PER_SECOND + 0x1234;
        assert_eq!(element_name(micros, 0xa), "5f5e100001234a");
    }

    #[test_case(1_700_000_000, 60, "6553f0ec" ; "minute buckets")]
    #[test_case(1_700_000_000, 1, "6553f100" ; "second buckets")]
    #[test_case(1_700_000_000, 0, "00000000" ; "single bucket")]
    fn test_intermediate_dir_name(secs: u64, granularity: u32, expected: &str) {
        assert_eq!(intermediate_dir_name(secs, granularity), expected);
    }

    #[test_case("0123456789abcd", true ; "valid")]
    #[test_case("0123456789ABCD", false ; "uppercase")]
    #[test_case("0123456789abc", false ; "short")]
    #[test_case("0123456789abcd.lck", false ; "locked")]
    #[test_case("0123456789abcd.42.tmp", false ; "temporary")]
    fn test_is_element_name(name: &str, expected: bool) {
        assert_eq!(is_element_name(name), expected);
    }

    #[test]
    fn test_names_strictly_increase() {
        let generator = NameGenerator::new(3);
        let names: Vec<String> = (0..10_000).map(|_| generator.next_name()).collect();
        for pair in names.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
        assert!(names.iter().all(|n| is_element_name(n) && n.ends_with('3')));
    }

    #[test]
    fn test_names_unique_across_threads() {
        let generator = NameGenerator::new(0);
        let mut names: Vec<String> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| (0..1000).map(|_| generator.next_name()).collect::<Vec<_>>()))
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}
