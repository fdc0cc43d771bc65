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

//! The named tests run by `dirq-test`.
//!
//! Each test opens its own queue handle, so several driver processes can be
//! pointed at one path to stress the cross-process protocol.

use std::{
    fmt,
    path::PathBuf,
    process::Command,
    time::{Duration, Instant},
};

use clap::{Args, ValueEnum};
use dirq::{DirectoryQueue, QueueBuilder, SimpleQueue};
use rand::Rng;
use snafu::{ResultExt, Whatever, ensure_whatever, whatever};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TestName {
    Add,
    Count,
    Size,
    Get,
    Iterate,
    Purge,
    Remove,
    Simple,
}

impl TestName {
    pub const ALL: [Self; 8] = [
        Self::Add,
        Self::Count,
        Self::Size,
        Self::Get,
        Self::Iterate,
        Self::Purge,
        Self::Remove,
        Self::Simple,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Count => "count",
            Self::Size => "size",
            Self::Get => "get",
            Self::Iterate => "iterate",
            Self::Purge => "purge",
            Self::Remove => "remove",
            Self::Simple => "simple",
        }
    }
}

impl fmt::Display for TestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Queue flavours known to other dirq implementations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum QueueType {
    #[default]
    Simple,
    /// Multi-file elements; not implemented here.
    Normal,
}

#[derive(Debug, Clone, Default, Args)]
pub struct QueueArgs {
    /// Set the queue path
    #[arg(short, long)]
    pub path: Option<PathBuf>,

    /// Set the elements count
    #[arg(short, long)]
    pub count: Option<usize>,

    /// Set the body size for added elements
    #[arg(short, long)]
    pub size: Option<usize>,

    /// Randomize the body size
    #[arg(short, long)]
    pub random: bool,

    /// Set header for added elements (ignored by simple queues)
    #[arg(long)]
    pub header: bool,

    /// Time granularity for intermediate directories, in seconds
    #[arg(long)]
    pub granularity: Option<u32>,

    /// Set the random hexadecimal digit for the queue
    #[arg(long)]
    pub rndhex: Option<u8>,

    /// Set the umask for the queue, in octal
    #[arg(long, value_parser = parse_octal)]
    pub umask: Option<u32>,

    /// Maximum age in seconds of a locked element (0 disables)
    #[arg(long)]
    pub maxlock: Option<u64>,

    /// Maximum age in seconds of a temporary element (0 disables)
    #[arg(long)]
    pub maxtemp: Option<u64>,

    /// Queue type
    #[arg(long = "type", value_enum, default_value_t)]
    pub queue_type: QueueType,
}

fn parse_octal(value: &str) -> Result<u32, String> {
    u32::from_str_radix(value, 8).map_err(|e| format!("invalid octal umask {value:?}: {e}"))
}

/// Builds an element body of `size` bytes of `A`.
///
/// With `random`, the size is spread around `size` following an
/// Irwin-Hall approximation of the normal distribution; sizes below one
/// give an empty body.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn new_body<R: Rng + ?Sized>(size: usize, random: bool, rng: &mut R) -> Vec<u8> {
    let mut size = i64::try_from(size).unwrap_or(i64::MAX);
    if random {
        let rnd: f64 = (0..12).map(|_| rng.gen_range(0.0..1.0)).sum::<f64>() - 6.0;
        size += (rnd * (size / 6) as f64) as i64;
    }
    usize::try_from(size).map_or_else(|_| Vec::new(), |size| vec![b'A'; size])
}

pub struct Driver {
    args: QueueArgs,
    path: PathBuf,
}

impl Driver {
    pub fn new(args: QueueArgs) -> Result<Self, Whatever> {
        ensure_whatever!(
            args.queue_type == QueueType::Simple,
            "unsupported DirQ type: normal"
        );
        let Some(path) = args.path.clone() else {
            whatever!("Option is mandatory: -p/--path");
        };
        Ok(Self { args, path })
    }

    /// Runs one test and reports how long it took.
    pub fn run(&self, test: TestName) -> Result<(), Whatever> {
        let start = Instant::now();
        match test {
            TestName::Add => {
                self.test_add()?;
            }
            TestName::Count => {
                self.test_count()?;
            }
            TestName::Size => self.test_size()?,
            TestName::Get => {
                self.test_get()?;
            }
            TestName::Iterate => {
                self.test_iterate()?;
            }
            TestName::Purge => self.test_purge()?,
            TestName::Remove => {
                self.test_remove()?;
            }
            TestName::Simple => self.test_simple()?,
        }
        debug!("done in {:.4} seconds", start.elapsed().as_secs_f64());
        Ok(())
    }

    fn open(&self) -> Result<SimpleQueue, Whatever> {
        let mut builder = QueueBuilder::new(&self.path);
        if let Some(granularity) = self.args.granularity {
            builder = builder.granularity(granularity);
        }
        if let Some(rndhex) = self.args.rndhex {
            builder = builder.rndhex(rndhex);
        }
        if let Some(umask) = self.args.umask {
            builder = builder.umask(umask);
        }
        builder
            .build()
            .with_whatever_context(|_| format!("cannot open queue at {}", self.path.display()))
    }

    fn test_add(&self) -> Result<usize, Whatever> {
        let count = self.args.count;
        match count {
            Some(count) => debug!("adding {count} elements to the queue"),
            None => debug!("adding elements to the queue forever..."),
        }
        let queue = self.open()?;
        let mut rng = rand::thread_rng();
        let mut done = 0;
        while count.is_none_or(|count| done < count) {
            done += 1;
            let body = match self.args.size {
                Some(size) => new_body(size, self.args.random, &mut rng),
                None => format!("Element {done}").into_bytes(),
            };
            queue.add(&body).whatever_context("add failed")?;
        }
        debug!("{done} elements added");
        Ok(done)
    }

    fn test_count(&self) -> Result<usize, Whatever> {
        let count = self.open()?.count().whatever_context("count failed")?;
        debug!("queue has {count} elements");
        Ok(count)
    }

    fn test_size(&self) -> Result<(), Whatever> {
        let output = Command::new("du")
            .arg("-ks")
            .arg(&self.path)
            .output()
            .whatever_context("cannot run du")?;
        ensure_whatever!(output.status.success(), "du failed: {}", output.status);
        debug!("du output: {}", String::from_utf8_lossy(&output.stdout).trim_end());
        Ok(())
    }

    fn test_get(&self) -> Result<usize, Whatever> {
        debug!("getting all elements in the queue (one pass)...");
        let queue = self.open()?;
        let mut done = 0;
        for id in queue.iter() {
            let id = id.whatever_context("listing failed")?;
            if !queue.lock(&id).whatever_context("lock failed")? {
                continue;
            }
            queue.get(&id).whatever_context("get failed")?;
            queue.unlock(&id).whatever_context("unlock failed")?;
            done += 1;
        }
        debug!("{done} elements browsed");
        Ok(done)
    }

    fn test_iterate(&self) -> Result<usize, Whatever> {
        debug!("iterating all elements in the queue (one pass)...");
        let queue = self.open()?;
        let mut done = 0;
        for id in queue.iter() {
            let id = id.whatever_context("listing failed")?;
            if !queue.lock(&id).whatever_context("lock failed")? {
                continue;
            }
            queue.unlock(&id).whatever_context("unlock failed")?;
            done += 1;
        }
        debug!("{done} elements locked/unlocked");
        Ok(done)
    }

    fn test_purge(&self) -> Result<(), Whatever> {
        debug!("purging the queue...");
        let queue = self.open()?;
        queue
            .purge(
                self.args.maxlock.map(Duration::from_secs),
                self.args.maxtemp.map(Duration::from_secs),
            )
            .whatever_context("purge failed")?;
        Ok(())
    }

    fn test_remove(&self) -> Result<usize, Whatever> {
        let queue = self.open()?;
        let mut done = 0;
        if let Some(count) = self.args.count {
            debug!("removing {count} elements from the queue...");
            // Other processes may still be adding, so keep scanning.
            while done < count {
                for id in queue.iter() {
                    let id = id.whatever_context("listing failed")?;
                    if !queue.lock(&id).whatever_context("lock failed")? {
                        continue;
                    }
                    queue.remove(&id).whatever_context("remove failed")?;
                    done += 1;
                    if done == count {
                        break;
                    }
                }
            }
        } else {
            debug!("removing all elements from the queue (one pass)...");
            for id in queue.iter() {
                let id = id.whatever_context("listing failed")?;
                if !queue.lock(&id).whatever_context("lock failed")? {
                    continue;
                }
                queue.remove(&id).whatever_context("remove failed")?;
                done += 1;
            }
        }
        debug!("{done} elements removed");
        Ok(done)
    }

    fn test_simple(&self) -> Result<(), Whatever> {
        ensure_whatever!(
            !self.path.exists(),
            "directory exists: {}",
            self.path.display()
        );
        ensure_whatever!(self.args.count.is_some(), "missing option: --count");

        self.test_add()?;
        self.test_count()?;
        self.test_size()?;
        self.test_purge()?;
        self.test_get()?;
        self.test_remove()?;
        self.test_purge()?;

        let entries = std::fs::read_dir(&self.path)
            .whatever_context("cannot list queue directory")?
            .count();
        ensure_whatever!(entries == 1, "unexpected subdirs number: {entries}");

        std::fs::remove_dir_all(&self.path).whatever_context("cannot delete queue directory")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use rand::{SeedableRng, rngs::StdRng};
    use tempfile::TempDir;
    use test_case::test_case;

    use super::*;

    fn args(path: &Path) -> QueueArgs {
        QueueArgs {
            path: Some(path.to_path_buf()),
            ..Default::default()
        }
    }

    #[test_case(0 ; "empty")]
    #[test_case(1 ; "one byte")]
    #[test_case(4096 ; "page")]
    fn test_fixed_body(size: usize) {
        let body = new_body(size, false, &mut StdRng::seed_from_u64(7));
        assert_eq!(body.len(), size);
        assert!(body.iter().all(|&b| b == b'A'));
    }

    #[test]
    fn test_random_body_stays_within_spread() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut sizes = Vec::new();
        for _ in 0..200 {
            let body = new_body(600, true, &mut rng);
            // Twelve uniform draws minus six lie in [-6, 6).
            assert!(body.len() <= 1200);
            sizes.push(body.len());
        }
        assert!(sizes.iter().any(|&len| len != 600));
    }

    #[test]
    fn test_random_small_body() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            // size / 6 == 0, so randomisation has nothing to spread.
            assert_eq!(new_body(5, true, &mut rng).len(), 5);
        }
    }

    #[test]
    fn test_parse_octal() {
        assert_eq!(parse_octal("022"), Ok(0o022));
        assert_eq!(parse_octal("77"), Ok(0o77));
        assert!(parse_octal("9").is_err());
    }

    #[test]
    fn test_requires_path() {
        assert!(Driver::new(QueueArgs::default()).is_err());
    }

    #[test]
    fn test_rejects_normal_queue() {
        let temp_dir = TempDir::new().unwrap();
        let args = QueueArgs {
            queue_type: QueueType::Normal,
            ..args(temp_dir.path())
        };
        let err = Driver::new(args).err().unwrap();
        assert!(err.to_string().contains("unsupported"));
    }

    #[test]
    fn test_add_then_remove() {
        let temp_dir = TempDir::new().unwrap();
        let driver = Driver::new(QueueArgs {
            count: Some(25),
            size: Some(128),
            ..args(temp_dir.path())
        })
        .unwrap();

        assert_eq!(driver.test_add().unwrap(), 25);
        assert_eq!(driver.test_count().unwrap(), 25);
        assert_eq!(driver.test_get().unwrap(), 25);
        assert_eq!(driver.test_iterate().unwrap(), 25);
        assert_eq!(driver.test_remove().unwrap(), 25);
        assert_eq!(driver.test_count().unwrap(), 0);
    }

    #[test]
    fn test_one_pass_remove_without_count() {
        let temp_dir = TempDir::new().unwrap();
        let adder = Driver::new(QueueArgs {
            count: Some(10),
            ..args(temp_dir.path())
        })
        .unwrap();
        adder.run(TestName::Add).unwrap();

        let remover = Driver::new(args(temp_dir.path())).unwrap();
        assert_eq!(remover.test_remove().unwrap(), 10);
    }

    #[test]
    fn test_simple_cleans_up() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("queue");
        let driver = Driver::new(QueueArgs {
            count: Some(50),
            granularity: Some(1),
            ..args(&path)
        })
        .unwrap();

        driver.run(TestName::Simple).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_simple_refuses_existing_path() {
        let temp_dir = TempDir::new().unwrap();
        let driver = Driver::new(QueueArgs {
            count: Some(1),
            ..args(temp_dir.path())
        })
        .unwrap();
        let err = driver.run(TestName::Simple).unwrap_err();
        assert!(err.to_string().contains("directory exists"));
    }

    #[test]
    fn test_simple_requires_count() {
        let temp_dir = TempDir::new().unwrap();
        let driver = Driver::new(args(&temp_dir.path().join("queue"))).unwrap();
        let err = driver.run(TestName::Simple).unwrap_err();
        assert!(err.to_string().contains("--count"));
    }

    #[test]
    fn test_test_names() {
        let names: Vec<String> = TestName::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(names, [
            "add", "count", "size", "get", "iterate", "purge", "remove", "simple"
        ]);
    }
}
