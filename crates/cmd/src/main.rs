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

use std::time::Duration;

use clap::Parser;
use dirq_common_telemetry::{
    logging::{LoggingOptions, init_global_logging},
    panic_hook::set_panic_hook,
};
use snafu::{Whatever, whatever};

mod build_info;
mod driver;

use driver::{Driver, QueueArgs, TestName};

#[derive(Debug, Parser)]
#[clap(
name = "dirq-test",
about = "Stress test a directory queue",
author = build_info::AUTHOR,
version = build_info::FULL_VERSION,
long_version = build_info::LONG_VERSION)]
#[command(long_about = r"

Runs one named test against a directory queue. Start several instances on
the same path to exercise concurrent producers and consumers.
Examples:

dirq-test -p /tmp/dirq -c 1000 simple
dirq-test -p /tmp/dirq -c 1000 -s 512 -r add
dirq-test -p /tmp/dirq --maxlock 60 --maxtemp 60 purge

")]
struct Cli {
    #[command(flatten)]
    queue: QueueArgs,

    /// Show debugging information
    #[arg(short, long)]
    debug: bool,

    /// List the available tests
    #[arg(short, long)]
    list: bool,

    /// Sleep this amount of seconds before starting
    #[arg(long, default_value_t = 0)]
    sleep: u64,

    #[arg(value_enum)]
    test: Option<TestName>,
}

fn main() -> Result<(), Whatever> {
    let cli = Cli::parse();
    if cli.list {
        let names: Vec<&str> = TestName::ALL.iter().map(|t| t.as_str()).collect();
        println!("Available tests: {}", names.join(" "));
        return Ok(());
    }

    let logging = LoggingOptions::builder()
        .maybe_level(cli.debug.then(|| "info,dirq_test=debug".to_string()))
        .build();
    let _guards = init_global_logging("dirq-test", &logging);
    set_panic_hook();

    let Some(test) = cli.test else {
        whatever!("missing test name");
    };
    let driver = Driver::new(cli.queue)?;
    if cli.sleep > 0 {
        std::thread::sleep(Duration::from_secs(cli.sleep));
    }
    driver.run(test)
}
