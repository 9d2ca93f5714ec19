// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod cli_args;
mod run;

use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
    process::Output,
    str::from_utf8,
};

use assert_cmd::{output::OutputError, Command};

fn hyperdrive_kernel() -> Command {
    Command::cargo_bin("hyperdrive-kernel").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

fn write_file_in_dir<T: AsRef<Path>, U: AsRef<Path>>(
    filename: T,
    dir: U,
    contents: &str,
) -> PathBuf {
    let path = dir.as_ref().join(filename);
    let mut f = File::create(&path).expect("couldn't make file");
    f.write_all(contents.as_bytes()).unwrap();
    path
}

/// Three stations observing a 2 Jy source through unit gains.
const OBSERVATION: &str = indoc::indoc! {r#"
    [observation]
    stations = ["CS001", "CS002", "RS106"]
    polarisations = ["XX", "XY", "YX", "YY"]
    num_channels = 4
    freq_start = 150e6
    freq_res = 1e6
    num_timeslots = 3
    time_res = 5.0
    autos = false
    initial_vis = [2.0, 0.0]

    [model]
    flux = 2.0
"#};
