// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use tempfile::TempDir;

use crate::*;

#[test]
fn test_no_args_is_an_error() {
    let cmd = hyperdrive_kernel().ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("CONFIG_FILE"), "{stderr}");
}

#[test]
fn test_dry_run() {
    let dir = TempDir::new().unwrap();
    let config = format!(
        "{OBSERVATION}\n[[steps]]\ntype = \"simulate\"\noutput_column = \"MODEL_DATA\"\n"
    );
    let config = write_file_in_dir("run.toml", dir.path(), &config);
    let cmd = hyperdrive_kernel()
        .args([
            config.to_str().unwrap(),
            "--no-progress-bars",
            "--dry-run",
            "-o",
            dir.path().to_str().unwrap(),
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("3 stations, 3 baselines"), "{stdout}");
    assert!(stdout.contains("Dry run"), "{stdout}");
    // Nothing is written on a dry run.
    assert!(!dir.path().join("MODEL_DATA.json").exists());
}

#[test]
fn test_unknown_config_type() {
    let dir = TempDir::new().unwrap();
    let config = write_file_in_dir("run.ini", dir.path(), OBSERVATION);
    let cmd = hyperdrive_kernel()
        .args([config.to_str().unwrap(), "--no-progress-bars"])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.starts_with("Error: "), "{stderr}");
    assert!(stderr.contains("toml, json, yaml"), "{stderr}");
}

#[test]
fn test_config_without_steps() {
    let dir = TempDir::new().unwrap();
    let config = write_file_in_dir("run.toml", dir.path(), OBSERVATION);
    let cmd = hyperdrive_kernel()
        .args([config.to_str().unwrap(), "--no-progress-bars"])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("Check the config file"), "{stderr}");
}
