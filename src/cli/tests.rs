// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use indoc::indoc;
use tempfile::TempDir;

use super::*;
use crate::config::ConfigFileType;

const CONFIG: &str = indoc! {r#"
    [observation]
    stations = ["A", "B"]
    polarisations = ["XX", "YY"]
    num_channels = 4
    freq_start = 100.0
    freq_res = 1.0
    num_timeslots = 2
    time_res = 10.0
    initial_vis = [2.0, 0.0]

    [[steps]]
    type = "construct"
    solvable = ["Flux:I"]
    cell_size = [4, 2]
    output = "equations.json"

    [[steps]]
    type = "subtract"
    output_column = "RESIDUAL"
    write_flags = true
"#};

#[test]
fn test_args_parse() {
    let args = Args::try_parse_from(["hyperdrive-kernel", "run.toml", "-vv", "--dry-run"]).unwrap();
    assert_eq!(args.config, PathBuf::from("run.toml"));
    assert_eq!(args.output_dir, PathBuf::from("."));
    assert_eq!(args.verbosity, 2);
    assert!(args.dry_run);
    assert!(!args.no_progress_bars);

    assert!(Args::try_parse_from(["hyperdrive-kernel"]).is_err());
}

#[test]
fn test_run_config() {
    let dir = TempDir::new().unwrap();
    let config = RunConfig::parse(CONFIG, ConfigFileType::Toml).unwrap();
    config.validate().unwrap();
    run_config(&config, dir.path()).unwrap();

    let text = std::fs::read_to_string(dir.path().join("equations.json")).unwrap();
    let equations: serde_json::Value = serde_json::from_str(&text).unwrap();
    let equations = equations.as_array().unwrap();
    assert_eq!(equations.len(), 1);
    // 3 baselines x 2 pols x 4 channels x 2 timeslots x (real, imag)
    assert_eq!(equations[0]["count"], 96);
    assert_abs_diff_eq!(equations[0]["rhs"][0].as_f64().unwrap(), 48.0, epsilon = 1e-4);
    assert_abs_diff_eq!(
        equations[0]["normal"][0][0].as_f64().unwrap(),
        48.0,
        epsilon = 1e-4
    );

    let text = std::fs::read_to_string(dir.path().join("RESIDUAL.json")).unwrap();
    let residual: serde_json::Value = serde_json::from_str(&text).unwrap();
    let records = residual["records"].as_array().unwrap();
    assert_eq!(records.len(), 6);
    for record in records {
        for v in record["vis"].as_array().unwrap() {
            assert_abs_diff_eq!(v[0].as_f64().unwrap(), 1.0, epsilon = 1e-6);
            assert_abs_diff_eq!(v[1].as_f64().unwrap(), 0.0);
        }
        assert_eq!(record["flags"].as_array().unwrap().len(), 8);
    }
}

#[test]
fn test_run_config_errors() {
    let dir = TempDir::new().unwrap();
    let mut config = RunConfig::parse(CONFIG, ConfigFileType::Toml).unwrap();
    if let Step::Construct { solvable, .. } = &mut config.steps[0] {
        *solvable = vec!["Nothing:*".to_string()];
    }
    let err = run_config(&config, dir.path()).unwrap_err();
    assert!(matches!(err, CliError::Calibration(_)));

    let mut config = RunConfig::parse(CONFIG, ConfigFileType::Toml).unwrap();
    if let Step::Construct { selection, .. } = &mut config.steps[0] {
        selection.stations1 = vec!["C".to_string()];
        selection.stations2 = vec!["A".to_string()];
    }
    let err = run_config(&config, dir.path()).unwrap_err();
    assert!(matches!(err, CliError::Selection(_)));

    let db = dir.path().join("parms.json");
    std::fs::write(&db, "not json").unwrap();
    let mut config = RunConfig::parse(CONFIG, ConfigFileType::Toml).unwrap();
    config.parm_db = Some(db);
    let err = run_config(&config, dir.path()).unwrap_err();
    assert!(matches!(err, CliError::Storage(_)));
}
