// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use tempfile::TempDir;

use crate::*;

fn read_json(path: &Path) -> serde_json::Value {
    let text = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&text).unwrap()
}

#[test]
fn test_construct_and_subtract() {
    let dir = TempDir::new().unwrap();
    let config = format!(
        "{OBSERVATION}{}",
        indoc::indoc! {r#"
            [[steps]]
            type = "construct"
            solvable = ["Gain:*"]
            exclude = ["*:Imag:*"]
            cell_size = [2, 3]
            output = "equations.json"

            [[steps]]
            type = "subtract"
            output_column = "RESIDUAL"

            [steps.selection]
            polarisations = ["XX", "YY"]
        "#}
    );
    let config = write_file_in_dir("run.toml", dir.path(), &config);
    let cmd = hyperdrive_kernel()
        .args([
            config.to_str().unwrap(),
            "--no-progress-bars",
            "-o",
            dir.path().to_str().unwrap(),
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));

    // Two cells in frequency, one in time.
    let equations = read_json(&dir.path().join("equations.json"));
    let equations = equations.as_array().unwrap();
    assert_eq!(equations.len(), 2);
    for (i, equation) in equations.iter().enumerate() {
        assert_eq!(equation["id"], i);
        // The cross-hand pols don't depend on the gains, leaving
        // 3 baselines x 2 pols x 2 channels x 3 timeslots x (real, imag).
        assert_eq!(equation["count"], 72);
        // The model matches the data, so there's nothing to fit.
        for rhs in equation["rhs"].as_array().unwrap() {
            assert_abs_diff_eq!(rhs.as_f64().unwrap(), 0.0, epsilon = 1e-6);
        }
    }

    let residual = read_json(&dir.path().join("RESIDUAL.json"));
    assert_eq!(residual["column"], "RESIDUAL");
    let records = residual["records"].as_array().unwrap();
    assert_eq!(records.len(), 3 * 2);
    for record in records {
        assert!(record.get("flags").is_none());
        for v in record["vis"].as_array().unwrap() {
            assert_abs_diff_eq!(v[0].as_f64().unwrap(), 0.0, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_parameters_are_read_from_the_database() {
    let dir = TempDir::new().unwrap();
    let db = write_file_in_dir(
        "parms.json",
        dir.path(),
        indoc::indoc! {r#"
            {
              "Flux:I": [
                {
                  "domain": {"freq_start": 0.0, "freq_end": 1e9, "time_start": 0.0, "time_end": 100.0},
                  "shape": [1, 1],
                  "coeffs": [0.5],
                  "solvable": [true],
                  "perturbation": 1e-6,
                  "relative": true
                }
              ]
            }
        "#},
    );
    let config = format!(
        "parm_db = {:?}\n{OBSERVATION}\n[[steps]]\ntype = \"simulate\"\noutput_column = \"MODEL_DATA\"\n",
        db.display().to_string()
    );
    let config = write_file_in_dir("run.toml", dir.path(), &config);
    let cmd = hyperdrive_kernel()
        .args([
            config.to_str().unwrap(),
            "--no-progress-bars",
            "-o",
            dir.path().to_str().unwrap(),
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));

    let model = read_json(&dir.path().join("MODEL_DATA.json"));
    let records = model["records"].as_array().unwrap();
    assert_eq!(records.len(), 3 * 4);
    for record in records {
        let expected = match record["pol"].as_str().unwrap() {
            "XX" | "YY" => 0.5,
            _ => 0.0,
        };
        for v in record["vis"].as_array().unwrap() {
            assert_abs_diff_eq!(v[0].as_f64().unwrap(), expected, epsilon = 1e-6);
        }
    }
}
