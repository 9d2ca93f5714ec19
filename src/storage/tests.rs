// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use tempfile::TempDir;

use super::*;
use crate::{
    c32,
    chunk::Baseline,
    grid::{Axis, Grid},
    pol::PolMap,
};

fn funklet(freq_start: f64, value: f64) -> Funklet {
    Funklet::constant(BBox::new(freq_start, freq_start + 10.0, 0.0, 1.0), value)
}

#[test]
fn test_get_values_filters_by_domain() {
    let mut store = MemoryParmStore::new();
    store
        .put_values("Flux:I", &[funklet(0.0, 1.0), funklet(10.0, 2.0), funklet(20.0, 3.0)])
        .unwrap();
    store.put_values("Gain:0:0:Real:A", &[funklet(100.0, 1.0)]).unwrap();
    assert_eq!(
        store.names().unwrap(),
        vec!["Flux:I".to_string(), "Gain:0:0:Real:A".to_string()]
    );

    let mut out = ParmValueSet::new();
    store
        .get_values(
            &mut out,
            &store.names().unwrap(),
            &BBox::new(5.0, 15.0, 0.0, 1.0),
        )
        .unwrap();
    assert_eq!(out.len(), 1);
    let flux = &out["Flux:I"];
    assert_eq!(flux.len(), 2);
    assert_abs_diff_eq!(flux[1].coeffs[0], 2.0);
}

#[test]
fn test_put_replaces_overlapping_funklets() {
    let mut store = MemoryParmStore::new();
    store
        .put_values("Flux:I", &[funklet(0.0, 1.0), funklet(10.0, 2.0)])
        .unwrap();
    store.put_values("Flux:I", &[funklet(10.0, 5.0)]).unwrap();
    let stored = store.get("Flux:I").unwrap();
    assert_eq!(stored.len(), 2);
    assert_abs_diff_eq!(stored[0].coeffs[0], 1.0);
    assert_abs_diff_eq!(stored[1].coeffs[0], 5.0);
}

#[test]
fn test_database_persists() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("parms.json");

    let mut store = MemoryParmStore::open(&path).unwrap();
    assert!(store.is_empty());
    let mut f = funklet(0.0, 1.5);
    f.scid = Some(3);
    store.put_values("Flux:I", &[f]).unwrap();
    // Nothing is written until a flush.
    assert!(!path.exists());
    store.flush().unwrap();
    assert!(path.exists());

    let reopened = MemoryParmStore::open(&path).unwrap();
    assert_eq!(reopened.len(), 1);
    let stored = reopened.get("Flux:I").unwrap();
    assert_abs_diff_eq!(stored[0].coeffs[0], 1.5);
    assert_eq!(stored[0].scid, None);
    assert_eq!(reopened.path(), Some(path.as_path()));
}

#[test]
fn test_corrupt_database_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("parms.json");
    std::fs::write(&path, "this isn't json").unwrap();
    assert!(matches!(
        MemoryParmStore::open(&path),
        Err(StorageError::Parse { .. })
    ));
}

#[test]
fn test_json_vis_writer() {
    let dir = TempDir::new().unwrap();
    let pols = vec!["XX".to_string(), "YY".to_string()];
    let pol_map = PolMap::new(&pols);
    let mut chunk = VisChunk::zeroed(
        Grid::new(Axis::regular(0.0, 1.0, 3), Axis::regular(0.0, 1.0, 2)),
        vec!["A".to_string(), "B".to_string()],
        vec![Baseline::new(0, 0), Baseline::new(0, 1)],
        pols,
    )
    .unwrap();
    chunk.vis_mut()[(1, 1, 2, 1)] = c32::new(3.0, -1.0);
    let selection = VisSelection::all(&chunk, &pol_map).unwrap();

    let mut writer = JsonVisWriter::new(dir.path().join("out"));
    writer.write(&selection, &chunk, "MODEL_DATA", true).unwrap();
    let text = std::fs::read_to_string(writer.column_path("MODEL_DATA")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    let records = json["records"].as_array().unwrap();
    assert_eq!(records.len(), 4);
    let last = &records[3];
    assert_eq!(last["station2"], "B");
    assert_eq!(last["pol"], "YY");
    assert_eq!(last["vis"].as_array().unwrap().len(), 6);
    assert_eq!(last["vis"][5][0], 3.0);
    assert_eq!(last["flags"].as_array().unwrap().len(), 6);

    assert!(matches!(
        writer.write(&selection, &chunk, "a/b", false),
        Err(StorageError::BadColumn(_))
    ));
}
