// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use vec1::vec1;

use super::*;
use crate::grid::{Axis, Grid};

/// Three stations, all auto- and cross-correlations, with one unrecognised
/// polarisation.
fn chunk_and_pols() -> (VisChunk, PolMap) {
    let stations = vec!["CS001".to_string(), "CS002".to_string(), "RS106".to_string()];
    let mut baselines = vec![];
    for s1 in 0..3 {
        for s2 in s1..3 {
            baselines.push(Baseline::new(s1, s2));
        }
    }
    let pols = vec!["XX".to_string(), "XY".to_string(), "RR".to_string(), "YY".to_string()];
    let pol_map = PolMap::new(&pols);
    let chunk = VisChunk::zeroed(
        Grid::new(Axis::regular(0.0, 1.0, 2), Axis::regular(0.0, 1.0, 2)),
        stations,
        baselines,
        pols,
    )
    .unwrap();
    (chunk, pol_map)
}

#[test]
fn test_filter_parse() {
    assert_eq!(BaselineFilter::parse("").unwrap(), BaselineFilter::All);
    assert_eq!(BaselineFilter::parse("auto").unwrap(), BaselineFilter::Auto);
    assert_eq!(BaselineFilter::parse("Cross").unwrap(), BaselineFilter::Cross);
    assert_eq!(BaselineFilter::parse("all").unwrap(), BaselineFilter::All);
    assert!(matches!(
        BaselineFilter::parse("SOME"),
        Err(SelectionError::BadFilter(_))
    ));
}

#[test]
fn test_default_selection() {
    let (chunk, pol_map) = chunk_and_pols();
    let sel = VisSelection::all(&chunk, &pol_map).unwrap();
    assert_eq!(sel.baselines.len(), 6);
    // "RR" isn't a linear product.
    assert_eq!(sel.pols, vec1![0, 1, 3]);
}

#[test]
fn test_auto_selects_exactly_autos() {
    let (chunk, pol_map) = chunk_and_pols();
    let none: &[&str] = &[];
    let sel = VisSelection::new(&chunk, &pol_map, BaselineFilter::Auto, none, none, none).unwrap();
    assert_eq!(sel.baselines.len(), 3);
    for &i in sel.baselines.iter() {
        assert!(chunk.baselines()[i].is_auto());
    }

    let sel =
        VisSelection::new(&chunk, &pol_map, BaselineFilter::Cross, none, none, none).unwrap();
    assert_eq!(sel.baselines.len(), 3);
    for &i in sel.baselines.iter() {
        assert!(!chunk.baselines()[i].is_auto());
    }
}

#[test]
fn test_station_patterns() {
    let (chunk, pol_map) = chunk_and_pols();
    // "CS00." matches both core stations; the product contains 0-0, 0-1, 1-0
    // and 1-1, but 1-0 isn't in the chunk.
    let sel = VisSelection::new(
        &chunk,
        &pol_map,
        BaselineFilter::All,
        &["CS00."],
        &["CS00."],
        &["yy", "xx"],
    )
    .unwrap();
    let bls: Vec<Baseline> = sel.baselines.iter().map(|&i| chunk.baselines()[i]).collect();
    assert_eq!(
        bls,
        vec![Baseline::new(0, 0), Baseline::new(0, 1), Baseline::new(1, 1)]
    );
    assert_eq!(sel.pols, vec1![0, 3]);

    // Patterns must match whole names.
    let result = VisSelection::new(&chunk, &pol_map, BaselineFilter::All, &["CS"], &["RS106"], &[]);
    assert!(matches!(result, Err(SelectionError::NoBaselines)));
}

#[test]
fn test_selection_errors() {
    let (chunk, pol_map) = chunk_and_pols();
    assert!(matches!(
        VisSelection::new(&chunk, &pol_map, BaselineFilter::All, &["CS001"], &[], &[]),
        Err(SelectionError::StationListLength {
            stations1: 1,
            stations2: 0
        })
    ));
    assert!(matches!(
        VisSelection::new(&chunk, &pol_map, BaselineFilter::All, &["CS(001"], &["CS002"], &[]),
        Err(SelectionError::BadPattern { .. })
    ));
    assert!(matches!(
        VisSelection::new(&chunk, &pol_map, BaselineFilter::Auto, &["CS001"], &["CS002"], &[]),
        Err(SelectionError::NoBaselines)
    ));
    assert!(matches!(
        VisSelection::new(&chunk, &pol_map, BaselineFilter::All, &[], &[], &["RR", "YX"]),
        Err(SelectionError::NoPolarisations)
    ));
}
