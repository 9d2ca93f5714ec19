// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use strum::IntoEnumIterator;

use super::*;

#[test]
fn test_canonical_order() {
    let indices: Vec<usize> = Polarisation::iter().map(|p| p.index()).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    for p in Polarisation::iter() {
        assert_eq!(Polarisation::from_index(p.index()), Some(p));
    }
    assert_eq!(Polarisation::from_index(4), None);
}

#[test]
fn test_parse_is_case_insensitive() {
    assert_eq!(Polarisation::parse("xx"), Some(Polarisation::XX));
    assert_eq!(Polarisation::parse(" Yx "), Some(Polarisation::YX));
    assert_eq!(Polarisation::parse("RR"), None);
    assert_eq!(Polarisation::parse(""), None);
}

#[test]
fn test_map_storage_order() {
    let map = PolMap::new(&["YY", "XX"]);
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(0), Some(Polarisation::YY));
    assert_eq!(map.get(1), Some(Polarisation::XX));
    assert_eq!(map.get(2), None);
    assert_eq!(map.storage_index(Polarisation::XX), Some(1));
    assert_eq!(map.storage_index(Polarisation::XY), None);
}

#[test]
fn test_unrecognised_pols_are_invalid() {
    let map = PolMap::new(&["XX", "RL", "YY", "I"]);
    assert_eq!(map.get(1), None);
    assert_eq!(map.get(3), None);
    assert_eq!(map.valid_indices().collect::<Vec<_>>(), vec![0, 2]);
    assert_eq!(map.name(1), Some("RL"));
    // Invalid pols can't be found, even by their own name.
    assert_eq!(map.find("RL").count(), 0);
    assert_eq!(map.find("yy").collect::<Vec<_>>(), vec![2]);
}
