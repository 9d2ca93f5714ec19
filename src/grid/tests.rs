// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;

#[test]
fn test_regular_axis_bounds() {
    let axis = Axis::regular(100.0, 10.0, 4);
    assert_eq!(axis.size(), 4);
    assert_abs_diff_eq!(axis.lower(2), 120.0);
    assert_abs_diff_eq!(axis.upper(2), 130.0);
    assert_abs_diff_eq!(axis.center(3), 135.0);
    assert_abs_diff_eq!(axis.start(), 100.0);
    assert_abs_diff_eq!(axis.end(), 140.0);
}

#[test]
fn test_regular_locate_bias() {
    let axis = Axis::regular(0.0, 1.0, 4);
    // Interior values don't care about the bias.
    assert_eq!(axis.locate(1.5, true), 1);
    assert_eq!(axis.locate(1.5, false), 1);
    // Boundaries do.
    assert_eq!(axis.locate(2.0, true), 2);
    assert_eq!(axis.locate(2.0, false), 1);
    // Almost on a boundary is on the boundary.
    assert_eq!(axis.locate(2.0 - 1e-9, true), 2);
    assert_eq!(axis.locate(2.0 + 1e-9, false), 1);
    // Clamping.
    assert_eq!(axis.locate(-5.0, true), 0);
    assert_eq!(axis.locate(0.0, false), 0);
    assert_eq!(axis.locate(4.0, true), 3);
    assert_eq!(axis.locate(40.0, false), 3);
}

#[test]
fn test_irregular_locate_bias() {
    let axis = Axis::irregular(vec![0.0, 1.0, 5.0], vec![1.0, 3.0, 6.0]).unwrap();
    assert_eq!(axis.locate(0.5, true), 0);
    assert_eq!(axis.locate(1.0, true), 1);
    assert_eq!(axis.locate(1.0, false), 0);
    assert_eq!(axis.locate(4.0, true), 2);
    assert_eq!(axis.locate(5.5, false), 2);
    assert_eq!(axis.locate(10.0, false), 2);
}

#[test]
fn test_irregular_axis_validation() {
    assert_eq!(
        Axis::irregular(vec![], vec![]),
        Err(GridError::EmptyAxis)
    );
    assert!(matches!(
        Axis::irregular(vec![0.0, 1.0], vec![1.0]),
        Err(GridError::BoundCountMismatch { lower: 2, upper: 1 })
    ));
    assert!(matches!(
        Axis::irregular(vec![0.0], vec![0.0]),
        Err(GridError::NonPositiveWidth { index: 0, .. })
    ));
    assert!(matches!(
        Axis::irregular(vec![0.0, 0.5], vec![1.0, 2.0]),
        Err(GridError::Unsorted { index: 1, .. })
    ));
}

#[test]
fn test_group_axis() {
    let axis = Axis::regular(0.0, 1.0, 5);
    let grouped = axis.group(2).unwrap();
    assert_eq!(grouped.size(), 3);
    assert_abs_diff_eq!(grouped.lower(1), 2.0);
    assert_abs_diff_eq!(grouped.upper(1), 4.0);
    // The last cell is short.
    assert_abs_diff_eq!(grouped.upper(2), 5.0);
    assert_eq!(axis.group(0), Err(GridError::ZeroCellSize));
}

#[test]
fn test_bbox_intersection() {
    let a = BBox::new(0.0, 10.0, 0.0, 5.0);
    let b = BBox::new(5.0, 20.0, 2.0, 3.0);
    let i = a.intersection(&b);
    assert_eq!(i, BBox::new(5.0, 10.0, 2.0, 3.0));
    assert!(!i.is_empty());
    assert!(a.overlaps(&b));

    // Touching boxes don't overlap.
    let c = BBox::new(10.0, 20.0, 0.0, 5.0);
    assert!(a.intersection(&c).is_empty());
    assert!(!a.overlaps(&c));

    assert!(a.contains(0.0, 0.0));
    assert!(!a.contains(10.0, 0.0));
    assert_eq!(a.center(), (5.0, 2.5));
}

#[test]
fn test_grid_cell_ids() {
    let grid = Grid::new(Axis::regular(0.0, 1.0, 3), Axis::regular(0.0, 1.0, 2));
    assert_eq!(grid.shape(), (3, 2));
    assert_eq!(grid.num_cells(), 6);
    let loc = Location::new(2, 1);
    assert_eq!(grid.cell_id(loc), 5);
    assert_eq!(grid.location(5), loc);
    assert_eq!(grid.cell_box(loc), BBox::new(2.0, 3.0, 1.0, 2.0));
    assert_eq!(grid.bbox(), BBox::new(0.0, 3.0, 0.0, 2.0));
    assert_eq!(
        grid.span_box(Location::new(1, 0), Location::new(2, 1)),
        BBox::new(1.0, 3.0, 0.0, 2.0)
    );
    assert_eq!(grid.locate(1.0, 1.0, true), Location::new(1, 1));
    assert_eq!(grid.locate(1.0, 1.0, false), Location::new(0, 0));
}

#[test]
fn test_grouped_grid_aligns_with_samples() {
    let grid = Grid::new(Axis::regular(150e6, 40e3, 8), Axis::regular(0.0, 2.0, 4));
    let cells = grid.group(3, 4).unwrap();
    assert_eq!(cells.shape(), (3, 1));
    assert_abs_diff_eq!(cells.freq.lower(1), grid.freq.lower(3));
    assert_abs_diff_eq!(cells.freq.upper(2), grid.freq.end());
    assert_abs_diff_eq!(cells.time.upper(0), grid.time.end());
}
