use std::collections::HashSet;

use grid_traffic::simulation::{
    lookup, plan_toggle, resolve_tile, CellCoord, EditOutcome, Grid, RoadClass, Side, Signature,
    SimConfig, SimWorld, TileShape, TopologyError, SHAPE_TABLE,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn world(width: usize, length: usize) -> SimWorld {
    SimWorld::new(SimConfig {
        grid_width: width,
        grid_length: length,
        seed: Some(1),
        ..SimConfig::default()
    })
}

fn paint(world: &mut SimWorld, cells: &[(i32, i32)], class: RoadClass) {
    for &(col, row) in cells {
        let outcome = world
            .add_road(CellCoord::new(col, row), class)
            .expect("edit should succeed");
        assert!(matches!(outcome, EditOutcome::Applied(_)));
    }
}

fn key_at(world: &SimWorld, col: i32, row: i32) -> String {
    world
        .grid()
        .get(CellCoord::new(col, row))
        .expect("cell on grid")
        .signature
        .key()
}

fn shape_at(world: &SimWorld, col: i32, row: i32) -> Option<TileShape> {
    world
        .grid()
        .get(CellCoord::new(col, row))
        .and_then(|cell| cell.tile)
        .map(|tile| tile.shape)
}

/// Checks every road cell of the grid against the resolver invariants
fn assert_consistent(grid: &Grid) {
    for cell in grid.road_cells() {
        let tile = cell.tile.unwrap_or_else(|| panic!("road at {} has no tile", cell.coord));
        assert_eq!(lookup(&cell.signature), Some(tile), "stale tile at {}", cell.coord);

        let connected = grid.road_neighbors(cell.coord);
        for side in Side::ALL {
            let neighbor = cell.coord.neighbor(side);
            let edge = cell.signature.edge(side);
            if grid.is_road(neighbor) {
                assert!(edge.is_some(), "{} lacks an edge towards {:?}", cell.coord, side);
                let other = grid.get(neighbor).map(|n| n.signature.edge(side.opposite()));
                assert_eq!(other, Some(edge), "edge mismatch between {} and {}", cell.coord, neighbor);
            } else if edge.is_some() {
                // only the straight continuation of a dead end or isolated segment
                assert!(
                    connected.len() <= 1,
                    "{} has an edge towards empty {:?}",
                    cell.coord,
                    side
                );
                if let [only] = connected.as_slice() {
                    assert_eq!(*only, side.opposite(), "{} continues off-axis", cell.coord);
                }
            }
        }
    }
    for cell in grid.cells() {
        if !cell.occupancy.is_road() {
            assert!(cell.signature.is_empty());
            assert!(cell.tile.is_none());
        }
    }
}

#[test]
fn test_three_main_cells_in_a_row_make_a_straight() {
    let mut world = world(5, 5);
    paint(&mut world, &[(1, 2), (2, 2), (3, 2)], RoadClass::Main);

    assert_eq!(key_at(&world, 2, 2), "-M-M");
    let tile = world
        .grid()
        .get(CellCoord::new(2, 2))
        .and_then(|cell| cell.tile)
        .expect("tile");
    assert_eq!(tile.shape, TileShape::MainStraight);
    assert_eq!(tile.glyph, '━');
    assert_consistent(world.grid());
}

#[test]
fn test_isolated_cell_is_horizontal_straight() {
    let mut world = world(5, 5);
    paint(&mut world, &[(2, 2)], RoadClass::Local);
    assert_eq!(key_at(&world, 2, 2), "-N-N");
    assert_eq!(shape_at(&world, 2, 2), Some(TileShape::LocalStraight));
}

#[test]
fn test_vertical_pair_turns_straight() {
    let mut world = world(5, 5);
    paint(&mut world, &[(2, 2), (2, 3)], RoadClass::Local);
    assert_eq!(key_at(&world, 2, 2), "N-N-");
    assert_eq!(key_at(&world, 2, 3), "N-N-");
    assert_consistent(world.grid());
}

#[test]
fn test_four_neighbors_make_a_junction_in_any_order() {
    let orders: [[(i32, i32); 5]; 4] = [
        [(2, 2), (2, 1), (3, 2), (2, 3), (1, 2)],
        [(2, 1), (3, 2), (2, 3), (1, 2), (2, 2)],
        [(1, 2), (2, 3), (2, 2), (3, 2), (2, 1)],
        [(3, 2), (1, 2), (2, 1), (2, 3), (2, 2)],
    ];
    for class in [RoadClass::Local, RoadClass::Main] {
        for order in &orders {
            let mut world = world(5, 5);
            paint(&mut world, order, class);
            let expected = if class == RoadClass::Main {
                ("MMMM", TileShape::MainJunction)
            } else {
                ("NNNN", TileShape::LocalJunction)
            };
            assert_eq!(key_at(&world, 2, 2), expected.0, "order {:?}", order);
            assert_eq!(shape_at(&world, 2, 2), Some(expected.1));
            assert_consistent(world.grid());
        }
    }
}

#[test]
fn test_removing_a_segment_leaves_dead_ends() {
    let mut world = world(7, 5);
    paint(
        &mut world,
        &[(1, 2), (2, 2), (3, 2), (4, 2), (5, 2)],
        RoadClass::Local,
    );

    let outcome = world
        .add_road(CellCoord::new(3, 2), RoadClass::Local)
        .expect("removal");
    let EditOutcome::Applied(diff) = outcome else {
        panic!("removal should apply");
    };
    assert!(diff.get(CellCoord::new(3, 2)).is_some());

    let removed = world.grid().get(CellCoord::new(3, 2)).expect("cell");
    assert!(!removed.occupancy.is_road());
    assert!(removed.signature.is_empty());
    assert!(removed.tile.is_none());

    for col in [2, 4] {
        assert_eq!(world.grid().connectivity(CellCoord::new(col, 2)), 1);
        assert_eq!(shape_at(&world, col, 2), Some(TileShape::LocalStraight));
    }
    assert_consistent(world.grid());
}

#[test]
fn test_adjacent_sides_make_a_curve() {
    let mut world = world(5, 5);
    paint(&mut world, &[(2, 2), (3, 2), (2, 3)], RoadClass::Local);
    assert_eq!(key_at(&world, 2, 2), "-NN-");
    let tile = world
        .grid()
        .get(CellCoord::new(2, 2))
        .and_then(|cell| cell.tile)
        .expect("tile");
    assert_eq!(tile.shape, TileShape::LocalCurve);
    assert_eq!(tile.glyph, '┌');
    assert_consistent(world.grid());
}

#[test]
fn test_main_t_junction_rotation_follows_missing_side() {
    let mut world = world(5, 5);
    paint(&mut world, &[(1, 2), (2, 2), (3, 2), (2, 3)], RoadClass::Main);
    assert_eq!(key_at(&world, 2, 2), "-MMM");
    assert_eq!(shape_at(&world, 2, 2), Some(TileShape::MainT));
    assert_eq!(world.lights().len(), 1);
    assert_consistent(world.grid());
}

#[test]
fn test_mixed_classes_produce_lane_merge() {
    let mut world = world(5, 5);
    paint(&mut world, &[(1, 2)], RoadClass::Main);
    paint(&mut world, &[(2, 2)], RoadClass::Local);

    // the existing road keeps its class, the new cell merges into it
    assert_eq!(key_at(&world, 1, 2), "-M-M");
    assert_eq!(shape_at(&world, 1, 2), Some(TileShape::MainStraight));
    assert_eq!(key_at(&world, 2, 2), "-N-M");
    assert_eq!(shape_at(&world, 2, 2), Some(TileShape::LaneMerge));
    assert_consistent(world.grid());
}

#[test]
fn test_street_crossing_avenue_keeps_both_classes() {
    for class in [RoadClass::Main, RoadClass::Local] {
        let mut world = world(7, 7);
        paint(&mut world, &[(0, 3), (1, 3), (2, 3), (4, 3), (5, 3), (6, 3)], RoadClass::Main);
        paint(&mut world, &[(3, 0), (3, 1), (3, 2), (3, 4), (3, 5), (3, 6)], RoadClass::Local);
        paint(&mut world, &[(3, 3)], class);

        assert_eq!(key_at(&world, 3, 3), "NMNM", "crossing painted {:?}", class);
        assert_eq!(shape_at(&world, 3, 3), Some(TileShape::CrossJunction));
        // approaches are untouched
        assert_eq!(key_at(&world, 3, 2), "N-N-");
        assert_eq!(key_at(&world, 2, 3), "-M-M");
        assert_eq!(world.lights().len(), 1);
        assert_consistent(world.grid());
    }
}

#[test]
fn test_main_stem_onto_local_road() {
    let mut world = world(5, 5);
    paint(&mut world, &[(1, 2), (2, 2), (3, 2)], RoadClass::Local);
    paint(&mut world, &[(2, 3)], RoadClass::Main);

    assert_eq!(key_at(&world, 2, 2), "-NMN");
    assert_eq!(shape_at(&world, 2, 2), Some(TileShape::MainOntoLocalT));
    assert_eq!(key_at(&world, 2, 3), "M-M-");
    assert_eq!(key_at(&world, 1, 2), "-N-N");
    assert_consistent(world.grid());
}

#[test]
fn test_local_stem_onto_main_road() {
    let mut world = world(5, 5);
    paint(&mut world, &[(1, 2), (2, 2), (3, 2)], RoadClass::Main);
    paint(&mut world, &[(2, 3)], RoadClass::Local);

    assert_eq!(key_at(&world, 2, 2), "-MNM");
    assert_eq!(shape_at(&world, 2, 2), Some(TileShape::LocalOntoMainT));
    assert_eq!(key_at(&world, 2, 3), "N-N-");
    assert_eq!(key_at(&world, 3, 2), "-M-M");
    assert_consistent(world.grid());
}

#[test]
fn test_t_through_road_takes_dominant_class() {
    let mut world = world(5, 5);
    paint(&mut world, &[(1, 2)], RoadClass::Main);
    paint(&mut world, &[(3, 2), (2, 3)], RoadClass::Local);
    paint(&mut world, &[(2, 2)], RoadClass::Local);

    assert_eq!(key_at(&world, 2, 2), "-MNM");
    assert_eq!(shape_at(&world, 2, 2), Some(TileShape::LocalOntoMainT));
    // the Local arm of the through road turns into a merge
    assert_eq!(key_at(&world, 3, 2), "-N-M");
    assert_eq!(shape_at(&world, 3, 2), Some(TileShape::LaneMerge));
    assert_eq!(key_at(&world, 2, 3), "N-N-");
    assert_consistent(world.grid());
}

#[test]
fn test_mixed_four_way_promotes_vertical_axis() {
    let mut world = world(5, 5);
    paint(&mut world, &[(2, 1), (1, 2)], RoadClass::Main);
    paint(&mut world, &[(3, 2), (2, 3)], RoadClass::Local);
    paint(&mut world, &[(2, 2)], RoadClass::Local);

    assert_eq!(key_at(&world, 2, 2), "MNMM");
    assert_eq!(shape_at(&world, 2, 2), Some(TileShape::MainLocalJunction));
    // the southern approach now meets a Main edge
    assert_eq!(key_at(&world, 2, 3), "M-N-");
    assert_eq!(shape_at(&world, 2, 3), Some(TileShape::LaneMerge));
    assert_eq!(key_at(&world, 3, 2), "-N-N");
    assert_consistent(world.grid());
}

#[test]
fn test_single_main_approach_gives_local_main_junction() {
    let mut world = world(5, 5);
    paint(&mut world, &[(2, 1)], RoadClass::Main);
    paint(&mut world, &[(1, 2), (3, 2), (2, 3)], RoadClass::Local);
    paint(&mut world, &[(2, 2)], RoadClass::Local);

    assert_eq!(key_at(&world, 2, 2), "MNNN");
    assert_eq!(shape_at(&world, 2, 2), Some(TileShape::LocalMainJunction));
    assert_eq!(key_at(&world, 2, 1), "M-M-");
    assert_consistent(world.grid());
}

#[test]
fn test_out_of_bounds_edit_is_rejected() {
    let mut world = world(4, 4);
    let err = world
        .add_road(CellCoord::new(4, 0), RoadClass::Main)
        .expect_err("outside the grid");
    assert_eq!(
        err.downcast_ref::<TopologyError>(),
        Some(&TopologyError::OutOfBounds {
            cell: CellCoord::new(4, 0)
        })
    );
    assert_eq!(world.grid().road_count(), 0);
}

#[test]
fn test_unknown_signature_is_unresolved() {
    let signature = Signature::EMPTY.with(Side::Top, RoadClass::Main);
    let err = resolve_tile(CellCoord::new(0, 0), signature).expect_err("no dead-end tile");
    assert!(matches!(err, TopologyError::UnresolvedTopology { .. }));
    assert!(err.to_string().contains("M---"));
}

#[test]
fn test_shape_table_is_consistent() {
    let keys: HashSet<&str> = SHAPE_TABLE.iter().map(|(key, ..)| *key).collect();
    assert_eq!(keys.len(), SHAPE_TABLE.len());
    let glyphs: HashSet<char> = SHAPE_TABLE.iter().map(|(.., glyph)| *glyph).collect();
    assert_eq!(glyphs.len(), SHAPE_TABLE.len());

    for (key, shape, rotation, _) in SHAPE_TABLE.iter() {
        let mut signature = Signature::EMPTY;
        for (side, symbol) in Side::ALL.into_iter().zip(key.chars()) {
            match symbol {
                'M' => signature.set(side, Some(RoadClass::Main)),
                'N' => signature.set(side, Some(RoadClass::Local)),
                _ => {}
            }
        }
        assert_eq!(signature.key(), *key);

        let tile = lookup(&signature).expect("table entry resolves");
        assert_eq!(tile.shape, *shape);
        assert_eq!(tile.rotation, *rotation);

        let mut sides = tile.connected_sides();
        sides.sort();
        assert_eq!(sides, signature.sides(), "rotation of {} is off", key);
    }

    for shape in TileShape::ALL {
        assert!(SHAPE_TABLE.iter().any(|(_, s, ..)| *s == shape));
        assert!(shape.model_url().ends_with(".glb"));
    }
}

#[test]
fn test_planning_does_not_touch_the_grid() {
    let mut world = world(5, 5);
    paint(&mut world, &[(1, 1), (2, 1)], RoadClass::Main);
    let before: Vec<_> = world.grid().cells().to_vec();

    let diff = plan_toggle(world.grid(), CellCoord::new(2, 2), RoadClass::Local).expect("plan");
    assert!(!diff.is_empty());
    assert_eq!(world.grid().cells(), before.as_slice());
}

#[test]
fn test_random_edits_keep_the_grid_consistent() {
    let mut world = world(7, 6);
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..300 {
        let cell = CellCoord::new(rng.random_range(0..7), rng.random_range(0..6));
        let class = if rng.random_bool(0.5) {
            RoadClass::Main
        } else {
            RoadClass::Local
        };
        let outcome = world.add_road(cell, class).expect("edit");
        assert!(matches!(outcome, EditOutcome::Applied(_)));
        assert_consistent(world.grid());

        for cell in world.grid().road_cells() {
            let is_junction = world.grid().connectivity(cell.coord) >= 3;
            assert_eq!(world.lights().junction(cell.coord).is_some(), is_junction);
            assert!(world.lanes().tile(cell.coord).is_some());
        }
        assert_eq!(world.lanes().tile_count(), world.grid().road_count());
    }
}
