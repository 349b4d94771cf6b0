use grid_traffic::simulation::{
    BatchKey, CellCoord, EditOutcome, PointerCoord, PointerInput, Position, RoadClass, SimConfig,
    SimWorld, SpawnOutcome, TileShape, VehicleUpdateResult,
};

fn config(width: usize, length: usize) -> SimConfig {
    SimConfig {
        grid_width: width,
        grid_length: length,
        ..SimConfig::default()
    }
    .with_seed(11)
}

#[test]
fn test_missing_tile_model_leaves_grid_untouched() {
    let mut world = SimWorld::new(config(5, 5));
    world
        .renderer_mut()
        .fail_asset(TileShape::LocalStraight.model_url());

    let outcome = world
        .add_road(CellCoord::new(2, 2), RoadClass::Local)
        .expect("edit is not an error");
    assert_eq!(outcome, EditOutcome::AssetUnavailable(TileShape::LocalStraight));
    assert_eq!(world.grid().road_count(), 0);
    assert_eq!(world.lanes().tile_count(), 0);
    assert_eq!(world.renderer().visible_in(BatchKey::Grass), 25);

    // other shapes still load
    let outcome = world
        .add_road(CellCoord::new(2, 2), RoadClass::Main)
        .expect("edit");
    assert!(matches!(outcome, EditOutcome::Applied(_)));
}

#[test]
fn test_failed_model_is_loaded_once() {
    let mut world = SimWorld::new(config(5, 5));
    world
        .renderer_mut()
        .fail_asset(BatchKey::Vehicle.model_url());
    let loads = world.renderer().load_count();

    let path = vec![Position::new(0.0, 0.0), Position::new(1.0, 0.0)];
    assert_eq!(world.spawn_vehicle(path.clone()), SpawnOutcome::AssetUnavailable);
    assert_eq!(world.spawn_vehicle(path), SpawnOutcome::AssetUnavailable);
    assert_eq!(world.renderer().load_count(), loads + 1);
    assert_eq!(world.stats().spawn_rejected_asset, 2);
    assert_eq!(world.vehicles().active_count(), 0);
}

#[test]
fn test_pointer_toggles_the_picked_cell() {
    let mut world = SimWorld::new(config(5, 5));
    let mut input = PointerInput::new();
    input.select_class(RoadClass::Main);

    assert_eq!(
        input.on_pointer_move(&world, PointerCoord::new(0.3, -0.2)),
        Some(CellCoord::new(2, 2))
    );

    let outcome = input
        .on_pointer_down(&mut world, PointerCoord::new(0.0, 0.0))
        .expect("edit");
    assert!(matches!(outcome, Some(EditOutcome::Applied(_))));
    assert!(world.grid().is_road(CellCoord::new(2, 2)));

    // the tile replaced the grass, picking still finds the cell
    assert_eq!(
        world.pick_cell(PointerCoord::new(0.1, 0.1)),
        Some(CellCoord::new(2, 2))
    );
    input
        .on_pointer_down(&mut world, PointerCoord::new(0.0, 0.0))
        .expect("edit");
    assert!(!world.grid().is_road(CellCoord::new(2, 2)));

    // off the grid
    let outcome = input
        .on_pointer_down(&mut world, PointerCoord::new(10.0, 10.0))
        .expect("nothing to edit");
    assert_eq!(outcome, None);
    assert_eq!(input.hovered, None);
}

#[test]
fn test_renderer_mirrors_the_world() {
    let mut world = SimWorld::new(config(5, 5));
    for col in 1..=3 {
        world
            .add_road(CellCoord::new(col, 2), RoadClass::Local)
            .expect("edit");
    }
    let renderer = world.renderer();
    assert_eq!(renderer.visible_in(BatchKey::Grass), 22);
    assert_eq!(renderer.visible_in(BatchKey::Tile(TileShape::LocalStraight)), 3);
    assert_eq!(renderer.visible_in(BatchKey::Vehicle), 0);

    let spawned = world.spawn_random_vehicle();
    assert!(matches!(spawned, SpawnOutcome::Spawned(_)));
    assert_eq!(world.renderer().visible_in(BatchKey::Vehicle), 1);

    let mut departed = false;
    for _ in 0..1000 {
        let report = world.tick();
        if !report.vehicles_with(VehicleUpdateResult::Departed).is_empty() {
            departed = true;
            break;
        }
    }
    assert!(departed);
    assert_eq!(world.renderer().visible_in(BatchKey::Vehicle), 0);
    assert_eq!(world.stats().vehicles_completed, 1);
}

#[test]
fn test_demo_layout() {
    let world = SimWorld::create_test_world(config(15, 11)).expect("demo world");
    let center = world
        .grid()
        .get(CellCoord::new(7, 5))
        .and_then(|cell| cell.tile)
        .expect("avenue crossing");
    assert_eq!(center.shape, TileShape::MainJunction);
    assert_eq!(
        world
            .grid()
            .get(CellCoord::new(7, 5))
            .map(|cell| cell.signature.key()),
        Some("MMMM".to_string())
    );

    // the crossing plus four T junctions where the avenues meet the ring
    assert_eq!(world.lights().len(), 5);
    for (col, row, key) in [(7, 1, "-NMN"), (7, 9, "MN-N"), (1, 5, "NMN-"), (13, 5, "N-NM")] {
        let cell = world.grid().get(CellCoord::new(col, row)).expect("ring junction");
        assert!(world.lights().junction(cell.coord).is_some());
        // the avenue joins the ring without changing its class
        assert_eq!(cell.signature.key(), key);
        assert_eq!(cell.tile.map(|tile| tile.shape), Some(TileShape::MainOntoLocalT));
    }
    assert_eq!(world.lanes().tile_count(), world.grid().road_count());
    assert!(world.render_map().contains('╋'));
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let run = || {
        let mut world = SimWorld::create_test_world(config(9, 9)).expect("demo world");
        for tick in 0..300 {
            if tick % 10 == 0 {
                world.spawn_random_vehicle();
            }
            world.tick();
        }
        (world.render_map(), world.stats().clone())
    };
    let (map_a, stats_a) = run();
    let (map_b, stats_b) = run();
    assert_eq!(map_a, map_b);
    assert_eq!(stats_a, stats_b);
    assert!(stats_a.vehicles_spawned > 0);
}

#[test]
fn test_random_spawns_work_on_closed_loops() {
    let mut world = SimWorld::new(config(5, 5));
    let ring = [
        (1, 1),
        (2, 1),
        (3, 1),
        (3, 2),
        (3, 3),
        (2, 3),
        (1, 3),
        (1, 2),
    ];
    for (col, row) in ring {
        world
            .add_road(CellCoord::new(col, row), RoadClass::Local)
            .expect("edit");
    }
    assert!(world.lanes().roots().is_empty());
    assert_eq!(world.lanes().walk_starts().len(), 2 * ring.len());

    for _ in 0..4 {
        let outcome = world.spawn_random_vehicle();
        let SpawnOutcome::Spawned(id) = outcome else {
            panic!("expected a spawn, got {:?}", outcome);
        };
        let start = world.vehicles().get(id).map(|vehicle| vehicle.position);
        let on_ring = start
            .and_then(|position| world.grid().cell_at(position))
            .is_some_and(|cell| world.grid().is_road(cell));
        assert!(on_ring);
    }
    assert_eq!(world.stats().spawn_rejected_path, 0);
}

#[test]
fn test_demo_world_spawns_vehicles() {
    let mut world = SimWorld::create_test_world(config(9, 9)).expect("demo world");
    assert!(world.lanes().roots().is_empty());
    assert!(matches!(world.spawn_random_vehicle(), SpawnOutcome::Spawned(_)));
    assert_eq!(world.stats().vehicles_spawned, 1);
}

#[test]
fn test_empty_world_cannot_spawn() {
    let mut world = SimWorld::new(config(4, 4));
    assert_eq!(world.spawn_random_vehicle(), SpawnOutcome::InsufficientPath);
    assert_eq!(world.stats().spawn_rejected_path, 1);
}

#[test]
fn test_routed_vehicle_reaches_destination() {
    let mut world = SimWorld::create_test_world(config(9, 9)).expect("demo world");
    assert!(world
        .spawn_vehicle_between(CellCoord::new(0, 0), CellCoord::new(7, 7))
        .is_err());

    let outcome = world
        .spawn_vehicle_between(CellCoord::new(1, 1), CellCoord::new(7, 7))
        .expect("both cells are roads");
    let SpawnOutcome::Spawned(id) = outcome else {
        panic!("expected a spawn, got {:?}", outcome);
    };
    let start = world.vehicles().get(id).map(|vehicle| vehicle.position);
    assert_eq!(
        start.and_then(|position| world.grid().cell_at(position)),
        Some(CellCoord::new(1, 1))
    );

    let mut last_position = start;
    for _ in 0..20_000 {
        let report = world.tick();
        if report.result_of(id) == Some(VehicleUpdateResult::Departed) {
            break;
        }
        last_position = world.vehicles().get(id).map(|vehicle| vehicle.position);
    }
    assert!(world.vehicles().get(id).is_none(), "vehicle never arrived");
    let end = last_position.and_then(|position| world.grid().cell_at(position));
    assert_eq!(end, Some(CellCoord::new(7, 7)));
}
