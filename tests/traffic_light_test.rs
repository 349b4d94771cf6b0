use grid_traffic::simulation::{
    CellCoord, LightPhase, LightSync, LightTimings, Position, RoadClass, Side, SimConfig,
    SimWorld, TrafficLight, TrafficLights,
};

fn four_way() -> TrafficLights {
    let mut lights = TrafficLights::new(LightTimings::default());
    assert_eq!(
        lights.sync(CellCoord::new(2, 2), Position::default(), &Side::ALL),
        LightSync::Created
    );
    lights
}

fn light(lights: &TrafficLights, approach: Side) -> TrafficLight {
    lights
        .junction(CellCoord::new(2, 2))
        .and_then(|junction| junction.light(approach))
        .cloned()
        .expect("light on approach")
}

#[test]
fn test_initial_phases_split_by_axis() {
    let lights = four_way();
    for side in Side::ALL {
        let light = light(&lights, side);
        if side.is_vertical() {
            assert_eq!(light.phase, LightPhase::Green);
            assert!(light.hit_box.is_none());
        } else {
            assert_eq!(light.phase, LightPhase::Red);
            assert_eq!(light.hit_box, Some(light.stop_box));
        }
    }
}

#[test]
fn test_phase_changes_follow_the_timings() {
    let mut lights = four_way();
    let mut vertical = Vec::new();
    let mut horizontal = Vec::new();

    for tick in 1..=1400u32 {
        for change in lights.tick() {
            match change.approach {
                Side::Top => vertical.push((tick, change.phase)),
                Side::Left => horizontal.push((tick, change.phase)),
                _ => {}
            }
        }

        let north = light(&lights, Side::Top);
        let west = light(&lights, Side::Left);
        for light in [&north, &west] {
            assert_eq!(light.hit_box.is_some(), light.phase.is_stop(), "tick {}", tick);
        }
        assert!(
            north.phase.is_stop() || west.phase.is_stop(),
            "crossing approaches both open at tick {}",
            tick
        );
    }

    assert_eq!(
        vertical,
        vec![
            (500, LightPhase::Yellow),
            (600, LightPhase::YellowDelay),
            (650, LightPhase::Red),
            (1250, LightPhase::RedDelay),
            (1400, LightPhase::Green),
        ]
    );
    assert_eq!(
        horizontal,
        vec![
            (600, LightPhase::RedDelay),
            (750, LightPhase::Green),
            (1250, LightPhase::Yellow),
            (1350, LightPhase::YellowDelay),
            (1400, LightPhase::Red),
        ]
    );
}

#[test]
fn test_stop_box_sits_inside_the_entry_edge() {
    let lights = four_way();
    let west = light(&lights, Side::Left);
    let center = west.stop_box.center();
    assert!(center.is_close(&Position::new(-0.475, 0.15), 1e-5));
    assert!(west.stop_box.contains(Position::new(-0.48, 0.2)));
    assert!(!west.stop_box.contains(Position::new(-0.4, 0.15)));
    // the outbound lane on the same side is never covered
    assert!(!west.stop_box.contains(Position::new(-0.475, -0.15)));
}

#[test]
fn test_sync_tracks_junction_shape() {
    let cell = CellCoord::new(3, 3);
    let center = Position::new(1.0, 1.0);
    let mut lights = TrafficLights::new(LightTimings::default());

    assert_eq!(
        lights.sync(cell, center, &[Side::Left, Side::Top, Side::Right]),
        LightSync::Created
    );
    assert_eq!(
        lights.sync(cell, center, &[Side::Right, Side::Left, Side::Top]),
        LightSync::Unchanged
    );
    assert_eq!(
        lights.junction(cell).map(|junction| junction.approaches()),
        Some(vec![Side::Top, Side::Right, Side::Left])
    );

    assert_eq!(lights.sync(cell, center, &Side::ALL), LightSync::Rebuilt);
    assert_eq!(lights.junction(cell).map(|j| j.lights.len()), Some(4));

    assert_eq!(
        lights.sync(cell, center, &[Side::Top, Side::Bottom]),
        LightSync::Removed
    );
    assert_eq!(
        lights.sync(cell, center, &[Side::Top, Side::Bottom]),
        LightSync::Unchanged
    );
    assert!(lights.is_empty());
}

#[test]
fn test_zero_durations_still_advance() {
    let timings = LightTimings {
        green: 0,
        yellow: 0,
        yellow_delay: 0,
        red: 0,
        red_delay: 0,
    };
    let mut lights = TrafficLights::new(timings);
    lights.sync(CellCoord::new(1, 1), Position::default(), &Side::ALL);
    assert_eq!(lights.tick().len(), 4);
    assert_eq!(light_at(&lights, Side::Top), LightPhase::Yellow);
    assert_eq!(light_at(&lights, Side::Right), LightPhase::RedDelay);
}

fn light_at(lights: &TrafficLights, side: Side) -> LightPhase {
    lights
        .junction(CellCoord::new(1, 1))
        .and_then(|junction| junction.light(side))
        .map(|light| light.phase)
        .expect("light")
}

#[test]
fn test_world_places_and_removes_junction_lights() {
    let mut world = SimWorld::new(SimConfig {
        grid_width: 5,
        grid_length: 5,
        ..SimConfig::default()
    });
    for (col, row) in [(1, 2), (2, 2), (3, 2), (2, 3)] {
        world
            .add_road(CellCoord::new(col, row), RoadClass::Main)
            .expect("edit");
    }

    let junction = world
        .lights()
        .junction(CellCoord::new(2, 2))
        .expect("T junction has lights");
    assert_eq!(junction.approaches(), vec![Side::Right, Side::Bottom, Side::Left]);
    assert_eq!(world.stats().junctions, 1);

    // removing the stem turns the junction back into a straight
    world
        .add_road(CellCoord::new(2, 3), RoadClass::Main)
        .expect("removal");
    assert!(world.lights().is_empty());
    assert_eq!(world.stats().junctions, 0);
}
