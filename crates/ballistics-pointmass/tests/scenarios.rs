//! End-to-end trajectory scenarios exercising the engine, search layer, and
//! event filter together rather than one module in isolation.

use ballistics_core::{Atmosphere, BallisticsError, Config, Coriolis, WindSegment};
use ballistics_models::tables::G7_KNOTS;
use ballistics_models::DragCurve;
use ballistics_pointmass::{error_at_distance, find_apex, find_zero_angle, zero_angle, Engine, IntegratorKind, ShotProps, TrajFlag};

const FEET_PER_YARD: f64 = 3.0;
const INCHES_PER_FOOT: f64 = 12.0;

fn g7_175gr_shot(elevation_rad: f64, sight_height_in: f64, flags: TrajFlag, wind: Vec<WindSegment>) -> ShotProps {
    ShotProps::new(
        0.22,
        0.0,
        12.0,
        1.2,
        0.308,
        175.0,
        elevation_rad,
        0.0,
        sight_height_in / INCHES_PER_FOOT,
        0.0,
        0.0,
        1.0 / 15.0,
        2600.0,
        flags,
        DragCurve::new(G7_KNOTS).unwrap(),
        Atmosphere::standard(),
        Coriolis::none(),
        wind,
    )
    .unwrap()
}

/// A 100-yd zero on a 2600 fps G7 0.22 load should land a few tenths of a
/// degree of barrel elevation above the line of sight, not degrees, and not
/// a fraction of a minute.
#[test]
fn hundred_yard_zero_lands_at_a_small_positive_elevation() {
    let shot = g7_175gr_shot(0.0, 2.0, TrajFlag::NONE, Vec::new());
    let engine = Engine::new(Config::default(), shot, IntegratorKind::Rk4);

    let angle = zero_angle(&engine, 100.0 * FEET_PER_YARD).unwrap();
    assert!(angle > 0.0, "a rifle zeroed with the sights above the bore needs positive elevation");
    assert!(angle < 0.01, "a 100-yd zero elevation should be a small fraction of a radian, got {angle}");

    let residual = error_at_distance(&engine, angle, 100.0 * FEET_PER_YARD).unwrap();
    assert!(residual.abs() < 0.1, "zero_angle should land within a tenth of a foot of the line of sight, got {residual}");
}

/// A range card built at the 100-yd zero should show the bullet well below
/// the line of sight by 500 yd, and windage should push the same direction
/// as a 3 o'clock crosswind consistently (not flip sign partway through).
#[test]
fn range_card_at_500_yards_drops_and_drifts_with_crosswind() {
    let wind = vec![WindSegment { velocity_fps: 5.0 * 5280.0 / 3600.0, direction_from_rad: std::f64::consts::FRAC_PI_2, until_distance_ft: f64::INFINITY }];
    let shot = g7_175gr_shot(0.0, 2.0, TrajFlag::NONE, wind.clone());
    let zero_engine = Engine::new(Config::default(), shot, IntegratorKind::Rk4);
    let elevation = zero_angle(&zero_engine, 100.0 * FEET_PER_YARD).unwrap();

    let firing_shot = g7_175gr_shot(elevation, 2.0, TrajFlag::RANGE, wind);
    let engine = Engine::new(Config::default(), firing_shot, IntegratorKind::Rk4);
    let out = engine.integrate(500.0 * FEET_PER_YARD, 100.0 * FEET_PER_YARD, 0.0, false).unwrap();

    let row_500 = out
        .hit
        .rows
        .iter()
        .find(|r| (r.position.x - 500.0 * FEET_PER_YARD).abs() < 1e-3)
        .expect("a row should be sampled at 500 yd");

    assert!(row_500.height_ft < 0.0, "the bullet should be below the line of sight by 500 yd, height={}", row_500.height_ft);
    assert!(row_500.windage_ft.abs() > 0.0, "a 5 mph crosswind should produce nonzero windage by 500 yd");
}

/// The apex of a 45-degree shot must have (near) zero vertical velocity and
/// strictly positive height, time, and sit above every other row recorded.
#[test]
fn apex_of_a_45_degree_shot_has_zero_vertical_velocity_and_max_height() {
    let shot = g7_175gr_shot(45f64.to_radians(), 2.0, TrajFlag::RANGE, Vec::new());
    let mut config = Config::default();
    config.max_integration_range = 50_000.0;
    let engine = Engine::new(config, shot, IntegratorKind::Rk4);

    let apex = find_apex(&engine).unwrap();
    assert!(apex.velocity.y.abs() < 1e-3, "apex vertical velocity should be ~0, got {}", apex.velocity.y);
    assert!(apex.time > 0.0);

    let out = engine.integrate(apex.position.x * 2.0, 50.0, 0.0, false).unwrap();
    for row in &out.hit.rows {
        assert!(row.position.y <= apex.position.y + 1e-6, "no recorded row should be higher than the apex");
    }
}

/// A flight long enough to go from supersonic to subsonic should record
/// exactly one MACH-flagged row, at Mach (near) 1.0.
#[test]
fn mach_crossing_is_recorded_exactly_once() {
    let shot = g7_175gr_shot(0.0, 2.0, TrajFlag::MACH, Vec::new());
    let mut config = Config::default();
    config.max_integration_range = 10_000.0;
    let engine = Engine::new(config, shot, IntegratorKind::Rk4);

    let out = engine.integrate(10_000.0, 0.0, 0.0, false).unwrap();
    let mach_rows: Vec<_> = out.hit.rows.iter().filter(|r| r.flag.contains(TrajFlag::MACH)).collect();
    assert_eq!(mach_rows.len(), 1, "expected exactly one Mach-crossing row, got {}", mach_rows.len());
    assert!((mach_rows[0].mach - 1.0).abs() < 1e-3);
}

/// A subsonic .22 air-rifle pellet zeroed at 10 km should report an
/// out-of-range error, with the reported max range far short of 10 km.
#[test]
fn pellet_zero_at_ten_kilometers_is_out_of_range() {
    let shot = ShotProps::new(
        0.02,
        0.0,
        0.0,
        0.2,
        0.177,
        14.3,
        0.0,
        0.0,
        1.0 / 12.0,
        0.0,
        0.0,
        1.0 / 60.0,
        900.0,
        TrajFlag::NONE,
        DragCurve::new(G7_KNOTS).unwrap(),
        Atmosphere::standard(),
        Coriolis::none(),
        Vec::new(),
    )
    .unwrap();
    let mut config = Config::default();
    config.max_integration_range = 20_000.0;
    let engine = Engine::new(config, shot, IntegratorKind::Rk4);

    let ten_km_ft = 10_000.0 / 0.3048;
    let err = find_zero_angle(&engine, ten_km_ft).expect_err("a subsonic pellet should not reach 10 km");
    match err {
        BallisticsError::OutOfRangeError { max_range_ft, .. } => {
            assert!(max_range_ft < ten_km_ft, "max range {max_range_ft} should be well short of {ten_km_ft}");
        }
        other => panic!("expected OutOfRangeError, got {other:?}"),
    }
}

/// A normal elevated zero rises above the line of sight and falls back
/// through it once, farther out. With a generous event-union window, a
/// zero-down crossing that lands close to a range-step boundary must merge
/// into one row carrying both flags rather than emitting two adjacent rows.
#[test]
fn zero_down_crossing_fires_once_and_merges_with_a_nearby_range_row() {
    let zero_shot = g7_175gr_shot(0.0, 2.0, TrajFlag::NONE, Vec::new());
    let zero_engine = Engine::new(Config::default(), zero_shot, IntegratorKind::Rk4);
    let elevation = zero_angle(&zero_engine, 200.0 * FEET_PER_YARD).unwrap();

    let mut config = Config::default();
    config.separate_row_time_delta = 5e-3;
    let shot = g7_175gr_shot(elevation, 2.0, TrajFlag::RANGE | TrajFlag::ZERO_DOWN, Vec::new());
    let engine = Engine::new(config, shot, IntegratorKind::Rk4);

    let out = engine.integrate(3000.0, 100.0, 0.0, false).unwrap();
    let zero_down_rows: Vec<_> = out.hit.rows.iter().filter(|r| r.flag.contains(TrajFlag::ZERO_DOWN)).collect();
    assert_eq!(zero_down_rows.len(), 1, "zero-down should fire exactly once for a simple rise-and-fall trajectory");

    let mut times: Vec<f64> = out.hit.rows.iter().map(|r| r.time).collect();
    times.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
    assert_eq!(times.len(), out.hit.rows.len(), "no two rows should share an (near-)identical timestamp");
}
