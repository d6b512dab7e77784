//! Sensor model: touch, color and ultrasonic readings for a pose
//!
//! Pure functions of pose + arena. Obstacle rotation is ignored here: boxes
//! are treated as axis-aligned, which is exact for the orthogonal walls the
//! missions use and an approximation for rotated ones.

use glam::Vec2;

use super::state::{Arena, Mission, Obstacle, RobotState, SensorColor, SensorReadings};
use crate::consts::*;

/// Compute every sensor reading for a state
pub fn compute_sensors(state: &RobotState, arena: Arena<'_>) -> SensorReadings {
    let pos = state.pos();
    SensorReadings {
        touch: touch(pos, arena.obstacles),
        distance: ultrasonic(pos, state.heading(), arena.obstacles),
        color: floor_color(pos, arena.mission),
    }
}

/// Recompute the derived fields of a state
pub fn refresh(state: RobotState, arena: Arena<'_>) -> RobotState {
    let readings = compute_sensors(&state, arena);
    state.with_sensors(readings)
}

/// Touch sensor: near the arena wall or within an obstacle's expanded box
pub fn touch(pos: Vec2, obstacles: &[Obstacle]) -> bool {
    near_wall(pos) || obstacles.iter().any(|obs| obs.contains(pos, ROBOT_RADIUS))
}

/// Within the touch margin of the outer boundary
pub fn near_wall(pos: Vec2) -> bool {
    pos.x <= -ARENA_HALF_X + WALL_TOUCH_MARGIN
        || pos.x >= ARENA_HALF_X - WALL_TOUCH_MARGIN
        || pos.y <= -ARENA_HALF_Y + WALL_TOUCH_MARGIN
        || pos.y >= ARENA_HALF_Y - WALL_TOUCH_MARGIN
}

/// Strictly inside an obstacle's real (unexpanded) box
pub fn inside_obstacle(pos: Vec2, obstacles: &[Obstacle]) -> bool {
    obstacles.iter().any(|obs| obs.contains(pos, 0.0))
}

/// Color sensor. First matching strip wins: start line, then finish line.
pub fn floor_color(pos: Vec2, mission: Option<&Mission>) -> SensorColor {
    if (pos.x - START_LINE_X).abs() < START_LINE_HALF_WIDTH && pos.y.abs() < START_LINE_HALF_LENGTH {
        return SensorColor::Green;
    }

    if let Some(target) = mission.and_then(Mission::target) {
        let tolerance = if target.tolerance > 0.0 {
            target.tolerance
        } else {
            FINISH_LINE_DEFAULT_TOLERANCE
        };
        let dx = (pos.x - target.x).abs();
        let dy = (pos.y - target.y).abs();
        if dx < tolerance + FINISH_LINE_PAD && dy < FINISH_LINE_HALF_LENGTH {
            return SensorColor::Red;
        }
    }

    SensorColor::Gray
}

/// Ultrasonic range along `heading`, rounded and clamped to 0..=250
pub fn ultrasonic(pos: Vec2, heading: Vec2, obstacles: &[Obstacle]) -> u16 {
    let mut dist = wall_distance(pos, heading);

    // Echo off obstacles whose center sits inside the forward cone
    for obs in obstacles {
        let to_obs = obs.center() - pos;
        let center_dist = to_obs.length();
        if center_dist <= 0.0 {
            continue;
        }
        let cos = to_obs.dot(heading) / center_dist;
        let surface = center_dist - OBSTACLE_SURFACE_OFFSET;
        if cos > ULTRASONIC_CONE_COS && surface < dist {
            dist = surface.max(0.0);
        }
    }

    clamp_reading(dist)
}

/// Distance along the ray to the arena bounding box (ray/AABB, exit point)
pub fn wall_distance(pos: Vec2, heading: Vec2) -> f32 {
    let t_x = axis_hit(pos.x, heading.x, -ARENA_HALF_X, ARENA_HALF_X);
    let t_y = axis_hit(pos.y, heading.y, -ARENA_HALF_Y, ARENA_HALF_Y);
    t_x.min(t_y)
}

/// Ray parameter to the plane the ray heads toward; axis-parallel rays never hit
fn axis_hit(origin: f32, dir: f32, min: f32, max: f32) -> f32 {
    if dir > f32::EPSILON {
        (max - origin) / dir
    } else if dir < -f32::EPSILON {
        (min - origin) / dir
    } else {
        f32::INFINITY
    }
}

fn clamp_reading(dist: f32) -> u16 {
    let max = ULTRASONIC_MAX as f32;
    if dist.is_nan() {
        return ULTRASONIC_MAX;
    }
    dist.clamp(0.0, max).round() as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::Pose;
    use proptest::prelude::*;

    fn mission_with_target(x: f32, tolerance: f32) -> Mission {
        let mut mission = Mission::free_drive(1, "target");
        mission.target_x = Some(x);
        mission.tolerance = tolerance;
        mission
    }

    fn state_at(x: f32, y: f32, rotation: f32) -> RobotState {
        RobotState::at(Pose { x, y, rotation })
    }

    #[test]
    fn test_touch_near_walls() {
        assert!(!touch(Vec2::new(0.0, 0.0), &[]));
        assert!(touch(Vec2::new(480.0, 0.0), &[]));
        assert!(!touch(Vec2::new(479.0, 0.0), &[]));
        assert!(touch(Vec2::new(-480.0, 0.0), &[]));
        assert!(touch(Vec2::new(0.0, 160.0), &[]));
        assert!(touch(Vec2::new(0.0, -160.0), &[]));
        assert!(!touch(Vec2::new(0.0, 159.0), &[]));
    }

    #[test]
    fn test_touch_obstacle_margin() {
        let obstacles = [Obstacle::new("cube1", -50.0, 0.0, 40.0, 40.0)];
        // Box spans x -70..-30; expanded -85..-15
        assert!(!touch(Vec2::new(-85.0, 0.0), &obstacles));
        assert!(touch(Vec2::new(-84.9, 0.0), &obstacles));
        assert!(touch(Vec2::new(-50.0, 34.0), &obstacles));
        assert!(!touch(Vec2::new(-50.0, 35.0), &obstacles));
    }

    #[test]
    fn test_touch_ignores_obstacle_rotation() {
        let mut obs = Obstacle::new("wall", 0.0, 0.0, 20.0, 100.0);
        obs.rotation = 90.0;
        // Still treated as a tall box, not a wide one
        assert!(touch(Vec2::new(0.0, 60.0), &[obs.clone()]));
        assert!(!touch(Vec2::new(60.0, 0.0), &[obs]));
    }

    #[test]
    fn test_color_priority() {
        let mission = mission_with_target(-20.0, 30.0);
        // On both strips: start line wins
        assert_eq!(floor_color(Vec2::new(-20.0, 0.0), Some(&mission)), SensorColor::Green);

        let mission = mission_with_target(100.0, 30.0);
        assert_eq!(floor_color(Vec2::new(139.0, 0.0), Some(&mission)), SensorColor::Red);
        assert_eq!(floor_color(Vec2::new(140.0, 0.0), Some(&mission)), SensorColor::Gray);
        assert_eq!(floor_color(Vec2::new(100.0, 189.0), Some(&mission)), SensorColor::Red);
        assert_eq!(floor_color(Vec2::new(100.0, 0.0), None), SensorColor::Gray);
    }

    #[test]
    fn test_finish_strip_zero_tolerance_uses_default() {
        let mission = mission_with_target(100.0, 0.0);
        assert_eq!(floor_color(Vec2::new(139.0, 0.0), Some(&mission)), SensorColor::Red);
    }

    #[test]
    fn test_start_line_strip() {
        assert_eq!(floor_color(Vec2::new(-34.0, 199.0), None), SensorColor::Green);
        assert_eq!(floor_color(Vec2::new(-35.0, 0.0), None), SensorColor::Gray);
        assert_eq!(floor_color(Vec2::new(-20.0, 200.0), None), SensorColor::Gray);
    }

    #[test]
    fn test_ultrasonic_walls() {
        // Facing +x from x=400: wall at 500
        assert_eq!(ultrasonic(Vec2::new(400.0, 0.0), Vec2::X, &[]), 100);
        // Facing +y from origin: wall at 180
        let up = crate::heading_vector(90.0);
        assert_eq!(ultrasonic(Vec2::ZERO, up, &[]), 180);
        // Far wall clamps to sensor limit
        assert_eq!(ultrasonic(Vec2::new(-200.0, 0.0), Vec2::X, &[]), 250);
    }

    #[test]
    fn test_ultrasonic_axis_aligned_heading() {
        assert_eq!(wall_distance(Vec2::ZERO, Vec2::new(-1.0, 0.0)), 500.0);
        assert_eq!(wall_distance(Vec2::ZERO, Vec2::new(0.0, -1.0)), 180.0);
    }

    #[test]
    fn test_ultrasonic_sees_obstacle_in_cone() {
        let obstacles = [Obstacle::new("cube1", -50.0, 0.0, 40.0, 40.0)];
        // Center 150 ahead minus 20 surface offset
        assert_eq!(ultrasonic(Vec2::new(-200.0, 0.0), Vec2::X, &obstacles), 130);
        // Facing away: obstacle ignored, wall behind is 300 away -> clamped
        assert_eq!(ultrasonic(Vec2::new(-200.0, 0.0), -Vec2::X, &obstacles), 250);
        // Obstacle well off to the side of the beam
        let side = [Obstacle::new("side", 0.0, 100.0, 20.0, 20.0)];
        assert_eq!(ultrasonic(Vec2::new(0.0, 0.0), Vec2::X, &side), 250);
    }

    #[test]
    fn test_ultrasonic_never_negative_next_to_obstacle() {
        let obstacles = [Obstacle::new("cube1", -50.0, 0.0, 40.0, 40.0)];
        assert_eq!(ultrasonic(Vec2::new(-60.0, 0.0), Vec2::X, &obstacles), 0);
    }

    #[test]
    fn test_compute_sensors_combines_readings() {
        let mission = mission_with_target(100.0, 30.0);
        let obstacles = mission.obstacles.clone();
        let state = state_at(100.0, 0.0, 0.0);
        let readings = compute_sensors(&state, Arena::new(&obstacles, Some(&mission)));
        assert!(!readings.touch);
        assert_eq!(readings.color, SensorColor::Red);
        assert_eq!(readings.distance, 250);
    }

    #[test]
    fn test_nan_heading_reads_max() {
        let heading = crate::heading_vector(f32::NAN);
        assert_eq!(ultrasonic(Vec2::ZERO, heading, &[]), 250);
    }

    proptest! {
        #[test]
        fn prop_sensing_is_idempotent(
            x in -500.0f32..500.0,
            y in -180.0f32..180.0,
            rotation in -1080.0f32..1080.0,
        ) {
            let mission = mission_with_target(100.0, 40.0);
            let obstacles = [
                Obstacle::new("a", -50.0, 0.0, 40.0, 40.0),
                Obstacle::new("b", 80.0, -90.0, 20.0, 200.0),
            ];
            let arena = Arena::new(&obstacles, Some(&mission));
            let state = state_at(x, y, rotation);
            let first = compute_sensors(&state, arena);
            let second = compute_sensors(&state, arena);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_distance_in_range(
            x in -600.0f32..600.0,
            y in -300.0f32..300.0,
            rotation in -720.0f32..720.0,
        ) {
            let obstacles = [Obstacle::new("a", 0.0, 0.0, 40.0, 40.0)];
            let d = ultrasonic(Vec2::new(x, y), crate::heading_vector(rotation), &obstacles);
            prop_assert!(d <= 250);
        }
    }
}
