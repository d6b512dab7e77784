//! Robo Arena - simulation engine for a block-programmed classroom robot
//!
//! Core modules:
//! - `sim`: Deterministic engine (sensors, physics step, interpreter, mission verdict)
//! - `platform`: Time sources and the browser bridge
//! - `settings`: Engine timing and playback preferences
//! - `missions`: Built-in mission catalog

pub mod error;
pub mod missions;
pub mod platform;
pub mod settings;
pub mod sim;

pub use error::{Result, SimError};
pub use settings::{PlaybackSpeed, Settings};

use glam::Vec2;

/// Arena, sensor and motion constants
pub mod consts {
    /// Visible stage dimensions
    pub const STAGE_WIDTH: f32 = 600.0;
    pub const STAGE_HEIGHT: f32 = 360.0;
    /// Extra room past the stage on the x axis (road runs beyond the stage)
    pub const STAGE_X_PAD: f32 = 200.0;

    /// Hard arena bounds the robot is clamped to
    pub const ARENA_HALF_X: f32 = STAGE_WIDTH / 2.0 + STAGE_X_PAD;
    pub const ARENA_HALF_Y: f32 = STAGE_HEIGHT / 2.0;

    /// Touch triggers this far inside the arena bounds
    pub const WALL_TOUCH_MARGIN: f32 = 20.0;
    /// Robot radius used to expand obstacle boxes for touch
    pub const ROBOT_RADIUS: f32 = 15.0;
    /// Ultrasonic reads obstacle centers minus this offset
    pub const OBSTACLE_SURFACE_OFFSET: f32 = 20.0;
    /// Minimum cosine between heading and obstacle direction for an echo
    pub const ULTRASONIC_CONE_COS: f32 = 0.9;
    /// Ultrasonic sensor limit (cm)
    pub const ULTRASONIC_MAX: u16 = 250;

    /// Green start strip
    pub const START_LINE_X: f32 = -20.0;
    pub const START_LINE_HALF_WIDTH: f32 = 15.0;
    pub const START_LINE_HALF_LENGTH: f32 = 200.0;

    /// Red finish strip (half-width is mission tolerance plus this pad)
    pub const FINISH_LINE_PAD: f32 = 10.0;
    pub const FINISH_LINE_DEFAULT_TOLERANCE: f32 = 30.0;
    pub const FINISH_LINE_HALF_LENGTH: f32 = 190.0;
    /// Lateral deviation still counted as "on the road"
    pub const LATERAL_ALLOWANCE: f32 = 180.0;

    /// EV3 wheel circumference in cm
    pub const WHEEL_CIRCUMFERENCE: f32 = 17.6;

    /// Linear displacement per tick: STEP_BASE + speed% * STEP_RANGE.
    /// The maximum stays below ROBOT_RADIUS so one tick cannot reach past
    /// the expanded obstacle box into the obstacle itself.
    pub const STEP_BASE: f32 = 0.5;
    pub const STEP_RANGE: f32 = 14.0;
    /// Rotation per tick in degrees: TURN_BASE + speed% * TURN_RANGE
    pub const TURN_BASE: f32 = 1.0;
    pub const TURN_RANGE: f32 = 10.0;

    /// Speed percent at run start
    pub const DEFAULT_SPEED: f32 = 50.0;
    pub const MIN_SPEED: f32 = 1.0;
    pub const MAX_SPEED: f32 = 100.0;

    /// Robot start pose and paint
    pub const START_X: f32 = -200.0;
    pub const START_Y: f32 = 0.0;
    pub const START_ROTATION: f32 = 0.0;
    pub const DEFAULT_ROBOT_COLOR: &str = "#3b82f6";
}

/// Normalize a heading in degrees to [0, 360)
#[inline]
pub fn normalize_degrees(degrees: f32) -> f32 {
    let d = degrees.rem_euclid(360.0);
    // rem_euclid can return exactly 360.0 for tiny negative inputs
    if d >= 360.0 { 0.0 } else { d }
}

/// Unit vector for a heading in degrees (0 = +x, counter-clockwise positive)
#[inline]
pub fn heading_vector(degrees: f32) -> Vec2 {
    let rad = degrees.to_radians();
    Vec2::new(rad.cos(), rad.sin())
}

/// Clamp an effective speed percentage into the usable range
#[inline]
pub fn effective_speed(percent: f32) -> f32 {
    if percent.is_finite() {
        percent.clamp(consts::MIN_SPEED, consts::MAX_SPEED)
    } else {
        consts::MIN_SPEED
    }
}
