//! Robot state and world description types
//!
//! Everything the engine reads or emits per tick lives here. `RobotState` is a
//! value snapshot: the interpreter replaces it wholesale every tick.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::{heading_vector, normalize_degrees};

/// Floor color reported by the color sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SensorColor {
    #[default]
    Gray,
    Green,
    Red,
}

impl SensorColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorColor::Gray => "Gray",
            SensorColor::Green => "Green",
            SensorColor::Red => "Red",
        }
    }

    /// Dashboard swatch for this reading
    pub fn hex(&self) -> &'static str {
        match self {
            SensorColor::Red => "#ef4444",
            SensorColor::Green => "#22c55e",
            SensorColor::Gray => "#64748b",
        }
    }
}

/// Derived sensor values for one pose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SensorReadings {
    pub touch: bool,
    /// Ultrasonic distance in cm, 0..=250
    pub distance: u16,
    pub color: SensorColor,
}

/// Position and heading of the robot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    /// Heading in degrees, accumulated without normalization
    pub rotation: f32,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            x: START_X,
            y: START_Y,
            rotation: START_ROTATION,
        }
    }
}

/// Snapshot of the simulated robot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotState {
    pub x: f32,
    pub y: f32,
    /// Degrees; may exceed ±360 (see `display_rotation`)
    pub rotation: f32,
    /// Paint color set by program, independent of sensed color
    pub color: String,
    pub sensor_touch: bool,
    pub sensor_distance: u16,
    pub sensor_detected_color: SensorColor,
}

impl Default for RobotState {
    fn default() -> Self {
        Self::at(Pose::default())
    }
}

impl RobotState {
    /// Robot at a pose with default paint and unread sensors
    pub fn at(pose: Pose) -> Self {
        Self {
            x: pose.x,
            y: pose.y,
            rotation: pose.rotation,
            color: DEFAULT_ROBOT_COLOR.to_string(),
            sensor_touch: false,
            sensor_distance: ULTRASONIC_MAX,
            sensor_detected_color: SensorColor::Gray,
        }
    }

    #[inline]
    pub fn pos(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub fn pose(&self) -> Pose {
        Pose {
            x: self.x,
            y: self.y,
            rotation: self.rotation,
        }
    }

    /// Unit vector along the current heading
    #[inline]
    pub fn heading(&self) -> Vec2 {
        heading_vector(self.rotation)
    }

    pub fn sensors(&self) -> SensorReadings {
        SensorReadings {
            touch: self.sensor_touch,
            distance: self.sensor_distance,
            color: self.sensor_detected_color,
        }
    }

    /// Copy of this state with sensor fields replaced
    pub fn with_sensors(mut self, readings: SensorReadings) -> Self {
        self.sensor_touch = readings.touch;
        self.sensor_distance = readings.distance;
        self.sensor_detected_color = readings.color;
        self
    }

    /// Heading rounded into [0, 360) for display
    pub fn display_rotation(&self) -> i32 {
        (normalize_degrees(self.rotation).round() as i32) % 360
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.rotation.is_finite()
    }
}

/// An axis-aligned obstacle box (centered at x, y)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Degrees. Used for rendering only; collision treats the box as axis-aligned.
    #[serde(default)]
    pub rotation: f32,
    #[serde(default)]
    pub color: Option<String>,
}

impl Obstacle {
    pub fn new(id: &str, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            id: id.to_string(),
            x,
            y,
            width,
            height,
            rotation: 0.0,
            color: None,
        }
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Strict containment test against the box grown by `margin` on every side
    pub fn contains(&self, p: Vec2, margin: f32) -> bool {
        let half_w = self.width / 2.0 + margin;
        let half_h = self.height / 2.0 + margin;
        p.x > self.x - half_w && p.x < self.x + half_w && p.y > self.y - half_h && p.y < self.y + half_h
    }
}

/// Rectangular finish zone derived from a mission
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetStrip {
    pub x: f32,
    pub y: f32,
    pub tolerance: f32,
    pub finish_line_rotation: f32,
}

/// A mission descriptor (immutable once selected)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub target_x: Option<f32>,
    #[serde(default)]
    pub target_y: Option<f32>,
    #[serde(default)]
    pub tolerance: f32,
    #[serde(default)]
    pub finish_line_rotation: Option<f32>,
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
    /// Pose for fresh runs
    #[serde(default)]
    pub start: Pose,
}

impl Mission {
    /// Mission with no target and no obstacles
    pub fn free_drive(id: u32, title: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            description: String::new(),
            target_x: None,
            target_y: None,
            tolerance: 0.0,
            finish_line_rotation: None,
            obstacles: Vec::new(),
            start: Pose::default(),
        }
    }

    /// Finish zone, if the mission defines a target
    pub fn target(&self) -> Option<TargetStrip> {
        self.target_x.map(|x| TargetStrip {
            x,
            y: self.target_y.unwrap_or(0.0),
            tolerance: self.tolerance,
            finish_line_rotation: self.finish_line_rotation.unwrap_or(0.0),
        })
    }
}

/// Borrowed view of everything sensors depend on besides the pose
#[derive(Debug, Clone, Copy)]
pub struct Arena<'a> {
    pub obstacles: &'a [Obstacle],
    pub mission: Option<&'a Mission>,
}

impl<'a> Arena<'a> {
    pub fn new(obstacles: &'a [Obstacle], mission: Option<&'a Mission>) -> Self {
        Self { obstacles, mission }
    }

    /// Walls only, no obstacles or mission markings
    pub fn empty() -> Arena<'static> {
        Arena {
            obstacles: &[],
            mission: None,
        }
    }
}

/// Per-run statistics (dropped when the next run starts)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Total path length driven
    pub distance_moved: f32,
    /// Sum of absolute heading changes in degrees
    pub total_rotation: f32,
    pub touched: bool,
    /// Floor colors seen, in order of first detection
    pub detected_colors: Vec<SensorColor>,
    pub ticks: u64,
}

impl RunStats {
    pub fn observe(&mut self, state: &RobotState) {
        self.touched |= state.sensor_touch;
        if !self.detected_colors.contains(&state.sensor_detected_color) {
            self.detected_colors.push(state.sensor_detected_color);
        }
    }
}
