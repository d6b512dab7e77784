//! Fixed-size motion steps
//!
//! A linear step moves the robot along its heading and reports whether the
//! new pose touches something. A colliding step is still applied so the robot
//! comes to rest against the obstacle instead of stopping short of it, unless
//! it would land inside the obstacle itself.

use glam::Vec2;

use super::sensors::{inside_obstacle, refresh, touch};
use super::state::{Arena, RobotState};
use crate::consts::*;
use crate::effective_speed;

/// Result of one linear step
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub state: RobotState,
    pub collided: bool,
    /// Distance actually travelled this step
    pub travelled: f32,
}

/// Linear displacement per tick for a speed percentage
#[inline]
pub fn step_size(speed_percent: f32) -> f32 {
    STEP_BASE + (effective_speed(speed_percent) / 100.0) * STEP_RANGE
}

/// Heading change per tick in degrees for a speed percentage
#[inline]
pub fn turn_size(speed_percent: f32) -> f32 {
    TURN_BASE + (effective_speed(speed_percent) / 100.0) * TURN_RANGE
}

/// Advance one full tick at `speed_percent` in the direction of `direction` (sign only)
pub fn step(state: &RobotState, arena: Arena<'_>, direction: f32, speed_percent: f32) -> StepOutcome {
    advance(state, arena, direction.signum() * step_size(speed_percent))
}

/// Move `signed_distance` along the heading, with collision and clamp
pub fn advance(state: &RobotState, arena: Arena<'_>, signed_distance: f32) -> StepOutcome {
    let predicted = state.pos() + state.heading() * signed_distance;
    let clamped = Vec2::new(
        predicted.x.clamp(-ARENA_HALF_X, ARENA_HALF_X),
        predicted.y.clamp(-ARENA_HALF_Y, ARENA_HALF_Y),
    );

    // Never enter an obstacle's real box: hold position against it.
    // Checked after the clamp since some boxes extend past the arena edge.
    if inside_obstacle(clamped, arena.obstacles) {
        return StepOutcome {
            state: refresh(state.clone(), arena),
            collided: true,
            travelled: 0.0,
        };
    }

    // Past the bounds the clamped pose sits on the wall, so touch still fires
    let collided = touch(clamped, arena.obstacles);

    let mut next = state.clone();
    next.x = clamped.x;
    next.y = clamped.y;
    let travelled = next.pos().distance(state.pos());

    StepOutcome {
        state: refresh(next, arena),
        collided,
        travelled,
    }
}

/// Turn by `signed_degrees`; positive turns clockwise (toward -rotation).
/// No collision check: the robot turns in place.
pub fn rotate(state: &RobotState, arena: Arena<'_>, signed_degrees: f32) -> RobotState {
    let mut next = state.clone();
    next.rotation -= signed_degrees;
    refresh(next, arena)
}
