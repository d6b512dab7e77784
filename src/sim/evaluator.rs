//! Mission verdict for the final pose of a fresh run

use std::fmt;

use serde::{Deserialize, Serialize};

use super::state::{Mission, RobotState};
use crate::consts::LATERAL_ALLOWANCE;

/// Which side of the finish zone the robot stopped on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissDirection {
    /// Stopped before the zone
    Short,
    /// Drove past the zone
    Long,
}

/// Why a mission failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    Collision,
    /// Outside the zone along x; `by` is the rounded distance past tolerance
    MissedTarget { by: i32, direction: MissDirection },
    OffRoad,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Collision => write!(f, "The robot crashed into an obstacle or wall!"),
            FailureReason::MissedTarget { by, direction } => {
                let hint = match direction {
                    MissDirection::Short => "Move forward more.",
                    MissDirection::Long => "You went too far.",
                };
                write!(f, "You missed the target zone by {} cm.\n{}", by, hint)
            }
            FailureReason::OffRoad => write!(f, "The robot is too far to the side (off the road)."),
        }
    }
}

/// Outcome of a completed fresh run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Verdict {
    Success,
    Failure { reason: FailureReason },
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Success)
    }

    pub fn reason(&self) -> Option<&FailureReason> {
        match self {
            Verdict::Success => None,
            Verdict::Failure { reason } => Some(reason),
        }
    }

    fn failure(reason: FailureReason) -> Self {
        Verdict::Failure { reason }
    }
}

/// Judge the final state of a run.
///
/// A collision fails the mission regardless of position. Without a collision,
/// a mission that defines no target produces no verdict at all.
pub fn evaluate(final_state: &RobotState, mission: &Mission) -> Option<Verdict> {
    if final_state.sensor_touch {
        return Some(Verdict::failure(FailureReason::Collision));
    }

    let target = mission.target()?;
    let dx = (final_state.x - target.x).abs();
    let dy = (final_state.y - target.y).abs();

    if dx <= target.tolerance && dy <= LATERAL_ALLOWANCE {
        return Some(Verdict::Success);
    }

    if dx > target.tolerance {
        let direction = if final_state.x < target.x {
            MissDirection::Short
        } else {
            MissDirection::Long
        };
        Some(Verdict::failure(FailureReason::MissedTarget {
            by: (dx - target.tolerance).round() as i32,
            direction,
        }))
    } else {
        Some(Verdict::failure(FailureReason::OffRoad))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::Pose;

    fn mission() -> Mission {
        let mut m = Mission::free_drive(1, "Go the Distance");
        m.target_x = Some(100.0);
        m.target_y = Some(0.0);
        m.tolerance = 30.0;
        m
    }

    fn final_state(x: f32, y: f32) -> RobotState {
        RobotState::at(Pose { x, y, rotation: 0.0 })
    }

    #[test]
    fn test_exact_target_succeeds() {
        assert_eq!(evaluate(&final_state(100.0, 0.0), &mission()), Some(Verdict::Success));
        assert_eq!(evaluate(&final_state(130.0, 0.0), &mission()), Some(Verdict::Success));
        assert_eq!(evaluate(&final_state(70.0, -180.0), &mission()), Some(Verdict::Success));
    }

    #[test]
    fn test_overshoot_and_undershoot() {
        let verdict = evaluate(&final_state(131.0, 0.0), &mission()).unwrap();
        assert_eq!(
            verdict.reason(),
            Some(&FailureReason::MissedTarget {
                by: 1,
                direction: MissDirection::Long
            })
        );
        assert!(verdict.reason().unwrap().to_string().contains("by 1 cm"));
        assert!(verdict.reason().unwrap().to_string().ends_with("You went too far."));

        let verdict = evaluate(&final_state(-200.0, 0.0), &mission()).unwrap();
        assert_eq!(
            verdict.reason(),
            Some(&FailureReason::MissedTarget {
                by: 270,
                direction: MissDirection::Short
            })
        );
        assert!(verdict.reason().unwrap().to_string().ends_with("Move forward more."));
    }

    #[test]
    fn test_distance_miss_reported_before_lateral() {
        let verdict = evaluate(&final_state(200.0, 300.0), &mission()).unwrap();
        assert!(matches!(
            verdict.reason(),
            Some(FailureReason::MissedTarget { .. })
        ));
    }

    #[test]
    fn test_off_road() {
        let verdict = evaluate(&final_state(100.0, 181.0), &mission()).unwrap();
        assert_eq!(verdict.reason(), Some(&FailureReason::OffRoad));
    }

    #[test]
    fn test_touch_overrides_target() {
        let mut state = final_state(100.0, 0.0);
        state.sensor_touch = true;
        let verdict = evaluate(&state, &mission()).unwrap();
        assert!(!verdict.is_success());
        assert_eq!(verdict.reason(), Some(&FailureReason::Collision));
    }

    #[test]
    fn test_no_target_no_verdict() {
        let free = Mission::free_drive(5, "Sandbox");
        assert_eq!(evaluate(&final_state(0.0, 0.0), &free), None);

        let mut crashed = final_state(0.0, 0.0);
        crashed.sensor_touch = true;
        assert_eq!(
            evaluate(&crashed, &free),
            Some(Verdict::Failure {
                reason: FailureReason::Collision
            })
        );
    }

    #[test]
    fn test_target_y_defaults_to_zero() {
        let mut m = mission();
        m.target_y = None;
        assert_eq!(evaluate(&final_state(100.0, 170.0), &m), Some(Verdict::Success));
    }

    #[test]
    fn test_verdict_serializes_with_reason() {
        let verdict = Verdict::Failure {
            reason: FailureReason::OffRoad,
        };
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["result"], "failure");
        assert_eq!(json["reason"]["kind"], "off_road");
    }
}
