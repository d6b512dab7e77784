//! Deterministic simulation module
//!
//! All robot behavior lives here. This module must stay pure and deterministic:
//! - Fixed tick length, virtual time only
//! - No sleeping, no wall-clock reads
//! - Obstacles evaluated in mission order
//! - No rendering or platform dependencies

pub mod command;
pub mod evaluator;
pub mod interpreter;
pub mod physics;
pub mod sensors;
pub mod simulator;
pub mod state;

pub use command::{Command, MotorDirection, MoveUnit, RawCommand, WaitCondition, parse_program};
pub use evaluator::{FailureReason, MissDirection, Verdict, evaluate};
pub use interpreter::{CancelToken, Interpreter, RunMode, RunPhase, TickStatus};
pub use physics::{StepOutcome, advance, rotate, step};
pub use sensors::{compute_sensors, refresh};
pub use simulator::Simulator;
pub use state::{Arena, Mission, Obstacle, Pose, RobotState, RunStats, SensorColor, SensorReadings};
