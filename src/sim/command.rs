//! Command schema consumed by the interpreter
//!
//! The block compiler emits JSON records `{ "type", "value", "unit" }`. They
//! are parsed once into the closed `Command` enum; numeric fields that are not
//! numbers are coerced to 0 so one bad block never aborts a whole program.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// How a MOVE magnitude is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MoveUnit {
    Rotations,
    Degrees,
    Seconds,
    /// Raw arena units
    #[default]
    Steps,
}

impl MoveUnit {
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("ROTATIONS") => MoveUnit::Rotations,
            Some("DEGREES") => MoveUnit::Degrees,
            Some("SECONDS") => MoveUnit::Seconds,
            _ => MoveUnit::Steps,
        }
    }
}

/// Sensor condition for WAIT_UNTIL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    Touch,
    /// A condition this engine cannot evaluate; never becomes true
    Unsupported(String),
}

/// Direction of continuous motor motion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorDirection {
    Forward,
    Backward,
}

impl MotorDirection {
    pub fn sign(self) -> i8 {
        match self {
            MotorDirection::Forward => 1,
            MotorDirection::Backward => -1,
        }
    }
}

/// One interpreted instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Signed magnitude; the sign selects forward/backward
    Move { value: f32, unit: MoveUnit },
    /// Signed degrees; positive turns right
    Rotate { degrees: f32 },
    SetColor(String),
    Wait { seconds: f32 },
    WaitUntil(WaitCondition),
    SetSpeed(f32),
    StartMotor(MotorDirection),
    StopMotors,
    /// Type tag this engine does not know (forward-compatible data)
    Unrecognized(String),
}

/// Wire form of a command as produced by the compiler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCommand {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl RawCommand {
    /// Numeric value, or 0 when missing or not a number
    pub fn number(&self) -> f32 {
        let n = match &self.value {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
            Some(Value::Null) | None => Some(0.0),
            _ => None,
        };
        match n.map(|v| v as f32) {
            Some(v) if v.is_finite() => v,
            _ => {
                log::warn!("{} command has non-numeric value {:?}, using 0", self.kind, self.value);
                0.0
            }
        }
    }

    /// Value as a tag string ("FORWARD", "TOUCH", "#ff0000", ...)
    pub fn tag(&self) -> String {
        match &self.value {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

impl From<RawCommand> for Command {
    fn from(raw: RawCommand) -> Self {
        match raw.kind.as_str() {
            "MOVE" => Command::Move {
                value: raw.number(),
                unit: MoveUnit::from_tag(raw.unit.as_deref()),
            },
            "ROTATE" => Command::Rotate {
                degrees: raw.number(),
            },
            "SET_COLOR" => Command::SetColor(raw.tag()),
            "WAIT" => Command::Wait {
                seconds: raw.number(),
            },
            "WAIT_UNTIL" => Command::WaitUntil(match raw.tag().as_str() {
                "TOUCH" => WaitCondition::Touch,
                other => WaitCondition::Unsupported(other.to_string()),
            }),
            "SET_SPEED" => Command::SetSpeed(raw.number()),
            "START_MOTOR" => Command::StartMotor(if raw.tag() == "FORWARD" {
                MotorDirection::Forward
            } else {
                MotorDirection::Backward
            }),
            "STOP_MOTORS" => Command::StopMotors,
            _ => Command::Unrecognized(raw.kind),
        }
    }
}

impl Command {
    /// Short label for logs
    pub fn name(&self) -> &str {
        match self {
            Command::Move { .. } => "MOVE",
            Command::Rotate { .. } => "ROTATE",
            Command::SetColor(_) => "SET_COLOR",
            Command::Wait { .. } => "WAIT",
            Command::WaitUntil(_) => "WAIT_UNTIL",
            Command::SetSpeed(_) => "SET_SPEED",
            Command::StartMotor(_) => "START_MOTOR",
            Command::StopMotors => "STOP_MOTORS",
            Command::Unrecognized(kind) => kind,
        }
    }
}

/// Parse a compiled program (a JSON array of command records)
pub fn parse_program(json: &str) -> Result<Vec<Command>> {
    let raw: Vec<RawCommand> = serde_json::from_str(json)?;
    Ok(raw.into_iter().map(Command::from).collect())
}
