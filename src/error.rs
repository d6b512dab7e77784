//! Engine error types

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors surfaced by the engine and its loaders
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Program compiled to zero commands; nothing to run
    #[error("program contains no commands")]
    EmptyProgram,

    /// Input was not valid JSON for the expected shape
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Settings or catalog file could not be read
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Integration produced a NaN or infinite pose
    #[error("robot pose became non-finite (x={x}, y={y}, rotation={rotation})")]
    NonFinitePose { x: f32, y: f32, rotation: f32 },

    /// A run is still driving the robot; cancel it first
    #[error("a run is already in progress")]
    RunInProgress,

    #[error("unknown mission id {0}")]
    UnknownMission(u32),

    #[error("no obstacle with id '{0}'")]
    UnknownObstacle(String),
}
