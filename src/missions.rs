//! Built-in mission catalog
//!
//! The four classroom missions shipped with the editor, plus a loader for
//! catalogs supplied as JSON (same camelCase shape as `Mission`).

use crate::error::{Result, SimError};
use crate::sim::state::{Mission, Obstacle, Pose};

const OBSTACLE_RED: &str = "#ef4444";
const WALL_SLATE: &str = "#64748b";
const GATE_ORANGE: &str = "#f59e0b";

fn block(id: &str, x: f32, y: f32, width: f32, height: f32, color: &str) -> Obstacle {
    Obstacle {
        color: Some(color.to_string()),
        ..Obstacle::new(id, x, y, width, height)
    }
}

fn mission(id: u32, title: &str, description: &str, target_x: f32, tolerance: f32, obstacles: Vec<Obstacle>) -> Mission {
    Mission {
        id,
        title: title.to_string(),
        description: description.to_string(),
        target_x: Some(target_x),
        target_y: Some(0.0),
        tolerance,
        finish_line_rotation: Some(0.0),
        obstacles,
        start: Pose::default(),
    }
}

/// All built-in missions, ordered by id
pub fn builtin_missions() -> Vec<Mission> {
    vec![
        mission(
            1,
            "Mission 1: Go the Distance",
            "Program the robot to move forward and stop exactly on the red finish line (Distance: 300).",
            100.0,
            30.0,
            Vec::new(),
        ),
        mission(
            2,
            "Mission 2: Blocked Road",
            "A giant cube is blocking the road! Click on the cube to remove it, then drive to the finish line.",
            100.0,
            50.0,
            vec![block("cube1", -50.0, 0.0, 40.0, 40.0, OBSTACLE_RED)],
        ),
        mission(
            3,
            "Mission 3: The Zig-Zag",
            "Navigate through the walls! The path is blocked. Turn right and left to find the gaps and reach the finish line.",
            200.0,
            40.0,
            vec![
                // Covers y -10..190, pass below
                block("wall1", -60.0, 90.0, 20.0, 200.0, WALL_SLATE),
                // Covers y -190..10, pass above
                block("wall2", 80.0, -90.0, 20.0, 200.0, WALL_SLATE),
            ],
        ),
        mission(
            4,
            "Mission 4: The Slalom",
            "Precision driving required! Weave through the orange gates without crashing to reach the finish line.",
            200.0,
            40.0,
            vec![
                block("gate1", -100.0, 0.0, 20.0, 100.0, GATE_ORANGE),
                block("gate2", 0.0, 100.0, 20.0, 140.0, GATE_ORANGE),
                block("gate3", 100.0, -100.0, 20.0, 140.0, GATE_ORANGE),
            ],
        ),
    ]
}

/// Look up a mission by id in a catalog
pub fn find(missions: &[Mission], id: u32) -> Result<Mission> {
    missions
        .iter()
        .find(|m| m.id == id)
        .cloned()
        .ok_or(SimError::UnknownMission(id))
}

/// Built-in mission by id
pub fn builtin(id: u32) -> Result<Mission> {
    find(&builtin_missions(), id)
}

/// Parse a JSON array of missions
pub fn load_missions(json: &str) -> Result<Vec<Mission>> {
    let missions: Vec<Mission> = serde_json::from_str(json)?;
    log::info!("Loaded {} missions", missions.len());
    Ok(missions)
}

/// Load a mission catalog from a JSON file
#[cfg(not(target_arch = "wasm32"))]
pub fn load_missions_from(path: &std::path::Path) -> Result<Vec<Mission>> {
    let json = std::fs::read_to_string(path)?;
    load_missions(&json)
}
