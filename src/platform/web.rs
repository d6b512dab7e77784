//! Browser bridge for the block editor page
//!
//! The page owns the animation loop: it calls `tick()` once per frame interval
//! and redraws from `state_json()`. Programs arrive already compiled to the
//! JSON command list.

use wasm_bindgen::prelude::*;

use crate::missions;
use crate::settings::Settings;
use crate::sim::{Simulator, TickStatus, parse_program};

fn js_err(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).expect("Failed to init logger");
    log::info!("Robo Arena engine loaded");
}

#[wasm_bindgen]
pub struct WebSimulator {
    inner: Simulator,
}

#[wasm_bindgen]
impl WebSimulator {
    /// Session for a built-in mission. `settings_json` may be empty for defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(mission_id: u32, settings_json: &str) -> Result<WebSimulator, JsValue> {
        let settings = if settings_json.trim().is_empty() {
            Settings::default()
        } else {
            Settings::from_json(settings_json).map_err(js_err)?
        };
        let mission = missions::builtin(mission_id).map_err(js_err)?;
        Ok(Self {
            inner: Simulator::new(settings, mission),
        })
    }

    /// Switch to another built-in mission
    pub fn select_mission(&mut self, mission_id: u32) -> Result<(), JsValue> {
        let mission = missions::builtin(mission_id).map_err(js_err)?;
        self.inner.select_mission(mission);
        Ok(())
    }

    /// Green flag: fresh run of the whole program
    pub fn run_program(&mut self, program_json: &str) -> Result<(), JsValue> {
        let commands = parse_program(program_json).map_err(js_err)?;
        self.inner.run_program(commands).map_err(js_err)
    }

    /// Clicked block: resumed run from the live pose
    pub fn run_block(&mut self, program_json: &str) -> Result<(), JsValue> {
        let commands = parse_program(program_json).map_err(js_err)?;
        self.inner.run_block(commands).map_err(js_err)
    }

    pub fn stop(&mut self) {
        self.inner.stop();
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    pub fn remove_obstacle(&mut self, id: &str) -> Result<(), JsValue> {
        self.inner.remove_obstacle(id).map(|_| ()).map_err(js_err)
    }

    /// Advance one tick; returns "idle", "running", "completed" or "cancelled"
    pub fn tick(&mut self) -> Result<String, JsValue> {
        let status = match self.inner.tick().map_err(js_err)? {
            TickStatus::Idle => "idle",
            TickStatus::Running => "running",
            TickStatus::Completed { .. } => "completed",
            TickStatus::Cancelled => "cancelled",
        };
        Ok(status.to_string())
    }

    pub fn tick_ms(&self) -> u32 {
        self.inner.settings().tick_ms() as u32
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    /// Heading in [0, 360) for the dashboard
    pub fn display_rotation(&self) -> i32 {
        self.inner.state().display_rotation()
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.inner.state()).map_err(js_err)
    }

    pub fn obstacles_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.inner.obstacles()).map_err(js_err)
    }

    pub fn stats_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.inner.stats()).map_err(js_err)
    }

    /// Last verdict as JSON (`null` when none), with the message text attached
    pub fn verdict_json(&self) -> Result<String, JsValue> {
        let value = match self.inner.verdict() {
            None => serde_json::Value::Null,
            Some(verdict) => {
                let mut value = serde_json::to_value(verdict).map_err(js_err)?;
                if let (Some(reason), Some(obj)) = (verdict.reason(), value.as_object_mut()) {
                    obj.insert("message".into(), reason.to_string().into());
                }
                value
            }
        };
        Ok(value.to_string())
    }
}

/// Built-in missions as JSON for the mission picker
#[wasm_bindgen]
pub fn missions_json() -> Result<String, JsValue> {
    serde_json::to_string(&missions::builtin_missions()).map_err(js_err)
}
