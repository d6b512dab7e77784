//! Session layer: one mission, its live obstacles and the interpreter driving
//! the robot through them

use super::command::Command;
use super::evaluator::Verdict;
use super::interpreter::{CancelToken, Interpreter, RunMode, TickStatus};
use super::sensors::refresh;
use super::state::{Arena, Mission, Obstacle, RobotState, RunStats};
use crate::error::{Result, SimError};
use crate::platform::Clock;
use crate::settings::Settings;

/// A run waiting for the previous one to wind down
#[derive(Debug)]
struct PendingRun {
    commands: Vec<Command>,
    mode: RunMode,
    grace_ticks: u32,
}

/// A simulated session for one selected mission
#[derive(Debug)]
pub struct Simulator {
    settings: Settings,
    mission: Mission,
    /// Mission obstacles minus any the user removed
    obstacles: Vec<Obstacle>,
    interpreter: Interpreter,
    pending: Option<PendingRun>,
    verdict: Option<Verdict>,
}

impl Simulator {
    pub fn new(settings: Settings, mission: Mission) -> Self {
        let mut sim = Self {
            interpreter: Interpreter::new(settings.clone()),
            settings,
            obstacles: mission.obstacles.clone(),
            mission,
            pending: None,
            verdict: None,
        };
        sim.reset();
        sim
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn mission(&self) -> &Mission {
        &self.mission
    }

    /// Obstacles currently in the arena
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn state(&self) -> &RobotState {
        self.interpreter.state()
    }

    /// Verdict of the last completed fresh run
    pub fn verdict(&self) -> Option<&Verdict> {
        self.verdict.as_ref()
    }

    pub fn stats(&self) -> &RunStats {
        self.interpreter.stats()
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// A run is active or waiting to start
    pub fn is_running(&self) -> bool {
        self.interpreter.is_running() || self.pending.is_some()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.interpreter.cancel_token()
    }

    /// Switch missions; drops any run and snaps the robot to the new start
    pub fn select_mission(&mut self, mission: Mission) {
        log::info!("Selected mission {} '{}'", mission.id, mission.title);
        self.mission = mission;
        self.reset();
    }

    /// Restore the mission's obstacles and put the robot back at the start
    pub fn reset(&mut self) {
        self.pending = None;
        self.obstacles = self.mission.obstacles.clone();
        self.verdict = None;

        let arena = Arena::new(&self.obstacles, Some(&self.mission));
        let start = refresh(RobotState::at(self.mission.start), arena);
        self.interpreter.reset_to(start);
    }

    /// Take one obstacle out of the arena
    pub fn remove_obstacle(&mut self, id: &str) -> Result<Obstacle> {
        let index = self
            .obstacles
            .iter()
            .position(|o| o.id == id)
            .ok_or_else(|| SimError::UnknownObstacle(id.to_string()))?;
        let removed = self.obstacles.remove(index);
        log::info!("Removed obstacle '{}'", removed.id);

        let arena = Arena::new(&self.obstacles, Some(&self.mission));
        self.interpreter.refresh_sensors(arena);
        Ok(removed)
    }

    /// Run a whole program from the mission start; judged on completion
    pub fn run_program(&mut self, commands: Vec<Command>) -> Result<()> {
        self.launch(commands, RunMode::Fresh)
    }

    /// Run commands from wherever the robot is now; never judged
    pub fn run_block(&mut self, commands: Vec<Command>) -> Result<()> {
        self.launch(commands, RunMode::Resumed)
    }

    /// Ask the active run to stop; any queued run is dropped
    pub fn stop(&mut self) {
        self.pending = None;
        if self.interpreter.is_running() {
            self.interpreter.request_stop();
        }
    }

    fn launch(&mut self, commands: Vec<Command>, mode: RunMode) -> Result<()> {
        if commands.is_empty() {
            return Err(SimError::EmptyProgram);
        }
        self.verdict = None;

        if self.is_running() {
            // Single writer: the old run must observe cancellation first
            log::info!("Run in progress, queueing {:?} run after cancellation", mode);
            self.interpreter.request_stop();
            self.pending = Some(PendingRun {
                commands,
                mode,
                grace_ticks: self.settings.restart_grace_ticks(),
            });
            return Ok(());
        }

        let arena = Arena::new(&self.obstacles, Some(&self.mission));
        self.interpreter.start(commands, mode, arena)
    }

    /// Advance the session by one tick
    pub fn tick(&mut self) -> Result<TickStatus> {
        let arena = Arena::new(&self.obstacles, Some(&self.mission));

        if let Some(pending) = self.pending.as_mut() {
            if self.interpreter.is_running() {
                self.interpreter.tick(arena)?;
            }
            pending.grace_ticks = pending.grace_ticks.saturating_sub(1);
            if pending.grace_ticks == 0 && !self.interpreter.is_running() {
                if let Some(next) = self.pending.take() {
                    self.interpreter.start(next.commands, next.mode, arena)?;
                }
            }
            return Ok(TickStatus::Running);
        }

        let status = self.interpreter.tick(arena)?;
        if let TickStatus::Completed { verdict: Some(verdict) } = &status {
            match verdict.reason() {
                None => log::info!("Mission {} complete", self.mission.id),
                Some(reason) => log::info!("Mission {} failed: {}", self.mission.id, reason),
            }
            self.verdict = Some(verdict.clone());
        }
        Ok(status)
    }

    /// Tick until nothing is running, sleeping one tick interval on `clock`
    /// between ticks. `observer` sees the state before the first tick and
    /// after every tick.
    pub fn run_until_idle<C, F>(&mut self, clock: &mut C, mut observer: F) -> Result<TickStatus>
    where
        C: Clock,
        F: FnMut(&RobotState),
    {
        observer(self.state());
        loop {
            let status = self.tick()?;
            observer(self.state());
            if status != TickStatus::Running {
                return Ok(status);
            }
            clock.sleep_ms(self.settings.tick_ms());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::missions::builtin;
    use crate::platform::VirtualClock;
    use crate::sim::command::{MoveUnit, parse_program};
    use crate::sim::evaluator::FailureReason;
    use crate::sim::interpreter::RunPhase;

    fn mv(value: f32) -> Command {
        Command::Move {
            value,
            unit: MoveUnit::Steps,
        }
    }

    fn sim(mission_id: u32) -> Simulator {
        Simulator::new(Settings::default(), builtin(mission_id).unwrap())
    }

    fn finish(sim: &mut Simulator) -> TickStatus {
        let mut clock = VirtualClock::new();
        sim.run_until_idle(&mut clock, |_| {}).unwrap()
    }

    #[test]
    fn test_new_session_at_start() {
        let sim = sim(2);
        assert_eq!(sim.state().x, -200.0);
        assert_eq!(sim.obstacles().len(), 1);
        assert!(!sim.is_running());
        assert!(sim.verdict().is_none());
        // Cube at -50 is straight ahead: center 150 away minus surface offset
        assert_eq!(sim.state().sensor_distance, 130);
    }

    #[test]
    fn test_mission_one_success() {
        let mut sim = sim(1);
        let program = parse_program(r#"[{"type": "MOVE", "value": 300, "unit": "STEPS"}]"#).unwrap();
        sim.run_program(program).unwrap();

        let mut clock = VirtualClock::new();
        let mut snapshots = 0;
        let status = sim.run_until_idle(&mut clock, |_| snapshots += 1).unwrap();

        assert_eq!(
            status,
            TickStatus::Completed {
                verdict: Some(Verdict::Success)
            }
        );
        assert_eq!(sim.verdict(), Some(&Verdict::Success));
        // 25 reset ticks + 40 move ticks, initial snapshot included
        assert_eq!(snapshots, 66);
        assert_eq!(clock.now_ms(), 64 * 20);
    }

    #[test]
    fn test_blocked_road_needs_cube_removed() {
        let mut sim = sim(2);
        sim.run_program(vec![mv(300.0)]).unwrap();
        finish(&mut sim);
        assert_eq!(
            sim.verdict(),
            Some(&Verdict::Failure {
                reason: FailureReason::Collision
            })
        );

        let cube = sim.remove_obstacle("cube1").unwrap();
        assert_eq!(cube.id, "cube1");
        // Sensors reflect the removal immediately
        assert!(!sim.state().sensor_touch);

        sim.run_program(vec![mv(300.0)]).unwrap();
        finish(&mut sim);
        assert_eq!(sim.verdict(), Some(&Verdict::Success));
    }

    #[test]
    fn test_remove_unknown_and_reset_restores() {
        let mut sim = sim(4);
        assert!(matches!(
            sim.remove_obstacle("nope"),
            Err(SimError::UnknownObstacle(_))
        ));
        sim.remove_obstacle("gate2").unwrap();
        assert!(sim.remove_obstacle("gate2").is_err());
        assert_eq!(sim.obstacles().len(), 2);

        sim.reset();
        assert_eq!(sim.obstacles().len(), 3);
    }

    #[test]
    fn test_run_block_resumes_without_verdict() {
        let mut sim = sim(1);
        sim.run_program(vec![mv(300.0)]).unwrap();
        finish(&mut sim);
        assert!(sim.verdict().is_some());

        sim.run_block(vec![mv(-50.0)]).unwrap();
        // A new run clears the old verdict
        assert!(sim.verdict().is_none());
        let status = finish(&mut sim);
        assert_eq!(status, TickStatus::Completed { verdict: None });
        assert!((sim.state().x - 50.0).abs() < 1e-4);
        assert!(sim.verdict().is_none());
    }

    #[test]
    fn test_restart_waits_for_cancellation_and_grace() {
        let mut sim = sim(1);
        sim.run_block(vec![mv(300.0)]).unwrap();
        for _ in 0..4 {
            sim.tick().unwrap();
        }
        let x = sim.state().x;
        assert!((x - -170.0).abs() < 1e-4);

        sim.run_program(vec![mv(10.0)]).unwrap();
        assert!(sim.is_running());

        // Old run observes cancellation without moving
        assert_eq!(sim.tick().unwrap(), TickStatus::Running);
        assert_eq!(sim.state().x, x);
        assert!(!sim.interpreter().is_running());
        assert_eq!(sim.interpreter().phase(), RunPhase::Interrupted);

        // Grace period, then the fresh run snaps to start
        assert_eq!(sim.tick().unwrap(), TickStatus::Running);
        assert_eq!(sim.state().x, x);
        sim.tick().unwrap();
        assert_eq!(sim.state().x, -200.0);
        assert!(sim.interpreter().is_running());

        finish(&mut sim);
        assert!((sim.state().x - -190.0).abs() < 1e-4);
    }

    #[test]
    fn test_block_clicked_mid_program_continues_from_live_pose() {
        let mut sim = sim(1);
        sim.run_program(vec![mv(300.0)]).unwrap();
        // 25 reset ticks, then 10 steps of 7.5
        for _ in 0..35 {
            sim.tick().unwrap();
        }
        let mid = sim.state().pose();
        assert!((mid.x - -125.0).abs() < 1e-4);

        sim.run_block(vec![Command::Rotate { degrees: 90.0 }]).unwrap();

        // Cancellation and grace never snap back to the start
        for _ in 0..3 {
            assert_eq!(sim.tick().unwrap(), TickStatus::Running);
            assert_eq!(sim.state().x, mid.x);
            assert_eq!(sim.state().y, mid.y);
        }
        assert!(sim.interpreter().is_running());

        let status = finish(&mut sim);
        assert_eq!(status, TickStatus::Completed { verdict: None });
        assert_eq!(sim.state().x, mid.x);
        assert_eq!(sim.state().y, mid.y);
        assert!((sim.state().rotation - -90.0).abs() < 1e-3);
        assert!(sim.verdict().is_none());
    }

    #[test]
    fn test_stop_halts_without_verdict() {
        let mut sim = sim(1);
        sim.run_program(vec![mv(300.0)]).unwrap();
        for _ in 0..30 {
            sim.tick().unwrap();
        }
        let x = sim.state().x;
        sim.stop();
        assert_eq!(sim.tick().unwrap(), TickStatus::Cancelled);
        assert_eq!(sim.state().x, x);
        assert!(sim.verdict().is_none());
        assert!(!sim.is_running());
        assert_eq!(sim.tick().unwrap(), TickStatus::Idle);
    }

    #[test]
    fn test_cancel_token_from_another_thread() {
        let mut sim = sim(1);
        sim.run_block(vec![mv(300.0)]).unwrap();
        sim.tick().unwrap();
        let token = sim.cancel_token();
        std::thread::spawn(move || token.cancel()).join().unwrap();
        assert_eq!(sim.tick().unwrap(), TickStatus::Cancelled);
    }

    #[test]
    fn test_empty_program_is_rejected() {
        let mut sim = sim(1);
        sim.run_block(vec![mv(20.0)]).unwrap();
        finish(&mut sim);
        let before = sim.state().clone();

        assert!(matches!(sim.run_program(Vec::new()), Err(SimError::EmptyProgram)));
        assert_eq!(sim.state(), &before);
        assert!(!sim.is_running());
    }

    #[test]
    fn test_select_mission_resets_world() {
        let mut sim = sim(1);
        sim.run_block(vec![mv(50.0)]).unwrap();
        sim.tick().unwrap();
        sim.select_mission(builtin(3).unwrap());
        assert!(!sim.is_running());
        assert_eq!(sim.obstacles().len(), 2);
        assert_eq!(sim.state().x, -200.0);
        assert_eq!(sim.mission().id, 3);
    }

    #[test]
    fn test_zig_zag_route() {
        let mut sim = sim(3);
        // Under wall1, over wall2, then on to the target line
        let program = vec![
            Command::Rotate { degrees: 90.0 },
            mv(60.0),
            Command::Rotate { degrees: -90.0 },
            mv(220.0),
            Command::Rotate { degrees: -90.0 },
            mv(120.0),
            Command::Rotate { degrees: 90.0 },
            mv(180.0),
            Command::Rotate { degrees: 90.0 },
            mv(60.0),
        ];
        sim.run_program(program).unwrap();
        finish(&mut sim);
        let state = sim.state();
        assert!((state.x - 200.0).abs() < 1e-2, "x = {}", state.x);
        assert!(state.y.abs() < 1e-2, "y = {}", state.y);
        assert_eq!(sim.verdict(), Some(&Verdict::Success));
        assert!(!sim.stats().touched);
    }
}
