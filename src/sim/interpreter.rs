//! Command interpreter
//!
//! A tick-driven state machine. Each call to [`Interpreter::tick`] advances the
//! active command by exactly one tick and returns, so the caller decides how
//! (or whether) to wait between ticks and can read the live pose in between.
//! Commands that take no time (START_MOTOR, STOP_MOTORS) are folded into the
//! tick of the next command.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::command::{Command, MoveUnit, WaitCondition};
use super::evaluator::{Verdict, evaluate};
use super::physics;
use super::sensors::refresh;
use super::state::{Arena, RobotState, RunStats};
use crate::consts::*;
use crate::error::{Result, SimError};
use crate::settings::Settings;

/// How a run treats the current pose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Snap to the mission start, judge the mission on completion
    Fresh,
    /// Continue from the live pose, no verdict
    Resumed,
}

/// Lifecycle of the interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Running,
    /// Last run ended through cancellation
    Interrupted,
}

/// What a tick did
#[derive(Debug, Clone, PartialEq)]
pub enum TickStatus {
    /// No run active
    Idle,
    /// Run still in progress
    Running,
    /// Command list exhausted; verdict only for fresh runs on missions with a target
    Completed { verdict: Option<Verdict> },
    /// Run stopped at a cancellation checkpoint
    Cancelled,
}

/// Shared cancellation flag. Clones observe and set the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Progress of the command currently being executed
#[derive(Debug, Clone)]
enum Active {
    Pause { ticks_left: u32 },
    Move { remaining: f32, direction: f32 },
    Rotate { remaining: f32, direction: f32 },
    Wait { ticks_left: u32 },
    WaitUntil { condition: WaitCondition, waited_ms: u64 },
}

/// Result of one tick of the active command
enum Flow {
    /// Still active; tick consumed
    Continue,
    /// Finished without using the tick
    Done,
    /// Finished and used the tick
    DoneAfterTick,
}

/// Interpreter state owned by one run
#[derive(Debug)]
struct Run {
    mode: RunMode,
    commands: Vec<Command>,
    next: usize,
    active: Option<Active>,
    /// Speed percent as last set (clamped only when used)
    speed: f32,
    /// -1, 0 or 1
    motor: i8,
}

impl Run {
    fn is_exhausted(&self) -> bool {
        self.active.is_none() && self.next >= self.commands.len()
    }
}

/// Drives the robot through a command list, one tick at a time
#[derive(Debug)]
pub struct Interpreter {
    settings: Settings,
    state: RobotState,
    cancel: CancelToken,
    run: Option<Run>,
    phase: RunPhase,
    stats: RunStats,
}

impl Interpreter {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            state: RobotState::default(),
            cancel: CancelToken::default(),
            run: None,
            phase: RunPhase::Idle,
            stats: RunStats::default(),
        }
    }

    /// Live robot state
    pub fn state(&self) -> &RobotState {
        &self.state
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Statistics of the current (or last) run
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Handle that can cancel the active run from anywhere
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Ask the active run to stop at its next checkpoint
    pub fn request_stop(&self) {
        self.cancel.cancel();
    }

    /// Replace the live state. Only valid while idle.
    pub fn place(&mut self, state: RobotState) -> Result<()> {
        if self.is_running() {
            return Err(SimError::RunInProgress);
        }
        self.state = state;
        Ok(())
    }

    /// Drop any run and put the robot at `state` with fresh statistics
    pub fn reset_to(&mut self, state: RobotState) {
        self.halt();
        self.state = state;
        self.stats = RunStats::default();
        self.phase = RunPhase::Idle;
    }

    /// Recompute sensors after the world changed (e.g. an obstacle was removed)
    pub fn refresh_sensors(&mut self, arena: Arena<'_>) {
        self.state = refresh(self.state.clone(), arena);
    }

    /// Tear down the active run immediately, without a verdict
    pub fn halt(&mut self) {
        if self.run.take().is_some() {
            log::info!("Run halted");
            self.phase = RunPhase::Interrupted;
        }
        self.cancel.clear();
    }

    /// Begin interpreting `commands`. Fails without side effects if the list is
    /// empty or another run is active.
    pub fn start(&mut self, commands: Vec<Command>, mode: RunMode, arena: Arena<'_>) -> Result<()> {
        if commands.is_empty() {
            return Err(SimError::EmptyProgram);
        }
        if self.is_running() {
            return Err(SimError::RunInProgress);
        }

        self.cancel.clear();
        self.stats = RunStats::default();

        let active = match mode {
            RunMode::Fresh => {
                let start = arena.mission.map(|m| m.start).unwrap_or_default();
                self.state = refresh(RobotState::at(start), arena);
                // Let observers show the reset before anything moves
                Some(Active::Pause {
                    ticks_left: self.settings.ticks_for(self.settings.reset_pause_ms),
                })
            }
            RunMode::Resumed => {
                self.state = refresh(self.state.clone(), arena);
                None
            }
        };
        self.stats.observe(&self.state);

        log::info!("Starting {:?} run with {} commands", mode, commands.len());
        self.run = Some(Run {
            mode,
            commands,
            next: 0,
            active,
            speed: DEFAULT_SPEED,
            motor: 0,
        });
        self.phase = RunPhase::Running;
        Ok(())
    }

    /// Advance the active run by one tick.
    ///
    /// On error the run is dropped before returning, so the interpreter is
    /// never left running after a failure.
    pub fn tick(&mut self, arena: Arena<'_>) -> Result<TickStatus> {
        let Some(mut run) = self.run.take() else {
            return Ok(TickStatus::Idle);
        };

        let status = match self.advance(&mut run, arena) {
            Ok(status) => status,
            Err(err) => {
                log::error!("Run aborted: {}", err);
                self.phase = RunPhase::Idle;
                return Err(err);
            }
        };

        match &status {
            TickStatus::Running => self.run = Some(run),
            TickStatus::Cancelled => {
                log::info!("Run cancelled after {} ticks", self.stats.ticks);
                self.cancel.clear();
                self.phase = RunPhase::Interrupted;
            }
            TickStatus::Completed { verdict } => {
                log::info!("Run completed after {} ticks, verdict: {:?}", self.stats.ticks, verdict);
                self.phase = RunPhase::Idle;
            }
            TickStatus::Idle => self.phase = RunPhase::Idle,
        }
        Ok(status)
    }

    fn advance(&mut self, run: &mut Run, arena: Arena<'_>) -> Result<TickStatus> {
        self.stats.ticks += 1;

        loop {
            if self.cancel.is_cancelled() {
                return Ok(TickStatus::Cancelled);
            }

            if run.active.is_none() {
                let Some(command) = run.commands.get(run.next).cloned() else {
                    return Ok(self.complete(run, arena));
                };
                run.next += 1;
                log::debug!("Command {}/{}: {}", run.next, run.commands.len(), command.name());
                run.active = self.begin(run, command);
                if run.active.is_none() {
                    continue;
                }
            }

            match self.step_active(run, arena)? {
                Flow::Continue => return Ok(TickStatus::Running),
                Flow::Done => run.active = None,
                Flow::DoneAfterTick => {
                    run.active = None;
                    if run.is_exhausted() && !self.cancel.is_cancelled() {
                        return Ok(self.complete(run, arena));
                    }
                    return Ok(TickStatus::Running);
                }
            }
        }
    }

    fn complete(&self, run: &Run, arena: Arena<'_>) -> TickStatus {
        let verdict = match run.mode {
            RunMode::Fresh => arena.mission.and_then(|m| evaluate(&self.state, m)),
            RunMode::Resumed => None,
        };
        TickStatus::Completed { verdict }
    }

    /// Apply a command's immediate effects; returns the timed part, if any
    fn begin(&mut self, run: &mut Run, command: Command) -> Option<Active> {
        let settings = &self.settings;
        match command {
            Command::SetSpeed(speed) => {
                run.speed = speed;
                Some(Active::Pause {
                    ticks_left: settings.ticks_for(settings.speed_pause_ms),
                })
            }
            Command::StartMotor(direction) => {
                run.motor = direction.sign();
                None
            }
            Command::StopMotors => {
                run.motor = 0;
                None
            }
            Command::Move { value, unit } => Some(Active::Move {
                remaining: self.move_distance(value.abs(), unit, run.speed),
                direction: if value < 0.0 { -1.0 } else { 1.0 },
            }),
            Command::Rotate { degrees } => Some(Active::Rotate {
                remaining: degrees.abs(),
                direction: if degrees > 0.0 { 1.0 } else { -1.0 },
            }),
            Command::SetColor(color) => {
                self.state.color = color;
                Some(Active::Pause {
                    ticks_left: settings.ticks_for(settings.color_pause_ms),
                })
            }
            Command::Wait { seconds } => {
                let ticks = if seconds > 0.0 {
                    (seconds * settings.tick_rate()).ceil() as u32
                } else {
                    0
                };
                Some(Active::Wait { ticks_left: ticks })
            }
            Command::WaitUntil(condition) => {
                if let WaitCondition::Unsupported(tag) = &condition {
                    log::warn!("WAIT_UNTIL on unsupported condition '{}', will time out", tag);
                }
                Some(Active::WaitUntil {
                    condition,
                    waited_ms: 0,
                })
            }
            Command::Unrecognized(kind) => {
                log::warn!("Skipping unrecognized command type '{}'", kind);
                Some(Active::Pause {
                    ticks_left: settings.ticks_for(settings.unknown_pause_ms),
                })
            }
        }
    }

    /// Total path length of a MOVE
    fn move_distance(&self, magnitude: f32, unit: MoveUnit, speed: f32) -> f32 {
        match unit {
            MoveUnit::Rotations => magnitude * WHEEL_CIRCUMFERENCE,
            MoveUnit::Degrees => magnitude / 360.0 * WHEEL_CIRCUMFERENCE,
            MoveUnit::Seconds => magnitude * physics::step_size(speed) * self.settings.tick_rate(),
            MoveUnit::Steps => magnitude,
        }
    }

    fn step_active(&mut self, run: &mut Run, arena: Arena<'_>) -> Result<Flow> {
        let Some(active) = run.active.as_mut() else {
            return Ok(Flow::Done);
        };

        match active {
            Active::Pause { ticks_left } => {
                *ticks_left = ticks_left.saturating_sub(1);
                Ok(if *ticks_left == 0 { Flow::DoneAfterTick } else { Flow::Continue })
            }

            Active::Move {
                remaining,
                direction,
            } => {
                if *remaining <= 0.0 {
                    return Ok(Flow::Done);
                }
                let len = remaining.min(physics::step_size(run.speed));
                let outcome = physics::advance(&self.state, arena, *direction * len);
                self.stats.distance_moved += outcome.travelled;
                self.commit(outcome.state)?;
                if outcome.collided {
                    log::debug!("MOVE stopped by contact at ({:.1}, {:.1})", self.state.x, self.state.y);
                    return Ok(Flow::DoneAfterTick);
                }
                *remaining -= len;
                Ok(if *remaining <= 0.0 { Flow::DoneAfterTick } else { Flow::Continue })
            }

            Active::Rotate {
                remaining,
                direction,
            } => {
                if *remaining <= 0.0 {
                    return Ok(Flow::Done);
                }
                let delta = remaining.min(physics::turn_size(run.speed));
                let next = physics::rotate(&self.state, arena, *direction * delta);
                self.stats.total_rotation += delta;
                self.commit(next)?;
                *remaining -= delta;
                Ok(if *remaining <= 0.0 { Flow::DoneAfterTick } else { Flow::Continue })
            }

            Active::Wait { ticks_left } => {
                if *ticks_left == 0 {
                    return Ok(Flow::Done);
                }
                let collided = self.motor_tick(run.motor, run.speed, arena)?;
                *ticks_left -= 1;
                if collided {
                    log::debug!("WAIT ended early by contact");
                    return Ok(Flow::DoneAfterTick);
                }
                Ok(if *ticks_left == 0 { Flow::DoneAfterTick } else { Flow::Continue })
            }

            Active::WaitUntil {
                condition,
                waited_ms,
            } => {
                // A contact while waiting does not end the wait by itself
                self.motor_tick(run.motor, run.speed, arena)?;
                let met = match condition {
                    WaitCondition::Touch => self.state.sensor_touch,
                    WaitCondition::Unsupported(_) => false,
                };
                if met {
                    return Ok(Flow::DoneAfterTick);
                }
                if *waited_ms >= self.settings.wait_until_timeout_ms {
                    log::warn!("WAIT_UNTIL timed out after {} ms", waited_ms);
                    return Ok(Flow::DoneAfterTick);
                }
                *waited_ms += self.settings.tick_ms();
                Ok(Flow::Continue)
            }
        }
    }

    /// One tick of continuous-motor motion, or a sensor refresh when stopped.
    /// Returns whether the robot made contact.
    fn motor_tick(&mut self, motor: i8, speed: f32, arena: Arena<'_>) -> Result<bool> {
        if motor == 0 {
            self.refresh_sensors(arena);
            self.stats.observe(&self.state);
            return Ok(false);
        }
        let outcome = physics::step(&self.state, arena, motor as f32, speed);
        self.stats.distance_moved += outcome.travelled;
        self.commit(outcome.state)?;
        Ok(outcome.collided)
    }

    fn commit(&mut self, state: RobotState) -> Result<()> {
        if !state.is_finite() {
            return Err(SimError::NonFinitePose {
                x: state.x,
                y: state.y,
                rotation: state.rotation,
            });
        }
        self.state = state;
        self.stats.observe(&self.state);
        Ok(())
    }
}
