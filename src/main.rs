//! Robo Arena - native runner
//!
//! Runs a compiled block program against a mission and prints the final
//! robot state and verdict as JSON.
//!
//! Usage:
//!   robo-arena program.json                      # Mission 1, instant playback
//!   robo-arena program.json --mission 3 --trace  # One JSON line per tick
//!   robo-arena program.json --realtime           # Sleep between ticks

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::path::PathBuf;
    use std::process::ExitCode;

    use clap::Parser;
    use serde_json::json;

    use robo_arena::missions;
    use robo_arena::platform::{Clock, SystemClock, VirtualClock};
    use robo_arena::sim::{Simulator, TickStatus, parse_program};
    use robo_arena::{PlaybackSpeed, Result, Settings};

    #[derive(Parser)]
    #[command(name = "robo-arena")]
    #[command(about = "Run a compiled block program in the robot arena simulator")]
    struct Args {
        /// Compiled program (JSON array of command records)
        program: PathBuf,

        /// Mission id to run against
        #[arg(short = 'm', long, default_value = "1")]
        mission: u32,

        /// Mission catalog to use instead of the built-in one
        #[arg(long)]
        missions: Option<PathBuf>,

        /// Engine settings file (JSON)
        #[arg(short = 's', long)]
        settings: Option<PathBuf>,

        /// Sleep between ticks like the editor does
        #[arg(long)]
        realtime: bool,

        /// Playback preset for --realtime (normal, fast, instant)
        #[arg(long)]
        playback: Option<String>,

        /// Print every snapshot as a JSON line
        #[arg(long)]
        trace: bool,
    }

    fn drive<C: Clock>(sim: &mut Simulator, clock: &mut C, trace: bool) -> Result<TickStatus> {
        sim.run_until_idle(clock, |state| {
            if !trace {
                return;
            }
            match serde_json::to_string(state) {
                Ok(line) => println!("{}", line),
                Err(e) => log::warn!("Could not serialize snapshot: {}", e),
            }
        })
    }

    fn run(args: Args) -> Result<TickStatus> {
        let mut settings = match &args.settings {
            Some(path) => Settings::load_from(path)?,
            None => Settings::default(),
        };
        if let Some(preset) = args.playback.as_deref() {
            match PlaybackSpeed::from_str(preset) {
                Some(playback) => settings.playback = playback,
                None => log::warn!("Unknown playback preset '{}', keeping {}", preset, settings.playback.as_str()),
            }
        }

        let catalog = match &args.missions {
            Some(path) => missions::load_missions_from(path)?,
            None => missions::builtin_missions(),
        };
        let mission = missions::find(&catalog, args.mission)?;
        log::info!("Running {} on '{}'", args.program.display(), mission.title);

        let program = parse_program(&std::fs::read_to_string(&args.program)?)?;
        let playback = settings.playback;
        let mut sim = Simulator::new(settings, mission);
        sim.run_program(program)?;

        let status = if args.realtime {
            drive(&mut sim, &mut SystemClock::new(playback), args.trace)?
        } else {
            drive(&mut sim, &mut VirtualClock::new(), args.trace)?
        };

        let report = json!({
            "state": sim.state(),
            "displayRotation": sim.state().display_rotation(),
            "verdict": sim.verdict(),
            "message": sim.verdict().and_then(|v| v.reason()).map(|r| r.to_string()),
            "stats": sim.stats(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(status)
    }

    pub fn main() -> ExitCode {
        env_logger::init();
        let args = Args::parse();

        match run(args) {
            Ok(status) => {
                log::info!("Finished: {:?}", status);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    cli::main()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The browser entry point is `platform::web::start`; this just satisfies the compiler
}
