//! # needle_steer
//!
//! Console front end for the needle steering controller.
//!
//! Loads `needle.toml`, builds a simulated hardware session, reads operator
//! commands from stdin (one per line, see `InputMapper::parse_line`) and
//! applies the newest one at a time until stdin closes or Ctrl-C.
//!
//! ```text
//! $ printf 'right 40\nup-left\nhome\n' | needle_steer --fast --summary
//! ```

use clap::Parser;
use needle_common::config::ConfigError;
use needle_common::consts::DEFAULT_CONFIG_PATH;
use needle_common::steering::command::MoveCommand;
use needle_common::steering::config::SteeringConfig;
use needle_common::steering::input::InputMapper;
use needle_control::config::{LoadedConfig, load_config};
use needle_control::controller::MotionController;
use needle_control::error::ControllerError;
use needle_control::hal::ThreadDelay;
use needle_control::mailbox::Mailbox;
use needle_control::rt::{RtPolicy, lock_memory, spawn_pulse_thread};
use needle_control::session::Session;
use needle_control::supervisor::Supervisor;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Needle steering controller
#[derive(Parser, Debug)]
#[command(name = "needle_steer")]
#[command(version)]
#[command(about = "Tendon-driven needle steering over simulated hardware")]
struct Args {
    /// Path to the steering configuration TOML.
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Skip pulse timing (pulses complete instantly).
    #[arg(long)]
    fast: bool,

    /// Print the session summary as TOML on exit.
    #[arg(long)]
    summary: bool,

    /// CPU core to pin the pulse thread to (needs the `rt` feature).
    #[arg(long)]
    cpu_core: Option<usize>,

    /// SCHED_FIFO priority of the pulse thread, 1-99 (needs the `rt` feature).
    #[arg(long)]
    rt_priority: Option<i32>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let loaded = load(&args.config);

    let level = match &loaded {
        Ok((config, _)) => config.steering.shared.log_level.into(),
        Err(_) => Level::INFO,
    };
    setup_tracing(&args, level);

    info!("Needle steering v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = loaded
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|(config, defaulted)| {
            if defaulted {
                warn!(
                    "No config at '{}', running with built-in defaults",
                    args.config.display()
                );
            }
            run(&args, config)
        });

    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Needle steering shutdown complete");
}

/// Load the config file, falling back to defaults when it does not exist.
fn load(path: &Path) -> Result<(LoadedConfig, bool), ControllerError> {
    match load_config(path) {
        Ok(loaded) => Ok((loaded, false)),
        Err(ControllerError::Config(ConfigError::FileNotFound)) => {
            Ok((LoadedConfig::from_steering(SteeringConfig::default())?, true))
        }
        Err(e) => Err(e),
    }
}

fn run(args: &Args, loaded: LoadedConfig) -> Result<(), Box<dyn std::error::Error>> {
    let steering = &loaded.steering;
    info!(
        "Config OK: service={}, max_steps={}, pulse_width={}ms, sensitivity={}",
        steering.shared.service_name,
        steering.actuators.max_steps,
        steering.actuators.pulse_width_ms,
        steering.input.sensitivity,
    );

    let policy = RtPolicy::new(args.cpu_core, args.rt_priority)?;
    if !policy.is_inherit() && lock_memory()? {
        info!("Process memory locked");
    }

    let (session, _probe) = Session::simulated(steering.stage.is_some());
    let session = if args.fast {
        session
    } else {
        session.with_delay(Box::new(ThreadDelay))
    };
    let controller = MotionController::new(session, &loaded)?;

    let commands: Arc<Mailbox<MoveCommand>> = Arc::new(Mailbox::new());
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        let commands = Arc::clone(&commands);
        ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            running.store(false, Ordering::SeqCst);
            commands.close();
        })?;
    }

    // Helper threads first: the pulse thread's placement must not be inherited.
    spawn_console_reader(InputMapper::new(&steering.input), Arc::clone(&commands))?;

    let mut supervisor = Supervisor::new(controller, commands);
    let pulse = spawn_pulse_thread(policy, move || supervisor.run(&running))?;
    let summary = pulse
        .join()
        .map_err(|_| "pulse thread panicked")??;

    if args.summary {
        print!("{}", toml::to_string(&summary)?);
    }
    Ok(())
}

/// Read console lines into the command mailbox; closes it at end of input.
fn spawn_console_reader(
    mapper: InputMapper,
    commands: Arc<Mailbox<MoveCommand>>,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("console-input".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("stdin read failed: {e}");
                        break;
                    }
                };
                match mapper.parse_line(&line) {
                    Ok(Some(cmd)) => {
                        if commands.post(cmd) {
                            debug!("Pending command superseded by {:?}", cmd.direction);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Ignoring input: {e}"),
                }
            }
            debug!("Console input closed");
            commands.close();
        })
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args, default_level: Level) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        default_level
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
