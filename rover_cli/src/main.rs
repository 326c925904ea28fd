mod check;
mod cli;
mod devices;
mod drive;
mod error_fmt;
mod logging;

use clap::Parser;
use cli::{Cli, Commands, JSON_MODE};
use eyre::WrapErr;
use rover_core::{Rover, RoverCfg, RoverError, display_distance};
use rover_traits::clock::MonotonicClock;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    // Only the panic/report hooks are used; errors are rendered below.
    let _ = color_eyre::install();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", error_fmt::format_error_json(&e));
            } else {
                eprintln!("{}", error_fmt::humanize(&e));
            }
            ExitCode::from(error_fmt::exit_code_for_error(&e))
        }
    }
}

fn load_config(cli: &Cli) -> eyre::Result<rover_config::Config> {
    let as_config_err = |e: eyre::Report| RoverError::Config(format!("{e:#}"));
    let mut cfg = rover_config::load_file(&cli.config).map_err(as_config_err)?;
    if let Some(near) = cli.near_cm {
        cfg.safety.near_threshold_cm = near;
    }
    cfg.validate().map_err(as_config_err)?;
    Ok(cfg)
}

fn install_ctrlc() -> eyre::Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let f = flag.clone();
    ctrlc::set_handler(move || {
        f.store(true, Ordering::Relaxed);
    })
    .wrap_err("install Ctrl-C handler")?;
    Ok(flag)
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli)?;
    let _log_guard = logging::init(&cli, &cfg.logging).wrap_err("init logging")?;
    tracing::debug!(config = %cli.config.display(), "configuration loaded");

    let res = execute(&cli, &cfg);
    if let Err(e) = &res {
        tracing::error!(error = %format!("{e:#}"), "rover failed");
    }
    res
}

fn execute(cli: &Cli, cfg: &rover_config::Config) -> eyre::Result<()> {
    let (mut sensor, mut drive, mut buzzer) = devices::open(cfg)?;
    match cli.cmd {
        Commands::Drive => {
            let shutdown = install_ctrlc()?;
            let rover_cfg = RoverCfg::from(cfg);
            let mut rover = Rover::new(sensor, drive, buzzer, &rover_cfg)?;
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            let stdin = std::io::BufReader::new(std::io::stdin());
            drive::run_session(&mut rover, stdin, &mut out, &shutdown)?;
        }
        Commands::SelfCheck => {
            let timeout = Duration::from_millis(cfg.hardware.echo_timeout_ms);
            let report = check::self_check(&mut sensor, &mut drive, &mut buzzer, timeout)?;
            let shown = display_distance(report.distance_cm);
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({ "status": "ok", "distance": shown })
                );
            } else {
                match shown {
                    Some(cm) => println!("self-check ok: distance {cm:.1} cm"),
                    None => println!("self-check ok: no echo in range"),
                }
            }
        }
        Commands::MotorTest { step_ms } => {
            let interrupted = install_ctrlc()?;
            let clock = MonotonicClock::new();
            let mut stdout = std::io::stdout();
            let completed = check::motor_test(
                &mut drive,
                &clock,
                Duration::from_millis(step_ms),
                &interrupted,
                |phase| {
                    let _ = writeln!(stdout, "{}", phase.name());
                },
            )?;
            tracing::info!(completed, "motor test finished");
        }
    }
    Ok(())
}
