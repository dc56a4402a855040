//! `autodrive` – headless autonomous-period runner
//!
//! This binary:
//!
//! 1. Loads `~/.autodrive/config.toml` (or `--config <path>`), falling back to
//!    defaults, with `AUTODRIVE_*` environment overrides.
//! 2. Resolves the field position and game-data message into a routine
//!    selection.
//! 3. Runs one autonomous period against the simulated plant and prints a
//!    run report, or emits it as JSON with `--json`.
//! 4. Intercepts **Ctrl-C** to stop the robot and end the run early.

mod config;
mod run;
mod telemetry;

use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use autodrive_types::{LockState, RunOutcome, RunReport, Selection};

const USAGE: &str = "\
Usage: autodrive [OPTIONS]

Options:
  --config <PATH>       Config file (default ~/.autodrive/config.toml)
  --position <KEY>      solid | none | center | right | left
  --game-data <MSG>     Match game-data message; first character L or R
  --json                Print the run report as JSON
  --realtime            Pace the simulated run at the control period
  --init-config         Write the effective config to the config path and exit
  -h, --help            Show this help";

/// Parsed command line.
#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    position: Option<String>,
    game_data: Option<String>,
    json: bool,
    realtime: bool,
    init_config: bool,
    help: bool,
}

fn parse_args<I>(args: I) -> Result<Args, String>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = Args::default();
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => parsed.config = Some(PathBuf::from(value_for(&arg, it.next())?)),
            "--position" => parsed.position = Some(value_for(&arg, it.next())?),
            "--game-data" => parsed.game_data = Some(value_for(&arg, it.next())?),
            "--json" => parsed.json = true,
            "--realtime" => parsed.realtime = true,
            "--init-config" => parsed.init_config = true,
            "-h" | "--help" => parsed.help = true,
            other => return Err(format!("unknown argument '{other}'")),
        }
    }
    Ok(parsed)
}

fn value_for(flag: &str, value: Option<String>) -> Result<String, String> {
    value.ok_or_else(|| format!("{flag} needs a value"))
}

fn main() -> ExitCode {
    telemetry::init_tracing();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}: {}\n\n{}", "error".red().bold(), e, USAGE);
            return ExitCode::from(2);
        }
    };
    if args.help {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }
    if !args.json {
        print_banner();
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let path = args.config.clone().unwrap_or_else(config::config_path);
    let mut cfg = match config::load_from(&path) {
        Ok(Some(cfg)) => {
            if !args.json {
                println!("  Config loaded from {}", path.display().to_string().bold());
            }
            cfg
        }
        Ok(None) => {
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            eprintln!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };
    if let Some(position) = &args.position {
        cfg.position = position.clone();
    }
    if let Some(game_data) = &args.game_data {
        cfg.game_data = game_data.clone();
    }

    if args.init_config {
        return match config::save_to(&cfg, &path) {
            Ok(()) => {
                println!(
                    "  {} Config saved to {}",
                    "✓".green().bold(),
                    path.display().to_string().bold()
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}: {}", "Error saving config".red(), e);
                ExitCode::FAILURE
            }
        };
    }

    let selection = match Selection::from_signals(&cfg.position, &cfg.game_data) {
        Ok(selection) => selection,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            return ExitCode::from(2);
        }
    };

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("{}", "⚠  Ctrl-C received – stopping the robot …".yellow().bold());
        stop_handler.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; the run cannot be interrupted");
    }

    // ── Run ───────────────────────────────────────────────────────────────
    let run = match run::run_simulated(&cfg, selection, &stop, args.realtime) {
        Ok(run) => run,
        Err(e) => {
            eprintln!("{}: {}", "Run failed".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&run.report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("{}: {}", "Failed to serialize report".red(), e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_report(&run.report);
        println!(
            "  Plant: encoders L {:.0} / R {:.0}, gyro {:.1}°, roller {:.2}",
            run.plant.left_ticks, run.plant.right_ticks, run.plant.angle, run.plant.roller_power
        );
        println!();
    }

    match run.report.outcome {
        RunOutcome::Complete | RunOutcome::Interrupted => ExitCode::SUCCESS,
        RunOutcome::OutOfTime | RunOutcome::Aborted => ExitCode::FAILURE,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("  {} {}", "AutoDrive".bold().cyan(), format!("v{}", env!("CARGO_PKG_VERSION")).dimmed());
    println!("  Autonomous period runner (simulated plant)");
    println!();
}

fn print_report(report: &RunReport) {
    let outcome = match report.outcome {
        RunOutcome::Complete => "complete".green().bold(),
        RunOutcome::OutOfTime => "out of time".yellow().bold(),
        RunOutcome::Aborted => "aborted".red().bold(),
        RunOutcome::Interrupted => "interrupted".yellow(),
    };
    let alliance = report
        .selection
        .alliance
        .map(|a| a.to_string())
        .unwrap_or_else(|| "-".to_string());

    println!("  Run {}", report.run_id.to_string().dimmed());
    println!(
        "  Position {} / alliance {} → plan {}",
        report.selection.position.to_string().bold(),
        alliance.bold(),
        report.plan.to_string().bold().cyan()
    );
    println!(
        "  Outcome {} after {} cycles ({} ms)",
        outcome, report.cycles, report.elapsed_ms
    );

    if report.stages.is_empty() {
        return;
    }
    println!();
    for (i, stage) in report.stages.iter().enumerate() {
        let lock = match stage.lock {
            LockState::Locked => "locked".yellow(),
            LockState::Released => "released".green(),
            LockState::ReleasedAck => "released (ack)".green(),
            LockState::Aborted => "aborted".red(),
        };
        println!(
            "    {} {:<8} {:>9.1}  {}",
            format!("#{i}").dimmed(),
            stage.kind.to_string(),
            stage.target,
            lock
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, String> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn no_arguments_is_default() {
        assert_eq!(args(&[]).unwrap(), Args::default());
    }

    #[test]
    fn flags_and_values_parse() {
        let parsed = args(&[
            "--position",
            "center",
            "--game-data",
            "LRL",
            "--json",
            "--config",
            "/tmp/auto.toml",
        ])
        .unwrap();
        assert_eq!(parsed.position.as_deref(), Some("center"));
        assert_eq!(parsed.game_data.as_deref(), Some("LRL"));
        assert_eq!(parsed.config, Some(PathBuf::from("/tmp/auto.toml")));
        assert!(parsed.json);
        assert!(!parsed.realtime);
    }

    #[test]
    fn missing_value_is_an_error() {
        assert_eq!(args(&["--position"]).unwrap_err(), "--position needs a value");
    }

    #[test]
    fn unknown_flag_is_an_error() {
        assert!(args(&["--fast"]).unwrap_err().contains("--fast"));
    }
}
