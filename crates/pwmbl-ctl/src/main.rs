//! pwmbl-ctl
//!
//! Command-line front end for the PWM backlight controller. Attaches a
//! backlight device to a sysfs attribute (or an in-memory sink when none is
//! given) and drives it the way the display stack would.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pwmbl_hal::mock::RecordingSink;
use pwmbl_hal::{
    BacklightDevice, BacklightOps, BoardVariant, PanelProfile, PwmSink, SysfsPwmSink,
};
use std::path::PathBuf;
use tracing::{debug, info};

/// Board used when nothing else is configured
const DEFAULT_BOARD: BoardVariant = BoardVariant::P4;

#[derive(Parser, Debug)]
#[command(name = "pwmbl-ctl")]
#[command(about = "Drive a calibrated PWM backlight")]
#[command(version)]
struct Cli {
    /// Built-in board calibration (p4, p4wifi, p4lte, p5)
    #[arg(long, global = true, env = "PWMBL_BOARD", conflicts_with = "profile")]
    board: Option<String>,

    /// Panel profile in TOML
    #[arg(long, global = true)]
    profile: Option<PathBuf>,

    /// Sysfs attribute receiving the level; an in-memory sink is used when absent
    #[arg(long, global = true)]
    sink: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Print the full intensity -> level table
    Table,

    /// Print the level for one intensity
    Map {
        #[arg(allow_negative_numbers = true)]
        intensity: i64,
    },

    /// Apply an intensity
    Set {
        #[arg(allow_negative_numbers = true)]
        intensity: i64,
    },

    /// Apply a level directly, bypassing calibration (luminance measurement)
    Raw {
        #[arg(allow_negative_numbers = true)]
        level: i64,
    },

    /// Suspend then resume
    Cycle,
}

fn main() -> Result<()> {
    setup_logging();

    let cli = Cli::parse();
    let profile = resolve_profile(&cli)?;
    info!("Using panel profile {}", profile.name);

    let command = cli.command.clone().unwrap_or(Command::Table);
    match command {
        Command::Table => {
            let curve = profile.validate()?;
            println!(
                "# dark floor {}, curve top {}, PWM max {}",
                curve.dark_level(),
                curve.max_level(),
                profile.max_level
            );
            for (intensity, level) in curve.table() {
                println!("{:>3} {:>5}", intensity, level);
            }
            Ok(())
        }
        Command::Map { intensity } => {
            let curve = profile.validate()?;
            println!("{}", curve.map(intensity));
            Ok(())
        }
        command => run_device(&cli, &profile, command),
    }
}

/// Setup logging to console
fn setup_logging() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_ansi(false))
        .init();
}

/// Pick the panel profile from a file, then a board name
fn resolve_profile(cli: &Cli) -> Result<PanelProfile> {
    if let Some(path) = &cli.profile {
        return PanelProfile::load(path)
            .with_context(|| format!("Failed to load profile {}", path.display()));
    }

    match &cli.board {
        Some(name) => {
            let board = BoardVariant::from_name(name)
                .with_context(|| format!("Unknown board: {}", name))?;
            Ok(board.profile())
        }
        None => {
            debug!("No board configured, defaulting to {}", DEFAULT_BOARD.as_str());
            Ok(DEFAULT_BOARD.profile())
        }
    }
}

fn run_device(cli: &Cli, profile: &PanelProfile, command: Command) -> Result<()> {
    let mut recorder = None;
    let sink: Box<dyn PwmSink> = match &cli.sink {
        Some(path) => {
            let sink = SysfsPwmSink::new(path)
                .with_context(|| format!("Failed to bind sink {}", path.display()))?;
            info!("Driving sink at {}", sink.path().display());
            Box::new(sink)
        }
        None => {
            let sink = RecordingSink::new();
            recorder = Some(sink.clone());
            Box::new(sink)
        }
    };

    let mut device = BacklightDevice::probe(pwmbl_hal::DRIVER_NAME, profile, sink)
        .context("Backlight probe failed")?;

    match command {
        Command::Set { intensity } => device.update_status(intensity)?,
        Command::Raw { level } => device.measurement_handle().raw_apply(level)?,
        Command::Cycle => {
            device.suspend()?;
            println!("state: {:?}", device.power_state()?);
            device.resume()?;
            println!("state: {:?}", device.power_state()?);
        }
        Command::Table | Command::Map { .. } => {}
    }

    let controller = device.controller();
    println!(
        "intensity: {} level: {}/{}",
        device.get_brightness(),
        controller.current_level(),
        controller.max_level()
    );

    if let Some(recorder) = recorder {
        println!("applied: {:?}", recorder.applied());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_set() {
        let cli = Cli::try_parse_from(["pwmbl-ctl", "--board", "p5", "set", "200"]).unwrap();
        assert_eq!(cli.board.as_deref(), Some("p5"));
        assert_eq!(cli.command, Some(Command::Set { intensity: 200 }));
    }

    #[test]
    fn test_parse_negative_raw() {
        let cli = Cli::try_parse_from(["pwmbl-ctl", "raw", "-3"]).unwrap();
        assert_eq!(cli.command, Some(Command::Raw { level: -3 }));
    }

    #[test]
    fn test_parse_global_after_subcommand() {
        let cli =
            Cli::try_parse_from(["pwmbl-ctl", "map", "-1", "--profile", "panel.toml"]).unwrap();
        assert_eq!(cli.command, Some(Command::Map { intensity: -1 }));
        assert_eq!(cli.profile, Some(PathBuf::from("panel.toml")));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Cli::try_parse_from(["pwmbl-ctl", "set"]).is_err());
        assert!(Cli::try_parse_from(["pwmbl-ctl", "set", "bright"]).is_err());
        assert!(Cli::try_parse_from(["pwmbl-ctl", "--volume", "3"]).is_err());
        assert!(
            Cli::try_parse_from(["pwmbl-ctl", "--board", "p4", "--profile", "x.toml"]).is_err()
        );
    }

    #[test]
    fn test_resolve_board_profile() {
        let cli = Cli::try_parse_from(["pwmbl-ctl", "--board", "p4lte"]).unwrap();
        let profile = resolve_profile(&cli).unwrap();
        assert_eq!(profile.name, "p4lte");

        let cli = Cli::try_parse_from(["pwmbl-ctl", "--board", "p9"]).unwrap();
        assert!(resolve_profile(&cli).is_err());
    }
}
