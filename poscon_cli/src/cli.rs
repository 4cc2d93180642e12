//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use poscon_core::Decimal;
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "poscon", version, about = "DC motor position controller")]
pub struct Cli {
    /// Path to config TOML; the bench defaults apply when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log and print telemetry as JSON lines instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging] level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control loop with an operator console on stdin
    Run {
        /// Destination in revolutions (`,` or `.` as decimal separator)
        #[arg(long, value_name = "REV", allow_hyphen_values = true)]
        revolutions: Option<Decimal>,
        /// Proportional gain (overrides config)
        #[arg(long, value_name = "GAIN", allow_hyphen_values = true)]
        kp: Option<Decimal>,
        /// Integral gain (overrides config)
        #[arg(long, value_name = "GAIN", allow_hyphen_values = true)]
        ki: Option<Decimal>,
        /// Disable anti-windup (overrides config)
        #[arg(long, action = ArgAction::SetTrue)]
        no_anti_windup: bool,
        /// Enter Running immediately instead of waiting for `start`
        #[arg(long, action = ArgAction::SetTrue)]
        start: bool,
        /// Shut down after this many published cycles
        #[arg(long, value_name = "N")]
        cycles: Option<u64>,
    },
    /// Open the motor driver, report its fault register, release it
    SelfCheck,
    /// Print the motor-driver fault table
    Faults,
}
