use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::{Result, WrapErr};
use poscon_core::error::ControlError;
use poscon_traits::MotorDriver;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod backends;
mod cli;
mod error_fmt;
mod operator;
mod run;

use cli::{Cli, Commands, FILE_GUARD, JSON_MODE};

fn load_config(path: Option<&Path>) -> Result<poscon_config::Config> {
    let cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .wrap_err_with(|| format!("read config {}", p.display()))?;
            poscon_config::load_toml(&text).wrap_err_with(|| format!("parse config {}", p.display()))?
        }
        None => poscon_config::Config::default(),
    };
    cfg.validate()?;
    Ok(cfg)
}

/// Console logs go to stderr so stdout carries only telemetry.
fn init_tracing(cli: &Cli, logging: &poscon_config::Logging) -> Result<()> {
    let level = cli
        .log_level
        .clone()
        .or_else(|| logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let console = if cli.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    let file = match logging.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file must name a file"))?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| eyre::eyre!("init logging: {e}"))
}

fn self_check(cfg: &poscon_config::Config) -> Result<()> {
    let mut driver = backends::open_driver(cfg)?;
    let code = driver
        .fault()
        .map_err(|e| eyre::Report::new(poscon_core::hw_error::map_hw_error(e.as_ref())))?;
    let reason = poscon_hardware::describe_fault(code);
    if let Err(e) = driver.release() {
        tracing::warn!(error = %e, "driver release failed");
    }
    tracing::info!(code, %reason, "self-check");
    if code != 0 {
        return Err(ControlError::HardwareFault(reason).into());
    }
    println!("self-check ok: fault register {code:#04x} ({reason})");
    Ok(())
}

fn print_faults() {
    for entry in poscon_hardware::protocol::FAULT_TABLE {
        println!("{:#04x} {:<7} {}", entry.mask, entry.name, entry.reason);
    }
}

fn real_main(cli: Cli) -> Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    init_tracing(&cli, &cfg.logging)?;
    tracing::debug!(config = ?cli.config, "configuration loaded");

    match cli.cmd {
        Commands::Run {
            revolutions,
            kp,
            ki,
            no_anti_windup,
            start,
            cycles,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            ctrlc::set_handler(move || {
                tracing::info!("received interrupt, shutting down");
                flag.store(true, Ordering::Relaxed);
            })
            .wrap_err("install Ctrl-C handler")?;
            let opts = run::RunOpts {
                revolutions,
                kp,
                ki,
                no_anti_windup,
                start,
                cycles,
                json: cli.json,
            };
            run::run(&cfg, &opts, shutdown)
        }
        Commands::SelfCheck => self_check(&cfg),
        Commands::Faults => {
            print_faults();
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("{e}");
    }

    if let Err(e) = real_main(cli) {
        tracing::error!(error = ?e, "poscon failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", error_fmt::format_error_json(&e));
        } else {
            eprintln!("{}", error_fmt::humanize(&e));
        }
        std::process::exit(error_fmt::exit_code_for_error(&e));
    }
}
