//! The `run` command: attach the loop, print telemetry, serve the operator.

use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel as xch;
use eyre::Result;
use poscon_core::{
    ControlLoop, ControllerStatus, Decimal, EngineCfg, Event, OperatorCommand, Publication,
    RunState,
};

use crate::operator::{self, OperatorLine};

#[derive(Debug, Clone, Default)]
pub struct RunOpts {
    pub revolutions: Option<Decimal>,
    pub kp: Option<Decimal>,
    pub ki: Option<Decimal>,
    pub no_anti_windup: bool,
    pub start: bool,
    pub cycles: Option<u64>,
    pub json: bool,
}

/// Poll interval for the shutdown flag while idle.
const IDLE_POLL: Duration = Duration::from_millis(50);

fn publication_kind(p: &Publication) -> &'static str {
    match p {
        Publication::Snapshot(_) => "snapshot",
        Publication::Target { .. } => "target",
        Publication::ProportionalGain(_) => "kp",
        Publication::IntegralGain(_) => "ki",
        Publication::AntiWindup(_) => "anti_windup",
    }
}

pub fn render(p: &Publication, json: bool) -> String {
    let fields = p.fields();
    if json {
        let mut obj = serde_json::Map::new();
        obj.insert("kind".into(), publication_kind(p).into());
        for (k, v) in fields {
            obj.insert(k.into(), v.into());
        }
        serde_json::Value::Object(obj).to_string()
    } else {
        fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn render_status(s: &ControllerStatus, json: bool) -> String {
    if json {
        serde_json::json!({
            "kind": "history",
            "kp": s.proportional_gain.to_string(),
            "ki": s.integral_gain.to_string(),
            "anti_windup": s.anti_windup,
            "accumulator": s.accumulator,
            "errors": s.history,
            "last_output": s.last_output,
        })
        .to_string()
    } else {
        format!(
            "kp={} ki={} anti_windup={} accumulator={} errors={:?} last_output={}",
            s.proportional_gain,
            s.integral_gain,
            s.anti_windup,
            s.accumulator,
            s.history,
            s.last_output
        )
    }
}

/// Forward stdin lines until EOF. The thread is left blocked on stdin at exit.
fn spawn_stdin_reader() -> xch::Receiver<String> {
    let (tx, rx) = xch::unbounded();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(l) => {
                    if tx.send(l).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    break;
                }
            }
        }
        tracing::debug!("operator input closed");
    });
    rx
}

pub fn engine_cfg(cfg: &poscon_config::Config, opts: &RunOpts) -> EngineCfg {
    let mut ecfg = EngineCfg::from(cfg);
    if let Some(kp) = opts.kp {
        ecfg.controller.proportional_gain = kp;
    }
    if let Some(ki) = opts.ki {
        ecfg.controller.integral_gain = ki;
    }
    if opts.no_anti_windup {
        ecfg.controller.anti_windup = false;
    }
    ecfg
}

/// Returns true when the operator asked to shut down.
fn handle_line(lp: &ControlLoop, line: &str, json: bool) -> bool {
    let format = lp.destination_format();
    let parsed = operator::parse(line, &format).map_err(eyre::Report::new);
    let result = parsed.and_then(|l| match l {
        OperatorLine::Command(cmd) => {
            let shutdown = cmd == OperatorCommand::Shutdown;
            lp.handle(Event::Operator(cmd)).map(|()| shutdown)
        }
        OperatorLine::History => {
            println!("{}", render_status(&lp.controller_status()?, json));
            Ok(false)
        }
        OperatorLine::Help => {
            println!("{}", operator::HELP);
            Ok(false)
        }
        OperatorLine::Empty => Ok(false),
    });
    match result {
        Ok(shutdown) => shutdown,
        Err(e) => {
            tracing::warn!(line, error = %e, "operator command rejected");
            eprintln!("{}", crate::error_fmt::humanize(&e));
            false
        }
    }
}

pub fn run(
    cfg: &poscon_config::Config,
    opts: &RunOpts,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let ecfg = engine_cfg(cfg, opts);
    let (driver, source) = crate::backends::open_backends(cfg)?;
    let lp = Arc::new(ControlLoop::builder().config(ecfg).driver(driver).build()?);
    let telemetry = lp.subscribe();

    if let Some(rev) = opts.revolutions {
        lp.handle(Event::Operator(OperatorCommand::SetDestination(rev)))?;
    }
    if opts.start {
        lp.handle(Event::Operator(OperatorCommand::Start))?;
    }
    lp.attach(source)?;
    tracing::info!(state = %lp.run_state(), target = lp.target(), "control loop attached");

    let lines = spawn_stdin_reader();
    let mut lines_open = true;
    let mut snapshots = 0u64;
    let never = xch::never::<String>();

    while !shutdown.load(Ordering::Relaxed) {
        let line_rx = if lines_open { &lines } else { &never };
        xch::select! {
            recv(telemetry) -> p => {
                let Ok(p) = p else { break };
                println!("{}", render(&p, opts.json));
                if matches!(p, Publication::Snapshot(_)) {
                    snapshots += 1;
                    if opts.cycles.is_some_and(|n| snapshots >= n) {
                        break;
                    }
                }
            }
            recv(line_rx) -> line => match line {
                Ok(line) => {
                    if handle_line(&lp, &line, opts.json) {
                        break;
                    }
                }
                Err(_) => lines_open = false,
            },
            default(IDLE_POLL) => {}
        }
    }

    if lp.run_state() != RunState::Shutdown {
        lp.handle(Event::Operator(OperatorCommand::Shutdown))?;
    }
    // Operator changes made just before `end` may still be queued.
    if !opts.cycles.is_some_and(|n| snapshots >= n) {
        for p in telemetry.try_iter() {
            println!("{}", render(&p, opts.json));
        }
    }
    tracing::info!(snapshots, "run finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_rendering_joins_fields() {
        let line = render(&Publication::AntiWindup(true), false);
        assert_eq!(line, "anti_windup=true");
    }

    #[test]
    fn json_rendering_tags_kind() {
        let line = render(
            &Publication::Target {
                display: "1.000".into(),
                pulses: 400,
            },
            true,
        );
        let v: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["kind"], "target");
        assert_eq!(v["target"], "1.000");
    }

    #[test]
    fn overrides_apply_on_top_of_config() {
        let cfg = poscon_config::Config::default();
        let opts = RunOpts {
            kp: Some("0.5".parse().unwrap()),
            no_anti_windup: true,
            ..RunOpts::default()
        };
        let e = engine_cfg(&cfg, &opts);
        assert_eq!(e.controller.proportional_gain.to_string(), "0.5");
        assert!(!e.controller.anti_windup);
        assert!(e.controller.integral_gain.is_zero());
    }
}
