//! Line-oriented operator console.
use poscon_core::{ControlError, Decimal, DestinationFormat, OperatorCommand};

pub const HELP: &str = "\
commands:
  start                 apply the controller output
  stop                  brake the motor
  reset                 zero position and controller, brake if running
  target <rev>          set the destination in revolutions
  kp <gain>             set the proportional gain
  ki <gain>             set the integral gain
  antiwindup on|off     toggle anti-windup
  history               show controller internals
  end                   shut down and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorLine {
    Command(OperatorCommand),
    History,
    Help,
    Empty,
}

fn number(what: &str, arg: Option<&str>) -> Result<Decimal, ControlError> {
    let arg = arg.ok_or_else(|| ControlError::Input(format!("{what} needs a value")))?;
    arg.parse::<Decimal>()
        .map_err(|e| ControlError::Input(format!("{what} {arg:?}: {e}")))
}

pub fn parse(line: &str, format: &DestinationFormat) -> Result<OperatorLine, ControlError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(OperatorLine::Empty);
    };
    let arg = words.next();
    if let Some(extra) = words.next() {
        return Err(ControlError::Input(format!("unexpected {extra:?}")));
    }
    let cmd = match head.to_ascii_lowercase().as_str() {
        "start" => OperatorCommand::Start,
        "stop" => OperatorCommand::Stop,
        "reset" => OperatorCommand::Reset,
        "end" | "quit" | "exit" => OperatorCommand::Shutdown,
        "target" => {
            let text = arg.ok_or_else(|| ControlError::Input("target needs a value".into()))?;
            OperatorCommand::SetDestination(format.parse(text)?)
        }
        "kp" => OperatorCommand::SetProportionalGain(number("kp", arg)?),
        "ki" => OperatorCommand::SetIntegralGain(number("ki", arg)?),
        "antiwindup" => match arg {
            Some("on") => OperatorCommand::SetAntiWindup(true),
            Some("off") => OperatorCommand::SetAntiWindup(false),
            _ => return Err(ControlError::Input("antiwindup takes on|off".into())),
        },
        "history" => return Ok(OperatorLine::History),
        "help" | "?" => return Ok(OperatorLine::Help),
        other => return Err(ControlError::Input(format!("unknown command {other:?}"))),
    };
    Ok(OperatorLine::Command(cmd))
}
