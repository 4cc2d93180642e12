//! Human-readable error descriptions and structured JSON error formatting.

use poscon_core::error::{BuildError, ControlError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingDriver => {
                "What happened: No motor driver was provided to the control loop.\nLikely causes: The driver failed to initialize or was not passed to the builder.\nHow to fix: Check the [bus] section and the driver wiring.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/poscon.toml for a sample."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<ControlError>() {
        return match ce {
            ControlError::HardwareFault(reason) => format!(
                "What happened: The motor driver reports a fault ({reason}).\nLikely causes: Overcurrent from a stalled or shorted motor, low supply voltage, or overheating.\nHow to fix: Power down, check the motor and supply, then rerun self-check."
            ),
            ControlError::Hardware(msg) => format!(
                "What happened: A hardware call failed ({msg}).\nLikely causes: Bus wiring, wrong I2C address, or missing permissions.\nHow to fix: Verify [bus] in the config and that the process can access /dev/i2c-*."
            ),
            ControlError::Input(msg) => format!(
                "What happened: Invalid input ({msg}); the previous value is kept.\nHow to fix: Type `help` for the command list."
            ),
            ControlError::State(msg) => format!(
                "What happened: Command not allowed right now ({msg})."
            ),
            ControlError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("open motor driver") || lower.contains("open encoder pins") {
        let cause = err
            .chain()
            .nth(1)
            .map(|c| format!(" ({c})"))
            .unwrap_or_default();
        return format!(
            "What happened: Failed to acquire the hardware{cause}.\nLikely causes: Incorrect pin numbers or bus address, or insufficient GPIO/I2C permissions.\nHow to fix: Fix [pins] and [bus] in the config; ensure the process may access GPIO and I2C."
        );
    }

    if lower.contains("must be") || lower.contains("must look like") || lower.contains("parse config")
    {
        let detail = err
            .chain()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(": ");
        return format!(
            "What happened: Configuration is invalid ({detail}).\nHow to fix: Edit the TOML config and try again."
        );
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes; clap itself exits with 2 on usage errors.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 3;
    }
    match err.downcast_ref::<ControlError>() {
        Some(ControlError::HardwareFault(_)) => 4,
        Some(ControlError::Hardware(_)) => 5,
        Some(ControlError::Config(_)) => 3,
        Some(ControlError::State(_) | ControlError::Input(_)) => 6,
        None => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "BuildError";
    }
    match err.downcast_ref::<ControlError>() {
        Some(ControlError::HardwareFault(_)) => "HardwareFault",
        Some(ControlError::Hardware(_)) => "Hardware",
        Some(ControlError::Config(_)) => "Config",
        Some(ControlError::State(_)) => "State",
        Some(ControlError::Input(_)) => "Input",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_reports_have_their_own_code() {
        let e = eyre::Report::new(ControlError::HardwareFault("overcurrent".into()));
        assert_eq!(exit_code_for_error(&e), 4);
        assert!(humanize(&e).contains("overcurrent"));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&e)).unwrap();
        assert_eq!(v["reason"], "HardwareFault");
    }

    #[test]
    fn validation_messages_are_explained() {
        let e = eyre::eyre!("encoder.pulses_per_revolution must be > 0");
        assert!(humanize(&e).contains("Configuration is invalid"));
        assert_eq!(exit_code_for_error(&e), 1);
    }
}
