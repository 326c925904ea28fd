//! Human-readable error descriptions, structured JSON errors and exit codes.

use rover_core::RoverError;
use serde_json::json;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(re) = err.downcast_ref::<RoverError>() {
        return match re {
            RoverError::Actuator(msg) => format!(
                "What happened: A motor or buzzer write failed ({msg}). The rover was halted.\nLikely causes: Loose H-bridge wiring, GPIO claimed by another process, or PWM unavailable.\nHow to fix: Check the [pins] motor entries and wiring, then run `rover motor-test`."
            ),
            RoverError::Timeout => "What happened: The ultrasonic ranger did not answer in time.\nLikely causes: Echo/trigger pins swapped, no 5V supply, or missing voltage divider on ECHO.\nHow to fix: Verify pins.echo and pins.trigger, or raise hardware.echo_timeout_ms.".to_string(),
            RoverError::Sensor(msg) => format!(
                "What happened: Distance sensor error ({msg}).\nLikely causes: Wiring fault or an out-of-range reading.\nHow to fix: Run `rover self-check` with --log-level=debug."
            ),
            RoverError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values or duplicate pins in the TOML.\nHow to fix: Edit the config file (see etc/rover.toml), then rerun."
            ),
            RoverError::State(msg) => format!(
                "What happened: {msg}.\nLikely causes: Internal sequencing error.\nHow to fix: Re-run with --log-level=debug and report the log."
            ),
        };
    }

    // String-based heuristics for errors coming from device init
    let msg = err.to_string();
    let lower = format!("{err:#}").to_ascii_lowercase();
    if lower.contains("open rover hardware") || lower.contains("gpio") {
        return format!(
            "What happened: Failed to initialize GPIO ({lower}).\nLikely causes: Not running on a Raspberry Pi, incorrect pin numbers, or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process may access /dev/gpiomem."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable short name for the JSON `reason` field.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<RoverError>() {
        Some(RoverError::Actuator(_)) => "ActuatorFault",
        Some(RoverError::Sensor(_)) => "SensorFault",
        Some(RoverError::Timeout) => "SensorTimeout",
        Some(RoverError::Config(_)) => "Config",
        Some(RoverError::State(_)) => "State",
        None => "Error",
    }
}

/// Actuator fault 3, sensor 4, config 5, anything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> u8 {
    match err.downcast_ref::<RoverError>() {
        Some(RoverError::Actuator(_)) => 3,
        Some(RoverError::Sensor(_) | RoverError::Timeout) => 4,
        Some(RoverError::Config(_)) => 5,
        Some(RoverError::State(_)) | None => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;
    use rstest::rstest;

    #[rstest]
    #[case(RoverError::Actuator("pwm".into()), 3, "ActuatorFault")]
    #[case(RoverError::Sensor("glitch".into()), 4, "SensorFault")]
    #[case(RoverError::Timeout, 4, "SensorTimeout")]
    #[case(RoverError::Config("bad".into()), 5, "Config")]
    #[case(RoverError::State("twice".into()), 1, "State")]
    fn typed_errors_map_to_codes(#[case] e: RoverError, #[case] code: u8, #[case] reason: &str) {
        let report = eyre::Report::new(e);
        assert_eq!(exit_code_for_error(&report), code);
        assert_eq!(reason_name(&report), reason);
    }

    #[test]
    fn wrapped_errors_keep_their_code() {
        let res: Result<(), RoverError> = Err(RoverError::Config("x".into()));
        let report = res.wrap_err("load config").unwrap_err();
        assert_eq!(exit_code_for_error(&report), 5);
    }

    #[test]
    fn untyped_errors_are_generic() {
        let report = eyre::eyre!("disk on fire");
        assert_eq!(exit_code_for_error(&report), 1);
        assert!(humanize(&report).contains("disk on fire"));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&report)).unwrap();
        assert_eq!(v["reason"], "Error");
    }

    #[test]
    fn timeouts_point_at_the_ranger() {
        let report = eyre::Report::new(RoverError::Timeout);
        assert!(humanize(&report).contains("echo_timeout_ms"));
    }
}
