use poscon_config::{IntegralSaturation, load_toml};
use rstest::rstest;

#[test]
fn accepts_full_bench_config() {
    let toml = r##"
[pins]
reference = 17
encoder_a = 27
encoder_b = 22

[bus]
i2c_bus = 1
driver_address = 96

[encoder]
pulses_per_revolution = 400

[controller]
output_limit = 15
proportional_gain = 0.5
integral_gain = 0.0005
anti_windup = true
integral_saturation = "integrate"
history_len = 3
speed_jitter_rpm = 0.01

[scales]
internal = 6
rpm = 3
rotation = 3
cycle_time = 3
gain = 4

[input]
destination_pattern = "#0.000"

[simulation]
reference_period_ms = 100
pulses_per_sec_per_unit = 40
"##;

    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(
        cfg.controller.integral_saturation,
        IntegralSaturation::Integrate
    );
    assert_eq!(cfg.bus.driver_address, 0x60);
}

#[rstest]
#[case("[encoder]\npulses_per_revolution = 0", "pulses_per_revolution must be > 0")]
#[case("[controller]\nhistory_len = 0", "history_len must be >= 1")]
#[case("[controller]\nspeed_jitter_rpm = -1.0", "speed_jitter_rpm must be >= 0")]
#[case("[controller]\nproportional_gain = 1e9", "unreasonably large")]
#[case("[scales]\nrpm = 40", "scales.rpm must be <=")]
#[case("[scales]\ncycle_time = 0", "scales.cycle_time must be >= 1")]
#[case("[input]\ndestination_pattern = \"abc\"", "destination_pattern")]
#[case("[telemetry]\nchannel_capacity = 0", "channel_capacity must be >= 1")]
#[case("[simulation]\nreference_period_ms = 0", "reference_period_ms must be >= 1")]
#[case("[logging]\nrotation = \"weekly\"", "never|daily|hourly")]
fn rejects_invalid_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        format!("{err}").contains(needle),
        "error {err} does not mention {needle}"
    );
}

#[test]
fn rejects_unknown_saturation_policy() {
    let err = load_toml("[controller]\nintegral_saturation = \"sometimes\"")
        .expect_err("unknown variant");
    assert!(format!("{err}").contains("sometimes"));
}

#[test]
fn loads_from_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("poscon.toml");
    std::fs::write(&path, "[encoder]\npulses_per_revolution = 1024\n").expect("write");
    let text = std::fs::read_to_string(&path).expect("read");
    let cfg = load_toml(&text).expect("parse");
    assert_eq!(cfg.encoder.pulses_per_revolution, 1024);
    assert_eq!(cfg.controller.output_limit, 15);
}
