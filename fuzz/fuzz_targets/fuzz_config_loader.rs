#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not. A config that
    // validates must also convert into an engine config and build.
    let Ok(cfg) = toml::from_str::<poscon_config::Config>(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    let engine = poscon_core::EngineCfg::from(&cfg);
    let built = poscon_core::ControlLoop::builder()
        .config(engine)
        .driver(Box::new(poscon_core::mocks::RecordingDriver::default()))
        .build();
    assert!(built.is_ok(), "validated config rejected by builder: {built:?}");
});
